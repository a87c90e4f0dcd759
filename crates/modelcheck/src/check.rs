//! The check pass: walk a model's fields over a payload, validate and
//! reshape each one, and assemble the result.

use std::borrow::Cow;
use std::sync::Arc;

use modelcheck_core::{
    build_nested, deep_clone, exists, merge, project, read, write, Key, MergeOptions, Object, Path, Value,
};
use tracing::{debug, instrument, trace};

use crate::descriptor::{normalize, Canonical, MessageMap, Model, ModelNode, NestedModel, Validator};
use crate::error::{CheckError, Stage};
use crate::expr;
use crate::options::CheckOptions;
use crate::registry::{Outcome, Registry};
use crate::types::accepts;

/// Settings that change from one nesting level to the next.
#[derive(Debug, Clone, Copy)]
struct Pass {
    if_no_prop_create: bool,
}

/// Checks payloads against models with fixed options and validators.
#[derive(Debug, Clone)]
pub struct Checker {
    options: CheckOptions,
    registry: Arc<Registry>,
}

impl Default for Checker {
    fn default() -> Self {
        Self::new(CheckOptions::default())
    }
}

impl Checker {
    /// A checker using the built-in validators.
    pub fn new(options: CheckOptions) -> Self {
        Self {
            options,
            registry: Registry::global(),
        }
    }

    pub fn with_registry(mut self, registry: impl Into<Arc<Registry>>) -> Self {
        self.registry = registry.into();
        self
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Check `payload` against `model` and return the resulting tree.
    ///
    /// The payload must be an object or an ordered collection. A collection
    /// is checked as a whole through the model's collection descriptor.
    /// Unless `clone_data` is off the payload is left as it was, even when
    /// the check fails.
    #[instrument(skip(self, payload, model), level = "debug")]
    pub fn check(&self, payload: &mut Value, model: &Model) -> Result<Value, CheckError> {
        let pass = Pass {
            if_no_prop_create: self.options.if_no_prop_create,
        };
        match payload {
            Value::Array(_) => self.check_collection(payload, model),
            Value::Object(_) | Value::Instance(_) if self.options.clone_data => {
                let data = deep_clone(payload, self.options.keys_range);
                self.check_fields(data, model, pass)
            }
            Value::Object(_) | Value::Instance(_) => {
                let targets = self.run(payload, model, pass)?;
                self.finish(payload.clone(), &targets)
            }
            _ => Err(CheckError::payload_shape()),
        }
    }

    /// Check a top-level collection as field `"0"` of a wrapper object.
    fn check_collection(&self, payload: &mut Value, model: &Model) -> Result<Value, CheckError> {
        let key = Key::from(0usize);
        let descriptor = model.collection_descriptor().cloned().unwrap_or_default();
        let wrapper_model = Model::new().field(key.clone(), descriptor);

        let mut wrapper = Value::Object(Object::from_iter([(key.clone(), std::mem::take(payload))]));
        let result = self.check(&mut wrapper, &wrapper_model);
        if let Some(original) = wrapper.as_object_mut().and_then(|object| object.remove(&key)) {
            *payload = original;
        }

        let mut out = result?;
        Ok(out
            .as_object_mut()
            .and_then(|object| object.remove(&key))
            .unwrap_or_default())
    }

    /// Run the fields of `model` over an owned object value.
    fn check_fields(&self, mut data: Value, model: &Model, pass: Pass) -> Result<Value, CheckError> {
        if !data.is_object_like() {
            return Ok(data);
        }
        let targets = self.run(&mut data, model, pass)?;
        self.finish(data, &targets)
    }

    /// Run every visible field of `model`, returning the paths they target.
    fn run(&self, data: &mut Value, model: &Model, pass: Pass) -> Result<Vec<Path>, CheckError> {
        let mut targets = Vec::with_capacity(model.len());
        for (key, node) in model.fields(self.options.keys_range) {
            let field = normalize(key, node, pass.if_no_prop_create);
            self.check_field(data, &field)?;
            targets.push(field.target);
        }
        Ok(targets)
    }

    fn finish(&self, data: Value, targets: &[Path]) -> Result<Value, CheckError> {
        if !self.options.only_model_descriptors {
            return Ok(data);
        }
        debug!("projecting onto {} declared paths", targets.len());
        Ok(project(&data, targets, self.options.keys_range)?)
    }

    fn check_field(&self, data: &mut Value, field: &Canonical<'_>) -> Result<(), CheckError> {
        let range = self.options.keys_range;
        let path = &field.target;

        if field.if_no_prop_create && !exists(data, path, range) {
            trace!(%path, "creating missing field");
            let nested = build_nested([(path.clone(), field.default.clone())]);
            merge(data, [&nested], MergeOptions::deep(range))?;
        }

        if field.required && !exists(data, path, range) {
            return Err(CheckError::required(path, &field.messages));
        }

        let mut value = read(data, path, range).cloned().unwrap_or_default();
        if value.is_undefined() {
            value = field.default.clone();
        }

        if let Some(validator) = field.validate_before_replace {
            trace!(%path, "validating before replace");
            self.validate(validator, &value, path, Stage::ValidateBeforeReplace, &field.messages)?;
        }

        if let Some(replace) = field.replace {
            trace!(%path, "replacing value");
            value = replace.apply(&value, path);
        }

        if !accepts(field.types, &value) {
            return Err(CheckError::type_mismatch(path, &value, field.types, &field.messages));
        }

        if let Some(validator) = field.validator {
            trace!(%path, "validating");
            self.validate(validator, &value, path, Stage::Validator, &field.messages)?;
        }

        if let Some(nested) = field.model {
            let pass = Pass {
                if_no_prop_create: field.if_no_prop_create,
            };
            value = self.descend(value, nested, path, pass)?;
        }

        if exists(data, path, range) {
            write(data, path, value, range)?;
        }
        Ok(())
    }

    fn validate(
        &self,
        validator: &Validator,
        value: &Value,
        path: &Path,
        stage: Stage,
        messages: &MessageMap,
    ) -> Result<(), CheckError> {
        let outcome = match validator {
            Validator::Func(validate) => validate(value, path),
            Validator::Expr(source) => {
                let invalid = |reason| CheckError::InvalidExpression {
                    path: path.to_string(),
                    reason,
                };
                match expr::parse(source).map_err(invalid)? {
                    Some(invocation) => invocation
                        .evaluate(&self.registry, value, path)
                        .map_err(invalid)?,
                    None => {
                        trace!(%path, source = %source, "validator string names no validator");
                        Outcome::Fail
                    }
                }
            }
        };
        match outcome.settle(value, path) {
            Outcome::Fail => Err(CheckError::validation(path, stage, None, messages)),
            Outcome::Invalid(error) => Err(CheckError::validation(path, stage, Some(error), messages)),
            Outcome::Pass | Outcome::Defer(_) => Ok(()),
        }
    }

    /// Apply a nested model. Field maps apply to objects and item nodes to
    /// collections; any other pairing leaves the value as it is.
    fn descend(&self, value: Value, nested: &NestedModel, path: &Path, pass: Pass) -> Result<Value, CheckError> {
        match nested {
            NestedModel::Fields(model) => {
                debug!(%path, "descending into object");
                self.check_fields(value, model, pass)
            }
            NestedModel::FieldsWith(build) if value.is_object_like() => {
                debug!(%path, "descending into object");
                let model = build(&value, path);
                self.check_fields(value, &model, pass)
            }
            NestedModel::Items(node) => match value {
                Value::Array(items) => {
                    debug!(%path, "descending into {} items", items.len());
                    let node = node.as_ref();
                    self.check_items(items, |_, _| Cow::Borrowed(node), pass)
                }
                other => Ok(other),
            },
            NestedModel::ItemsWith(build) => match value {
                Value::Array(items) => {
                    debug!(%path, "descending into {} items", items.len());
                    self.check_items(items, |item, index| Cow::Owned(build(item, index)), pass)
                }
                other => Ok(other),
            },
            NestedModel::FieldsWith(_) => Ok(value),
        }
    }

    /// Check each item as field `index` of a single-field wrapper, dropping
    /// the items marked for removal.
    fn check_items<'n, F>(&self, items: Vec<Value>, node_for: F, pass: Pass) -> Result<Value, CheckError>
    where
        F: Fn(&Value, usize) -> Cow<'n, ModelNode>,
    {
        let mut kept = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let node = node_for(&item, index);
            if node.remove().is_some_and(|remove| remove.applies(&item, index)) {
                trace!(index, "removing item");
                continue;
            }

            let key = Key::from(index);
            let model = Model::new().field(key.clone(), node.into_owned());
            let wrapper = Value::Object(Object::from_iter([(key.clone(), item)]));
            let mut out = self.check_fields(wrapper, &model, pass)?;
            kept.push(
                out.as_object_mut()
                    .and_then(|object| object.remove(&key))
                    .unwrap_or_default(),
            );
        }
        Ok(Value::Array(kept))
    }
}

/// Check `payload` against `model` with the built-in validators.
///
/// ```rust
/// use modelcheck::{check, CheckOptions, Descriptor, Model, TypeTag, Value};
/// use serde_json::json;
///
/// let model = Model::new()
///     .field("id", TypeTag::String)
///     .field("name", Descriptor::new().if_no_prop_create(true).default_value("Alice"));
/// let mut payload = Value::from(json!({"id": "123", "extra": true}));
///
/// let checked = check(&mut payload, &model, &CheckOptions::default()).unwrap();
/// assert_eq!(checked, Value::from(json!({"id": "123", "name": "Alice"})));
/// ```
pub fn check(payload: &mut Value, model: &Model, options: &CheckOptions) -> Result<Value, CheckError> {
    Checker::new(*options).check(payload, model)
}
