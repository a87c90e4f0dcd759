//! Models, field descriptors and their normalized form.
//!
//! A [`Model`] maps field keys to [`ModelNode`]s. A node is either a bare
//! list of accepted types or a full [`Descriptor`] built with the builder
//! methods:
//!
//! ```rust
//! use modelcheck::{Descriptor, Model, TypeTag};
//!
//! let model = Model::new()
//!     .field("id", TypeTag::String)
//!     .field(
//!         "name",
//!         Descriptor::new()
//!             .ty(TypeTag::String)
//!             .required(true)
//!             .message("please fill in a name")
//!             .validate_with(|value, _| value.as_str().is_some_and(|s| !s.is_empty())),
//!     );
//! assert_eq!(model.len(), 2);
//! ```
//!
//! Anything that may be computed takes a closure through a `*_with`
//! builder. Closures are evaluated when the field is checked.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use indexmap::IndexMap;
use modelcheck_core::{Class, Key, KeysRange, Path, Value};

use crate::error::{SharedError, Stage};
use crate::registry::{Outcome, ValidatorFn};
use crate::types::TypeTag;

/// A shared closure. Formats as `<fn>`.
pub struct Callback<F: ?Sized>(Arc<F>);

impl<F: ?Sized> Callback<F> {
    pub fn from_arc(func: Arc<F>) -> Self {
        Self(func)
    }
}

impl<F: ?Sized> Clone for Callback<F> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<F: ?Sized> Deref for Callback<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.0
    }
}

impl<F: ?Sized> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<fn>")
    }
}

pub type Producer<T> = Callback<dyn Fn() -> T + Send + Sync>;

/// A boolean that may be computed.
#[derive(Clone, Debug)]
pub enum Flag {
    Fixed(bool),
    Computed(Producer<bool>),
}

impl Flag {
    fn resolve(&self) -> bool {
        match self {
            Flag::Fixed(flag) => *flag,
            Flag::Computed(produce) => produce(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum DefaultValue {
    Fixed(Value),
    Computed(Producer<Value>),
}

impl DefaultValue {
    fn resolve(&self) -> Value {
        match self {
            DefaultValue::Fixed(value) => value.clone(),
            DefaultValue::Computed(produce) => produce(),
        }
    }
}

/// The value a field is replaced with.
#[derive(Clone, Debug)]
pub enum Replace {
    Fixed(Value),
    Computed(Callback<dyn Fn(&Value, &Path) -> Value + Send + Sync>),
}

impl Replace {
    pub fn apply(&self, value: &Value, key: &Path) -> Value {
        match self {
            Replace::Fixed(replacement) => replacement.clone(),
            Replace::Computed(replace) => replace(value, key),
        }
    }
}

/// Whether a collection item is dropped. Closures get the item and its index.
#[derive(Clone, Debug)]
pub enum Remove {
    Fixed(bool),
    Computed(Callback<dyn Fn(&Value, usize) -> bool + Send + Sync>),
}

impl Remove {
    pub fn applies(&self, item: &Value, index: usize) -> bool {
        match self {
            Remove::Fixed(remove) => *remove,
            Remove::Computed(remove) => remove(item, index),
        }
    }
}

/// A validator: a closure, or an expression such as `@isInt` or
/// `@is(1, $value)`.
#[derive(Clone, Debug)]
pub enum Validator {
    Func(Callback<dyn Fn(&Value, &Path) -> Outcome + Send + Sync>),
    Expr(String),
}

impl Validator {
    pub fn func<F, O>(validate: F) -> Self
    where
        F: Fn(&Value, &Path) -> O + Send + Sync + 'static,
        O: Into<Outcome>,
    {
        Validator::Func(Callback(Arc::new(move |value: &Value, key: &Path| -> Outcome {
            validate(value, key).into()
        })))
    }

    pub fn expr(source: impl Into<String>) -> Self {
        Validator::Expr(source.into())
    }
}

impl From<&str> for Validator {
    fn from(source: &str) -> Self {
        Validator::expr(source)
    }
}

impl From<String> for Validator {
    fn from(source: String) -> Self {
        Validator::Expr(source)
    }
}

impl From<ValidatorFn> for Validator {
    fn from(validate: ValidatorFn) -> Self {
        Validator::Func(Callback(validate))
    }
}

/// One message: text, or an error value that replaces the failure.
#[derive(Clone)]
pub enum MessageEntry {
    Text(String),
    Error(SharedError),
}

impl MessageEntry {
    pub fn error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        MessageEntry::Error(Arc::new(error))
    }

    fn is_set(&self) -> bool {
        !matches!(self, MessageEntry::Text(text) if text.is_empty())
    }
}

impl fmt::Debug for MessageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageEntry::Text(text) => f.debug_tuple("Text").field(text).finish(),
            MessageEntry::Error(error) => f.debug_tuple("Error").field(&error.to_string()).finish(),
        }
    }
}

impl From<&str> for MessageEntry {
    fn from(text: &str) -> Self {
        MessageEntry::Text(text.to_string())
    }
}

impl From<String> for MessageEntry {
    fn from(text: String) -> Self {
        MessageEntry::Text(text)
    }
}

/// Messages keyed by stage, with `all` as the fallback.
#[derive(Clone, Debug, Default)]
pub struct MessageMap {
    pub all: Option<MessageEntry>,
    pub type_: Option<MessageEntry>,
    pub required: Option<MessageEntry>,
    pub validate_before_replace: Option<MessageEntry>,
    pub validator: Option<MessageEntry>,
}

impl MessageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(mut self, entry: impl Into<MessageEntry>) -> Self {
        self.all = Some(entry.into());
        self
    }

    pub fn on(mut self, stage: Stage, entry: impl Into<MessageEntry>) -> Self {
        *self.slot_mut(stage) = Some(entry.into());
        self
    }

    fn slot(&self, stage: Stage) -> &Option<MessageEntry> {
        match stage {
            Stage::Type => &self.type_,
            Stage::Required => &self.required,
            Stage::ValidateBeforeReplace => &self.validate_before_replace,
            Stage::Validator => &self.validator,
        }
    }

    fn slot_mut(&mut self, stage: Stage) -> &mut Option<MessageEntry> {
        match stage {
            Stage::Type => &mut self.type_,
            Stage::Required => &mut self.required,
            Stage::ValidateBeforeReplace => &mut self.validate_before_replace,
            Stage::Validator => &mut self.validator,
        }
    }

    /// The entry for `stage`, falling back to `all`. Empty text counts as
    /// unset.
    pub fn lookup(&self, stage: Stage) -> Option<&MessageEntry> {
        self.slot(stage)
            .as_ref()
            .filter(|entry| entry.is_set())
            .or_else(|| self.all.as_ref().filter(|entry| entry.is_set()))
    }
}

/// A caller-supplied error message.
///
/// A plain text or error message only applies to validator failures, that
/// is the `validateBeforeReplace` and `validator` stages. Use a
/// [`MessageMap`] to cover the other stages.
#[derive(Clone, Debug)]
pub enum Message {
    Text(String),
    Error(SharedError),
    Map(MessageMap),
    Computed(Producer<Message>),
}

impl Message {
    pub fn error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Message::Error(Arc::new(error))
    }

    /// Resolve producers into a message map.
    pub fn resolve(&self) -> MessageMap {
        let plain = |entry: MessageEntry| MessageMap {
            validate_before_replace: Some(entry.clone()),
            validator: Some(entry),
            ..MessageMap::default()
        };
        match self {
            Message::Text(text) => plain(MessageEntry::Text(text.clone())),
            Message::Error(error) => plain(MessageEntry::Error(error.clone())),
            Message::Map(map) => map.clone(),
            Message::Computed(produce) => produce().resolve(),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

impl From<MessageMap> for Message {
    fn from(map: MessageMap) -> Self {
        Message::Map(map)
    }
}

/// The model applied below a field.
#[derive(Clone, Debug)]
pub enum NestedModel {
    /// Field map for an object value.
    Fields(Model),
    /// Field map computed from the object value and its path.
    FieldsWith(Callback<dyn Fn(&Value, &Path) -> Model + Send + Sync>),
    /// Node applied to every item of a collection value.
    Items(Box<ModelNode>),
    /// Node computed per item from the item and its index.
    ItemsWith(Callback<dyn Fn(&Value, usize) -> ModelNode + Send + Sync>),
}

/// Full rule set for one field or one collection item.
#[derive(Clone, Debug, Default)]
pub struct Descriptor {
    prop: Option<Path>,
    types: Vec<TypeTag>,
    required: Option<Flag>,
    default: Option<DefaultValue>,
    if_no_prop_create: Option<bool>,
    replace: Option<Replace>,
    model: Option<NestedModel>,
    remove: Option<Remove>,
    validate_before_replace: Option<Validator>,
    validator: Option<Validator>,
    message: Option<Message>,
}

impl Descriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check another location instead of the field key.
    pub fn prop(mut self, path: impl Into<Path>) -> Self {
        self.prop = Some(path.into());
        self
    }

    /// Accept one more type.
    pub fn ty(mut self, tag: impl Into<TypeTag>) -> Self {
        self.types.push(tag.into());
        self
    }

    /// Replace the accepted types.
    pub fn types<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeTag>,
    {
        self.types = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(Flag::Fixed(required));
        self
    }

    pub fn required_with<F>(mut self, required: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.required = Some(Flag::Computed(Callback(Arc::new(required))));
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Fixed(value.into()));
        self
    }

    pub fn default_with<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Computed(Callback(Arc::new(produce))));
        self
    }

    /// Create the field from its default when it is missing. Overrides the
    /// setting inherited from the options or a parent field.
    pub fn if_no_prop_create(mut self, create: bool) -> Self {
        self.if_no_prop_create = Some(create);
        self
    }

    pub fn replace(mut self, value: impl Into<Value>) -> Self {
        self.replace = Some(Replace::Fixed(value.into()));
        self
    }

    pub fn replace_with<F>(mut self, replace: F) -> Self
    where
        F: Fn(&Value, &Path) -> Value + Send + Sync + 'static,
    {
        self.replace = Some(Replace::Computed(Callback(Arc::new(replace))));
        self
    }

    /// Field map applied when the value is an object.
    pub fn model(mut self, model: Model) -> Self {
        self.model = Some(NestedModel::Fields(model));
        self
    }

    pub fn model_with<F>(mut self, build: F) -> Self
    where
        F: Fn(&Value, &Path) -> Model + Send + Sync + 'static,
    {
        self.model = Some(NestedModel::FieldsWith(Callback(Arc::new(build))));
        self
    }

    /// Node applied to each item when the value is a collection.
    pub fn items(mut self, node: impl Into<ModelNode>) -> Self {
        self.model = Some(NestedModel::Items(Box::new(node.into())));
        self
    }

    pub fn items_with<F>(mut self, build: F) -> Self
    where
        F: Fn(&Value, usize) -> ModelNode + Send + Sync + 'static,
    {
        self.model = Some(NestedModel::ItemsWith(Callback(Arc::new(build))));
        self
    }

    /// Drop this item from its collection. Only meaningful on item nodes.
    pub fn remove(mut self, remove: bool) -> Self {
        self.remove = Some(Remove::Fixed(remove));
        self
    }

    pub fn remove_with<F>(mut self, remove: F) -> Self
    where
        F: Fn(&Value, usize) -> bool + Send + Sync + 'static,
    {
        self.remove = Some(Remove::Computed(Callback(Arc::new(remove))));
        self
    }

    pub fn validator(mut self, validator: impl Into<Validator>) -> Self {
        self.validator = Some(validator.into());
        self
    }

    pub fn validate_with<F, O>(mut self, validate: F) -> Self
    where
        F: Fn(&Value, &Path) -> O + Send + Sync + 'static,
        O: Into<Outcome>,
    {
        self.validator = Some(Validator::func(validate));
        self
    }

    /// Validator run before `replace`.
    pub fn validate_before_replace(mut self, validator: impl Into<Validator>) -> Self {
        self.validate_before_replace = Some(validator.into());
        self
    }

    pub fn validate_before_replace_with<F, O>(mut self, validate: F) -> Self
    where
        F: Fn(&Value, &Path) -> O + Send + Sync + 'static,
        O: Into<Outcome>,
    {
        self.validate_before_replace = Some(Validator::func(validate));
        self
    }

    pub fn message(mut self, message: impl Into<Message>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn message_with<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> Message + Send + Sync + 'static,
    {
        self.message = Some(Message::Computed(Callback(Arc::new(produce))));
        self
    }
}

/// A model entry: accepted types alone, or a full descriptor.
#[derive(Clone, Debug)]
pub enum ModelNode {
    Types(Vec<TypeTag>),
    Descriptor(Box<Descriptor>),
}

impl ModelNode {
    pub fn remove(&self) -> Option<&Remove> {
        match self {
            ModelNode::Descriptor(descriptor) => descriptor.remove.as_ref(),
            ModelNode::Types(_) => None,
        }
    }
}

impl From<TypeTag> for ModelNode {
    fn from(tag: TypeTag) -> Self {
        ModelNode::Types(vec![tag])
    }
}

impl From<Vec<TypeTag>> for ModelNode {
    fn from(tags: Vec<TypeTag>) -> Self {
        ModelNode::Types(tags)
    }
}

impl From<Class> for ModelNode {
    fn from(class: Class) -> Self {
        ModelNode::Types(vec![TypeTag::User(class)])
    }
}

impl From<Descriptor> for ModelNode {
    fn from(descriptor: Descriptor) -> Self {
        ModelNode::Descriptor(Box::new(descriptor))
    }
}

#[derive(Clone, Debug)]
pub struct ModelField {
    pub node: ModelNode,
    pub enumerable: bool,
}

/// An ordered map from field keys (or namespace paths) to model nodes.
#[derive(Clone, Debug, Default)]
pub struct Model {
    fields: IndexMap<Key, ModelField>,
    collection: Option<Box<Descriptor>>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: impl Into<Key>, node: impl Into<ModelNode>) -> Self {
        self.insert(key.into(), node.into(), true);
        self
    }

    /// A field that only takes part when the keys range includes
    /// non-enumerable keys.
    pub fn hidden_field(mut self, key: impl Into<Key>, node: impl Into<ModelNode>) -> Self {
        self.insert(key.into(), node.into(), false);
        self
    }

    fn insert(&mut self, key: Key, node: ModelNode, enumerable: bool) {
        self.fields.insert(key, ModelField { node, enumerable });
    }

    /// Descriptor applied to a payload that is itself a collection. Field
    /// entries play no part in that case.
    pub fn collection(mut self, descriptor: Descriptor) -> Self {
        self.collection = Some(Box::new(descriptor));
        self
    }

    pub fn collection_descriptor(&self) -> Option<&Descriptor> {
        self.collection.as_deref()
    }

    pub fn get(&self, key: &Key) -> Option<&ModelNode> {
        self.fields.get(key).map(|field| &field.node)
    }

    /// Fields visible under `range`, in declaration order.
    pub fn fields(&self, range: KeysRange) -> impl Iterator<Item = (&Key, &ModelNode)> {
        self.fields
            .iter()
            .filter(move |(key, field)| range.admits(key, field.enumerable))
            .map(|(key, field)| (key, &field.node))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A field's rules for one pass, with producers resolved.
#[derive(Debug)]
pub(crate) struct Canonical<'m> {
    pub target: Path,
    pub types: &'m [TypeTag],
    pub required: bool,
    pub default: Value,
    pub if_no_prop_create: bool,
    pub replace: Option<&'m Replace>,
    pub model: Option<&'m NestedModel>,
    pub validate_before_replace: Option<&'m Validator>,
    pub validator: Option<&'m Validator>,
    pub messages: MessageMap,
}

/// Normalize the node declared under `key`. `inherited` is the create
/// policy of the options or the enclosing field.
pub(crate) fn normalize<'m>(key: &Key, node: &'m ModelNode, inherited: bool) -> Canonical<'m> {
    match node {
        ModelNode::Types(types) => Canonical {
            target: Path::from(key.clone()),
            types,
            required: false,
            default: Value::Undefined,
            if_no_prop_create: inherited,
            replace: None,
            model: None,
            validate_before_replace: None,
            validator: None,
            messages: MessageMap::default(),
        },
        ModelNode::Descriptor(descriptor) => Canonical {
            target: descriptor
                .prop
                .clone()
                .unwrap_or_else(|| Path::from(key.clone())),
            types: &descriptor.types,
            required: descriptor.required.as_ref().is_some_and(Flag::resolve),
            default: descriptor
                .default
                .as_ref()
                .map(DefaultValue::resolve)
                .unwrap_or_default(),
            if_no_prop_create: descriptor.if_no_prop_create.unwrap_or(inherited),
            replace: descriptor.replace.as_ref(),
            model: descriptor.model.as_ref(),
            validate_before_replace: descriptor.validate_before_replace.as_ref(),
            validator: descriptor.validator.as_ref(),
            messages: descriptor
                .message
                .as_ref()
                .map(Message::resolve)
                .unwrap_or_default(),
        },
    }
}
