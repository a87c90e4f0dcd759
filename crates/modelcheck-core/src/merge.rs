//! Copying, merging and projecting data trees.
//!
//! # Merge Semantics
//!
//! - **Shallow**: every visible key of a source overwrites the same key of
//!   the target with a copy of the source value.
//! - **Deep**: when both sides of a key are containers the merge recurses,
//!   otherwise the source value wins as in the shallow case.
//! - **Collections**: index keys address positions, so merging
//!   `{"0": x}` into a collection sets its first item, padding with
//!   `Undefined` when the index is past the end.
//!
//! Every copy goes through [`deep_clone`], so the result never shares
//! structure with a source.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::CoreError;
use crate::keys::KeysRange;
use crate::namespace::{child, locate, slot_mut, Path};
use crate::value::{Instance, Key, Object, Value};

/// How [`merge`] combines nested containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeStrategy {
    #[default]
    Shallow,
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOptions {
    pub keys_range: KeysRange,
    pub strategy: MergeStrategy,
}

impl MergeOptions {
    pub fn deep(keys_range: KeysRange) -> Self {
        Self {
            keys_range,
            strategy: MergeStrategy::Deep,
        }
    }

    pub fn shallow(keys_range: KeysRange) -> Self {
        Self {
            keys_range,
            strategy: MergeStrategy::Shallow,
        }
    }
}

/// Duplicate a tree, keeping only the properties visible under `range`.
///
/// Objects, instances and every collection kind are copied; leaves are
/// cloned. Instances keep their class.
pub fn deep_clone(value: &Value, range: KeysRange) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|item| deep_clone(item, range)).collect()),
        Value::Set(items) => Value::Set(items.iter().map(|item| deep_clone(item, range)).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (deep_clone(k, range), deep_clone(v, range)))
                .collect(),
        ),
        Value::Object(object) => Value::Object(clone_object(object, range)),
        Value::Instance(instance) => Value::Instance(Instance::new(
            instance.class().clone(),
            clone_object(&instance.fields, range),
        )),
        leaf => leaf.clone(),
    }
}

fn clone_object(object: &Object, range: KeysRange) -> Object {
    let mut copy = Object::new();
    for (key, property) in object.iter() {
        if range.admits(key, property.enumerable) {
            copy.define(key.clone(), deep_clone(&property.value, range), property.enumerable);
        }
    }
    copy
}

/// Merge `sources` into `target` in order; later sources take precedence.
///
/// Sources that are not containers contribute nothing, and a target that is
/// not a container is left untouched, as are keys a target collection
/// cannot hold. Fails when an index lies too far past the end of a target
/// collection.
pub fn merge<'a, I>(target: &mut Value, sources: I, options: MergeOptions) -> Result<(), CoreError>
where
    I: IntoIterator<Item = &'a Value>,
{
    for source in sources {
        merge_one(target, source, options)?;
    }
    Ok(())
}

fn merge_one(target: &mut Value, source: &Value, options: MergeOptions) -> Result<(), CoreError> {
    if !target.is_container() {
        trace!(found = %target.kind(), "merge target is not a container");
        return Ok(());
    }
    let range = options.keys_range;
    for key in range.keys_of(source) {
        if let Some(incoming) = child(source, &key, range) {
            merge_entry(target, &key, incoming, options)?;
        }
    }
    Ok(())
}

fn merge_entry(target: &mut Value, key: &Key, incoming: &Value, options: MergeOptions) -> Result<(), CoreError> {
    if options.strategy == MergeStrategy::Deep && incoming.is_container() {
        if let Some(existing) = child_mut(target, key) {
            if existing.is_container() {
                return merge_one(existing, incoming, options);
            }
        }
    }
    match slot_mut(target, key) {
        Ok(slot) => *slot = deep_clone(incoming, options.keys_range),
        Err(err @ CoreError::NotAContainer { .. }) => trace!(%key, %err, "skipping merge entry"),
        Err(err) => return Err(err),
    }
    Ok(())
}

fn child_mut<'a>(node: &'a mut Value, key: &Key) -> Option<&'a mut Value> {
    match node {
        Value::Array(items) => key.as_index().and_then(move |index| items.get_mut(index)),
        other => other.as_object_mut()?.get_mut(key),
    }
}

/// Build a single tree from `(path, value)` pairs.
///
/// Dotted paths are split on every `.` and each level is an object,
/// numeric segments included. Overlapping prefixes are deep-merged, so
/// `[("a.b", 1), ("a.c", 2)]` yields `{a: {b: 1, c: 2}}`.
pub fn build_nested<I, P>(pairs: I) -> Value
where
    I: IntoIterator<Item = (P, Value)>,
    P: Into<Path>,
{
    let mut root = Value::object();
    for (path, value) in pairs {
        let path: Path = path.into();
        let nested = path.split().into_iter().rev().fold(value, |inner, key| {
            let mut level = Object::new();
            level.insert(key, inner);
            Value::Object(level)
        });
        // every level is an object, so no index can be rejected
        if let Err(err) = merge_one(&mut root, &nested, MergeOptions::deep(KeysRange::All)) {
            trace!(%path, %err, "skipping nested pair");
        }
    }
    root
}

/// Copy only the listed paths of `source` into a fresh container.
///
/// Each container along a projected path mirrors the kind of the source
/// container it came from, so collection positions that are not projected
/// come out as `Undefined`. A path that does not exist is installed as
/// `Undefined`, except on a top-level collection. Fails when a missing path
/// names an index too far past the end of a projected collection.
pub fn project(source: &Value, paths: &[Path], range: KeysRange) -> Result<Value, CoreError> {
    let mut out = empty_like(source);
    for path in paths {
        match locate(source, path, range) {
            Some(segments) => skip_shape_mismatch(copy_along(source, &mut out, &segments, range))?,
            None if out.is_array() => {}
            None => skip_shape_mismatch(install_undefined(&mut out, &path.split()))?,
        }
    }
    Ok(out)
}

/// A path that runs through a scalar, or names a key a collection cannot
/// hold, projects nothing.
fn skip_shape_mismatch(result: Result<(), CoreError>) -> Result<(), CoreError> {
    match result {
        Err(err @ CoreError::NotAContainer { .. }) => {
            trace!(%err, "cannot project path");
            Ok(())
        }
        other => other,
    }
}

fn empty_like(value: &Value) -> Value {
    match value {
        Value::Array(_) => Value::array(),
        Value::Instance(instance) => Value::Instance(Instance::new(instance.class().clone(), Object::new())),
        _ => Value::object(),
    }
}

fn copy_along(source: &Value, out: &mut Value, segments: &[Key], range: KeysRange) -> Result<(), CoreError> {
    let Some((last, parents)) = segments.split_last() else {
        *out = deep_clone(source, range);
        return Ok(());
    };
    let mut src = source;
    let mut dst = out;
    for key in parents {
        let Some(next) = child(src, key, range) else {
            return Ok(());
        };
        let slot = slot_mut(dst, key)?;
        if !slot.is_container() {
            *slot = empty_like(next);
        }
        src = next;
        dst = slot;
    }
    if let Some(value) = child(src, last, range) {
        *slot_mut(dst, last)? = deep_clone(value, range);
    }
    Ok(())
}

fn install_undefined(out: &mut Value, segments: &[Key]) -> Result<(), CoreError> {
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };
    let mut node = out;
    for key in parents {
        node = slot_mut(node, key)?;
    }
    let slot = slot_mut(node, last)?;
    if !slot.is_container() {
        *slot = Value::Undefined;
    }
    Ok(())
}
