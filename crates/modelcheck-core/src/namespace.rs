//! Namespace paths into nested data.
//!
//! A [`Path`] is either a dotted string or an explicit list of segments.
//! Segment lists are exact: each segment is one key. Dotted strings are
//! matched against the keys actually present, scanning each container's
//! keys in enumeration order:
//!
//! - a key equal to the remaining path matches it as a whole,
//! - a key followed by `.` that prefixes the remaining path is descended into,
//!
//! and the first match found wins. A key that itself contains a dot (say
//! `"a.b"`) is therefore reachable through a dotted path, and which location
//! `"a.b.c"` resolves to depends on the order the keys were defined in. Use
//! [`Path::segments`] whenever that matters.
//!
//! Positions of ordered collections are addressed by canonical decimal
//! indices (`"0"`, `"1"`, ...).

use std::fmt;

use tracing::trace;

use crate::error::CoreError;
use crate::keys::KeysRange;
use crate::value::{Key, Value};

/// A location inside a data tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Path {
    /// `a.b.c`, resolved against the keys present (see module docs).
    Dotted(String),
    /// One key per level.
    Segments(Vec<Key>),
}

impl Path {
    pub fn dotted(path: impl Into<String>) -> Self {
        Path::Dotted(path.into())
    }

    pub fn segments<I, K>(segments: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Path::Segments(segments.into_iter().map(Into::into).collect())
    }

    /// Path to a single collection position.
    pub fn index(index: usize) -> Self {
        Path::Segments(vec![Key::from(index)])
    }

    /// The segments this path names when nothing exists yet to resolve it
    /// against: dotted strings split on every `.`.
    pub fn split(&self) -> Vec<Key> {
        match self {
            Path::Dotted(path) => path.split('.').map(Key::from).collect(),
            Path::Segments(segments) => segments.clone(),
        }
    }

    /// The collection index when the path is a single index segment.
    pub fn as_index(&self) -> Option<usize> {
        match self.split().as_slice() {
            [single] => single.as_index(),
            _ => None,
        }
    }
}

impl From<&str> for Path {
    fn from(path: &str) -> Self {
        Path::Dotted(path.to_string())
    }
}

impl From<String> for Path {
    fn from(path: String) -> Self {
        Path::Dotted(path)
    }
}

impl From<Key> for Path {
    fn from(key: Key) -> Self {
        match key {
            Key::Name(name) => Path::Dotted(name),
            symbol => Path::Segments(vec![symbol]),
        }
    }
}

impl From<Vec<Key>> for Path {
    fn from(segments: Vec<Key>) -> Self {
        Path::Segments(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Dotted(path) => f.write_str(path),
            Path::Segments(segments) => {
                for (i, segment) in segments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    write!(f, "{}", segment)?;
                }
                Ok(())
            }
        }
    }
}

/// The visible child of a container under `key`.
pub fn child<'a>(node: &'a Value, key: &Key, range: KeysRange) -> Option<&'a Value> {
    match node {
        Value::Array(items) => {
            if !range.admits(key, true) {
                return None;
            }
            key.as_index().and_then(|index| items.get(index))
        }
        other => {
            let property = other.as_object()?.property(key)?;
            range
                .admits(key, property.enumerable)
                .then_some(&property.value)
        }
    }
}

/// Resolve `path` to the concrete keys of an existing location.
///
/// Returns `None` when any segment is missing. A final key that is present
/// with an `Undefined` value still resolves.
pub fn locate(root: &Value, path: &Path, range: KeysRange) -> Option<Vec<Key>> {
    match path {
        Path::Segments(segments) => {
            let mut node = root;
            for segment in segments {
                node = child(node, segment, range)?;
            }
            Some(segments.clone())
        }
        Path::Dotted(path) => {
            let mut trail = Vec::new();
            locate_dotted(root, path, range, &mut trail).then_some(trail)
        }
    }
}

fn locate_dotted(node: &Value, rest: &str, range: KeysRange, trail: &mut Vec<Key>) -> bool {
    for key in range.keys_of(node) {
        let Some(name) = key.as_name() else {
            continue;
        };
        if name == rest {
            trail.push(key);
            return true;
        }
        let Some(tail) = rest.strip_prefix(name).and_then(|t| t.strip_prefix('.')) else {
            continue;
        };
        if let Some(next) = child(node, &key, range) {
            trail.push(key.clone());
            if locate_dotted(next, tail, range, trail) {
                return true;
            }
            trail.pop();
        }
    }
    false
}

/// Whether every segment of `path` is present.
pub fn exists(root: &Value, path: &Path, range: KeysRange) -> bool {
    locate(root, path, range).is_some()
}

/// The value at `path`, or `None` when the location is absent.
pub fn read<'a>(root: &'a Value, path: &Path, range: KeysRange) -> Option<&'a Value> {
    let segments = locate(root, path, range)?;
    let mut node = root;
    for segment in &segments {
        node = child(node, segment, range)?;
    }
    Some(node)
}

/// Set the value at `path`, creating missing intermediate objects.
///
/// An existing location is overwritten in place. A missing one is created
/// from [`Path::split`], except when `root` is itself an ordered collection:
/// collections are never reinterpreted as key-value mappings, so that write
/// is skipped. Returns whether anything was written.
pub fn write(root: &mut Value, path: &Path, value: Value, range: KeysRange) -> Result<bool, CoreError> {
    let segments = match locate(root, path, range) {
        Some(segments) => segments,
        None if root.is_array() => {
            trace!(%path, "skipping autocreate on a top-level collection");
            return Ok(false);
        }
        None => path.split(),
    };
    let Some((last, parents)) = segments.split_last() else {
        return Ok(false);
    };
    let mut node = root;
    for segment in parents {
        node = slot_mut(node, segment)?;
    }
    *slot_mut(node, last)? = value;
    Ok(true)
}

/// How far past the end of a collection a write may pad.
pub const MAX_INDEX_GAP: usize = 1024;

/// The mutable slot for `key` inside `node`, creating it when missing.
///
/// An `Undefined` node becomes an empty object first. Collections grow with
/// `Undefined` padding up to the requested index, at most
/// [`MAX_INDEX_GAP`] positions past the end.
pub fn slot_mut<'a>(node: &'a mut Value, key: &Key) -> Result<&'a mut Value, CoreError> {
    if node.is_undefined() {
        *node = Value::object();
    }
    match node {
        Value::Array(items) => {
            let Some(index) = key.as_index() else {
                return Err(CoreError::NotAContainer {
                    segment: key.to_string(),
                    found: "Array",
                });
            };
            if index.saturating_sub(items.len()) > MAX_INDEX_GAP {
                return Err(CoreError::InvalidIndex(key.to_string()));
            }
            if index >= items.len() {
                items.resize(index + 1, Value::Undefined);
            }
            Ok(&mut items[index])
        }
        Value::Object(object) => Ok(object.entry(key.clone())),
        Value::Instance(instance) => Ok(instance.fields.entry(key.clone())),
        other => Err(CoreError::NotAContainer {
            segment: key.to_string(),
            found: other.kind().name(),
        }),
    }
}
