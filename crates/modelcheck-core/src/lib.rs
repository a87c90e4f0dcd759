//! Data tree, namespace paths and the clone/merge engine behind `modelcheck`.
//!
//! - **[`Value`]**: a closed set of value kinds with insertion-ordered objects
//!   that keep "absent" and `null` apart
//! - **[`KeysRange`]**: which keys (names, symbols, hidden properties) a walk visits
//! - **[`Path`]**: dotted or segment-list addresses, with [`exists`], [`read`]
//!   and [`write`]
//! - **Merge engine**: [`deep_clone`], [`merge`], [`build_nested`] and [`project`]
//!
//! # Example
//!
//! ```rust
//! use modelcheck_core::{read, write, KeysRange, Path, Value};
//! use serde_json::json;
//!
//! let mut data = Value::from(json!({"a": {"b": 1}}));
//! write(&mut data, &Path::from("a.c"), Value::from(2), KeysRange::default()).unwrap();
//! assert_eq!(read(&data, &Path::from("a.c"), KeysRange::default()), Some(&Value::from(2)));
//! ```

pub mod error;
pub mod keys;
pub mod merge;
pub mod namespace;
pub mod value;

pub use error::CoreError;
pub use keys::KeysRange;
pub use merge::{build_nested, deep_clone, merge, project, MergeOptions, MergeStrategy};
pub use namespace::{exists, locate, read, write, Path, MAX_INDEX_GAP};
pub use value::{Callable, Class, Instance, Key, NativeFn, Object, Property, Symbol, Value, ValueKind};
