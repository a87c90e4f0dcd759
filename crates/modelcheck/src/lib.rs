//! Validate and prune nested data against declarative models.
//!
//! A [`Model`] declares, per field, the accepted types, whether the field is
//! required, a default, a replacement, validators and a nested model for
//! objects or collection items. [`check`] runs every declared field through
//! the same pipeline:
//!
//! 1. create the field from its default when missing and creation is on
//! 2. fail when a required field is missing
//! 3. read the value, falling back to the default
//! 4. run `validate_before_replace`, then apply `replace`
//! 5. check the type, then run `validator`
//! 6. descend into the nested model
//! 7. write the value back
//!
//! and by default returns only the declared fields. The first failure stops
//! the pass with a [`CheckError`].
//!
//! # Example
//!
//! ```rust
//! use modelcheck::{check, CheckOptions, Descriptor, Model, TypeTag, Value};
//! use serde_json::json;
//!
//! let model = Model::new()
//!     .field("id", Descriptor::new().ty(TypeTag::String).required(true))
//!     .field("area", Descriptor::new().validator("@isPositiveNumber").message("area must be positive"));
//!
//! let mut payload = Value::from(json!({"id": "a1", "area": "-100.23"}));
//! let err = check(&mut payload, &model, &CheckOptions::default()).unwrap_err();
//! assert_eq!(err.to_string(), "area must be positive");
//! ```

pub mod check;
pub mod descriptor;
pub mod error;
pub mod expr;
pub mod options;
pub mod registry;
pub mod types;

pub use check::{check, Checker};
pub use descriptor::{
    Callback, DefaultValue, Descriptor, Flag, Message, MessageEntry, MessageMap, Model, ModelField, ModelNode,
    NestedModel, Remove, Replace, Validator,
};
pub use error::{CheckError, ErrorDetail, RuleViolation, SharedError, Stage, ERROR_KIND, PREFIX};
pub use expr::{Arg, ExpressionError, Invocation};
pub use options::CheckOptions;
pub use registry::{Entry, Outcome, Registry, ValidatorFn};
pub use types::{accepts, type_check, TypeTag};

pub use modelcheck_core::{
    Callable, Class, CoreError, Instance, Key, KeysRange, Object, Path, Property, Symbol, Value, ValueKind,
};

/// Version of this crate, for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
