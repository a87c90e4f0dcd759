//! Options for a check pass.

use modelcheck_core::KeysRange;
use serde::{Deserialize, Serialize};

/// How a check pass treats the payload.
///
/// Deserializes from camelCase keys, with every key optional:
///
/// ```rust
/// use modelcheck::CheckOptions;
///
/// let options: CheckOptions = serde_json::from_str(r#"{"cloneData": false}"#).unwrap();
/// assert!(!options.clone_data);
/// assert!(options.only_model_descriptors);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckOptions {
    /// Keep only the declared fields in the result.
    #[serde(alias = "onlyModelDesciprtors")]
    pub only_model_descriptors: bool,
    /// Work on a copy and leave the payload untouched. When false the
    /// payload is updated in place.
    pub clone_data: bool,
    /// Which keys of the model and the payload take part.
    pub keys_range: KeysRange,
    /// Create missing fields from their defaults. Descriptors can override
    /// it and nested models inherit it.
    pub if_no_prop_create: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            only_model_descriptors: true,
            clone_data: true,
            keys_range: KeysRange::Enumerable,
            if_no_prop_create: false,
        }
    }
}

impl CheckOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_only_model_descriptors(mut self, only: bool) -> Self {
        self.only_model_descriptors = only;
        self
    }

    pub fn with_clone_data(mut self, clone: bool) -> Self {
        self.clone_data = clone;
        self
    }

    pub fn with_keys_range(mut self, range: KeysRange) -> Self {
        self.keys_range = range;
        self
    }

    pub fn with_if_no_prop_create(mut self, create: bool) -> Self {
        self.if_no_prop_create = create;
        self
    }
}
