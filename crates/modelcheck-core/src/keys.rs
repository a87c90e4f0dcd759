//! Key-enumeration policies.
//!
//! Every walk over a model or a payload container goes through a
//! [`KeysRange`], which decides whether symbol keys and non-enumerable
//! properties take part.

use serde::{Deserialize, Serialize};

use crate::value::{Key, Value};

/// Which property keys are visited when enumerating a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeysRange {
    /// Enumerable name keys.
    Keys,
    /// Name keys, enumerable or not.
    Names,
    /// Enumerable symbol keys.
    SymbolKeys,
    /// Symbol keys, enumerable or not.
    Symbols,
    /// Enumerable keys of either kind.
    #[default]
    Enumerable,
    /// Every key.
    All,
}

impl KeysRange {
    /// Whether a property with this key and enumerability is visible.
    pub fn admits(self, key: &Key, enumerable: bool) -> bool {
        let symbol = key.is_symbol();
        match self {
            KeysRange::Keys => !symbol && enumerable,
            KeysRange::Names => !symbol,
            KeysRange::SymbolKeys => symbol && enumerable,
            KeysRange::Symbols => symbol,
            KeysRange::Enumerable => enumerable,
            KeysRange::All => true,
        }
    }

    /// Visible keys of a container. Collection positions are enumerable
    /// name keys (`"0"`, `"1"`, ...). Non-containers have no keys.
    pub fn keys_of(self, value: &Value) -> Vec<Key> {
        match value {
            Value::Array(items) => {
                if self.admits(&Key::Name(String::new()), true) {
                    (0..items.len()).map(Key::from).collect()
                } else {
                    Vec::new()
                }
            }
            other => other
                .as_object()
                .map(|object| object.keys(self))
                .unwrap_or_default(),
        }
    }
}
