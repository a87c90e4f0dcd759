//! Type tags and the type check.

use std::fmt;

use modelcheck_core::{Class, Path, Value, ValueKind};

use crate::descriptor::MessageMap;
use crate::error::CheckError;

/// An accepted runtime type.
///
/// Built-in tags match one value kind exactly: a plain object is `Object`,
/// a collection is `Array`, and a class instance is neither. `User` tags
/// match instances of the class or any class derived from it.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeTag {
    Null,
    /// Matches only the absent value.
    Undefined,
    Number,
    Boolean,
    String,
    Symbol,
    Date,
    Object,
    Array,
    Set,
    Map,
    Function,
    User(Class),
}

impl TypeTag {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            TypeTag::User(class) => {
                matches!(value, Value::Instance(instance) if instance.is_instance_of(class))
            }
            builtin => builtin.kind() == Some(value.kind()),
        }
    }

    fn kind(&self) -> Option<ValueKind> {
        let kind = match self {
            TypeTag::Null => ValueKind::Null,
            TypeTag::Undefined => ValueKind::Undefined,
            TypeTag::Number => ValueKind::Number,
            TypeTag::Boolean => ValueKind::Boolean,
            TypeTag::String => ValueKind::String,
            TypeTag::Symbol => ValueKind::Symbol,
            TypeTag::Date => ValueKind::Date,
            TypeTag::Object => ValueKind::Object,
            TypeTag::Array => ValueKind::Array,
            TypeTag::Set => ValueKind::Set,
            TypeTag::Map => ValueKind::Map,
            TypeTag::Function => ValueKind::Function,
            TypeTag::User(_) => return None,
        };
        Some(kind)
    }

    pub fn name(&self) -> &str {
        match self {
            TypeTag::User(class) => class.name(),
            builtin => builtin.kind().map(ValueKind::name).unwrap_or_default(),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Class> for TypeTag {
    fn from(class: Class) -> Self {
        TypeTag::User(class)
    }
}

impl From<&Class> for TypeTag {
    fn from(class: &Class) -> Self {
        TypeTag::User(class.clone())
    }
}

/// Whether `value` satisfies the accepted tags. An empty list accepts
/// anything and `null` satisfies every list.
pub fn accepts(types: &[TypeTag], value: &Value) -> bool {
    types.is_empty() || value.is_null() || types.iter().any(|tag| tag.matches(value))
}

/// Comma-joined tag names, as used in type-mismatch messages.
pub fn type_names(types: &[TypeTag]) -> String {
    types.iter().map(TypeTag::name).collect::<Vec<_>>().join(",")
}

/// Check `value` at `path` against `types`, failing with the standard
/// type-mismatch error.
pub fn type_check(path: &Path, value: &Value, types: &[TypeTag]) -> Result<(), CheckError> {
    if accepts(types, value) {
        Ok(())
    } else {
        Err(CheckError::type_mismatch(path, value, types, &MessageMap::default()))
    }
}
