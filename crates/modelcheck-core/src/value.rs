//! The dynamic data tree checked against models.
//!
//! [`Value`] is a closed set of value kinds. Objects keep insertion order and
//! distinguish a key that is present with [`Value::Undefined`] from a key
//! that is missing altogether, so "absent" and `null` never collapse into
//! each other.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;

use crate::keys::KeysRange;

/// A node of the data tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// The absent marker. Stored explicitly when a key exists without a value.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Symbol(Symbol),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
    Object(Object),
    /// Unique-element collection, kept in insertion order.
    Set(Vec<Value>),
    /// Key-value collection with arbitrary keys, kept in insertion order.
    Map(Vec<(Value, Value)>),
    Function(Callable),
    /// An object created by a user-defined [`Class`].
    Instance(Instance),
}

/// Runtime kind of a [`Value`], one per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Symbol,
    Date,
    Array,
    Object,
    Set,
    Map,
    Function,
    Instance,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Undefined => "undefined",
            ValueKind::Null => "null",
            ValueKind::Boolean => "Boolean",
            ValueKind::Number => "Number",
            ValueKind::String => "String",
            ValueKind::Symbol => "Symbol",
            ValueKind::Date => "Date",
            ValueKind::Array => "Array",
            ValueKind::Object => "Object",
            ValueKind::Set => "Set",
            ValueKind::Map => "Map",
            ValueKind::Function => "Function",
            ValueKind::Instance => "Instance",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// An empty object.
    pub fn object() -> Self {
        Value::Object(Object::new())
    }

    /// An empty ordered collection.
    pub fn array() -> Self {
        Value::Array(Vec::new())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Symbol(_) => ValueKind::Symbol,
            Value::Date(_) => ValueKind::Date,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
            Value::Set(_) => ValueKind::Set,
            Value::Map(_) => ValueKind::Map,
            Value::Function(_) => ValueKind::Function,
            Value::Instance(_) => ValueKind::Instance,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// True for plain objects and class instances, the values that carry
    /// named properties.
    pub fn is_object_like(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Instance(_))
    }

    /// True for values a namespace path can descend into.
    pub fn is_container(&self) -> bool {
        self.is_object_like() || self.is_array()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The property map of an object or an instance.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            Value::Instance(instance) => Some(&instance.fields),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(object) => Some(object),
            Value::Instance(instance) => Some(&mut instance.fields),
            _ => None,
        }
    }

    /// Index into an object property by name, returning `Undefined` when
    /// missing. Convenient for tests and diagnostics.
    pub fn get(&self, name: &str) -> &Value {
        static UNDEFINED: Value = Value::Undefined;
        self.as_object()
            .and_then(|object| object.get(&Key::from(name)))
            .unwrap_or(&UNDEFINED)
    }

    /// Convert into a JSON value the way `JSON.stringify` would: properties
    /// holding `undefined`, symbols or functions are skipped, and inside
    /// collections those become `null`. Returns `None` when the value itself
    /// has no JSON form.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value as Json;

        match self {
            Value::Undefined | Value::Symbol(_) | Value::Function(_) => None,
            Value::Null => Some(Json::Null),
            Value::Bool(b) => Some(Json::Bool(*b)),
            Value::Number(n) => Some(number_to_json(*n)),
            Value::String(s) => Some(Json::String(s.clone())),
            Value::Date(date) => Some(Json::String(
                date.to_rfc3339_opts(SecondsFormat::Millis, true),
            )),
            Value::Array(items) => Some(Json::Array(
                items
                    .iter()
                    .map(|item| item.to_json().unwrap_or(Json::Null))
                    .collect(),
            )),
            Value::Set(_) | Value::Map(_) => Some(Json::Object(serde_json::Map::new())),
            Value::Object(_) | Value::Instance(_) => {
                let mut map = serde_json::Map::new();
                if let Some(object) = self.as_object() {
                    for (key, property) in object.iter() {
                        if !property.enumerable {
                            continue;
                        }
                        if let (Key::Name(name), Some(json)) = (key, property.value.to_json()) {
                            map.insert(name.clone(), json);
                        }
                    }
                }
                Some(Json::Object(map))
            }
        }
    }

    /// Render for diagnostics; values without a JSON form render as
    /// `undefined`.
    pub fn render(&self) -> String {
        self.to_json()
            .map(|json| json.to_string())
            .unwrap_or_else(|| "undefined".to_string())
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Object(map.into_iter().collect()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(date: DateTime<Utc>) -> Self {
        Value::Date(date)
    }
}

impl From<Symbol> for Value {
    fn from(symbol: Symbol) -> Self {
        Value::Symbol(symbol)
    }
}

impl From<Callable> for Value {
    fn from(callable: Callable) -> Self {
        Value::Function(callable)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Instance(instance)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A unique symbolic token. Two symbols are equal only if they are the same
/// token, regardless of description.
#[derive(Clone)]
pub struct Symbol(Arc<Option<String>>);

impl Symbol {
    pub fn new(description: impl Into<String>) -> Self {
        Self(Arc::new(Some(description.into())))
    }

    pub fn anonymous() -> Self {
        Self(Arc::new(None))
    }

    pub fn description(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or_default())
    }
}

/// A property key: a name or a symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Name(String),
    Symbol(Symbol),
}

impl Key {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(name) => Some(name),
            Key::Symbol(_) => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Key::Symbol(_))
    }

    /// The collection index this key addresses, if it is a canonical
    /// non-negative integer.
    pub fn as_index(&self) -> Option<usize> {
        let name = self.as_name()?;
        if name.is_empty() || (name.len() > 1 && name.starts_with('0')) {
            return None;
        }
        if !name.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        name.parse().ok()
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Name(index.to_string())
    }
}

impl From<Symbol> for Key {
    fn from(symbol: Symbol) -> Self {
        Key::Symbol(symbol)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Symbol(symbol) => write!(f, "{}", symbol),
        }
    }
}

/// An object property and its enumerability.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub value: Value,
    pub enumerable: bool,
}

/// An insertion-ordered property map.
///
/// Equality compares properties as a map: key order does not matter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Object {
    props: IndexMap<Key, Property>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a property. New properties are enumerable; an existing
    /// property keeps its enumerability.
    pub fn insert(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        if let Some(property) = self.props.get_mut(&key) {
            return Some(std::mem::replace(&mut property.value, value));
        }
        self.props.insert(
            key,
            Property {
                value,
                enumerable: true,
            },
        );
        None
    }

    /// Define a property with explicit enumerability.
    pub fn define(&mut self, key: impl Into<Key>, value: impl Into<Value>, enumerable: bool) {
        self.props.insert(
            key.into(),
            Property {
                value: value.into(),
                enumerable,
            },
        );
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.props.get(key).map(|property| &property.value)
    }

    pub fn get_mut(&mut self, key: &Key) -> Option<&mut Value> {
        self.props.get_mut(key).map(|property| &mut property.value)
    }

    pub fn property(&self, key: &Key) -> Option<&Property> {
        self.props.get(key)
    }

    /// The value slot for `key`, inserting `Undefined` when missing.
    pub fn entry(&mut self, key: Key) -> &mut Value {
        &mut self
            .props
            .entry(key)
            .or_insert(Property {
                value: Value::Undefined,
                enumerable: true,
            })
            .value
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.props.contains_key(key)
    }

    /// Remove a property, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &Key) -> Option<Value> {
        self.props.shift_remove(key).map(|property| property.value)
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Property)> {
        self.props.iter()
    }

    /// Keys visible under the given enumeration policy, in insertion order.
    pub fn keys(&self, range: KeysRange) -> Vec<Key> {
        self.props
            .iter()
            .filter(|(key, property)| range.admits(key, property.enumerable))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl<K: Into<Key>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

/// Signature of a callable value.
pub type NativeFn = dyn Fn(&[Value]) -> Value + Send + Sync;

/// A callable value. Equality is identity.
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    func: Arc<NativeFn>,
}

impl Callable {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.func)(args)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function {}]", self.name)
    }
}

/// A user-defined constructor. Classes form single-inheritance chains and
/// compare by identity.
#[derive(Clone)]
pub struct Class(Arc<ClassInfo>);

struct ClassInfo {
    name: String,
    parent: Option<Class>,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::new(ClassInfo {
            name: name.into(),
            parent: None,
        }))
    }

    /// A class deriving from `parent`.
    pub fn extends(name: impl Into<String>, parent: &Class) -> Self {
        Self(Arc::new(ClassInfo {
            name: name.into(),
            parent: Some(parent.clone()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&Class> {
        self.0.parent.as_ref()
    }

    /// True if `self` is `ancestor` or derives from it.
    pub fn is_subclass_of(&self, ancestor: &Class) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class == ancestor {
                return true;
            }
            current = class.parent();
        }
        false
    }

    /// Create an instance of this class with the given fields.
    pub fn instantiate(&self, fields: Object) -> Value {
        Value::Instance(Instance::new(self.clone(), fields))
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[class {}]", self.name())
    }
}

/// An object constructed by a [`Class`].
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    class: Class,
    pub fields: Object,
}

impl Instance {
    pub fn new(class: Class, fields: Object) -> Self {
        Self { class, fields }
    }

    pub fn class(&self) -> &Class {
        &self.class
    }

    pub fn is_instance_of(&self, class: &Class) -> bool {
        self.class.is_subclass_of(class)
    }
}
