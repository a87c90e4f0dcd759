//! Named validators callable from expressions.
//!
//! An entry receives the evaluated arguments of an `@name(...)` call, or
//! `[value, key]` for a bare `@name`. Entries that take a parameter return
//! [`Outcome::Defer`] when called with the parameter alone, so
//! `@min(3)` checks the field value against 3.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, NaiveDate, NaiveTime};
use modelcheck_core::{Path, Value};
use regex::Regex;

use crate::error::{RuleViolation, SharedError};

/// A validator closure over the field value and its path.
pub type ValidatorFn = Arc<dyn Fn(&Value, &Path) -> Outcome + Send + Sync>;

/// A registry entry.
pub type Entry = Arc<dyn Fn(&[Value]) -> Outcome + Send + Sync>;

/// Result of running a validator.
#[derive(Clone)]
pub enum Outcome {
    Pass,
    Fail,
    /// Failed with an error that becomes the failure message.
    Invalid(SharedError),
    /// A validator still waiting for the field value and key.
    Defer(ValidatorFn),
}

impl Outcome {
    pub fn invalid(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Outcome::Invalid(Arc::new(error))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Fail | Outcome::Invalid(_))
    }

    /// Run a deferred validator against the field. Other outcomes are
    /// already settled. A validator that defers again counts as a pass.
    pub fn settle(self, value: &Value, key: &Path) -> Outcome {
        match self {
            Outcome::Defer(validator) => match validator(value, key) {
                Outcome::Defer(_) => Outcome::Pass,
                settled => settled,
            },
            settled => settled,
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => f.write_str("Pass"),
            Outcome::Fail => f.write_str("Fail"),
            Outcome::Invalid(error) => f.debug_tuple("Invalid").field(&error.to_string()).finish(),
            Outcome::Defer(_) => f.write_str("Defer"),
        }
    }
}

impl From<bool> for Outcome {
    fn from(passed: bool) -> Self {
        if passed {
            Outcome::Pass
        } else {
            Outcome::Fail
        }
    }
}

impl From<()> for Outcome {
    fn from(_: ()) -> Self {
        Outcome::Pass
    }
}

impl<E> From<Result<(), E>> for Outcome
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Outcome::Pass,
            Err(error) => Outcome::invalid(error),
        }
    }
}

/// A table of named validators.
#[derive(Clone, Default)]
pub struct Registry {
    entries: HashMap<String, Entry>,
}

impl Registry {
    /// A registry with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in validators.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.insert("isInt", unary(is_int));
        registry.insert("isNumeric", unary(is_numeric));
        registry.insert("isPositiveNumber", unary(is_positive_number));
        registry.insert("isDate", unary(is_date));
        registry.insert("isDateTime", unary(is_date_time));
        registry.insert("isLooseDate", unary(is_loose_date));
        registry.insert("is", binary(|expected, value| (expected == value).into()));
        registry.insert("matches", binary(matches_pattern));
        registry.insert("oneOf", binary(one_of));
        registry.insert("min", binary(minimum));
        registry.insert("max", binary(maximum));
        registry.insert("minLength", binary(min_length));
        registry.insert("maxLength", binary(max_length));
        registry
    }

    /// The shared built-in registry, built on first use.
    pub fn global() -> Arc<Registry> {
        static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Registry::builtin())).clone()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, entry: F)
    where
        F: Fn(&[Value]) -> Outcome + Send + Sync + 'static,
    {
        self.insert(name, Arc::new(entry));
    }

    /// Builder form of [`Registry::register`].
    pub fn with<F>(mut self, name: impl Into<String>, entry: F) -> Self
    where
        F: Fn(&[Value]) -> Outcome + Send + Sync + 'static,
    {
        self.register(name, entry);
        self
    }

    fn insert(&mut self, name: impl Into<String>, entry: Entry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entry names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("entries", &self.names()).finish()
    }
}

fn unary(check: fn(&Value) -> bool) -> Entry {
    Arc::new(move |args: &[Value]| -> Outcome {
        match args.first() {
            Some(value) => check(value).into(),
            None => Outcome::Defer(Arc::new(move |value: &Value, _: &Path| -> Outcome {
                check(value).into()
            })),
        }
    })
}

fn binary(check: fn(&Value, &Value) -> Outcome) -> Entry {
    Arc::new(move |args: &[Value]| -> Outcome {
        match args {
            [param, value, ..] => check(param, value),
            [param] => {
                let param = param.clone();
                Outcome::Defer(Arc::new(move |value: &Value, _: &Path| -> Outcome {
                    check(&param, value)
                }))
            }
            [] => Outcome::invalid(RuleViolation::new("arity", "validator expects a parameter")),
        }
    })
}

fn numeric_text() -> &'static Regex {
    static NUMERIC: OnceLock<Regex> = OnceLock::new();
    NUMERIC.get_or_init(|| {
        Regex::new(r"^\s*[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?\s*$").expect("numeric pattern is valid")
    })
}

/// Numbers, and strings spelling a finite number.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) if n.is_finite() => Some(*n),
        Value::String(s) if numeric_text().is_match(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_numeric(value: &Value) -> bool {
    as_number(value).is_some()
}

fn is_int(value: &Value) -> bool {
    as_number(value).is_some_and(|n| n.fract() == 0.0)
}

fn is_positive_number(value: &Value) -> bool {
    as_number(value).is_some_and(|n| n > 0.0)
}

fn date_pattern() -> &'static Regex {
    static DATE: OnceLock<Regex> = OnceLock::new();
    DATE.get_or_init(|| {
        Regex::new(r"^(\d{4})([-/])(\d{1,2})([-/])(\d{1,2})(?: (\d{1,2}):(\d{1,2}):(\d{1,2}))?$")
            .expect("date pattern is valid")
    })
}

/// Parse `YYYY-MM-DD` or `YYYY/MM/DD`, optionally followed by `HH:MM:SS`.
/// Both separators must match and the date must exist on the calendar.
fn parse_date_text(text: &str, with_time: bool) -> bool {
    let Some(caps) = date_pattern().captures(text) else {
        return false;
    };
    if caps[2] != caps[4] || caps.get(6).is_some() != with_time {
        return false;
    }
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let date = match (caps[1].parse::<i32>().ok(), field(3), field(5)) {
        (Some(year), Some(month), Some(day)) => NaiveDate::from_ymd_opt(year, month, day),
        _ => None,
    };
    if date.is_none() {
        return false;
    }
    if !with_time {
        return true;
    }
    match (field(6), field(7), field(8)) {
        (Some(h), Some(m), Some(s)) => NaiveTime::from_hms_opt(h, m, s).is_some(),
        _ => false,
    }
}

fn is_date(value: &Value) -> bool {
    value.as_str().is_some_and(|text| parse_date_text(text, false))
}

fn is_date_time(value: &Value) -> bool {
    value.as_str().is_some_and(|text| parse_date_text(text, true))
}

/// Date values, and date, datetime or RFC 3339 strings.
fn is_loose_date(value: &Value) -> bool {
    match value {
        Value::Date(_) => true,
        Value::String(text) => {
            parse_date_text(text, false) || parse_date_text(text, true) || DateTime::parse_from_rfc3339(text).is_ok()
        }
        _ => false,
    }
}

fn matches_pattern(pattern: &Value, value: &Value) -> Outcome {
    let Some(pattern) = pattern.as_str() else {
        return Outcome::invalid(RuleViolation::new("pattern", "pattern must be a string"));
    };
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(_) => {
            return Outcome::invalid(RuleViolation::new(
                "pattern",
                format!("invalid regex pattern: {}", pattern),
            ))
        }
    };
    match value.as_str() {
        Some(text) if re.is_match(text) => Outcome::Pass,
        Some(text) => Outcome::invalid(RuleViolation::pattern(pattern, text)),
        None => Outcome::Fail,
    }
}

fn one_of(allowed: &Value, value: &Value) -> Outcome {
    let Some(allowed) = allowed.as_array() else {
        return Outcome::invalid(RuleViolation::new("enum", "allowed values must be a list"));
    };
    if allowed.contains(value) {
        return Outcome::Pass;
    }
    let names: Vec<String> = allowed.iter().map(Value::render).collect();
    Outcome::invalid(RuleViolation::invalid_enum(&names, &value.render()))
}

fn minimum(min: &Value, value: &Value) -> Outcome {
    match (as_number(min), value.as_f64()) {
        (Some(min), Some(actual)) if actual < min => Outcome::invalid(RuleViolation::minimum(min, actual)),
        (Some(_), Some(_)) => Outcome::Pass,
        _ => Outcome::Fail,
    }
}

fn maximum(max: &Value, value: &Value) -> Outcome {
    match (as_number(max), value.as_f64()) {
        (Some(max), Some(actual)) if actual > max => Outcome::invalid(RuleViolation::maximum(max, actual)),
        (Some(_), Some(_)) => Outcome::Pass,
        _ => Outcome::Fail,
    }
}

/// Character count of a string or item count of a collection.
fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) | Value::Set(items) => Some(items.len()),
        _ => None,
    }
}

fn min_length(min: &Value, value: &Value) -> Outcome {
    match (min.as_f64(), length(value)) {
        (Some(min), Some(actual)) if (actual as f64) < min => {
            Outcome::invalid(RuleViolation::min_length(min as usize, actual))
        }
        (Some(_), Some(_)) => Outcome::Pass,
        _ => Outcome::Fail,
    }
}

fn max_length(max: &Value, value: &Value) -> Outcome {
    match (max.as_f64(), length(value)) {
        (Some(max), Some(actual)) if (actual as f64) > max => {
            Outcome::invalid(RuleViolation::max_length(max as usize, actual))
        }
        (Some(_), Some(_)) => Outcome::Pass,
        _ => Outcome::Fail,
    }
}
