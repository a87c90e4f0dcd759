//! Errors raised by a check pass.

use std::fmt;
use std::sync::Arc;

use modelcheck_core::{CoreError, Path, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::{MessageEntry, MessageMap};
use crate::expr::ExpressionError;
use crate::types::{type_names, TypeTag};

/// Prefix of every message that was not supplied by the caller.
pub const PREFIX: &str = "[modelCheck] ";

/// Classification tag attached to every [`CheckError`].
pub const ERROR_KIND: &str = "model_check_error";

/// A caller-supplied error value.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// The pipeline stage a failure belongs to. Message maps are keyed by stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Type,
    Required,
    ValidateBeforeReplace,
    Validator,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Type => "type",
            Stage::Required => "required",
            Stage::ValidateBeforeReplace => "validateBeforeReplace",
            Stage::Validator => "validator",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone)]
pub enum CheckError {
    /// The payload is neither an object nor an ordered collection.
    #[error("{message}")]
    Assertion { message: String },

    #[error("{message}")]
    RequiredField { path: String, message: String },

    #[error("{message}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
        message: String,
    },

    #[error("{message}")]
    ValidationFailed {
        path: String,
        stage: Stage,
        message: String,
        cause: Option<SharedError>,
    },

    /// An error-valued message replaced the failure.
    #[error("{error}")]
    Custom { stage: Stage, error: SharedError },

    #[error("[modelCheck] invalid validator expression for {path}: {reason}")]
    InvalidExpression {
        path: String,
        #[source]
        reason: ExpressionError,
    },

    #[error("[modelCheck] {0}")]
    Path(#[from] CoreError),
}

/// Serializable classification of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub kind: &'static str,
}

impl CheckError {
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail { kind: ERROR_KIND }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            CheckError::RequiredField { .. } => Some(Stage::Required),
            CheckError::TypeMismatch { .. } => Some(Stage::Type),
            CheckError::ValidationFailed { stage, .. } | CheckError::Custom { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The path of the field that failed, when known.
    pub fn path(&self) -> Option<&str> {
        match self {
            CheckError::RequiredField { path, .. }
            | CheckError::TypeMismatch { path, .. }
            | CheckError::ValidationFailed { path, .. }
            | CheckError::InvalidExpression { path, .. } => Some(path),
            _ => None,
        }
    }

    pub(crate) fn payload_shape() -> Self {
        CheckError::Assertion {
            message: format!("{}payload Expected Object or Array", PREFIX),
        }
    }

    pub(crate) fn required(path: &Path, messages: &MessageMap) -> Self {
        let raw = format!("property {} is required", path);
        match compose(raw, Stage::Required, false, messages) {
            Composed::Text(message) => CheckError::RequiredField {
                path: path.to_string(),
                message,
            },
            Composed::Custom(error) => CheckError::Custom {
                stage: Stage::Required,
                error,
            },
        }
    }

    pub(crate) fn type_mismatch(path: &Path, value: &Value, types: &[TypeTag], messages: &MessageMap) -> Self {
        let expected = type_names(types);
        let raw = format!("[{} => {}] Expected {}", path, value.render(), expected);
        match compose(raw, Stage::Type, false, messages) {
            Composed::Text(message) => CheckError::TypeMismatch {
                path: path.to_string(),
                expected,
                actual: value.kind().to_string(),
                message,
            },
            Composed::Custom(error) => CheckError::Custom {
                stage: Stage::Type,
                error,
            },
        }
    }

    /// A failed validator. The validator's own error, when it returned one,
    /// supplies the message; neither form is prefixed.
    pub(crate) fn validation(path: &Path, stage: Stage, cause: Option<SharedError>, messages: &MessageMap) -> Self {
        let raw = match &cause {
            Some(error) => error.to_string(),
            None => format!("validate property {} failed", path),
        };
        match compose(raw, stage, true, messages) {
            Composed::Text(message) => CheckError::ValidationFailed {
                path: path.to_string(),
                stage,
                message,
                cause,
            },
            Composed::Custom(error) => CheckError::Custom { stage, error },
        }
    }
}

enum Composed {
    Text(String),
    Custom(SharedError),
}

/// Apply the caller's message for `stage` to a raw failure message.
fn compose(raw: String, stage: Stage, no_prefix: bool, messages: &MessageMap) -> Composed {
    match messages.lookup(stage) {
        Some(MessageEntry::Error(error)) => Composed::Custom(error.clone()),
        Some(MessageEntry::Text(text)) => Composed::Text(text.clone()),
        None if no_prefix => Composed::Text(raw),
        None => Composed::Text(format!("{}{}", PREFIX, raw)),
    }
}

/// A broken rule reported by a registry validator.
///
/// Displays as `message [rule]`, followed by whichever of the expected and
/// actual values are known.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleViolation {
    /// The rule that was violated, e.g. `minLength` or `pattern`.
    pub rule: String,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl RuleViolation {
    pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    pub fn min_length(min: usize, actual: usize) -> Self {
        Self::new("minLength", format!("length {} is less than minimum {}", actual, min))
            .with_expected(format!(">= {}", min))
            .with_actual(actual.to_string())
    }

    pub fn max_length(max: usize, actual: usize) -> Self {
        Self::new("maxLength", format!("length {} exceeds maximum {}", actual, max))
            .with_expected(format!("<= {}", max))
            .with_actual(actual.to_string())
    }

    pub fn pattern(pattern: &str, value: &str) -> Self {
        Self::new("pattern", format!("value does not match pattern: {}", pattern))
            .with_expected(pattern)
            .with_actual(value)
    }

    pub fn minimum(min: f64, actual: f64) -> Self {
        Self::new("minimum", format!("value {} is less than minimum {}", actual, min))
            .with_expected(format!(">= {}", min))
            .with_actual(actual.to_string())
    }

    pub fn maximum(max: f64, actual: f64) -> Self {
        Self::new("maximum", format!("value {} exceeds maximum {}", actual, max))
            .with_expected(format!("<= {}", max))
            .with_actual(actual.to_string())
    }

    pub fn invalid_enum(allowed: &[String], actual: &str) -> Self {
        Self::new(
            "enum",
            format!("invalid value {}, must be one of: {}", actual, allowed.join(", ")),
        )
        .with_expected(allowed.join(" | "))
        .with_actual(actual)
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.message, self.rule)?;
        match (&self.expected, &self.actual) {
            (Some(expected), Some(actual)) => write!(f, " (expected {}, got {})", expected, actual),
            (Some(expected), None) => write!(f, " (expected {})", expected),
            (None, Some(actual)) => write!(f, " (got {})", actual),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for RuleViolation {}
