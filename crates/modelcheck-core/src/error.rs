use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The value cannot hold `segment`: a scalar, or a collection given a
    /// key that is not an index.
    #[error("Cannot set '{segment}' on a {found} value")]
    NotAContainer { segment: String, found: &'static str },

    /// An index too far past the end of a collection to pad up to.
    #[error("Invalid collection index '{0}'")]
    InvalidIndex(String),
}
