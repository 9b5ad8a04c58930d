use crate::debug::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot build token '{token}': {reason}")]
    ConflictingTokenSpec { token: String, reason: String },

    #[error("cannot build token '{token}': {reason}")]
    InvalidTokenSpec { token: String, reason: String },

    #[error("invalid pattern for '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Missing required token '{token}' for template '{template}'")]
    MissingField { template: String, token: String },

    #[error("Value {value:?} ({got}) does not match token '{token}': expected {expected}")]
    TypeMismatch {
        token: String,
        expected: String,
        got: &'static str,
        value: String,
    },

    #[error("Value as string '{text}' does not match token '{token}': {description}")]
    ConstraintViolation {
        token: String,
        text: String,
        description: String,
    },

    #[error("String '{text}' does not match {expected} token '{token}'")]
    Conversion {
        token: String,
        text: String,
        expected: String,
    },

    #[error("String '{input}' doesn't match template '{template}:{pattern}'")]
    Parse {
        template: String,
        pattern: String,
        input: String,
    },

    #[error("Mismatched values for token {{{token}}}: {first} != {second}")]
    InconsistentRepeatedToken {
        token: String,
        first: String,
        second: String,
    },

    #[error("{0}")]
    Diagnostic(Box<Diagnostic>),

    #[error("invalid wildcard pattern: {0}")]
    InvalidWildcard(#[from] glob::PatternError),
}

pub type Result<T> = std::result::Result<T, Error>;
