use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Template(#[from] stencil_match::Error),

    #[error("Duplicate token name: {0}")]
    DuplicateTokenName(String),

    #[error("Duplicate template: {group}.{name}")]
    DuplicateTemplate { group: String, name: String },

    #[error("Unknown token: {0}")]
    UnknownToken(String),

    #[error("Unknown template: {group}.{name}")]
    UnknownTemplate { group: String, name: String },

    #[error("Unknown token type '{kind}' for token '{token}'")]
    UnknownTokenType { token: String, kind: String },

    #[error("Unknown template type '{kind}' for template '{template}'")]
    UnknownTemplateKind { template: String, kind: String },

    #[error("Cyclic template reference: {chain}")]
    CyclicTemplateReference { chain: String },

    #[error("Invalid shorthand {input:?} at offset {offset}: {message}")]
    Shorthand {
        input: String,
        offset: usize,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
