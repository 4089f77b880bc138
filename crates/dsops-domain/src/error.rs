use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("variable must set exactly one of 'literal' or 'from': {0}")]
    AmbiguousVariable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid transform '{0}': expected '<op>:<arg>'")]
    InvalidTransformSyntax(String),
}
