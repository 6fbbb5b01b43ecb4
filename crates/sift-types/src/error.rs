use thiserror::Error;

/// Errors produced when constructing document keys.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("namespace must not be empty")]
    EmptyNamespace,

    #[error("document id must not be empty")]
    EmptyId,
}
