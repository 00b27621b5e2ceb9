//! Errors raised while building types and signatures.

use thiserror::Error;

use crate::ty::Ty;

/// A signature whose parameter components are in an invalid order.
///
/// `position` is the zero-based index of the offending component.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("optional arguments not allowed after varargs (component {position})")]
    OptionalAfterVararg { position: usize },
    #[error("optional arguments not allowed after named arguments (component {position})")]
    OptionalAfterKeywords { position: usize },
    #[error("multiple varargs not allowed (component {position})")]
    MultipleVarargs { position: usize },
    #[error("varargs not allowed after named arguments (component {position})")]
    VarargAfterKeywords { position: usize },
    #[error("only one set of named arguments allowed (component {position})")]
    MultipleKeywords { position: usize },
    #[error("required arguments not allowed after varargs (component {position})")]
    RequiredAfterVararg { position: usize },
    #[error("required arguments not allowed after named arguments (component {position})")]
    RequiredAfterKeywords { position: usize },
    #[error("block must be a method type, found `{found}`")]
    InvalidBlock { found: Ty },
}

/// A type description that could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message} at offset {pos}")]
pub struct ParseError {
    pub pos: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(pos: usize, message: impl Into<String>) -> Self {
        ParseError {
            pos,
            message: message.into(),
        }
    }
}
