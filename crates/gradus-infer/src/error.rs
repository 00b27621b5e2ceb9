//! Errors and bound provenance for the inference engine.
//!
//! Every bound carries a `BoundOrigin` recording where it came from, so a
//! violation can point at both of the conflicting sources.

use std::fmt;

use rowan::TextRange;
use thiserror::Error;

use gradus_types::{SignatureError, Ty, TyVar};

/// Where a bound was introduced.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BoundOrigin {
    /// From a type annotation on the declaration.
    Annotation { span: TextRange },
    /// From a call: the argument at `arg_idx` of the call at `call_site`.
    Call { call_site: TextRange, arg_idx: usize },
    /// From a returned expression.
    Return { span: TextRange },
    /// From an assignment to a variable.
    Assignment { span: TextRange },
    /// Added while extracting a solution (heuristic, oracle or fallback).
    Solution,
    /// Synthetic bounds from the built-in catalogue.
    Builtin,
}

impl BoundOrigin {
    /// The source span, if the bound came from source code.
    pub fn span(&self) -> Option<TextRange> {
        match self {
            BoundOrigin::Annotation { span }
            | BoundOrigin::Return { span }
            | BoundOrigin::Assignment { span } => Some(*span),
            BoundOrigin::Call { call_site, .. } => Some(*call_site),
            BoundOrigin::Solution | BoundOrigin::Builtin => None,
        }
    }
}

impl fmt::Display for BoundOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundOrigin::Annotation { .. } => write!(f, "annotation"),
            BoundOrigin::Call { arg_idx, .. } => write!(f, "argument {} of a call", arg_idx + 1),
            BoundOrigin::Return { .. } => write!(f, "returned value"),
            BoundOrigin::Assignment { .. } => write!(f, "assignment"),
            BoundOrigin::Solution => write!(f, "extracted solution"),
            BoundOrigin::Builtin => write!(f, "built-in"),
        }
    }
}

/// A bound that contradicts a bound already on the variable: `lower` is
/// not a subtype of `upper`.
///
/// `origin` is the provenance of the bound whose insertion failed;
/// `conflicting` is the provenance of the bound it was checked against.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("?{}: {lower} is not a subtype of {upper}", .var.0)]
pub struct ConstraintViolation {
    pub var: TyVar,
    pub lower: Ty,
    pub upper: Ty,
    pub origin: BoundOrigin,
    pub conflicting: BoundOrigin,
}

/// The similarity oracle could not produce an answer.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Transport(String),
    #[error("oracle response could not be decoded: {0}")]
    Decode(String),
    #[error("oracle session is not open")]
    NotOpen,
}

/// Errors surfaced by a `Session`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    ConstraintViolation(#[from] ConstraintViolation),
    #[error("malformed signature: {0}")]
    MalformedSignature(#[from] SignatureError),
    #[error("expected a type variable for {name}, found `{found}`")]
    UnexpectedVariableForm { name: String, found: Ty },
    #[error("similarity oracle unavailable: {0}")]
    OracleUnavailable(#[from] OracleError),
    #[error("invalid engine configuration: {0}")]
    Config(String),
}
