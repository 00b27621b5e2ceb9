//! Gradus inference engine.
//!
//! Resolves type variables carrying lower/upper bounds into solutions:
//!
//! - [`bounds`]: the bound store with propagation and transactional undo
//! - [`subtype`]: subtyping over the lattice, adding bounds to variables
//! - [`heuristics`]: ordered guessing rules for overly general candidates
//! - [`oracle`]: the similarity-oracle client contract
//! - [`extract`] / [`session`]: per-variable extraction and the
//!   fixed-point driver
//! - [`diagnostics`]: rendered constraint violations
//!
//! Bounds are populated by an external checking pass through
//! [`Session::ctx_mut`]; the session then extracts solutions on request.

pub mod bounds;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod heuristics;
pub mod oracle;
pub mod session;
pub mod subtype;

pub use bounds::{Bound, Direction, EditLog, InferCtx, SolutionSource, VarInfo, VarKind};
pub use config::{EngineConfig, OracleConfig};
pub use error::{BoundOrigin, ConstraintViolation, EngineError, OracleError};
pub use extract::is_overly_general;
pub use heuristics::{Guess, HeuristicRegistry, NamedRule, Rule, RuleCtx};
pub use oracle::{HttpOracle, OracleRequest, SimilarityOracle};
pub use session::{Entity, Extracted, MethodSolution, Session, Slot};
