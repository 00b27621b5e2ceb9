//! Gradus type lattice.
//!
//! The vocabulary shared by the inference engine, the call-site contract
//! checker and the evaluation reporter:
//!
//! - [`ty`]: Core type representation (Ty, TyCon, TyVar, Lit, Record)
//! - [`sig`]: Method signatures with validated parameter ordering
//! - [`classes`]: The class table (hierarchy, declared methods, library flag)
//! - [`value`]: Runtime values and type membership
//! - [`parse`]: Parser for textual type descriptions
//! - [`error`]: Signature and parse errors

pub mod classes;
pub mod error;
pub mod parse;
pub mod sig;
pub mod ty;
pub mod value;

pub use classes::ClassTable;
pub use error::{ParseError, SignatureError};
pub use parse::{parse_method, parse_ty};
pub use sig::{MethodTy, Param};
pub use ty::{Field, Lit, Record, Ty, TyCon, TyVar};
pub use value::{Instantiation, Value};
