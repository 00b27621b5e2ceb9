//! Gradus call-site contracts.
//!
//! Checks concrete calls against declared method signatures:
//!
//! - [`matcher`]: argument-pattern matching for one signature, plus the
//!   result check
//! - [`violation`]: rendered violations listing every alternative
//!
//! A method may declare several alternative signatures (an intersection of
//! method types). [`check_call`] accepts a call when at least one
//! alternative matches and remembers which ones did; [`check_result`] then
//! only consults those alternatives for the result.

pub mod matcher;
pub mod violation;

use tracing::debug;

use gradus_types::{ClassTable, Instantiation, MethodTy, Value};

pub use matcher::{matches_call, matches_result};
pub use violation::ContractViolation;

/// Check a call against every alternative. Returns the indices of the
/// alternatives that accept it, or a violation when none does.
pub fn check_call(
    method: Option<&str>,
    alternatives: &[MethodTy],
    inst: &Instantiation,
    args: &[Value],
    block: Option<&Value>,
    classes: &ClassTable,
) -> Result<Vec<usize>, ContractViolation> {
    let matched: Vec<usize> = alternatives
        .iter()
        .enumerate()
        .filter(|(_, sig)| matches_call(sig, inst, args, block, classes))
        .map(|(i, _)| i)
        .collect();
    if !matched.is_empty() {
        return Ok(matched);
    }
    debug!(method = method.unwrap_or("<anonymous>"), "argument contract violated");
    Err(ContractViolation::Arguments {
        method: method.map(str::to_string),
        alternatives: alternatives.to_vec(),
        args: args.to_vec(),
        block: block.cloned(),
    })
}

/// Check a result against the alternatives that accepted the call.
pub fn check_result(
    method: Option<&str>,
    alternatives: &[MethodTy],
    matched: &[usize],
    inst: &Instantiation,
    ret: &Value,
    classes: &ClassTable,
) -> Result<(), ContractViolation> {
    let accepted = matched
        .iter()
        .filter_map(|&i| alternatives.get(i))
        .any(|sig| matches_result(sig, inst, ret, classes));
    if accepted {
        return Ok(());
    }
    debug!(method = method.unwrap_or("<anonymous>"), "result contract violated");
    Err(ContractViolation::Return {
        method: method.map(str::to_string),
        alternatives: alternatives.to_vec(),
        matched: matched.to_vec(),
        actual: ret.clone(),
    })
}
