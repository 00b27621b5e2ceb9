//! Contract violations raised when no alternative of a method's signature
//! accepts a call or its result.

use std::fmt::Write;

use thiserror::Error;

use gradus_types::{MethodTy, Value};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    /// No alternative accepted the actual arguments.
    #[error("{}", render_arguments(.method.as_deref(), .alternatives, .args, .block.as_ref()))]
    Arguments {
        method: Option<String>,
        alternatives: Vec<MethodTy>,
        args: Vec<Value>,
        block: Option<Value>,
    },
    /// None of the alternatives whose arguments matched accepted the result.
    #[error("{}", render_result(.method.as_deref(), .alternatives, .matched, .actual))]
    Return {
        method: Option<String>,
        alternatives: Vec<MethodTy>,
        matched: Vec<usize>,
        actual: Value,
    },
}

fn prefix(method: Option<&str>) -> String {
    method.map(|m| format!("{}: ", m)).unwrap_or_default()
}

fn render_arguments(
    method: Option<&str>,
    alternatives: &[MethodTy],
    args: &[Value],
    block: Option<&Value>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}Argument type error.", prefix(method));
    let _ = writeln!(out, "Method type:");
    for alt in alternatives {
        let _ = writeln!(out, "        {}", alt);
    }
    let _ = writeln!(out, "Actual argument type(s):");
    let actuals: Vec<String> = args.iter().map(Value::describe).collect();
    let _ = write!(out, "\t({})", actuals.join(", "));
    if let Some(blk) = block {
        let _ = write!(out, " {}", blk.describe());
    }
    out
}

fn render_result(method: Option<&str>, alternatives: &[MethodTy], matched: &[usize], actual: &Value) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}Return type error. *'s indicate argument lists that matched.",
        prefix(method)
    );
    let _ = writeln!(out, "Method type:");
    for (i, alt) in alternatives.iter().enumerate() {
        let marker = if matched.contains(&i) { '*' } else { ' ' };
        let _ = writeln!(out, "       {}{}", marker, alt);
    }
    let _ = writeln!(out, "Actual return type:");
    let _ = write!(out, "        {}", actual.describe());
    out
}
