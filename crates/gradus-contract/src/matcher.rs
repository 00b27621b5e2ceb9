//! Argument-pattern matching.
//!
//! A signature's parameter list is a linear pattern: required components
//! match exactly one actual, optional components match zero or one, a
//! vararg matches any number, and a trailing keyword record matches one
//! hash (or nothing, when every field is optional). Matching is a
//! breadth-first search over `(formal, actual)` index pairs; every step
//! strictly advances the pair, so the search terminates.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::trace;

use gradus_types::{ClassTable, Instantiation, MethodTy, Param, Value};

/// Whether a call with positional `args` and an optional `block` is
/// accepted by `sig` under `inst`.
pub fn matches_call(
    sig: &MethodTy,
    inst: &Instantiation,
    args: &[Value],
    block: Option<&Value>,
    classes: &ClassTable,
) -> bool {
    matches_args(sig, inst, args, classes) && matches_block(sig, inst, block, classes)
}

/// Whether `ret` is a member of the instantiated result type.
pub fn matches_result(sig: &MethodTy, inst: &Instantiation, ret: &Value, classes: &ClassTable) -> bool {
    sig.ret.instantiate(inst).member(ret, classes)
}

fn matches_args(sig: &MethodTy, inst: &Instantiation, args: &[Value], classes: &ClassTable) -> bool {
    let formals = sig.instantiate(inst).params;
    let mut queue = VecDeque::from([(0usize, 0usize)]);
    let mut visited = FxHashSet::default();

    while let Some((formal, actual)) = queue.pop_front() {
        if !visited.insert((formal, actual)) {
            continue;
        }
        if formal == formals.len() && actual == args.len() {
            trace!(formal, actual, "argument pattern accepted");
            return true;
        }
        let Some(param) = formals.get(formal) else {
            // Actuals left over with no formal to absorb them.
            continue;
        };
        let current = args.get(actual);
        match param {
            Param::Required(ty) => {
                if let Some(value) = current {
                    if ty.member(value, classes) {
                        queue.push_back((formal + 1, actual + 1));
                    }
                }
            }
            Param::Optional(ty) => {
                queue.push_back((formal + 1, actual));
                if let Some(value) = current {
                    if ty.member(value, classes) {
                        queue.push_back((formal + 1, actual + 1));
                    }
                }
            }
            Param::Vararg(ty) => match current {
                Some(value) if ty.member(value, classes) => {
                    queue.push_back((formal, actual + 1));
                    queue.push_back((formal + 1, actual + 1));
                }
                // An empty vararg, either at the end or before a record.
                _ => queue.push_back((formal + 1, actual)),
            },
            Param::Keywords(rec) => match current {
                Some(value) => {
                    if rec.accepts(value, classes) {
                        queue.push_back((formal + 1, actual + 1));
                    }
                }
                None => {
                    if rec.accepts_empty() {
                        queue.push_back((formal + 1, actual));
                    }
                }
            },
        }
    }
    false
}

/// A supplied block must inhabit the declared block type; a signature
/// without one ignores the block, and omitting a block is always allowed.
fn matches_block(sig: &MethodTy, inst: &Instantiation, block: Option<&Value>, classes: &ClassTable) -> bool {
    match (&sig.block, block) {
        (Some(declared), Some(value)) => declared.instantiate(inst).member(value, classes),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradus_types::{parse_method, Ty, TyVar};

    fn sig(src: &str) -> MethodTy {
        parse_method(src).unwrap()
    }

    fn call(sig: &MethodTy, args: &[Value]) -> bool {
        matches_call(sig, &Instantiation::new(), args, None, &ClassTable::with_builtins())
    }

    #[test]
    fn required_components_match_exactly() {
        let s = sig("(Int, String) -> Bool");
        assert!(call(&s, &[Value::Int(1), Value::str("a")]));
        assert!(!call(&s, &[Value::Int(1)]));
        assert!(!call(&s, &[Value::Int(1), Value::str("a"), Value::Bool(true)]));
        assert!(!call(&s, &[Value::str("a"), Value::Int(1)]));
    }

    #[test]
    fn optional_tail_may_be_omitted() {
        let s = sig("(Int, ?String) -> Bool");
        assert!(call(&s, &[Value::Int(1)]));
        assert!(call(&s, &[Value::Int(1), Value::str("a")]));
        assert!(!call(&s, &[Value::str("a")]));
    }

    #[test]
    fn vararg_consumes_any_number() {
        let s = sig("(Int, *String) -> Bool");
        assert!(call(&s, &[Value::Int(1)]));
        assert!(call(&s, &[Value::Int(1), Value::str("a")]));
        assert!(call(&s, &[Value::Int(1), Value::str("a"), Value::str("b")]));
        assert!(!call(&s, &[Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn optional_before_required_backtracks() {
        let s = sig("(?Int, Int) -> nil");
        assert!(call(&s, &[Value::Int(1)]));
        assert!(call(&s, &[Value::Int(1), Value::Int(2)]));
        assert!(!call(&s, &[]));
    }

    #[test]
    fn keyword_record_trailing() {
        let optional_only = sig("(Int, { verbose?: Bool }) -> nil");
        assert!(call(&optional_only, &[Value::Int(1)]));
        let opts = Value::Hash(vec![(Value::sym("verbose"), Value::Bool(true))]);
        assert!(call(&optional_only, &[Value::Int(1), opts]));

        let required = sig("(Int, { mode: Symbol }) -> nil");
        assert!(!call(&required, &[Value::Int(1)]));
        let bad = Value::Hash(vec![(Value::sym("other"), Value::sym("x"))]);
        assert!(!call(&required, &[Value::Int(1), bad]));
    }

    #[test]
    fn empty_vararg_before_keywords() {
        let s = sig("(*Int, { force?: Bool }) -> nil");
        let opts = Value::Hash(vec![(Value::sym("force"), Value::Bool(false))]);
        assert!(call(&s, &[opts]));
        assert!(call(&s, &[Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn variables_are_wildcards_until_bound() {
        let s = MethodTy::new(vec![Param::Required(Ty::Var(TyVar(0)))], None, Ty::Var(TyVar(0))).unwrap();
        let classes = ClassTable::with_builtins();
        assert!(call(&s, &[Value::str("x")]));
        let inst = Instantiation::new().bind(TyVar(0), Ty::int());
        assert!(!matches_call(&s, &inst, &[Value::str("x")], None, &classes));
        assert!(matches_result(&s, &inst, &Value::Int(3), &classes));
        assert!(!matches_result(&s, &inst, &Value::str("x"), &classes));
    }

    #[test]
    fn block_policy() {
        let classes = ClassTable::with_builtins();
        let inst = Instantiation::new();
        let with_block = sig("(Int) { (Int) -> nil } -> nil");
        let one = Value::Proc { arity: Some(1) };
        let three = Value::Proc { arity: Some(3) };
        assert!(matches_call(&with_block, &inst, &[Value::Int(1)], Some(&one), &classes));
        assert!(!matches_call(&with_block, &inst, &[Value::Int(1)], Some(&three), &classes));
        assert!(matches_call(&with_block, &inst, &[Value::Int(1)], None, &classes));

        let without = sig("(Int) -> nil");
        assert!(matches_call(&without, &inst, &[Value::Int(1)], Some(&three), &classes));
    }

    #[test]
    fn result_uses_self_instantiation() {
        let classes = ClassTable::with_builtins();
        let s = sig("() -> self");
        let inst = Instantiation::with_self(Ty::string());
        assert!(matches_result(&s, &inst, &Value::str("x"), &classes));
        assert!(!matches_result(&s, &inst, &Value::Int(1), &classes));
    }
}
