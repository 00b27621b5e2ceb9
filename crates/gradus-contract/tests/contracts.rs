//! Integration tests for call-site contracts over intersection signatures:
//! which alternatives accept a call, and how violations are rendered.

use gradus_contract::{check_call, check_result, ContractViolation};
use gradus_types::{parse_method, ClassTable, Instantiation, MethodTy, Value};

// ── Helpers ────────────────────────────────────────────────────────────

fn alternatives(srcs: &[&str]) -> Vec<MethodTy> {
    srcs.iter()
        .map(|src| parse_method(src).unwrap_or_else(|e| panic!("`{}` should parse: {}", src, e)))
        .collect()
}

fn account_classes() -> ClassTable {
    let mut classes = ClassTable::with_builtins();
    classes.define("Account", None);
    classes.define_method("Account", "deposit", None);
    classes
}

// ── Matching arms ──────────────────────────────────────────────────────

#[test]
fn test_every_matching_alternative_is_reported() {
    let alts = alternatives(&["(Int) -> Int", "(Numeric) -> Numeric", "(String) -> String"]);
    let classes = account_classes();
    let matched = check_call(
        Some("Account#deposit"),
        &alts,
        &Instantiation::new(),
        &[Value::Int(5)],
        None,
        &classes,
    )
    .expect("an Int argument should match");
    assert_eq!(matched, vec![0, 1]);

    let floats = check_call(None, &alts, &Instantiation::new(), &[Value::Float(1.5)], None, &classes)
        .expect("a Float argument should match Numeric");
    assert_eq!(floats, vec![1]);
}

#[test]
fn test_result_is_checked_against_matched_arms_only() {
    let alts = alternatives(&["(Int) -> Int", "(String) -> String"]);
    let classes = account_classes();
    let inst = Instantiation::new();
    assert!(check_result(None, &alts, &[0], &inst, &Value::Int(1), &classes).is_ok());
    // Acceptable for arm 1, but arm 1 did not match the call.
    let err = check_result(None, &alts, &[0], &inst, &Value::str("x"), &classes).unwrap_err();
    assert!(matches!(err, ContractViolation::Return { ref matched, .. } if matched == &vec![0]));
}

#[test]
fn test_self_typed_contract() {
    let alts = alternatives(&["(self) -> self"]);
    let classes = account_classes();
    let inst = Instantiation::with_self(gradus_types::Ty::nominal("Account"));
    let matched = check_call(None, &alts, &inst, &[Value::object("Account")], None, &classes).unwrap();
    assert!(check_result(None, &alts, &matched, &inst, &Value::object("Account"), &classes).is_ok());
    assert!(check_call(None, &alts, &inst, &[Value::Int(1)], None, &classes).is_err());
}

// ── Rendered violations ────────────────────────────────────────────────

#[test]
fn test_argument_violation_lists_alternatives() {
    let alts = alternatives(&["(Int) -> Int", "(Float, ?String) -> Float"]);
    let err = check_call(
        Some("Account#deposit"),
        &alts,
        &Instantiation::new(),
        &[Value::str("ten"), Value::Int(2)],
        None,
        &account_classes(),
    )
    .unwrap_err();
    let message = err.to_string();
    insta::assert_snapshot!(message);
}

#[test]
fn test_return_violation_marks_matched_arms() {
    let alts = alternatives(&["(Int) -> Int", "(String) -> String"]);
    let err = check_result(
        None,
        &alts,
        &[0],
        &Instantiation::new(),
        &Value::str("oops"),
        &account_classes(),
    )
    .unwrap_err();
    let message = err.to_string();
    insta::assert_snapshot!(message);
}

#[test]
fn test_argument_violation_mentions_block() {
    let alts = alternatives(&["(Int) { (Int) -> nil } -> nil"]);
    let err = check_call(
        None,
        &alts,
        &Instantiation::new(),
        &[Value::Int(1)],
        Some(&Value::Proc { arity: Some(2) }),
        &account_classes(),
    )
    .unwrap_err();
    assert!(err.to_string().ends_with("\t(Int) Proc"));
}
