//! Integration tests for the type lattice vocabulary: parsing type
//! descriptions, canonical forms, signatures and value membership working
//! together against a user-extended class table.

use gradus_types::{parse_method, parse_ty, ClassTable, Instantiation, Param, Ty, Value};

// ── Helpers ────────────────────────────────────────────────────────────

/// A class table with a small user hierarchy on top of the built-ins.
fn billing_classes() -> ClassTable {
    let mut classes = ClassTable::with_builtins();
    classes.define("Billing::Document", None);
    classes.define("Billing::Invoice", Some("Billing::Document"));
    classes.define_method("Billing::Document", "total", None);
    classes.define_method("Billing::Invoice", "due_date", None);
    classes
}

fn parsed(src: &str) -> Ty {
    parse_ty(src).unwrap_or_else(|e| panic!("`{}` should parse: {}", src, e))
}

// ── Parsing ────────────────────────────────────────────────────────────

#[test]
fn test_parsed_types_render_canonically() {
    let rendered: Vec<String> = [
        "Symbol or String",
        "Int or Int",
        "Array<(Int or %bot)>",
        "(Int and %any)",
        "Hash<Symbol, (true or false)>",
    ]
    .iter()
    .map(|src| parsed(src).to_string())
    .collect();
    insta::assert_snapshot!(rendered.join("\n"), @r"
    (String or Symbol)
    Int
    Array<Int>
    Int
    Hash<Symbol, (false or true)>
    ");
}

#[test]
fn test_parsed_signature_components() {
    let sig = parse_method("(Billing::Invoice, ?Int, *Symbol, { force?: Bool }) { (Int) -> nil } -> self")
        .expect("signature should parse");
    assert_eq!(sig.params.len(), 4);
    assert!(matches!(sig.params[0], Param::Required(Ty::Nominal(ref c)) if c.last_segment() == "Invoice"));
    assert!(matches!(sig.params[1], Param::Optional(_)));
    assert!(matches!(sig.params[2], Param::Vararg(_)));
    assert!(matches!(sig.params[3], Param::Keywords(_)));
    assert!(matches!(sig.block, Some(Ty::Fn(_))));
    assert_eq!(sig.ret, Ty::SelfRef);
    assert_eq!((sig.min_arity(), sig.max_arity()), (1, None));
}

#[test]
fn test_rejects_descriptions_with_errors() {
    for src in ["", "Array<", "{ a Int }", "[Int,", "(*Int, *Int) -> nil", "%"] {
        assert!(parse_ty(src).is_err(), "`{}` should be rejected", src);
    }
}

// ── Membership ─────────────────────────────────────────────────────────

#[test]
fn test_membership_against_parsed_types() {
    let classes = billing_classes();
    let doc = parsed("Billing::Document");
    assert!(doc.member(&Value::object("Billing::Invoice"), &classes));
    assert!(!doc.member(&Value::Int(3), &classes));

    let totals = parsed("[ total: () -> Int ]");
    assert!(totals.member(&Value::object("Billing::Invoice"), &classes));
    assert!(!totals.member(&Value::str("x"), &classes));

    let opts = parsed("{ force?: Bool, mode: :fast or :slow }");
    let ok = Value::Hash(vec![(Value::sym("mode"), Value::sym("fast"))]);
    let bad = Value::Hash(vec![(Value::sym("mode"), Value::sym("medium"))]);
    assert!(opts.member(&ok, &classes));
    assert!(!opts.member(&bad, &classes));
}

#[test]
fn test_self_instantiation_in_signatures() {
    let classes = billing_classes();
    let sig = parse_method("(self) -> self").expect("signature should parse");
    let inst = Instantiation::with_self(Ty::nominal("Billing::Invoice"));
    let concrete = sig.instantiate(&inst);
    assert_eq!(concrete.to_string(), "(Billing::Invoice) -> Billing::Invoice");
    assert!(concrete.params[0].ty().member(&Value::object("Billing::Invoice"), &classes));
    assert!(!concrete.params[0].ty().member(&Value::object("Billing::Document"), &classes));
}
