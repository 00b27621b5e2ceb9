//! Comparison of an inferred type against a reference type.
//!
//! The categories and their order are fixed so that results stay
//! comparable with earlier evaluation data: the first rule that applies
//! decides.

use std::fmt;

use serde::Serialize;

use gradus_types::{ClassTable, Param, Ty};

/// How close an inferred type came to the reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Classification {
    /// Equal, up to namespaces, ancestry and a few known equivalences.
    #[serde(rename = "E")]
    Exact,
    /// Same shape, different parameters.
    #[serde(rename = "P")]
    ParamMatch,
    /// A concrete type that does not match.
    #[serde(rename = "T")]
    GotType,
    /// A structural type that does not match.
    #[serde(rename = "TS")]
    GotStructuralType,
    /// Still unresolved.
    #[serde(rename = "N")]
    NoType,
}

impl Classification {
    pub fn tag(self) -> &'static str {
        match self {
            Classification::Exact => "E",
            Classification::ParamMatch => "P",
            Classification::GotType => "T",
            Classification::GotStructuralType => "TS",
            Classification::NoType => "N",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

const STRING_LIKE: [&str; 4] = ["String", "Symbol", "(String or Symbol)", "(Symbol or String)"];

/// `original` names the class `abbrev` from an enclosing namespace
/// (`Billing::Invoice` vs `Invoice`).
fn abbreviated(abbrev: &str, original: &str) -> bool {
    original.ends_with(&format!("::{}", abbrev))
}

/// Some ancestor of `class` is `reference`, possibly abbreviated.
fn ancestor_matches(class: &str, reference: &str, classes: &ClassTable) -> bool {
    classes
        .ancestors(class)
        .iter()
        .any(|anc| anc == reference || abbreviated(reference, anc))
}

/// Compare parameter components, ignoring optional/vararg wrappers.
pub fn classify_param(inferred: &Param, reference: &Param, classes: &ClassTable) -> Classification {
    classify(&inferred.ty(), &reference.ty(), classes)
}

/// Classify `inferred` against `reference`.
pub fn classify(inferred: &Ty, reference: &Ty, classes: &ClassTable) -> Classification {
    use Classification::*;

    let inf = inferred.canonical();
    let orig = reference.canonical();
    let inf_str = inf.to_string();
    let orig_str = orig.to_string();

    if inf_str == orig_str {
        return Exact;
    }
    match (&inf, &orig) {
        (Ty::Nominal(i), Ty::Nominal(o)) if abbreviated(&o.name, &i.name) => return Exact,
        (Ty::Nominal(i), Ty::Nominal(o)) if ancestor_matches(&i.name, &o.name, classes) => return Exact,
        (Ty::Generic(..), _) if orig.is_object() => return Exact,
        _ => {}
    }
    if STRING_LIKE.contains(&inf_str.as_str()) && STRING_LIKE.contains(&orig_str.as_str()) {
        return Exact;
    }
    if let (Ty::Union(members), Ty::Nominal(o)) = (&inf, &orig) {
        let all_descend = members.iter().all(|m| match m {
            Ty::Nominal(c) => ancestor_matches(&c.name, &o.name, classes),
            _ => false,
        });
        if all_descend {
            return Exact;
        }
    }
    if !inf.is_var() && orig == Ty::Top {
        return Exact;
    }
    match (&inf, &orig) {
        (Ty::Generic(_, ps), Ty::Generic(_, qs))
            if !ps.is_empty() && ps.first() == qs.first() && inf.array_type() && orig.array_type() =>
        {
            return Exact
        }
        (Ty::Structural(ms), Ty::Structural(ns)) if ms.keys().eq(ns.keys()) => return Exact,
        (Ty::Singleton(lit), Ty::Nominal(o)) if lit.class_name() == o.name => return Exact,
        (Ty::Generic(b, _), Ty::Generic(c, _)) if b == c => return ParamMatch,
        (Ty::Generic(b, _), Ty::Nominal(c)) | (Ty::Nominal(c), Ty::Generic(b, _)) if b == c => {
            return ParamMatch
        }
        _ => {}
    }
    if (inf.array_type() && orig.array_type()) || (inf.hash_type() && orig.hash_type()) {
        return ParamMatch;
    }
    if inf.is_var() {
        NoType
    } else if inf.is_structural_like() {
        GotStructuralType
    } else {
        GotType
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradus_types::{parse_ty, TyVar};

    fn classes() -> ClassTable {
        let mut classes = ClassTable::with_builtins();
        classes.define("Billing::Invoice", None);
        classes.define("Billing::Receipt", Some("Billing::Invoice"));
        classes.define("Model", None);
        classes.define("User", Some("Model"));
        classes.define("Admin", Some("User"));
        classes
    }

    fn check(inferred: &str, reference: &str) -> Classification {
        classify(&parse_ty(inferred).unwrap(), &parse_ty(reference).unwrap(), &classes())
    }

    #[test]
    fn exact_matches() {
        assert_eq!(check("Foo", "Foo"), Classification::Exact);
        assert_eq!(check("(Int or String)", "(String or Int)"), Classification::Exact);
        assert_eq!(check("Billing::Invoice", "Invoice"), Classification::Exact);
        assert_eq!(check("Billing::Receipt", "Invoice"), Classification::Exact);
        assert_eq!(check("Admin", "Model"), Classification::Exact);
        assert_eq!(check("Array<Int>", "Object"), Classification::Exact);
        assert_eq!(check("Symbol", "String"), Classification::Exact);
        assert_eq!(check("(String or Symbol)", "Symbol"), Classification::Exact);
        assert_eq!(check("(Admin or User)", "Model"), Classification::Exact);
        assert_eq!(check("Hash<Symbol, Int>", "%any"), Classification::Exact);
        assert_eq!(check("[ name: () -> String ]", "[ name: () -> Symbol ]"), Classification::Exact);
        assert_eq!(check(":ok", "Symbol"), Classification::Exact);
        assert_eq!(check("5", "Int"), Classification::Exact);
    }

    #[test]
    fn parameter_matches() {
        assert_eq!(check("Array<Int>", "Array<String>"), Classification::ParamMatch);
        assert_eq!(check("Hash<Symbol, Int>", "Hash<String, Int>"), Classification::ParamMatch);
        assert_eq!(check("Array<Int>", "Array"), Classification::ParamMatch);
        assert_eq!(check("Hash", "Hash<Symbol, String>"), Classification::ParamMatch);
        assert_eq!(check("[Int, String]", "Array<Int>"), Classification::ParamMatch);
        assert_eq!(check("{ id: Int }", "Hash<Symbol, Int>"), Classification::ParamMatch);
    }

    #[test]
    fn got_types() {
        assert_eq!(check("Int", "String"), Classification::GotType);
        assert_eq!(check("(nil or User)", "Admin"), Classification::GotType);
        assert_eq!(check("[ foo: () -> Int ]", "Foo"), Classification::GotStructuralType);
        let inter = Ty::Intersection(vec![Ty::nominal("User"), parse_ty("[ save: () -> Bool ]").unwrap()]);
        assert_eq!(classify(&inter, &Ty::nominal("Admin"), &classes()), Classification::GotStructuralType);
    }

    #[test]
    fn unresolved_is_no_type() {
        let var = Ty::Var(TyVar(7));
        assert_eq!(classify(&var, &Ty::int(), &classes()), Classification::NoType);
        assert_eq!(classify(&var, &Ty::Top, &classes()), Classification::NoType);
    }

    #[test]
    fn wrappers_are_ignored() {
        let inferred = Param::Optional(Ty::int());
        let reference = Param::Vararg(Ty::int());
        assert_eq!(classify_param(&inferred, &reference, &classes()), Classification::Exact);
    }

    #[test]
    fn tags() {
        let tags: Vec<String> = [
            Classification::Exact,
            Classification::ParamMatch,
            Classification::GotType,
            Classification::GotStructuralType,
            Classification::NoType,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(tags, ["E", "P", "T", "TS", "N"]);
    }
}
