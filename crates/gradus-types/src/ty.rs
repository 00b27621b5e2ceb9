//! Type representation for the gradus type lattice.
//!
//! Defines the core `Ty` enum together with type constructors (`TyCon`),
//! inference variables (`TyVar`), literal singletons (`Lit`) and keyword
//! records (`Record`). Types are immutable values compared structurally;
//! unions and intersections behave as sets once canonicalized.

use std::collections::BTreeMap;
use std::fmt;

use crate::sig::MethodTy;

/// A type variable, identified by a `u32` index into the bound store.
///
/// The variable itself carries no bounds -- those live in the inference
/// context that created it. A `TyVar` is only meaningful relative to that
/// context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyVar(pub u32);

/// A type constructor -- a (possibly namespaced) class name like `Int`,
/// `Array` or `Billing::Invoice`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyCon {
    pub name: String,
}

impl TyCon {
    pub fn new(name: impl Into<String>) -> Self {
        TyCon { name: name.into() }
    }

    /// The last `::`-separated segment of the name (`Invoice` for
    /// `Billing::Invoice`).
    pub fn last_segment(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }
}

impl fmt::Display for TyCon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The value carried by a singleton type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lit {
    Int(i64),
    Sym(String),
    Str(String),
    Bool(bool),
}

impl Lit {
    /// The class every value of this singleton belongs to.
    pub fn class_name(&self) -> &'static str {
        match self {
            Lit::Int(_) => "Int",
            Lit::Sym(_) => "Symbol",
            Lit::Str(_) => "String",
            Lit::Bool(true) => "True",
            Lit::Bool(false) => "False",
        }
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lit::Int(n) => write!(f, "{}", n),
            Lit::Sym(s) => write!(f, ":{}", s),
            Lit::Str(s) => write!(f, "{:?}", s),
            Lit::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// One field of a keyword record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Field {
    pub ty: Ty,
    pub optional: bool,
}

/// A keyword record: a fixed set of named fields, used for keyword-style
/// call arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Record {
    pub fields: BTreeMap<String, Field>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a required field.
    pub fn with_field(mut self, name: impl Into<String>, ty: Ty) -> Self {
        self.fields.insert(name.into(), Field { ty, optional: false });
        self
    }

    /// Builder: add an optional field.
    pub fn with_optional(mut self, name: impl Into<String>, ty: Ty) -> Self {
        self.fields.insert(name.into(), Field { ty, optional: true });
        self
    }

    /// Whether the empty record `{}` is acceptable (every field optional).
    pub fn accepts_empty(&self) -> bool {
        self.fields.values().all(|f| f.optional)
    }

    pub fn canonical(&self) -> Record {
        Record {
            fields: self
                .fields
                .iter()
                .map(|(name, f)| {
                    (
                        name.clone(),
                        Field {
                            ty: f.ty.canonical(),
                            optional: f.optional,
                        },
                    )
                })
                .collect(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return write!(f, "{{ }}");
        }
        write!(f, "{{ ")?;
        for (i, (name, field)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let marker = if field.optional { "?" } else { "" };
            write!(f, "{}{}: {}", name, marker, field.ty)?;
        }
        write!(f, " }}")
    }
}

/// A gradus type.
///
/// - `Bot` / `Top`: the bottom and top of the lattice
/// - `Nil`: the type of `nil`, a subtype of every non-bottom type
/// - `SelfRef`: the reflexive receiver type, instantiated per call
/// - `Nominal` / `Generic`: class types, optionally applied to parameters
/// - `Tuple`, `Record`: fixed-shape arrays and keyword records
/// - `Union` / `Intersection`: set-like combinations (see [`Ty::canonical`])
/// - `Structural`: "anything responding to these methods"
/// - `Singleton`: exactly one literal value
/// - `Var`: an unresolved inference variable
/// - `Fn`: a method or block signature used as a type
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ty {
    Bot,
    Top,
    Nil,
    SelfRef,
    Nominal(TyCon),
    Generic(TyCon, Vec<Ty>),
    Tuple(Vec<Ty>),
    Union(Vec<Ty>),
    Intersection(Vec<Ty>),
    Structural(BTreeMap<String, MethodTy>),
    Record(Record),
    Singleton(Lit),
    Var(TyVar),
    Fn(Box<MethodTy>),
}

impl Ty {
    pub fn nominal(name: impl Into<String>) -> Ty {
        Ty::Nominal(TyCon::new(name))
    }

    pub fn generic(base: impl Into<String>, params: Vec<Ty>) -> Ty {
        Ty::Generic(TyCon::new(base), params)
    }

    pub fn int() -> Ty {
        Ty::nominal("Int")
    }

    pub fn float() -> Ty {
        Ty::nominal("Float")
    }

    pub fn string() -> Ty {
        Ty::nominal("String")
    }

    pub fn symbol() -> Ty {
        Ty::nominal("Symbol")
    }

    /// The universal object type.
    pub fn object() -> Ty {
        Ty::nominal("Object")
    }

    /// `Bool` is the canonical union `False | True`.
    pub fn bool() -> Ty {
        Ty::Union(vec![Ty::nominal("False"), Ty::nominal("True")])
    }

    /// Create an `Array<T>` type.
    pub fn array(elem: Ty) -> Ty {
        Ty::generic("Array", vec![elem])
    }

    /// Create a `Hash<K, V>` type.
    pub fn hash(key: Ty, value: Ty) -> Ty {
        Ty::generic("Hash", vec![key, value])
    }

    /// Create a canonical union of the given members.
    pub fn union(members: Vec<Ty>) -> Ty {
        Ty::Union(members).canonical()
    }

    /// Create a canonical intersection of the given members.
    pub fn intersection(members: Vec<Ty>) -> Ty {
        Ty::Intersection(members).canonical()
    }

    pub fn structural<I, S>(methods: I) -> Ty
    where
        I: IntoIterator<Item = (S, MethodTy)>,
        S: Into<String>,
    {
        Ty::Structural(methods.into_iter().map(|(n, m)| (n.into(), m)).collect())
    }

    pub fn method(sig: MethodTy) -> Ty {
        Ty::Fn(Box::new(sig))
    }

    // ── Canonical form ──────────────────────────────────────────────────

    /// Simplify to canonical form.
    ///
    /// Nested unions and intersections are flattened, duplicates removed
    /// and members sorted. `Bot` vanishes from unions and `Top` from
    /// intersections; a union with `Top` is `Top`, an intersection with
    /// `Bot` is `Bot`. The empty union is `Bot`, the empty intersection is
    /// `Top`, and a one-member union or intersection is its sole member.
    pub fn canonical(&self) -> Ty {
        match self {
            Ty::Union(members) => {
                let mut flat = Vec::with_capacity(members.len());
                for m in members {
                    match m.canonical() {
                        Ty::Union(inner) => flat.extend(inner),
                        Ty::Bot => {}
                        other => flat.push(other),
                    }
                }
                if flat.contains(&Ty::Top) {
                    return Ty::Top;
                }
                flat.sort();
                flat.dedup();
                match flat.len() {
                    0 => Ty::Bot,
                    1 => flat.swap_remove(0),
                    _ => Ty::Union(flat),
                }
            }
            Ty::Intersection(members) => {
                let mut flat = Vec::with_capacity(members.len());
                for m in members {
                    match m.canonical() {
                        Ty::Intersection(inner) => flat.extend(inner),
                        Ty::Top => {}
                        other => flat.push(other),
                    }
                }
                if flat.contains(&Ty::Bot) {
                    return Ty::Bot;
                }
                flat.sort();
                flat.dedup();
                match flat.len() {
                    0 => Ty::Top,
                    1 => flat.swap_remove(0),
                    _ => Ty::Intersection(flat),
                }
            }
            Ty::Generic(base, params) => {
                Ty::Generic(base.clone(), params.iter().map(Ty::canonical).collect())
            }
            Ty::Tuple(elems) => Ty::Tuple(elems.iter().map(Ty::canonical).collect()),
            Ty::Structural(methods) => Ty::Structural(
                methods
                    .iter()
                    .map(|(n, m)| (n.clone(), m.canonical()))
                    .collect(),
            ),
            Ty::Record(rec) => Ty::Record(rec.canonical()),
            Ty::Fn(sig) => Ty::Fn(Box::new(sig.canonical())),
            other => other.clone(),
        }
    }

    /// Remove variable members from a union or intersection. Other types
    /// are returned unchanged. The result is not re-canonicalized.
    pub fn drop_vars(&self) -> Ty {
        match self {
            Ty::Union(members) => {
                Ty::Union(members.iter().filter(|m| !m.is_var()).cloned().collect())
            }
            Ty::Intersection(members) => {
                Ty::Intersection(members.iter().filter(|m| !m.is_var()).cloned().collect())
            }
            other => other.clone(),
        }
    }

    // ── Predicates ──────────────────────────────────────────────────────

    pub fn is_var(&self) -> bool {
        matches!(self, Ty::Var(_))
    }

    pub fn as_var(&self) -> Option<TyVar> {
        match self {
            Ty::Var(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_bool(&self) -> bool {
        *self == Ty::bool()
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Ty::Nominal(c) if c.name == "Object")
    }

    /// A structural type, or an intersection with a structural member.
    pub fn is_structural_like(&self) -> bool {
        match self {
            Ty::Structural(_) => true,
            Ty::Intersection(members) => members.iter().any(|m| matches!(m, Ty::Structural(_))),
            _ => false,
        }
    }

    /// Array-shaped: `Array`, `Array<T>`, or a tuple.
    pub fn array_type(&self) -> bool {
        match self {
            Ty::Nominal(c) | Ty::Generic(c, _) => c.name == "Array",
            Ty::Tuple(_) => true,
            _ => false,
        }
    }

    /// Hash-shaped: `Hash`, `Hash<K, V>`, or a keyword record.
    pub fn hash_type(&self) -> bool {
        match self {
            Ty::Nominal(c) | Ty::Generic(c, _) => c.name == "Hash",
            Ty::Record(_) => true,
            _ => false,
        }
    }

    /// Collect every variable occurring in this type, in order of
    /// appearance (duplicates included).
    pub fn collect_vars(&self, out: &mut Vec<TyVar>) {
        match self {
            Ty::Var(v) => out.push(*v),
            Ty::Generic(_, elems)
            | Ty::Tuple(elems)
            | Ty::Union(elems)
            | Ty::Intersection(elems) => {
                for e in elems {
                    e.collect_vars(out);
                }
            }
            Ty::Structural(methods) => {
                for m in methods.values() {
                    m.collect_vars(out);
                }
            }
            Ty::Record(rec) => {
                for f in rec.fields.values() {
                    f.ty.collect_vars(out);
                }
            }
            Ty::Fn(sig) => sig.collect_vars(out),
            Ty::Bot | Ty::Top | Ty::Nil | Ty::SelfRef | Ty::Nominal(_) | Ty::Singleton(_) => {}
        }
    }

    /// Whether `var` occurs anywhere within this type.
    pub fn mentions(&self, var: TyVar) -> bool {
        let mut vars = Vec::new();
        self.collect_vars(&mut vars);
        vars.contains(&var)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Ty], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Bot => write!(f, "%bot"),
            Ty::Top => write!(f, "%any"),
            Ty::Nil => write!(f, "nil"),
            Ty::SelfRef => write!(f, "self"),
            Ty::Nominal(c) => write!(f, "{}", c),
            Ty::Generic(base, params) => {
                write!(f, "{}<", base)?;
                write_list(f, params, ", ")?;
                write!(f, ">")
            }
            Ty::Tuple(elems) => {
                write!(f, "[")?;
                write_list(f, elems, ", ")?;
                write!(f, "]")
            }
            Ty::Union(_) if self.is_bool() => write!(f, "Bool"),
            Ty::Union(members) => {
                write!(f, "(")?;
                write_list(f, members, " or ")?;
                write!(f, ")")
            }
            Ty::Intersection(members) => {
                write!(f, "(")?;
                write_list(f, members, " and ")?;
                write!(f, ")")
            }
            Ty::Structural(methods) => {
                write!(f, "[ ")?;
                for (i, (name, sig)) in methods.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, sig)?;
                }
                write!(f, " ]")
            }
            Ty::Record(rec) => write!(f, "{}", rec),
            Ty::Singleton(lit) => write!(f, "{}", lit),
            Ty::Var(v) => write!(f, "?{}", v.0),
            Ty::Fn(sig) => write!(f, "{}", sig),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
