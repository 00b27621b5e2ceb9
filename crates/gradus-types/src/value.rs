//! Runtime values and type membership.
//!
//! Membership is the dynamic counterpart of subtyping: it decides whether a
//! concrete value inhabits a type. Call-site contracts are checked with it.
//! Unresolved variables are wildcards and accept everything.

use rustc_hash::FxHashMap;

use crate::classes::ClassTable;
use crate::sig::{MethodTy, Param};
use crate::ty::{Field, Lit, Record, Ty, TyVar};

/// A runtime value as seen by a call-site contract.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Sym(String),
    Array(Vec<Value>),
    Hash(Vec<(Value, Value)>),
    Object { class: String },
    /// A block or lambda. `arity` is `None` when it accepts any count.
    Proc { arity: Option<usize> },
}

impl Value {
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn sym(s: impl Into<String>) -> Value {
        Value::Sym(s.into())
    }

    pub fn object(class: impl Into<String>) -> Value {
        Value::Object { class: class.into() }
    }

    /// The class this value is an instance of.
    pub fn class_name(&self) -> &str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(true) => "True",
            Value::Bool(false) => "False",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "String",
            Value::Sym(_) => "Symbol",
            Value::Array(_) => "Array",
            Value::Hash(_) => "Hash",
            Value::Object { class } => class,
            Value::Proc { .. } => "Proc",
        }
    }

    /// A short human-readable description of the value's type, used in
    /// contract violation messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Array(elems) if !elems.is_empty() => {
                let mut kinds: Vec<&str> = elems.iter().map(Value::class_name).collect();
                kinds.sort_unstable();
                kinds.dedup();
                format!("Array<{}>", kinds.join(" or "))
            }
            other => other.class_name().to_string(),
        }
    }

    fn matches_lit(&self, lit: &Lit) -> bool {
        match (self, lit) {
            (Value::Int(a), Lit::Int(b)) => a == b,
            (Value::Sym(a), Lit::Sym(b)) => a == b,
            (Value::Str(a), Lit::Str(b)) => a == b,
            (Value::Bool(a), Lit::Bool(b)) => a == b,
            _ => false,
        }
    }
}

/// A substitution applied to a signature before checking values against
/// it: the receiver type for `self`, and bindings for variables.
#[derive(Clone, Debug, Default)]
pub struct Instantiation {
    pub self_ty: Option<Ty>,
    pub vars: FxHashMap<TyVar, Ty>,
}

impl Instantiation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_self(self_ty: Ty) -> Self {
        Instantiation {
            self_ty: Some(self_ty),
            vars: FxHashMap::default(),
        }
    }

    pub fn bind(mut self, var: TyVar, ty: Ty) -> Self {
        self.vars.insert(var, ty);
        self
    }
}

impl Ty {
    /// Apply an instantiation: replace `self` and bound variables.
    pub fn instantiate(&self, inst: &Instantiation) -> Ty {
        match self {
            Ty::SelfRef => inst.self_ty.clone().unwrap_or(Ty::SelfRef),
            Ty::Var(v) => inst.vars.get(v).cloned().unwrap_or(Ty::Var(*v)),
            Ty::Generic(base, params) => {
                Ty::Generic(base.clone(), params.iter().map(|p| p.instantiate(inst)).collect())
            }
            Ty::Tuple(elems) => Ty::Tuple(elems.iter().map(|e| e.instantiate(inst)).collect()),
            Ty::Union(members) => Ty::Union(members.iter().map(|m| m.instantiate(inst)).collect()),
            Ty::Intersection(members) => {
                Ty::Intersection(members.iter().map(|m| m.instantiate(inst)).collect())
            }
            Ty::Structural(methods) => Ty::Structural(
                methods
                    .iter()
                    .map(|(n, m)| (n.clone(), m.instantiate(inst)))
                    .collect(),
            ),
            Ty::Record(rec) => Ty::Record(rec.instantiate(inst)),
            Ty::Fn(sig) => Ty::Fn(Box::new(sig.instantiate(inst))),
            Ty::Bot | Ty::Top | Ty::Nil | Ty::Nominal(_) | Ty::Singleton(_) => self.clone(),
        }
    }

    /// Whether `value` inhabits this type. Variables and an uninstantiated
    /// `self` accept any value; `nil` inhabits every type except `%bot` and
    /// singletons.
    pub fn member(&self, value: &Value, classes: &ClassTable) -> bool {
        if matches!(value, Value::Nil) && !matches!(self, Ty::Bot | Ty::Singleton(_)) {
            return true;
        }
        match self {
            Ty::Top | Ty::Var(_) | Ty::SelfRef => true,
            Ty::Bot | Ty::Nil => false,
            Ty::Nominal(c) => classes.is_subclass(value.class_name(), &c.name),
            Ty::Generic(base, params) => {
                if !classes.is_subclass(value.class_name(), &base.name) {
                    return false;
                }
                match (value, params.as_slice()) {
                    (Value::Array(elems), [elem_ty]) => {
                        elems.iter().all(|e| elem_ty.member(e, classes))
                    }
                    (Value::Hash(pairs), [key_ty, val_ty]) => pairs
                        .iter()
                        .all(|(k, v)| key_ty.member(k, classes) && val_ty.member(v, classes)),
                    _ => true,
                }
            }
            Ty::Tuple(elem_tys) => match value {
                Value::Array(elems) => {
                    elems.len() == elem_tys.len()
                        && elems.iter().zip(elem_tys).all(|(e, t)| t.member(e, classes))
                }
                _ => false,
            },
            Ty::Union(members) => members.iter().any(|m| m.member(value, classes)),
            Ty::Intersection(members) => members.iter().all(|m| m.member(value, classes)),
            Ty::Structural(methods) => methods
                .keys()
                .all(|m| classes.responds_to(value.class_name(), m)),
            Ty::Record(rec) => rec.accepts(value, classes),
            Ty::Singleton(lit) => value.matches_lit(lit),
            Ty::Fn(sig) => match value {
                Value::Proc { arity: None } => true,
                Value::Proc { arity: Some(n) } => {
                    *n >= sig.min_arity() && sig.max_arity().map_or(true, |max| *n <= max)
                }
                _ => false,
            },
        }
    }
}

impl Record {
    pub fn instantiate(&self, inst: &Instantiation) -> Record {
        Record {
            fields: self
                .fields
                .iter()
                .map(|(name, f)| {
                    (
                        name.clone(),
                        Field {
                            ty: f.ty.instantiate(inst),
                            optional: f.optional,
                        },
                    )
                })
                .collect(),
        }
    }

    /// Whether a hash value with symbol keys fits this record: no unknown
    /// keys, every present field well-typed, every required field present.
    pub fn accepts(&self, value: &Value, classes: &ClassTable) -> bool {
        let Value::Hash(pairs) = value else {
            return false;
        };
        let mut seen = Vec::with_capacity(pairs.len());
        for (k, v) in pairs {
            let Value::Sym(key) = k else {
                return false;
            };
            match self.fields.get(key) {
                Some(field) if field.ty.member(v, classes) => seen.push(key.as_str()),
                _ => return false,
            }
        }
        self.fields
            .iter()
            .all(|(name, f)| f.optional || seen.contains(&name.as_str()))
    }
}

impl Param {
    pub fn instantiate(&self, inst: &Instantiation) -> Param {
        match self {
            Param::Required(t) => Param::Required(t.instantiate(inst)),
            Param::Optional(t) => Param::Optional(t.instantiate(inst)),
            Param::Vararg(t) => Param::Vararg(t.instantiate(inst)),
            Param::Keywords(rec) => Param::Keywords(rec.instantiate(inst)),
        }
    }
}

impl MethodTy {
    pub fn instantiate(&self, inst: &Instantiation) -> MethodTy {
        MethodTy {
            params: self.params.iter().map(|p| p.instantiate(inst)).collect(),
            block: self.block.as_ref().map(|b| b.instantiate(inst)),
            ret: self.ret.instantiate(inst),
        }
    }
}
