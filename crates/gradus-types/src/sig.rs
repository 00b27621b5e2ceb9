//! Method signatures: ordered parameter components, an optional block and
//! a result type.
//!
//! Parameter ordering is validated at construction time: any number of
//! required and optional components, then at most one vararg, then at most
//! one trailing keyword record.

use std::fmt;

use crate::error::SignatureError;
use crate::ty::{Record, Ty, TyVar};

/// One component of a method's argument list.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Param {
    Required(Ty),
    Optional(Ty),
    Vararg(Ty),
    /// Trailing keyword arguments.
    Keywords(Record),
}

impl Param {
    /// The component's type with any optional/vararg wrapper removed.
    pub fn ty(&self) -> Ty {
        match self {
            Param::Required(t) | Param::Optional(t) | Param::Vararg(t) => t.clone(),
            Param::Keywords(rec) => Ty::Record(rec.clone()),
        }
    }

    pub fn canonical(&self) -> Param {
        match self {
            Param::Required(t) => Param::Required(t.canonical()),
            Param::Optional(t) => Param::Optional(t.canonical()),
            Param::Vararg(t) => Param::Vararg(t.canonical()),
            Param::Keywords(rec) => Param::Keywords(rec.canonical()),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Required(t) => write!(f, "{}", t),
            Param::Optional(t) => write!(f, "?{}", t),
            Param::Vararg(t) => write!(f, "*{}", t),
            Param::Keywords(rec) => write!(f, "{}", rec),
        }
    }
}

/// A method or block type.
///
/// `MethodTy::new` checks component ordering. A struct literal is
/// unchecked; run [`MethodTy::validate`] on signatures built that way.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodTy {
    pub params: Vec<Param>,
    /// The block parameter: a nested signature (`Ty::Fn`), a variable still
    /// being inferred, or the nominal `Proc`.
    pub block: Option<Ty>,
    pub ret: Ty,
}

/// Where the parameter scan currently is.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Required,
    Optional,
    Vararg,
    Keywords,
}

impl MethodTy {
    /// Build a signature, rejecting malformed parameter orderings.
    pub fn new(params: Vec<Param>, block: Option<Ty>, ret: Ty) -> Result<MethodTy, SignatureError> {
        let sig = MethodTy { params, block, ret };
        sig.validate()?;
        Ok(sig)
    }

    /// Check component ordering and the block form.
    pub fn validate(&self) -> Result<(), SignatureError> {
        let mut state = ScanState::Required;
        for (position, param) in self.params.iter().enumerate() {
            state = match (param, state) {
                (Param::Optional(_), ScanState::Vararg) => {
                    return Err(SignatureError::OptionalAfterVararg { position })
                }
                (Param::Optional(_), ScanState::Keywords) => {
                    return Err(SignatureError::OptionalAfterKeywords { position })
                }
                (Param::Optional(_), _) => ScanState::Optional,
                (Param::Vararg(_), ScanState::Vararg) => {
                    return Err(SignatureError::MultipleVarargs { position })
                }
                (Param::Vararg(_), ScanState::Keywords) => {
                    return Err(SignatureError::VarargAfterKeywords { position })
                }
                (Param::Vararg(_), _) => ScanState::Vararg,
                (Param::Keywords(_), ScanState::Keywords) => {
                    return Err(SignatureError::MultipleKeywords { position })
                }
                (Param::Keywords(_), _) => ScanState::Keywords,
                (Param::Required(_), ScanState::Vararg) => {
                    return Err(SignatureError::RequiredAfterVararg { position })
                }
                (Param::Required(_), ScanState::Keywords) => {
                    return Err(SignatureError::RequiredAfterKeywords { position })
                }
                (Param::Required(_), s) => s,
            };
        }
        if let Some(block) = &self.block {
            let callable = match block {
                Ty::Fn(_) | Ty::Var(_) => true,
                Ty::Nominal(con) => con.name == "Proc",
                _ => false,
            };
            if !callable {
                return Err(SignatureError::InvalidBlock { found: block.clone() });
            }
        }
        Ok(())
    }

    pub fn canonical(&self) -> MethodTy {
        MethodTy {
            params: self.params.iter().map(Param::canonical).collect(),
            block: self.block.as_ref().map(Ty::canonical),
            ret: self.ret.canonical(),
        }
    }

    /// Number of required positional components.
    pub fn min_arity(&self) -> usize {
        self.params
            .iter()
            .filter(|p| matches!(p, Param::Required(_)))
            .count()
    }

    /// Largest positional arity accepted, or `None` with a vararg.
    pub fn max_arity(&self) -> Option<usize> {
        let mut n = 0;
        for p in &self.params {
            match p {
                Param::Vararg(_) => return None,
                Param::Required(_) | Param::Optional(_) | Param::Keywords(_) => n += 1,
            }
        }
        Some(n)
    }

    pub fn collect_vars(&self, out: &mut Vec<TyVar>) {
        for p in &self.params {
            p.ty().collect_vars(out);
        }
        if let Some(block) = &self.block {
            block.collect_vars(out);
        }
        self.ret.collect_vars(out);
    }
}

impl fmt::Display for MethodTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ")")?;
        if let Some(block) = &self.block {
            write!(f, " {{ {} }}", block)?;
        }
        write!(f, " -> {}", self.ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(params: Vec<Param>) -> Result<MethodTy, SignatureError> {
        MethodTy::new(params, None, Ty::Nil)
    }

    #[test]
    fn accepts_required_optional_vararg_keywords() {
        let ok = sig(vec![
            Param::Required(Ty::int()),
            Param::Optional(Ty::string()),
            Param::Vararg(Ty::int()),
            Param::Keywords(Record::new().with_optional("verbose", Ty::bool())),
        ]);
        assert!(ok.is_ok());
    }

    #[test]
    fn rejects_optional_after_vararg() {
        let err = sig(vec![Param::Vararg(Ty::int()), Param::Optional(Ty::int())]).unwrap_err();
        assert_eq!(err, SignatureError::OptionalAfterVararg { position: 1 });
    }

    #[test]
    fn rejects_second_vararg() {
        let err = sig(vec![Param::Vararg(Ty::int()), Param::Vararg(Ty::int())]).unwrap_err();
        assert_eq!(err, SignatureError::MultipleVarargs { position: 1 });
    }

    #[test]
    fn rejects_anything_after_keywords() {
        let kw = Param::Keywords(Record::new());
        assert_eq!(
            sig(vec![kw.clone(), kw.clone()]).unwrap_err(),
            SignatureError::MultipleKeywords { position: 1 }
        );
        assert_eq!(
            sig(vec![kw.clone(), Param::Required(Ty::int())]).unwrap_err(),
            SignatureError::RequiredAfterKeywords { position: 1 }
        );
        assert_eq!(
            sig(vec![kw, Param::Vararg(Ty::int())]).unwrap_err(),
            SignatureError::VarargAfterKeywords { position: 1 }
        );
    }

    #[test]
    fn rejects_non_callable_block() {
        let err = MethodTy::new(vec![], Some(Ty::int().canonical()), Ty::Nil);
        assert!(matches!(err, Err(SignatureError::InvalidBlock { .. })));
        assert!(MethodTy::new(vec![], Some(Ty::nominal("Proc")), Ty::Nil).is_ok());
    }

    #[test]
    fn literal_signatures_are_checked_on_validate() {
        let literal = MethodTy {
            params: vec![Param::Keywords(Record::new()), Param::Optional(Ty::int())],
            block: None,
            ret: Ty::Nil,
        };
        assert_eq!(
            literal.validate(),
            Err(SignatureError::OptionalAfterKeywords { position: 1 })
        );
        let checked = sig(vec![Param::Required(Ty::int())]).unwrap();
        assert_eq!(checked.validate(), Ok(()));
    }

    #[test]
    fn arity_bounds() {
        let m = sig(vec![Param::Required(Ty::int()), Param::Optional(Ty::int())]).unwrap();
        assert_eq!((m.min_arity(), m.max_arity()), (1, Some(2)));
        let v = sig(vec![Param::Required(Ty::int()), Param::Vararg(Ty::int())]).unwrap();
        assert_eq!(v.max_arity(), None);
    }

    #[test]
    fn method_display() {
        let m = MethodTy::new(
            vec![
                Param::Required(Ty::int()),
                Param::Optional(Ty::string()),
                Param::Vararg(Ty::symbol()),
            ],
            Some(Ty::method(MethodTy::new(vec![Param::Required(Ty::int())], None, Ty::bool()).unwrap())),
            Ty::Nil,
        )
        .unwrap();
        assert_eq!(format!("{}", m), "(Int, ?String, *Symbol) { (Int) -> Bool } -> nil");
    }
}
