//! Subtyping over the lattice, with variables.
//!
//! `leq` decides `a <= b`. A variable met on the left gains `b` as an upper
//! bound, one met on the right gains `a` as a lower bound, both through the
//! propagating insertions of the bound store. Alternatives (a union on the
//! right, an intersection on the left) are tried one at a time and rolled
//! back when they fail.

use gradus_types::{MethodTy, Record, Ty, TyCon};
use gradus_types::classes::OBJECT_CLASS;

use crate::bounds::{Direction, EditLog, InferCtx};
use crate::error::BoundOrigin;

impl InferCtx {
    /// Whether `a <= b`, recording any bounds added along the way in `log`.
    ///
    /// On `false`, bounds added before the failure stay in `log`; callers
    /// roll back to their own mark.
    pub fn leq(&mut self, a: &Ty, b: &Ty, origin: &BoundOrigin, log: &mut EditLog) -> bool {
        if a == b {
            return true;
        }
        match (a, b) {
            (Ty::Bot, _) | (_, Ty::Top) => true,

            (Ty::Var(x), _) => {
                if self.has_bound(*x, Direction::Upper, b) {
                    return true;
                }
                self.push_upper(*x, b.clone(), origin, log).is_ok()
            }
            (_, Ty::Var(y)) => {
                if self.has_bound(*y, Direction::Lower, a) {
                    return true;
                }
                self.push_lower(*y, a.clone(), origin, log).is_ok()
            }

            (Ty::Nil, _) => !matches!(b, Ty::Bot),
            (Ty::Top, _) | (_, Ty::Bot) => false,

            (Ty::Union(members), _) => members.iter().all(|m| self.leq(m, b, origin, log)),
            (_, Ty::Intersection(members)) => members.iter().all(|m| self.leq(a, m, origin, log)),
            (_, Ty::Union(members)) => self.any_alternative(members, |ctx, m, log| ctx.leq(a, m, origin, log), log),
            (Ty::Intersection(members), _) => {
                self.any_alternative(members, |ctx, m, log| ctx.leq(m, b, origin, log), log)
            }

            (_, Ty::Nominal(c)) if c.name == OBJECT_CLASS => true,
            (Ty::SelfRef, _) | (_, Ty::SelfRef) => false,

            (Ty::Nominal(x), Ty::Nominal(y)) => self.classes().is_subclass(&x.name, &y.name),

            (Ty::Generic(x, ps), Ty::Generic(y, qs)) => {
                self.classes().is_subclass(&x.name, &y.name)
                    && ps.len() == qs.len()
                    && ps
                        .iter()
                        .zip(qs)
                        .all(|(p, q)| self.leq(p, q, origin, log) && self.leq(q, p, origin, log))
            }
            (Ty::Generic(x, _), Ty::Nominal(y)) => self.classes().is_subclass(&x.name, &y.name),

            (Ty::Tuple(xs), Ty::Tuple(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.leq(x, y, origin, log))
            }
            (Ty::Tuple(xs), Ty::Generic(base, params)) if base.name == "Array" && params.len() == 1 => {
                xs.iter().all(|x| self.leq(x, &params[0], origin, log))
            }
            (Ty::Tuple(_), Ty::Nominal(y)) => self.classes().is_subclass("Array", &y.name),

            (Ty::Record(r), Ty::Record(s)) => self.record_leq(r, s, origin, log),
            (Ty::Record(r), Ty::Generic(base, params)) if base.name == "Hash" && params.len() == 2 => {
                self.leq(&Ty::symbol(), &params[0], origin, log)
                    && r.fields.values().all(|f| self.leq(&f.ty, &params[1], origin, log))
            }
            (Ty::Record(_), Ty::Nominal(y)) => self.classes().is_subclass("Hash", &y.name),

            (Ty::Singleton(lit), _) => {
                let class = Ty::nominal(lit.class_name());
                self.leq(&class, b, origin, log)
            }

            (Ty::Structural(ms), Ty::Structural(ns)) => ns.iter().all(|(name, n)| match ms.get(name) {
                Some(m) => self.method_leq(m, n, origin, log),
                None => false,
            }),
            (_, Ty::Structural(ns)) => match class_of(a) {
                Some(class) => ns.keys().all(|m| self.classes().responds_to(&class.name, m)),
                None => false,
            },

            (Ty::Fn(m), Ty::Fn(n)) => self.method_leq(m, n, origin, log),
            (Ty::Fn(_), Ty::Nominal(y)) => self.classes().is_subclass("Proc", &y.name),

            _ => false,
        }
    }

    /// A pure subtyping query: any bounds added while deciding are removed
    /// before returning.
    pub fn is_subtype(&mut self, a: &Ty, b: &Ty) -> bool {
        let mut scratch = EditLog::new();
        let result = self.leq(a, b, &BoundOrigin::Builtin, &mut scratch);
        self.undo(&scratch);
        result
    }

    fn any_alternative<F>(&mut self, members: &[Ty], mut check: F, log: &mut EditLog) -> bool
    where
        F: FnMut(&mut InferCtx, &Ty, &mut EditLog) -> bool,
    {
        for m in members {
            let mark = log.len();
            if check(self, m, log) {
                return true;
            }
            self.rollback_to(log, mark);
        }
        false
    }

    /// Closed records: every field of `r` must exist in `s`; fields of `s`
    /// missing from `r` must be optional there; a field optional in `r`
    /// must be optional in `s`.
    fn record_leq(&mut self, r: &Record, s: &Record, origin: &BoundOrigin, log: &mut EditLog) -> bool {
        if r.fields.keys().any(|k| !s.fields.contains_key(k)) {
            return false;
        }
        s.fields.iter().all(|(name, sf)| match r.fields.get(name) {
            Some(rf) => (sf.optional || !rf.optional) && self.leq(&rf.ty, &sf.ty, origin, log),
            None => sf.optional,
        })
    }

    /// Contravariant in parameters, covariant in the result.
    fn method_leq(&mut self, m: &MethodTy, n: &MethodTy, origin: &BoundOrigin, log: &mut EditLog) -> bool {
        if m.params.len() != n.params.len() {
            return false;
        }
        let params_ok = m
            .params
            .iter()
            .zip(&n.params)
            .all(|(mp, np)| self.leq(&np.ty(), &mp.ty(), origin, log));
        let block_ok = match (&m.block, &n.block) {
            (Some(mb), Some(nb)) => self.leq(nb, mb, origin, log),
            _ => true,
        };
        params_ok && block_ok && self.leq(&m.ret, &n.ret, origin, log)
    }
}

/// The class whose instances inhabit `ty`, for method-presence checks.
fn class_of(ty: &Ty) -> Option<TyCon> {
    match ty {
        Ty::Nominal(c) | Ty::Generic(c, _) => Some(c.clone()),
        Ty::Tuple(_) => Some(TyCon::new("Array")),
        Ty::Record(_) => Some(TyCon::new("Hash")),
        Ty::Singleton(lit) => Some(TyCon::new(lit.class_name())),
        Ty::Fn(_) => Some(TyCon::new("Proc")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::VarKind;
    use gradus_types::{parse_ty, ClassTable, Lit};

    fn ctx() -> InferCtx {
        InferCtx::new(ClassTable::with_builtins())
    }

    fn ty(src: &str) -> Ty {
        parse_ty(src).unwrap()
    }

    #[test]
    fn lattice_extremes() {
        let mut c = ctx();
        assert!(c.is_subtype(&Ty::Bot, &Ty::int()));
        assert!(c.is_subtype(&Ty::int(), &Ty::Top));
        assert!(c.is_subtype(&Ty::Nil, &Ty::string()));
        assert!(!c.is_subtype(&Ty::Nil, &Ty::Bot));
        assert!(!c.is_subtype(&Ty::Top, &Ty::int()));
    }

    #[test]
    fn nominal_and_object() {
        let mut c = ctx();
        assert!(c.is_subtype(&Ty::int(), &ty("Numeric")));
        assert!(!c.is_subtype(&ty("Numeric"), &Ty::int()));
        assert!(c.is_subtype(&ty("Array<Int>"), &Ty::object()));
        assert!(c.is_subtype(&Ty::SelfRef, &Ty::object()));
        assert!(!c.is_subtype(&Ty::SelfRef, &Ty::int()));
    }

    #[test]
    fn unions_and_intersections() {
        let mut c = ctx();
        assert!(c.is_subtype(&Ty::int(), &ty("Int or String")));
        assert!(c.is_subtype(&ty("Int or Float"), &ty("Numeric")));
        assert!(!c.is_subtype(&ty("Int or String"), &ty("Numeric")));
        assert!(c.is_subtype(&ty("Int and String"), &Ty::string()));
        assert!(c.is_subtype(&Ty::bool(), &Ty::object()));
    }

    #[test]
    fn generics_are_invariant() {
        let mut c = ctx();
        assert!(c.is_subtype(&ty("Array<Int>"), &ty("Array<Int>")));
        assert!(!c.is_subtype(&ty("Array<Int>"), &ty("Array<Numeric>")));
        assert!(c.is_subtype(&ty("Array<Int>"), &ty("Array")));
    }

    #[test]
    fn tuples_and_records() {
        let mut c = ctx();
        assert!(c.is_subtype(&ty("[Int, Int]"), &ty("Array<Int>")));
        assert!(!c.is_subtype(&ty("[Int, String]"), &ty("Array<Int>")));
        assert!(c.is_subtype(&ty("[Int, String]"), &ty("Array")));
        assert!(c.is_subtype(&ty("{ a: Int }"), &ty("{ a: Numeric, b?: String }")));
        assert!(!c.is_subtype(&ty("{ a: Int, z: Int }"), &ty("{ a: Int }")));
        assert!(c.is_subtype(&ty("{ a: Int, b: Int }"), &ty("Hash<Symbol, Int>")));
    }

    #[test]
    fn singletons_and_structural() {
        let mut c = ctx();
        assert!(c.is_subtype(&Ty::Singleton(Lit::Sym("ok".into())), &Ty::symbol()));
        assert!(!c.is_subtype(&Ty::Singleton(Lit::Int(1)), &Ty::string()));
        let sized = ty("[ size: () -> Int ]");
        assert!(c.is_subtype(&Ty::string(), &sized));
        assert!(!c.is_subtype(&Ty::int(), &sized));
        let both = ty("[ empty?: () -> Bool, size: () -> Int ]");
        assert!(c.is_subtype(&both, &sized));
        assert!(!c.is_subtype(&sized, &both));
    }

    #[test]
    fn method_types_vary_correctly() {
        let mut c = ctx();
        assert!(c.is_subtype(&ty("(Numeric) -> Int"), &ty("(Int) -> Numeric")));
        assert!(!c.is_subtype(&ty("(Int) -> Int"), &ty("(Numeric) -> Int")));
        assert!(c.is_subtype(&ty("(Int) -> nil"), &ty("Proc")));
    }

    #[test]
    fn variables_gain_bounds() {
        let mut c = ctx();
        let v = c.fresh_var(VarKind::Arg, "A", "x");
        let mut log = EditLog::new();
        assert!(c.leq(&Ty::Var(v), &Ty::int(), &BoundOrigin::Builtin, &mut log));
        assert!(c.leq(&Ty::Singleton(Lit::Int(3)), &Ty::Var(v), &BoundOrigin::Builtin, &mut log));
        assert!(c.has_bound(v, Direction::Upper, &Ty::int()));
        let mark = log.len();
        assert!(!c.leq(&Ty::string(), &Ty::Var(v), &BoundOrigin::Builtin, &mut log));
        c.rollback_to(&mut log, mark);
        assert!(!c.has_bound(v, Direction::Lower, &Ty::string()));
        assert_eq!(log.len(), mark);
    }

    #[test]
    fn failed_union_alternative_is_rolled_back() {
        let mut c = ctx();
        let v = c.fresh_var(VarKind::Arg, "A", "x");
        let mut log = EditLog::new();
        c.add_upper_bound(v, Ty::string(), BoundOrigin::Builtin, &mut log).unwrap();
        // Array<?v> <= (Array<Int> or Array<String>): the Int arm fails and
        // must not leave Int behind on v.
        let arr = Ty::array(Ty::Var(v));
        let target = Ty::union(vec![Ty::array(Ty::int()), Ty::array(Ty::string())]);
        let mut attempt = EditLog::new();
        assert!(c.leq(&arr, &target, &BoundOrigin::Builtin, &mut attempt));
        assert!(!c.has_bound(v, Direction::Upper, &Ty::int()));
        assert!(c.has_bound(v, Direction::Lower, &Ty::string()));
    }
}
