//! The bound store: per-variable lower and upper bounds with propagation
//! and transactional undo.
//!
//! There is no separate solve step. Adding a bound checks it against every
//! opposing bound already on the variable, and that check may itself add
//! bounds to other variables met along the way. Every insertion is
//! recorded in an `EditLog` so an attempt can be rolled back exactly.

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::trace;

use gradus_types::{ClassTable, Ty, TyVar};

use crate::error::{BoundOrigin, ConstraintViolation};

/// The role a variable plays, which decides how its solution is derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VarKind {
    /// A method argument: solved from its upper bounds.
    Arg,
    /// A method result: solved from its lower bounds.
    Ret,
    /// An instance/class variable: lower bounds when informative, else upper.
    Var,
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKind::Arg => write!(f, "arg"),
            VarKind::Ret => write!(f, "ret"),
            VarKind::Var => write!(f, "var"),
        }
    }
}

/// Which mechanism produced a variable's current solution.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SolutionSource {
    Constraints,
    Heuristic(String),
    /// The similarity oracle.
    Twin,
}

impl fmt::Display for SolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionSource::Constraints => write!(f, "Constraints"),
            SolutionSource::Heuristic(name) => write!(f, "Heuristic:{}", name),
            SolutionSource::Twin => write!(f, "Twin"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bound {
    pub ty: Ty,
    pub origin: BoundOrigin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Lower,
    Upper,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Lower => write!(f, "lower"),
            Direction::Upper => write!(f, "upper"),
        }
    }
}

/// Everything the store knows about one variable.
#[derive(Clone, Debug)]
pub struct VarInfo {
    pub kind: VarKind,
    /// The owning class or signature, for reporting.
    pub owner: String,
    /// The argument, method or variable name, for reporting.
    pub name: String,
    /// Whether extraction should try to solve this variable. Generic
    /// parameters of library types are not inferred.
    pub to_infer: bool,
    pub lower: Vec<Bound>,
    pub upper: Vec<Bound>,
    pub solution: Option<Ty>,
    pub solution_source: Option<SolutionSource>,
}

impl VarInfo {
    pub fn bounds(&self, dir: Direction) -> &[Bound] {
        match dir {
            Direction::Lower => &self.lower,
            Direction::Upper => &self.upper,
        }
    }

    fn bounds_mut(&mut self, dir: Direction) -> &mut Vec<Bound> {
        match dir {
            Direction::Lower => &mut self.lower,
            Direction::Upper => &mut self.upper,
        }
    }

    /// Lower-bound types, in insertion order.
    pub fn lower_tys(&self) -> impl Iterator<Item = &Ty> {
        self.lower.iter().map(|b| &b.ty)
    }

    /// Upper-bound types, in insertion order.
    pub fn upper_tys(&self) -> impl Iterator<Item = &Ty> {
        self.upper.iter().map(|b| &b.ty)
    }
}

/// One recorded bound insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    pub var: TyVar,
    pub dir: Direction,
    pub bound: Bound,
}

/// The bound insertions made during one attempt, in order.
#[derive(Clone, Debug, Default)]
pub struct EditLog {
    edits: Vec<Edit>,
}

impl EditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edit> {
        self.edits.iter()
    }

    fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }
}

/// The inference context -- owns every variable's bounds, the class table
/// and the canonicalization memo.
pub struct InferCtx {
    /// Indexed by `TyVar.0`.
    vars: Vec<VarInfo>,
    classes: ClassTable,
    canonical_memo: FxHashMap<Ty, Ty>,
}

impl InferCtx {
    pub fn new(classes: ClassTable) -> Self {
        InferCtx {
            vars: Vec::new(),
            classes,
            canonical_memo: FxHashMap::default(),
        }
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn classes_mut(&mut self) -> &mut ClassTable {
        &mut self.classes
    }

    // ── Variables ───────────────────────────────────────────────────────

    /// Create a fresh variable to be inferred.
    pub fn fresh_var(&mut self, kind: VarKind, owner: impl Into<String>, name: impl Into<String>) -> TyVar {
        let var = TyVar(self.vars.len() as u32);
        self.vars.push(VarInfo {
            kind,
            owner: owner.into(),
            name: name.into(),
            to_infer: true,
            lower: Vec::new(),
            upper: Vec::new(),
            solution: None,
            solution_source: None,
        });
        var
    }

    /// Create a variable that extraction never tries to solve.
    pub fn fixed_var(&mut self, kind: VarKind, owner: impl Into<String>, name: impl Into<String>) -> TyVar {
        let var = self.fresh_var(kind, owner, name);
        self.vars[var.0 as usize].to_infer = false;
        var
    }

    pub fn contains(&self, var: TyVar) -> bool {
        (var.0 as usize) < self.vars.len()
    }

    /// Panics if `var` was not created by this context.
    pub fn info(&self, var: TyVar) -> &VarInfo {
        &self.vars[var.0 as usize]
    }

    pub fn info_mut(&mut self, var: TyVar) -> &mut VarInfo {
        &mut self.vars[var.0 as usize]
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Whether `var` has a bound of type `ty` in `dir`, whatever its origin.
    pub fn has_bound(&self, var: TyVar, dir: Direction, ty: &Ty) -> bool {
        self.info(var).bounds(dir).iter().any(|b| &b.ty == ty)
    }

    // ── Canonical forms ─────────────────────────────────────────────────

    /// `ty.canonical()`, memoized on the structural hash.
    pub fn canonical(&mut self, ty: &Ty) -> Ty {
        if let Some(hit) = self.canonical_memo.get(ty) {
            return hit.clone();
        }
        let canon = ty.canonical();
        self.canonical_memo.insert(ty.clone(), canon.clone());
        canon
    }

    // ── Adding bounds ───────────────────────────────────────────────────

    /// Add `ty` as an upper bound of `var` and propagate it.
    ///
    /// Atomic: on a violation every bound this call added is removed again
    /// before the error is returned. Successful insertions are appended to
    /// `log`.
    pub fn add_upper_bound(
        &mut self,
        var: TyVar,
        ty: Ty,
        origin: BoundOrigin,
        log: &mut EditLog,
    ) -> Result<(), ConstraintViolation> {
        let mark = log.len();
        let result = self.push_upper(var, ty, &origin, log);
        if result.is_err() {
            self.rollback_to(log, mark);
        }
        result
    }

    /// Add `ty` as a lower bound of `var` and propagate it. Atomic, like
    /// [`InferCtx::add_upper_bound`].
    pub fn add_lower_bound(
        &mut self,
        var: TyVar,
        ty: Ty,
        origin: BoundOrigin,
        log: &mut EditLog,
    ) -> Result<(), ConstraintViolation> {
        let mark = log.len();
        let result = self.push_lower(var, ty, &origin, log);
        if result.is_err() {
            self.rollback_to(log, mark);
        }
        result
    }

    pub(crate) fn push_upper(
        &mut self,
        var: TyVar,
        ty: Ty,
        origin: &BoundOrigin,
        log: &mut EditLog,
    ) -> Result<(), ConstraintViolation> {
        if ty == Ty::Var(var) {
            return Ok(());
        }
        self.insert(var, Direction::Upper, &ty, origin, log);
        let lowers = self.info(var).lower.clone();
        for lb in lowers {
            match &lb.ty {
                Ty::Var(w) => {
                    if !self.has_bound(*w, Direction::Upper, &ty) {
                        self.push_upper(*w, ty.clone(), origin, log)?;
                    }
                }
                lower => {
                    if !self.leq(lower, &ty, origin, log) {
                        return Err(ConstraintViolation {
                            var,
                            lower: lower.clone(),
                            upper: ty,
                            origin: origin.clone(),
                            conflicting: lb.origin.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn push_lower(
        &mut self,
        var: TyVar,
        ty: Ty,
        origin: &BoundOrigin,
        log: &mut EditLog,
    ) -> Result<(), ConstraintViolation> {
        if ty == Ty::Var(var) {
            return Ok(());
        }
        self.insert(var, Direction::Lower, &ty, origin, log);
        let uppers = self.info(var).upper.clone();
        for ub in uppers {
            match &ub.ty {
                Ty::Var(w) => {
                    if !self.has_bound(*w, Direction::Lower, &ty) {
                        self.push_lower(*w, ty.clone(), origin, log)?;
                    }
                }
                upper => {
                    if !self.leq(&ty, upper, origin, log) {
                        return Err(ConstraintViolation {
                            var,
                            lower: ty,
                            upper: upper.clone(),
                            origin: origin.clone(),
                            conflicting: ub.origin.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, var: TyVar, dir: Direction, ty: &Ty, origin: &BoundOrigin, log: &mut EditLog) {
        let bound = Bound {
            ty: ty.clone(),
            origin: origin.clone(),
        };
        let bounds = self.info_mut(var).bounds_mut(dir);
        if bounds.contains(&bound) {
            return;
        }
        bounds.push(bound.clone());
        trace!(var = var.0, %dir, ty = %ty, "bound added");
        log.push(Edit { var, dir, bound });
    }

    // ── Undo ────────────────────────────────────────────────────────────

    /// Remove every bound recorded in `log`, newest first. Bounds that are
    /// already gone are skipped.
    pub fn undo(&mut self, log: &EditLog) {
        for edit in log.edits.iter().rev() {
            self.remove(edit);
        }
    }

    /// Undo and forget the edits recorded after `mark`.
    pub(crate) fn rollback_to(&mut self, log: &mut EditLog, mark: usize) {
        if mark >= log.edits.len() {
            return;
        }
        let tail = log.edits.split_off(mark);
        for edit in tail.iter().rev() {
            self.remove(edit);
        }
    }

    fn remove(&mut self, edit: &Edit) {
        let bounds = self.info_mut(edit.var).bounds_mut(edit.dir);
        if let Some(pos) = bounds.iter().rposition(|b| b == &edit.bound) {
            bounds.remove(pos);
            trace!(var = edit.var.0, dir = %edit.dir, ty = %edit.bound.ty, "bound removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> InferCtx {
        InferCtx::new(ClassTable::with_builtins())
    }

    fn snapshot(ctx: &InferCtx) -> Vec<(Vec<Bound>, Vec<Bound>)> {
        (0..ctx.var_count() as u32)
            .map(|i| {
                let info = ctx.info(TyVar(i));
                (info.lower.clone(), info.upper.clone())
            })
            .collect()
    }

    #[test]
    fn compatible_upper_bound_is_accepted() {
        let mut ctx = ctx();
        let v = ctx.fresh_var(VarKind::Arg, "A", "x");
        let mut log = EditLog::new();
        ctx.add_lower_bound(v, Ty::int(), BoundOrigin::Builtin, &mut log).unwrap();
        ctx.add_upper_bound(v, Ty::nominal("Numeric"), BoundOrigin::Builtin, &mut log).unwrap();
        assert_eq!(ctx.info(v).upper.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn violating_upper_bound_leaves_store_unchanged() {
        let mut ctx = ctx();
        let v = ctx.fresh_var(VarKind::Arg, "A", "x");
        let mut log = EditLog::new();
        ctx.add_lower_bound(v, Ty::int(), BoundOrigin::Builtin, &mut log).unwrap();
        let before = snapshot(&ctx);
        let err = ctx
            .add_upper_bound(v, Ty::string(), BoundOrigin::Solution, &mut log)
            .unwrap_err();
        assert_eq!(err.lower, Ty::int());
        assert_eq!(err.upper, Ty::string());
        assert_eq!(snapshot(&ctx), before);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn bounds_flow_through_variable_chains() {
        let mut ctx = ctx();
        let a = ctx.fresh_var(VarKind::Var, "A", "@a");
        let b = ctx.fresh_var(VarKind::Arg, "A", "b");
        let mut log = EditLog::new();
        // a <= b, then Int <= a: b learns Int as a lower bound.
        ctx.add_upper_bound(a, Ty::Var(b), BoundOrigin::Builtin, &mut log).unwrap();
        ctx.add_lower_bound(a, Ty::int(), BoundOrigin::Builtin, &mut log).unwrap();
        assert!(ctx.has_bound(b, Direction::Lower, &Ty::int()));
        // An incompatible upper bound on b is rejected and nothing sticks.
        let before = snapshot(&ctx);
        assert!(ctx
            .add_upper_bound(b, Ty::string(), BoundOrigin::Builtin, &mut log)
            .is_err());
        assert_eq!(snapshot(&ctx), before);
    }

    #[test]
    fn undo_restores_exact_state() {
        let mut ctx = ctx();
        let v = ctx.fresh_var(VarKind::Arg, "A", "x");
        let w = ctx.fresh_var(VarKind::Arg, "A", "y");
        let mut setup = EditLog::new();
        ctx.add_lower_bound(v, Ty::int(), BoundOrigin::Builtin, &mut setup).unwrap();
        let before = snapshot(&ctx);

        let mut attempt = EditLog::new();
        ctx.add_upper_bound(v, Ty::Var(w), BoundOrigin::Solution, &mut attempt).unwrap();
        let _ = ctx.add_upper_bound(v, Ty::string(), BoundOrigin::Solution, &mut attempt);
        ctx.add_upper_bound(w, Ty::nominal("Numeric"), BoundOrigin::Solution, &mut attempt)
            .unwrap();
        assert!(!attempt.is_empty());

        ctx.undo(&attempt);
        assert_eq!(snapshot(&ctx), before);
        // A second undo finds nothing left to remove.
        ctx.undo(&attempt);
        assert_eq!(snapshot(&ctx), before);
    }

    #[test]
    fn duplicate_bounds_are_not_logged_twice() {
        let mut ctx = ctx();
        let v = ctx.fresh_var(VarKind::Ret, "A", "m");
        let mut log = EditLog::new();
        ctx.add_lower_bound(v, Ty::int(), BoundOrigin::Builtin, &mut log).unwrap();
        ctx.add_lower_bound(v, Ty::int(), BoundOrigin::Builtin, &mut log).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(ctx.info(v).lower.len(), 1);
    }

    #[test]
    fn self_bound_is_ignored() {
        let mut ctx = ctx();
        let v = ctx.fresh_var(VarKind::Var, "A", "@a");
        let mut log = EditLog::new();
        ctx.add_upper_bound(v, Ty::Var(v), BoundOrigin::Builtin, &mut log).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn solution_source_display() {
        assert_eq!(SolutionSource::Constraints.to_string(), "Constraints");
        assert_eq!(SolutionSource::Heuristic("int_names".into()).to_string(), "Heuristic:int_names");
        assert_eq!(SolutionSource::Twin.to_string(), "Twin");
    }
}
