//! Solution extraction: turning a variable's bounds into a type.
//!
//! The candidate comes from the bounds (upper bounds for arguments, lower
//! bounds for results). An overly general candidate is handed to the
//! heuristic registry first; each guess is tried by adding it as both
//! bounds of the variable in a fresh edit log, and a guess that breaks an
//! existing bound is rolled back and remembered as failed. Without an
//! accepted guess the candidate itself is recorded the same way.

use std::mem;

use tracing::{debug, trace, warn};

use gradus_types::{Field, MethodTy, Param, Record, Ty, TyVar};

use crate::bounds::{EditLog, SolutionSource, VarKind};
use crate::error::{BoundOrigin, ConstraintViolation};
use crate::heuristics::{Guess, Rule, RuleCtx};
use crate::oracle::{parse_candidates, OracleRequest};
use crate::session::{MethodSolution, Session};

/// Whether a candidate is too imprecise to report as-is.
pub fn is_overly_general(ty: &Ty) -> bool {
    match ty {
        Ty::Union(_) => !ty.is_bool(),
        Ty::Bot | Ty::Top | Ty::Nil | Ty::Structural(_) | Ty::Intersection(_) => true,
        other => other.is_object(),
    }
}

impl Session {
    /// Solve one variable. A non-variable type is returned in canonical
    /// form. The result is also written onto the variable's `solution`.
    pub fn extract_var_sol(&mut self, ty: &Ty, kind: VarKind) -> Ty {
        let var = match ty {
            Ty::Var(v) => *v,
            other => return self.ctx.canonical(other),
        };
        if !self.in_progress.insert(var) {
            return Ty::Var(var);
        }
        let sol = self.solve_var(var, kind);
        self.in_progress.remove(&var);
        self.ctx.info_mut(var).solution = Some(sol.clone());
        sol
    }

    /// Resolve every component of a signature and write the solutions back
    /// onto its variables.
    pub fn extract_meth_sol(&mut self, sig: &MethodTy) -> MethodSolution {
        let mut params = Vec::with_capacity(sig.params.len());
        for param in &sig.params {
            let solved = match param {
                Param::Required(t) => Param::Required(self.extract_var_sol(t, VarKind::Arg)),
                Param::Optional(t) => Param::Optional(self.extract_var_sol(t, VarKind::Arg)),
                Param::Vararg(t) => Param::Vararg(self.extract_var_sol(t, VarKind::Arg)),
                Param::Keywords(rec) => {
                    let mut solved = Record::new();
                    for (name, field) in &rec.fields {
                        let ty = self.extract_var_sol(&field.ty, VarKind::Arg);
                        solved.fields.insert(
                            name.clone(),
                            Field {
                                ty,
                                optional: field.optional,
                            },
                        );
                    }
                    Param::Keywords(solved)
                }
            };
            params.push(solved);
        }

        let block = match &sig.block {
            Some(Ty::Var(bv)) => Some(self.extract_block_sol(*bv)),
            Some(Ty::Fn(m)) => Some(Ty::method(self.extract_meth_sol(m).into())),
            other => other.clone(),
        };

        let ret = match &sig.ret {
            Ty::SelfRef => Ty::SelfRef,
            Ty::Var(_) => self.extract_var_sol(&sig.ret, VarKind::Ret),
            other => other.clone(),
        };

        MethodSolution { params, block, ret }
    }

    // ── Candidates ──────────────────────────────────────────────────────

    fn candidate(&mut self, var: TyVar, kind: VarKind) -> Ty {
        let info = self.ctx.info(var);
        let lower: Vec<Ty> = info.lower_tys().filter(|t| !t.is_var()).cloned().collect();
        let upper: Vec<Ty> = info.upper_tys().filter(|t| !t.is_var()).cloned().collect();
        let use_upper = match kind {
            VarKind::Arg => true,
            VarKind::Ret => false,
            VarKind::Var => {
                let lower_all = info.lower_tys().collect::<Vec<_>>();
                lower_all.is_empty() || (lower_all.len() == 1 && *lower_all[0] == Ty::Bot)
            }
        };
        let combined = if use_upper {
            Ty::Intersection(upper)
        } else {
            Ty::Union(lower)
        };
        let canon = self.ctx.canonical(&combined);
        self.ctx.canonical(&canon.drop_vars())
    }

    // ── Heuristics ──────────────────────────────────────────────────────

    fn rule_enabled(&self, rule: &Rule) -> bool {
        match rule {
            Rule::Oracle => {
                self.config.use_oracle
                    && self.oracle_ready
                    && !(self.pass == 1 && self.config.oracle.skip_first_pass)
            }
            Rule::Named(_) => self.config.use_heuristics,
        }
    }

    fn guess(&mut self, rule: &Rule, var: TyVar) -> Guess {
        match rule {
            Rule::Named(named) => {
                let ctx = RuleCtx {
                    var,
                    info: self.ctx.info(var),
                    classes: self.ctx.classes(),
                };
                named.guess(&ctx).map_or(Guess::None, Guess::One)
            }
            Rule::Oracle => self.ask_oracle(var),
        }
    }

    fn ask_oracle(&mut self, var: TyVar) -> Guess {
        let info = self.ctx.info(var);
        let request = OracleRequest {
            owner: info.owner.clone(),
            position: info.kind.to_string(),
            name: info.name.clone(),
            lower: info.lower_tys().map(ToString::to_string).collect(),
            upper: info.upper_tys().map(ToString::to_string).collect(),
            top_n: self.config.oracle.top_n,
        };
        let Some(oracle) = self.oracle.as_mut() else {
            return Guess::None;
        };
        match oracle.query(&request) {
            Ok(raw) => Guess::Ranked(parse_candidates(&raw)),
            Err(e) => {
                warn!(var = var.0, error = %e, "oracle query failed");
                Guess::None
            }
        }
    }

    /// Run the registry in order; the first accepted guess wins.
    fn apply_heuristics(&mut self, var: TyVar) -> Option<Ty> {
        let registry = mem::take(&mut self.registry);
        let mut accepted = None;
        for rule in registry.iter() {
            if !self.rule_enabled(rule) {
                continue;
            }
            debug!(rule = rule.name(), var = var.0, "trying heuristic");
            let (candidates, source) = match self.guess(rule, var) {
                Guess::None => continue,
                Guess::One(t) => {
                    self.tried_heuristic.insert(var);
                    (vec![t], SolutionSource::Heuristic(rule.name().to_string()))
                }
                Guess::Ranked(ts) => (ts, SolutionSource::Twin),
            };
            if let Some(sol) = self.accept_first(var, candidates, source == SolutionSource::Twin) {
                debug!(rule = rule.name(), var = var.0, solution = %sol, "heuristic applied");
                push_unique(self.type_vars.entry(sol.clone()).or_default(), var);
                self.set_source(var, &sol, source);
                accepted = Some(sol);
                break;
            }
        }
        self.registry = registry;
        accepted
    }

    /// Try `candidates` in order. Oracle candidates mark the variable as
    /// tried once the first one is considered.
    fn accept_first(&mut self, var: TyVar, candidates: Vec<Ty>, from_oracle: bool) -> Option<Ty> {
        for candidate in candidates {
            if from_oracle {
                self.tried_oracle.insert(var);
            }
            let candidate = self.ctx.canonical(&candidate);
            if self.is_failed(var, &candidate) {
                trace!(var = var.0, candidate = %candidate, "skipping failed candidate");
                continue;
            }
            if self.attempt(var, &candidate, true, true) {
                return Some(candidate);
            }
        }
        None
    }

    // ── Recording a solution ────────────────────────────────────────────

    /// Add `candidate` to `var`'s bounds in a fresh edit log. A violation
    /// rolls the attempt back and caches the candidate as failed.
    fn attempt(&mut self, var: TyVar, candidate: &Ty, upper: bool, lower: bool) -> bool {
        let mut log = EditLog::new();
        match self.add_solution_bounds(var, candidate, upper, lower, &mut log) {
            Ok(()) => {
                if !log.is_empty() {
                    trace!(var = var.0, edits = log.len(), "new constraints");
                    self.new_constraints = true;
                }
                true
            }
            Err(violation) => {
                debug!(var = var.0, candidate = %candidate, error = %violation, "candidate rejected");
                self.failed.entry(var).or_default().insert(candidate.clone());
                self.ctx.undo(&log);
                false
            }
        }
    }

    fn add_solution_bounds(
        &mut self,
        var: TyVar,
        candidate: &Ty,
        upper: bool,
        lower: bool,
        log: &mut EditLog,
    ) -> Result<(), ConstraintViolation> {
        if upper {
            self.ctx.add_upper_bound(var, candidate.clone(), BoundOrigin::Solution, log)?;
        }
        if lower {
            self.ctx.add_lower_bound(var, candidate.clone(), BoundOrigin::Solution, log)?;
        }
        Ok(())
    }

    fn set_source(&mut self, var: TyVar, sol: &Ty, source: SolutionSource) {
        let info = self.ctx.info_mut(var);
        if info.solution.as_ref() != Some(sol) {
            info.solution_source = Some(source);
        }
    }

    fn solve_var(&mut self, var: TyVar, kind: VarKind) -> Ty {
        let candidate = self.candidate(var, kind);
        if is_overly_general(&candidate) {
            if let Some(sol) = self.apply_heuristics(var) {
                return sol;
            }
        }

        // Fall back to the bound-derived candidate.
        if candidate == Ty::Bot || candidate.is_var() {
            return Ty::Var(var);
        }
        let candidate = self.ctx.canonical(&candidate);
        let accepted = if self.is_failed(var, &candidate) {
            debug!(var = var.0, candidate = %candidate, "candidate failed earlier");
            false
        } else {
            let upper = candidate != Ty::Nil;
            let lower = !candidate.is_structural_like();
            self.attempt(var, &candidate, upper, lower)
        };

        let sol = if accepted {
            match candidate {
                Ty::Generic(base, params) => {
                    let params = params
                        .iter()
                        .map(|p| match p {
                            Ty::Var(pv) if !self.ctx.info(*pv).to_infer || *pv == var => p.clone(),
                            _ => self.extract_var_sol(p, kind),
                        })
                        .collect();
                    Ty::Generic(base, params)
                }
                Ty::Tuple(elems) => Ty::Tuple(elems.iter().map(|e| self.extract_var_sol(e, kind)).collect()),
                other => other,
            }
        } else {
            Ty::Var(var)
        };

        let indexed = matches!(sol, Ty::Nominal(_) | Ty::Generic(..) | Ty::Tuple(_) | Ty::Record(_)) || sol.is_bool();
        if indexed && !sol.is_object() {
            let name = self.ctx.info(var).name.clone();
            push_unique(self.type_names.entry(sol.clone()).or_default(), name);
            push_unique(self.type_vars.entry(sol.clone()).or_default(), var);
        }
        self.set_source(var, &sol, SolutionSource::Constraints);
        sol
    }

    /// A block variable: its non-variable, non-structural upper bounds.
    fn extract_block_sol(&mut self, block_var: TyVar) -> Ty {
        if self.ctx.info(block_var).upper.is_empty() {
            return Ty::Var(block_var);
        }
        let mut uppers: Vec<Ty> = Vec::new();
        for ub in self.ctx.info(block_var).upper.clone() {
            let canon = self.ctx.canonical(&ub.ty);
            if !canon.is_var() && !matches!(canon, Ty::Structural(_)) && !uppers.contains(&canon) {
                uppers.push(canon);
            }
        }
        let sol = match uppers.len() {
            0 => Ty::Var(block_var),
            1 => match uppers.swap_remove(0) {
                Ty::Nominal(c) if c.name == "Proc" => Ty::Nominal(c),
                Ty::Fn(m) => Ty::method(self.extract_meth_sol(&m).into()),
                _ => Ty::Var(block_var),
            },
            _ => {
                let members = match Ty::intersection(uppers) {
                    Ty::Intersection(ms) => ms,
                    single => vec![single],
                };
                let mut resolved = Vec::with_capacity(members.len());
                for m in members {
                    resolved.push(match m {
                        Ty::Fn(sig) => Ty::method(self.extract_meth_sol(&sig).into()),
                        other => other,
                    });
                }
                Ty::intersection(resolved)
            }
        };
        self.ctx.info_mut(block_var).solution = Some(sol.clone());
        sol
    }
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradus_types::parse_ty;

    #[test]
    fn overly_general_gate() {
        for desc in ["Object", "%any", "%bot", "nil", "(Int or String)", "[ size: () -> Int ]"] {
            let ty = parse_ty(desc).unwrap();
            assert!(is_overly_general(&ty), "{} should be overly general", desc);
        }
        let inter = Ty::Intersection(vec![Ty::int(), Ty::structural([("succ", MethodTy::new(vec![], None, Ty::int()).unwrap())])]);
        assert!(is_overly_general(&inter));
        for desc in ["Int", "Array<String>", "[Int, String]", "Bool", "{ a: Int }"] {
            let ty = parse_ty(desc).unwrap();
            assert!(!is_overly_general(&ty), "{} should be precise", desc);
        }
    }
}
