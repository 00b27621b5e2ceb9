//! The inference session: declared entities, session-wide caches and the
//! fixed-point extraction driver.
//!
//! A checking pass populates the session's [`InferCtx`] with variables and
//! bounds, then declares the method signatures and instance/class
//! variables whose types should be extracted. `extract_solutions` re-runs
//! extraction over every entity until a pass adds no bound anywhere.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use rowan::TextRange;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, warn};

use gradus_types::{ClassTable, MethodTy, Param, Ty, TyVar};

use crate::bounds::{EditLog, InferCtx, SolutionSource, VarKind};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::heuristics::HeuristicRegistry;
use crate::oracle::{HttpOracle, SimilarityOracle};

/// Something whose type is extracted: a method signature or a variable.
#[derive(Clone, Debug)]
pub enum Entity {
    Signature {
        owner: String,
        name: String,
        sig: MethodTy,
        snippet: Option<TextRange>,
    },
    Variable {
        owner: String,
        name: String,
        var: Ty,
        snippet: Option<TextRange>,
    },
}

/// The resolved form of a method signature.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodSolution {
    pub params: Vec<Param>,
    pub block: Option<Ty>,
    pub ret: Ty,
}

impl From<MethodSolution> for MethodTy {
    fn from(sol: MethodSolution) -> MethodTy {
        // Same component shape as the signature it was extracted from.
        MethodTy {
            params: sol.params,
            block: sol.block,
            ret: sol.ret,
        }
    }
}

impl fmt::Display for MethodSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", MethodTy::from(self.clone()))
    }
}

/// One reportable position of an extracted entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    pub kind: VarKind,
    pub name: String,
    /// The declared variable, if the position was a variable.
    pub var: Option<TyVar>,
    /// The solution with any optional/vararg wrapper removed.
    pub solution: Ty,
    pub source: Option<SolutionSource>,
}

/// One entity's extraction result.
#[derive(Clone, Debug, PartialEq)]
pub enum Extracted {
    Signature {
        owner: String,
        name: String,
        snippet: Option<TextRange>,
        solution: MethodSolution,
        args: Vec<Slot>,
        ret: Slot,
    },
    Variable {
        owner: String,
        name: String,
        snippet: Option<TextRange>,
        slot: Slot,
    },
}

impl Extracted {
    pub fn owner(&self) -> &str {
        match self {
            Extracted::Signature { owner, .. } | Extracted::Variable { owner, .. } => owner,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Extracted::Signature { name, .. } | Extracted::Variable { name, .. } => name,
        }
    }

    pub fn snippet(&self) -> Option<TextRange> {
        match self {
            Extracted::Signature { snippet, .. } | Extracted::Variable { snippet, .. } => *snippet,
        }
    }
}

/// Session-scoped inference state.
pub struct Session {
    pub(crate) ctx: InferCtx,
    pub(crate) registry: HeuristicRegistry,
    pub(crate) oracle: Option<Box<dyn SimilarityOracle>>,
    /// Set while the oracle is open for the current extraction run.
    pub(crate) oracle_ready: bool,
    pub(crate) config: EngineConfig,
    entities: Vec<Entity>,
    /// Candidates rejected per variable. Survives passes; cleared by `reset`.
    pub(crate) failed: FxHashMap<TyVar, FxHashSet<Ty>>,
    pub(crate) type_names: FxHashMap<Ty, Vec<String>>,
    pub(crate) type_vars: FxHashMap<Ty, Vec<TyVar>>,
    pub(crate) tried_heuristic: FxHashSet<TyVar>,
    pub(crate) tried_oracle: FxHashSet<TyVar>,
    /// Variables currently being extracted, to cut recursion through
    /// generic parameters.
    pub(crate) in_progress: FxHashSet<TyVar>,
    pub(crate) new_constraints: bool,
    pub(crate) pass: usize,
}

impl Session {
    /// A session with the default heuristics and, when `use_oracle` is set,
    /// an HTTP oracle client built from `config.oracle`.
    pub fn new(classes: ClassTable, config: EngineConfig) -> Self {
        let oracle: Option<Box<dyn SimilarityOracle>> = if config.use_oracle {
            Some(Box::new(HttpOracle::new(&config.oracle)))
        } else {
            None
        };
        Session {
            ctx: InferCtx::new(classes),
            registry: HeuristicRegistry::with_defaults(),
            oracle,
            oracle_ready: false,
            config,
            entities: Vec::new(),
            failed: FxHashMap::default(),
            type_names: FxHashMap::default(),
            type_vars: FxHashMap::default(),
            tried_heuristic: FxHashSet::default(),
            tried_oracle: FxHashSet::default(),
            in_progress: FxHashSet::default(),
            new_constraints: false,
            pass: 0,
        }
    }

    /// Replace the heuristic registry.
    pub fn with_registry(mut self, registry: HeuristicRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the oracle client.
    pub fn with_oracle(mut self, oracle: Box<dyn SimilarityOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn ctx(&self) -> &InferCtx {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut InferCtx {
        &mut self.ctx
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &HeuristicRegistry {
        &self.registry
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of passes the last `extract_solutions` run took.
    pub fn passes(&self) -> usize {
        self.pass
    }

    pub fn solution(&self, var: TyVar) -> Option<&Ty> {
        self.ctx.info(var).solution.as_ref()
    }

    pub fn solution_source(&self, var: TyVar) -> Option<&SolutionSource> {
        self.ctx.info(var).solution_source.as_ref()
    }

    /// Whether `candidate` has been rejected for `var` this session.
    pub fn is_failed(&self, var: TyVar, candidate: &Ty) -> bool {
        self.failed.get(&var).map_or(false, |set| set.contains(candidate))
    }

    pub fn failed_candidates(&self, var: TyVar) -> Vec<Ty> {
        let mut out: Vec<Ty> = self
            .failed
            .get(&var)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    /// Names of the variables solved to `ty`.
    pub fn names_for(&self, ty: &Ty) -> &[String] {
        self.type_names.get(ty).map_or(&[], Vec::as_slice)
    }

    /// Variables solved to `ty`.
    pub fn vars_for(&self, ty: &Ty) -> &[TyVar] {
        self.type_vars.get(ty).map_or(&[], Vec::as_slice)
    }

    pub fn tried_heuristic(&self, var: TyVar) -> bool {
        self.tried_heuristic.contains(&var)
    }

    pub fn tried_oracle(&self, var: TyVar) -> bool {
        self.tried_oracle.contains(&var)
    }

    /// Clear every session-wide cache and index. Declared entities and the
    /// bound store are kept.
    pub fn reset(&mut self) {
        self.failed.clear();
        self.type_names.clear();
        self.type_vars.clear();
        self.tried_heuristic.clear();
        self.tried_oracle.clear();
        self.in_progress.clear();
        self.new_constraints = false;
        self.pass = 0;
    }

    // ── Declarations ────────────────────────────────────────────────────

    /// Declare a method signature for extraction. Every argument component
    /// must be a variable (keyword records: every field), and every
    /// variable in the signature must belong to this session.
    pub fn declare_signature(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        sig: MethodTy,
        snippet: Option<TextRange>,
    ) -> Result<(), EngineError> {
        let name = name.into();
        sig.validate()?;
        for param in &sig.params {
            let leaves: Vec<Ty> = match param {
                Param::Required(t) | Param::Optional(t) | Param::Vararg(t) => vec![t.clone()],
                Param::Keywords(rec) => rec.fields.values().map(|f| f.ty.clone()).collect(),
            };
            if let Some(found) = leaves.into_iter().find(|t| !t.is_var()) {
                return Err(EngineError::UnexpectedVariableForm { name, found });
            }
        }
        let mut vars = Vec::new();
        sig.collect_vars(&mut vars);
        if let Some(foreign) = vars.into_iter().find(|v| !self.ctx.contains(*v)) {
            return Err(EngineError::UnexpectedVariableForm {
                name,
                found: Ty::Var(foreign),
            });
        }
        self.entities.push(Entity::Signature {
            owner: owner.into(),
            name,
            sig,
            snippet,
        });
        Ok(())
    }

    /// Declare an instance or class variable for extraction.
    pub fn declare_variable(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        var: Ty,
        snippet: Option<TextRange>,
    ) -> Result<(), EngineError> {
        let name = name.into();
        match var.as_var() {
            Some(v) if self.ctx.contains(v) => {}
            _ => return Err(EngineError::UnexpectedVariableForm { name, found: var }),
        }
        self.entities.push(Entity::Variable {
            owner: owner.into(),
            name,
            var,
            snippet,
        });
        Ok(())
    }

    // ── Drivers ─────────────────────────────────────────────────────────

    /// Re-assert every stored bound of every declared variable that has no
    /// concrete solution yet through the propagation path. A contradiction
    /// is returned, or logged and skipped when `continue_on_errors` is set.
    pub fn resolve_constraints(&mut self) -> Result<(), EngineError> {
        info!(entities = self.entities.len(), "starting constraint resolution");
        let entities = self.entities.clone();
        for entity in &entities {
            for var in entity_vars(entity) {
                let unresolved = self.ctx.info(var).solution.as_ref().map_or(true, Ty::is_var);
                if !unresolved {
                    continue;
                }
                if let Err(e) = self.reassert(var) {
                    if !self.config.continue_on_errors {
                        return Err(e.into());
                    }
                    debug!(var = var.0, error = %e, "contradiction while resolving constraints; skipping");
                }
            }
        }
        Ok(())
    }

    fn reassert(&mut self, var: TyVar) -> Result<(), crate::error::ConstraintViolation> {
        let info = self.ctx.info(var).clone();
        let mut log = EditLog::new();
        for bound in info.lower {
            self.ctx.add_lower_bound(var, bound.ty, bound.origin, &mut log)?;
        }
        for bound in info.upper {
            self.ctx.add_upper_bound(var, bound.ty, bound.origin, &mut log)?;
        }
        Ok(())
    }

    /// Extract every declared entity repeatedly until a pass adds no bound,
    /// or `max_passes` is reached. The oracle, when enabled, is opened
    /// before the first pass and closed on every exit path, unwinding
    /// included. An oracle that fails to open is skipped, or reported as
    /// `OracleUnavailable` when `continue_on_errors` is off.
    pub fn extract_solutions(&mut self) -> Result<Vec<Extracted>, EngineError> {
        info!(entities = self.entities.len(), "begin solution extraction");
        let opened = self.open_oracle()?;
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_to_fixed_point()));
        if opened {
            self.close_oracle();
        }
        match result {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    fn open_oracle(&mut self) -> Result<bool, EngineError> {
        if !self.config.use_oracle {
            return Ok(false);
        }
        let Some(oracle) = self.oracle.as_mut() else {
            warn!("oracle enabled but no client configured");
            return Ok(false);
        };
        match oracle.open() {
            Ok(()) => {
                self.oracle_ready = true;
                Ok(true)
            }
            Err(e) if !self.config.continue_on_errors => Err(e.into()),
            Err(e) => {
                warn!(error = %e, "could not open oracle session; continuing without it");
                Ok(false)
            }
        }
    }

    fn close_oracle(&mut self) {
        if let Some(oracle) = self.oracle.as_mut() {
            oracle.close();
        }
        self.oracle_ready = false;
    }

    fn run_to_fixed_point(&mut self) -> Result<Vec<Extracted>, EngineError> {
        self.pass = 0;
        loop {
            self.pass += 1;
            self.new_constraints = false;
            info!(pass = self.pass, "running solution extraction");

            let entities = self.entities.clone();
            let results: Vec<Extracted> = entities.iter().map(|e| self.extract_entity(e)).collect();

            if !self.new_constraints {
                info!(passes = self.pass, "reached fixed point");
                return Ok(results);
            }
            if self.pass >= self.config.max_passes {
                warn!(passes = self.pass, "pass limit reached before a fixed point");
                return Ok(results);
            }
        }
    }

    fn extract_entity(&mut self, entity: &Entity) -> Extracted {
        match entity {
            Entity::Signature {
                owner,
                name,
                sig,
                snippet,
            } => {
                debug!(%owner, %name, "extracting signature");
                let solution = self.extract_meth_sol(sig);
                let args = sig
                    .params
                    .iter()
                    .zip(&solution.params)
                    .map(|(declared, solved)| self.slot(VarKind::Arg, declared, solved.ty()))
                    .collect();
                let ret = match &sig.ret {
                    Ty::Var(v) => self.var_slot(VarKind::Ret, *v, solution.ret.clone()),
                    other => Slot {
                        kind: VarKind::Ret,
                        name: name.clone(),
                        var: None,
                        solution: other.clone(),
                        source: None,
                    },
                };
                Extracted::Signature {
                    owner: owner.clone(),
                    name: name.clone(),
                    snippet: *snippet,
                    solution,
                    args,
                    ret,
                }
            }
            Entity::Variable {
                owner,
                name,
                var,
                snippet,
            } => {
                let solution = self.extract_var_sol(var, VarKind::Var);
                debug!(%owner, %name, solution = %solution, "extracted variable");
                let slot = match var {
                    Ty::Var(v) => self.var_slot(VarKind::Var, *v, solution),
                    other => Slot {
                        kind: VarKind::Var,
                        name: name.clone(),
                        var: None,
                        solution: other.clone(),
                        source: None,
                    },
                };
                Extracted::Variable {
                    owner: owner.clone(),
                    name: name.clone(),
                    snippet: *snippet,
                    slot,
                }
            }
        }
    }

    fn slot(&self, kind: VarKind, declared: &Param, solution: Ty) -> Slot {
        match declared {
            Param::Required(Ty::Var(v)) | Param::Optional(Ty::Var(v)) | Param::Vararg(Ty::Var(v)) => {
                self.var_slot(kind, *v, solution)
            }
            other => Slot {
                kind,
                name: other.to_string(),
                var: None,
                solution,
                source: None,
            },
        }
    }

    fn var_slot(&self, kind: VarKind, var: TyVar, solution: Ty) -> Slot {
        let info = self.ctx.info(var);
        Slot {
            kind,
            name: info.name.clone(),
            var: Some(var),
            solution,
            source: info.solution_source.clone(),
        }
    }
}

/// The variables of an entity whose bounds are re-asserted. The result of
/// an initializer is not.
fn entity_vars(entity: &Entity) -> Vec<TyVar> {
    match entity {
        Entity::Signature { name, sig, .. } => {
            let mut vars = Vec::new();
            for param in &sig.params {
                match param {
                    Param::Required(t) | Param::Optional(t) | Param::Vararg(t) => vars.extend(t.as_var()),
                    Param::Keywords(rec) => vars.extend(rec.fields.values().filter_map(|f| f.ty.as_var())),
                }
            }
            vars.extend(sig.block.as_ref().and_then(Ty::as_var));
            if name != "initialize" {
                vars.extend(sig.ret.as_var());
            }
            vars
        }
        Entity::Variable { var, .. } => var.as_var().into_iter().collect(),
    }
}
