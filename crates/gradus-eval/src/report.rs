//! Comparison of extracted solutions against reference types.
//!
//! The [`Reporter`] walks the extraction results of a session, classifies
//! every position that has a reference type and counts the rest by how
//! usable the inferred type is. Records go to a [`ReportSink`]; the
//! aggregate comes back as a serializable [`Summary`].

use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info};

use gradus_infer::{is_overly_general, Extracted, SolutionSource};
use gradus_types::{ClassTable, MethodTy, Param, Ty};

use crate::classify::{classify, classify_param, Classification};

/// A previously known type for an entity.
#[derive(Clone, Debug, PartialEq)]
pub enum Reference {
    Method(MethodTy),
    Var(Ty),
}

/// Lookup of reference types by owner and entity name.
///
/// Absence is the common case: most entities have no recorded reference.
pub trait ReferenceTypes {
    fn reference(&self, owner: &str, name: &str) -> Option<&Reference>;
}

/// In-memory reference data.
#[derive(Clone, Debug, Default)]
pub struct ReferenceTable {
    entries: FxHashMap<(String, String), Reference>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, owner: &str, name: &str, reference: Reference) {
        self.entries.insert((owner.to_string(), name.to_string()), reference);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReferenceTypes for ReferenceTable {
    fn reference(&self, owner: &str, name: &str) -> Option<&Reference> {
        self.entries.get(&(owner.to_string(), name.to_string()))
    }
}

/// Which part of an entity a record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Position {
    Arg,
    Ret,
    Var,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Arg => write!(f, "Arg"),
            Position::Ret => write!(f, "Ret"),
            Position::Var => write!(f, "Var"),
        }
    }
}

/// One classification event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportRecord {
    pub owner: String,
    pub method: String,
    pub position: Position,
    pub name: String,
    pub inferred: String,
    pub reference: String,
    pub tag: Classification,
    pub solution_source: Option<String>,
    /// Byte range of the entity's source, if known.
    pub snippet: Option<(u32, u32)>,
}

/// Destination for report records.
pub trait ReportSink {
    fn record(&mut self, record: ReportRecord);
}

/// Collects records in memory.
#[derive(Clone, Debug, Default)]
pub struct VecSink {
    pub records: Vec<ReportRecord>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportSink for VecSink {
    fn record(&mut self, record: ReportRecord) {
        self.records.push(record);
    }
}

/// Aggregate counters of one report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub exact: usize,
    pub param: usize,
    /// Both `T` and `TS`.
    pub got_type: usize,
    /// `TS` only.
    pub structural: usize,
    pub no_type: usize,
    pub compared_meths: usize,
    pub compared_args: usize,
    pub compared_rets: usize,
    pub compared_vars: usize,
    pub noncomp_meths: usize,
    pub noncomp_args: usize,
    pub noncomp_rets: usize,
    pub noncomp_vars: usize,
    pub noncomp_usable: usize,
    pub noncomp_og: usize,
    pub noncomp_no_type: usize,
    pub library_guesses_by_oracle: usize,
    pub library_matches_by_oracle: usize,
    pub rare_guesses_by_oracle: usize,
    pub rare_matches_by_oracle: usize,
    pub reference_library: usize,
    pub reference_rare: usize,
}

impl Summary {
    fn count(&mut self, tag: Classification) {
        match tag {
            Classification::Exact => self.exact += 1,
            Classification::ParamMatch => self.param += 1,
            Classification::GotType => self.got_type += 1,
            Classification::GotStructuralType => {
                self.got_type += 1;
                self.structural += 1;
            }
            Classification::NoType => self.no_type += 1,
        }
    }

    /// Bucket a solution of a position without a reference.
    fn count_noncompared(&mut self, solution: &Ty) {
        if solution.is_var() {
            self.noncomp_no_type += 1;
        } else if is_overly_general(solution) {
            self.noncomp_og += 1;
        } else {
            self.noncomp_usable += 1;
        }
    }

    /// Total number of classified positions.
    pub fn compared(&self) -> usize {
        self.exact + self.param + self.got_type + self.no_type
    }
}

/// Classifies extraction results against reference data.
pub struct Reporter<'a> {
    classes: &'a ClassTable,
    summary: Summary,
}

impl<'a> Reporter<'a> {
    pub fn new(classes: &'a ClassTable) -> Self {
        Reporter {
            classes,
            summary: Summary::default(),
        }
    }

    /// Report every entity and return the totals.
    pub fn report(
        mut self,
        results: &[Extracted],
        references: &dyn ReferenceTypes,
        sink: &mut dyn ReportSink,
    ) -> Summary {
        for result in results {
            match (result, references.reference(result.owner(), result.name())) {
                (Extracted::Signature { .. }, Some(Reference::Method(reference))) => {
                    self.compare_signature(result, reference, sink)
                }
                (Extracted::Variable { .. }, Some(Reference::Var(reference))) => {
                    self.compare_variable(result, reference, sink)
                }
                (_, Some(_)) => {
                    debug!(
                        owner = result.owner(),
                        name = result.name(),
                        "reference kind does not match entity; not compared"
                    );
                    self.noncompared(result)
                }
                (_, None) => self.noncompared(result),
            }
        }
        let summary = self.summary;
        info!(
            exact = summary.exact,
            param = summary.param,
            got_type = summary.got_type,
            structural = summary.structural,
            no_type = summary.no_type,
            "evaluation totals"
        );
        info!(
            methods = summary.compared_meths,
            args = summary.compared_args,
            rets = summary.compared_rets,
            vars = summary.compared_vars,
            "compared positions"
        );
        info!(
            methods = summary.noncomp_meths,
            usable = summary.noncomp_usable,
            overly_general = summary.noncomp_og,
            untyped = summary.noncomp_no_type,
            "positions without reference"
        );
        summary
    }

    fn compare_signature(&mut self, result: &Extracted, reference: &MethodTy, sink: &mut dyn ReportSink) {
        let Extracted::Signature {
            owner,
            name,
            snippet,
            solution,
            args,
            ret,
        } = result
        else {
            return;
        };
        let snippet = snippet.map(|r| (u32::from(r.start()), u32::from(r.end())));
        let mut compared = false;

        for (i, ref_param) in reference.params.iter().enumerate() {
            let (tag, inferred) = match solution.params.get(i) {
                Some(param) => (classify_param(param, ref_param, self.classes), param.ty()),
                None => (Classification::NoType, Ty::Bot),
            };
            let slot = args.get(i);
            let source = slot.and_then(|s| s.source.as_ref());
            compared = true;
            self.summary.count(tag);
            self.summary.compared_args += 1;
            self.update_type_counts(&inferred, &ref_param.ty(), tag, source);
            sink.record(ReportRecord {
                owner: owner.clone(),
                method: name.clone(),
                position: Position::Arg,
                name: slot.map(|s| s.name.clone()).unwrap_or_default(),
                inferred: render_param(solution.params.get(i)),
                reference: ref_param.ty().to_string(),
                tag,
                solution_source: source.map(ToString::to_string),
                snippet,
            });
        }

        // A `%bot` reference return means the return type was never recorded.
        if reference.ret != Ty::Bot {
            let tag = classify(&solution.ret, &reference.ret, self.classes);
            compared = true;
            self.summary.count(tag);
            self.summary.compared_rets += 1;
            self.update_type_counts(&solution.ret, &reference.ret, tag, ret.source.as_ref());
            sink.record(ReportRecord {
                owner: owner.clone(),
                method: name.clone(),
                position: Position::Ret,
                name: ret.name.clone(),
                inferred: solution.ret.to_string(),
                reference: reference.ret.to_string(),
                tag,
                solution_source: ret.source.as_ref().map(ToString::to_string),
                snippet,
            });
        }

        if compared {
            self.summary.compared_meths += 1;
        } else {
            self.noncompared(result);
        }
    }

    fn compare_variable(&mut self, result: &Extracted, reference: &Ty, sink: &mut dyn ReportSink) {
        let Extracted::Variable {
            owner,
            name,
            snippet,
            slot,
        } = result
        else {
            return;
        };
        let tag = classify(&slot.solution, reference, self.classes);
        self.summary.count(tag);
        self.summary.compared_vars += 1;
        self.update_type_counts(&slot.solution, reference, tag, slot.source.as_ref());
        sink.record(ReportRecord {
            owner: owner.clone(),
            method: name.clone(),
            position: Position::Var,
            name: name.clone(),
            inferred: slot.solution.to_string(),
            reference: reference.to_string(),
            tag,
            solution_source: slot.source.as_ref().map(ToString::to_string),
            snippet: snippet.map(|r| (u32::from(r.start()), u32::from(r.end()))),
        });
    }

    fn noncompared(&mut self, result: &Extracted) {
        match result {
            Extracted::Signature { args, ret, .. } => {
                self.summary.noncomp_meths += 1;
                for arg in args {
                    self.summary.noncomp_args += 1;
                    self.summary.count_noncompared(&arg.solution);
                }
                self.summary.noncomp_rets += 1;
                self.summary.count_noncompared(&ret.solution);
            }
            Extracted::Variable { slot, .. } => {
                self.summary.noncomp_vars += 1;
                self.summary.count_noncompared(&slot.solution);
            }
        }
    }

    /// Library/rare statistics. Guesses only count when the oracle
    /// produced the solution.
    fn update_type_counts(
        &mut self,
        inferred: &Ty,
        reference: &Ty,
        tag: Classification,
        source: Option<&SolutionSource>,
    ) {
        if self.is_common(reference) {
            self.summary.reference_library += 1;
        } else {
            self.summary.reference_rare += 1;
        }
        if source != Some(&SolutionSource::Twin) {
            return;
        }
        let matched = tag == Classification::Exact;
        if self.is_common(inferred) {
            self.summary.library_guesses_by_oracle += 1;
            if matched {
                self.summary.library_matches_by_oracle += 1;
            }
        } else {
            self.summary.rare_guesses_by_oracle += 1;
            if matched {
                self.summary.rare_matches_by_oracle += 1;
            }
        }
    }

    /// A type built only from library classes.
    fn is_common(&self, ty: &Ty) -> bool {
        match ty {
            _ if ty.is_bool() => true,
            Ty::SelfRef => true,
            Ty::Nominal(con) | Ty::Generic(con, _) => self.classes.is_library(&con.name),
            Ty::Union(members) => members.iter().all(|m| self.is_common(m)),
            _ => false,
        }
    }
}

fn render_param(param: Option<&Param>) -> String {
    param.map(|p| p.ty().to_string()).unwrap_or_default()
}
