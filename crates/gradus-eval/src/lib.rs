//! Evaluation of inferred types.
//!
//! [`classify`] places one inferred type in the fixed taxonomy
//! (`E`, `P`, `T`, `TS`, `N`) relative to a reference type; [`Reporter`]
//! applies it to a whole extraction run and aggregates the counts.

pub mod classify;
pub mod report;

pub use classify::{classify, classify_param, Classification};
pub use report::{
    Position, Reference, ReferenceTable, ReferenceTypes, ReportRecord, ReportSink, Reporter,
    Summary, VecSink,
};
