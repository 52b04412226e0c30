//! Report core for syncreport.
//!
//! Classifier → Aggregator → Renderer, plus the `update` pipeline that wires
//! them between a record source and the target document.

pub mod classify;
pub mod grouping;
pub mod pipeline;
pub mod report;

pub use classify::classify;
pub use grouping::{Grouping, Leaf};
pub use pipeline::{
    Aggregation, Outcome, ProgressReporter, RunConfig, RunSummary, SilentProgress, aggregate,
    compose, run,
};
pub use report::{EnvironmentSection, EnvironmentTitle, RenderedReport, ReportRow, render};
