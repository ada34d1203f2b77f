//! Capabilities the flow builders consume.
//!
//! Calculator backends, phonon workflows and EOS post-processors are injected as
//! trait objects; the builders only ever see the symbolic outputs these return.

use super::error::EngineError;
use super::flow::{Flow, Node};
use super::job::Job;
use super::value::Value;
use std::fmt::Debug;

/// Produces the job (or flow) that runs one calculation on `structure`.
///
/// The returned node's output must expose `output.energy`, `output.stress`,
/// `output.structure`, `structure` and `dir_name`.
pub trait Maker: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn make(&self, structure: Value, prev_dir: Option<Value>) -> Result<Node, EngineError>;
}

/// Produces a complete phonon workflow for one structure.
///
/// The last job of the returned flow writes the phonopy, band-structure and DOS
/// artifacts and accepts `filename_*` keyword overrides. The flow's output exposes
/// `jobdirs.taskdoc_run_job_dir` and `has_imaginary_modes`.
pub trait PhononMaker: Debug + Send + Sync {
    fn make(&self, structure: Value) -> Result<Flow, EngineError>;
}

/// Fits an equation of state to the data collected by an EOS flow.
pub trait PostProcessor: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn min_data_points(&self) -> usize;

    fn make(&self, flow_output: Value) -> Result<Job, EngineError>;
}
