//! The symbolic flow graph and the plumbing around it.
//!
//! Nothing here runs a calculation: jobs, flows and output references describe work
//! for an external execution engine, which receives the graph through [`flow::Flow::to_json`].

pub mod config;
pub mod error;
pub mod flow;
pub mod job;
pub mod logging;
pub mod maker;
pub mod reference;
pub mod settings;
pub mod strain;
pub mod value;
