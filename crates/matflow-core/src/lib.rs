//! # matflow
//!
//! Declarative builders for equation-of-state and Grueneisen-parameter workflows on
//! crystalline materials.
//!
//! ## Architectural Philosophy
//!
//! Flow construction is kept apart from execution. Builders emit a directed acyclic
//! graph of jobs whose inputs are symbolic references to other jobs' outputs; an
//! external engine later runs the jobs and substitutes the references.
//!
//! - **[`core`]: The Foundation.** Stateless crystal models, job identifiers, the
//!   deformation math and the Birch–Murnaghan fit.
//!
//! - **[`engine`]: The Graph.** Output references, values, jobs and flows, the maker
//!   traits calculators plug into, strain sampling, settings and logging.
//!
//! - **[`jobs`]: The Leaves.** Job constructors for strain application, volume
//!   perturbation, EOS fitting and Grueneisen extraction, plus reference calculator
//!   and phonon makers.
//!
//! - **[`workflows`]: The Public API.** The EOS and Grueneisen flow builders.

pub mod core;
pub mod engine;
pub mod jobs;
pub mod workflows;
