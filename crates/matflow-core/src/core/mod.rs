//! # Core Module
//!
//! Stateless building blocks used by the flow builders: crystal structures, job
//! identifiers, the deformation math behind strain and volume perturbations, and the
//! equation-of-state fit that post-processing jobs run.
//!
//! - **Models** ([`models`]) - `Structure`, `Lattice` and `JobId`
//! - **Deformations** ([`deformation`]) - Strain application and volume perturbation
//! - **Equation of State** ([`eos`]) - Birch–Murnaghan energy-volume fitting
//!
//! Nothing in this module knows about flows or symbolic outputs; the functions here
//! are what an execution engine eventually runs for the leaf jobs in [`crate::jobs`].

pub mod deformation;
pub mod eos;
pub mod models;
