//! # Workflows Module
//!
//! The public entry points of matflow: builders that turn a structure and a set of
//! injected makers into a complete flow graph.
//!
//! - **EOS** ([`eos`]) - Equilibrium relaxation, strained relaxations and statics,
//!   and an optional energy-volume fit.
//! - **Grueneisen** ([`gruneisen`]) - Volume perturbation, constant-volume relaxations,
//!   three phonon runs and Grueneisen-parameter extraction.
//!
//! Builders never execute anything. Each call to `make` wires fresh jobs together
//! through symbolic output references and returns a validated [`crate::engine::flow::Flow`].

pub mod eos;
pub mod gruneisen;
