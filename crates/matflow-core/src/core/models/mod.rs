//! # Core Models Module
//!
//! Plain data types shared by every layer of matflow.
//!
//! - [`structure`] - Periodic crystal structures (lattice plus fractional sites)
//! - [`ids`] - Unique identifiers for jobs in a flow graph

pub mod ids;
pub mod structure;
