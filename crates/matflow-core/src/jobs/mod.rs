//! Leaf jobs and reference makers the flow builders are wired from.

pub mod calculators;
pub mod eos;
pub mod gruneisen;
pub mod phonons;
