//! Third-order Birch–Murnaghan equation-of-state fitting.
//!
//! The Birch–Murnaghan energy is a cubic polynomial in `x = V^(-2/3)`, so the fit
//! is a linear least-squares problem followed by locating the polynomial minimum.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Conversion factor from eV/Å^3 to GPa.
pub const EV_PER_CUBIC_ANGSTROM_TO_GPA: f64 = 160.217_662_08;

/// Number of polynomial coefficients, and therefore the minimum number of points.
pub const MIN_DATA_POINTS: usize = 4;

#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    #[error("EOS fit needs at least {required} data points, got {found}")]
    InsufficientData { required: usize, found: usize },

    #[error("Volume and energy series differ in length ({volumes} vs {energies})")]
    MismatchedLengths { volumes: usize, energies: usize },

    #[error("Volumes must be finite and positive (got {0})")]
    InvalidVolume(f64),

    #[error("All volumes are identical; the fit is undetermined")]
    DegenerateVolumes,

    #[error("Least-squares solve failed: {0}")]
    Solve(&'static str),

    #[error("Fitted energy-volume curve has no minimum")]
    NoMinimum,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EosFit {
    /// Equilibrium energy (same unit as the input energies).
    pub e0: f64,
    /// Equilibrium volume (same unit as the input volumes).
    pub v0: f64,
    /// Bulk modulus at `v0`, in energy / volume units.
    pub b0: f64,
    /// Pressure derivative of the bulk modulus at `v0`.
    pub b1: f64,
}

impl EosFit {
    pub fn b0_gpa(&self) -> f64 {
        self.b0 * EV_PER_CUBIC_ANGSTROM_TO_GPA
    }

    pub fn energy(&self, volume: f64) -> f64 {
        birch_murnaghan_energy(volume, self.e0, self.v0, self.b0, self.b1)
    }
}

pub fn birch_murnaghan_energy(volume: f64, e0: f64, v0: f64, b0: f64, b1: f64) -> f64 {
    let eta = (v0 / volume).powf(2.0 / 3.0);
    e0 + 9.0 * v0 * b0 / 16.0 * ((eta - 1.0).powi(3) * b1 + (eta - 1.0).powi(2) * (6.0 - 4.0 * eta))
}

pub fn fit_birch_murnaghan(volumes: &[f64], energies: &[f64]) -> Result<EosFit, FitError> {
    if volumes.len() != energies.len() {
        return Err(FitError::MismatchedLengths {
            volumes: volumes.len(),
            energies: energies.len(),
        });
    }
    if volumes.len() < MIN_DATA_POINTS {
        return Err(FitError::InsufficientData {
            required: MIN_DATA_POINTS,
            found: volumes.len(),
        });
    }
    if let Some(&bad) = volumes.iter().find(|v| !v.is_finite() || **v <= 0.0) {
        return Err(FitError::InvalidVolume(bad));
    }

    let xs: Vec<f64> = volumes.iter().map(|v| v.powf(-2.0 / 3.0)).collect();
    let x_mean = xs.iter().sum::<f64>() / xs.len() as f64;
    let scale = xs.iter().map(|x| (x - x_mean).abs()).fold(0.0, f64::max);
    if scale == 0.0 {
        return Err(FitError::DegenerateVolumes);
    }

    // Fit in t = (x - x_mean) / scale to keep the Vandermonde matrix well conditioned.
    let ts: Vec<f64> = xs.iter().map(|x| (x - x_mean) / scale).collect();
    let design = DMatrix::from_fn(ts.len(), MIN_DATA_POINTS, |i, j| ts[i].powi(j as i32));
    let rhs = DVector::from_column_slice(energies);
    let p = design
        .svd(true, true)
        .solve(&rhs, 1e-12)
        .map_err(FitError::Solve)?;

    let t0 = stationary_minimum(p[1], p[2], p[3]).ok_or(FitError::NoMinimum)?;
    let x0 = x_mean + scale * t0;
    if x0 <= 0.0 {
        return Err(FitError::NoMinimum);
    }

    let e0 = p[0] + p[1] * t0 + p[2] * t0 * t0 + p[3] * t0 * t0 * t0;
    let v0 = x0.powf(-1.5);

    // Chain rule through x(V) = V^(-2/3); the first derivative vanishes at x0.
    let e_xx = (2.0 * p[2] + 6.0 * p[3] * t0) / (scale * scale);
    let e_xxx = 6.0 * p[3] / scale.powi(3);
    let g1 = -2.0 / 3.0 * v0.powf(-5.0 / 3.0);
    let g2 = 10.0 / 9.0 * v0.powf(-8.0 / 3.0);
    let e_vv = e_xx * g1 * g1;
    let e_vvv = e_xxx * g1.powi(3) + 3.0 * e_xx * g1 * g2;

    Ok(EosFit {
        e0,
        v0,
        b0: v0 * e_vv,
        b1: -1.0 - v0 * e_vvv / e_vv,
    })
}

/// Root of `p1 + 2 p2 t + 3 p3 t^2` with positive curvature, closest to `t = 0`.
fn stationary_minimum(p1: f64, p2: f64, p3: f64) -> Option<f64> {
    let candidates: Vec<f64> = if p3.abs() <= 1e-12 * (p1.abs() + p2.abs()) {
        if p2 == 0.0 { vec![] } else { vec![-p1 / (2.0 * p2)] }
    } else {
        let disc = 4.0 * p2 * p2 - 12.0 * p3 * p1;
        if disc < 0.0 {
            vec![]
        } else {
            let sq = disc.sqrt();
            vec![(-2.0 * p2 + sq) / (6.0 * p3), (-2.0 * p2 - sq) / (6.0 * p3)]
        }
    };

    candidates
        .into_iter()
        .filter(|&t| 2.0 * p2 + 6.0 * p3 * t > 0.0)
        .min_by(|a, b| a.abs().partial_cmp(&b.abs()).unwrap_or(std::cmp::Ordering::Equal))
}
