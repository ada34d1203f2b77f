use nalgebra::Matrix3;

use crate::core::deformation::deformation_from_strain;

/// Strains closer to zero than this are treated as the unstrained cell.
pub const ZERO_STRAIN_TOLERANCE: f64 = 1e-15;

/// `n` evenly spaced samples over `[start, stop]` together with the spacing.
///
/// A single sample sits at `start`; its reported spacing is the full range.
pub fn linspace(start: f64, stop: f64, n: usize) -> (Vec<f64>, f64) {
    match n {
        0 => (Vec::new(), 0.0),
        1 => (vec![start], stop - start),
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut samples: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            samples[n - 1] = stop;
            (samples, step)
        }
    }
}

/// Linear strains for an EOS sweep.
///
/// When the unstrained cell is already covered by an equilibrium relaxation
/// (`avoid_zero`), samples that land on zero are pushed apart within one step so
/// that no frame recomputes the reference cell. `linear_strain` is ascending; configs
/// built through [`EosConfigBuilder`](super::config::EosConfigBuilder) guarantee it.
pub fn strain_samples(
    linear_strain: (f64, f64),
    number_of_frames: usize,
    avoid_zero: bool,
) -> Vec<f64> {
    let (mut strains, step) = linspace(linear_strain.0, linear_strain.1, number_of_frames);
    if !avoid_zero {
        return strains;
    }

    let zero_indices: Vec<usize> = strains
        .iter()
        .enumerate()
        .filter(|(_, s)| s.abs() < ZERO_STRAIN_TOLERANCE)
        .map(|(i, _)| i)
        .collect();
    if zero_indices.is_empty() {
        return strains;
    }

    let count = zero_indices.len();
    let (offsets, _) = linspace(-1.0, 1.0, count);
    let scale = step / (count as f64 + 1.0);
    for (idx, offset) in zero_indices.into_iter().zip(offsets) {
        strains[idx] += scale * offset;
    }
    strains
}

pub fn deformations_for(strains: &[f64]) -> Vec<Matrix3<f64>> {
    strains.iter().map(|&s| deformation_from_strain(s)).collect()
}
