use super::models::structure::Structure;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// Outcome of applying one deformation to a structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationResult {
    pub deformation: Matrix3<f64>,
    pub initial_structure: Structure,
    pub final_structure: Structure,
}

/// The expanded and shrunk counterparts of a reference structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePair {
    pub plus: Structure,
    pub minus: Structure,
}

/// Isotropic deformation gradient `(1 + strain) * I`.
pub fn deformation_from_strain(strain: f64) -> Matrix3<f64> {
    Matrix3::identity() * (1.0 + strain)
}

pub fn apply_strain(
    structure: &Structure,
    deformations: &[Matrix3<f64>],
) -> Vec<TransformationResult> {
    deformations
        .iter()
        .map(|deformation| TransformationResult {
            deformation: *deformation,
            initial_structure: structure.clone(),
            final_structure: structure.deformed(deformation),
        })
        .collect()
}

/// Expands and shrinks `structure` by the volume fraction `perc_vol`.
pub fn shrink_expand(structure: &Structure, perc_vol: f64) -> VolumePair {
    let volume = structure.volume();
    VolumePair {
        plus: structure.scaled_to_volume(volume * (1.0 + perc_vol)),
        minus: structure.scaled_to_volume(volume * (1.0 - perc_vol)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::structure::{Lattice, Site};

    fn silicon() -> Structure {
        Structure::new(
            Lattice::from_rows([[0.0, 2.7, 2.7], [2.7, 0.0, 2.7], [2.7, 2.7, 0.0]]),
            vec![Site::new("Si", [0.0, 0.0, 0.0]), Site::new("Si", [0.25, 0.25, 0.25])],
        )
    }

    #[test]
    fn deformation_from_strain_is_scaled_identity() {
        let deformation = deformation_from_strain(-0.05);
        assert_eq!(deformation, Matrix3::identity() * 0.95);
    }

    #[test]
    fn apply_strain_returns_one_result_per_matrix_in_order() {
        let structure = silicon();
        let strains = [-0.02, 0.0, 0.03];
        let deformations: Vec<_> = strains.iter().map(|&s| deformation_from_strain(s)).collect();
        let results = apply_strain(&structure, &deformations);

        assert_eq!(results.len(), 3);
        for (result, strain) in results.iter().zip(strains) {
            let expected = structure.volume() * (1.0 + strain).powi(3);
            assert!((result.final_structure.volume() - expected).abs() < 1e-9);
            assert_eq!(result.initial_structure, structure);
        }
    }

    #[test]
    fn apply_strain_with_no_matrices_is_empty() {
        assert!(apply_strain(&silicon(), &[]).is_empty());
    }

    #[test]
    fn shrink_expand_changes_volume_by_fraction() {
        let structure = silicon();
        let pair = shrink_expand(&structure, 0.01);
        let volume = structure.volume();
        assert!((pair.plus.volume() - volume * 1.01).abs() < 1e-9);
        assert!((pair.minus.volume() - volume * 0.99).abs() < 1e-9);
        assert_eq!(pair.plus.sites, structure.sites);
    }
}
