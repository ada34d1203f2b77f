use crate::core::eos::{self, EosFit, FitError};
use crate::engine::error::EngineError;
use crate::engine::job::Job;
use crate::engine::maker::PostProcessor;
use crate::engine::value::Value;
use nalgebra::Matrix3;

pub const APPLY_STRAIN_FUNCTION: &str = "eos.apply_strain_to_structure";
pub const FIT_ENERGY_VOLUME_FUNCTION: &str = "eos.fit_energy_volume";

/// Job that deforms `structure` once per matrix in `deformations`.
///
/// Its output is a list of transformation records; entry `i` carries the
/// `final_structure` for frame `i`.
pub fn apply_strain_to_structure(
    structure: impl Into<Value>,
    deformations: &[Matrix3<f64>],
) -> Result<Job, EngineError> {
    Ok(Job::new("apply_strain_to_structure", APPLY_STRAIN_FUNCTION)
        .with_kwarg("structure", structure)
        .with_kwarg("deformations", Value::literal(&deformations)?))
}

/// Fits the relaxation energies and volumes of an EOS flow to a Birch–Murnaghan curve.
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessEosEnergy {
    name: String,
}

impl Default for PostProcessEosEnergy {
    fn default() -> Self {
        Self {
            name: "PostProcessEosEnergy".to_string(),
        }
    }
}

impl PostProcessEosEnergy {
    pub fn with_name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The computation behind [`FIT_ENERGY_VOLUME_FUNCTION`].
    pub fn fit(&self, volumes: &[f64], energies: &[f64]) -> Result<EosFit, FitError> {
        eos::fit_birch_murnaghan(volumes, energies)
    }
}

impl PostProcessor for PostProcessEosEnergy {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_data_points(&self) -> usize {
        eos::MIN_DATA_POINTS
    }

    fn make(&self, flow_output: Value) -> Result<Job, EngineError> {
        Ok(Job::new(self.name.clone(), FIT_ENERGY_VOLUME_FUNCTION)
            .with_kwarg("eos_output", flow_output))
    }
}
