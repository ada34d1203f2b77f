use super::maker::{Maker, PhononMaker, PostProcessor};
use crate::jobs::eos::PostProcessEosEnergy;
use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },

    #[error("Unknown calculator code: '{0}'")]
    UnknownCode(String),

    #[error("Unknown k-path scheme: '{0}'")]
    UnknownKpathScheme(String),
}

/// Calculator backend a maker drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Code {
    Vasp,
    Aims,
    #[serde(rename = "forcefields")]
    ForceFields,
}

static CODE_NAMES: Map<&'static str, Code> = phf_map! {
    "vasp" => Code::Vasp,
    "aims" => Code::Aims,
    "fhi-aims" => Code::Aims,
    "forcefields" => Code::ForceFields,
    "forcefield" => Code::ForceFields,
};

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vasp => "vasp",
            Self::Aims => "aims",
            Self::ForceFields => "forcefields",
        }
    }

    /// Keyword a static calculation of this code uses to receive the previous
    /// calculation directory; force fields never restart from one.
    pub fn prev_calc_dir_argname(&self) -> Option<&'static str> {
        match self {
            Self::Vasp | Self::Aims => Some("prev_dir"),
            Self::ForceFields => None,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Code {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CODE_NAMES
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| ConfigError::UnknownCode(s.to_string()))
    }
}

/// Scheme used to generate the high-symmetry path for band structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpathScheme {
    /// Works with any cell; phonopy handles the primitive-cell relation.
    #[default]
    Seekpath,
    Hinuma,
    SetyawanCurtarolo,
    LatimerMunro,
}

static KPATH_SCHEME_NAMES: Map<&'static str, KpathScheme> = phf_map! {
    "seekpath" => KpathScheme::Seekpath,
    "hinuma" => KpathScheme::Hinuma,
    "setyawan_curtarolo" => KpathScheme::SetyawanCurtarolo,
    "latimer_munro" => KpathScheme::LatimerMunro,
};

impl KpathScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seekpath => "seekpath",
            Self::Hinuma => "hinuma",
            Self::SetyawanCurtarolo => "setyawan_curtarolo",
            Self::LatimerMunro => "latimer_munro",
        }
    }
}

impl FromStr for KpathScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KPATH_SCHEME_NAMES
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| ConfigError::UnknownKpathScheme(s.to_string()))
    }
}

pub const DEFAULT_EOS_NAME: &str = "EOS Maker";
pub const DEFAULT_LINEAR_STRAIN: (f64, f64) = (-0.05, 0.05);
pub const DEFAULT_NUMBER_OF_FRAMES: usize = 6;

#[derive(Debug)]
pub struct EosConfig {
    pub name: String,
    pub initial_relax_maker: Option<Box<dyn Maker>>,
    pub eos_relax_maker: Box<dyn Maker>,
    pub static_maker: Option<Box<dyn Maker>>,
    pub linear_strain: (f64, f64),
    pub number_of_frames: usize,
    pub postprocessor: Option<Box<dyn PostProcessor>>,
    pub store_transformation_information: bool,
}

/// Builder for [`EosConfig`].
///
/// Only `eos_relax_maker` is required. The post-processor defaults to an
/// energy-volume fit; pass `None` to `postprocessor` to skip the fit entirely.
#[derive(Default)]
pub struct EosConfigBuilder {
    name: Option<String>,
    initial_relax_maker: Option<Box<dyn Maker>>,
    eos_relax_maker: Option<Box<dyn Maker>>,
    static_maker: Option<Box<dyn Maker>>,
    linear_strain: Option<(f64, f64)>,
    number_of_frames: Option<usize>,
    postprocessor: Option<Option<Box<dyn PostProcessor>>>,
    store_transformation_information: bool,
}

impl EosConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
    pub fn initial_relax_maker(mut self, maker: Box<dyn Maker>) -> Self {
        self.initial_relax_maker = Some(maker);
        self
    }
    pub fn eos_relax_maker(mut self, maker: Box<dyn Maker>) -> Self {
        self.eos_relax_maker = Some(maker);
        self
    }
    pub fn static_maker(mut self, maker: Box<dyn Maker>) -> Self {
        self.static_maker = Some(maker);
        self
    }
    pub fn linear_strain(mut self, min: f64, max: f64) -> Self {
        self.linear_strain = Some((min, max));
        self
    }
    pub fn number_of_frames(mut self, n: usize) -> Self {
        self.number_of_frames = Some(n);
        self
    }
    pub fn postprocessor(mut self, postprocessor: Option<Box<dyn PostProcessor>>) -> Self {
        self.postprocessor = Some(postprocessor);
        self
    }
    pub fn store_transformation_information(mut self, store: bool) -> Self {
        self.store_transformation_information = store;
        self
    }

    pub fn build(self) -> Result<EosConfig, ConfigError> {
        let linear_strain = self.linear_strain.unwrap_or(DEFAULT_LINEAR_STRAIN);
        let (min, max) = linear_strain;
        if !min.is_finite() || !max.is_finite() {
            return Err(ConfigError::InvalidValue {
                parameter: "linear_strain",
                reason: format!("bounds must be finite, got ({min}, {max})"),
            });
        }
        if min <= -1.0 || max <= -1.0 {
            return Err(ConfigError::InvalidValue {
                parameter: "linear_strain",
                reason: format!(
                    "strains must exceed -1 to keep a positive volume, got ({min}, {max})"
                ),
            });
        }

        let number_of_frames = self.number_of_frames.unwrap_or(DEFAULT_NUMBER_OF_FRAMES);
        if number_of_frames == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "number_of_frames",
                reason: "at least one frame is required".to_string(),
            });
        }
        let ordered = if number_of_frames == 1 {
            min <= max
        } else {
            min < max
        };
        if !ordered {
            return Err(ConfigError::InvalidValue {
                parameter: "linear_strain",
                reason: format!(
                    "{number_of_frames} frames need an ascending strain range, got ({min}, {max})"
                ),
            });
        }

        Ok(EosConfig {
            name: self.name.unwrap_or_else(|| DEFAULT_EOS_NAME.to_string()),
            initial_relax_maker: self.initial_relax_maker,
            eos_relax_maker: self
                .eos_relax_maker
                .ok_or(ConfigError::MissingParameter("eos_relax_maker"))?,
            static_maker: self.static_maker,
            linear_strain,
            number_of_frames,
            postprocessor: self.postprocessor.unwrap_or_else(|| {
                let default: Box<dyn PostProcessor> = Box::new(PostProcessEosEnergy::default());
                Some(default)
            }),
            store_transformation_information: self.store_transformation_information,
        })
    }
}

pub const DEFAULT_GRUNEISEN_NAME: &str = "Gruneisen";
pub const DEFAULT_PERC_VOL: f64 = 0.01;
pub const DEFAULT_MESH: [u32; 3] = [20, 20, 20];
pub const DEFAULT_SYMPREC: f64 = 1e-4;

#[derive(Debug)]
pub struct GruneisenConfig {
    pub name: String,
    pub bulk_relax_maker: Option<Box<dyn Maker>>,
    pub const_vol_relax_maker: Box<dyn Maker>,
    pub phonon_maker: Box<dyn PhononMaker>,
    pub kpath_scheme: KpathScheme,
    pub perc_vol: f64,
    pub mesh: [u32; 3],
    pub symprec: f64,
    pub compute_gruneisen_param_kwargs: BTreeMap<String, serde_json::Value>,
}

#[derive(Default)]
pub struct GruneisenConfigBuilder {
    name: Option<String>,
    bulk_relax_maker: Option<Box<dyn Maker>>,
    const_vol_relax_maker: Option<Box<dyn Maker>>,
    phonon_maker: Option<Box<dyn PhononMaker>>,
    kpath_scheme: Option<KpathScheme>,
    perc_vol: Option<f64>,
    mesh: Option<[u32; 3]>,
    symprec: Option<f64>,
    compute_gruneisen_param_kwargs: BTreeMap<String, serde_json::Value>,
}

impl GruneisenConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
    pub fn bulk_relax_maker(mut self, maker: Box<dyn Maker>) -> Self {
        self.bulk_relax_maker = Some(maker);
        self
    }
    pub fn const_vol_relax_maker(mut self, maker: Box<dyn Maker>) -> Self {
        self.const_vol_relax_maker = Some(maker);
        self
    }
    pub fn phonon_maker(mut self, maker: Box<dyn PhononMaker>) -> Self {
        self.phonon_maker = Some(maker);
        self
    }
    pub fn kpath_scheme(mut self, scheme: KpathScheme) -> Self {
        self.kpath_scheme = Some(scheme);
        self
    }
    pub fn perc_vol(mut self, perc_vol: f64) -> Self {
        self.perc_vol = Some(perc_vol);
        self
    }
    pub fn mesh(mut self, mesh: [u32; 3]) -> Self {
        self.mesh = Some(mesh);
        self
    }
    pub fn symprec(mut self, symprec: f64) -> Self {
        self.symprec = Some(symprec);
        self
    }
    pub fn compute_gruneisen_param_kwarg(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.compute_gruneisen_param_kwargs.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Result<GruneisenConfig, ConfigError> {
        let perc_vol = self.perc_vol.unwrap_or(DEFAULT_PERC_VOL);
        if perc_vol.is_nan() || perc_vol <= 0.0 || perc_vol >= 1.0 {
            return Err(ConfigError::InvalidValue {
                parameter: "perc_vol",
                reason: format!("must lie strictly between 0 and 1, got {perc_vol}"),
            });
        }
        let mesh = self.mesh.unwrap_or(DEFAULT_MESH);
        if mesh.contains(&0) {
            return Err(ConfigError::InvalidValue {
                parameter: "mesh",
                reason: format!("every mesh dimension must be positive, got {mesh:?}"),
            });
        }
        let symprec = self.symprec.unwrap_or(DEFAULT_SYMPREC);
        if symprec.is_nan() || symprec <= 0.0 {
            return Err(ConfigError::InvalidValue {
                parameter: "symprec",
                reason: format!("must be positive, got {symprec}"),
            });
        }

        Ok(GruneisenConfig {
            name: self
                .name
                .unwrap_or_else(|| DEFAULT_GRUNEISEN_NAME.to_string()),
            bulk_relax_maker: self.bulk_relax_maker,
            const_vol_relax_maker: self
                .const_vol_relax_maker
                .ok_or(ConfigError::MissingParameter("const_vol_relax_maker"))?,
            phonon_maker: self
                .phonon_maker
                .ok_or(ConfigError::MissingParameter("phonon_maker"))?,
            kpath_scheme: self.kpath_scheme.unwrap_or_default(),
            perc_vol,
            mesh,
            symprec,
            compute_gruneisen_param_kwargs: self.compute_gruneisen_param_kwargs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::calculators::{CalculatorMaker, TaskKind};

    #[test]
    fn code_parses_aliases_case_insensitively() {
        assert_eq!("VASP".parse::<Code>().unwrap(), Code::Vasp);
        assert_eq!("fhi-aims".parse::<Code>().unwrap(), Code::Aims);
        assert_eq!(" forcefield ".parse::<Code>().unwrap(), Code::ForceFields);
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(
            "cp2k".parse::<Code>().unwrap_err(),
            ConfigError::UnknownCode("cp2k".to_string())
        );
    }

    #[test]
    fn code_display_matches_serde_name() {
        for code in [Code::Vasp, Code::Aims, Code::ForceFields] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{code}\""));
        }
    }

    #[test]
    fn force_fields_take_no_previous_directory() {
        assert_eq!(Code::Vasp.prev_calc_dir_argname(), Some("prev_dir"));
        assert_eq!(Code::Aims.prev_calc_dir_argname(), Some("prev_dir"));
        assert_eq!(Code::ForceFields.prev_calc_dir_argname(), None);
    }

    #[test]
    fn kpath_scheme_defaults_to_seekpath_and_parses() {
        assert_eq!(KpathScheme::default(), KpathScheme::Seekpath);
        assert_eq!(
            "latimer_munro".parse::<KpathScheme>().unwrap(),
            KpathScheme::LatimerMunro
        );
        assert!("nonsense".parse::<KpathScheme>().is_err());
        assert_eq!(KpathScheme::SetyawanCurtarolo.as_str(), "setyawan_curtarolo");
    }

    #[test]
    fn eos_builder_requires_relax_maker() {
        let result = EosConfigBuilder::new().build();
        assert_eq!(
            result.unwrap_err(),
            ConfigError::MissingParameter("eos_relax_maker")
        );
    }

    #[test]
    fn eos_builder_rejects_zero_width_strain_range() {
        let result = EosConfigBuilder::new()
            .linear_strain(0.0, 0.0)
            .number_of_frames(3)
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue {
                parameter: "linear_strain",
                ..
            }
        ));
    }

    #[test]
    fn eos_builder_rejects_descending_strain_range() {
        let result = EosConfigBuilder::new()
            .linear_strain(0.05, -0.05)
            .number_of_frames(5)
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue {
                parameter: "linear_strain",
                ..
            }
        ));
    }

    #[test]
    fn eos_builder_accepts_single_frame_at_a_fixed_strain() {
        let config = EosConfigBuilder::new()
            .eos_relax_maker(Box::new(CalculatorMaker::new(
                Code::Vasp,
                TaskKind::TightRelax,
            )))
            .linear_strain(0.02, 0.02)
            .number_of_frames(1)
            .build()
            .unwrap();
        assert_eq!(config.linear_strain, (0.02, 0.02));
        assert_eq!(config.number_of_frames, 1);
    }

    #[test]
    fn gruneisen_builder_requires_const_vol_relax_maker() {
        let result = GruneisenConfigBuilder::new().build();
        assert_eq!(
            result.unwrap_err(),
            ConfigError::MissingParameter("const_vol_relax_maker")
        );
    }

    #[test]
    fn gruneisen_builder_rejects_out_of_range_perc_vol() {
        let result = GruneisenConfigBuilder::new().perc_vol(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue {
                parameter: "perc_vol",
                ..
            }
        ));
    }

    #[test]
    fn gruneisen_builder_rejects_zero_mesh() {
        let result = GruneisenConfigBuilder::new().mesh([20, 0, 20]).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue {
                parameter: "mesh",
                ..
            }
        ));
    }
}
