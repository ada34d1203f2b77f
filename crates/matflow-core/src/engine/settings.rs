//! Calculator settings consumed by the reference makers.
//!
//! Settings are resolved once, in three layers: built-in defaults, then an optional
//! TOML file, then `MATFLOW_*` environment variables. The resulting [`Settings`]
//! value is passed explicitly to whatever needs it; the flow builders never read it.

use super::config::Code;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const CONFIG_FILE_ENV: &str = "MATFLOW_CONFIG_FILE";
pub const ENV_PREFIX: &str = "MATFLOW_";
pub const DEFAULT_CONFIG_FILE_NAME: &str = ".matflow.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid value '{value}' for environment variable {variable}: expected {expected}")]
    Environment {
        variable: String,
        value: String,
        expected: &'static str,
    },
}

/// What to do with a calculation that finished but did not converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawDefuseMode", into = "RawDefuseMode")]
pub enum DefuseMode {
    /// Mark the job as failed.
    #[default]
    Fizzle,
    /// Mark the job completed but defuse its children.
    Defuse,
    /// Carry on with the workflow as normal.
    Continue,
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum RawDefuseMode {
    Flag(bool),
    Mode(String),
}

impl TryFrom<RawDefuseMode> for DefuseMode {
    type Error = String;

    fn try_from(raw: RawDefuseMode) -> Result<Self, Self::Error> {
        match raw {
            RawDefuseMode::Flag(true) => Ok(Self::Defuse),
            RawDefuseMode::Flag(false) => Ok(Self::Continue),
            RawDefuseMode::Mode(mode) if mode.eq_ignore_ascii_case("fizzle") => Ok(Self::Fizzle),
            RawDefuseMode::Mode(other) => Err(format!(
                "expected true, false or \"fizzle\", got \"{other}\""
            )),
        }
    }
}

impl From<DefuseMode> for RawDefuseMode {
    fn from(mode: DefuseMode) -> Self {
        match mode {
            DefuseMode::Fizzle => Self::Mode("fizzle".to_string()),
            DefuseMode::Defuse => Self::Flag(true),
            DefuseMode::Continue => Self::Flag(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    pub scratch_dir: String,

    pub vasp_cmd: String,
    pub vasp_gamma_cmd: String,
    pub vasp_ncl_cmd: String,
    pub vasp_vdw_kernel_dir: String,
    pub vasp_add_namefile: bool,
    pub vasp_add_smallgap_kpoint_multiply: bool,
    pub vasp_add_modify_incar: bool,
    pub vasp_add_stability_check: bool,
    pub vasp_add_wf_metadata: bool,
    pub vasp_half_kpoints_first_relax: bool,
    /// Maximum force on any atom for a relaxation to count as converged.
    pub vasp_relax_max_force: f64,
    /// Relative volume change above which a relaxation is tagged with a warning.
    pub vasp_volume_change_warning_tol: f64,
    pub vasp_defuse_unsuccessful: DefuseMode,
    pub vasp_custodian_max_errors: u32,
    pub vasp_store_volumetric_data: Option<Vec<String>>,
    pub vasp_store_additional_json: bool,
    pub vasp_run_bader: bool,

    pub aims_cmd: String,

    pub forcefield_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scratch_dir: ">>SCRATCH_DIR<<".to_string(),
            vasp_cmd: "vasp_std".to_string(),
            vasp_gamma_cmd: "vasp_gam".to_string(),
            vasp_ncl_cmd: "vasp_ncl".to_string(),
            vasp_vdw_kernel_dir: ">>vdw_kernel_dir<<".to_string(),
            vasp_add_namefile: true,
            vasp_add_smallgap_kpoint_multiply: true,
            vasp_add_modify_incar: false,
            vasp_add_stability_check: false,
            vasp_add_wf_metadata: false,
            vasp_half_kpoints_first_relax: false,
            vasp_relax_max_force: 0.25,
            vasp_volume_change_warning_tol: 0.2,
            vasp_defuse_unsuccessful: DefuseMode::Fizzle,
            vasp_custodian_max_errors: 5,
            vasp_store_volumetric_data: None,
            vasp_store_additional_json: false,
            vasp_run_bader: false,
            aims_cmd: "aims.x".to_string(),
            forcefield_model: "CHGNet".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSettings {
    scratch_dir: Option<String>,
    vasp_cmd: Option<String>,
    vasp_gamma_cmd: Option<String>,
    vasp_ncl_cmd: Option<String>,
    vasp_vdw_kernel_dir: Option<String>,
    vasp_add_namefile: Option<bool>,
    vasp_add_smallgap_kpoint_multiply: Option<bool>,
    vasp_add_modify_incar: Option<bool>,
    vasp_add_stability_check: Option<bool>,
    vasp_add_wf_metadata: Option<bool>,
    vasp_half_kpoints_first_relax: Option<bool>,
    vasp_relax_max_force: Option<f64>,
    vasp_volume_change_warning_tol: Option<f64>,
    vasp_defuse_unsuccessful: Option<DefuseMode>,
    vasp_custodian_max_errors: Option<u32>,
    vasp_store_volumetric_data: Option<Vec<String>>,
    vasp_store_additional_json: Option<bool>,
    vasp_run_bader: Option<bool>,
    aims_cmd: Option<String>,
    forcefield_model: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Text,
    Flag,
    Float,
    Integer,
    DefuseMode,
    TextList,
}

const FIELDS: &[(&str, FieldKind)] = &[
    ("scratch-dir", FieldKind::Text),
    ("vasp-cmd", FieldKind::Text),
    ("vasp-gamma-cmd", FieldKind::Text),
    ("vasp-ncl-cmd", FieldKind::Text),
    ("vasp-vdw-kernel-dir", FieldKind::Text),
    ("vasp-add-namefile", FieldKind::Flag),
    ("vasp-add-smallgap-kpoint-multiply", FieldKind::Flag),
    ("vasp-add-modify-incar", FieldKind::Flag),
    ("vasp-add-stability-check", FieldKind::Flag),
    ("vasp-add-wf-metadata", FieldKind::Flag),
    ("vasp-half-kpoints-first-relax", FieldKind::Flag),
    ("vasp-relax-max-force", FieldKind::Float),
    ("vasp-volume-change-warning-tol", FieldKind::Float),
    ("vasp-defuse-unsuccessful", FieldKind::DefuseMode),
    ("vasp-custodian-max-errors", FieldKind::Integer),
    ("vasp-store-volumetric-data", FieldKind::TextList),
    ("vasp-store-additional-json", FieldKind::Flag),
    ("vasp-run-bader", FieldKind::Flag),
    ("aims-cmd", FieldKind::Text),
    ("forcefield-model", FieldKind::Text),
];

macro_rules! merge_fields {
    ($target:expr, $partial:expr, $($field:ident),* $(,)?) => {
        $(
            if let Some(value) = $partial.$field {
                $target.$field = value;
            }
        )*
    };
}

impl Settings {
    /// Resolves settings from defaults, a config file and the process environment.
    ///
    /// An explicit `config_file` must exist. Otherwise the file named by
    /// `MATFLOW_CONFIG_FILE`, or `~/.matflow.toml`, is read when present.
    pub fn load(config_file: Option<&Path>) -> Result<Self, SettingsError> {
        Self::load_with(config_file, |key| env::var(key).ok())
    }

    pub fn load_with<F>(config_file: Option<&Path>, lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        let file = match config_file {
            Some(path) => Some(path.to_path_buf()),
            None => lookup(CONFIG_FILE_ENV)
                .map(PathBuf::from)
                .or_else(|| lookup("HOME").map(|home| Path::new(&home).join(DEFAULT_CONFIG_FILE_NAME)))
                .filter(|path| path.exists()),
        };
        if let Some(path) = file {
            debug!(path = %path.display(), "Loading settings file.");
            settings.merge(Self::read_partial(&path)?);
        }

        settings.merge(Self::env_overrides(&lookup)?);
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let partial = toml::from_str(content).map_err(|e| SettingsError::Toml {
            path: "<string>".to_string(),
            source: e,
        })?;
        let mut settings = Self::default();
        settings.merge(partial);
        Ok(settings)
    }

    /// Command that launches `code`, if the code runs as an external program.
    pub fn command_for(&self, code: Code) -> Option<&str> {
        match code {
            Code::Vasp => Some(&self.vasp_cmd),
            Code::Aims => Some(&self.aims_cmd),
            Code::ForceFields => None,
        }
    }

    fn read_partial(path: &Path) -> Result<PartialSettings, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| SettingsError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    fn env_overrides<F>(lookup: &F) -> Result<PartialSettings, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut table = toml::Table::new();
        for &(key, kind) in FIELDS {
            let variable = format!("{ENV_PREFIX}{}", key.to_ascii_uppercase().replace('-', "_"));
            if let Some(raw) = lookup(&variable) {
                let value = parse_env_value(&variable, &raw, kind)?;
                table.insert(key.to_string(), value);
            }
        }
        toml::Value::Table(table)
            .try_into()
            .map_err(|e| SettingsError::Toml {
                path: "<environment>".to_string(),
                source: e,
            })
    }

    fn merge(&mut self, partial: PartialSettings) {
        merge_fields!(
            self,
            partial,
            scratch_dir,
            vasp_cmd,
            vasp_gamma_cmd,
            vasp_ncl_cmd,
            vasp_vdw_kernel_dir,
            vasp_add_namefile,
            vasp_add_smallgap_kpoint_multiply,
            vasp_add_modify_incar,
            vasp_add_stability_check,
            vasp_add_wf_metadata,
            vasp_half_kpoints_first_relax,
            vasp_relax_max_force,
            vasp_volume_change_warning_tol,
            vasp_defuse_unsuccessful,
            vasp_custodian_max_errors,
            vasp_store_additional_json,
            vasp_run_bader,
            aims_cmd,
            forcefield_model,
        );
        if partial.vasp_store_volumetric_data.is_some() {
            self.vasp_store_volumetric_data = partial.vasp_store_volumetric_data;
        }
    }
}

fn parse_env_value(variable: &str, raw: &str, kind: FieldKind) -> Result<toml::Value, SettingsError> {
    let invalid = |expected| SettingsError::Environment {
        variable: variable.to_string(),
        value: raw.to_string(),
        expected,
    };
    let trimmed = raw.trim();
    match kind {
        FieldKind::Text => Ok(toml::Value::String(raw.to_string())),
        FieldKind::Flag => parse_flag(trimmed)
            .map(toml::Value::Boolean)
            .ok_or_else(|| invalid("a boolean")),
        FieldKind::Float => trimmed
            .parse::<f64>()
            .map(toml::Value::Float)
            .map_err(|_| invalid("a number")),
        FieldKind::Integer => trimmed
            .parse::<u32>()
            .map(|n| toml::Value::Integer(i64::from(n)))
            .map_err(|_| invalid("a non-negative integer")),
        FieldKind::DefuseMode => Ok(parse_flag(trimmed)
            .map(toml::Value::Boolean)
            .unwrap_or_else(|| toml::Value::String(trimmed.to_string()))),
        FieldKind::TextList => Ok(toml::Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_string()))
                .collect(),
        )),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
