use crate::engine::config::{Code, KpathScheme};
use crate::engine::error::EngineError;
use crate::engine::job::Job;
use crate::engine::value::Value;
use std::collections::BTreeMap;

pub const SHRINK_EXPAND_FUNCTION: &str = "gruneisen.shrink_expand_structure";
pub const COMPUTE_GRUNEISEN_PARAM_FUNCTION: &str = "gruneisen.compute_gruneisen_param";

/// Job producing `{plus, minus}`: `structure` scaled to `V * (1 ± perc_vol)`.
pub fn shrink_expand_structure(structure: impl Into<Value>, perc_vol: f64) -> Job {
    Job::new("shrink_expand_structure", SHRINK_EXPAND_FUNCTION)
        .with_kwarg("structure", structure)
        .with_kwarg("perc_vol", perc_vol)
}

/// Arguments of the Grueneisen extraction job.
///
/// `phonopy_yaml_paths` and `imaginary_modes` are maps keyed by branch
/// (`ground`, `plus`, `minus`).
#[derive(Debug, Clone)]
pub struct GruneisenParamInputs {
    pub code: Code,
    pub kpath_scheme: KpathScheme,
    pub mesh: [u32; 3],
    pub symprec: f64,
    pub structure: Value,
    pub phonopy_yaml_paths: Value,
    pub imaginary_modes: Value,
}

pub fn compute_gruneisen_param(
    inputs: GruneisenParamInputs,
    extra_kwargs: &BTreeMap<String, serde_json::Value>,
) -> Result<Job, EngineError> {
    let mut job = Job::new("compute_gruneisen_param", COMPUTE_GRUNEISEN_PARAM_FUNCTION)
        .with_kwarg("code", inputs.code.as_str())
        .with_kwarg("kpath_scheme", inputs.kpath_scheme.as_str())
        .with_kwarg("mesh", Value::literal(&inputs.mesh)?)
        .with_kwarg("phonopy_yaml_paths_dict", inputs.phonopy_yaml_paths)
        .with_kwarg("structure", inputs.structure)
        .with_kwarg("symprec", inputs.symprec)
        .with_kwarg("phonon_imaginary_modes_info", inputs.imaginary_modes);

    if let Some(clash) = extra_kwargs.keys().find(|key| job.kwarg(key).is_some()) {
        return Err(EngineError::InvalidParameter {
            name: "compute_gruneisen_param_kwargs",
            reason: format!("'{clash}' is already set by the Grueneisen flow"),
        });
    }
    job.update_kwargs(
        extra_kwargs
            .iter()
            .map(|(key, value)| (key.clone(), Value::from(value.clone()))),
    );
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::JobId;
    use crate::engine::reference::OutputRef;

    fn inputs() -> GruneisenParamInputs {
        let phonon = OutputRef::new(JobId::new());
        GruneisenParamInputs {
            code: Code::Vasp,
            kpath_scheme: KpathScheme::Seekpath,
            mesh: [20, 20, 20],
            symprec: 1e-4,
            structure: Value::from(OutputRef::new(JobId::new()).attr("structure")),
            phonopy_yaml_paths: Value::map([("ground", Value::from(phonon.attr("jobdirs")))]),
            imaginary_modes: Value::map([("ground", Value::from(false))]),
        }
    }

    #[test]
    fn shrink_expand_job_records_volume_fraction() {
        let job = shrink_expand_structure("raw", 0.01);
        assert_eq!(job.function(), SHRINK_EXPAND_FUNCTION);
        assert_eq!(job.kwarg("perc_vol"), Some(&Value::from(0.01)));
        assert_eq!(job.kwarg("structure"), Some(&Value::from("raw")));
    }

    #[test]
    fn extraction_job_carries_all_named_arguments() {
        let job = compute_gruneisen_param(inputs(), &BTreeMap::new()).unwrap();
        let keys: Vec<_> = job.kwargs().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "code",
                "kpath_scheme",
                "mesh",
                "phonon_imaginary_modes_info",
                "phonopy_yaml_paths_dict",
                "structure",
                "symprec",
            ]
        );
        assert_eq!(job.kwarg("code"), Some(&Value::from("vasp")));
        assert_eq!(job.input_references().len(), 2);
    }

    #[test]
    fn extra_kwargs_are_flattened_in() {
        let mut extra = BTreeMap::new();
        extra.insert("plot_kwargs".to_string(), serde_json::json!({"dpi": 300}));
        let job = compute_gruneisen_param(inputs(), &extra).unwrap();
        assert_eq!(
            job.kwarg("plot_kwargs"),
            Some(&Value::from(serde_json::json!({"dpi": 300})))
        );
    }

    #[test]
    fn extra_kwargs_may_not_shadow_flow_arguments() {
        let mut extra = BTreeMap::new();
        extra.insert("mesh".to_string(), serde_json::json!([1, 1, 1]));
        let err = compute_gruneisen_param(inputs(), &extra).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
    }
}
