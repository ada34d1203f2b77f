use crate::engine::config::{Code, GruneisenConfig};
use crate::engine::error::EngineError;
use crate::engine::flow::{Flow, Node};
use crate::engine::value::Value;
use crate::jobs::gruneisen::{
    GruneisenParamInputs, compute_gruneisen_param, shrink_expand_structure,
};
use crate::jobs::phonons::DEFAULT_FILENAMES;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::{debug, info, instrument};

/// Branches of a Grueneisen calculation, in construction order.
pub const BRANCHES: [&str; 3] = ["ground", "plus", "minus"];

/// The calculator family a Grueneisen flow targets.
pub trait GruneisenBackend: Debug + Send + Sync {
    fn code(&self) -> Code;

    /// Keyword the backend's calculations use for the previous directory.
    ///
    /// Informational: it is only logged while the flow is built. Calculator makers
    /// attach the keyword themselves from their own [`Code`].
    fn prev_calc_dir_argname(&self) -> Option<&'static str> {
        self.code().prev_calc_dir_argname()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VaspGruneisen;

impl GruneisenBackend for VaspGruneisen {
    fn code(&self) -> Code {
        Code::Vasp
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AimsGruneisen;

impl GruneisenBackend for AimsGruneisen {
    fn code(&self) -> Code {
        Code::Aims
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ForceFieldGruneisen;

impl GruneisenBackend for ForceFieldGruneisen {
    fn code(&self) -> Code {
        Code::ForceFields
    }
}

/// Phonopy artifact names for one branch, so the three phonon runs can share a directory.
pub fn phonon_filenames(branch: &str) -> Vec<(String, Value)> {
    DEFAULT_FILENAMES
        .iter()
        .map(|&(key, file)| (key.to_string(), Value::from(format!("{branch}_{file}"))))
        .collect()
}

/// Builds Grueneisen-parameter flows: phonons at the ground-state volume and at
/// slightly expanded and shrunk volumes, followed by one extraction job.
#[derive(Debug)]
pub struct GruneisenMaker<B: GruneisenBackend> {
    backend: B,
    config: GruneisenConfig,
}

impl<B: GruneisenBackend> GruneisenMaker<B> {
    pub fn new(backend: B, config: GruneisenConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &GruneisenConfig {
        &self.config
    }

    #[instrument(skip_all, name = "gruneisen_flow")]
    pub fn make(&self, structure: impl Into<Value>) -> Result<Flow, EngineError> {
        let config = &self.config;
        let mut nodes: Vec<Node> = Vec::new();
        debug!(
            code = %self.backend.code(),
            prev_dir_argname = ?self.backend.prev_calc_dir_argname(),
            "Building Grueneisen flow."
        );

        // === Phase 1: Ground state ===
        let ground = match &config.bulk_relax_maker {
            Some(bulk_relax_maker) => {
                let bulk = bulk_relax_maker.make(structure.into(), None)?;
                let relaxed = bulk.output().attr("structure")?;
                nodes.push(bulk);
                relaxed
            }
            None => {
                info!("No bulk relaxation configured; perturbing the input structure directly.");
                structure.into()
            }
        };

        // === Phase 2: Expanded and shrunk cells, relaxed at constant volume ===
        let struct_dict = shrink_expand_structure(ground.clone(), config.perc_vol);
        let perturbed = Value::Ref(struct_dict.output());
        nodes.push(Node::Job(struct_dict));

        let mut optimized = vec![(BRANCHES[0], ground.clone())];
        for branch in &BRANCHES[1..] {
            let relax = config
                .const_vol_relax_maker
                .make(perturbed.attr(branch)?, None)?;
            optimized.push((*branch, relax.output().attr("structure")?));
            nodes.push(relax);
        }

        // === Phase 3: Phonons per branch ===
        let mut phonon_yaml_dirs = BTreeMap::new();
        let mut phonon_imaginary_modes = BTreeMap::new();
        for (branch, optimized_structure) in optimized {
            let mut phonon = config.phonon_maker.make(optimized_structure)?;
            let phonon_name = phonon.name().to_string();
            phonon
                .last_job_mut()
                .ok_or_else(|| EngineError::InvalidParameter {
                    name: "phonon_maker",
                    reason: format!("phonon flow '{phonon_name}' contains no jobs"),
                })?
                .update_kwargs(phonon_filenames(branch));

            let output = phonon.output().clone();
            phonon_yaml_dirs.insert(
                branch.to_string(),
                output.attr("jobdirs")?.attr("taskdoc_run_job_dir")?,
            );
            phonon_imaginary_modes
                .insert(branch.to_string(), output.attr("has_imaginary_modes")?);
            nodes.push(Node::Flow(phonon));
        }

        // === Phase 4: Extraction ===
        let get_gru = compute_gruneisen_param(
            GruneisenParamInputs {
                code: self.backend.code(),
                kpath_scheme: config.kpath_scheme,
                mesh: config.mesh,
                symprec: config.symprec,
                structure: ground,
                phonopy_yaml_paths: Value::Map(phonon_yaml_dirs),
                imaginary_modes: Value::Map(phonon_imaginary_modes),
            },
            &config.compute_gruneisen_param_kwargs,
        )?;
        let output = Value::Ref(get_gru.output());
        nodes.push(Node::Job(get_gru));

        let flow = Flow::new(config.name.clone(), nodes, output)?;
        info!(
            nodes = flow.nodes().len(),
            jobs = flow.job_count(),
            "Grueneisen flow assembled."
        );
        Ok(flow)
    }
}
