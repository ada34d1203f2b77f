use crate::engine::config::EosConfig;
use crate::engine::error::EngineError;
use crate::engine::flow::{Flow, Node};
use crate::engine::maker::Maker;
use crate::engine::strain::{deformations_for, strain_samples};
use crate::engine::value::Value;
use crate::jobs::eos::apply_strain_to_structure;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

pub const EQUILIBRIUM_RELAX_NAME: &str = "EOS equilibrium relaxation";
pub const EQUILIBRIUM_STATIC_NAME: &str = "EOS equilibrium static";
pub const TRANSFORMATIONS_KEY: &str = "transformations:json";

/// Builds equation-of-state flows: an optional equilibrium stage, a sweep of
/// strained relaxations (each optionally followed by a static), and an optional fit.
#[derive(Debug)]
pub struct EosMaker {
    config: EosConfig,
}

impl EosMaker {
    pub fn new(config: EosConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EosConfig {
        &self.config
    }

    #[instrument(skip_all, name = "eos_flow")]
    pub fn make(
        &self,
        structure: impl Into<Value>,
        prev_dir: Option<Value>,
    ) -> Result<Flow, EngineError> {
        let config = &self.config;
        let mut structure = structure.into();
        let mut prev_dir = prev_dir;

        let mut nodes: Vec<Node> = Vec::new();
        let mut relax_outputs: Vec<Value> = Vec::new();
        let mut static_outputs: Vec<Value> = Vec::new();
        let mut flow_output: BTreeMap<String, Value> = BTreeMap::new();

        // === Phase 1: Optional equilibrium relaxation and static ===
        if let Some(initial_relax_maker) = &config.initial_relax_maker {
            info!("Adding equilibrium relaxation.");
            let mut relax = initial_relax_maker.make(structure, prev_dir)?;
            relax.set_name(EQUILIBRIUM_RELAX_NAME);
            append_to_inner_nodes(&mut relax, &format!(" {EQUILIBRIUM_RELAX_NAME}"));

            let output = relax.output();
            flow_output.insert("initial_relax".to_string(), equilibrium_point(&output)?);
            structure = output.attr("structure")?;
            prev_dir = Some(output.attr("dir_name")?);
            relax_outputs.push(output);
            nodes.push(relax);

            if let Some(static_maker) = &config.static_maker {
                let mut equil_static = static_maker.make(structure.clone(), prev_dir.clone())?;
                equil_static.set_name(EQUILIBRIUM_STATIC_NAME);

                let output = equil_static.output();
                flow_output.insert("initial_static".to_string(), equilibrium_point(&output)?);
                static_outputs.push(output);
                nodes.push(equil_static);
            }
        }

        // === Phase 2: Strain sweep ===
        let strains = strain_samples(
            config.linear_strain,
            config.number_of_frames,
            config.initial_relax_maker.is_some(),
        );
        debug!(?strains, "Computed linear strains.");
        let transformations = apply_strain_to_structure(structure, &deformations_for(&strains))?;
        let transformed = Value::Ref(transformations.output());
        nodes.push(Node::Job(transformations));

        // === Phase 3: Relaxation (and static) per frame ===
        for frame_idx in 0..config.number_of_frames {
            let frame = transformed.index(frame_idx)?;
            let mut relax = config
                .eos_relax_maker
                .make(frame.attr("final_structure")?, prev_dir.clone())?;
            if config.store_transformation_information {
                if let Err(e) = relax.write_additional_data(TRANSFORMATIONS_KEY, frame) {
                    debug!(error = %e, frame_idx, "Transformation details not stored.");
                }
            }
            let suffix = format!(" deformation {frame_idx}");
            append_to_name(&mut relax, &suffix);
            append_to_inner_nodes(&mut relax, &suffix);

            let relax_output = relax.output();
            relax_outputs.push(relax_output.clone());
            nodes.push(relax);

            if let Some(static_maker) = &config.static_maker {
                let mut static_node = static_maker.make(
                    relax_output.attr("structure")?,
                    Some(relax_output.attr("dir_name")?),
                )?;
                append_to_name(&mut static_node, &format!(" {frame_idx}"));
                static_outputs.push(static_node.output());
                nodes.push(static_node);
            }
        }

        // === Phase 4: Aggregate per job type ===
        flow_output.insert("relax".to_string(), collect_quantities(&relax_outputs)?);
        if config.static_maker.is_some() {
            flow_output.insert("static".to_string(), collect_quantities(&static_outputs)?);
        }
        let mut output = Value::Map(flow_output);

        // === Phase 5: Optional fit ===
        if let Some(postprocessor) = &config.postprocessor {
            let required = postprocessor.min_data_points();
            if relax_outputs.len() < required {
                return Err(EngineError::InsufficientFrames {
                    postprocessor: postprocessor.name().to_string(),
                    required,
                    found: relax_outputs.len(),
                });
            }
            let mut post_process = postprocessor.make(output)?;
            post_process.set_name(format!("{} postprocessing", config.name));
            output = Value::Ref(post_process.output());
            nodes.push(Node::Job(post_process));
        }

        let flow = Flow::new(config.name.clone(), nodes, output)?;
        info!(
            relaxations = relax_outputs.len(),
            statics = static_outputs.len(),
            jobs = flow.job_count(),
            "EOS flow assembled."
        );
        Ok(flow)
    }
}

impl Maker for EosMaker {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn make(&self, structure: Value, prev_dir: Option<Value>) -> Result<Node, EngineError> {
        EosMaker::make(self, structure, prev_dir).map(Node::Flow)
    }
}

fn append_to_name(node: &mut Node, suffix: &str) {
    let name = format!("{}{suffix}", node.name());
    node.set_name(name);
}

/// Tags every top-level member of a multi-node flow; plain jobs are left alone.
fn append_to_inner_nodes(node: &mut Node, suffix: &str) {
    if let Node::Flow(flow) = node {
        if flow.nodes().len() > 1 {
            for inner in flow.nodes_mut() {
                inner.append_name(suffix);
            }
        }
    }
}

fn equilibrium_point(output: &Value) -> Result<Value, EngineError> {
    Ok(Value::map([
        ("E0", output.attr("output")?.attr("energy")?),
        ("V0", output.attr("structure")?.attr("volume")?),
    ]))
}

fn collect_quantities(outputs: &[Value]) -> Result<Value, EngineError> {
    let mut energy = Vec::with_capacity(outputs.len());
    let mut volume = Vec::with_capacity(outputs.len());
    let mut stress = Vec::with_capacity(outputs.len());
    let mut structure = Vec::with_capacity(outputs.len());
    let mut dir_name = Vec::with_capacity(outputs.len());

    for output in outputs {
        let inner = output.attr("output")?;
        let final_structure = inner.attr("structure")?;
        energy.push(inner.attr("energy")?);
        volume.push(final_structure.attr("volume")?);
        stress.push(inner.attr("stress")?);
        structure.push(final_structure);
        dir_name.push(output.attr("dir_name")?);
    }

    Ok(Value::map([
        ("energy", Value::List(energy)),
        ("volume", Value::List(volume)),
        ("stress", Value::List(stress)),
        ("structure", Value::List(structure)),
        ("dir_name", Value::List(dir_name)),
    ]))
}
