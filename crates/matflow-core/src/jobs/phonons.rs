use crate::engine::config::{Code, KpathScheme};
use crate::engine::error::EngineError;
use crate::engine::flow::{Flow, Node};
use crate::engine::job::Job;
use crate::engine::maker::PhononMaker;
use crate::engine::value::Value;

pub const GENERATE_DISPLACEMENTS_FUNCTION: &str = "phonons.generate_phonon_displacements";
pub const RUN_DISPLACEMENTS_FUNCTION: &str = "phonons.run_phonon_displacements";
pub const GENERATE_FREQUENCIES_FUNCTION: &str = "phonons.generate_frequencies_eigenvectors";

/// Default artifact names written by the final phonon job.
pub const DEFAULT_FILENAMES: [(&str, &str); 5] = [
    ("filename_phonopy_yaml", "phonopy.yaml"),
    ("filename_band_yaml", "phonon_band_structure.yaml"),
    ("filename_dos_yaml", "phonon_dos.yaml"),
    ("filename_bs", "phonon_band_structure.pdf"),
    ("filename_dos", "phonon_dos.pdf"),
];

/// Finite-displacement phonon workflow: displace, compute forces, post-process.
#[derive(Debug, Clone, PartialEq)]
pub struct PhononFlowMaker {
    name: String,
    code: Code,
    displacement: f64,
    min_length: f64,
    symprec: f64,
    kpath_scheme: KpathScheme,
}

impl PhononFlowMaker {
    pub fn new(code: Code) -> Self {
        Self {
            name: "phonon".to_string(),
            code,
            displacement: 0.01,
            min_length: 20.0,
            symprec: 1e-4,
            kpath_scheme: KpathScheme::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Atomic displacement amplitude in Å.
    pub fn with_displacement(mut self, displacement: f64) -> Self {
        self.displacement = displacement;
        self
    }

    /// Minimum supercell edge length in Å.
    pub fn with_min_length(mut self, min_length: f64) -> Self {
        self.min_length = min_length;
        self
    }

    pub fn with_symprec(mut self, symprec: f64) -> Self {
        self.symprec = symprec;
        self
    }

    pub fn with_kpath_scheme(mut self, scheme: KpathScheme) -> Self {
        self.kpath_scheme = scheme;
        self
    }
}

impl PhononMaker for PhononFlowMaker {
    fn make(&self, structure: Value) -> Result<Flow, EngineError> {
        if !(self.displacement.is_finite() && self.displacement > 0.0) {
            return Err(EngineError::InvalidParameter {
                name: "displacement",
                reason: format!("must be a positive number, got {}", self.displacement),
            });
        }

        let displacements =
            Job::new("generate_phonon_displacements", GENERATE_DISPLACEMENTS_FUNCTION)
                .with_kwarg("structure", structure.clone())
                .with_kwarg("displacement", self.displacement)
                .with_kwarg("min_length", self.min_length)
                .with_kwarg("symprec", self.symprec);

        let forces = Job::new("run_phonon_displacements", RUN_DISPLACEMENTS_FUNCTION)
            .with_kwarg("displaced_structures", displacements.output())
            .with_kwarg("structure", structure.clone())
            .with_kwarg("code", self.code.as_str());

        let mut frequencies =
            Job::new("generate_frequencies_eigenvectors", GENERATE_FREQUENCIES_FUNCTION)
                .with_kwarg("structure", structure)
                .with_kwarg("displacement_data", forces.output())
                .with_kwarg("symprec", self.symprec)
                .with_kwarg("kpath_scheme", self.kpath_scheme.as_str())
                .with_kwarg("code", self.code.as_str());
        frequencies.update_kwargs(
            DEFAULT_FILENAMES
                .iter()
                .map(|&(key, file)| (key, Value::from(file))),
        );

        let output = Value::Ref(frequencies.output());
        Flow::new(
            self.name.clone(),
            vec![
                Node::Job(displacements),
                Node::Job(forces),
                Node::Job(frequencies),
            ],
            output,
        )
    }
}
