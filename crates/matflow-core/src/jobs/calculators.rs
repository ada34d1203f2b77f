//! Reference calculator makers.
//!
//! These stand in for the real VASP, FHI-aims and force-field job makers: each
//! emits a job naming the calculator function and its inputs, with the command
//! and tuning knobs taken from [`Settings`].

use crate::engine::config::Code;
use crate::engine::error::EngineError;
use crate::engine::flow::{Flow, Node};
use crate::engine::job::Job;
use crate::engine::maker::Maker;
use crate::engine::settings::Settings;
use crate::engine::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The kind of calculation a [`CalculatorMaker`] schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Relax,
    TightRelax,
    ConstVolRelax,
    Static,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relax => "relax",
            Self::TightRelax => "tight_relax",
            Self::ConstVolRelax => "const_vol_relax",
            Self::Static => "static",
        }
    }

    pub fn default_name(&self) -> &'static str {
        match self {
            Self::Relax => "relax",
            Self::TightRelax => "tight relax",
            Self::ConstVolRelax => "constant volume relax",
            Self::Static => "static",
        }
    }

    pub fn is_relaxation(&self) -> bool {
        !matches!(self, Self::Static)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalculatorMaker {
    name: String,
    code: Code,
    task: TaskKind,
    command: Option<String>,
    kwargs: BTreeMap<String, Value>,
}

impl CalculatorMaker {
    pub fn new(code: Code, task: TaskKind) -> Self {
        Self {
            name: task.default_name().to_string(),
            code,
            task,
            command: None,
            kwargs: BTreeMap::new(),
        }
    }

    /// A maker whose jobs carry the launch command and run policy from `settings`.
    pub fn from_settings(code: Code, task: TaskKind, settings: &Settings) -> Self {
        let mut maker = Self::new(code, task);
        maker.command = settings.command_for(code).map(str::to_string);
        match code {
            Code::Vasp => {
                maker.kwargs.insert(
                    "max_errors".to_string(),
                    Value::from(settings.vasp_custodian_max_errors),
                );
                maker.kwargs.insert(
                    "add_namefile".to_string(),
                    Value::from(settings.vasp_add_namefile),
                );
                if task.is_relaxation() {
                    maker.kwargs.insert(
                        "max_force".to_string(),
                        Value::from(settings.vasp_relax_max_force),
                    );
                    maker.kwargs.insert(
                        "volume_change_warning_tol".to_string(),
                        Value::from(settings.vasp_volume_change_warning_tol),
                    );
                }
            }
            Code::Aims => {}
            Code::ForceFields => {
                maker.kwargs.insert(
                    "force_field_name".to_string(),
                    Value::from(settings.forcefield_model.as_str()),
                );
            }
        }
        maker
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn task(&self) -> TaskKind {
        self.task
    }

    pub fn function(&self) -> String {
        format!("{}.{}", self.code, self.task)
    }
}

impl Maker for CalculatorMaker {
    fn name(&self) -> &str {
        &self.name
    }

    fn make(&self, structure: Value, prev_dir: Option<Value>) -> Result<Node, EngineError> {
        let mut job =
            Job::new(self.name.clone(), self.function()).with_kwarg("structure", structure);
        if let Some(command) = &self.command {
            job = job.with_kwarg("command", command.as_str());
        }
        if let (Some(argname), Some(dir)) = (self.code.prev_calc_dir_argname(), prev_dir) {
            job = job.with_kwarg(argname, dir);
        }
        job.update_kwargs(self.kwargs.clone());
        Ok(Node::Job(job))
    }
}

/// Two chained relaxations; the second restarts from the first's outputs.
#[derive(Debug)]
pub struct DoubleRelaxMaker {
    name: String,
    relax_maker1: Box<dyn Maker>,
    relax_maker2: Box<dyn Maker>,
}

impl DoubleRelaxMaker {
    pub fn new(relax_maker1: Box<dyn Maker>, relax_maker2: Box<dyn Maker>) -> Self {
        Self {
            name: "double relax".to_string(),
            relax_maker1,
            relax_maker2,
        }
    }

    pub fn from_relax_maker<M: Maker + Clone + 'static>(maker: M) -> Self {
        Self::new(Box::new(maker.clone()), Box::new(maker))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Maker for DoubleRelaxMaker {
    fn name(&self) -> &str {
        &self.name
    }

    fn make(&self, structure: Value, prev_dir: Option<Value>) -> Result<Node, EngineError> {
        let mut relax1 = self.relax_maker1.make(structure, prev_dir)?;
        relax1.set_name("relax 1");
        let first = relax1.output();

        let mut relax2 = self
            .relax_maker2
            .make(first.attr("structure")?, Some(first.attr("dir_name")?))?;
        relax2.set_name("relax 2");

        let output = relax2.output();
        Ok(Node::Flow(Flow::new(
            self.name.clone(),
            vec![relax1, relax2],
            output,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::structure::{Lattice, Site, Structure};

    fn structure() -> Value {
        Value::from(Structure::new(
            Lattice::cubic(5.43),
            vec![Site::new("Si", [0.0; 3]), Site::new("Si", [0.25; 3])],
        ))
    }

    #[test]
    fn function_name_combines_code_and_task() {
        let maker = CalculatorMaker::new(Code::Aims, TaskKind::ConstVolRelax);
        assert_eq!(maker.function(), "aims.const_vol_relax");
        assert_eq!(maker.name(), "constant volume relax");
    }

    #[test]
    fn vasp_static_receives_prev_dir_under_its_keyword() {
        let maker = CalculatorMaker::new(Code::Vasp, TaskKind::Static);
        let dir = Value::from("/runs/relax");
        let node = maker.make(structure(), Some(dir.clone())).unwrap();
        let job = node.as_job().unwrap();
        assert_eq!(job.kwarg("prev_dir"), Some(&dir));
        assert_eq!(job.function(), "vasp.static");
    }

    #[test]
    fn forcefield_maker_ignores_prev_dir() {
        let maker = CalculatorMaker::new(Code::ForceFields, TaskKind::Relax);
        let node = maker.make(structure(), Some(Value::from("/runs/x"))).unwrap();
        let job = node.as_job().unwrap();
        assert!(job.kwarg("prev_dir").is_none());
        assert!(job.kwarg("structure").is_some());
    }

    #[test]
    fn from_settings_copies_command_and_policy() {
        let settings = Settings {
            vasp_cmd: "srun vasp_std".to_string(),
            vasp_custodian_max_errors: 7,
            ..Settings::default()
        };
        let relax = CalculatorMaker::from_settings(Code::Vasp, TaskKind::Relax, &settings);
        let job = relax.make(structure(), None).unwrap();
        let job = job.as_job().unwrap();
        assert_eq!(job.kwarg("command"), Some(&Value::from("srun vasp_std")));
        assert_eq!(job.kwarg("max_errors"), Some(&Value::from(7u32)));
        assert_eq!(job.kwarg("max_force"), Some(&Value::from(0.25)));

        let stat = CalculatorMaker::from_settings(Code::Vasp, TaskKind::Static, &settings);
        let job = stat.make(structure(), None).unwrap();
        assert!(job.as_job().unwrap().kwarg("max_force").is_none());

        let ff = CalculatorMaker::from_settings(Code::ForceFields, TaskKind::Relax, &settings);
        let job = ff.make(structure(), None).unwrap();
        let job = job.as_job().unwrap();
        assert!(job.kwarg("command").is_none());
        assert_eq!(job.kwarg("force_field_name"), Some(&Value::from("CHGNet")));
    }

    #[test]
    fn double_relax_chains_structure_and_directory() {
        let maker = DoubleRelaxMaker::from_relax_maker(CalculatorMaker::new(
            Code::Vasp,
            TaskKind::Relax,
        ));
        let node = maker.make(structure(), None).unwrap();
        let flow = node.as_flow().unwrap();
        assert_eq!(flow.job_count(), 2);
        assert_eq!(flow.name(), "double relax");

        let jobs: Vec<_> = flow.jobs().collect();
        assert_eq!(jobs[0].name(), "relax 1");
        assert_eq!(jobs[1].name(), "relax 2");
        assert_eq!(
            jobs[1].kwarg("structure"),
            Some(&Value::from(jobs[0].output().attr("structure")))
        );
        assert_eq!(
            jobs[1].kwarg("prev_dir"),
            Some(&Value::from(jobs[0].output().attr("dir_name")))
        );
        assert_eq!(flow.output(), &Value::from(jobs[1].output()));
    }
}
