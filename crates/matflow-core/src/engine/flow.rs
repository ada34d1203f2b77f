use super::error::EngineError;
use super::job::Job;
use super::value::Value;
use crate::core::models::ids::JobId;
use serde::Serialize;
use std::collections::HashSet;

/// Either a single job or a nested flow; what a `Maker` hands back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Job(Job),
    Flow(Flow),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Self::Job(job) => job.name(),
            Self::Flow(flow) => flow.name(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        match self {
            Self::Job(job) => job.set_name(name),
            Self::Flow(flow) => flow.set_name(name),
        }
    }

    /// Appends `suffix` to this node's name and, for a flow, to every job inside it.
    pub fn append_name(&mut self, suffix: &str) {
        match self {
            Self::Job(job) => job.append_name(suffix),
            Self::Flow(flow) => flow.append_name(suffix),
        }
    }

    pub fn output(&self) -> Value {
        match self {
            Self::Job(job) => Value::Ref(job.output()),
            Self::Flow(flow) => flow.output().clone(),
        }
    }

    pub fn job_count(&self) -> usize {
        match self {
            Self::Job(_) => 1,
            Self::Flow(flow) => flow.job_count(),
        }
    }

    pub fn jobs(&self) -> Box<dyn Iterator<Item = &Job> + '_> {
        match self {
            Self::Job(job) => Box::new(std::iter::once(job)),
            Self::Flow(flow) => flow.jobs(),
        }
    }

    pub fn as_job(&self) -> Option<&Job> {
        match self {
            Self::Job(job) => Some(job),
            Self::Flow(_) => None,
        }
    }

    pub fn as_flow(&self) -> Option<&Flow> {
        match self {
            Self::Flow(flow) => Some(flow),
            Self::Job(_) => None,
        }
    }

    /// Attaches auxiliary data to the job this node stands for.
    ///
    /// Fails for flows wrapping several jobs, where no single job owns the data.
    pub fn write_additional_data(
        &mut self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), EngineError> {
        match self {
            Self::Job(job) => {
                job.write_additional_data(key, value);
                Ok(())
            }
            Self::Flow(flow) => match flow.nodes.as_mut_slice() {
                [only] => only.write_additional_data(key, value),
                _ => Err(EngineError::AdditionalData {
                    node: flow.name.clone(),
                    reason: "flow does not wrap exactly one job",
                }),
            },
        }
    }

    fn last_job_mut(&mut self) -> Option<&mut Job> {
        match self {
            Self::Job(job) => Some(job),
            Self::Flow(flow) => flow.last_job_mut(),
        }
    }
}

impl From<Job> for Node {
    fn from(job: Job) -> Self {
        Self::Job(job)
    }
}

impl From<Flow> for Node {
    fn from(flow: Flow) -> Self {
        Self::Flow(flow)
    }
}

/// A named, ordered collection of nodes with one aggregate output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flow {
    name: String,
    nodes: Vec<Node>,
    output: Value,
}

impl Flow {
    /// Builds a flow, rejecting outputs that reference jobs outside of `nodes`.
    pub fn new(
        name: impl Into<String>,
        nodes: Vec<Node>,
        output: Value,
    ) -> Result<Self, EngineError> {
        let flow = Self {
            name: name.into(),
            nodes,
            output,
        };
        flow.validate()?;
        Ok(flow)
    }

    fn validate(&self) -> Result<(), EngineError> {
        let ids = self.job_ids();
        match self
            .output
            .references()
            .into_iter()
            .find(|r| !ids.contains(&r.job()))
        {
            Some(dangling) => Err(EngineError::DanglingReference {
                flow: self.name.clone(),
                job: dangling.job(),
            }),
            None => Ok(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn append_name(&mut self, suffix: &str) {
        self.name.push_str(suffix);
        for node in &mut self.nodes {
            node.append_name(suffix);
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn output(&self) -> &Value {
        &self.output
    }

    /// All leaf jobs, depth first, in flow order.
    pub fn jobs(&self) -> Box<dyn Iterator<Item = &Job> + '_> {
        Box::new(self.nodes.iter().flat_map(Node::jobs))
    }

    pub fn job_count(&self) -> usize {
        self.nodes.iter().map(Node::job_count).sum()
    }

    pub fn job_ids(&self) -> HashSet<JobId> {
        self.jobs().map(Job::id).collect()
    }

    pub fn contains_job(&self, id: JobId) -> bool {
        self.jobs().any(|job| job.id() == id)
    }

    pub fn last_job_mut(&mut self) -> Option<&mut Job> {
        self.nodes.last_mut().and_then(Node::last_job_mut)
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
