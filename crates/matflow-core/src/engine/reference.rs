use crate::core::models::ids::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a projection into a job's (future) output document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    Attr(String),
    Index(usize),
}

/// A placeholder for a value that only exists once job `job` has run.
///
/// Projections are recorded, never evaluated: `r.attr("output").attr("energy")`
/// describes where the execution engine must look once the output is available.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    job: JobId,
    path: Vec<Projection>,
}

impl OutputRef {
    pub fn new(job: JobId) -> Self {
        Self {
            job,
            path: Vec::new(),
        }
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    pub fn path(&self) -> &[Projection] {
        &self.path
    }

    pub fn attr(&self, name: impl Into<String>) -> Self {
        self.extended(Projection::Attr(name.into()))
    }

    pub fn index(&self, idx: usize) -> Self {
        self.extended(Projection::Index(idx))
    }

    fn extended(&self, step: Projection) -> Self {
        let mut path = self.path.clone();
        path.push(step);
        Self {
            job: self.job,
            path,
        }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputRef({})", self.job)?;
        for step in &self.path {
            match step {
                Projection::Attr(name) => write!(f, ".{name}")?,
                Projection::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_reference_has_empty_path() {
        let job = JobId::new();
        let r = OutputRef::new(job);
        assert_eq!(r.job(), job);
        assert!(r.path().is_empty());
    }

    #[test]
    fn projections_accumulate_without_touching_the_original() {
        let root = OutputRef::new(JobId::new());
        let energy = root.attr("output").attr("energy");
        let frame = root.index(2).attr("final_structure");

        assert!(root.path().is_empty());
        assert_eq!(
            energy.path(),
            &[
                Projection::Attr("output".into()),
                Projection::Attr("energy".into())
            ]
        );
        assert_eq!(
            frame.path(),
            &[
                Projection::Index(2),
                Projection::Attr("final_structure".into())
            ]
        );
        assert_eq!(energy.job(), frame.job());
    }

    #[test]
    fn display_renders_attribute_and_index_steps() {
        let job = JobId::new();
        let r = OutputRef::new(job).index(0).attr("final_structure");
        assert_eq!(r.to_string(), format!("OutputRef({job})[0].final_structure"));
    }
}
