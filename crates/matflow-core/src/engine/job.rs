use super::reference::OutputRef;
use super::value::Value;
use crate::core::models::ids::JobId;
use serde::Serialize;
use std::collections::BTreeMap;

/// One schedulable unit of work.
///
/// A job names the function the execution engine must call (`function`) together
/// with its keyword arguments, which may contain references to other jobs' outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    id: JobId,
    name: String,
    function: String,
    kwargs: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    additional_data: BTreeMap<String, Value>,
}

impl Job {
    pub fn new(name: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            name: name.into(),
            function: function.into(),
            kwargs: BTreeMap::new(),
            additional_data: BTreeMap::new(),
        }
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn append_name(&mut self, suffix: &str) {
        self.name.push_str(suffix);
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn kwargs(&self) -> &BTreeMap<String, Value> {
        &self.kwargs
    }

    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    /// Inserts or overwrites keyword arguments.
    pub fn update_kwargs<K, I>(&mut self, entries: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        self.kwargs
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v)));
    }

    /// Data the job persists alongside its regular output (e.g. `transformations:json`).
    pub fn additional_data(&self) -> &BTreeMap<String, Value> {
        &self.additional_data
    }

    pub fn write_additional_data(&mut self, key: impl Into<String>, value: Value) {
        self.additional_data.insert(key.into(), value);
    }

    pub fn output(&self) -> OutputRef {
        OutputRef::new(self.id)
    }

    /// References this job consumes, i.e. the jobs it depends on.
    pub fn input_references(&self) -> Vec<&OutputRef> {
        self.kwargs.values().flat_map(Value::references).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_has_fresh_id_and_no_kwargs() {
        let a = Job::new("relax", "vasp.relax");
        let b = Job::new("relax", "vasp.relax");
        assert_ne!(a.id(), b.id());
        assert!(a.kwargs().is_empty());
        assert_eq!(a.function(), "vasp.relax");
    }

    #[test]
    fn output_reference_points_at_job() {
        let job = Job::new("static", "vasp.static");
        assert_eq!(job.output().job(), job.id());
        assert!(job.output().path().is_empty());
    }

    #[test]
    fn append_name_extends_existing_name() {
        let mut job = Job::new("relax", "vasp.relax");
        job.append_name(" deformation 3");
        assert_eq!(job.name(), "relax deformation 3");
    }

    #[test]
    fn update_kwargs_overrides_existing_entries() {
        let mut job = Job::new("phonon", "phonons.generate_frequencies_eigenvectors")
            .with_kwarg("filename_phonopy_yaml", "phonopy.yaml")
            .with_kwarg("symprec", 1e-4);
        job.update_kwargs([("filename_phonopy_yaml", Value::from("plus_phonopy.yaml"))]);

        assert_eq!(
            job.kwarg("filename_phonopy_yaml"),
            Some(&Value::from("plus_phonopy.yaml"))
        );
        assert_eq!(job.kwarg("symprec"), Some(&Value::from(1e-4)));
    }

    #[test]
    fn input_references_lists_dependencies() {
        let parent = Job::new("relax", "vasp.relax");
        let child = Job::new("static", "vasp.static")
            .with_kwarg("structure", parent.output().attr("structure"))
            .with_kwarg("prev_dir", parent.output().attr("dir_name"))
            .with_kwarg("label", "static");

        let refs = child.input_references();
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.job() == parent.id()));
    }

    #[test]
    fn additional_data_is_stored_per_key() {
        let mut job = Job::new("relax", "vasp.relax");
        job.write_additional_data("transformations:json", Value::from(1i64));
        assert_eq!(
            job.additional_data().get("transformations:json"),
            Some(&Value::from(1i64))
        );
    }
}
