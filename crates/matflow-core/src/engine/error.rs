use crate::core::models::ids::JobId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(
        "To perform least squares EOS fit with {postprocessor}, you must specify \
         number_of_frames >= {required} (only {found} relaxation(s) would be available)"
    )]
    InsufficientFrames {
        postprocessor: String,
        required: usize,
        found: usize,
    },

    #[error("Output of flow '{flow}' references job {job}, which is not part of the flow")]
    DanglingReference { flow: String, job: JobId },

    #[error("Cannot project '{key}' out of {kind}")]
    Projection { key: String, kind: &'static str },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("'{node}' does not accept additional data: {reason}")]
    AdditionalData { node: String, reason: &'static str },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
