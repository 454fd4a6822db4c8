/// Errors from verdict synthesis.
///
/// Model failures never appear here; they degrade to the deterministic path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SynthesisError {
    #[error("no signal domain is available for subject {subject_id}")]
    InputInsufficient { subject_id: String },

    #[error("invalid synthesis configuration: {0}")]
    InvalidConfig(String),
}
