use thiserror::Error;

#[derive(Debug, Error)]
pub enum FragmentationError {
    #[error("fragmentation cancelled")]
    Cancelled,

    #[error("malformed neutral loss table at line {line}: {reason}")]
    NeutralLossTable { line: usize, reason: String },

    #[error("unknown element: {0}")]
    UnknownElement(String),
}
