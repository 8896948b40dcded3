use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RandomSourceError {
    #[error("entropy source failed: {0}")]
    Entropy(String),
    #[error("invalid code length {length}; expected {min}..={max}")]
    InvalidLength {
        length: usize,
        min: usize,
        max: usize,
    },
}
