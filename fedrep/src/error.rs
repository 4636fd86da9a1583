use std::{error::Error, fmt, io};

use ml_core::MlError;
use safetensors::SafeTensorError;

/// The crate's result type.
pub type Result<T> = std::result::Result<T, FedRepError>;

/// Failures of the per-client training/evaluation state machine.
#[derive(Debug)]
pub enum FedRepError {
    /// Parameter-structure violation (shape conflict, bad merge keys).
    Ml(MlError),

    /// I/O failure while touching a client-state file.
    Io(io::Error),

    /// A client-state file could not be encoded or decoded.
    State(SafeTensorError),

    /// A tensor inside a client-state file has an unusable dtype or shape.
    StateTensor { key: String, detail: &'static str },

    /// A loader-backed dataset is empty where metrics need a denominator.
    EmptyDataset { split: &'static str },

    /// A splitter produced an unusable body/head partition.
    InvalidSplit { detail: &'static str },
}

impl fmt::Display for FedRepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FedRepError::Ml(e) => write!(f, "parameter error: {e}"),
            FedRepError::Io(e) => write!(f, "state file io error: {e}"),
            FedRepError::State(e) => write!(f, "state file format error: {e:?}"),
            FedRepError::StateTensor { key, detail } => {
                write!(f, "unusable state tensor {key}: {detail}")
            }
            FedRepError::EmptyDataset { split } => {
                write!(f, "the {split} dataset is empty")
            }
            FedRepError::InvalidSplit { detail } => write!(f, "invalid model split: {detail}"),
        }
    }
}

impl Error for FedRepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FedRepError::Ml(e) => Some(e),
            FedRepError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlError> for FedRepError {
    fn from(value: MlError) -> Self {
        Self::Ml(value)
    }
}

impl From<io::Error> for FedRepError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SafeTensorError> for FedRepError {
    fn from(value: SafeTensorError) -> Self {
        Self::State(value)
    }
}
