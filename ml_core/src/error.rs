use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, MlError>;

/// Errors produced when constructing models or merging parameter states.
#[derive(Debug)]
pub enum MlError {
    /// An input is invalid for semantic or domain reasons.
    InvalidInput(&'static str),

    /// A named tensor's shape disagrees with the existing structure.
    ShapeMismatch {
        key: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },

    /// A provided key does not exist in the target state.
    UnknownKey { key: String },

    /// A key present in the target state is absent from the provided one.
    MissingKey { key: String },
}

impl Display for MlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            MlError::ShapeMismatch { key, got, expected } => {
                write!(f, "shape mismatch for {key}: got {got:?}, expected {expected:?}")
            }
            MlError::UnknownKey { key } => write!(f, "unknown parameter key: {key}"),
            MlError::MissingKey { key } => write!(f, "missing parameter key: {key}"),
        }
    }
}

impl Error for MlError {}
