use std::{error::Error, fmt, io};

use fedrep::FedRepError;

/// The simulation's result type.
pub type Result<T> = std::result::Result<T, SimError>;

/// Failures while driving federated rounds.
///
/// A client failure is fatal for the round: the simulation has no retry
/// policy.
#[derive(Debug)]
pub enum SimError {
    /// A client's local training or evaluation failed.
    Client {
        client_id: usize,
        source: FedRepError,
    },

    /// Client updates could not be aggregated.
    Aggregation { detail: &'static str },

    /// The experiment configuration is unusable.
    Config { detail: &'static str },

    /// Setting up the run (state directory, model construction) failed.
    Setup(io::Error),

    /// Building a model from its spec failed.
    Model(FedRepError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Client { client_id, source } => {
                write!(f, "client {client_id} failed: {source}")
            }
            SimError::Aggregation { detail } => write!(f, "aggregation failed: {detail}"),
            SimError::Config { detail } => write!(f, "invalid experiment config: {detail}"),
            SimError::Setup(e) => write!(f, "run setup failed: {e}"),
            SimError::Model(e) => write!(f, "model construction failed: {e}"),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SimError::Client { source, .. } => Some(source),
            SimError::Setup(e) => Some(e),
            SimError::Model(e) => Some(e),
            SimError::Aggregation { .. } | SimError::Config { .. } => None,
        }
    }
}

impl From<io::Error> for SimError {
    fn from(value: io::Error) -> Self {
        Self::Setup(value)
    }
}
