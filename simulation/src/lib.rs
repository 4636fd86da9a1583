pub mod client;
pub mod error;
pub mod experiment;
pub mod history;
pub mod server;
pub mod strategy;

pub use client::Client;
pub use error::SimError;
pub use experiment::ExperimentConfig;
pub use history::{History, RoundMetrics};
pub use server::Server;
