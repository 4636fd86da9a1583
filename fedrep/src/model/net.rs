use rand::Rng;
use serde::Deserialize;

use ml_core::{Sequential, init};

use crate::error::Result;
use crate::model::split::{HeadLayersSplitter, LastLayerSplitter, Splitter};

/// Architecture of the classification network a client trains.
#[derive(Debug, Clone, Deserialize)]
pub struct NetSpec {
    pub input_dim: usize,
    pub hidden: Vec<usize>,
    pub num_classes: usize,
}

impl NetSpec {
    /// Builds the network with freshly initialized parameters.
    pub fn build<R: Rng>(&self, rng: &mut R) -> Result<Sequential> {
        let model = init::mlp(rng, self.input_dim, &self.hidden, self.num_classes)?;
        Ok(model)
    }
}

/// Which splitting rule decomposes the architecture into body and head.
///
/// Selected by configuration at startup; each concrete model architecture
/// names the rule that matches its classifier layout.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitSpec {
    /// Body = all but the last layer.
    LastLayer,
    /// Body = all but the final `n` layers.
    HeadLayers { n: usize },
}

impl SplitSpec {
    /// Resolves the spec into a concrete splitter.
    pub fn splitter(&self) -> Box<dyn Splitter> {
        match self {
            SplitSpec::LastLayer => Box::new(LastLayerSplitter),
            SplitSpec::HeadLayers { n } => Box::new(HeadLayersSplitter::new(*n)),
        }
    }
}
