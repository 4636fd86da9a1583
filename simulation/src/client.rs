use ndarray::ArrayD;

use fedrep::{Metrics, ModelManager};

use crate::error::{Result, SimError};

/// What a client hands back after local training.
pub struct FitResult {
    /// Body tensors after the round, in structural order.
    pub body: Vec<ArrayD<f32>>,
    /// Train example count, the aggregation weight.
    pub num_examples: usize,
    pub metrics: Metrics,
}

/// What a client hands back after evaluation.
pub struct EvalResult {
    /// Test example count, the averaging weight.
    pub num_examples: usize,
    pub metrics: Metrics,
}

/// One simulated participant: receives the aggregated body, delegates to its
/// model manager, and reports the updated body plus metrics.
pub struct Client {
    id: usize,
    manager: ModelManager,
}

impl Client {
    pub fn new(id: usize, manager: ModelManager) -> Self {
        Self { id, manager }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn manager(&self) -> &ModelManager {
        &self.manager
    }

    /// Installs the server's body and runs one round of local training.
    pub fn fit(&mut self, body: &[ArrayD<f32>]) -> Result<FitResult> {
        self.install_body(body)?;

        let metrics = self.manager.train().map_err(|source| SimError::Client {
            client_id: self.id,
            source,
        })?;

        Ok(FitResult {
            body: self
                .manager
                .model()
                .body_state_dict()
                .into_iter()
                .map(|(_, value)| value)
                .collect(),
            num_examples: self.manager.train_dataset_size(),
            metrics,
        })
    }

    /// Installs the server's body and evaluates the personalized model.
    pub fn evaluate(&mut self, body: &[ArrayD<f32>]) -> Result<EvalResult> {
        self.install_body(body)?;

        let metrics = self.manager.test().map_err(|source| SimError::Client {
            client_id: self.id,
            source,
        })?;

        Ok(EvalResult {
            num_examples: self.manager.test_dataset_size(),
            metrics,
        })
    }

    /// Replaces the local body wholesale with the aggregated tensors,
    /// aligning them positionally with the model's body keys.
    fn install_body(&mut self, body: &[ArrayD<f32>]) -> Result<()> {
        let keys = self.manager.model().body_keys();
        if keys.len() != body.len() {
            return Err(SimError::Aggregation {
                detail: "body tensor count disagrees with the client model",
            });
        }

        let named: Vec<(String, ArrayD<f32>)> =
            keys.into_iter().zip(body.iter().cloned()).collect();

        self.manager
            .model_mut()
            .load_body_state(&named)
            .map_err(|source| SimError::Client {
                client_id: self.id,
                source,
            })
    }
}
