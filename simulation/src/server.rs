use log::info;
use ndarray::ArrayD;

use crate::client::Client;
use crate::error::Result;
use crate::history::{History, RoundMetrics};
use crate::strategy::aggregate_body;

/// Drives federated rounds over an owned set of clients.
///
/// Clients run strictly one after another within a round; each manager is
/// only ever touched by this loop, which is what upholds the one-actor-per-
/// manager contract.
pub struct Server {
    clients: Vec<Client>,
    body: Vec<ArrayD<f32>>,
    history: History,
}

impl Server {
    /// Creates a new server.
    ///
    /// # Arguments
    /// * `clients` - The participating clients.
    /// * `initial_body` - Body tensors of a freshly initialized model, the
    ///   starting point every client receives in round one.
    pub fn new(clients: Vec<Client>, initial_body: Vec<ArrayD<f32>>) -> Self {
        Self {
            clients,
            body: initial_body,
            history: History::new(),
        }
    }

    #[inline]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[inline]
    pub fn body(&self) -> &[ArrayD<f32>] {
        &self.body
    }

    /// Runs `num_rounds` communication rounds.
    ///
    /// Each round dispatches `fit` to every client, aggregates the returned
    /// bodies by train-set size, then dispatches `evaluate` against the new
    /// body and records the weighted-mean metrics.
    pub fn run(&mut self, num_rounds: usize) -> Result<&History> {
        for round in 1..=num_rounds {
            let mut updates = Vec::with_capacity(self.clients.len());
            let mut train_metrics = Vec::with_capacity(self.clients.len());

            for client in &mut self.clients {
                let fit = client.fit(&self.body)?;
                train_metrics.push((fit.num_examples, fit.metrics));
                updates.push((fit.body, fit.num_examples));
            }

            self.body = aggregate_body(&updates)?;

            let mut eval_metrics = Vec::with_capacity(self.clients.len());
            for client in &mut self.clients {
                let eval = client.evaluate(&self.body)?;
                eval_metrics.push((eval.num_examples, eval.metrics));
            }

            let (train_loss, train_accuracy) = weighted_mean(&train_metrics);
            let (test_loss, test_accuracy) = weighted_mean(&eval_metrics);

            let metrics = RoundMetrics {
                round,
                train_loss,
                train_accuracy,
                test_loss,
                test_accuracy,
            };
            info!(round = round; "{metrics}");
            self.history.push(metrics);
        }

        Ok(&self.history)
    }
}

/// Example-weighted mean of `(loss, accuracy)` pairs.
fn weighted_mean(metrics: &[(usize, fedrep::Metrics)]) -> (f32, f32) {
    let total: usize = metrics.iter().map(|(n, _)| n).sum();
    if total == 0 {
        return (0.0, 0.0);
    }

    let mut loss = 0.0;
    let mut accuracy = 0.0;
    for (n, m) in metrics {
        let w = *n as f32 / total as f32;
        loss += w * m.loss;
        accuracy += w * m.accuracy;
    }
    (loss, accuracy)
}
