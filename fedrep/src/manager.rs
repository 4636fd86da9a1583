use std::path::PathBuf;

use log::debug;

use ml_core::{CrossEntropy, Sgd, num_correct};

use crate::config::{ClientConfig, EpochSchedule};
use crate::constants::MOMENTUM;
use crate::data::DataLoader;
use crate::error::{FedRepError, Result};
use crate::model::SplitModel;
use crate::state;

/// Aggregate loss/accuracy of one `train` or `test` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub loss: f32,
    pub accuracy: f32,
}

/// Drives the two-phase local training procedure and the evaluation procedure
/// for one client.
///
/// An instance is owned by exactly one client-actor; the orchestrator never
/// invokes `train`/`test` concurrently on it. The only I/O inside a round is
/// the head-state read at the start of `train`/`test` and the unconditional
/// head-state write at the end of `train`.
pub struct ModelManager {
    client_id: usize,
    model: SplitModel,
    trainloader: DataLoader,
    testloader: DataLoader,
    state_path: Option<PathBuf>,
    learning_rate: f32,
    schedule: EpochSchedule,
}

impl ModelManager {
    /// Creates a new manager for one client.
    ///
    /// # Arguments
    /// * `client_id` - Identifier used for observability and state files.
    /// * `config` - Optional training knobs; absent fields resolve to named
    ///   defaults here, once.
    /// * `model` - The client's body/head model.
    /// * `trainloader` / `testloader` - Injected by the dataset partitioner.
    /// * `state_path` - Where the head survives between rounds. `None`
    ///   disables persistence.
    /// * `learning_rate` - Step size for every optimizer this manager builds.
    pub fn new(
        client_id: usize,
        config: &ClientConfig,
        model: SplitModel,
        trainloader: DataLoader,
        testloader: DataLoader,
        state_path: Option<PathBuf>,
        learning_rate: f32,
    ) -> Self {
        Self {
            client_id,
            model,
            trainloader,
            testloader,
            state_path,
            learning_rate,
            schedule: config.schedule(),
        }
    }

    #[inline]
    pub fn client_id(&self) -> usize {
        self.client_id
    }

    #[inline]
    pub fn model(&self) -> &SplitModel {
        &self.model
    }

    #[inline]
    pub fn model_mut(&mut self) -> &mut SplitModel {
        &mut self.model
    }

    /// Runs one round of local training.
    ///
    /// Phase A freezes the body and trains the head for `local` epochs; phase
    /// B freezes the head and trains the body for `rep` epochs. Both phases
    /// share one optimizer instance, so momentum buffers carry across the
    /// toggle while gradient flow is gated purely by the enable/disable
    /// switches. The head is reloaded from the client's state file before
    /// phase A (when present) and persisted after phase B.
    ///
    /// # Returns
    /// Final-batch loss and running accuracy over all minibatches of both
    /// phases, or an error if the training set is empty.
    pub fn train(&mut self) -> Result<Metrics> {
        if self.trainloader.dataset_size() == 0 {
            return Err(FedRepError::EmptyDataset { split: "train" });
        }

        self.load_head_if_persisted()?;

        let EpochSchedule { local, rep, .. } = self.schedule;
        let criterion = CrossEntropy;
        let mut optimizer = Sgd::new(self.learning_rate, MOMENTUM);

        let (mut correct, mut total) = (0usize, 0usize);
        let mut loss = 0.0f32;

        for epoch in 0..local + rep {
            if epoch < local {
                self.model.disable_body();
                self.model.enable_head();
            } else {
                self.model.enable_body();
                self.model.disable_head();
            }

            for batch in self.trainloader.epoch() {
                let logits = self.model.forward(batch.features.view());
                loss = criterion.loss(logits.view(), &batch.labels);

                let delta = criterion.delta(logits.view(), &batch.labels);
                self.model.backward(delta);
                optimizer.step(self.model.param_updates());

                correct += num_correct(logits.view(), &batch.labels);
                total += batch.len();
            }
        }

        if let Some(path) = &self.state_path {
            state::save_state_dict(path, &self.model.head_state_dict())?;
            debug!(client_id = self.client_id; "persisted head state");
        }

        let accuracy = if total == 0 {
            0.0
        } else {
            correct as f32 / total as f32
        };
        Ok(Metrics { loss, accuracy })
    }

    /// Evaluates the personalized model on the test set.
    ///
    /// Reloads the persisted head first (when present). If the schedule asks
    /// for fine-tuning, the whole model trains on the local training set with
    /// a fresh momentum-free optimizer before measuring, adapting to the body
    /// that just arrived from the server. Evaluation itself computes no
    /// gradients and mutates no parameter.
    ///
    /// # Returns
    /// Mean loss (per-batch loss sum divided by test dataset size) and
    /// accuracy, or an error if the test set is empty.
    pub fn test(&mut self) -> Result<Metrics> {
        if self.testloader.dataset_size() == 0 {
            return Err(FedRepError::EmptyDataset { split: "test" });
        }

        self.load_head_if_persisted()?;

        let criterion = CrossEntropy;

        if self.schedule.finetune > 0 {
            let mut optimizer = Sgd::new(self.learning_rate, 0.0);
            self.model.enable_body();
            self.model.enable_head();

            for _ in 0..self.schedule.finetune {
                for batch in self.trainloader.epoch() {
                    let logits = self.model.forward(batch.features.view());
                    let delta = criterion.delta(logits.view(), &batch.labels);
                    self.model.backward(delta);
                    optimizer.step(self.model.param_updates());
                }
            }
        }

        let (mut correct, mut total) = (0usize, 0usize);
        let mut loss_sum = 0.0f32;

        for batch in self.testloader.epoch() {
            let logits = self.model.forward(batch.features.view());
            loss_sum += criterion.loss(logits.view(), &batch.labels);
            correct += num_correct(logits.view(), &batch.labels);
            total += batch.len();
        }

        Ok(Metrics {
            loss: loss_sum / self.testloader.dataset_size() as f32,
            accuracy: correct as f32 / total as f32,
        })
    }

    /// Train example count, used by the orchestrator for weighted aggregation.
    pub fn train_dataset_size(&self) -> usize {
        self.trainloader.dataset_size()
    }

    /// Test example count.
    pub fn test_dataset_size(&self) -> usize {
        self.testloader.dataset_size()
    }

    /// Combined example count.
    pub fn total_dataset_size(&self) -> usize {
        self.train_dataset_size() + self.test_dataset_size()
    }

    /// Loads the persisted head into the model if a state file exists.
    ///
    /// Absence of the file means first participation and is skipped silently.
    fn load_head_if_persisted(&mut self) -> Result<()> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        if !path.is_file() {
            return Ok(());
        }

        let head = state::load_state_dict(path)?;
        self.model.load_head_state(&head)?;
        debug!(client_id = self.client_id; "loaded persisted head state");
        Ok(())
    }
}
