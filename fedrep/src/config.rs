use serde::Deserialize;

use crate::constants::{
    DEFAULT_FINETUNE_EPOCHS, DEFAULT_LOCAL_TRAIN_EPOCHS, DEFAULT_REPRESENTATION_EPOCHS,
};

/// Per-client training knobs as delivered by the orchestrator.
///
/// Every field may be absent; absent fields resolve to the named defaults in
/// [`crate::constants`] exactly once, at manager construction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    pub num_local_epochs: Option<usize>,
    pub num_rep_epochs: Option<usize>,
    pub num_finetune_epochs: Option<usize>,
}

impl ClientConfig {
    /// Resolves the configuration into a concrete epoch schedule.
    pub fn schedule(&self) -> EpochSchedule {
        EpochSchedule {
            local: self.num_local_epochs.unwrap_or(DEFAULT_LOCAL_TRAIN_EPOCHS),
            rep: self.num_rep_epochs.unwrap_or(DEFAULT_REPRESENTATION_EPOCHS),
            finetune: self.num_finetune_epochs.unwrap_or(DEFAULT_FINETUNE_EPOCHS),
        }
    }
}

/// Resolved epoch counts for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochSchedule {
    /// Head-phase epochs per round.
    pub local: usize,
    /// Representation-phase epochs per round.
    pub rep: usize,
    /// Full-model fine-tuning epochs before evaluation.
    pub finetune: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_resolve_to_defaults() {
        let schedule = ClientConfig::default().schedule();
        assert_eq!(schedule.local, DEFAULT_LOCAL_TRAIN_EPOCHS);
        assert_eq!(schedule.rep, DEFAULT_REPRESENTATION_EPOCHS);
        assert_eq!(schedule.finetune, DEFAULT_FINETUNE_EPOCHS);
    }

    #[test]
    fn present_fields_win_over_defaults() {
        let config = ClientConfig {
            num_local_epochs: Some(2),
            num_rep_epochs: Some(3),
            num_finetune_epochs: Some(0),
        };
        assert_eq!(
            config.schedule(),
            EpochSchedule {
                local: 2,
                rep: 3,
                finetune: 0
            }
        );
    }
}
