//! Named fallbacks used when the client configuration leaves a field unset.

/// Head-phase epochs per round.
pub const DEFAULT_LOCAL_TRAIN_EPOCHS: usize = 5;

/// Representation-phase epochs per round.
pub const DEFAULT_REPRESENTATION_EPOCHS: usize = 1;

/// Full-model fine-tuning epochs before evaluation.
pub const DEFAULT_FINETUNE_EPOCHS: usize = 5;

/// Momentum used by the two-phase local optimizer.
pub const MOMENTUM: f32 = 0.5;
