use std::collections::HashMap;

/// A single parameter tensor scheduled for an optimizer step.
///
/// `key` identifies the tensor across steps so that per-parameter optimizer
/// state (momentum buffers) can survive between calls.
pub struct ParamUpdate<'a> {
    pub key: String,
    pub value: &'a mut [f32],
    pub grad: &'a [f32],
}

/// Minibatch SGD with optional momentum.
///
/// Velocity buffers are created lazily the first time a parameter is visited
/// and are keyed by parameter name, so they survive freeze/unfreeze toggles:
/// a parameter that stops being visited keeps its buffer untouched until it
/// is visited again within the lifetime of this instance.
pub struct Sgd {
    learning_rate: f32,
    momentum: f32,
    velocity: HashMap<String, Vec<f32>>,
}

impl Sgd {
    /// Creates a new `Sgd` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of
    ///   training per update.
    /// * `momentum` - Momentum coefficient; `0.0` disables velocity tracking.
    pub fn new(learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: HashMap::new(),
        }
    }

    /// Applies one update to every scheduled parameter.
    ///
    /// With momentum: `v = mu * v + g; p -= lr * v`. Without: `p -= lr * g`.
    pub fn step<'a, I>(&mut self, params: I)
    where
        I: IntoIterator<Item = ParamUpdate<'a>>,
    {
        let lr = self.learning_rate;
        let mu = self.momentum;

        for param in params {
            if mu == 0.0 {
                for (p, g) in param.value.iter_mut().zip(param.grad) {
                    *p -= lr * g;
                }
                continue;
            }

            let velocity = self
                .velocity
                .entry(param.key)
                .or_insert_with(|| vec![0.0; param.grad.len()]);

            for ((p, g), v) in param.value.iter_mut().zip(param.grad).zip(velocity) {
                *v = (mu * *v) + g;
                *p -= lr * *v;
            }
        }
    }

    /// Returns the velocity buffer tracked for `key`, if any.
    pub fn velocity(&self, key: &str) -> Option<&[f32]> {
        self.velocity.get(key).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update<'a>(value: &'a mut [f32], grad: &'a [f32]) -> ParamUpdate<'a> {
        ParamUpdate {
            key: "w".to_string(),
            value,
            grad,
        }
    }

    #[test]
    fn plain_sgd_steps_against_gradient() {
        let mut sgd = Sgd::new(0.1, 0.0);
        let mut w = [1.0, -1.0];
        sgd.step([update(&mut w, &[1.0, -2.0])]);
        assert_eq!(w, [0.9, -0.8]);
        assert!(sgd.velocity("w").is_none());
    }

    #[test]
    fn momentum_accumulates_velocity_across_steps() {
        let mut sgd = Sgd::new(1.0, 0.5);
        let mut w = [0.0];

        sgd.step([update(&mut w, &[1.0])]);
        // v = 1.0, w = -1.0
        assert_eq!(w, [-1.0]);

        sgd.step([update(&mut w, &[1.0])]);
        // v = 0.5 * 1.0 + 1.0 = 1.5, w = -2.5
        assert_eq!(w, [-2.5]);
        assert_eq!(sgd.velocity("w").unwrap(), [1.5]);
    }

    #[test]
    fn velocity_survives_steps_that_skip_the_parameter() {
        let mut sgd = Sgd::new(1.0, 0.5);
        let mut w = [0.0];
        sgd.step([update(&mut w, &[1.0])]);

        // The parameter is frozen for a step: nothing scheduled.
        sgd.step(Vec::new());

        assert_eq!(sgd.velocity("w").unwrap(), [1.0]);
    }
}
