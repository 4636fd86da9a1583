use ndarray::{Array2, ArrayD, ArrayView2};

use ml_core::{ParamUpdate, Sequential};

use crate::error::{FedRepError, Result};

/// Partitions a constructed model into a representation body and a classifier
/// head.
///
/// Implementations must cover every layer exactly once: the union of body and
/// head parameters is the whole model, their intersection is empty. The
/// concrete splitter is selected by configuration (see
/// [`crate::model::SplitSpec`]), one per model architecture.
pub trait Splitter {
    fn split(&self, model: Sequential) -> Result<(Sequential, Sequential)>;
}

/// Head = the final layer, body = everything before it.
pub struct LastLayerSplitter;

impl Splitter for LastLayerSplitter {
    fn split(&self, model: Sequential) -> Result<(Sequential, Sequential)> {
        if model.len() < 2 {
            return Err(FedRepError::InvalidSplit {
                detail: "model needs at least two layers",
            });
        }
        let at = model.len() - 1;
        Ok(model.split_at(at))
    }
}

/// Head = the final `head_layers` layers.
pub struct HeadLayersSplitter {
    head_layers: usize,
}

impl HeadLayersSplitter {
    pub fn new(head_layers: usize) -> Self {
        Self { head_layers }
    }
}

impl Splitter for HeadLayersSplitter {
    fn split(&self, model: Sequential) -> Result<(Sequential, Sequential)> {
        if self.head_layers == 0 || self.head_layers >= model.len() {
            return Err(FedRepError::InvalidSplit {
                detail: "head must keep at least one layer on each side",
            });
        }
        let at = model.len() - self.head_layers;
        Ok(model.split_at(at))
    }
}

/// A model decomposed into a shared body and a personalized head.
///
/// The body is what the orchestrator aggregates across clients; the head
/// never leaves the client. Gradient eligibility is toggled per sub-module so
/// the two-phase local protocol can alternate which half trains.
pub struct SplitModel {
    body: Sequential,
    head: Sequential,
}

impl SplitModel {
    /// Splits a constructed model with the given splitter.
    pub fn new(model: Sequential, splitter: &dyn Splitter) -> Result<Self> {
        let (body, head) = splitter.split(model)?;
        Ok(Self { body, head })
    }

    #[inline]
    pub fn body(&self) -> &Sequential {
        &self.body
    }

    #[inline]
    pub fn head(&self) -> &Sequential {
        &self.head
    }

    /// Forwards inputs through the body and then the head.
    pub fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        let hidden = self.body.forward(x);
        self.head.forward(hidden.view())
    }

    /// Backpropagates a delta through the head and then the body.
    ///
    /// Both sub-modules always participate so body gradients exist even while
    /// the head is frozen, and vice versa.
    pub fn backward(&mut self, delta: Array2<f32>) -> Array2<f32> {
        let delta = self.head.backward(delta);
        self.body.backward(delta)
    }

    /// Returns all parameter tensors, body first then head, in structural
    /// order. Consumers align positionally with [`SplitModel::keys`].
    pub fn get_parameters(&self) -> Vec<ArrayD<f32>> {
        self.body
            .state_dict()
            .into_iter()
            .chain(self.head.state_dict())
            .map(|(_, value)| value)
            .collect()
    }

    /// Returns the full prefixed key sequence, aligned with
    /// [`SplitModel::get_parameters`].
    pub fn keys(&self) -> Vec<String> {
        self.body
            .keys()
            .into_iter()
            .map(|k| format!("body.{k}"))
            .chain(self.head.keys().into_iter().map(|k| format!("head.{k}")))
            .collect()
    }

    /// Body-local parameter keys, aligned with the body half of
    /// [`SplitModel::get_parameters`].
    pub fn body_keys(&self) -> Vec<String> {
        self.body.keys()
    }

    /// Merges a prefixed parameter state (`body.*` / `head.*`) into the whole
    /// model. The merge is permissive: unmatched keys are skipped, matched
    /// keys are overwritten, and shape conflicts on matched keys fail.
    pub fn set_parameters(&mut self, state: &[(String, ArrayD<f32>)]) -> Result<()> {
        let mut body_state = Vec::new();
        let mut head_state = Vec::new();

        for (key, value) in state {
            if let Some(rest) = key.strip_prefix("body.") {
                body_state.push((rest.to_string(), value.clone()));
            } else if let Some(rest) = key.strip_prefix("head.") {
                head_state.push((rest.to_string(), value.clone()));
            }
        }

        self.body.load_state_dict(&body_state, false)?;
        self.head.load_state_dict(&head_state, false)?;
        Ok(())
    }

    /// Replaces the body wholesale from a body-local state dict.
    ///
    /// The merge is strict: any missing or unknown key is an error.
    pub fn load_body_state(&mut self, state: &[(String, ArrayD<f32>)]) -> Result<()> {
        self.body.load_state_dict(state, true)?;
        Ok(())
    }

    /// Replaces the head wholesale from a head-local state dict.
    ///
    /// The merge is strict: any missing or unknown key is an error.
    pub fn load_head_state(&mut self, state: &[(String, ArrayD<f32>)]) -> Result<()> {
        self.head.load_state_dict(state, true)?;
        Ok(())
    }

    /// Body-local state dict (what the orchestrator aggregates).
    pub fn body_state_dict(&self) -> Vec<(String, ArrayD<f32>)> {
        self.body.state_dict()
    }

    /// Head-local state dict (what gets persisted per client).
    pub fn head_state_dict(&self) -> Vec<(String, ArrayD<f32>)> {
        self.head.state_dict()
    }

    pub fn enable_head(&mut self) {
        self.head.set_trainable(true);
    }

    pub fn disable_head(&mut self) {
        self.head.set_trainable(false);
    }

    pub fn enable_body(&mut self) {
        self.body.set_trainable(true);
    }

    pub fn disable_body(&mut self) {
        self.body.set_trainable(false);
    }

    /// Schedules the parameters of every trainable layer for an optimizer
    /// step, body first then head.
    pub fn param_updates(&mut self) -> Vec<ParamUpdate<'_>> {
        let mut updates = self.body.param_updates("body");
        updates.extend(self.head.param_updates("head"));
        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_core::{CrossEntropy, Sgd, init};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn model(hidden: &[usize]) -> Sequential {
        let mut rng = StdRng::seed_from_u64(3);
        init::mlp(&mut rng, 4, hidden, 3).unwrap()
    }

    fn split(hidden: &[usize]) -> SplitModel {
        SplitModel::new(model(hidden), &LastLayerSplitter).unwrap()
    }

    #[test]
    fn last_layer_splitter_partitions_all_parameters() {
        let full_tensors = model(&[8, 8]).num_tensors();
        let split = split(&[8, 8]);
        assert_eq!(
            split.body().num_tensors() + split.head().num_tensors(),
            full_tensors
        );
        assert_eq!(split.head().len(), 1);
    }

    #[test]
    fn prefixed_keys_are_disjoint_and_cover_the_model() {
        let split = split(&[8]);
        let keys = split.keys();
        assert_eq!(keys.len(), split.get_parameters().len());

        let body = keys.iter().filter(|k| k.starts_with("body.")).count();
        let head = keys.iter().filter(|k| k.starts_with("head.")).count();
        assert_eq!(body + head, keys.len());
        assert!(body > 0 && head > 0);
    }

    #[test]
    fn head_layers_splitter_rejects_degenerate_partitions() {
        assert!(SplitModel::new(model(&[8]), &HeadLayersSplitter::new(0)).is_err());
        assert!(SplitModel::new(model(&[8]), &HeadLayersSplitter::new(2)).is_err());
        assert!(SplitModel::new(model(&[8]), &HeadLayersSplitter::new(1)).is_ok());
    }

    #[test]
    fn single_layer_model_cannot_be_split() {
        let mut rng = StdRng::seed_from_u64(3);
        let one = init::mlp(&mut rng, 4, &[], 3).unwrap();
        assert!(matches!(
            SplitModel::new(one, &LastLayerSplitter),
            Err(FedRepError::InvalidSplit { .. })
        ));
    }

    #[test]
    fn get_set_parameters_round_trips() {
        let mut split = split(&[8]);
        let params = split.get_parameters();
        let named: Vec<(String, ArrayD<f32>)> =
            split.keys().into_iter().zip(params.clone()).collect();

        split.set_parameters(&named).unwrap();
        assert_eq!(split.get_parameters(), params);
    }

    #[test]
    fn set_parameters_ignores_foreign_keys() {
        let mut split = split(&[8]);
        let before = split.get_parameters();
        let foreign = vec![(
            "optimizer.momentum".to_string(),
            ndarray::array![1.0].into_dyn(),
        )];
        split.set_parameters(&foreign).unwrap();
        assert_eq!(split.get_parameters(), before);
    }

    #[test]
    fn strict_head_load_rejects_partial_state() {
        let mut split = split(&[8]);
        let mut state = split.head_state_dict();
        state.pop();
        assert!(split.load_head_state(&state).is_err());
    }

    #[test]
    fn only_enabled_submodule_gets_optimized() {
        let mut split = split(&[8]);
        split.enable_head();
        split.disable_body();

        let body_before = split.body_state_dict();
        let head_before = split.head_state_dict();

        let x = ndarray::Array2::from_shape_fn((6, 4), |(i, j)| (i + j) as f32 * 0.1);
        let labels = vec![0, 1, 2, 0, 1, 2];
        let criterion = CrossEntropy;
        let mut optimizer = Sgd::new(0.1, 0.5);

        let logits = split.forward(x.view());
        let delta = criterion.delta(logits.view(), &labels);
        split.backward(delta);
        optimizer.step(split.param_updates());

        assert_eq!(split.body_state_dict(), body_before);
        assert_ne!(split.head_state_dict(), head_before);
    }
}
