use ndarray::{Array2, ArrayD, ArrayView2};

use crate::error::{MlError, Result};
use crate::layers::Dense;
use crate::optimizer::ParamUpdate;

/// A sequential model: information flows forward when computing an output and
/// backward when computing the deltas of its layers.
///
/// Parameters are addressed by key, `"{layer_index}.weight"` and
/// `"{layer_index}.bias"`, in structural order.
#[derive(Clone)]
pub struct Sequential {
    layers: Vec<Dense>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Dense>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    #[inline]
    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    /// Total number of parameter tensors across all layers.
    pub fn num_tensors(&self) -> usize {
        self.layers.len() * 2
    }

    /// Splits the model at a layer boundary.
    ///
    /// # Arguments
    /// * `index` - First layer of the second half. Must be `<= len()`.
    ///
    /// # Returns
    /// The `[0, index)` and `[index, len)` halves. Layers are renumbered from
    /// zero within each half.
    pub fn split_at(mut self, index: usize) -> (Sequential, Sequential) {
        assert!(index <= self.layers.len(), "split index out of bounds");
        let tail = self.layers.split_off(index);
        (Sequential { layers: self.layers }, Sequential { layers: tail })
    }

    /// Toggles optimization eligibility for every layer.
    ///
    /// Forward and backward computation are unaffected; only the optimizer's
    /// visit set changes.
    pub fn set_trainable(&mut self, trainable: bool) {
        for layer in &mut self.layers {
            layer.set_trainable(trainable);
        }
    }

    /// Makes a forward pass through all layers.
    ///
    /// # Arguments
    /// * `x` - Input batch of shape `(batch, input_dim)`.
    pub fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        let mut out = x.to_owned();
        for layer in &mut self.layers {
            out = layer.forward(out.view());
        }
        out
    }

    /// Backpropagates a delta through all layers, last to first.
    ///
    /// # Arguments
    /// * `delta` - Delta with respect to the model output.
    ///
    /// # Returns
    /// The delta with respect to the model input.
    pub fn backward(&mut self, mut delta: Array2<f32>) -> Array2<f32> {
        for layer in self.layers.iter_mut().rev() {
            delta = layer.backward(delta);
        }
        delta
    }

    /// Returns every parameter key in structural order.
    pub fn keys(&self) -> Vec<String> {
        (0..self.layers.len())
            .flat_map(|i| [format!("{i}.weight"), format!("{i}.bias")])
            .collect()
    }

    /// Returns the named parameter tensors in structural order.
    pub fn state_dict(&self) -> Vec<(String, ArrayD<f32>)> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| {
                layer
                    .state()
                    .into_iter()
                    .map(move |(name, value)| (format!("{i}.{name}"), value))
            })
            .collect()
    }

    /// Merges a named parameter state into this model.
    ///
    /// With `strict` set, the provided state must match the existing keys one
    /// to one: any missing or unknown key is an error. Without it, unmatched
    /// keys are skipped and matched keys are overwritten. Shape conflicts on
    /// matched keys always fail.
    pub fn load_state_dict(&mut self, state: &[(String, ArrayD<f32>)], strict: bool) -> Result<()> {
        if strict {
            for key in self.keys() {
                if !state.iter().any(|(k, _)| *k == key) {
                    return Err(MlError::MissingKey { key });
                }
            }
        }

        for (key, value) in state {
            match self.locate(key) {
                Some((index, name)) => self.layers[index].set_param(name, key, value)?,
                None if strict => {
                    return Err(MlError::UnknownKey { key: key.clone() });
                }
                None => {}
            }
        }

        Ok(())
    }

    /// Schedules the parameters of every trainable layer for an optimizer
    /// step, with keys prefixed by `prefix`.
    pub fn param_updates(&mut self, prefix: &str) -> Vec<ParamUpdate<'_>> {
        self.layers
            .iter_mut()
            .enumerate()
            .filter(|(_, layer)| layer.trainable())
            .flat_map(|(i, layer)| layer.param_updates(&format!("{prefix}.{i}")))
            .collect()
    }

    /// Resolves a key like `"1.weight"` to a layer index and parameter name.
    fn locate<'a>(&self, key: &'a str) -> Option<(usize, &'a str)> {
        let (index, name) = key.split_once('.')?;
        let index: usize = index.parse().ok()?;
        if index >= self.layers.len() || !matches!(name, "weight" | "bias") {
            return None;
        }
        Some((index, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_layer() -> Sequential {
        Sequential::new([
            Dense::new(array![[1.0, 0.0], [0.0, 1.0]], array![0.0, 0.0], None).unwrap(),
            Dense::new(array![[2.0], [3.0]], array![0.5], None).unwrap(),
        ])
    }

    #[test]
    fn forward_composes_layers() {
        let mut model = two_layer();
        let out = model.forward(array![[1.0, 1.0]].view());
        assert_eq!(out, array![[5.5]]);
    }

    #[test]
    fn state_dict_keys_follow_structural_order() {
        let model = two_layer();
        let keys: Vec<String> = model.state_dict().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["0.weight", "0.bias", "1.weight", "1.bias"]);
    }

    #[test]
    fn state_dict_round_trips() {
        let mut model = two_layer();
        let state = model.state_dict();
        model.load_state_dict(&state, true).unwrap();
        assert_eq!(model.state_dict(), state);
    }

    #[test]
    fn strict_load_rejects_missing_key() {
        let mut model = two_layer();
        let mut state = model.state_dict();
        state.pop();
        assert!(matches!(
            model.load_state_dict(&state, true),
            Err(MlError::MissingKey { .. })
        ));
    }

    #[test]
    fn strict_load_rejects_unknown_key() {
        let mut model = two_layer();
        let mut state = model.state_dict();
        state.push(("9.weight".to_string(), array![[1.0]].into_dyn()));
        assert!(matches!(
            model.load_state_dict(&state, true),
            Err(MlError::UnknownKey { .. })
        ));
    }

    #[test]
    fn permissive_load_skips_unknown_but_rejects_bad_shape() {
        let mut model = two_layer();

        let unknown = vec![("9.weight".to_string(), array![[1.0]].into_dyn())];
        model.load_state_dict(&unknown, false).unwrap();

        let bad_shape = vec![("0.weight".to_string(), array![[1.0]].into_dyn())];
        assert!(matches!(
            model.load_state_dict(&bad_shape, false),
            Err(MlError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn split_at_partitions_layers() {
        let (body, head) = two_layer().split_at(1);
        assert_eq!(body.len(), 1);
        assert_eq!(head.len(), 1);
        assert_eq!(head.keys(), ["0.weight", "0.bias"]);
    }

    #[test]
    fn param_updates_skip_frozen_layers() {
        let mut model = two_layer();
        model.set_trainable(false);
        assert!(model.param_updates("m").is_empty());

        model.set_trainable(true);
        let keys: Vec<String> = model
            .param_updates("m")
            .into_iter()
            .map(|p| p.key)
            .collect();
        assert_eq!(keys, ["m.0.weight", "m.0.bias", "m.1.weight", "m.1.bias"]);
    }
}
