use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, Axis, Ix1, Ix2};

use crate::activations::ActFn;
use crate::error::{MlError, Result};
use crate::optimizer::ParamUpdate;

/// A fully connected layer over row-major batches (rows are samples).
///
/// The layer owns its parameters and their gradient buffers. `forward` caches
/// the input and pre-activation needed by `backward`; `backward` always
/// propagates the input delta so that gradients keep flowing to earlier layers
/// even when this layer itself is frozen. `trainable` only gates whether the
/// optimizer visits this layer's parameters.
#[derive(Clone)]
pub struct Dense {
    dim: (usize, usize),
    weights: Array2<f32>,
    biases: Array1<f32>,
    act_fn: Option<ActFn>,
    trainable: bool,

    // Forward caches
    x: Array2<f32>,
    z: Array2<f32>,

    // Gradient buffers, rewritten on every backward pass
    grad_w: Array2<f32>,
    grad_b: Array1<f32>,
}

impl Dense {
    /// Creates a new `Dense` from explicit parameter tensors.
    ///
    /// # Arguments
    /// * `weights` - Weight matrix of shape `(fan_in, fan_out)`.
    /// * `biases` - Bias vector of length `fan_out`.
    /// * `act_fn` - Optional elementwise activation applied after the affine map.
    ///
    /// # Returns
    /// An error if `biases` does not match the weight matrix's output dimension.
    pub fn new(weights: Array2<f32>, biases: Array1<f32>, act_fn: Option<ActFn>) -> Result<Self> {
        let dim = weights.dim();
        if biases.len() != dim.1 {
            return Err(MlError::ShapeMismatch {
                key: "bias".to_string(),
                got: vec![biases.len()],
                expected: vec![dim.1],
            });
        }

        Ok(Self {
            dim,
            weights,
            biases,
            act_fn,
            trainable: true,
            x: Array2::zeros((0, 0)),
            z: Array2::zeros((0, 0)),
            grad_w: Array2::zeros(dim),
            grad_b: Array1::zeros(dim.1),
        })
    }

    /// Returns the `(fan_in, fan_out)` dimensions of this layer.
    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    #[inline]
    pub fn trainable(&self) -> bool {
        self.trainable
    }

    #[inline]
    pub fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }

    #[inline]
    pub fn weights(&self) -> ArrayView2<'_, f32> {
        self.weights.view()
    }

    #[inline]
    pub fn biases(&self) -> ArrayView1<'_, f32> {
        self.biases.view()
    }

    /// Makes a forward pass, caching what the backward pass needs.
    ///
    /// # Arguments
    /// * `x` - Input batch of shape `(batch, fan_in)`.
    ///
    /// # Returns
    /// The layer output of shape `(batch, fan_out)`.
    pub fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        let z = x.dot(&self.weights) + &self.biases;
        self.x = x.to_owned();

        let out = match &self.act_fn {
            Some(act_fn) => z.mapv(|v| act_fn.f(v)),
            None => z.clone(),
        };
        self.z = z;
        out
    }

    /// Backpropagates a delta through this layer.
    ///
    /// Writes the parameter gradient buffers and returns the delta with
    /// respect to the layer input.
    ///
    /// # Arguments
    /// * `delta` - Delta with respect to the layer output, `(batch, fan_out)`.
    pub fn backward(&mut self, mut delta: Array2<f32>) -> Array2<f32> {
        if let Some(act_fn) = &self.act_fn {
            delta.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        self.grad_w = self.x.t().dot(&delta);
        self.grad_b = delta.sum_axis(Axis(0));

        delta.dot(&self.weights.t())
    }

    /// Returns this layer's named parameter tensors in structural order.
    pub fn state(&self) -> [(&'static str, ArrayD<f32>); 2] {
        [
            ("weight", self.weights.clone().into_dyn()),
            ("bias", self.biases.clone().into_dyn()),
        ]
    }

    /// Replaces one parameter tensor, validating its shape.
    ///
    /// # Arguments
    /// * `name` - Local parameter name, `"weight"` or `"bias"`.
    /// * `key` - Full key reported on error.
    /// * `value` - Replacement tensor.
    pub fn set_param(&mut self, name: &str, key: &str, value: &ArrayD<f32>) -> Result<()> {
        match name {
            "weight" => {
                let expected = [self.dim.0, self.dim.1];
                if value.shape() != expected {
                    return Err(MlError::ShapeMismatch {
                        key: key.to_string(),
                        got: value.shape().to_vec(),
                        expected: expected.to_vec(),
                    });
                }
                self.weights = value
                    .as_standard_layout()
                    .into_owned()
                    .into_dimensionality::<Ix2>()
                    .unwrap();
            }
            "bias" => {
                if value.shape() != [self.dim.1] {
                    return Err(MlError::ShapeMismatch {
                        key: key.to_string(),
                        got: value.shape().to_vec(),
                        expected: vec![self.dim.1],
                    });
                }
                self.biases = value
                    .as_standard_layout()
                    .into_owned()
                    .into_dimensionality::<Ix1>()
                    .unwrap();
            }
            _ => {
                return Err(MlError::UnknownKey {
                    key: key.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Schedules this layer's parameters for an optimizer step.
    ///
    /// # Arguments
    /// * `key_base` - Key prefix identifying this layer (e.g. `"body.0"`).
    pub fn param_updates(&mut self, key_base: &str) -> [ParamUpdate<'_>; 2] {
        [
            ParamUpdate {
                key: format!("{key_base}.weight"),
                value: self.weights.as_slice_mut().unwrap(),
                grad: self.grad_w.as_slice().unwrap(),
            },
            ParamUpdate {
                key: format!("{key_base}.bias"),
                value: self.biases.as_slice_mut().unwrap(),
                grad: self.grad_b.as_slice().unwrap(),
            },
        ]
    }
}
