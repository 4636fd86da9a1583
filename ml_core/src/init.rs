use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::activations::ActFn;
use crate::error::{MlError, Result};
use crate::layers::Dense;
use crate::sequential::Sequential;

/// Creates a dense layer with uniform fan-in initialization,
/// `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`.
///
/// # Arguments
/// * `rng` - A random number generator.
/// * `fan_in` - The number of input units.
/// * `fan_out` - The number of output units.
/// * `act_fn` - Optional activation for the layer.
///
/// # Returns
/// An error if `fan_in` is zero (the bound would be infinite).
pub fn dense_uniform<R: Rng>(
    rng: &mut R,
    fan_in: usize,
    fan_out: usize,
    act_fn: Option<ActFn>,
) -> Result<Dense> {
    let bound = 1.0 / (fan_in as f32).sqrt();
    let distribution = Uniform::new_inclusive(-bound, bound)
        .map_err(|_| MlError::InvalidInput("fan_in must be non-zero for uniform init"))?;

    let weights = Array2::from_shape_fn((fan_in, fan_out), |_| distribution.sample(rng));
    let biases = Array1::from_shape_fn(fan_out, |_| distribution.sample(rng));

    Dense::new(weights, biases, act_fn)
}

/// Builds a multilayer perceptron classifier: hidden layers with ReLU, a
/// final logits layer with no activation.
///
/// # Arguments
/// * `rng` - A random number generator.
/// * `input_dim` - Feature dimension of the input.
/// * `hidden` - Output width of each hidden layer, in order.
/// * `num_classes` - Width of the final logits layer.
pub fn mlp<R: Rng>(
    rng: &mut R,
    input_dim: usize,
    hidden: &[usize],
    num_classes: usize,
) -> Result<Sequential> {
    let mut layers = Vec::with_capacity(hidden.len() + 1);
    let mut fan_in = input_dim;

    for &width in hidden {
        layers.push(dense_uniform(rng, fan_in, width, Some(ActFn::Relu))?);
        fan_in = width;
    }
    layers.push(dense_uniform(rng, fan_in, num_classes, None)?);

    Ok(Sequential::new(layers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn weights_stay_within_the_fan_in_bound() {
        let mut rng = StdRng::seed_from_u64(7);
        let layer = dense_uniform(&mut rng, 16, 4, None).unwrap();
        let bound = 1.0 / 4.0;
        assert!(layer.weights().iter().all(|w| w.abs() <= bound));
        assert!(layer.biases().iter().all(|b| b.abs() <= bound));
    }

    #[test]
    fn zero_fan_in_is_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            dense_uniform(&mut rng, 0, 4, None),
            Err(MlError::InvalidInput(_))
        ));
    }

    #[test]
    fn mlp_stacks_hidden_layers_and_logits() {
        let mut rng = StdRng::seed_from_u64(7);
        let model = mlp(&mut rng, 8, &[16, 16], 3).unwrap();
        assert_eq!(model.len(), 3);
        assert_eq!(model.layers()[0].dim(), (8, 16));
        assert_eq!(model.layers()[2].dim(), (16, 3));
    }

    #[test]
    fn same_seed_builds_identical_models() {
        let mut a = StdRng::seed_from_u64(11);
        let mut b = StdRng::seed_from_u64(11);
        let m1 = mlp(&mut a, 4, &[8], 2).unwrap();
        let m2 = mlp(&mut b, 4, &[8], 2).unwrap();
        assert_eq!(m1.state_dict(), m2.state_dict());
    }
}
