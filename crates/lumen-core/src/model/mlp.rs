//! Shared feed-forward core: dense layers with ReLU between them and a
//! linear output, trained by plain SGD with manually derived gradients.
//!
//! Every model variant projects image features through this core; only the
//! output dimension and the loss differ.

use ndarray::{Array1, Array2, Axis};
use rand::Rng;

/// One dense layer: `output = input · weights + bias`.
#[derive(Debug, Clone)]
pub struct Dense {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
}

impl Dense {
    /// Input dimensionality.
    pub fn fan_in(&self) -> usize {
        self.weights.nrows()
    }

    /// Output dimensionality.
    pub fn fan_out(&self) -> usize {
        self.weights.ncols()
    }
}

/// Initialize a layer stack for `input_dim → hidden… → output_dim`.
///
/// Weights use uniform Glorot initialization, biases start at zero.
pub fn init_layers(
    input_dim: usize,
    hidden: &[usize],
    output_dim: usize,
    rng: &mut impl Rng,
) -> Vec<Dense> {
    let mut dims = Vec::with_capacity(hidden.len() + 2);
    dims.push(input_dim);
    dims.extend_from_slice(hidden);
    dims.push(output_dim);

    dims.windows(2)
        .map(|pair| {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let bound = (6.0 / (fan_in + fan_out) as f32).sqrt();
            Dense {
                weights: Array2::from_shape_fn((fan_in, fan_out), |_| {
                    rng.gen_range(-bound..bound)
                }),
                bias: Array1::zeros(fan_out),
            }
        })
        .collect()
}

/// Forward pass output plus the per-layer inputs needed for backprop.
pub struct ForwardPass {
    /// Final linear output, batch × output_dim.
    pub output: Array2<f32>,
    /// Input to each layer: `activations[0]` is the batch input,
    /// `activations[i]` the post-ReLU output feeding layer `i`.
    activations: Vec<Array2<f32>>,
}

/// Run the batch through the layer stack.
pub fn forward(layers: &[Dense], input: &Array2<f32>) -> ForwardPass {
    let mut activations = Vec::with_capacity(layers.len());
    let mut current = input.to_owned();
    for (i, layer) in layers.iter().enumerate() {
        activations.push(current.clone());
        let z = current.dot(&layer.weights) + &layer.bias;
        current = if i + 1 < layers.len() {
            z.mapv(|v| v.max(0.0))
        } else {
            z
        };
    }
    ForwardPass {
        output: current,
        activations,
    }
}

/// Backpropagate `grad_output` (dL/d output) and apply one SGD step.
///
/// `grad_output` must already carry whatever batch averaging the loss uses.
pub fn backward(
    layers: &mut [Dense],
    pass: &ForwardPass,
    grad_output: &Array2<f32>,
    learning_rate: f32,
) {
    let mut grad = grad_output.to_owned();
    for i in (0..layers.len()).rev() {
        let input = &pass.activations[i];
        let grad_weights = input.t().dot(&grad);
        let grad_bias = grad.sum_axis(Axis(0));

        if i > 0 {
            // Upstream gradient through the pre-update weights, masked by
            // the ReLU: inactive units (activation 0) pass no gradient.
            let mut upstream = grad.dot(&layers[i].weights.t());
            upstream.zip_mut_with(input, |g, &a| {
                if a <= 0.0 {
                    *g = 0.0;
                }
            });
            grad = upstream;
        }

        layers[i].weights.scaled_add(-learning_rate, &grad_weights);
        layers[i].bias.scaled_add(-learning_rate, &grad_bias);
    }
}
