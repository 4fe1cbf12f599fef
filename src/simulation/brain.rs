//! Feed-forward neural network used by genetic-algorithm vehicles.
//!
//! The network maps raw ray distances to steering outputs through a fixed
//! layer sequence with tanh activation. Evolution never back-propagates;
//! weights only change by whole-element replacement during generation
//! resets.

use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::SimError;

/// Initial weights and mutated elements are drawn uniformly from this
/// half-open range.
const WEIGHT_SPAN: f32 = 0.5;

/// A single dense layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    /// Weight matrix (`output_size` x `input_size`).
    pub weights: Array2<f32>,
    /// Bias vector (`output_size`).
    pub biases: Array1<f32>,
}

impl Layer {
    /// Creates a layer with uniform random weights and biases.
    pub fn new_random(input_size: usize, output_size: usize) -> Self {
        Self {
            weights: Array2::random(
                (output_size, input_size),
                Uniform::new(-WEIGHT_SPAN, WEIGHT_SPAN),
            ),
            biases: Array1::random(output_size, Uniform::new(-WEIGHT_SPAN, WEIGHT_SPAN)),
        }
    }

    /// Forward pass with tanh activation.
    #[inline]
    pub fn forward(&self, inputs: &Array1<f32>) -> Array1<f32> {
        let mut output = self.weights.dot(inputs);
        output += &self.biases;
        output.mapv_inplace(f32::tanh);
        output
    }
}

/// A feed-forward network: one [`Layer`] per transition in a fixed layer
/// size sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    /// Creates a network with random weights for the given layer sizes,
    /// e.g. `[3, 4, 4, 2]` for three sensors and two steering outputs.
    pub fn new(layer_sizes: &[usize]) -> Self {
        let layers = layer_sizes
            .windows(2)
            .map(|pair| Layer::new_random(pair[0], pair[1]))
            .collect();
        Self { layers }
    }

    /// Runs a forward pass through every layer.
    #[inline]
    pub fn forward(&self, inputs: &Array1<f32>) -> Array1<f32> {
        let mut output = inputs.clone();
        for layer in &self.layers {
            output = layer.forward(&output);
        }
        output
    }

    /// Index of the largest output for the given inputs.
    pub fn decide(&self, inputs: &Array1<f32>) -> usize {
        let outputs = self.forward(inputs);
        let mut best = 0;
        for (i, value) in outputs.iter().enumerate() {
            if *value > outputs[best] {
                best = i;
            }
        }
        best
    }

    /// Replaces `count` randomly chosen weight elements and `count`
    /// randomly chosen bias elements with fresh uniform values.
    ///
    /// Each replacement picks a random layer, then a random element within
    /// that layer's weight matrix and bias vector.
    pub fn mutate_elements(&mut self, count: usize, rng: &mut impl Rng) {
        for _ in 0..count {
            let layer_index = rng.random_range(0..self.layers.len());
            let layer = &mut self.layers[layer_index];

            let (rows, cols) = layer.weights.dim();
            let element = (rng.random_range(0..rows), rng.random_range(0..cols));
            layer.weights[element] = rng.random::<f32>() - WEIGHT_SPAN;

            let bias = rng.random_range(0..layer.biases.len());
            layer.biases[bias] = rng.random::<f32>() - WEIGHT_SPAN;
        }
    }

    /// The layer size sequence this network was built with.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self
            .layers
            .iter()
            .map(|layer| layer.weights.dim().1)
            .collect();
        if let Some(last) = self.layers.last() {
            sizes.push(last.weights.dim().0);
        }
        sizes
    }

    /// Snapshot of the network as `[weight matrices, bias vectors]`.
    pub fn export(&self) -> (Vec<Array2<f32>>, Vec<Array1<f32>>) {
        (
            self.layers.iter().map(|l| l.weights.clone()).collect(),
            self.layers.iter().map(|l| l.biases.clone()).collect(),
        )
    }

    /// Installs exported weights and biases, validating that the shapes
    /// match this network's layer sequence.
    pub fn set_network(
        &mut self,
        weights: Vec<Array2<f32>>,
        biases: Vec<Array1<f32>>,
    ) -> Result<(), SimError> {
        let expected = self.layer_sizes();
        let mut found: Vec<usize> = weights.iter().map(|w| w.dim().1).collect();
        if let Some(last) = weights.last() {
            found.push(last.dim().0);
        }

        let bias_shapes_match = weights.len() == biases.len()
            && weights
                .iter()
                .zip(&biases)
                .all(|(w, b)| w.dim().0 == b.len());

        if found != expected || !bias_shapes_match {
            return Err(SimError::NetworkShape { expected, found });
        }

        self.layers = weights
            .into_iter()
            .zip(biases)
            .map(|(weights, biases)| Layer { weights, biases })
            .collect();
        Ok(())
    }
}
