use std::ops::{Index, IndexMut};

use netstep_tensor::Matrix;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EngineError, SampleField};

/// Initial weights are drawn from `[-WEIGHT_RANGE, WEIGHT_RANGE)`.
pub const WEIGHT_RANGE: f64 = 1.0;
/// Initial biases are drawn from `[-BIAS_RANGE, BIAS_RANGE)`.
pub const BIAS_RANGE: f64 = 0.25;

/// Neuron count per layer, input layer first. Always at least 2 layers, none of them empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Architecture {
    layers: Vec<usize>,
}

impl Architecture {
    pub fn new(layers: Vec<usize>) -> Result<Self, ConfigError> {
        if layers.len() < 2 {
            return Err(ConfigError::TooFewLayers(layers.len()));
        }
        if let Some(index) = layers.iter().position(|&n| n == 0) {
            return Err(ConfigError::EmptyLayer { index });
        }
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[usize] {
        &self.layers
    }

    /// Number of layers, input and output included.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn input_size(&self) -> usize {
        self.layers[0]
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1]
    }

    /// `(rows, cols)` of the weight matrix at every layer boundary.
    pub fn boundaries(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.layers.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

/// One training example: an input for layer 0 and the expected output of the last layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub input: Vec<f64>,
    pub target: Vec<f64>,
}

impl TrainingSample {
    pub fn new(input: Vec<f64>, target: Vec<f64>) -> Self {
        Self { input, target }
    }

    /// Checks both vector lengths against the input and output layer sizes.
    pub fn check(&self, architecture: &Architecture) -> Result<(), EngineError> {
        let checks = [
            (SampleField::Input, architecture.input_size(), self.input.len()),
            (SampleField::Target, architecture.output_size(), self.target.len()),
        ];
        match checks.into_iter().find(|(_, expected, actual)| expected != actual) {
            Some((field, expected, actual)) => Err(EngineError::SampleShape {
                field,
                expected,
                actual,
            }),
            None => Ok(()),
        }
    }
}

impl Default for TrainingSample {
    fn default() -> Self {
        Self::new(vec![0.3, 0.9], vec![1.0])
    }
}

/// One `|L| x |L+1|` matrix per layer boundary. Entry `[i, j]` connects neuron `i` of layer `L`
/// to neuron `j` of layer `L+1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeightTensor(Vec<Matrix<f64>>);

impl WeightTensor {
    pub fn iter(&self) -> impl Iterator<Item = &Matrix<f64>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<usize> for WeightTensor {
    type Output = Matrix<f64>;

    fn index(&self, boundary: usize) -> &Self::Output {
        &self.0[boundary]
    }
}

impl IndexMut<usize> for WeightTensor {
    fn index_mut(&mut self, boundary: usize) -> &mut Self::Output {
        &mut self.0[boundary]
    }
}

/// Per-layer vectors of one value per neuron. With the input layer included this holds
/// activations and gradients; `BiasVector` uses the same layout minus the input layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LayerValues(Vec<Vec<f64>>);

/// Current output of every neuron, layer 0 being the sample input.
pub type ActivationVector = LayerValues;
/// `dLoss/dActivation` for every neuron, from the last backward pass.
pub type GradientVector = LayerValues;
/// One bias per neuron of every non-input layer.
pub type BiasVector = LayerValues;

impl LayerValues {
    /// Zero-filled, one vector per entry of `sizes`.
    pub fn zeros(sizes: &[usize]) -> Self {
        Self(sizes.iter().map(|&n| vec![0.0; n]).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> {
        self.0.iter().map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> &[f64] {
        self.0.last().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.0.iter().map(Vec::len).collect()
    }

    /// Borrows layers `lower` and `lower + 1` at once.
    pub(crate) fn adjacent_mut(&mut self, lower: usize) -> (&mut [f64], &mut [f64]) {
        let (head, tail) = self.0.split_at_mut(lower + 1);
        (&mut head[lower], &mut tail[0])
    }
}

impl Index<usize> for LayerValues {
    type Output = [f64];

    fn index(&self, layer: usize) -> &Self::Output {
        &self.0[layer]
    }
}

impl IndexMut<usize> for LayerValues {
    fn index_mut(&mut self, layer: usize) -> &mut Self::Output {
        &mut self.0[layer]
    }
}

/// The trainable parameters of a fully-connected network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Network {
    architecture: Architecture,
    weights: WeightTensor,
    biases: BiasVector,
}

impl Network {
    /// Creates a [`Network`] with every weight and bias drawn independently and uniformly from
    /// [`WEIGHT_RANGE`] and [`BIAS_RANGE`].
    pub fn random<R: Rng + ?Sized>(architecture: Architecture, rng: &mut R) -> Self {
        let weight_die = Uniform::new(-WEIGHT_RANGE, WEIGHT_RANGE)
            .expect("Failed to create uniform distribution: invalid weight range");
        let bias_die = Uniform::new(-BIAS_RANGE, BIAS_RANGE)
            .expect("Failed to create uniform distribution: invalid bias range");

        let weights = architecture
            .boundaries()
            .map(|(rows, cols)| Matrix::from_fn(rows, cols, |_, _| weight_die.sample(&mut *rng)))
            .collect();
        let biases = architecture.layers()[1..]
            .iter()
            .map(|&n| (0..n).map(|_| bias_die.sample(&mut *rng)).collect())
            .collect();

        Self {
            architecture,
            weights: WeightTensor(weights),
            biases: LayerValues(biases),
        }
    }

    /// Every weight set to `weight` and every bias to `bias`.
    pub fn constant(architecture: Architecture, weight: f64, bias: f64) -> Self {
        let weights = architecture
            .boundaries()
            .map(|(rows, cols)| Matrix::filled(rows, cols, weight))
            .collect();
        let biases = architecture.layers()[1..]
            .iter()
            .map(|&n| vec![bias; n])
            .collect();

        Self {
            architecture,
            weights: WeightTensor(weights),
            biases: LayerValues(biases),
        }
    }

    /// Wraps existing parameters, checking them against `architecture`.
    pub fn from_parameters(
        architecture: Architecture,
        weights: Vec<Matrix<f64>>,
        biases: Vec<Vec<f64>>,
    ) -> Result<Self, ConfigError> {
        let boundaries = architecture.depth() - 1;
        for (what, actual) in [("weight matrices", weights.len()), ("bias vectors", biases.len())] {
            if actual != boundaries {
                return Err(ConfigError::ParameterCount {
                    what,
                    expected: boundaries,
                    actual,
                });
            }
        }

        for (index, ((rows, cols), (w, b))) in architecture
            .boundaries()
            .zip(weights.iter().zip(biases.iter()))
            .enumerate()
        {
            if w.dims() != (rows, cols) {
                return Err(ConfigError::ParameterShape {
                    what: "weight matrix",
                    index,
                    expected: (rows, cols),
                    actual: w.dims(),
                });
            }
            if b.len() != cols {
                return Err(ConfigError::ParameterShape {
                    what: "bias vector",
                    index,
                    expected: (1, cols),
                    actual: (1, b.len()),
                });
            }
        }

        Ok(Self {
            architecture,
            weights: WeightTensor(weights),
            biases: LayerValues(biases),
        })
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    pub fn weights(&self) -> &WeightTensor {
        &self.weights
    }

    pub fn biases(&self) -> &BiasVector {
        &self.biases
    }

    pub(crate) fn parameters_mut(&mut self) -> (&mut WeightTensor, &mut BiasVector) {
        (&mut self.weights, &mut self.biases)
    }

    /// Zero-filled activations for this network with layer 0 set to `input`.
    pub fn activations_for(&self, input: &[f64]) -> Result<ActivationVector, EngineError> {
        let expected = self.architecture.input_size();
        if input.len() != expected {
            return Err(EngineError::SampleShape {
                field: SampleField::Input,
                expected,
                actual: input.len(),
            });
        }
        let mut activations = LayerValues::zeros(self.architecture.layers());
        activations[0].copy_from_slice(input);
        Ok(activations)
    }
}
