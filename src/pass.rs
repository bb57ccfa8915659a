//! The three numeric passes over a [`Network`]. They hold no state of their own: parameters,
//! activations and gradients are passed in and mutated or returned.

use crate::{
    activation::ActivationKind,
    error::{EngineError, SampleField},
    network::{ActivationVector, Architecture, GradientVector, LayerValues, Network, TrainingSample},
};

/// Refuses per-layer values whose sizes differ from `architecture`.
fn check_layers(
    what: &'static str,
    values: &LayerValues,
    architecture: &Architecture,
) -> Result<(), EngineError> {
    let actual = values.sizes();
    if actual == architecture.layers() {
        Ok(())
    } else {
        Err(EngineError::LayerShape {
            what,
            expected: architecture.layers().to_vec(),
            actual,
        })
    }
}

/// Mean squared error, `(1/n) * sum((target_k - output_k)^2)`.
pub fn mse_loss(output: &[f64], target: &[f64]) -> f64 {
    let sum = target
        .iter()
        .zip(output)
        .map(|(t, o)| (t - o).powi(2))
        .sum::<f64>();
    sum / target.len() as f64
}

/// Propagates `sample.input` through the network, overwriting every layer of `activations`,
/// and returns the loss against `sample.target`.
///
/// Each neuron computes `f(bias_j + sum_i a_i * w_ij)`, accumulating from the bias in input
/// order.
pub fn forward(
    network: &Network,
    activation: ActivationKind,
    activations: &mut ActivationVector,
    sample: &TrainingSample,
) -> Result<f64, EngineError> {
    sample.check(network.architecture())?;
    check_layers("activations", activations, network.architecture())?;

    activations[0].copy_from_slice(&sample.input);
    for layer in 1..network.architecture().depth() {
        let weights = &network.weights()[layer - 1];
        let biases = &network.biases()[layer - 1];
        let (inputs, outputs) = activations.adjacent_mut(layer - 1);

        for (j, out) in outputs.iter_mut().enumerate() {
            let z = inputs
                .iter()
                .enumerate()
                .fold(biases[j], |z, (i, a)| z + a * weights[[i, j]]);
            *out = activation.apply(z);
        }
    }

    Ok(mse_loss(activations.last(), &sample.target))
}

/// `gradient_j * f'(a_j)` for every neuron of one layer, the term shared by the backward sweep
/// and the parameter update.
fn local_deltas<'a>(
    activation: ActivationKind,
    gradients: &'a [f64],
    outputs: &'a [f64],
) -> impl Iterator<Item = f64> + 'a {
    gradients
        .iter()
        .zip(outputs)
        .map(move |(g, a)| g * activation.derivative_at_output(*a))
}

/// Computes `dLoss/dActivation` for every neuron in a single reverse sweep.
///
/// The output layer gets `2 * (a_k - target_k)`; the MSE average over outputs is deliberately
/// left out. Every earlier layer, down to the input, gets
/// `sum_j gradient[L+1][j] * f'(a[L+1][j]) * w[L][i][j]` with `f'` taken at the activation.
pub fn backward(
    network: &Network,
    activation: ActivationKind,
    activations: &ActivationVector,
    target: &[f64],
) -> Result<GradientVector, EngineError> {
    let architecture = network.architecture();
    let expected = architecture.output_size();
    if target.len() != expected {
        return Err(EngineError::SampleShape {
            field: SampleField::Target,
            expected,
            actual: target.len(),
        });
    }
    check_layers("activations", activations, architecture)?;

    let mut gradients = LayerValues::zeros(architecture.layers());
    let last = architecture.depth() - 1;

    gradients[last]
        .iter_mut()
        .zip(activations.last().iter().zip(target))
        .for_each(|(g, (o, t))| *g = 2.0 * (o - t));

    for layer in (0..last).rev() {
        let weights = &network.weights()[layer];
        let (current, next) = gradients.adjacent_mut(layer);
        let deltas = local_deltas(activation, next, &activations[layer + 1]).collect::<Vec<_>>();

        for (i, g) in current.iter_mut().enumerate() {
            *g = deltas
                .iter()
                .enumerate()
                .fold(0.0, |acc, (j, d)| acc + d * weights[[i, j]]);
        }
    }

    Ok(gradients)
}

/// One plain gradient-descent step on every weight and bias:
/// `w[L][i][j] -= lr * gradient[L+1][j] * f'(a[L+1][j]) * a[L][i]` and
/// `b[L][j] -= lr * gradient[L+1][j] * f'(a[L+1][j])`.
///
/// Shapes are checked before any parameter is touched.
pub fn update(
    network: &mut Network,
    activation: ActivationKind,
    activations: &ActivationVector,
    gradients: &GradientVector,
    learning_rate: f64,
) -> Result<(), EngineError> {
    check_layers("activations", activations, network.architecture())?;
    check_layers("gradients", gradients, network.architecture())?;
    let boundaries = network.architecture().depth() - 1;
    let (weights, biases) = network.parameters_mut();

    for layer in 0..boundaries {
        let inputs = &activations[layer];
        let deltas = local_deltas(activation, &gradients[layer + 1], &activations[layer + 1])
            .collect::<Vec<_>>();

        for (i, a) in inputs.iter().enumerate() {
            for (j, d) in deltas.iter().enumerate() {
                weights[layer][[i, j]] -= learning_rate * (d * a);
            }
        }
        for (b, d) in biases[layer].iter_mut().zip(&deltas) {
            *b -= learning_rate * d;
        }
    }
    Ok(())
}
