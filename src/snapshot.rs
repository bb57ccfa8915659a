use std::fmt::{self, Display};

use serde::Serialize;

use crate::{
    activation::ActivationKind,
    network::{ActivationVector, Architecture, BiasVector, GradientVector, WeightTensor},
    sequencer::Cycle,
};

/// An owned copy of everything a renderer needs to draw the network after a step. It shares
/// nothing with the engine it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub architecture: Architecture,
    pub weights: WeightTensor,
    pub biases: BiasVector,
    pub activations: ActivationVector,
    /// `None` outside the window between a backward pass and the following update.
    pub gradients: Option<GradientVector>,
    pub loss: f64,
    pub activation: ActivationKind,
    pub learning_rate: f64,
    pub cycle: Cycle,
    pub description: &'static str,
}

impl Snapshot {
    /// "Input", "Hidden n" or "Output".
    pub fn layer_name(&self, layer: usize) -> String {
        match layer {
            0 => "Input".to_string(),
            l if l + 1 == self.architecture.depth() => "Output".to_string(),
            l => format!("Hidden {l}"),
        }
    }
}

fn fmt_values(values: &[f64]) -> String {
    let values = values
        .iter()
        .map(|v| format!("{v:.4}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{values}]")
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Activation: {}  Learning rate: {}  Loss: {:.4}",
            self.activation, self.learning_rate, self.loss
        )?;
        writeln!(f, "Step: {} ({})", self.description, self.cycle.mode())?;

        for (layer, values) in self.activations.iter().enumerate() {
            write!(f, "{:<10} a={}", self.layer_name(layer), fmt_values(values))?;
            if let Some(gradients) = &self.gradients {
                write!(f, "  grad={}", fmt_values(&gradients[layer]))?;
            }
            writeln!(f)?;
        }

        for (boundary, weights) in self.weights.iter().enumerate() {
            write!(
                f,
                "{} -> {} weights {weights}",
                self.layer_name(boundary),
                self.layer_name(boundary + 1)
            )?;
            writeln!(
                f,
                "{} biases {}",
                self.layer_name(boundary + 1),
                fmt_values(&self.biases[boundary])
            )?;
        }
        Ok(())
    }
}
