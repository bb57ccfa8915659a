use std::{
    fmt::{self, Display},
    path::PathBuf,
};

use netstep_tensor::ShapeError;

use crate::sequencer::{Cycle, Step};

/// Rejected configuration. Raised when a configuration is built or loaded, never mid-pass.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("an architecture needs at least 2 layers, got {0}")]
    TooFewLayers(usize),
    #[error("layer {index} has no neurons")]
    EmptyLayer { index: usize },
    #[error("learning rate must be a positive finite number, got {0}")]
    LearningRate(f64),
    #[error("unknown activation function `{0}` (expected sigmoid, relu or tanh)")]
    UnknownActivation(String),
    #[error("unknown mode `{0}` (expected forward-only or full-cycle)")]
    UnknownMode(String),
    #[error("expected {expected} {what}, got {actual}")]
    ParameterCount {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{what} {index} is {actual:?}, expected {expected:?}")]
    ParameterShape {
        what: &'static str,
        index: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error(transparent)]
    Matrix(#[from] ShapeError),
    #[error("failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config")]
    Parse(#[from] serde_json::Error),
}

/// Which half of a training sample a length check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleField {
    Input,
    Target,
}

impl Display for SampleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleField::Input => write!(f, "sample input"),
            SampleField::Target => write!(f, "sample target"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{field} has {actual} values but the architecture expects {expected}")]
    SampleShape {
        field: SampleField,
        expected: usize,
        actual: usize,
    },
    #[error("{what} have layer sizes {actual:?} but the architecture expects {expected:?}")]
    LayerShape {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("cannot run the {step} pass: {cycle}")]
    OutOfPhase { step: Step, cycle: Cycle },
    #[error("the forward-only cycle is finished; reset to run it again")]
    CycleFinished,
    #[error("no gradients available; run a backward pass first")]
    MissingGradients,
}
