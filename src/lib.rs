//! A step-through backpropagation engine for small fully-connected networks.
//!
//! A [`NetworkEngine`] owns one network and runs exactly one phase per request (forward,
//! backward or update) so every intermediate value can be inspected through a [`Snapshot`]
//! between steps.

mod activation;
mod config;
mod engine;
mod error;
mod network;
pub mod pass;
mod sequencer;
mod snapshot;

pub use activation::ActivationKind;
pub use config::EngineConfig;
pub use engine::NetworkEngine;
pub use error::{ConfigError, EngineError, SampleField};
pub use netstep_tensor::Matrix;
pub use network::{
    ActivationVector, Architecture, BIAS_RANGE, BiasVector, GradientVector, LayerValues, Network,
    TrainingSample, WEIGHT_RANGE, WeightTensor,
};
pub use sequencer::{Cycle, ForwardOnlyPhase, FullCyclePhase, Mode, Step};
pub use snapshot::Snapshot;
