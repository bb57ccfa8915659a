use std::{path::PathBuf, time::Duration};

use clap::Parser;
use netstep::{ActivationKind, EngineConfig, Mode};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// A JSON engine configuration. Flags below override its fields.
    #[arg(short, long, env = "NETSTEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Neurons per layer, input first, e.g. `2,3,1`.
    #[arg(short, long, value_delimiter = ',', env = "NETSTEP_ARCHITECTURE")]
    pub architecture: Option<Vec<usize>>,

    /// Input vector, one value per input neuron.
    #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
    pub input: Option<Vec<f64>>,

    /// Target vector, one value per output neuron.
    #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
    pub target: Option<Vec<f64>>,

    #[arg(short, long, env = "NETSTEP_LEARNING_RATE")]
    pub learning_rate: Option<f64>,

    /// sigmoid, relu or tanh.
    #[arg(long, env = "NETSTEP_ACTIVATION")]
    pub activation: Option<ActivationKind>,

    /// forward-only or full-cycle.
    #[arg(short, long, env = "NETSTEP_MODE")]
    pub mode: Option<Mode>,

    #[arg(long, env = "NETSTEP_SEED")]
    pub seed: Option<u64>,

    /// Number of steps to advance.
    #[arg(short, long, default_value_t = 3)]
    pub steps: usize,

    /// Pause between steps, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub interval_ms: u64,

    /// Print one JSON snapshot per line instead of the text view.
    #[arg(long)]
    pub json: bool,
}

impl Args {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Layers the flags over `base`, leaving fields without a flag untouched.
    pub fn apply(&self, mut base: EngineConfig) -> EngineConfig {
        if let Some(architecture) = &self.architecture {
            base.architecture = architecture.clone();
        }
        if let Some(input) = &self.input {
            base.sample.input = input.clone();
        }
        if let Some(target) = &self.target {
            base.sample.target = target.clone();
        }
        if let Some(learning_rate) = self.learning_rate {
            base.learning_rate = learning_rate;
        }
        if let Some(activation) = self.activation {
            base.activation = activation;
        }
        if let Some(mode) = self.mode {
            base.mode = mode;
        }
        if self.seed.is_some() {
            base.seed = self.seed;
        }
        base
    }
}
