use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    activation::ActivationKind,
    error::{ConfigError, EngineError},
    network::{Architecture, TrainingSample},
    sequencer::Mode,
};

/// Everything the input side hands to a [`crate::NetworkEngine`].
///
/// Missing fields fall back to [`EngineConfig::default`]:
///
/// ```json
/// {
///   "architecture": [2, 3, 1],
///   "sample": { "input": [0.3, 0.9], "target": [1.0] },
///   "learning_rate": 0.1,
///   "activation": "sigmoid",
///   "mode": "full-cycle",
///   "seed": 42
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub architecture: Vec<usize>,
    pub sample: TrainingSample,
    pub learning_rate: f64,
    pub activation: ActivationKind,
    pub mode: Mode,
    /// Seeds parameter initialization. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            architecture: vec![2, 3, 1],
            sample: TrainingSample::default(),
            learning_rate: 0.1,
            activation: ActivationKind::default(),
            mode: Mode::default(),
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Checks every field and returns the validated architecture.
    pub fn validate(&self) -> Result<Architecture, EngineError> {
        let architecture = Architecture::new(self.architecture.clone())?;
        check_learning_rate(self.learning_rate)?;
        self.sample.check(&architecture)?;
        Ok(architecture)
    }
}

pub(crate) fn check_learning_rate(learning_rate: f64) -> Result<f64, ConfigError> {
    if learning_rate.is_finite() && learning_rate > 0.0 {
        Ok(learning_rate)
    } else {
        Err(ConfigError::LearningRate(learning_rate))
    }
}
