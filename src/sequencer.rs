use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EngineError};

/// Which training cycle the sequencer walks through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// A single forward pass, then the cycle is finished.
    #[default]
    #[serde(alias = "forward")]
    ForwardOnly,
    /// Forward, backward, update, and back to the start.
    #[serde(alias = "backward")]
    FullCycle,
}

impl Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::ForwardOnly => write!(f, "forward-only"),
            Mode::FullCycle => write!(f, "full-cycle"),
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward-only" | "forward" => Ok(Mode::ForwardOnly),
            "full-cycle" | "backward" => Ok(Mode::FullCycle),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// One phase of work the engine can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Forward,
    Backward,
    Update,
}

impl Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Forward => write!(f, "forward"),
            Step::Backward => write!(f, "backward"),
            Step::Update => write!(f, "update"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForwardOnlyPhase {
    Ready,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FullCyclePhase {
    Ready,
    Forwarded,
    Backpropagated,
}

/// Position within a training cycle. Each mode only carries the phases it can reach, so e.g. a
/// forward-only cycle can never be `Backpropagated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "phase", rename_all = "kebab-case")]
pub enum Cycle {
    ForwardOnly(ForwardOnlyPhase),
    FullCycle(FullCyclePhase),
}

impl Cycle {
    /// The Ready phase of `mode`.
    pub fn new(mode: Mode) -> Self {
        match mode {
            Mode::ForwardOnly => Cycle::ForwardOnly(ForwardOnlyPhase::Ready),
            Mode::FullCycle => Cycle::FullCycle(FullCyclePhase::Ready),
        }
    }

    pub fn mode(self) -> Mode {
        match self {
            Cycle::ForwardOnly(_) => Mode::ForwardOnly,
            Cycle::FullCycle(_) => Mode::FullCycle,
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(
            self,
            Cycle::ForwardOnly(ForwardOnlyPhase::Ready) | Cycle::FullCycle(FullCyclePhase::Ready)
        )
    }

    /// Whether gradients from the last backward pass are still valid here.
    pub fn holds_gradients(self) -> bool {
        self == Cycle::FullCycle(FullCyclePhase::Backpropagated)
    }

    /// The step `advance` would run next, or `None` once a forward-only cycle is done.
    pub fn next_step(self) -> Option<Step> {
        match self {
            Cycle::ForwardOnly(ForwardOnlyPhase::Ready) => Some(Step::Forward),
            Cycle::ForwardOnly(ForwardOnlyPhase::Done) => None,
            Cycle::FullCycle(FullCyclePhase::Ready) => Some(Step::Forward),
            Cycle::FullCycle(FullCyclePhase::Forwarded) => Some(Step::Backward),
            Cycle::FullCycle(FullCyclePhase::Backpropagated) => Some(Step::Update),
        }
    }

    /// The cycle after running `step`, or an error if `step` is not the one allowed next.
    pub fn after(self, step: Step) -> Result<Self, EngineError> {
        use self::{ForwardOnlyPhase as F, FullCyclePhase as C};

        match (self, step) {
            (Cycle::ForwardOnly(F::Ready), Step::Forward) => Ok(Cycle::ForwardOnly(F::Done)),
            (Cycle::ForwardOnly(F::Done), _) => Err(EngineError::CycleFinished),
            (Cycle::FullCycle(C::Ready), Step::Forward) => Ok(Cycle::FullCycle(C::Forwarded)),
            (Cycle::FullCycle(C::Forwarded), Step::Backward) => {
                Ok(Cycle::FullCycle(C::Backpropagated))
            }
            (Cycle::FullCycle(C::Backpropagated), Step::Update) => Ok(Cycle::FullCycle(C::Ready)),
            (cycle, step) => Err(EngineError::OutOfPhase { step, cycle }),
        }
    }

    /// Carries the current position over to `mode` without resetting.
    ///
    /// A completed forward pass maps to the other mode's post-forward phase. A finished backward
    /// pass has no forward-only counterpart and maps to `Done`.
    pub fn with_mode(self, mode: Mode) -> Self {
        use self::{ForwardOnlyPhase as F, FullCyclePhase as C};

        match (self, mode) {
            (cycle, mode) if cycle.mode() == mode => cycle,
            (Cycle::FullCycle(C::Ready), _) => Cycle::ForwardOnly(F::Ready),
            (Cycle::FullCycle(C::Forwarded | C::Backpropagated), _) => Cycle::ForwardOnly(F::Done),
            (Cycle::ForwardOnly(F::Ready), _) => Cycle::FullCycle(C::Ready),
            (Cycle::ForwardOnly(F::Done), _) => Cycle::FullCycle(C::Forwarded),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Cycle::ForwardOnly(ForwardOnlyPhase::Ready)
            | Cycle::FullCycle(FullCyclePhase::Ready) => "Ready for forward pass",
            Cycle::ForwardOnly(ForwardOnlyPhase::Done) => "Forward pass completed",
            Cycle::FullCycle(FullCyclePhase::Forwarded) => {
                "Forward pass done, ready for backpropagation"
            }
            Cycle::FullCycle(FullCyclePhase::Backpropagated) => {
                "Backpropagation done, ready to update weights"
            }
        }
    }
}

impl Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
