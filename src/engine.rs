use rand::{SeedableRng, rngs::StdRng};
use tracing::{debug, info, instrument};

use crate::{
    activation::ActivationKind,
    config::{EngineConfig, check_learning_rate},
    error::EngineError,
    network::{ActivationVector, Architecture, GradientVector, Network, TrainingSample},
    pass,
    sequencer::{Cycle, Mode, Step},
    snapshot::Snapshot,
};

/// Everything a (re)initialization replaces. Swapped in as one value so callers never see
/// parameters from one architecture next to activations from another.
#[derive(Debug, Clone)]
struct State {
    network: Network,
    activations: ActivationVector,
    gradients: Option<GradientVector>,
    loss: f64,
    cycle: Cycle,
}

impl State {
    fn fresh(network: Network, sample: &TrainingSample, mode: Mode) -> Result<Self, EngineError> {
        let activations = network.activations_for(&sample.input)?;
        Ok(Self {
            network,
            activations,
            gradients: None,
            loss: 0.0,
            cycle: Cycle::new(mode),
        })
    }
}

/// Owns one network and walks it through forward, backward and update phases, one externally
/// requested step at a time.
#[derive(Debug)]
pub struct NetworkEngine {
    state: State,
    /// The sample the current cycle runs against.
    sample: TrainingSample,
    /// A sample set mid-cycle, applied once the cycle is back at Ready.
    pending_sample: Option<TrainingSample>,
    learning_rate: f64,
    activation: ActivationKind,
    rng: StdRng,
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

impl NetworkEngine {
    /// Validates `config` and initializes a network with random parameters.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let architecture = config.validate()?;
        let mut rng = seeded_rng(config.seed);
        let network = Network::random(architecture, &mut rng);
        info!(architecture = ?config.architecture, seed = ?config.seed, "initialized network");
        Self::assemble(config, network, rng)
    }

    /// Starts from known parameters instead of random ones. The architecture is taken from
    /// `network`; `config.architecture` is ignored.
    pub fn with_network(config: &EngineConfig, network: Network) -> Result<Self, EngineError> {
        check_learning_rate(config.learning_rate)?;
        config.sample.check(network.architecture())?;
        let rng = seeded_rng(config.seed);
        Self::assemble(config, network, rng)
    }

    fn assemble(config: &EngineConfig, network: Network, rng: StdRng) -> Result<Self, EngineError> {
        Ok(Self {
            state: State::fresh(network, &config.sample, config.mode)?,
            sample: config.sample.clone(),
            pending_sample: None,
            learning_rate: config.learning_rate,
            activation: config.activation,
            rng,
        })
    }

    /// Draws fresh parameters for `architecture` against `sample` and returns to Ready in `mode`.
    /// The current state is only replaced once the new one is complete.
    fn initialize(
        &mut self,
        architecture: Architecture,
        sample: TrainingSample,
        mode: Mode,
    ) -> Result<(), EngineError> {
        sample.check(&architecture)?;
        let network = Network::random(architecture, &mut self.rng);
        let state = State::fresh(network, &sample, mode)?;

        self.state = state;
        self.sample = sample;
        self.pending_sample = None;
        info!(architecture = ?self.architecture().layers(), "reinitialized network");
        Ok(())
    }

    /// Reinitializes with the current architecture, whatever the mode or phase. A sample held
    /// back mid-cycle is applied now.
    #[instrument(skip(self))]
    pub fn reset(&mut self) -> Result<(), EngineError> {
        let architecture = self.architecture().clone();
        let sample = self
            .pending_sample
            .clone()
            .unwrap_or_else(|| self.sample.clone());
        self.initialize(architecture, sample, self.mode())
    }

    /// Replaces the architecture together with a sample that fits it, and reinitializes.
    /// Nothing changes if either is invalid.
    pub fn set_architecture(
        &mut self,
        layers: Vec<usize>,
        sample: TrainingSample,
    ) -> Result<(), EngineError> {
        let architecture = Architecture::new(layers)?;
        self.initialize(architecture, sample, self.mode())
    }

    /// Applies a whole new configuration at once: validation happens before anything changes.
    /// A configured seed restarts the random stream.
    pub fn reconfigure(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        let architecture = config.validate()?;
        if let Some(seed) = config.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.initialize(architecture, config.sample.clone(), config.mode)?;
        self.learning_rate = config.learning_rate;
        self.activation = config.activation;
        Ok(())
    }

    /// Sets the sample for the next forward pass. While the cycle is Ready the input layer is
    /// refreshed right away; mid-cycle the sample waits until the cycle is Ready again so
    /// backward and update keep using the target the forward pass ran against.
    pub fn set_sample(&mut self, sample: TrainingSample) -> Result<(), EngineError> {
        sample.check(self.architecture())?;
        if self.state.cycle.is_ready() {
            self.pending_sample = Some(sample);
            self.apply_pending_sample();
        } else {
            debug!(cycle = %self.state.cycle, "holding sample until the cycle is ready");
            self.pending_sample = Some(sample);
        }
        Ok(())
    }

    fn apply_pending_sample(&mut self) {
        if let Some(sample) = self.pending_sample.take() {
            self.state.activations[0].copy_from_slice(&sample.input);
            self.sample = sample;
        }
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> Result<(), EngineError> {
        self.learning_rate = check_learning_rate(learning_rate)?;
        Ok(())
    }

    pub fn set_activation(&mut self, activation: ActivationKind) {
        self.activation = activation;
    }

    /// Switches mode without resetting; see [`Cycle::with_mode`] for how the phase carries over.
    pub fn set_mode(&mut self, mode: Mode) {
        let cycle = self.state.cycle.with_mode(mode);
        if !cycle.holds_gradients() {
            self.state.gradients = None;
        }
        self.state.cycle = cycle;
    }

    /// Runs the forward pass and returns the new loss. Only allowed from Ready.
    #[instrument(skip(self), fields(cycle = %self.state.cycle))]
    pub fn forward(&mut self) -> Result<f64, EngineError> {
        let next = self.state.cycle.after(Step::Forward)?;
        let loss = pass::forward(
            &self.state.network,
            self.activation,
            &mut self.state.activations,
            &self.sample,
        )?;

        self.state.loss = loss;
        self.state.gradients = None;
        self.state.cycle = next;
        debug!(loss, output = ?self.state.activations.last(), "forward pass done");
        Ok(loss)
    }

    /// Computes gradients for the current activations. Only allowed right after a forward pass
    /// in full-cycle mode.
    #[instrument(skip(self), fields(cycle = %self.state.cycle))]
    pub fn backward(&mut self) -> Result<&GradientVector, EngineError> {
        let next = self.state.cycle.after(Step::Backward)?;
        let gradients = pass::backward(
            &self.state.network,
            self.activation,
            &self.state.activations,
            &self.sample.target,
        )?;

        self.state.cycle = next;
        debug!(output_gradient = ?gradients.last(), "backward pass done");
        Ok(&*self.state.gradients.insert(gradients))
    }

    /// Applies one gradient-descent step and returns the cycle to Ready. Only allowed right
    /// after a backward pass.
    #[instrument(
        skip(self),
        fields(cycle = %self.state.cycle, learning_rate = self.learning_rate)
    )]
    pub fn update(&mut self) -> Result<(), EngineError> {
        let next = self.state.cycle.after(Step::Update)?;
        let gradients = self
            .state
            .gradients
            .as_ref()
            .ok_or(EngineError::MissingGradients)?;
        pass::update(
            &mut self.state.network,
            self.activation,
            &self.state.activations,
            gradients,
            self.learning_rate,
        )?;

        self.state.gradients = None;
        self.state.cycle = next;
        self.apply_pending_sample();
        debug!("weights updated");
        Ok(())
    }

    /// Runs whichever step the current phase calls for and returns it.
    pub fn advance(&mut self) -> Result<Step, EngineError> {
        let step = self
            .state
            .cycle
            .next_step()
            .ok_or(EngineError::CycleFinished)?;
        match step {
            Step::Forward => {
                self.forward()?;
            }
            Step::Backward => {
                self.backward()?;
            }
            Step::Update => self.update()?,
        }
        Ok(step)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            architecture: self.architecture().clone(),
            weights: self.state.network.weights().clone(),
            biases: self.state.network.biases().clone(),
            activations: self.state.activations.clone(),
            gradients: self.state.gradients.clone(),
            loss: self.state.loss,
            activation: self.activation,
            learning_rate: self.learning_rate,
            cycle: self.state.cycle,
            description: self.state.cycle.description(),
        }
    }

    pub fn network(&self) -> &Network {
        &self.state.network
    }

    pub fn architecture(&self) -> &Architecture {
        self.state.network.architecture()
    }

    pub fn activations(&self) -> &ActivationVector {
        &self.state.activations
    }

    pub fn gradients(&self) -> Option<&GradientVector> {
        self.state.gradients.as_ref()
    }

    /// Loss from the last forward pass, 0 right after initialization.
    pub fn loss(&self) -> f64 {
        self.state.loss
    }

    pub fn cycle(&self) -> Cycle {
        self.state.cycle
    }

    pub fn mode(&self) -> Mode {
        self.state.cycle.mode()
    }

    /// The sample the current cycle runs against.
    pub fn sample(&self) -> &TrainingSample {
        &self.sample
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn activation(&self) -> ActivationKind {
        self.activation
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        error::ConfigError,
        sequencer::{ForwardOnlyPhase, FullCyclePhase},
    };

    fn full_cycle_config() -> EngineConfig {
        EngineConfig {
            mode: Mode::FullCycle,
            seed: Some(42),
            ..EngineConfig::default()
        }
    }

    fn constant_engine(mode: Mode) -> NetworkEngine {
        let config = EngineConfig {
            mode,
            ..EngineConfig::default()
        };
        let architecture = Architecture::new(config.architecture.clone()).unwrap();
        NetworkEngine::with_network(&config, Network::constant(architecture, 0.5, 0.0)).unwrap()
    }

    #[test]
    fn test_initialize_state() {
        let engine = NetworkEngine::new(&full_cycle_config()).unwrap();
        assert_eq!(engine.cycle(), Cycle::new(Mode::FullCycle));
        assert_eq!(engine.loss(), 0.0);
        assert!(engine.gradients().is_none());
        assert_eq!(&engine.activations()[0], &[0.3, 0.9]);
        assert!(engine.activations().last().iter().all(|&a| a == 0.0));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = EngineConfig {
            architecture: vec![2, 0, 1],
            ..EngineConfig::default()
        };
        assert!(matches!(
            NetworkEngine::new(&config),
            Err(EngineError::Config(ConfigError::EmptyLayer { index: 1 }))
        ));
    }

    #[test]
    fn test_with_network_checks_sample() {
        let config = EngineConfig {
            sample: TrainingSample::new(vec![1.0], vec![1.0]),
            ..EngineConfig::default()
        };
        let architecture = Architecture::new(vec![2, 3, 1]).unwrap();
        assert!(matches!(
            NetworkEngine::with_network(&config, Network::constant(architecture, 0.5, 0.0)),
            Err(EngineError::SampleShape { .. })
        ));
    }

    #[test]
    fn test_advance_walks_full_cycle() {
        let mut engine = NetworkEngine::new(&full_cycle_config()).unwrap();

        assert_eq!(engine.advance().unwrap(), Step::Forward);
        assert_eq!(engine.cycle(), Cycle::FullCycle(FullCyclePhase::Forwarded));
        assert!(engine.loss() > 0.0);
        assert!(engine.gradients().is_none());

        assert_eq!(engine.advance().unwrap(), Step::Backward);
        assert_eq!(
            engine.cycle(),
            Cycle::FullCycle(FullCyclePhase::Backpropagated)
        );
        assert_eq!(engine.gradients().unwrap().sizes(), vec![2, 3, 1]);

        let before = engine.network().clone();
        assert_eq!(engine.advance().unwrap(), Step::Update);
        assert_eq!(engine.cycle(), Cycle::new(Mode::FullCycle));
        assert!(engine.gradients().is_none());
        assert_ne!(engine.network(), &before);
    }

    #[test]
    fn test_backward_refused_from_ready() {
        let mut engine = NetworkEngine::new(&full_cycle_config()).unwrap();
        let before = engine.snapshot();
        assert!(matches!(
            engine.backward(),
            Err(EngineError::OutOfPhase {
                step: Step::Backward,
                ..
            })
        ));
        assert!(matches!(
            engine.update(),
            Err(EngineError::OutOfPhase { .. })
        ));
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_forward_only_cycle_finishes() {
        let mut engine = constant_engine(Mode::ForwardOnly);
        assert_eq!(engine.advance().unwrap(), Step::Forward);
        assert_eq!(engine.cycle(), Cycle::ForwardOnly(ForwardOnlyPhase::Done));
        assert!(matches!(engine.advance(), Err(EngineError::CycleFinished)));
        assert!(matches!(engine.forward(), Err(EngineError::CycleFinished)));

        engine.reset().unwrap();
        assert_eq!(engine.cycle(), Cycle::new(Mode::ForwardOnly));
        assert_eq!(engine.advance().unwrap(), Step::Forward);
    }

    #[test]
    fn test_scenario_matches_hand_computation() {
        let mut engine = constant_engine(Mode::FullCycle);
        let loss = engine.forward().unwrap();

        let sigmoid = |x: f64| 1.0 / (1.0 + (-x).exp());
        let h = sigmoid(0.6);
        let o = sigmoid(1.5 * h);
        assert_abs_diff_eq!(engine.activations()[2][0], o, epsilon = 1e-12);
        assert_abs_diff_eq!(loss, (1.0 - o).powi(2), epsilon = 1e-12);

        let grads = engine.backward().unwrap().clone();
        assert_abs_diff_eq!(grads[2][0], 2.0 * (o - 1.0), epsilon = 1e-12);

        let mut again = constant_engine(Mode::FullCycle);
        again.forward().unwrap();
        assert_eq!(again.backward().unwrap(), &grads);
    }

    #[test]
    fn test_reset_draws_new_parameters() {
        let mut engine = NetworkEngine::new(&full_cycle_config()).unwrap();
        engine.advance().unwrap();
        engine.advance().unwrap();
        let before = engine.network().clone();

        engine.reset().unwrap();
        assert_ne!(engine.network().weights(), before.weights());
        assert_eq!(engine.architecture(), before.architecture());
        assert_eq!(engine.cycle(), Cycle::new(Mode::FullCycle));
        assert!(engine.gradients().is_none());
        assert_eq!(engine.loss(), 0.0);
    }

    #[test]
    fn test_same_seed_same_engine() {
        let a = NetworkEngine::new(&full_cycle_config()).unwrap();
        let b = NetworkEngine::new(&full_cycle_config()).unwrap();
        assert_eq!(a.network(), b.network());
    }

    #[test]
    fn test_set_architecture_reinitializes() {
        let mut engine = NetworkEngine::new(&full_cycle_config()).unwrap();
        engine.advance().unwrap();

        let sample = TrainingSample::new(vec![0.1, 0.2, 0.3], vec![0.0, 1.0]);
        engine.set_architecture(vec![3, 4, 4, 2], sample).unwrap();
        assert_eq!(engine.architecture().layers(), &[3, 4, 4, 2]);
        assert_eq!(engine.cycle(), Cycle::new(Mode::FullCycle));
        assert_eq!(engine.activations().sizes(), vec![3, 4, 4, 2]);
        assert_eq!(&engine.activations()[0], &[0.1, 0.2, 0.3]);
        assert_eq!(engine.network().weights()[2].dims(), (4, 2));
    }

    #[test]
    fn test_set_architecture_rejects_mismatched_sample() {
        let mut engine = NetworkEngine::new(&full_cycle_config()).unwrap();
        let before = engine.snapshot();
        assert!(matches!(
            engine.set_architecture(vec![3, 1], TrainingSample::default()),
            Err(EngineError::SampleShape { .. })
        ));
        assert!(matches!(
            engine.set_architecture(vec![1], TrainingSample::default()),
            Err(EngineError::Config(ConfigError::TooFewLayers(1)))
        ));
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_sample_change_while_ready_refreshes_input() {
        let mut engine = NetworkEngine::new(&full_cycle_config()).unwrap();
        engine
            .set_sample(TrainingSample::new(vec![-1.0, 2.0], vec![0.0]))
            .unwrap();
        assert_eq!(&engine.activations()[0], &[-1.0, 2.0]);
        assert_eq!(engine.sample().target, vec![0.0]);
    }

    #[test]
    fn test_sample_change_mid_cycle_waits_for_ready() {
        let mut engine = NetworkEngine::new(&full_cycle_config()).unwrap();
        engine.advance().unwrap();
        let new_sample = TrainingSample::new(vec![-1.0, 2.0], vec![0.0]);
        engine.set_sample(new_sample.clone()).unwrap();

        assert_eq!(engine.sample(), &TrainingSample::default());
        engine.advance().unwrap();
        // backward still ran against the target of 1.0
        let output = engine.activations().last()[0];
        assert_abs_diff_eq!(
            engine.gradients().unwrap().last()[0],
            2.0 * (output - 1.0),
            epsilon = 1e-12
        );

        engine.advance().unwrap();
        assert_eq!(engine.sample(), &new_sample);
        assert_eq!(&engine.activations()[0], &[-1.0, 2.0]);
    }

    #[test]
    fn test_set_sample_rejects_wrong_length() {
        let mut engine = NetworkEngine::new(&full_cycle_config()).unwrap();
        assert!(matches!(
            engine.set_sample(TrainingSample::new(vec![1.0, 2.0, 3.0], vec![1.0])),
            Err(EngineError::SampleShape { .. })
        ));
    }

    #[test]
    fn test_set_learning_rate() {
        let mut engine = NetworkEngine::new(&full_cycle_config()).unwrap();
        engine.set_learning_rate(0.5).unwrap();
        assert_eq!(engine.learning_rate(), 0.5);
        assert!(engine.set_learning_rate(0.0).is_err());
        assert_eq!(engine.learning_rate(), 0.5);
    }

    #[test]
    fn test_mode_switch_does_not_reset() {
        let mut engine = constant_engine(Mode::ForwardOnly);
        engine.advance().unwrap();
        let loss = engine.loss();

        engine.set_mode(Mode::FullCycle);
        assert_eq!(engine.cycle(), Cycle::FullCycle(FullCyclePhase::Forwarded));
        assert_eq!(engine.loss(), loss);
        assert_eq!(engine.advance().unwrap(), Step::Backward);

        engine.set_mode(Mode::ForwardOnly);
        assert_eq!(engine.cycle(), Cycle::ForwardOnly(ForwardOnlyPhase::Done));
        assert!(engine.gradients().is_none());
    }

    #[test]
    fn test_reconfigure_applies_everything() {
        let mut engine = constant_engine(Mode::ForwardOnly);
        let config = EngineConfig {
            architecture: vec![1, 2],
            sample: TrainingSample::new(vec![0.5], vec![0.0, 1.0]),
            learning_rate: 0.3,
            activation: ActivationKind::Tanh,
            mode: Mode::FullCycle,
            seed: Some(1),
        };
        engine.reconfigure(&config).unwrap();
        assert_eq!(engine.architecture().layers(), &[1, 2]);
        assert_eq!(engine.activation(), ActivationKind::Tanh);
        assert_eq!(engine.learning_rate(), 0.3);
        assert_eq!(engine.mode(), Mode::FullCycle);
        assert_eq!(engine.network(), NetworkEngine::new(&config).unwrap().network());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut engine = constant_engine(Mode::FullCycle);
        let snapshot = engine.snapshot();
        engine.advance().unwrap();
        engine.advance().unwrap();
        engine.advance().unwrap();
        assert_eq!(snapshot.loss, 0.0);
        assert_eq!(snapshot.weights[0][[0, 0]], 0.5);
        assert_ne!(engine.network().weights()[0][[0, 0]], 0.5);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut engine = constant_engine(Mode::FullCycle);
        engine.advance().unwrap();
        engine.advance().unwrap();
        let json = serde_json::to_value(engine.snapshot()).unwrap();

        assert_eq!(json["architecture"], serde_json::json!([2, 3, 1]));
        assert_eq!(json["weights"][0], serde_json::json!([[0.5, 0.5, 0.5], [0.5, 0.5, 0.5]]));
        assert_eq!(json["cycle"]["phase"], "backpropagated");
        assert_eq!(json["activation"], "sigmoid");
        assert_eq!(
            json["description"],
            "Backpropagation done, ready to update weights"
        );
        assert_eq!(json["gradients"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_snapshot_display() {
        let mut engine = constant_engine(Mode::FullCycle);
        engine.advance().unwrap();
        engine.advance().unwrap();
        let text = engine.snapshot().to_string();

        assert!(text.starts_with("Activation: sigmoid"));
        assert!(text.contains("Step: Backpropagation done, ready to update weights (full-cycle)"));
        assert!(text.contains("Input      a=[0.3000, 0.9000]"));
        assert!(text.contains("Hidden 1 -> Output weights Matrix(3x1):"));
        assert!(text.contains("grad="));
    }
}
