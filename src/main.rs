use std::env;

use netstep::{
    ActivationKind, Architecture, EngineConfig, Mode, Network, NetworkEngine, TrainingSample,
};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` directives when they parse, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rust_log = env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_target(false)
        .without_time()
        .init();

    let config = EngineConfig {
        sample: TrainingSample::new(vec![0.3, 0.9], vec![1.0]),
        learning_rate: 0.1,
        activation: ActivationKind::Sigmoid,
        mode: Mode::FullCycle,
        ..EngineConfig::default()
    };
    let architecture = Architecture::new(vec![2, 3, 1])?;
    let network = Network::constant(architecture, 0.5, 0.0);
    let mut engine = NetworkEngine::with_network(&config, network)?;
    println!("{}", engine.snapshot());

    // every hidden neuron: z = 0.5 * 0.3 + 0.5 * 0.9 = 0.6, h = sigmoid(0.6) ~ 0.6457
    // output: z = 3 * 0.5 * h ~ 0.9685, o ~ 0.7248
    // loss = (1 - o)^2 ~ 0.0757
    let loss = engine.forward()?;
    println!("forward: loss = {loss:.6}\n{}", engine.snapshot());

    // dL/do = 2 * (o - 1) ~ -0.5504
    // dL/dh = dL/do * o * (1 - o) * 0.5 ~ -0.0549
    engine.backward()?;
    println!("backward:\n{}", engine.snapshot());

    // w -= lr * delta * a, b -= lr * delta
    engine.update()?;
    println!("update:\n{}", engine.snapshot());

    let loss = engine.forward()?;
    println!("forward again: loss = {loss:.6}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(log_filter(Some("netstep=debug")).to_string(), "netstep=debug");
    }
}
