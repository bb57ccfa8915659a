use std::{thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use netstep::{EngineConfig, EngineError, NetworkEngine};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt::format};

use self::args::Args;

mod args;

fn main() -> Result<()> {
    match dotenvy::dotenv() {
        Err(err) if !err.not_found() => return Err(err).context("Failed to load .env"),
        _ => {}
    }

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(format().with_target(false).without_time())
        .init();

    let base = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let config = args.apply(base);
    let mut engine = NetworkEngine::new(&config).context("Invalid engine configuration")?;

    print_snapshot(&engine, args.json)?;
    autoplay(&mut engine, args.steps, args.interval(), |engine| {
        print_snapshot(engine, args.json)
    })?;

    Ok(())
}

/// Advances `engine` up to `steps` times, pausing `interval` between steps and handing the
/// engine to `on_step` after each one. Returns how many steps ran; a finished forward-only
/// cycle ends the run early.
fn autoplay(
    engine: &mut NetworkEngine,
    steps: usize,
    interval: Duration,
    mut on_step: impl FnMut(&NetworkEngine) -> Result<()>,
) -> Result<usize> {
    for n in 1..=steps {
        if n > 1 && !interval.is_zero() {
            thread::sleep(interval);
        }
        match engine.advance() {
            Ok(step) => info!(n, %step, loss = engine.loss(), "advanced"),
            Err(EngineError::CycleFinished) => {
                warn!("forward-only cycle finished, stopping");
                return Ok(n - 1);
            }
            Err(err) => return Err(err.into()),
        }
        on_step(engine)?;
    }
    Ok(steps)
}

fn print_snapshot(engine: &NetworkEngine, json: bool) -> Result<()> {
    let snapshot = engine.snapshot();
    if json {
        println!("{}", serde_json::to_string(&snapshot)?);
    } else {
        println!("{snapshot}");
    }
    Ok(())
}
