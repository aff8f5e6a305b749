#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs arena rounds against the reference world.
//!
//! Settlement reports are printed to stdout as JSON lines; logs go to stderr.

mod demo;

use std::{
    cell::Cell,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use arena_rounds_core::{ArenaWorld, ManualTickClock, ManualWallClock};
use arena_rounds_system_roster::{OfflineFeed, SettlementReport};
use arena_rounds_system_round::{RoundConfig, RoundMachine, RoundState};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Headless arena round driver.
#[derive(Debug, Parser)]
#[command(name = "arena-rounds", version, about = "Runs arena rounds headlessly")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run rounds on the demo arena and print settlement reports
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Number of rounds to settle before exiting
    #[arg(long, default_value_t = 1)]
    rounds: usize,
    /// JSON file overriding the default round configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed replacing the configured one
    #[arg(long)]
    seed: Option<u64>,
    /// Simulated wall-clock milliseconds per host frame
    #[arg(long, default_value_t = 50)]
    frame_ms: u64,
    /// Frames to simulate before giving up
    #[arg(long, default_value_t = 2_000_000)]
    max_frames: u64,
}

/// Entry point for the arena rounds command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }

    let mut world = demo::arena_world();
    let ticks = ManualTickClock::new();
    let wall = ManualWallClock::new();
    let settled = Rc::new(Cell::new(0_usize));
    let sink = {
        let settled = Rc::clone(&settled);
        move |report: SettlementReport| {
            match serde_json::to_string(&report) {
                Ok(line) => println!("{line}"),
                Err(error) => warn!(%error, "failed to encode settlement report"),
            }
            settled.set(settled.get() + 1);
        }
    };

    let mut machine = RoundMachine::new(
        config,
        ticks.clone(),
        wall.clone(),
        Box::new(OfflineFeed),
        Box::new(sink),
    )
    .context("invalid round configuration")?;
    info!(seed = machine.seed(), "round machine ready");
    machine.start(&world).context("arena could not start")?;

    let frame = Duration::from_millis(args.frame_ms.max(1));
    let mut events = Vec::new();
    let mut frames = 0_u64;
    while settled.get() < args.rounds || machine.state() != RoundState::Idle {
        if frames >= args.max_frames {
            machine.stop(&mut world);
            bail!(
                "gave up after {frames} frames with {} of {} rounds settled",
                settled.get(),
                args.rounds
            );
        }
        frames += 1;
        wall.advance(frame);

        if world.is_paused() {
            machine.update(&mut world);
            continue;
        }
        events.clear();
        world.step(&mut events);
        ticks.set(world.tick_index());
        machine.tick(&mut world, &events);
    }

    machine.stop(&mut world);
    info!(
        rounds = settled.get(),
        frames,
        ticks = world.tick_index(),
        "run complete"
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RoundConfig> {
    let Some(path) = path else {
        return Ok(RoundConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}
