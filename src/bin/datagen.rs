// datagen: run the day-by-day simulation over generated entities
//
// Usage: datagen <config-file>

use clap::Parser;
use smartspec::data::World;
use smartspec::simulation::Simulator;
use smartspec::{logging, random};
use std::path::PathBuf;
use std::process;
use tracing::info;

/// Generate the synthetic attendance log from a scenario configuration
#[derive(Debug, Parser)]
#[command(name = "datagen", version)]
struct Cli {
    /// Path to the run configuration file
    config: PathBuf,

    /// Log progress at info level
    #[arg(long)]
    verbose: bool,

    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(logging::level_from_flags(cli.verbose, cli.debug)) {
        eprintln!("failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(&cli) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut world = World::load(&cli.config)?;
    world.load_events()?;
    world.load_people()?;

    let rng = random::engine(world.window.seed);
    let mut simulator = Simulator::new(world, rng)?;
    simulator.run()?;

    info!("simulation complete");
    Ok(())
}
