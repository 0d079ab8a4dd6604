// obsgen: replay the attendance log through the observation generators
//
// Usage: obsgen <config-file>

use clap::Parser;
use smartspec::data::World;
use smartspec::observation::{generate_observations, GeneratorRegistry};
use smartspec::{logging, random};
use std::path::PathBuf;
use std::process;
use tracing::info;

/// Generate per-metasensor observation logs from a finished simulation
#[derive(Debug, Parser)]
#[command(name = "obsgen", version)]
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

    let registry = GeneratorRegistry::builtin();
    let mut rng = random::engine(world.window.seed);
    generate_observations(&world, &registry, &mut rng)?;

    info!("observation generation complete");
    Ok(())
}
