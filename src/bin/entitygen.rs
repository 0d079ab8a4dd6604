// entitygen: materialize concrete events and people from their archetypes
//
// Usage: entitygen <config-file>

use clap::Parser;
use smartspec::config::GenerationSpec;
use smartspec::data::World;
use smartspec::{generator, logging, random};
use std::path::PathBuf;
use std::process;
use tracing::info;

/// Generate concrete events and people from a scenario configuration
#[derive(Debug, Parser)]
#[command(name = "entitygen", version)]
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
    let events_spec = GenerationSpec::from_config(&world.config, "events")?;
    let people_spec = GenerationSpec::from_config(&world.config, "people")?;

    let mut rng = random::engine(world.window.seed);
    generator::generate_events(&mut world, events_spec, &mut rng)?;
    generator::generate_people(&mut world, people_spec, &mut rng)?;

    info!(
        "wrote {} events and {} people",
        world.events.len(),
        world.people.len()
    );
    Ok(())
}
