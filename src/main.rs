//! Headless trainer: evolves runners at a fixed frame time and logs every generation.
//!
//! Usage:
//!   RUST_LOG=info sprinter --generations 50 --seed 7 --store runs/a

use clap::Parser;
use sprinter::{constants::SPRINTER_MS_PER_FRAME, Config, EvolutionTarget, Simulation};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "sprinter")]
#[command(about = "Evolve feedforward networks to play an endless runner")]
struct Args {
    /// JSON config file, flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Generations to run
    #[arg(long, default_value_t = 100)]
    generations: usize,

    /// Stop early once the best-ever fitness reaches this
    #[arg(long)]
    target_fitness: Option<f64>,

    #[arg(long)]
    population: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Directory for checkpoint.json and best_weights.json
    #[arg(long)]
    store: Option<PathBuf>,

    /// Ticks before a generation's survivors are retired
    #[arg(long)]
    max_ticks: Option<usize>,

    /// Milliseconds per simulated tick
    #[arg(long, default_value_t = SPRINTER_MS_PER_FRAME)]
    delta: f64,
}

fn config(args: &Args) -> sprinter::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(population) = args.population {
        config.population_size = population;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.store.is_some() {
        config.store = args.store.clone();
    }
    if let Some(ticks) = args.max_ticks {
        config.max_generation_ticks = ticks;
    }
    Ok(config)
}

fn run(args: &Args) -> sprinter::Result<()> {
    let mut sim = Simulation::new(config(args)?)?;
    let stop = sim.generation() + args.generations;
    info!(
        generation = sim.generation(),
        population = sim.config().population_size,
        "training"
    );

    while sim.generation() < stop {
        let target = EvolutionTarget::Generation(sim.generation() + 1);
        for stats in sim.evolve(target, args.delta)? {
            println!(
                "gen {:>5}  best {:>10.2}  avg {:>10.2}  best-ever {:>10.2}  high score {:>8.0}",
                stats.generation,
                stats.best_fitness,
                stats.average_fitness,
                stats.best_ever,
                sim.high_score()
            );
        }
        if args
            .target_fitness
            .is_some_and(|t| sim.best_fitness().is_some_and(|f| f >= t))
        {
            info!(generation = sim.generation(), "target fitness reached");
            break;
        }
    }

    sim.save()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
