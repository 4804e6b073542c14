use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use forage::headless::replay_checkpoint;
use forage::{ForageConfig, TrainingEnv};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of generations to train
    #[arg(short, long)]
    generations: Option<usize>,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Configuration file (RON); defaults to ./forage.ron if present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for generation dumps and checkpoints
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Genomes per generation
    #[arg(short, long)]
    population: Option<usize>,

    /// Play one episode with a saved genome instead of training
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut config =
        ForageConfig::load_from(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(generations) = args.generations {
        config.training.generations = generations;
    }
    if let Some(seed) = args.seed {
        config.training.seed = Some(seed);
    }
    if let Some(output_dir) = args.output_dir {
        config.training.output_dir = output_dir;
    }
    if let Some(size) = args.population {
        config.population.size = size;
    }

    if args.print_config {
        println!("{}", config.to_ron()?);
        return Ok(());
    }

    if let Some(path) = args.replay {
        let (outcome, fitness) = replay_checkpoint(&config, &path)?;
        println!(
            "fitness {:.2}: score {}, food {}, kills {}, ticks {}, health {:.1}",
            fitness,
            outcome.score,
            outcome.food_eaten,
            outcome.enemies_killed,
            outcome.ticks_survived,
            outcome.final_health
        );
        return Ok(());
    }

    log::info!("Starting Forage training");
    let mut env = TrainingEnv::new(config);
    env.run()
}
