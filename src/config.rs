//! Training configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `forage.ron` file (if exists), or the file passed with `--config`
//! 3. Environment variables prefixed with `FORAGE_`
//!
//! Example environment variable: `FORAGE_POPULATION__SIZE=50`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use forage_neat::{ForagingFitness, PopulationConfig, ReproductionConfig};
use serde::{Deserialize, Serialize};

use crate::headless::ArenaConfig;

/// Main training configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ForageConfig {
    #[serde(default)]
    pub population: PopulationConfig,

    #[serde(default)]
    pub reproduction: ReproductionConfig,

    #[serde(default)]
    pub fitness: ForagingFitness,

    #[serde(default)]
    pub arena: ArenaConfig,

    #[serde(default)]
    pub training: TrainingConfig,
}

/// Run length, seeding and output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of generations to run
    pub generations: usize,
    /// Ticks a genome controls the agent unless it dies first
    pub episode_ticks: u32,
    /// Seed for the run generator; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Directory receiving `generation_<n>.txt` dumps
    pub output_dir: PathBuf,
    /// CSV file receiving one row per generation
    pub fitness_log: PathBuf,
    /// Save the best genome every N generations (0 = never)
    pub checkpoint_interval: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            generations: 100,
            episode_ticks: 1200,
            seed: None,
            output_dir: PathBuf::from("generations"),
            fitness_log: PathBuf::from("best_fitness_log.csv"),
            checkpoint_interval: 10,
        }
    }
}

impl ForageConfig {
    /// Load configuration from `forage.ron` in the working directory (optional)
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `path` if given (must exist), otherwise `forage.ron` (optional)
    /// 3. Environment variables prefixed with `FORAGE_` (highest priority)
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Ron).required(true),
            None => File::with_name("forage").format(FileFormat::Ron).required(false),
        };

        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("population.size", 100_i64)?
            .set_default("population.inputs", 15_i64)?
            .set_default("population.outputs", 8_i64)?
            .set_default("population.wiring_rate", 1.0)?
            .set_default("reproduction.tournament_size", 3_i64)?
            .set_default("training.generations", 100_i64)?
            .set_default("training.episode_ticks", 1200_i64)?
            .set_default("training.output_dir", "generations")?
            .set_default("training.fitness_log", "best_fitness_log.csv")?
            .set_default("training.checkpoint_interval", 10_i64)?
            // Layer 2: Config file
            .add_source(file)
            // Layer 3: Environment variables (FORAGE_TRAINING__SEED, etc.)
            .add_source(
                Environment::with_prefix("FORAGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Render the effective configuration as RON
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("Failed to serialize configuration")
    }
}
