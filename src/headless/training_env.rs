//! Training environment for agent evolution
//!
//! Main training loop: every genome plays one episode, the generation is
//! dumped and logged, and the population is bred into the next generation.

use std::path::Path;

use anyhow::{Context, Result};
use forage_neat::{
    append_fitness_log, run_rng, save_generation_dump, EpisodeOutcome, FitnessFunction,
    GenerationSummary, Genome, Population, RunRng,
};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::ForageConfig;

use super::arena::{ForagingArena, OBSERVATION_SIZE};

/// Main training environment
pub struct TrainingEnv {
    /// Training configuration
    pub config: ForageConfig,
    /// Current generation and its species
    pub population: Population,
    /// Fitness function for finalizing episodes
    fitness: Box<dyn FitnessFunction>,
    /// Run-scoped generator shared by the arena and the engine
    rng: RunRng,
    /// Statistics history
    pub stats_history: Vec<GenerationSummary>,
}

impl TrainingEnv {
    /// Create a new training environment with a fresh population
    pub fn new(config: ForageConfig) -> Self {
        let mut rng = run_rng(config.training.seed);

        if config.population.inputs != OBSERVATION_SIZE {
            log::warn!(
                "Population expects {} inputs but the arena observes {}; missing values read as 0",
                config.population.inputs,
                OBSERVATION_SIZE
            );
        }

        let population =
            Population::new(&config.population, config.reproduction.clone(), &mut rng);
        let fitness = Box::new(config.fitness.clone());

        Self {
            config,
            population,
            fitness,
            rng,
            stats_history: Vec::new(),
        }
    }

    /// Create a progress bar style
    fn progress_style() -> Result<ProgressStyle> {
        Ok(ProgressStyle::default_bar()
            .template(concat!(
                "{spinner:.green} [{elapsed_precise}] ",
                "[{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            ))
            .context("Invalid progress bar template")?
            .progress_chars("█▓░"))
    }

    /// Run the full training loop
    pub fn run(&mut self) -> Result<()> {
        let generations = self.config.training.generations;
        let total_evals = generations as u64 * self.population.target_size as u64;

        let pb = ProgressBar::new(total_evals);
        pb.set_style(Self::progress_style()?);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        pb.println(format!(
            "Starting training: {} generations, {} population, fitness: {}",
            generations,
            self.population.target_size,
            self.fitness.name()
        ));

        for _ in 0..generations {
            let summary = self.run_generation(&pb)?;

            pb.println(format!(
                "Gen {}: best={:.2}, avg={:.2}, species={}, bred={}, cloned={}",
                summary.generation,
                summary.best_fitness,
                summary.average_fitness,
                summary.species_count,
                summary.offspring,
                summary.clones
            ));
        }

        pb.finish_with_message("Training complete!");
        Ok(())
    }

    /// Evaluate, persist and advance one generation
    pub fn run_generation(&mut self, pb: &ProgressBar) -> Result<GenerationSummary> {
        let generation = self.population.generation;
        pb.set_message(format!("generation {}", generation));

        let mode = self.population.evaluation;
        let ticks = self.config.training.episode_ticks;
        for genome in self.population.genomes_mut() {
            let mut arena = ForagingArena::new(&self.config.arena, &mut self.rng);
            let outcome = arena.run_episode(genome, mode, ticks, &mut self.rng);
            genome.finalize_fitness(self.fitness.as_ref(), &outcome);
            pb.inc(1);
        }

        let dump = save_generation_dump(&self.config.training.output_dir, &self.population)
            .context("Failed to save generation dump")?;
        log::info!("Saved generation {} to {}", generation, dump.display());

        let interval = self.config.training.checkpoint_interval;
        if interval > 0 && generation % interval == 0 {
            self.save_checkpoint(pb)?;
        }

        // Logged before breeding so a failed write leaves the generation intact
        append_fitness_log(&self.config.training.fitness_log, &self.population.summary())
            .context("Failed to append fitness log")?;

        let summary = self.population.advance_generation(&mut self.rng);
        self.stats_history.push(summary);
        Ok(summary)
    }

    /// Save the best genome of the evaluated generation
    fn save_checkpoint(&self, pb: &ProgressBar) -> Result<()> {
        let checkpoint_dir = self.config.training.output_dir.join("checkpoints");
        std::fs::create_dir_all(&checkpoint_dir)
            .context("Failed to create checkpoint directory")?;

        if let Some(best) = self.population.best_genome() {
            let file_name = format!("gen_{:04}_best.genome", self.population.generation);
            let path = checkpoint_dir.join(file_name);
            save_genome(&path, best)?;
            pb.println(format!(
                "Saved checkpoint at generation {} (fitness {:.2})",
                self.population.generation, best.fitness
            ));
        }

        Ok(())
    }
}

/// Write a genome checkpoint
pub fn save_genome(path: &Path, genome: &Genome) -> Result<()> {
    let data = bincode_next::serde::encode_to_vec(genome, bincode_next::config::standard())
        .context("Failed to serialize genome")?;
    std::fs::write(path, data).context("Failed to write genome file")?;
    Ok(())
}

/// Read a genome checkpoint
pub fn load_genome(path: &Path) -> Result<Genome> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read genome file {}", path.display()))?;
    let (genome, _) =
        bincode_next::serde::decode_from_slice(&data, bincode_next::config::standard())
            .context("Failed to deserialize genome")?;
    Ok(genome)
}

/// Play one episode with a checkpointed genome and report its outcome
pub fn replay_checkpoint(
    config: &ForageConfig,
    path: &Path,
) -> Result<(EpisodeOutcome, f64)> {
    let mut genome = load_genome(path)?;
    let mut rng = run_rng(config.training.seed);

    let mut arena = ForagingArena::new(&config.arena, &mut rng);
    let outcome = arena.run_episode(
        &genome,
        config.population.evaluation,
        config.training.episode_ticks,
        &mut rng,
    );
    let fitness = genome.finalize_fitness(&config.fitness, &outcome);

    log::info!(
        "Replayed {}: fitness {:.2}, food {}, kills {}, ticks {}",
        path.display(),
        fitness,
        outcome.food_eaten,
        outcome.enemies_killed,
        outcome.ticks_survived
    );
    Ok((outcome, fitness))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::ArenaConfig;
    use forage_neat::PopulationConfig;

    fn quick_config(dir: &Path) -> ForageConfig {
        let mut config = ForageConfig {
            population: PopulationConfig {
                size: 6,
                ..PopulationConfig::default()
            },
            arena: ArenaConfig {
                food_count: 20,
                enemy_count: 3,
                ..ArenaConfig::default()
            },
            ..ForageConfig::default()
        };
        config.training.generations = 2;
        config.training.episode_ticks = 30;
        config.training.seed = Some(42);
        config.training.output_dir = dir.join("generations");
        config.training.fitness_log = dir.join("best_fitness_log.csv");
        config.training.checkpoint_interval = 1;
        config
    }

    #[test]
    fn test_run_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = quick_config(dir.path());
        let mut env = TrainingEnv::new(config.clone());

        env.run().unwrap();

        assert_eq!(env.stats_history.len(), 2);
        assert_eq!(env.population.len(), 6);
        assert_eq!(env.population.generation, 3);
        assert!(config.training.output_dir.join("generation_1.txt").exists());
        assert!(config.training.output_dir.join("generation_2.txt").exists());

        let log = std::fs::read_to_string(&config.training.fitness_log).unwrap();
        assert_eq!(log.lines().count(), 2);
        assert!(log.starts_with("1,"));
    }

    #[test]
    fn test_checkpoint_replays() {
        let dir = tempfile::tempdir().unwrap();
        let config = quick_config(dir.path());
        let mut env = TrainingEnv::new(config.clone());
        let pb = ProgressBar::hidden();

        env.run_generation(&pb).unwrap();

        let checkpoint = config
            .training
            .output_dir
            .join("checkpoints")
            .join("gen_0001_best.genome");
        let genome = load_genome(&checkpoint).unwrap();
        assert_eq!(genome.num_inputs(), OBSERVATION_SIZE);

        let (outcome, fitness) = replay_checkpoint(&config, &checkpoint).unwrap();
        assert!(outcome.ticks_survived <= 30);
        assert!(fitness >= 0.0);
    }

    #[test]
    fn test_failed_log_leaves_population_unadvanced() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quick_config(dir.path());
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        config.training.fitness_log = blocker.join("best_fitness_log.csv");
        let mut env = TrainingEnv::new(config.clone());
        let pb = ProgressBar::hidden();

        assert!(env.run_generation(&pb).is_err());

        assert_eq!(env.population.generation, 1);
        assert_eq!(env.population.len(), 6);
        assert!(env.stats_history.is_empty());
        assert!(config.training.output_dir.join("generation_1.txt").exists());
    }
}
