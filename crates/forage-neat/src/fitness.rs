//! Fitness functions for finalizing an episode
//!
//! The host reports what happened during an episode; a fitness function turns
//! that outcome into the scalar the reproduction pass selects on.

use serde::{Deserialize, Serialize};

use crate::genome::Genome;

/// What the agent achieved while a genome was in control
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    pub score: u32,
    pub food_eaten: u32,
    pub enemies_killed: u32,
    pub ticks_survived: u32,
    pub final_health: f64,
}

/// Trait for fitness evaluation functions
pub trait FitnessFunction: Send + Sync {
    /// Evaluate an episode outcome; never negative
    fn evaluate(&self, outcome: &EpisodeOutcome) -> f64;

    /// Get the name of this fitness function
    fn name(&self) -> &str;

    /// Get a description of what this fitness measures
    fn description(&self) -> &str;
}

/// Rewards eating and fighting, with capped bonuses for health and survival
/// and a penalty for agents that idle through the episode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForagingFitness {
    pub food_weight: f64,
    pub kill_weight: f64,
    /// Health at which the health bonus saturates
    pub health_cap: f64,
    pub health_weight: f64,
    /// Ticks at which the survival bonus saturates
    pub survival_cap: f64,
    pub survival_weight: f64,
    pub idle_penalty: f64,
    /// Surviving longer than this without scoring counts as idling
    pub idle_after_ticks: u32,
}

impl ForagingFitness {
    pub fn new() -> Self {
        Self {
            food_weight: 10.0,
            kill_weight: 20.0,
            health_cap: 15.0,
            health_weight: 10.0,
            survival_cap: 900.0,
            survival_weight: 20.0,
            idle_penalty: 80.0,
            idle_after_ticks: 840,
        }
    }
}

impl Default for ForagingFitness {
    fn default() -> Self {
        Self::new()
    }
}

impl FitnessFunction for ForagingFitness {
    fn evaluate(&self, outcome: &EpisodeOutcome) -> f64 {
        let health_share = (outcome.final_health / self.health_cap).min(1.0);
        let survival_share = (outcome.ticks_survived as f64 / self.survival_cap).min(1.0);

        let mut fitness = outcome.food_eaten as f64 * self.food_weight
            + outcome.enemies_killed as f64 * self.kill_weight
            + health_share * self.health_weight
            + survival_share * self.survival_weight;

        let idled = outcome.score == 0 && outcome.food_eaten == 0 && outcome.enemies_killed == 0;
        if idled && outcome.ticks_survived > self.idle_after_ticks {
            fitness -= self.idle_penalty;
        }

        fitness.max(0.0)
    }

    fn name(&self) -> &str {
        "Foraging"
    }

    fn description(&self) -> &str {
        "Food and kills, capped health and survival bonuses, penalty for idling"
    }
}

impl Genome {
    /// Finalize this genome's fitness for the episode and return it
    pub fn finalize_fitness(
        &mut self,
        function: &dyn FitnessFunction,
        outcome: &EpisodeOutcome,
    ) -> f64 {
        self.fitness = function.evaluate(outcome);
        log::debug!(
            "{} fitness {:.2} (food {}, kills {}, ticks {})",
            function.name(),
            self.fitness,
            outcome.food_eaten,
            outcome.enemies_killed,
            outcome.ticks_survived
        );
        self.fitness
    }
}
