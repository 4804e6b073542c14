//! Population management and generational reproduction
//!
//! A population holds the current generation clustered into species, the
//! run's innovation registry and the reproduction settings. Once the host has
//! finalized every genome's fitness, [`Population::advance_generation`]
//! replaces the whole generation:
//! 1. species average fitness decides each species' offspring quota
//! 2. each quota slot is filled by tournament selection, crossover and mutation
//! 3. rounding shortfall is filled with fresh clones of random members
//! 4. the new genomes are speciated from scratch

use serde::{Deserialize, Serialize};

use crate::crossover::crossover;
use crate::genome::Genome;
use crate::innovation::InnovationRegistry;
use crate::mutation::MutationConfig;
use crate::network::EvaluationMode;
use crate::rng::NeatRng;
use crate::species::{add_to_species, CompatibilityConfig, Species};

/// Shape of the networks and size of the population
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PopulationConfig {
    /// Genomes per generation
    pub size: usize,
    /// Observation values per tick
    pub inputs: usize,
    /// Action values per tick
    pub outputs: usize,
    /// Chance of wiring each (input, output) pair of a fresh genome
    pub wiring_rate: f64,
    pub compatibility: CompatibilityConfig,
    pub evaluation: EvaluationMode,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: 100,
            inputs: 15,
            outputs: 8,
            wiring_rate: 1.0,
            compatibility: CompatibilityConfig::default(),
            evaluation: EvaluationMode::SinglePass,
        }
    }
}

/// Parent selection and offspring mutation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReproductionConfig {
    /// Candidates drawn (with replacement) per parent
    pub tournament_size: usize,
    pub mutation: MutationConfig,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            tournament_size: 3,
            mutation: MutationConfig::default(),
        }
    }
}

/// Statistics of one evaluated generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: usize,
    pub best_fitness: f64,
    pub average_fitness: f64,
    pub species_count: usize,
    /// Genomes bred by crossover for the next generation
    pub offspring: usize,
    /// Genomes cloned to fill the next generation
    pub clones: usize,
}

/// All species of the current generation plus run-wide evolution state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Population {
    pub species: Vec<Species>,
    pub target_size: usize,
    pub generation: usize,
    pub compatibility: CompatibilityConfig,
    pub reproduction: ReproductionConfig,
    pub evaluation: EvaluationMode,
    registry: InnovationRegistry,
}

impl Population {
    /// Create the first generation of freshly wired genomes
    pub fn new<R: NeatRng + ?Sized>(
        config: &PopulationConfig,
        reproduction: ReproductionConfig,
        rng: &mut R,
    ) -> Self {
        let mut population = Self {
            species: Vec::new(),
            target_size: config.size,
            generation: 1,
            compatibility: config.compatibility,
            reproduction,
            evaluation: config.evaluation,
            registry: InnovationRegistry::new(),
        };

        for _ in 0..config.size {
            let genome = Genome::create_network(
                config.inputs,
                config.outputs,
                config.wiring_rate,
                &mut population.registry,
                rng,
            );
            population.add_to_species(genome);
        }

        log::info!(
            "Created population of {} genomes in {} species ({} innovations)",
            population.len(),
            population.species.len(),
            population.registry.counter()
        );
        population
    }

    /// Place a genome into the first compatible species, or found a new one
    pub fn add_to_species(&mut self, genome: Genome) -> usize {
        add_to_species(&mut self.species, genome, &self.compatibility)
    }

    pub fn registry(&self) -> &InnovationRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut InnovationRegistry {
        &mut self.registry
    }

    /// Genomes in species order, then insertion order
    pub fn genomes(&self) -> impl Iterator<Item = &Genome> + '_ {
        self.species.iter().flat_map(|s| s.members.iter())
    }

    pub fn genomes_mut(&mut self) -> impl Iterator<Item = &mut Genome> + '_ {
        self.species.iter_mut().flat_map(|s| s.members.iter_mut())
    }

    pub fn len(&self) -> usize {
        self.species.iter().map(Species::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn best_genome(&self) -> Option<&Genome> {
        self.genomes()
            .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
    }

    /// Best and average fitness of the current generation
    pub fn summary(&self) -> GenerationSummary {
        let count = self.len();
        let (best_fitness, average_fitness) = if count == 0 {
            (0.0, 0.0)
        } else {
            let best = self
                .genomes()
                .map(|g| g.fitness)
                .fold(f64::NEG_INFINITY, f64::max);
            let total: f64 = self.genomes().map(|g| g.fitness).sum();
            (best, total / count as f64)
        };

        GenerationSummary {
            generation: self.generation,
            best_fitness,
            average_fitness,
            species_count: self.species.len(),
            offspring: 0,
            clones: 0,
        }
    }

    /// Recompute species averages and offspring quotas
    ///
    /// Quotas are `floor(average / total * target_size)`. When the averages
    /// sum to zero every species gets an equal share instead.
    pub fn allocate_offspring(&mut self) {
        let total: f64 = self
            .species
            .iter_mut()
            .map(|s| {
                s.average_fitness = s.mean_fitness();
                s.average_fitness
            })
            .sum();

        if self.species.is_empty() {
            return;
        }

        if total > 0.0 && total.is_finite() {
            for species in &mut self.species {
                let share = species.average_fitness / total;
                species.offspring_quota = (share * self.target_size as f64).floor() as usize;
            }
        } else {
            log::warn!(
                "Total species fitness is {}, splitting offspring evenly across {} species",
                total,
                self.species.len()
            );
            let share = self.target_size / self.species.len();
            for species in &mut self.species {
                species.offspring_quota = share;
            }
        }
    }

    /// Replace the evaluated generation with the next one
    ///
    /// Every genome must have its fitness finalized before this is called.
    /// Returns the statistics of the generation that was just replaced.
    pub fn advance_generation<R: NeatRng + ?Sized>(&mut self, rng: &mut R) -> GenerationSummary {
        let mut summary = self.summary();
        log::info!(
            "Generating new population - number of species: {}",
            self.species.len()
        );

        if self.is_empty() {
            log::warn!("Population is empty, nothing to reproduce from");
            return summary;
        }

        self.allocate_offspring();

        let mut next: Vec<Genome> = Vec::with_capacity(self.target_size);
        for species in &self.species {
            if species.is_empty() {
                continue;
            }
            for _ in 0..species.offspring_quota {
                if next.len() >= self.target_size {
                    break;
                }

                let tournament = self.reproduction.tournament_size;
                let parent1 = tournament_select(&species.members, tournament, rng);
                let parent2 = tournament_select(&species.members, tournament, rng);
                let mut child = crossover(parent1, parent2, &mut self.registry, rng);
                child.mutate(&self.reproduction.mutation, &mut self.registry, rng);
                next.push(child);
            }
        }
        let offspring = next.len();

        // Rounding leaves slots empty; fill them with clones
        let donors: Vec<&Species> = self.species.iter().filter(|s| !s.is_empty()).collect();
        while next.len() < self.target_size {
            let species = donors[rng.pick_index(donors.len())];
            let parent = &species.members[rng.pick_index(species.members.len())];
            next.push(parent.clone_fresh());
        }

        summary.offspring = offspring;
        summary.clones = next.len() - offspring;

        self.species.clear();
        for genome in next {
            self.add_to_species(genome);
        }
        self.generation += 1;

        log::info!(
            "New population - generation {}: {} genomes ({} bred, {} cloned) in {} species",
            self.generation,
            self.len(),
            summary.offspring,
            summary.clones,
            self.species.len()
        );
        summary
    }
}

/// Draw `size` members uniformly with replacement and keep the fittest
/// `members` must not be empty
pub fn tournament_select<'a, R: NeatRng + ?Sized>(
    members: &'a [Genome],
    size: usize,
    rng: &mut R,
) -> &'a Genome {
    let mut best = &members[rng.pick_index(members.len())];
    for _ in 1..size {
        let candidate = &members[rng.pick_index(members.len())];
        if candidate.fitness > best.fitness {
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::run_rng;

    fn small_config(size: usize) -> PopulationConfig {
        PopulationConfig {
            size,
            inputs: 4,
            outputs: 2,
            ..PopulationConfig::default()
        }
    }

    #[test]
    fn test_population_config_defaults() {
        let config = PopulationConfig::default();
        assert_eq!(config.size, 100);
        assert_eq!(config.inputs, 15);
        assert_eq!(config.outputs, 8);
        assert_eq!(config.wiring_rate, 1.0);
        assert_eq!(ReproductionConfig::default().tournament_size, 3);
    }

    #[test]
    fn test_new_population_is_fully_speciated() {
        let mut rng = run_rng(Some(1));
        let population =
            Population::new(&small_config(30), ReproductionConfig::default(), &mut rng);

        assert_eq!(population.len(), 30);
        assert_eq!(population.generation, 1);
        assert!(!population.species.is_empty());
        // Fully wired 4x2 genomes register exactly 8 pairs
        assert_eq!(population.registry().counter(), 8);
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let mut rng = run_rng(Some(2));
        let members: Vec<Genome> = (0..5)
            .map(|i| {
                let mut genome = Genome::new(1, 1, 0.0);
                genome.fitness = i as f64;
                genome
            })
            .collect();

        let mut total = 0.0;
        for _ in 0..1000 {
            total += tournament_select(&members, 3, &mut rng).fitness;
        }
        // Uniform picks would average 2.0
        assert!(total / 1000.0 > 2.5);

        let single = [members[3].clone()];
        assert_eq!(tournament_select(&single, 3, &mut rng).fitness, 3.0);
    }

    #[test]
    fn test_offspring_quotas_follow_fitness() {
        let mut rng = run_rng(Some(3));
        let mut population =
            Population::new(&small_config(10), ReproductionConfig::default(), &mut rng);
        let mut genomes: Vec<Genome> = population.genomes().cloned().collect();
        for (i, genome) in genomes.iter_mut().enumerate() {
            genome.fitness = if i < 5 { 3.0 } else { 1.0 };
        }
        population.species = vec![
            Species {
                members: genomes[..5].to_vec(),
                average_fitness: 0.0,
                offspring_quota: 0,
            },
            Species {
                members: genomes[5..].to_vec(),
                average_fitness: 0.0,
                offspring_quota: 0,
            },
        ];

        population.allocate_offspring();

        assert_eq!(population.species[0].average_fitness, 3.0);
        assert_eq!(population.species[0].offspring_quota, 7);
        assert_eq!(population.species[1].offspring_quota, 2);
    }

    #[test]
    fn test_zero_fitness_splits_evenly() {
        let mut rng = run_rng(Some(4));
        let mut population =
            Population::new(&small_config(10), ReproductionConfig::default(), &mut rng);
        let genomes: Vec<Genome> = population.genomes().cloned().collect();
        population.species = genomes
            .chunks(4)
            .map(|chunk| Species {
                members: chunk.to_vec(),
                average_fitness: 0.0,
                offspring_quota: 0,
            })
            .collect();

        population.allocate_offspring();

        assert!(population.species.iter().all(|s| s.offspring_quota == 3));
    }

    #[test]
    fn test_advance_generation_keeps_size() {
        let mut rng = run_rng(Some(5));
        let mut population =
            Population::new(&small_config(25), ReproductionConfig::default(), &mut rng);

        for round in 0..5 {
            for (i, genome) in population.genomes_mut().enumerate() {
                genome.fitness = ((i * 7 + round) % 11) as f64;
            }
            let summary = population.advance_generation(&mut rng);

            assert_eq!(population.len(), 25);
            assert_eq!(summary.offspring + summary.clones, 25);
            assert_eq!(summary.generation, round + 1);
            assert!(population.genomes().all(|g| g.fitness == 0.0));
        }
        assert_eq!(population.generation, 6);
    }

    #[test]
    fn test_summary_statistics() {
        let mut rng = run_rng(Some(6));
        let mut population =
            Population::new(&small_config(4), ReproductionConfig::default(), &mut rng);
        for (genome, fitness) in population.genomes_mut().zip([1.0, 2.0, 3.0, 6.0]) {
            genome.fitness = fitness;
        }

        let summary = population.summary();

        assert_eq!(summary.best_fitness, 6.0);
        assert_eq!(summary.average_fitness, 3.0);
        assert_eq!(population.best_genome().unwrap().fitness, 6.0);
    }

    #[test]
    fn test_population_serialization() {
        let mut rng = run_rng(Some(7));
        let population = Population::new(&small_config(6), ReproductionConfig::default(), &mut rng);

        let serialized =
            bincode_next::serde::encode_to_vec(&population, bincode_next::config::standard())
                .expect("Failed to serialize population");
        let (restored, _): (Population, _) =
            bincode_next::serde::decode_from_slice(&serialized, bincode_next::config::standard())
                .expect("Failed to deserialize population");

        assert_eq!(restored.len(), 6);
        assert_eq!(restored.registry().counter(), population.registry().counter());
        assert_eq!(restored.registry().get(0, 4), population.registry().get(0, 4));
    }
}
