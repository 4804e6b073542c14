//! Speciation by genetic distance
//!
//! Compatibility distance mixes the share of unmatched genes with the mean
//! weight difference of matched ones. Genomes join the first species whose
//! representative (its first member) is close enough.

use ahash::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::genome::Genome;

/// Weights and threshold of the compatibility distance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompatibilityConfig {
    /// Multiplies the disjoint-gene ratio
    pub c1: f64,
    /// Multiplies the mean weight difference
    pub c2: f64,
    /// Genomes closer than this share a species
    pub threshold: f64,
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self {
            c1: 1.0,
            c2: 1.0,
            threshold: 2.0,
        }
    }
}

impl CompatibilityConfig {
    pub fn distance(&self, a: &Genome, b: &Genome) -> f64 {
        compatibility_distance(a, b, self.c1, self.c2)
    }

    pub fn compatible(&self, a: &Genome, b: &Genome) -> bool {
        self.distance(a, b) < self.threshold
    }
}

/// Genetic distance between two genomes
///
/// `c1 * disjoint / max(len_a, len_b) + c2 * mean |w_a - w_b|` over genes
/// sharing an innovation number. Both terms fall back to 0 when their
/// denominator is empty.
pub fn compatibility_distance(a: &Genome, b: &Genome, c1: f64, c2: f64) -> f64 {
    c1 * disjoint_ratio(a, b) + c2 * mean_weight_difference(a, b)
}

fn disjoint_ratio(a: &Genome, b: &Genome) -> f64 {
    let longer = a.connections().len().max(b.connections().len());
    if longer == 0 {
        return 0.0;
    }

    let innovations_a: HashSet<u64> = a.connections().iter().map(|c| c.innovation_number).collect();
    let innovations_b: HashSet<u64> = b.connections().iter().map(|c| c.innovation_number).collect();
    let disjoint = innovations_a.symmetric_difference(&innovations_b).count();

    disjoint as f64 / longer as f64
}

fn mean_weight_difference(a: &Genome, b: &Genome) -> f64 {
    let weights_b: HashMap<u64, f64> = b
        .connections()
        .iter()
        .map(|c| (c.innovation_number, c.weight))
        .collect();

    let (total, matches) = a
        .connections()
        .iter()
        .filter_map(|c| weights_b.get(&c.innovation_number).map(|w| (c.weight - w).abs()))
        .fold((0.0, 0usize), |(total, count), diff| (total + diff, count + 1));

    if matches == 0 {
        0.0
    } else {
        total / matches as f64
    }
}

/// Cluster of mutually compatible genomes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    /// Members in insertion order; the first one is the representative
    pub members: Vec<Genome>,
    /// Mean member fitness as of the last reproduction pass
    pub average_fitness: f64,
    /// Offspring allotted in the last reproduction pass
    pub offspring_quota: usize,
}

impl Species {
    pub fn new(founder: Genome) -> Self {
        Self {
            members: vec![founder],
            average_fitness: 0.0,
            offspring_quota: 0,
        }
    }

    pub fn representative(&self) -> Option<&Genome> {
        self.members.first()
    }

    /// Mean fitness of the current members (0 when empty)
    pub fn mean_fitness(&self) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        self.members.iter().map(|g| g.fitness).sum::<f64>() / self.members.len() as f64
    }

    pub fn best_fitness(&self) -> f64 {
        self.members
            .iter()
            .map(|g| g.fitness)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Place a genome into the first compatible species, or found a new one
/// Returns the index of the species it joined
pub fn add_to_species(
    species: &mut Vec<Species>,
    genome: Genome,
    config: &CompatibilityConfig,
) -> usize {
    let found = species.iter().position(|s| {
        s.representative()
            .is_some_and(|representative| config.compatible(&genome, representative))
    });

    match found {
        Some(index) => {
            species[index].members.push(genome);
            index
        }
        None => {
            species.push(Species::new(genome));
            species.len() - 1
        }
    }
}
