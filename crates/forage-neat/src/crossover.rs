//! NEAT crossover
//!
//! Genes are aligned by innovation number. The fitter parent contributes its
//! whole node set and every gene it owns; for genes both parents share, weight
//! and enabled flag come from either parent with equal probability.

use ahash::HashMap;

use crate::genome::{Connection, Genome};
use crate::innovation::InnovationRegistry;
use crate::rng::NeatRng;

/// Crossover two genomes using their stored fitness
///
/// Ties keep `parent1` as the structural parent. The offspring's genes are
/// re-added through [`Genome::add_connection`], so the registry is consulted
/// again and returns the existing innovation numbers. An offspring whose
/// inherited genes are all disabled is returned as is.
pub fn crossover<R: NeatRng + ?Sized>(
    parent1: &Genome,
    parent2: &Genome,
    registry: &mut InnovationRegistry,
    rng: &mut R,
) -> Genome {
    // Make sure the first parent is the fitter one
    let (fitter, other) = if parent2.fitness > parent1.fitness {
        (parent2, parent1)
    } else {
        (parent1, parent2)
    };

    let other_genes: HashMap<u64, &Connection> = other
        .connections()
        .iter()
        .map(|conn| (conn.innovation_number, conn))
        .collect();

    let mut offspring = Genome::with_node_set(fitter);

    for gene in fitter.connections() {
        let chosen = match other_genes.get(&gene.innovation_number) {
            // Matching gene - randomly inherit from either parent
            Some(&matching) => {
                if rng.check_probability(0.5) {
                    gene
                } else {
                    matching
                }
            }
            // Disjoint/excess gene of the fitter parent
            None => gene,
        };

        // Same innovation means same endpoint pair, resolved in the fitter node set
        if let Err(err) = offspring.add_connection(
            registry,
            gene.source,
            gene.target,
            chosen.weight,
            chosen.enabled,
        ) {
            log::warn!(
                "Dropping gene {} during crossover: {}",
                gene.innovation_number,
                err
            );
        }
    }

    offspring
}
