//! NEAT neuroevolution core
//!
//! Evolves feed-forward controllers for agents: a population of genomes
//! (node arena plus innovation-numbered connection genes) is evaluated by a
//! host simulation, scored, clustered into species and bred into the next
//! generation.
//!
//! - [`genome`]: node arena, connection genes and structural validity
//! - [`innovation`]: run-wide (source, target) -> innovation number registry
//! - [`mutation`] / [`crossover`]: genetic operators
//! - [`network`]: forward evaluation with decision traces
//! - [`species`]: compatibility distance and speciation
//! - [`population`]: quotas, tournament selection, generational replacement
//! - [`fitness`]: episode outcome scoring
//! - [`persistence`]: generation dumps and the fitness log

pub mod crossover;
pub mod error;
pub mod fitness;
pub mod genome;
pub mod innovation;
pub mod mutation;
pub mod network;
pub mod persistence;
pub mod population;
pub mod rng;
pub mod species;

pub use crossover::crossover;
pub use error::{NeatError, Result};
pub use fitness::{EpisodeOutcome, FitnessFunction, ForagingFitness};
pub use genome::{ActivationFunction, Connection, Genome, HiddenLinks, Node, NodeId, NodeType};
pub use innovation::InnovationRegistry;
pub use mutation::{MutationConfig, MutationReport};
pub use network::{ConnectionTrace, DecisionTrace, EvaluationMode};
pub use persistence::{append_fitness_log, save_generation_dump, write_generation_dump};
pub use population::{GenerationSummary, Population, PopulationConfig, ReproductionConfig};
pub use rng::{run_rng, NeatRng, RunRng};
pub use species::{compatibility_distance, CompatibilityConfig, Species};
