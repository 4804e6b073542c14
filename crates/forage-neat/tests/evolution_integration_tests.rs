//! Integration tests for the full evolution loop
//!
//! These drive the public API the way a host does: create a population,
//! evaluate every genome, finalize fitness, persist, and advance.

use forage_neat::{
    append_fitness_log, compatibility_distance, crossover, run_rng, save_generation_dump,
    EpisodeOutcome, EvaluationMode, FitnessFunction, ForagingFitness, Genome, InnovationRegistry,
    NeatRng, NodeType, Population, PopulationConfig, ReproductionConfig,
};

fn scaled_sigmoid(x: f64) -> f64 {
    2.0 / (1.0 + (-4.9 * x).exp()) - 1.0
}

/// Fake episode: reward genomes whose first output is high for a fixed input
fn run_episode(genome: &Genome, mode: EvaluationMode) -> EpisodeOutcome {
    let observation = vec![0.5; genome.num_inputs()];
    let (outputs, _) = genome.evaluate_with(&observation, mode);
    let drive = outputs.first().copied().unwrap_or(0.0).max(0.0);

    EpisodeOutcome {
        score: (drive * 10.0) as u32,
        food_eaten: (drive * 5.0) as u32,
        enemies_killed: 0,
        ticks_survived: 600,
        final_health: 10.0,
    }
}

// ============================================================================
// End-to-End Scenarios
// ============================================================================

#[test]
fn test_single_connection_network_output() {
    let mut registry = InnovationRegistry::new();
    let mut genome = Genome::new(2, 1, 1.0);
    genome.add_connection(&mut registry, 0, 2, 0.5, true).unwrap();

    let (outputs, _) = genome.evaluate(&[1.0, 0.0]);

    assert!((outputs[0] - scaled_sigmoid(0.5)).abs() < 1e-12);
}

#[test]
fn test_add_node_split_scenario() {
    let mut registry = InnovationRegistry::new();
    let mut rng = run_rng(Some(100));
    let mut genome = Genome::new(1, 1, 1.0);
    genome.add_connection(&mut registry, 0, 1, 0.3, true).unwrap();

    assert!(genome.mutate_add_node(&mut registry, &mut rng));

    assert_eq!(genome.connections().len(), 3);
    assert_eq!(genome.enabled_connection_count(), 2);
    assert!(!genome.connections()[0].enabled);
    let hidden = genome.node_ids_of(NodeType::Hidden).next().unwrap();
    assert_eq!(genome.connections()[1].source, 0);
    assert_eq!(genome.connections()[1].target, hidden);
    assert_eq!(genome.connections()[1].weight, 1.0);
    assert_eq!(genome.connections()[2].source, hidden);
    assert_eq!(genome.connections()[2].target, 1);
    assert_eq!(genome.connections()[2].weight, 0.3);
}

#[test]
fn test_idle_episode_scores_zero() {
    let outcome = EpisodeOutcome {
        ticks_survived: 900,
        ..EpisodeOutcome::default()
    };
    let mut genome = Genome::new(1, 1, 1.0);

    assert_eq!(genome.finalize_fitness(&ForagingFitness::new(), &outcome), 0.0);
}

// ============================================================================
// Cross-Genome Properties
// ============================================================================

#[test]
fn test_independent_genomes_share_innovations() {
    let mut registry = InnovationRegistry::new();
    let mut rng = run_rng(Some(101));

    let genomes: Vec<Genome> = (0..20)
        .map(|_| Genome::create_network(6, 4, 0.5, &mut registry, &mut rng))
        .collect();

    for a in &genomes {
        for b in &genomes {
            for gene_a in a.connections() {
                for gene_b in b.connections() {
                    if (gene_a.source, gene_a.target) == (gene_b.source, gene_b.target) {
                        assert_eq!(gene_a.innovation_number, gene_b.innovation_number);
                    }
                }
            }
        }
    }
}

#[test]
fn test_fully_wired_genomes_always_have_signal() {
    let mut registry = InnovationRegistry::new();
    let mut rng = run_rng(Some(102));

    for _ in 0..50 {
        let genome = Genome::create_network(15, 8, 1.0, &mut registry, &mut rng);
        assert!(genome.enabled_connection_count() >= 1);
        assert_eq!(genome.connections().len(), 15 * 8);
    }

    // Sparse wiring still gets its forced connection
    for _ in 0..50 {
        let genome = Genome::create_network(3, 2, 0.0, &mut registry, &mut rng);
        assert_eq!(genome.enabled_connection_count(), 1);
    }
}

#[test]
fn test_crossover_of_evolved_genomes() {
    let mut registry = InnovationRegistry::new();
    let mut rng = run_rng(Some(103));
    let config = ReproductionConfig::default();

    let mut a = Genome::create_network(5, 3, 0.8, &mut registry, &mut rng);
    let mut b = Genome::create_network(5, 3, 0.8, &mut registry, &mut rng);
    for _ in 0..10 {
        a.mutate(&config.mutation, &mut registry, &mut rng);
        b.mutate(&config.mutation, &mut registry, &mut rng);
    }
    a.fitness = 1.0;
    b.fitness = 2.0;

    for _ in 0..20 {
        let child = crossover(&a, &b, &mut registry, &mut rng);
        assert_eq!(child.nodes(), b.nodes());
        assert_eq!(compatibility_distance(&child, &child, 1.0, 1.0), 0.0);
        for gene in child.connections() {
            assert!(child.node(gene.source).is_some());
            assert!(child.node(gene.target).is_some());
        }
    }
}

// ============================================================================
// Generational Loop
// ============================================================================

#[test]
fn test_generational_loop_keeps_invariants() {
    let mut rng = run_rng(Some(104));
    let config = PopulationConfig {
        size: 30,
        inputs: 6,
        outputs: 3,
        ..PopulationConfig::default()
    };
    let mut population = Population::new(&config, ReproductionConfig::default(), &mut rng);
    let fitness = ForagingFitness::new();

    for generation in 1..=8 {
        for genome in population.genomes_mut() {
            let outcome = run_episode(genome, EvaluationMode::SinglePass);
            genome.finalize_fitness(&fitness, &outcome);
        }

        let summary = population.advance_generation(&mut rng);

        assert_eq!(summary.generation, generation);
        assert_eq!(population.len(), 30);
        assert!(summary.best_fitness >= summary.average_fitness);
        assert!(summary.average_fitness >= 0.0);

        for genome in population.genomes() {
            let mut pairs: Vec<_> = genome
                .connections()
                .iter()
                .map(|c| (c.source, c.target))
                .collect();
            let total = pairs.len();
            pairs.sort_unstable();
            pairs.dedup();
            assert_eq!(pairs.len(), total, "duplicate gene in offspring");

            for gene in genome.connections() {
                assert_eq!(
                    population.registry().get(gene.source, gene.target),
                    Some(gene.innovation_number)
                );
            }
        }
    }
}

#[test]
fn test_zero_fitness_generation_still_advances() {
    let mut rng = run_rng(Some(105));
    let config = PopulationConfig {
        size: 12,
        inputs: 3,
        outputs: 2,
        ..PopulationConfig::default()
    };
    let mut population = Population::new(&config, ReproductionConfig::default(), &mut rng);

    let summary = population.advance_generation(&mut rng);

    assert_eq!(summary.best_fitness, 0.0);
    assert_eq!(population.len(), 12);
}

#[test]
fn test_layered_population_runs() {
    let mut rng = run_rng(Some(106));
    let config = PopulationConfig {
        size: 10,
        inputs: 4,
        outputs: 2,
        evaluation: EvaluationMode::Layered,
        ..PopulationConfig::default()
    };
    let mut population = Population::new(&config, ReproductionConfig::default(), &mut rng);

    for _ in 0..3 {
        let mode = population.evaluation;
        for genome in population.genomes_mut() {
            let outcome = run_episode(genome, mode);
            genome.finalize_fitness(&ForagingFitness::new(), &outcome);
        }
        population.advance_generation(&mut rng);
    }

    assert_eq!(population.len(), 10);
}

#[test]
fn test_same_seed_same_run() {
    let config = PopulationConfig {
        size: 15,
        inputs: 4,
        outputs: 2,
        ..PopulationConfig::default()
    };

    let run = |seed: u64| {
        let mut rng = run_rng(Some(seed));
        let mut population = Population::new(&config, ReproductionConfig::default(), &mut rng);
        for _ in 0..3 {
            for genome in population.genomes_mut() {
                genome.fitness = rng.unit_weight() * 10.0;
            }
            population.advance_generation(&mut rng);
        }
        population
            .genomes()
            .flat_map(|g| g.connections().iter().map(|c| (c.innovation_number, c.weight)))
            .collect::<Vec<_>>()
    };

    assert_eq!(run(7), run(7));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_persist_each_generation() {
    let dir = tempfile::tempdir().unwrap();
    let dumps = dir.path().join("generations");
    let log = dir.path().join("best_fitness_log.csv");
    let mut rng = run_rng(Some(107));
    let config = PopulationConfig {
        size: 8,
        inputs: 3,
        outputs: 2,
        ..PopulationConfig::default()
    };
    let mut population = Population::new(&config, ReproductionConfig::default(), &mut rng);
    let fitness = ForagingFitness::new();

    for _ in 0..3 {
        for genome in population.genomes_mut() {
            let outcome = run_episode(genome, EvaluationMode::SinglePass);
            genome.finalize_fitness(&fitness, &outcome);
        }
        save_generation_dump(&dumps, &population).unwrap();
        let summary = population.advance_generation(&mut rng);
        append_fitness_log(&log, &summary).unwrap();
    }

    for generation in 1..=3 {
        let path = dumps.join(format!("generation_{generation}.txt"));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("=== SPECIES 0 ==="));
        assert!(text.contains("--- TOTAL GENOMES: 8 ---"));
    }

    let rows: Vec<String> = std::fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].starts_with("1,"));
    assert!(rows[2].starts_with("3,"));
    assert_eq!(rows[1].split(',').count(), 3);
    assert_eq!(fitness.name(), "Foraging");
}
