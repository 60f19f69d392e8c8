use aneat::genomics::{ActivationType, GeneticConfig, Genome, MutationRates};
use aneat::networks::NeuralNetwork;
use aneat::populations::logging::{EvolutionLogger, ReportingLevel, Stats};
use aneat::{Population, PopulationConfig};

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const ERROR_MARGIN: f64 = 0.3;
const MAX_FITNESS: f64 = 16.0;
const MAX_GENERATIONS: usize = 500;

fn evaluate_xor(genome: &Genome) -> f64 {
    let mut network = NeuralNetwork::from(genome);

    let values = [
        ([0.0, 0.0], 0.0),
        ([0.0, 1.0], 1.0),
        ([1.0, 0.0], 1.0),
        ([1.0, 1.0], 0.0),
    ];

    let mut errors = [0.0, 0.0, 0.0, 0.0];
    for (i, (input, output)) in values.iter().enumerate() {
        network.reset();
        if network.activate(input, 5).is_err() {
            return 0.0;
        }
        errors[i] = (network.outputs()[0] - output).abs();
        if errors[i] < ERROR_MARGIN {
            errors[i] = 0.0;
        }
    }

    (4.0 - errors.iter().sum::<f64>()).powf(2.0)
}

fn solved(population: &Population) -> bool {
    population
        .max_fitness()
        .map_or(false, |f| (f - MAX_FITNESS).abs() < f64::EPSILON)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let genetic_config = GeneticConfig {
        input_count: NonZeroUsize::new(2).unwrap(),
        output_count: NonZeroUsize::new(1).unwrap(),
        include_bias: true,
        connection_probability: 1.0,
        bias_connection_probability: 1.0,
        default_activation: ActivationType::SigmoidSteep,
        weight_range_min: -5.0,
        weight_range_max: 5.0,
        cap_weights: true,
        weight_perturbation_strength: 2.5,
        gaussian_weight_perturbation_proportion: 0.5,
        gaussian_weight_perturbation_sigma: 1.0,
        add_node_old_links_priority: 0.5,
        unmatched_coefficient: 1.0,
        weight_difference_coefficient: 0.4,
        mate_only_probability: 0.2,
        mate_averaging_probability: 0.4,
        mate_keep_gene_disabled_probability: 0.75,
        fix_dangling_nodes: true,
        fix_dangling_nodes_strict: true,
        dangling_remove_probability: 0.5,
        complexifying: MutationRates {
            mutate_only: 0.25,
            add_node: 0.03,
            add_link: 0.05,
            weight: 0.8,
            weight_proportion: 0.9,
            toggle_enable: 0.01,
            re_enable: 0.01,
            ..MutationRates::zero()
        },
        simplifying: MutationRates {
            mutate_only: 1.0,
            delete_link: 0.05,
            delete_node: 0.03,
            weight: 0.8,
            weight_proportion: 0.9,
            ..MutationRates::zero()
        },
        ..GeneticConfig::zero()
    };
    let population_config = PopulationConfig {
        size: NonZeroUsize::new(150).unwrap(),
        compatibility_threshold: 3.0,
        max_species_staleness: 15,
        max_population_staleness: 20,
        parents_survival_threshold: 0.2,
        elitism_in_species: true,
        global_phased_search: true,
        mean_complexity_threshold: 20.0,
        min_stale_complexify_generations: 10,
        min_simplify_generations: 10,
        evaluation_threads: NonZeroUsize::new(4).unwrap(),
        ..PopulationConfig::zero()
    };

    match std::env::args().nth(1).as_deref() {
        Some("stress") => stress_test(&genetic_config, &population_config),
        Some("serde") => serde_test(&genetic_config, &population_config),
        _ => logged_run(&genetic_config, &population_config),
    }
}

fn logged_run(genetic_config: &GeneticConfig, population_config: &PopulationConfig) {
    let mut population = match Population::new(population_config.clone(), genetic_config.clone()) {
        Ok(population) => population,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };
    let mut logger = EvolutionLogger::new(ReportingLevel::PopulationChampion);

    for _ in 0..MAX_GENERATIONS {
        let result = population.evolve_with(&evaluate_xor, |p| {
            logger.log(
                p,
                &|g| [g.fitness(), g.complexity() as f64],
                ["fitness", "complexity"],
            )
        });
        if let Err(e) = result {
            error!("{}", e);
            break;
        }
        if solved(&population) {
            break;
        }
    }

    if let Some(log) = logger.iter().last() {
        println!("{}", log);
    }
    match population.champion() {
        Some(champion) if solved(&population) => {
            info!(generation = population.generation(), "solution found");
            println!("{}", champion);
        }
        _ => println!("No solution found in {} generations", MAX_GENERATIONS),
    }
}

fn stress_test(genetic_config: &GeneticConfig, population_config: &PopulationConfig) {
    let generations = Arc::new(Mutex::new(vec![]));
    let population_config = PopulationConfig {
        evaluation_threads: NonZeroUsize::new(1).unwrap(),
        ..population_config.clone()
    };

    const ITERATIONS: usize = 200;
    (0..ITERATIONS).into_par_iter().for_each(|_| {
        let mut population = match Population::new(population_config.clone(), genetic_config.clone()) {
            Ok(population) => population,
            Err(e) => {
                error!("{}", e);
                return;
            }
        };
        for _ in 0..MAX_GENERATIONS {
            if let Err(e) = population.evolve(&evaluate_xor) {
                error!("{}", e);
                break;
            }
            if solved(&population) {
                break;
            }
        }
        let outcome = solved(&population).then(|| population.generation());
        generations.lock().unwrap().push(outcome);
    });

    let generations = generations.lock().unwrap();

    println!(
        "Successful run generation count {:?}, {}% failure rate over {} iterations",
        Stats::from(generations.iter().filter_map(|g| g.map(|g| g as f64))),
        generations.iter().filter(|g| g.is_none()).count() as f64 * 100.0 / ITERATIONS as f64,
        ITERATIONS
    );
}

fn serde_test(genetic_config: &GeneticConfig, population_config: &PopulationConfig) {
    let mut population = match Population::new(population_config.clone(), genetic_config.clone()) {
        Ok(population) => population,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };
    for _ in 0..20 {
        if let Err(e) = population.evolve(&evaluate_xor) {
            error!("{}", e);
            return;
        }
    }

    let saved = ron::to_string(&population).unwrap();
    info!(bytes = saved.len(), generation = population.generation(), "population saved");
    let mut population: Population = ron::from_str(&saved).unwrap();

    for _ in 0..MAX_GENERATIONS {
        if let Err(e) = population.evolve(&evaluate_xor) {
            error!("{}", e);
            break;
        }
        if solved(&population) {
            break;
        }
    }
    match population.champion() {
        Some(champion) if solved(&population) => println!("{}", ron::to_string(champion).unwrap()),
        _ => println!("No solution found after reloading"),
    }
}
