//! A Population is a collection of genomes grouped
//! into species that can be evolved using a fitness
//! evaluation function as the selection mechanism.
//!
//! Each call to [`Population::evolve`] runs one generation:
//! evaluation, speciation, fitness sharing, offspring
//! allotment, staleness handling, search phase selection
//! and reproduction, in that order.

mod config;
mod errors;
mod evaluation;
pub mod logging;
mod phase;
mod species;

pub use config::PopulationConfig;
pub use errors::{EvaluationError, EvaluationFailure, EvolutionError};
pub use evaluation::{EvaluationFailurePolicy, EvaluationFunction};
pub use phase::{Phase, PhaseTracker};
pub use species::Species;

use crate::genomics::{ConfigError, GeneticConfig, Genome, InnovationRegistry};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use std::fmt;

/// Fitness multiplier applied to the members of stale species.
const STALE_SPECIES_PENALTY: f64 = 0.01;

/// A population of genomes, their species, and
/// the innovation history they share.
///
/// Supports Serde; the random number generator and the
/// evaluation worker pool are not saved, and are
/// rebuilt (the former from entropy) after loading.
#[derive(Serialize, Deserialize)]
pub struct Population {
    genomes: Vec<Genome>,
    species: Vec<Species>,
    registry: InnovationRegistry,
    compatibility_threshold: f64,
    staleness: usize,
    max_fitness: Option<f64>,
    champion: Option<Genome>,
    generation: usize,
    phase: PhaseTracker,
    population_config: PopulationConfig,
    genetic_config: GeneticConfig,
    #[serde(skip, default = "entropy_rng")]
    rng: StdRng,
    #[serde(skip)]
    pool: Option<ThreadPool>,
}

impl Population {
    /// Creates a new population using the passed configurations.
    ///
    /// # Errors
    /// Returns the first invalid value found in
    /// either configuration.
    ///
    /// # Examples
    /// ```
    /// use aneat::{GeneticConfig, Population, PopulationConfig};
    /// use std::num::NonZeroUsize;
    ///
    /// let population = Population::new(
    ///     PopulationConfig {
    ///         size: NonZeroUsize::new(50).unwrap(),
    ///         ..PopulationConfig::zero()
    ///     },
    ///     GeneticConfig::zero(),
    /// ).unwrap();
    ///
    /// assert_eq!(population.genomes().count(), 50);
    /// assert_eq!(population.generation(), 0);
    /// ```
    pub fn new(
        population_config: PopulationConfig,
        genetic_config: GeneticConfig,
    ) -> Result<Population, ConfigError> {
        population_config.validate()?;
        genetic_config.validate()?;

        let mut rng = match population_config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => entropy_rng(),
        };
        let mut registry = InnovationRegistry::new(&genetic_config);
        let genomes = (0..population_config.size.get())
            .map(|_| Genome::new(&mut registry, &genetic_config, &mut rng))
            .collect();

        Ok(Population {
            genomes,
            species: vec![],
            registry,
            compatibility_threshold: population_config.compatibility_threshold,
            staleness: 0,
            max_fitness: None,
            champion: None,
            generation: 0,
            phase: PhaseTracker::new(),
            population_config,
            genetic_config,
            rng,
            pool: None,
        })
    }

    /// Runs one generation, scoring genomes with `evaluator`.
    ///
    /// # Errors
    /// Returns an error, leaving the population untouched, if an
    /// evaluation fails under [`EvaluationFailurePolicy::Abort`]
    /// or the evaluation worker pool cannot be built.
    ///
    /// # Examples
    /// ```
    /// use aneat::{GeneticConfig, Genome, Population, PopulationConfig};
    /// use std::num::NonZeroUsize;
    ///
    /// let mut population = Population::new(
    ///     PopulationConfig {
    ///         size: NonZeroUsize::new(20).unwrap(),
    ///         compatibility_threshold: 3.0,
    ///         parents_survival_threshold: 0.3,
    ///         ..PopulationConfig::zero()
    ///     },
    ///     GeneticConfig {
    ///         connection_probability: 1.0,
    ///         ..GeneticConfig::zero()
    ///     },
    /// ).unwrap();
    ///
    /// population.evolve(&|g: &Genome| g.complexity() as f64).unwrap();
    ///
    /// assert_eq!(population.generation(), 1);
    /// assert_eq!(population.max_fitness(), Some(1.0));
    /// assert_eq!(population.genomes().count(), 20);
    /// ```
    pub fn evolve<E>(&mut self, evaluator: &E) -> Result<(), EvolutionError>
    where
        E: EvaluationFunction + ?Sized,
    {
        self.evolve_with(evaluator, |_| {})
    }

    /// Runs one generation like [`evolve`], calling `hook` right
    /// after speciation. At that point every evaluated genome
    /// belongs to a species and no offspring exist yet, which
    /// makes it the place to take [`logging`] snapshots.
    ///
    /// [`evolve`]: Population::evolve
    pub fn evolve_with<E, H>(&mut self, evaluator: &E, mut hook: H) -> Result<(), EvolutionError>
    where
        E: EvaluationFunction + ?Sized,
        H: FnMut(&Population),
    {
        if self.genomes.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }
        self.evaluate(evaluator)?;
        self.speciate();
        hook(self);
        self.penalize_stale_species();
        self.adjust_fitness();
        self.compute_spawn_amounts();
        self.handle_population_staleness();
        self.select_phase();
        self.reproduce();

        debug!(
            generation = self.generation,
            species = self.species.len(),
            best_fitness = ?self.max_fitness,
            compatibility_threshold = self.compatibility_threshold,
            phase = ?self.phase.phase(),
            "generation complete"
        );
        self.generation += 1;
        Ok(())
    }

    /// Scores every genome, then sorts them by rank. Nothing
    /// is modified if an evaluation aborts the generation.
    fn evaluate<E: EvaluationFunction + ?Sized>(&mut self, evaluator: &E) -> Result<(), EvolutionError> {
        let pool = match self.pool.take() {
            Some(pool) => pool,
            None => ThreadPoolBuilder::new()
                .num_threads(self.population_config.evaluation_threads.get())
                .build()?,
        };
        let scores = evaluation::score_all(
            &pool,
            &self.genomes,
            evaluator,
            self.population_config.evaluation_deadline,
        );
        self.pool = Some(pool);

        let scored = self.genomes.iter().zip(scores);
        let fitness: Vec<f64> = match self.population_config.evaluation_failure_policy {
            EvaluationFailurePolicy::Abort => scored
                .map(|(genome, score)| {
                    score.map_err(|failure| EvaluationError {
                        genome: genome.id(),
                        failure,
                    })
                })
                .collect::<Result<Vec<f64>, EvaluationError>>()?,
            EvaluationFailurePolicy::AssignFitness(sentinel) => scored
                .map(|(genome, score)| {
                    score.unwrap_or_else(|failure| {
                        warn!(genome = genome.id(), %failure, sentinel, "evaluation failed");
                        sentinel
                    })
                })
                .collect(),
        };
        for (genome, fitness) in self.genomes.iter_mut().zip(fitness) {
            genome.fitness = fitness;
        }

        self.genomes.sort_by(Genome::rank);
        self.champion = self.genomes.first().cloned();
        Ok(())
    }

    /// Moves every genome into the first species whose leader
    /// it is compatible with, founding new species as needed.
    fn speciate(&mut self) {
        let config = &self.population_config;
        if config.aim_for_species_count && self.generation > 1 {
            let step = config.compatibility_threshold_increment;
            if self.species.len() < config.species_count_target {
                self.compatibility_threshold -= step;
            } else if self.species.len() > config.species_count_target {
                self.compatibility_threshold += step;
            }
            self.compatibility_threshold = self.compatibility_threshold.max(step);
        }

        for species in &mut self.species {
            species.clear_members();
        }
        for genome in std::mem::take(&mut self.genomes) {
            let threshold = self.compatibility_threshold;
            let config = &self.genetic_config;
            match self
                .species
                .iter_mut()
                .find(|s| genome.is_compatible_with(s.leader(), config, threshold))
            {
                Some(species) => species.add_member(genome),
                None => {
                    let id = self.registry.new_species_id();
                    self.species.push(Species::new(id, genome));
                }
            }
        }

        for species in &mut self.species {
            species.reset_leader();
        }
        self.species.sort_by(|a, b| Genome::rank(a.leader(), b.leader()));
        // The champion is a member, so its species always survives.
        self.species.retain(|s| !s.is_empty());
    }

    /// Penalizes species whose best fitness has not improved
    /// for too long, except the one holding the champion.
    fn penalize_stale_species(&mut self) {
        let best = self.champion.as_ref().map(Genome::id);
        let max_staleness = self.population_config.max_species_staleness;
        for species in &mut self.species {
            if species.check_staleness(max_staleness) && Some(species.leader().id()) != best {
                trace!(species = species.id(), "penalizing stale species");
                species.scale_fitness(STALE_SPECIES_PENALTY);
            }
        }
    }

    fn adjust_fitness(&mut self) {
        for species in &mut self.species {
            species.compute_adjusted_fitness();
        }
    }

    /// Allots each species a whole number of offspring in
    /// proportion to its members' adjusted fitness, such that
    /// the allotments add up to the population size.
    fn compute_spawn_amounts(&mut self) {
        let member_count: usize = self.species.iter().map(Species::len).sum();
        let total: f64 = self.species.iter().map(Species::total_adjusted_fitness).sum();
        let average = total / member_count as f64;

        let amounts: Vec<f64> = self
            .species
            .iter_mut()
            .map(|s| s.compute_spawn_amounts(average))
            .collect();
        let allotments = allot_offspring(&amounts, self.population_config.size.get());
        for (species, allotment) in self.species.iter_mut().zip(allotments) {
            species.set_spawn_amount(allotment);
        }
    }

    /// Restricts reproduction to the top two species if the
    /// champion's fitness has not improved for too long.
    fn handle_population_staleness(&mut self) {
        let best = self.champion.as_ref().map_or(0.0, Genome::fitness);
        if self.max_fitness.map_or(true, |max| best > max) {
            self.max_fitness = Some(best);
            self.staleness = 0;
        } else {
            self.staleness += 1;
        }

        if self.staleness > self.population_config.max_population_staleness {
            self.staleness = 0;
            let allotments = split_between_top_species(
                self.species.len(),
                self.population_config.size.get(),
            );
            for (species, allotment) in self.species.iter_mut().zip(allotments) {
                species.set_spawn_amount(allotment);
            }
            info!(
                generation = self.generation,
                "population stale, reproducing from top species only"
            );
        }
    }

    fn select_phase(&mut self) {
        let config = &self.population_config;
        if config.global_phased_search {
            let mean_complexity = self.mean_complexity();
            if let Some(phase) =
                self.phase
                    .update(self.generation, mean_complexity, self.staleness, config)
            {
                info!(
                    generation = self.generation,
                    ?phase,
                    mean_complexity,
                    "switching search phase"
                );
            }
        } else if config.species_phased_search {
            for species in &mut self.species {
                species.select_phase(config);
            }
        }
    }

    /// Replaces the population with the offspring of every species.
    fn reproduce(&mut self) {
        let phase = self.phase.phase();
        let mut offspring = Vec::with_capacity(self.population_config.size.get());
        for species in &mut self.species {
            species.select_parents(self.population_config.parents_survival_threshold);
            offspring.extend(species.spawn_offspring(
                &mut self.registry,
                &self.genetic_config,
                &self.population_config,
                phase,
                &mut self.rng,
            ));
        }
        debug_assert_eq!(offspring.len(), self.population_config.size.get());
        self.genomes = offspring;
    }

    /// Returns the mean complexity of all genomes
    /// in the population's species.
    pub fn mean_complexity(&self) -> f64 {
        let (count, total) = self
            .species
            .iter()
            .flat_map(Species::members)
            .fold((0, 0), |(count, total), g| (count + 1, total + g.complexity()));
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Returns an iterator over the genomes awaiting evaluation,
    /// i.e. the offspring of the last generation.
    pub fn genomes(&self) -> impl Iterator<Item = &Genome> {
        self.genomes.iter()
    }

    /// Returns an iterator over the population's species.
    pub fn species(&self) -> impl Iterator<Item = &Species> {
        self.species.iter()
    }

    /// Returns the best genome of the last evaluated
    /// generation, if any generation has been evaluated.
    pub fn champion(&self) -> Option<&Genome> {
        self.champion.as_ref()
    }

    /// Returns the best fitness seen so far.
    pub fn max_fitness(&self) -> Option<f64> {
        self.max_fitness
    }

    /// Returns the number of generations evolved.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns the number of generations since
    /// the best fitness last improved.
    pub fn staleness(&self) -> usize {
        self.staleness
    }

    /// Returns the current compatibility threshold.
    pub fn compatibility_threshold(&self) -> f64 {
        self.compatibility_threshold
    }

    /// Returns the population-wide search phase.
    pub fn phase(&self) -> Phase {
        self.phase.phase()
    }

    /// Returns the population's innovation history.
    pub fn registry(&self) -> &InnovationRegistry {
        &self.registry
    }

    /// Returns the population's configuration.
    pub fn population_config(&self) -> &PopulationConfig {
        &self.population_config
    }

    /// Returns the genetic configuration of the population's genomes.
    pub fn genetic_config(&self) -> &GeneticConfig {
        &self.genetic_config
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Population")
            .field("generation", &self.generation)
            .field("genomes", &self.genomes.len())
            .field("species", &self.species.len())
            .field("max_fitness", &self.max_fitness)
            .field("staleness", &self.staleness)
            .field("phase", &self.phase.phase())
            .finish()
    }
}

fn entropy_rng() -> StdRng {
    StdRng::from_entropy()
}

/// Turns fractional offspring amounts into whole allotments
/// summing to `size`. Fractions are carried from one species
/// to the next; any shortfall goes to the species with the
/// largest allotment, which receives everything if a single
/// extra offspring does not make up the difference.
fn allot_offspring(amounts: &[f64], size: usize) -> Vec<usize> {
    let mut remainder = 0.0;
    let mut allotments: Vec<usize> = amounts
        .iter()
        .map(|&amount| {
            let mut allotment = amount.floor() as usize;
            remainder += amount - amount.floor();
            if remainder >= 1.0 {
                allotment += 1;
                remainder -= 1.0;
            }
            allotment
        })
        .collect();

    let largest = match largest_allotment(&allotments) {
        Some(largest) => largest,
        None => return allotments,
    };
    let total: usize = allotments.iter().sum();
    if total < size {
        allotments[largest] += 1;
        if total + 1 < size {
            allotments.iter_mut().for_each(|a| *a = 0);
            allotments[largest] = size;
        }
    } else if total > size {
        allotments[largest] -= total - size;
    }
    allotments
}

/// Index of the first largest allotment.
fn largest_allotment(allotments: &[usize]) -> Option<usize> {
    allotments
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, usize)>, (i, &a)| match best {
            Some((_, max)) if max >= a => best,
            _ => Some((i, a)),
        })
        .map(|(i, _)| i)
}

/// Allotments giving half of `size` to each of the first
/// two species, or all of it to the first if it is alone.
fn split_between_top_species(species_count: usize, size: usize) -> Vec<usize> {
    let mut allotments = vec![0; species_count];
    match allotments.as_mut_slice() {
        [] => {}
        [only] => *only = size,
        [first, second, ..] => {
            *first = size / 2;
            *second = size - size / 2;
        }
    }
    allotments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{ActivationType, MutationRates};
    use crate::networks::NeuralNetwork;
    use std::num::NonZeroUsize;
    use std::time::Duration;

    const SEED: u64 = 17;

    fn xor_genetic_config() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_count: NonZeroUsize::new(1).unwrap(),
            include_bias: true,
            connection_probability: 1.0,
            bias_connection_probability: 1.0,
            default_activation: ActivationType::SigmoidSteep,
            weight_range_min: -5.0,
            weight_range_max: 5.0,
            cap_weights: true,
            weight_perturbation_strength: 0.5,
            gaussian_weight_perturbation_proportion: 0.5,
            gaussian_weight_perturbation_sigma: 0.5,
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
                delete_link: 0.1,
                delete_node: 0.05,
                weight: 0.8,
                weight_proportion: 0.9,
                ..MutationRates::zero()
            },
            ..GeneticConfig::zero()
        }
    }

    fn xor_population_config() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(150).unwrap(),
            compatibility_threshold: 3.0,
            max_species_staleness: 15,
            max_population_staleness: 20,
            parents_survival_threshold: 0.2,
            elitism_in_species: true,
            evaluation_threads: NonZeroUsize::new(4).unwrap(),
            rng_seed: Some(SEED),
            ..PopulationConfig::zero()
        }
    }

    fn evaluate_xor(genome: &Genome) -> f64 {
        let mut network = NeuralNetwork::from(genome);
        let mut error = 0.0;
        for (inputs, expected) in [([0.0, 0.0], 0.0), ([0.0, 1.0], 1.0), ([1.0, 0.0], 1.0), ([1.0, 1.0], 0.0)] {
            network.reset();
            if network.activate(&inputs, 5).is_err() {
                return 0.0;
            }
            error += (network.outputs()[0] - expected).abs();
        }
        (4.0 - error).powi(2)
    }

    fn spawn_total(population: &Population) -> usize {
        population.species().map(Species::spawn_amount).sum()
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let result = Population::new(
            PopulationConfig {
                parents_survival_threshold: 2.0,
                ..PopulationConfig::zero()
            },
            GeneticConfig::zero(),
        );
        assert!(matches!(result, Err(ConfigError::ProbabilityOutOfRange(_, _))));

        let result = Population::new(
            PopulationConfig::zero(),
            GeneticConfig {
                weight_range_min: 1.0,
                weight_range_max: -1.0,
                ..GeneticConfig::zero()
            },
        );
        assert_eq!(result.err(), Some(ConfigError::InvalidWeightRange(1.0, -1.0)));
    }

    #[test]
    fn allotment_carries_remainders() {
        assert_eq!(allot_offspring(&[1.5, 1.0, 0.5], 3), [1, 1, 1]);
        assert_eq!(allot_offspring(&[2.25, 0.25, 0.25, 0.25], 3), [2, 0, 0, 1]);
    }

    #[test]
    fn allotment_shortfall_goes_to_largest() {
        assert_eq!(allot_offspring(&[0.9, 0.9, 0.9], 3), [0, 2, 1]);
    }

    #[test]
    fn allotment_large_shortfall_goes_entirely_to_largest() {
        assert_eq!(allot_offspring(&[0.0, 0.0], 5), [5, 0]);
        assert_eq!(allot_offspring(&[0.0, 1.0, 0.0], 10), [0, 10, 0]);
    }

    #[test]
    fn allotment_excess_is_trimmed() {
        assert_eq!(allot_offspring(&[2.0, 2.0], 3), [1, 2]);
        assert_eq!(allot_offspring(&[], 3), Vec::<usize>::new());
    }

    #[test]
    fn staleness_split() {
        assert_eq!(split_between_top_species(0, 10), Vec::<usize>::new());
        assert_eq!(split_between_top_species(1, 10), [10]);
        assert_eq!(split_between_top_species(3, 11), [5, 6, 0]);
    }

    #[test]
    fn spawn_amounts_add_up_to_size() {
        let mut population =
            Population::new(xor_population_config(), xor_genetic_config()).unwrap();
        for _ in 0..10 {
            population.evolve(&evaluate_xor).unwrap();
            assert_eq!(spawn_total(&population), 150);
            assert_eq!(population.genomes().count(), 150);
        }
    }

    #[test]
    fn zero_fitness_goes_to_one_species() {
        let mut population =
            Population::new(xor_population_config(), xor_genetic_config()).unwrap();
        population.evolve(&|_: &Genome| 0.0).unwrap();

        assert_eq!(spawn_total(&population), 150);
        assert_eq!(
            population.species().filter(|s| s.spawn_amount() > 0).count(),
            1
        );
        assert_eq!(population.genomes().count(), 150);
    }

    #[test]
    fn stale_population_reproduces_from_top_two_species() {
        let config = PopulationConfig {
            size: NonZeroUsize::new(20).unwrap(),
            compatibility_threshold: 0.0,
            max_population_staleness: 0,
            max_species_staleness: 100,
            parents_survival_threshold: 0.5,
            rng_seed: Some(SEED),
            ..PopulationConfig::zero()
        };
        let mut population = Population::new(config, xor_genetic_config()).unwrap();

        population.evolve(&|_: &Genome| 1.0).unwrap();
        assert_eq!(population.staleness(), 0);
        population.evolve(&|_: &Genome| 1.0).unwrap();

        // Every genome founds its own species at threshold 0.
        assert_eq!(population.species().count(), 20);
        let allotments: Vec<usize> = population.species().map(Species::spawn_amount).collect();
        assert_eq!(allotments[..2], [10, 10]);
        assert!(allotments[2..].iter().all(|&a| a == 0));
        assert_eq!(population.genomes().count(), 20);
    }

    #[test]
    fn best_fitness_never_decreases() {
        let mut population =
            Population::new(xor_population_config(), xor_genetic_config()).unwrap();
        let mut best = 0.0;
        for _ in 0..40 {
            population.evolve(&evaluate_xor).unwrap();
            let max = population.max_fitness().unwrap();
            assert!(max >= best);
            assert!(population.champion().unwrap().fitness() <= max);
            best = max;
        }
        assert!(best > 0.0);
    }

    #[test]
    fn solves_xor() {
        const ERROR_MARGIN: f64 = 0.3;
        let evaluate = |genome: &Genome| {
            let mut network = NeuralNetwork::from(genome);
            let mut error = 0.0;
            for (inputs, expected) in [([0.0, 0.0], 0.0), ([0.0, 1.0], 1.0), ([1.0, 0.0], 1.0), ([1.0, 1.0], 0.0)] {
                network.reset();
                if network.activate(&inputs, 5).is_err() {
                    return 0.0;
                }
                let miss = (network.outputs()[0] - expected).abs();
                if miss >= ERROR_MARGIN {
                    error += miss;
                }
            }
            (4.0 - error).powi(2)
        };
        let genetic_config = GeneticConfig {
            weight_perturbation_strength: 2.5,
            gaussian_weight_perturbation_sigma: 1.0,
            simplifying: MutationRates {
                mutate_only: 1.0,
                delete_link: 0.05,
                delete_node: 0.03,
                weight: 0.8,
                weight_proportion: 0.9,
                ..MutationRates::zero()
            },
            ..xor_genetic_config()
        };
        let population_config = PopulationConfig {
            global_phased_search: true,
            mean_complexity_threshold: 20.0,
            min_stale_complexify_generations: 10,
            min_simplify_generations: 10,
            rng_seed: Some(0),
            ..xor_population_config()
        };
        let mut population = Population::new(population_config, genetic_config).unwrap();

        let mut best = 0.0;
        let mut solved = false;
        for _ in 0..500 {
            population.evolve(&evaluate).unwrap();
            let max = population.max_fitness().unwrap();
            assert!(max >= best);
            best = max;
            if (max - 16.0).abs() < 1e-9 {
                solved = true;
                break;
            }
        }
        assert!(solved, "best fitness {} after {} generations", best, population.generation());
    }

    #[test]
    fn speciation_keeps_champion_in_a_species() {
        let mut population =
            Population::new(xor_population_config(), xor_genetic_config()).unwrap();
        for _ in 0..10 {
            population
                .evolve_with(&evaluate_xor, |p| {
                    let champion = p.champion().unwrap().id();
                    assert!(p.species().all(|s| !s.is_empty()));
                    assert_eq!(
                        p.species()
                            .filter(|s| s.members().any(|g| g.id() == champion))
                            .count(),
                        1
                    );
                })
                .unwrap();
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let run = || {
            let mut population =
                Population::new(xor_population_config(), xor_genetic_config()).unwrap();
            (0..5)
                .map(|_| {
                    population.evolve(&evaluate_xor).unwrap();
                    population.champion().unwrap().clone()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn species_count_targeting_moves_threshold() {
        let config = PopulationConfig {
            aim_for_species_count: true,
            species_count_target: 1000,
            compatibility_threshold_increment: 0.5,
            ..xor_population_config()
        };
        let mut population = Population::new(config, xor_genetic_config()).unwrap();
        for _ in 0..10 {
            population.evolve(&evaluate_xor).unwrap();
        }
        // Too few species: the threshold drops to its floor.
        assert_eq!(population.compatibility_threshold(), 0.5);
    }

    #[test]
    fn hook_sees_speciated_population() {
        let mut population =
            Population::new(xor_population_config(), xor_genetic_config()).unwrap();
        let mut sizes = vec![];
        population
            .evolve_with(&evaluate_xor, |p| {
                sizes.push(p.species().map(Species::len).sum::<usize>());
                assert_eq!(p.genomes().count(), 0);
            })
            .unwrap();
        assert_eq!(sizes, [150]);
    }

    #[test]
    fn aborted_evaluation_leaves_population_untouched() {
        let config = PopulationConfig {
            evaluation_failure_policy: EvaluationFailurePolicy::Abort,
            ..xor_population_config()
        };
        let mut population = Population::new(config, xor_genetic_config()).unwrap();
        let ids: Vec<usize> = population.genomes().map(Genome::id).collect();
        let target = ids[3];

        let result = population.evolve(&|g: &Genome| {
            if g.id() == target {
                panic!("evaluation blew up");
            }
            1.0
        });

        match result {
            Err(EvolutionError::Evaluation(EvaluationError { genome, failure })) => {
                assert_eq!(genome, target);
                assert_eq!(failure, EvaluationFailure::Panicked("evaluation blew up".to_string()));
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(population.generation(), 0);
        assert_eq!(population.genomes().map(Genome::id).collect::<Vec<_>>(), ids);
        assert!(population.genomes().all(|g| g.fitness() == 0.0));
        assert!(population.champion().is_none());
    }

    #[test]
    fn failed_evaluations_get_sentinel_fitness() {
        let config = PopulationConfig {
            evaluation_failure_policy: EvaluationFailurePolicy::AssignFitness(0.5),
            ..xor_population_config()
        };
        let mut population = Population::new(config, xor_genetic_config()).unwrap();

        population.evolve(&|_: &Genome| f64::NAN).unwrap();

        assert_eq!(population.max_fitness(), Some(0.5));
        assert_eq!(population.generation(), 1);
    }

    #[test]
    fn deadline_overruns_abort() {
        let config = PopulationConfig {
            size: NonZeroUsize::new(4).unwrap(),
            evaluation_deadline: Some(Duration::from_millis(1)),
            evaluation_failure_policy: EvaluationFailurePolicy::Abort,
            ..xor_population_config()
        };
        let mut population = Population::new(config, xor_genetic_config()).unwrap();

        let result = population.evolve(&|_: &Genome| {
            std::thread::sleep(Duration::from_millis(20));
            1.0
        });
        assert!(matches!(
            result,
            Err(EvolutionError::Evaluation(EvaluationError {
                failure: EvaluationFailure::DeadlineExceeded(_),
                ..
            }))
        ));
    }

    #[test]
    fn global_phases_switch() {
        let config = PopulationConfig {
            size: NonZeroUsize::new(30).unwrap(),
            global_phased_search: true,
            mean_complexity_threshold: -1.0,
            min_simplify_generations: 1000,
            ..xor_population_config()
        };
        let mut population = Population::new(config, xor_genetic_config()).unwrap();
        let constant = |_: &Genome| 1.0;

        population.evolve(&constant).unwrap();
        assert_eq!(population.phase(), Phase::Complexifying);

        // No improvement: the population is stale and
        // already more complex than the prune threshold.
        population.evolve(&constant).unwrap();
        assert_eq!(population.phase(), Phase::Simplifying);

        // Simplifying offspring are mutated clones that never grow.
        let largest = population
            .species()
            .flat_map(Species::members)
            .map(Genome::complexity)
            .max()
            .unwrap();
        assert!(population.genomes().all(|g| g.complexity() <= largest));
    }

    #[test]
    fn serde_round_trip() {
        let mut population =
            Population::new(xor_population_config(), xor_genetic_config()).unwrap();
        for _ in 0..3 {
            population.evolve(&evaluate_xor).unwrap();
        }

        let serialized = ron::to_string(&population).unwrap();
        let mut loaded: Population = ron::from_str(&serialized).unwrap();

        assert_eq!(loaded.generation(), 3);
        assert_eq!(loaded.max_fitness(), population.max_fitness());
        assert_eq!(loaded.champion(), population.champion());
        assert_eq!(loaded.registry().link_count(), population.registry().link_count());
        assert!(loaded.genomes().eq(population.genomes()));

        loaded.evolve(&evaluate_xor).unwrap();
        assert_eq!(loaded.generation(), 4);
        assert_eq!(loaded.genomes().count(), 150);
    }
}
