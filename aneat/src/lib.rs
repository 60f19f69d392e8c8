//! An implementation of NeuroEvolution of Augmenting Topologies,
//! following the 2002 paper: <http://nn.cs.utexas.edu/keyword?stanley:ec02>,
//! extended with phased search: populations (or individual species)
//! alternate between complexifying, where structure is added, and
//! simplifying, where it is pruned away, driven by the trend of their
//! mean complexity.
//!
//! Genomes are plain values keyed by innovation number, and every
//! evolutionary operator returns a new genome rather than modifying
//! its input. Innovation numbers are shared across a run through an
//! [`InnovationRegistry`](genomics::InnovationRegistry), so that the
//! same structural mutation always receives the same id.
//!
//! Fitness evaluation runs on a worker pool; everything else happens
//! sequentially, and runs seeded through [`PopulationConfig::rng_seed`]
//! are reproducible. Diagnostics are emitted through [`tracing`].
//!
//! # Example usage: Evolution of XOR function approximator
//! ```
//! use aneat::{GeneticConfig, Genome, MutationRates, Population, PopulationConfig};
//! use aneat::networks::NeuralNetwork;
//! use std::num::NonZeroUsize;
//!
//! fn evaluate_xor(genome: &Genome) -> f64 {
//!     let mut network = NeuralNetwork::from(genome);
//!
//!     let values = [
//!         ([0.0, 0.0], 0.0),
//!         ([0.0, 1.0], 1.0),
//!         ([1.0, 0.0], 1.0),
//!         ([1.0, 1.0], 0.0),
//!     ];
//!
//!     let mut error = 0.0;
//!     for (input, output) in values.iter() {
//!         network.reset();
//!         if network.activate(input, 5).is_err() {
//!             return 0.0;
//!         }
//!         error += (network.outputs()[0] - output).abs();
//!     }
//!
//!     (4.0 - error).powf(2.0)
//! }
//!
//! fn main() {
//!     let genetic_config = GeneticConfig {
//!         input_count: NonZeroUsize::new(2).unwrap(),
//!         output_count: NonZeroUsize::new(1).unwrap(),
//!         include_bias: true,
//!         connection_probability: 1.0,
//!         bias_connection_probability: 1.0,
//!         weight_range_min: -5.0,
//!         weight_range_max: 5.0,
//!         cap_weights: true,
//!         weight_perturbation_strength: 0.5,
//!         unmatched_coefficient: 1.0,
//!         weight_difference_coefficient: 0.4,
//!         mate_averaging_probability: 0.4,
//!         fix_dangling_nodes: true,
//!         fix_dangling_nodes_strict: true,
//!         complexifying: MutationRates {
//!             mutate_only: 0.25,
//!             add_node: 0.03,
//!             add_link: 0.05,
//!             weight: 0.8,
//!             weight_proportion: 0.9,
//!             ..MutationRates::zero()
//!         },
//!         ..GeneticConfig::zero()
//!     };
//!
//!     let population_config = PopulationConfig {
//!         size: NonZeroUsize::new(150).unwrap(),
//!         compatibility_threshold: 3.0,
//!         max_species_staleness: 15,
//!         max_population_staleness: 20,
//!         parents_survival_threshold: 0.2,
//!         elitism_in_species: true,
//!         ..PopulationConfig::zero()
//!     };
//!
//!     let mut population = Population::new(population_config, genetic_config).unwrap();
//!     for _ in 0..20 {
//!         if let Err(e) = population.evolve(&evaluate_xor) {
//!             eprintln!("{}", e);
//!             break;
//!         }
//!         if population.max_fitness().map_or(false, |f| (f - 16.0).abs() < 0.1) {
//!             println!("Solution found!: {}", population.champion().unwrap());
//!             break;
//!         }
//!     }
//! }
//! ```

pub mod genomics;
pub mod networks;
pub mod populations;
mod rng;

pub use genomics::{GeneticConfig, Genome, MutationRates};
pub use populations::{Population, PopulationConfig};

/// Innovation number identifying a node or link
/// across every genome of a run.
pub type Innovation = usize;
