use crate::genomics::{GeneticConfig, Genome, InnovationRegistry};
use crate::populations::{Phase, PhaseTracker, PopulationConfig};
use crate::rng::RngExt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use std::fmt;

/// Species are collections of reproductively
/// compatible genomes. Membership is determined by
/// compatibility with the species' _leader_, a copy of
/// its best member from the previous generation.
///
/// Fitness is shared within a species, and each species
/// is allotted a whole number of offspring per generation
/// according to its members' shared fitness.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Species {
    id: usize,
    members: Vec<Genome>,
    leader: Genome,
    total_adjusted_fitness: f64,
    average_adjusted_fitness: f64,
    max_fitness: Option<f64>,
    staleness: usize,
    spawn_amount: usize,
    age: usize,
    phase: PhaseTracker,
}

impl Species {
    /// Creates a new species with the specified id,
    /// led by `founder`. The founder is also its first member.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    /// use aneat::populations::Species;
    ///
    /// let config = GeneticConfig::zero();
    /// let mut registry = InnovationRegistry::new(&config);
    /// let founder = Genome::new(&mut registry, &config, &mut rand::thread_rng());
    /// let species = Species::new(registry.new_species_id(), founder.clone());
    ///
    /// assert_eq!(species.leader().id(), founder.id());
    /// assert_eq!(species.members().count(), 1);
    /// ```
    pub fn new(id: usize, founder: Genome) -> Species {
        Species {
            id,
            leader: founder.clone(),
            members: vec![founder],
            total_adjusted_fitness: 0.0,
            average_adjusted_fitness: 0.0,
            max_fitness: None,
            staleness: 0,
            spawn_amount: 0,
            age: 0,
            phase: PhaseTracker::new(),
        }
    }

    /// Returns the species' id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the species' leader.
    pub fn leader(&self) -> &Genome {
        &self.leader
    }

    /// Returns an iterator over the species' members.
    pub fn members(&self) -> impl Iterator<Item = &Genome> {
        self.members.iter()
    }

    /// Returns the number of members in the species.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the species has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the sum of the members' adjusted fitness.
    pub fn total_adjusted_fitness(&self) -> f64 {
        self.total_adjusted_fitness
    }

    /// Returns the mean of the members' adjusted fitness.
    pub fn average_adjusted_fitness(&self) -> f64 {
        self.average_adjusted_fitness
    }

    /// Returns the highest fitness any leader of
    /// the species has had, if it has been measured.
    pub fn max_fitness(&self) -> Option<f64> {
        self.max_fitness
    }

    /// Returns the number of generations since the
    /// species' best fitness last improved.
    pub fn staleness(&self) -> usize {
        self.staleness
    }

    /// Returns the number of offspring allotted to the species.
    pub fn spawn_amount(&self) -> usize {
        self.spawn_amount
    }

    /// Returns the number of generations the species
    /// has reproduced for.
    pub fn age(&self) -> usize {
        self.age
    }

    /// Returns the species' current search phase.
    /// Only meaningful under per-species phased search.
    pub fn phase(&self) -> Phase {
        self.phase.phase()
    }

    /// Returns the mean complexity of the species' members,
    /// or 0 if there are none.
    pub fn mean_complexity(&self) -> f64 {
        if self.members.is_empty() {
            0.0
        } else {
            self.members.iter().map(|g| g.complexity() as f64).sum::<f64>()
                / self.members.len() as f64
        }
    }

    pub(super) fn add_member(&mut self, genome: Genome) {
        self.members.push(genome);
    }

    pub(super) fn clear_members(&mut self) {
        self.members.clear();
    }

    pub(super) fn set_spawn_amount(&mut self, amount: usize) {
        self.spawn_amount = amount;
    }

    /// Sorts members by rank and makes a copy
    /// of the best one the new leader.
    pub(super) fn reset_leader(&mut self) {
        self.members.sort_by(Genome::rank);
        if let Some(best) = self.members.first() {
            self.leader = best.clone();
        }
    }

    /// Shares fitness among members and updates
    /// the species' totals.
    pub(super) fn compute_adjusted_fitness(&mut self) {
        let size = self.members.len() as f64;
        self.total_adjusted_fitness = 0.0;
        for member in &mut self.members {
            member.adjusted_fitness = member.fitness / size;
            self.total_adjusted_fitness += member.adjusted_fitness;
        }
        self.average_adjusted_fitness = if self.members.is_empty() {
            0.0
        } else {
            self.total_adjusted_fitness / size
        };
    }

    /// Sets each member's fractional offspring amount relative
    /// to the population's `average` adjusted fitness, and
    /// returns the species' total.
    pub(super) fn compute_spawn_amounts(&mut self, average: f64) -> f64 {
        let mut total = 0.0;
        for member in &mut self.members {
            member.spawn_amount = if average > 0.0 {
                member.adjusted_fitness / average
            } else {
                0.0
            };
            total += member.spawn_amount;
        }
        total
    }

    /// Updates staleness from the leader's fitness. Returns
    /// `true`, resetting staleness, once it exceeds `max_staleness`.
    pub(super) fn check_staleness(&mut self, max_staleness: usize) -> bool {
        let fitness = self.leader.fitness;
        if self.max_fitness.map_or(true, |max| fitness > max) {
            self.max_fitness = Some(fitness);
            self.staleness = 0;
        } else {
            self.staleness += 1;
        }
        if self.staleness > max_staleness {
            self.staleness = 0;
            true
        } else {
            false
        }
    }

    /// Multiplies every member's fitness by `factor`.
    pub(super) fn scale_fitness(&mut self, factor: f64) {
        for member in &mut self.members {
            member.fitness *= factor;
        }
    }

    /// Keeps only the top `floor(threshold * len) + 1`
    /// members as parents. Members must be sorted by rank.
    pub(super) fn select_parents(&mut self, threshold: f64) {
        let count = (threshold * self.members.len() as f64 + 1.0).floor() as usize;
        self.members.truncate(count);
    }

    /// Advances the species' own phase tracker.
    pub(super) fn select_phase(&mut self, config: &PopulationConfig) {
        let mean_complexity = self.mean_complexity();
        if let Some(phase) = self.phase.update(self.age, mean_complexity, self.staleness, config) {
            info!(species = self.id, ?phase, mean_complexity, "species switching search phase");
        }
    }

    /// Produces the species' allotted offspring.
    ///
    /// If elitism is enabled, the first offspring is a copy
    /// of the leader. Every other offspring is either a mutated
    /// copy of a random parent, or the crossover of two distinct
    /// random parents, possibly mutated afterwards. Offspring
    /// receive fresh genome ids and zeroed scores.
    pub(super) fn spawn_offspring<R: Rng + ?Sized>(
        &mut self,
        registry: &mut InnovationRegistry,
        genetic_config: &GeneticConfig,
        population_config: &PopulationConfig,
        global_phase: Phase,
        rng: &mut R,
    ) -> Vec<Genome> {
        let phase = if population_config.species_phased_search && !population_config.global_phased_search {
            self.phase.phase()
        } else {
            global_phase
        };
        let rates = genetic_config.rates(phase);

        let mut offspring = Vec::with_capacity(self.spawn_amount);
        if self.spawn_amount > 0 && population_config.elitism_in_species {
            let mut elite = self.leader.clone();
            elite.set_id(registry.new_genome_id());
            elite.reset_scores();
            offspring.push(elite);
        }

        let parents = if self.members.is_empty() {
            std::slice::from_ref(&self.leader)
        } else {
            &self.members[..]
        };
        while offspring.len() < self.spawn_amount {
            let mut child = if parents.len() < 2 || rng.roll(rates.mutate_only) {
                let parent = &parents[rng.gen_range(0..parents.len())];
                let mut child = parent.mutate(registry, genetic_config, &rates, rng);
                child.set_id(registry.new_genome_id());
                child
            } else {
                let first = rng.gen_range(0..parents.len());
                let mut second = rng.gen_range(0..parents.len() - 1);
                if second >= first {
                    second += 1;
                }
                let child =
                    Genome::crossover(&parents[first], &parents[second], registry, genetic_config, rng);
                if rng.roll(genetic_config.mate_only_probability) {
                    child
                } else {
                    child.mutate(registry, genetic_config, &rates, rng)
                }
            };

            if genetic_config.fix_dangling_nodes {
                child.repair_dangling_nodes(
                    registry,
                    genetic_config,
                    genetic_config.dangling_remove_probability,
                    genetic_config.fix_dangling_nodes_strict,
                    rng,
                );
            }
            debug_assert!(
                (genetic_config.fix_dangling_nodes && !genetic_config.fix_dangling_nodes_strict)
                    || child.check_consistency(registry).is_ok(),
                "inconsistent offspring: {:?}",
                child.check_consistency(registry)
            );
            child.reset_scores();
            offspring.push(child);
        }

        self.age += 1;
        offspring
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Species")
            .field("id", &self.id)
            .field("members", &self.members.len())
            .field("leader_fitness", &self.leader.fitness())
            .field("staleness", &self.staleness)
            .field("spawn_amount", &self.spawn_amount)
            .field("age", &self.age)
            .finish()
    }
}
