use crate::genomics::{check_probability, ConfigError};
use crate::populations::EvaluationFailurePolicy;

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;
use std::time::Duration;

/// Configuration data for population generation
/// and evolution.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]; [`validate`]
/// rejects those that are not.
///
/// [`validate`]: PopulationConfig::validate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Size of the population.
    pub size: NonZeroUsize,
    /// Initial compatibility threshold, below which genomes
    /// are considered as belonging to the same species.
    pub compatibility_threshold: f64,
    /// Whether the compatibility threshold is adjusted
    /// each generation to approach [`species_count_target`].
    ///
    /// [`species_count_target`]: PopulationConfig::species_count_target
    pub aim_for_species_count: bool,
    /// Desired number of species.
    pub species_count_target: usize,
    /// Step by which the compatibility threshold is adjusted,
    /// and its lowest possible value.
    pub compatibility_threshold_increment: f64,
    /// Number of generations a species' best fitness may go
    /// without improving before its members are penalized.
    pub max_species_staleness: usize,
    /// Number of generations the population's best fitness
    /// may go without improving before reproduction is
    /// restricted to the top two species.
    pub max_population_staleness: usize,
    /// Top % of each species which can participate
    /// in reproduction.
    pub parents_survival_threshold: f64,
    /// Whether each species' leader is copied
    /// as-is to the next generation.
    pub elitism_in_species: bool,
    /// Whether the population alternates between
    /// complexifying and simplifying as a whole.
    pub global_phased_search: bool,
    /// Whether each species alternates between complexifying
    /// and simplifying on its own.
    pub species_phased_search: bool,
    /// Amount by which mean complexity must exceed its
    /// starting value before simplification starts.
    pub mean_complexity_threshold: f64,
    /// Whether the prune threshold is re-based on the current
    /// mean complexity each time complexification resumes.
    pub relative_threshold: bool,
    /// Staleness required before simplification may start.
    pub min_stale_complexify_generations: usize,
    /// Minimum number of generations spent simplifying.
    pub min_simplify_generations: usize,
    /// Number of worker threads used for fitness evaluation.
    pub evaluation_threads: NonZeroUsize,
    /// Time a single evaluation may take before it
    /// counts as failed. Evaluations are not interrupted.
    pub evaluation_deadline: Option<Duration>,
    /// What to do when an evaluation fails.
    pub evaluation_failure_policy: EvaluationFailurePolicy,
    /// Seed for the population's random number generator.
    /// Seeded from entropy if `None`.
    pub rng_seed: Option<u64>,
}

impl PopulationConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, false, `None`, or in the case of
    /// `NonZeroUsize`s, 1. Failed evaluations are assigned
    /// a fitness of 0.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// # Examples
    /// ```
    /// use aneat::PopulationConfig;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = PopulationConfig {
    ///     size: NonZeroUsize::new(150).unwrap(),
    ///     compatibility_threshold: 3.0,
    ///     ..PopulationConfig::zero()
    /// };
    /// assert!(config.validate().is_ok());
    /// ```
    pub const fn zero() -> PopulationConfig {
        PopulationConfig {
            // SAFETY: 1 is a valid NonZeroUsize. Replace this with
            // NonZeroUsize::new(1).unwrap() once const Option::unwrap
            // becomes stable.
            size: unsafe { NonZeroUsize::new_unchecked(1) },
            compatibility_threshold: 0.0,
            aim_for_species_count: false,
            species_count_target: 0,
            compatibility_threshold_increment: 0.0,
            max_species_staleness: 0,
            max_population_staleness: 0,
            parents_survival_threshold: 0.0,
            elitism_in_species: false,
            global_phased_search: false,
            species_phased_search: false,
            mean_complexity_threshold: 0.0,
            relative_threshold: false,
            min_stale_complexify_generations: 0,
            min_simplify_generations: 0,
            // SAFETY: see above.
            evaluation_threads: unsafe { NonZeroUsize::new_unchecked(1) },
            evaluation_deadline: None,
            evaluation_failure_policy: EvaluationFailurePolicy::AssignFitness(0.0),
            rng_seed: None,
        }
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    /// Returns the first invalid value found.
    ///
    /// # Examples
    /// ```
    /// use aneat::PopulationConfig;
    /// use aneat::genomics::ConfigError;
    ///
    /// let config = PopulationConfig {
    ///     global_phased_search: true,
    ///     species_phased_search: true,
    ///     ..PopulationConfig::zero()
    /// };
    /// assert_eq!(config.validate(), Err(ConfigError::ConflictingPhasedSearch));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("parents_survival_threshold", self.parents_survival_threshold)?;
        if self.aim_for_species_count {
            if self.species_count_target == 0 {
                return Err(ConfigError::ZeroSpeciesTarget);
            }
            if !(self.compatibility_threshold_increment > 0.0) {
                return Err(ConfigError::NonPositive(
                    "compatibility_threshold_increment",
                    self.compatibility_threshold_increment,
                ));
            }
        }
        if self.global_phased_search && self.species_phased_search {
            return Err(ConfigError::ConflictingPhasedSearch);
        }
        if let EvaluationFailurePolicy::AssignFitness(fitness) = self.evaluation_failure_policy {
            if !(fitness.is_finite() && fitness >= 0.0) {
                return Err(ConfigError::InvalidSentinelFitness(fitness));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_valid() {
        assert_eq!(PopulationConfig::zero().validate(), Ok(()));
    }

    #[test]
    fn species_targeting_needs_target_and_step() {
        let mut config = PopulationConfig {
            aim_for_species_count: true,
            ..PopulationConfig::zero()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroSpeciesTarget));

        config.species_count_target = 10;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositive("compatibility_threshold_increment", 0.0))
        );

        config.compatibility_threshold_increment = 0.1;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_survival_threshold() {
        let config = PopulationConfig {
            parents_survival_threshold: 1.2,
            ..PopulationConfig::zero()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ProbabilityOutOfRange("parents_survival_threshold", 1.2))
        );
    }

    #[test]
    fn rejects_bad_sentinel() {
        let config = PopulationConfig {
            evaluation_failure_policy: EvaluationFailurePolicy::AssignFitness(-1.0),
            ..PopulationConfig::zero()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSentinelFitness(-1.0)));

        let config = PopulationConfig {
            evaluation_failure_policy: EvaluationFailurePolicy::Abort,
            ..PopulationConfig::zero()
        };
        assert_eq!(config.validate(), Ok(()));
    }
}
