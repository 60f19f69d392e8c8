use crate::genomics::{ActivationType, ConfigError};
use crate::populations::Phase;

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Per-offspring mutation probabilities. A [`GeneticConfig`]
/// holds one set for each search [`Phase`].
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationRates {
    /// Chance an offspring is a mutated clone of a single
    /// parent instead of the child of two.
    pub mutate_only: f64,
    /// Chance of a node addition mutation.
    pub add_node: f64,
    /// Chance of a link addition mutation.
    pub add_link: f64,
    /// Chance of a link deletion mutation.
    pub delete_link: f64,
    /// Chance of a node deletion mutation.
    pub delete_node: f64,
    /// Chance of a link re-orientation mutation.
    pub re_orient_link: f64,
    /// Chance of a weight mutation.
    pub weight: f64,
    /// Proportion of enabled links affected by a weight mutation.
    pub weight_proportion: f64,
    /// Chance of a toggle-enable mutation.
    pub toggle_enable: f64,
    /// Chance of a re-enable mutation.
    pub re_enable: f64,
    /// Chance of an activation type mutation.
    pub activation: f64,
    /// Proportion of Hidden and Output nodes affected
    /// by an activation type mutation.
    pub activation_proportion: f64,
}

impl MutationRates {
    /// Returns a set of rates in which nothing ever happens.
    pub const fn zero() -> MutationRates {
        MutationRates {
            mutate_only: 0.0,
            add_node: 0.0,
            add_link: 0.0,
            delete_link: 0.0,
            delete_node: 0.0,
            re_orient_link: 0.0,
            weight: 0.0,
            weight_proportion: 0.0,
            toggle_enable: 0.0,
            re_enable: 0.0,
            activation: 0.0,
            activation_proportion: 0.0,
        }
    }

    fn probabilities(&self) -> [(&'static str, f64); 12] {
        [
            ("mutate_only", self.mutate_only),
            ("add_node", self.add_node),
            ("add_link", self.add_link),
            ("delete_link", self.delete_link),
            ("delete_node", self.delete_node),
            ("re_orient_link", self.re_orient_link),
            ("weight", self.weight),
            ("weight_proportion", self.weight_proportion),
            ("toggle_enable", self.toggle_enable),
            ("re_enable", self.re_enable),
            ("activation", self.activation),
            ("activation_proportion", self.activation_proportion),
        ]
    }
}

/// Configuration data for genome generation
/// and inter-genome operations.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]; [`validate`]
/// rejects those that are not.
///
/// [`validate`]: GeneticConfig::validate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Number of inputs in a genome.
    pub input_count: NonZeroUsize,
    /// Number of outputs in a genome.
    pub output_count: NonZeroUsize,
    /// Whether genomes carry a constant-valued bias node.
    pub include_bias: bool,
    /// Chance that a link between an input-output node pair
    /// is created during initial genome generation.
    pub connection_probability: f64,
    /// Chance that a link between the bias and an output
    /// is created during initial genome generation.
    pub bias_connection_probability: f64,
    /// Activation type of new Hidden and Output nodes.
    pub default_activation: ActivationType,
    /// Activation types available to activation mutations.
    pub allowed_activations: Vec<ActivationType>,
    /// Lower bound of randomly generated weights.
    pub weight_range_min: f64,
    /// Upper bound of randomly generated weights.
    pub weight_range_max: f64,
    /// Whether mutated weights are clamped to the weight range.
    pub cap_weights: bool,
    /// Magnitude of uniform weight perturbations.
    pub weight_perturbation_strength: f64,
    /// Chance a weight perturbation is Gaussian instead of uniform.
    pub gaussian_weight_perturbation_proportion: f64,
    /// Standard deviation of Gaussian weight perturbations.
    pub gaussian_weight_perturbation_sigma: f64,
    /// Chance that a node addition splits one of the oldest
    /// 80% of eligible links instead of any of them.
    pub add_node_old_links_priority: f64,
    /// Whether candidate link categories are randomly
    /// filtered out during link addition.
    pub link_type_filtering: bool,
    /// Chance of keeping hidden -> hidden candidates.
    pub hidden_to_hidden_link_proportion: f64,
    /// Chance of keeping hidden loop candidates.
    pub hidden_loop_link_proportion: f64,
    /// Chance of keeping output loop candidates.
    pub output_loop_link_proportion: f64,
    /// Chance of keeping output -> hidden candidates.
    pub output_to_hidden_link_proportion: f64,
    /// Chance of keeping output -> output candidates.
    pub output_to_output_link_proportion: f64,
    /// Chance of keeping hidden -> hidden candidates whose
    /// source lies further from the outputs than their destination.
    pub backward_hidden_link_proportion: f64,
    /// Chance of keeping hidden -> hidden candidates between
    /// nodes equally far from the outputs.
    pub same_level_hidden_link_proportion: f64,
    /// Weight of unmatched links in compatibility scores.
    pub unmatched_coefficient: f64,
    /// Weight of the mean matched-link weight difference
    /// in compatibility scores.
    pub weight_difference_coefficient: f64,
    /// Weight of the mean activation mismatch in compatibility
    /// scores. Activation mismatches are ignored if zero.
    pub activation_difference_coefficient: f64,
    /// Chance that a crossover offspring is not mutated afterwards.
    pub mate_only_probability: f64,
    /// Chance that matched link weights are averaged during
    /// crossover, instead of copied from a random parent.
    pub mate_averaging_probability: f64,
    /// Chance that a link disabled in only one parent
    /// stays disabled in the offspring.
    pub mate_keep_gene_disabled_probability: f64,
    /// Whether offspring are repaired of dangling nodes.
    pub fix_dangling_nodes: bool,
    /// Whether dangling node repair runs to a fixpoint.
    pub fix_dangling_nodes_strict: bool,
    /// Chance that dangling nodes are removed instead of reconnected.
    pub dangling_remove_probability: f64,
    /// Mutation rates during the complexifying phase.
    pub complexifying: MutationRates,
    /// Mutation rates during the simplifying phase.
    pub simplifying: MutationRates,
}

impl GeneticConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, false, empty, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::GeneticConfig;
    ///
    /// let config = GeneticConfig {
    ///     connection_probability: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// assert!(config.validate().is_ok());
    /// ```
    pub const fn zero() -> GeneticConfig {
        GeneticConfig {
            // SAFETY: 1 is a valid NonZeroUsize. Replace this with
            // NonZeroUsize::new(1).unwrap() once const Option::unwrap
            // becomes stable.
            input_count: unsafe { NonZeroUsize::new_unchecked(1) },
            // SAFETY: see above.
            output_count: unsafe { NonZeroUsize::new_unchecked(1) },
            include_bias: false,
            connection_probability: 0.0,
            bias_connection_probability: 0.0,
            default_activation: ActivationType::SigmoidSteep,
            allowed_activations: Vec::new(),
            weight_range_min: -1.0,
            weight_range_max: 1.0,
            cap_weights: false,
            weight_perturbation_strength: 0.0,
            gaussian_weight_perturbation_proportion: 0.0,
            gaussian_weight_perturbation_sigma: 1.0,
            add_node_old_links_priority: 0.0,
            link_type_filtering: false,
            hidden_to_hidden_link_proportion: 0.0,
            hidden_loop_link_proportion: 0.0,
            output_loop_link_proportion: 0.0,
            output_to_hidden_link_proportion: 0.0,
            output_to_output_link_proportion: 0.0,
            backward_hidden_link_proportion: 0.0,
            same_level_hidden_link_proportion: 0.0,
            unmatched_coefficient: 0.0,
            weight_difference_coefficient: 0.0,
            activation_difference_coefficient: 0.0,
            mate_only_probability: 0.0,
            mate_averaging_probability: 0.0,
            mate_keep_gene_disabled_probability: 0.0,
            fix_dangling_nodes: false,
            fix_dangling_nodes_strict: false,
            dangling_remove_probability: 0.0,
            complexifying: MutationRates::zero(),
            simplifying: MutationRates::zero(),
        }
    }

    /// Returns the mutation rates used during `phase`.
    ///
    /// While simplifying, offspring are always mutated clones of a
    /// single parent and never gain nodes or links through addition,
    /// whatever the [`simplifying`] set holds for those rates.
    ///
    /// [`simplifying`]: GeneticConfig::simplifying
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, MutationRates};
    /// use aneat::populations::Phase;
    ///
    /// let config = GeneticConfig {
    ///     simplifying: MutationRates { add_node: 0.5, delete_link: 0.2, ..MutationRates::zero() },
    ///     ..GeneticConfig::zero()
    /// };
    /// let rates = config.rates(Phase::Simplifying);
    ///
    /// assert_eq!(rates.mutate_only, 1.0);
    /// assert_eq!(rates.add_node, 0.0);
    /// assert_eq!(rates.delete_link, 0.2);
    /// ```
    pub fn rates(&self, phase: Phase) -> MutationRates {
        match phase {
            Phase::Complexifying => self.complexifying.clone(),
            Phase::Simplifying => MutationRates {
                mutate_only: 1.0,
                add_node: 0.0,
                add_link: 0.0,
                ..self.simplifying.clone()
            },
        }
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    /// Returns the first invalid value found.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{ConfigError, GeneticConfig};
    ///
    /// let config = GeneticConfig {
    ///     connection_probability: 1.5,
    ///     ..GeneticConfig::zero()
    /// };
    /// assert_eq!(
    ///     config.validate(),
    ///     Err(ConfigError::ProbabilityOutOfRange("connection_probability", 1.5)),
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("connection_probability", self.connection_probability),
            ("bias_connection_probability", self.bias_connection_probability),
            (
                "gaussian_weight_perturbation_proportion",
                self.gaussian_weight_perturbation_proportion,
            ),
            ("add_node_old_links_priority", self.add_node_old_links_priority),
            ("hidden_to_hidden_link_proportion", self.hidden_to_hidden_link_proportion),
            ("hidden_loop_link_proportion", self.hidden_loop_link_proportion),
            ("output_loop_link_proportion", self.output_loop_link_proportion),
            ("output_to_hidden_link_proportion", self.output_to_hidden_link_proportion),
            ("output_to_output_link_proportion", self.output_to_output_link_proportion),
            ("backward_hidden_link_proportion", self.backward_hidden_link_proportion),
            ("same_level_hidden_link_proportion", self.same_level_hidden_link_proportion),
            ("mate_only_probability", self.mate_only_probability),
            ("mate_averaging_probability", self.mate_averaging_probability),
            (
                "mate_keep_gene_disabled_probability",
                self.mate_keep_gene_disabled_probability,
            ),
            ("dangling_remove_probability", self.dangling_remove_probability),
        ];
        for (name, value) in probabilities
            .into_iter()
            .chain(self.complexifying.probabilities())
            .chain(self.simplifying.probabilities())
        {
            check_probability(name, value)?;
        }

        if !(self.weight_range_min.is_finite()
            && self.weight_range_max.is_finite()
            && self.weight_range_min < self.weight_range_max)
        {
            return Err(ConfigError::InvalidWeightRange(
                self.weight_range_min,
                self.weight_range_max,
            ));
        }
        if !(self.gaussian_weight_perturbation_sigma > 0.0) {
            return Err(ConfigError::NonPositive(
                "gaussian_weight_perturbation_sigma",
                self.gaussian_weight_perturbation_sigma,
            ));
        }
        if self.allowed_activations.is_empty()
            && (self.complexifying.activation > 0.0 || self.simplifying.activation > 0.0)
        {
            return Err(ConfigError::NoAllowedActivations);
        }
        Ok(())
    }
}

/// Rejects probabilities outside `[0, 1]` (including NaN).
pub(crate) fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange(name, value))
    }
}
