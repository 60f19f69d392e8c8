use crate::populations::PopulationConfig;

use serde::{Deserialize, Serialize};

/// Search regime of a population or species.
///
/// While complexifying, offspring gain structure; while
/// simplifying, the [`simplifying`] mutation rates are used
/// instead, which should favour link and node deletion.
///
/// [`simplifying`]: crate::genomics::GeneticConfig::simplifying
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Complexifying,
    Simplifying,
}

/// Tracks mean complexity over time and decides
/// when to switch between search [`Phase`]s.
///
/// The tracker is initialised by its first observation,
/// which sets the prune threshold to that observation's
/// mean complexity plus [`mean_complexity_threshold`].
///
/// [`mean_complexity_threshold`]: PopulationConfig::mean_complexity_threshold
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseTracker {
    phase: Phase,
    prune_threshold: f64,
    last_transition: usize,
    complexity_sum: f64,
    observations: usize,
}

impl PhaseTracker {
    /// Returns a tracker in the complexifying phase,
    /// with no observations.
    pub fn new() -> PhaseTracker {
        PhaseTracker {
            phase: Phase::Complexifying,
            prune_threshold: 0.0,
            last_transition: 0,
            complexity_sum: 0.0,
            observations: 0,
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the mean complexity above which
    /// simplification may start.
    pub fn prune_threshold(&self) -> f64 {
        self.prune_threshold
    }

    /// Returns the running average of all
    /// observed mean complexities.
    pub fn average_complexity(&self) -> f64 {
        if self.observations == 0 {
            0.0
        } else {
            self.complexity_sum / self.observations as f64
        }
    }

    /// Records the mean complexity observed at `age`,
    /// and switches phase if warranted.
    ///
    /// Complexifying switches to simplifying once the mean
    /// complexity exceeds the prune threshold and `staleness`
    /// exceeds [`min_stale_complexify_generations`].
    ///
    /// Simplifying switches back once at least
    /// [`min_simplify_generations`] have passed since the
    /// last switch, the mean complexity has dropped below the
    /// prune threshold, and the running average complexity
    /// has stopped decreasing. With [`relative_threshold`] the
    /// prune threshold is then raised relative to the current
    /// mean complexity.
    ///
    /// Returns the new phase if a switch took place.
    ///
    /// # Examples
    /// ```
    /// use aneat::PopulationConfig;
    /// use aneat::populations::{Phase, PhaseTracker};
    ///
    /// let config = PopulationConfig {
    ///     mean_complexity_threshold: 2.0,
    ///     ..PopulationConfig::zero()
    /// };
    /// let mut tracker = PhaseTracker::new();
    ///
    /// assert_eq!(tracker.update(0, 3.0, 0, &config), None);
    /// assert_eq!(tracker.prune_threshold(), 5.0);
    /// assert_eq!(tracker.update(1, 6.0, 1, &config), Some(Phase::Simplifying));
    /// ```
    ///
    /// [`min_stale_complexify_generations`]: PopulationConfig::min_stale_complexify_generations
    /// [`min_simplify_generations`]: PopulationConfig::min_simplify_generations
    /// [`relative_threshold`]: PopulationConfig::relative_threshold
    pub fn update(
        &mut self,
        age: usize,
        mean_complexity: f64,
        staleness: usize,
        config: &PopulationConfig,
    ) -> Option<Phase> {
        if self.observations == 0 {
            self.prune_threshold = mean_complexity + config.mean_complexity_threshold;
        }
        let previous_average = if self.observations == 0 {
            mean_complexity
        } else {
            self.average_complexity()
        };
        self.complexity_sum += mean_complexity;
        self.observations += 1;

        match self.phase {
            Phase::Complexifying
                if mean_complexity > self.prune_threshold
                    && staleness > config.min_stale_complexify_generations =>
            {
                self.phase = Phase::Simplifying;
            }
            Phase::Simplifying
                if age.saturating_sub(self.last_transition) >= config.min_simplify_generations
                    && mean_complexity < self.prune_threshold
                    && self.average_complexity() >= previous_average =>
            {
                self.phase = Phase::Complexifying;
                if config.relative_threshold {
                    self.prune_threshold = mean_complexity + config.mean_complexity_threshold;
                }
            }
            _ => return None,
        }
        self.last_transition = age;
        Some(self.phase)
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
