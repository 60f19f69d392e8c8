//! Snapshots of a population's state over the
//! course of its evolution.
//!
//! Snapshots are meant to be taken from the hook of
//! [`Population::evolve_with`], right after speciation,
//! when every evaluated genome belongs to a species.

use super::Population;

use crate::genomics::Genome;

use serde::Serialize;

use std::fmt;

/// Defines different possible reporting levels for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ReportingLevel {
    /// Clones the entire population.
    AllGenomes,
    /// Clones species and their leaders.
    SpeciesChampions,
    /// Clones only the population champion.
    PopulationChampion,
    /// Clones no genomes.
    NoGenomes,
}

/// A snapshot of a population.
#[derive(Clone, Debug, Serialize)]
pub struct Log {
    pub generation: usize,
    pub generation_sample: GenerationMemberRecord,
    pub species_count: usize,
    pub compatibility_threshold: f64,
    pub genome_stats: Vec<(String, Stats)>,
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Log {{\n\
            \tgeneration: {:?}\n\
            \tspecies_count: {:?}\n\
            \tcompatibility_threshold: {:?}\n\
            {}\
            }}",
            &self.generation,
            &self.species_count,
            &self.compatibility_threshold,
            self.genome_stats
                .iter()
                .map(|(name, stats)| format!("\t{}: {:?}\n", name, stats))
                .collect::<Vec<_>>()
                .join("")
        )
    }
}

/// A struct for reporting basic statistical data.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Stats {
    pub maximum: f64,
    pub minimum: f64,
    pub mean: f64,
    pub median: f64,
}

impl Stats {
    /// Returns statistics about numbers in a sequence.
    /// All fields are NaN if the sequence is empty.
    ///
    /// # Examples
    /// ```
    /// use aneat::populations::logging::Stats;
    ///
    /// let stats = Stats::from([-2.0, -1.0, 0.5, 1.0, 1.5].iter().copied());
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    ///
    /// let stats = Stats::from([4.0, 1.0, 3.0, 2.0].iter().copied());
    /// assert_eq!(stats.median, 2.5);
    /// ```
    pub fn from(data: impl Iterator<Item = f64>) -> Stats {
        let mut data: Vec<f64> = data.collect();
        if data.is_empty() {
            return Stats {
                maximum: f64::NAN,
                minimum: f64::NAN,
                mean: f64::NAN,
                median: f64::NAN,
            };
        }
        data.sort_unstable_by(f64::total_cmp);
        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };
        Stats {
            maximum: data[data.len() - 1],
            minimum: data[0],
            mean: data.iter().sum::<f64>() / data.len() as f64,
            median,
        }
    }
}

/// A reporting-level dependant store
/// of genomes from a population.
#[derive(Clone, Debug, Serialize)]
pub enum GenerationMemberRecord {
    /// Species ids, members and staleness.
    Species(Vec<(usize, Vec<Genome>, usize)>),
    /// Only species ids, species leaders, and staleness.
    SpeciesChampions(Vec<(usize, Genome, usize)>),
    /// Only the population champion.
    PopulationChampion(Genome),
    /// Empty.
    None,
}

/// A log of the evolution of a population over time.
#[derive(Clone, Debug, Serialize)]
pub struct EvolutionLogger {
    reporting_level: ReportingLevel,
    logs: Vec<Log>,
}

impl EvolutionLogger {
    /// Returns a logger with the appropiate reporting level.
    ///
    /// # Examples
    /// ```
    /// use aneat::populations::logging::{EvolutionLogger, ReportingLevel};
    ///
    /// let logger = EvolutionLogger::new(ReportingLevel::NoGenomes);
    /// assert_eq!(logger.iter().count(), 0);
    /// ```
    pub fn new(reporting_level: ReportingLevel) -> EvolutionLogger {
        EvolutionLogger {
            reporting_level,
            logs: vec![],
        }
    }

    /// Store a snapshot of a population.
    ///
    /// The `genome_stat_extractor` provides a way of
    /// obtaining arbitrary statistics on the population's
    /// species members, where each statistic is named by
    /// `stat_names`.
    ///
    /// # Examples
    /// ```
    /// use aneat::{GeneticConfig, Genome, Population, PopulationConfig};
    /// use aneat::populations::logging::{EvolutionLogger, ReportingLevel};
    /// use std::num::NonZeroUsize;
    ///
    /// let mut logger = EvolutionLogger::new(ReportingLevel::PopulationChampion);
    /// let mut population = Population::new(
    ///     PopulationConfig {
    ///         size: NonZeroUsize::new(10).unwrap(),
    ///         compatibility_threshold: 3.0,
    ///         parents_survival_threshold: 0.5,
    ///         ..PopulationConfig::zero()
    ///     },
    ///     GeneticConfig {
    ///         connection_probability: 1.0,
    ///         ..GeneticConfig::zero()
    ///     },
    /// ).unwrap();
    ///
    /// population.evolve_with(&|g: &Genome| g.complexity() as f64, |p| {
    ///     logger.log(p, &|g| [g.fitness(), g.complexity() as f64], ["fitness", "complexity"]);
    /// }).unwrap();
    ///
    /// let log = logger.iter().next().unwrap();
    /// assert_eq!(log.generation, 0);
    /// assert_eq!(log.genome_stats[0].1.maximum, 1.0);
    /// ```
    pub fn log<GSE, const N: usize>(
        &mut self,
        population: &Population,
        genome_stat_extractor: &GSE,
        stat_names: [&str; N],
    ) where
        GSE: Fn(&Genome) -> [f64; N],
    {
        let stats: Vec<[f64; N]> = population
            .species()
            .flat_map(|s| s.members())
            .map(genome_stat_extractor)
            .collect();
        let stats = stat_names
            .iter()
            .cloned()
            .map(String::from)
            .zip(unzip_n_vecs(stats.into_iter()))
            .map(|(name, data)| (name, Stats::from(data.into_iter())))
            .collect();
        self.logs.push(Log {
            generation: population.generation(),
            generation_sample: match (self.reporting_level, population.champion()) {
                (ReportingLevel::AllGenomes, _) => GenerationMemberRecord::Species(
                    population
                        .species()
                        .map(|s| (s.id(), s.members().cloned().collect(), s.staleness()))
                        .collect(),
                ),
                (ReportingLevel::SpeciesChampions, _) => GenerationMemberRecord::SpeciesChampions(
                    population
                        .species()
                        .map(|s| (s.id(), s.leader().clone(), s.staleness()))
                        .collect(),
                ),
                (ReportingLevel::PopulationChampion, Some(champion)) => {
                    GenerationMemberRecord::PopulationChampion(champion.clone())
                }
                _ => GenerationMemberRecord::None,
            },
            species_count: population.species().count(),
            compatibility_threshold: population.compatibility_threshold(),
            genome_stats: stats,
        })
    }

    /// Iterate over all logged snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &Log> {
        self.logs.iter()
    }
}

fn unzip_n_vecs<T: Clone, const N: usize>(iter: impl Iterator<Item = [T; N]>) -> Vec<Vec<T>> {
    let mut vecs = vec![Vec::default(); N];
    for items in iter {
        for (vec, item) in vecs.iter_mut().zip(items) {
            vec.push(item);
        }
    }
    vecs
}
