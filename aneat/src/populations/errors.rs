use std::error::Error;
use std::fmt;
use std::time::Duration;

/// The reason a single fitness evaluation failed.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationFailure {
    /// The evaluation function panicked with the given message.
    Panicked(String),
    /// The evaluation function returned a negative
    /// or non-finite fitness.
    InvalidFitness(f64),
    /// The evaluation took longer than the configured deadline.
    DeadlineExceeded(Duration),
}

/// An error type indicating the failed evaluation
/// of a genome.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationError {
    /// Id of the genome being evaluated.
    pub genome: usize,
    /// What went wrong.
    pub failure: EvaluationFailure,
}

/// An error type indicating a generation could not
/// be evolved. The population is left as it was
/// before the attempt.
#[derive(Debug)]
pub enum EvolutionError {
    /// An evaluation failed under
    /// [`EvaluationFailurePolicy::Abort`].
    ///
    /// [`EvaluationFailurePolicy::Abort`]: crate::populations::EvaluationFailurePolicy::Abort
    Evaluation(EvaluationError),
    /// The evaluation worker pool could not be built.
    ThreadPool(rayon::ThreadPoolBuildError),
    /// There are no genomes to evolve.
    EmptyPopulation,
}

impl fmt::Display for EvaluationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panicked(message) => write!(f, "evaluation panicked: {}", message),
            Self::InvalidFitness(fitness) => write!(f, "evaluation returned invalid fitness {}", fitness),
            Self::DeadlineExceeded(elapsed) => {
                write!(f, "evaluation took {:?}, exceeding its deadline", elapsed)
            }
        }
    }
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "genome {}: {}", self.genome, self.failure)
    }
}

impl fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evaluation(e) => write!(f, "evaluation aborted: {}", e),
            Self::ThreadPool(e) => write!(f, "failed to build evaluation thread pool: {}", e),
            Self::EmptyPopulation => write!(f, "attempted evolution on empty population"),
        }
    }
}

impl Error for EvaluationFailure {}
impl Error for EvaluationError {}

impl Error for EvolutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Evaluation(e) => Some(e),
            Self::ThreadPool(e) => Some(e),
            Self::EmptyPopulation => None,
        }
    }
}

impl From<EvaluationError> for EvolutionError {
    fn from(e: EvaluationError) -> Self {
        Self::Evaluation(e)
    }
}

impl From<rayon::ThreadPoolBuildError> for EvolutionError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(e)
    }
}
