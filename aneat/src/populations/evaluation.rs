use crate::genomics::Genome;
use crate::populations::EvaluationFailure;

use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// A fitness function over genomes.
///
/// Evaluations run concurrently, so implementors
/// must be shareable between threads. Any
/// `Fn(&Genome) -> f64 + Sync` closure or function
/// qualifies.
///
/// Fitness must be finite and non-negative; anything
/// else counts as a failed evaluation.
pub trait EvaluationFunction: Sync {
    fn evaluate(&self, genome: &Genome) -> f64;
}

impl<F> EvaluationFunction for F
where
    F: Fn(&Genome) -> f64 + Sync,
{
    fn evaluate(&self, genome: &Genome) -> f64 {
        self(genome)
    }
}

/// What a population does when evaluating
/// one of its genomes fails.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum EvaluationFailurePolicy {
    /// Stop the generation and report the failure,
    /// leaving the population untouched.
    Abort,
    /// Log a warning and score the genome with
    /// the given fitness instead.
    AssignFitness(f64),
}

/// Scores every genome on `pool`, returning the results
/// in genome order once all evaluations have finished.
pub(super) fn score_all<E: EvaluationFunction + ?Sized>(
    pool: &ThreadPool,
    genomes: &[Genome],
    evaluator: &E,
    deadline: Option<Duration>,
) -> Vec<Result<f64, EvaluationFailure>> {
    pool.install(|| {
        genomes
            .par_iter()
            .map(|genome| score(genome, evaluator, deadline))
            .collect()
    })
}

fn score<E: EvaluationFunction + ?Sized>(
    genome: &Genome,
    evaluator: &E,
    deadline: Option<Duration>,
) -> Result<f64, EvaluationFailure> {
    let start = Instant::now();
    let fitness = panic::catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(genome)))
        .map_err(|payload| EvaluationFailure::Panicked(panic_message(payload)))?;
    let elapsed = start.elapsed();
    if deadline.map_or(false, |deadline| elapsed > deadline) {
        return Err(EvaluationFailure::DeadlineExceeded(elapsed));
    }
    if !(fitness.is_finite() && fitness >= 0.0) {
        return Err(EvaluationFailure::InvalidFitness(fitness));
    }
    Ok(fitness)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => message.to_string(),
            Err(_) => "unknown panic payload".to_string(),
        },
    }
}
