use std::sync::mpsc;
use std::thread;

use log::debug;

use super::chain_rng;
use super::metropolis::{MetropolisSampler, RunOutcome};
use super::observer::{CancelToken, NoObserver};
use crate::error::Result;
use crate::model::score::Scorer;

/// Runs one independent chain per seed and returns the outcomes in seed order.
///
/// # Behavior
/// - At most `num_cpus` worker threads; seeds are dealt round-robin
/// - Every chain owns a `ChaCha8Rng` seeded from its seed, so each outcome
///   is identical to `sampler.run(&mut chain_rng(seed))`
/// - Nothing is shared between chains but the read-only sampler
/// - `cancel` stops every chain between two iterations
pub fn run_restarts<S>(
	sampler: &MetropolisSampler<'_, S>,
	seeds: &[u64],
	cancel: Option<&CancelToken>,
) -> Result<Vec<RunOutcome>>
where
	S: Scorer + ?Sized,
{
	if seeds.is_empty() {
		return Ok(Vec::new());
	}
	let workers = num_cpus::get().clamp(1, seeds.len());
	debug!("running {} chains on {} threads", seeds.len(), workers);

	let (tx, rx) = mpsc::channel();
	thread::scope(|scope| {
		for worker in 0..workers {
			let tx = tx.clone();
			scope.spawn(move || {
				for (index, &seed) in seeds.iter().enumerate().skip(worker).step_by(workers) {
					let outcome = sampler.run_with(&mut chain_rng(seed), &mut NoObserver, cancel);
					// The receiver outlives every sender.
					let _ = tx.send((index, outcome));
				}
			});
		}
	});
	drop(tx);

	let mut outcomes: Vec<Option<RunOutcome>> = seeds.iter().map(|_| None).collect();
	for (index, outcome) in rx.iter() {
		outcomes[index] = Some(outcome?);
	}
	Ok(outcomes.into_iter().flatten().collect())
}

/// The outcome whose final score is highest.
pub fn best_of(outcomes: &[RunOutcome]) -> Option<&RunOutcome> {
	outcomes.iter().max_by(|a, b| a.score.total_cmp(&b.score))
}
