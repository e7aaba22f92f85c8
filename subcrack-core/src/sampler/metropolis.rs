use log::{debug, trace, warn};
use rand::Rng;

use super::config::{SamplerConfig, StartKey};
use super::observer::{CancelToken, NoObserver, Observer};
use super::trajectory::{Snapshot, Trajectory};
use crate::cipher::key::Key;
use crate::error::{CrackError, Result};
use crate::model::score::{Scorer, hamming_distance};

/// Lower clip of the log acceptance ratio.
pub const MIN_LOG_RATIO: f64 = -1000.0;

/// Upper clip of the log acceptance ratio.
pub const MAX_LOG_RATIO: f64 = 1.0;

/// Lifecycle of a sampling run. There is no retry or recovery state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	Initializing,
	Running,
	Terminated,
}

/// `min(1, exp(Δ))` with `Δ = candidate - current` clipped to
/// `[MIN_LOG_RATIO, MAX_LOG_RATIO]`.
pub fn acceptance_probability(candidate_score: f64, current_score: f64) -> f64 {
	let delta = (candidate_score - current_score).clamp(MIN_LOG_RATIO, MAX_LOG_RATIO);
	delta.exp().min(1.0)
}

/// Metropolis acceptance rule.
///
/// A candidate that is not worse is always accepted and consumes no
/// randomness; otherwise one uniform `[0, 1)` draw decides.
pub fn accept<R: Rng + ?Sized>(candidate_score: f64, current_score: f64, rng: &mut R) -> bool {
	let ratio = acceptance_probability(candidate_score, current_score);
	ratio >= 1.0 || rng.random::<f64>() < ratio
}

/// Mutable state of one Markov chain.
///
/// Holds the current key, the ciphertext decoded under it (cached so it is
/// never recomputed) and its score. Owned by a single run.
pub struct Chain<'a, S: Scorer + ?Sized> {
	scorer: &'a S,
	ciphertext: &'a [usize],
	swap_size: usize,
	key: Key,
	decoded: Vec<usize>,
	score: f64,
	iteration: usize,
	/// Scratch buffer for candidate decodings.
	candidate: Vec<usize>,
}

impl<'a, S: Scorer + ?Sized> Chain<'a, S> {
	/// Starts a chain at `key`.
	///
	/// # Errors
	/// - `AlphabetMismatch` if `key` does not cover the scorer's alphabet
	/// - `InvalidSwapSize` unless `2 <= swap_size <= |alphabet|`
	/// - `OutOfAlphabet` if the ciphertext holds an invalid index
	pub fn new(scorer: &'a S, ciphertext: &'a [usize], key: Key, swap_size: usize) -> Result<Self> {
		let m = scorer.alphabet().len();
		if key.len() != m || !key.is_permutation() {
			return Err(CrackError::AlphabetMismatch);
		}
		if swap_size < 2 || swap_size > m {
			return Err(CrackError::InvalidSwapSize { swap_size, alphabet: m });
		}
		let decoded = key.decode(ciphertext)?;
		let score = scorer.score(&decoded);
		Ok(Self {
			scorer,
			ciphertext,
			swap_size,
			key,
			candidate: Vec::with_capacity(decoded.len()),
			decoded,
			score,
			iteration: 0,
		})
	}

	/// One atomic propose → decode → score → accept/reject step.
	///
	/// Returns true when the candidate was accepted.
	pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
		let proposed = self.key.propose_unchecked(self.swap_size, rng);
		proposed.decode_into(self.ciphertext, &mut self.candidate);
		let proposed_score = self.scorer.score(&self.candidate);

		self.iteration += 1;
		if accept(proposed_score, self.score, rng) {
			self.key = proposed;
			self.score = proposed_score;
			std::mem::swap(&mut self.decoded, &mut self.candidate);
			true
		} else {
			false
		}
	}

	pub fn key(&self) -> &Key {
		&self.key
	}

	pub fn score(&self) -> f64 {
		self.score
	}

	pub fn decoded(&self) -> &[usize] {
		&self.decoded
	}

	/// Number of steps taken so far.
	pub fn iteration(&self) -> usize {
		self.iteration
	}
}

/// Everything a finished run hands back.
#[derive(Debug)]
pub struct RunOutcome {
	/// Key held by the chain when the run ended.
	pub key: Key,
	pub score: f64,
	/// Ciphertext decoded under `key`.
	pub decoded: String,
	/// Highest-scoring key the chain ever held.
	pub best_key: Key,
	pub best_score: f64,
	pub trajectory: Trajectory,
	/// Initial score followed by the score of every accepted proposal.
	pub accepted_scores: Vec<f64>,
	/// Iterations actually run (less than `iters` when cancelled).
	pub iterations: usize,
	pub cancelled: bool,
	/// Diagnostic that was disabled (reference length mismatch).
	pub diagnostic_error: Option<CrackError>,
}

impl RunOutcome {
	/// Number of accepted proposals.
	pub fn accepted(&self) -> usize {
		self.accepted_scores.len().saturating_sub(1)
	}

	pub fn acceptance_rate(&self) -> f64 {
		if self.iterations == 0 {
			return 0.0;
		}
		self.accepted() as f64 / self.iterations as f64
	}

	/// Hamming-distance trace, when a reference plaintext was usable.
	pub fn hamming(&self) -> Option<&[usize]> {
		self.trajectory.hamming()
	}
}

/// Metropolis sampler over substitution keys.
///
/// Validates its inputs once at construction, so runs only fail if the
/// start key itself is unusable.
///
/// The sampler is immutable during runs so one instance can drive several
/// independent chains, each with its own generator (see `ensemble`).
///
/// # Behavior
/// - Initializing: pick the start key (`StartKey`), decode and score
/// - Running: `iters` Metropolis steps, snapshots every `eval_every`
///   iterations (0-based, after the accept decision)
/// - Terminated: budget exhausted or cancelled between two steps
pub struct MetropolisSampler<'a, S: Scorer + ?Sized> {
	scorer: &'a S,
	ciphertext: Vec<usize>,
	reference: Option<Vec<usize>>,
	reference_mismatch: Option<(usize, usize)>,
	config: SamplerConfig,
}

impl<'a, S: Scorer + ?Sized> MetropolisSampler<'a, S> {
	/// Creates a sampler for a ciphertext written in the scorer's alphabet.
	///
	/// # Errors
	/// - `OutOfAlphabet` if the ciphertext holds a foreign symbol
	/// - Any configuration error from `SamplerConfig::validate`
	pub fn new(scorer: &'a S, ciphertext: &str, config: SamplerConfig) -> Result<Self> {
		let encoded = scorer.alphabet().encode(ciphertext)?;
		Self::from_symbols(scorer, encoded, config)
	}

	/// Same as `new`, for an already encoded ciphertext.
	pub fn from_symbols(scorer: &'a S, ciphertext: Vec<usize>, config: SamplerConfig) -> Result<Self> {
		let m = scorer.alphabet().len();
		config.validate(m)?;
		if let Some(position) = ciphertext.iter().position(|&s| s >= m) {
			return Err(CrackError::out_of_alphabet(format!("#{}", ciphertext[position]), position));
		}
		Ok(Self { scorer, ciphertext, reference: None, reference_mismatch: None, config })
	}

	/// Attaches a known plaintext used only for the Hamming-distance trace.
	///
	/// A plaintext of the wrong length does not fail the sampler: the trace
	/// is disabled and `RunOutcome::diagnostic_error` reports the mismatch.
	///
	/// # Errors
	/// `OutOfAlphabet` if the plaintext holds a foreign symbol.
	pub fn with_reference(mut self, plaintext: &str) -> Result<Self> {
		let reference = self.scorer.alphabet().encode(plaintext)?;
		match hamming_distance(&self.ciphertext, &reference) {
			Ok(_) => {
				self.reference = Some(reference);
				self.reference_mismatch = None;
			}
			Err(e) => {
				warn!("Hamming trace disabled: {e}");
				self.reference = None;
				self.reference_mismatch = Some((self.ciphertext.len(), reference.len()));
			}
		}
		Ok(self)
	}

	pub fn config(&self) -> &SamplerConfig {
		&self.config
	}

	pub fn ciphertext(&self) -> &[usize] {
		&self.ciphertext
	}

	/// Draws `trials` random keys and returns the highest-scoring one with
	/// its score. Ties keep the earliest candidate.
	pub fn warm_start<R: Rng + ?Sized>(&self, trials: usize, rng: &mut R) -> (Key, f64) {
		let m = self.scorer.alphabet().len();
		let mut decoded = Vec::with_capacity(self.ciphertext.len());

		let mut best_key = Key::random(m, rng);
		best_key.decode_into(&self.ciphertext, &mut decoded);
		let mut best_score = self.scorer.score(&decoded);

		for _ in 1..trials {
			let key = Key::random(m, rng);
			key.decode_into(&self.ciphertext, &mut decoded);
			let score = self.scorer.score(&decoded);
			if score > best_score {
				best_key = key;
				best_score = score;
			}
		}

		debug!("warm start kept score {:.3} out of {} trials", best_score, trials.max(1));
		(best_key, best_score)
	}

	/// Picks the starting key according to `StartKey`.
	pub fn initial_key<R: Rng + ?Sized>(&self, rng: &mut R) -> Key {
		match &self.config.start_key {
			StartKey::Random => Key::random(self.scorer.alphabet().len(), rng),
			StartKey::Custom(key) => key.clone(),
			StartKey::WarmStart(trials) => self.warm_start(*trials, rng).0,
		}
	}

	/// Runs the chain to the end of its iteration budget.
	pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RunOutcome> {
		self.run_with(rng, &mut NoObserver, None)
	}

	/// Runs the chain, reporting each snapshot to `observer` and checking
	/// `cancel` between iterations.
	pub fn run_with<R, O>(&self, rng: &mut R, observer: &mut O, cancel: Option<&CancelToken>) -> Result<RunOutcome>
	where
		R: Rng + ?Sized,
		O: Observer + ?Sized,
	{
		observer.on_phase(Phase::Initializing);
		let key = self.initial_key(rng);
		let mut chain = Chain::new(self.scorer, &self.ciphertext, key, self.config.swap_size())?;

		let mut trajectory = Trajectory::new(self.reference.is_some());
		let mut accepted_scores = vec![chain.score()];
		let mut best_key = chain.key().clone();
		let mut best_score = chain.score();
		let mut cancelled = false;

		debug!("starting {} iterations at score {:.3}", self.config.iters, chain.score());
		observer.on_phase(Phase::Running);

		for i in 0..self.config.iters {
			if cancel.is_some_and(CancelToken::is_cancelled) {
				cancelled = true;
				break;
			}

			if chain.step(rng) {
				accepted_scores.push(chain.score());
				if chain.score() > best_score {
					best_score = chain.score();
					best_key = chain.key().clone();
				}
			}

			if i % self.config.eval_every() == 0 {
				let snapshot = self.snapshot(i, &chain);
				let distance = self
					.reference
					.as_ref()
					.and_then(|reference| hamming_distance(chain.decoded(), reference).ok());
				trace!("snapshot at {}: {:.3}", i, snapshot.score);
				observer.on_snapshot(&snapshot);
				trajectory.push(snapshot, distance);
			}
		}

		let outcome = RunOutcome {
			decoded: self.scorer.alphabet().render(chain.decoded()),
			score: chain.score(),
			iterations: chain.iteration(),
			key: chain.key().clone(),
			best_key,
			best_score,
			trajectory,
			accepted_scores,
			cancelled,
			diagnostic_error: self
				.reference_mismatch
				.map(|(expected, actual)| CrackError::LengthMismatch { expected, actual }),
		};

		debug!(
			"finished after {} iterations, score {:.3}, acceptance rate {:.3}",
			outcome.iterations,
			outcome.score,
			outcome.acceptance_rate()
		);
		observer.on_phase(Phase::Terminated);
		Ok(outcome)
	}

	fn snapshot(&self, iteration: usize, chain: &Chain<'_, S>) -> Snapshot {
		let decoded = chain.decoded();
		let end = self.config.sample_len.min(decoded.len());
		Snapshot {
			iteration,
			score: chain.score(),
			sample: self.scorer.alphabet().render(&decoded[..end]),
		}
	}
}
