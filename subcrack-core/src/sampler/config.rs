use serde::{Deserialize, Serialize};

use crate::cipher::key::Key;
use crate::error::{CrackError, Result};

/// Strategy used to pick the key the chain starts from.
///
/// # Variants
/// - `Random`: a single uniformly random key.
/// - `Custom(Key)`: start from the given key.
/// - `WarmStart(usize)`: draw that many random keys, score each, and start
///   from the highest-scoring one.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub enum StartKey {
	#[default]
	Random,
	Custom(Key),
	WarmStart(usize),
}

/// Run parameters for a Metropolis sampling run.
///
/// # Responsibilities
/// - Track the iteration budget, snapshot cadence and proposal size
/// - Choose how the chain is initialised (`StartKey`)
///
/// # Invariants
/// - `eval_every >= 1`
/// - `swap_size >= 2` (the upper bound depends on the alphabet and is
///   checked when the sampler is built)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SamplerConfig {
	/// Number of propose/score/accept steps.
	pub iters: usize,

	/// Number of decoded symbols kept in each snapshot.
	pub sample_len: usize,

	/// How the initial key is chosen.
	pub start_key: StartKey,

	/// Snapshot cadence, in iterations.
	eval_every: usize,

	/// Number of symbols whose images are permuted per proposal.
	swap_size: usize,
}

impl Default for SamplerConfig {
	fn default() -> Self {
		Self { iters: 10_000, sample_len: 70, start_key: StartKey::Random, eval_every: 1000, swap_size: 2 }
	}
}

impl SamplerConfig {
	pub fn eval_every(&self) -> usize {
		self.eval_every
	}

	/// Sets the snapshot cadence.
	///
	/// # Errors
	/// Returns an error if `eval_every` is 0.
	pub fn set_eval_every(&mut self, eval_every: usize) -> Result<()> {
		if eval_every == 0 {
			return Err(CrackError::InvalidConfig("eval_every must be >= 1".to_owned()));
		}
		self.eval_every = eval_every;
		Ok(())
	}

	pub fn swap_size(&self) -> usize {
		self.swap_size
	}

	/// Sets the number of symbols shuffled per proposal.
	///
	/// 2 (a plain swap) is the default; larger values move further per
	/// step and usually converge more slowly.
	pub fn set_swap_size(&mut self, swap_size: usize) -> Result<()> {
		if swap_size < 2 {
			return Err(CrackError::InvalidConfig(format!("swap size must be at least 2, got {swap_size}")));
		}
		self.swap_size = swap_size;
		Ok(())
	}

	/// Checks the configuration against an alphabet of `alphabet_len` symbols.
	///
	/// Also catches values that bypassed the setters through deserialization.
	pub fn validate(&self, alphabet_len: usize) -> Result<()> {
		if alphabet_len < 2 {
			return Err(CrackError::InsufficientAlphabet { size: alphabet_len });
		}
		if self.eval_every == 0 {
			return Err(CrackError::InvalidConfig("eval_every must be >= 1".to_owned()));
		}
		if self.swap_size < 2 || self.swap_size > alphabet_len {
			return Err(CrackError::InvalidSwapSize { swap_size: self.swap_size, alphabet: alphabet_len });
		}
		match &self.start_key {
			StartKey::WarmStart(0) => {
				Err(CrackError::InvalidConfig("warm start needs at least 1 trial".to_owned()))
			}
			StartKey::Custom(key) if key.len() != alphabet_len || !key.is_permutation() => {
				Err(CrackError::AlphabetMismatch)
			}
			_ => Ok(()),
		}
	}
}
