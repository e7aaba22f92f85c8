use std::path::Path;
use std::sync::mpsc;
use std::thread;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::alphabet::Alphabet;
use super::counts::NGramCounts;
use super::score::Scorer;
use crate::error::{CrackError, Result};
use crate::io::{build_output_path, filter_to_alphabet, read_text};

/// Smoothed log-likelihood model of order `n` over a fixed alphabet.
///
/// The model maps every (n-1)-symbol context to a log-probability
/// distribution over the next symbol, estimated from a reference corpus
/// with add-one (Laplace) smoothing:
///
/// `log((count(context, outcome) + 1) / (total(context) + |alphabet|))`
///
/// # Responsibilities
/// - Build the table from a corpus (sequentially or in parallel)
/// - Score decoded texts (`Scorer`)
/// - Persist and reload the table (`postcard`)
///
/// # Invariants
/// - `order >= 1`
/// - The table covers the whole cartesian product of contexts, observed or not
/// - For every context, the pre-log probabilities sum to 1
/// - Contexts never seen in the corpus get the uniform `ln(1/|alphabet|)`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NGramModel {
	/// Symbol set the model was trained on.
	alphabet: Alphabet,

	/// Window length (context is `order - 1` symbols).
	order: usize,

	/// Dense table indexed by `context * |alphabet| + outcome`.
	log_probs: Vec<f64>,

	/// Number of contexts with a zero observed total.
	degenerate_contexts: usize,
}

impl NGramModel {
	/// Builds a model from an encoded corpus.
	///
	/// # Errors
	/// - `InvalidOrder` if `order == 0`
	/// - `ModelTooLarge` if the dense table would be too big
	/// - `OutOfAlphabet` if the corpus holds an index outside the alphabet
	pub fn build(corpus: &[usize], alphabet: &Alphabet, order: usize) -> Result<Self> {
		let mut counts = NGramCounts::new(order, alphabet.len())?;
		counts.add_text(corpus)?;
		Ok(Self::from_counts(&counts, alphabet))
	}

	/// Builds a model from a corpus given as text.
	///
	/// The text must already be restricted to the alphabet; see
	/// `io::filter_to_alphabet`.
	pub fn from_text(corpus: &str, alphabet: &Alphabet, order: usize) -> Result<Self> {
		let encoded = alphabet.encode(corpus)?;
		Self::build(&encoded, alphabet, order)
	}

	/// Builds the same model as `build`, counting chunks of the corpus on
	/// separate threads.
	///
	/// # Behavior
	/// - Splits the corpus into `cpus * 8` chunks; consecutive chunks overlap
	///   by `order - 1` symbols so no window is lost or counted twice.
	/// - Each thread counts its chunk into its own `NGramCounts`.
	/// - Partial tables are collected through an MPSC channel and merged.
	pub fn build_parallel(corpus: &[usize], alphabet: &Alphabet, order: usize) -> Result<Self> {
		let mut total = NGramCounts::new(order, alphabet.len())?;
		if let Some(position) = corpus.iter().position(|&s| s >= alphabet.len()) {
			return Err(CrackError::out_of_alphabet(format!("#{}", corpus[position]), position));
		}

		let windows = corpus.len().saturating_sub(order - 1);
		if windows == 0 {
			return Ok(Self::from_counts(&total, alphabet));
		}

		let chunks = num_cpus::get() * 8;
		let chunk_size = windows.div_ceil(chunks);

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for start in (0..windows).step_by(chunk_size) {
				let tx = tx.clone();
				let end = (start + chunk_size + order - 1).min(corpus.len());
				let chunk = &corpus[start..end];
				scope.spawn(move || {
					let partial = NGramCounts::new(order, alphabet.len())
						.and_then(|mut counts| counts.add_text(chunk).map(|_| counts));
					// The receiver outlives every sender.
					let _ = tx.send(partial);
				});
			}
		});
		drop(tx);

		for partial in rx.iter() {
			total.merge(&partial?)?;
		}

		Ok(Self::from_counts(&total, alphabet))
	}

	/// Turns raw counts into the smoothed log-probability table.
	pub fn from_counts(counts: &NGramCounts, alphabet: &Alphabet) -> Self {
		let m = counts.alphabet_len();
		let contexts = counts.context_count();
		let mut log_probs = Vec::with_capacity(contexts * m);
		let mut degenerate_contexts = 0;

		for context in 0..contexts {
			let total = counts.context_total(context);
			if total == 0 {
				// DegenerateContext: smoothing alone yields the uniform fallback
				degenerate_contexts += 1;
				trace!("context {} never observed, using uniform fallback", context);
				log_probs.extend(std::iter::repeat_n(-(m as f64).ln(), m));
				continue;
			}
			let denominator = (total + m as u64) as f64;
			for outcome in 0..m {
				let numerator = (counts.count(context, outcome) + 1) as f64;
				log_probs.push((numerator / denominator).ln());
			}
		}

		debug!(
			"built order-{} model over {} symbols from {} windows ({} of {} contexts unseen)",
			counts.order(),
			m,
			counts.total(),
			degenerate_contexts,
			contexts
		);

		Self { alphabet: alphabet.clone(), order: counts.order(), log_probs, degenerate_contexts }
	}

	pub fn order(&self) -> usize {
		self.order
	}

	/// Number of contexts that fell back to the uniform distribution.
	pub fn degenerate_contexts(&self) -> usize {
		self.degenerate_contexts
	}

	/// Log-probability of `outcome` after `context`.
	///
	/// # Errors
	/// - `LengthMismatch` if `context` is not `order - 1` symbols long
	/// - `OutOfAlphabet` if a symbol index is invalid
	pub fn log_prob(&self, context: &[usize], outcome: usize) -> Result<f64> {
		let row = self.context_index(context)?;
		if outcome >= self.alphabet.len() {
			return Err(CrackError::out_of_alphabet(format!("#{outcome}"), context.len()));
		}
		Ok(self.log_probs[row * self.alphabet.len() + outcome])
	}

	/// Smoothed (pre-log) next-symbol distribution after `context`.
	pub fn probabilities(&self, context: &[usize]) -> Result<Vec<f64>> {
		let m = self.alphabet.len();
		let row = self.context_index(context)?;
		Ok(self.log_probs[row * m..(row + 1) * m].iter().map(|lp| lp.exp()).collect())
	}

	fn context_index(&self, context: &[usize]) -> Result<usize> {
		if context.len() != self.order - 1 {
			return Err(CrackError::LengthMismatch { expected: self.order - 1, actual: context.len() });
		}
		let m = self.alphabet.len();
		context.iter().enumerate().try_fold(0, |acc, (position, &s)| {
			if s < m {
				Ok(acc * m + s)
			} else {
				Err(CrackError::out_of_alphabet(format!("#{s}"), position))
			}
		})
	}

	/// Writes the model as a single `postcard` blob.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = postcard::to_stdvec(self)?;
		std::fs::write(path, bytes)?;
		Ok(())
	}

	/// Reads a model written by `save`.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = std::fs::read(path)?;
		let model: Self = postcard::from_bytes(&bytes)?;
		let expected = super::counts::table_size(model.alphabet.len(), model.order)?;
		if model.order == 0 || model.log_probs.len() != expected {
			return Err(CrackError::InvalidConfig(format!(
				"model table holds {} cells, expected {expected}",
				model.log_probs.len()
			)));
		}
		Ok(model)
	}

	/// Loads a cached model for a corpus file, building it if needed.
	///
	/// - The cache lives next to the corpus: `corpus.txt` → `corpus.<n>gram.bin`
	/// - A cache built for another alphabet or order is ignored and rebuilt
	/// - Otherwise the corpus is read, filtered to the alphabet (lower-cased),
	///   counted in parallel and the cache is written for the next run
	pub fn load_or_build<P: AsRef<Path>>(corpus_path: P, alphabet: &Alphabet, order: usize) -> Result<Self> {
		let binary_data_path = build_output_path(&corpus_path, &format!("{order}gram.bin"))?;
		if binary_data_path.exists() {
			match Self::load(&binary_data_path) {
				Ok(model) if model.order == order && model.alphabet == *alphabet => {
					debug!("loaded cached model {}", binary_data_path.display());
					return Ok(model);
				}
				Ok(_) => warn!("cached model {} does not match, rebuilding", binary_data_path.display()),
				Err(e) => warn!("cached model {} unreadable ({e}), rebuilding", binary_data_path.display()),
			}
		}

		let text = filter_to_alphabet(&read_text(&corpus_path)?, alphabet, true);
		let model = Self::build_parallel(&alphabet.encode(&text)?, alphabet, order)?;
		model.save(&binary_data_path)?;
		debug!("wrote model cache {}", binary_data_path.display());
		Ok(model)
	}
}

impl Scorer for NGramModel {
	fn alphabet(&self) -> &Alphabet {
		&self.alphabet
	}

	/// Sums the log-probability of every overlapping window of `text`.
	///
	/// Texts shorter than the order score 0. Indices are assumed valid;
	/// callers validate texts when they are encoded.
	fn score(&self, text: &[usize]) -> f64 {
		if text.len() < self.order {
			return 0.0;
		}
		let m = self.alphabet.len();
		let size = self.log_probs.len();
		let mut window = text[..self.order - 1].iter().fold(0, |acc, &s| acc * m + s);
		let mut total = 0.0;
		for &s in &text[self.order - 1..] {
			window = (window * m) % size + s;
			total += self.log_probs[window];
		}
		total
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn abc() -> Alphabet {
		Alphabet::new("abc").unwrap()
	}

	#[test]
	fn bigram_probabilities_are_laplace_smoothed() {
		let alphabet = abc();
		// windows: aa ab bc ca ab bc ca ab bc ca ab bc
		let model = NGramModel::from_text("aabcabcabcabc", &alphabet, 2).unwrap();
		let p = model.probabilities(&[0]).unwrap();
		assert!((p[0] - 2.0 / 8.0).abs() < 1e-12);
		assert!((p[1] - 5.0 / 8.0).abs() < 1e-12);
		assert!((p[2] - 1.0 / 8.0).abs() < 1e-12);
		let lp = model.log_prob(&[2], 0).unwrap();
		assert!((lp - (4.0f64 / 6.0).ln()).abs() < 1e-12);
		assert_eq!(model.degenerate_contexts(), 0);
	}

	#[test]
	fn unseen_context_is_uniform() {
		let alphabet = abc();
		let model = NGramModel::from_text("ababab", &alphabet, 2).unwrap();
		assert_eq!(model.degenerate_contexts(), 1);
		for p in model.probabilities(&[2]).unwrap() {
			assert!((p - 1.0 / 3.0).abs() < 1e-12);
		}
	}

	#[test]
	fn empty_corpus_scores_every_text() {
		let alphabet = abc();
		let model = NGramModel::build(&[], &alphabet, 3).unwrap();
		assert_eq!(model.degenerate_contexts(), 9);
		let score = model.score(&[0, 1, 2, 2]);
		assert!((score - 2.0 * (1.0f64 / 3.0).ln()).abs() < 1e-12);
	}

	#[test]
	fn score_sums_windows() {
		let alphabet = abc();
		let model = NGramModel::from_text("aabcabcabcabc", &alphabet, 2).unwrap();
		let text = alphabet.encode("abca").unwrap();
		let expected = model.log_prob(&[0], 1).unwrap()
			+ model.log_prob(&[1], 2).unwrap()
			+ model.log_prob(&[2], 0).unwrap();
		assert!((model.score(&text) - expected).abs() < 1e-12);
		assert_eq!(model.score(&[0]), 0.0);
	}

	#[test]
	fn unigram_model() {
		let alphabet = abc();
		let model = NGramModel::from_text("aaab", &alphabet, 1).unwrap();
		let p = model.probabilities(&[]).unwrap();
		assert!((p[0] - 4.0 / 7.0).abs() < 1e-12);
		assert!((p[2] - 1.0 / 7.0).abs() < 1e-12);
	}

	#[test]
	fn rejects_invalid_inputs() {
		let alphabet = abc();
		assert!(matches!(NGramModel::build(&[0, 1], &alphabet, 0), Err(CrackError::InvalidOrder(0))));
		assert!(matches!(NGramModel::from_text("abd", &alphabet, 2), Err(CrackError::OutOfAlphabet { .. })));
		let model = NGramModel::from_text("abc", &alphabet, 2).unwrap();
		assert!(matches!(model.log_prob(&[0, 1], 0), Err(CrackError::LengthMismatch { .. })));
		assert!(model.log_prob(&[3], 0).is_err());
	}

	#[test]
	fn parallel_build_matches_sequential() {
		let alphabet = Alphabet::lowercase_latin();
		let text = "the quick brown fox jumps over the lazy dog ".repeat(40);
		let corpus = alphabet.encode(&text).unwrap();
		for order in 1..=3 {
			let sequential = NGramModel::build(&corpus, &alphabet, order).unwrap();
			let parallel = NGramModel::build_parallel(&corpus, &alphabet, order).unwrap();
			assert_eq!(sequential.log_probs, parallel.log_probs);
			assert_eq!(sequential.degenerate_contexts, parallel.degenerate_contexts);
		}
	}

	#[test]
	fn parallel_build_handles_short_corpus() {
		let alphabet = abc();
		let model = NGramModel::build_parallel(&[0], &alphabet, 3).unwrap();
		assert_eq!(model.degenerate_contexts(), 9);
	}

	proptest! {
		#[test]
		fn prop_every_context_is_a_distribution(
			corpus in proptest::collection::vec(0usize..4, 0..200),
			order in 1usize..4,
		) {
			let alphabet = Alphabet::new("wxyz").unwrap();
			let model = NGramModel::build(&corpus, &alphabet, order).unwrap();
			for row in model.log_probs.chunks(alphabet.len()) {
				let sum: f64 = row.iter().map(|lp| lp.exp()).sum();
				prop_assert!((sum - 1.0).abs() < 1e-9);
				prop_assert!(row.iter().all(|lp| lp.is_finite()));
			}
		}
	}
}
