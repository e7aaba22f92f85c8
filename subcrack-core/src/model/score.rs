use super::alphabet::Alphabet;
use crate::error::{CrackError, Result};

/// Scores how language-like a decoded text is.
///
/// The sampler only needs a total log-likelihood and the alphabet the
/// scorer understands; `NGramModel` is the production implementation.
pub trait Scorer: Sync {
	/// Alphabet whose indices `score` accepts.
	fn alphabet(&self) -> &Alphabet;

	/// Total log-likelihood of an encoded text. Higher is better.
	fn score(&self, text: &[usize]) -> f64;
}

/// Number of positions at which `a` and `b` differ.
///
/// # Errors
/// `LengthMismatch` if the two sequences differ in length.
pub fn hamming_distance<T: PartialEq>(a: &[T], b: &[T]) -> Result<usize> {
	if a.len() != b.len() {
		return Err(CrackError::LengthMismatch { expected: a.len(), actual: b.len() });
	}
	Ok(a.iter().zip(b).filter(|(x, y)| x != y).count())
}
