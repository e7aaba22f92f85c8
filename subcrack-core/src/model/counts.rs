use serde::{Deserialize, Serialize};

use crate::error::{CrackError, Result};

/// Largest number of cells a dense window table may hold (2^26).
pub(crate) const MAX_TABLE_SIZE: usize = 1 << 26;

/// Observed window counts for a fixed order `n` over an alphabet of `m` symbols.
///
/// A window of length `n` is addressed by its symbol indices read as a
/// base-`m` number, so the first `n-1` digits are the context and the last
/// digit is the outcome. The table is dense: `m^n` cells, one per possible
/// window, so lookups need no default handling.
///
/// ## Responsibilities:
/// - Accumulate window counts from encoded text
/// - Report per-context totals
/// - Merge with another table of the same shape (parallel counting)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NGramCounts {
	order: usize,
	alphabet_len: usize,
	counts: Vec<u64>,
}

impl NGramCounts {
	/// Creates an empty table.
	///
	/// # Errors
	/// - `InvalidOrder` if `order == 0`
	/// - `InsufficientAlphabet` if `alphabet_len < 2`
	/// - `ModelTooLarge` if `alphabet_len^order` exceeds `MAX_TABLE_SIZE`
	pub fn new(order: usize, alphabet_len: usize) -> Result<Self> {
		if order == 0 {
			return Err(CrackError::InvalidOrder(order));
		}
		if alphabet_len < 2 {
			return Err(CrackError::InsufficientAlphabet { size: alphabet_len });
		}
		let size = table_size(alphabet_len, order)?;
		Ok(Self { order, alphabet_len, counts: vec![0; size] })
	}

	pub fn order(&self) -> usize {
		self.order
	}

	pub fn alphabet_len(&self) -> usize {
		self.alphabet_len
	}

	/// Number of distinct contexts (`m^(n-1)`).
	pub fn context_count(&self) -> usize {
		self.counts.len() / self.alphabet_len
	}

	/// Counts every overlapping window of `text`.
	///
	/// Texts shorter than the order contribute nothing.
	///
	/// # Errors
	/// `OutOfAlphabet` if an index is not a valid symbol; the table is left
	/// untouched in that case.
	pub fn add_text(&mut self, text: &[usize]) -> Result<()> {
		if let Some(position) = text.iter().position(|&s| s >= self.alphabet_len) {
			return Err(CrackError::out_of_alphabet(format!("#{}", text[position]), position));
		}
		if text.len() < self.order {
			return Ok(());
		}

		let size = self.counts.len();
		let mut window = text[..self.order - 1]
			.iter()
			.fold(0, |acc, &s| acc * self.alphabet_len + s);
		for &s in &text[self.order - 1..] {
			window = (window * self.alphabet_len) % size + s;
			self.counts[window] += 1;
		}
		Ok(())
	}

	/// Count of `outcome` following the context with index `context`.
	pub fn count(&self, context: usize, outcome: usize) -> u64 {
		self.counts[context * self.alphabet_len + outcome]
	}

	/// Total number of windows starting with the context `context`.
	pub fn context_total(&self, context: usize) -> u64 {
		let start = context * self.alphabet_len;
		self.counts[start..start + self.alphabet_len].iter().sum()
	}

	/// Total number of counted windows.
	pub fn total(&self) -> u64 {
		self.counts.iter().sum()
	}

	/// Merges another table into this one by summing counts.
	///
	/// # Errors
	/// Returns an error if the two tables differ in order or alphabet size.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.order != other.order {
			return Err(CrackError::InvalidOrder(other.order));
		}
		if self.alphabet_len != other.alphabet_len {
			return Err(CrackError::AlphabetMismatch);
		}
		for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
			*mine += *theirs;
		}
		Ok(())
	}
}

/// `alphabet_len^order`, bounded by `MAX_TABLE_SIZE`.
pub(crate) fn table_size(alphabet_len: usize, order: usize) -> Result<usize> {
	u32::try_from(order)
		.ok()
		.and_then(|o| alphabet_len.checked_pow(o))
		.filter(|size| *size <= MAX_TABLE_SIZE)
		.ok_or(CrackError::ModelTooLarge { alphabet: alphabet_len, order })
}
