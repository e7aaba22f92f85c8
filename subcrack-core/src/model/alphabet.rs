use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CrackError, Result};

/// Ordered set of distinct symbols the cipher operates over.
///
/// Every other component works on symbol *indices*: the position of a
/// symbol in this ordering. Texts are encoded once at the boundary and
/// never touched as `char`s inside the hot loop.
///
/// # Invariants
/// - At least 2 symbols
/// - No duplicates
/// - The order never changes after construction
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(try_from = "Vec<char>", into = "Vec<char>")]
pub struct Alphabet {
	symbols: Vec<char>,
	index: HashMap<char, usize>,
}

impl Alphabet {
	/// Creates an alphabet from the characters of `symbols`, in order.
	///
	/// # Errors
	/// - `InsufficientAlphabet` if fewer than 2 symbols are given
	/// - `DuplicateSymbol` if a character is repeated
	pub fn new(symbols: &str) -> Result<Self> {
		Self::from_symbols(symbols.chars().collect())
	}

	/// Lower-case latin letters followed by a space, the usual setting for
	/// substitution puzzles over prose.
	pub fn lowercase_latin() -> Self {
		let symbols: Vec<char> = ('a'..='z').chain(std::iter::once(' ')).collect();
		let index = symbols.iter().enumerate().map(|(i, c)| (*c, i)).collect();
		Self { symbols, index }
	}

	fn from_symbols(symbols: Vec<char>) -> Result<Self> {
		if symbols.len() < 2 {
			return Err(CrackError::InsufficientAlphabet { size: symbols.len() });
		}
		let mut index = HashMap::with_capacity(symbols.len());
		for (i, c) in symbols.iter().enumerate() {
			if index.insert(*c, i).is_some() {
				return Err(CrackError::DuplicateSymbol(*c));
			}
		}
		Ok(Self { symbols, index })
	}

	pub fn len(&self) -> usize {
		self.symbols.len()
	}

	/// Always false: an alphabet holds at least 2 symbols.
	pub fn is_empty(&self) -> bool {
		self.symbols.is_empty()
	}

	pub fn symbols(&self) -> &[char] {
		&self.symbols
	}

	pub fn contains(&self, symbol: char) -> bool {
		self.index.contains_key(&symbol)
	}

	pub fn index_of(&self, symbol: char) -> Option<usize> {
		self.index.get(&symbol).copied()
	}

	pub fn symbol(&self, index: usize) -> Option<char> {
		self.symbols.get(index).copied()
	}

	/// Converts a text into symbol indices.
	///
	/// Fails fast on the first out-of-alphabet character; nothing is
	/// returned for a partially valid text.
	pub fn encode(&self, text: &str) -> Result<Vec<usize>> {
		text.chars()
			.enumerate()
			.map(|(position, c)| {
				self.index_of(c)
					.ok_or_else(|| CrackError::out_of_alphabet(c, position))
			})
			.collect()
	}

	/// Converts symbol indices back into a text.
	///
	/// # Errors
	/// `OutOfAlphabet` if an index is not smaller than `len()`.
	pub fn decode(&self, indices: &[usize]) -> Result<String> {
		indices
			.iter()
			.enumerate()
			.map(|(position, &i)| {
				self.symbol(i)
					.ok_or_else(|| CrackError::out_of_alphabet(format!("#{i}"), position))
			})
			.collect()
	}

	/// Same as `decode`, for indices already known to be valid.
	pub(crate) fn render(&self, indices: &[usize]) -> String {
		indices.iter().filter_map(|&i| self.symbol(i)).collect()
	}
}

impl PartialEq for Alphabet {
	fn eq(&self, other: &Self) -> bool {
		self.symbols == other.symbols
	}
}

impl Eq for Alphabet {}

impl TryFrom<Vec<char>> for Alphabet {
	type Error = CrackError;

	fn try_from(symbols: Vec<char>) -> Result<Self> {
		Self::from_symbols(symbols)
	}
}

impl From<Alphabet> for Vec<char> {
	fn from(alphabet: Alphabet) -> Self {
		alphabet.symbols
	}
}

impl fmt::Display for Alphabet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for c in &self.symbols {
			write!(f, "{c}")?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_small_alphabets() {
		assert!(matches!(Alphabet::new(""), Err(CrackError::InsufficientAlphabet { size: 0 })));
		assert!(matches!(Alphabet::new("a"), Err(CrackError::InsufficientAlphabet { size: 1 })));
		assert!(Alphabet::new("ab").is_ok());
	}

	#[test]
	fn rejects_duplicates() {
		assert!(matches!(Alphabet::new("abca"), Err(CrackError::DuplicateSymbol('a'))));
	}

	#[test]
	fn order_defines_indices() {
		let alphabet = Alphabet::new("cab").unwrap();
		assert_eq!(alphabet.index_of('c'), Some(0));
		assert_eq!(alphabet.index_of('b'), Some(2));
		assert_eq!(alphabet.symbol(1), Some('a'));
		assert_eq!(alphabet.index_of('z'), None);
	}

	#[test]
	fn encode_reports_first_bad_symbol() {
		let alphabet = Alphabet::new("abc").unwrap();
		assert_eq!(alphabet.encode("cab").unwrap(), vec![2, 0, 1]);
		match alphabet.encode("abxcy") {
			Err(CrackError::OutOfAlphabet { symbol, position }) => {
				assert_eq!(symbol, "x");
				assert_eq!(position, 2);
			}
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn decode_rejects_bad_index() {
		let alphabet = Alphabet::new("abc").unwrap();
		assert_eq!(alphabet.decode(&[2, 1, 0]).unwrap(), "cba");
		assert!(matches!(alphabet.decode(&[0, 3]), Err(CrackError::OutOfAlphabet { position: 1, .. })));
	}

	#[test]
	fn lowercase_latin_has_space() {
		let alphabet = Alphabet::lowercase_latin();
		assert_eq!(alphabet.len(), 27);
		assert!(alphabet.contains(' '));
		assert_eq!(alphabet.index_of('z'), Some(25));
	}

	#[test]
	fn serde_round_trip_checks_invariants() {
		let alphabet = Alphabet::new("xyz").unwrap();
		let bytes = postcard::to_stdvec(&alphabet).unwrap();
		let back: Alphabet = postcard::from_bytes(&bytes).unwrap();
		assert_eq!(back, alphabet);
		assert_eq!(back.index_of('z'), Some(2));

		let bad = postcard::to_stdvec(&vec!['x', 'x']).unwrap();
		assert!(postcard::from_bytes::<Alphabet>(&bad).is_err());
	}
}
