use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::{SliceRandom, index};
use serde::{Deserialize, Serialize};

use crate::error::{CrackError, Result};
use crate::model::alphabet::Alphabet;

/// Bijective substitution key over symbol indices.
///
/// `images[i]` is the symbol that symbol `i` decodes to. A `Key` is tied to
/// an alphabet only through its length; the `Alphabet` is needed again
/// whenever symbols are shown as characters.
///
/// # Invariants
/// - `images` is a permutation of `0..len` (every symbol appears exactly
///   once as an image)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Key {
	images: Vec<usize>,
}

impl Key {
	/// Key mapping every symbol to itself.
	pub fn identity(len: usize) -> Self {
		Self { images: (0..len).collect() }
	}

	/// Uniformly random permutation of `len` symbols.
	pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
		let mut images: Vec<usize> = (0..len).collect();
		images.shuffle(rng);
		Self { images }
	}

	/// Builds a key from raw images.
	///
	/// # Errors
	/// `NotAPermutation` if `images` is not a permutation of `0..images.len()`.
	pub fn from_images(images: Vec<usize>) -> Result<Self> {
		let key = Self { images };
		if !key.is_permutation() {
			return Err(CrackError::NotAPermutation(format!("{:?}", key.images)));
		}
		Ok(key)
	}

	/// Pairs `known_order[i]` with `permutation[i]`.
	///
	/// Both strings must list every symbol of `alphabet` exactly once. This
	/// is how deterministic or attacker-chosen starting points are given.
	pub fn from_partial(alphabet: &Alphabet, known_order: &str, permutation: &str) -> Result<Self> {
		let from = alphabet.encode(known_order)?;
		let to = alphabet.encode(permutation)?;
		if from.len() != alphabet.len() || to.len() != alphabet.len() {
			return Err(CrackError::NotAPermutation(format!(
				"expected {} symbols, got {} and {}",
				alphabet.len(),
				from.len(),
				to.len()
			)));
		}

		let mut images = vec![usize::MAX; alphabet.len()];
		for (&f, &t) in from.iter().zip(&to) {
			if images[f] != usize::MAX {
				return Err(CrackError::NotAPermutation(format!("{known_order:?} repeats a symbol")));
			}
			images[f] = t;
		}
		Self::from_images(images)
			.map_err(|_| CrackError::NotAPermutation(format!("{permutation:?} repeats a symbol")))
	}

	pub fn len(&self) -> usize {
		self.images.len()
	}

	pub fn is_empty(&self) -> bool {
		self.images.is_empty()
	}

	pub fn images(&self) -> &[usize] {
		&self.images
	}

	/// True when every index in `0..len` appears exactly once.
	pub fn is_permutation(&self) -> bool {
		let mut seen = vec![false; self.images.len()];
		for &image in &self.images {
			match seen.get_mut(image) {
				Some(s) if !*s => *s = true,
				_ => return false,
			}
		}
		true
	}

	/// The key that undoes this one.
	pub fn invert(&self) -> Self {
		let mut images = vec![0; self.images.len()];
		for (symbol, &image) in self.images.iter().enumerate() {
			images[image] = symbol;
		}
		Self { images }
	}

	/// Applies the key symbol by symbol.
	///
	/// # Errors
	/// `OutOfAlphabet` if an index is not in the key's domain; no partial
	/// result is produced.
	pub fn decode(&self, text: &[usize]) -> Result<Vec<usize>> {
		if let Some(position) = text.iter().position(|&s| s >= self.images.len()) {
			return Err(CrackError::out_of_alphabet(format!("#{}", text[position]), position));
		}
		Ok(text.iter().map(|&s| self.images[s]).collect())
	}

	/// Decodes into `out`, reusing its allocation.
	///
	/// Indices must already be valid for this key.
	pub(crate) fn decode_into(&self, text: &[usize], out: &mut Vec<usize>) {
		out.clear();
		out.extend(text.iter().map(|&s| self.images[s]));
	}

	/// Applies the key to a text written in `alphabet`.
	pub fn apply_str(&self, alphabet: &Alphabet, text: &str) -> Result<String> {
		self.check_alphabet(alphabet)?;
		let decoded = self.decode(&alphabet.encode(text)?)?;
		Ok(alphabet.render(&decoded))
	}

	/// Explicit symbol → symbol mapping.
	pub fn mapping(&self, alphabet: &Alphabet) -> Result<BTreeMap<char, char>> {
		self.check_alphabet(alphabet)?;
		Ok(alphabet
			.symbols()
			.iter()
			.zip(&self.images)
			.filter_map(|(&from, &to)| alphabet.symbol(to).map(|to| (from, to)))
			.collect())
	}

	/// Images written in alphabet order, e.g. `"bca"` for a→b, b→c, c→a.
	pub fn images_str(&self, alphabet: &Alphabet) -> Result<String> {
		self.check_alphabet(alphabet)?;
		Ok(alphabet.render(&self.images))
	}

	fn check_alphabet(&self, alphabet: &Alphabet) -> Result<()> {
		if alphabet.len() != self.images.len() {
			return Err(CrackError::AlphabetMismatch);
		}
		Ok(())
	}

	/// Proposes a neighbouring key.
	///
	/// Chooses `swap_size` distinct symbols uniformly without replacement and
	/// permutes their images among themselves; every other mapping is kept.
	/// For `swap_size == 2` this is a plain swap.
	///
	/// The result is always a bijection and always differs from `self`: a
	/// shuffle that happens to restore the original order is rotated by one.
	///
	/// # Errors
	/// `InvalidSwapSize` unless `2 <= swap_size <= len`.
	pub fn propose<R: Rng + ?Sized>(&self, swap_size: usize, rng: &mut R) -> Result<Self> {
		if swap_size < 2 || swap_size > self.images.len() {
			return Err(CrackError::InvalidSwapSize { swap_size, alphabet: self.images.len() });
		}
		Ok(self.propose_unchecked(swap_size, rng))
	}

	/// `propose` with the swap size already validated.
	pub(crate) fn propose_unchecked<R: Rng + ?Sized>(&self, swap_size: usize, rng: &mut R) -> Self {
		let positions = index::sample(rng, self.images.len(), swap_size).into_vec();
		let mut proposed = self.clone();

		if swap_size == 2 {
			proposed.images.swap(positions[0], positions[1]);
			return proposed;
		}

		let original: Vec<usize> = positions.iter().map(|&p| self.images[p]).collect();
		let mut shuffled = original.clone();
		shuffled.shuffle(rng);
		if shuffled == original {
			shuffled.rotate_left(1);
		}
		for (&p, image) in positions.iter().zip(shuffled) {
			proposed.images[p] = image;
		}
		proposed
	}
}

impl TryFrom<Vec<usize>> for Key {
	type Error = CrackError;

	fn try_from(images: Vec<usize>) -> Result<Self> {
		Self::from_images(images)
	}
}

impl From<Key> for Vec<usize> {
	fn from(key: Key) -> Self {
		key.images
	}
}
