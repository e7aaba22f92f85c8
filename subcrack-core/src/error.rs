use thiserror::Error;

/// Errors raised by the model builder, the key operations and the sampler.
///
/// Input validation happens before a sampling run starts, so none of these
/// are expected once the Metropolis loop is running.
#[derive(Debug, Error)]
pub enum CrackError {
	/// A text contains a symbol that is not part of the declared alphabet.
	#[error("symbol {symbol:?} at position {position} is not in the alphabet")]
	OutOfAlphabet { symbol: String, position: usize },

	/// Proposals need at least two symbols to swap.
	#[error("alphabet must contain at least 2 symbols, got {size}")]
	InsufficientAlphabet { size: usize },

	#[error("symbol {0:?} appears more than once in the alphabet")]
	DuplicateSymbol(char),

	#[error("not a permutation of the alphabet: {0}")]
	NotAPermutation(String),

	/// Hamming distance is only defined on equal-length sequences.
	#[error("length mismatch: expected {expected}, got {actual}")]
	LengthMismatch { expected: usize, actual: usize },

	#[error("n-gram order must be >= 1, got {0}")]
	InvalidOrder(usize),

	#[error("an order-{order} table over {alphabet} symbols is too large")]
	ModelTooLarge { alphabet: usize, order: usize },

	#[error("swap size must be between 2 and {alphabet}, got {swap_size}")]
	InvalidSwapSize { swap_size: usize, alphabet: usize },

	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// A persisted model or a key was built over another alphabet.
	#[error("alphabet mismatch")]
	AlphabetMismatch,

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Serialization(#[from] postcard::Error),
}

pub type Result<T> = std::result::Result<T, CrackError>;

impl CrackError {
	pub(crate) fn out_of_alphabet(symbol: impl ToString, position: usize) -> Self {
		CrackError::OutOfAlphabet { symbol: symbol.to_string(), position }
	}
}
