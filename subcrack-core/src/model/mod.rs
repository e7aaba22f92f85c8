//! Language model side of the attack.
//!
//! - The symbol set (`Alphabet`)
//! - Dense window counts (`NGramCounts`)
//! - The smoothed n-gram log-likelihood table (`NGramModel`)
//! - The scoring seam used by the sampler (`Scorer`)

/// Ordered symbol set and text encoding.
pub mod alphabet;

/// Dense, mergeable n-gram window counts.
///
/// Building block of `NGramModel`, also used for parallel counting.
pub mod counts;

/// Fixed-order n-gram model (`n >= 1`) with add-one smoothing.
///
/// Handles construction from a corpus, scoring, and persistence.
pub mod ngram_model;

/// `Scorer` trait and the Hamming-distance diagnostic.
pub mod score;
