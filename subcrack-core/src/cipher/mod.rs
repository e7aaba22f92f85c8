//! Substitution keys and the proposal move used by the sampler.

/// Bijective key over symbol indices: decoding, inversion and the
/// k-symbol proposal.
pub mod key;
