//! Ciphertext-only attack on monoalphabetic substitution ciphers.
//!
//! This crate recovers a substitution key by a Metropolis random walk over
//! key-space, guided by a character n-gram language model:
//! - Smoothed n-gram models built from reference text
//! - Bijective keys and the k-symbol swap proposal
//! - A reproducible Metropolis sampler with warm start, snapshots,
//!   observers, cancellation and multi-chain restarts
//! - Utilities for corpus I/O and model caching

/// Language model: alphabet, n-gram counts and log-likelihood table.
pub mod model;

/// Substitution keys and proposals.
pub mod cipher;

/// Metropolis sampler and its diagnostics.
pub mod sampler;

/// Crate-wide error type.
pub mod error;

/// I/O utilities (file loading, alphabet filtering, path helpers).
pub mod io;

pub use cipher::key::Key;
pub use error::{CrackError, Result};
pub use model::alphabet::Alphabet;
pub use model::ngram_model::NGramModel;
pub use model::score::Scorer;
pub use sampler::config::{SamplerConfig, StartKey};
pub use sampler::metropolis::{MetropolisSampler, RunOutcome};
