//! Metropolis search over substitution keys.
//!
//! - Run parameters (`SamplerConfig`, `StartKey`)
//! - The propose → decode → score → accept loop (`MetropolisSampler`, `Chain`)
//! - Snapshots and diagnostics (`Trajectory`, `Observer`)
//! - Independent restarts on several threads (`ensemble`)

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Run parameters and start-key strategy.
pub mod config;

/// Sampler state machine, acceptance rule and run outcome.
pub mod metropolis;

/// Snapshot records produced at the snapshot cadence.
pub mod trajectory;

/// Non-blocking snapshot observers and the cancellation token.
pub mod observer;

/// Multi-chain restarts, one generator per chain.
pub mod ensemble;

/// Generator type every chain owns.
pub type ChainRng = ChaCha8Rng;

/// Seeded generator for one chain; the same seed replays the same run.
pub fn chain_rng(seed: u64) -> ChainRng {
	ChaCha8Rng::seed_from_u64(seed)
}
