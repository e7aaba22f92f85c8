use serde::{Deserialize, Serialize};

/// State of a chain at one snapshot iteration, taken after the
/// accept/reject decision of that iteration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Snapshot {
	pub iteration: usize,
	pub score: f64,
	/// Prefix of the current decoded text (`SamplerConfig::sample_len` symbols).
	pub sample: String,
}

/// Append-only record of a sampling run.
///
/// `hamming` is only populated when a reference plaintext of the right
/// length was supplied; it then holds one entry per snapshot.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Trajectory {
	snapshots: Vec<Snapshot>,
	hamming: Option<Vec<usize>>,
}

impl Trajectory {
	pub(crate) fn new(tracks_hamming: bool) -> Self {
		Self { snapshots: Vec::new(), hamming: tracks_hamming.then(Vec::new) }
	}

	pub(crate) fn push(&mut self, snapshot: Snapshot, distance: Option<usize>) {
		self.snapshots.push(snapshot);
		if let (Some(trace), Some(d)) = (self.hamming.as_mut(), distance) {
			trace.push(d);
		}
	}

	pub fn snapshots(&self) -> &[Snapshot] {
		&self.snapshots
	}

	/// Hamming distances to the reference plaintext, one per snapshot.
	pub fn hamming(&self) -> Option<&[usize]> {
		self.hamming.as_deref()
	}

	pub fn len(&self) -> usize {
		self.snapshots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.snapshots.is_empty()
	}

	pub fn last(&self) -> Option<&Snapshot> {
		self.snapshots.last()
	}
}
