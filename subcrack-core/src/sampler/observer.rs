use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};

use log::info;

use super::metropolis::Phase;
use super::trajectory::Snapshot;

/// Receives snapshots at the snapshot cadence.
///
/// Called from inside the sampling loop, so implementations must return
/// quickly; anything slow belongs behind a `ChannelObserver`.
pub trait Observer {
	fn on_snapshot(&mut self, snapshot: &Snapshot);

	/// Called on every lifecycle transition of the run.
	fn on_phase(&mut self, _phase: Phase) {}
}

impl<F: FnMut(&Snapshot)> Observer for F {
	fn on_snapshot(&mut self, snapshot: &Snapshot) {
		self(snapshot)
	}
}

/// Observer that ignores everything.
pub struct NoObserver;

impl Observer for NoObserver {
	fn on_snapshot(&mut self, _snapshot: &Snapshot) {}
}

/// Verbose progress through the `log` facade.
pub struct LogObserver;

impl Observer for LogObserver {
	fn on_snapshot(&mut self, snapshot: &Snapshot) {
		info!("Iteration: {}. Score: {:.3}. Message: {}", snapshot.iteration, snapshot.score, snapshot.sample);
	}
}

/// Forwards snapshots over a bounded channel without ever blocking.
///
/// When the consumer lags and the buffer is full, the snapshot is dropped
/// and counted instead.
pub struct ChannelObserver {
	tx: SyncSender<Snapshot>,
	dropped: usize,
}

impl ChannelObserver {
	/// Creates the observer and the receiving end, buffering up to `capacity` snapshots.
	pub fn new(capacity: usize) -> (Self, Receiver<Snapshot>) {
		let (tx, rx) = sync_channel(capacity);
		(Self { tx, dropped: 0 }, rx)
	}

	/// Number of snapshots lost because the buffer was full or the receiver gone.
	pub fn dropped(&self) -> usize {
		self.dropped
	}
}

impl Observer for ChannelObserver {
	fn on_snapshot(&mut self, snapshot: &Snapshot) {
		match self.tx.try_send(snapshot.clone()) {
			Ok(()) => (),
			Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => self.dropped += 1,
		}
	}
}

/// Cooperative stop signal, checked between iterations only.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::Relaxed);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn snapshot(iteration: usize) -> Snapshot {
		Snapshot { iteration, score: -1.0, sample: "abc".to_owned() }
	}

	#[test]
	fn closures_are_observers() {
		let mut seen = Vec::new();
		let mut observer = |s: &Snapshot| seen.push(s.iteration);
		observer.on_snapshot(&snapshot(3));
		observer.on_snapshot(&snapshot(4));
		assert_eq!(seen, vec![3, 4]);
	}

	#[test]
	fn channel_observer_drops_instead_of_blocking() {
		let (mut observer, rx) = ChannelObserver::new(2);
		for i in 0..5 {
			observer.on_snapshot(&snapshot(i));
		}
		assert_eq!(observer.dropped(), 3);
		let received: Vec<usize> = rx.try_iter().map(|s| s.iteration).collect();
		assert_eq!(received, vec![0, 1]);
	}

	#[test]
	fn channel_observer_survives_closed_receiver() {
		let (mut observer, rx) = ChannelObserver::new(1);
		drop(rx);
		observer.on_snapshot(&snapshot(0));
		assert_eq!(observer.dropped(), 1);
	}

	#[test]
	fn cancel_token_is_shared() {
		let token = CancelToken::new();
		let clone = token.clone();
		assert!(!token.is_cancelled());
		clone.cancel();
		assert!(token.is_cancelled());
	}
}
