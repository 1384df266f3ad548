//! Refresh coalescing: at most one token exchange in flight per client.
//!
//! A [`RefreshCoordinator`] is either idle or refreshing. The first caller to
//! [`admit`](RefreshCoordinator::admit) while idle becomes the leader and receives a
//! [`RefreshLease`]; every caller admitted while the lease is outstanding receives a [`Waiter`],
//! a single-resolution slot appended to a FIFO queue. Settling the lease drains the queue and
//! returns to idle in one critical section, then hands the same outcome to every waiter in
//! arrival order. There is no timeout: a stalled exchange blocks its waiters until it settles.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	obs::{self, OpKind, OpOutcome},
	token::TokenPair,
};

type Outcome = Result<TokenPair>;

/// Point-in-time view of the refresh state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshSnapshot {
	/// Whether an exchange is in flight.
	pub refreshing: bool,
	/// Number of waiters queued behind it.
	pub queued: usize,
}
impl RefreshSnapshot {
	/// Returns `true` when no exchange is in flight and nobody is waiting.
	pub fn is_idle(&self) -> bool {
		!self.refreshing && self.queued == 0
	}
}

#[derive(Default)]
struct RefreshState {
	refreshing: bool,
	waiters: VecDeque<oneshot::Sender<Outcome>>,
}

/// Per-client refresh state machine.
#[derive(Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the current state.
	pub fn snapshot(&self) -> RefreshSnapshot {
		let state = self.state.lock();

		RefreshSnapshot { refreshing: state.refreshing, queued: state.waiters.len() }
	}

	/// Refresh counters for this coordinator.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Enters the protocol: lead a new exchange when idle, otherwise queue behind the current one.
	pub fn admit(&self) -> Admission<'_> {
		let mut state = self.state.lock();

		if state.refreshing {
			let (tx, rx) = oneshot::channel();

			state.waiters.push_back(tx);

			let queued = state.waiters.len();

			drop(state);

			self.metrics.record_coalesced();
			obs::record_op_outcome(OpKind::Refresh, OpOutcome::Coalesced);

			#[cfg(feature = "tracing")]
			tracing::debug!(queued, "refresh in flight; request queued");
			#[cfg(not(feature = "tracing"))]
			let _ = queued;

			Admission::Queued(Waiter(rx))
		} else {
			state.refreshing = true;

			drop(state);

			self.metrics.record_attempt();

			#[cfg(feature = "tracing")]
			tracing::debug!("refresh started");

			Admission::Leader(RefreshLease { coordinator: self, settled: false })
		}
	}

	/// Runs `refresh` if no exchange is in flight, otherwise waits for the in-flight one.
	///
	/// Every caller admitted during one cycle observes the same outcome.
	pub async fn coalesce<F, Fut>(&self, refresh: F) -> Outcome
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Outcome>,
	{
		match self.admit() {
			Admission::Leader(lease) => {
				let outcome = refresh().await;

				lease.settle(&outcome);

				outcome
			},
			Admission::Queued(waiter) => waiter.wait().await,
		}
	}

	fn settle(&self, outcome: &Outcome) -> usize {
		let waiters = {
			let mut state = self.state.lock();

			state.refreshing = false;

			std::mem::take(&mut state.waiters)
		};
		let settled = waiters.len();

		match outcome {
			Ok(_) => self.metrics.record_success(),
			Err(_) => self.metrics.record_failure(),
		}

		#[cfg(feature = "tracing")]
		tracing::debug!(settled, success = outcome.is_ok(), "refresh settled");

		for waiter in waiters {
			// A dropped receiver means its caller is gone; nothing to deliver.
			let _ = waiter.send(outcome.clone());
		}

		settled
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("snapshot", &self.snapshot())
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// Result of [`RefreshCoordinator::admit`].
#[derive(Debug)]
pub enum Admission<'a> {
	/// The caller must perform the exchange and settle the lease.
	Leader(RefreshLease<'a>),
	/// The caller must wait for the in-flight exchange.
	Queued(Waiter),
}

/// Obligation to settle the current refresh cycle.
///
/// Dropping an unsettled lease settles every waiter with [`Error::RefreshAbandoned`] and returns
/// the coordinator to idle.
pub struct RefreshLease<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl RefreshLease<'_> {
	/// Delivers `outcome` to every queued waiter in FIFO order and returns how many were settled.
	pub fn settle(mut self, outcome: &Outcome) -> usize {
		self.settled = true;

		self.coordinator.settle(outcome)
	}
}
impl Drop for RefreshLease<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.settle(&Err(Error::RefreshAbandoned));
		}
	}
}
impl Debug for RefreshLease<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshLease").field("settled", &self.settled).finish()
	}
}

/// Single-resolution slot settled when the in-flight refresh completes.
pub struct Waiter(oneshot::Receiver<Outcome>);
impl Waiter {
	/// Suspends until the refresh settles.
	pub async fn wait(self) -> Outcome {
		self.0.await.unwrap_or(Err(Error::RefreshAbandoned))
	}
}
impl Debug for Waiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Waiter(..)")
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	fn pair(access: &str) -> TokenPair {
		TokenPair::new(Some(access.into()), Some(format!("{access}-refresh")))
	}

	fn lead(coordinator: &RefreshCoordinator) -> RefreshLease<'_> {
		match coordinator.admit() {
			Admission::Leader(lease) => lease,
			Admission::Queued(_) => panic!("Idle coordinator should admit a leader."),
		}
	}

	fn queue(coordinator: &RefreshCoordinator) -> Waiter {
		match coordinator.admit() {
			Admission::Queued(waiter) => waiter,
			Admission::Leader(_) => panic!("Refreshing coordinator should queue callers."),
		}
	}

	#[tokio::test]
	async fn waiters_share_the_leader_outcome() {
		let coordinator = RefreshCoordinator::new();
		let lease = lead(&coordinator);
		let first = queue(&coordinator);
		let second = queue(&coordinator);

		assert_eq!(coordinator.snapshot(), RefreshSnapshot { refreshing: true, queued: 2 });
		assert_eq!(lease.settle(&Ok(pair("fresh"))), 2);
		assert!(coordinator.snapshot().is_idle());

		for waiter in [first, second] {
			let outcome = waiter.wait().await.expect("Waiter should receive the leader's pair.");

			assert_eq!(outcome.access(), Some("fresh"));
		}

		assert_eq!(coordinator.metrics().attempts(), 1);
		assert_eq!(coordinator.metrics().coalesced(), 2);
		assert_eq!(coordinator.metrics().successes(), 1);
	}

	#[tokio::test]
	async fn failure_rejects_every_waiter_identically() {
		let coordinator = RefreshCoordinator::new();
		let lease = lead(&coordinator);
		let waiters = [queue(&coordinator), queue(&coordinator), queue(&coordinator)];

		lease.settle(&Err(Error::NoRefreshTokenProvided));

		assert!(coordinator.snapshot().is_idle());

		for waiter in waiters {
			let err = waiter.wait().await.expect_err("Waiters should observe the refresh failure.");

			assert!(err.is_no_refresh_token());
		}

		assert_eq!(coordinator.metrics().failures(), 1);
	}

	#[tokio::test]
	async fn dropped_lease_abandons_waiters_and_resets() {
		let coordinator = RefreshCoordinator::new();
		let lease = lead(&coordinator);
		let waiter = queue(&coordinator);

		drop(lease);

		assert!(coordinator.snapshot().is_idle());
		assert!(matches!(waiter.wait().await, Err(Error::RefreshAbandoned)));
	}

	#[tokio::test]
	async fn settled_cycle_allows_a_new_leader() {
		let coordinator = RefreshCoordinator::new();

		lead(&coordinator).settle(&Ok(pair("one")));

		let lease = lead(&coordinator);

		assert!(coordinator.snapshot().refreshing);

		lease.settle(&Ok(pair("two")));

		assert_eq!(coordinator.metrics().attempts(), 2);
	}

	#[tokio::test]
	async fn dropped_waiter_does_not_disturb_settlement() {
		let coordinator = RefreshCoordinator::new();
		let lease = lead(&coordinator);
		let gone = queue(&coordinator);
		let kept = queue(&coordinator);

		drop(gone);

		assert_eq!(lease.settle(&Ok(pair("fresh"))), 2);
		assert_eq!(
			kept.wait().await.expect("Remaining waiter should still settle.").access(),
			Some("fresh"),
		);
	}

	#[tokio::test]
	async fn concurrent_callers_trigger_one_exchange() {
		let coordinator = RefreshCoordinator::new();
		let exchanges = AtomicUsize::new(0);
		let (release, gate) = oneshot::channel::<()>();
		let gate = Mutex::new(Some(gate));
		let coordinator = &coordinator;
		let exchanges = &exchanges;
		let gate = &gate;
		let refresh = move || async move {
			exchanges.fetch_add(1, Ordering::SeqCst);

			let gate = gate.lock().take();

			if let Some(gate) = gate {
				let _ = gate.await;
			}

			Ok(pair("shared"))
		};
		let (a, b, c, ()) = tokio::join!(
			coordinator.coalesce(refresh),
			coordinator.coalesce(refresh),
			coordinator.coalesce(refresh),
			async move {
				while coordinator.snapshot().queued < 2 {
					tokio::task::yield_now().await;
				}

				let _ = release.send(());
			},
		);

		assert_eq!(exchanges.load(Ordering::SeqCst), 1);

		for outcome in [a, b, c] {
			assert_eq!(outcome.expect("Every caller should share the exchange.").access(), Some("shared"));
		}

		assert!(coordinator.snapshot().is_idle());
	}
}
