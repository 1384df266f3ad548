// self
use crate::obs::{OpKind, OpOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"bearer_client_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_op_outcome_noop_without_recorder() {
		record_op_outcome(OpKind::Replay, OpOutcome::Coalesced);
	}

	#[cfg(feature = "metrics")]
	#[test]
	fn counter_is_labeled_by_op_and_outcome() {
		// std
		use std::sync::Arc;
		// crates.io
		use metrics::{
			Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
		};
		use parking_lot::Mutex;

		#[derive(Default)]
		struct Capture(Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>);
		impl Recorder for Capture {
			fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

			fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

			fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

			fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
				let mut labels = key
					.labels()
					.map(|label| (label.key().to_owned(), label.value().to_owned()))
					.collect::<Vec<_>>();

				labels.sort();

				self.0.lock().push((key.name().to_owned(), labels));

				Counter::noop()
			}

			fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
				Gauge::noop()
			}

			fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
				Histogram::noop()
			}
		}

		let recorder = Capture::default();
		let seen = Arc::clone(&recorder.0);

		metrics::with_local_recorder(&recorder, || {
			record_op_outcome(OpKind::Refresh, OpOutcome::Coalesced);
			record_op_outcome(OpKind::Upload, OpOutcome::Failure);
		});

		let seen = seen.lock().clone();

		assert_eq!(seen.len(), 2);
		assert!(seen.iter().all(|(name, _)| name == "bearer_client_op_total"));
		assert_eq!(
			seen[0].1,
			vec![("op".to_owned(), "refresh".to_owned()), ("outcome".to_owned(), "coalesced".to_owned())],
		);
		assert_eq!(
			seen[1].1,
			vec![("op".to_owned(), "upload".to_owned()), ("outcome".to_owned(), "failure".to_owned())],
		);
	}
}
