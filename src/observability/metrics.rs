use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Registry for the counters a push run records.
///
/// Counters are cumulative across every target pushed by one process.
/// `doc_errors_total` counts documents rejected inside a `_bulk_docs`
/// answer; `store_errors_total` counts whole requests answered with an error
/// object. A single failure is never counted in both.
pub struct MetricsRegistry {
	registry: Registry,

	pub batches_total: IntCounter,
	pub docs_pushed_total: IntCounter,
	pub doc_errors_total: IntCounter,
	pub store_errors_total: IntCounter,
	pub transport_errors_total: IntCounter,
	pub databases_created_total: IntCounter,
	pub batch_duration_seconds: Histogram,
}

impl MetricsRegistry {
	pub fn new() -> prometheus::Result<Self> {
		let registry = Registry::new();

		let batches_total = IntCounter::with_opts(Opts::new(
			"mouch_push_batches_total",
			"Batches submitted with _bulk_docs",
		))?;
		let docs_pushed_total = IntCounter::with_opts(Opts::new(
			"mouch_push_docs_total",
			"Documents contained in completed batches",
		))?;
		let doc_errors_total = IntCounter::with_opts(Opts::new(
			"mouch_push_doc_errors_total",
			"Documents rejected individually by the store",
		))?;
		let store_errors_total = IntCounter::with_opts(Opts::new(
			"mouch_store_errors_total",
			"Requests answered with a store error object",
		))?;
		let transport_errors_total = IntCounter::with_opts(Opts::new(
			"mouch_transport_errors_total",
			"Requests that could not be completed or returned non-JSON",
		))?;
		let databases_created_total = IntCounter::with_opts(Opts::new(
			"mouch_databases_created_total",
			"Target databases found missing during bootstrap",
		))?;
		let batch_duration_seconds = Histogram::with_opts(
			HistogramOpts::new(
				"mouch_push_batch_duration_seconds",
				"Time to resolve revisions for and write one batch",
			)
			.buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]),
		)?;

		registry.register(Box::new(batches_total.clone()))?;
		registry.register(Box::new(docs_pushed_total.clone()))?;
		registry.register(Box::new(doc_errors_total.clone()))?;
		registry.register(Box::new(store_errors_total.clone()))?;
		registry.register(Box::new(transport_errors_total.clone()))?;
		registry.register(Box::new(databases_created_total.clone()))?;
		registry.register(Box::new(batch_duration_seconds.clone()))?;

		Ok(Self {
			registry,
			batches_total,
			docs_pushed_total,
			doc_errors_total,
			store_errors_total,
			transport_errors_total,
			databases_created_total,
			batch_duration_seconds,
		})
	}

	/// Encode metrics in Prometheus text format
	pub fn encode(&self) -> String {
		let encoder = TextEncoder::new();
		let metric_families = self.registry.gather();
		match encoder.encode_to_string(&metric_families) {
			Ok(s) => s,
			Err(e) => {
				log::error!("Failed to encode metrics: {}", e);
				String::new()
			}
		}
	}
}

pub fn init_metrics() -> anyhow::Result<Arc<MetricsRegistry>> {
	Ok(Arc::new(MetricsRegistry::new()?))
}

#[cfg(test)]
#[cfg(feature = "unit-tests")]
mod tests {
	#[test]
	fn metrics_registry_creation() {
		let registry = super::MetricsRegistry::new().expect("registry");
		let output = registry.encode();
		assert!(output.contains("mouch_push_batches_total 0"));
		assert!(output.contains("mouch_transport_errors_total 0"));
	}

	#[test]
	fn metrics_increment() {
		let registry = super::MetricsRegistry::new().expect("registry");
		registry.batches_total.inc();
		registry.docs_pushed_total.inc_by(250);
		registry.batch_duration_seconds.observe(0.2);

		let output = registry.encode();
		assert!(output.contains("mouch_push_batches_total 1"));
		assert!(output.contains("mouch_push_docs_total 250"));
		assert!(output.contains("mouch_push_batch_duration_seconds_count 1"));
	}
}
