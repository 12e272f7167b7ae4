pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::{MetricsRegistry, init_metrics};

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use log::Level;

/// Process-wide observability handles.
pub struct ObservabilityState {
	pub metrics: Arc<MetricsRegistry>,
}

impl ObservabilityState {
	/// Write the metrics text exposition to `path` (node-exporter textfile
	/// collector format).
	pub fn write_metrics(&self, path: &Path) -> anyhow::Result<()> {
		std::fs::write(path, self.metrics.encode())
			.with_context(|| format!("writing metrics to {}", path.display()))
	}
}

/// Initialize logging and the metrics registry.
pub fn init_observability(level: Level) -> anyhow::Result<ObservabilityState> {
	init_logging(level)?;
	let metrics = init_metrics()?;

	log::debug!("observability initialized at level {}", level);

	Ok(ObservabilityState { metrics })
}

#[cfg(test)]
#[cfg(feature = "unit-tests")]
mod tests {
	use super::*;

	#[test]
	fn writes_metrics_file() {
		let state = ObservabilityState {
			metrics: init_metrics().expect("metrics"),
		};
		state.metrics.docs_pushed_total.inc_by(3);

		let dir = tempfile::tempdir().expect("tempdir");
		let path = dir.path().join("mouch.prom");
		state.write_metrics(&path).expect("write");

		let text = std::fs::read_to_string(&path).expect("read");
		assert!(text.contains("mouch_push_docs_total 3"));
	}
}
