//! Console presentation of push runs.

use crate::couch::SyncError;

/// Runs with at least this many documents report a percentage instead of a
/// plain count.
pub const PERCENT_THRESHOLD: usize = 10;

/// Formats progress lines for one target.
#[derive(Debug, Clone, Copy)]
pub struct ProgressReport {
	total: usize,
}

impl ProgressReport {
	pub fn new(total: usize) -> Self {
		Self { total }
	}

	pub fn line(&self, pushed: usize) -> String {
		if self.total < PERCENT_THRESHOLD {
			return format!("{} docs pushed", pushed);
		}
		let percent = pushed.saturating_mul(100) / self.total;
		format!("{}% ({}/{})", percent, pushed, self.total)
	}
}

/// The payload representation printed for an error event.
pub fn error_line(error: &SyncError) -> String {
	error.payload().to_string()
}

/// Totals across every target of a push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushSummary {
	pub targets: usize,
	pub pushed: usize,
	pub errors: usize,
}

impl PushSummary {
	pub fn is_clean(&self) -> bool {
		self.errors == 0
	}
}
