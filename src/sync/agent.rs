use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::couch::{SyncError, Transport};
use crate::observability::MetricsRegistry;

use super::bootstrap::{self, DatabaseState};
use super::document::DocumentSet;
use super::{pusher, resolver};

/// Default number of documents per `_bulk_docs` request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Events buffered between the push task and its consumer.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Outcome reported by a push run.
#[derive(Debug)]
pub enum SyncEvent {
	/// A request failed or the store rejected something. The run continues.
	Error(SyncError),
	/// A batch finished. `length` is the batch size, `pushed` the running
	/// total of documents in completed batches for this target.
	Progress { length: usize, pushed: usize },
}

/// A [`SyncEvent`] tagged with the target it belongs to.
#[derive(Debug)]
pub struct TargetEvent {
	pub url: String,
	pub event: SyncEvent,
}

/// Where a push run currently is. Runs only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushPhase {
	NotStarted,
	Bootstrapping,
	Resolving { batch: usize },
	Pushing { batch: usize },
	Reporting { batch: usize },
	Done,
}

impl fmt::Display for PushPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PushPhase::NotStarted => write!(f, "not started"),
			PushPhase::Bootstrapping => write!(f, "bootstrapping"),
			PushPhase::Resolving { batch } => write!(f, "resolving batch {}", batch),
			PushPhase::Pushing { batch } => write!(f, "pushing batch {}", batch),
			PushPhase::Reporting { batch } => write!(f, "reporting batch {}", batch),
			PushPhase::Done => write!(f, "done"),
		}
	}
}

/// Pushes document sets to CouchDB databases.
///
/// Each push bootstraps the target once, then resolves revisions and writes
/// one batch at a time in input order. Errors never stop a run: they are
/// emitted and the next batch is attempted.
#[derive(Clone)]
pub struct PushAgent {
	transport: Arc<dyn Transport>,
	batch_size: usize,
	metrics: Option<Arc<MetricsRegistry>>,
}

impl PushAgent {
	pub fn new(transport: Arc<dyn Transport>, batch_size: usize) -> Self {
		Self {
			transport,
			batch_size: batch_size.max(1),
			metrics: None,
		}
	}

	pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
		self.metrics = Some(metrics);
		self
	}

	pub fn batch_size(&self) -> usize {
		self.batch_size
	}

	/// Starts pushing `set` to the database at `url` and returns the event
	/// stream of the run.
	///
	/// The work runs on a spawned task, so this must be called from within a
	/// Tokio runtime. Dropping the stream stops the run at its next event.
	pub fn push(&self, set: DocumentSet, url: &str) -> ReceiverStream<SyncEvent> {
		let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
		let run = PushRun {
			transport: Arc::clone(&self.transport),
			metrics: self.metrics.clone(),
			batch_size: self.batch_size,
			url: url.to_string(),
			tx,
			phase: PushPhase::NotStarted,
			pushed: 0,
		};
		tokio::spawn(run.execute(set));
		ReceiverStream::new(rx)
	}

	/// Pushes `set` to every target in `urls`, one after the other.
	pub fn push_all(&self, set: DocumentSet, urls: Vec<String>) -> ReceiverStream<TargetEvent> {
		let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
		let agent = self.clone();
		tokio::spawn(async move {
			for url in urls {
				let mut events = agent.push(set.clone(), &url);
				while let Some(event) = events.next().await {
					let tagged = TargetEvent {
						url: url.clone(),
						event,
					};
					if tx.send(tagged).await.is_err() {
						debug!("event consumer dropped, abandoning remaining targets");
						return;
					}
				}
			}
		});
		ReceiverStream::new(rx)
	}
}

/// State owned by the task driving a single push.
struct PushRun {
	transport: Arc<dyn Transport>,
	metrics: Option<Arc<MetricsRegistry>>,
	batch_size: usize,
	url: String,
	tx: mpsc::Sender<SyncEvent>,
	phase: PushPhase,
	pushed: usize,
}

impl PushRun {
	async fn execute(mut self, set: DocumentSet) {
		info!("pushing {} documents to {}", set.len(), self.url);

		self.enter(PushPhase::Bootstrapping);
		match bootstrap::ensure(self.transport.as_ref(), &self.url).await {
			Ok(DatabaseState::Created) => {
				info!("created database {}", self.url);
				if let Some(m) = &self.metrics {
					m.databases_created_total.inc();
				}
			}
			Ok(DatabaseState::Existing) => {}
			Err(e) => {
				if !self.emit_error(e).await {
					return;
				}
			}
		}

		let batches = set.into_batches(self.batch_size);
		for (index, mut batch) in batches.into_iter().enumerate() {
			let started = Instant::now();

			self.enter(PushPhase::Resolving { batch: index });
			if let Err(e) = resolver::resolve(self.transport.as_ref(), &self.url, &mut batch).await {
				if !self.emit_error(e).await {
					return;
				}
			}

			// The write goes ahead even when the lookup failed so new
			// documents in the batch still get created.
			self.enter(PushPhase::Pushing { batch: index });
			match pusher::send(self.transport.as_ref(), &self.url, &batch).await {
				Ok(rejected) => {
					for e in rejected {
						warn!("{} ({}): document rejected: {}", self.url, self.phase, e);
						if let Some(m) = &self.metrics {
							m.doc_errors_total.inc();
						}
						if !self.emit(SyncEvent::Error(e)).await {
							return;
						}
					}
				}
				Err(e) => {
					if !self.emit_error(e).await {
						return;
					}
				}
			}

			self.enter(PushPhase::Reporting { batch: index });
			self.pushed += batch.len();
			if let Some(m) = &self.metrics {
				m.batches_total.inc();
				m.docs_pushed_total.inc_by(batch.len() as u64);
				m.batch_duration_seconds
					.observe(started.elapsed().as_secs_f64());
			}
			let progress = SyncEvent::Progress {
				length: batch.len(),
				pushed: self.pushed,
			};
			if !self.emit(progress).await {
				return;
			}
		}

		self.enter(PushPhase::Done);
		info!("finished {}: {} documents in completed batches", self.url, self.pushed);
	}

	fn enter(&mut self, next: PushPhase) {
		debug!("{}: {} -> {}", self.url, self.phase, next);
		self.phase = next;
	}

	/// Records a request-level error and forwards it.
	async fn emit_error(&self, error: SyncError) -> bool {
		warn!("{} ({}): {}", self.url, self.phase, error);
		if let Some(m) = &self.metrics {
			if error.is_transport() {
				m.transport_errors_total.inc();
			} else {
				m.store_errors_total.inc();
			}
		}
		self.emit(SyncEvent::Error(error)).await
	}

	/// Returns false once the consumer has gone away.
	async fn emit(&self, event: SyncEvent) -> bool {
		if self.tx.send(event).await.is_err() {
			debug!("{}: event consumer dropped, stopping at {}", self.url, self.phase);
			return false;
		}
		true
	}
}
