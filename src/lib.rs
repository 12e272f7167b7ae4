pub mod config;
pub mod couch;
pub mod observability;
pub mod report;
pub mod sync;

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use tokio::io::AsyncReadExt;
use tokio_stream::StreamExt;
use url::Url;

use crate::couch::SyncError;
use crate::report::{ProgressReport, PushSummary, error_line};
use crate::sync::{DocumentSet, PushAgent, SyncEvent};

/// Union of the positional target URLs and the one from the environment.
///
/// Order is preserved and repeated URLs are dropped. Every URL must parse.
pub fn target_urls(positional: &[String], env_url: Option<&str>) -> Result<Vec<String>, SyncError> {
	let mut urls: Vec<String> = Vec::new();
	for candidate in positional.iter().map(String::as_str).chain(env_url) {
		let candidate = candidate.trim();
		if candidate.is_empty() {
			continue;
		}
		Url::parse(candidate)
			.map_err(|e| SyncError::Validation(format!("invalid URL '{}': {}", candidate, e)))?;
		if !urls.iter().any(|u| u == candidate) {
			urls.push(candidate.to_string());
		}
	}
	Ok(urls)
}

/// Reads the rendered bundle from `path`, or from stdin when `path` is `-`.
pub async fn read_input(path: &Path) -> anyhow::Result<DocumentSet> {
	let text = if path == Path::new("-") {
		let mut buf = String::new();
		tokio::io::stdin()
			.read_to_string(&mut buf)
			.await
			.context("reading bundle from stdin")?;
		buf
	} else {
		tokio::fs::read_to_string(path)
			.await
			.with_context(|| format!("reading bundle {}", path.display()))?
	};

	Ok(DocumentSet::parse(&text)?)
}

/// Pushes `set` to each URL in turn, writing progress lines to `out` and
/// error payloads to `err` as events arrive.
pub async fn run_push<O: Write, E: Write>(
	agent: &PushAgent,
	set: DocumentSet,
	urls: Vec<String>,
	out: &mut O,
	err: &mut E,
) -> std::io::Result<PushSummary> {
	let report = ProgressReport::new(set.len());
	let mut summary = PushSummary {
		targets: urls.len(),
		..PushSummary::default()
	};

	let mut events = agent.push_all(set, urls);
	while let Some(tagged) = events.next().await {
		match tagged.event {
			SyncEvent::Progress { length, pushed } => {
				summary.pushed += length;
				writeln!(out, "{}: {}", tagged.url, report.line(pushed))?;
			}
			SyncEvent::Error(e) => {
				summary.errors += 1;
				writeln!(err, "{}: {}", tagged.url, error_line(&e))?;
			}
		}
	}

	Ok(summary)
}
