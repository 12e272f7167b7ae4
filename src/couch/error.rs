use serde_json::{Value, json};
use thiserror::Error;

/// Fixed message reported for every request that could not be completed or
/// whose body was not JSON. Consumers match on this text.
pub const UNREACHABLE_MESSAGE: &str = "Can't connect to CouchDB server";

/// Errors raised by the HTTP transport.
#[derive(Debug, Error)]
pub enum TransportError {
	/// The request failed or the response body was not valid JSON.
	#[error("Can't connect to CouchDB server")]
	Unreachable { detail: String },

	#[error("failed to build HTTP client: {0}")]
	Client(String),
}

impl TransportError {
	pub fn unreachable(detail: impl Into<String>) -> Self {
		Self::Unreachable {
			detail: detail.into(),
		}
	}
}

/// Errors surfaced by the push pipeline.
///
/// Only `Validation` stops a run, and it is raised before any network call.
/// Everything else travels through the event channel as a
/// [`SyncEvent::Error`](crate::sync::SyncEvent::Error).
#[derive(Debug, Error)]
pub enum SyncError {
	#[error("invalid document set: {0}")]
	Validation(String),

	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The store answered with a structured error object, e.g. a conflict.
	#[error("store error: {}", describe(.0))]
	Store(Value),

	/// The database probe or creation failed after the single permitted retry.
	#[error("database bootstrap failed: {}", describe(.0))]
	Bootstrap(Value),
}

impl SyncError {
	/// JSON representation of the error as reported to consumers.
	///
	/// Store payloads pass through verbatim.
	pub fn payload(&self) -> Value {
		match self {
			SyncError::Store(v) | SyncError::Bootstrap(v) => v.clone(),
			SyncError::Transport(TransportError::Unreachable { .. }) => {
				json!({ "error": UNREACHABLE_MESSAGE })
			}
			SyncError::Transport(e) => json!({ "error": e.to_string() }),
			SyncError::Validation(msg) => json!({ "error": "invalid", "reason": msg }),
		}
	}

	pub fn is_transport(&self) -> bool {
		matches!(self, SyncError::Transport(_))
	}
}

/// Returns the value unchanged when it is a CouchDB error object
/// (`{"error": ..., "reason": ...}`).
pub fn store_error(value: &Value) -> Option<&Value> {
	match value {
		Value::Object(map) if map.contains_key("error") => Some(value),
		_ => None,
	}
}

/// True for the `{"error":"not_found","reason":"no_db_file"}` answer CouchDB
/// gives when probing a missing database.
pub fn is_missing_database(value: &Value) -> bool {
	value.get("error").and_then(Value::as_str) == Some("not_found")
		&& value.get("reason").and_then(Value::as_str) == Some("no_db_file")
}

fn describe(value: &Value) -> String {
	let error = value.get("error").map(render).unwrap_or_default();
	match value.get("reason") {
		Some(reason) if !error.is_empty() => format!("{}: {}", error, render(reason)),
		_ if !error.is_empty() => error,
		_ => value.to_string(),
	}
}

fn render(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}
