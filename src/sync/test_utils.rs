//! Test utilities for the push pipeline.
//!
//! `ScriptedTransport` answers requests from a closure and records every
//! call so tests can assert on the exact traffic the pipeline produced.

#![cfg(test)]

use std::sync::Mutex;

use reqwest::Method;
use serde_json::{Map, Value};

use crate::couch::{Transport, TransportError};
use crate::sync::Document;

type Responder = dyn Fn(&Method, &str, Option<&Value>) -> Result<Value, TransportError> + Send + Sync;

/// One recorded request.
#[derive(Debug, Clone)]
pub struct Call {
	pub method: Method,
	pub url: String,
	pub body: Option<Value>,
}

pub struct ScriptedTransport {
	responder: Box<Responder>,
	calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
	pub fn new<F>(responder: F) -> Self
	where
		F: Fn(&Method, &str, Option<&Value>) -> Result<Value, TransportError> + Send + Sync + 'static,
	{
		Self {
			responder: Box::new(responder),
			calls: Mutex::new(Vec::new()),
		}
	}

	/// A transport for which every request fails as unreachable.
	pub fn unreachable() -> Self {
		Self::new(|_, _, _| Err(TransportError::unreachable("scripted failure")))
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().unwrap().clone()
	}

	/// Calls whose URL ends with `suffix`.
	pub fn calls_to(&self, suffix: &str) -> Vec<Call> {
		self.calls()
			.into_iter()
			.filter(|c| c.url.ends_with(suffix))
			.collect()
	}
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
	async fn request(
		&self,
		method: Method,
		url: &str,
		body: Option<&Value>,
	) -> Result<Value, TransportError> {
		self.calls.lock().unwrap().push(Call {
			method: method.clone(),
			url: url.to_string(),
			body: body.cloned(),
		});
		(self.responder)(&method, url, body)
	}
}

/// Builds a document from a `json!` object literal.
pub fn doc(value: Value) -> Document {
	match value {
		Value::Object(map) => map,
		other => panic!("expected an object, got {}", other),
	}
}

/// Builds `n` documents with ids `doc-0 .. doc-{n-1}`.
pub fn numbered_docs(n: usize) -> Vec<Document> {
	(0..n)
		.map(|i| {
			let mut d = Map::new();
			d.insert("_id".to_string(), Value::String(format!("doc-{}", i)));
			d
		})
		.collect()
}
