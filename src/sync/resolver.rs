use std::collections::HashMap;

use log::debug;
use reqwest::Method;
use serde_json::{Value, json};

use crate::couch::error::store_error;
use crate::couch::transport::endpoint;
use crate::couch::{SyncError, Transport};

use super::document::{Document, REV_FIELD, doc_id};

/// Replaces the `_rev` of every document in `batch` with the store's current
/// revision for that id.
///
/// Caller-supplied revisions are always discarded first, so documents the
/// store does not know leave without a `_rev` and are created. When two
/// documents share an id the later one receives the revision.
pub async fn resolve(
	transport: &dyn Transport,
	url: &str,
	batch: &mut [Document],
) -> Result<(), SyncError> {
	for doc in batch.iter_mut() {
		doc.remove(REV_FIELD);
	}

	let mut keys: Vec<String> = Vec::new();
	let mut by_id: HashMap<String, usize> = HashMap::new();
	for (index, doc) in batch.iter().enumerate() {
		if let Some(id) = doc_id(doc) {
			if by_id.insert(id.to_string(), index).is_none() {
				keys.push(id.to_string());
			}
		}
	}

	if keys.is_empty() {
		debug!("no identified documents in batch, skipping revision lookup");
		return Ok(());
	}

	debug!("looking up revisions for {} documents", keys.len());
	let body = json!({ "keys": keys });
	let response = transport
		.request(Method::POST, &endpoint(url, "_all_docs"), Some(&body))
		.await?;

	if let Some(err) = store_error(&response) {
		return Err(SyncError::Store(err.clone()));
	}

	let rows = response
		.get("rows")
		.and_then(Value::as_array)
		.map(Vec::as_slice)
		.unwrap_or_default();

	let mut matched = 0usize;
	for row in rows {
		let Some(id) = row.get("id").and_then(Value::as_str) else {
			continue;
		};
		let Some(rev) = row.get("value").and_then(|v| v.get("rev")) else {
			continue;
		};
		if let Some(&index) = by_id.get(id) {
			batch[index].insert(REV_FIELD.to_string(), rev.clone());
			matched += 1;
		}
	}

	debug!("{} of {} documents already exist remotely", matched, keys.len());
	Ok(())
}
