use log::{debug, warn};
use reqwest::Method;
use serde_json::{Value, json};

use crate::couch::error::store_error;
use crate::couch::transport::endpoint;
use crate::couch::{SyncError, Transport};

use super::document::Document;

/// Writes `batch` with a single `_bulk_docs` request.
///
/// The outer error covers failures of the request as a whole. On success the
/// returned vector holds one error per rejected document; documents accepted
/// alongside them are not reported.
pub async fn send(
	transport: &dyn Transport,
	url: &str,
	batch: &[Document],
) -> Result<Vec<SyncError>, SyncError> {
	let body = json!({ "docs": batch });
	let response = transport
		.request(Method::POST, &endpoint(url, "_bulk_docs"), Some(&body))
		.await?;

	let results = match response {
		Value::Array(results) => results,
		other => {
			if store_error(&other).is_none() {
				warn!("bulk write returned an unexpected response: {}", other);
			}
			return Err(SyncError::Store(other));
		}
	};

	if results.len() != batch.len() {
		warn!(
			"bulk write returned {} results for {} documents",
			results.len(),
			batch.len()
		);
	}

	let failures: Vec<SyncError> = results
		.into_iter()
		.filter(|r| r.get("error").is_some())
		.map(SyncError::Store)
		.collect();

	debug!(
		"bulk write of {} documents finished with {} rejections",
		batch.len(),
		failures.len()
	);
	Ok(failures)
}
