use futures_util::future::BoxFuture;
use log::{debug, info, warn};
use reqwest::Method;
use serde_json::Value;

use crate::couch::error::{is_missing_database, store_error};
use crate::couch::{SyncError, Transport};

/// Outcome of a successful [`ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseState {
	Existing,
	Created,
}

/// Fetches the database info document at `url`.
///
/// A store error object (e.g. a missing database) is returned as
/// `SyncError::Store` with the raw payload.
pub async fn info(transport: &dyn Transport, url: &str) -> Result<Value, SyncError> {
	let probe = transport.request(Method::GET, url, None).await?;
	match store_error(&probe) {
		Some(_) => Err(SyncError::Store(probe)),
		None => Ok(probe),
	}
}

/// Makes sure the database at `url` exists, creating it if the store reports
/// it missing.
///
/// Creation is attempted at most once per call.
pub async fn ensure(transport: &dyn Transport, url: &str) -> Result<DatabaseState, SyncError> {
	ensure_guarded(transport, url, false).await
}

/// Probe `url`; `retried` is set on the re-probe that follows a `PUT` so a
/// store that keeps answering `no_db_file` is reported instead of looped on.
fn ensure_guarded<'a>(
	transport: &'a dyn Transport,
	url: &'a str,
	retried: bool,
) -> BoxFuture<'a, Result<DatabaseState, SyncError>> {
	Box::pin(async move {
		match info(transport, url).await {
			Ok(_) => {
				debug!("database {} is available", url);
				Ok(DatabaseState::Existing)
			}
			Err(SyncError::Store(err)) if !retried && is_missing_database(&err) => {
				info!("database {} does not exist, creating it", url);
				let created = transport.request(Method::PUT, url, None).await?;
				if let Some(put_err) = store_error(&created) {
					warn!("creating database {} failed: {}", url, put_err);
				}
				ensure_guarded(transport, url, true)
					.await
					.map(|_| DatabaseState::Created)
			}
			Err(SyncError::Store(err)) => Err(SyncError::Bootstrap(err)),
			Err(e) => Err(e),
		}
	})
}
