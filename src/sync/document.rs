use serde_json::{Map, Value};

use crate::couch::SyncError;

/// A single CouchDB document.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";
pub const REV_FIELD: &str = "_rev";

/// Returns the document's identifier when it is a non-empty string.
pub fn doc_id(doc: &Document) -> Option<&str> {
	doc.get(ID_FIELD)
		.and_then(Value::as_str)
		.filter(|id| !id.is_empty())
}

/// An ordered, validated collection of documents ready to be pushed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSet {
	docs: Vec<Document>,
}

impl DocumentSet {
	/// Builds a set from rendered bundle JSON.
	///
	/// An object carrying `_id` is a single document and becomes a
	/// one-element set. Anything else must be an object with a `docs` array
	/// whose elements are all objects.
	pub fn from_value(value: Value) -> Result<Self, SyncError> {
		let mut root = match value {
			Value::Object(map) => map,
			_ => return Err(SyncError::Validation("no docs array".to_string())),
		};

		if root.contains_key(ID_FIELD) {
			return Ok(Self { docs: vec![root] });
		}

		let items = match root.remove("docs") {
			Some(Value::Array(items)) => items,
			_ => return Err(SyncError::Validation("no docs array".to_string())),
		};

		let docs = items
			.into_iter()
			.enumerate()
			.map(|(i, item)| match item {
				Value::Object(doc) => Ok(doc),
				other => Err(SyncError::Validation(format!(
					"docs[{}] is not an object: {}",
					i, other
				))),
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self { docs })
	}

	pub fn parse(input: &str) -> Result<Self, SyncError> {
		let value: Value = serde_json::from_str(input)
			.map_err(|e| SyncError::Validation(format!("input is not JSON: {}", e)))?;
		Self::from_value(value)
	}

	pub fn len(&self) -> usize {
		self.docs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.docs.is_empty()
	}

	pub fn docs(&self) -> &[Document] {
		&self.docs
	}

	/// Splits the set into successive batches of at most `batch_size`
	/// documents, in input order.
	pub fn into_batches(self, batch_size: usize) -> Vec<Vec<Document>> {
		let size = batch_size.max(1);
		let mut batches = Vec::with_capacity(self.docs.len().div_ceil(size));
		let mut rest = self.docs.into_iter().peekable();
		while rest.peek().is_some() {
			batches.push(rest.by_ref().take(size).collect());
		}
		batches
	}
}

impl From<Vec<Document>> for DocumentSet {
	fn from(docs: Vec<Document>) -> Self {
		Self { docs }
	}
}
