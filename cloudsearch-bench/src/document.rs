//! Document model: conversion of benchmark records to batch documents and of search hits back
//! to records.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record_store::{FieldMap, FieldSet};

/// Language of the indexed text, fixed for every document.
pub const DOCUMENT_LANG: &str = "en";

/// A benchmark record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Table the record belongs to
    pub table: String,
    /// Key of the record, unique within its table
    pub key: String,
    /// Field values of the record
    pub fields: FieldMap,
}

impl Record {
    /// Record constructor
    pub fn new<T: Into<String>, K: Into<String>>(table: T, key: K, fields: FieldMap) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            fields,
        }
    }
}

/// One operation of a document batch.
///
/// The `version` orders conflicting operations on the same key: the service keeps the highest
/// version and may silently drop an operation whose version is lower than one it already saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Add or replace a document
    Add {
        /// Record to index
        record: Record,
        /// Version of the document
        version: i64,
    },
    /// Delete a document
    Delete {
        /// Key of the document to delete
        key: String,
        /// Version of the deletion
        version: i64,
    },
}

impl BatchOperation {
    /// Key of the document targeted by the operation
    pub fn key(&self) -> &str {
        match self {
            BatchOperation::Add { record, .. } => &record.key,
            BatchOperation::Delete { key, .. } => key,
        }
    }

    /// Version of the operation
    pub fn version(&self) -> i64 {
        match self {
            BatchOperation::Add { version, .. } | BatchOperation::Delete { version, .. } => {
                *version
            }
        }
    }

    /// Name of the operation type as sent on the wire
    pub fn type_name(&self) -> &'static str {
        match self {
            BatchOperation::Add { .. } => "add",
            BatchOperation::Delete { .. } => "delete",
        }
    }
}

/// Wire representation of a [BatchOperation].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BatchDocument {
    /// `add` document
    Add {
        /// Document id
        id: String,
        /// Document version
        version: i64,
        /// Language of the document text
        lang: String,
        /// Indexed fields
        fields: FieldMap,
    },
    /// `delete` document
    Delete {
        /// Document id
        id: String,
        /// Document version
        version: i64,
    },
}

/// Convert an operation to its batch document.
///
/// If `table_field` is set, the table name of an added record is merged in its fields under this
/// reserved key so that several tables can share a single index.
pub fn to_batch_document(operation: &BatchOperation, table_field: Option<&str>) -> BatchDocument {
    match operation {
        BatchOperation::Add { record, version } => {
            let mut fields = record.fields.clone();
            if let Some(table_field) = table_field {
                fields.insert(table_field.to_string(), record.table.clone());
            }

            BatchDocument::Add {
                id: record.key.clone(),
                version: *version,
                lang: DOCUMENT_LANG.to_string(),
                fields,
            }
        }
        BatchOperation::Delete { key, version } => BatchDocument::Delete {
            id: key.clone(),
            version: *version,
        },
    }
}

/// Wrap an operation in the batch envelope expected by the document service.
///
/// The envelope is an array, batches sent by this crate always hold a single document.
pub fn to_batch(operation: &BatchOperation, table_field: Option<&str>) -> Vec<BatchDocument> {
    vec![to_batch_document(operation, table_field)]
}

/// Search response body, shared by both API generations.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    /// Hits of the search
    #[serde(default)]
    pub hits: SearchHits,
}

/// Hits section of a search response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchHits {
    /// Total number of documents matching the query
    #[serde(default)]
    pub found: u64,
    /// Offset of the first returned hit
    #[serde(default)]
    pub start: u64,
    /// Returned hits
    #[serde(default)]
    pub hit: Vec<SearchHit>,
}

/// A document returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchHit {
    /// Document id, empty if the service did not return it
    #[serde(default)]
    pub id: String,
    /// Returned fields, named `data` by the 2011 API
    #[serde(default, alias = "data")]
    pub fields: BTreeMap<String, Value>,
}

impl SearchHit {
    /// Extract the field values of the hit as a record field map.
    ///
    /// Only the requested fields are kept if a field set is given.
    pub fn to_field_map(&self, requested: Option<&FieldSet>) -> FieldMap {
        to_field_map(&self.fields, requested)
    }
}

/// Convert JSON field values returned by a search service to a record field map.
///
/// Single-element arrays are unwrapped, longer arrays are joined with `,`.
pub fn to_field_map(fields: &BTreeMap<String, Value>, requested: Option<&FieldSet>) -> FieldMap {
    fields
        .iter()
        .filter(|(name, _)| requested.is_none_or(|requested| requested.contains(*name)))
        .map(|(name, value)| (name.clone(), flatten_value(value)))
        .collect()
}

fn flatten_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Array(values) => values.iter().map(flatten_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Source of the current time as seconds since epoch.
#[cfg_attr(test, mockall::automock)]
pub trait EpochClock: Send + Sync {
    /// Current time in seconds since epoch
    fn now_epoch_seconds(&self) -> i64;
}

/// [EpochClock] reading the system time.
#[derive(Debug, Default)]
pub struct SystemEpochClock;

impl EpochClock for SystemEpochClock {
    fn now_epoch_seconds(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Issue document versions derived from the current time.
///
/// Versions issued by a clock never decrease, even if the time source steps back.
pub struct VersionClock {
    clock: Box<dyn EpochClock>,
    last_issued: AtomicI64,
}

impl VersionClock {
    /// Create a version clock reading the given time source
    pub fn new(clock: Box<dyn EpochClock>) -> Self {
        Self {
            clock,
            last_issued: AtomicI64::new(i64::MIN),
        }
    }

    /// Version for a new operation
    pub fn next_version(&self) -> i64 {
        let now = self.clock.now_epoch_seconds();
        let previous = self.last_issued.fetch_max(now, Ordering::SeqCst);

        previous.max(now)
    }
}

impl Default for VersionClock {
    fn default() -> Self {
        Self::new(Box::new(SystemEpochClock))
    }
}
