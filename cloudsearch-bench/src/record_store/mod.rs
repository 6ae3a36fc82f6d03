//! Record stores: the uniform record operations of the benchmark, mapped onto a document
//! service.

mod cloudsearch;
mod elasticsearch;

pub use cloudsearch::CloudSearchRecordStore;
pub use elasticsearch::ElasticsearchRecordStore;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use async_trait::async_trait;

/// Field values of a record, ordered by field name.
pub type FieldMap = BTreeMap<String, String>;

/// Names of the fields to read, all fields are read when no set is given.
pub type FieldSet = BTreeSet<String>;

/// Outcome of a record operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The operation succeeded
    Ok = 0,
    /// The operation failed, the cause is logged
    Error = 1,
}

impl Status {
    /// Numeric result code of the benchmark: `0` for success, `1` for failure
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Check if the operation succeeded
    pub fn is_ok(&self) -> bool {
        *self == Status::Ok
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
            Status::Error => write!(f, "ERROR"),
        }
    }
}

impl<T, E> From<&Result<T, E>> for Status {
    fn from(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(_) => Status::Error,
        }
    }
}

/// Record operations of the benchmark.
///
/// A record store is owned by a single worker: calls are never issued concurrently on the same
/// instance. No operation returns an error, failures are logged and reported as
/// [Status::Error].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record in the table
    async fn insert(&self, table: &str, key: &str, values: &FieldMap) -> Status;

    /// Read a record, its fields are added to `result`
    async fn read(
        &self,
        table: &str,
        key: &str,
        fields: Option<&FieldSet>,
        result: &mut FieldMap,
    ) -> Status;

    /// Update the given fields of a record
    async fn update(&self, table: &str, key: &str, values: &FieldMap) -> Status;

    /// Delete a record
    async fn delete(&self, table: &str, key: &str) -> Status;

    /// Read up to `count` records starting at `start_key`, one map per record is appended to
    /// `result`
    async fn scan(
        &self,
        table: &str,
        start_key: &str,
        count: usize,
        fields: Option<&FieldSet>,
        result: &mut Vec<FieldMap>,
    ) -> Status;

    /// Release the resources of the store, no operation may be issued afterward
    async fn cleanup(&self);
}
