//! Command module
//! This module holds the subcommands that can be used from the CLI.
//!
//! Record commands issue a single operation against the configured backend and print its
//! outcome as a JSON line on stdout, a failed operation makes the process exit with an error.

mod delete;
mod insert;
mod read;
mod report;
mod scan;
mod update;

pub use delete::*;
pub use insert::*;
pub use read::*;
pub use report::*;
pub use scan::*;
pub use update::*;

use anyhow::anyhow;
use clap::Args;
use serde::Serialize;

use cloudsearch_bench::{FieldMap, FieldSet, Status, StdResult};

/// Default table of the record commands
pub const DEFAULT_TABLE: &str = "usertable";

/// Record targeted by a command
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RecordTarget {
    /// Table of the record
    #[clap(long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Key of the record
    pub key: String,
}

/// Parse a `name=value` field argument
pub fn parse_field(field: &str) -> Result<(String, String), String> {
    match field.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("invalid field '{field}', expected 'name=value'")),
    }
}

/// Fields to read, `None` when every field is requested
pub(crate) fn field_set(fields: &[String]) -> Option<FieldSet> {
    if fields.is_empty() {
        None
    } else {
        Some(fields.iter().cloned().collect())
    }
}

/// Outcome of a record command, printed as a JSON line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationReport {
    /// Name of the operation
    pub operation: &'static str,
    /// Result code: `0` for success, `1` for failure
    pub status: i32,
    /// Table of the record
    pub table: String,
    /// Key of the record, start key for a scan
    pub key: String,
    /// Fields of the record read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<FieldMap>,
    /// Records returned by a scan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<FieldMap>>,
}

impl OperationReport {
    pub(crate) fn new(operation: &'static str, status: Status, target: &RecordTarget) -> Self {
        Self {
            operation,
            status: status.code(),
            table: target.table.clone(),
            key: target.key.clone(),
            record: None,
            records: None,
        }
    }

    pub(crate) fn with_record(mut self, record: FieldMap) -> Self {
        self.record = Some(record);
        self
    }

    pub(crate) fn with_records(mut self, records: Vec<FieldMap>) -> Self {
        self.records = Some(records);
        self
    }

    /// Check if the operation succeeded
    pub fn is_success(&self) -> bool {
        self.status == Status::Ok.code()
    }

    /// Print the report on stdout, fails if the operation failed
    pub fn print(&self) -> StdResult<()> {
        println!("{}", serde_json::to_string(self)?);

        if self.is_success() {
            Ok(())
        } else {
            Err(anyhow!(
                "{} of key '{}' in table '{}' failed with status code {}",
                self.operation,
                self.key,
                self.table,
                self.status
            ))
        }
    }
}
