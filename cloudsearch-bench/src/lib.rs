#![warn(missing_docs)]

//! Record storage benchmark adapter for remote document search services.
//!
//! This crate maps the generic insert / read / update / delete / scan workload of a record
//! storage benchmark onto the HTTP API of a document search service:
//!
//! - [CloudSearchRecordStore]: an Amazon CloudSearch domain, speaking either the `2011-02-01` or
//!   the `2013-01-01` API generation depending on its [configuration][CloudSearchConfiguration].
//! - [ElasticsearchRecordStore]: an Elasticsearch cluster through its REST API.
//!
//! Both implement the [RecordStore] trait: every operation is a single round trip whose outcome
//! is reported as a two-valued [Status] code.
//!
//! Note: the search index of those services is eventually consistent, a `read` issued right
//! after an `insert` of the same key may fail until the document has been indexed.

mod builder;
mod client;
pub mod configuration;
pub mod document;
mod error;
pub mod logging;
pub mod protocol;
pub mod query;
pub mod record_store;
pub mod search;
mod signer;
pub mod uploader;

#[cfg(test)]
pub(crate) mod test;

pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use configuration::{CloudSearchConfiguration, ConfigParameters, ElasticsearchConfiguration};
pub use error::*;
pub use record_store::{
    CloudSearchRecordStore, ElasticsearchRecordStore, FieldMap, FieldSet, RecordStore, Status,
};
pub use signer::RequestSigner;

/// Generic error type
pub type StdError = anyhow::Error;

/// Generic result type
pub type StdResult<T> = anyhow::Result<T, StdError>;

/// Result type of the [HttpClient]
pub type HttpClientResult<T> = Result<T, HttpClientError>;
