use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::HttpClientResult;
use crate::query::{HttpQuery, QueryContext, QueryLogFields, QueryMethod, ResponseExt};

use super::path_segment;

/// Source of an Elasticsearch document.
pub type DocumentSource = BTreeMap<String, Value>;

/// Location of a document in an Elasticsearch cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLocation {
    /// Index holding the document
    pub index: String,
    /// Mapping type of the document, the benchmark table
    pub doc_type: String,
    /// Id of the document, the record key
    pub id: String,
}

impl DocumentLocation {
    /// Location constructor
    pub fn new<I: Into<String>, T: Into<String>, K: Into<String>>(
        index: I,
        doc_type: T,
        id: K,
    ) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
        }
    }

    fn route(&self) -> String {
        format!(
            "{}/{}/{}",
            path_segment(&self.index),
            path_segment(&self.doc_type),
            path_segment(&self.id)
        )
    }

    fn log_fields(&self) -> QueryLogFields {
        QueryLogFields::from([
            ("index", self.index.clone()),
            ("type", self.doc_type.clone()),
            ("id", self.id.clone()),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct GetDocumentResponse {
    #[serde(default)]
    found: bool,
    #[serde(default, rename = "_source")]
    source: DocumentSource,
}

/// Query to fetch the source of a document.
///
/// Returns `None` if the document does not exist.
pub struct GetDocumentQuery {
    location: DocumentLocation,
}

impl GetDocumentQuery {
    /// Instantiate a query fetching the document at the given location
    pub fn new(location: DocumentLocation) -> Self {
        Self { location }
    }
}

#[async_trait]
impl HttpQuery for GetDocumentQuery {
    type Response = Option<DocumentSource>;
    type Body = ();

    fn method() -> QueryMethod {
        QueryMethod::Get
    }

    fn route(&self) -> String {
        self.location.route()
    }

    fn entry_log_additional_fields(&self) -> QueryLogFields {
        self.location.log_fields()
    }

    async fn handle_response(&self, context: QueryContext) -> HttpClientResult<Self::Response> {
        match context.response.status() {
            StatusCode::OK => {
                let response: GetDocumentResponse = context.response.parse_json().await?;
                Ok(response.found.then_some(response.source))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(context.unhandled_status_code().await),
        }
    }
}

/// Query to index a document, replacing any previous version of it.
pub struct PutDocumentQuery {
    location: DocumentLocation,
    source: DocumentSource,
}

impl PutDocumentQuery {
    /// Instantiate a query indexing the source at the given location
    pub fn new(location: DocumentLocation, source: DocumentSource) -> Self {
        Self { location, source }
    }
}

#[async_trait]
impl HttpQuery for PutDocumentQuery {
    type Response = ();
    type Body = DocumentSource;

    fn method() -> QueryMethod {
        QueryMethod::Put
    }

    fn route(&self) -> String {
        self.location.route()
    }

    fn body(&self) -> Option<Self::Body> {
        Some(self.source.clone())
    }

    fn entry_log_additional_fields(&self) -> QueryLogFields {
        self.location.log_fields()
    }

    async fn handle_response(&self, context: QueryContext) -> HttpClientResult<Self::Response> {
        match context.response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            _ => Err(context.unhandled_status_code().await),
        }
    }
}

/// Query to delete a document.
pub struct DeleteDocumentQuery {
    location: DocumentLocation,
}

impl DeleteDocumentQuery {
    /// Instantiate a query deleting the document at the given location
    pub fn new(location: DocumentLocation) -> Self {
        Self { location }
    }
}

#[async_trait]
impl HttpQuery for DeleteDocumentQuery {
    type Response = ();
    type Body = ();

    fn method() -> QueryMethod {
        QueryMethod::Delete
    }

    fn route(&self) -> String {
        self.location.route()
    }

    fn entry_log_additional_fields(&self) -> QueryLogFields {
        self.location.log_fields()
    }

    async fn handle_response(&self, context: QueryContext) -> HttpClientResult<Self::Response> {
        match context.response.status() {
            StatusCode::OK => Ok(()),
            _ => Err(context.unhandled_status_code().await),
        }
    }
}
