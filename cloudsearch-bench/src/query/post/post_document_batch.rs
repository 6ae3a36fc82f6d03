use async_trait::async_trait;
use serde::Deserialize;

use crate::HttpClientResult;
use crate::document::BatchDocument;
use crate::query::{HttpQuery, QueryContext, QueryLogFields, QueryMethod, ResponseExt};

/// Status reported by the document service for a batch it fully applied
pub const BATCH_SUCCESS_STATUS: &str = "success";

/// Body of a document service answer to a batch upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchResponse {
    /// `success` or `error`
    pub status: String,
    /// Number of added documents
    #[serde(default)]
    pub adds: u64,
    /// Number of deleted documents
    #[serde(default)]
    pub deletes: u64,
    /// Errors reported for the batch
    #[serde(default)]
    pub errors: Vec<BatchResponseMessage>,
    /// Warnings reported for the batch
    #[serde(default)]
    pub warnings: Vec<BatchResponseMessage>,
}

impl BatchResponse {
    /// Check if the document service applied the whole batch
    pub fn is_success(&self) -> bool {
        self.status == BATCH_SUCCESS_STATUS
    }
}

/// Error or warning message of a [BatchResponse]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchResponseMessage {
    /// Text of the message
    pub message: String,
}

/// Query to upload a batch of documents to a document service.
pub struct PostDocumentBatchQuery {
    batch_path: String,
    documents: Vec<BatchDocument>,
}

impl PostDocumentBatchQuery {
    /// Instantiate a new query to upload the given documents to the batch route
    pub fn new<P: Into<String>>(batch_path: P, documents: Vec<BatchDocument>) -> Self {
        Self {
            batch_path: batch_path.into(),
            documents,
        }
    }
}

#[async_trait]
impl HttpQuery for PostDocumentBatchQuery {
    type Response = BatchResponse;
    type Body = Vec<BatchDocument>;

    fn method() -> QueryMethod {
        QueryMethod::Post
    }

    fn route(&self) -> String {
        self.batch_path.clone()
    }

    fn body(&self) -> Option<Self::Body> {
        Some(self.documents.clone())
    }

    fn entry_log_additional_fields(&self) -> QueryLogFields {
        let ids = self
            .documents
            .iter()
            .map(|document| match document {
                BatchDocument::Add { id, .. } | BatchDocument::Delete { id, .. } => id.as_str(),
            })
            .collect::<Vec<_>>()
            .join(",");

        QueryLogFields::from([("documents", self.documents.len().to_string()), ("ids", ids)])
    }

    async fn handle_response(&self, context: QueryContext) -> HttpClientResult<Self::Response> {
        match context.response.status() {
            status if status.is_success() => context.response.parse_json().await,
            _ => Err(context.unhandled_status_code().await),
        }
    }
}
