use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::HttpClientResult;
use crate::query::{HttpQuery, QueryContext, QueryLogFields, QueryMethod, ResponseExt};

use super::{DocumentSource, path_segment};

/// Answer of an Elasticsearch search.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IndexSearchResponse {
    /// Hits section
    #[serde(default)]
    pub hits: IndexSearchHits,
}

/// Hits section of an [IndexSearchResponse].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IndexSearchHits {
    /// Total number of matching documents
    #[serde(default)]
    pub total: Value,
    /// Returned documents
    #[serde(default)]
    pub hits: Vec<IndexSearchHit>,
}

/// A document returned by an Elasticsearch search.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IndexSearchHit {
    /// Id of the document
    #[serde(rename = "_id")]
    pub id: String,
    /// Source of the document
    #[serde(default, rename = "_source")]
    pub source: DocumentSource,
}

/// Query to search the documents of an index.
pub struct PostIndexSearchQuery {
    index: String,
    body: Value,
}

impl PostIndexSearchQuery {
    /// Query returning the `count` first documents, in id order, whose id is greater than or
    /// equal to `start_key`.
    pub fn range_from(index: &str, start_key: &str, count: usize) -> Self {
        Self {
            index: index.to_string(),
            body: json!({
                "size": count,
                "query": { "match_all": {} },
                "post_filter": { "range": { "_id": { "gte": start_key } } },
                "sort": [{ "_id": "asc" }]
            }),
        }
    }
}

#[async_trait]
impl HttpQuery for PostIndexSearchQuery {
    type Response = IndexSearchResponse;
    type Body = Value;

    fn method() -> QueryMethod {
        QueryMethod::Post
    }

    fn route(&self) -> String {
        format!("{}/_search", path_segment(&self.index))
    }

    fn body(&self) -> Option<Self::Body> {
        Some(self.body.clone())
    }

    fn entry_log_additional_fields(&self) -> QueryLogFields {
        QueryLogFields::from([("index", self.index.clone())])
    }

    async fn handle_response(&self, context: QueryContext) -> HttpClientResult<Self::Response> {
        match context.response.status() {
            StatusCode::OK => context.response.parse_json().await,
            _ => Err(context.unhandled_status_code().await),
        }
    }
}
