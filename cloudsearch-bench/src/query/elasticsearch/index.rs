use async_trait::async_trait;
use reqwest::StatusCode;

use crate::HttpClientResult;
use crate::query::{HttpQuery, QueryContext, QueryLogFields, QueryMethod};

use super::path_segment;

/// Query to check if an Elasticsearch index exists.
pub struct HeadIndexQuery {
    index: String,
}

impl HeadIndexQuery {
    /// Instantiate a query checking the given index
    pub fn new<I: Into<String>>(index: I) -> Self {
        Self {
            index: index.into(),
        }
    }
}

#[async_trait]
impl HttpQuery for HeadIndexQuery {
    type Response = bool;
    type Body = ();

    fn method() -> QueryMethod {
        QueryMethod::Head
    }

    fn route(&self) -> String {
        path_segment(&self.index)
    }

    async fn handle_response(&self, context: QueryContext) -> HttpClientResult<Self::Response> {
        match context.response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(context.unhandled_status_code().await),
        }
    }
}

/// Query to create an Elasticsearch index with the cluster default settings.
pub struct PutIndexQuery {
    index: String,
}

impl PutIndexQuery {
    /// Instantiate a query creating the given index
    pub fn new<I: Into<String>>(index: I) -> Self {
        Self {
            index: index.into(),
        }
    }
}

#[async_trait]
impl HttpQuery for PutIndexQuery {
    type Response = ();
    type Body = ();

    fn method() -> QueryMethod {
        QueryMethod::Put
    }

    fn route(&self) -> String {
        path_segment(&self.index)
    }

    fn entry_log_additional_fields(&self) -> QueryLogFields {
        QueryLogFields::from([("index", self.index.clone())])
    }

    async fn handle_response(&self, context: QueryContext) -> HttpClientResult<Self::Response> {
        match context.response.status() {
            status if status.is_success() => Ok(()),
            _ => Err(context.unhandled_status_code().await),
        }
    }
}

/// Query to delete an Elasticsearch index and all its documents.
///
/// Deleting an index that does not exist succeeds.
pub struct DeleteIndexQuery {
    index: String,
}

impl DeleteIndexQuery {
    /// Instantiate a query deleting the given index
    pub fn new<I: Into<String>>(index: I) -> Self {
        Self {
            index: index.into(),
        }
    }
}

#[async_trait]
impl HttpQuery for DeleteIndexQuery {
    type Response = ();
    type Body = ();

    fn method() -> QueryMethod {
        QueryMethod::Delete
    }

    fn route(&self) -> String {
        path_segment(&self.index)
    }

    fn entry_log_additional_fields(&self) -> QueryLogFields {
        QueryLogFields::from([("index", self.index.clone())])
    }

    async fn handle_response(&self, context: QueryContext) -> HttpClientResult<Self::Response> {
        match context.response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Ok(()),
            _ => Err(context.unhandled_status_code().await),
        }
    }
}
