use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::HttpClientResult;
use crate::document::SearchResponse;
use crate::error::HttpClientError;
use crate::query::{HttpQuery, QueryContext, QueryLogFields, QueryMethod, ResponseExt};

/// Structured search request of the `2013-01-01` search API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedSearchRequest {
    /// Search text, in the simple query parser syntax
    pub query: String,
    /// Fields to return with each hit, all of them if empty
    pub return_fields: Vec<String>,
}

impl TypedSearchRequest {
    /// Request searching the given text with the service defaults
    pub fn new<Q: Into<String>>(query: Q) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Restrict the fields returned with each hit
    pub fn with_return_fields<I: IntoIterator<Item = String>>(mut self, fields: I) -> Self {
        self.return_fields = fields.into_iter().collect();
        self
    }

    fn to_parameters(&self) -> Vec<(&'static str, String)> {
        let mut parameters = vec![("q", self.query.clone())];
        if !self.return_fields.is_empty() {
            parameters.push(("return", self.return_fields.join(",")));
        }

        parameters
    }
}

/// Decoded answer of a typed search, along with its raw body.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedSearchResult {
    /// Decoded response
    pub response: SearchResponse,
    /// Response body as received
    pub raw_body: String,
}

/// Query to search a `2013-01-01` domain through its typed search endpoint.
pub struct GetTypedSearchQuery {
    search_path: String,
    request: TypedSearchRequest,
}

impl GetTypedSearchQuery {
    /// Instantiate a query sending the request to the search route
    pub fn new<P: Into<String>>(search_path: P, request: TypedSearchRequest) -> Self {
        Self {
            search_path: search_path.into(),
            request,
        }
    }
}

#[async_trait]
impl HttpQuery for GetTypedSearchQuery {
    type Response = TypedSearchResult;
    type Body = ();

    fn method() -> QueryMethod {
        QueryMethod::Get
    }

    fn route(&self) -> String {
        self.search_path.clone()
    }

    fn query_parameters(&self) -> Vec<(&'static str, String)> {
        self.request.to_parameters()
    }

    fn entry_log_additional_fields(&self) -> QueryLogFields {
        QueryLogFields::from([("q", self.request.query.clone())])
    }

    async fn handle_response(&self, context: QueryContext) -> HttpClientResult<Self::Response> {
        match context.response.status() {
            StatusCode::OK => {
                let raw_body = context.response.read_text().await?;
                let response = serde_json::from_str(&raw_body)
                    .map_err(|err| HttpClientError::JsonParseFailed(anyhow!(err)))?;

                Ok(TypedSearchResult { response, raw_body })
            }
            _ => Err(context.unhandled_status_code().await),
        }
    }
}
