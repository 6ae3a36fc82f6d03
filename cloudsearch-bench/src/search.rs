//! Search of the documents of a CloudSearch domain.

use slog::{Logger, debug};

use crate::HttpClient;
use crate::document::{SearchHit, SearchResponse};
use crate::error::SearchError;
use crate::logging::LoggerExtensions;
use crate::protocol::{ProtocolRoutes, SearchStrategy};
use crate::query::{GetQueryStringSearchQuery, GetTypedSearchQuery, TypedSearchRequest};

/// Text search issued against a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Text of the query, sent as is
    pub raw_query_text: String,
    /// Fields to return with each hit, all of them if empty.
    ///
    /// Only the `2013-01-01` typed search sends them.
    pub return_fields: Vec<String>,
}

impl SearchQuery {
    /// Query searching the given text
    pub fn new<T: Into<String>>(raw_query_text: T) -> Self {
        Self {
            raw_query_text: raw_query_text.into(),
            return_fields: Vec::new(),
        }
    }

    /// Restrict the fields returned with each hit
    pub fn with_return_fields<I: IntoIterator<Item = String>>(mut self, fields: I) -> Self {
        self.return_fields = fields.into_iter().collect();
        self
    }
}

/// Result of a successful search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Number of documents matching the query, always at least 1
    pub found_count: u64,
    /// Response body as received
    pub raw_body: String,
    /// Decoded hits, may be empty if the body could not be decoded
    pub hits: Vec<SearchHit>,
}

/// Issue searches with the mechanism of the configured API generation.
pub struct SearchAdapter {
    client: HttpClient,
    routes: ProtocolRoutes,
    logger: Logger,
}

impl SearchAdapter {
    /// Create an adapter searching through the given search service client
    pub fn new(client: HttpClient, routes: ProtocolRoutes, logger: Logger) -> Self {
        Self {
            client,
            routes,
            logger: logger.new_with_component_name::<Self>(),
        }
    }

    /// Run the query.
    ///
    /// An empty result is an error: a search is used to approximate the read of a known key.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        match self.routes.search_strategy {
            SearchStrategy::QueryStringGet => self.search_with_query_string(query).await,
            SearchStrategy::TypedSearchCall => self.search_with_typed_call(query).await,
        }
    }

    /// The answer of a query string search is not validated: any `200` counts as one document
    /// found, hits are decoded best effort.
    async fn search_with_query_string(
        &self,
        query: &SearchQuery,
    ) -> Result<SearchOutcome, SearchError> {
        let raw_body = self
            .client
            .send(GetQueryStringSearchQuery::new(&query.raw_query_text))
            .await?;
        let hits = match serde_json::from_str::<SearchResponse>(&raw_body) {
            Ok(response) => response.hits.hit,
            Err(error) => {
                debug!(self.logger, "Could not decode search hits"; "error" => %error);
                Vec::new()
            }
        };

        Ok(SearchOutcome {
            found_count: 1,
            raw_body,
            hits,
        })
    }

    async fn search_with_typed_call(
        &self,
        query: &SearchQuery,
    ) -> Result<SearchOutcome, SearchError> {
        let result = self
            .client
            .send(GetTypedSearchQuery::new(
                &self.routes.search_path,
                TypedSearchRequest::new(&query.raw_query_text)
                    .with_return_fields(query.return_fields.iter().cloned()),
            ))
            .await?;

        let found_count = result.response.hits.found;
        if found_count < 1 {
            return Err(SearchError::EmptyResult {
                query: query.raw_query_text.clone(),
            });
        }

        Ok(SearchOutcome {
            found_count,
            raw_body: result.raw_body,
            hits: result.response.hits.hit,
        })
    }
}
