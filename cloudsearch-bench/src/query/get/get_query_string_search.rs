use async_trait::async_trait;
use reqwest::StatusCode;

use crate::HttpClientResult;
use crate::query::{HttpQuery, QueryContext, QueryLogFields, QueryMethod, ResponseExt};

/// Query to search a `2011-02-01` domain with a plain query string.
///
/// The search endpoint of those domains is configured with its full path, the query targets it
/// as is and returns the raw response body.
pub struct GetQueryStringSearchQuery {
    text: String,
}

impl GetQueryStringSearchQuery {
    /// Instantiate a query searching the given text
    pub fn new<T: Into<String>>(text: T) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl HttpQuery for GetQueryStringSearchQuery {
    type Response = String;
    type Body = ();

    fn method() -> QueryMethod {
        QueryMethod::Get
    }

    fn route(&self) -> String {
        String::new()
    }

    fn query_parameters(&self) -> Vec<(&'static str, String)> {
        vec![("q", self.text.clone())]
    }

    fn entry_log_additional_fields(&self) -> QueryLogFields {
        QueryLogFields::from([("q", self.text.clone())])
    }

    async fn handle_response(&self, context: QueryContext) -> HttpClientResult<Self::Response> {
        match context.response.status() {
            StatusCode::OK => context.response.read_text().await,
            _ => Err(context.unhandled_status_code().await),
        }
    }
}
