use anyhow::anyhow;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use slog::{Logger, Record, Serializer};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::HttpClientResult;
use crate::error::HttpClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl Display for QueryMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryMethod::Get => write!(f, "GET"),
            QueryMethod::Head => write!(f, "HEAD"),
            QueryMethod::Post => write!(f, "POST"),
            QueryMethod::Put => write!(f, "PUT"),
            QueryMethod::Delete => write!(f, "DELETE"),
        }
    }
}

impl From<QueryMethod> for Method {
    fn from(method: QueryMethod) -> Self {
        match method {
            QueryMethod::Get => Method::GET,
            QueryMethod::Head => Method::HEAD,
            QueryMethod::Post => Method::POST,
            QueryMethod::Put => Method::PUT,
            QueryMethod::Delete => Method::DELETE,
        }
    }
}

/// A request sent through the [HttpClient][crate::HttpClient] and the interpretation of its
/// response.
#[async_trait::async_trait]
pub trait HttpQuery: Send + Sync {
    type Response;
    type Body: serde::Serialize + Sized;

    fn method() -> QueryMethod;

    /// Route of the query, relative to the endpoint of the client.
    ///
    /// An empty route targets the endpoint itself.
    fn route(&self) -> String;

    fn query_parameters(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn body(&self) -> Option<Self::Body> {
        None
    }

    fn entry_log_additional_fields(&self) -> QueryLogFields {
        QueryLogFields::default()
    }

    async fn handle_response(&self, context: QueryContext) -> HttpClientResult<Self::Response>;
}

pub struct QueryContext {
    pub(crate) response: Response,
    pub(crate) logger: Logger,
}

impl QueryContext {
    pub async fn unhandled_status_code(self) -> HttpClientError {
        HttpClientError::from_response(self.response).await
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct QueryLogFields {
    kv: BTreeSet<(&'static str, String)>,
}

impl<const N: usize> From<[(&'static str, String); N]> for QueryLogFields {
    fn from(value: [(&'static str, String); N]) -> Self {
        Self {
            kv: BTreeSet::from(value),
        }
    }
}

impl slog::KV for QueryLogFields {
    fn serialize(&self, _record: &Record, serializer: &mut dyn Serializer) -> slog::Result {
        for (k, v) in &self.kv {
            serializer.emit_arguments(*k, &format_args!("{v}"))?;
        }
        Ok(())
    }
}

/// Extension trait for [reqwest::Response] to reduce boilerplate with our library.
#[async_trait::async_trait]
pub trait ResponseExt {
    /// Try to deserialize the response body as JSON, wrapping the error in
    /// [HttpClientError::JsonParseFailed].
    async fn parse_json<T: DeserializeOwned>(self) -> HttpClientResult<T>;

    /// Read the whole response body as text, wrapping the error in
    /// [HttpClientError::RemoteServerUnreachable].
    async fn read_text(self) -> HttpClientResult<String>;
}

#[async_trait::async_trait]
impl ResponseExt for Response {
    async fn parse_json<T: DeserializeOwned>(self) -> HttpClientResult<T> {
        let json = self
            .json()
            .await
            .map_err(|err| HttpClientError::JsonParseFailed(anyhow!(err)))?;
        Ok(json)
    }

    async fn read_text(self) -> HttpClientResult<String> {
        self.text().await.map_err(HttpClientError::from_reqwest_error)
    }
}

#[cfg(test)]
mod tests {
    use slog::info;

    use crate::test::TestLogger;

    use super::*;

    #[test]
    fn query_method_converts_to_http_method() {
        assert_eq!(Method::GET, Method::from(QueryMethod::Get));
        assert_eq!(Method::HEAD, Method::from(QueryMethod::Head));
        assert_eq!(Method::POST, Method::from(QueryMethod::Post));
        assert_eq!(Method::PUT, Method::from(QueryMethod::Put));
        assert_eq!(Method::DELETE, Method::from(QueryMethod::Delete));
    }

    #[test]
    fn query_log_fields_are_emitted_with_the_record() {
        let (logger, inspector) = TestLogger::memory();
        let fields = QueryLogFields::from([("id", "user1".to_string()), ("version", "7".to_string())]);

        info!(logger, "query sent"; fields);

        assert!(inspector.contains_log("id=user1"), "{inspector}");
        assert!(inspector.contains_log("version=7"), "{inspector}");
    }
}
