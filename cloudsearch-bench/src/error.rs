use anyhow::anyhow;
use reqwest::{Response, StatusCode};
use thiserror::Error;

use crate::StdError;

/// Maximum number of characters of a response body kept in an error.
pub const BODY_SNIPPET_MAX_LENGTH: usize = 512;

/// Error raised while building an adapter from its configuration.
///
/// Those errors are fatal at construction and never retried.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// Error raised when a required parameter is not present.
    #[error("Parameter '{0}' is mandatory.")]
    Required(String),

    /// A parameter is present but its value can not be used.
    #[error("Parameter '{name}' has an invalid value: '{value}'.")]
    InvalidParameter {
        /// Name of the parameter
        name: String,
        /// Raw value of the parameter
        value: String,
    },

    /// The configured API version is not one of the supported generations.
    #[error("Unsupported API version '{0}', expected '2011' or '2013'.")]
    UnsupportedApiVersion(String),

    /// The HTTP client could not be created from the configuration.
    #[error("HTTP client creation failed")]
    HttpClientCreation(#[source] StdError),
}

/// Error structure for the [HttpClient][crate::HttpClient].
#[derive(Error, Debug)]
pub enum HttpClientError {
    /// The request did not complete within the configured socket timeout.
    #[error("request timed out")]
    Timeout(#[source] StdError),

    /// Could not reach the remote service.
    #[error("remote server unreachable")]
    RemoteServerUnreachable(#[source] StdError),

    /// The remote service answered with a status that the query does not handle.
    #[error("unexpected status code: {status}, response text: {body}")]
    UnexpectedStatus {
        /// Status returned by the remote service
        status: StatusCode,
        /// Beginning of the response body
        body: String,
    },

    /// Could not parse response.
    #[error("json parsing failed")]
    JsonParseFailed(#[source] StdError),

    /// Could not serialize the request body.
    #[error("request body serialization failed")]
    BodySerialization(#[source] StdError),

    /// The url built for the query is not valid.
    #[error("invalid endpoint")]
    InvalidEndpoint(#[source] StdError),

    /// The request could not be signed.
    #[error("request signing failed")]
    SigningFailed(#[source] StdError),
}

impl HttpClientError {
    /// Create an `HttpClientError` from a response that the query could not handle.
    pub async fn from_response(response: Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        Self::UnexpectedStatus {
            status,
            body: body_snippet(&body),
        }
    }

    /// Create an `HttpClientError` from an error returned by the underlying reqwest client.
    pub fn from_reqwest_error(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(anyhow!(error))
        } else {
            Self::RemoteServerUnreachable(anyhow!(error))
        }
    }

    /// Check if a new attempt of the request that produced this error may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RemoteServerUnreachable(_) => true,
            Self::UnexpectedStatus { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

/// Error raised by the [BatchUploader][crate::uploader::BatchUploader].
#[derive(Error, Debug)]
pub enum UploadError {
    /// The document service answered with a non success status.
    #[error("batch upload failed with status {status}: {body}")]
    Status {
        /// Status returned by the document service
        status: StatusCode,
        /// Beginning of the response body
        body: String,
    },

    /// The document service accepted the request but reported errors for the batch.
    #[error("batch rejected by the document service: {}", .errors.join("; "))]
    Rejected {
        /// Messages reported by the document service
        errors: Vec<String>,
    },

    /// The batch response body could not be understood.
    #[error("malformed batch response")]
    MalformedResponse(#[source] StdError),

    /// The round trip did not complete.
    #[error("batch upload transport failure")]
    Transport(#[source] HttpClientError),
}

impl From<HttpClientError> for UploadError {
    fn from(error: HttpClientError) -> Self {
        match error {
            HttpClientError::UnexpectedStatus { status, body } => Self::Status { status, body },
            HttpClientError::JsonParseFailed(source) => Self::MalformedResponse(source),
            error => Self::Transport(error),
        }
    }
}

/// Error raised by the [SearchAdapter][crate::search::SearchAdapter].
#[derive(Error, Debug)]
pub enum SearchError {
    /// The search service answered with a non success status.
    #[error("search failed with status {status}: {body}")]
    Status {
        /// Status returned by the search service
        status: StatusCode,
        /// Beginning of the response body
        body: String,
    },

    /// The search did not complete within the configured socket timeout.
    #[error("search timed out")]
    Timeout(#[source] StdError),

    /// The search succeeded but did not find any document.
    #[error("search for '{query}' did not find any document")]
    EmptyResult {
        /// Text of the query that found nothing
        query: String,
    },

    /// The search response body could not be understood.
    #[error("malformed search response")]
    MalformedResponse(#[source] StdError),

    /// The round trip did not complete.
    #[error("search transport failure")]
    Transport(#[source] HttpClientError),
}

impl From<HttpClientError> for SearchError {
    fn from(error: HttpClientError) -> Self {
        match error {
            HttpClientError::UnexpectedStatus { status, body } => Self::Status { status, body },
            HttpClientError::Timeout(source) => Self::Timeout(source),
            HttpClientError::JsonParseFailed(source) => Self::MalformedResponse(source),
            error => Self::Transport(error),
        }
    }
}

pub(crate) fn body_snippet(body: &str) -> String {
    match body.char_indices().nth(BODY_SNIPPET_MAX_LENGTH) {
        Some((index, _)) => format!("{}...", &body[..index]),
        None => body.to_string(),
    }
}
