use std::time::Duration;

use anyhow::Context;
use reqwest::{IntoUrl, Url};
use slog::{Logger, o};

use crate::StdResult;
use crate::client::HttpClient;
use crate::logging::LoggerExtensions;
use crate::signer::RequestSigner;

/// A builder of [HttpClient]
pub struct HttpClientBuilder {
    endpoint_result: reqwest::Result<Url>,
    timeout: Option<Duration>,
    max_retries: u32,
    signer: Option<RequestSigner>,
    debug: bool,
    logger: Option<Logger>,
}

impl HttpClientBuilder {
    /// Constructs a new `HttpClientBuilder`.
    //
    // This is the same as `HttpClient::builder()`.
    pub fn new<U: IntoUrl>(endpoint: U) -> Self {
        Self {
            endpoint_result: endpoint.into_url(),
            timeout: None,
            max_retries: 0,
            signer: None,
            debug: false,
            logger: None,
        }
    }

    /// Set the [Logger] to use.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Set the timeout of a single attempt, `None` keeps the transport default (no timeout).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of additional attempts made after a transient failure.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the signer applied to every request, `None` sends them unsigned.
    pub fn with_signer(mut self, signer: Option<RequestSigner>) -> Self {
        self.signer = signer;
        self
    }

    /// Log request and response details at `info` level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Returns an [HttpClient] based on the builder configuration
    pub fn build(self) -> StdResult<HttpClient> {
        let endpoint = self
            .endpoint_result
            .with_context(|| "Invalid endpoint, it must be a correctly formed url")?;
        let logger = self.logger.unwrap_or_else(|| Logger::root(slog::Discard, o!()));

        let mut client_builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        let client = client_builder
            .build()
            .with_context(|| "Building http client failed")?;

        Ok(HttpClient {
            endpoint,
            client,
            max_retries: self.max_retries,
            signer: self.signer,
            debug: self.debug,
            logger: logger.new_with_component_name::<HttpClient>(),
        })
    }
}

pub(crate) fn enforce_trailing_slash(url: Url) -> Url {
    // Trailing slash is significant because url::join
    // (https://docs.rs/url/latest/url/struct.Url.html#method.join) will remove
    // the 'path' part of the url if it doesn't end with a trailing slash.
    if url.as_str().ends_with('/') {
        url
    } else {
        let mut url = url.clone();
        url.set_path(&format!("{}/", url.path()));
        url
    }
}
