use std::time::Duration;

use anyhow::{Context, anyhow};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{IntoUrl, Request, Response, Url};
use slog::{Logger, debug, info, warn};

use crate::builder::{HttpClientBuilder, enforce_trailing_slash};
use crate::error::HttpClientError;
use crate::query::{HttpQuery, QueryContext};
use crate::signer::RequestSigner;
use crate::{HttpClientResult, StdResult};

/// Content type of every JSON body sent by the client.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

const BACKOFF_BASE_DELAY: Duration = Duration::from_millis(100);
const BACKOFF_MAX_DELAY: Duration = Duration::from_secs(5);

/// Client sending [HttpQuery] to a remote endpoint.
///
/// Cloning the client, or deriving one for another endpoint with [rebase][Self::rebase], keeps
/// the same underlying connection handle.
#[derive(Clone)]
pub struct HttpClient {
    pub(super) endpoint: Url,
    pub(super) client: reqwest::Client,
    pub(super) max_retries: u32,
    pub(super) signer: Option<RequestSigner>,
    pub(super) debug: bool,
    pub(super) logger: Logger,
}

impl HttpClient {
    /// Creates a [HttpClientBuilder] to configure a `HttpClient`.
    //
    // This is the same as `HttpClient::builder()`.
    pub fn builder<U: IntoUrl>(endpoint: U) -> HttpClientBuilder {
        HttpClientBuilder::new(endpoint)
    }

    /// Endpoint that the query routes are relative to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Derive a client targeting another endpoint, sharing this client connection handle
    /// and settings.
    pub fn rebase<U: IntoUrl>(&self, endpoint: U) -> StdResult<Self> {
        let endpoint = endpoint
            .into_url()
            .with_context(|| "Invalid endpoint, it must be a correctly formed url")?;

        Ok(Self {
            endpoint,
            ..self.clone()
        })
    }

    /// Send the query, retrying transient failures, and let it interpret the response.
    pub async fn send<Q: HttpQuery>(&self, query: Q) -> HttpClientResult<Q::Response> {
        let url = self.join_endpoint(&query.route())?;
        let body = match query.body() {
            Some(body) => Some(
                serde_json::to_vec(&body)
                    .map_err(|err| HttpClientError::BodySerialization(anyhow!(err)))?,
            ),
            None => None,
        };
        let parameters = query.query_parameters();

        debug!(self.logger, "Sending query"; "method" => %Q::method(), "url" => %url, query.entry_log_additional_fields());
        if self.debug {
            info!(
                self.logger, "Outbound request";
                "method" => %Q::method(),
                "url" => %url,
                "parameters" => ?parameters,
                "body" => body.as_deref().map(String::from_utf8_lossy).unwrap_or_default().to_string(),
            );
        }

        let response = self.execute_with_retries::<Q>(&url, &parameters, body).await?;
        if self.debug {
            info!(self.logger, "Response received"; "status" => %response.status(), "url" => %url);
        }

        let context = QueryContext {
            response,
            logger: self.logger.clone(),
        };
        query.handle_response(context).await
    }

    async fn execute_with_retries<Q: HttpQuery>(
        &self,
        url: &Url,
        parameters: &[(&'static str, String)],
        body: Option<Vec<u8>>,
    ) -> HttpClientResult<Response> {
        let mut backoff = Backoff::new(BACKOFF_BASE_DELAY, BACKOFF_MAX_DELAY);
        let mut attempt = 0;

        loop {
            let request = self.build_request::<Q>(url, parameters, body.clone())?;
            let result = match self.client.execute(request).await {
                Ok(response)
                    if response.status().is_server_error() && attempt < self.max_retries =>
                {
                    Err(HttpClientError::from_response(response).await)
                }
                Ok(response) => Ok(response),
                Err(err) => Err(HttpClientError::from_reqwest_error(err)),
            };

            match result {
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = backoff.next_delay();
                    warn!(
                        self.logger, "Request failed, retrying";
                        "url" => %url,
                        "attempt" => attempt,
                        "max_retries" => self.max_retries,
                        "delay" => ?delay,
                        "error" => ?error,
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    fn build_request<Q: HttpQuery>(
        &self,
        url: &Url,
        parameters: &[(&'static str, String)],
        body: Option<Vec<u8>>,
    ) -> HttpClientResult<Request> {
        let mut request_builder = self.client.request(Q::method().into(), url.clone());
        if !parameters.is_empty() {
            request_builder = request_builder.query(parameters);
        }
        if let Some(body) = body {
            request_builder = request_builder
                .header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
                .body(body);
        }

        let mut request = request_builder
            .build()
            .map_err(|err| HttpClientError::InvalidEndpoint(anyhow!(err)))?;
        if let Some(signer) = &self.signer {
            signer.sign(&mut request).map_err(HttpClientError::SigningFailed)?;
        }

        Ok(request)
    }

    fn join_endpoint(&self, route: &str) -> HttpClientResult<Url> {
        if route.is_empty() {
            return Ok(self.endpoint.clone());
        }

        enforce_trailing_slash(self.endpoint.clone())
            .join(route)
            .with_context(|| {
                format!(
                    "Invalid url when joining given route, '{route}', to endpoint '{}'",
                    self.endpoint
                )
            })
            .map_err(HttpClientError::InvalidEndpoint)
    }
}

/// Exponential backoff between two attempts of a request.
struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            attempt: 0,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.base.saturating_mul(1u32.checked_shl(self.attempt).unwrap_or(u32::MAX));
        self.attempt = self.attempt.saturating_add(1);
        delay.min(self.max)
    }
}
