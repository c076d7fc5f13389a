//! Retrying HTTP request executor with bearer-token injection.
//!
//! # Design
//! One logical operation goes through three steps:
//! `build_request` produces an `HttpRequest`, `send` pushes it through the
//! `Transport` with the retry policy, and `parse_response` turns the final
//! `HttpResponse` into a typed value. Each step is public so callers (and
//! tests) can drive them separately.
//!
//! Only network failures (timeouts, connection errors) are retried. Attempts are strictly sequential:
//! after failed attempt `n` the executor sleeps `retry_delay * n` and tries
//! again, up to `1 + max_retries` attempts. Any HTTP response, whatever its
//! status, ends the loop.

use std::sync::Arc;
use std::thread;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, ValidationError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::session::Session;

#[derive(Debug)]
pub struct RequestExecutor<T> {
    config: ClientConfig,
    transport: T,
    session: Arc<Session>,
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(config: ClientConfig, transport: T, session: Arc<Session>) -> Self {
        Self {
            config,
            transport,
            session,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the request for `base_url + path`.
    ///
    /// The bearer token is attached only when `use_auth` is set and the
    /// session currently holds one; a missing token is not an error.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        use_auth: bool,
    ) -> Result<HttpRequest, ApiError> {
        if path.is_empty() {
            return Err(ValidationError::EmptyPath.into());
        }

        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        if use_auth {
            if let Some(token) = self.session.token() {
                headers.push(("authorization".to_string(), format!("Bearer {token}")));
            }
        }

        let body = body
            .map(|value| serde_json::to_string(&value))
            .transpose()
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;

        Ok(HttpRequest {
            method,
            url: format!("{}{}", self.config.base_url(), path),
            headers,
            body,
        })
    }

    /// Send `request`, retrying network failures up to the configured budget.
    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let max_attempts = self.config.max_attempts();
        let mut attempt = 1;

        loop {
            debug!(method = %request.method, url = %request.url, attempt, "sending request");

            match self.transport.send(request) {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.backoff_delay(attempt);
                    warn!(
                        error = %err,
                        attempt,
                        retries_left = max_attempts - attempt,
                        ?delay,
                        "request failed, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) if !err.is_retryable() => {
                    error!(error = %err, url = %request.url, "request could not be sent");
                    return Err(ApiError::exhausted(err, attempt));
                }
                Err(err) => {
                    error!(error = %err, attempts = attempt, url = %request.url, "request failed after all retries");
                    return Err(ApiError::exhausted(err, attempt));
                }
            }
        }
    }

    /// Build, send and parse one logical operation.
    pub fn execute<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        use_auth: bool,
    ) -> Result<R, ApiError> {
        let request = self.build_request(method, path, body, use_auth)?;
        let response = self.send(&request)?;
        parse_response(response)
    }
}

/// Decode a 2xx body into `R`; any other status is an application failure.
pub fn parse_response<R: DeserializeOwned>(response: HttpResponse) -> Result<R, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}
