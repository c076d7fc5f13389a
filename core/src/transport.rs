//! Blocking `Transport` backed by a ureq agent.

use std::io;

use tracing::trace;

use crate::config::ClientConfig;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};

/// Executes one attempt per call with ureq.
///
/// The agent has status-as-error disabled, so 4xx/5xx responses come back as
/// data and the executor decides what they mean. Bodies are decoded lossily,
/// so a non-UTF-8 payload still reaches the executor as a response. The
/// configured timeout bounds each attempt end to end.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout()))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        // The server has answered, so a broken body is not worth another
        // attempt unless the deadline ran out while reading it.
        let bytes = response.body_mut().read_to_vec().map_err(|err| match classify(err) {
            TransportError::Timeout(message) => TransportError::Timeout(message),
            other => TransportError::Request(format!("reading HTTP {status} body: {other}")),
        })?;
        let body = String::from_utf8_lossy(&bytes).into_owned();
        trace!(status, bytes = bytes.len(), "response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(err: ureq::Error) -> TransportError {
    match &err {
        ureq::Error::Timeout(_) => TransportError::Timeout(err.to_string()),
        ureq::Error::Io(io_err) if io_err.kind() == io::ErrorKind::TimedOut => {
            TransportError::Timeout(err.to_string())
        }
        ureq::Error::Io(_) | ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => {
            TransportError::Connection(err.to_string())
        }
        _ => TransportError::Request(err.to_string()),
    }
}
