//! Blocking client for the banking REST API.
//!
//! # Overview
//! Five operations (authenticate, transfer funds, validate account, list
//! accounts, get balance) run through a single `RequestExecutor` that builds
//! the request, injects the bearer token on demand, retries transport
//! failures with linear backoff, and decodes the response.
//!
//! # Design
//! - `ClientConfig` is validated once and never changes afterwards.
//! - The bearer token lives in a `Session` that many readers can snapshot
//!   while `authenticate` replaces it.
//! - Network I/O sits behind the `Transport` trait; `UreqTransport` is the
//!   production implementation and tests substitute scripted ones.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod http;
pub mod session;
pub mod transport;
pub mod types;

pub use client::{BankingClient, IDEMPOTENCY_KEY_HEADER};
pub use config::{ClientConfig, ClientSettings, ConfigError};
pub use error::{ApiError, ValidationError};
pub use executor::{parse_response, RequestExecutor};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use session::Session;
pub use transport::UreqTransport;
pub use types::{
    AccountBalance, AccountValidation, AuthToken, Credentials, TransferRequest, TransferResult,
};
