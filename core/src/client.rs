//! Banking API operations on top of `RequestExecutor`.
//!
//! # Design
//! Each operation validates its input, supplies a method, path and optional
//! body, and lets the executor handle headers, retries and decoding. Failures
//! are logged once here and returned as `ApiError`; nothing panics.
//!
//! Transfers are not idempotent on the server side, so every transfer carries
//! an `idempotency-key` header that stays the same across all retry attempts
//! of one logical call. A server that has already applied that key returns
//! the first receipt instead of moving money twice.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ApiError, ValidationError};
use crate::executor::{parse_response, RequestExecutor};
use crate::http::{HttpMethod, Transport};
use crate::session::Session;
use crate::transport::UreqTransport;
use crate::types::{
    AccountBalance, AccountValidation, AuthToken, Credentials, TransferRequest, TransferResult,
};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Client for the five banking endpoints.
#[derive(Debug)]
pub struct BankingClient<T = UreqTransport> {
    executor: RequestExecutor<T>,
}

impl BankingClient<UreqTransport> {
    /// Client using a blocking ureq transport bound by `config.timeout()`.
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(&config);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> BankingClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self::with_session(config, transport, Arc::new(Session::new()))
    }

    /// Client sharing an existing session, e.g. across several clients.
    pub fn with_session(config: ClientConfig, transport: T, session: Arc<Session>) -> Self {
        info!(base_url = config.base_url(), "banking client initialized");
        Self {
            executor: RequestExecutor::new(config, transport, session),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        self.executor.config()
    }

    pub fn session(&self) -> &Arc<Session> {
        self.executor.session()
    }

    pub fn transport(&self) -> &T {
        self.executor.transport()
    }

    pub fn executor(&self) -> &RequestExecutor<T> {
        &self.executor
    }

    /// Obtain a bearer token and store it in the session.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let credentials = Credentials::new(username, password)?;
        info!(username = credentials.username(), "attempting authentication");

        let token: AuthToken = self
            .executor
            .execute(HttpMethod::Post, "/authToken", Some(to_json(&credentials)?), false)
            .inspect_err(|e| error!(error = %e, "authentication failed"))?;

        if token.token.trim().is_empty() {
            error!("no token received in response");
            return Err(ApiError::MissingToken);
        }
        self.session().set_token(token.token);
        info!("authentication successful");
        Ok(())
    }

    /// Validate and submit a transfer under a freshly generated idempotency key.
    pub fn transfer_funds(
        &self,
        from_account: &str,
        to_account: &str,
        amount: f64,
        use_auth: bool,
    ) -> Result<TransferResult, ApiError> {
        let request = TransferRequest::new(from_account, to_account, amount)
            .inspect_err(|e| error!(error = %e, "invalid transfer request"))?;
        let key = Uuid::new_v4().to_string();
        self.transfer(&request, &key, use_auth)
    }

    /// Submit `request` under a caller-supplied idempotency key.
    pub fn transfer(
        &self,
        request: &TransferRequest,
        idempotency_key: &str,
        use_auth: bool,
    ) -> Result<TransferResult, ApiError> {
        if idempotency_key.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                field: "idempotency_key",
            }
            .into());
        }
        info!(
            from = request.from_account(),
            to = request.to_account(),
            amount = request.amount(),
            idempotency_key,
            "initiating transfer"
        );

        let mut http_request =
            self.executor
                .build_request(HttpMethod::Post, "/transfer", Some(to_json(request)?), use_auth)?;
        http_request.set_header(IDEMPOTENCY_KEY_HEADER, idempotency_key);

        let result: TransferResult = self
            .executor
            .send(&http_request)
            .and_then(parse_response)
            .inspect_err(|e| error!(error = %e, "transfer failed"))?;

        info!(
            transaction_id = %result.transaction_id,
            status = %result.status,
            "transfer successful"
        );
        Ok(result)
    }

    pub fn validate_account(&self, account_id: &str, use_auth: bool) -> Result<bool, ApiError> {
        let path = account_path("/accounts/validate/", account_id)?;
        info!(account_id, "validating account");

        let validation: AccountValidation = self
            .executor
            .execute(HttpMethod::Get, &path, None, use_auth)
            .inspect_err(|e| error!(error = %e, account_id, "account validation failed"))?;

        info!(account_id, valid = validation.valid, "account validation result");
        Ok(validation.valid)
    }

    /// List all accounts. Entries are passed through as opaque JSON.
    pub fn get_accounts(&self, use_auth: bool) -> Result<Vec<Value>, ApiError> {
        info!("fetching accounts list");

        let accounts: Vec<Value> = self
            .executor
            .execute(HttpMethod::Get, "/accounts", None, use_auth)
            .inspect_err(|e| error!(error = %e, "failed to retrieve accounts"))?;

        info!(count = accounts.len(), "retrieved accounts");
        Ok(accounts)
    }

    pub fn get_account_balance(
        &self,
        account_id: &str,
        use_auth: bool,
    ) -> Result<AccountBalance, ApiError> {
        let path = account_path("/accounts/balance/", account_id)?;
        info!(account_id, "fetching balance");

        let balance: AccountBalance = self
            .executor
            .execute(HttpMethod::Get, &path, None, use_auth)
            .inspect_err(|e| error!(error = %e, account_id, "failed to retrieve balance"))?;

        info!(account_id, balance = balance.balance, currency = %balance.currency, "balance retrieved");
        Ok(balance)
    }
}

fn account_path(prefix: &str, account_id: &str) -> Result<String, ApiError> {
    if account_id.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "accountId" }.into());
    }
    Ok(format!("{prefix}{}", urlencoding::encode(account_id)))
}

fn to_json<S: Serialize>(value: &S) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::SerializationError(e.to_string()))
}
