//! In-memory banking API used by the demo and the integration tests.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

pub const TEST_USERNAME: &str = "testuser";
pub const TEST_PASSWORD: &str = "password";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
    pub account_holder: String,
    pub balance: f64,
    pub currency: String,
    pub active: bool,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInput {
    pub from_account: String,
    pub to_account: String,
    pub amount: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub transaction_id: String,
    pub status: String,
    pub message: String,
    pub from_account: String,
    pub to_account: String,
    pub amount: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub account_id: String,
    pub balance: f64,
    pub currency: String,
}

#[derive(Default)]
pub struct Bank {
    accounts: BTreeMap<String, Account>,
    tokens: HashSet<String>,
    /// Applied transfers by idempotency key, with the payload that created them.
    receipts: HashMap<String, (TransferInput, TransferReceipt)>,
}

impl Bank {
    /// Accounts `ACC1000`..`ACC1005` are active; `ACC2000` exists but is closed.
    pub fn seeded() -> Self {
        let holders = [
            ("ACC1000", "Alice Johnson", 5000.0),
            ("ACC1001", "Bob Smith", 3000.0),
            ("ACC1002", "Carol White", 7500.0),
            ("ACC1003", "David Brown", 1200.0),
            ("ACC1004", "Eve Davis", 900.0),
            ("ACC1005", "Frank Miller", 15000.0),
        ];
        let mut accounts: BTreeMap<String, Account> = holders
            .into_iter()
            .map(|(id, holder, balance)| {
                let account = Account {
                    account_id: id.to_string(),
                    account_holder: holder.to_string(),
                    balance,
                    currency: "USD".to_string(),
                    active: true,
                };
                (id.to_string(), account)
            })
            .collect();
        accounts.insert(
            "ACC2000".to_string(),
            Account {
                account_id: "ACC2000".to_string(),
                account_holder: "Grace Wilson".to_string(),
                balance: 0.0,
                currency: "USD".to_string(),
                active: false,
            },
        );
        Self {
            accounts,
            ..Self::default()
        }
    }
}

pub type Db = Arc<RwLock<Bank>>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

fn reject(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Bank::seeded()));
    Router::new()
        .route("/authToken", post(authenticate))
        .route("/transfer", post(transfer))
        .route("/accounts", get(list_accounts))
        .route("/accounts/validate/{id}", get(validate_account))
        .route("/accounts/balance/{id}", get(account_balance))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// A present `Authorization` header must carry a token this server issued.
/// Requests without the header are allowed through.
fn check_auth(bank: &Bank, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(());
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "malformed authorization header"))?;
    if bank.tokens.contains(token) {
        Ok(())
    } else {
        Err(reject(StatusCode::UNAUTHORIZED, "invalid token"))
    }
}

async fn authenticate(State(db): State<Db>, Json(input): Json<Credentials>) -> ApiResult<Value> {
    if input.username != TEST_USERNAME || input.password != TEST_PASSWORD {
        warn!(username = %input.username, "rejected credentials");
        return Err(reject(StatusCode::UNAUTHORIZED, "invalid credentials"));
    }
    let token = format!("mock-jwt-{}", Uuid::new_v4().simple());
    db.write().await.tokens.insert(token.clone());
    info!(username = %input.username, "issued token");
    Ok(Json(json!({ "token": token })))
}

async fn transfer(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<TransferInput>,
) -> ApiResult<TransferReceipt> {
    let mut bank = db.write().await;
    check_auth(&bank, &headers)?;

    let key = headers
        .get("idempotency-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if let Some((applied, receipt)) = key.as_ref().and_then(|k| bank.receipts.get(k)) {
        if *applied != input {
            return Err(reject(
                StatusCode::UNPROCESSABLE_ENTITY,
                "idempotency key reused with different payload",
            ));
        }
        info!(transaction_id = %receipt.transaction_id, "replayed transfer");
        return Ok(Json(receipt.clone()));
    }

    if input.amount.is_nan() || input.amount <= 0.0 {
        return Err(reject(StatusCode::BAD_REQUEST, "amount must be greater than 0"));
    }
    if input.from_account == input.to_account {
        return Err(reject(StatusCode::BAD_REQUEST, "cannot transfer to the same account"));
    }
    for id in [&input.from_account, &input.to_account] {
        match bank.accounts.get(id) {
            Some(account) if account.active => {}
            Some(_) => return Err(reject(StatusCode::BAD_REQUEST, "account is not active")),
            None => return Err(reject(StatusCode::BAD_REQUEST, "account not found")),
        }
    }
    let available = bank.accounts[&input.from_account].balance;
    if available < input.amount {
        return Err(reject(StatusCode::BAD_REQUEST, "insufficient funds"));
    }

    if let Some(from) = bank.accounts.get_mut(&input.from_account) {
        from.balance -= input.amount;
    }
    if let Some(to) = bank.accounts.get_mut(&input.to_account) {
        to.balance += input.amount;
    }

    let receipt = TransferReceipt {
        transaction_id: format!("TXN-{}", Uuid::new_v4().simple()),
        status: "SUCCESS".to_string(),
        message: "Transfer completed successfully".to_string(),
        from_account: input.from_account.clone(),
        to_account: input.to_account.clone(),
        amount: input.amount,
    };
    if let Some(key) = key {
        bank.receipts.insert(key, (input, receipt.clone()));
    }
    info!(transaction_id = %receipt.transaction_id, "transfer applied");
    Ok(Json(receipt))
}

async fn list_accounts(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Vec<Account>> {
    let bank = db.read().await;
    check_auth(&bank, &headers)?;
    Ok(Json(bank.accounts.values().cloned().collect()))
}

async fn validate_account(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Value> {
    let bank = db.read().await;
    check_auth(&bank, &headers)?;
    let valid = bank.accounts.get(&id).is_some_and(|a| a.active);
    Ok(Json(json!({ "valid": valid })))
}

async fn account_balance(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Balance> {
    let bank = db.read().await;
    check_auth(&bank, &headers)?;
    bank.accounts
        .get(&id)
        .map(|a| {
            Json(Balance {
                account_id: a.account_id.clone(),
                balance: a.balance,
                currency: a.currency.clone(),
            })
        })
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "account not found"))
}
