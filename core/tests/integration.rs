//! Full banking flow against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every client
//! operation over real HTTP through `UreqTransport`. Validates that request
//! building, retries and response parsing work end-to-end with the actual
//! server. A few tests use raw `TcpListener` servers instead, to control the
//! bytes on the wire or to never answer at all.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use banking_core::{ApiError, BankingClient, ClientConfig, ClientSettings, TransferRequest};

fn spawn_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

/// Raw HTTP/1.1 server that answers every connection with `status` and a
/// fixed body. Returns its address and the number of connections accepted.
fn spawn_raw_server(
    status: &'static str,
    body: &'static [u8],
) -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let mut stream = stream.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
            read_request_head(&mut stream);
            let head = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(body).unwrap();
            // Drain whatever the client still sends so the close is clean.
            let _ = stream.shutdown(Shutdown::Write);
            let _ = stream.read_to_end(&mut Vec::new());
        }
    });

    (addr, accepted)
}

/// Server that accepts connections and never writes a byte back.
fn spawn_silent_server() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);

    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(stream.unwrap());
        }
    });

    (addr, accepted)
}

fn read_request_head(stream: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}

const NOT_UTF8: &[u8] = &[0xff, 0xfe, 0xfd];

fn config(base_url: String, max_retries: u32) -> ClientConfig {
    ClientConfig::try_from(ClientSettings {
        base_url,
        timeout_secs: 5,
        max_retries,
        retry_delay_ms: 10,
    })
    .unwrap()
}

#[test]
fn banking_flow() {
    let addr = spawn_server();
    let client = BankingClient::new(config(format!("http://{addr}/"), 3));

    // Step 1: transfer without authentication.
    let result = client.transfer_funds("ACC1000", "ACC1001", 100.0, false).unwrap();
    assert_eq!(result.status, "SUCCESS");
    assert!(result.transaction_id.starts_with("TXN-"));
    assert_eq!(result.from_account, "ACC1000");
    assert_eq!(result.to_account, "ACC1001");
    assert_eq!(result.amount, 100.0);

    // Step 2: bad credentials are an application failure.
    let err = client.authenticate("testuser", "wrong").unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(!client.session().is_authenticated());

    // Step 3: authenticate and transfer with the bearer token.
    client.authenticate("testuser", "password").unwrap();
    assert!(client.session().is_authenticated());
    let result = client.transfer_funds("ACC1002", "ACC1003", 250.5, true).unwrap();
    assert_eq!(result.status, "SUCCESS");

    // Step 4: a forged token is rejected by the server.
    client.session().set_token("forged");
    let err = client.get_accounts(true).unwrap_err();
    assert_eq!(err.status(), Some(401));
    client.authenticate("testuser", "password").unwrap();

    // Step 5: account validation.
    assert!(client.validate_account("ACC1000", true).unwrap());
    assert!(!client.validate_account("ACC2000", true).unwrap());
    assert!(!client.validate_account("ACC9999", true).unwrap());

    // Step 6: list accounts.
    let accounts = client.get_accounts(true).unwrap();
    assert_eq!(accounts.len(), 7);
    assert_eq!(accounts[0]["accountId"], "ACC1000");

    // Step 7: balances reflect the earlier transfers.
    let balance = client.get_account_balance("ACC1000", false).unwrap();
    assert_eq!(balance.account_id, "ACC1000");
    assert_eq!(balance.balance, 4900.0);
    assert_eq!(balance.currency, "USD");
    let balance = client.get_account_balance("ACC1003", false).unwrap();
    assert_eq!(balance.balance, 1450.5);

    // Step 8: unknown account balance is a 404, not retried.
    let err = client.get_account_balance("ACC9999", false).unwrap_err();
    assert_eq!(err.status(), Some(404));

    // Step 9: transfer from an unknown account is reported, not retried.
    let err = client.transfer_funds("ACC9999", "ACC1001", 50.0, false).unwrap_err();
    match err {
        ApiError::HttpError { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("account not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn replayed_idempotency_key_moves_money_once() {
    let addr = spawn_server();
    let client = BankingClient::new(config(format!("http://{addr}"), 0));
    let request = TransferRequest::new("ACC1005", "ACC1004", 500.0).unwrap();

    let first = client.transfer(&request, "order-1", false).unwrap();
    let second = client.transfer(&request, "order-1", false).unwrap();
    assert_eq!(first.transaction_id, second.transaction_id);

    let balance = client.get_account_balance("ACC1005", false).unwrap();
    assert_eq!(balance.balance, 14500.0);

    let third = client.transfer(&request, "order-2", false).unwrap();
    assert_ne!(third.transaction_id, first.transaction_id);
    let balance = client.get_account_balance("ACC1005", false).unwrap();
    assert_eq!(balance.balance, 14000.0);
}

#[test]
fn connection_refused_exhausts_retries() {
    // Bind then drop to get a port with nothing listening.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = BankingClient::new(config(format!("http://{addr}"), 2));

    let err = client.get_accounts(false).unwrap_err();
    assert!(err.is_transport(), "{err:?}");
    assert!(
        matches!(
            err,
            ApiError::Connection { attempts: 3, .. } | ApiError::Timeout { attempts: 3, .. }
        ),
        "{err:?}"
    );
}

#[test]
fn error_status_with_undecodable_body_is_not_retried() {
    let (addr, accepted) = spawn_raw_server("400 Bad Request", NOT_UTF8);
    let client = BankingClient::new(config(format!("http://{addr}"), 3));

    let err = client.get_accounts(false).unwrap_err();
    match err {
        ApiError::HttpError { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, String::from_utf8_lossy(NOT_UTF8));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[test]
fn success_with_undecodable_body_is_a_deserialization_error() {
    let (addr, accepted) = spawn_raw_server("200 OK", NOT_UTF8);
    let client = BankingClient::new(config(format!("http://{addr}"), 3));

    let err = client.get_accounts(false).unwrap_err();
    assert!(matches!(err, ApiError::DeserializationError(_)), "{err:?}");
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[test]
fn rejected_transfer_is_posted_once() {
    let (addr, accepted) =
        spawn_raw_server("400 Bad Request", br#"{"error":"insufficient funds"}"#);
    let client = BankingClient::new(config(format!("http://{addr}"), 3));

    let err = client.transfer_funds("ACC1004", "ACC1000", 1e9, false).unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[test]
fn malformed_base_url_fails_without_retrying() {
    let config = ClientConfig::try_from(ClientSettings {
        base_url: "not a url at all".to_string(),
        timeout_secs: 5,
        max_retries: 3,
        retry_delay_ms: 10_000,
    })
    .unwrap();
    let client = BankingClient::new(config);

    let started = Instant::now();
    let err = client.get_accounts(false).unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)), "{err:?}");
    assert!(!err.is_transport());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn unanswered_attempts_time_out_and_are_retried() {
    let (addr, accepted) = spawn_silent_server();
    let config = ClientConfig::try_from(ClientSettings {
        base_url: format!("http://{addr}"),
        timeout_secs: 1,
        max_retries: 1,
        retry_delay_ms: 10,
    })
    .unwrap();
    let client = BankingClient::new(config);

    let err = client.get_accounts(false).unwrap_err();
    assert!(matches!(err, ApiError::Timeout { attempts: 2, .. }), "{err:?}");
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}
