//! Walks through every banking operation against a running server.
//!
//! Configuration comes from `BANKING_*` environment variables; start
//! `mock-server` first for a local run.

use std::process::ExitCode;

use banking_core::{BankingClient, ClientConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "banking_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn section(title: &str) {
    println!("\n{title}");
    println!("{}", "-".repeat(60));
}

fn main() -> ExitCode {
    init_tracing();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("{}", "=".repeat(60));
    println!("Banking Client - Rust Implementation");
    println!("{}", "=".repeat(60));

    let client = BankingClient::new(config);

    section("[1] Basic Transfer (No Authentication)");
    match client.transfer_funds("ACC1000", "ACC1001", 100.00, false) {
        Ok(result) => {
            println!("Transaction ID: {}", result.transaction_id);
            println!("Status: {}", result.status);
            println!("Message: {}", result.message);
        }
        Err(e) => println!("Transfer failed: {e}"),
    }

    section("[2] Transfer with Bearer Authentication");
    match client.authenticate("testuser", "password") {
        Ok(()) => {
            println!("Authentication successful");
            match client.transfer_funds("ACC1002", "ACC1003", 250.50, true) {
                Ok(result) => {
                    println!("Transaction ID: {}", result.transaction_id);
                    println!("Status: {}", result.status);
                }
                Err(e) => println!("Transfer failed: {e}"),
            }
        }
        Err(e) => println!("Authentication failed: {e}"),
    }

    section("[3] Account Validation");
    for account in ["ACC1000", "ACC2000", "ACC9999"] {
        match client.validate_account(account, false) {
            Ok(true) => println!("Valid: {account}"),
            Ok(false) => println!("Invalid: {account}"),
            Err(e) => println!("Could not validate {account}: {e}"),
        }
    }

    section("[4] Retrieve All Accounts");
    match client.get_accounts(false) {
        Ok(accounts) => {
            println!("Found {} accounts:", accounts.len());
            for account in accounts.iter().take(5) {
                let id = account["accountId"].as_str().unwrap_or("N/A");
                let holder = account["accountHolder"].as_str().unwrap_or("N/A");
                println!("  - {id}: {holder}");
            }
        }
        Err(e) => println!("Failed to retrieve accounts: {e}"),
    }

    section("[5] Get Account Balance");
    match client.get_account_balance("ACC1000", false) {
        Ok(balance) => {
            println!("Account: {}", balance.account_id);
            println!("Balance: {:.2} {}", balance.balance, balance.currency);
        }
        Err(e) => println!("Failed to retrieve balance: {e}"),
    }

    section("[6] Error Handling Demo (Invalid Account)");
    match client.transfer_funds("ACC9999", "ACC1001", 50.00, false) {
        Ok(result) => println!("Unexpected success: {}", result.transaction_id),
        Err(e) => println!("Error handled gracefully: {e}"),
    }

    println!("\n{}", "=".repeat(60));
    println!("Demo completed!");
    println!("{}", "=".repeat(60));
    ExitCode::SUCCESS
}
