//! Scripted transport and fixtures shared by the unit tests.

use super::client::{BankClient, BankError, BankResult};
use super::config::Settings;
use super::transport::{HttpRequest, HttpResponse, Transport};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub struct MockTransport {
    replies: RefCell<VecDeque<BankResult<HttpResponse>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, status: u16, body: impl Into<String>) {
        self.replies.borrow_mut().push_back(Ok(HttpResponse {
            status,
            body: body.into(),
        }));
    }

    pub fn push_failure(&self, reason: &str) {
        self.replies.borrow_mut().push_back(Err(BankError::Transport {
            status: None,
            body: reason.to_string(),
        }));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests
            .borrow()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &HttpRequest) -> BankResult<HttpResponse> {
        self.requests.borrow_mut().push(request.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request to {}", request.url))
    }
}

pub const ACCOUNTS_SECTION: &str =
    r#"{"BASE": "11111111111", "alice": "22222222222", "Bob": "33333333333"}"#;

pub fn settings_json() -> String {
    format!(
        r#"{{
    "secrets": {{"customerId": "01010112345", "clientId": "client", "password": "s3cret"}},
    "api": {{
        "baseUrl": "https://api.example",
        "customerDetails": "/customers/api/v1/Customers",
        "accountList": "/bank/api/v1/Accounts",
        "accountDetails": "/bank/api/v1/Accounts/{{accountNumber}}",
        "transactionList": "/bank/api/v1/Transactions/{{accountNumber}}",
        "transferMethod": "/bank/api/v1/Transfers"
    }},
    "login": {{"identityServer": "https://auth.example/token"}},
    "accounts": {accounts}
}}"#,
        accounts = ACCOUNTS_SECTION
    )
}

pub fn settings() -> Settings {
    Settings::from_json(&settings_json()).expect("fixture settings parse")
}

pub fn token_response() -> String {
    json!({"access_token": "token-1", "expires_in": 3600, "token_type": "Bearer"}).to_string()
}

/// Client that has already completed its token exchange
pub fn connect() -> BankClient<MockTransport> {
    let transport = MockTransport::new();
    transport.push(200, token_response());
    BankClient::connect(&settings(), transport).expect("fixture client connects")
}

pub fn account_json(number: &str, balance: f64) -> Value {
    json!({
        "accountNumber": number,
        "accountType": "Standard account",
        "available": balance,
        "balance": balance,
        "creditLimit": 0.0,
        "customerId": "01010112345",
        "ownerCustomerId": "01010112345",
        "defaultAccount": number == "11111111111",
        "name": format!("Konto {number}")
    })
}
