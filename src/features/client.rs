use super::config::Settings;
use super::endpoints::{Endpoint, EndpointMap, PathParams};
use super::records::{
    AccountNumber, AccountRecord, CustomerRecord, ItemEnvelope, ListEnvelope, TransactionRecord,
    TransferReceipt,
};
use super::token::{Credentials, Token, TokenResponse};
use super::transport::{Auth, Body, HttpRequest, HttpResponse, Method, Transport};
use chrono::Utc;
use rust_decimal::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use thiserror::Error;

/// Fields of a provider payload that carry no information about the failure itself
const NOISE_FIELDS: [&str; 5] = ["isError", "traceId", "availableItems", "item", "items"];

#[derive(Error, Debug)]
pub enum BankError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error{}: {body}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport { status: Option<u16>, body: String },

    #[error("Bank rejected the request: {}", message.as_deref().unwrap_or("no message"))]
    Remote {
        message: Option<String>,
        payload: Value,
    },

    #[error("Unexpected response from {endpoint}: {reason}")]
    Decoding { endpoint: String, reason: String },

    #[error("Missing required field '{field}'")]
    MissingField { field: &'static str },
}

pub type BankResult<T> = anyhow::Result<T, BankError>;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct TransferRequest<'a> {
    from_account: &'a AccountNumber,
    to_account: &'a AccountNumber,
    /// The bank expects a JSON number, not a string
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    message: &'a str,
}

/// Authenticated session against the bank's REST API.
///
/// One instance owns one token and expects a single caller at a time; it is
/// deliberately not `Sync`.
pub struct BankClient<T: Transport> {
    credentials: Credentials,
    endpoints: EndpointMap,
    token: RefCell<Token>,
    transport: T,
}

impl<T: Transport> BankClient<T> {
    /// Builds the endpoint map and performs the initial token exchange.
    pub fn connect(settings: &Settings, transport: T) -> BankResult<Self> {
        let credentials = Credentials::from_settings(settings);
        let endpoints = EndpointMap::from_settings(&settings.api)?;
        let token = authenticate(&credentials, &transport)?;

        Ok(Self {
            credentials,
            endpoints,
            token: RefCell::new(token),
            transport,
        })
    }

    pub fn customer_id(&self) -> &str {
        &self.credentials.customer_id
    }

    pub fn endpoints(&self) -> &EndpointMap {
        &self.endpoints
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Calls `endpoint` and returns the decoded payload.
    ///
    /// `params` fill the URL template; `customerId` is always sent as a header too.
    /// A 401 renews the token once. Only idempotent requests are then sent again.
    pub fn request(
        &self,
        endpoint: Endpoint,
        method: Method,
        params: &PathParams,
        body: Body,
    ) -> BankResult<Value> {
        let url = self.endpoints.url(endpoint, params)?;
        self.ensure_fresh_token()?;

        debug!("{method:?} {url}");
        let mut response = self.send(method, &url, &body)?;

        if response.status == 401 {
            warn!("{endpoint}: token rejected, re-authenticating");
            self.reauthenticate()?;
            if !method.is_idempotent() {
                return Err(BankError::Transport {
                    status: Some(response.status),
                    body: response.body,
                });
            }
            response = self.send(method, &url, &body)?;
        }

        decode_payload(endpoint, response)
    }

    /// Details about the customer the session acts for
    pub fn me(&self) -> BankResult<CustomerRecord> {
        let payload = self.get(Endpoint::CustomerDetails, self.params())?;
        decode::<ItemEnvelope<CustomerRecord>>(Endpoint::CustomerDetails, payload).map(|e| e.item)
    }

    /// All accounts belonging to the customer
    pub fn accounts(&self) -> BankResult<Vec<AccountRecord>> {
        let payload = self.get(Endpoint::AccountList, self.params())?;
        decode::<ListEnvelope<AccountRecord>>(Endpoint::AccountList, payload).map(|e| e.items)
    }

    pub fn account_details(&self, account_number: &AccountNumber) -> BankResult<AccountRecord> {
        let params = self.params().account_number(account_number.as_str());
        let payload = self.get(Endpoint::AccountDetails, params)?;
        decode::<ItemEnvelope<AccountRecord>>(Endpoint::AccountDetails, payload).map(|e| e.item)
    }

    /// Latest transactions on an account, in the order the bank returns them
    pub fn transactions(&self, account_number: &AccountNumber) -> BankResult<Vec<TransactionRecord>> {
        let params = self.params().account_number(account_number.as_str());
        let payload = self.get(Endpoint::TransactionList, params)?;
        decode::<ListEnvelope<TransactionRecord>>(Endpoint::TransactionList, payload)
            .map(|e| e.items)
    }

    /// Moves money between two of the customer's accounts.
    ///
    /// Not idempotent: this is never re-sent automatically. Amount and message rules
    /// belong to the bank; violations come back as [`BankError::Remote`].
    pub fn transfer(
        &self,
        from_account: &AccountNumber,
        to_account: &AccountNumber,
        amount: Decimal,
        message: &str,
    ) -> BankResult<TransferReceipt> {
        if from_account.as_str().is_empty() {
            return Err(BankError::MissingField {
                field: "fromAccount",
            });
        }
        if to_account.as_str().is_empty() {
            return Err(BankError::MissingField { field: "toAccount" });
        }
        if message.is_empty() {
            return Err(BankError::MissingField { field: "message" });
        }

        let body = serde_json::to_value(TransferRequest {
            from_account,
            to_account,
            amount,
            message,
        })
        .map(Body::Json)
        .map_err(|e| BankError::Decoding {
            endpoint: Endpoint::TransferMethod.to_string(),
            reason: e.to_string(),
        })?;
        let payload = self.request(Endpoint::TransferMethod, Method::Post, &self.params(), body)?;

        info!("transferred {amount} from {from_account} to {to_account}");
        Ok(TransferReceipt::new(payload))
    }

    fn params(&self) -> PathParams {
        PathParams::new().customer_id(self.customer_id())
    }

    fn get(&self, endpoint: Endpoint, params: PathParams) -> BankResult<Value> {
        self.request(endpoint, Method::Get, &params, Body::Empty)
    }

    fn send(&self, method: Method, url: &str, body: &Body) -> BankResult<HttpResponse> {
        let request = HttpRequest {
            method,
            url: url.to_string(),
            auth: Auth::Bearer(self.token.borrow().access_token().to_string()),
            headers: vec![("customerId".to_string(), self.customer_id().to_string())],
            body: body.clone(),
        };
        self.transport.send(&request)
    }

    fn ensure_fresh_token(&self) -> BankResult<()> {
        if self.token.borrow().is_expired(Utc::now()) {
            debug!("token expired, renewing");
            self.reauthenticate()?;
        }
        Ok(())
    }

    fn reauthenticate(&self) -> BankResult<()> {
        let token = authenticate(&self.credentials, &self.transport)?;
        self.token.replace(token);
        Ok(())
    }
}

fn authenticate(credentials: &Credentials, transport: &impl Transport) -> BankResult<Token> {
    let response = transport
        .send(&credentials.token_request())
        .map_err(|e| BankError::Authentication(e.to_string()))?;

    if !response.is_success() {
        return Err(BankError::Authentication(format!(
            "identity server answered HTTP {}: {}",
            response.status, response.body
        )));
    }

    let issued: TokenResponse = serde_json::from_str(&response.body)
        .map_err(|e| BankError::Authentication(format!("malformed token response: {e}")))?;
    let token_type = issued.token_type.clone().unwrap_or_else(|| "bearer".to_string());
    let token = Token::issued(issued, Utc::now()).ok_or_else(|| {
        BankError::Authentication("token expiry out of range".to_string())
    })?;
    info!(
        "authenticated as {} ({token_type} token valid until {})",
        credentials.client_id,
        token.expires_at()
    );

    Ok(token)
}

/// Turns a raw response into a payload: non-2xx is a transport failure, a 2xx
/// flagged `isError` is a remote failure.
fn decode_payload(endpoint: Endpoint, response: HttpResponse) -> BankResult<Value> {
    if !response.is_success() {
        return Err(BankError::Transport {
            status: Some(response.status),
            body: response.body,
        });
    }

    let payload: Value = serde_json::from_str(&response.body).map_err(|e| BankError::Decoding {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    let is_error = payload
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if is_error {
        return Err(remote_error(payload));
    }

    Ok(payload)
}

fn remote_error(mut payload: Value) -> BankError {
    if let Some(fields) = payload.as_object_mut() {
        for noise in NOISE_FIELDS {
            fields.remove(noise);
        }
    }
    let message = payload
        .get("errorMessage")
        .and_then(Value::as_str)
        .map(str::to_string);

    BankError::Remote { message, payload }
}

fn decode<D: DeserializeOwned>(endpoint: Endpoint, payload: Value) -> BankResult<D> {
    serde_json::from_value(payload).map_err(|e| BankError::Decoding {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}
