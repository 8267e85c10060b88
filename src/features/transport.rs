use super::client::{BankError, BankResult};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Whether re-sending the request after a token refresh is harmless
    pub fn is_idempotent(self) -> bool {
        matches!(self, Method::Get)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Auth {
    Basic { username: String, password: String },
    Bearer(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Form(Vec<(String, String)>),
    Json(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub auth: Auth,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves one request over the wire.
///
/// Implementations report connection-level failures (refused, timed out, unreadable body)
/// as [`BankError::Transport`] without a status. Any response that made it back, whatever
/// its status, is returned as `Ok` and judged by the caller.
pub trait Transport {
    fn send(&self, request: &HttpRequest) -> BankResult<HttpResponse>;
}

pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> BankResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BankError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> BankResult<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .header(reqwest::header::ACCEPT, "application/json");

        builder = match &request.auth {
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::Bearer(token) => builder.bearer_auth(token),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            Body::Empty => builder,
            Body::Form(fields) => builder.form(fields),
            Body::Json(value) => builder.json(value),
        };

        let response = builder.send().map_err(|e| BankError::Transport {
            status: None,
            body: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| BankError::Transport {
            status: Some(status),
            body: e.to_string(),
        })?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(200, true ; "ok")]
    #[test_case(204, true ; "no content")]
    #[test_case(302, false ; "redirect")]
    #[test_case(401, false ; "unauthorized")]
    #[test_case(500, false ; "server error")]
    fn success_is_2xx_only(status: u16, expected: bool) {
        let response = HttpResponse {
            status,
            body: String::new(),
        };
        assert_eq!(response.is_success(), expected);
    }

    #[test]
    fn only_get_is_reissued() {
        assert!(Method::Get.is_idempotent());
        assert!(!Method::Post.is_idempotent());
    }
}
