use super::config::Settings;
use super::transport::{Auth, Body, HttpRequest, Method};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::fmt;

/// Tokens expiring within this window are renewed before use.
const EXPIRY_SKEW_SECS: i64 = 30;

/// OAuth2 client credentials plus the customer the session acts for
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub customer_id: String,
    pub identity_server: String,
}

impl Credentials {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            client_id: settings.secrets.client_id.clone(),
            client_secret: settings.secrets.password.clone(),
            customer_id: settings.secrets.customer_id.clone(),
            identity_server: settings.login.identity_server.clone(),
        }
    }

    /// Client-credentials grant against the identity server, Basic-authenticated.
    pub(crate) fn token_request(&self) -> HttpRequest {
        HttpRequest {
            method: Method::Post,
            url: self.identity_server.clone(),
            auth: Auth::Basic {
                username: self.client_id.clone(),
                password: self.client_secret.clone(),
            },
            headers: Vec::new(),
            body: Body::Form(vec![(
                "grant_type".to_string(),
                "client_credentials".to_string(),
            )]),
        }
    }
}

// Keeps the secret out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("customer_id", &self.customer_id)
            .field("identity_server", &self.identity_server)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Clone)]
pub struct Token {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl Token {
    /// `None` when `expires_in` puts the expiry outside the representable range.
    pub(crate) fn issued(response: TokenResponse, now: DateTime<Utc>) -> Option<Self> {
        let expires_at = Duration::try_seconds(response.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))?;
        Some(Self {
            access_token: response.access_token,
            expires_at,
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn token(expires_in: i64, now: DateTime<Utc>) -> Token {
        Token::issued(
            TokenResponse {
                access_token: "abc".to_string(),
                expires_in,
                token_type: Some("Bearer".to_string()),
            },
            now,
        )
        .unwrap()
    }

    #[test_case(3600, 0, false ; "fresh")]
    #[test_case(3600, 3569, false ; "just outside skew")]
    #[test_case(3600, 3570, true ; "inside skew")]
    #[test_case(3600, 7200, true ; "long gone")]
    fn expiry_honours_skew(expires_in: i64, elapsed: i64, expected: bool) {
        let issued_at = Utc::now();
        let token = token(expires_in, issued_at);

        assert_eq!(
            token.is_expired(issued_at + Duration::seconds(elapsed)),
            expected
        );
    }

    #[test_case(i64::MAX ; "beyond duration range")]
    #[test_case(1_000_000_000_000_000 ; "beyond calendar range")]
    fn out_of_range_lifetime_yields_no_token(expires_in: i64) {
        let response = TokenResponse {
            access_token: "abc".to_string(),
            expires_in,
            token_type: None,
        };

        assert!(Token::issued(response, Utc::now()).is_none());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let credentials = Credentials {
            client_id: "client".to_string(),
            client_secret: "hunter2".to_string(),
            customer_id: "01010112345".to_string(),
            identity_server: "https://auth.example/token".to_string(),
        };
        let token = token(60, Utc::now());

        assert!(!format!("{credentials:?}").contains("hunter2"));
        assert!(!format!("{token:?}").contains("abc"));
    }

    #[test]
    fn token_request_is_basic_authenticated_client_credentials_grant() {
        let credentials = Credentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            customer_id: "01010112345".to_string(),
            identity_server: "https://auth.example/token".to_string(),
        };
        let request = credentials.token_request();

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "https://auth.example/token");
        assert_eq!(
            request.auth,
            Auth::Basic {
                username: "client".to_string(),
                password: "secret".to_string()
            }
        );
        assert_eq!(
            request.body,
            Body::Form(vec![(
                "grant_type".to_string(),
                "client_credentials".to_string()
            )])
        );
    }
}
