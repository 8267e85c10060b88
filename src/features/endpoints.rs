use super::client::{BankError, BankResult};
use super::config::ApiSettings;
use std::collections::BTreeMap;
use std::fmt;

/// Remote operations the client knows how to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    CustomerDetails,
    AccountList,
    AccountDetails,
    TransactionList,
    TransferMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    CustomerId,
    AccountNumber,
}

impl Placeholder {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "customerId" => Some(Placeholder::CustomerId),
            "accountNumber" => Some(Placeholder::AccountNumber),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::CustomerId => "customerId",
            Placeholder::AccountNumber => "accountNumber",
        }
    }
}

impl Endpoint {
    pub const ALL: [Endpoint; 5] = [
        Endpoint::CustomerDetails,
        Endpoint::AccountList,
        Endpoint::AccountDetails,
        Endpoint::TransactionList,
        Endpoint::TransferMethod,
    ];

    /// Key of this endpoint's path template in the `api` settings section
    pub fn config_key(self) -> &'static str {
        match self {
            Endpoint::CustomerDetails => "customerDetails",
            Endpoint::AccountList => "accountList",
            Endpoint::AccountDetails => "accountDetails",
            Endpoint::TransactionList => "transactionList",
            Endpoint::TransferMethod => "transferMethod",
        }
    }

    pub fn from_config_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.config_key() == key)
    }

    /// Placeholders a template for this endpoint may reference
    pub fn placeholders(self) -> &'static [Placeholder] {
        use Placeholder::*;

        match self {
            Endpoint::CustomerDetails | Endpoint::AccountList | Endpoint::TransferMethod => {
                &[CustomerId]
            }
            Endpoint::AccountDetails | Endpoint::TransactionList => &[CustomerId, AccountNumber],
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Placeholder),
}

/// A `baseUrl + path` string split into literal text and `{placeholder}` slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl UrlTemplate {
    fn parse(endpoint: Endpoint, raw: String) -> BankResult<Self> {
        let invalid = |reason: String| {
            BankError::Configuration(format!("endpoint {endpoint}: {reason} in '{raw}'"))
        };

        let mut segments = Vec::new();
        let mut rest = raw.as_str();
        while let Some(open) = rest.find(&['{', '}'][..]) {
            if rest[open..].starts_with('}') {
                return Err(invalid("unbalanced '}'".to_string()));
            }
            let close = rest[open..]
                .find('}')
                .map(|i| open + i)
                .ok_or_else(|| invalid("unbalanced '{'".to_string()))?;
            let name = &rest[open + 1..close];
            let slot = Placeholder::parse(name)
                .filter(|p| endpoint.placeholders().contains(p))
                .ok_or_else(|| invalid(format!("placeholder '{{{name}}}' is not allowed")))?;

            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            segments.push(Segment::Slot(slot));
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { raw, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Substitutes every slot; a slot without a supplied value is an error.
    pub fn render(&self, params: &PathParams) -> BankResult<String> {
        let mut url = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Slot(p) => {
                    let value = params.get(*p).ok_or_else(|| {
                        BankError::Configuration(format!(
                            "no value supplied for '{{{}}}' in '{}'",
                            p.name(),
                            self.raw
                        ))
                    })?;
                    url.push_str(value);
                }
            }
        }
        Ok(url)
    }
}

/// Values for template placeholders, supplied per request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    values: BTreeMap<Placeholder, String>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.values.insert(placeholder, value.into());
        self
    }

    pub fn customer_id(self, value: impl Into<String>) -> Self {
        self.with(Placeholder::CustomerId, value)
    }

    pub fn account_number(self, value: impl Into<String>) -> Self {
        self.with(Placeholder::AccountNumber, value)
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.values.get(&placeholder).map(String::as_str)
    }
}

/// URL templates per endpoint, built once from the `api` settings section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMap {
    templates: BTreeMap<Endpoint, UrlTemplate>,
}

impl EndpointMap {
    pub fn from_settings(api: &ApiSettings) -> BankResult<Self> {
        let mut templates = BTreeMap::new();
        for (key, path) in &api.paths {
            match Endpoint::from_config_key(key) {
                Some(endpoint) => {
                    let raw = format!("{}{}", api.base_url, path);
                    templates.insert(endpoint, UrlTemplate::parse(endpoint, raw)?);
                }
                None => warn!("api: ignoring unknown endpoint '{key}'"),
            }
        }

        let map = Self { templates };
        debug!("endpoints: {map:?}");
        Ok(map)
    }

    pub fn template(&self, endpoint: Endpoint) -> BankResult<&UrlTemplate> {
        self.templates.get(&endpoint).ok_or_else(|| {
            BankError::Configuration(format!(
                "no path configured for endpoint '{}'",
                endpoint.config_key()
            ))
        })
    }

    pub fn url(&self, endpoint: Endpoint, params: &PathParams) -> BankResult<String> {
        self.template(endpoint)?.render(params)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = Endpoint> + '_ {
        self.templates.keys().copied()
    }
}
