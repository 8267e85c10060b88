use super::client::{BankError, BankResult};
use super::records::AccountNumber;
use anyhow::Context;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Reserved `accounts` key naming the funding account
pub const BASE_ACCOUNT: &str = "BASE";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings file contents. Keys are case-sensitive.
#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub secrets: Secrets,
    pub api: ApiSettings,
    pub login: LoginSettings,
    pub accounts: AccountBook,
    #[serde(default)]
    pub http: HttpSettings,
}

#[derive(Deserialize, Clone)]
pub struct Secrets {
    #[serde(rename = "customerId")]
    pub customer_id: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub password: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("customer_id", &self.customer_id)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiSettings {
    #[serde(rename = "baseUrl")]
    pub base_url: String,

    /// Logical endpoint name -> path template, e.g. `accountList` -> `/api/v1/Accounts`
    #[serde(flatten)]
    pub paths: BTreeMap<String, String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginSettings {
    #[serde(rename = "identityServer")]
    pub identity_server: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct HttpSettings {
    #[serde(rename = "timeoutSecs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// The `accounts` section: name -> account number, in file order, with a
/// mandatory `BASE` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBook {
    base: AccountNumber,
    users: Vec<(String, AccountNumber)>,
}

impl AccountBook {
    pub fn new(entries: Vec<(String, AccountNumber)>) -> BankResult<Self> {
        let mut base = None;
        let mut users: Vec<(String, AccountNumber)> = Vec::new();

        for (name, number) in entries {
            if name == BASE_ACCOUNT {
                if base.replace(number).is_some() {
                    return Err(BankError::Configuration(
                        "accounts: BASE is defined twice".to_string(),
                    ));
                }
                continue;
            }
            if users.iter().any(|(existing, _)| *existing == name) {
                return Err(BankError::Configuration(format!(
                    "accounts: '{name}' is defined twice"
                )));
            }
            users.push((name, number));
        }

        let base = base.ok_or_else(|| {
            BankError::Configuration(format!("accounts: missing '{BASE_ACCOUNT}' entry"))
        })?;

        Ok(Self { base, users })
    }

    pub fn base(&self) -> &AccountNumber {
        &self.base
    }

    /// Named household accounts, `BASE` excluded
    pub fn users(&self) -> &[(String, AccountNumber)] {
        &self.users
    }
}

impl<'de> Deserialize<'de> for AccountBook {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedEntries;

        impl<'de> Visitor<'de> for OrderedEntries {
            type Value = Vec<(String, AccountNumber)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of account names to account numbers")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, AccountNumber>()? {
                    entries.push(entry);
                }
                Ok(entries)
            }
        }

        let entries = d.deserialize_map(OrderedEntries)?;
        AccountBook::new(entries).map_err(serde::de::Error::custom)
    }
}

impl Settings {
    pub fn from_json(raw: &str) -> BankResult<Self> {
        serde_json::from_str(raw).map_err(|e| BankError::Configuration(e.to_string()))
    }

    /// Reads the settings file, then applies `GRISEBANK_*` overrides for the secrets.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read settings file {}", path.display()))?;
        let mut settings = Self::from_json(&raw)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let targets = [
            ("GRISEBANK_CUSTOMER_ID", &mut self.secrets.customer_id),
            ("GRISEBANK_CLIENT_ID", &mut self.secrets.client_id),
            ("GRISEBANK_CLIENT_SECRET", &mut self.secrets.password),
        ];
        for (key, target) in targets {
            if let Some(value) = lookup(key) {
                debug!("settings: {key} taken from environment");
                *target = value;
            }
        }
    }
}
