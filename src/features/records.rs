use chrono::{DateTime, NaiveDateTime};
use rust_decimal::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Bank account number as issued by the provider (fixed-length, digits only)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountNumber {
    fn from(number: &str) -> Self {
        Self::new(number)
    }
}

/// Snapshot of an account as returned by `accountList` / `accountDetails`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub account_number: AccountNumber,
    pub account_type: String,

    /// Funds that can be spent right now (balance minus reservations, plus credit)
    pub available: Decimal,

    /// Booked balance
    pub balance: Decimal,
    pub credit_limit: Decimal,
    pub customer_id: String,
    pub owner_customer_id: String,
    pub default_account: bool,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub account_number: AccountNumber,
    pub amount: Decimal,
    pub text: String,
    pub transaction_id: String,
    pub transaction_type: String,
    #[serde(deserialize_with = "timestamp")]
    pub accounting_date: NaiveDateTime,
    #[serde(deserialize_with = "timestamp")]
    pub interest_date: NaiveDateTime,

    /// Reserved (not yet booked) transactions carry no registration date
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub registration_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub other_account_number: Option<AccountNumber>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub customer_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

/// `{item: T, isError: bool, ...}`
#[derive(Deserialize, Debug)]
pub(crate) struct ItemEnvelope<T> {
    pub item: T,
}

/// `{items: [T], isError: bool, ...}`
#[derive(Deserialize, Debug)]
pub(crate) struct ListEnvelope<T> {
    pub items: Vec<T>,
}

/// Confirmation payload of a completed transfer, kept as delivered by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt(serde_json::Value);

impl TransferReceipt {
    pub(crate) fn new(payload: serde_json::Value) -> Self {
        Self(payload)
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.0
    }

    /// True when the payload carries none of the provider's error markers.
    pub fn succeeded(&self) -> bool {
        let flagged = self
            .0
            .get("isError")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let has_message = self
            .0
            .get("errorMessage")
            .map_or(false, |message| !message.is_null());
        !flagged && !has_message
    }
}

/// The provider sends both `2018-06-01T00:00:00` and `2018-06-01T00:00:00+02:00`.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

fn timestamp<'de, D>(d: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(d)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

fn optional_timestamp<'de, D>(d: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(d)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use test_case::test_case;

    fn account_json() -> serde_json::Value {
        json!({
            "accountNumber": "22222222222",
            "accountType": "Standard account",
            "available": 120.5,
            "balance": 100.25,
            "creditLimit": 0.0,
            "customerId": "01010112345",
            "ownerCustomerId": "01010112345",
            "defaultAccount": false,
            "name": "Alice sparing",
            "accountId": "ignored-extra-field"
        })
    }

    #[test]
    fn account_record_decodes_provider_item() {
        let record: AccountRecord = serde_json::from_value(account_json()).unwrap();

        assert_eq!(record.account_number, AccountNumber::from("22222222222"));
        assert_eq!(record.balance, dec!(100.25));
        assert_eq!(record.available, dec!(120.5));
        assert!(!record.default_account);
    }

    #[test_case("balance" ; "balance")]
    #[test_case("accountNumber" ; "account number")]
    #[test_case("ownerCustomerId" ; "owner")]
    fn account_record_rejects_missing_required_field(field: &str) {
        let mut value = account_json();
        value.as_object_mut().unwrap().remove(field);

        let err = serde_json::from_value::<AccountRecord>(value).unwrap_err();
        assert!(err.to_string().contains(field));
    }

    #[test_case("2018-06-01T00:00:00" ; "naive")]
    #[test_case("2018-06-01T00:00:00.000" ; "naive with fraction")]
    #[test_case("2018-06-01T00:00:00+02:00" ; "with offset")]
    fn timestamps_accept_provider_formats(raw: &str) {
        let parsed = parse_timestamp(raw).unwrap();
        assert_eq!(parsed.to_string(), "2018-06-01 00:00:00");
    }

    #[test]
    fn transaction_record_allows_missing_optional_fields() {
        let record: TransactionRecord = serde_json::from_value(json!({
            "accountNumber": "22222222222",
            "amount": -49.9,
            "text": "Kiosk",
            "transactionId": "tx-1",
            "transactionType": "VARER",
            "accountingDate": "2018-06-01T00:00:00",
            "interestDate": "2018-06-02T00:00:00"
        }))
        .unwrap();

        assert_eq!(record.amount, dec!(-49.9));
        assert_eq!(record.registration_date, None);
        assert_eq!(record.other_account_number, None);
    }

    #[test]
    fn transaction_record_rejects_garbled_timestamp() {
        let result = serde_json::from_value::<TransactionRecord>(json!({
            "accountNumber": "22222222222",
            "amount": 1,
            "text": "x",
            "transactionId": "tx-2",
            "transactionType": "OVF",
            "accountingDate": "yesterday",
            "interestDate": "2018-06-02T00:00:00"
        }));

        assert!(result.is_err());
    }

    #[test_case(json!({"isError": false}), true ; "clean")]
    #[test_case(json!({"isError": false, "errorMessage": null}), true ; "null message")]
    #[test_case(json!({"isError": true}), false ; "flagged")]
    #[test_case(json!({"errorMessage": "Insufficient funds"}), false ; "message only")]
    fn receipt_success_follows_error_markers(payload: serde_json::Value, expected: bool) {
        assert_eq!(TransferReceipt::new(payload).succeeded(), expected);
    }
}
