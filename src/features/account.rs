use super::client::{BankClient, BankResult};
use super::records::{AccountNumber, AccountRecord, TransactionRecord};
use super::transport::Transport;
use rust_decimal::prelude::*;
use std::fmt;

/// A household member's (or the base) account: a human label bound to the
/// latest snapshot fetched from the bank
#[derive(Debug, Clone, PartialEq)]
pub struct NamedAccount {
    label: String,
    record: AccountRecord,
}

impl NamedAccount {
    pub(crate) fn new(label: impl Into<String>, record: AccountRecord) -> Self {
        Self {
            label: label.into(),
            record,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn account_number(&self) -> &AccountNumber {
        &self.record.account_number
    }

    pub fn balance(&self) -> Decimal {
        self.record.balance
    }

    pub fn record(&self) -> &AccountRecord {
        &self.record
    }

    /// Re-fetches the account and swaps in the new snapshot. On failure the
    /// previous snapshot is kept.
    pub fn update<T: Transport>(&mut self, client: &BankClient<T>) -> BankResult<&Self> {
        let fresh = client.account_details(self.account_number())?;
        debug!(
            "{}: balance {} -> {}",
            self.label, self.record.balance, fresh.balance
        );
        self.record = fresh;
        Ok(self)
    }

    /// Always fetched, never cached
    pub fn latest_transactions<T: Transport>(
        &self,
        client: &BankClient<T>,
    ) -> BankResult<Vec<TransactionRecord>> {
        client.transactions(self.account_number())
    }
}

impl fmt::Display for NamedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: account # {}, balance: {}",
            self.label, self.record.account_number, self.record.balance
        )
    }
}
