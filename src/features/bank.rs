use super::account::NamedAccount;
use super::client::{BankClient, BankError};
use super::config::AccountBook;
use super::records::{AccountNumber, AccountRecord, TransferReceipt};
use super::transport::Transport;
use rust_decimal::prelude::*;
use thiserror::Error;

pub const DEFAULT_REWARD_MESSAGE: &str = "Rewarded by Grisebank";

#[derive(Error, Debug)]
pub enum GriseError {
    #[error("You can't reward the base account ({0})")]
    SelfReward(AccountNumber),

    #[error("No account named '{0}'")]
    UnknownUser(String),

    #[error(transparent)]
    Bank(#[from] BankError),
}

pub type GriseResult<T> = anyhow::Result<T, GriseError>;

/// Binds the household's named accounts to the base account that funds their rewards
pub struct GriseBank<T: Transport> {
    client: BankClient<T>,
    base: NamedAccount,
    users: Vec<NamedAccount>,
}

impl<T: Transport> GriseBank<T> {
    /// Matches every configured account number against one live account list.
    /// A configured number the bank does not know is a configuration error.
    pub fn new(accounts: &AccountBook, client: BankClient<T>) -> GriseResult<Self> {
        let mut records = client.accounts()?;

        let base = NamedAccount::new("base", take_record(&mut records, "BASE", accounts.base())?);

        let mut users = Vec::with_capacity(accounts.users().len());
        for (name, number) in accounts.users() {
            if number == base.account_number() {
                return Err(BankError::Configuration(format!(
                    "accounts: '{name}' uses the base account {number}"
                ))
                .into());
            }
            users.push(NamedAccount::new(name, take_record(&mut records, name, number)?));
        }

        info!("loaded base account and {} user account(s)", users.len());
        Ok(Self {
            client,
            base,
            users,
        })
    }

    pub fn client(&self) -> &BankClient<T> {
        &self.client
    }

    pub fn base(&self) -> &NamedAccount {
        &self.base
    }

    pub fn users(&self) -> &[NamedAccount] {
        &self.users
    }

    pub fn user(&self, label: &str) -> GriseResult<&NamedAccount> {
        self.users
            .iter()
            .find(|u| u.label() == label)
            .ok_or_else(|| GriseError::UnknownUser(label.to_string()))
    }

    pub fn user_by_number(&self, number: &AccountNumber) -> Option<&NamedAccount> {
        self.users.iter().find(|u| u.account_number() == number)
    }

    /// Transfers `amount` from the base account to `receiver`.
    ///
    /// One attempt, never retried. The receiver's cached balance is left alone;
    /// call [`GriseBank::update_user`] once the transfer has succeeded.
    pub fn reward(
        &self,
        receiver: &NamedAccount,
        amount: Decimal,
        message: Option<&str>,
    ) -> GriseResult<TransferReceipt> {
        if receiver.account_number() == self.base.account_number() {
            return Err(GriseError::SelfReward(receiver.account_number().clone()));
        }

        let message = message.unwrap_or(DEFAULT_REWARD_MESSAGE);
        info!("rewarding {} with {amount}", receiver.label());
        let receipt = self.client.transfer(
            self.base.account_number(),
            receiver.account_number(),
            amount,
            message,
        )?;
        Ok(receipt)
    }

    /// Refreshes a held user account in place and returns the new snapshot.
    pub fn update_user(&mut self, label: &str) -> GriseResult<&NamedAccount> {
        let client = &self.client;
        let account = self
            .users
            .iter_mut()
            .find(|u| u.label() == label)
            .ok_or_else(|| GriseError::UnknownUser(label.to_string()))?;
        Ok(account.update(client)?)
    }

    pub fn update_base(&mut self) -> GriseResult<&NamedAccount> {
        Ok(self.base.update(&self.client)?)
    }
}

fn take_record(
    records: &mut Vec<AccountRecord>,
    name: &str,
    number: &AccountNumber,
) -> GriseResult<AccountRecord> {
    let position = records
        .iter()
        .position(|r| &r.account_number == number)
        .ok_or_else(|| {
            BankError::Configuration(format!(
                "accounts: '{name}' refers to {number}, which the bank does not list"
            ))
        })?;
    Ok(records.swap_remove(position))
}
