mod account;
mod bank;
mod client;
mod config;
mod endpoints;
mod records;
mod token;
mod transport;

#[cfg(test)]
mod testing;

pub use self::{
    account::NamedAccount,
    bank::{GriseBank, GriseResult},
    client::BankClient,
    config::{Settings, BASE_ACCOUNT},
    records::AccountNumber,
    transport::ReqwestTransport,
};
