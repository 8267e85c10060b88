use std::path::PathBuf;
use std::process;
#[macro_use]
extern crate log;

mod features;
use clap::{Parser, Subcommand};
use features::{
    AccountNumber, BankClient, GriseBank, GriseResult, NamedAccount, ReqwestTransport, Settings,
    BASE_ACCOUNT,
};
use rust_decimal::Decimal;

/// Reward household members with transfers from a shared base account
#[derive(Parser, Debug)]
#[clap(name = "grisebank", version)]
struct Cli {
    /// Settings file (JSON)
    #[clap(short, long, default_value = "config.json")]
    config: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the customer the credentials belong to
    Me,
    /// Print the endpoint templates built from the settings
    Endpoints,
    /// List the base account and every named account
    Accounts,
    /// Show the latest transactions of a named account (label or account number)
    Transactions { name: String },
    /// Transfer an amount from the base account to a named account (label or account number)
    Reward {
        name: String,
        amount: Decimal,
        #[clap(short, long)]
        message: Option<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(&cli.config)?;
    let transport = ReqwestTransport::new(settings.http.timeout())?;
    let client = BankClient::connect(&settings, transport)?;

    match cli.command {
        Command::Me => {
            let me = client.me()?;
            println!("{} {} ({})", me.first_name, me.last_name, me.customer_id);
        }
        Command::Endpoints => {
            let endpoints = client.endpoints();
            for endpoint in endpoints.endpoints() {
                println!("{endpoint}: {}", endpoints.template(endpoint)?.as_str());
            }
        }
        command => {
            let mut bank = GriseBank::new(&settings.accounts, client)?;
            match command {
                Command::Accounts => {
                    for account in std::iter::once(bank.base()).chain(bank.users()) {
                        let record = account.record();
                        println!(
                            "{account} (available: {}, {} \"{}\")",
                            record.available, record.account_type, record.name
                        );
                    }
                }
                Command::Transactions { name } => {
                    let account = find(&bank, &name)?;
                    for tx in account.latest_transactions(bank.client())? {
                        println!(
                            "{}  {:>10}  {}",
                            tx.accounting_date.format("%Y-%m-%d"),
                            tx.amount,
                            tx.text
                        );
                    }
                }
                Command::Reward {
                    name,
                    amount,
                    message,
                } => reward(&mut bank, &name, amount, message.as_deref()),
                Command::Me | Command::Endpoints => unreachable!(),
            }
        }
    }

    Ok(())
}

/// Resolves a label, or failing that an account number, to a held account.
fn find<'a>(bank: &'a GriseBank<ReqwestTransport>, name: &str) -> GriseResult<&'a NamedAccount> {
    let number = AccountNumber::from(name);
    if name == BASE_ACCOUNT || bank.base().account_number() == &number {
        return Ok(bank.base());
    }
    bank.user(name)
        .or_else(|e| bank.user_by_number(&number).ok_or(e))
}

/// Reports the outcome as a status line; a failed reward is not fatal.
fn reward(bank: &mut GriseBank<ReqwestTransport>, name: &str, amount: Decimal, message: Option<&str>) {
    let outcome = find(bank, name).and_then(|receiver| bank.reward(receiver, amount, message));
    let receipt = match outcome {
        Ok(receipt) => receipt,
        Err(e) => {
            warn!("reward to {name} failed: {e}");
            println!("Reward failed: {e}");
            return;
        }
    };

    if !receipt.succeeded() {
        println!("Reward not confirmed: {}", receipt.payload());
        return;
    }

    let label = match find(bank, name) {
        Ok(receiver) => receiver.label().to_string(),
        Err(_) => name.to_string(),
    };
    match bank.update_user(&label) {
        Ok(account) => println!("Rewarded {amount}. {account}"),
        Err(e) => println!("Rewarded {amount}, but the balance could not be refreshed: {e}"),
    }
    match bank.update_base() {
        Ok(base) => println!("{BASE_ACCOUNT} balance is now {}", base.balance()),
        Err(e) => warn!("base balance could not be refreshed: {e}"),
    }
}
