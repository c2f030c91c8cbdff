use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::application::{AppError, ErrorResponse, LedgerService};
use crate::domain::{Account, AccountId, Customer, CustomerId, format_cents, parse_cents};

/// Ledgerbank - a minimal banking ledger
#[derive(Parser, Debug)]
#[command(name = "ledgerbank")]
#[command(about = "Customers, accounts, deposits and withdrawals on a local ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "LEDGERBANK_DATABASE", default_value = "ledgerbank.db")]
    pub database: String,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Customer management commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),
}

#[derive(Subcommand, Debug)]
pub enum CustomerCommands {
    /// Create a new customer
    Create {
        /// Customer name
        name: String,
    },

    /// Show a customer
    Show {
        /// Customer ID
        id: CustomerId,
    },

    /// List the accounts owned by a customer
    Accounts {
        /// Customer ID
        id: CustomerId,
    },
}

#[derive(Subcommand, Debug)]
pub enum AccountCommands {
    /// Open a new account for a customer
    Open {
        /// Account type (e.g., "Savings", "Checking")
        #[arg(short = 't', long = "type")]
        account_type: String,

        /// Owning customer ID
        #[arg(short, long)]
        customer: CustomerId,
    },

    /// Show an account
    Show {
        /// Account ID
        id: AccountId,
    },

    /// Deposit money into an account
    Deposit {
        /// Account ID
        id: AccountId,

        /// Amount (e.g., "50.00" or "50")
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Withdraw money from an account
    Withdraw {
        /// Account ID
        id: AccountId,

        /// Amount (e.g., "50.00" or "50")
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Close an account
    Close {
        /// Account ID
        id: AccountId,
    },
}

impl Cli {
    /// Run the command, reporting any failure on stderr.
    pub async fn run(self) -> ExitCode {
        let json = self.json;
        match self.dispatch().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                report_error(&err, json);
                ExitCode::FAILURE
            }
        }
    }

    async fn dispatch(self) -> Result<(), AppError> {
        let output = Output { json: self.json };

        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                tracing::info!(database = %self.database, "Database initialized");
                if output.json {
                    output.print_json(&serde_json::json!({ "database": self.database }))?;
                } else {
                    println!("Database initialized: {}", self.database);
                }
            }

            Commands::Customer(cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_customer_command(&service, cmd, &output).await?;
            }

            Commands::Account(cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_account_command(&service, cmd, &output).await?;
            }
        }
        Ok(())
    }
}

async fn run_customer_command(
    service: &LedgerService,
    cmd: CustomerCommands,
    output: &Output,
) -> Result<(), AppError> {
    match cmd {
        CustomerCommands::Create { name } => {
            let customer = service.customers().create_customer(&name).await?;
            output.customer(&customer)?;
        }

        CustomerCommands::Show { id } => {
            let customer = service.customers().get_customer(id).await?;
            output.customer(&customer)?;
        }

        CustomerCommands::Accounts { id } => {
            let accounts = service.list_customer_accounts(id).await?;
            if output.json {
                output.print_json(&accounts)?;
            } else if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<12} {:<12} {:>14} {:<8}", "ID", "TYPE", "BALANCE", "STATUS");
                println!("{}", "-".repeat(49));
                for account in accounts {
                    println!(
                        "{:<12} {:<12} {:>14} {:<8}",
                        account.id,
                        truncate(&account.account_type, 12),
                        format_cents(account.balance_cents),
                        account.status
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_account_command(
    service: &LedgerService,
    cmd: AccountCommands,
    output: &Output,
) -> Result<(), AppError> {
    let account = match cmd {
        AccountCommands::Open {
            account_type,
            customer,
        } => service.create_account(&account_type, customer).await?,

        AccountCommands::Show { id } => service.get_account_by_id(id).await?,

        AccountCommands::Deposit { id, amount } => {
            service.deposit(id, parse_cents(&amount)?).await?
        }

        AccountCommands::Withdraw { id, amount } => {
            service.withdraw(id, parse_cents(&amount)?).await?
        }

        AccountCommands::Close { id } => service.close_account(id).await?,
    };

    output.account(&account)
}

/// Renders results either as human-readable text or as JSON.
struct Output {
    json: bool,
}

impl Output {
    fn print_json<T: Serialize>(&self, value: &T) -> Result<(), AppError> {
        let text = serde_json::to_string_pretty(value).context("Failed to encode JSON output")?;
        println!("{}", text);
        Ok(())
    }

    fn customer(&self, customer: &Customer) -> Result<(), AppError> {
        if self.json {
            return self.print_json(customer);
        }
        println!("Customer: {}", customer.name);
        println!("  ID:       {}", customer.id);
        println!(
            "  Created:  {}",
            customer.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(())
    }

    fn account(&self, account: &Account) -> Result<(), AppError> {
        if self.json {
            return self.print_json(account);
        }
        println!("Account: {}", account.id);
        println!("  Type:     {}", account.account_type);
        println!("  Owner:    {}", account.customer_id);
        println!("  Status:   {}", account.status);
        println!("  Balance:  {}", format_cents(account.balance_cents));
        println!(
            "  Opened:   {}",
            account.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(closed) = account.closed_at {
            println!("  Closed:   {}", closed.format("%Y-%m-%d %H:%M:%S"));
        }
        Ok(())
    }
}

fn report_error(err: &AppError, json: bool) {
    let response = ErrorResponse::from(err);
    if json {
        match serde_json::to_string_pretty(&response) {
            Ok(text) => eprintln!("{}", text),
            Err(_) => eprintln!("Error: {}", response.message),
        }
    } else {
        eprintln!("Error ({}): {}", response.status, response.message);
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
