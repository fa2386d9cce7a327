//! Command parsing and the handlers behind each command.

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;
use vaultcore_core::models::{total_balance, Account, AccountRequest, SignupRequest, Transaction};
use vaultcore_core::{ApiClient, ApiError, Config};

use crate::format::{format_money, truncate_string};

/// Role assigned to self-service sign-ups.
const DEFAULT_ROLE: &str = "USER";

/// Number of transactions shown on the dashboard.
const RECENT_TRANSACTIONS: usize = 5;

/// Column width for account ids in tables.
const ID_WIDTH: usize = 14;

pub const DISABLED_TRANSFER_NOTICE: &str =
    "Send Money is disabled in this demo build (no action performed).";

pub const USAGE: &str = "\
Usage: vaultcore [--json] <command> [args]

Commands:
  login [email]                         Sign in (password is prompted)
  signup <email> [role]                 Create a user
  logout                                Sign out and forget stored tokens
  status                                Show whether a session is stored
  dashboard                             Accounts, total balance, recent activity
  accounts                              List accounts
  create-account <type> <balance>       Open an account, e.g. SAVINGS 100
  transactions                          Full transaction history
  send-money                            Transfer form (disabled)
  help                                  Show this message";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { email: Option<String> },
    Signup { email: String, role: String },
    Logout,
    Status,
    Dashboard,
    Accounts,
    CreateAccount { account_type: String, initial_balance: f64 },
    Transactions,
    SendMoney,
    Help,
}

impl Command {
    /// Commands that refuse to run without a stored access token.
    pub fn requires_session(&self) -> bool {
        matches!(
            self,
            Command::Dashboard
                | Command::Accounts
                | Command::CreateAccount { .. }
                | Command::Transactions
                | Command::SendMoney
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: Command,
    pub json: bool,
}

pub fn parse_args<I, S>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut json = false;
    let mut words = Vec::new();
    for arg in args.into_iter().map(Into::into) {
        match arg.as_str() {
            "--json" => json = true,
            "-h" | "--help" => words.insert(0, "help".to_string()),
            _ => words.push(arg),
        }
    }

    let mut words = words.into_iter();
    let Some(name) = words.next() else {
        return Ok(Invocation {
            command: Command::Help,
            json,
        });
    };
    let rest: Vec<String> = words.collect();

    let command = match (name.as_str(), rest.as_slice()) {
        ("login", []) => Command::Login { email: None },
        ("login", [email]) => Command::Login {
            email: Some(email.clone()),
        },
        ("signup", [email]) => Command::Signup {
            email: email.clone(),
            role: DEFAULT_ROLE.to_string(),
        },
        ("signup", [email, role]) => Command::Signup {
            email: email.clone(),
            role: role.to_ascii_uppercase(),
        },
        ("logout", []) => Command::Logout,
        ("status", []) => Command::Status,
        ("dashboard", []) => Command::Dashboard,
        ("accounts", []) => Command::Accounts,
        ("create-account", [account_type, balance]) => Command::CreateAccount {
            account_type: account_type.to_ascii_uppercase(),
            initial_balance: balance
                .parse()
                .with_context(|| format!("Invalid initial balance '{}'", balance))?,
        },
        ("transactions" | "history", []) => Command::Transactions,
        ("send-money", _) => Command::SendMoney,
        ("help", _) => Command::Help,
        (other, _) => bail!("Unknown command or wrong arguments: {}\n\n{}", other, USAGE),
    };

    Ok(Invocation { command, json })
}

fn prompt_line(label: &str) -> Result<String> {
    eprint!("{}", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_accounts(accounts: &[Account]) {
    if accounts.is_empty() {
        println!("No accounts yet. Create one with `vaultcore create-account SAVINGS 100`.");
        return;
    }
    println!("{:<width$}  {:<10}  {:>14}", "ID", "TYPE", "BALANCE", width = ID_WIDTH);
    for account in accounts {
        println!(
            "{:<width$}  {:<10}  {:>14}",
            truncate_string(&account.id, ID_WIDTH),
            account.account_type,
            format_money(account.balance),
            width = ID_WIDTH
        );
    }
}

fn print_transactions(transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("No transactions yet.");
        return;
    }
    for txn in transactions {
        let sign = if txn.signed_amount() >= 0.0 { '+' } else { '-' };
        println!(
            "{:<20}  {:<6}  {} {:>12}  {}",
            txn.display_date(),
            txn.kind.to_string(),
            sign,
            format_money(txn.amount.abs()),
            txn.account
                .as_ref()
                .map(|a| a.account_type.as_str())
                .unwrap_or("")
        );
    }
}

pub async fn run(invocation: Invocation, api: &ApiClient, config: &mut Config) -> Result<()> {
    let command = invocation.command;
    debug!(command = ?command, "Running command");

    if command.requires_session() {
        api.ensure_signed_in()
            .map_err(|_| anyhow!("Not signed in. Run `vaultcore login` first."))?;
    }

    match command {
        Command::Help => println!("{}", USAGE),

        Command::Login { email } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt_line("Email: ")?,
            };
            if email.is_empty() {
                bail!("Email is required");
            }
            let password = rpassword::prompt_password(format!("Password for {}: ", email))
                .context("Failed to read password")?;

            api.login(&email, &password).await.map_err(|e| match e {
                ApiError::BadRequest(msg) => anyhow!("Login failed: {}", msg),
                other => anyhow!(other).context("Login failed"),
            })?;

            config
                .remember_email(&email)
                .context("Failed to save config")?;
            println!("Signed in as {}.", email);
        }

        Command::Signup { email, role } => {
            let password = rpassword::prompt_password("Choose a password: ")
                .context("Failed to read password")?;
            let confirm = rpassword::prompt_password("Confirm password: ")
                .context("Failed to read password")?;
            if password != confirm {
                bail!("Passwords do not match");
            }
            let response = api
                .signup(&SignupRequest {
                    email: email.clone(),
                    password,
                    role,
                })
                .await
                .context("Sign-up failed")?;
            println!("{}", response.message);
            println!("You can now sign in with `vaultcore login {}`.", email);
        }

        Command::Logout => {
            api.logout().await;
            println!("Signed out.");
        }

        Command::Status => {
            let session = api.session();
            if session.is_authenticated() {
                let who = config.last_email.as_deref().unwrap_or("unknown user");
                println!("Signed in ({}) against {}.", who, api.base_url());
                if session.refresh_token().is_none() {
                    println!("No refresh token stored; the session ends when the token expires.");
                }
            } else {
                println!("Not signed in.");
            }
        }

        Command::Dashboard => {
            let (accounts, transactions) = futures::join!(api.accounts(), api.transactions());
            let accounts = accounts.context("Failed to load accounts")?;
            let transactions = transactions.context("Failed to load transactions")?;
            if invocation.json {
                return print_json(&serde_json::json!({
                    "accounts": accounts,
                    "totalBalance": total_balance(&accounts),
                    "recentTransactions": transactions.iter().take(RECENT_TRANSACTIONS).collect::<Vec<_>>(),
                }));
            }

            println!("Total balance: {}", format_money(total_balance(&accounts)));
            println!("Accounts: {}", accounts.len());
            println!();
            print_accounts(&accounts);
            println!();
            println!("Recent transactions:");
            let recent: Vec<Transaction> =
                transactions.into_iter().take(RECENT_TRANSACTIONS).collect();
            print_transactions(&recent);
        }

        Command::Accounts => {
            let accounts = api.accounts().await.context("Failed to load accounts")?;
            if invocation.json {
                return print_json(&accounts);
            }
            print_accounts(&accounts);
        }

        Command::CreateAccount {
            account_type,
            initial_balance,
        } => {
            let account = api
                .create_account(&AccountRequest {
                    account_type,
                    initial_balance,
                })
                .await
                .context("Failed to create account")?;
            if invocation.json {
                return print_json(&account);
            }
            println!(
                "Created {} account {} with balance {}.",
                account.account_type,
                account.id,
                format_money(account.balance)
            );
        }

        Command::Transactions => {
            let transactions = api
                .transactions()
                .await
                .context("Failed to load transactions")?;
            if invocation.json {
                return print_json(&transactions);
            }
            print_transactions(&transactions);
        }

        Command::SendMoney => {
            // Sources are listed so the screen matches the transfer form
            let accounts = api.accounts().await.context("Failed to load accounts")?;
            print_accounts(&accounts);
            println!();
            println!("{}", DISABLED_TRANSFER_NOTICE);
        }
    }

    Ok(())
}
