//! `journal-cli` -- command-line front end for the journaling backend.
//!
//! Keeps the signed-in session under `JOURNAL_DATA_DIR` between runs.
//! Credentials are read from the environment so they never appear in
//! shell history.
//!
//! # Environment variables
//!
//! | Variable               | Used by                                   |
//! |------------------------|-------------------------------------------|
//! | `JOURNAL_EMAIL`        | `register`, `login`                       |
//! | `JOURNAL_PASSWORD`     | `register`, `login`, `change-password`, `delete-account` |
//! | `JOURNAL_NEW_PASSWORD` | `change-password`                         |
//!
//! Backend and client settings are documented on
//! [`ClientConfig::from_env`](journal_client::ClientConfig::from_env).

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use journal_client::{ClientConfig, JournalClient, RegistrationOutcome};
use journal_core::account::{ChangePasswordRequest, DeleteAccountRequest};
use journal_core::journal::{character_count, word_count};

const USAGE: &str = "\
Usage: journal-cli <command> [args]

Commands:
  register                  create an account (JOURNAL_EMAIL, JOURNAL_PASSWORD)
  login                     sign in (JOURNAL_EMAIL, JOURNAL_PASSWORD)
  logout                    sign out
  whoami                    show the signed-in user
  entries                   list journal entries, newest first
  write <text>              add a journal entry
  streak                    show the writing streak
  export [dir]              save all entries as JSON (default: current dir)
  change-password           JOURNAL_PASSWORD -> JOURNAL_NEW_PASSWORD
  delete-account <phrase>   delete the account; phrase must be \"delete my data\"
  reset-password <email>    email a password reset link";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "journal_client=info,journal_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // --- Configuration ---
    let config = ClientConfig::from_env().context("Invalid configuration")?;
    tracing::debug!(url = %config.supabase_url, data_dir = %config.data_dir.display(), "Loaded client configuration");

    // --- Client ---
    let client = JournalClient::from_config(&config)?;
    client.sessions.restore().await;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = run(&client, &args).await;

    // Session writes are fire-and-forget; land them before exiting.
    client.store.flush().await;

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(client: &JournalClient, args: &[String]) -> anyhow::Result<()> {
    let Some((command, rest)) = args.split_first() else {
        println!("{USAGE}");
        return Ok(());
    };

    match command.as_str() {
        "register" => {
            let (email, password) = credentials()?;
            let outcome = client
                .register
                .register(&email, &password)
                .await
                .map_err(|e| anyhow!(e.registration_message()))?;
            match outcome {
                RegistrationOutcome::SessionEstablished { .. } => {
                    client.journal.create_welcome_entry_if_needed().await;
                    println!("Konto utworzone. Zalogowano jako {email}.");
                }
                RegistrationOutcome::ConfirmationRequired { .. } => {
                    println!("Konto utworzone. Sprawdź skrzynkę {email}, aby potwierdzić adres.");
                }
            }
        }
        "login" => {
            let (email, password) = credentials()?;
            client
                .login
                .login(&email, &password)
                .await
                .map_err(|e| anyhow!(e.login_message()))?;
            client.journal.create_welcome_entry_if_needed().await;
            println!("Zalogowano jako {email}.");
        }
        "logout" => {
            client.logout.logout().await;
            println!("Wylogowano.");
        }
        "whoami" => match client.current_user.current_user_id() {
            Some(user_id) => {
                let email = client.store.load_sync().and_then(|s| s.email);
                println!("{user_id} {}", email.as_deref().unwrap_or(""));
            }
            None => println!("Nie zalogowano."),
        },
        "entries" => {
            let entries = client.journal.list_entries().await.map_err(user_error)?;
            if entries.is_empty() {
                println!("Brak wpisów.");
            }
            for entry in entries {
                println!(
                    "{} [{}] {} znaków, {} słów",
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.id,
                    character_count(&entry.content),
                    word_count(&entry.content),
                );
                println!("{}\n", entry.content);
            }
        }
        "write" => {
            let text = rest.join(" ");
            let entry = client.journal.create_entry(&text).await.map_err(user_error)?;
            println!("Zapisano wpis {}.", entry.id);
        }
        "streak" => match client.journal.get_streak().await.map_err(user_error)? {
            Some(streak) => println!(
                "Seria: {} dni (najdłuższa: {})",
                streak.current_streak, streak.longest_streak
            ),
            None => println!("Brak serii."),
        },
        "export" => {
            let dir = rest.first().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            let export = client.account.export_data().await.map_err(user_error)?;
            let path = journal_client::AccountService::write_export(&export, &dir)
                .await
                .map_err(user_error)?;
            println!("Wyeksportowano {} wpisów do {}.", export.total_entries, path.display());
        }
        "change-password" => {
            let new_password = env("JOURNAL_NEW_PASSWORD")?;
            let request = ChangePasswordRequest {
                current_password: env("JOURNAL_PASSWORD")?,
                confirm_password: new_password.clone(),
                new_password,
            };
            client
                .account
                .change_password(&request)
                .await
                .map_err(user_error)?;
            println!("Hasło zostało zmienione.");
        }
        "delete-account" => {
            let request = DeleteAccountRequest {
                password: env("JOURNAL_PASSWORD")?,
                confirmation_phrase: rest.join(" "),
            };
            client
                .account
                .delete_account(&request)
                .await
                .map_err(user_error)?;
            println!("Konto zostało usunięte.");
        }
        "reset-password" => {
            let Some(email) = rest.first() else {
                bail!("Podaj adres e-mail.");
            };
            client
                .account
                .request_password_reset(email)
                .await
                .map_err(user_error)?;
            println!("Jeśli konto istnieje, wysłaliśmy link do zmiany hasła.");
        }
        other => bail!("Unknown command '{other}'\n\n{USAGE}"),
    }

    Ok(())
}

fn user_error(e: journal_client::ClientError) -> anyhow::Error {
    anyhow!(e.user_message())
}

fn env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

fn credentials() -> anyhow::Result<(String, String)> {
    Ok((env("JOURNAL_EMAIL")?, env("JOURNAL_PASSWORD")?))
}
