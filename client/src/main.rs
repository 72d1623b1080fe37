//! `ledger-client` entry point: list and record ledger accounts from a terminal.

use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use ortho_config::OrthoConfig;

use ledger_client::config::ClientSettings;
use ledger_client::domain::ports::{DEFAULT_PAGE, DEFAULT_PER_PAGE, PageParams};
use ledger_client::domain::{AccountField, AccountRecord, LedgerSession, QueryKey, UiEvent};
use ledger_client::outbound::ledger_http::{ApiShape, HttpLedgerGateway};
use ledger_client::telemetry::init_tracing;

/// `ledger-client` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "ledger-client",
    about = "List and record accounts in a remote ledger",
    version
)]
struct CliArgs {
    /// Ledger base URL. Falls back to `LEDGER_API_URL` when omitted.
    #[arg(long = "api-url", value_name = "url", global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print one page of accounts as a table.
    List {
        /// One-based page number.
        #[arg(long, default_value_t = DEFAULT_PAGE)]
        page: u32,
        /// Accounts per page (1 to 100).
        #[arg(long = "per-page", default_value_t = DEFAULT_PER_PAGE)]
        per_page: u32,
    },
    /// Record a new account, then print the refreshed table.
    Add(AddArgs),
}

#[derive(Debug, clap::Args)]
struct AddArgs {
    #[arg(long = "account-number")]
    account_number: String,
    #[arg(long = "account-name")]
    account_name: String,
    #[arg(long)]
    iban: String,
    #[arg(long)]
    address: String,
    #[arg(long, default_value = "0")]
    amount: String,
    /// `sending` or `receiving`.
    #[arg(long = "type", default_value = "sending")]
    account_type: String,
}

impl AddArgs {
    fn into_events(self) -> Vec<UiEvent> {
        [
            (AccountField::AccountNumber, self.account_number),
            (AccountField::AccountName, self.account_name),
            (AccountField::Iban, self.iban),
            (AccountField::Address, self.address),
            (AccountField::Amount, self.amount),
            (AccountField::Type, self.account_type),
        ]
        .into_iter()
        .map(|(field, value)| UiEvent::FieldChange {
            name: field.wire_name().to_owned(),
            value,
        })
        .chain(std::iter::once(UiEvent::Submit))
        .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let args = CliArgs::parse();
    let settings = ClientSettings::load_from_iter([OsString::from("ledger-client")])
        .map_err(|error| eyre!("load client settings: {error}"))?
        .with_api_url_override(args.api_url);
    let base_url = settings.api_url()?;
    let gateway = HttpLedgerGateway::new(base_url, ApiShape::default())
        .wrap_err("build ledger gateway")?;
    let session = LedgerSession::new(Arc::new(gateway));

    let key = match args.command {
        Command::List { page, per_page } => QueryKey::for_page(PageParams::new(page, per_page)),
        Command::Add(add) => {
            let account_number = add.account_number.clone();
            for event in add.into_events() {
                session.handle(event).await?;
            }
            writeln!(io::stdout().lock(), "Recorded account {account_number}.")?;
            session.accounts_key().clone()
        }
    };

    let records = session
        .cache()
        .settled(&key)
        .await
        .wrap_err("fetch accounts")?;
    render_table(&mut io::stdout().lock(), &records)?;
    Ok(())
}

fn render_table(out: &mut impl Write, records: &[AccountRecord]) -> io::Result<()> {
    if records.is_empty() {
        return writeln!(out, "No accounts recorded.");
    }

    let widths: Vec<usize> = AccountField::ALL
        .iter()
        .map(|field| {
            records
                .iter()
                .map(|record| field.value_of(record).chars().count())
                .chain(std::iter::once(field.label().chars().count()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    write_row(out, &widths, AccountField::ALL.map(AccountField::label))?;
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    write_row(out, &widths, rule.iter().map(String::as_str))?;
    for record in records {
        write_row(
            out,
            &widths,
            AccountField::ALL.map(|field| field.value_of(record)),
        )?;
    }
    Ok(())
}

fn write_row<'a>(
    out: &mut impl Write,
    widths: &[usize],
    cells: impl IntoIterator<Item = &'a str>,
) -> io::Result<()> {
    let line = cells
        .into_iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    writeln!(out, "{}", line.trim_end())
}

#[cfg(test)]
mod tests {
    //! Unit tests for CLI rendering and argument mapping.

    use super::*;
    use ledger_client::domain::{AccountType, Amount};
    use rstest::rstest;

    fn record() -> AccountRecord {
        AccountRecord {
            account_number: "AC1".to_owned(),
            account_name: "Alice".to_owned(),
            iban: "DE89".to_owned(),
            address: "1 Main St".to_owned(),
            amount: Amount::parse("100").expect("amount"),
            account_type: AccountType::Sending,
        }
    }

    fn render(records: &[AccountRecord]) -> String {
        let mut buffer = Vec::new();
        render_table(&mut buffer, records).expect("render");
        String::from_utf8(buffer).expect("utf8")
    }

    #[rstest]
    fn renders_labelled_columns() {
        let output = render(&[record()]);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines.first().copied(),
            Some("Account Number | Account Name | IBAN | Address   | Amount | Type")
        );
        assert_eq!(
            lines.get(2).copied(),
            Some("AC1            | Alice        | DE89 | 1 Main St | 100    | sending")
        );
    }

    #[rstest]
    fn renders_a_placeholder_for_empty_collections() {
        assert_eq!(render(&[]), "No accounts recorded.\n");
    }

    #[rstest]
    fn add_arguments_become_field_changes_then_submit() {
        let args = CliArgs::try_parse_from([
            "ledger-client",
            "add",
            "--account-number",
            "AC1",
            "--account-name",
            "Alice",
            "--iban",
            "DE89",
            "--address",
            "1 Main St",
        ])
        .expect("valid arguments");
        let Command::Add(add) = args.command else {
            panic!("expected add command");
        };

        let events = add.into_events();

        assert_eq!(events.len(), 7);
        assert_eq!(
            events.get(4),
            Some(&UiEvent::FieldChange {
                name: "amount".to_owned(),
                value: "0".to_owned(),
            })
        );
        assert_eq!(
            events.get(5),
            Some(&UiEvent::FieldChange {
                name: "type".to_owned(),
                value: "sending".to_owned(),
            })
        );
        assert_eq!(events.last(), Some(&UiEvent::Submit));
    }

    #[rstest]
    fn api_url_flag_is_global() {
        let args = CliArgs::try_parse_from([
            "ledger-client",
            "list",
            "--api-url",
            "http://ledger.test",
            "--per-page",
            "25",
        ])
        .expect("valid arguments");

        assert_eq!(args.api_url.as_deref(), Some("http://ledger.test"));
        assert!(matches!(
            args.command,
            Command::List {
                page: 1,
                per_page: 25
            }
        ));
    }
}
