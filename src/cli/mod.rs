pub mod init;
pub mod installments;
pub mod ministries;
pub mod schedules;
pub mod status;
pub mod transactions;
pub mod volunteers;

use clap::{ArgAction, Parser, Subcommand};
use rust_decimal::Decimal;

use crate::error::{Igreja360Error, Result};

pub(crate) fn parse_month(raw: &str) -> Result<(i32, u32)> {
    let (y, m) = raw
        .split_once('-')
        .ok_or_else(|| Igreja360Error::InvalidDate(format!("{raw} (expected YYYY-MM)")))?;
    let year = y.parse().map_err(|_| Igreja360Error::InvalidDate(raw.to_string()))?;
    let month: u32 = m.parse().map_err(|_| Igreja360Error::InvalidDate(raw.to_string()))?;
    if !(1..=12).contains(&month) {
        return Err(Igreja360Error::InvalidDate(raw.to_string()));
    }
    Ok((year, month))
}

pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

#[derive(Parser)]
#[command(name = "igreja360", about = "Church finances and ministry rosters.")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for Igreja360 data (default: ~/Documents/igreja360)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Church name shown on reports
        #[arg(long = "church")]
        church_name: Option<String>,
    },
    /// Show current database and summary statistics.
    Status,
    /// Manage ministries.
    Ministries {
        #[command(subcommand)]
        command: MinistriesCommands,
    },
    /// Manage volunteers.
    Volunteers {
        #[command(subcommand)]
        command: VolunteersCommands,
    },
    /// Record, pay, list and import transactions.
    Transactions {
        #[command(subcommand)]
        command: TransactionsCommands,
    },
    /// Installment plans and their dashboard.
    Installments {
        #[command(subcommand)]
        command: InstallmentsCommands,
    },
    /// Volunteer shift schedules.
    Schedules {
        #[command(subcommand)]
        command: SchedulesCommands,
    },
}

#[derive(Subcommand)]
pub enum MinistriesCommands {
    /// Add a ministry, e.g. 'Louvor' or 'Infantil'.
    Add { name: String },
    /// List ministries.
    List,
}

#[derive(Subcommand)]
pub enum VolunteersCommands {
    /// Add a volunteer to a ministry.
    Add {
        name: String,
        /// Ministry name
        #[arg(long)]
        ministry: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// List volunteers, optionally for one ministry.
    List {
        #[arg(long)]
        ministry: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TransactionsCommands {
    /// Record a single transaction.
    Add {
        description: String,
        /// Amount, e.g. 150.00 or 150,00
        #[arg(long)]
        amount: String,
        /// Due date: YYYY-MM-DD
        #[arg(long)]
        due: String,
        /// income or expense
        #[arg(long, default_value = "expense")]
        kind: String,
    },
    /// Mark a transaction as paid.
    Pay {
        id: i64,
        /// Payment date: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// List transactions.
    List {
        /// pending, paid or overdue
        #[arg(long)]
        status: Option<String>,
    },
    /// Import a CSV spreadsheet export.
    #[cfg(feature = "import")]
    Import {
        /// Path to the CSV file
        file: String,
        /// Column override: field=column (repeatable)
        #[arg(long = "map")]
        mappings: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum InstallmentsCommands {
    /// Split a purchase or commitment into monthly installments.
    Plan {
        description: String,
        /// Total amount
        #[arg(long)]
        total: String,
        /// Number of installments
        #[arg(long)]
        count: u32,
        /// First due date: YYYY-MM-DD
        #[arg(long = "first-due")]
        first_due: String,
        #[arg(long, default_value = "expense")]
        kind: String,
    },
    /// Installment dashboard: totals, groups, upcoming and projection.
    Report,
}

#[derive(Subcommand)]
pub enum SchedulesCommands {
    /// Assign a volunteer to a shift.
    Add {
        #[arg(long)]
        ministry: String,
        #[arg(long)]
        volunteer: String,
        /// Date: YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Start time: HH:MM
        #[arg(long)]
        start: String,
        /// End time: HH:MM
        #[arg(long)]
        end: String,
        /// Assign as backup instead of primary
        #[arg(long)]
        backup: bool,
    },
    /// Move a shift; omitted fields keep their value.
    Edit {
        id: i64,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Remove a shift.
    Remove { id: i64 },
    /// Mark a shift as confirmed by the volunteer.
    Confirm { id: i64 },
    /// List a ministry's shifts for a month.
    List {
        #[arg(long)]
        ministry: String,
        /// Month: YYYY-MM
        #[arg(long)]
        month: String,
    },
    /// Check a proposed shift against existing ones without saving.
    Check {
        #[arg(long)]
        ministry: String,
        #[arg(long)]
        volunteer: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        /// Schedule being edited, ignored in the check
        #[arg(long)]
        exclude: Option<i64>,
    },
}

pub(crate) fn parse_money(raw: &str) -> Result<Decimal> {
    #[cfg(feature = "import")]
    {
        crate::importer::parse_amount(raw)
    }
    #[cfg(not(feature = "import"))]
    {
        raw.trim()
            .replace(',', ".")
            .parse()
            .map_err(|_| Igreja360Error::InvalidAmount(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2025-06").unwrap(), (2025, 6));
        assert!(parse_month("2025-13").is_err());
        assert!(parse_month("junho").is_err());
    }

    #[test]
    fn test_cli_parses_schedule_check() {
        let cli = Cli::try_parse_from([
            "igreja360", "-vv", "schedules", "check", "--ministry", "Louvor", "--volunteer", "Ana",
            "--date", "2025-06-01", "--start", "09:00", "--end", "12:00", "--exclude", "42",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Schedules {
                command: SchedulesCommands::Check { exclude, .. },
            } => assert_eq!(exclude, Some(42)),
            _ => panic!("expected schedules check"),
        }
    }
}
