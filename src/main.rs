mod cli;
mod db;
mod error;
mod fmt;
#[cfg(feature = "import")]
mod importer;
mod installments;
mod ledger;
mod models;
mod roster;
mod scheduling;
mod settings;

use clap::Parser;
use tracing::debug;

use cli::schedules::ShiftArgs;
use cli::{
    Cli, Commands, InstallmentsCommands, MinistriesCommands, SchedulesCommands,
    TransactionsCommands, VolunteersCommands,
};

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(verbose >= 2)
        .with_line_number(verbose >= 3)
        .with_writer(std::io::stderr)
        .init();

    debug!("igreja360 started with verbosity level: {verbose}");
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init {
            data_dir,
            church_name,
        } => cli::init::run(data_dir, church_name),
        Commands::Status => cli::status::run(),
        Commands::Ministries { command } => match command {
            MinistriesCommands::Add { name } => cli::ministries::add(&name),
            MinistriesCommands::List => cli::ministries::list(),
        },
        Commands::Volunteers { command } => match command {
            VolunteersCommands::Add {
                name,
                ministry,
                phone,
                email,
            } => cli::volunteers::add(&name, &ministry, phone.as_deref(), email.as_deref()),
            VolunteersCommands::List { ministry } => cli::volunteers::list(ministry.as_deref()),
        },
        Commands::Transactions { command } => match command {
            TransactionsCommands::Add {
                description,
                amount,
                due,
                kind,
            } => cli::transactions::add(&description, &amount, &due, &kind),
            TransactionsCommands::Pay { id, date } => cli::transactions::pay(id, date.as_deref()),
            TransactionsCommands::List { status } => cli::transactions::list(status.as_deref()),
            #[cfg(feature = "import")]
            TransactionsCommands::Import { file, mappings } => {
                cli::transactions::import(&file, &mappings)
            }
        },
        Commands::Installments { command } => match command {
            InstallmentsCommands::Plan {
                description,
                total,
                count,
                first_due,
                kind,
            } => cli::installments::plan(&description, &total, count, &first_due, &kind),
            InstallmentsCommands::Report => cli::installments::report(),
        },
        Commands::Schedules { command } => match command {
            SchedulesCommands::Add {
                ministry,
                volunteer,
                date,
                start,
                end,
                backup,
            } => cli::schedules::add(
                &ShiftArgs {
                    ministry: &ministry,
                    volunteer: &volunteer,
                    date: &date,
                    start: &start,
                    end: &end,
                },
                backup,
            ),
            SchedulesCommands::Edit {
                id,
                date,
                start,
                end,
            } => cli::schedules::edit(id, date.as_deref(), start.as_deref(), end.as_deref()),
            SchedulesCommands::Remove { id } => cli::schedules::remove(id),
            SchedulesCommands::Confirm { id } => cli::schedules::confirm(id),
            SchedulesCommands::List { ministry, month } => cli::schedules::list(&ministry, &month),
            SchedulesCommands::Check {
                ministry,
                volunteer,
                date,
                start,
                end,
                exclude,
            } => cli::schedules::check(
                &ShiftArgs {
                    ministry: &ministry,
                    volunteer: &volunteer,
                    date: &date,
                    start: &start,
                    end: &end,
                },
                exclude,
            ),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
