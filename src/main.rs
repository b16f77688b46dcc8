use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bokfor_cli::cli::{
    handle_accounts_command, handle_amount_command, handle_audit_command,
    handle_autobook_command, handle_import_command, handle_rollover_command,
    handle_validate_command, handle_verifications_command, handle_verify_command, Session,
};
use bokfor_cli::config::{LedgerPaths, Settings};
use bokfor_cli::storage::{LedgerStore, Storage};

#[derive(Parser)]
#[command(
    name = "bokfor",
    author = "Kaylee Beyene",
    version,
    about = "Double-entry bookkeeping from the command line",
    long_about = "bokfor keeps a double-entry ledger in plain JSON-lines files. \
                  It merges bank statements into a transaction log, books \
                  verifications by hand or by rule, and refuses to save a \
                  ledger that does not balance."
)]
struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new ledger
    Init {
        /// Company name
        #[arg(short, long)]
        company: Option<String>,
    },

    /// Show current configuration and paths
    Config,

    /// List accounts with balances
    Accounts,

    /// List verifications
    #[command(alias = "ver")]
    Verifications {
        /// Show only the most recent verifications
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Merge transactions from a CSV or JSON-lines file into the log
    Import {
        /// Path to the file
        file: PathBuf,
        /// Account for rows that do not name one
        #[arg(short, long)]
        account: Option<String>,
        /// Decimal separator used in the file's amounts
        #[arg(short, long, default_value = ".")]
        decimal: char,
        /// Save the result
        #[arg(long)]
        commit: bool,
    },

    /// Book verifications from a YAML file
    Verify {
        /// Path to the YAML file
        file: PathBuf,
        /// Save the result
        #[arg(long)]
        commit: bool,
    },

    /// Book unbooked transactions using rules
    Autobook {
        /// Rules file (defaults to autobook.yaml in the config directory)
        #[arg(short, long)]
        rules: Option<PathBuf>,
        /// Save the result
        #[arg(long)]
        commit: bool,
    },

    /// Check the ledger for consistency
    Validate {
        /// Stop at the first violation
        #[arg(long)]
        fail_fast: bool,
    },

    /// Write next year's opening ledger
    Rollover {
        /// Output file
        output: PathBuf,
    },

    /// Parse an amount and show it as stored
    Amount {
        /// Amount text, e.g. "-1 234,50"
        #[arg(allow_hyphen_values = true)]
        text: String,
        /// Decimal separator
        #[arg(short, long, default_value = ".")]
        decimal: char,
    },

    /// Show recent audit log entries
    Audit {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("bokfor_cli={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Initialize paths and settings
    let paths = LedgerPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Some(Commands::Init { company }) => {
            println!("Initializing bokfor at: {}", paths.base_dir().display());
            let storage = Storage::new(paths.clone())?;
            let mut settings = settings;
            if let Some(company) = company {
                settings.company_name = company;
            }
            settings.save(&paths)?;
            if !paths.ledger_file().exists() {
                storage.save(&LedgerStore::new())?;
            }
            println!("Initialization complete!");
            println!();
            println!("Run 'bokfor import <file>' to load a bank statement.");
        }
        Some(Commands::Config) => {
            println!("bokfor Configuration");
            println!("====================");
            println!("Base directory:    {}", paths.base_dir().display());
            println!("Ledger:            {}", paths.ledger_file().display());
            println!("Transaction log:   {}", paths.transactions_file().display());
            println!("Autobook rules:    {}", paths.rules_file().display());
            println!("Audit log:         {}", paths.audit_log().display());
            println!();
            println!("Settings:");
            println!("  Company:         {}", settings.company_name);
            println!("  Financial year:  {}", settings.financial_year);
            println!("  Year offset:     {}", settings.year_offset);
            println!("  Series:          {}", settings.series);
            println!("  Currency:        {}", settings.currency_symbol);
        }
        Some(Commands::Accounts) => {
            handle_accounts_command(&Storage::new(paths)?)?;
        }
        Some(Commands::Verifications { limit }) => {
            handle_verifications_command(&Storage::new(paths)?, limit)?;
        }
        Some(Commands::Import {
            file,
            account,
            decimal,
            commit,
        }) => {
            let session = Session::open(paths, settings)?;
            handle_import_command(session, &file, account.as_deref(), decimal, commit)?;
        }
        Some(Commands::Verify { file, commit }) => {
            let session = Session::open(paths, settings)?;
            handle_verify_command(session, &file, commit)?;
        }
        Some(Commands::Autobook { rules, commit }) => {
            let session = Session::open(paths, settings)?;
            handle_autobook_command(session, rules.as_deref(), commit)?;
        }
        Some(Commands::Validate { fail_fast }) => {
            handle_validate_command(&Storage::new(paths)?, fail_fast)?;
        }
        Some(Commands::Rollover { output }) => {
            handle_rollover_command(&Storage::new(paths)?, &settings, &output)?;
        }
        Some(Commands::Amount { text, decimal }) => {
            handle_amount_command(&text, decimal, &settings)?;
        }
        Some(Commands::Audit { limit }) => {
            handle_audit_command(&paths, limit)?;
        }
        None => {
            println!("bokfor - double-entry bookkeeping");
            println!();
            println!("Run 'bokfor --help' for usage information.");
        }
    }

    Ok(())
}
