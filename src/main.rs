use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use momo_ledger::{
    compute_analytics, init_tracing, AppConfig, DedupPolicy, Importer, ListEnvelope, PageRequest,
    TransactionStore,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "momo-ledger", version, about = "Import and query mobile-money SMS transactions")]
struct Cli {
    /// SQLite database file (overrides MOMO_DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import an SMS backup XML export
    Import {
        /// Export file (overrides MOMO_SMS_XML_PATH)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Skip messages already stored with the same TxId and date
        #[arg(long)]
        dedup: bool,
    },
    /// List stored transactions
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Case-insensitive search on category and message text
    Search {
        term: String,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one transaction by its storage id
    Show { id: i64 },
    /// Totals and per-category counts
    Analytics,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env().context("Failed to load configuration")?;
    init_tracing(&config.log_level);

    if let Some(database) = cli.database {
        config.database_path = database;
    }

    let store = TransactionStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;

    match cli.command {
        Command::Import { file, dedup } => {
            let path = file.unwrap_or_else(|| config.sms_xml_path.clone());
            let policy = if dedup { DedupPolicy::TransactionIdAndDate } else { config.dedup_policy() };

            info!(path = %path.display(), ?policy, "importing");
            let summary = Importer::new(&store).with_dedup(policy).import_file(&path)?;
            print_json(&summary)?;
        }
        Command::List { page, limit } => {
            let page = page_request(page, limit);
            let (rows, total) = store.list(page)?;
            print_json(&ListEnvelope::new("Transactions retrieved successfully", rows, total, page))?;
        }
        Command::Search { term, page, limit } => {
            let page = page_request(page, limit);
            let (rows, total) = store.search(&term, page)?;
            let message = format!("Search results for {} retrieved successfully", term);
            print_json(&ListEnvelope::new(message, rows, total, page))?;
        }
        Command::Show { id } => match store.get(id)? {
            Some(tx) => print_json(&tx)?,
            None => anyhow::bail!("Transaction not found: {}", id),
        },
        Command::Analytics => {
            print_json(&compute_analytics(&store)?)?;
        }
    }

    Ok(())
}

/// Paging only when a limit was given, as in the HTTP API
fn page_request(page: Option<u32>, limit: Option<u32>) -> Option<PageRequest> {
    limit.map(|limit| PageRequest::new(page.unwrap_or(1), limit))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
