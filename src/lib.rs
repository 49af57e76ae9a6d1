// Mobile-money SMS ledger - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod analytics;
pub mod category;
pub mod config;
pub mod db;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod parser;
pub mod query;
pub mod rules;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use analytics::{compute_analytics, Analytics};
pub use category::TransactionType;
pub use config::AppConfig;
pub use db::{setup_database, NewTransaction, Transaction, TransactionStore};
pub use error::LedgerError;
pub use extractor::{extract, ExtractedFields};
pub use ingest::{build_transaction, DedupPolicy, ImportSummary, Importer};
pub use parser::{parse_sms_backup, MessageParser, RawMessage, SmsBackupParser};
pub use query::{ListEnvelope, PageRequest};
pub use rules::{categorize, CategoryRule, Categorizer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init();
}
