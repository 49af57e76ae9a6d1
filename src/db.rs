use crate::category::TransactionType;
use crate::error::{LedgerError, Result};
use crate::extractor::to_iso8601;
use crate::query::PageRequest;
use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Persisted transaction. Rows are only ever created by the importer and
/// never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Storage-assigned key (not the operator's TxId)
    pub id: i64,

    /// Operator TxId from the body; not unique
    pub transaction_id: Option<String>,

    #[serde(serialize_with = "serialize_opt_iso")]
    pub date: Option<DateTime<Utc>>,

    pub amount: Option<f64>,

    pub transaction_type: TransactionType,

    /// Original body, verbatim, so rows can be re-derived if the rules change
    pub raw_message: String,

    /// Import run that created this row
    pub import_id: String,

    #[serde(serialize_with = "serialize_iso")]
    pub created_at: DateTime<Utc>,
}

/// Row about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub transaction_id: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub amount: Option<f64>,
    pub transaction_type: TransactionType,
    pub raw_message: String,
    pub import_id: String,
}

impl NewTransaction {
    /// Dedup key over TxId and timestamp.
    /// Only meaningful when both are present, see `has_dedup_identity`.
    pub fn compute_dedup_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}",
            self.transaction_id.as_deref().unwrap_or(""),
            self.date.as_ref().map(to_iso8601).unwrap_or_default()
        ));
        format!("{:x}", hasher.finalize())
    }

    pub fn has_dedup_identity(&self) -> bool {
        self.transaction_id.is_some() && self.date.is_some()
    }
}

fn serialize_opt_iso<S: Serializer>(date: &Option<DateTime<Utc>>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match date {
        Some(d) => serializer.serialize_str(&to_iso8601(d)),
        None => serializer.serialize_none(),
    }
}

fn serialize_iso<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_iso8601(date))
}

const SELECT_COLUMNS: &str =
    "id, transaction_id, date, amount, transaction_type, raw_message, import_id, created_at";

// fold_case is registered on every connection, see `register_functions`.
// instr() keeps the term literal, so % and _ need no escaping.
const SEARCH_FILTER: &str =
    "instr(fold_case(transaction_type), ?1) > 0 OR instr(fold_case(raw_message), ?1) > 0";

fn parse_timestamp(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let date: Option<String> = row.get(2)?;
    let transaction_type: String = row.get(4)?;
    let created_at: String = row.get(7)?;

    Ok(Transaction {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        date: date.map(|d| parse_timestamp(2, d)).transpose()?,
        amount: row.get(3)?,
        transaction_type: transaction_type
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        raw_message: row.get(5)?,
        import_id: row.get(6)?,
        created_at: parse_timestamp(7, created_at)?,
    })
}

/// Unicode lowercase as a SQL function. SQLite's own `lower()` and `LIKE`
/// only fold ASCII.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )?;
    Ok(())
}

// ============================================================================
// STORE
// ============================================================================

/// Owned handle on the transaction database. Passed explicitly to the
/// importer, the aggregator and the API; there is no process-wide connection.
pub struct TransactionStore {
    conn: Connection,
}

impl TransactionStore {
    /// Open (or create) a database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LedgerError::Storage(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        register_functions(&conn)?;
        setup_database(&conn)?;
        Ok(TransactionStore { conn })
    }

    /// Start a SQLite transaction; inserts made through this store join it
    /// until it is committed or dropped.
    pub fn begin(&self) -> Result<rusqlite::Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    pub fn insert(&self, tx: &NewTransaction) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO transactions (
                transaction_id, date, amount, transaction_type, raw_message,
                import_id, dedup_key, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tx.transaction_id,
                tx.date.as_ref().map(to_iso8601),
                tx.amount,
                tx.transaction_type.label(),
                tx.raw_message,
                tx.import_id,
                tx.compute_dedup_key(),
                to_iso8601(&Utc::now()),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!(id, transaction_type = %tx.transaction_type, "inserted transaction");
        Ok(id)
    }

    pub fn dedup_key_exists(&self, dedup_key: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM transactions WHERE dedup_key = ?1 LIMIT 1",
                [dedup_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get(&self, id: i64) -> Result<Option<Transaction>> {
        let sql = format!("SELECT {} FROM transactions WHERE id = ?1", SELECT_COLUMNS);
        let tx = self
            .conn
            .query_row(&sql, [id], row_to_transaction)
            .optional()?;
        Ok(tx)
    }

    /// All rows, or one page of them, in insertion order. Returns the rows and
    /// the total count before paging.
    pub fn list(&self, page: Option<PageRequest>) -> Result<(Vec<Transaction>, i64)> {
        let total = self.count()?;
        let rows = match page {
            Some(p) => {
                let sql = format!(
                    "SELECT {} FROM transactions ORDER BY id LIMIT ?1 OFFSET ?2",
                    SELECT_COLUMNS
                );
                self.query_transactions(&sql, params![p.limit as i64, p.offset() as i64])?
            }
            None => {
                let sql = format!("SELECT {} FROM transactions ORDER BY id", SELECT_COLUMNS);
                self.query_transactions(&sql, params![])?
            }
        };
        Ok((rows, total))
    }

    /// Case-insensitive substring match on type label or raw message.
    /// Case folding is Unicode-aware (`É` matches `é`) and the term is
    /// matched literally.
    pub fn search(&self, term: &str, page: Option<PageRequest>) -> Result<(Vec<Transaction>, i64)> {
        let pattern = term.to_lowercase();

        let count_sql = format!("SELECT COUNT(*) FROM transactions WHERE {}", SEARCH_FILTER);
        let total: i64 = self.conn.query_row(&count_sql, params![pattern], |row| row.get(0))?;

        let rows = match page {
            Some(p) => {
                let sql = format!(
                    "SELECT {} FROM transactions WHERE {} ORDER BY id LIMIT ?2 OFFSET ?3",
                    SELECT_COLUMNS, SEARCH_FILTER
                );
                self.query_transactions(&sql, params![pattern, p.limit as i64, p.offset() as i64])?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM transactions WHERE {} ORDER BY id",
                    SELECT_COLUMNS, SEARCH_FILTER
                );
                self.query_transactions(&sql, params![pattern])?
            }
        };
        Ok((rows, total))
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_by_type(&self, transaction_type: TransactionType) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE transaction_type = ?1",
            [transaction_type.label()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// One grouped query instead of a count per category
    pub fn count_grouped_by_type(&self) -> Result<HashMap<TransactionType, i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT transaction_type, COUNT(*) FROM transactions GROUP BY transaction_type",
        )?;

        let rows = stmt
            .query_map([], |row| {
                let label: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                let transaction_type = label.parse::<TransactionType>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
                })?;
                Ok((transaction_type, count))
            })?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;

        Ok(rows)
    }

    /// SUM(amount); None when no row has an amount
    pub fn sum_amount(&self) -> Result<Option<f64>> {
        let sum: Option<f64> = self
            .conn
            .query_row("SELECT SUM(amount) FROM transactions", [], |row| row.get(0))?;
        Ok(sum)
    }

    fn query_transactions<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id TEXT,
            date TEXT,
            amount REAL,
            transaction_type TEXT NOT NULL,
            raw_message TEXT NOT NULL,
            import_id TEXT NOT NULL,
            dedup_key TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // No UNIQUE constraints: the same TxId may legitimately appear more than once
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_type ON transactions(transaction_type)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_id ON transactions(transaction_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_dedup_key ON transactions(dedup_key)",
        [],
    )?;

    Ok(())
}
