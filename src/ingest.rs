// 📦 Ingestion Pipeline
// Raw messages -> extractor + categorizer -> one persisted row per message.
//
// By default there is no duplicate check: importing the same export twice
// stores every message twice. `DedupPolicy::TransactionIdAndDate` opts in to
// skipping messages already seen with the same TxId and timestamp.

use crate::db::{NewTransaction, TransactionStore};
use crate::error::{LedgerError, Result};
use crate::extractor::extract;
use crate::parser::{MessageParser, RawMessage, SmsBackupParser};
use crate::rules::Categorizer;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Insert every message (re-imports duplicate rows)
    #[default]
    None,

    /// Skip messages whose TxId and date both match an existing row.
    /// Messages missing either field are always inserted.
    TransactionIdAndDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub import_id: String,
    pub inserted: usize,
    pub skipped_duplicates: usize,
    pub with_amount: usize,
    pub with_transaction_id: usize,
}

/// Build the row for one message. Missing fields stay `None`; the category is always set.
pub fn build_transaction(message: &RawMessage, categorizer: &Categorizer, import_id: &str) -> NewTransaction {
    let body = message.body.as_deref();
    let fields = extract(body, message.timestamp_millis.as_deref());

    NewTransaction {
        transaction_id: fields.transaction_id,
        date: fields.date,
        amount: fields.amount,
        transaction_type: categorizer.categorize(body.unwrap_or("")),
        raw_message: body.unwrap_or_default().to_string(),
        import_id: import_id.to_string(),
    }
}

pub struct Importer<'a> {
    store: &'a TransactionStore,
    categorizer: Categorizer,
    dedup: DedupPolicy,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a TransactionStore) -> Self {
        Importer {
            store,
            categorizer: Categorizer::new(),
            dedup: DedupPolicy::None,
        }
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    /// Persist one row per message, in input order, inside a single SQLite
    /// transaction. A storage failure rolls the whole batch back.
    pub fn import_batch(&self, messages: &[RawMessage]) -> Result<ImportSummary> {
        let import_id = uuid::Uuid::new_v4().to_string();
        let mut summary = ImportSummary {
            import_id: import_id.clone(),
            inserted: 0,
            skipped_duplicates: 0,
            with_amount: 0,
            with_transaction_id: 0,
        };

        let batch = self.store.begin()?;

        for (index, message) in messages.iter().enumerate() {
            let row = build_transaction(message, &self.categorizer, &import_id);

            if self.dedup == DedupPolicy::TransactionIdAndDate
                && row.has_dedup_identity()
                && self.store.dedup_key_exists(&row.compute_dedup_key())?
            {
                debug!(index, transaction_id = ?row.transaction_id, "skipping duplicate message");
                summary.skipped_duplicates += 1;
                continue;
            }

            if row.amount.is_none() || row.transaction_id.is_none() || row.date.is_none() {
                debug!(
                    index,
                    has_amount = row.amount.is_some(),
                    has_transaction_id = row.transaction_id.is_some(),
                    has_date = row.date.is_some(),
                    "message has extraction gaps"
                );
            }

            self.store.insert(&row)?;
            summary.inserted += 1;
            summary.with_amount += row.amount.is_some() as usize;
            summary.with_transaction_id += row.transaction_id.is_some() as usize;
        }

        batch.commit()?;

        info!(
            import_id = %summary.import_id,
            inserted = summary.inserted,
            skipped_duplicates = summary.skipped_duplicates,
            "import complete"
        );

        Ok(summary)
    }

    /// Import an SMS backup file. A missing file is a validation error;
    /// a malformed document aborts before anything is written.
    pub fn import_file(&self, path: &Path) -> Result<ImportSummary> {
        self.import_with(&SmsBackupParser::new(), path)
    }

    pub fn import_with(&self, parser: &dyn MessageParser, path: &Path) -> Result<ImportSummary> {
        if !path.exists() {
            return Err(LedgerError::Validation {
                message: "File not found".to_string(),
                path: Some(path.display().to_string()),
            });
        }

        let messages = parser.parse(path)?;
        info!(
            path = %path.display(),
            format = parser.format(),
            messages = messages.len(),
            "parsed import file"
        );

        self.import_batch(&messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::compute_analytics;
    use crate::category::TransactionType;
    use crate::extractor::to_iso8601;
    use std::io::Write;

    const EXPORT: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<smses count="4">
  <sms address="M-Money" date="1700000000000" body="You have received 5,000 RWF from John. TxId: 987654." />
  <sms address="M-Money" date="1700000100000" body="TxId: 111. Your payment of 1,500 RWF to Shop 12845 has been completed." />
  <sms address="M-Money" date="not-a-number" body="Your airtime purchase of 100 RWF was successful." />
  <sms address="M-Money" date="1700000300000" />
</smses>"#;

    fn write_export(xml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        file.write_all(xml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_end_to_end_single_message() {
        let store = TransactionStore::open_in_memory().unwrap();
        let importer = Importer::new(&store);

        let summary = importer
            .import_batch(&[RawMessage::new(
                "You have received 5,000 RWF from John. TxId: 987654.",
                1700000000000,
            )])
            .unwrap();
        assert_eq!(summary.inserted, 1);

        let (rows, _) = store.list(None).unwrap();
        let tx = &rows[0];
        assert_eq!(tx.amount, Some(5000.0));
        assert_eq!(tx.transaction_id.as_deref(), Some("987654"));
        assert_eq!(tx.transaction_type, TransactionType::IncomingMoney);
        assert_eq!(to_iso8601(tx.date.as_ref().unwrap()), "2023-11-14T22:13:20.000Z");
        assert_eq!(tx.raw_message, "You have received 5,000 RWF from John. TxId: 987654.");
        assert_eq!(tx.import_id, summary.import_id);
    }

    #[test]
    fn test_field_gaps_are_tolerated() {
        let store = TransactionStore::open_in_memory().unwrap();
        let file = write_export(EXPORT);

        let summary = Importer::new(&store).import_file(file.path()).unwrap();
        assert_eq!(summary.inserted, 4);
        assert_eq!(summary.with_amount, 3);
        assert_eq!(summary.with_transaction_id, 2);

        let (rows, _) = store.list(None).unwrap();
        assert_eq!(rows[2].transaction_type, TransactionType::AirtimeBillPayments);
        assert_eq!(rows[2].date, None);

        // No body at all: empty raw message, categorized as Other
        assert_eq!(rows[3].raw_message, "");
        assert_eq!(rows[3].transaction_type, TransactionType::Other);
        assert!(rows[3].date.is_some());
    }

    #[test]
    fn test_rows_keep_input_order() {
        let store = TransactionStore::open_in_memory().unwrap();
        let messages: Vec<RawMessage> = (0..5)
            .map(|i| RawMessage::new(&format!("message {}", i), 1700000000000 + i))
            .collect();

        Importer::new(&store).import_batch(&messages).unwrap();

        let (rows, _) = store.list(None).unwrap();
        let bodies: Vec<&str> = rows.iter().map(|t| t.raw_message.as_str()).collect();
        assert_eq!(bodies, vec!["message 0", "message 1", "message 2", "message 3", "message 4"]);
    }

    #[test]
    fn test_reimport_duplicates_rows_by_default() {
        let store = TransactionStore::open_in_memory().unwrap();
        let file = write_export(EXPORT);
        let importer = Importer::new(&store);

        let first = importer.import_file(file.path()).unwrap();
        let after_first = compute_analytics(&store).unwrap().total_count;
        let second = importer.import_file(file.path()).unwrap();
        let after_second = compute_analytics(&store).unwrap().total_count;

        assert_eq!(after_second, after_first * 2);
        assert_eq!(second.skipped_duplicates, 0);
        assert_ne!(first.import_id, second.import_id);
    }

    #[test]
    fn test_opt_in_dedup_skips_known_messages() {
        let store = TransactionStore::open_in_memory().unwrap();
        let file = write_export(EXPORT);
        let importer = Importer::new(&store).with_dedup(DedupPolicy::TransactionIdAndDate);

        let first = importer.import_file(file.path()).unwrap();
        let second = importer.import_file(file.path()).unwrap();

        assert_eq!(first.inserted, 4);
        // Only the two messages with both TxId and date are recognised
        assert_eq!(second.skipped_duplicates, 2);
        assert_eq!(second.inserted, 2);
        assert_eq!(store.count().unwrap(), 6);
    }

    #[test]
    fn test_dedup_applies_within_one_batch() {
        let store = TransactionStore::open_in_memory().unwrap();
        let message = RawMessage::new("Bank transfer of 1,000 RWF. TxId: 5.", 1700000000000);

        let summary = Importer::new(&store)
            .with_dedup(DedupPolicy::TransactionIdAndDate)
            .import_batch(&[message.clone(), message])
            .unwrap();

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped_duplicates, 1);
    }

    #[test]
    fn test_malformed_envelope_aborts_batch() {
        let store = TransactionStore::open_in_memory().unwrap();
        let file = write_export(r#"<smses><sms body="You have received 1 RWF" date="1"></smses>"#);

        let err = Importer::new(&store).import_file(file.path()).unwrap_err();

        assert!(matches!(err, LedgerError::Parse { .. }));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_missing_file() {
        let store = TransactionStore::open_in_memory().unwrap();
        let err = Importer::new(&store)
            .import_file(Path::new("/definitely/not/here.xml"))
            .unwrap_err();

        match err {
            LedgerError::Validation { message, path } => {
                assert_eq!(message, "File not found");
                assert_eq!(path.as_deref(), Some("/definitely/not/here.xml"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_analytics_invariant_after_import() {
        let store = TransactionStore::open_in_memory().unwrap();
        let file = write_export(EXPORT);
        Importer::new(&store).import_file(file.path()).unwrap();

        let analytics = compute_analytics(&store).unwrap();
        assert!(analytics.is_consistent());
        assert_eq!(analytics.total_count, 4);
        assert_eq!(analytics.total_amount, 6600);
        assert_eq!(analytics.count_for(TransactionType::Other), 1);
    }
}
