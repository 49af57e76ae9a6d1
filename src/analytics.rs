// 📊 Analytics Aggregator
// Totals and per-category counts over everything persisted

use crate::category::TransactionType;
use crate::db::TransactionStore;
use crate::error::Result;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    #[serde(rename = "total_transactions")]
    pub total_count: i64,

    /// SUM(amount), fraction discarded
    pub total_amount: i64,

    /// The 10 named categories, zero-filled; "Other" is not reported here
    #[serde(serialize_with = "serialize_by_label")]
    pub categorized_counts: BTreeMap<TransactionType, i64>,

    #[serde(skip)]
    pub other_count: i64,
}

impl Analytics {
    /// Named counts plus "Other" add up to the total
    pub fn is_consistent(&self) -> bool {
        self.categorized_counts.values().sum::<i64>() + self.other_count == self.total_count
    }

    pub fn count_for(&self, transaction_type: TransactionType) -> i64 {
        match transaction_type {
            TransactionType::Other => self.other_count,
            named => self.categorized_counts.get(&named).copied().unwrap_or(0),
        }
    }
}

// Keyed by label in taxonomy order
fn serialize_by_label<S: Serializer>(
    counts: &BTreeMap<TransactionType, i64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(counts.len()))?;
    for (transaction_type, count) in counts {
        map.serialize_entry(transaction_type.label(), count)?;
    }
    map.end()
}

/// One global count, one global sum and one grouped count.
/// Reads are not isolated from a concurrent import: the result is a snapshot.
pub fn compute_analytics(store: &TransactionStore) -> Result<Analytics> {
    let total_count = store.count()?;
    let total_amount = store.sum_amount()?.map(|sum| sum.trunc() as i64).unwrap_or(0);
    let grouped = store.count_grouped_by_type()?;

    let categorized_counts = TransactionType::NAMED
        .iter()
        .map(|t| (*t, grouped.get(t).copied().unwrap_or(0)))
        .collect();

    Ok(Analytics {
        total_count,
        total_amount,
        categorized_counts,
        other_count: grouped.get(&TransactionType::Other).copied().unwrap_or(0),
    })
}
