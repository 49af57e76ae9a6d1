// 🔎 Field Extractor
// Pulls the transaction id, timestamp and amount out of an SMS notification.
// Every field is optional: a gap is recorded as None, never raised.

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedFields {
    pub transaction_id: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub amount: Option<f64>,
}

fn tx_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"TxId:\s*(\d+)").expect("invalid tx id regex"))
}

fn amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,3}(?:,\d{3})*\s*RWF)").expect("invalid amount regex"))
}

fn currency_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*RWF").expect("invalid currency suffix regex"))
}

/// Extract all fields for one message.
///
/// `timestamp_millis` is the envelope's `date` attribute, not part of the body.
pub fn extract(body: Option<&str>, timestamp_millis: Option<&str>) -> ExtractedFields {
    ExtractedFields {
        transaction_id: body.and_then(extract_transaction_id),
        date: timestamp_millis.and_then(parse_timestamp_millis),
        amount: body.and_then(extract_amount),
    }
}

/// First `TxId: <digits>` in the body
pub fn extract_transaction_id(body: &str) -> Option<String> {
    tx_id_re()
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First `1,234 RWF`-style amount in the body
pub fn extract_amount(body: &str) -> Option<f64> {
    let matched = amount_re().find(body)?;
    parse_amount(matched.as_str())
}

/// "2,500 RWF" -> 2500.0. Anything that does not parse yields None.
pub fn parse_amount(amount: &str) -> Option<f64> {
    let without_separators = amount.replace(',', "");
    let numeric = currency_suffix_re().replace(&without_separators, "");
    numeric.trim().parse::<f64>().ok()
}

/// Epoch milliseconds (as found in the envelope) to a UTC instant
pub fn parse_timestamp_millis(raw: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = raw.trim().parse().ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// ISO-8601 with millisecond precision and a `Z` suffix, e.g. `2023-11-14T22:13:20.000Z`
pub fn to_iso8601(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_with_thousands_separator() {
        assert_eq!(extract_amount("You have received 2,500 RWF from Jane."), Some(2500.0));
        assert_eq!(extract_amount("Fee: 1,234,567 RWF"), Some(1234567.0));
    }

    #[test]
    fn test_amount_without_separator() {
        assert_eq!(extract_amount("Your airtime purchase of 100 RWF"), Some(100.0));
        assert_eq!(extract_amount("Your airtime purchase of 100RWF"), Some(100.0));
    }

    #[test]
    fn test_amount_absent() {
        assert_eq!(extract_amount("Your balance is low"), None);
        assert_eq!(extract_amount("100 USD"), None);
        assert_eq!(extract_amount(""), None);
    }

    #[test]
    fn test_amount_first_match_wins() {
        let body = "You have received 5,000 RWF. Your new balance: 12,300 RWF.";
        assert_eq!(extract_amount(body), Some(5000.0));
    }

    #[test]
    fn test_parse_amount_malformed() {
        assert_eq!(parse_amount("RWF"), None);
        assert_eq!(parse_amount(",,, RWF"), None);
        assert_eq!(parse_amount("2,500 RWF"), Some(2500.0));
    }

    #[test]
    fn test_transaction_id() {
        assert_eq!(
            extract_transaction_id("Payment done. TxId: 123456. Thank you"),
            Some("123456".to_string())
        );
        assert_eq!(
            extract_transaction_id("*162*TxId:13913173274*S*Your airtime"),
            Some("13913173274".to_string())
        );
        assert_eq!(extract_transaction_id("Financial Transaction Id: 76662021700."), None);
        assert_eq!(extract_transaction_id("TxId: none"), None);
    }

    #[test]
    fn test_timestamp_to_iso() {
        let date = parse_timestamp_millis("1700000000000").unwrap();
        assert_eq!(to_iso8601(&date), "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn test_timestamp_gaps() {
        assert_eq!(parse_timestamp_millis(""), None);
        assert_eq!(parse_timestamp_millis("yesterday"), None);
        assert_eq!(parse_timestamp_millis("99999999999999999999"), None);
    }

    #[test]
    fn test_extract_absent_body() {
        let fields = extract(None, None);
        assert_eq!(fields, ExtractedFields::default());

        let fields = extract(None, Some("1700000000000"));
        assert!(fields.transaction_id.is_none());
        assert!(fields.amount.is_none());
        assert!(fields.date.is_some());
    }

    #[test]
    fn test_extract_full_message() {
        let fields = extract(
            Some("You have received 5,000 RWF from John. TxId: 987654."),
            Some("1700000000000"),
        );
        assert_eq!(fields.transaction_id.as_deref(), Some("987654"));
        assert_eq!(fields.amount, Some(5000.0));
        assert_eq!(to_iso8601(&fields.date.unwrap()), "2023-11-14T22:13:20.000Z");
    }
}
