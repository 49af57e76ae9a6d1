// 📥 SMS Backup Parser
// Reads an SMS backup export (`<smses><sms body=".." date=".."/></smses>`) into raw messages.
// Structural problems with the document are fatal; odd attribute values are not.

use crate::error::{LedgerError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const ROOT_ELEMENT: &[u8] = b"smses";
const MESSAGE_ELEMENT: &[u8] = b"sms";

// ============================================================================
// CORE TYPES
// ============================================================================

/// One message as found in the export, before extraction.
/// Read once per import run; never persisted as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Free-text notification body
    pub body: Option<String>,

    /// Envelope `date` attribute: epoch milliseconds, unparsed
    pub timestamp_millis: Option<String>,
}

impl RawMessage {
    pub fn new(body: &str, timestamp_millis: i64) -> Self {
        RawMessage {
            body: Some(body.to_string()),
            timestamp_millis: Some(timestamp_millis.to_string()),
        }
    }
}

// ============================================================================
// PARSER TRAIT
// ============================================================================

/// Source of raw messages for the ingestion pipeline
pub trait MessageParser: Send + Sync {
    /// Read every message from the file, or fail the whole file
    fn parse(&self, file_path: &Path) -> Result<Vec<RawMessage>>;

    /// Short format name, for logs
    fn format(&self) -> &str;

    /// Quick check on the file name before parsing
    fn can_parse(&self, file_path: &Path) -> bool;
}

// ============================================================================
// SMS BACKUP XML
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct SmsBackupParser;

impl SmsBackupParser {
    pub fn new() -> Self {
        SmsBackupParser
    }
}

impl MessageParser for SmsBackupParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<RawMessage>> {
        let xml = fs::read_to_string(file_path).map_err(|e| {
            LedgerError::parse(
                "Error reading XML",
                format!("{}: {}", file_path.display(), e),
            )
        })?;
        parse_sms_backup(&xml)
    }

    fn format(&self) -> &str {
        "sms-backup-xml"
    }

    fn can_parse(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("xml"))
            .unwrap_or(false)
    }
}

/// Parse an SMS backup document held in memory.
///
/// Only direct `<sms>` children of the `<smses>` root are read; anything else is skipped.
pub fn parse_sms_backup(xml: &str) -> Result<Vec<RawMessage>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut messages = Vec::new();
    let mut depth: usize = 0;
    let mut saw_root = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            LedgerError::parse(
                "Error parsing XML",
                format!("{} (at byte {})", e, reader.buffer_position()),
            )
        })?;

        match event {
            Event::Start(element) => {
                if depth == 0 {
                    check_root(&element, saw_root)?;
                    saw_root = true;
                } else if depth == 1 && element.name().as_ref() == MESSAGE_ELEMENT {
                    messages.push(read_message(&element)?);
                }
                depth += 1;
            }
            Event::Empty(element) => {
                if depth == 0 {
                    check_root(&element, saw_root)?;
                    saw_root = true;
                } else if depth == 1 && element.name().as_ref() == MESSAGE_ELEMENT {
                    messages.push(read_message(&element)?);
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(LedgerError::parse(
            "Error parsing XML",
            "unexpected end of document: unclosed element",
        ));
    }

    if !saw_root {
        return Err(LedgerError::parse(
            "Error parsing XML",
            "missing <smses> root element",
        ));
    }

    Ok(messages)
}

fn check_root(element: &BytesStart<'_>, saw_root: bool) -> Result<()> {
    if saw_root {
        return Err(LedgerError::parse(
            "Error parsing XML",
            "document has more than one root element",
        ));
    }

    if element.name().as_ref() != ROOT_ELEMENT {
        return Err(LedgerError::parse(
            "Error parsing XML",
            format!(
                "expected <smses> root element, found <{}>",
                String::from_utf8_lossy(element.name().as_ref())
            ),
        ));
    }

    Ok(())
}

fn read_message(element: &BytesStart<'_>) -> Result<RawMessage> {
    let mut message = RawMessage::default();

    for attr in element.attributes() {
        let attr = attr.map_err(|e| LedgerError::parse("Error parsing XML", e))?;

        let target = match attr.key.as_ref() {
            b"body" => &mut message.body,
            b"date" => &mut message.timestamp_millis,
            _ => continue,
        };

        let value = attr
            .unescape_value()
            .map_err(|e| LedgerError::parse("Error parsing XML", e))?;

        // Empty attributes count as absent
        if !value.is_empty() {
            *target = Some(value.into_owned());
        }
    }

    Ok(message)
}

// ============================================================================
// TESTS
// ============================================================================
