//! Record extraction: document identifier and body text from one payload.

use std::sync::Arc;

use super::html::{HtmlStripper, TagStripper};
use super::splitter::RawRecord;
use crate::config::DEFAULT_CONTENT_TYPE_MARKER;

/// Metadata key carrying the record identifier
pub const RECORD_ID_KEY: &str = "WARC-Record-ID";

/// Identifier of one archive record
pub type DocumentId = String;

/// Result of extracting a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    /// First `WARC-Record-ID` value, if the record has one
    pub document_id: Option<DocumentId>,
    /// Body text with markup, headers and blank lines removed
    pub text: String,
}

/// Pulls the record identifier and cleaned body text out of a payload
#[derive(Clone)]
pub struct RecordExtractor {
    stripper: Arc<dyn HtmlStripper>,
    content_type_marker: String,
}

impl Default for RecordExtractor {
    fn default() -> Self {
        Self::new(Arc::new(TagStripper), DEFAULT_CONTENT_TYPE_MARKER)
    }
}

impl RecordExtractor {
    pub fn new(stripper: Arc<dyn HtmlStripper>, content_type_marker: impl Into<String>) -> Self {
        Self {
            stripper,
            content_type_marker: content_type_marker.into(),
        }
    }

    /// Extract a record.
    ///
    /// Returns `None` for an empty payload or when the content-type marker
    /// does not occur in the stripped text.
    pub fn extract(&self, record: &RawRecord) -> Option<ExtractedRecord> {
        if record.is_empty() {
            return None;
        }

        let document_id = find_document_id(&record.payload);

        let flattened = self.stripper.strip(&record.payload);
        let (_, body) = flattened.split_once(self.content_type_marker.as_str())?;

        Some(ExtractedRecord {
            document_id,
            text: normalize_body(body),
        })
    }
}

/// Value of the first `WARC-Record-ID` line, without surrounding `<>`.
pub fn find_document_id(payload: &str) -> Option<DocumentId> {
    payload
        .lines()
        .find(|line| line.starts_with(RECORD_ID_KEY))
        .and_then(|line| line.split_once(": "))
        .map(|(_, value)| {
            let value = value.trim();
            value
                .strip_prefix('<')
                .and_then(|v| v.strip_suffix('>'))
                .unwrap_or(value)
                .to_string()
        })
        .filter(|id| !id.is_empty())
}

/// Trim, drop blank lines and join the rest with single spaces
pub fn normalize_body(body: &str) -> String {
    body.trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = "WARC-Type: response\r\n\
        WARC-Record-ID: <urn:uuid:abc>\r\n\
        Content-Length: 120\r\n\
        \r\n\
        HTTP/1.1 200 OK\r\n\
        Content-Type: text/html; charset=UTF-8\r\n\
        \r\n\
        <html><head><title>News</title></head>\n\
        <body>\n\
        \n\
        <p>Barack Obama visited Paris.</p>\n\
        </body></html>\n";

    #[test]
    fn test_extracts_id_and_text() {
        let extracted = RecordExtractor::default()
            .extract(&RawRecord::new(RECORD))
            .unwrap();
        assert_eq!(extracted.document_id.as_deref(), Some("urn:uuid:abc"));
        assert_eq!(extracted.text, "News Barack Obama visited Paris.");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let extractor = RecordExtractor::default();
        let record = RawRecord::new(RECORD);
        assert_eq!(extractor.extract(&record), extractor.extract(&record));
    }

    #[test]
    fn test_empty_payload_declined() {
        assert!(RecordExtractor::default().extract(&RawRecord::default()).is_none());
    }

    #[test]
    fn test_missing_marker_declined() {
        let extractor = RecordExtractor::default();
        let payloads = [
            "WARC-Record-ID: <urn:uuid:1>\nContent-Type: application/pdf\n\n%PDF-1.4",
            "WARC-Type: warcinfo\nsoftware: crawler\n",
            "<html><body>no headers at all</body></html>",
            "Content-Type: text/html\n\n<p>charset missing</p>",
            "   \n",
        ];
        for payload in payloads {
            assert!(
                extractor.extract(&RawRecord::new(payload)).is_none(),
                "payload: {payload:?}"
            );
        }
    }

    #[test]
    fn test_missing_id_still_extracts() {
        let payload = "Content-Type: text/html; charset=UTF-8\n\n<p>Hello</p>";
        let extracted = RecordExtractor::default()
            .extract(&RawRecord::new(payload))
            .unwrap();
        assert_eq!(extracted.document_id, None);
        assert_eq!(extracted.text, "Hello");
    }

    #[test]
    fn test_first_id_line_wins() {
        let payload = "WARC-Record-ID: <urn:uuid:first>\nWARC-Record-ID: <urn:uuid:second>\n";
        assert_eq!(find_document_id(payload).as_deref(), Some("urn:uuid:first"));
    }

    #[test]
    fn test_id_without_brackets() {
        assert_eq!(
            find_document_id("WARC-Record-ID: plain-id\r\n").as_deref(),
            Some("plain-id")
        );
        assert_eq!(find_document_id("WARC-Record-ID:\n"), None);
    }

    #[test]
    fn test_body_split_at_first_marker() {
        let payload = "Content-Type: text/html; charset=UTF-8\n<p>one</p>\n\
                       Content-Type: text/html; charset=UTF-8\n<p>two</p>";
        let extracted = RecordExtractor::default()
            .extract(&RawRecord::new(payload))
            .unwrap();
        assert_eq!(
            extracted.text,
            "one Content-Type: text/html; charset=UTF-8 two"
        );
    }

    #[test]
    fn test_normalize_body() {
        assert_eq!(normalize_body("\n\n  a b\n\n\t\nc\r\n  \n"), "a b c");
        assert_eq!(normalize_body("   "), "");
    }
}
