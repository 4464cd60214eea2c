//! Record segmentation of a WARC text stream.

/// Line that opens every WARC record
pub const RECORD_MARKER: &str = "WARC/1.0";

/// Text of one archive record: metadata, HTTP headers and body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRecord {
    pub payload: String,
}

impl RawRecord {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Splits a line stream into records at each marker line.
///
/// A marker line closes the current payload (emitted even when empty) and is
/// itself dropped. Every other line is appended verbatim. The trailing payload
/// is emitted once the lines run out, so `n` markers always produce `n + 1`
/// records.
pub struct RecordSplitter<I> {
    lines: I,
    marker: String,
    done: bool,
}

impl<I> RecordSplitter<I>
where
    I: Iterator<Item = String>,
{
    pub fn new(lines: I) -> Self {
        Self::with_marker(lines, RECORD_MARKER)
    }

    pub fn with_marker(lines: I, marker: &str) -> Self {
        Self {
            lines,
            marker: marker.to_string(),
            done: false,
        }
    }
}

impl<I> Iterator for RecordSplitter<I>
where
    I: Iterator<Item = String>,
{
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        if self.done {
            return None;
        }
        let mut payload = String::new();
        for line in self.lines.by_ref() {
            if line.trim() == self.marker {
                return Some(RawRecord { payload });
            }
            payload.push_str(&line);
        }
        self.done = true;
        Some(RawRecord { payload })
    }
}
