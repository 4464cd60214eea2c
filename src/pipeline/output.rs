//! Result triples and where they go

use std::fmt;
use std::io::{self, Write};

use crate::archive::DocumentId;

/// One linked mention: `(document, surface text, entity)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultTriple {
    pub document_id: DocumentId,
    pub mention: String,
    pub entity: String,
}

impl ResultTriple {
    pub fn new(
        document_id: impl Into<DocumentId>,
        mention: impl Into<String>,
        entity: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            mention: mention.into(),
            entity: entity.into(),
        }
    }
}

/// Tab-separated form, without the line terminator.
///
/// Tabs and line breaks inside a field become spaces so that every triple
/// stays on one three-column line.
impl fmt::Display for ResultTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}",
            tsv_field(&self.document_id),
            tsv_field(&self.mention),
            tsv_field(&self.entity)
        )
    }
}

fn tsv_field(value: &str) -> std::borrow::Cow<'_, str> {
    if value.contains(['\t', '\n', '\r']) {
        value.replace(['\t', '\n', '\r'], " ").into()
    } else {
        value.into()
    }
}

/// Consumer of result triples, called in output order
pub trait TripleSink {
    fn emit(&mut self, triple: &ResultTriple) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Collects triples in memory
impl TripleSink for Vec<ResultTriple> {
    fn emit(&mut self, triple: &ResultTriple) -> io::Result<()> {
        self.push(triple.clone());
        Ok(())
    }
}

/// Writes `DocumentID\tmention\tidentifier\n` lines
pub struct TsvWriter<W: Write> {
    out: W,
}

impl<W: Write> TsvWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TripleSink for TsvWriter<W> {
    fn emit(&mut self, triple: &ResultTriple) -> io::Result<()> {
        writeln!(self.out, "{triple}")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
