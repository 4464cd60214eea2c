//! WARC archive handling.
//!
//! Reading (gzip + lenient decoding), record splitting, markup removal and
//! per-record extraction of the document identifier and body text.

pub mod extractor;
pub mod html;
pub mod reader;
pub mod splitter;

pub use extractor::{DocumentId, ExtractedRecord, RecordExtractor, RECORD_ID_KEY};
pub use html::{HtmlStripper, TagStripper};
pub use reader::{open_archive, ArchiveLines, LenientLines};
pub use splitter::{RawRecord, RecordSplitter, RECORD_MARKER};
