//! Archive input: gzip detection and lenient line decoding.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::bufread::MultiGzDecoder;
use tracing::{debug, warn};

use crate::error::{LinkerError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Boxed line source handed to the splitter
pub type ArchiveLines = LenientLines<Box<dyn BufRead + Send>>;

/// Iterator over the lines of a byte stream, terminators included.
///
/// Invalid UTF-8 is replaced with U+FFFD instead of failing. An I/O error
/// ends the iteration after yielding whatever was read before it.
pub struct LenientLines<R> {
    reader: R,
    buf: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> LenientLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(8 * 1024),
            finished: false,
        }
    }
}

impl<R> std::fmt::Debug for LenientLines<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LenientLines")
            .field("buffered", &self.buf.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<R: BufRead> Iterator for LenientLines<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.finished = true;
                None
            }
            Ok(_) => Some(String::from_utf8_lossy(&self.buf).into_owned()),
            Err(err) => {
                warn!(error = %err, "Archive stream ended early");
                self.finished = true;
                if self.buf.is_empty() {
                    None
                } else {
                    Some(String::from_utf8_lossy(&self.buf).into_owned())
                }
            }
        }
    }
}

/// Open an archive for line reading, decompressing gzip input transparently.
///
/// Multi-member gzip files (the usual WARC layout, one member per record)
/// are read to the end.
pub fn open_archive(path: &Path) -> Result<ArchiveLines> {
    let file = File::open(path).map_err(|source| LinkerError::Archive {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let is_gzip = reader
        .fill_buf()
        .map_err(|source| LinkerError::Archive {
            path: path.to_path_buf(),
            source,
        })?
        .starts_with(&GZIP_MAGIC);

    debug!(path = %path.display(), gzip = is_gzip, "Opened archive");

    let source: Box<dyn BufRead + Send> = if is_gzip {
        Box::new(BufReader::new(MultiGzDecoder::new(reader)))
    } else {
        Box::new(reader)
    };
    Ok(LenientLines::new(source))
}
