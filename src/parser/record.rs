// src/parser/record.rs
use std::fmt;
use sha2::{Digest, Sha256};
use crate::error::{Error, Result};

/// Bytes [0, 6) of a line.
pub const ID_LEN: usize = 6;
/// Bytes [6, 10) of a line.
pub const TYPE_END: usize = 10;
/// Shortest terminated line a key can be derived from: the id plus the terminator.
pub const MIN_KEY_LEN: usize = ID_LEN + 1;

/// Content hash of a normalised line, used as a multiset key.
///
/// Two different lines may share a key. The engine counts them together and
/// does not fall back to comparing full content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey([u8; 32]);

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordKey({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Strip any trailing `\r` / `\n` run.
pub fn normalize_line(line: &str) -> &str {
    line.trim_end_matches(|c| c == '\r' || c == '\n')
}

/// Hash `line[6 .. len-1]` of a terminated line.
///
/// The final byte is the line terminator, so callers pass a line ending in
/// exactly one `\n`. Lines shorter than 7 bytes are rejected.
pub fn deduplication_key(line: &str) -> Result<RecordKey> {
    let bytes = line.as_bytes();
    if bytes.len() < MIN_KEY_LEN {
        return Err(Error::malformed(0, bytes.len(), format!(
            "at least {} bytes are needed to derive a key", MIN_KEY_LEN
        )));
    }
    Ok(digest(&bytes[ID_LEN..bytes.len() - 1]))
}

/// Key of a normalised line: the same digest `deduplication_key` gives for
/// the line plus its terminator, without building that string.
pub fn record_key(normalized: &str) -> Result<RecordKey> {
    let bytes = normalized.as_bytes();
    if bytes.len() < ID_LEN {
        return Err(Error::malformed(0, bytes.len(), format!(
            "at least {} bytes are needed to derive a key", ID_LEN
        )));
    }
    Ok(digest(&bytes[ID_LEN..]))
}

fn digest(bytes: &[u8]) -> RecordKey {
    let mut key = [0u8; 32];
    key.copy_from_slice(&Sha256::digest(bytes));
    RecordKey(key)
}

/// A normalised line split into its fixed-width segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordView<'a> {
    pub raw: &'a str,
}

impl<'a> RecordView<'a> {
    /// Validate that `line` carries an id and a type code.
    pub fn parse(line: &'a str) -> Result<Self> {
        if line.len() < TYPE_END {
            return Err(Error::malformed(0, line.len(), format!(
                "records need at least {} bytes", TYPE_END
            )));
        }
        if !line.is_char_boundary(ID_LEN) || !line.is_char_boundary(TYPE_END) {
            return Err(Error::malformed(0, line.len(), "segment boundary splits a character"));
        }
        Ok(Self { raw: line })
    }

    pub fn id(&self) -> &'a str {
        &self.raw[..ID_LEN]
    }

    pub fn type_code(&self) -> &'a str {
        &self.raw[ID_LEN..TYPE_END]
    }

    pub fn payload(&self) -> &'a str {
        &self.raw[TYPE_END..]
    }
}

pub fn id_segment(line: &str) -> Result<&str> {
    RecordView::parse(line).map(|view| view.id())
}

pub fn type_segment(line: &str) -> Result<&str> {
    RecordView::parse(line).map(|view| view.type_code())
}

pub fn payload(line: &str) -> Result<&str> {
    RecordView::parse(line).map(|view| view.payload())
}

/// A keyed line ready for the multiset.
#[derive(Debug, Clone)]
pub struct KeyedLine<'a> {
    pub key: RecordKey,
    pub view: RecordView<'a>,
}

/// Normalise, validate and key one input line.
///
/// Returns `Ok(None)` for lines that are empty after normalisation. `line_number`
/// is 1-based and only used for error reporting.
pub fn parse_line(line: &str, line_number: usize) -> Result<Option<KeyedLine<'_>>> {
    let line = normalize_line(line);
    if line.is_empty() {
        return Ok(None);
    }

    let view = RecordView::parse(line).map_err(|e| renumber(e, line_number))?;
    let key = record_key(line).map_err(|e| renumber(e, line_number))?;
    Ok(Some(KeyedLine { key, view }))
}

fn renumber(err: Error, line_number: usize) -> Error {
    match err {
        Error::MalformedLine { len, reason, .. } => Error::MalformedLine {
            line: line_number,
            len,
            reason,
        },
        other => other,
    }
}
