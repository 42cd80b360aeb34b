pub mod record;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use crate::error::{Error, Result};

pub use self::record::{
    deduplication_key,
    id_segment,
    normalize_line,
    parse_line,
    payload,
    record_key,
    type_segment,
    KeyedLine,
    RecordKey,
    RecordView,
};

/// Open a record file for line-by-line reading.
pub fn open_lines<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::from(e).with_path(path))?;
    Ok(BufReader::new(file))
}

/// Walk every line of `reader`, handing each keyed record to `on_record`.
///
/// `on_line` fires for every physical line (0-based index) before it is parsed,
/// empty ones included. Empty lines never reach `on_record`. Malformed lines are
/// an error unless `skip_malformed` is set, in which case they are logged and dropped.
/// Lines that are not valid UTF-8 count as malformed.
pub fn for_each_record<R, L, F>(
    reader: R,
    skip_malformed: bool,
    mut on_line: L,
    mut on_record: F,
) -> Result<usize>
where
    R: BufRead,
    L: FnMut(usize),
    F: FnMut(KeyedLine<'_>) -> Result<()>,
{
    let mut skipped = 0;
    for (index, bytes) in reader.split(b'\n').enumerate() {
        on_line(index);
        let bytes = bytes?;
        let len = bytes.len();
        let parsed = String::from_utf8(bytes)
            .map_err(|_| Error::malformed(index + 1, len, "invalid UTF-8"));
        let line = match parsed {
            Ok(line) => line,
            Err(e) if skip_malformed => {
                log::warn!("Skipping {}", e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        match parse_line(&line, index + 1) {
            Ok(Some(keyed)) => on_record(keyed)?,
            Ok(None) => {}
            Err(e) if skip_malformed && e.is_malformed() => {
                log::warn!("Skipping {}", e);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_lines_are_not_records() {
        let input = "AAAAAA0001XXXX\n\nBBBBBB0002YYYY\r\n\r\n";
        let mut lines = 0;
        let mut raws = Vec::new();
        let skipped = for_each_record(Cursor::new(input), false, |_| lines += 1, |k| {
            raws.push(k.view.raw.to_string());
            Ok(())
        }).unwrap();

        assert_eq!(skipped, 0);
        assert_eq!(lines, 4);
        assert_eq!(raws, vec!["AAAAAA0001XXXX", "BBBBBB0002YYYY"]);
    }

    #[test]
    fn malformed_policy() {
        let input = "AAAAAA0001XXXX\nshort\n";
        let strict = for_each_record(Cursor::new(input), false, |_| {}, |_| Ok(()));
        assert!(matches!(strict, Err(Error::MalformedLine { line: 2, .. })));

        let lenient = for_each_record(Cursor::new(input), true, |_| {}, |_| Ok(())).unwrap();
        assert_eq!(lenient, 1);
    }

    #[test]
    fn invalid_utf8_follows_malformed_policy() {
        let input: &[u8] = b"AAAAAA0001XXXX\nAAAAAA0001CAF\xE9\nBBBBBB0002YYYY\n";

        let strict = for_each_record(Cursor::new(input), false, |_| {}, |_| Ok(()));
        assert!(matches!(strict, Err(Error::MalformedLine { line: 2, len: 14, .. })));

        let mut raws = Vec::new();
        let lenient = for_each_record(Cursor::new(input), true, |_| {}, |k| {
            raws.push(k.view.raw.to_string());
            Ok(())
        }).unwrap();
        assert_eq!(lenient, 1);
        assert_eq!(raws, vec!["AAAAAA0001XXXX", "BBBBBB0002YYYY"]);
    }
}
