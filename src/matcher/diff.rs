// src/matcher/diff.rs
use std::io::BufRead;
use std::path::Path;
use log::debug;

use crate::error::Result;
use crate::matcher::multiset::TargetMultiset;
use crate::parser;
use crate::types::NotFoundRecord;

/// Outcome of scanning one source file.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub not_found: Vec<NotFoundRecord>,
    pub consumed: usize,
    pub skipped: usize,
}

impl ScanResult {
    /// Non-empty source lines that were classified.
    pub fn lines(&self) -> usize {
        self.consumed + self.not_found.len()
    }
}

/// Scans source lines against a target multiset, left to right.
pub struct DiffEngine {
    skip_malformed: bool,
}

impl DiffEngine {
    pub fn new(skip_malformed: bool) -> Self {
        Self { skip_malformed }
    }

    pub fn scan<P, L>(&self, multiset: &mut TargetMultiset, source: P, on_line: L) -> Result<ScanResult>
    where
        P: AsRef<Path>,
        L: FnMut(usize),
    {
        let source = source.as_ref();
        let reader = parser::open_lines(source)?;
        debug!("Scanner ready for {:?}", source);
        self.scan_reader(multiset, reader, on_line).map_err(|e| e.with_path(source))
    }

    /// Each line consumes a remaining target copy or becomes a not-found record.
    /// Earlier lines win; nothing is revisited.
    pub fn scan_reader<R, L>(&self, multiset: &mut TargetMultiset, reader: R, on_line: L) -> Result<ScanResult>
    where
        R: BufRead,
        L: FnMut(usize),
    {
        let mut result = ScanResult::default();
        let skipped = parser::for_each_record(reader, self.skip_malformed, on_line, |keyed| {
            if multiset.consume(&keyed.key) {
                result.consumed += 1;
            } else {
                result.not_found.push(NotFoundRecord {
                    id: keyed.view.id().to_string(),
                    type_code: keyed.view.type_code().to_string(),
                    raw: keyed.view.raw.to_string(),
                    closest: Vec::new(),
                });
            }
            Ok(())
        })?;
        result.skipped = skipped;
        Ok(result)
    }
}
