// src/matcher/closest.rs
use log::{debug, trace};

use crate::config::subsystems::MatcherConfig;
use crate::error::Result;
use crate::parser::record::{RecordView, TYPE_END};
use crate::types::{ClosestCandidate, NotFoundRecord, StagingRecord};

/// Positions at or past the type code where `a` and `b` differ.
///
/// Returns `Ok(None)` when the type codes differ, in which case nothing is compared.
/// Comparison runs to the end of the longer line; a byte present in only one of
/// them counts as a difference.
pub fn distance(a: &str, b: &str) -> Result<Option<Vec<usize>>> {
    let left = RecordView::parse(a)?;
    let right = RecordView::parse(b)?;
    if left.type_code() != right.type_code() {
        return Ok(None);
    }

    let (a, b) = (a.as_bytes(), b.as_bytes());
    let indices = (TYPE_END..a.len().max(b.len()))
        .filter(|&i| a.get(i) != b.get(i))
        .collect();
    Ok(Some(indices))
}

/// Attaches leftover target lines to missing source lines when they are
/// the same type and differ in a small number of positions.
pub struct ClosestMatcher {
    min_changed: usize,
    max_changed: usize,
}

impl ClosestMatcher {
    pub fn new(config: &MatcherConfig) -> Self {
        Self {
            min_changed: config.min_changed,
            max_changed: config.max_changed,
        }
    }

    fn accepts(&self, changed: usize) -> bool {
        (self.min_changed..=self.max_changed).contains(&changed)
    }

    /// Walk the whole unmatched buffer for every not-found record, in order.
    ///
    /// Each attached candidate takes one copy from its buffer entry, so an entry is
    /// offered at most `count` times overall. Returns the number of candidates attached.
    pub fn find_closest(
        &self,
        not_found: &mut [NotFoundRecord],
        unmatched: &mut [StagingRecord],
    ) -> Result<usize> {
        debug!("Checking {} missing records against {} unmatched entries",
               not_found.len(), unmatched.len());

        let mut attached = 0;
        for record in not_found.iter_mut() {
            for entry in unmatched.iter_mut() {
                if entry.count == 0 {
                    continue;
                }

                let indices = match distance(&record.raw, &entry.raw)? {
                    Some(indices) => indices,
                    None => continue,
                };

                if !self.accepts(indices.len()) {
                    continue;
                }

                let view = RecordView::parse(&entry.raw)?;
                trace!("{} is close to {} at {:?}", record.raw, entry.raw, indices);
                record.closest.push(ClosestCandidate {
                    id: view.id().to_string(),
                    type_code: view.type_code().to_string(),
                    raw: entry.raw.clone(),
                    indices,
                });
                entry.count -= 1;
                attached += 1;
            }
        }

        Ok(attached)
    }
}
