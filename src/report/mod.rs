// src/report/mod.rs
//! CSV reports written once per job.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use log::debug;

use crate::error::{Error, Result};
use crate::types::{NotFoundRecord, StagingRecord};
use crate::parser::RecordView;

pub const MISSING_HEADER: [&str; 4] = ["source row", "source type", "target row", "changed indices"];
pub const RAW_HEADER: [&str; 2] = ["row", "raw"];
pub const UNMATCHED_HEADER: [&str; 3] = ["Id", "Type", "Raw"];

fn create_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    let file = File::create(path).map_err(|e| Error::from(e).with_path(path))?;
    Ok(csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(BufWriter::new(file)))
}

/// One row per missing record, listing every candidate it picked up.
pub fn write_missing<W: Write>(
    writer: &mut csv::Writer<W>,
    not_found: &[NotFoundRecord],
    index_delimiter: &str,
) -> Result<()> {
    writer.write_record(MISSING_HEADER)?;
    for record in not_found {
        let targets = record.closest
            .iter()
            .map(|c| format!("{}-{}", c.id, c.type_code))
            .collect::<Vec<_>>()
            .join(" | ");
        let indices = record.closest
            .iter()
            .map(|c| c.joined_indices(index_delimiter))
            .collect::<Vec<_>>()
            .join("|");

        writer.write_record([
            record.id.as_str(),
            record.type_code.as_str(),
            targets.as_str(),
            indices.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Missing line, its best candidate, then a blank separator line.
/// Records without candidates are left out.
pub fn write_raw<W: Write>(writer: &mut csv::Writer<W>, not_found: &[NotFoundRecord]) -> Result<()> {
    writer.write_record(RAW_HEADER)?;
    for record in not_found {
        let best = match record.best_candidate() {
            Some(best) => best,
            None => continue,
        };
        writer.write_record([record.id.as_str(), record.raw.as_str()])?;
        writer.write_record([best.id.as_str(), best.raw.as_str()])?;
        // Bypass the csv encoder so the separator has no fields at all
        writer.flush()?;
        writer.get_mut().write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Leftover target lines with copies still unclaimed.
pub fn write_unmatched<W: Write>(writer: &mut csv::Writer<W>, unmatched: &[StagingRecord]) -> Result<()> {
    writer.write_record(UNMATCHED_HEADER)?;
    for entry in unmatched.iter().filter(|e| e.count > 0 && !e.raw.is_empty()) {
        let view = RecordView::parse(&entry.raw)?;
        writer.write_record([view.id(), view.type_code(), view.raw])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_missing_report(path: &Path, not_found: &[NotFoundRecord], index_delimiter: &str) -> Result<()> {
    debug!("Writing {} missing records to {}", not_found.len(), path.display());
    let mut writer = create_writer(path)?;
    write_missing(&mut writer, not_found, index_delimiter)
}

pub fn write_raw_report(path: &Path, not_found: &[NotFoundRecord]) -> Result<()> {
    debug!("Writing raw comparison to {}", path.display());
    let mut writer = create_writer(path)?;
    write_raw(&mut writer, not_found)
}

pub fn write_unmatched_report(path: &Path, unmatched: &[StagingRecord]) -> Result<()> {
    debug!("Writing unmatched records to {}", path.display());
    let mut writer = create_writer(path)?;
    write_unmatched(&mut writer, unmatched)
}
