use crate::results::Record;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Column headers of the CSV report
pub const HEADERS: [&str; 3] = ["Nome do Arquivo", "URL", "Download?"];

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("could not write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode report: {0}")]
    Csv(#[from] csv::Error),
}

/// Writes `records` as CSV, header first
pub fn write_records<W: Write>(writer: W, records: &[Record]) -> Result<(), OutputError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADERS)?;

    for record in records {
        csv.write_record([
            record.file_name.as_str(),
            record.source_url.as_str(),
            if record.downloaded { "true" } else { "false" },
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// Writes the report to `path`, creating parent directories as needed
pub fn write_csv<P: AsRef<Path>>(path: P, records: &[Record]) -> Result<(), OutputError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    write_records(file, records)?;
    ::log::info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}
