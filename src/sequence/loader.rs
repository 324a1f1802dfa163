//! CSV front-end for sequence files.
//!
//! Sequence files are tabular with a `Time,Function,Action` header. This
//! module only gets bytes into [`RawRow`]s; all semantic validation lives in
//! [`CommandTable::load`](super::CommandTable::load) so it can be tested
//! without touching the filesystem.

use std::io::Read;
use std::path::Path;

use log::info;

use super::{CommandTable, RawRow};
use crate::error::ValidationError;

const REQUIRED_COLUMNS: [&str; 3] = ["Time", "Function", "Action"];

/// Read and validate a sequence file from disk.
pub fn load_file(path: &Path) -> Result<CommandTable, ValidationError> {
    let file = std::fs::File::open(path).map_err(|e| ValidationError::Io(e.to_string()))?;
    let table = load_reader(file)?;
    info!(
        "Sequence loaded from {}: {} commands over {:.1}s",
        path.display(),
        table.len(),
        table.duration_secs()
    );
    Ok(table)
}

/// Read and validate a sequence from any reader (used by tests).
pub fn load_reader(rdr: impl Read) -> Result<CommandTable, ValidationError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(rdr);

    let headers = csv
        .headers()
        .map_err(|e| ValidationError::Io(e.to_string()))?
        .clone();

    let mut indices = [0usize; 3];
    for (slot, col) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == col)
            .ok_or(ValidationError::MissingColumn(col))?;
    }
    let [time_idx, function_idx, action_idx] = indices;

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record.map_err(|e| ValidationError::Io(e.to_string()))?;
        rows.push(RawRow {
            time: record.get(time_idx).unwrap_or("").to_string(),
            function: record.get(function_idx).unwrap_or("").to_string(),
            action: record.get(action_idx).unwrap_or("").to_string(),
        });
    }

    CommandTable::load(&rows)
}
