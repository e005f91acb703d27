//! Player CSV reading.
//!
//! Reads the merged attribute CSV into [`PlayerRow`]s. Header names are
//! trimmed and lower-cased so `First_Name` and ` first_name` address the same
//! attribute. Any malformed record fails the whole read; the importer never
//! opens a roster for half a file.

use crate::error::Result;
use crate::models::PlayerRow;
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Read every row of a player CSV file
pub fn read_players(path: &Path) -> Result<Vec<PlayerRow>> {
    debug!("Reading players from {}", path.display());
    let rows = read_players_from(File::open(path)?)?;
    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read player rows from any CSV source
pub fn read_players_from<R: Read>(source: R) -> Result<Vec<PlayerRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Fields)
        .from_reader(source);

    let headers = normalise_headers(reader.headers()?);

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        // Blank trailing lines come through as a single empty field
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(attribute, value)| (attribute.as_str(), value))
                .collect::<PlayerRow>(),
        );
    }

    Ok(rows)
}

fn normalise_headers(headers: &StringRecord) -> Vec<String> {
    headers
        .iter()
        .map(|header| header.trim().to_ascii_lowercase())
        .collect()
}
