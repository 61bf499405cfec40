use crate::harvest::ContentRecord;
use crate::utils::sanitize_filename;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write the collected identifier sequence, one per line.
pub fn write_identifier_list(path: &Path, identifiers: &[String]) -> io::Result<()> {
    let mut contents = String::new();
    for id in identifiers {
        contents.push_str(id);
        contents.push('\n');
    }
    fs::write(path, contents)?;
    ::log::info!(
        "wrote {} identifiers to {}",
        identifiers.len(),
        path.display()
    );
    Ok(())
}

/// Read an operator-supplied or previously collected identifier list.
/// Blank lines are skipped.
pub fn read_identifier_list(path: &Path) -> io::Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    let identifiers: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    ::log::info!(
        "read {} identifiers from {}",
        identifiers.len(),
        path.display()
    );
    Ok(identifiers)
}

/// Write one record as a text file under `dir`, named from its author and
/// title fields. A numeric suffix keeps records with the same author and
/// title from overwriting each other. Returns the path written.
pub fn write_record(dir: &Path, record: &ContentRecord) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stem = record_filename(record);
    let mut path = dir.join(format!("{}.txt", stem));
    let mut n = 2;
    while path.exists() {
        path = dir.join(format!("{} ({}).txt", stem, n));
        n += 1;
    }

    let mut body = format!("URL: {}\n", record.url);
    for field in &record.fields {
        let text = match field.value.text() {
            Some(text) if !text.is_empty() => text,
            Some(_) => "(blank)",
            None => "(not found)",
        };
        body.push_str(&format!("{}: {}\n", field.name, text));
    }
    fs::write(&path, body)?;
    ::log::info!("wrote record to {}", path.display());
    Ok(path)
}

/// Write the whole batch as JSON.
pub fn write_records_json(path: &Path, records: &[ContentRecord]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(records).map_err(io::Error::other)?;
    fs::write(path, json)?;
    ::log::info!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Filename stem for a record: "author - title", with placeholders for
/// whichever half is missing, or the URL when neither field resolved.
fn record_filename(record: &ContentRecord) -> String {
    let author = record
        .field("author")
        .and_then(|value| value.text())
        .filter(|text| !text.is_empty());
    let title = record
        .field("title")
        .and_then(|value| value.text())
        .filter(|text| !text.is_empty());

    let stem = match (author, title) {
        (Some(author), Some(title)) => format!("{} - {}", author, title),
        (Some(author), None) => format!("{} - untitled", author),
        (None, Some(title)) => format!("unknown - {}", title),
        (None, None) => record
            .url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .to_string(),
    };
    sanitize_filename(&stem)
}
