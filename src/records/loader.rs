//! Load cohort records from a JSON file or a directory tree of JSON files.

use super::StudentRecord;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

const MAX_DEPTH: usize = 4;

#[derive(Deserialize)]
#[serde(untagged)]
enum CohortFile {
    Many(Vec<StudentRecord>),
    One(StudentRecord),
}

fn read_file(path: &Path) -> std::io::Result<Vec<StudentRecord>> {
    let data = std::fs::read_to_string(path)?;
    let parsed: CohortFile = serde_json::from_str(&data)?;
    Ok(match parsed {
        CohortFile::Many(records) => records,
        CohortFile::One(record) => vec![record],
    })
}

/// Read records from `path`. A directory is walked in file-name order and
/// every `*.json` file is read; files that fail to parse are skipped.
pub fn load_records(path: &Path) -> std::io::Result<Vec<StudentRecord>> {
    if path.is_file() {
        return read_file(path);
    }
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no cohort data at {}", path.display()),
        ));
    }

    let mut records = Vec::new();
    for entry in WalkDir::new(path)
        .max_depth(MAX_DEPTH)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let file = entry.path();
        if !file.is_file() || file.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        match read_file(file) {
            Ok(batch) => {
                debug!(path = %file.display(), count = batch.len(), "loaded cohort file");
                records.extend(batch);
            }
            Err(e) => warn!(path = %file.display(), error = %e, "skipping unreadable cohort file"),
        }
    }
    Ok(records)
}
