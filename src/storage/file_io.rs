//! File I/O utilities with atomic writes
//!
//! The ledger and the transaction log are JSON-lines files: one record per
//! line. Writes go to a temp file that is renamed over the target, so a file
//! is either completely rewritten or not modified at all.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::LedgerError;

/// Read a JSON-lines file, returning an empty list if the file doesn't exist
///
/// Blank lines are skipped. A malformed line fails the whole read.
pub fn read_jsonl<T, P>(path: P) -> Result<Vec<T>, LedgerError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)
        .map_err(|e| LedgerError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut records = Vec::new();
    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            LedgerError::Storage(format!(
                "Failed to read {} line {}: {}",
                path.display(),
                line_num + 1,
                e
            ))
        })?;

        if line.trim().is_empty() {
            continue;
        }

        let record = serde_json::from_str(&line).map_err(|e| {
            LedgerError::Json(format!(
                "Failed to parse {} line {}: {}",
                path.display(),
                line_num + 1,
                e
            ))
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Read a YAML document from a file
pub fn read_yaml<T, P>(path: P) -> Result<T, LedgerError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| LedgerError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

    serde_yaml::from_str(&content)
        .map_err(|e| LedgerError::Yaml(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write records as JSON lines atomically (write to temp, then rename)
pub fn write_jsonl_atomic<'a, T, I, P>(path: P, records: I) -> Result<(), LedgerError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            LedgerError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Create temp file in same directory (important for atomic rename)
    let temp_path = path.with_extension("jsonl.tmp");

    let file = File::create(&temp_path)
        .map_err(|e| LedgerError::Storage(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)
            .map_err(|e| LedgerError::Storage(format!("Failed to serialize record: {}", e)))?;
        writer
            .write_all(b"\n")
            .map_err(|e| LedgerError::Storage(format!("Failed to write record: {}", e)))?;
    }

    writer
        .flush()
        .map_err(|e| LedgerError::Storage(format!("Failed to flush data: {}", e)))?;

    // Sync to disk before rename
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| LedgerError::Storage(format!("Failed to sync data: {}", e)))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        LedgerError::Storage(format!("Failed to rename temp file: {}", e))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestRecord {
        name: String,
        value: i32,
    }

    fn records() -> Vec<TestRecord> {
        vec![
            TestRecord {
                name: "a".into(),
                value: 1,
            },
            TestRecord {
                name: "b".into(),
                value: 2,
            },
        ]
    }

    #[test]
    fn test_read_nonexistent_returns_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.jsonl");

        let data: Vec<TestRecord> = read_jsonl(&path).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.jsonl");

        write_jsonl_atomic(&path, &records()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        let loaded: Vec<TestRecord> = read_jsonl(&path).unwrap();
        assert_eq!(loaded, records());
    }

    #[test]
    fn test_atomic_write_no_temp_file_left() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.jsonl");

        write_jsonl_atomic(&path, &records()).unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join("test.jsonl.tmp").exists());
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("test.jsonl");

        write_jsonl_atomic(&path, &records()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_blank_lines_skipped_and_bad_line_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.jsonl");

        fs::write(&path, "{\"name\":\"a\",\"value\":1}\n\n").unwrap();
        let loaded: Vec<TestRecord> = read_jsonl(&path).unwrap();
        assert_eq!(loaded.len(), 1);

        fs::write(&path, "{\"name\":\"a\",\"value\":1}\nnot json\n").unwrap();
        let err = read_jsonl::<TestRecord, _>(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_read_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.yaml");
        fs::write(&path, "- name: a\n  value: 1\n").unwrap();

        let loaded: Vec<TestRecord> = read_yaml(&path).unwrap();
        assert_eq!(loaded[0].name, "a");
    }
}
