//! JSONL corpus reader.
//!
//! One JSON object per line, `text` required, `source` optional. Malformed
//! lines are skipped with a warning; corpus order follows file order, which
//! fixes the stable passage indices for the session.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::VectorStoreError;

#[derive(Deserialize)]
struct PassageRow {
    text: String,
    #[serde(default)]
    #[allow(dead_code)]
    source: Option<String>,
}

/// Reads passage texts from a JSONL file.
///
/// # Errors
/// [`VectorStoreError::Io`] if the file cannot be opened or read.
pub fn read_corpus(path: impl AsRef<Path>) -> Result<Vec<String>, VectorStoreError> {
    info!(target: "vector_store::io", path = ?path.as_ref(), "reading corpus JSONL");

    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);

    let mut passages = Vec::new();
    let mut skipped = 0usize;
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<PassageRow>(&line) {
            Ok(row) if !row.text.trim().is_empty() => passages.push(row.text),
            Ok(_) => {
                skipped += 1;
                warn!(target: "vector_store::io", line = i + 1, "empty text, skipping");
            }
            Err(e) => {
                skipped += 1;
                warn!(target: "vector_store::io", line = i + 1, error = %e, "bad row, skipping");
            }
        }
    }

    info!(
        target: "vector_store::io",
        passages = passages.len(),
        skipped,
        "corpus loaded"
    );
    Ok(passages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_valid_rows_and_skips_bad_ones() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, r#"{{"text":"Article 21 protects life."}}"#).unwrap();
        writeln!(f, "not json at all").unwrap();
        writeln!(f).unwrap();
        writeln!(f, r#"{{"text":"","source":"blank.pdf"}}"#).unwrap();
        writeln!(f, r#"{{"text":"Article 14 ensures equality.","source":"coi.pdf"}}"#).unwrap();

        let passages = read_corpus(f.path()).unwrap();
        assert_eq!(passages.len(), 2);
        assert!(passages[0].contains("Article 21"));
        assert!(passages[1].contains("Article 14"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_corpus("/definitely/not/here.jsonl").unwrap_err();
        assert!(matches!(err, VectorStoreError::Io(_)));
    }
}
