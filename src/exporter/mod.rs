//! Export pipeline
//!
//! Deduplicates the crawl buffer and writes it as a single-column CSV that
//! starts with a UTF-8 byte-order mark, so spreadsheet tools pick the right
//! encoding for CJK text.

use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::crawl_engine::RecordBuffer;
use crate::utils::UTF8_BOM;

pub mod artifact;
pub mod csv_writer;
pub mod dedup;

pub use artifact::{ExportArtifact, artifact_stem, copy_artifact, unique_artifact_path};
pub use csv_writer::serialize_rows;
pub use dedup::dedupe_records;

#[derive(Debug, thiserror::Error)]
pub enum ExportFailure {
    #[error("cannot name an export for an empty target")]
    EmptyTarget,

    #[error("failed to serialize rows: {0}")]
    Serialize(#[from] csv::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write `buffer` to a fresh artifact under `dir`
///
/// The buffer is cleared only after the file is fully written; on failure it
/// is left untouched so export can be attempted again.
pub async fn export(
    buffer: &mut RecordBuffer,
    target: &str,
    dir: &Path,
) -> Result<ExportArtifact, ExportFailure> {
    if target.trim().is_empty() {
        return Err(ExportFailure::EmptyTarget);
    }

    let rows = dedupe_records(buffer.records());
    let body = serialize_rows(&rows)?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ExportFailure::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let path = unique_artifact_path(dir, &artifact_stem(target, Local::now())).await;
    write_with_bom(&path, &body)
        .await
        .map_err(|source| ExportFailure::Io {
            path: path.clone(),
            source,
        })?;

    log::info!(
        "Exported {} rows ({} buffered) to {}",
        rows.len(),
        buffer.len(),
        path.display()
    );
    buffer.clear();

    Ok(ExportArtifact {
        path,
        row_count: rows.len(),
    })
}

/// BOM first, then the rows appended
async fn write_with_bom(path: &Path, body: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(path, UTF8_BOM.as_bytes()).await?;
    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .await?;
    file.write_all(body).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_write_keeps_buffer() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A file where the export directory should be
        let blocked = dir.path().join("csv");
        tokio::fs::write(&blocked, b"").await.expect("write");

        let mut buffer = RecordBuffer::from(vec!["a".to_string()]);
        let err = export(&mut buffer, "hu_ge", &blocked)
            .await
            .expect_err("directory is a file");
        assert!(matches!(err, ExportFailure::Io { .. }));
        assert_eq!(buffer.len(), 1);
    }

    #[tokio::test]
    async fn blank_target_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut buffer = RecordBuffer::from(vec!["a".to_string()]);
        assert!(matches!(
            export(&mut buffer, " ", dir.path()).await,
            Err(ExportFailure::EmptyTarget)
        ));
        assert_eq!(buffer.len(), 1);
    }
}
