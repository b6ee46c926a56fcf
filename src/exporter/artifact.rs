//! Export artifacts and their file names

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::ExportFailure;
use crate::utils::{ARTIFACT_TIMESTAMP_FORMAT, DEFAULT_EXPORT_FILE_NAME, EXPORT_EXTENSION};

/// A written export file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub row_count: usize,
}

/// `{target}__{timestamp}` with the target made filesystem-safe
#[must_use]
pub fn artifact_stem(target: &str, at: DateTime<Local>) -> String {
    let safe_target = sanitize_filename::sanitize(target.trim());
    format!("{safe_target}__{}", at.format(ARTIFACT_TIMESTAMP_FORMAT))
}

/// First path under `dir` for `stem` that is not taken yet
///
/// Two exports in the same second get `_1`, `_2`, ... suffixes.
pub async fn unique_artifact_path(dir: &Path, stem: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{stem}.{EXPORT_EXTENSION}"));
    let mut suffix = 1u32;
    while tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
        candidate = dir.join(format!("{stem}_{suffix}.{EXPORT_EXTENSION}"));
        suffix += 1;
    }
    candidate
}

/// Copy an artifact to `dest`, or to `spider.csv` in the working directory
///
/// A directory destination receives the default file name.
pub async fn copy_artifact(src: &Path, dest: Option<&Path>) -> Result<PathBuf, ExportFailure> {
    let dest = match dest {
        Some(dest) if tokio::fs::metadata(dest).await.is_ok_and(|m| m.is_dir()) => {
            dest.join(DEFAULT_EXPORT_FILE_NAME)
        }
        Some(dest) => dest.to_path_buf(),
        None => PathBuf::from(DEFAULT_EXPORT_FILE_NAME),
    };
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| ExportFailure::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::copy(src, &dest)
        .await
        .map_err(|source| ExportFailure::Io {
            path: dest.clone(),
            source,
        })?;
    Ok(dest)
}
