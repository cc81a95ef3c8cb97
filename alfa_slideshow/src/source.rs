//! ALFA Slideshow - Media Source
//!
//! Turns shared/imported files into an ephemeral collection. Classification
//! happens here, so a session never sees an unrecognized extension.

use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use crate::error::{SessionError, SessionResult};
use crate::media::{Collection, MediaItem, MediaKind};

/// Outcome of an ingestion pass
#[derive(Debug)]
pub struct Ingested {
    /// Collection built from accepted files
    pub collection: Collection,
    /// Files skipped because of their extension
    pub rejected: Vec<PathBuf>,
}

/// Directory / file ingestion
#[derive(Debug, Clone, Default)]
pub struct MediaSource {
    /// Descend into subdirectories
    recursive: bool,
}

impl MediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk subdirectories too
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Ingest explicit paths; directories are expanded
    pub fn ingest<P: AsRef<Path>>(&self, paths: &[P]) -> SessionResult<Ingested> {
        let mut candidates = Vec::new();

        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                candidates.extend(self.scan_dir(path)?);
            } else if path.exists() {
                candidates.push(path.to_path_buf());
            } else {
                return Err(SessionError::MediaUnavailable(path.display().to_string()));
            }
        }

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for path in candidates {
            match MediaKind::from_path(&path) {
                Some(kind) => accepted.push((path, kind)),
                None => {
                    log::debug!("Rejected unsupported file: {}", path.display());
                    rejected.push(path);
                }
            }
        }

        if accepted.is_empty() {
            return Err(SessionError::EmptyCollection);
        }

        let items = accepted
            .into_iter()
            .enumerate()
            .map(|(order, (path, kind))| {
                let mut item = MediaItem::new(path, kind, order as u32);
                if let Some(created) = file_timestamp(&item.source_path) {
                    item.created_at = created;
                }
                item
            })
            .collect();

        log::info!("Ingested media ({} rejected)", rejected.len());

        Ok(Ingested {
            collection: Collection::ephemeral(items),
            rejected,
        })
    }

    /// List files in a directory sorted by file name
    fn scan_dir(&self, dir: &Path) -> SessionResult<Vec<PathBuf>> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(max_depth).sort_by_file_name() {
            let entry = entry.map_err(|e| SessionError::MediaUnavailable(e.to_string()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }
}

/// Creation time, falling back to modification time
fn file_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    let meta = std::fs::metadata(path).ok()?;
    let time = meta.created().or_else(|_| meta.modified()).ok()?;
    Some(DateTime::<Utc>::from(time))
}
