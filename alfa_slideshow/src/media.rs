//! ALFA Slideshow - Media Model
//!
//! Media items, collections and the extension allow-list used to classify them.

use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Collection identifier
pub type CollectionId = String;

/// Media item identifier
pub type MediaId = String;

/// Image extensions accepted at ingestion
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "heic", "heif",
];

/// Video extensions accepted at ingestion
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "wmv", "flv", "3gp", "webm", "m4v", "3gpp", "ts", "mts",
];

/// Kind of media
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a path by its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// A single presentable item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    /// Unique ID
    pub id: MediaId,
    /// Source file
    pub source_path: PathBuf,
    /// Optional thumbnail file
    pub thumbnail_path: Option<PathBuf>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Position in the collection (dense, sole sort key)
    pub order: u32,
    /// Image or video
    pub kind: MediaKind,
}

impl MediaItem {
    /// Create an item with a fresh ID
    pub fn new(source_path: PathBuf, kind: MediaKind, order: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_path,
            thumbnail_path: None,
            created_at: Utc::now(),
            order,
            kind,
        }
    }

    /// Display name (file name of the source)
    pub fn display_name(&self) -> String {
        self.source_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}

/// Named, ordered sequence of media items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Unique ID
    pub id: CollectionId,
    /// Display name
    pub name: String,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
    /// Items, kept sorted by `order`
    pub items: Vec<MediaItem>,
    /// Built from shared/imported content and never persisted
    pub ephemeral: bool,
}

impl Collection {
    /// Build an unsaved collection from items, normalizing their order
    pub fn ephemeral(items: Vec<MediaItem>) -> Self {
        let now = Utc::now();
        let mut collection = Self {
            id: Uuid::new_v4().to_string(),
            name: String::new(),
            created_at: now,
            updated_at: now,
            items,
            ephemeral: true,
        };
        collection.normalize();
        collection
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sort by `order` and rewrite orders to 0..n-1
    pub fn normalize(&mut self) {
        self.items.sort_by_key(|item| item.order);
        self.reindex();
    }

    /// Rewrite orders to 0..n-1 keeping the current sequence
    pub fn reindex(&mut self) {
        for (position, item) in self.items.iter_mut().enumerate() {
            item.order = position as u32;
        }
    }

    /// True when orders are exactly 0..n-1 in sequence
    pub fn has_dense_order(&self) -> bool {
        self.items
            .iter()
            .enumerate()
            .all(|(position, item)| item.order as usize == position)
    }

    /// Remove the item at `index` and reindex the rest
    pub fn remove_at(&mut self, index: usize) -> Option<MediaItem> {
        if index >= self.items.len() {
            return None;
        }

        let removed = self.items.remove(index);
        self.reindex();
        self.updated_at = Utc::now();
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, order: u32) -> MediaItem {
        MediaItem::new(PathBuf::from(name), MediaKind::Image, order)
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(MediaKind::from_path(Path::new("a/b.JPG")), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_path(Path::new("clip.heif")), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_path(Path::new("clip.3gpp")), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_path(Path::new("clip.MTS")), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::from_path(Path::new("no_extension")), None);
    }

    #[test]
    fn test_normalize_sorts_by_order() {
        let collection = Collection::ephemeral(vec![item("c", 7), item("a", 2), item("b", 5)]);

        let names: Vec<_> = collection.items.iter().map(|i| i.display_name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(collection.has_dense_order());
    }

    #[test]
    fn test_remove_at_keeps_dense_order() {
        let mut collection = Collection::ephemeral(vec![item("a", 0), item("b", 1), item("c", 2)]);

        let removed = collection.remove_at(1).unwrap();
        assert_eq!(removed.display_name(), "b");
        assert_eq!(collection.len(), 2);
        assert!(collection.has_dense_order());
        assert!(collection.remove_at(5).is_none());
    }
}
