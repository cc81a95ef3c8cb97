//! ALFA Slideshow - Precache
//!
//! Keeps the images around the cursor decoded. Videos are never precached;
//! the player opens them when they are shown.

use std::collections::HashMap;

use crate::media::{MediaId, MediaItem, MediaKind};
use crate::preview::{MediaLoader, PreparedImage};

/// previous / current / next
pub const PRECACHE_CAPACITY: usize = 3;

/// Cached display state of one item
#[derive(Debug, Clone)]
pub enum CachedSlide {
    Ready(PreparedImage),
    Unavailable(String),
}

/// Bounded image cache keyed by item ID
#[derive(Default)]
pub struct Precache {
    entries: HashMap<MediaId, CachedSlide>,
}

impl Precache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only `window` items, decoding images not yet cached
    pub fn refresh(&mut self, window: &[&MediaItem], loader: &dyn MediaLoader) {
        let wanted: Vec<&MediaItem> = window
            .iter()
            .copied()
            .filter(|item| item.kind == MediaKind::Image)
            .take(PRECACHE_CAPACITY)
            .collect();

        self.entries
            .retain(|id, _| wanted.iter().any(|item| &item.id == id));

        for item in wanted {
            if self.entries.contains_key(&item.id) {
                continue;
            }

            let slide = match loader.load_image(item) {
                Ok(prepared) => CachedSlide::Ready(prepared),
                Err(e) => {
                    log::debug!("Precache miss for {}: {}", item.display_name(), e);
                    CachedSlide::Unavailable(e.to_string())
                }
            };
            self.entries.insert(item.id.clone(), slide);
        }
    }

    pub fn get(&self, id: &MediaId) -> Option<&CachedSlide> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
