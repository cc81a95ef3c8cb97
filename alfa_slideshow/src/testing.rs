//! Test doubles for the platform and persistence boundaries.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use image::DynamicImage;
use parking_lot::Mutex;

use crate::bridge::LockBridge;
use crate::error::{SessionError, SessionResult};
use crate::media::{Collection, CollectionId, MediaId, MediaItem, MediaKind};
use crate::preview::{MediaLoader, PreparedImage};
use crate::store::{validate_name, CollectionStore};

// ═══════════════════════════════════════════════════════════════════════════════
// LOCK BRIDGE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct FakeLockBridge {
    pub confirm: AtomicBool,
    pub panics: AtomicBool,
    pub capable: AtomicBool,
    pub lock_calls: AtomicUsize,
    pub secure_enters: AtomicUsize,
    pub secure_exits: AtomicUsize,
    pub capability_requests: AtomicUsize,
}

impl FakeLockBridge {
    pub fn confirming() -> Arc<Self> {
        let bridge = Self::default();
        bridge.confirm.store(true, Ordering::SeqCst);
        bridge.capable.store(true, Ordering::SeqCst);
        Arc::new(bridge)
    }

    pub fn refusing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn panicking() -> Arc<Self> {
        let bridge = Self::default();
        bridge.panics.store(true, Ordering::SeqCst);
        Arc::new(bridge)
    }

    pub fn locks(&self) -> usize {
        self.lock_calls.load(Ordering::SeqCst)
    }
}

impl LockBridge for FakeLockBridge {
    fn enter_secure_mode(&self) {
        self.secure_enters.fetch_add(1, Ordering::SeqCst);
    }

    fn exit_secure_mode(&self) {
        self.secure_exits.fetch_add(1, Ordering::SeqCst);
    }

    fn lock(&self) -> bool {
        self.lock_calls.fetch_add(1, Ordering::SeqCst);
        if self.panics.load(Ordering::SeqCst) {
            panic!("simulated platform exception");
        }
        self.confirm.load(Ordering::SeqCst)
    }

    fn is_auto_lock_capable(&self) -> bool {
        self.capable.load(Ordering::SeqCst)
    }

    fn request_auto_lock_capability(&self) {
        self.capability_requests.fetch_add(1, Ordering::SeqCst);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLECTION STORE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct FakeStore {
    /// (name, items) per successful persist
    pub persisted: Mutex<Vec<(String, Vec<MediaItem>)>>,
    /// Every persist call, successful or not
    pub persist_calls: AtomicUsize,
    /// Fail the next N persist calls
    pub persist_failures: AtomicUsize,
    pub removed_items: Mutex<Vec<(CollectionId, MediaId)>>,
    pub fail_remove_item: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_persists(count: usize) -> Arc<Self> {
        let store = Self::default();
        store.persist_failures.store(count, Ordering::SeqCst);
        Arc::new(store)
    }

    pub fn persists(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }
}

impl CollectionStore for FakeStore {
    fn persist(&self, name: &str, items: &[MediaItem]) -> SessionResult<CollectionId> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);

        let pending = self.persist_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.persist_failures.store(pending - 1, Ordering::SeqCst);
            return Err(SessionError::PersistenceFailure("disk full".into()));
        }

        let name = validate_name(name)?;
        let mut persisted = self.persisted.lock();
        persisted.push((name, items.to_vec()));
        Ok(format!("collection-{}", persisted.len()))
    }

    fn remove(&self, _id: &CollectionId) -> SessionResult<()> {
        Ok(())
    }

    fn load(&self, id: &CollectionId) -> SessionResult<Collection> {
        Err(SessionError::CollectionNotFound(id.clone()))
    }

    fn list_all(&self) -> SessionResult<Vec<Collection>> {
        Ok(Vec::new())
    }

    fn remove_item(&self, id: &CollectionId, item: &MediaId) -> SessionResult<()> {
        if self.fail_remove_item.load(Ordering::SeqCst) {
            return Err(SessionError::DatabaseError("locked".into()));
        }
        self.removed_items.lock().push((id.clone(), item.clone()));
        Ok(())
    }

    fn rename(&self, _id: &CollectionId, _name: &str) -> SessionResult<()> {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEDIA LOADER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct FakeLoader {
    failing: Option<String>,
    load_calls: AtomicUsize,
}

impl FakeLoader {
    pub fn failing_on(name: &str) -> Self {
        Self {
            failing: Some(name.to_string()),
            load_calls: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }
}

impl MediaLoader for FakeLoader {
    fn load_image(&self, item: &MediaItem) -> SessionResult<PreparedImage> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.as_deref() == Some(item.display_name().as_str()) {
            return Err(SessionError::MediaUnavailable(item.display_name()));
        }

        Ok(PreparedImage {
            width: 4,
            height: 4,
            image: Arc::new(DynamicImage::new_rgb8(4, 4)),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FIXTURES
// ═══════════════════════════════════════════════════════════════════════════════

/// Ephemeral collection of image items named after `names`
pub fn images(names: &[&str]) -> Collection {
    Collection::ephemeral(
        names
            .iter()
            .enumerate()
            .map(|(i, name)| MediaItem::new(PathBuf::from(name), MediaKind::Image, i as u32))
            .collect(),
    )
}

/// Same items, marked as an already persisted collection
pub fn saved(names: &[&str]) -> Collection {
    let mut collection = images(names);
    collection.ephemeral = false;
    collection.name = "Saved".into();
    collection
}

pub fn names(collection: &Collection) -> Vec<String> {
    collection.items.iter().map(|i| i.display_name()).collect()
}
