//! ALFA Slideshow - Collection Store
//!
//! Durable persistence of named collections. The session only talks to the
//! `CollectionStore` trait; `SqliteCollectionStore` is the shipped adapter.

use std::path::{Path, PathBuf};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::media::{Collection, CollectionId, MediaId, MediaItem, MediaKind};

/// Persistence boundary used by sessions
pub trait CollectionStore: Send + Sync {
    /// Save items as a new named collection
    fn persist(&self, name: &str, items: &[MediaItem]) -> SessionResult<CollectionId>;

    /// Delete a collection with all its items
    fn remove(&self, id: &CollectionId) -> SessionResult<()>;

    /// Load a collection with items sorted by order
    fn load(&self, id: &CollectionId) -> SessionResult<Collection>;

    /// All collections, most recently updated first
    fn list_all(&self) -> SessionResult<Vec<Collection>>;

    /// Delete one item and re-densify the remaining order
    fn remove_item(&self, id: &CollectionId, item: &MediaId) -> SessionResult<()>;

    /// Rename a collection
    fn rename(&self, id: &CollectionId, name: &str) -> SessionResult<()>;
}

/// Trimmed, non-empty collection name
pub fn validate_name(name: &str) -> SessionResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SessionError::InvalidCollectionName);
    }
    Ok(trimmed.to_string())
}

/// SQLite-backed collection store
pub struct SqliteCollectionStore {
    /// Database connection
    conn: Mutex<Connection>,
    /// Database file (None when in memory)
    path: Option<PathBuf>,
}

impl SqliteCollectionStore {
    /// Open (or create) a store at path
    pub fn open(path: &Path) -> SessionResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Volatile store (tests, demo)
    pub fn open_in_memory() -> SessionResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> SessionResult<Self> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS collections (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS items (
                collection_id TEXT NOT NULL,
                id TEXT NOT NULL,
                source_path TEXT NOT NULL,
                thumbnail_path TEXT,
                created_at TEXT NOT NULL,
                position INTEGER NOT NULL,
                kind TEXT NOT NULL,
                PRIMARY KEY (collection_id, id),
                FOREIGN KEY (collection_id) REFERENCES collections(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_items_position ON items(collection_id, position);
            CREATE INDEX IF NOT EXISTS idx_updated ON collections(updated_at);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file location
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn load_items(conn: &Connection, id: &str) -> SessionResult<Vec<MediaItem>> {
        let mut stmt = conn.prepare(
            "SELECT id, source_path, thumbnail_path, created_at, position, kind
             FROM items WHERE collection_id = ?1 ORDER BY position",
        )?;

        let rows = stmt.query_map(params![id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let (item_id, source, thumb, created, position, kind) = row?;
            let kind = MediaKind::parse(&kind)
                .ok_or_else(|| SessionError::UnsupportedMedia(kind.clone()))?;

            items.push(MediaItem {
                id: item_id,
                source_path: PathBuf::from(source),
                thumbnail_path: thumb.map(PathBuf::from),
                created_at: parse_timestamp(&created)?,
                order: position as u32,
                kind,
            });
        }

        Ok(items)
    }

    fn load_header(conn: &Connection, id: &str) -> SessionResult<Collection> {
        let header = conn
            .query_row(
                "SELECT name, created_at, updated_at FROM collections WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let (name, created, updated) =
            header.ok_or_else(|| SessionError::CollectionNotFound(id.to_string()))?;

        Ok(Collection {
            id: id.to_string(),
            name,
            created_at: parse_timestamp(&created)?,
            updated_at: parse_timestamp(&updated)?,
            items: Vec::new(),
            ephemeral: false,
        })
    }
}

impl CollectionStore for SqliteCollectionStore {
    fn persist(&self, name: &str, items: &[MediaItem]) -> SessionResult<CollectionId> {
        let name = validate_name(name)?;
        let id = Uuid::new_v4().to_string();
        let now = timestamp(Utc::now());

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO collections (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![id, name, now],
        )?;

        // Stored order is the sequence position, whatever the incoming orders say
        for (position, item) in items.iter().enumerate() {
            tx.execute(
                "INSERT INTO items (collection_id, id, source_path, thumbnail_path, created_at, position, kind)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    item.id,
                    item.source_path.to_string_lossy().into_owned(),
                    item.thumbnail_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
                    timestamp(item.created_at),
                    position as i64,
                    item.kind.as_str(),
                ],
            )?;
        }

        tx.commit()?;

        log::info!("Persisted collection '{}' ({} items)", name, items.len());
        Ok(id)
    }

    fn remove(&self, id: &CollectionId) -> SessionResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM items WHERE collection_id = ?1", params![id])?;
        let removed = tx.execute("DELETE FROM collections WHERE id = ?1", params![id])?;

        // dropping the transaction rolls back
        if removed == 0 {
            return Err(SessionError::CollectionNotFound(id.clone()));
        }

        tx.commit()?;
        Ok(())
    }

    fn load(&self, id: &CollectionId) -> SessionResult<Collection> {
        let conn = self.conn.lock();

        let mut collection = Self::load_header(&conn, id)?;
        collection.items = Self::load_items(&conn, id)?;
        collection.normalize();

        Ok(collection)
    }

    fn list_all(&self) -> SessionResult<Vec<Collection>> {
        let conn = self.conn.lock();

        let ids: Vec<String> = {
            let mut stmt =
                conn.prepare("SELECT id FROM collections ORDER BY updated_at DESC, created_at DESC")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            let ids = rows.collect::<Result<Vec<String>, _>>()?;
            ids
        };

        let mut collections = Vec::with_capacity(ids.len());
        for id in ids {
            let mut collection = Self::load_header(&conn, &id)?;
            collection.items = Self::load_items(&conn, &id)?;
            collections.push(collection);
        }

        Ok(collections)
    }

    fn remove_item(&self, id: &CollectionId, item: &MediaId) -> SessionResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let removed = tx.execute(
            "DELETE FROM items WHERE collection_id = ?1 AND id = ?2",
            params![id, item],
        )?;
        if removed == 0 {
            return Err(SessionError::PersistenceFailure(format!(
                "item {} not in collection {}",
                item, id
            )));
        }

        let remaining: Vec<String> = {
            let mut stmt =
                tx.prepare("SELECT id FROM items WHERE collection_id = ?1 ORDER BY position")?;
            let rows = stmt.query_map(params![id], |row| row.get(0))?;
            let ids = rows.collect::<Result<Vec<String>, _>>()?;
            ids
        };

        if remaining.is_empty() {
            tx.execute("DELETE FROM collections WHERE id = ?1", params![id])?;
            log::info!("Collection {} emptied and removed", id);
        } else {
            for (position, item_id) in remaining.iter().enumerate() {
                tx.execute(
                    "UPDATE items SET position = ?1 WHERE collection_id = ?2 AND id = ?3",
                    params![position as i64, id, item_id],
                )?;
            }
            tx.execute(
                "UPDATE collections SET updated_at = ?1 WHERE id = ?2",
                params![timestamp(Utc::now()), id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn rename(&self, id: &CollectionId, name: &str) -> SessionResult<()> {
        let name = validate_name(name)?;
        let conn = self.conn.lock();

        let updated = conn.execute(
            "UPDATE collections SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![name, timestamp(Utc::now()), id],
        )?;

        if updated == 0 {
            return Err(SessionError::CollectionNotFound(id.clone()));
        }
        Ok(())
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort as text
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str) -> SessionResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SessionError::DatabaseError(format!("bad timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn items(names: &[&str]) -> Vec<MediaItem> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| MediaItem::new(PathBuf::from(n), MediaKind::Image, i as u32))
            .collect()
    }

    #[test]
    fn test_persist_and_load() {
        let store = SqliteCollectionStore::open_in_memory().unwrap();
        let source = items(&["a.jpg", "b.jpg", "c.mp4"]);

        let id = store.persist("  Trip ", &source).unwrap();
        let loaded = store.load(&id).unwrap();

        assert_eq!(loaded.name, "Trip");
        assert!(!loaded.ephemeral);
        assert_eq!(loaded.len(), 3);
        assert!(loaded.has_dense_order());
        assert_eq!(loaded.items[1].id, source[1].id);
    }

    #[test]
    fn test_empty_name_rejected() {
        let store = SqliteCollectionStore::open_in_memory().unwrap();
        assert!(matches!(
            store.persist("   ", &items(&["a.jpg"])),
            Err(SessionError::InvalidCollectionName)
        ));
    }

    #[test]
    fn test_remove_item_reindexes() {
        let store = SqliteCollectionStore::open_in_memory().unwrap();
        let source = items(&["a.jpg", "b.jpg", "c.jpg"]);
        let id = store.persist("Three", &source).unwrap();

        store.remove_item(&id, &source[0].id).unwrap();

        let loaded = store.load(&id).unwrap();
        let orders: Vec<u32> = loaded.items.iter().map(|i| i.order).collect();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(loaded.items[0].id, source[1].id);
    }

    #[test]
    fn test_removing_last_item_drops_collection() {
        let store = SqliteCollectionStore::open_in_memory().unwrap();
        let source = items(&["solo.png"]);
        let id = store.persist("Solo", &source).unwrap();

        store.remove_item(&id, &source[0].id).unwrap();
        assert!(matches!(store.load(&id), Err(SessionError::CollectionNotFound(_))));
    }

    #[test]
    fn test_list_most_recent_first() {
        let store = SqliteCollectionStore::open_in_memory().unwrap();
        let first = store.persist("First", &items(&["a.jpg"])).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = store.persist("Second", &items(&["b.jpg"])).unwrap();

        let listed: Vec<_> = store.list_all().unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(listed, vec![second.clone(), first.clone()]);

        std::thread::sleep(std::time::Duration::from_millis(5));
        store.rename(&first, "Renamed").unwrap();
        let listed = store.list_all().unwrap();
        assert_eq!(listed[0].id, first);
        assert_eq!(listed[0].name, "Renamed");
    }

    #[test]
    fn test_remove_collection() {
        let dir = tempdir().unwrap();
        let store = SqliteCollectionStore::open(&dir.path().join("db").join("slides.db")).unwrap();
        let id = store.persist("Gone", &items(&["a.jpg"])).unwrap();

        store.remove(&id).unwrap();
        assert!(store.list_all().unwrap().is_empty());
        assert!(matches!(store.remove(&id), Err(SessionError::CollectionNotFound(_))));
    }

    #[test]
    fn test_remove_collection_drops_its_items_only() {
        let store = SqliteCollectionStore::open_in_memory().unwrap();
        let gone = store.persist("Gone", &items(&["a.jpg", "b.jpg"])).unwrap();
        let kept = store.persist("Kept", &items(&["c.jpg"])).unwrap();

        store.remove(&gone).unwrap();

        let item_rows = |id: &CollectionId| -> i64 {
            store
                .conn
                .lock()
                .query_row(
                    "SELECT COUNT(*) FROM items WHERE collection_id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .unwrap()
        };
        assert_eq!(item_rows(&gone), 0);
        assert_eq!(item_rows(&kept), 1);
        assert_eq!(store.load(&kept).unwrap().len(), 1);
    }
}
