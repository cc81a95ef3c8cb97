//! ALFA Slideshow - Session Controller
//!
//! One presentation session: cyclic navigation, removal, timers and the exit
//! protocol behind a single owner. Every input (gesture, timer fire) is a
//! `&mut self` call, so inputs are serialized by construction. Results for
//! the UI layer are queued as `SessionNotice`s.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bridge::{lock_guarded, LockBridge, LockOutcome};
use crate::deletion::{DeletionEngine, DeletionPolicy, RemovalOutcome, RemovalRequest};
use crate::error::{SessionError, SessionResult};
use crate::exit::{Disposition, ExitIntent, ExitProtocol, ExitStep, PresentationPhase};
use crate::media::{Collection, CollectionId, MediaItem, MediaKind};
use crate::navigation::{Direction, NavigationEngine};
use crate::precache::{CachedSlide, Precache};
use crate::preview::{MediaLoader, PreparedImage};
use crate::settings::SessionConfig;
use crate::store::CollectionStore;
use crate::timers::{TimerCoordinator, TimerFire};

/// External collaborators of a session
#[derive(Clone)]
pub struct PlatformServices {
    /// Device lock capability
    pub lock_bridge: Arc<dyn LockBridge>,
    /// Collection persistence
    pub store: Arc<dyn CollectionStore>,
    /// Image decoding for the precache
    pub loader: Arc<dyn MediaLoader>,
}

/// Why the lock bridge was called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockTrigger {
    Exit,
    AutoLock,
}

/// Signals for the UI layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionNotice {
    Started { session_id: String, total: usize },
    SlideChanged { cursor: usize, total: usize, item: MediaItem },
    ConfirmRemoval { index: usize, item: MediaItem },
    RemovalCancelled,
    Removed { item: MediaItem, remaining: usize },
    RemovalFailed { reason: String },
    SessionEnded,
    LockAttempted { trigger: LockTrigger, outcome: LockOutcome },
    AutoLockCapabilityRequested,
    PhaseChanged { phase: PresentationPhase },
    DispositionRequired,
    SaveFailed { reason: String },
    Resumed,
    Exited { saved: Option<CollectionId> },
}

/// What to render for the current item
#[derive(Debug, Clone)]
pub enum Slide {
    /// Decoded image
    Image(PreparedImage),
    /// Video, opened by the player at display time
    Video(PathBuf),
    /// Inline error placeholder
    Unavailable { path: PathBuf, reason: String },
}

/// Secure presentation session
pub struct SessionController {
    /// Session ID (logs, notices)
    id: String,
    /// Presentation settings
    config: SessionConfig,
    /// Presented collection (owned copy)
    collection: Collection,
    /// Cyclic cursor
    nav: NavigationEngine,
    /// Removal gating
    deletion: DeletionEngine,
    /// Exit state machine
    exit: ExitProtocol,
    /// Auto-advance / auto-lock
    pub(crate) timers: TimerCoordinator,
    /// Decoded images around the cursor
    precache: Precache,
    /// Platform + persistence
    services: PlatformServices,
    /// `start` has run
    started: bool,
    /// Pending notices for the UI
    notices: VecDeque<SessionNotice>,
}

impl SessionController {
    // ═══════════════════════════════════════════════════════════════════════
    // LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════

    /// Create a session over a non-empty collection
    pub fn new(
        mut collection: Collection,
        config: SessionConfig,
        services: PlatformServices,
    ) -> SessionResult<Self> {
        if collection.is_empty() {
            return Err(SessionError::EmptyCollection);
        }

        collection.normalize();
        let len = collection.len();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            deletion: DeletionEngine::new(DeletionPolicy::from(&config)),
            exit: ExitProtocol::new(collection.ephemeral),
            nav: NavigationEngine::new(len, 0),
            config,
            collection,
            timers: TimerCoordinator::new(),
            precache: Precache::new(),
            services,
            started: false,
            notices: VecDeque::new(),
        })
    }

    /// Start on a given item instead of the first one
    pub fn with_start_index(mut self, index: usize) -> Self {
        self.nav.jump_to(index);
        self
    }

    /// Enter secure mode, arm timers, fill the precache.
    ///
    /// Arming timers needs a tokio runtime when auto-advance or auto-lock
    /// is enabled.
    pub fn start(&mut self) {
        if self.started || !self.is_live() {
            return;
        }
        self.started = true;

        let bridge = Arc::clone(&self.services.lock_bridge);
        bridge.enter_secure_mode();

        if self.config.auto_lock_enabled && !bridge.is_auto_lock_capable() {
            bridge.request_auto_lock_capability();
            self.notify(SessionNotice::AutoLockCapabilityRequested);
        }

        self.timers.arm(&self.config);

        log::info!("Session {} started ({} items)", self.id, self.collection.len());
        self.notify(SessionNotice::Started {
            session_id: self.id.clone(),
            total: self.collection.len(),
        });
        self.after_cursor_change();
    }

    /// End the session from any phase (host shutdown)
    pub fn shutdown(&mut self) -> SessionResult<()> {
        let step = self.exit.abort();
        self.run_steps(step)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // STATE
    // ═══════════════════════════════════════════════════════════════════════

    pub fn session_id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> PresentationPhase {
        self.exit.phase()
    }

    /// False once the session reached `Exiting`
    pub fn is_live(&self) -> bool {
        self.exit.phase() != PresentationPhase::Exiting
    }

    pub fn cursor(&self) -> usize {
        self.nav.cursor()
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn timers(&self) -> &TimerCoordinator {
        &self.timers
    }

    /// Index waiting for a yes/no
    pub fn pending_removal(&self) -> Option<usize> {
        self.deletion.pending()
    }

    /// Last persistence failure while saving
    pub fn save_failure(&self) -> Option<&str> {
        self.exit.save_failure()
    }

    pub fn current_item(&self) -> Option<&MediaItem> {
        self.collection.items.get(self.nav.cursor())
    }

    /// "k / n" when the counter is enabled
    pub fn position_label(&self) -> Option<String> {
        if !self.config.show_counter || self.collection.is_empty() {
            return None;
        }
        Some(format!("{} / {}", self.nav.cursor() + 1, self.collection.len()))
    }

    /// What to display for the current item
    pub fn current_slide(&self) -> Option<Slide> {
        let item = self.current_item()?;
        let path = item.source_path.clone();

        let slide = match item.kind {
            MediaKind::Video => {
                if path.exists() {
                    Slide::Video(path)
                } else {
                    Slide::Unavailable {
                        reason: format!("Media unavailable: {}", path.display()),
                        path,
                    }
                }
            }
            MediaKind::Image => match self.precache.get(&item.id) {
                Some(CachedSlide::Ready(prepared)) => Slide::Image(prepared.clone()),
                Some(CachedSlide::Unavailable(reason)) => Slide::Unavailable {
                    path,
                    reason: reason.clone(),
                },
                None => match self.services.loader.load_image(item) {
                    Ok(prepared) => Slide::Image(prepared),
                    Err(e) => Slide::Unavailable {
                        path,
                        reason: e.to_string(),
                    },
                },
            },
        };

        Some(slide)
    }

    /// Take all queued notices
    pub fn drain_notices(&mut self) -> Vec<SessionNotice> {
        self.notices.drain(..).collect()
    }

    fn notify(&mut self, notice: SessionNotice) {
        self.notices.push_back(notice);
    }

    fn notify_phase(&mut self) {
        let phase = self.exit.phase();
        self.notify(SessionNotice::PhaseChanged { phase });
    }

    fn ensure_live(&self) -> SessionResult<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(SessionError::SessionClosed)
        }
    }

    fn ensure_active(&self, action: &'static str) -> SessionResult<()> {
        self.ensure_live()?;
        if self.exit.phase() != PresentationPhase::Active {
            return Err(SessionError::InvalidTransition {
                phase: self.exit.phase(),
                action,
            });
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // NAVIGATION
    // ═══════════════════════════════════════════════════════════════════════

    pub fn next(&mut self) -> SessionResult<usize> {
        self.step(Direction::Forward)
    }

    pub fn previous(&mut self) -> SessionResult<usize> {
        self.step(Direction::Backward)
    }

    /// Move one item in `direction`, wrapping around
    pub fn step(&mut self, direction: Direction) -> SessionResult<usize> {
        self.ensure_active("navigate")?;
        let cursor = self.nav.advance(direction);
        self.after_cursor_change();
        Ok(cursor)
    }

    /// Land on an index without transition
    pub fn jump_to(&mut self, index: usize) -> SessionResult<usize> {
        self.ensure_active("navigate")?;
        let len = self.collection.len();
        if index >= len {
            return Err(SessionError::IndexOutOfRange { index, len });
        }

        let cursor = self.nav.jump_to(index);
        self.after_cursor_change();
        Ok(cursor)
    }

    fn after_cursor_change(&mut self) {
        let window = self.nav.precache_window();
        let items: Vec<&MediaItem> = window
            .indices()
            .into_iter()
            .filter_map(|index| self.collection.items.get(index))
            .collect();
        self.precache.refresh(&items, self.services.loader.as_ref());

        if let Some(item) = self.current_item().cloned() {
            let cursor = self.nav.cursor();
            let total = self.collection.len();
            self.notify(SessionNotice::SlideChanged { cursor, total, item });
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // TIMERS
    // ═══════════════════════════════════════════════════════════════════════

    /// Handle a timer fire; fires into a closed session are dropped
    pub fn on_timer(&mut self, fire: TimerFire) {
        if !self.is_live() {
            log::debug!("Dropping {:?} for closed session {}", fire, self.id);
            return;
        }

        let active = self.exit.phase() == PresentationPhase::Active;

        match fire {
            TimerFire::AdvanceTick => {
                if active && self.deletion.pending().is_none() {
                    self.nav.advance(Direction::Forward);
                    self.after_cursor_change();
                }
            }
            TimerFire::AutoLockElapsed => {
                if !active {
                    log::debug!("Auto-lock elapsed during {:?}, ignored", self.exit.phase());
                    return;
                }
                let outcome = lock_guarded(self.services.lock_bridge.as_ref());
                log::info!("Auto-lock for session {}: {:?}", self.id, outcome);
                self.notify(SessionNotice::LockAttempted {
                    trigger: LockTrigger::AutoLock,
                    outcome,
                });
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // REMOVAL
    // ═══════════════════════════════════════════════════════════════════════

    /// Vertical swipe on the current item; true if taken as a removal
    pub fn swipe(&mut self, velocity: f32) -> SessionResult<bool> {
        self.ensure_active("remove")?;

        if !self.deletion.recognizes_swipe(velocity) {
            log::debug!("Swipe at {} px/s below removal threshold", velocity);
            return Ok(false);
        }

        self.request_removal(self.nav.cursor())?;
        Ok(true)
    }

    /// Remove the current item (subject to confirmation)
    pub fn remove_current(&mut self) -> SessionResult<()> {
        self.request_removal(self.nav.cursor())
    }

    /// Remove the item at `index` (subject to confirmation)
    pub fn request_removal(&mut self, index: usize) -> SessionResult<()> {
        self.ensure_active("remove")?;
        let len = self.collection.len();
        if index >= len {
            return Err(SessionError::IndexOutOfRange { index, len });
        }

        match self.deletion.request(index) {
            RemovalRequest::AwaitingConfirmation { index } => {
                let item = self.collection.items[index].clone();
                self.notify(SessionNotice::ConfirmRemoval { index, item });
                Ok(())
            }
            RemovalRequest::Proceed { index } => self.remove_now(index),
        }
    }

    /// Answer a pending removal confirmation
    pub fn confirm_removal(&mut self, accepted: bool) -> SessionResult<()> {
        self.ensure_active("confirm removal")?;

        match self.deletion.resolve(accepted) {
            Some(index) => self.remove_now(index),
            None => {
                self.notify(SessionNotice::RemovalCancelled);
                Ok(())
            }
        }
    }

    fn remove_now(&mut self, index: usize) -> SessionResult<()> {
        let len = self.collection.len();
        let item_id = self
            .collection
            .items
            .get(index)
            .map(|item| item.id.clone())
            .ok_or(SessionError::IndexOutOfRange { index, len })?;

        // Saved collections are updated in the store first; on failure the item stays
        if !self.collection.ephemeral {
            if let Err(e) = self.services.store.remove_item(&self.collection.id, &item_id) {
                log::warn!("Removal not persisted for session {}: {}", self.id, e);
                self.notify(SessionNotice::RemovalFailed {
                    reason: e.to_string(),
                });
                return Ok(());
            }
        }

        match DeletionEngine::remove(&mut self.collection, index)? {
            RemovalOutcome::Removed { removed, cursor } => {
                log::info!("Removed {} ({} left)", removed.display_name(), self.collection.len());
                self.nav.resize(self.collection.len());
                self.nav.jump_to(cursor);
                self.notify(SessionNotice::Removed {
                    item: removed,
                    remaining: self.collection.len(),
                });
                self.after_cursor_change();
                Ok(())
            }
            RemovalOutcome::SessionEnded { removed } => {
                log::info!("Removed last item {}, ending session", removed.display_name());
                self.notify(SessionNotice::Removed {
                    item: removed,
                    remaining: 0,
                });
                self.notify(SessionNotice::SessionEnded);
                let step = self.exit.abort();
                self.run_steps(step)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // EXIT
    // ═══════════════════════════════════════════════════════════════════════

    /// Exit gesture. Duplicates during an exit in progress are ignored.
    pub fn request_exit(&mut self, intent: ExitIntent) -> SessionResult<()> {
        self.ensure_live()?;
        if self.exit.phase().is_exit_in_progress() {
            log::debug!("Exit already in progress for session {}", self.id);
            return Ok(());
        }

        let step = self.exit.request_exit(intent);
        if step != ExitStep::Ignored {
            log::info!("Exit requested ({:?}) for session {}", intent, self.id);
            self.deletion.cancel_pending();
            self.notify_phase();
        }
        self.run_steps(step)
    }

    /// Save / Discard / Cancel for an unsaved collection
    pub fn choose(&mut self, disposition: Disposition) -> SessionResult<()> {
        self.ensure_live()?;
        let step = self.exit.choose(disposition)?;
        self.run_steps(step)
    }

    /// Retry a failed save
    pub fn retry_save(&mut self) -> SessionResult<()> {
        self.ensure_live()?;
        let step = self.exit.retry_save()?;
        self.run_steps(step)
    }

    /// Leave without saving after a failed save
    pub fn discard_unsaved(&mut self) -> SessionResult<()> {
        self.ensure_live()?;
        let step = self.exit.discard_unsaved()?;
        self.run_steps(step)
    }

    /// Carry out protocol steps until one needs user input
    fn run_steps(&mut self, mut step: ExitStep) -> SessionResult<()> {
        loop {
            step = match step {
                ExitStep::Ignored => return Ok(()),
                ExitStep::InvokeLock => {
                    self.exit.begin_lock()?;
                    self.notify_phase();

                    let outcome = lock_guarded(self.services.lock_bridge.as_ref());
                    log::info!("Device lock on exit for session {}: {:?}", self.id, outcome);
                    self.notify(SessionNotice::LockAttempted {
                        trigger: LockTrigger::Exit,
                        outcome,
                    });

                    self.exit.lock_completed(outcome)?
                }
                ExitStep::PresentDisposition => {
                    self.notify_phase();
                    self.notify(SessionNotice::DispositionRequired);
                    return Ok(());
                }
                ExitStep::Persist { name } => {
                    self.notify_phase();

                    let result = self.services.store.persist(&name, &self.collection.items);
                    if let Err(e) = &result {
                        log::warn!("Saving '{}' failed for session {}: {}", name, self.id, e);
                    }

                    self.exit.persist_completed(result)?
                }
                ExitStep::OfferRetry { reason } => {
                    self.notify(SessionNotice::SaveFailed { reason });
                    return Ok(());
                }
                ExitStep::Resume => {
                    log::info!("Exit cancelled, session {} resumes", self.id);
                    self.notify_phase();
                    self.notify(SessionNotice::Resumed);
                    return Ok(());
                }
                ExitStep::Teardown { saved } => {
                    self.teardown(saved);
                    return Ok(());
                }
            };
        }
    }

    /// Release timers, precache and secure mode; drop the in-memory items
    fn teardown(&mut self, saved: Option<CollectionId>) {
        self.timers.release();
        self.precache.clear();
        self.deletion.cancel_pending();

        if self.started {
            self.services.lock_bridge.exit_secure_mode();
        }

        self.collection.items.clear();
        log::info!("Session {} closed (exit lock {:?})", self.id, self.exit.last_lock());

        self.notify_phase();
        self.notify(SessionNotice::Exited { saved });
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.started && self.is_live() {
            log::warn!("Session {} dropped while {:?}", self.id, self.exit.phase());
            self.timers.release();
            self.services.lock_bridge.exit_secure_mode();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{images, names, saved, FakeLoader, FakeLockBridge, FakeStore};
    use std::sync::atomic::Ordering;

    fn services(bridge: &Arc<FakeLockBridge>, store: &Arc<FakeStore>) -> PlatformServices {
        PlatformServices {
            lock_bridge: bridge.clone(),
            store: store.clone(),
            loader: Arc::new(FakeLoader::default()),
        }
    }

    fn session(
        collection: Collection,
        config: SessionConfig,
        bridge: &Arc<FakeLockBridge>,
        store: &Arc<FakeStore>,
    ) -> SessionController {
        let mut controller = SessionController::new(collection, config, services(bridge, store)).unwrap();
        controller.start();
        controller.drain_notices();
        controller
    }

    fn no_confirm() -> SessionConfig {
        SessionConfig {
            confirm_removal: false,
            ..Default::default()
        }
    }

    fn exited(notices: &[SessionNotice]) -> Vec<Option<CollectionId>> {
        notices
            .iter()
            .filter_map(|n| match n {
                SessionNotice::Exited { saved } => Some(saved.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_collection_rejected() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let result = SessionController::new(images(&[]), SessionConfig::default(), services(&bridge, &store));
        assert!(matches!(result, Err(SessionError::EmptyCollection)));
    }

    #[test]
    fn test_trip_scenario() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let mut s = session(images(&["A", "B", "C"]), SessionConfig::default(), &bridge, &store);

        s.request_exit(ExitIntent::Control).unwrap();
        assert_eq!(s.phase(), PresentationPhase::AwaitingDisposition);
        assert_eq!(bridge.locks(), 1);

        s.choose(Disposition::Save { name: "Trip".into() }).unwrap();

        assert_eq!(store.persists(), 1);
        let persisted = store.persisted.lock();
        assert_eq!(persisted[0].0, "Trip");
        let saved_names: Vec<String> = persisted[0].1.iter().map(|i| i.display_name()).collect();
        assert_eq!(saved_names, vec!["A", "B", "C"]);
        drop(persisted);

        assert_eq!(s.phase(), PresentationPhase::Exiting);
        assert_eq!(bridge.locks(), 1);
        assert_eq!(exited(&s.drain_notices()), vec![Some("collection-1".to_string())]);
    }

    #[test]
    fn test_lock_precedes_disposition() {
        let bridge = FakeLockBridge::confirming();
        let store = FakeStore::new();
        let mut s = session(images(&["A", "B"]), SessionConfig::default(), &bridge, &store);

        s.request_exit(ExitIntent::Back).unwrap();
        let notices = s.drain_notices();

        let lock_at = notices
            .iter()
            .position(|n| matches!(n, SessionNotice::LockAttempted { trigger: LockTrigger::Exit, .. }))
            .unwrap();
        let dialog_at = notices
            .iter()
            .position(|n| *n == SessionNotice::DispositionRequired)
            .unwrap();
        assert!(lock_at < dialog_at);
    }

    #[test]
    fn test_discard_and_cancel_never_persist() {
        let bridge = FakeLockBridge::confirming();
        let store = FakeStore::new();
        let mut s = session(images(&["A", "B", "C"]), SessionConfig::default(), &bridge, &store);

        s.request_exit(ExitIntent::Control).unwrap();
        s.choose(Disposition::Cancel).unwrap();
        s.request_exit(ExitIntent::Control).unwrap();
        s.choose(Disposition::Discard).unwrap();

        assert_eq!(store.persists(), 0);
        assert_eq!(s.phase(), PresentationPhase::Exiting);
        assert_eq!(bridge.locks(), 2);
    }

    #[test]
    fn test_cancel_keeps_cursor_and_items() {
        for bridge in [FakeLockBridge::confirming(), FakeLockBridge::refusing(), FakeLockBridge::panicking()] {
            let store = FakeStore::new();
            let mut s = session(images(&["A", "B", "C"]), SessionConfig::default(), &bridge, &store);
            s.next().unwrap();
            s.next().unwrap();

            s.request_exit(ExitIntent::Control).unwrap();
            s.choose(Disposition::Cancel).unwrap();

            assert_eq!(s.phase(), PresentationPhase::Active);
            assert_eq!(s.cursor(), 2);
            assert_eq!(names(s.collection()), vec!["A", "B", "C"]);
            assert_eq!(bridge.locks(), 1);
        }
    }

    #[test]
    fn test_duplicate_exit_gestures_lock_once() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let mut s = session(images(&["A", "B"]), SessionConfig::default(), &bridge, &store);

        s.request_exit(ExitIntent::Control).unwrap();
        s.request_exit(ExitIntent::Back).unwrap();
        s.request_exit(ExitIntent::Immediate).unwrap();

        assert_eq!(bridge.locks(), 1);
        assert_eq!(s.phase(), PresentationPhase::AwaitingDisposition);
    }

    #[test]
    fn test_saved_collection_exits_without_dialog() {
        let bridge = FakeLockBridge::confirming();
        let store = FakeStore::new();
        let mut s = session(saved(&["A", "B"]), SessionConfig::default(), &bridge, &store);

        s.request_exit(ExitIntent::Back).unwrap();

        assert_eq!(s.phase(), PresentationPhase::Exiting);
        assert_eq!(store.persists(), 0);
        assert_eq!(bridge.secure_exits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_immediate_exit_discards() {
        let bridge = FakeLockBridge::panicking();
        let store = FakeStore::new();
        let mut s = session(images(&["A", "B"]), SessionConfig::default(), &bridge, &store);

        s.request_exit(ExitIntent::Immediate).unwrap();

        assert_eq!(s.phase(), PresentationPhase::Exiting);
        assert_eq!(bridge.locks(), 1);
        assert_eq!(store.persists(), 0);
        assert!(s.is_empty());
    }

    #[test]
    fn test_save_failure_offers_retry() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::failing_persists(1);
        let mut s = session(images(&["A", "B", "C"]), SessionConfig::default(), &bridge, &store);

        s.request_exit(ExitIntent::Control).unwrap();
        s.choose(Disposition::Save { name: "Trip".into() }).unwrap();

        assert_eq!(s.phase(), PresentationPhase::Saving);
        assert!(s.save_failure().is_some());
        assert_eq!(s.len(), 3);
        assert!(s
            .drain_notices()
            .iter()
            .any(|n| matches!(n, SessionNotice::SaveFailed { .. })));

        s.retry_save().unwrap();
        assert_eq!(s.phase(), PresentationPhase::Exiting);
        assert_eq!(store.persists(), 2);
        assert_eq!(store.persisted.lock().len(), 1);
    }

    #[test]
    fn test_save_uses_final_ordering() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let mut s = session(images(&["A", "B", "C"]), no_confirm(), &bridge, &store);

        s.request_removal(1).unwrap();
        s.request_exit(ExitIntent::Control).unwrap();
        s.choose(Disposition::Save { name: "Trip".into() }).unwrap();

        let persisted = store.persisted.lock();
        let items = &persisted[0].1;
        let labels: Vec<String> = items.iter().map(|i| i.display_name()).collect();
        assert_eq!(labels, vec!["A", "C"]);
        assert_eq!(items.iter().map(|i| i.order).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_remove_first_of_two() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let mut s = session(images(&["A", "B"]), no_confirm(), &bridge, &store);

        s.request_removal(0).unwrap();

        assert_eq!(names(s.collection()), vec!["B"]);
        assert_eq!(s.collection().items[0].order, 0);
        assert_eq!(s.cursor(), 0);
        assert_eq!(s.phase(), PresentationPhase::Active);
    }

    #[test]
    fn test_removing_last_item_ends_session() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let mut s = session(images(&["only"]), no_confirm(), &bridge, &store);

        s.remove_current().unwrap();

        let notices = s.drain_notices();
        let ended = notices.iter().filter(|n| **n == SessionNotice::SessionEnded).count();
        assert_eq!(ended, 1);
        assert_eq!(s.phase(), PresentationPhase::Exiting);
        assert!(s.timers().is_released());
        assert_eq!(bridge.secure_exits.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.locks(), 0);

        assert!(matches!(s.remove_current(), Err(SessionError::SessionClosed)));
        assert!(matches!(s.next(), Err(SessionError::SessionClosed)));
    }

    #[test]
    fn test_confirmation_gates_removal() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let mut s = session(images(&["A", "B", "C"]), SessionConfig::default(), &bridge, &store);

        s.request_removal(2).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.pending_removal(), Some(2));

        s.confirm_removal(false).unwrap();
        assert_eq!(s.len(), 3);

        s.request_removal(2).unwrap();
        s.confirm_removal(true).unwrap();
        assert_eq!(names(s.collection()), vec!["A", "B"]);
        assert_eq!(s.cursor(), 1);
    }

    #[test]
    fn test_swipe_threshold() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let config = SessionConfig {
            swipe_velocity_threshold: 1200.0,
            ..no_confirm()
        };
        let mut s = session(images(&["A", "B"]), config, &bridge, &store);

        assert!(!s.swipe(900.0).unwrap());
        assert_eq!(s.len(), 2);
        assert!(s.swipe(-1500.0).unwrap());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_decoded_negative_threshold_ignores_slow_swipe() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let config: SessionConfig =
            serde_json::from_str(r#"{"swipeVelocityThreshold": -1.0, "confirmRemoval": false}"#).unwrap();
        let mut s = session(images(&["A", "B"]), config, &bridge, &store);

        assert!(!s.swipe(0.0).unwrap());
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_saved_collection_removal_hits_store() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let collection = saved(&["A", "B", "C"]);
        let collection_id = collection.id.clone();
        let removed_id = collection.items[1].id.clone();
        let mut s = session(collection, no_confirm(), &bridge, &store);

        s.request_removal(1).unwrap();
        assert_eq!(store.removed_items.lock().clone(), vec![(collection_id, removed_id)]);

        store.fail_remove_item.store(true, Ordering::SeqCst);
        s.request_removal(0).unwrap();
        assert_eq!(names(s.collection()), vec!["A", "C"]);
        assert!(s
            .drain_notices()
            .iter()
            .any(|n| matches!(n, SessionNotice::RemovalFailed { .. })));
    }

    #[test]
    fn test_ephemeral_removal_stays_in_memory() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let mut s = session(images(&["A", "B"]), no_confirm(), &bridge, &store);

        s.request_removal(1).unwrap();
        assert!(store.removed_items.lock().is_empty());
    }

    #[test]
    fn test_timer_fires_respect_phase() {
        let bridge = FakeLockBridge::confirming();
        let store = FakeStore::new();
        let mut s = session(images(&["A", "B", "C"]), SessionConfig::default(), &bridge, &store);

        s.on_timer(TimerFire::AdvanceTick);
        assert_eq!(s.cursor(), 1);

        s.on_timer(TimerFire::AutoLockElapsed);
        assert_eq!(bridge.locks(), 1);
        assert_eq!(s.phase(), PresentationPhase::Active);

        s.request_exit(ExitIntent::Control).unwrap();
        s.on_timer(TimerFire::AdvanceTick);
        s.on_timer(TimerFire::AutoLockElapsed);
        assert_eq!(s.cursor(), 1);
        assert_eq!(bridge.locks(), 2);

        s.choose(Disposition::Discard).unwrap();
        s.on_timer(TimerFire::AdvanceTick);
        assert_eq!(bridge.locks(), 2);
    }

    #[test]
    fn test_tick_paused_by_pending_confirmation() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let mut s = session(images(&["A", "B", "C"]), SessionConfig::default(), &bridge, &store);

        s.request_removal(0).unwrap();
        s.on_timer(TimerFire::AdvanceTick);
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn test_slides_and_counter() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let mut collection = images(&["ok.jpg", "broken.jpg", "gone.mp4"]);
        collection.items[2].kind = MediaKind::Video;

        let services = PlatformServices {
            lock_bridge: bridge.clone(),
            store: store.clone(),
            loader: Arc::new(FakeLoader::failing_on("broken.jpg")),
        };
        let mut s = SessionController::new(collection, SessionConfig::default(), services).unwrap();
        s.start();

        assert!(matches!(s.current_slide(), Some(Slide::Image(_))));
        assert_eq!(s.position_label().as_deref(), Some("1 / 3"));

        s.next().unwrap();
        assert!(matches!(s.current_slide(), Some(Slide::Unavailable { .. })));

        s.next().unwrap();
        assert!(matches!(s.current_slide(), Some(Slide::Unavailable { .. })));
        assert_eq!(s.position_label().as_deref(), Some("3 / 3"));
    }

    #[test]
    fn test_navigation_blocked_during_dialog() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let mut s = session(images(&["A", "B"]), SessionConfig::default(), &bridge, &store);

        s.request_exit(ExitIntent::Control).unwrap();
        assert!(matches!(s.next(), Err(SessionError::InvalidTransition { .. })));
        assert!(matches!(s.request_removal(0), Err(SessionError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_capability_requested_when_missing() {
        let bridge = FakeLockBridge::refusing();
        let store = FakeStore::new();
        let config = SessionConfig {
            auto_lock_enabled: true,
            ..Default::default()
        };
        let mut s = SessionController::new(images(&["A"]), config, services(&bridge, &store)).unwrap();
        s.start();

        assert_eq!(bridge.capability_requests.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.secure_enters.load(Ordering::SeqCst), 1);
        assert!(s.timers().is_auto_lock_pending());
        assert!(s
            .drain_notices()
            .contains(&SessionNotice::AutoLockCapabilityRequested));

        s.shutdown().unwrap();
        assert!(s.timers().is_released());
    }
}
