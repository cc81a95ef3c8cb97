//! # ALFA Slideshow
//!
//! Secure full-screen presentation of photo/video collections. Leaving a
//! presentation always attempts to lock the device first, so whoever holds
//! the phone after a slideshow cannot browse the rest of it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      ALFA SLIDESHOW                       │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────┐  │
//! │  │ NAVIGATION  │  │  DELETION   │  │  EXIT PROTOCOL   │  │
//! │  │ cyclic + PC │  │ dense order │  │ lock → dialog    │  │
//! │  └──────┬──────┘  └──────┬──────┘  └────────┬─────────┘  │
//! │         │                │                   │            │
//! │  ┌──────┴────────────────┴───────────────────┴─────────┐  │
//! │  │            SESSION CONTROLLER (one owner)            │  │
//! │  │      timers ─ commands ─ notices (SessionRuntime)    │  │
//! │  └──────┬────────────────┬───────────────────┬─────────┘  │
//! │         │                │                   │            │
//! │  ┌──────┴──────┐  ┌──────┴──────┐  ┌─────────┴────────┐  │
//! │  │ LOCK BRIDGE │  │  STORE      │  │  PREVIEW ENGINE  │  │
//! │  │ JNI / cmd   │  │  SQLite     │  │  decode + fit    │  │
//! │  └─────────────┘  └─────────────┘  └──────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Every exit attempt calls the device lock exactly once, before any dialog
//! - Cancel resumes with cursor and items untouched
//! - Discard and Cancel never write to the store
//! - Item orders stay dense `0..n` after every removal
//! - No timer fires into a torn-down session

pub mod bridge;
pub mod deletion;
pub mod error;
pub mod exit;
pub mod media;
pub mod navigation;
pub mod precache;
pub mod preview;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod source;
pub mod store;
pub mod timers;

#[cfg(feature = "android")]
pub mod android;

#[cfg(test)]
mod testing;

pub use bridge::{platform_bridge, LockBridge, LockOutcome};
pub use error::{SessionError, SessionResult};
pub use exit::{Disposition, ExitIntent, PresentationPhase};
pub use media::{Collection, MediaItem, MediaKind};
pub use preview::PreviewEngine;
pub use runtime::{SessionCommand, SessionEvent, SessionHandle, SessionRuntime};
pub use session::{PlatformServices, SessionController, SessionNotice, Slide};
pub use settings::SessionConfig;
pub use source::MediaSource;
pub use store::{CollectionStore, SqliteCollectionStore};

/// ALFA Slideshow version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// ALFA Slideshow signature
pub const SIGNATURE: &str = "ALFA_SLIDESHOW_v1";
