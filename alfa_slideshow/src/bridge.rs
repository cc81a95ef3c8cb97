//! ALFA Slideshow - Device Lock Bridge
//!
//! Platform capability to enter/leave a secure display mode and to lock the
//! device. Implementations never fail towards the caller: any platform error
//! is reported as "lock not confirmed".

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process::{Command, Stdio};
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Result of a device lock request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockOutcome {
    /// Platform confirmed the lock
    Confirmed,
    /// Unsupported, refused or failed
    NotConfirmed,
}

impl LockOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, LockOutcome::Confirmed)
    }
}

impl From<bool> for LockOutcome {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            LockOutcome::Confirmed
        } else {
            LockOutcome::NotConfirmed
        }
    }
}

/// Platform device-security capability
pub trait LockBridge: Send + Sync {
    /// Begin immersive/secure display
    fn enter_secure_mode(&self);

    /// Restore normal display
    fn exit_secure_mode(&self);

    /// Request an immediate device lock; `true` = confirmed
    fn lock(&self) -> bool;

    /// Whether the permission needed by `lock` is granted
    fn is_auto_lock_capable(&self) -> bool;

    /// Start the user-driven permission flow (fire-and-forget)
    fn request_auto_lock_capability(&self);
}

/// Invoke `lock` so that nothing escapes to the caller
pub fn lock_guarded(bridge: &dyn LockBridge) -> LockOutcome {
    match catch_unwind(AssertUnwindSafe(|| bridge.lock())) {
        Ok(confirmed) => LockOutcome::from(confirmed),
        Err(_) => {
            log::warn!("Lock bridge panicked, treating lock as not confirmed");
            LockOutcome::NotConfirmed
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// UNSUPPORTED PLATFORM
// ═══════════════════════════════════════════════════════════════════════════════

/// Bridge for platforms without a lock capability
#[derive(Debug, Default)]
pub struct UnsupportedLockBridge;

impl LockBridge for UnsupportedLockBridge {
    fn enter_secure_mode(&self) {
        log::debug!("Secure mode not supported on this platform");
    }

    fn exit_secure_mode(&self) {}

    fn lock(&self) -> bool {
        log::info!("Device lock not supported on this platform");
        false
    }

    fn is_auto_lock_capable(&self) -> bool {
        false
    }

    fn request_auto_lock_capability(&self) {}
}

// ═══════════════════════════════════════════════════════════════════════════════
// DESKTOP (SCREEN LOCK COMMAND)
// ═══════════════════════════════════════════════════════════════════════════════

/// Desktop bridge running the platform screen-lock command
#[derive(Debug, Clone)]
pub struct CommandLockBridge {
    program: String,
    args: Vec<String>,
}

impl CommandLockBridge {
    /// Use a specific lock command
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Default screen-lock command for the current OS, if any
    pub fn detect() -> Option<Self> {
        if cfg!(target_os = "linux") {
            Some(Self::new("loginctl", vec!["lock-session".into()]))
        } else if cfg!(target_os = "macos") {
            Some(Self::new("pmset", vec!["displaysleepnow".into()]))
        } else if cfg!(target_os = "windows") {
            Some(Self::new("rundll32.exe", vec!["user32.dll,LockWorkStation".into()]))
        } else {
            None
        }
    }

    /// Run the command to completion. On a multi-threaded runtime the wait
    /// moves off the worker so other tasks keep running.
    fn run(&self) -> std::io::Result<bool> {
        let status = || {
            Command::new(&self.program)
                .args(&self.args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
        };

        let status = match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(status)?
            }
            _ => status()?,
        };
        Ok(status.success())
    }
}

impl LockBridge for CommandLockBridge {
    fn enter_secure_mode(&self) {}

    fn exit_secure_mode(&self) {}

    fn lock(&self) -> bool {
        match self.run() {
            Ok(true) => {
                log::info!("Screen locked via {}", self.program);
                true
            }
            Ok(false) => {
                log::warn!("{} reported failure", self.program);
                false
            }
            Err(e) => {
                log::warn!("Cannot run {}: {}", self.program, e);
                false
            }
        }
    }

    fn is_auto_lock_capable(&self) -> bool {
        true
    }

    fn request_auto_lock_capability(&self) {}
}

/// Best bridge for the current platform
pub fn platform_bridge() -> Arc<dyn LockBridge> {
    match CommandLockBridge::detect() {
        Some(bridge) => Arc::new(bridge),
        None => Arc::new(UnsupportedLockBridge),
    }
}
