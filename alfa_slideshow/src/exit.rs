//! ALFA Slideshow - Exit Protocol
//!
//! Sequences an exit: device lock first, then (for unsaved collections) the
//! save/discard/cancel choice, then teardown.
//!
//! ```text
//! Active ──exit──▶ ExitRequested ──▶ Locking ──┬─ immediate ─────────────▶ Exiting
//!   ▲                                          ├─ saved collection ──────▶ Exiting
//!   │                                          └─ ephemeral ─▶ AwaitingDisposition
//!   └──────────────── cancel ─────────────────────────────────────┤
//!                                     Exiting ◀── discard ────────┤
//!                                     Exiting ◀── ok ── Saving ◀──┘ save
//!                                                        │ ▲
//!                                                        └─┘ failed → retry
//! ```
//!
//! The protocol is pure: it never touches the platform. Each transition
//! returns an `ExitStep` telling the caller what to do next.

use serde::{Deserialize, Serialize};

use crate::bridge::LockOutcome;
use crate::error::{SessionError, SessionResult};
use crate::media::CollectionId;
use crate::store::validate_name;

/// Presentation lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationPhase {
    Active,
    ExitRequested,
    Locking,
    AwaitingDisposition,
    Saving,
    Exiting,
}

impl PresentationPhase {
    /// Between an exit request and its resolution
    pub fn is_exit_in_progress(&self) -> bool {
        matches!(
            self,
            Self::ExitRequested | Self::Locking | Self::AwaitingDisposition | Self::Saving
        )
    }
}

/// Gesture that asked for the exit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitIntent {
    /// Exit control tapped
    Control,
    /// System back navigation
    Back,
    /// Secure long-press: lock and leave, no questions
    Immediate,
}

/// User's choice for an unsaved collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Disposition {
    Save { name: String },
    Discard,
    Cancel,
}

/// What the caller must do after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStep {
    /// Duplicate exit gesture, nothing happened
    Ignored,
    /// Call `LockBridge::lock` and report via `lock_completed`
    InvokeLock,
    /// Show Save / Discard / Cancel
    PresentDisposition,
    /// Call `CollectionStore::persist` and report via `persist_completed`
    Persist { name: String },
    /// Persist failed; offer retry or discard
    OfferRetry { reason: String },
    /// Back to the presentation
    Resume,
    /// Release everything and leave
    Teardown { saved: Option<CollectionId> },
}

/// Exit state machine
#[derive(Debug, Clone)]
pub struct ExitProtocol {
    phase: PresentationPhase,
    /// Collection was never persisted
    ephemeral: bool,
    /// Intent of the exit attempt in progress
    intent: Option<ExitIntent>,
    /// Name being saved under
    save_name: Option<String>,
    /// Last persistence failure while Saving
    save_failure: Option<String>,
    /// Outcome of the last lock attempt
    last_lock: Option<LockOutcome>,
}

impl ExitProtocol {
    pub fn new(ephemeral: bool) -> Self {
        Self {
            phase: PresentationPhase::Active,
            ephemeral,
            intent: None,
            save_name: None,
            save_failure: None,
            last_lock: None,
        }
    }

    pub fn phase(&self) -> PresentationPhase {
        self.phase
    }

    pub fn intent(&self) -> Option<ExitIntent> {
        self.intent
    }

    pub fn last_lock(&self) -> Option<LockOutcome> {
        self.last_lock
    }

    pub fn save_failure(&self) -> Option<&str> {
        self.save_failure.as_deref()
    }

    fn transition(&mut self, to: PresentationPhase) {
        log::debug!("Exit protocol: {:?} -> {:?}", self.phase, to);
        self.phase = to;
    }

    fn expect(&self, phase: PresentationPhase, action: &'static str) -> SessionResult<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                phase: self.phase,
                action,
            })
        }
    }

    fn teardown(&mut self, saved: Option<CollectionId>) -> ExitStep {
        self.transition(PresentationPhase::Exiting);
        ExitStep::Teardown { saved }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // EXIT + LOCK
    // ═══════════════════════════════════════════════════════════════════════

    /// Active → ExitRequested. Ignored while another exit is in flight.
    pub fn request_exit(&mut self, intent: ExitIntent) -> ExitStep {
        if self.phase != PresentationPhase::Active {
            log::debug!("Ignoring {:?} exit while {:?}", intent, self.phase);
            return ExitStep::Ignored;
        }

        self.intent = Some(intent);
        self.last_lock = None;
        self.transition(PresentationPhase::ExitRequested);
        ExitStep::InvokeLock
    }

    /// ExitRequested → Locking, right before the platform call
    pub fn begin_lock(&mut self) -> SessionResult<()> {
        self.expect(PresentationPhase::ExitRequested, "begin lock")?;
        self.transition(PresentationPhase::Locking);
        Ok(())
    }

    /// Locking → AwaitingDisposition | Exiting. The outcome never changes the path.
    pub fn lock_completed(&mut self, outcome: LockOutcome) -> SessionResult<ExitStep> {
        self.expect(PresentationPhase::Locking, "complete lock")?;
        self.last_lock = Some(outcome);

        if self.intent == Some(ExitIntent::Immediate) || !self.ephemeral {
            return Ok(self.teardown(None));
        }

        self.transition(PresentationPhase::AwaitingDisposition);
        Ok(ExitStep::PresentDisposition)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // DISPOSITION
    // ═══════════════════════════════════════════════════════════════════════

    /// Apply the user's Save / Discard / Cancel
    pub fn choose(&mut self, disposition: Disposition) -> SessionResult<ExitStep> {
        self.expect(PresentationPhase::AwaitingDisposition, "choose disposition")?;

        match disposition {
            Disposition::Discard => Ok(self.teardown(None)),
            Disposition::Cancel => {
                self.intent = None;
                self.transition(PresentationPhase::Active);
                Ok(ExitStep::Resume)
            }
            Disposition::Save { name } => {
                let name = validate_name(&name)?;
                self.save_name = Some(name.clone());
                self.save_failure = None;
                self.transition(PresentationPhase::Saving);
                Ok(ExitStep::Persist { name })
            }
        }
    }

    /// Saving → Exiting on success; stays Saving on failure
    pub fn persist_completed(
        &mut self,
        result: SessionResult<CollectionId>,
    ) -> SessionResult<ExitStep> {
        self.expect(PresentationPhase::Saving, "complete save")?;

        match result {
            Ok(id) => {
                self.save_failure = None;
                self.ephemeral = false;
                Ok(self.teardown(Some(id)))
            }
            Err(e) => {
                let reason = e.to_string();
                self.save_failure = Some(reason.clone());
                Ok(ExitStep::OfferRetry { reason })
            }
        }
    }

    /// Retry a failed save under the same name
    pub fn retry_save(&mut self) -> SessionResult<ExitStep> {
        self.expect(PresentationPhase::Saving, "retry save")?;
        if self.save_failure.is_none() {
            return Err(SessionError::InvalidTransition {
                phase: self.phase,
                action: "retry a save that has not failed",
            });
        }

        let name = self.save_name.clone().ok_or(SessionError::InvalidCollectionName)?;
        self.save_failure = None;
        Ok(ExitStep::Persist { name })
    }

    /// Give up on a failed save and leave without persisting
    pub fn discard_unsaved(&mut self) -> SessionResult<ExitStep> {
        self.expect(PresentationPhase::Saving, "discard after failed save")?;
        if self.save_failure.is_none() {
            return Err(SessionError::InvalidTransition {
                phase: self.phase,
                action: "discard while a save is running",
            });
        }
        Ok(self.teardown(None))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ABNORMAL END
    // ═══════════════════════════════════════════════════════════════════════

    /// Leave from any phase (collection emptied, host shutdown)
    pub fn abort(&mut self) -> ExitStep {
        if self.phase == PresentationPhase::Exiting {
            return ExitStep::Ignored;
        }
        self.teardown(None)
    }
}
