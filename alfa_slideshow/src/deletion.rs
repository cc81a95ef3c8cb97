//! ALFA Slideshow - Deletion Engine
//!
//! Removes items from the presented collection, keeping orders dense and the
//! cursor on a valid item. A session never continues with zero items.

use crate::error::{SessionError, SessionResult};
use crate::media::{Collection, MediaItem};
use crate::settings::SessionConfig;

/// Removal gating, taken from the session settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeletionPolicy {
    /// Ask before removing
    pub confirm_removal: bool,
    /// Vertical swipe may remove the current item
    pub swipe_enabled: bool,
    /// Minimum vertical velocity for the swipe to count
    pub velocity_threshold: f32,
}

impl From<&SessionConfig> for DeletionPolicy {
    fn from(config: &SessionConfig) -> Self {
        Self {
            confirm_removal: config.confirm_removal,
            swipe_enabled: config.swipe_to_delete_enabled,
            velocity_threshold: config.swipe_velocity(),
        }
    }
}

/// What to do with a removal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalRequest {
    /// Show yes/no first
    AwaitingConfirmation { index: usize },
    /// Remove right away
    Proceed { index: usize },
}

/// Result of removing one item
#[derive(Debug, Clone, PartialEq)]
pub enum RemovalOutcome {
    /// Items remain; land on `cursor` without animation
    Removed { removed: MediaItem, cursor: usize },
    /// The last item is gone, the session must end
    SessionEnded { removed: MediaItem },
}

/// Deletion engine
#[derive(Debug, Clone)]
pub struct DeletionEngine {
    policy: DeletionPolicy,
    /// Index waiting for confirmation
    pending: Option<usize>,
}

impl DeletionEngine {
    pub fn new(policy: DeletionPolicy) -> Self {
        Self {
            policy,
            pending: None,
        }
    }

    pub fn policy(&self) -> &DeletionPolicy {
        &self.policy
    }

    /// Does a vertical swipe at this velocity count as a removal gesture?
    pub fn recognizes_swipe(&self, velocity: f32) -> bool {
        self.policy.swipe_enabled && velocity.abs() >= self.policy.velocity_threshold
    }

    /// Gate a removal behind confirmation when enabled
    pub fn request(&mut self, index: usize) -> RemovalRequest {
        if self.policy.confirm_removal {
            self.pending = Some(index);
            RemovalRequest::AwaitingConfirmation { index }
        } else {
            RemovalRequest::Proceed { index }
        }
    }

    /// Index awaiting confirmation, if any
    pub fn pending(&self) -> Option<usize> {
        self.pending
    }

    /// Answer the confirmation; returns the index to remove on yes
    pub fn resolve(&mut self, accepted: bool) -> Option<usize> {
        let index = self.pending.take()?;
        if accepted {
            Some(index)
        } else {
            None
        }
    }

    /// Drop any pending confirmation
    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    /// Remove the item at `index`
    pub fn remove(collection: &mut Collection, index: usize) -> SessionResult<RemovalOutcome> {
        let len = collection.len();
        if index >= len {
            return Err(SessionError::IndexOutOfRange { index, len });
        }

        let removed = collection
            .remove_at(index)
            .ok_or(SessionError::IndexOutOfRange { index, len })?;

        if len == 1 {
            return Ok(RemovalOutcome::SessionEnded { removed });
        }

        Ok(RemovalOutcome::Removed {
            removed,
            cursor: index.min(len - 2),
        })
    }
}
