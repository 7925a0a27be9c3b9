//! Scan session state.

use std::fmt;

use serde::{Deserialize, Serialize};
use tagshelf_core::TagId;
use tokio::time::Instant;

/// Why a scan session ended without a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum ScanErrorKind {
    /// Device has no NFC reader.
    NotSupported,
    /// Reader exists but its radio is switched off.
    NotEnabled,
    /// Driver failed to start or register for tags.
    InitError,
    /// No tag arrived before the timeout.
    Timeout,
    /// Cleanup failed. Logged only, never reported to observers.
    TeardownError,
}

impl ScanErrorKind {
    /// Whether retrying (after a reset) can succeed.
    pub fn is_recoverable(self) -> bool {
        !matches!(self, Self::NotSupported)
    }

    /// Message suitable for showing to a user. `TeardownError` is never shown
    /// and its message goes to the warning log instead.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::NotSupported => "NFC is not available on this device.",
            Self::NotEnabled => "NFC is disabled. Turn it on and try again.",
            Self::InitError => {
                "Failed to initialize NFC. Reset the reader and scan again."
            }
            Self::Timeout => "Scan timed out. Please try again.",
            Self::TeardownError => {
                "Failed to release the NFC reader; the next reset retries."
            }
        }
    }
}

/// Lifecycle state of a scan session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanStatus {
    #[default]
    Idle,
    CheckingAvailability,
    Scanning,
    TagFound,
    TimedOut,
    Failed(ScanErrorKind),
}

impl ScanStatus {
    /// Session has ended and needs `start()` or `reset()` to continue.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::TagFound | Self::TimedOut | Self::Failed(_))
    }

    /// Session is in progress.
    pub fn is_active(self) -> bool {
        matches!(self, Self::CheckingAvailability | Self::Scanning)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::CheckingAvailability => write!(f, "Checking availability"),
            Self::Scanning => write!(f, "Scanning"),
            Self::TagFound => write!(f, "Tag found"),
            Self::TimedOut => write!(f, "Timed out"),
            Self::Failed(kind) => write!(f, "Failed ({kind})"),
        }
    }
}

/// Snapshot of the current (or last) scan session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSession {
    /// Current state.
    pub status: ScanStatus,
    /// Generation token. Bumped by every start and reset.
    pub generation: u64,
    /// When the reader began listening for tags.
    pub started_at: Option<Instant>,
    /// When the session will time out (`started_at + timeout`).
    pub timeout_at: Option<Instant>,
    /// Last error reported for this session.
    pub last_error: Option<ScanErrorKind>,
    /// Tag discovered by this session.
    pub tag: Option<TagId>,
}

impl ScanSession {
    /// Fresh idle session at `generation`.
    pub(crate) fn idle(generation: u64) -> Self {
        Self {
            generation,
            ..Default::default()
        }
    }

    /// Time left before the timeout fires.
    pub fn remaining(&self, now: Instant) -> Option<std::time::Duration> {
        self.timeout_at
            .filter(|_| self.status == ScanStatus::Scanning)
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}
