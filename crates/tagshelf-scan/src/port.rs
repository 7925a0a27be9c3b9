//! Hardware reader port consumed by the scan controller.

use async_trait::async_trait;
use strum::{Display, EnumIter};
use thiserror::Error;
use tokio::sync::mpsc;

/// A tag as reported by the reader driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Raw identifier (usually the hex UID).
    pub id: String,
    /// Technologies the driver detected (e.g. `NfcA`, `Ndef`).
    pub tech_types: Vec<String>,
}

impl Tag {
    /// Create a tag with just an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tech_types: Vec::new(),
        }
    }
}

/// Individual reader calls, used for logging and by test doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ReaderOp {
    #[strum(to_string = "is_supported")]
    IsSupported,
    #[strum(to_string = "is_enabled")]
    IsEnabled,
    #[strum(to_string = "start")]
    Start,
    #[strum(to_string = "register_for_tag")]
    RegisterForTag,
    #[strum(to_string = "unregister_for_tag")]
    UnregisterForTag,
    #[strum(to_string = "cancel_pending_request")]
    CancelPendingRequest,
}

/// Errors reported by a reader driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReaderError {
    /// The driver rejected the call.
    #[error("{op} failed: {message}")]
    Driver { op: ReaderOp, message: String },

    /// A tag registration is already active.
    #[error("A tag registration is already active")]
    AlreadyRegistered,

    /// The reader session has not been started.
    #[error("Reader session is not started")]
    NotStarted,
}

impl ReaderError {
    /// Create a driver error for `op`.
    pub fn driver(op: ReaderOp, message: impl Into<String>) -> Self {
        Self::Driver {
            op,
            message: message.into(),
        }
    }
}

/// Where a driver delivers discovered tags.
///
/// Each sink is stamped with the session generation it was handed out for,
/// so deliveries that arrive after the session was superseded are dropped by
/// the controller instead of being acted on.
#[derive(Debug, Clone)]
pub struct TagSink {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, Tag)>,
}

impl TagSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, Tag)>) -> Self {
        Self { generation, tx }
    }

    /// Hand a discovered tag to the controller.
    ///
    /// Returns `false` if the controller has shut down.
    pub fn deliver(&self, tag: Tag) -> bool {
        self.tx.send((self.generation, tag)).is_ok()
    }

    /// Session generation this sink belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Capabilities of the device's NFC reader.
///
/// All calls may suspend. The controller never issues two calls at once.
#[async_trait]
pub trait HardwareReaderPort: Send + Sync + 'static {
    /// Whether the device has an NFC reader at all.
    async fn is_supported(&self) -> Result<bool, ReaderError>;

    /// Whether the reader radio is switched on.
    async fn is_enabled(&self) -> Result<bool, ReaderError> {
        Ok(true)
    }

    /// Start (or re-start) the driver session.
    async fn start(&self) -> Result<(), ReaderError>;

    /// Register for tag discovery. Tags must be delivered to `sink`.
    async fn register_for_tag(&self, sink: TagSink) -> Result<(), ReaderError>;

    /// Drop the current tag registration.
    async fn unregister_for_tag(&self) -> Result<(), ReaderError>;

    /// Cancel any in-flight technology request.
    async fn cancel_pending_request(&self) -> Result<(), ReaderError>;
}
