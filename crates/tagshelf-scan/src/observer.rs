//! Callbacks the controller uses to report session progress.

use tagshelf_core::TagId;
use tokio::sync::mpsc;

use crate::{ScanErrorKind, ScanStatus};

/// Receives session events. Every method defaults to a no-op.
///
/// Callbacks run on the controller task and must not block.
pub trait ScanObserver: Send + 'static {
    /// A tag was read. The session is already in `TagFound`.
    fn on_tag_discovered(&mut self, _tag_id: &TagId) {}

    /// The session failed or timed out.
    fn on_error(&mut self, _kind: ScanErrorKind) {}

    /// The session moved to a new state.
    fn on_state_change(&mut self, _status: ScanStatus) {}
}

impl ScanObserver for () {}

/// Session events as a value, for channel-based consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    StateChanged(ScanStatus),
    TagDiscovered(TagId),
    Error(ScanErrorKind),
}

impl ScanObserver for mpsc::UnboundedSender<ScanEvent> {
    fn on_tag_discovered(&mut self, tag_id: &TagId) {
        let _ = self.send(ScanEvent::TagDiscovered(tag_id.clone()));
    }

    fn on_error(&mut self, kind: ScanErrorKind) {
        let _ = self.send(ScanEvent::Error(kind));
    }

    fn on_state_change(&mut self, status: ScanStatus) {
        let _ = self.send(ScanEvent::StateChanged(status));
    }
}
