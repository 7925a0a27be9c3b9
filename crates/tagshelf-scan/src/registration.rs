//! Tag registration handle.

use crate::{HardwareReaderPort, ReaderError};

/// Tracks the single active tag registration.
///
/// Disposing is idempotent: only the first `dispose` after a `bind` reaches
/// the driver.
#[derive(Debug, Default)]
pub(crate) struct Registration {
    generation: Option<u64>,
}

impl Registration {
    /// Record that the driver accepted a registration for `generation`.
    pub fn bind(&mut self, generation: u64) {
        debug_assert!(self.generation.is_none(), "registration already active");
        self.generation = Some(generation);
    }

    pub fn is_active(&self) -> bool {
        self.generation.is_some()
    }

    /// Forget the active registration without calling the driver.
    pub fn clear(&mut self) {
        self.generation = None;
    }

    /// Unregister from the driver if a registration is active.
    ///
    /// Returns `None` when there was nothing to release.
    pub async fn dispose<R: HardwareReaderPort>(
        &mut self,
        reader: &R,
    ) -> Option<Result<u64, ReaderError>> {
        let generation = self.generation.take()?;
        Some(reader.unregister_for_tag().await.map(|()| generation))
    }
}
