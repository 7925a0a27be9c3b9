//! In-process reader used by the CLI and by tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::{HardwareReaderPort, ReaderError, ReaderOp, Tag, TagSink};

/// A scriptable stand-in for a hardware NFC reader.
///
/// Clones share state, so a test can keep one clone to present tags and
/// inspect call counts while the controller owns another.
#[derive(Debug, Clone)]
pub struct SimulatedReader {
    state: Arc<Mutex<SimState>>,
}

#[derive(Debug)]
struct SimState {
    supported: bool,
    enabled: bool,
    started: bool,
    latency: Duration,
    sink: Option<TagSink>,
    failures: HashSet<ReaderOp>,
    calls: HashMap<ReaderOp, usize>,
    in_flight: usize,
    peak_in_flight: usize,
    overlapping_registrations: usize,
    sticky_listener: bool,
}

impl Default for SimulatedReader {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedReader {
    /// A supported, enabled reader that answers instantly.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                supported: true,
                enabled: true,
                started: false,
                latency: Duration::ZERO,
                sink: None,
                failures: HashSet::new(),
                calls: HashMap::new(),
                in_flight: 0,
                peak_in_flight: 0,
                overlapping_registrations: 0,
                sticky_listener: false,
            })),
        }
    }

    /// A device without NFC hardware.
    pub fn unsupported() -> Self {
        let reader = Self::new();
        reader.set_supported(false);
        reader
    }

    /// Make every call take `latency` to complete.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    pub fn set_supported(&self, supported: bool) {
        self.lock().supported = supported;
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.lock().enabled = enabled;
    }

    /// Make `op` fail until [`Self::clear_failures`] is called.
    pub fn fail_on(&self, op: ReaderOp) {
        self.lock().failures.insert(op);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// When set, a failed `unregister_for_tag` leaves the listener in place,
    /// as some drivers do.
    pub fn set_sticky_listener(&self, sticky: bool) {
        self.lock().sticky_listener = sticky;
    }

    /// Simulate a tag tap. Returns `false` when nobody is registered.
    pub fn present_tag(&self, id: impl Into<String>) -> bool {
        let sink = self.lock().sink.clone();
        match sink {
            Some(sink) => sink.deliver(Tag::new(id)),
            None => false,
        }
    }

    /// The sink of the current registration, if any.
    pub fn current_sink(&self) -> Option<TagSink> {
        self.lock().sink.clone()
    }

    pub fn is_registered(&self) -> bool {
        self.lock().sink.is_some()
    }

    /// Number of times `op` was called.
    pub fn calls(&self, op: ReaderOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Highest number of calls that were outstanding at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.lock().peak_in_flight
    }

    /// Registrations attempted while another was still active.
    pub fn overlapping_registrations(&self) -> usize {
        self.lock().overlapping_registrations
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panic while holding the lock only happens in a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a call, wait out the latency, then report any injected failure.
    async fn call(&self, op: ReaderOp) -> Result<(), ReaderError> {
        let latency = {
            let mut state = self.lock();
            *state.calls.entry(op).or_insert(0) += 1;
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
            state.latency
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        state.in_flight -= 1;
        if state.failures.contains(&op) {
            return Err(ReaderError::driver(op, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl HardwareReaderPort for SimulatedReader {
    async fn is_supported(&self) -> Result<bool, ReaderError> {
        self.call(ReaderOp::IsSupported).await?;
        Ok(self.lock().supported)
    }

    async fn is_enabled(&self) -> Result<bool, ReaderError> {
        self.call(ReaderOp::IsEnabled).await?;
        Ok(self.lock().enabled)
    }

    async fn start(&self) -> Result<(), ReaderError> {
        self.call(ReaderOp::Start).await?;
        let mut state = self.lock();
        if !state.enabled {
            return Err(ReaderError::driver(ReaderOp::Start, "radio is off"));
        }
        state.started = true;
        Ok(())
    }

    async fn register_for_tag(&self, sink: TagSink) -> Result<(), ReaderError> {
        self.call(ReaderOp::RegisterForTag).await?;
        let mut state = self.lock();
        if !state.started {
            return Err(ReaderError::NotStarted);
        }
        if state.sink.is_some() {
            state.overlapping_registrations += 1;
            return Err(ReaderError::AlreadyRegistered);
        }
        state.sink = Some(sink);
        Ok(())
    }

    async fn unregister_for_tag(&self) -> Result<(), ReaderError> {
        let result = self.call(ReaderOp::UnregisterForTag).await;
        let mut state = self.lock();
        if result.is_ok() || !state.sticky_listener {
            state.sink = None;
        }
        result
    }

    async fn cancel_pending_request(&self) -> Result<(), ReaderError> {
        self.call(ReaderOp::CancelPendingRequest).await
    }
}
