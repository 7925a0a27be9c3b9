//! Scan session controller.
//!
//! The controller runs as a single tokio task that owns the reader. Commands
//! from the handle, tag deliveries from the driver and the session timeout
//! are multiplexed on that task, so reader calls are strictly sequential and
//! whichever of tag/timeout resolves first wins.

use tagshelf_core::{ScanConfig, TagId};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until};

use crate::registration::Registration;
use crate::{
    HardwareReaderPort, ScanErrorKind, ScanObserver, ScanSession, ScanStatus, Tag, TagSink,
};

/// Errors returned by [`ScanSessionController`] calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// The controller task is no longer running.
    #[error("Scan controller has shut down")]
    Closed,
}

enum Command {
    Start(oneshot::Sender<ScanStatus>),
    Reset(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a running scan session controller.
///
/// Dropping the handle stops the controller after releasing any active
/// registration.
pub struct ScanSessionController {
    commands: mpsc::UnboundedSender<Command>,
    session: watch::Receiver<ScanSession>,
    task: JoinHandle<()>,
}

impl ScanSessionController {
    /// Spawn a controller on the current tokio runtime.
    pub fn spawn<R, O>(reader: R, observer: O, config: ScanConfig) -> Self
    where
        R: HardwareReaderPort,
        O: ScanObserver,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (session_tx, session) = watch::channel(ScanSession::default());
        let (tags_tx, tags_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            reader,
            observer,
            config,
            session: ScanSession::default(),
            session_tx,
            tags_tx,
            tags_rx,
            registration: Registration::default(),
            deadline: None,
        };
        let task = tokio::spawn(driver.run(command_rx));

        Self {
            commands,
            session,
            task,
        }
    }

    /// Begin a fresh session.
    ///
    /// Any session in progress is stopped first. Resolves once the session has
    /// either started listening for tags or failed, and returns that status.
    pub async fn start(&self) -> Result<ScanStatus, ControllerError> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Start(ack))?;
        done.await.map_err(|_| ControllerError::Closed)
    }

    /// Hard reset: release the reader, wait for it to settle and go `Idle`.
    pub async fn reset(&self) -> Result<(), ControllerError> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Reset(ack))?;
        done.await.map_err(|_| ControllerError::Closed)
    }

    /// Current session status.
    pub fn status(&self) -> ScanStatus {
        self.session.borrow().status
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> ScanSession {
        self.session.borrow().clone()
    }

    /// Watch session snapshots as they change.
    pub fn subscribe(&self) -> watch::Receiver<ScanSession> {
        self.session.clone()
    }

    /// Stop the controller, releasing any active registration.
    pub async fn shutdown(self) -> Result<(), ControllerError> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Shutdown(ack))?;
        done.await.map_err(|_| ControllerError::Closed)?;
        self.task.await.map_err(|_| ControllerError::Closed)
    }

    fn send(&self, command: Command) -> Result<(), ControllerError> {
        self.commands
            .send(command)
            .map_err(|_| ControllerError::Closed)
    }
}

impl std::fmt::Debug for ScanSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSessionController")
            .field("session", &*self.session.borrow())
            .finish_non_exhaustive()
    }
}

/// State owned by the controller task.
struct Driver<R, O> {
    reader: R,
    observer: O,
    config: ScanConfig,
    session: ScanSession,
    session_tx: watch::Sender<ScanSession>,
    tags_tx: mpsc::UnboundedSender<(u64, Tag)>,
    tags_rx: mpsc::UnboundedReceiver<(u64, Tag)>,
    registration: Registration,
    deadline: Option<Instant>,
}

impl<R: HardwareReaderPort, O: ScanObserver> Driver<R, O> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Start(ack)) => {
                        self.start_session().await;
                        let _ = ack.send(self.session.status);
                    }
                    Some(Command::Reset(ack)) => {
                        self.hard_reset().await;
                        let _ = ack.send(());
                    }
                    Some(Command::Shutdown(ack)) => {
                        self.stop().await;
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        self.stop().await;
                        break;
                    }
                },
                Some((generation, tag)) = self.tags_rx.recv() => {
                    self.on_tag(generation, tag).await;
                }
                () = wait_until(self.deadline) => {
                    self.on_timeout().await;
                }
            }
        }
        tracing::debug!(target: "scan", "controller stopped");
    }

    async fn start_session(&mut self) {
        if self.registration.is_active() || self.deadline.is_some() {
            tracing::debug!(
                target: "scan",
                generation = self.session.generation,
                "stopping active session before restart"
            );
            self.stop().await;
        }

        let generation = self.session.generation + 1;
        self.session = ScanSession::idle(generation);
        self.set_status(ScanStatus::CheckingAvailability);

        match self.reader.is_supported().await {
            Ok(true) => {}
            Ok(false) => return self.fail(ScanErrorKind::NotSupported),
            Err(err) => {
                tracing::warn!(target: "scan", "support query failed: {err}");
                return self.fail(ScanErrorKind::NotSupported);
            }
        }

        if self.config.require_enabled {
            match self.reader.is_enabled().await {
                Ok(true) => {}
                Ok(false) => return self.fail(ScanErrorKind::NotEnabled),
                // The query is advisory; a disabled radio still fails in start().
                Err(err) => {
                    tracing::warn!(target: "scan", "enabled query failed, continuing: {err}");
                }
            }
        }

        if let Err(err) = self.reader.start().await {
            tracing::warn!(target: "scan", "reader start failed: {err}");
            return self.fail(ScanErrorKind::InitError);
        }
        self.set_status(ScanStatus::Scanning);

        let sink = TagSink::new(generation, self.tags_tx.clone());
        if let Err(err) = self.reader.register_for_tag(sink).await {
            tracing::warn!(target: "scan", "tag registration failed: {err}");
            return self.fail(ScanErrorKind::InitError);
        }
        self.registration.bind(generation);

        let now = Instant::now();
        let deadline = now + self.config.timeout();
        self.deadline = Some(deadline);
        self.session.started_at = Some(now);
        self.session.timeout_at = Some(deadline);
        self.publish();
        tracing::info!(
            target: "scan",
            generation,
            timeout_ms = self.config.timeout_ms,
            "waiting for tag"
        );
    }

    async fn on_tag(&mut self, generation: u64, tag: Tag) {
        if generation != self.session.generation || self.session.status != ScanStatus::Scanning {
            tracing::debug!(
                target: "scan",
                generation,
                current = self.session.generation,
                "discarding stale tag delivery"
            );
            return;
        }
        let tag_id = match TagId::new(&tag.id) {
            Ok(id) => id,
            Err(_) => {
                tracing::warn!(target: "scan", "ignoring tag without an id");
                return;
            }
        };

        tracing::info!(target: "scan", generation, tag = %tag_id, "tag discovered");
        self.session.tag = Some(tag_id.clone());
        self.set_status(ScanStatus::TagFound);
        self.deadline = None;
        self.release_registration().await;
        self.observer.on_tag_discovered(&tag_id);
    }

    async fn on_timeout(&mut self) {
        self.deadline = None;
        if self.session.status != ScanStatus::Scanning {
            return;
        }

        tracing::info!(target: "scan", generation = self.session.generation, "scan timed out");
        self.session.last_error = Some(ScanErrorKind::Timeout);
        self.set_status(ScanStatus::TimedOut);
        self.release_registration().await;
        self.observer.on_error(ScanErrorKind::Timeout);
    }

    async fn hard_reset(&mut self) {
        tracing::info!(target: "scan", "performing hard reset");
        let generation = self.session.generation + 1;
        self.session.generation = generation;
        self.deadline = None;

        // Unregister even when no registration is recorded: an earlier failed
        // unregister may have left a listener behind in the driver.
        self.registration.clear();
        if let Err(err) = self.reader.unregister_for_tag().await {
            log_teardown_failure("unregister", &err);
        }
        if let Err(err) = self.reader.cancel_pending_request().await {
            log_teardown_failure("cancel pending request", &err);
        }
        sleep(self.config.settle_delay()).await;

        self.session = ScanSession::idle(generation);
        self.set_status(ScanStatus::Idle);
    }

    /// Implicit stop: drop the registration and timer, invalidate late events.
    async fn stop(&mut self) {
        self.deadline = None;
        self.release_registration().await;
    }

    async fn release_registration(&mut self) {
        if let Some(Err(err)) = self.registration.dispose(&self.reader).await {
            log_teardown_failure("unregister", &err);
        }
    }

    fn fail(&mut self, kind: ScanErrorKind) {
        self.deadline = None;
        self.session.last_error = Some(kind);
        self.set_status(ScanStatus::Failed(kind));
        self.observer.on_error(kind);
    }

    fn set_status(&mut self, status: ScanStatus) {
        let changed = self.session.status != status;
        self.session.status = status;
        self.publish();
        if changed {
            tracing::debug!(target: "scan", %status, "state change");
            self.observer.on_state_change(status);
        }
    }

    fn publish(&self) {
        self.session_tx.send_replace(self.session.clone());
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn log_teardown_failure(step: &str, err: &crate::ReaderError) {
    let kind = ScanErrorKind::TeardownError;
    tracing::warn!(
        target: "scan",
        %kind,
        "{} ({step}: {err})",
        kind.user_message()
    );
}
