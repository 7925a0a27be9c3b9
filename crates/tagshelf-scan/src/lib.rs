//! NFC scan session controller for tagshelf.
//!
//! This crate drives one scan attempt at a time against a hardware reader:
//! availability checks, tag registration, timeout enforcement and a hard
//! reset path for readers that stop responding.
//!
//! # Overview
//!
//! - **[`HardwareReaderPort`]** is the driver boundary. Implement it for a real
//!   reader, or use [`SimulatedReader`].
//! - **[`ScanSessionController`]** owns the reader on a background task and
//!   reports progress to a [`ScanObserver`].
//! - **Generation tokens** make late tag deliveries from a superseded or reset
//!   session harmless.
//!
//! # Example
//!
//! ```rust,no_run
//! use tagshelf_scan::{ScanConfig, ScanEvent, ScanSessionController, SimulatedReader};
//! use tokio::sync::mpsc;
//!
//! # async fn demo() {
//! let reader = SimulatedReader::new();
//! let (events_tx, mut events) = mpsc::unbounded_channel::<ScanEvent>();
//! let controller = ScanSessionController::spawn(reader.clone(), events_tx, ScanConfig::default());
//!
//! controller.start().await.unwrap();
//! reader.present_tag("04A1B2");
//!
//! while let Some(event) = events.recv().await {
//!     if let ScanEvent::TagDiscovered(tag_id) = event {
//!         println!("Scanned {tag_id}");
//!         break;
//!     }
//! }
//! # }
//! ```

mod controller;
mod observer;
mod port;
mod registration;
mod session;
mod simulated;

pub use controller::{ControllerError, ScanSessionController};
pub use observer::{ScanEvent, ScanObserver};
pub use port::{HardwareReaderPort, ReaderError, ReaderOp, Tag, TagSink};
pub use session::{ScanErrorKind, ScanSession, ScanStatus};
pub use simulated::SimulatedReader;

// Re-export core types for convenience
pub use tagshelf_core::{ScanConfig, TagId};
