//! lexishift_helper: the helper process behind the browser extension and
//! GUI.
//!
//! Modules:
//! - `engine`: job facade over the data directory (rulegen, learning set
//!   lifecycle, signals, diagnostics, status)
//! - `native`: length-prefixed JSON native-messaging host
//! - `preview`: latest-wins preview worker

pub mod engine;
pub mod native;
pub mod preview;

pub use engine::{capability, HelperEngine, JobResult, PairCapability, HELPER_VERSION};
pub use native::{handle_envelope, read_message, serve, write_message, Envelope};
pub use preview::{PreviewOutcome, PreviewService};
