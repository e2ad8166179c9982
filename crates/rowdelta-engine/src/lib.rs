//! rowdelta Engine - Orchestration layer
//!
//! Opens a side pair from a diff definition and runs loads, reports and
//! clears with operation-boundary logging.

pub mod session;

pub use session::{ChangedRowSample, DiffReport, DiffSession};
