//! Structured logging facility for rowdelta
//!
//! - Single initialization point via `init(profile)`
//! - Boundary logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! Boundary events belong to the engine crate. The core and store crates
//! only emit `tracing::debug!` events for row-level details.
//!
//! # Usage
//!
//! ```rust
//! use rowdelta_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
