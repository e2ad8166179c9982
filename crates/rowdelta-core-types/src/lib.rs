//! Core types shared across rowdelta crates
//!
//! This crate provides the leaf types used by the diff engine, the
//! storage backends and the logging facility:
//!
//! - **Side tags**: `SideTag` naming one half of a diff pair
//! - **Correlation**: `SessionId` tying log events to one diff session
//! - **Sensitive data**: `Sensitive<T>` marker for automatic redaction
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;
pub mod side;

pub use correlation::SessionId;
pub use sensitive::Sensitive;
pub use side::SideTag;
