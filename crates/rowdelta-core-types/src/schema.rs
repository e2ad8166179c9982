//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names consistent between the boundary
//! logging macros, lower-layer debug events and test assertions.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_SESSION_ID: &str = "session_id";

// Diff identifiers
pub const FIELD_SIDE: &str = "side";
pub const FIELD_CANONICAL_KEY: &str = "canonical_key";
pub const FIELD_SORT_ORDER: &str = "sort_order";

// Collection sizes
pub const FIELD_ROW_COUNT: &str = "row_count";
pub const FIELD_PAGE_LEN: &str = "page_len";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
