use rowdelta_core_types::{SessionId, SideTag};
use thiserror::Error;

/// Result type alias using DiffError
pub type Result<T> = std::result::Result<T, DiffError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code usable for programmatic handling,
/// testing and log assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Schema construction
    InvalidSchema,
    EmptySchema,

    // Row encoding
    MissingField,
    InvalidValue,

    // Insert path
    ConflictResolutionFailure,

    // Storage collaborator
    BackingStoreFailure,

    // Configuration
    InvalidDefinition,

    // Integration/IO
    Io,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidSchema => "ERR_INVALID_SCHEMA",
            ExErrorKind::EmptySchema => "ERR_EMPTY_SCHEMA",
            ExErrorKind::MissingField => "ERR_MISSING_FIELD",
            ExErrorKind::InvalidValue => "ERR_INVALID_VALUE",
            ExErrorKind::ConflictResolutionFailure => "ERR_CONFLICT_RESOLUTION",
            ExErrorKind::BackingStoreFailure => "ERR_BACKING_STORE",
            ExErrorKind::InvalidDefinition => "ERR_INVALID_DEFINITION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind for programmatic handling plus optional
/// context (operation, side, canonical key, field) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    side: Option<SideTag>,
    canonical_key: Option<String>,
    field: Option<String>,
    session_id: Option<SessionId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            side: None,
            canonical_key: None,
            field: None,
            session_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add side context
    pub fn with_side(mut self, side: SideTag) -> Self {
        self.side = Some(side);
        self
    }

    /// Add canonical key context
    pub fn with_canonical_key(mut self, key: impl Into<String>) -> Self {
        self.canonical_key = Some(key.into());
        self
    }

    /// Add field name context
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Add session context
    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the side context, if any
    pub fn side(&self) -> Option<SideTag> {
        self.side
    }

    /// Get the canonical key context, if any
    pub fn canonical_key(&self) -> Option<&str> {
        self.canonical_key.as_deref()
    }

    /// Get the field context, if any
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Get the session context, if any
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(side) = self.side {
            write!(f, " (side: {})", side)?;
        }
        if let Some(key) = &self.canonical_key {
            write!(f, " (canonical_key: {})", key)?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field: {})", field)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain errors raised while building schemas and encoding records
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiffError {
    // ===== Schema Errors =====
    /// Type tag is not one of the recognized field types
    #[error("Unknown field type '{tag}' for field {field}")]
    UnknownFieldType { field: String, tag: String },

    /// Key or value field set has no fields
    #[error("The {set} field set is empty")]
    EmptyFieldSet { set: &'static str },

    /// Field name declared twice (within a set or across key and value sets)
    #[error("Field declared more than once: {field}")]
    DuplicateField { field: String },

    // ===== Encoding Errors =====
    /// Schema field absent from the record being encoded
    #[error("Record is missing field: {field}")]
    MissingField { field: String },

    /// Field value cannot be cast to the declared type
    #[error("Invalid {field_type} value for field {field}: {reason}")]
    InvalidValue {
        field: String,
        field_type: String,
        reason: String,
    },

    /// Input element did not serialize to a JSON object
    #[error("Expected a record (JSON object), found {found}")]
    NotARecord { found: String },

    // ===== Generic Errors =====
    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

/// Conversion from DiffError to ExError
impl From<DiffError> for ExError {
    fn from(err: DiffError) -> Self {
        match err {
            DiffError::UnknownFieldType { field, tag } => ExError::new(ExErrorKind::InvalidSchema)
                .with_field(field)
                .with_message(format!("Unknown field type '{}'", tag)),

            DiffError::EmptyFieldSet { set } => ExError::new(ExErrorKind::EmptySchema)
                .with_message(format!("The {} field set is empty", set)),

            DiffError::DuplicateField { field } => ExError::new(ExErrorKind::InvalidSchema)
                .with_field(field)
                .with_message("Field declared more than once"),

            DiffError::MissingField { field } => ExError::new(ExErrorKind::MissingField)
                .with_field(field)
                .with_message("Record is missing a schema field"),

            DiffError::InvalidValue {
                field,
                field_type,
                reason,
            } => ExError::new(ExErrorKind::InvalidValue)
                .with_field(field)
                .with_message(format!("Invalid {} value: {}", field_type, reason)),

            DiffError::NotARecord { found } => ExError::new(ExErrorKind::InvalidValue)
                .with_message(format!("Expected a record (JSON object), found {}", found)),

            DiffError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to DiffError
impl From<serde_json::Error> for DiffError {
    fn from(err: serde_json::Error) -> Self {
        DiffError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Create a backing store error for the given operation
pub fn backing_store(op: &str, message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::BackingStoreFailure)
        .with_op(op.to_string())
        .with_message(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (ExErrorKind::InvalidSchema, "ERR_INVALID_SCHEMA"),
            (ExErrorKind::EmptySchema, "ERR_EMPTY_SCHEMA"),
            (
                ExErrorKind::ConflictResolutionFailure,
                "ERR_CONFLICT_RESOLUTION",
            ),
            (ExErrorKind::BackingStoreFailure, "ERR_BACKING_STORE"),
            (ExErrorKind::InvalidDefinition, "ERR_INVALID_DEFINITION"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_schema_errors_map_to_schema_kinds() {
        let unknown: ExError = DiffError::UnknownFieldType {
            field: "total".into(),
            tag: "currency".into(),
        }
        .into();
        assert_eq!(unknown.kind(), ExErrorKind::InvalidSchema);
        assert_eq!(unknown.field(), Some("total"));

        let duplicate: ExError = DiffError::DuplicateField { field: "id".into() }.into();
        assert_eq!(duplicate.kind(), ExErrorKind::InvalidSchema);

        let empty: ExError = DiffError::EmptyFieldSet { set: "value" }.into();
        assert_eq!(empty.kind(), ExErrorKind::EmptySchema);
    }

    #[test]
    fn test_display_includes_context() {
        let err = ExError::new(ExErrorKind::ConflictResolutionFailure)
            .with_op("add_row")
            .with_side(SideTag::B)
            .with_canonical_key("42")
            .with_message("merge failed");
        let rendered = err.to_string();
        assert!(rendered.starts_with("[ERR_CONFLICT_RESOLUTION]"));
        assert!(rendered.contains("add_row"));
        assert!(rendered.contains("(side: b)"));
        assert!(rendered.contains("(canonical_key: 42)"));
    }

    #[test]
    fn test_source_chain_is_exposed() {
        use std::error::Error as _;

        let inner = ExError::new(ExErrorKind::MissingField).with_field("name");
        let outer = ExError::new(ExErrorKind::ConflictResolutionFailure).with_source(inner);

        assert_eq!(
            outer.source_error().map(|e| e.kind()),
            Some(ExErrorKind::MissingField)
        );
        assert!(outer.source().is_some());
    }
}
