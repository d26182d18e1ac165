//! Schema error types
//!
//! Error codes:
//! - REVIEW_MISSING_FIELD (REJECT)
//! - REVIEW_INVALID_ENUM_VALUE (REJECT)
//! - REVIEW_UNIQUENESS_VIOLATION (REJECT)
//! - REVIEW_CARDINALITY_VIOLATION (REJECT)
//! - REVIEW_READ_ONLY_FIELD (REJECT)
//! - REVIEW_SCHEMA_CONFLICT (FATAL)
//! - REVIEW_MALFORMED_SCHEMA (FATAL)
//!
//! The remaining codes reject malformed requests (wrong types, unknown names,
//! missing instances) and are recoverable by the caller.

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Write rejected, model unchanged
    Reject,
    /// Schema cannot be used; raised while building shapes
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Error codes surfaced by the schema model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Required attribute or relation absent, null or empty
    MissingField,
    /// Enum-typed value outside the declared set
    InvalidEnumValue,
    /// Unique attribute value already taken
    UniquenessViolation,
    /// Link bounds violated
    CardinalityViolation,
    /// Write to a derived or write-once attribute
    ReadOnlyField,
    /// Composed definitions disagree on a member
    SchemaConflict,
    /// Value has the wrong type
    TypeMismatch,
    /// Attribute not declared on the entity
    UnknownField,
    /// No such entity, trait or enum definition
    UnknownEntityKind,
    /// No such relation on the entity
    UnknownRelation,
    /// Instance does not exist or is not committed
    InstanceNotFound,
    /// Edge does not exist
    EdgeNotFound,
    /// Lifecycle transition not allowed from the current state
    InvalidTransition,
    /// Schema file could not be read or parsed
    MalformedSchema,
}

impl SchemaErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::MissingField => "REVIEW_MISSING_FIELD",
            SchemaErrorCode::InvalidEnumValue => "REVIEW_INVALID_ENUM_VALUE",
            SchemaErrorCode::UniquenessViolation => "REVIEW_UNIQUENESS_VIOLATION",
            SchemaErrorCode::CardinalityViolation => "REVIEW_CARDINALITY_VIOLATION",
            SchemaErrorCode::ReadOnlyField => "REVIEW_READ_ONLY_FIELD",
            SchemaErrorCode::SchemaConflict => "REVIEW_SCHEMA_CONFLICT",
            SchemaErrorCode::TypeMismatch => "REVIEW_TYPE_MISMATCH",
            SchemaErrorCode::UnknownField => "REVIEW_UNKNOWN_FIELD",
            SchemaErrorCode::UnknownEntityKind => "REVIEW_UNKNOWN_ENTITY_KIND",
            SchemaErrorCode::UnknownRelation => "REVIEW_UNKNOWN_RELATION",
            SchemaErrorCode::InstanceNotFound => "REVIEW_INSTANCE_NOT_FOUND",
            SchemaErrorCode::EdgeNotFound => "REVIEW_EDGE_NOT_FOUND",
            SchemaErrorCode::InvalidTransition => "REVIEW_INVALID_TRANSITION",
            SchemaErrorCode::MalformedSchema => "REVIEW_MALFORMED_SCHEMA",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::SchemaConflict | SchemaErrorCode::MalformedSchema => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    /// Error code
    code: SchemaErrorCode,
    /// Human-readable message
    message: String,
    /// Entity kind if applicable
    entity: Option<String>,
    /// Field or relation name if applicable
    field: Option<String>,
}

impl SchemaError {
    fn new(
        code: SchemaErrorCode,
        message: String,
        entity: Option<String>,
        field: Option<String>,
    ) -> Self {
        Self {
            code,
            message,
            entity,
            field,
        }
    }

    /// Create a missing field error
    pub fn missing_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        let entity = entity.into();
        let field = field.into();
        Self::new(
            SchemaErrorCode::MissingField,
            format!("{}.{} is required", entity, field),
            Some(entity),
            Some(field),
        )
    }

    /// Create an invalid enum value error
    pub fn invalid_enum_value(
        entity: impl Into<String>,
        field: impl Into<String>,
        value: &str,
        allowed: &[String],
    ) -> Self {
        let entity = entity.into();
        let field = field.into();
        Self::new(
            SchemaErrorCode::InvalidEnumValue,
            format!(
                "{}.{}: '{}' is not one of [{}]",
                entity,
                field,
                value,
                allowed.join(", ")
            ),
            Some(entity),
            Some(field),
        )
    }

    /// Create a uniqueness violation error
    pub fn uniqueness_violation(
        entity: impl Into<String>,
        field: impl Into<String>,
        value: impl fmt::Display,
    ) -> Self {
        let entity = entity.into();
        let field = field.into();
        Self::new(
            SchemaErrorCode::UniquenessViolation,
            format!("{}.{} value {} is already taken", entity, field, value),
            Some(entity),
            Some(field),
        )
    }

    /// Create a cardinality violation error
    pub fn cardinality_violation(
        entity: impl Into<String>,
        relation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let entity = entity.into();
        let relation = relation.into();
        Self::new(
            SchemaErrorCode::CardinalityViolation,
            format!("{}.{}: {}", entity, relation, reason.into()),
            Some(entity),
            Some(relation),
        )
    }

    /// Create a read-only field error
    pub fn read_only_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        let entity = entity.into();
        let field = field.into();
        Self::new(
            SchemaErrorCode::ReadOnlyField,
            format!("{}.{} cannot be written", entity, field),
            Some(entity),
            Some(field),
        )
    }

    /// Create a schema conflict error (FATAL)
    pub fn schema_conflict(
        entity: impl Into<String>,
        member: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let entity = entity.into();
        let member = member.into();
        Self::new(
            SchemaErrorCode::SchemaConflict,
            format!("{}.{}: {}", entity, member, reason.into()),
            Some(entity),
            Some(member),
        )
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        entity: impl Into<String>,
        field: impl Into<String>,
        expected: &str,
        actual: &str,
    ) -> Self {
        let entity = entity.into();
        let field = field.into();
        Self::new(
            SchemaErrorCode::TypeMismatch,
            format!("{}.{}: expected {}, got {}", entity, field, expected, actual),
            Some(entity),
            Some(field),
        )
    }

    /// Create an unknown field error
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        let entity = entity.into();
        let field = field.into();
        Self::new(
            SchemaErrorCode::UnknownField,
            format!("{} has no attribute '{}'", entity, field),
            Some(entity),
            Some(field),
        )
    }

    /// Create an unknown entity kind error
    pub fn unknown_entity_kind(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            SchemaErrorCode::UnknownEntityKind,
            format!("'{}' is not defined", name),
            Some(name),
            None,
        )
    }

    /// Create an unknown relation error
    pub fn unknown_relation(entity: impl Into<String>, relation: impl Into<String>) -> Self {
        let entity = entity.into();
        let relation = relation.into();
        Self::new(
            SchemaErrorCode::UnknownRelation,
            format!("{} has no relation '{}'", entity, relation),
            Some(entity),
            Some(relation),
        )
    }

    /// Create an instance not found error
    pub fn instance_not_found(id: impl fmt::Display) -> Self {
        Self::new(
            SchemaErrorCode::InstanceNotFound,
            format!("instance {} not found", id),
            None,
            None,
        )
    }

    /// Create an edge not found error
    pub fn edge_not_found(
        source: impl fmt::Display,
        relation: impl Into<String>,
        target: impl fmt::Display,
    ) -> Self {
        let relation = relation.into();
        Self::new(
            SchemaErrorCode::EdgeNotFound,
            format!("no {} edge from {} to {}", relation, source, target),
            None,
            Some(relation),
        )
    }

    /// Create an invalid lifecycle transition error
    pub fn invalid_transition(
        id: impl fmt::Display,
        from: impl fmt::Display,
        to: impl fmt::Display,
    ) -> Self {
        Self::new(
            SchemaErrorCode::InvalidTransition,
            format!("instance {} cannot move from {} to {}", id, from, to),
            None,
            None,
        )
    }

    /// Create an error for a malformed schema file (FATAL)
    pub fn malformed_schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            SchemaErrorCode::MalformedSchema,
            format!("Malformed schema file '{}': {}", path.into(), reason.into()),
            None,
            None,
        )
    }

    /// Create an error for a definition that cannot be used as written (FATAL)
    pub fn malformed_definition(name: impl Into<String>, reason: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            SchemaErrorCode::MalformedSchema,
            format!("Malformed definition '{}': {}", name, reason.into()),
            Some(name),
            None,
        )
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the entity kind if applicable
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Returns the field or relation name if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SchemaErrorCode::MissingField.code(), "REVIEW_MISSING_FIELD");
        assert_eq!(SchemaErrorCode::InvalidEnumValue.code(), "REVIEW_INVALID_ENUM_VALUE");
        assert_eq!(
            SchemaErrorCode::UniquenessViolation.code(),
            "REVIEW_UNIQUENESS_VIOLATION"
        );
        assert_eq!(
            SchemaErrorCode::CardinalityViolation.code(),
            "REVIEW_CARDINALITY_VIOLATION"
        );
        assert_eq!(SchemaErrorCode::ReadOnlyField.code(), "REVIEW_READ_ONLY_FIELD");
        assert_eq!(SchemaErrorCode::SchemaConflict.code(), "REVIEW_SCHEMA_CONFLICT");
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(SchemaErrorCode::MissingField.severity(), Severity::Reject);
        assert_eq!(SchemaErrorCode::CardinalityViolation.severity(), Severity::Reject);
        assert_eq!(SchemaErrorCode::SchemaConflict.severity(), Severity::Fatal);
        assert_eq!(SchemaErrorCode::MalformedSchema.severity(), Severity::Fatal);
    }

    #[test]
    fn test_error_carries_entity_and_field() {
        let err = SchemaError::missing_field("User", "login");
        assert_eq!(err.entity(), Some("User"));
        assert_eq!(err.field(), Some("login"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_display_includes_code_and_severity() {
        let err = SchemaError::schema_conflict("PullRequest", "body", "string vs int");
        let display = format!("{}", err);
        assert!(display.starts_with("[FATAL] REVIEW_SCHEMA_CONFLICT"));
        assert!(display.contains("PullRequest.body"));
    }

    #[test]
    fn test_enum_error_lists_allowed_values() {
        let allowed = vec!["Open".to_string(), "Merged".to_string()];
        let err = SchemaError::invalid_enum_value("PullRequest", "status", "Closed", &allowed);
        assert!(err.message().contains("Closed"));
        assert!(err.message().contains("Open, Merged"));
    }
}
