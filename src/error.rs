//! Error types for schema normalization

use thiserror::Error;

use crate::schema::SchemaPath;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors raised while turning a tracking-plan schema into the AST.
///
/// All parse-time variants abort the build; nothing here is recoverable
/// property-by-property.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unsupported type `{type_name}` at {path}")]
    UnsupportedType { path: SchemaPath, type_name: String },

    #[error("Malformed reference `{reference}` at {path}: {reason}")]
    MalformedReference {
        path: SchemaPath,
        reference: String,
        reason: String,
    },

    #[error("Cyclic reference between custom types: {}", .cycle.join(" -> "))]
    CyclicReference { cycle: Vec<String> },

    #[error("Invalid schema at {path}: {message}")]
    InvalidSchema { path: SchemaPath, message: String },
}

impl SchemaError {
    pub(crate) fn invalid(path: &SchemaPath, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            path: path.clone(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PathSegment;

    #[test]
    fn test_cycle_message() {
        let err = SchemaError::CyclicReference {
            cycle: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(
            err.to_string(),
            "Cyclic reference between custom types: A -> B -> A"
        );
    }

    #[test]
    fn test_unsupported_type_message_has_path() {
        let path = SchemaPath::root()
            .join(PathSegment::Property("properties".into()))
            .join(PathSegment::Property("total".into()));
        let err = SchemaError::UnsupportedType {
            path,
            type_name: "decimal".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported type `decimal` at .properties.total"
        );
    }
}
