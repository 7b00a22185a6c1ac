//! # Error Types
//!
//! Two error families live here:
//!
//! - [`ValidationError`] — one rule violation. It names the field and its
//!   declared kind, the violated [`Constraint`], the configured threshold
//!   and the value actually observed. A validation call produces at most
//!   one.
//! - [`SchemaError`] — a descriptor or message could not be built because
//!   the caller supplied inconsistent schema data.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::FieldDescriptor;
use crate::rule::Constraint;

/// A threshold or observed value carried by a [`ValidationError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Scalar {
    /// Narrowest scalar holding a normalized integer.
    pub fn from_wide(value: i128) -> Self {
        match i64::try_from(value) {
            Ok(v) => Scalar::Int(v),
            Err(_) => match u64::try_from(value) {
                Ok(v) => Scalar::Uint(v),
                Err(_) => Scalar::Text(value.to_string()),
            },
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Uint(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::Uint(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

/// A single rule violation.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("field '{field}' ({kind}) violates {constraint} (rule: {threshold}, found: {actual})")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: String,
    /// Declared kind of the offending field, e.g. `int32` or `string`.
    pub kind: String,
    /// The constraint that failed.
    pub constraint: Constraint,
    /// The constraint's configured value.
    pub threshold: Scalar,
    /// The value (or element count / length) that was observed.
    pub actual: Scalar,
}

impl ValidationError {
    /// Build a violation for `field`.
    pub fn new(
        field: &FieldDescriptor,
        constraint: Constraint,
        threshold: impl Into<Scalar>,
        actual: impl Into<Scalar>,
    ) -> Self {
        Self {
            field: field.name().to_string(),
            kind: field.kind().type_name().to_string(),
            constraint,
            threshold: threshold.into(),
            actual: actual.into(),
        }
    }
}

/// Inconsistent schema or message construction input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Two fields of one message share a number.
    #[error("message '{message}' declares field number {number} more than once")]
    DuplicateFieldNumber {
        /// Full name of the message.
        message: String,
        /// The repeated field number.
        number: u32,
    },

    /// Two fields of one message share a name.
    #[error("message '{message}' declares field '{name}' more than once")]
    DuplicateFieldName {
        /// Full name of the message.
        message: String,
        /// The repeated field name.
        name: String,
    },

    /// Field numbers start at 1.
    #[error("field '{field}' has invalid number 0")]
    InvalidFieldNumber {
        /// Field name.
        field: String,
    },

    /// Map keys must be an integral, bool or string kind.
    #[error("map field '{field}' cannot use {kind} as key type")]
    InvalidMapKey {
        /// Map field name.
        field: String,
        /// Rejected key kind.
        kind: String,
    },

    /// The field does not belong to the message's descriptor.
    #[error("message '{message}' has no field '{field}'")]
    UnknownField {
        /// Full name of the message.
        message: String,
        /// Name (or number) of the missing field.
        field: String,
    },

    /// A value does not fit the field's declared kind and cardinality.
    #[error("field '{field}' expects {expected}, got {found}")]
    KindMismatch {
        /// Field name.
        field: String,
        /// Declared shape.
        expected: String,
        /// Shape of the supplied value.
        found: String,
    },

    /// A reflective source could not be converted into this model.
    #[error("unsupported schema construct at '{path}': {reason}")]
    Unsupported {
        /// Location of the construct.
        path: String,
        /// What could not be represented.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, Kind};

    #[test]
    fn test_validation_error_display() {
        let field = FieldDescriptor::singular("age", 1, Kind::Int32);
        let err = ValidationError::new(&field, Constraint::IntGt, 0i64, 0i64);
        assert_eq!(
            err.to_string(),
            "field 'age' (int32) violates int-gt (rule: 0, found: 0)"
        );
    }

    #[test]
    fn test_validation_error_quotes_text() {
        let field = FieldDescriptor::singular("name", 2, Kind::String);
        let err = ValidationError::new(&field, Constraint::Regex, "^[a-z]+$", "ABC");
        assert!(err.to_string().contains(r#"rule: "^[a-z]+$", found: "ABC""#));
    }

    #[test]
    fn test_validation_error_serializes_as_json() {
        let field = FieldDescriptor::singular("tags", 3, Kind::String).into_repeated();
        let err = ValidationError::new(&field, Constraint::RepeatedCountMax, 3i64, 4i64);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "field": "tags",
                "kind": "string",
                "constraint": "repeated-count-max",
                "threshold": 3,
                "actual": 4
            })
        );
    }

    #[test]
    fn test_scalar_from_wide() {
        assert_eq!(Scalar::from_wide(-5), Scalar::Int(-5));
        assert_eq!(Scalar::from_wide(u64::MAX as i128), Scalar::Uint(u64::MAX));
        assert_eq!(
            Scalar::from_wide(i128::MAX),
            Scalar::Text(i128::MAX.to_string())
        );
    }

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::InvalidMapKey {
            field: "weights".into(),
            kind: "double".into(),
        };
        assert_eq!(err.to_string(), "map field 'weights' cannot use double as key type");
    }
}
