//! # Validation Engine
//!
//! Recursive descent over a [`Message`], applying each field's [`Rule`] and
//! returning the first violation found.
//!
//! ## Traversal
//!
//! Fields are visited in declaration order; extension fields are skipped.
//! Within a field:
//!
//! - **map**: the field's rule applies to every key, checked against the
//!   key's declared kind. Map values are never checked against a rule, but
//!   message values are still descended into.
//! - **repeated**: the element count is checked first, then each element
//!   against the same rule.
//! - **singular**: the value is checked directly.
//!
//! A message-typed field is descended into; its own rule is not applied to
//! the wrapper.
//!
//! ## Anomalies
//!
//! A value that cannot be read, a value whose shape does not match its
//! declared kind, a subtree deeper than [`ValidatorConfig::max_depth`]:
//! each is logged at `warn` and treated as valid for that unit only.
//! Validation of sibling fields continues.

use std::sync::Arc;

use pbv_core::{Cardinality, FieldDescriptor, Kind, Message, Rule, ValidationError, Value};

use crate::accessor::rule_for;
use crate::cache::PatternCache;
use crate::checks;
use crate::config::ValidatorConfig;

type Check = Result<(), ValidationError>;

/// Validates messages against their fields' rules.
///
/// Cheap to clone; clones share the pattern cache.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    cache: Arc<PatternCache>,
    config: ValidatorConfig,
}

impl Validator {
    /// A validator with its own empty cache and default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// A validator compiling patterns into `cache`, which may be shared
    /// with other validators.
    pub fn with_cache(cache: Arc<PatternCache>) -> Self {
        Self {
            cache,
            config: ValidatorConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// The pattern cache this validator compiles into.
    pub fn cache(&self) -> &Arc<PatternCache> {
        &self.cache
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Drop every compiled pattern.
    pub fn reset_cache(&self) {
        self.cache.reset();
    }

    /// Validate `message` and everything nested in it.
    ///
    /// An absent message is valid.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found in declaration order.
    pub fn validate<'a>(&self, message: impl Into<Option<&'a Message>>) -> Check {
        let Some(message) = message.into() else {
            return Ok(());
        };
        let result = self.visit_message(message, 0);
        match &result {
            Ok(()) => tracing::trace!(message = message.descriptor().full_name(), "message valid"),
            Err(e) => tracing::debug!(
                message = message.descriptor().full_name(),
                error = %e,
                "message invalid"
            ),
        }
        result
    }

    fn visit_message(&self, message: &Message, depth: usize) -> Check {
        for field in message.descriptor().fields() {
            if field.is_extension() {
                continue;
            }
            let value = match message.get_field(field) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(field = field.name(), error = %e, "unreadable field; skipping");
                    continue;
                }
            };
            let rule = rule_for(field);
            self.visit_field(field, &value, rule.as_deref(), depth)?;
        }
        Ok(())
    }

    fn visit_field(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        rule: Option<&Rule>,
        depth: usize,
    ) -> Check {
        match (field.cardinality(), value) {
            (Cardinality::Map(entry), Value::Map(entries)) => {
                for (key, item) in entries {
                    self.check_value(&entry.key, &Value::from(key.clone()), rule, depth)?;
                    self.check_value(&entry.value, item, None, depth)?;
                }
                Ok(())
            }
            (Cardinality::Repeated, Value::List(items)) => {
                if let Some(rule) = rule {
                    checks::check_count(field, items.len(), rule)?;
                }
                for item in items {
                    self.check_value(field, item, rule, depth)?;
                }
                Ok(())
            }
            (Cardinality::Singular, value) => self.check_value(field, value, rule, depth),
            (_, value) => skip_mismatch(field, value),
        }
    }

    fn check_value(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        rule: Option<&Rule>,
        depth: usize,
    ) -> Check {
        if let Kind::Message(_) = field.kind() {
            return match value {
                Value::Message(nested) => self.descend(field, nested, depth),
                other => skip_mismatch(field, other),
            };
        }
        let Some(rule) = rule else {
            return Ok(());
        };

        match field.kind() {
            Kind::Int32
            | Kind::Int64
            | Kind::Uint32
            | Kind::Uint64
            | Kind::Sint32
            | Kind::Sint64
            | Kind::Fixed32
            | Kind::Fixed64
            | Kind::Sfixed32
            | Kind::Sfixed64 => match widen_int(value) {
                Some(v) => checks::check_int(field, v, rule),
                None => skip_mismatch(field, value),
            },
            Kind::Float | Kind::Double => match value {
                Value::F32(v) => checks::check_float(field, f64::from(*v), rule),
                Value::F64(v) => checks::check_float(field, *v, rule),
                other => skip_mismatch(field, other),
            },
            Kind::String => match value {
                Value::String(s) => checks::check_string(field, s, rule, &self.cache),
                other => skip_mismatch(field, other),
            },
            Kind::Bytes => match value {
                Value::Bytes(b) => checks::check_bytes(field, b, rule),
                other => skip_mismatch(field, other),
            },
            Kind::Enum(declared) => match value {
                Value::EnumNumber(n) => checks::check_enum(field, *n, declared, rule),
                other => skip_mismatch(field, other),
            },
            Kind::Bool | Kind::Unsupported(_) | Kind::Message(_) => Ok(()),
        }
    }

    fn descend(&self, field: &FieldDescriptor, nested: &Message, depth: usize) -> Check {
        let depth = depth + 1;
        if depth > self.config.max_depth {
            tracing::warn!(
                field = field.name(),
                max_depth = self.config.max_depth,
                "nesting too deep; skipping subtree"
            );
            return Ok(());
        }
        self.visit_message(nested, depth)
    }
}

fn widen_int(value: &Value) -> Option<i128> {
    match value {
        Value::I32(v) => Some(i128::from(*v)),
        Value::I64(v) => Some(i128::from(*v)),
        Value::U32(v) => Some(i128::from(*v)),
        Value::U64(v) => Some(i128::from(*v)),
        _ => None,
    }
}

fn skip_mismatch(field: &FieldDescriptor, value: &Value) -> Check {
    tracing::warn!(
        field = field.name(),
        expected = field.kind().type_name(),
        found = value.shape_name(),
        "value does not match declared kind; skipping"
    );
    Ok(())
}
