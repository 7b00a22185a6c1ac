//! # pbv-validate — Field-Rule Validation Engine
//!
//! Walks a reflective [`Message`](pbv_core::Message) and checks every field
//! against the [`Rule`](pbv_core::Rule) its schema attaches through the
//! `validator.field` extension. Validation stops at the first violation
//! and reports it as a [`ValidationError`].
//!
//! ## Validation (`engine`, `checks`)
//!
//! - [`Validator::validate`] — recursive descent in declaration order,
//!   with cardinality dispatch (map / repeated / singular) and typed
//!   checkers per field kind.
//! - [`validate`] / [`reset_cache`] — the same, through a process-wide
//!   validator configured from the environment on first use.
//!
//! ## Rules & Patterns (`accessor`, `cache`)
//!
//! - [`rule_for`] resolves a field's rule, decoding raw `FieldOptions`
//!   bytes when needed. Malformed metadata degrades to "no rule".
//! - [`PatternCache`] compiles `regex` constraints once and shares them
//!   across threads and validators.
//!
//! ## prost-reflect (`dynamic`, feature `prost-reflect`)
//!
//! - [`Validator::validate_dynamic`] validates a
//!   [`prost_reflect::DynamicMessage`] directly.
//! - [`validator_file_descriptor`] exposes `validator.proto` for
//!   registration in a descriptor pool.
//!
//! ## Crate Policy
//!
//! - Depends only on `pbv-core` internally.
//! - Internal anomalies (unreadable values, kind mismatches, bad patterns,
//!   excessive nesting) are logged with `tracing` and never fail
//!   validation.
//! - No subscriber is installed; the embedding application owns logging.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod accessor;
pub mod cache;
pub mod checks;
pub mod config;
#[cfg(feature = "prost-reflect")]
pub mod dynamic;
pub mod engine;

use std::sync::OnceLock;

pub use accessor::rule_for;
pub use cache::{PatternCache, PatternError};
pub use config::{ConfigError, ValidatorConfig};
#[cfg(feature = "prost-reflect")]
pub use dynamic::{
    descriptor_from_reflect, message_from_dynamic, rule_from_options, validator_file_descriptor,
};
pub use engine::Validator;
pub use pbv_core::ValidationError;

/// The process-wide validator behind [`validate`] and [`reset_cache`].
///
/// Configured from the environment on first use; an invalid environment
/// is logged and the defaults are used.
pub fn shared() -> &'static Validator {
    static SHARED: OnceLock<Validator> = OnceLock::new();
    SHARED.get_or_init(|| {
        let config = ValidatorConfig::from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid validator configuration; using defaults");
            ValidatorConfig::default()
        });
        Validator::new().with_config(config)
    })
}

/// Validate `message` with the process-wide validator.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate<'a>(
    message: impl Into<Option<&'a pbv_core::Message>>,
) -> Result<(), ValidationError> {
    shared().validate(message)
}

/// Clear the process-wide validator's pattern cache.
pub fn reset_cache() {
    shared().reset_cache();
}
