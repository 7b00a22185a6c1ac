//! # pbv-core — Reflective Message Model & Field Rules
//!
//! Foundation crate of the pbv workspace. It defines the reflective view of
//! protobuf messages that the validation engine walks, and the rule payload
//! that schemas attach to individual fields.
//!
//! ## Contents
//!
//! - [`descriptor`] — immutable, shareable schema metadata:
//!   [`MessageDescriptor`], [`FieldDescriptor`], [`EnumDescriptor`], the
//!   closed [`Kind`] enum and field [`Cardinality`].
//! - [`value`] — the closed [`Value`] / [`MapKey`] enums holding decoded
//!   field values.
//! - [`message`] — [`Message`], a descriptor plus its field values.
//! - [`rule`] — [`Rule`], the `validator.FieldValidator` extension payload,
//!   and [`Constraint`], the names of its individual checks.
//! - [`error`] — [`ValidationError`] (a single rule violation) and
//!   [`SchemaError`] (descriptor or message construction failures).
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pbv-*` crates (leaf of the DAG).
//! - Descriptors are immutable after construction and cheap to clone.
//! - Rule field numbers are a wire contract with existing `.proto`
//!   artifacts and must never be renumbered.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod descriptor;
pub mod error;
pub mod message;
pub mod rule;
pub mod value;

pub use descriptor::{
    Cardinality, EnumDescriptor, EnumValue, FieldDescriptor, Kind, MapEntry, MessageDescriptor,
    RuleSlot,
};
pub use error::{Scalar, SchemaError, ValidationError};
pub use message::Message;
pub use rule::{
    Constraint, FieldOptionsExtension, Rule, RuleConflict, FIELD_RULE_EXTENSION,
    FIELD_RULE_EXTENSION_NAME, FIELD_RULE_MESSAGE_NAME,
};
pub use value::{MapKey, Value};
