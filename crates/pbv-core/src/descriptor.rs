//! # Schema Descriptors
//!
//! Immutable schema metadata for messages, fields and enums. Descriptors are
//! built once when a schema is loaded and shared by every message instance
//! of that type; each one is an `Arc` handle, so clones are cheap and
//! descriptors can be sent across threads freely.
//!
//! ## Kinds
//!
//! [`Kind`] is closed: every protobuf scalar kind has a variant, message
//! fields carry the nested type's full name, and enum fields carry their
//! [`EnumDescriptor`]. Anything the model cannot represent (e.g. proto2
//! groups) is [`Kind::Unsupported`], which validation treats as a no-op.
//!
//! Message kinds reference the nested type by name rather than by
//! descriptor; the nested message instance carries its own descriptor. This
//! keeps self-referencing schemas representable without reference cycles.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::rule::Rule;
use crate::value::Value;

/// Declared kind of a field or map key/value.
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    /// Nested message, by fully-qualified type name.
    Message(String),
    Enum(EnumDescriptor),
    /// A construct the model does not represent. Never validated.
    Unsupported(String),
}

impl Kind {
    /// Protobuf type keyword, e.g. `sint64`, `message`, `enum`.
    pub fn type_name(&self) -> &str {
        match self {
            Kind::Double => "double",
            Kind::Float => "float",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Sint32 => "sint32",
            Kind::Sint64 => "sint64",
            Kind::Fixed32 => "fixed32",
            Kind::Fixed64 => "fixed64",
            Kind::Sfixed32 => "sfixed32",
            Kind::Sfixed64 => "sfixed64",
            Kind::Bool => "bool",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Message(_) => "message",
            Kind::Enum(_) => "enum",
            Kind::Unsupported(name) => name.as_str(),
        }
    }

    /// Any signed or unsigned fixed-width integer kind.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Kind::Int32
                | Kind::Int64
                | Kind::Uint32
                | Kind::Uint64
                | Kind::Sint32
                | Kind::Sint64
                | Kind::Fixed32
                | Kind::Fixed64
                | Kind::Sfixed32
                | Kind::Sfixed64
        )
    }

    /// Kinds protobuf accepts as map keys.
    pub fn is_valid_map_key(&self) -> bool {
        self.is_integer() || matches!(self, Kind::Bool | Kind::String)
    }

    /// Value an unset singular field of this kind reads as.
    ///
    /// `None` for message and unsupported kinds, which have no default and
    /// read as absent.
    pub fn default_value(&self) -> Option<Value> {
        let value = match self {
            Kind::Double => Value::F64(0.0),
            Kind::Float => Value::F32(0.0),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(0),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(0),
            Kind::Uint32 | Kind::Fixed32 => Value::U32(0),
            Kind::Uint64 | Kind::Fixed64 => Value::U64(0),
            Kind::Bool => Value::Bool(false),
            Kind::String => Value::String(String::new()),
            Kind::Bytes => Value::Bytes(Vec::new()),
            Kind::Enum(desc) => Value::EnumNumber(desc.default_number()),
            Kind::Message(_) | Kind::Unsupported(_) => return None,
        };
        Some(value)
    }
}

/// One named value of an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    /// Value name, e.g. `STATUS_ACTIVE`.
    pub name: String,
    /// Wire number.
    pub number: i32,
}

#[derive(Debug, PartialEq)]
struct EnumInner {
    full_name: String,
    values: Vec<EnumValue>,
}

/// Declared values of an enum type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor(Arc<EnumInner>);

impl EnumDescriptor {
    /// Create an enum descriptor from `(name, number)` pairs in declaration order.
    pub fn new<N, I>(full_name: impl Into<String>, values: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, i32)>,
    {
        let values = values
            .into_iter()
            .map(|(name, number)| EnumValue {
                name: name.into(),
                number,
            })
            .collect();
        Self(Arc::new(EnumInner {
            full_name: full_name.into(),
            values,
        }))
    }

    /// Fully-qualified enum name.
    pub fn full_name(&self) -> &str {
        &self.0.full_name
    }

    /// Declared values, in declaration order.
    pub fn values(&self) -> &[EnumValue] {
        &self.0.values
    }

    /// Whether `number` is a declared value.
    pub fn contains(&self, number: i32) -> bool {
        self.0.values.iter().any(|v| v.number == number)
    }

    /// Number of the first declared value, or `0` for an empty enum.
    pub fn default_number(&self) -> i32 {
        self.0.values.first().map_or(0, |v| v.number)
    }
}

/// Where a field's rule comes from.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RuleSlot {
    /// The field carries no rule metadata.
    #[default]
    None,
    /// A rule already decoded by the schema loader.
    Decoded(Rule),
    /// Raw `google.protobuf.FieldOptions` bytes, decoded on access.
    Encoded(Vec<u8>),
}

/// Key and value descriptors of a map field.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    /// Synthetic `key` field (number 1).
    pub key: FieldDescriptor,
    /// Synthetic `value` field (number 2).
    pub value: FieldDescriptor,
}

/// How many values a field holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Cardinality {
    Singular,
    Repeated,
    Map(MapEntry),
}

#[derive(Debug, Clone, PartialEq)]
struct FieldInner {
    name: String,
    number: u32,
    kind: Kind,
    cardinality: Cardinality,
    rule: RuleSlot,
    is_extension: bool,
}

/// Schema metadata for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor(Arc<FieldInner>);

impl FieldDescriptor {
    /// A singular field of `kind`.
    pub fn singular(name: impl Into<String>, number: u32, kind: Kind) -> Self {
        Self(Arc::new(FieldInner {
            name: name.into(),
            number,
            kind,
            cardinality: Cardinality::Singular,
            rule: RuleSlot::None,
            is_extension: false,
        }))
    }

    /// A repeated (list) field of `kind`.
    pub fn repeated(name: impl Into<String>, number: u32, kind: Kind) -> Self {
        Self::singular(name, number, kind).into_repeated()
    }

    /// A map field from `key` to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidMapKey`] if `key` is not an integral,
    /// bool or string kind.
    pub fn map(
        name: impl Into<String>,
        number: u32,
        key: Kind,
        value: Kind,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        if !key.is_valid_map_key() {
            return Err(SchemaError::InvalidMapKey {
                field: name,
                kind: key.type_name().to_string(),
            });
        }
        let entry = MapEntry {
            key: FieldDescriptor::singular("key", 1, key),
            value: FieldDescriptor::singular("value", 2, value),
        };
        let entry_name = format!("{}Entry", upper_camel(&name));
        Ok(Self(Arc::new(FieldInner {
            name,
            number,
            kind: Kind::Message(entry_name),
            cardinality: Cardinality::Map(entry),
            rule: RuleSlot::None,
            is_extension: false,
        })))
    }

    /// Turn this field into a repeated field. Map fields are left unchanged.
    pub fn into_repeated(mut self) -> Self {
        let inner = Arc::make_mut(&mut self.0);
        if inner.cardinality == Cardinality::Singular {
            inner.cardinality = Cardinality::Repeated;
        }
        self
    }

    /// Attach an already-decoded rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        Arc::make_mut(&mut self.0).rule = RuleSlot::Decoded(rule);
        self
    }

    /// Attach raw `FieldOptions` bytes; the rule is decoded on access.
    pub fn with_options(mut self, options: Vec<u8>) -> Self {
        Arc::make_mut(&mut self.0).rule = RuleSlot::Encoded(options);
        self
    }

    /// Mark this field as an extension. Extensions are never validated.
    pub fn into_extension(mut self) -> Self {
        Arc::make_mut(&mut self.0).is_extension = true;
        self
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Field number.
    pub fn number(&self) -> u32 {
        self.0.number
    }

    /// Declared kind. For map fields this is the synthetic entry message.
    pub fn kind(&self) -> &Kind {
        &self.0.kind
    }

    /// Singular, repeated or map.
    pub fn cardinality(&self) -> &Cardinality {
        &self.0.cardinality
    }

    /// Rule metadata as attached by the schema.
    pub fn rule_slot(&self) -> &RuleSlot {
        &self.0.rule
    }

    /// Whether this is an extension field.
    pub fn is_extension(&self) -> bool {
        self.0.is_extension
    }

    /// Whether this is a repeated (list) field.
    pub fn is_list(&self) -> bool {
        matches!(self.0.cardinality, Cardinality::Repeated)
    }

    /// Map key/value descriptors, if this is a map field.
    pub fn map_entry(&self) -> Option<&MapEntry> {
        match &self.0.cardinality {
            Cardinality::Map(entry) => Some(entry),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
struct MessageInner {
    full_name: String,
    fields: Vec<FieldDescriptor>,
    by_number: HashMap<u32, usize>,
    by_name: HashMap<String, usize>,
}

/// Schema metadata for a message type: its fields in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDescriptor(Arc<MessageInner>);

impl MessageDescriptor {
    /// Build a message descriptor. `fields` must be in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if a field number is 0 or a field number or
    /// name is declared twice.
    pub fn new(
        full_name: impl Into<String>,
        fields: impl IntoIterator<Item = FieldDescriptor>,
    ) -> Result<Self, SchemaError> {
        let full_name = full_name.into();
        let fields: Vec<FieldDescriptor> = fields.into_iter().collect();
        let mut by_number = HashMap::with_capacity(fields.len());
        let mut by_name = HashMap::with_capacity(fields.len());

        for (idx, field) in fields.iter().enumerate() {
            if field.number() == 0 {
                return Err(SchemaError::InvalidFieldNumber {
                    field: field.name().to_string(),
                });
            }
            if by_number.insert(field.number(), idx).is_some() {
                return Err(SchemaError::DuplicateFieldNumber {
                    message: full_name,
                    number: field.number(),
                });
            }
            if by_name.insert(field.name().to_string(), idx).is_some() {
                return Err(SchemaError::DuplicateFieldName {
                    message: full_name,
                    name: field.name().to_string(),
                });
            }
        }

        Ok(Self(Arc::new(MessageInner {
            full_name,
            fields,
            by_number,
            by_name,
        })))
    }

    /// Fully-qualified message name.
    pub fn full_name(&self) -> &str {
        &self.0.full_name
    }

    /// All fields, extensions included, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.0.fields
    }

    /// Look up a field by number.
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.0.by_number.get(&number).map(|&idx| &self.0.fields[idx])
    }

    /// Look up a field by name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.0.by_name.get(name).map(|&idx| &self.0.fields[idx])
    }

    /// Whether `field` is declared by this message.
    pub fn contains(&self, field: &FieldDescriptor) -> bool {
        self.field_by_number(field.number())
            .is_some_and(|own| own.name() == field.name())
    }
}

/// `user_tags` -> `UserTags`, matching protoc's map entry naming.
fn upper_camel(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
