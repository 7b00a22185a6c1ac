//! # Dynamic Values
//!
//! Decoded field values of a reflective [`Message`]. [`Value`] is a closed
//! enum with one variant per protobuf wire shape; composite fields hold a
//! `List` or a `Map`. Whether a value actually fits its field's declared
//! kind is checked by [`Value::fits_field`], but consumers must still
//! tolerate mismatches coming from unchecked sources.

use crate::descriptor::{Cardinality, FieldDescriptor, Kind};
use crate::message::Message;

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    EnumNumber(i32),
    Message(Message),
    List(Vec<Value>),
    /// Map entries. Iteration order is whatever the producer supplied.
    Map(Vec<(MapKey, Value)>),
}

/// A map key. Protobuf restricts keys to integral, bool and string kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    String(String),
}

impl Value {
    /// Shape name used in logs and mismatch errors.
    pub fn shape_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::EnumNumber(_) => "enum number",
            Value::Message(_) => "message",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Whether this single (non-composite) value fits `kind`.
    pub fn fits(&self, kind: &Kind) -> bool {
        match (kind, self) {
            (Kind::Int32 | Kind::Sint32 | Kind::Sfixed32, Value::I32(_))
            | (Kind::Int64 | Kind::Sint64 | Kind::Sfixed64, Value::I64(_))
            | (Kind::Uint32 | Kind::Fixed32, Value::U32(_))
            | (Kind::Uint64 | Kind::Fixed64, Value::U64(_))
            | (Kind::Float, Value::F32(_))
            | (Kind::Double, Value::F64(_))
            | (Kind::Bool, Value::Bool(_))
            | (Kind::String, Value::String(_))
            | (Kind::Bytes, Value::Bytes(_))
            | (Kind::Enum(_), Value::EnumNumber(_)) => true,
            (Kind::Message(name), Value::Message(msg)) => msg.descriptor().full_name() == name.as_str(),
            _ => false,
        }
    }

    /// Whether this value fits `field`'s kind and cardinality.
    pub fn fits_field(&self, field: &FieldDescriptor) -> bool {
        match (field.cardinality(), self) {
            (Cardinality::Singular, value) => value.fits(field.kind()),
            (Cardinality::Repeated, Value::List(items)) => {
                items.iter().all(|item| item.fits(field.kind()))
            }
            (Cardinality::Map(entry), Value::Map(entries)) => entries.iter().all(|(k, v)| {
                k.fits(entry.key.kind()) && v.fits(entry.value.kind())
            }),
            _ => false,
        }
    }

    /// A list value from anything convertible into values.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Borrow the nested message, if this is one.
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Value::Message(msg) => Some(msg),
            _ => None,
        }
    }
}

impl MapKey {
    /// Whether this key fits `kind`.
    pub fn fits(&self, kind: &Kind) -> bool {
        match (kind, self) {
            (Kind::Int32 | Kind::Sint32 | Kind::Sfixed32, MapKey::I32(_))
            | (Kind::Int64 | Kind::Sint64 | Kind::Sfixed64, MapKey::I64(_))
            | (Kind::Uint32 | Kind::Fixed32, MapKey::U32(_))
            | (Kind::Uint64 | Kind::Fixed64, MapKey::U64(_))
            | (Kind::Bool, MapKey::Bool(_))
            | (Kind::String, MapKey::String(_)) => true,
            _ => false,
        }
    }
}

impl From<MapKey> for Value {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Bool(v) => Value::Bool(v),
            MapKey::I32(v) => Value::I32(v),
            MapKey::I64(v) => Value::I64(v),
            MapKey::U32(v) => Value::U32(v),
            MapKey::U64(v) => Value::U64(v),
            MapKey::String(v) => Value::String(v),
        }
    }
}

macro_rules! impl_from {
    ($target:ident: $($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for $target {
                fn from(v: $ty) -> Self {
                    $target::$variant(v)
                }
            }
        )*
    };
}

impl_from!(Value:
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Vec<u8> => Bytes,
    Message => Message,
);

impl_from!(MapKey:
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    String => String,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<&str> for MapKey {
    fn from(v: &str) -> Self {
        MapKey::String(v.to_string())
    }
}
