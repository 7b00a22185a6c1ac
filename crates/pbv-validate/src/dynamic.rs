//! # prost-reflect Adapter
//!
//! Bridges [`prost_reflect`] descriptors and dynamic messages into the
//! reflective model of `pbv-core`, so messages decoded against a runtime
//! [`DescriptorPool`](prost_reflect::DescriptorPool) can be validated.
//!
//! Rules are read from each field's `FieldOptions`. The options are
//! re-encoded and extension 65020 is decoded from the bytes, so extraction
//! works whether or not `validator.proto` is registered in the pool.

use std::collections::HashMap;

use pbv_core::{
    Cardinality, Constraint, EnumDescriptor, FieldDescriptor, FieldOptionsExtension, Kind, MapKey, Message,
    MessageDescriptor, Rule, SchemaError, ValidationError, Value, FIELD_RULE_EXTENSION,
    FIELD_RULE_EXTENSION_NAME,
};
use prost::Message as _;
use prost_reflect::{
    DynamicMessage, FieldDescriptor as ReflectField, Kind as ReflectKind,
    MapKey as ReflectMapKey, MessageDescriptor as ReflectMessage, ReflectMessage as _,
    Value as ReflectValue,
};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    descriptor_proto::ReservedRange, DescriptorProto, FieldDescriptorProto, FileDescriptorProto,
};

use crate::engine::Validator;

/// The `validator.proto` file: the `FieldValidator` message and the
/// `validator.field` extension of `google.protobuf.FieldOptions`.
///
/// Register it in a pool alongside `google/protobuf/descriptor.proto` to
/// make rules visible as a named extension.
pub fn validator_file_descriptor() -> FileDescriptorProto {
    let fields = Constraint::ALL
        .iter()
        .map(|&c| FieldDescriptorProto {
            name: Some(c.name().replace('-', "_")),
            number: Some(c.number() as i32),
            label: Some(Label::Optional as i32),
            r#type: Some(proto_type(c) as i32),
            ..Default::default()
        })
        .collect();

    let (package, ext_name) = FIELD_RULE_EXTENSION_NAME
        .split_once('.')
        .unwrap_or(("validator", "field"));

    FileDescriptorProto {
        name: Some("validator.proto".to_string()),
        package: Some(package.to_string()),
        dependency: vec!["google/protobuf/descriptor.proto".to_string()],
        message_type: vec![DescriptorProto {
            name: Some("FieldValidator".to_string()),
            field: fields,
            reserved_range: vec![ReservedRange {
                start: Some(4),
                end: Some(6),
            }],
            ..Default::default()
        }],
        extension: vec![FieldDescriptorProto {
            name: Some(ext_name.to_string()),
            number: Some(FIELD_RULE_EXTENSION as i32),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::Message as i32),
            type_name: Some(format!(".{package}.FieldValidator")),
            extendee: Some(".google.protobuf.FieldOptions".to_string()),
            ..Default::default()
        }],
        syntax: Some("proto2".to_string()),
        ..Default::default()
    }
}

fn proto_type(constraint: Constraint) -> Type {
    match constraint {
        Constraint::Regex => Type::String,
        Constraint::IntGt
        | Constraint::IntLt
        | Constraint::RepeatedCountMin
        | Constraint::RepeatedCountMax
        | Constraint::LengthGt
        | Constraint::LengthLt
        | Constraint::LengthEq => Type::Int64,
        Constraint::FloatGt
        | Constraint::FloatLt
        | Constraint::FloatEpsilon
        | Constraint::FloatGte
        | Constraint::FloatLte => Type::Double,
        Constraint::StringNotEmpty | Constraint::IsInEnum => Type::Bool,
    }
}

/// The rule carried by a `google.protobuf.FieldOptions` message, if any.
///
/// Undecodable options are logged and yield `None`.
pub fn rule_from_options(options: &DynamicMessage) -> Option<Rule> {
    let bytes = options.encode_to_vec();
    if bytes.is_empty() {
        return None;
    }
    match FieldOptionsExtension::decode(bytes.as_slice()) {
        Ok(ext) => ext.field,
        Err(e) => {
            tracing::warn!(
                options = options.descriptor().full_name(),
                error = %e,
                "undecodable field options"
            );
            None
        }
    }
}

/// Convert a dynamic message, and everything nested in it, into a [`Message`].
///
/// Fields with no counterpart in the reflective model (e.g. proto2 groups)
/// and values that do not fit their field are logged and left unset, so the
/// remaining fields are still validated.
///
/// # Errors
///
/// Returns [`SchemaError`] if the message descriptor itself cannot be
/// represented (e.g. two fields share a number).
pub fn message_from_dynamic(message: &DynamicMessage) -> Result<Message, SchemaError> {
    Converter::default().message(message)
}

/// Convert a prost-reflect message descriptor into a [`MessageDescriptor`].
///
/// Rules are read from the fields' options. A field with no counterpart in
/// the model becomes [`Kind::Unsupported`].
///
/// # Errors
///
/// Returns [`SchemaError`] if the message cannot be represented.
pub fn descriptor_from_reflect(desc: &ReflectMessage) -> Result<MessageDescriptor, SchemaError> {
    Converter::default().descriptor(desc)
}

/// Per-call memo of converted descriptors, keyed by full name.
#[derive(Default)]
struct Converter {
    descriptors: HashMap<String, MessageDescriptor>,
}

impl Converter {
    fn descriptor(&mut self, desc: &ReflectMessage) -> Result<MessageDescriptor, SchemaError> {
        if let Some(done) = self.descriptors.get(desc.full_name()) {
            return Ok(done.clone());
        }
        let fields: Vec<FieldDescriptor> = desc
            .fields()
            .map(|f| {
                field_from_reflect(&f).unwrap_or_else(|e| {
                    tracing::warn!(field = f.full_name(), error = %e, "unsupported field");
                    FieldDescriptor::singular(f.name(), f.number(), Kind::Unsupported(e.to_string()))
                })
            })
            .collect();
        let converted = MessageDescriptor::new(desc.full_name(), fields)?;
        self.descriptors
            .insert(desc.full_name().to_string(), converted.clone());
        Ok(converted)
    }

    fn message(&mut self, message: &DynamicMessage) -> Result<Message, SchemaError> {
        let reflect_desc = message.descriptor();
        let desc = self.descriptor(&reflect_desc)?;
        let mut converted = Message::new(desc.clone());

        for reflect_field in reflect_desc.fields() {
            let Some(field) = desc.field_by_number(reflect_field.number()) else {
                continue;
            };
            if let Kind::Unsupported(_) = field.kind() {
                continue;
            }
            // Unset scalars are read through prost-reflect so declared
            // proto2 defaults are seen; unset singular messages stay absent.
            let singular_message = matches!(field.cardinality(), Cardinality::Singular)
                && matches!(field.kind(), Kind::Message(_));
            if singular_message && !message.has_field(&reflect_field) {
                continue;
            }
            let stored = self
                .value(&message.get_field(&reflect_field))
                .and_then(|value| converted.set_field(field, value));
            if let Err(e) = stored {
                tracing::warn!(field = field.name(), error = %e, "skipping unconvertible field");
            }
        }
        Ok(converted)
    }

    fn value(&mut self, value: &ReflectValue) -> Result<Value, SchemaError> {
        let converted = match value {
            ReflectValue::Bool(v) => Value::Bool(*v),
            ReflectValue::I32(v) => Value::I32(*v),
            ReflectValue::I64(v) => Value::I64(*v),
            ReflectValue::U32(v) => Value::U32(*v),
            ReflectValue::U64(v) => Value::U64(*v),
            ReflectValue::F32(v) => Value::F32(*v),
            ReflectValue::F64(v) => Value::F64(*v),
            ReflectValue::String(v) => Value::String(v.clone()),
            ReflectValue::Bytes(v) => Value::Bytes(v.to_vec()),
            ReflectValue::EnumNumber(v) => Value::EnumNumber(*v),
            ReflectValue::Message(m) => Value::Message(self.message(m)?),
            ReflectValue::List(items) => Value::List(
                items
                    .iter()
                    .map(|item| self.value(item))
                    .collect::<Result<_, _>>()?,
            ),
            ReflectValue::Map(entries) => {
                let mut converted = entries
                    .iter()
                    .map(|(k, v)| Ok((map_key(k), self.value(v)?)))
                    .collect::<Result<Vec<_>, SchemaError>>()?;
                converted.sort_by(|a, b| a.0.cmp(&b.0));
                Value::Map(converted)
            }
        };
        Ok(converted)
    }
}

fn field_from_reflect(field: &ReflectField) -> Result<FieldDescriptor, SchemaError> {
    let converted = if field.is_map() {
        let ReflectKind::Message(entry) = field.kind() else {
            return Err(SchemaError::Unsupported {
                path: field.full_name().to_string(),
                reason: "map field without an entry message".to_string(),
            });
        };
        FieldDescriptor::map(
            field.name(),
            field.number(),
            kind_from_reflect(&entry.map_entry_key_field()),
            kind_from_reflect(&entry.map_entry_value_field()),
        )?
    } else if field.is_list() {
        FieldDescriptor::repeated(field.name(), field.number(), kind_from_reflect(field))
    } else {
        FieldDescriptor::singular(field.name(), field.number(), kind_from_reflect(field))
    };

    Ok(match rule_from_options(&field.options()) {
        Some(rule) => converted.with_rule(rule),
        None => converted,
    })
}

fn kind_from_reflect(field: &ReflectField) -> Kind {
    match field.kind() {
        ReflectKind::Double => Kind::Double,
        ReflectKind::Float => Kind::Float,
        ReflectKind::Int32 => Kind::Int32,
        ReflectKind::Int64 => Kind::Int64,
        ReflectKind::Uint32 => Kind::Uint32,
        ReflectKind::Uint64 => Kind::Uint64,
        ReflectKind::Sint32 => Kind::Sint32,
        ReflectKind::Sint64 => Kind::Sint64,
        ReflectKind::Fixed32 => Kind::Fixed32,
        ReflectKind::Fixed64 => Kind::Fixed64,
        ReflectKind::Sfixed32 => Kind::Sfixed32,
        ReflectKind::Sfixed64 => Kind::Sfixed64,
        ReflectKind::Bool => Kind::Bool,
        ReflectKind::String => Kind::String,
        ReflectKind::Bytes => Kind::Bytes,
        ReflectKind::Message(_) if field.is_group() => Kind::Unsupported("group".to_string()),
        ReflectKind::Message(m) => Kind::Message(m.full_name().to_string()),
        ReflectKind::Enum(e) => Kind::Enum(EnumDescriptor::new(
            e.full_name(),
            e.values().map(|v| (v.name().to_string(), v.number())),
        )),
    }
}

fn map_key(key: &ReflectMapKey) -> MapKey {
    match key {
        ReflectMapKey::Bool(v) => MapKey::Bool(*v),
        ReflectMapKey::I32(v) => MapKey::I32(*v),
        ReflectMapKey::I64(v) => MapKey::I64(*v),
        ReflectMapKey::U32(v) => MapKey::U32(*v),
        ReflectMapKey::U64(v) => MapKey::U64(*v),
        ReflectMapKey::String(v) => MapKey::String(v.clone()),
    }
}

impl Validator {
    /// Convert `message` and validate it.
    ///
    /// A message that cannot be converted is logged and treated as valid.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate_dynamic(&self, message: &DynamicMessage) -> Result<(), ValidationError> {
        match message_from_dynamic(message) {
            Ok(converted) => self.validate(&converted),
            Err(e) => {
                tracing::warn!(
                    message = message.descriptor().full_name(),
                    error = %e,
                    "cannot convert dynamic message; skipping validation"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message as _;
    use prost_reflect::ReflectMessage as _;
    use prost_reflect::DescriptorPool;

    fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(ty as i32),
            ..Default::default()
        }
    }

    fn pool() -> DescriptorPool {
        let file = FileDescriptorProto {
            name: Some("point.proto".to_string()),
            package: Some("test".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("Point".to_string()),
                field: vec![field("x", 1, Type::Int32), field("label", 2, Type::String)],
                ..Default::default()
            }],
            syntax: Some("proto3".to_string()),
            ..Default::default()
        };
        let mut pool = DescriptorPool::new();
        pool.add_file_descriptor_proto(file).unwrap();
        pool
    }

    #[test]
    fn test_validator_file_descriptor_shape() {
        let file = validator_file_descriptor();
        assert_eq!(file.package(), "validator");
        let msg = &file.message_type[0];
        assert_eq!(msg.name(), "FieldValidator");
        assert_eq!(msg.field.len(), 15);
        assert!(msg
            .field
            .iter()
            .any(|f| f.name() == "is_in_enum" && f.number() == 17));
        assert!(msg.field.iter().all(|f| !(4..=5).contains(&f.number())));
        let ext = &file.extension[0];
        assert_eq!(ext.name(), "field");
        assert_eq!(ext.number(), 65020);
        assert_eq!(ext.extendee(), ".google.protobuf.FieldOptions");
    }

    #[test]
    fn test_rule_from_options_reads_extension() {
        let pool = pool();
        let point = pool.get_message_by_name("test.Point").unwrap();
        let options_desc = point.get_field_by_name("x").unwrap().options().descriptor();

        let rule = Rule {
            int_gt: Some(0),
            ..Default::default()
        };
        let bytes = FieldOptionsExtension {
            field: Some(rule.clone()),
        }
        .encode_to_vec();
        let options = DynamicMessage::decode(options_desc, bytes.as_slice()).unwrap();
        assert_eq!(rule_from_options(&options), Some(rule));
    }

    #[test]
    fn test_rule_from_empty_options_is_none() {
        let pool = pool();
        let point = pool.get_message_by_name("test.Point").unwrap();
        let options = point.get_field_by_name("x").unwrap().options();
        assert_eq!(rule_from_options(&options), None);
    }

    #[test]
    fn test_message_from_dynamic_copies_set_fields() {
        let pool = pool();
        let point = pool.get_message_by_name("test.Point").unwrap();
        let mut dynamic = DynamicMessage::new(point);
        dynamic.set_field_by_name("x", ReflectValue::I32(7));

        let converted = message_from_dynamic(&dynamic).unwrap();
        assert_eq!(converted.descriptor().full_name(), "test.Point");
        assert_eq!(converted.get("x").unwrap().into_owned(), Value::I32(7));
        assert_eq!(
            converted.get("label").unwrap().into_owned(),
            Value::String(String::new())
        );
    }

    #[test]
    fn test_validate_dynamic_without_rules_is_valid() {
        let pool = pool();
        let point = pool.get_message_by_name("test.Point").unwrap();
        let dynamic = DynamicMessage::new(point);
        assert!(Validator::new().validate_dynamic(&dynamic).is_ok());
    }
}
