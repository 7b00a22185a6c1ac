//! # Reflective Messages
//!
//! A [`Message`] pairs a [`MessageDescriptor`] with the values of the
//! fields that are set. Reads follow protobuf presence rules:
//!
//! - a set field reads as its stored value;
//! - an unset singular scalar or enum reads as its kind's default;
//! - an unset repeated or map field reads as empty;
//! - an unset message field reads as absent.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::descriptor::{Cardinality, FieldDescriptor, MessageDescriptor};
use crate::error::SchemaError;
use crate::value::Value;

/// A message instance known only through its descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    descriptor: MessageDescriptor,
    values: BTreeMap<u32, Value>,
}

impl Message {
    /// An empty message of the given type.
    pub fn new(descriptor: MessageDescriptor) -> Self {
        Self {
            descriptor,
            values: BTreeMap::new(),
        }
    }

    /// The message's type.
    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    /// Set `field` to `value` after checking that the value fits.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownField`] if `field` is not declared by this
    /// message, [`SchemaError::KindMismatch`] if the value does not fit
    /// the field's kind and cardinality.
    pub fn set_field(
        &mut self,
        field: &FieldDescriptor,
        value: impl Into<Value>,
    ) -> Result<(), SchemaError> {
        if !self.descriptor.contains(field) {
            return Err(self.unknown(field.name()));
        }
        let value = value.into();
        if !value.fits_field(field) {
            return Err(SchemaError::KindMismatch {
                field: field.name().to_string(),
                expected: describe(field),
                found: value.shape_name().to_string(),
            });
        }
        self.values.insert(field.number(), value);
        Ok(())
    }

    /// Set the field called `name`. See [`Message::set_field`].
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), SchemaError> {
        let field = self
            .descriptor
            .field_by_name(name)
            .cloned()
            .ok_or_else(|| self.unknown(name))?;
        self.set_field(&field, value)
    }

    /// Builder form of [`Message::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, SchemaError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Store `value` under field `number` without any checks.
    ///
    /// Meant for decoders that already trust their input. Readers of the
    /// message must tolerate values that do not match the declared kind.
    pub fn insert_unchecked(&mut self, number: u32, value: Value) {
        self.values.insert(number, value);
    }

    /// Unset the field called `name`, returning its previous value.
    pub fn clear(&mut self, name: &str) -> Option<Value> {
        let number = self.descriptor.field_by_name(name)?.number();
        self.values.remove(&number)
    }

    /// Whether `field` has an explicitly stored value.
    pub fn has_field(&self, field: &FieldDescriptor) -> bool {
        self.values.contains_key(&field.number())
    }

    /// Read `field`, applying protobuf presence rules.
    ///
    /// `Ok(None)` means the field is absent (an unset message field).
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownField`] if `field` is not declared by this
    /// message.
    pub fn get_field(
        &self,
        field: &FieldDescriptor,
    ) -> Result<Option<Cow<'_, Value>>, SchemaError> {
        if !self.descriptor.contains(field) {
            return Err(self.unknown(field.name()));
        }
        if let Some(value) = self.values.get(&field.number()) {
            return Ok(Some(Cow::Borrowed(value)));
        }
        let default = match field.cardinality() {
            Cardinality::Singular => field.kind().default_value(),
            Cardinality::Repeated => Some(Value::List(Vec::new())),
            Cardinality::Map(_) => Some(Value::Map(Vec::new())),
        };
        Ok(default.map(Cow::Owned))
    }

    /// Read the field called `name`; `None` if it is unknown or absent.
    pub fn get(&self, name: &str) -> Option<Cow<'_, Value>> {
        let field = self.descriptor.field_by_name(name)?;
        self.get_field(field).ok().flatten()
    }

    fn unknown(&self, field: &str) -> SchemaError {
        SchemaError::UnknownField {
            message: self.descriptor.full_name().to_string(),
            field: field.to_string(),
        }
    }
}

fn describe(field: &FieldDescriptor) -> String {
    match field.cardinality() {
        Cardinality::Singular => field.kind().type_name().to_string(),
        Cardinality::Repeated => format!("repeated {}", field.kind().type_name()),
        Cardinality::Map(entry) => format!(
            "map<{}, {}>",
            entry.key.kind().type_name(),
            entry.value.kind().type_name()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Kind;
    use crate::value::MapKey;

    fn person() -> MessageDescriptor {
        MessageDescriptor::new(
            "test.Person",
            [
                FieldDescriptor::singular("name", 1, Kind::String),
                FieldDescriptor::singular("age", 2, Kind::Int32),
                FieldDescriptor::repeated("tags", 3, Kind::String),
                FieldDescriptor::map("labels", 4, Kind::String, Kind::String).unwrap(),
                FieldDescriptor::singular("manager", 5, Kind::Message("test.Person".into())),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_unset_fields_follow_presence_rules() {
        let msg = Message::new(person());
        assert_eq!(msg.get("name").unwrap().into_owned(), Value::String(String::new()));
        assert_eq!(msg.get("age").unwrap().into_owned(), Value::I32(0));
        assert_eq!(msg.get("tags").unwrap().into_owned(), Value::List(vec![]));
        assert_eq!(msg.get("labels").unwrap().into_owned(), Value::Map(vec![]));
        assert!(msg.get("manager").is_none());
    }

    #[test]
    fn test_set_and_get() {
        let msg = Message::new(person())
            .with("name", "Ada")
            .unwrap()
            .with("tags", Value::list(["x"]))
            .unwrap()
            .with(
                "labels",
                Value::Map(vec![(MapKey::from("team"), Value::from("core"))]),
            )
            .unwrap();
        assert_eq!(msg.get("name").unwrap().into_owned(), Value::from("Ada"));
        let tags = msg.descriptor().field_by_name("tags").unwrap().clone();
        assert!(msg.has_field(&tags));
    }

    #[test]
    fn test_nested_message_of_same_type() {
        let boss = Message::new(person()).with("name", "Grace").unwrap();
        let msg = Message::new(person()).with("manager", boss.clone()).unwrap();
        assert_eq!(msg.get("manager").unwrap().as_message(), Some(&boss));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let err = Message::new(person()).with("age", "thirty").unwrap_err();
        assert_eq!(
            err,
            SchemaError::KindMismatch {
                field: "age".into(),
                expected: "int32".into(),
                found: "string".into(),
            }
        );
        let err = Message::new(person()).with("tags", "solo").unwrap_err();
        assert!(err.to_string().contains("repeated string"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut msg = Message::new(person());
        assert!(matches!(
            msg.set("nickname", "x"),
            Err(SchemaError::UnknownField { .. })
        ));
        let foreign = FieldDescriptor::singular("other", 1, Kind::String);
        assert!(msg.get_field(&foreign).is_err());
    }

    #[test]
    fn test_insert_unchecked_and_clear() {
        let mut msg = Message::new(person());
        msg.insert_unchecked(2, Value::from("not a number"));
        assert_eq!(msg.get("age").unwrap().into_owned(), Value::from("not a number"));
        assert_eq!(msg.clear("age"), Some(Value::from("not a number")));
        assert_eq!(msg.get("age").unwrap().into_owned(), Value::I32(0));
    }
}
