//! # Rule Accessor
//!
//! Resolves the [`Rule`] attached to a field. Malformed rule metadata never
//! fails validation: it is logged and the field is treated as having no
//! constraints.

use std::borrow::Cow;

use pbv_core::{FieldDescriptor, FieldOptionsExtension, Rule, RuleSlot};
use prost::Message as _;

/// The rule attached to `field`, or `None` if it has none or its metadata
/// cannot be decoded.
pub fn rule_for(field: &FieldDescriptor) -> Option<Cow<'_, Rule>> {
    match field.rule_slot() {
        RuleSlot::None => None,
        RuleSlot::Decoded(rule) => Some(Cow::Borrowed(rule)),
        RuleSlot::Encoded(options) => decode_options(field, options).map(Cow::Owned),
    }
}

fn decode_options(field: &FieldDescriptor, options: &[u8]) -> Option<Rule> {
    match FieldOptionsExtension::decode(options) {
        Ok(ext) => ext.field,
        Err(e) => {
            tracing::warn!(
                field = field.name(),
                error = %e,
                "undecodable field options; validating field without rule"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbv_core::Kind;

    fn ruled() -> Rule {
        Rule {
            int_gt: Some(0),
            int_lt: Some(150),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_rule() {
        let field = FieldDescriptor::singular("age", 1, Kind::Int32);
        assert!(rule_for(&field).is_none());
    }

    #[test]
    fn test_decoded_rule_is_borrowed() {
        let field = FieldDescriptor::singular("age", 1, Kind::Int32).with_rule(ruled());
        let rule = rule_for(&field).unwrap();
        assert!(matches!(rule, Cow::Borrowed(_)));
        assert_eq!(*rule, ruled());
    }

    #[test]
    fn test_encoded_options_are_decoded() {
        let options = FieldOptionsExtension {
            field: Some(ruled()),
        }
        .encode_to_vec();
        let field = FieldDescriptor::singular("age", 1, Kind::Int32).with_options(options);
        assert_eq!(rule_for(&field).unwrap().into_owned(), ruled());
    }

    #[test]
    fn test_options_without_extension_yield_none() {
        // FieldOptions { deprecated: true } and nothing else.
        let field = FieldDescriptor::singular("age", 1, Kind::Int32).with_options(vec![0x18, 0x01]);
        assert!(rule_for(&field).is_none());
    }

    #[test]
    fn test_malformed_options_degrade_to_none() {
        // Tag 65020, length-delimited, claims 10 bytes but carries 1.
        let field = FieldDescriptor::singular("age", 1, Kind::Int32)
            .with_options(vec![0xe2, 0xdf, 0x1f, 0x0a, 0x10]);
        assert!(rule_for(&field).is_none());
    }
}
