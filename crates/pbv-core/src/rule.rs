//! # Field Rules — the `validator.FieldValidator` Extension
//!
//! A [`Rule`] is the constraint bundle a schema attaches to one field via
//! the `validator.field` extension (number [`FIELD_RULE_EXTENSION`]) on
//! `google.protobuf.FieldOptions`.
//!
//! ## Wire Contract
//!
//! The field numbers below are shared with every `.proto` file that imports
//! `validator.proto`. Numbers 4 and 5 are reserved. Renumbering any field
//! silently detaches rules from existing compiled schemas.
//!
//! | constraint           | number | type   |
//! |----------------------|--------|--------|
//! | `regex`              | 1      | string |
//! | `int_gt` / `int_lt`  | 2 / 3  | int64  |
//! | `float_gt` / `float_lt` | 6 / 7 | double |
//! | `float_epsilon`      | 8      | double |
//! | `float_gte` / `float_lte` | 9 / 10 | double |
//! | `string_not_empty`   | 11     | bool   |
//! | `repeated_count_min` / `max` | 12 / 13 | int64 |
//! | `length_gt` / `length_lt` / `length_eq` | 14 / 15 / 16 | int64 |
//! | `is_in_enum`         | 17     | bool   |
//!
//! Every constraint is independently optional. Set constraints are ANDed
//! by the engine; nothing checks that they are mutually satisfiable unless
//! the caller runs [`Rule::conflicts`] at schema build time.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extension number of `validator.field` on `google.protobuf.FieldOptions`.
pub const FIELD_RULE_EXTENSION: u32 = 65020;

/// Fully-qualified name of the rule extension.
pub const FIELD_RULE_EXTENSION_NAME: &str = "validator.field";

/// Fully-qualified name of the rule payload message.
pub const FIELD_RULE_MESSAGE_NAME: &str = "validator.FieldValidator";

/// Declarative constraints attached to a single field.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    /// Full-string regular expression match (strings only).
    #[prost(string, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Value must be strictly greater than this (integers).
    #[prost(int64, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub int_gt: Option<i64>,
    /// Value must be strictly less than this (integers).
    #[prost(int64, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub int_lt: Option<i64>,
    /// Widened value must be strictly greater than this (floats).
    #[prost(double, optional, tag = "6")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub float_gt: Option<f64>,
    /// Widened value must be strictly less than this (floats).
    #[prost(double, optional, tag = "7")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub float_lt: Option<f64>,
    /// Symmetric tolerance applied before float comparisons.
    #[prost(double, optional, tag = "8")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub float_epsilon: Option<f64>,
    /// Widened value must be greater than or equal to this (floats).
    #[prost(double, optional, tag = "9")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub float_gte: Option<f64>,
    /// Widened value must be less than or equal to this (floats).
    #[prost(double, optional, tag = "10")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub float_lte: Option<f64>,
    /// String must not be empty.
    #[prost(bool, optional, tag = "11")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_not_empty: Option<bool>,
    /// Minimum element count of a repeated field, inclusive.
    #[prost(int64, optional, tag = "12")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeated_count_min: Option<i64>,
    /// Maximum element count of a repeated field, inclusive.
    #[prost(int64, optional, tag = "13")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeated_count_max: Option<i64>,
    /// Length must be strictly greater than this (strings, bytes).
    #[prost(int64, optional, tag = "14")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_gt: Option<i64>,
    /// Length must be strictly less than this (strings, bytes).
    #[prost(int64, optional, tag = "15")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_lt: Option<i64>,
    /// Length must equal this (strings, bytes).
    #[prost(int64, optional, tag = "16")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_eq: Option<i64>,
    /// Enum value must be one of the declared enum numbers.
    #[prost(bool, optional, tag = "17")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_in_enum: Option<bool>,
}

/// Read-only view of `google.protobuf.FieldOptions` that keeps only the
/// rule extension. Every other option decodes as an unknown field and is
/// skipped.
#[derive(Clone, PartialEq, prost::Message)]
pub struct FieldOptionsExtension {
    /// The `validator.field` extension payload.
    #[prost(message, optional, tag = "65020")]
    pub field: Option<Rule>,
}

/// Names a single check inside a [`Rule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Constraint {
    Regex,
    IntGt,
    IntLt,
    FloatGt,
    FloatLt,
    FloatEpsilon,
    FloatGte,
    FloatLte,
    StringNotEmpty,
    RepeatedCountMin,
    RepeatedCountMax,
    LengthGt,
    LengthLt,
    LengthEq,
    IsInEnum,
}

impl Constraint {
    /// All constraints in wire-number order.
    pub const ALL: [Constraint; 15] = [
        Constraint::Regex,
        Constraint::IntGt,
        Constraint::IntLt,
        Constraint::FloatGt,
        Constraint::FloatLt,
        Constraint::FloatEpsilon,
        Constraint::FloatGte,
        Constraint::FloatLte,
        Constraint::StringNotEmpty,
        Constraint::RepeatedCountMin,
        Constraint::RepeatedCountMax,
        Constraint::LengthGt,
        Constraint::LengthLt,
        Constraint::LengthEq,
        Constraint::IsInEnum,
    ];

    /// Stable kebab-case name used in violations and logs.
    pub fn name(self) -> &'static str {
        match self {
            Constraint::Regex => "regex",
            Constraint::IntGt => "int-gt",
            Constraint::IntLt => "int-lt",
            Constraint::FloatGt => "float-gt",
            Constraint::FloatLt => "float-lt",
            Constraint::FloatEpsilon => "float-epsilon",
            Constraint::FloatGte => "float-gte",
            Constraint::FloatLte => "float-lte",
            Constraint::StringNotEmpty => "string-not-empty",
            Constraint::RepeatedCountMin => "repeated-count-min",
            Constraint::RepeatedCountMax => "repeated-count-max",
            Constraint::LengthGt => "length-gt",
            Constraint::LengthLt => "length-lt",
            Constraint::LengthEq => "length-eq",
            Constraint::IsInEnum => "is-in-enum",
        }
    }

    /// Field number of this constraint inside `validator.FieldValidator`.
    pub fn number(self) -> u32 {
        match self {
            Constraint::Regex => 1,
            Constraint::IntGt => 2,
            Constraint::IntLt => 3,
            Constraint::FloatGt => 6,
            Constraint::FloatLt => 7,
            Constraint::FloatEpsilon => 8,
            Constraint::FloatGte => 9,
            Constraint::FloatLte => 10,
            Constraint::StringNotEmpty => 11,
            Constraint::RepeatedCountMin => 12,
            Constraint::RepeatedCountMax => 13,
            Constraint::LengthGt => 14,
            Constraint::LengthLt => 15,
            Constraint::LengthEq => 16,
            Constraint::IsInEnum => 17,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Two constraints of the same rule that no value can satisfy together.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{first} conflicts with {second}: no value can satisfy both")]
pub struct RuleConflict {
    /// Lower-bound (or presence) side of the conflict.
    pub first: Constraint,
    /// Upper-bound side of the conflict.
    pub second: Constraint,
}

impl Rule {
    /// Float tolerance, `0.0` when unset.
    pub fn epsilon(&self) -> f64 {
        self.float_epsilon.unwrap_or(0.0)
    }

    /// Whether `string_not_empty` is set to `true`.
    pub fn requires_non_empty(&self) -> bool {
        self.string_not_empty.unwrap_or(false)
    }

    /// Whether `is_in_enum` is set to `true`.
    pub fn requires_enum_member(&self) -> bool {
        self.is_in_enum.unwrap_or(false)
    }

    /// Constraints that are set on this rule, in wire-number order.
    pub fn constraints(&self) -> Vec<Constraint> {
        Constraint::ALL
            .into_iter()
            .filter(|c| self.is_set(*c))
            .collect()
    }

    /// Whether the given constraint carries a value.
    pub fn is_set(&self, constraint: Constraint) -> bool {
        match constraint {
            Constraint::Regex => self.regex.is_some(),
            Constraint::IntGt => self.int_gt.is_some(),
            Constraint::IntLt => self.int_lt.is_some(),
            Constraint::FloatGt => self.float_gt.is_some(),
            Constraint::FloatLt => self.float_lt.is_some(),
            Constraint::FloatEpsilon => self.float_epsilon.is_some(),
            Constraint::FloatGte => self.float_gte.is_some(),
            Constraint::FloatLte => self.float_lte.is_some(),
            Constraint::StringNotEmpty => self.string_not_empty.is_some(),
            Constraint::RepeatedCountMin => self.repeated_count_min.is_some(),
            Constraint::RepeatedCountMax => self.repeated_count_max.is_some(),
            Constraint::LengthGt => self.length_gt.is_some(),
            Constraint::LengthLt => self.length_lt.is_some(),
            Constraint::LengthEq => self.length_eq.is_some(),
            Constraint::IsInEnum => self.is_in_enum.is_some(),
        }
    }

    /// Pairs of bounds that cannot hold at the same time.
    ///
    /// The engine never calls this: an unsatisfiable rule simply rejects
    /// every value. Schema tooling can run it once per field to surface
    /// such rules early.
    pub fn conflicts(&self) -> Vec<RuleConflict> {
        let mut out = Vec::new();
        let mut push = |first, second| out.push(RuleConflict { first, second });

        if let (Some(gt), Some(lt)) = (self.int_gt, self.int_lt) {
            if gt.saturating_add(1) >= lt {
                push(Constraint::IntGt, Constraint::IntLt);
            }
        }

        // Float bounds act on the widened value: v > gt - e, v < lt + e.
        let e = self.epsilon();
        let lower = [
            (Constraint::FloatGt, self.float_gt, true),
            (Constraint::FloatGte, self.float_gte, false),
        ];
        let upper = [
            (Constraint::FloatLt, self.float_lt, true),
            (Constraint::FloatLte, self.float_lte, false),
        ];
        for (lc, lo, lo_strict) in lower {
            for (uc, hi, hi_strict) in upper {
                if let (Some(lo), Some(hi)) = (lo, hi) {
                    let (lo, hi) = (lo - e, hi + e);
                    let empty = if lo_strict || hi_strict { lo >= hi } else { lo > hi };
                    if empty {
                        push(lc, uc);
                    }
                }
            }
        }

        if let (Some(gt), Some(lt)) = (self.length_gt, self.length_lt) {
            if gt.saturating_add(1) >= lt {
                push(Constraint::LengthGt, Constraint::LengthLt);
            }
        }
        if let Some(eq) = self.length_eq {
            if self.length_gt.is_some_and(|gt| eq <= gt) {
                push(Constraint::LengthGt, Constraint::LengthEq);
            }
            if self.length_lt.is_some_and(|lt| eq >= lt) {
                push(Constraint::LengthEq, Constraint::LengthLt);
            }
            if eq == 0 && self.requires_non_empty() {
                push(Constraint::StringNotEmpty, Constraint::LengthEq);
            }
        }
        if self.requires_non_empty() && self.length_lt.is_some_and(|lt| lt <= 1) {
            push(Constraint::StringNotEmpty, Constraint::LengthLt);
        }

        if let (Some(min), Some(max)) = (self.repeated_count_min, self.repeated_count_max) {
            if min > max {
                push(Constraint::RepeatedCountMin, Constraint::RepeatedCountMax);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message as _;

    #[test]
    fn test_constraint_numbers_match_wire_contract() {
        let numbers: Vec<u32> = Constraint::ALL.iter().map(|c| c.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17]);
    }

    #[test]
    fn test_constraint_names_are_kebab_case() {
        assert_eq!(Constraint::IntGt.to_string(), "int-gt");
        assert_eq!(Constraint::RepeatedCountMax.name(), "repeated-count-max");
        let json = serde_json::to_string(&Constraint::StringNotEmpty).unwrap();
        assert_eq!(json, "\"string-not-empty\"");
    }

    #[test]
    fn test_rule_wire_tags() {
        // int_gt = 0 encodes as tag 2 varint: 0x10 0x00.
        let rule = Rule {
            int_gt: Some(0),
            ..Default::default()
        };
        assert_eq!(rule.encode_to_vec(), vec![0x10, 0x00]);

        // is_in_enum = true encodes as tag 17 varint: 0x88 0x01 0x01.
        let rule = Rule {
            is_in_enum: Some(true),
            ..Default::default()
        };
        assert_eq!(rule.encode_to_vec(), vec![0x88, 0x01, 0x01]);
    }

    #[test]
    fn test_options_extension_skips_other_options() {
        let rule = Rule {
            length_lt: Some(50),
            string_not_empty: Some(true),
            ..Default::default()
        };
        let mut bytes = vec![0x18, 0x01]; // FieldOptions.deprecated = true
        bytes.extend(
            FieldOptionsExtension {
                field: Some(rule.clone()),
            }
            .encode_to_vec(),
        );
        let decoded = FieldOptionsExtension::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded.field, Some(rule));
    }

    #[test]
    fn test_unset_rule_has_no_constraints() {
        let rule = Rule::default();
        assert!(rule.constraints().is_empty());
        assert_eq!(rule.epsilon(), 0.0);
        assert!(!rule.requires_non_empty());
        assert!(!rule.requires_enum_member());
    }

    #[test]
    fn test_constraints_lists_set_fields() {
        let rule = Rule {
            regex: Some("^a".into()),
            repeated_count_max: Some(3),
            ..Default::default()
        };
        assert_eq!(
            rule.constraints(),
            vec![Constraint::Regex, Constraint::RepeatedCountMax]
        );
    }

    #[test]
    fn test_serde_omits_unset_constraints() {
        let rule = Rule {
            int_gt: Some(0),
            int_lt: Some(150),
            ..Default::default()
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json, serde_json::json!({"int_gt": 0, "int_lt": 150}));
        let back: Rule = serde_json::from_value(json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_conflicts_empty_for_satisfiable_rule() {
        let rule = Rule {
            int_gt: Some(0),
            int_lt: Some(150),
            float_gte: Some(0.3),
            float_lte: Some(0.9),
            length_gt: Some(0),
            length_lt: Some(50),
            repeated_count_min: Some(1),
            repeated_count_max: Some(3),
            ..Default::default()
        };
        assert!(rule.conflicts().is_empty());
    }

    #[test]
    fn test_conflicts_adjacent_integer_bounds() {
        // No integer is strictly between 4 and 5.
        let rule = Rule {
            int_gt: Some(4),
            int_lt: Some(5),
            ..Default::default()
        };
        assert_eq!(
            rule.conflicts(),
            vec![RuleConflict {
                first: Constraint::IntGt,
                second: Constraint::IntLt
            }]
        );
    }

    #[test]
    fn test_conflicts_float_bounds_respect_epsilon() {
        let rule = Rule {
            float_gte: Some(1.0),
            float_lte: Some(0.9),
            ..Default::default()
        };
        assert_eq!(rule.conflicts().len(), 1);

        let widened = Rule {
            float_epsilon: Some(0.1),
            ..rule
        };
        assert!(widened.conflicts().is_empty());
    }

    #[test]
    fn test_conflicts_counts_and_lengths() {
        let rule = Rule {
            repeated_count_min: Some(4),
            repeated_count_max: Some(3),
            string_not_empty: Some(true),
            length_eq: Some(0),
            ..Default::default()
        };
        let conflicts = rule.conflicts();
        assert!(conflicts.contains(&RuleConflict {
            first: Constraint::RepeatedCountMin,
            second: Constraint::RepeatedCountMax
        }));
        assert!(conflicts.contains(&RuleConflict {
            first: Constraint::StringNotEmpty,
            second: Constraint::LengthEq
        }));
    }
}
