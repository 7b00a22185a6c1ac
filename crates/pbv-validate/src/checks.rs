//! # Typed Checkers
//!
//! One checker per value family. Each applies the constraints of a [`Rule`]
//! that are meaningful for that family, in a fixed order, and returns the
//! first violation. Constraints for other families are ignored.
//!
//! | family  | order of checks |
//! |---------|-----------------|
//! | integer | `int-gt`, `int-lt` |
//! | float   | `float-gt`, `float-lt`, `float-gte`, `float-lte` |
//! | string  | `string-not-empty`, `length-gt`, `length-lt`, `length-eq`, `regex` |
//! | bytes   | `length-gt`, `length-lt`, `length-eq` |
//! | enum    | `is-in-enum` |
//! | count   | `repeated-count-min`, `repeated-count-max` |
//!
//! Integers of every width and signedness are widened to `i128` before
//! comparing, so `uint64` values above `i64::MAX` compare by magnitude.
//! String length is the UTF-8 byte length.

use pbv_core::{Constraint, EnumDescriptor, FieldDescriptor, Rule, Scalar, ValidationError};

use crate::cache::PatternCache;

type Check = Result<(), ValidationError>;

/// `int-gt` / `int-lt`, both strict.
pub fn check_int(field: &FieldDescriptor, value: i128, rule: &Rule) -> Check {
    if let Some(gt) = rule.int_gt {
        if value <= i128::from(gt) {
            return Err(violation(field, Constraint::IntGt, gt, Scalar::from_wide(value)));
        }
    }
    if let Some(lt) = rule.int_lt {
        if value >= i128::from(lt) {
            return Err(violation(field, Constraint::IntLt, lt, Scalar::from_wide(value)));
        }
    }
    Ok(())
}

/// Float bounds, compared against the value widened by `float-epsilon`.
///
/// Lower bounds see `value + epsilon`, upper bounds see `value - epsilon`.
/// The violation reports the unwidened value. NaN fails every bound.
pub fn check_float(field: &FieldDescriptor, value: f64, rule: &Rule) -> Check {
    let epsilon = rule.epsilon();
    let max = value + epsilon;
    let min = value - epsilon;

    if let Some(gt) = rule.float_gt {
        let within = max > gt;
        if !within {
            return Err(violation(field, Constraint::FloatGt, gt, value));
        }
    }
    if let Some(lt) = rule.float_lt {
        let within = min < lt;
        if !within {
            return Err(violation(field, Constraint::FloatLt, lt, value));
        }
    }
    if let Some(gte) = rule.float_gte {
        let within = max >= gte;
        if !within {
            return Err(violation(field, Constraint::FloatGte, gte, value));
        }
    }
    if let Some(lte) = rule.float_lte {
        let within = min <= lte;
        if !within {
            return Err(violation(field, Constraint::FloatLte, lte, value));
        }
    }
    Ok(())
}

/// Non-emptiness, length bounds and full-string pattern match.
///
/// A pattern that does not compile is logged and skipped.
pub fn check_string(
    field: &FieldDescriptor,
    value: &str,
    rule: &Rule,
    patterns: &PatternCache,
) -> Check {
    if rule.requires_non_empty() && value.is_empty() {
        return Err(violation(field, Constraint::StringNotEmpty, true, value));
    }

    check_length(field, value.len(), rule)?;

    if let Some(pattern) = rule.regex.as_deref() {
        match patterns.get(pattern) {
            Ok(re) => {
                if !re.is_match(value) {
                    return Err(violation(field, Constraint::Regex, pattern, value));
                }
            }
            Err(e) => {
                tracing::warn!(field = field.name(), error = %e, "skipping regex rule");
            }
        }
    }
    Ok(())
}

/// Length bounds on raw bytes.
pub fn check_bytes(field: &FieldDescriptor, value: &[u8], rule: &Rule) -> Check {
    check_length(field, value.len(), rule)
}

/// Declared-value membership, only when `is-in-enum` is true.
pub fn check_enum(
    field: &FieldDescriptor,
    value: i32,
    declared: &EnumDescriptor,
    rule: &Rule,
) -> Check {
    if rule.requires_enum_member() && !declared.contains(value) {
        return Err(violation(field, Constraint::IsInEnum, true, value));
    }
    Ok(())
}

/// Inclusive element-count bounds of a repeated field.
pub fn check_count(field: &FieldDescriptor, count: usize, rule: &Rule) -> Check {
    let count = saturating_i64(count);
    if let Some(min) = rule.repeated_count_min {
        if count < min {
            return Err(violation(field, Constraint::RepeatedCountMin, min, count));
        }
    }
    if let Some(max) = rule.repeated_count_max {
        if count > max {
            return Err(violation(field, Constraint::RepeatedCountMax, max, count));
        }
    }
    Ok(())
}

fn check_length(field: &FieldDescriptor, len: usize, rule: &Rule) -> Check {
    let len = saturating_i64(len);
    if let Some(gt) = rule.length_gt {
        if len <= gt {
            return Err(violation(field, Constraint::LengthGt, gt, len));
        }
    }
    if let Some(lt) = rule.length_lt {
        if len >= lt {
            return Err(violation(field, Constraint::LengthLt, lt, len));
        }
    }
    if let Some(eq) = rule.length_eq {
        if len != eq {
            return Err(violation(field, Constraint::LengthEq, eq, len));
        }
    }
    Ok(())
}

fn saturating_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn violation(
    field: &FieldDescriptor,
    constraint: Constraint,
    threshold: impl Into<Scalar>,
    actual: impl Into<Scalar>,
) -> ValidationError {
    let err = ValidationError::new(field, constraint, threshold, actual);
    tracing::trace!(field = field.name(), constraint = %constraint, "rule violated");
    err
}
