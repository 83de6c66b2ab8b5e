//! Structural checks for request payloads.
//!
//! Every request type declares its fields once, together with the rules that
//! apply to them, and exposes the current value of each field by name.
//! [`validate`] walks that schema; [`format_field_errors`] turns the result
//! into the message returned to the client.

use uuid::{Uuid, Variant, Version};

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Non-empty text, non-nil UUID.
    Required,
    /// Minimum string length (in characters) or minimum numeric value.
    Min(i64),
    /// Maximum string length (in characters) or maximum numeric value.
    Max(i64),
    /// Text that parses as a version 4 UUID.
    UuidV4,
    Custom {
        name: &'static str,
        check: fn(&FieldValue<'_>) -> bool,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    pub name: &'static str,
    /// Serialized name, when it differs from or must be pinned for `name`.
    pub wire_name: Option<&'static str>,
    pub rules: &'static [Rule],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Integer(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Numeric,
}

impl FieldValue<'_> {
    fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Text(_) => ValueKind::Text,
            FieldValue::Integer(_) => ValueKind::Numeric,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    Required,
    Min(i64),
    Max(i64),
    UuidFormat,
    Other(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub kind: ViolationKind,
    pub value_kind: ValueKind,
}

pub trait Validate {
    fn schema() -> &'static [FieldSchema];

    fn field_value(&self, field: &str) -> Option<FieldValue<'_>>;
}

/// Runs every rule of `T`'s schema against `value`.
///
/// Rules for one field are checked in declaration order and the first
/// failing rule is the only one reported for that field.
pub fn validate<T: Validate>(value: &T) -> Result<(), Vec<FieldViolation>> {
    let violations: Vec<FieldViolation> = T::schema()
        .iter()
        .filter_map(|field| {
            let current = value.field_value(field.name)?;
            field
                .rules
                .iter()
                .find_map(|rule| check_rule(rule, &current))
                .map(|kind| FieldViolation {
                    field: field.name,
                    kind,
                    value_kind: current.kind(),
                })
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check_rule(rule: &Rule, value: &FieldValue<'_>) -> Option<ViolationKind> {
    let passed = match (rule, value) {
        (Rule::Required, FieldValue::Text(text)) => !text.is_empty(),
        (Rule::Required, FieldValue::Integer(_)) => true,
        (Rule::Min(min), FieldValue::Text(text)) => char_len(text) >= *min,
        (Rule::Min(min), FieldValue::Integer(number)) => number >= min,
        (Rule::Max(max), FieldValue::Text(text)) => char_len(text) <= *max,
        (Rule::Max(max), FieldValue::Integer(number)) => number <= max,
        (Rule::UuidV4, FieldValue::Text(text)) => is_hyphenated_uuid_v4(text),
        (Rule::UuidV4, FieldValue::Integer(_)) => false,
        (Rule::Custom { check, .. }, value) => check(value),
    };

    if passed {
        return None;
    }

    Some(match rule {
        Rule::Required => ViolationKind::Required,
        Rule::Min(min) => ViolationKind::Min(*min),
        Rule::Max(max) => ViolationKind::Max(*max),
        Rule::UuidV4 => ViolationKind::UuidFormat,
        Rule::Custom { name, .. } => ViolationKind::Other(*name),
    })
}

/// Only the canonical `8-4-4-4-12` form, version 4, RFC 4122 variant.
fn is_hyphenated_uuid_v4(text: &str) -> bool {
    let canonical = text.len() == 36
        && text.bytes().enumerate().all(|(i, b)| match i {
            8 | 13 | 18 | 23 => b == b'-',
            _ => b.is_ascii_hexdigit(),
        });

    canonical
        && Uuid::parse_str(text)
            .map(|uuid| {
                uuid.get_version() == Some(Version::Random)
                    && uuid.get_variant() == Variant::RFC4122
            })
            .unwrap_or(false)
}

fn char_len(text: &str) -> i64 {
    i64::try_from(text.chars().count()).unwrap_or(i64::MAX)
}

/// Renders one human-readable message per violation, joined with `", "`.
pub fn format_field_errors(violations: &[FieldViolation], schema: &[FieldSchema]) -> String {
    violations
        .iter()
        .map(|violation| {
            let name = wire_name(violation.field, schema);
            match (violation.kind, violation.value_kind) {
                (ViolationKind::Required, _) => format!("field {name} is required"),
                (ViolationKind::Min(min), ValueKind::Text) => {
                    format!("field {name} must be at least {min} characters long")
                }
                (ViolationKind::Min(min), ValueKind::Numeric) => {
                    format!("field {name} must be at least {min}")
                }
                (ViolationKind::Max(max), ValueKind::Text) => {
                    format!("field {name} must be no more than {max} characters long")
                }
                (ViolationKind::Max(max), ValueKind::Numeric) => {
                    format!("field {name} must be no more than {max}")
                }
                (ViolationKind::UuidFormat, _) => format!("field {name} must be a valid UUID"),
                (ViolationKind::Other(_), _) => {
                    format!("field {name} is not valid (unknown reason)")
                }
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn wire_name<'a>(field: &'a str, schema: &[FieldSchema]) -> &'a str {
    schema
        .iter()
        .find(|candidate| candidate.name == field)
        .and_then(|candidate| candidate.wire_name)
        .unwrap_or(field)
}
