//! Rule evaluation against a decoded message (§4.5.3).

use std::collections::HashMap;
use std::fmt;

use fep_codec::FieldType;
use fep_core::{FieldId, Message, Mti};

use crate::rule::RuleSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Required,
    Format,
    Value,
    Length,
    Pattern,
}

/// One failed rule, carrying enough detail for the audit trail (§4.5.3 "each
/// carrying field, error kind, expected, actual, and a message").
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: FieldId,
    pub kind: ErrorKind,
    pub expected: String,
    pub actual: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

fn matches_charset(field_type: FieldType, value: &str) -> bool {
    match field_type {
        FieldType::N => value.bytes().all(|b| b.is_ascii_digit()),
        FieldType::A => value.bytes().all(|b| b.is_ascii_alphabetic()),
        FieldType::An => value.bytes().all(|b| b.is_ascii_alphanumeric()),
        FieldType::Ans => value.bytes().all(|b| b.is_ascii_graphic() || b == b' '),
        FieldType::B => true,
    }
}

fn field_text<'a>(msg: &'a Message, id: &FieldId) -> Option<&'a str> {
    msg.field_str(id.clone()).ok().flatten()
}

/// Evaluates a [`RuleSet`] (after the global ∪ per-MTI union has already
/// been computed) against one message.
pub(crate) fn evaluate(rules: &RuleSet, msg: &Message) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for field in &rules.required {
        if !msg.has_field(field.clone()) {
            errors.push(ValidationError {
                field: field.clone(),
                kind: ErrorKind::Required,
                expected: "present".to_string(),
                actual: "missing".to_string(),
                message: format!("Required field {field} is missing"),
            });
        }
    }

    for rule in &rules.formats {
        let Some(value) = field_text(msg, &rule.field) else { continue };
        if !rule.length.accepts(value.len()) {
            errors.push(ValidationError {
                field: rule.field.clone(),
                kind: ErrorKind::Format,
                expected: format!("{:?} length matching the configured spec", rule.field_type),
                actual: value.len().to_string(),
                message: format!("Field {} has invalid length {}", rule.field, value.len()),
            });
            continue;
        }
        if !matches_charset(rule.field_type, value) {
            errors.push(ValidationError {
                field: rule.field.clone(),
                kind: ErrorKind::Format,
                expected: format!("{:?} charset", rule.field_type),
                actual: value.to_string(),
                message: format!("Field {} does not match the expected character set", rule.field),
            });
        }
    }

    for rule in &rules.values {
        let Some(value) = field_text(msg, &rule.field) else { continue };
        if !rule.allowed.iter().any(|v| v == value) {
            errors.push(ValidationError {
                field: rule.field.clone(),
                kind: ErrorKind::Value,
                expected: rule.allowed.join(","),
                actual: value.to_string(),
                message: format!("Field {} value '{}' is not an allowed value", rule.field, value),
            });
        }
    }

    for rule in &rules.lengths {
        let Some(value) = field_text(msg, &rule.field) else { continue };
        if value.len() != rule.exact {
            errors.push(ValidationError {
                field: rule.field.clone(),
                kind: ErrorKind::Length,
                expected: rule.exact.to_string(),
                actual: value.len().to_string(),
                message: format!("Field {} expected length {}, got {}", rule.field, rule.exact, value.len()),
            });
        }
    }

    for rule in &rules.patterns {
        let Some(value) = field_text(msg, &rule.field) else { continue };
        if !rule.pattern.is_match(value) {
            errors.push(ValidationError {
                field: rule.field.clone(),
                kind: ErrorKind::Pattern,
                expected: rule.source.clone(),
                actual: value.to_string(),
                message: format!("Field {} does not match pattern '{}'", rule.field, rule.source),
            });
        }
    }

    errors
}

/// Global rules plus per-MTI overrides (§4.5.3). Build via
/// [`crate::config::parse`], then call [`ValidationEngine::validate`] per
/// inbound message.
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    pub global: RuleSet,
    pub per_mti: HashMap<Mti, RuleSet>,
}

impl ValidationEngine {
    pub fn new(global: RuleSet, per_mti: HashMap<Mti, RuleSet>) -> Self {
        ValidationEngine { global, per_mti }
    }

    /// Runs the declared rule set against `msg`, applying global ∪
    /// MTI-specific rules when an override exists for this message's MTI.
    pub fn validate(&self, msg: &Message) -> Result<(), Vec<ValidationError>> {
        let effective = match self.per_mti.get(&msg.mti()) {
            Some(specific) => self.global.union(specific),
            None => self.global.clone(),
        };
        let errors = evaluate(&effective, msg);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
