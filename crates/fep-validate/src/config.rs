//! The two equivalent configuration surfaces (§4.5.3): a compact
//! line-oriented text syntax and an equivalent JSON document. Auto-detection
//! picks JSON if the input parses as a JSON object, otherwise the line
//! syntax. Both sides share the same per-field rule-body mini-language
//! (`rule::parse_format_body` et al.), so round-tripping between them
//! preserves semantics even though the outer shape differs.

use std::collections::HashMap;

use fep_core::Mti;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::ConfigError;
use crate::rule::{self, FormatRule, LengthRule, PatternRule, RuleSet, ValueRule};

/// Parse either surface, auto-detecting JSON vs. the line syntax (§4.5.3).
pub fn parse(input: &str) -> Result<(RuleSet, HashMap<Mti, RuleSet>), ConfigError> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') {
        parse_json(input)
    } else {
        parse_text(input)
    }
}

// ---- line syntax ------------------------------------------------------

/// `REQUIRED:2,3,4;FORMAT:2=N(13-19);MTI:0800=REQUIRED:70` (§4.5.3).
pub fn parse_text(input: &str) -> Result<(RuleSet, HashMap<Mti, RuleSet>), ConfigError> {
    let mut global = RuleSet::default();
    let mut per_mti: HashMap<Mti, RuleSet> = HashMap::new();

    for statement in input.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        if let Some(rest) = statement.strip_prefix("MTI:") {
            let (mti_str, inner) = rest
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedStatement(statement.to_string()))?;
            let mti = Mti::parse(mti_str.trim()).map_err(|_| ConfigError::MalformedStatement(statement.to_string()))?;
            let entry = per_mti.entry(mti).or_default();
            apply_statement(inner, entry)?;
        } else {
            apply_statement(statement, &mut global)?;
        }
    }

    Ok((global, per_mti))
}

fn apply_statement(statement: &str, target: &mut RuleSet) -> Result<(), ConfigError> {
    let (kind, body) = statement
        .split_once(':')
        .ok_or_else(|| ConfigError::MalformedStatement(statement.to_string()))?;

    match kind.trim() {
        "REQUIRED" => {
            for id in body.split(',') {
                let id = id.trim();
                if !id.is_empty() {
                    target.required.push(rule::parse_field_id(id));
                }
            }
        }
        "FORMAT" => {
            let (field, spec) = body
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedStatement(statement.to_string()))?;
            let (field_type, length) = rule::parse_format_body(spec)?;
            target.formats.push(FormatRule { field: rule::parse_field_id(field), field_type, length });
        }
        "VALUE" => {
            let (field, values) = body
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedStatement(statement.to_string()))?;
            let allowed = values.split(',').map(|v| v.trim().to_string()).collect();
            target.values.push(ValueRule { field: rule::parse_field_id(field), allowed });
        }
        "LENGTH" => {
            let (field, exact) = body
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedStatement(statement.to_string()))?;
            let exact = exact.trim().parse().map_err(|_| ConfigError::BadLength(exact.to_string()))?;
            target.lengths.push(LengthRule { field: rule::parse_field_id(field), exact });
        }
        "PATTERN" => {
            let (field, regex) = body
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedStatement(statement.to_string()))?;
            target.patterns.push(PatternRule::new(rule::parse_field_id(field), regex.trim())?);
        }
        other => return Err(ConfigError::UnknownRuleKind(other.to_string())),
    }
    Ok(())
}

pub fn render_text(global: &RuleSet, per_mti: &HashMap<Mti, RuleSet>) -> String {
    let mut statements = Vec::new();
    render_ruleset_statements(global, &mut statements);

    let mut mti_ids: Vec<&Mti> = per_mti.keys().collect();
    mti_ids.sort_by_key(|m| m.as_str().to_string());
    for mti in mti_ids {
        let rules = &per_mti[mti];
        let mut inner = Vec::new();
        render_ruleset_statements(rules, &mut inner);
        for stmt in inner {
            statements.push(format!("MTI:{}={}", mti.as_str(), stmt));
        }
    }

    statements.join(";")
}

fn render_ruleset_statements(rules: &RuleSet, out: &mut Vec<String>) {
    if !rules.required.is_empty() {
        let ids: Vec<String> = rules.required.iter().map(rule::render_field_id).collect();
        out.push(format!("REQUIRED:{}", ids.join(",")));
    }
    for f in &rules.formats {
        out.push(format!(
            "FORMAT:{}={}",
            rule::render_field_id(&f.field),
            rule::render_format_body(f.field_type, f.length)
        ));
    }
    for v in &rules.values {
        out.push(format!("VALUE:{}={}", rule::render_field_id(&v.field), v.allowed.join(",")));
    }
    for l in &rules.lengths {
        out.push(format!("LENGTH:{}={}", rule::render_field_id(&l.field), l.exact));
    }
    for p in &rules.patterns {
        out.push(format!("PATTERN:{}={}", rule::render_field_id(&p.field), p.source));
    }
}

// ---- JSON surface ----------------------------------------------------

#[derive(Serialize, Deserialize, Default)]
struct RuleSetDto {
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    format: HashMap<String, String>,
    #[serde(default)]
    value: HashMap<String, Vec<String>>,
    #[serde(default)]
    length: HashMap<String, usize>,
    #[serde(default)]
    pattern: HashMap<String, String>,
}

#[derive(Serialize, Deserialize, Default)]
struct ConfigDto {
    #[serde(flatten)]
    global: RuleSetDto,
    #[serde(default)]
    mti: HashMap<String, RuleSetDto>,
}

fn dto_to_ruleset(dto: RuleSetDto) -> Result<RuleSet, ConfigError> {
    let mut rules = RuleSet::default();
    rules.required = dto.required.iter().map(|s| rule::parse_field_id(s)).collect();
    for (field, body) in &dto.format {
        let (field_type, length) = rule::parse_format_body(body)?;
        rules.formats.push(FormatRule { field: rule::parse_field_id(field), field_type, length });
    }
    for (field, allowed) in dto.value {
        rules.values.push(ValueRule { field: rule::parse_field_id(&field), allowed });
    }
    for (field, exact) in dto.length {
        rules.lengths.push(LengthRule { field: rule::parse_field_id(&field), exact });
    }
    for (field, source) in &dto.pattern {
        rules.patterns.push(PatternRule::new(rule::parse_field_id(field), source)?);
    }
    Ok(rules)
}

fn ruleset_to_dto(rules: &RuleSet) -> RuleSetDto {
    RuleSetDto {
        required: rules.required.iter().map(rule::render_field_id).collect(),
        format: rules
            .formats
            .iter()
            .map(|f| (rule::render_field_id(&f.field), rule::render_format_body(f.field_type, f.length)))
            .collect(),
        value: rules.values.iter().map(|v| (rule::render_field_id(&v.field), v.allowed.clone())).collect(),
        length: rules.lengths.iter().map(|l| (rule::render_field_id(&l.field), l.exact)).collect(),
        pattern: rules.patterns.iter().map(|p| (rule::render_field_id(&p.field), p.source.clone())).collect(),
    }
}

pub fn parse_json(input: &str) -> Result<(RuleSet, HashMap<Mti, RuleSet>), ConfigError> {
    let dto: ConfigDto = serde_json::from_str(input)?;
    let global = dto_to_ruleset(dto.global)?;
    let mut per_mti = HashMap::new();
    for (mti_str, rule_dto) in dto.mti {
        let mti = Mti::parse(&mti_str).map_err(|_| ConfigError::MalformedStatement(mti_str))?;
        per_mti.insert(mti, dto_to_ruleset(rule_dto)?);
    }
    Ok((global, per_mti))
}

pub fn render_json(global: &RuleSet, per_mti: &HashMap<Mti, RuleSet>) -> Result<String, ConfigError> {
    let dto = ConfigDto {
        global: ruleset_to_dto(global),
        mti: per_mti.iter().map(|(mti, rules)| (mti.as_str().to_string(), ruleset_to_dto(rules))).collect(),
    };
    Ok(serde_json::to_string_pretty(&dto)?)
}

/// Detects which surface a string uses, without fully parsing it — used by
/// tooling that wants to know the format ahead of time.
pub fn looks_like_json(input: &str) -> bool {
    matches!(serde_json::from_str::<Json>(input.trim()), Ok(Json::Object(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fep_core::FieldId;

    #[test]
    fn parses_the_example_line_syntax() {
        let (global, per_mti) = parse_text("REQUIRED:2,3,4;FORMAT:2=N(13-19);MTI:0800=REQUIRED:70").unwrap();
        assert_eq!(global.required.len(), 3);
        assert_eq!(global.formats.len(), 1);
        assert_eq!(per_mti.len(), 1);
        let mti_rules = per_mti.get(&Mti::parse("0800").unwrap()).unwrap();
        assert_eq!(mti_rules.required, vec![FieldId::Numeric(70)]);
    }

    #[test]
    fn auto_detects_json_vs_text() {
        assert!(looks_like_json(r#"{"required": ["11"]}"#));
        assert!(!looks_like_json("REQUIRED:11"));
    }

    #[test]
    fn text_to_json_round_trip_preserves_semantics() {
        let text = "REQUIRED:2,3,4;FORMAT:2=N(13-19);VALUE:39=00,05;LENGTH:41=8;PATTERN:41=^[A-Z0-9]+$;MTI:0800=REQUIRED:70";
        let (global, per_mti) = parse_text(text).unwrap();
        let json = render_json(&global, &per_mti).unwrap();
        let (global2, per_mti2) = parse_json(&json).unwrap();

        assert_eq!(global.required, global2.required);
        assert_eq!(global.formats.len(), global2.formats.len());
        assert_eq!(global.values.len(), global2.values.len());
        assert_eq!(global.lengths.len(), global2.lengths.len());
        assert_eq!(global.patterns.len(), global2.patterns.len());
        assert_eq!(per_mti.len(), per_mti2.len());
    }

    #[test]
    fn json_to_text_round_trip_preserves_semantics() {
        let json = r#"{
            "required": ["2", "3"],
            "format": {"2": "N(13-19)"},
            "mti": {"0800": {"required": ["70"]}}
        }"#;
        let (global, per_mti) = parse_json(json).unwrap();
        let text = render_text(&global, &per_mti);
        let (global2, per_mti2) = parse_text(&text).unwrap();

        assert_eq!(global.required, global2.required);
        assert_eq!(global.formats.len(), global2.formats.len());
        assert_eq!(per_mti.len(), per_mti2.len());
    }

    #[test]
    fn auto_parse_dispatches_correctly() {
        let (g1, _) = parse("REQUIRED:2").unwrap();
        let (g2, _) = parse(r#"{"required": ["2"]}"#).unwrap();
        assert_eq!(g1.required, g2.required);
    }
}
