//! Domain rule types and the compact mini-language shared by both
//! configuration surfaces (§4.5.3): a FORMAT body like `N(13-19)` parses and
//! renders the same whether it arrived embedded in the line syntax or as a
//! JSON string value.

use fep_codec::FieldType;
use fep_core::FieldId;
use regex::Regex;

use crate::error::ConfigError;

/// A field id as it appears in either configuration surface: digits parse
/// as the ISO-8583 numeric tag, anything else is a generic named field.
pub fn parse_field_id(s: &str) -> FieldId {
    match s.trim().parse::<u32>() {
        Ok(n) => FieldId::Numeric(n),
        Err(_) => FieldId::Named(s.trim().to_string()),
    }
}

pub fn render_field_id(id: &FieldId) -> String {
    id.to_string()
}

fn parse_field_type(s: &str) -> Result<FieldType, ConfigError> {
    match s {
        "N" => Ok(FieldType::N),
        "A" => Ok(FieldType::A),
        "AN" => Ok(FieldType::An),
        "ANS" => Ok(FieldType::Ans),
        "B" => Ok(FieldType::B),
        other => Err(ConfigError::BadFormatBody(other.to_string())),
    }
}

fn render_field_type(t: FieldType) -> &'static str {
    match t {
        FieldType::N => "N",
        FieldType::A => "A",
        FieldType::An => "AN",
        FieldType::Ans => "ANS",
        FieldType::B => "B",
    }
}

/// A FORMAT rule's length constraint: exact, a closed range `L-H`, or an
/// upper bound `..H` (§4.5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthSpec {
    Exact(usize),
    Range(usize, usize),
    UpperBound(usize),
}

impl LengthSpec {
    pub fn accepts(&self, len: usize) -> bool {
        match *self {
            LengthSpec::Exact(n) => len == n,
            LengthSpec::Range(lo, hi) => (lo..=hi).contains(&len),
            LengthSpec::UpperBound(hi) => len <= hi,
        }
    }

    fn parse(s: &str) -> Result<Self, ConfigError> {
        let s = s.trim();
        if let Some(upper) = s.strip_prefix("..") {
            let hi = upper.parse().map_err(|_| ConfigError::BadLength(s.to_string()))?;
            return Ok(LengthSpec::UpperBound(hi));
        }
        if let Some((lo, hi)) = s.split_once('-') {
            let lo = lo.trim().parse().map_err(|_| ConfigError::BadLength(s.to_string()))?;
            let hi = hi.trim().parse().map_err(|_| ConfigError::BadLength(s.to_string()))?;
            return Ok(LengthSpec::Range(lo, hi));
        }
        let exact = s.parse().map_err(|_| ConfigError::BadLength(s.to_string()))?;
        Ok(LengthSpec::Exact(exact))
    }

    fn render(&self) -> String {
        match self {
            LengthSpec::Exact(n) => n.to_string(),
            LengthSpec::Range(lo, hi) => format!("{lo}-{hi}"),
            LengthSpec::UpperBound(hi) => format!("..{hi}"),
        }
    }
}

/// Parse a FORMAT rule body, e.g. `N(13-19)`, `AN(..40)`, `N(16)`.
pub fn parse_format_body(body: &str) -> Result<(FieldType, LengthSpec), ConfigError> {
    let body = body.trim();
    let open = body.find('(').ok_or_else(|| ConfigError::BadFormatBody(body.to_string()))?;
    let close = body
        .strip_suffix(')')
        .ok_or_else(|| ConfigError::BadFormatBody(body.to_string()))?;
    let field_type = parse_field_type(&body[..open])?;
    let length = LengthSpec::parse(&close[open + 1..])?;
    Ok((field_type, length))
}

pub fn render_format_body(field_type: FieldType, length: LengthSpec) -> String {
    format!("{}({})", render_field_type(field_type), length.render())
}

#[derive(Debug, Clone)]
pub struct FormatRule {
    pub field: FieldId,
    pub field_type: FieldType,
    pub length: LengthSpec,
}

#[derive(Debug, Clone)]
pub struct ValueRule {
    pub field: FieldId,
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LengthRule {
    pub field: FieldId,
    pub exact: usize,
}

/// A PATTERN rule. Keeps the original source alongside the compiled
/// `Regex` (which has no `PartialEq`) so the rule can be rendered back
/// losslessly.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub field: FieldId,
    pub source: String,
    pub pattern: Regex,
}

impl PatternRule {
    pub fn new(field: FieldId, source: &str) -> Result<Self, ConfigError> {
        let pattern = Regex::new(source).map_err(|e| ConfigError::BadRegex(source.to_string(), e))?;
        Ok(PatternRule { field, source: source.to_string(), pattern })
    }
}

/// One complete set of rules — either the global set, or one MTI's
/// overrides (§4.5.3 "Rules may be global or scoped to one MTI").
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub required: Vec<FieldId>,
    pub formats: Vec<FormatRule>,
    pub values: Vec<ValueRule>,
    pub lengths: Vec<LengthRule>,
    pub patterns: Vec<PatternRule>,
}

impl RuleSet {
    /// Global ∪ MTI-specific, per §4.5.3 "when both exist, the evaluator
    /// applies the union".
    pub fn union(&self, other: &RuleSet) -> RuleSet {
        RuleSet {
            required: self.required.iter().chain(&other.required).cloned().collect(),
            formats: self.formats.iter().chain(&other.formats).cloned().collect(),
            values: self.values.iter().chain(&other.values).cloned().collect(),
            lengths: self.lengths.iter().chain(&other.lengths).cloned().collect(),
            patterns: self.patterns.iter().chain(&other.patterns).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
            && self.formats.is_empty()
            && self.values.is_empty()
            && self.lengths.is_empty()
            && self.patterns.is_empty()
    }
}
