use std::fmt;

/// Errors raised while parsing a rule-set document, in either surface
/// (§4.5.3 "two equivalent configuration surfaces").
#[derive(Debug)]
pub enum ConfigError {
    UnknownRuleKind(String),
    MalformedStatement(String),
    BadFieldId(String),
    BadFormatBody(String),
    BadLength(String),
    BadRegex(String, regex::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownRuleKind(k) => write!(f, "unknown rule kind '{k}'"),
            ConfigError::MalformedStatement(s) => write!(f, "malformed rule statement '{s}'"),
            ConfigError::BadFieldId(s) => write!(f, "invalid field id '{s}'"),
            ConfigError::BadFormatBody(s) => write!(f, "invalid FORMAT body '{s}', expected TYPE(len) e.g. N(13-19)"),
            ConfigError::BadLength(s) => write!(f, "invalid length spec '{s}'"),
            ConfigError::BadRegex(s, e) => write!(f, "invalid PATTERN regex '{s}': {e}"),
            ConfigError::Json(e) => write!(f, "invalid JSON rule document: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}
