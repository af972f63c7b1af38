//! Validation rule engine (§4.5.3): REQUIRED/FORMAT/VALUE/LENGTH/PATTERN
//! rules, global ∪ per-MTI union semantics, and the two equivalent
//! configuration surfaces (line syntax and JSON).

mod config;
mod engine;
mod error;
mod rule;

pub use config::{looks_like_json, parse, parse_json, parse_text, render_json, render_text};
pub use engine::{ErrorKind, ValidationEngine, ValidationError};
pub use error::ConfigError;
pub use rule::{FormatRule, LengthRule, LengthSpec, PatternRule, RuleSet, ValueRule};

use std::collections::HashMap;
use fep_core::Mti;

/// Parse a rule document (either surface) straight into a ready-to-use
/// engine (§4.5.3).
pub fn load_engine(input: &str) -> Result<ValidationEngine, ConfigError> {
    let (global, per_mti): (RuleSet, HashMap<Mti, RuleSet>) = parse(input)?;
    Ok(ValidationEngine::new(global, per_mti))
}
