//! Rule file parsing and validation.
//!
//! # Responsibilities
//! - Read the rule file and decode it as JSON
//! - Validate each entry field by field
//! - Build the immutable `RuleTable`
//!
//! # Design Decisions
//! - Fail fast by default: the first invalid entry aborts loading
//! - Within one entry checks run in a fixed order and stop at the first
//!   violation (shape, field names, `in`, `out`, `out_port`, `delay`)
//! - Numeric fields accept integers or strings of decimal digits
//! - No partial table is ever returned

use std::fs;
use std::net::Ipv6Addr;
use std::path::Path;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::rules::error::RuleError;
use crate::rules::rule::{RouteRule, RuleSource};
use crate::rules::table::RuleTable;

/// Field names an entry may carry.
pub const VALID_FIELDS: [&str; 4] = ["in", "out", "out_port", "delay"];

/// How many errors to gather before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Stop at the first invalid entry.
    #[default]
    FailFast,
    /// Validate every entry and report the first error of each.
    CollectAll,
}

/// Load and validate the rule file at `path`.
pub fn load_rule_file(path: &Path) -> Result<RuleTable, RuleError> {
    let origin = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| RuleError::Unreadable {
        origin: origin.clone(),
        source,
    })?;
    parse_rules(&content, &origin)
}

/// Parse rule file contents, stopping at the first error.
///
/// `origin` names where the contents came from and is carried in errors.
pub fn parse_rules(content: &str, origin: &str) -> Result<RuleTable, RuleError> {
    parse_rules_with_mode(content, origin, ParseMode::FailFast).map_err(|mut errors| {
        // FailFast yields exactly one error
        errors.swap_remove(0)
    })
}

/// Parse rule file contents with the given error mode.
///
/// On failure the returned list is never empty.
pub fn parse_rules_with_mode(
    content: &str,
    origin: &str,
    mode: ParseMode,
) -> Result<RuleTable, Vec<RuleError>> {
    let entries = match decode_source(content, origin) {
        Ok(entries) => entries,
        Err(e) => return Err(vec![e]),
    };

    let mut rules = Vec::with_capacity(entries.len());
    let mut errors = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        match parse_entry(entry, index, origin) {
            Ok(rule) => rules.push(rule),
            Err(e) => {
                errors.push(e);
                if mode == ParseMode::FailFast {
                    break;
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(RuleTable::from_rules(rules))
    } else {
        Err(errors)
    }
}

fn decode_source(content: &str, origin: &str) -> Result<Vec<Value>, RuleError> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| RuleError::UnparsableSource {
            origin: origin.to_string(),
            reason: e.to_string(),
        })?;

    match value {
        Value::Array(entries) => Ok(entries),
        other => Err(RuleError::UnparsableSource {
            origin: origin.to_string(),
            reason: format!("top level value is {}, expected a list", kind_of(&other)),
        }),
    }
}

/// Validate one rule entry.
fn parse_entry(entry: &Value, index: usize, origin: &str) -> Result<RouteRule, RuleError> {
    let fields: &Map<String, Value> = entry.as_object().ok_or_else(|| RuleError::MalformedEntry {
        origin: origin.to_string(),
        index,
    })?;

    if let Some(unknown) = fields.keys().find(|k| !VALID_FIELDS.contains(&k.as_str())) {
        return Err(RuleError::UnknownField {
            origin: origin.to_string(),
            index,
            field: unknown.clone(),
        });
    }

    let invalid = |field: &'static str, value: &Value| RuleError::InvalidField {
        origin: origin.to_string(),
        index,
        field,
        value: render(value),
    };
    let missing = |field: &'static str| RuleError::MissingField {
        origin: origin.to_string(),
        index,
        field,
    };

    let source = match fields.get("in") {
        None => RuleSource::Default,
        Some(value) => RuleSource::Address(ipv6(value).ok_or_else(|| invalid("in", value))?),
    };

    let out = fields.get("out").ok_or_else(|| missing("out"))?;
    let destination = ipv6(out).ok_or_else(|| invalid("out", out))?;

    let port = fields.get("out_port").ok_or_else(|| missing("out_port"))?;
    let destination_port = non_negative(port)
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| invalid("out_port", port))?;

    let minimum_delay = match fields.get("delay") {
        None => Duration::ZERO,
        Some(value) => {
            Duration::from_secs(non_negative(value).ok_or_else(|| invalid("delay", value))?)
        }
    };

    Ok(RouteRule {
        source,
        destination: Some(destination),
        destination_port,
        minimum_delay,
    })
}

fn ipv6(value: &Value) -> Option<Ipv6Addr> {
    value.as_str()?.parse().ok()
}

/// Accept a non-negative JSON integer, an integral float, or a string of
/// decimal digits.
fn non_negative(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            let f = n.as_f64()?;
            (f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
        }),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            s.parse().ok()
        }
        _ => None,
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
