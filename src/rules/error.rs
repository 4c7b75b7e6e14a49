//! Rule file error kinds.

use thiserror::Error;

/// Errors raised while loading a rule file.
///
/// Every variant is fatal to startup. Entry positions are zero-based.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The rule file could not be read.
    #[error("could not read rule file {origin}: {source}")]
    Unreadable {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    /// The rule file is not JSON, or its top level is not a list.
    #[error("parsing error in rule file {origin}: {reason}")]
    UnparsableSource { origin: String, reason: String },

    /// An entry is not an object.
    #[error("parsing error in rule file {origin} at entry {index}: entry is not an object")]
    MalformedEntry { origin: String, index: usize },

    /// An entry carries a field outside the recognized set.
    #[error("parsing error in rule file {origin} at entry {index}: unknown field `{field}`")]
    UnknownField {
        origin: String,
        index: usize,
        field: String,
    },

    /// A required field is absent.
    #[error("parsing error in rule file {origin} at entry {index}: missing required field `{field}`")]
    MissingField {
        origin: String,
        index: usize,
        field: &'static str,
    },

    /// A field is present but its value is not acceptable.
    #[error("parsing error in rule file {origin} at entry {index}: bad value {value} for field `{field}`")]
    InvalidField {
        origin: String,
        index: usize,
        field: &'static str,
        value: String,
    },
}

impl RuleError {
    /// Short name of the error kind, used as a log and metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            RuleError::Unreadable { .. } => "unreadable",
            RuleError::UnparsableSource { .. } => "unparsable_source",
            RuleError::MalformedEntry { .. } => "malformed_entry",
            RuleError::UnknownField { .. } => "unknown_field",
            RuleError::MissingField { .. } => "missing_field",
            RuleError::InvalidField { .. } => "invalid_field",
        }
    }

    /// Entry position the error refers to, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            RuleError::Unreadable { .. } | RuleError::UnparsableSource { .. } => None,
            RuleError::MalformedEntry { index, .. }
            | RuleError::UnknownField { index, .. }
            | RuleError::MissingField { index, .. }
            | RuleError::InvalidField { index, .. } => Some(*index),
        }
    }

    /// Diagnostic hint for the operator.
    pub fn hint(&self) -> &'static str {
        match self {
            RuleError::Unreadable { .. } => "Is there a rule file at the configured rule path?",
            RuleError::UnparsableSource { .. } => {
                "Is the rule file not valid JSON? Is the top level value not a list?"
            }
            RuleError::MalformedEntry { .. } => "Is the bad rule not an object?",
            RuleError::UnknownField { .. } => {
                "Is the unknown field not one of `in`, `out`, `out_port`, `delay`?"
            }
            RuleError::MissingField { .. } => "Does every rule have both `out` and `out_port`?",
            RuleError::InvalidField { field, .. } => match *field {
                "in" | "out" => {
                    "Is the bad value not a valid IPv6 address? A plain IPv4 address will not work."
                }
                "out_port" => "Is the bad value not an integer between 0 and 65535?",
                "delay" => "Is the bad value not a positive integer or zero?",
                _ => "Is the value not valid in some way?",
            },
        }
    }
}
