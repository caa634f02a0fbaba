//! The fare rule table and the two layers that consume it.
//!
//! Every field of a fare request has exactly one [`FieldRule`] in
//! [`FARE_RULES`]. The interactive layer ([`report`], [`check_field`])
//! reports each field on its own so a form can show errors next to its
//! inputs. The final gate ([`validate`]) re-checks every field in table
//! order and stops at the first failure; nothing reaches the model without
//! passing it.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

use crate::error::FareError;
use crate::request::{FareRequest, RawFareRequest, FEATURE_COUNT};

/// Accepted values for a single field. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Domain {
    OneOf(&'static [i64]),
    IntRange { min: i64, max: i64 },
    FloatRange { min: f64, max: f64 },
}

impl Domain {
    /// Returns the value as a number when it lies inside the domain.
    /// Values are never clamped or parsed from strings.
    pub fn accept(&self, value: &Value) -> Option<f64> {
        match *self {
            Domain::OneOf(set) => as_integer(value)
                .filter(|v| set.contains(v))
                .map(|v| v as f64),
            Domain::IntRange { min, max } => as_integer(value)
                .filter(|v| (min..=max).contains(v))
                .map(|v| v as f64),
            Domain::FloatRange { min, max } => value.as_f64().filter(|v| (min..=max).contains(v)),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::OneOf([only]) => write!(f, "{only}"),
            Domain::OneOf([a, b]) => write!(f, "{a} or {b}"),
            Domain::OneOf(set) => {
                let joined: Vec<String> = set.iter().map(|v| v.to_string()).collect();
                write!(f, "one of {}", joined.join(", "))
            }
            Domain::IntRange { min, max } => write!(f, "between {min} and {max}"),
            Domain::FloatRange { min, max } => write!(f, "between {min} and {max}"),
        }
    }
}

// JSON has one number type; `2.0` is as integral as `2`.
fn as_integer(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(v) = n.as_i64() {
        return Some(v);
    }
    let v = n.as_f64()?;
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// One row of the rule table.
#[derive(Debug, PartialEq)]
pub struct FieldRule {
    pub field: &'static str,
    pub domain: Domain,
}

impl FieldRule {
    /// Presence first, then domain.
    pub fn check(&self, value: Option<&Value>) -> Result<f64, FareError> {
        let value = match value {
            None | Some(Value::Null) => {
                return Err(FareError::MissingField { field: self.field });
            }
            Some(value) => value,
        };
        self.domain.accept(value).ok_or(FareError::OutOfDomain {
            field: self.field,
            bound: self.domain,
        })
    }
}

/// Rules in the order the final gate checks them. The order matches
/// the model's feature columns.
pub static FARE_RULES: [FieldRule; FEATURE_COUNT] = [
    FieldRule {
        field: "vendor_id",
        domain: Domain::OneOf(&[1, 2]),
    },
    FieldRule {
        field: "pickup_location_id",
        domain: Domain::IntRange { min: 1, max: 265 },
    },
    FieldRule {
        field: "dropoff_location_id",
        domain: Domain::IntRange { min: 1, max: 265 },
    },
    FieldRule {
        field: "weekday",
        domain: Domain::IntRange { min: 0, max: 6 },
    },
    FieldRule {
        field: "time_of_day",
        domain: Domain::FloatRange {
            min: 0.0,
            max: 23.99,
        },
    },
    FieldRule {
        field: "passenger_count",
        // seats in a licensed cab
        domain: Domain::IntRange { min: 1, max: 6 },
    },
];

static RULE_INDEX: Lazy<HashMap<&'static str, &'static FieldRule>> = Lazy::new(|| {
    let mut index: HashMap<_, _> = FARE_RULES.iter().map(|r| (r.field, r)).collect();
    // short names used by the form inputs
    index.insert("pickup_id", &FARE_RULES[1]);
    index.insert("dropoff_id", &FARE_RULES[2]);
    index
});

/// Looks up a rule by field name.
pub fn rule(field: &str) -> Option<&'static FieldRule> {
    RULE_INDEX.get(field).copied()
}

/// Authoritative gate: every field, table order, first error wins.
pub fn validate(raw: &RawFareRequest) -> Result<FareRequest, FareError> {
    let mut values = [0.0; FEATURE_COUNT];
    for (slot, rule) in values.iter_mut().zip(FARE_RULES.iter()) {
        *slot = rule.check(raw.get(rule.field))?;
    }
    Ok(FareRequest::from_checked(values))
}

/// Interactive check of a single value. `None` means the value is fine.
pub fn check_field(rule: &FieldRule, value: Option<&Value>) -> Option<String> {
    rule.check(value).err().map(|e| e.to_string())
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FieldStatus {
    pub field: &'static str,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub fields: Vec<FieldStatus>,
}

impl ValidationReport {
    pub fn first_error(&self) -> Option<&str> {
        self.fields.iter().find_map(|f| f.error.as_deref())
    }
}

/// Interactive layer: one status per field, all fields checked.
pub fn report(raw: &RawFareRequest) -> ValidationReport {
    let fields: Vec<FieldStatus> = FARE_RULES
        .iter()
        .map(|rule| FieldStatus {
            field: rule.field,
            error: check_field(rule, raw.get(rule.field)),
        })
        .collect();
    ValidationReport {
        valid: fields.iter().all(|f| f.error.is_none()),
        fields,
    }
}
