//! Driver-declared parameter schemas.
//!
//! Each driver publishes a [`ParamSchema`]; the registry validates the request's
//! free-form bag against it before the driver runs, so drivers read typed,
//! defaulted values instead of probing the raw map.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::DeliveryError;
use crate::model::Params;

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    Integer,
}

/// Default applied when an optional parameter is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDefault {
    Int(i64),
    Text(&'static str),
}

/// One declared parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<ParamDefault>,
}

impl ParamSpec {
    /// A required, non-empty text parameter.
    pub const fn required_text(key: &'static str) -> Self {
        Self {
            key,
            kind: ParamKind::Text,
            required: true,
            default: None,
        }
    }

    /// A required, non-zero integer parameter.
    pub const fn required_int(key: &'static str) -> Self {
        Self {
            key,
            kind: ParamKind::Integer,
            required: true,
            default: None,
        }
    }

    /// An optional text parameter.
    pub const fn text(key: &'static str, default: Option<&'static str>) -> Self {
        Self {
            key,
            kind: ParamKind::Text,
            required: false,
            default: match default {
                Some(d) => Some(ParamDefault::Text(d)),
                None => None,
            },
        }
    }

    /// An optional integer parameter.
    pub const fn int(key: &'static str, default: Option<i64>) -> Self {
        Self {
            key,
            kind: ParamKind::Integer,
            required: false,
            default: match default {
                Some(d) => Some(ParamDefault::Int(d)),
                None => None,
            },
        }
    }
}

/// A validated parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Int(i64),
    Text(String),
}

/// The set of parameters a driver understands.
#[derive(Debug, Clone, Copy)]
pub struct ParamSchema {
    specs: &'static [ParamSpec],
}

impl ParamSchema {
    pub const fn new(specs: &'static [ParamSpec]) -> Self {
        Self { specs }
    }

    /// Declared parameters, in declaration order.
    pub fn specs(&self) -> &'static [ParamSpec] {
        self.specs
    }

    /// Validate `params`, applying defaults. Undeclared keys are ignored;
    /// null and blank-string values count as absent.
    pub fn validate(&self, params: &Params) -> Result<ValidatedParams, DeliveryError> {
        let mut values = BTreeMap::new();

        for spec in self.specs {
            let raw = params.get(spec.key).filter(|v| !is_absent(v));
            let value = match raw {
                Some(raw) => Some(coerce(spec, raw)?),
                None => spec.default.map(|d| match d {
                    ParamDefault::Int(i) => ParamValue::Int(i),
                    ParamDefault::Text(t) => ParamValue::Text(t.to_string()),
                }),
            };

            let present = match &value {
                Some(ParamValue::Text(t)) => !t.is_empty(),
                Some(ParamValue::Int(i)) => !spec.required || *i != 0,
                None => false,
            };
            if spec.required && !present {
                return Err(DeliveryError::config(format!("{} is required", spec.key)));
            }

            if let Some(value) = value {
                values.insert(spec.key, value);
            }
        }

        Ok(ValidatedParams { values })
    }
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn coerce(spec: &ParamSpec, raw: &Value) -> Result<ParamValue, DeliveryError> {
    let invalid = |expected: &str| {
        DeliveryError::config(format!("parameter '{}' must be {expected}", spec.key))
    };

    match spec.kind {
        ParamKind::Text => match raw {
            Value::String(s) => Ok(ParamValue::Text(s.clone())),
            Value::Number(n) => Ok(ParamValue::Text(n.to_string())),
            _ => Err(invalid("a string")),
        },
        ParamKind::Integer => match raw {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(ParamValue::Int)
                .ok_or_else(|| invalid("an integer")),
            Value::String(s) => s
                .trim()
                .parse()
                .map(ParamValue::Int)
                .map_err(|_| invalid("an integer")),
            _ => Err(invalid("an integer")),
        },
    }
}

/// Parameters after schema validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedParams {
    values: BTreeMap<&'static str, ParamValue>,
}

impl ValidatedParams {
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            ParamValue::Text(t) => Some(t),
            ParamValue::Int(_) => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            ParamValue::Int(i) => Some(*i),
            ParamValue::Text(_) => None,
        }
    }

    /// Text value of a parameter the schema marks required.
    pub fn require_text(&self, key: &str) -> Result<&str, DeliveryError> {
        self.text(key)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DeliveryError::config(format!("{key} is required")))
    }

    /// Integer value of a parameter the schema marks required.
    pub fn require_int(&self, key: &str) -> Result<i64, DeliveryError> {
        self.int(key)
            .ok_or_else(|| DeliveryError::config(format!("{key} is required")))
    }
}
