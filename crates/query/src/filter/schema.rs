//! Parameter schemas and their validation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, QueryResult};
use crate::types::{QueryParams, ValueType};

/// Describes one request parameter understood by a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescription {
    /// The resource property the parameter constrains.
    pub property: String,

    /// Declared type of the property.
    #[serde(rename = "type")]
    pub value_type: ValueType,

    /// The parameter must be present.
    #[serde(default)]
    pub required: bool,

    /// The parameter may be repeated.
    #[serde(default)]
    pub is_list: bool,

    /// Regular expression every value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Inclusive lower bound for numeric values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Decimal>,

    /// Inclusive upper bound for numeric values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Decimal>,

    /// Allowed values.
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl ParameterDescription {
    /// Creates an optional, single-valued parameter description.
    pub fn new(property: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            property: property.into(),
            value_type,
            required: false,
            is_list: false,
            pattern: None,
            minimum: None,
            maximum: None,
            enum_values: None,
        }
    }

    /// Marks the parameter as repeatable.
    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// Marks the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the value pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Sets the numeric bounds.
    pub fn with_bounds(mut self, minimum: Option<Decimal>, maximum: Option<Decimal>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    /// Restricts values to a fixed set.
    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Parameter name to description.
pub type ParameterSchema = BTreeMap<String, ParameterDescription>;

/// A parameter value that does not satisfy its description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterViolation {
    /// The parameter name.
    pub parameter: String,
    /// What is wrong.
    pub message: String,
}

impl fmt::Display for ParameterViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.parameter, self.message)
    }
}

/// Checks request parameters against a [`ParameterSchema`].
///
/// Patterns are compiled once when the validator is built.
#[derive(Debug, Clone)]
pub struct ParameterValidator {
    entries: Vec<(String, ParameterDescription, Option<Regex>)>,
}

impl ParameterValidator {
    /// Compiles a schema.
    pub fn new(schema: &ParameterSchema) -> QueryResult<Self> {
        let mut entries = Vec::with_capacity(schema.len());
        for (name, description) in schema {
            let regex = match &description.pattern {
                Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                    ConfigError::InvalidPattern {
                        parameter: name.clone(),
                        message: e.to_string(),
                    }
                })?),
                None => None,
            };
            entries.push((name.clone(), description.clone(), regex));
        }
        Ok(Self { entries })
    }

    /// Returns every violation found in `params`.
    pub fn validate(&self, params: &QueryParams) -> Vec<ParameterViolation> {
        let mut violations = Vec::new();
        for (name, description, regex) in &self.entries {
            let values = params.get_all(name);
            let mut report = |message: String| {
                violations.push(ParameterViolation {
                    parameter: name.clone(),
                    message,
                })
            };

            if values.is_empty() {
                if description.required {
                    report("parameter is required".to_string());
                }
                continue;
            }
            if values.len() > 1 && !description.is_list {
                report(format!("expected one value, got {}", values.len()));
            }

            for value in values {
                if let Some(regex) = regex {
                    if !regex.is_match(value) {
                        report(format!("'{}' does not match pattern {}", value, regex.as_str()));
                    }
                }
                if let Some(allowed) = &description.enum_values {
                    if !allowed.iter().any(|a| a == value) {
                        report(format!("'{}' is not one of [{}]", value, allowed.join(", ")));
                    }
                }
                if description.minimum.is_some() || description.maximum.is_some() {
                    match Decimal::from_str(value) {
                        Ok(number) => {
                            if let Some(min) = description.minimum {
                                if number < min {
                                    report(format!("{} is below the minimum {}", value, min));
                                }
                            }
                            if let Some(max) = description.maximum {
                                if number > max {
                                    report(format!("{} is above the maximum {}", value, max));
                                }
                            }
                        }
                        Err(_) => report(format!("'{}' is not a number", value)),
                    }
                }
            }
        }
        violations
    }
}
