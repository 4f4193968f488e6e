//! Built-in filters.

use std::sync::Arc;

use tracing::debug;

use crate::core::{Operation, RequestContext};
use crate::error::{FilterError, QueryResult};
use crate::identifier::DenormalizerChain;
use crate::metadata::ResourceMetadata;
use crate::types::{ComparisonOp, Condition, QueryPlan, TypedValue, ValueType};

use super::schema::{ParameterDescription, ParameterSchema};
use super::{Filter, FilterEffect};

const BOOLEAN_VALUES: [&str; 4] = ["true", "false", "1", "0"];

fn declared_type(filter: &str, resource: &ResourceMetadata, property: &str) -> QueryResult<ValueType> {
    resource.property_type(property).ok_or_else(|| {
        FilterError::UnknownProperty {
            filter_id: filter.to_string(),
            resource: resource.name().to_string(),
            property: property.to_string(),
        }
        .into()
    })
}

fn typed(
    chain: &DenormalizerChain,
    parameter: &str,
    raw: &str,
    target: ValueType,
) -> QueryResult<TypedValue> {
    chain.convert(raw, target).map_err(|e| {
        FilterError::InvalidFilterValue {
            parameter: parameter.to_string(),
            value: raw.to_string(),
            reason: e.reason,
        }
        .into()
    })
}

fn fold(mut conditions: Vec<Condition>) -> FilterEffect {
    match conditions.len() {
        0 => FilterEffect::Skipped,
        1 => FilterEffect::Condition(conditions.remove(0)),
        _ => FilterEffect::Condition(Condition::and(conditions)),
    }
}

fn schema_type(resource: &ResourceMetadata, property: &str) -> ValueType {
    resource.property_type(property).unwrap_or_default()
}

/// Equality on one or more values: `?status=draft` or `?status[]=a&status[]=b`.
#[derive(Debug, Clone)]
pub struct ExactFilter {
    id: String,
    properties: Vec<String>,
    chain: Arc<DenormalizerChain>,
}

impl ExactFilter {
    /// Creates an exact filter over the given properties.
    pub fn new(id: impl Into<String>, properties: Vec<String>, chain: Arc<DenormalizerChain>) -> Self {
        Self {
            id: id.into(),
            properties,
            chain,
        }
    }
}

impl Filter for ExactFilter {
    fn name(&self) -> &str {
        &self.id
    }

    fn properties(&self) -> &[String] {
        &self.properties
    }

    fn description(&self, resource: &ResourceMetadata) -> ParameterSchema {
        let mut schema = ParameterSchema::new();
        for property in &self.properties {
            let value_type = schema_type(resource, property);
            let mut single = ParameterDescription::new(property.clone(), value_type);
            if value_type == ValueType::Boolean {
                single = single.with_enum(BOOLEAN_VALUES);
            }
            schema.insert(format!("{}[]", property), single.clone().list());
            schema.insert(property.clone(), single);
        }
        schema
    }

    fn apply(
        &self,
        _plan: &mut QueryPlan,
        resource: &ResourceMetadata,
        _operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<FilterEffect> {
        let mut conditions = Vec::new();
        for property in &self.properties {
            let raw_values = context.params().values(property);
            if raw_values.is_empty() {
                continue;
            }
            let value_type = declared_type(&self.id, resource, property)?;
            let values = raw_values
                .into_iter()
                .map(|raw| typed(&self.chain, property, raw, value_type))
                .collect::<QueryResult<Vec<_>>>()?;
            conditions.push(Condition::any(ComparisonOp::Eq, property.clone(), values)?);
        }
        Ok(fold(conditions))
    }
}

/// Inequality: `?status[neq]=archived`. Repeated values must all differ.
#[derive(Debug, Clone)]
pub struct ExcludeFilter {
    id: String,
    properties: Vec<String>,
    chain: Arc<DenormalizerChain>,
}

impl ExcludeFilter {
    /// Operator key inside the brackets.
    pub const OPERATOR: &'static str = "neq";

    /// Creates an exclude filter over the given properties.
    pub fn new(id: impl Into<String>, properties: Vec<String>, chain: Arc<DenormalizerChain>) -> Self {
        Self {
            id: id.into(),
            properties,
            chain,
        }
    }
}

impl Filter for ExcludeFilter {
    fn name(&self) -> &str {
        &self.id
    }

    fn properties(&self) -> &[String] {
        &self.properties
    }

    fn description(&self, resource: &ResourceMetadata) -> ParameterSchema {
        let mut schema = ParameterSchema::new();
        for property in &self.properties {
            schema.insert(
                format!("{}[{}]", property, Self::OPERATOR),
                ParameterDescription::new(property.clone(), schema_type(resource, property)).list(),
            );
        }
        schema
    }

    fn apply(
        &self,
        _plan: &mut QueryPlan,
        resource: &ResourceMetadata,
        _operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<FilterEffect> {
        let mut conditions = Vec::new();
        for property in &self.properties {
            let raw_values: Vec<&str> = context
                .params()
                .nested(property)
                .into_iter()
                .filter(|(op, _)| *op == Self::OPERATOR)
                .map(|(_, v)| v)
                .collect();
            if raw_values.is_empty() {
                continue;
            }
            let value_type = declared_type(&self.id, resource, property)?;
            let parameter = format!("{}[{}]", property, Self::OPERATOR);
            for raw in raw_values {
                let value = typed(&self.chain, &parameter, raw, value_type)?;
                conditions.push(Condition::neq(property.clone(), value));
            }
        }
        Ok(fold(conditions))
    }
}

/// Bounds: `?price[gte]=10`, `?price[lte]=20`, `?price[between]=10..20`.
#[derive(Debug, Clone)]
pub struct RangeFilter {
    id: String,
    properties: Vec<String>,
    chain: Arc<DenormalizerChain>,
}

impl RangeFilter {
    /// Separator of the two bounds of `between`.
    pub const BETWEEN_SEPARATOR: &'static str = "..";

    /// Creates a range filter over the given properties.
    pub fn new(id: impl Into<String>, properties: Vec<String>, chain: Arc<DenormalizerChain>) -> Self {
        Self {
            id: id.into(),
            properties,
            chain,
        }
    }
}

impl Filter for RangeFilter {
    fn name(&self) -> &str {
        &self.id
    }

    fn properties(&self) -> &[String] {
        &self.properties
    }

    fn description(&self, resource: &ResourceMetadata) -> ParameterSchema {
        let mut schema = ParameterSchema::new();
        for property in &self.properties {
            let value_type = schema_type(resource, property);
            for op in ["gte", "lte"] {
                schema.insert(
                    format!("{}[{}]", property, op),
                    ParameterDescription::new(property.clone(), value_type),
                );
            }
            schema.insert(
                format!("{}[between]", property),
                ParameterDescription::new(property.clone(), value_type).with_pattern(r"^.+\.\..+$"),
            );
        }
        schema
    }

    fn apply(
        &self,
        _plan: &mut QueryPlan,
        resource: &ResourceMetadata,
        _operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<FilterEffect> {
        let mut conditions = Vec::new();
        for property in &self.properties {
            for (op, raw) in context.params().nested(property) {
                let parameter = format!("{}[{}]", property, op);
                match op {
                    "gte" | "lte" | "between" => {}
                    _ => continue,
                }
                let value_type = declared_type(&self.id, resource, property)?;
                match op {
                    "gte" => {
                        let value = typed(&self.chain, &parameter, raw, value_type)?;
                        conditions.push(Condition::gte(property.clone(), value));
                    }
                    "lte" => {
                        let value = typed(&self.chain, &parameter, raw, value_type)?;
                        conditions.push(Condition::lte(property.clone(), value));
                    }
                    _ => {
                        let (low, high) = raw.split_once(Self::BETWEEN_SEPARATOR).ok_or_else(|| {
                            FilterError::InvalidFilterValue {
                                parameter: parameter.clone(),
                                value: raw.to_string(),
                                reason: "expected <low>..<high>".to_string(),
                            }
                        })?;
                        let low = typed(&self.chain, &parameter, low, value_type)?;
                        let high = typed(&self.chain, &parameter, high, value_type)?;
                        conditions.push(Condition::and(vec![
                            Condition::gte(property.clone(), low),
                            Condition::lte(property.clone(), high),
                        ]));
                    }
                }
            }
        }
        Ok(fold(conditions))
    }
}

/// Boolean equality: `?available=true`. Unparseable values are ignored.
#[derive(Debug, Clone)]
pub struct BooleanFilter {
    id: String,
    properties: Vec<String>,
    chain: Arc<DenormalizerChain>,
}

impl BooleanFilter {
    /// Creates a boolean filter over the given properties.
    pub fn new(id: impl Into<String>, properties: Vec<String>, chain: Arc<DenormalizerChain>) -> Self {
        Self {
            id: id.into(),
            properties,
            chain,
        }
    }
}

impl Filter for BooleanFilter {
    fn name(&self) -> &str {
        &self.id
    }

    fn properties(&self) -> &[String] {
        &self.properties
    }

    fn description(&self, _resource: &ResourceMetadata) -> ParameterSchema {
        self.properties
            .iter()
            .map(|property| {
                (
                    property.clone(),
                    ParameterDescription::new(property.clone(), ValueType::Boolean)
                        .with_enum(BOOLEAN_VALUES),
                )
            })
            .collect()
    }

    fn apply(
        &self,
        _plan: &mut QueryPlan,
        _resource: &ResourceMetadata,
        _operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<FilterEffect> {
        let mut conditions = Vec::new();
        for property in &self.properties {
            let mut values = Vec::new();
            for raw in context.params().values(property) {
                match self.chain.convert(raw, ValueType::Boolean) {
                    Ok(value @ TypedValue::Boolean(_)) => values.push(value),
                    _ => debug!(
                        filter = %self.id,
                        parameter = %property,
                        value = raw,
                        "Ignoring non-boolean value"
                    ),
                }
            }
            if !values.is_empty() {
                conditions.push(Condition::any(ComparisonOp::Eq, property.clone(), values)?);
            }
        }
        Ok(fold(conditions))
    }
}
