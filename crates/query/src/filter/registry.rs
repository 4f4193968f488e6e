//! Filter lookup by id.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::error::{ConfigError, QueryResult};
use crate::identifier::DenormalizerChain;
use crate::metadata::{FilterConfig, FilterKind};

use super::builtin::{BooleanFilter, ExactFilter, ExcludeFilter, RangeFilter};
use super::Filter;

/// Filters keyed by id.
///
/// Filled at startup, then shared read-only.
#[derive(Default, Clone)]
pub struct FilterRegistry {
    filters: HashMap<String, Arc<dyn Filter>>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates the built-in filters declared in the catalog.
    pub fn from_configs(configs: &[FilterConfig], chain: Arc<DenormalizerChain>) -> QueryResult<Self> {
        let mut registry = Self::new();
        for config in configs {
            if config.properties.is_empty() {
                return Err(ConfigError::EmptyFilter {
                    filter_id: config.id.clone(),
                }
                .into());
            }
            let id = config.id.clone();
            let properties = config.properties.clone();
            let chain = Arc::clone(&chain);
            let filter: Arc<dyn Filter> = match config.kind {
                FilterKind::Exact => Arc::new(ExactFilter::new(id, properties, chain)),
                FilterKind::Exclude => Arc::new(ExcludeFilter::new(id, properties, chain)),
                FilterKind::Range => Arc::new(RangeFilter::new(id, properties, chain)),
                FilterKind::Boolean => Arc::new(BooleanFilter::new(id, properties, chain)),
            };
            registry.register(filter)?;
        }
        info!(filters = registry.len(), "Built filter registry");
        Ok(registry)
    }

    /// Registers a filter under its name.
    pub fn register(&mut self, filter: Arc<dyn Filter>) -> QueryResult<()> {
        let id = filter.name().to_string();
        if self.filters.contains_key(&id) {
            return Err(ConfigError::DuplicateFilter { filter_id: id }.into());
        }
        self.filters.insert(id, filter);
        Ok(())
    }

    /// Returns a filter by id.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Filter>> {
        self.filters.get(id)
    }

    /// Returns true if the id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.filters.contains_key(id)
    }

    /// Returns the number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if no filter is registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&String> = self.filters.keys().collect();
        ids.sort();
        f.debug_struct("FilterRegistry").field("filters", &ids).finish()
    }
}
