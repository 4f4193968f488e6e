//! Page-number pagination.
//!
//! [`PaginationExtension`] windows the plan during the apply phase and, when
//! pagination is active, claims the collection result so that it can attach
//! page metadata. Totals are counted on the plan as left by the filter and
//! order stages, so they always reflect the active filters.

use async_trait::async_trait;
use tracing::debug;

use crate::core::{
    CollectionExtension, Operation, QueryExecutor, QueryOutput, RequestContext, ResultExtension,
};
use crate::error::{FilterError, QueryResult};
use crate::metadata::{PaginationConfig, ResourceMetadata};
use crate::types::{Page, PageInfo, QueryPlan};

/// The page requested by a client, after defaults and clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u64,
    /// Page size.
    pub items_per_page: u64,
    /// Skip the total count.
    pub partial: bool,
}

impl PageRequest {
    /// Returns the number of items before this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.items_per_page)
    }
}

/// Paginates collection operations.
#[derive(Debug, Clone, Default)]
pub struct PaginationExtension {
    config: PaginationConfig,
}

impl PaginationExtension {
    /// Extension name.
    pub const NAME: &'static str = "pagination";

    /// Creates the extension with global settings.
    pub fn new(config: PaginationConfig) -> Self {
        Self { config }
    }

    /// Returns the settings in effect for a resource.
    pub fn settings(&self, resource: &ResourceMetadata) -> PaginationConfig {
        match resource.pagination() {
            Some(overrides) => self.config.merged(overrides),
            None => self.config.clone(),
        }
    }

    /// Returns true if the request is paginated.
    pub fn is_enabled(&self, resource: &ResourceMetadata, context: &RequestContext) -> bool {
        let settings = self.settings(resource);
        client_flag(
            settings.client_enabled,
            context,
            &settings.enabled_parameter,
        )
        .unwrap_or(settings.enabled)
    }

    /// Resolves the page a request asks for.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidFilterValue`] for a page below 1 or a
    /// malformed page size.
    pub fn page_request(
        &self,
        resource: &ResourceMetadata,
        context: &RequestContext,
    ) -> QueryResult<PageRequest> {
        let settings = self.settings(resource);
        let params = context.params();

        let page = match params.first(&settings.page_parameter) {
            Some(raw) => parse_positive(&settings.page_parameter, raw)?,
            None => 1,
        };

        let mut items_per_page = settings.items_per_page;
        if settings.client_items_per_page {
            if let Some(raw) = params.first(&settings.items_per_page_parameter) {
                items_per_page = parse_positive(&settings.items_per_page_parameter, raw)?;
            }
        }
        if let Some(max) = settings.max_items_per_page {
            items_per_page = items_per_page.min(max);
        }

        let partial = client_flag(settings.client_partial, context, &settings.partial_parameter)
            .unwrap_or(settings.partial);

        Ok(PageRequest {
            page,
            items_per_page,
            partial,
        })
    }
}

fn parse_positive(parameter: &str, raw: &str) -> QueryResult<u64> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= 1 => Ok(n as u64),
        Ok(_) => Err(FilterError::InvalidFilterValue {
            parameter: parameter.to_string(),
            value: raw.to_string(),
            reason: "must be at least 1".to_string(),
        }
        .into()),
        Err(e) => Err(FilterError::InvalidFilterValue {
            parameter: parameter.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        }
        .into()),
    }
}

fn client_flag(allowed: bool, context: &RequestContext, parameter: &str) -> Option<bool> {
    if !allowed {
        return None;
    }
    match context.params().first(parameter)?.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        other => {
            debug!(parameter, value = other, "Ignoring non-boolean flag");
            None
        }
    }
}

impl CollectionExtension for PaginationExtension {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply_to_collection(
        &self,
        plan: &mut QueryPlan,
        resource: &ResourceMetadata,
        _operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<()> {
        if !self.is_enabled(resource, context) {
            return Ok(());
        }
        let request = self.page_request(resource, context)?;
        let limit = if request.partial {
            request.items_per_page + 1
        } else {
            request.items_per_page
        };
        plan.set_window(request.offset(), limit);
        Ok(())
    }
}

#[async_trait]
impl ResultExtension for PaginationExtension {
    fn supports_result(
        &self,
        resource: &ResourceMetadata,
        _operation: &Operation,
        context: &RequestContext,
    ) -> bool {
        self.is_enabled(resource, context)
    }

    async fn get_result(
        &self,
        executor: &dyn QueryExecutor,
        plan: QueryPlan,
        resource: &ResourceMetadata,
        _operation: &Operation,
        context: &RequestContext,
    ) -> QueryResult<QueryOutput> {
        let request = self.page_request(resource, context)?;

        if request.partial {
            let mut items = executor.execute(&plan).await?;
            let has_next = items.len() as u64 > request.items_per_page;
            items.truncate(request.items_per_page as usize);
            let info = PageInfo::partial(request.page, request.items_per_page, has_next);
            return Ok(QueryOutput::Page(Page::new(items, info)));
        }

        let total = executor.count(&plan.for_count()).await?;
        let items = executor.execute(&plan).await?;
        debug!(
            backend = executor.backend_name(),
            page = request.page,
            total,
            "Materialized page"
        );
        let info = PageInfo::counted(request.page, request.items_per_page, total);
        Ok(QueryOutput::Page(Page::new(items, info)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::metadata::{OperationConfig, PaginationOverride, ResourceConfig};
    use crate::types::{IdentifierProperty, ValueType};

    fn book(overrides: Option<PaginationOverride>) -> ResourceMetadata {
        let mut config =
            ResourceConfig::new("Book", vec![IdentifierProperty::new("id", ValueType::Integer)])
                .with_operation(OperationConfig::collection("get_collection"));
        config.pagination = overrides;
        ResourceMetadata::from_config(config).unwrap()
    }

    fn windowed(extension: &PaginationExtension, resource: &ResourceMetadata, query: &str) -> QueryPlan {
        let mut plan = QueryPlan::new("Book");
        extension
            .apply_to_collection(
                &mut plan,
                resource,
                &Operation::collection("Book", "get_collection"),
                &RequestContext::from_query(query),
            )
            .unwrap();
        plan
    }

    #[test]
    fn test_window_from_page() {
        let extension = PaginationExtension::default();
        let plan = windowed(&extension, &book(None), "page=3&itemsPerPage=10");
        let window = plan.window().unwrap();
        assert_eq!((window.offset, window.limit), (20, 10));
    }

    #[test]
    fn test_items_per_page_is_clamped() {
        let extension = PaginationExtension::default();
        let plan = windowed(&extension, &book(None), "itemsPerPage=1000");
        assert_eq!(plan.window().unwrap().limit, 100);
    }

    #[test]
    fn test_page_below_one_is_rejected() {
        let extension = PaginationExtension::default();
        let mut plan = QueryPlan::new("Book");
        let err = extension
            .apply_to_collection(
                &mut plan,
                &book(None),
                &Operation::collection("Book", "get_collection"),
                &RequestContext::from_query("page=0"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::Filter(FilterError::InvalidFilterValue { ref parameter, .. }) if parameter == "page"
        ));
    }

    #[test]
    fn test_client_disable_requires_permission() {
        let resource = book(None);
        let context = RequestContext::from_query("pagination=false");

        let extension = PaginationExtension::default();
        assert!(extension.is_enabled(&resource, &context));

        let extension = PaginationExtension::new(PaginationConfig {
            client_enabled: true,
            ..Default::default()
        });
        assert!(!extension.is_enabled(&resource, &context));
        assert!(windowed(&extension, &resource, "pagination=false").window().is_none());
    }

    #[test]
    fn test_resource_override() {
        let resource = book(Some(PaginationOverride {
            items_per_page: Some(5),
            partial: Some(true),
            ..Default::default()
        }));
        let extension = PaginationExtension::default();
        let request = extension
            .page_request(&resource, &RequestContext::default())
            .unwrap();
        assert_eq!(request.items_per_page, 5);
        assert!(request.partial);
        // one extra row to detect a next page
        assert_eq!(windowed(&extension, &resource, "").window().unwrap().limit, 6);
    }
}
