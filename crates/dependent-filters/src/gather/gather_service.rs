//! Gather service for exposed filter configuration and processing.
//!
//! Wraps a [`FilterHandlerRegistry`] and exposes the view-level
//! operations: admin option forms, option submission, admin summaries,
//! definition validation and exposed form processing.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, info};

use super::dependent::{self, DEPENDENT_HANDLER};
use super::exposed_form::{ExposedFormProcessor, ExposedFormResult};
use super::extension::{FilterHandlerRegistry, HandlerContext};
use super::registry::{DisplayFilters, FilterRegistry};
use super::types::{GatherView, QueryDefinition, QueryFilter, SubmittedInput};
use crate::error::{DependentFilterError, Result};
use crate::form::Form;

/// Service for configuring and running exposed filters of gather views.
pub struct GatherService {
    handlers: FilterHandlerRegistry,
}

impl Default for GatherService {
    fn default() -> Self {
        Self::new()
    }
}

impl GatherService {
    /// Create a service with the built-in handlers.
    pub fn new() -> Self {
        Self::with_handlers(FilterHandlerRegistry::new())
    }

    /// Create a service over a prepared handler registry.
    pub fn with_handlers(handlers: FilterHandlerRegistry) -> Self {
        Self { handlers }
    }

    pub fn handlers(&self) -> &FilterHandlerRegistry {
        &self.handlers
    }

    fn display_filters(&self, definition: &QueryDefinition) -> DisplayFilters {
        display_filters(&self.handlers, definition)
    }

    /// Process an exposed form submission for a view.
    pub fn process_exposed(&self, view: &GatherView, input: &SubmittedInput) -> ExposedFormResult {
        debug!(view = %view.view_id, "processing exposed form");
        ExposedFormProcessor::new(&self.handlers).process(&view.definition, input)
    }

    /// Build the admin options form of one filter.
    pub fn admin_form(&self, view: &GatherView, filter_id: &str) -> Result<Form> {
        let filter = find_filter(view, filter_id)?;
        let filters = self.display_filters(&view.definition);
        let ctx = HandlerContext {
            filters: &filters,
            handlers: &self.handlers,
        };
        self.handlers
            .handler_for(filter)
            .build_admin_options(filter, &ctx)
    }

    /// Validate submitted admin values and store the resulting options.
    pub fn configure(&self, view: &mut GatherView, filter_id: &str, values: &Value) -> Result<()> {
        let filter = find_filter(view, filter_id)?;
        let handler = self.handlers.handler_for(filter);

        let options = {
            let filters = self.display_filters(&view.definition);
            let ctx = HandlerContext {
                filters: &filters,
                handlers: &self.handlers,
            };
            handler.submit_admin_options(filter, values, &ctx)?
        };
        let always_exposed = handler.always_exposed();

        let view_id = view.view_id.clone();
        let filter = view.definition.filter_mut(filter_id).ok_or_else(|| {
            DependentFilterError::UnknownFilter {
                view: view_id.clone(),
                filter: filter_id.to_string(),
            }
        })?;
        filter.options = options;
        if always_exposed {
            filter.exposed = true;
        }

        info!(view = %view_id, filter = %filter_id, "filter options saved");
        Ok(())
    }

    /// Add a new filter driven by `handler`, at `position` or at the end.
    pub fn add_filter(
        &self,
        view: &mut GatherView,
        filter_id: &str,
        handler: &str,
        position: Option<usize>,
    ) -> Result<()> {
        if view.definition.filter(filter_id).is_some() {
            return Err(DependentFilterError::DuplicateFilter {
                view: view.view_id.clone(),
                filter: filter_id.to_string(),
            });
        }
        let implementation =
            self.handlers
                .get(handler)
                .ok_or_else(|| DependentFilterError::UnknownHandler {
                    handler: handler.to_string(),
                })?;

        let mut filter = QueryFilter::new(filter_id, "");
        filter.handler = handler.to_string();
        filter.options = implementation.default_options();
        filter.exposed = implementation.always_exposed();

        let filters = &mut view.definition.filters;
        let at = position.unwrap_or(filters.len()).min(filters.len());
        filters.insert(at, filter);
        Ok(())
    }

    /// Admin summary of every filter, in order.
    pub fn summaries(&self, view: &GatherView) -> Vec<(String, String)> {
        view.definition
            .filters
            .iter()
            .map(|f| (f.id.clone(), self.handlers.handler_for(f).admin_summary(f)))
            .collect()
    }

    /// Dependent filter instances of a view, in order.
    pub fn dependency_instances<'v>(&self, view: &'v GatherView) -> Vec<&'v QueryFilter> {
        view.definition
            .filters
            .iter()
            .filter(|f| self.handlers.resolves_to(&f.handler, DEPENDENT_HANDLER))
            .collect()
    }

    /// Check a definition for problems; an empty list means it is valid.
    pub fn validate_definition(&self, definition: &QueryDefinition) -> Vec<String> {
        validate_definition(&self.handlers, definition)
    }
}

/// Request-local filters with always-exposed handlers forced on.
fn display_filters(
    handlers: &FilterHandlerRegistry,
    definition: &QueryDefinition,
) -> DisplayFilters {
    let mut filters = DisplayFilters::from_definition(definition);
    let forced: Vec<_> = filters
        .iter()
        .filter(|(_, f)| !f.exposed && handlers.handler_for(f).always_exposed())
        .map(|(handle, _)| handle)
        .collect();
    for handle in forced {
        filters.set_exposed(handle, true);
    }
    filters
}

/// Check a definition against `handlers`.
///
/// Reports duplicate filter ids, unknown handlers and dependent filter
/// configs that reference missing or misplaced filters.
pub fn validate_definition(
    handlers: &FilterHandlerRegistry,
    definition: &QueryDefinition,
) -> Vec<String> {
    let mut problems = Vec::new();

    let mut seen = HashSet::new();
    for filter in &definition.filters {
        if !seen.insert(filter.id.as_str()) {
            problems.push(format!("duplicate filter id '{}'", filter.id));
        }
        if !handlers.is_known(&filter.handler) {
            problems.push(format!(
                "filter '{}': unknown handler '{}'",
                filter.id, filter.handler
            ));
        }
    }

    let filters = display_filters(handlers, definition);
    let ctx = HandlerContext {
        filters: &filters,
        handlers,
    };
    for filter in &definition.filters {
        if handlers.resolves_to(&filter.handler, DEPENDENT_HANDLER) {
            problems.extend(dependent::check_config(&ctx, filter));
        }
    }

    problems
}

fn find_filter<'v>(view: &'v GatherView, filter_id: &str) -> Result<&'v QueryFilter> {
    view.definition
        .filter(filter_id)
        .ok_or_else(|| DependentFilterError::UnknownFilter {
            view: view.view_id.clone(),
            filter: filter_id.to_string(),
        })
}
