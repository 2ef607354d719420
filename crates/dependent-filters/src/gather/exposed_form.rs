//! Exposed form processing.
//!
//! One pass per request, in a fixed order:
//! 1. copy the definition's filters into a request-local registry
//! 2. build: every exposed filter evaluates and contributes its element
//! 3. after-build: dependents get client-side visibility states
//! 4. apply every evaluation
//! 5. accept input from filters that are still exposed
//!
//! All evaluations are collected before the first apply, and every apply
//! finishes before any filter accepts input.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::dependent::DependencyEvaluation;
use super::extension::{FilterHandlerRegistry, HandlerContext};
use super::registry::{DisplayFilters, FilterRegistry};
use super::types::{FilterValue, QueryDefinition, QueryFilter, STANDARD_HANDLER, SubmittedInput};
use crate::form::Form;

/// Form ID of rendered exposed forms.
pub const EXPOSED_FORM_ID: &str = "gather_exposed_form";

/// Outcome of processing one exposed form submission.
#[derive(Debug, Clone, Serialize)]
pub struct ExposedFormResult {
    /// Exposed form, elements keyed by form identifier.
    pub form: Form,

    /// Dependency evaluations in filter order.
    pub dependencies: Vec<DependencyEvaluation>,

    /// Accepted input, keyed by filter id.
    pub accepted: BTreeMap<String, FilterValue>,

    /// Filters with their exposed state at the end of the request.
    pub filters: Vec<QueryFilter>,

    /// Filters that add no query condition.
    #[serde(skip)]
    non_contributing: BTreeSet<String>,
}

impl ExposedFormResult {
    /// Whether a filter accepted input this request.
    pub fn is_accepted(&self, filter_id: &str) -> bool {
        self.accepted.contains_key(filter_id)
    }

    /// Evaluation of a dependency instance.
    pub fn dependency(&self, instance: &str) -> Option<&DependencyEvaluation> {
        self.dependencies.iter().find(|d| d.instance == instance)
    }

    /// Definition to run the query with.
    ///
    /// Accepted values replace the admin values of their filters, and
    /// filters that add no condition are dropped.
    pub fn resolve_definition(&self, definition: &QueryDefinition) -> QueryDefinition {
        let filters = self
            .filters
            .iter()
            .filter(|f| !self.non_contributing.contains(&f.id))
            .map(|f| {
                let mut filter = f.clone();
                if let Some(value) = self.accepted.get(&f.id) {
                    filter.value = value.clone();
                }
                filter
            })
            .collect();

        QueryDefinition {
            base_table: definition.base_table.clone(),
            item_type: definition.item_type.clone(),
            filters,
        }
    }
}

/// Runs exposed form processing against a handler registry.
pub struct ExposedFormProcessor<'a> {
    handlers: &'a FilterHandlerRegistry,
}

impl<'a> ExposedFormProcessor<'a> {
    pub fn new(handlers: &'a FilterHandlerRegistry) -> Self {
        Self { handlers }
    }

    /// Process one request's submitted input against `definition`.
    pub fn process(
        &self,
        definition: &QueryDefinition,
        input: &SubmittedInput,
    ) -> ExposedFormResult {
        let mut filters = DisplayFilters::from_definition(definition);
        let mut non_contributing = BTreeSet::new();

        for handle in filters.handles() {
            let filter = filters.filter(handle);
            if !self.handlers.is_known(&filter.handler) {
                warn!(
                    filter = %filter.id,
                    handler = %filter.handler,
                    fallback = STANDARD_HANDLER,
                    "unknown exposed filter handler"
                );
            }
            let handler = self.handlers.handler_for(filter);
            if !handler.contributes_condition() {
                non_contributing.insert(filter.id.clone());
            }
            if handler.always_exposed() && !filter.exposed {
                filters.set_exposed(handle, true);
            }
        }

        // Build phase.
        let mut form = Form::new(EXPOSED_FORM_ID);
        let mut dependencies = Vec::new();
        let mut retired = Vec::new();
        {
            let ctx = HandlerContext {
                filters: &filters,
                handlers: self.handlers,
            };
            for (handle, filter) in filters.iter() {
                if !filter.exposed {
                    continue;
                }
                let handler = self.handlers.handler_for(filter);
                if let Some(evaluation) = handler.evaluate(filter, &ctx, input) {
                    dependencies.push(evaluation);
                    retired.push(handle);
                }
                if let Some(element) = handler.exposed_element(filter) {
                    form.insert(filter.identifier(), element);
                }
            }
        }

        // Dependency instances have done their work.
        for handle in retired {
            filters.set_exposed(handle, false);
        }

        attach_visibility_states(&mut form, &dependencies);

        // Apply every decision before anything accepts input.
        for evaluation in &dependencies {
            if let Some(handle) = filters.get_filter(&evaluation.instance) {
                let handler = self.handlers.handler_for(filters.filter(handle));
                handler.apply(evaluation, &mut filters);
            }
        }

        // Accept phase.
        let mut accepted = BTreeMap::new();
        for (_, filter) in filters.iter() {
            if !filter.exposed {
                continue;
            }
            let handler = self.handlers.handler_for(filter);
            if let Some(value) = handler.accept_input(filter, input) {
                accepted.insert(filter.id.clone(), value);
            }
        }

        debug!(
            dependencies = dependencies.len(),
            accepted = accepted.len(),
            "processed exposed form"
        );

        ExposedFormResult {
            form,
            dependencies,
            accepted,
            filters: filters.into_filters(),
            non_contributing,
        }
    }
}

/// Add `states` so dependents show only while their controller holds a
/// trigger value. Dependents stay rendered either way.
fn attach_visibility_states(form: &mut Form, dependencies: &[DependencyEvaluation]) {
    for evaluation in dependencies {
        let Some(controller) = &evaluation.controller else {
            continue;
        };
        for dependent in &evaluation.dependents {
            let Some(element) = form.get_element_mut(&dependent.identifier) else {
                continue;
            };

            let states = element
                .attributes
                .entry("states".to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !states.is_object() {
                *states = Value::Object(Map::new());
            }
            let Some(states) = states.as_object_mut() else {
                continue;
            };

            let visible = states
                .entry("visible")
                .or_insert_with(|| Value::Object(Map::new()));
            if let Some(visible) = visible.as_object_mut() {
                visible.insert(
                    controller.identifier.clone(),
                    serde_json::json!({ "value": controller.trigger_values }),
                );
            }
        }
    }
}
