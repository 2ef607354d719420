//! Dependent exposed filters.
//!
//! A dependent filter instance names one earlier exposed filter as its
//! controller and a set of later exposed filters as dependents. The
//! dependents only accept input when the controller's submitted value is
//! one of the configured trigger values. The instance itself renders no
//! element, accepts no input and adds no query condition.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::extension::{ExposedFilterHandler, HandlerContext};
use super::registry::{DisplayFilters, FilterRegistry};
use super::types::{FilterValue, QueryFilter, SubmittedInput, SubmittedValue, json_scalar_to_string};
use crate::error::{DependentFilterError, Result};
use crate::form::{Form, FormElement, ValidationError};

/// Handler name of the dependent filter.
pub const DEPENDENT_HANDLER: &str = "dependent";

/// Form ID of the admin options form.
pub const OPTIONS_FORM_ID: &str = "gather_dependent_filter_options";

const NO_DEPENDENTS_WARNING: &str =
    "This filter needs other filters to be placed below it in the order to use as dependents.";

/// Options of one dependent filter instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Filter whose submitted value gates the dependents.
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub controller_filter: Option<String>,

    /// Controller values that activate the dependents. Ordered, no duplicates.
    #[serde(default, deserialize_with = "deserialize_selection")]
    pub controller_values: Vec<String>,

    /// Filters gated by the controller.
    #[serde(default, deserialize_with = "deserialize_selection")]
    pub dependent_filters: Vec<String>,
}

impl DependencyConfig {
    /// Decode the options stored on a filter. Missing options mean "unconfigured".
    pub fn from_filter(filter: &QueryFilter) -> Result<Self> {
        if filter.options.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(filter.options.clone()).map_err(|e| {
            DependentFilterError::InvalidOptions {
                filter: filter.id.clone(),
                details: e.to_string(),
            }
        })
    }

    /// Encode as filter options.
    pub fn to_options(&self) -> Value {
        serde_json::json!({
            "controller_filter": self.controller_filter,
            "controller_values": self.controller_values,
            "dependent_filters": self.dependent_filters,
        })
    }
}

fn deserialize_optional_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|id| !id.is_empty()))
}

fn deserialize_selection<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(selection_from_json(&value))
}

/// Normalize a submitted selection into an ordered, de-duplicated list.
///
/// Accepts a list, a single scalar, `null`, or a checkbox map where checked
/// entries map to their key (or `true`) and unchecked ones to `0`, `false`
/// or an empty string. Checked map entries keep their submitted order.
pub fn selection_from_json(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter_map(json_scalar_to_string).collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, checked)| match checked {
                Value::Bool(true) => Some(key.clone()),
                Value::String(s) if !s.is_empty() && s != "0" => Some(s.clone()),
                Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(key.clone()),
                _ => None,
            })
            .collect(),
        scalar => json_scalar_to_string(scalar).into_iter().collect(),
    };

    let mut selection: Vec<String> = Vec::with_capacity(raw.len());
    for item in raw {
        if !item.is_empty() && !selection.contains(&item) {
            selection.push(item);
        }
    }
    selection
}

/// Whether dependents accept input for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationDecision {
    Active,
    Inactive,
}

impl ActivationDecision {
    pub fn is_active(self) -> bool {
        self == ActivationDecision::Active
    }
}

impl From<bool> for ActivationDecision {
    fn from(active: bool) -> Self {
        if active {
            ActivationDecision::Active
        } else {
            ActivationDecision::Inactive
        }
    }
}

/// True when any submitted value is a trigger value.
///
/// An empty trigger set never matches.
pub fn is_triggered(submitted: &[&str], trigger_values: &[String]) -> bool {
    submitted
        .iter()
        .any(|value| trigger_values.iter().any(|t| t == value))
}

/// Values the controller submitted, normalized to a sequence.
///
/// A missing value counts as a single empty string. A single-valued
/// controller only ever contributes its first value.
pub fn controller_input<'a>(controller: &QueryFilter, input: &'a SubmittedInput) -> Vec<&'a str> {
    match input.get(controller.identifier()) {
        None => vec![""],
        Some(SubmittedValue::Single(value)) => vec![value.as_str()],
        Some(SubmittedValue::Multiple(values)) if controller.is_multiple() => {
            values.iter().map(String::as_str).collect()
        }
        Some(SubmittedValue::Multiple(values)) => {
            vec![values.first().map(String::as_str).unwrap_or("")]
        }
    }
}

/// Decide whether the dependents of `config` are active for this input.
pub fn evaluate<R>(
    config: &DependencyConfig,
    filters: &R,
    input: &SubmittedInput,
) -> ActivationDecision
where
    R: FilterRegistry + ?Sized,
{
    let Some(controller_id) = config.controller_filter.as_deref() else {
        return ActivationDecision::Active;
    };

    // A removed controller submits nothing.
    let Some(handle) = filters.get_filter(controller_id) else {
        warn!(
            controller = %controller_id,
            "controller filter no longer exists, treating its value as empty"
        );
        return is_triggered(&[""], &config.controller_values).into();
    };

    let submitted = controller_input(filters.filter(handle), input);
    is_triggered(&submitted, &config.controller_values).into()
}

/// Apply a decision to the dependents.
///
/// Inactive dependents are marked not exposed so their input is ignored.
/// Active decisions leave the dependents untouched. Unknown ids are skipped.
/// Returns how many filters were disabled.
pub fn apply<R>(decision: ActivationDecision, dependent_ids: &[String], registry: &mut R) -> usize
where
    R: FilterRegistry + ?Sized,
{
    if decision.is_active() {
        return 0;
    }

    let mut disabled = 0;
    for id in dependent_ids {
        match registry.get_filter(id) {
            Some(handle) => {
                registry.set_exposed(handle, false);
                disabled += 1;
            }
            None => debug!(filter = %id, "dependent filter no longer exists, skipping"),
        }
    }
    disabled
}

/// Resolved controller of an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerInfo {
    pub filter_id: String,
    pub identifier: String,
    pub trigger_values: Vec<String>,
}

/// Resolved dependent of an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependentInfo {
    pub filter_id: String,
    pub identifier: String,
}

/// Outcome of evaluating one dependent filter instance for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEvaluation {
    /// Id of the dependent filter instance.
    pub instance: String,
    /// `None` when no controller is configured or it no longer exists.
    pub controller: Option<ControllerInfo>,
    /// Dependents that still exist in the display.
    pub dependents: Vec<DependentInfo>,
    pub decision: ActivationDecision,
}

impl DependencyEvaluation {
    /// Evaluate `config` for the instance `instance` against this request's input.
    pub fn build(
        instance: &str,
        config: &DependencyConfig,
        filters: &DisplayFilters,
        input: &SubmittedInput,
    ) -> Self {
        let decision = evaluate(config, filters, input);

        let controller = config
            .controller_filter
            .as_deref()
            .and_then(|id| filters.get(id))
            .map(|controller| ControllerInfo {
                filter_id: controller.id.clone(),
                identifier: controller.identifier().to_string(),
                trigger_values: config.controller_values.clone(),
            });

        let dependents = config
            .dependent_filters
            .iter()
            .filter_map(|id| filters.get(id))
            .map(|dependent| DependentInfo {
                filter_id: dependent.id.clone(),
                identifier: dependent.identifier().to_string(),
            })
            .collect();

        debug!(
            instance = %instance,
            controller = ?config.controller_filter,
            decision = ?decision,
            "evaluated dependent filter"
        );

        Self {
            instance: instance.to_string(),
            controller,
            dependents,
            decision,
        }
    }

    /// Ids of the resolved dependents.
    pub fn dependent_ids(&self) -> Vec<String> {
        self.dependents.iter().map(|d| d.filter_id.clone()).collect()
    }
}

/// Which side of a dependency a candidate list is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Controller,
    Dependent,
}

/// Filters the admin may wire to the instance `instance_id`, as `(id, label)`.
///
/// Controllers are exposed filters placed before the instance; dependents are
/// exposed, non-required filters placed after it. Other dependent filter
/// instances are never offered.
pub fn filter_candidates(
    ctx: &HandlerContext<'_>,
    instance_id: &str,
    kind: CandidateKind,
) -> Vec<(String, String)> {
    let Some(own_position) = ctx.filters.position(instance_id) else {
        return Vec::new();
    };

    ctx.filters
        .iter()
        .filter(|(handle, filter)| {
            let position = handle.position();
            if position == own_position || !filter.exposed {
                return false;
            }
            if ctx.handlers.resolves_to(&filter.handler, DEPENDENT_HANDLER) {
                return false;
            }
            match kind {
                CandidateKind::Controller => position < own_position,
                CandidateKind::Dependent => position > own_position && !filter.is_required(),
            }
        })
        .map(|(_, filter)| (filter.id.clone(), filter.label().to_string()))
        .collect()
}

/// Check a stored configuration against the current filter order.
///
/// Returns human-readable problems; an empty list means the configuration
/// is consistent.
pub fn check_config(ctx: &HandlerContext<'_>, filter: &QueryFilter) -> Vec<String> {
    let config = match DependencyConfig::from_filter(filter) {
        Ok(config) => config,
        Err(e) => return vec![e.to_string()],
    };

    let mut problems = Vec::new();
    let controllers = filter_candidates(ctx, &filter.id, CandidateKind::Controller);
    let dependents = filter_candidates(ctx, &filter.id, CandidateKind::Dependent);

    if let Some(controller) = &config.controller_filter {
        if ctx.filters.get(controller).is_none() {
            problems.push(format!(
                "filter '{}': controller '{controller}' does not exist",
                filter.id
            ));
        } else if !controllers.iter().any(|(id, _)| id == controller) {
            problems.push(format!(
                "filter '{}': controller '{controller}' must be an exposed filter placed before it",
                filter.id
            ));
        }
        if config.controller_values.is_empty() {
            problems.push(format!(
                "filter '{}': no controller values selected, dependents will never be active",
                filter.id
            ));
        }
    }

    for dependent in &config.dependent_filters {
        if ctx.filters.get(dependent).is_none() {
            problems.push(format!(
                "filter '{}': dependent '{dependent}' does not exist",
                filter.id
            ));
        } else if !dependents.iter().any(|(id, _)| id == dependent) {
            problems.push(format!(
                "filter '{}': dependent '{dependent}' must be an exposed, optional filter placed after it",
                filter.id
            ));
        }
    }

    problems
}

/// Exposed filter handler gating dependents on a controller's value.
pub struct DependentFilterHandler;

impl DependentFilterHandler {
    /// Element collecting trigger values, derived from the controller's own element.
    fn controller_values_element(
        ctx: &HandlerContext<'_>,
        controller: &QueryFilter,
        config: &DependencyConfig,
    ) -> FormElement {
        let base = ctx
            .handlers
            .handler_for(controller)
            .exposed_element(controller);

        let options: Vec<(String, String)> = base
            .as_ref()
            .map(|el| el.options().to_vec())
            .unwrap_or_default()
            .into_iter()
            .filter(|(key, _)| key != "all")
            .collect();

        let element = if options.is_empty() {
            FormElement::textfield()
                .default_value(config.controller_values.join(", "))
                .description(
                    "The values on the controller filter that will cause the dependent filters to be visible. Separate multiple values with commas.",
                )
        } else {
            FormElement::checkboxes(options)
                .default_value(config.controller_values.clone())
                .description(
                    "The values on the controller filter that will cause the dependent filters to be visible.",
                )
        };

        element.title("Controller values").weight(10)
    }

    /// Whether submitted trigger values arrive as free text.
    fn controller_is_free_text(ctx: &HandlerContext<'_>, controller: &QueryFilter) -> bool {
        ctx.handlers
            .handler_for(controller)
            .exposed_element(controller)
            .is_none_or(|el| el.options().is_empty())
    }
}

impl ExposedFilterHandler for DependentFilterHandler {
    fn name(&self) -> &'static str {
        DEPENDENT_HANDLER
    }

    fn default_options(&self) -> Value {
        DependencyConfig::default().to_options()
    }

    fn always_exposed(&self) -> bool {
        true
    }

    fn build_admin_options(&self, filter: &QueryFilter, ctx: &HandlerContext<'_>) -> Result<Form> {
        let config = DependencyConfig::from_filter(filter)?;

        let mut form = Form::new(OPTIONS_FORM_ID)
            .title(format!("Configure dependent filter: {}", filter.label()))
            .element(
                "exposed",
                FormElement::checkbox()
                    .title("Expose this filter")
                    .description("This filter is always exposed.")
                    .default_value(true)
                    .disabled()
                    .weight(-10),
            )
            .element(
                "controller_filter",
                FormElement::radio(filter_candidates(ctx, &filter.id, CandidateKind::Controller))
                    .title("Controller filter")
                    .description(
                        "The exposed filter whose values will be used to control dependent filters. Only filters that are prior to this one in the order are allowed.",
                    )
                    .default_value(config.controller_filter.clone().unwrap_or_default()),
            );

        if let Some(controller_id) = &config.controller_filter {
            match ctx.filters.get(controller_id) {
                Some(controller) => form.insert(
                    "controller_values",
                    Self::controller_values_element(ctx, controller, &config),
                ),
                None => {
                    form = form.warning(format!(
                        "Controller filter '{controller_id}' no longer exists. Select another controller."
                    ));
                }
            }
        }

        let dependents = filter_candidates(ctx, &filter.id, CandidateKind::Dependent);
        let mut description = String::from(
            "The filters which should only be visible and active when the controller filter has the given values.",
        );
        if dependents.is_empty() {
            description.push(' ');
            description.push_str(NO_DEPENDENTS_WARNING);
            form = form.warning(NO_DEPENDENTS_WARNING);
        }
        form.insert(
            "dependent_filters",
            FormElement::checkboxes(dependents)
                .title("Dependent filters")
                .description(description)
                .default_value(config.dependent_filters.clone())
                .weight(20),
        );

        Ok(form)
    }

    fn submit_admin_options(
        &self,
        filter: &QueryFilter,
        values: &Value,
        ctx: &HandlerContext<'_>,
    ) -> Result<Value> {
        let controller_filter = values
            .get("controller_filter")
            .and_then(json_scalar_to_string)
            .filter(|id| !id.is_empty());
        let controller = controller_filter.as_deref().and_then(|id| ctx.filters.get(id));

        let raw_values = values.get("controller_values").unwrap_or(&Value::Null);
        let controller_values = match (raw_values, controller) {
            (Value::String(text), Some(c)) if Self::controller_is_free_text(ctx, c) => {
                selection_from_json(&Value::Array(
                    text.split(',')
                        .map(|v| Value::String(v.trim().to_string()))
                        .collect(),
                ))
            }
            (raw, _) => selection_from_json(raw),
        };

        let config = DependencyConfig {
            controller_filter,
            controller_values,
            dependent_filters: selection_from_json(
                values.get("dependent_filters").unwrap_or(&Value::Null),
            ),
        };

        let mut errors = Vec::new();

        if let Some(controller_id) = &config.controller_filter {
            let controllers = filter_candidates(ctx, &filter.id, CandidateKind::Controller);
            if !controllers.iter().any(|(id, _)| id == controller_id) {
                errors.push(ValidationError::new(
                    "controller_filter",
                    format!(
                        "'{controller_id}' cannot control this filter. Only exposed filters placed before it may be chosen."
                    ),
                ));
            } else if let Some(controller) = controller {
                let allowed = ctx
                    .handlers
                    .handler_for(controller)
                    .exposed_element(controller)
                    .map(|el| el.options().to_vec())
                    .unwrap_or_default();
                if !allowed.is_empty() {
                    for value in &config.controller_values {
                        if !allowed.iter().any(|(key, _)| key == value) {
                            errors.push(ValidationError::new(
                                "controller_values",
                                format!("'{value}' is not a value of controller filter '{controller_id}'."),
                            ));
                        }
                    }
                }
            }
        }

        let dependents = filter_candidates(ctx, &filter.id, CandidateKind::Dependent);
        for dependent in &config.dependent_filters {
            if !dependents.iter().any(|(id, _)| id == dependent) {
                errors.push(ValidationError::new(
                    "dependent_filters",
                    format!(
                        "'{dependent}' cannot depend on this filter. Only exposed, optional filters placed after it may be chosen."
                    ),
                ));
            }
        }

        if !errors.is_empty() {
            return Err(DependentFilterError::Validation {
                filter: filter.id.clone(),
                errors,
            });
        }

        Ok(config.to_options())
    }

    fn admin_summary(&self, filter: &QueryFilter) -> String {
        let config = DependencyConfig::from_filter(filter).unwrap_or_default();
        format!(
            "{} controlling {}",
            config.controller_filter.unwrap_or_default(),
            config.dependent_filters.join(", ")
        )
    }

    fn exposed_element(&self, _filter: &QueryFilter) -> Option<FormElement> {
        None
    }

    fn evaluate(
        &self,
        filter: &QueryFilter,
        ctx: &HandlerContext<'_>,
        input: &SubmittedInput,
    ) -> Option<DependencyEvaluation> {
        let config = match DependencyConfig::from_filter(filter) {
            Ok(config) => config,
            Err(e) => {
                warn!(filter = %filter.id, error = %e, "ignoring unreadable dependent filter options");
                DependencyConfig::default()
            }
        };
        Some(DependencyEvaluation::build(&filter.id, &config, ctx.filters, input))
    }

    fn apply(&self, evaluation: &DependencyEvaluation, registry: &mut dyn FilterRegistry) {
        let disabled = apply(evaluation.decision, &evaluation.dependent_ids(), registry);
        if disabled > 0 {
            debug!(
                instance = %evaluation.instance,
                disabled,
                "dependent filters will ignore input"
            );
        }
    }

    fn accept_input(&self, _filter: &QueryFilter, _input: &SubmittedInput) -> Option<FilterValue> {
        None
    }

    fn contributes_condition(&self) -> bool {
        false
    }
}
