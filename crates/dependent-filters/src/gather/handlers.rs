//! Built-in standard exposed filter handler.

use serde_json::Value;

use super::extension::{ExposedFilterHandler, HandlerContext};
use super::types::{FilterOperator, FilterValue, QueryFilter, STANDARD_HANDLER, SubmittedInput};
use crate::error::Result;
use crate::form::{Form, FormElement};

/// Plain filter: compares a field against its admin value, or against the
/// user's input when exposed.
pub struct StandardFilterHandler;

fn operator_symbol(operator: &FilterOperator) -> &'static str {
    match operator {
        FilterOperator::Equals => "=",
        FilterOperator::NotEquals => "!=",
        FilterOperator::Contains => "contains",
        FilterOperator::In => "in",
        FilterOperator::NotIn => "not in",
        FilterOperator::IsNull => "is null",
        FilterOperator::IsNotNull => "is not null",
    }
}

impl ExposedFilterHandler for StandardFilterHandler {
    fn name(&self) -> &'static str {
        STANDARD_HANDLER
    }

    fn build_admin_options(&self, filter: &QueryFilter, _ctx: &HandlerContext<'_>) -> Result<Form> {
        Ok(Form::new("gather_filter_options")
            .title(format!("Configure filter: {}", filter.label()))
            .element(
                "info",
                FormElement::markup("This filter has no additional options."),
            ))
    }

    fn submit_admin_options(
        &self,
        _filter: &QueryFilter,
        _values: &Value,
        _ctx: &HandlerContext<'_>,
    ) -> Result<Value> {
        Ok(Value::Null)
    }

    fn admin_summary(&self, filter: &QueryFilter) -> String {
        let symbol = operator_symbol(&filter.operator);
        if filter.exposed {
            return format!("{} {symbol} (exposed)", filter.field);
        }
        match filter.operator {
            FilterOperator::IsNull | FilterOperator::IsNotNull => {
                format!("{} {symbol}", filter.field)
            }
            _ => format!(
                "{} {symbol} {}",
                filter.field,
                filter.value.as_string_list().join(", ")
            ),
        }
    }

    fn exposed_element(&self, filter: &QueryFilter) -> Option<FormElement> {
        let options = filter.expose.options.clone();
        let element = if options.is_empty() {
            FormElement::textfield()
        } else if filter.is_multiple() {
            FormElement::multi_select(options)
        } else {
            FormElement::select(options)
        };

        let element = element.title(filter.label());
        Some(if filter.is_required() {
            element.required()
        } else {
            element
        })
    }

    fn accept_input(&self, filter: &QueryFilter, input: &SubmittedInput) -> Option<FilterValue> {
        let submitted = input.get(filter.identifier())?;
        if submitted.is_empty() {
            return None;
        }

        let values = submitted.values();
        if filter.is_multiple() {
            Some(FilterValue::List(
                values
                    .into_iter()
                    .filter(|v| !v.is_empty())
                    .map(|v| FilterValue::String(v.to_string()))
                    .collect(),
            ))
        } else {
            values
                .first()
                .map(|v| FilterValue::String((*v).to_string()))
        }
    }
}
