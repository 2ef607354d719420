//! Trovato test utilities.
//!
//! Fixture builders for gather views with exposed and dependent filters.

use serde_json::{Value as JsonValue, json};
use trovato_dependent_filters::gather::{
    DEPENDENT_HANDLER, FilterValue, GatherView, QueryFilter, SubmittedInput,
};

/// Create an exposed test filter on `fields.{id}`.
pub fn test_filter(id: &str) -> TestFilter {
    let mut filter = QueryFilter::new(id, format!("fields.{id}"));
    filter.exposed = true;
    TestFilter { filter }
}

/// Create a dependent filter instance.
pub fn dependent_instance(id: &str) -> TestDependent {
    TestDependent {
        id: id.to_string(),
        controller: None,
        values: Vec::new(),
        dependents: Vec::new(),
    }
}

/// A filter builder for creating test fixtures.
#[derive(Debug, Clone)]
pub struct TestFilter {
    filter: QueryFilter,
}

impl TestFilter {
    /// Set the form identifier.
    pub fn identifier(mut self, identifier: &str) -> Self {
        self.filter.expose.identifier = Some(identifier.to_string());
        self
    }

    /// Set as required.
    pub fn required(mut self) -> Self {
        self.filter.expose.required = true;
        self
    }

    /// Set as multi-valued.
    pub fn multiple(mut self) -> Self {
        self.filter.expose.multiple = true;
        self
    }

    /// Set as not exposed, with a fixed value.
    pub fn fixed(mut self, value: FilterValue) -> Self {
        self.filter.exposed = false;
        self.filter.value = value;
        self
    }

    /// Set the exposed label.
    pub fn label(mut self, label: &str) -> Self {
        self.filter.exposed_label = Some(label.to_string());
        self
    }

    /// Set selectable options, given as `(key, label)` pairs.
    pub fn options(mut self, options: &[(&str, &str)]) -> Self {
        self.filter.expose.options = options
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    /// Build the filter.
    pub fn build(self) -> QueryFilter {
        self.filter
    }
}

impl From<TestFilter> for QueryFilter {
    fn from(builder: TestFilter) -> Self {
        builder.build()
    }
}

/// A dependent filter instance builder.
#[derive(Debug, Clone)]
pub struct TestDependent {
    id: String,
    controller: Option<String>,
    values: Vec<String>,
    dependents: Vec<String>,
}

impl TestDependent {
    /// Set the controller filter.
    pub fn controller(mut self, controller: &str) -> Self {
        self.controller = Some(controller.to_string());
        self
    }

    /// Set the trigger values.
    pub fn values(mut self, values: &[&str]) -> Self {
        self.values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    /// Set the dependent filters.
    pub fn dependents(mut self, dependents: &[&str]) -> Self {
        self.dependents = dependents.iter().map(|d| d.to_string()).collect();
        self
    }

    /// Stored options as saved by the admin form.
    pub fn options(&self) -> JsonValue {
        json!({
            "controller_filter": self.controller.clone().unwrap_or_default(),
            "controller_values": self.values,
            "dependent_filters": self.dependents,
        })
    }

    /// Build the filter. Instances are stored as not exposed.
    pub fn build(self) -> QueryFilter {
        let mut filter = QueryFilter::new(&self.id, "");
        filter.handler = DEPENDENT_HANDLER.to_string();
        filter.options = self.options();
        filter
    }
}

impl From<TestDependent> for QueryFilter {
    fn from(builder: TestDependent) -> Self {
        builder.build()
    }
}

/// Create a view from an ordered filter list.
pub fn test_view(view_id: &str, filters: Vec<QueryFilter>) -> GatherView {
    let mut view = GatherView::new(view_id, view_id);
    view.definition.filters = filters;
    view
}

/// The view used throughout the dependent filter tests:
/// `type` (options article/event) controls `date` and `location`
/// through the instance `deps`, triggered by `event`.
pub fn event_view() -> GatherView {
    test_view(
        "events",
        vec![
            test_filter("type")
                .options(&[("article", "Article"), ("event", "Event")])
                .build(),
            dependent_instance("deps")
                .controller("type")
                .values(&["event"])
                .dependents(&["date", "location"])
                .build(),
            test_filter("date").build(),
            test_filter("location").build(),
        ],
    )
}

/// Build submitted input from `(identifier, value)` pairs.
pub fn input(pairs: &[(&str, &str)]) -> SubmittedInput {
    pairs
        .iter()
        .fold(SubmittedInput::new(), |input, (k, v)| input.with(*k, *v))
}
