#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Exposed form processing integration tests.
//!
//! Runs whole submissions through GatherService and checks the rendered
//! form, accepted input and the definition handed to the query layer.

use serde_json::json;
use trovato_dependent_filters::gather::{
    ActivationDecision, EXPOSED_FORM_ID, FilterHandlerRegistry, FilterValue,
    GatherExtensionDeclaration, GatherService, SubmittedInput,
};
use trovato_test_utils::{dependent_instance, event_view, input, test_filter, test_view};

#[test]
fn trigger_value_accepts_dependents() {
    let view = event_view();
    let result = GatherService::new().process_exposed(
        &view,
        &input(&[("type", "event"), ("date", "2025-06-01"), ("location", "Ghent")]),
    );

    assert_eq!(result.form.form_id, EXPOSED_FORM_ID);
    assert_eq!(
        result.dependency("deps").unwrap().decision,
        ActivationDecision::Active
    );
    assert_eq!(
        result.accepted.get("date"),
        Some(&FilterValue::String("2025-06-01".to_string()))
    );
    assert!(result.is_accepted("location"));
}

#[test]
fn other_value_ignores_dependents_but_keeps_them_rendered() {
    let view = event_view();
    let result = GatherService::new().process_exposed(
        &view,
        &input(&[("type", "article"), ("date", "2025-06-01"), ("location", "Ghent")]),
    );

    assert_eq!(
        result.dependency("deps").unwrap().decision,
        ActivationDecision::Inactive
    );
    assert!(result.is_accepted("type"));
    assert!(!result.is_accepted("date"));
    assert!(!result.is_accepted("location"));

    assert!(result.form.get_element("date").is_some());
    assert!(result.form.get_element("location").is_some());
}

#[test]
fn instance_renders_nothing_and_is_dropped_from_query() {
    let view = event_view();
    let result = GatherService::new().process_exposed(&view, &input(&[("type", "event")]));

    assert!(result.form.get_element("deps").is_none());
    assert!(!result.is_accepted("deps"));

    let resolved = result.resolve_definition(&view.definition);
    let ids: Vec<_> = resolved.filters.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["type", "date", "location"]);
    assert_eq!(
        resolved.filters[0].value,
        FilterValue::String("event".to_string())
    );
}

#[test]
fn dependents_carry_visibility_states() {
    let view = event_view();
    let result = GatherService::new().process_exposed(&view, &SubmittedInput::new());

    let date = result.form.get_element("date").unwrap();
    assert_eq!(
        date.attributes.get("states"),
        Some(&json!({"visible": {"type": {"value": ["event"]}}}))
    );
    assert!(result.form.get_element("type").unwrap().attributes.is_empty());
}

#[test]
fn custom_identifiers_are_used_for_input() {
    let view = test_view(
        "v",
        vec![
            test_filter("type")
                .identifier("kind")
                .options(&[("a", "A"), ("b", "B")])
                .build(),
            dependent_instance("deps")
                .controller("type")
                .values(&["b"])
                .dependents(&["detail"])
                .build(),
            test_filter("detail").identifier("d").build(),
        ],
    );
    let service = GatherService::new();

    let result = service.process_exposed(&view, &input(&[("kind", "b"), ("d", "x")]));
    assert!(result.is_accepted("detail"));
    let states = &result.form.get_element("d").unwrap().attributes["states"];
    assert_eq!(states["visible"]["kind"]["value"], json!(["b"]));

    // The filter id is not the form key.
    let result = service.process_exposed(&view, &input(&[("type", "b"), ("d", "x")]));
    assert!(!result.is_accepted("detail"));
}

#[test]
fn instances_evaluate_against_raw_input() {
    // `b` is gated by `a`; `c` is gated by `b`. Killing `b` does not
    // cascade: the second instance still reads `b`'s submitted value.
    let view = test_view(
        "chain",
        vec![
            test_filter("a").build(),
            dependent_instance("gate_b")
                .controller("a")
                .values(&["on"])
                .dependents(&["b"])
                .build(),
            test_filter("b").build(),
            dependent_instance("gate_c")
                .controller("b")
                .values(&["on"])
                .dependents(&["c"])
                .build(),
            test_filter("c").build(),
        ],
    );

    let result = GatherService::new().process_exposed(
        &view,
        &input(&[("a", "off"), ("b", "on"), ("c", "value")]),
    );

    assert_eq!(
        result.dependency("gate_b").unwrap().decision,
        ActivationDecision::Inactive
    );
    assert_eq!(
        result.dependency("gate_c").unwrap().decision,
        ActivationDecision::Active
    );
    assert!(!result.is_accepted("b"));
    assert!(result.is_accepted("c"));
}

#[test]
fn overlapping_instances_union_their_kills() {
    let view = test_view(
        "overlap",
        vec![
            test_filter("x").build(),
            test_filter("y").build(),
            dependent_instance("by_x")
                .controller("x")
                .values(&["1"])
                .dependents(&["shared"])
                .build(),
            dependent_instance("by_y")
                .controller("y")
                .values(&["1"])
                .dependents(&["shared"])
                .build(),
            test_filter("shared").build(),
        ],
    );
    let service = GatherService::new();

    let submitted = input(&[("x", "1"), ("y", "0"), ("shared", "v")]);
    let result = service.process_exposed(&view, &submitted);
    assert!(!result.is_accepted("shared"));

    let submitted = input(&[("x", "1"), ("y", "1"), ("shared", "v")]);
    let result = service.process_exposed(&view, &submitted);
    assert!(result.is_accepted("shared"));
}

#[test]
fn multiple_filter_accepts_list() {
    let view = test_view(
        "v",
        vec![
            test_filter("tags").multiple().build(),
            dependent_instance("deps")
                .controller("tags")
                .values(&["news"])
                .dependents(&["region"])
                .build(),
            test_filter("region").multiple().build(),
        ],
    );
    let submitted = SubmittedInput::new()
        .with_many("tags", ["sport", "news"])
        .with_many("region", ["eu", ""]);

    let result = GatherService::new().process_exposed(&view, &submitted);
    assert_eq!(
        result.accepted.get("region"),
        Some(&FilterValue::List(vec![FilterValue::String("eu".to_string())]))
    );
}

#[test]
fn plugin_alias_drives_dependent_handler() {
    let mut handlers = FilterHandlerRegistry::new();
    let declaration: GatherExtensionDeclaration = serde_json::from_value(json!({
        "filters": [{"name": "event_gate", "handler": "dependent"}]
    }))
    .unwrap();
    let warnings = handlers.apply_declarations(vec![("events".to_string(), declaration)]);
    assert!(warnings.is_empty());

    let mut view = event_view();
    view.definition.filter_mut("deps").unwrap().handler = "event_gate".to_string();

    let service = GatherService::with_handlers(handlers);
    let result = service.process_exposed(&view, &input(&[("type", "article"), ("date", "d")]));
    assert_eq!(
        result.dependency("deps").unwrap().decision,
        ActivationDecision::Inactive
    );
    assert!(!result.is_accepted("date"));
    assert_eq!(service.dependency_instances(&view).len(), 1);
}

#[test]
fn submitted_json_ignores_nulls() {
    let submitted = SubmittedInput::from_json(&json!({
        "type": "event",
        "date": null,
        "tags": ["a", 2],
    }));

    assert!(submitted.get("type").is_some());
    assert!(submitted.get("date").is_none());
    assert_eq!(submitted.get("tags").unwrap().values(), vec!["a", "2"]);
}

#[test]
fn removed_controller_still_gates_dependents() {
    let view = test_view(
        "v",
        vec![
            dependent_instance("deps")
                .controller("type")
                .values(&["event"])
                .dependents(&["city"])
                .build(),
            test_filter("city").build(),
        ],
    );

    let result = GatherService::new().process_exposed(&view, &input(&[("city", "Rome")]));
    let evaluation = result.dependency("deps").unwrap();
    assert_eq!(evaluation.decision, ActivationDecision::Inactive);
    assert!(evaluation.controller.is_none());
    assert!(!result.is_accepted("city"));
    assert!(result.form.get_element("city").is_some());
}
