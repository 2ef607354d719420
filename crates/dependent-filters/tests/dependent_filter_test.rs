#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Dependent filter integration tests.
//!
//! Tests for activation decisions, applying them to sibling filters,
//! admin option forms and option submission.

use serde_json::json;
use trovato_dependent_filters::DependentFilterError;
use trovato_dependent_filters::gather::dependent::{apply, evaluate, filter_candidates};
use trovato_dependent_filters::gather::{
    ActivationDecision, CandidateKind, DependencyConfig, DisplayFilters, FilterHandlerRegistry,
    FilterRegistry, FilterValue, GatherService, HandlerContext, SubmittedInput,
};
use trovato_test_utils::{dependent_instance, event_view, input, test_filter, test_view};

fn config(controller: Option<&str>, values: &[&str], dependents: &[&str]) -> DependencyConfig {
    DependencyConfig {
        controller_filter: controller.map(str::to_string),
        controller_values: values.iter().map(|v| v.to_string()).collect(),
        dependent_filters: dependents.iter().map(|d| d.to_string()).collect(),
    }
}

fn filters() -> DisplayFilters {
    DisplayFilters::new(vec![
        test_filter("answer").build(),
        test_filter("tags").multiple().build(),
        test_filter("detail").build(),
        test_filter("extra").build(),
    ])
}

fn exposed(filters: &DisplayFilters, id: &str) -> bool {
    let handle = filters.get_filter(id).unwrap();
    filters.is_exposed(handle)
}

// -------------------------------------------------------------------------
// Activation decisions
// -------------------------------------------------------------------------

#[test]
fn matching_value_keeps_dependents_exposed() {
    let cfg = config(Some("answer"), &["yes"], &["detail", "extra"]);
    let mut filters = filters();

    let decision = evaluate(&cfg, &filters, &input(&[("answer", "yes")]));
    assert_eq!(decision, ActivationDecision::Active);

    assert_eq!(apply(decision, &cfg.dependent_filters, &mut filters), 0);
    assert!(exposed(&filters, "detail"));
    assert!(exposed(&filters, "extra"));
}

#[test]
fn non_matching_value_unexposes_every_dependent() {
    let cfg = config(Some("answer"), &["yes"], &["detail", "extra"]);
    let mut filters = filters();

    let decision = evaluate(&cfg, &filters, &input(&[("answer", "no")]));
    assert_eq!(decision, ActivationDecision::Inactive);

    assert_eq!(apply(decision, &cfg.dependent_filters, &mut filters), 2);
    assert!(!exposed(&filters, "detail"));
    assert!(!exposed(&filters, "extra"));
    assert!(exposed(&filters, "answer"));
}

#[test]
fn empty_trigger_values_never_activate() {
    let cfg = config(Some("answer"), &[], &["detail"]);
    let filters = filters();

    for value in ["yes", "no", ""] {
        let decision = evaluate(&cfg, &filters, &input(&[("answer", value)]));
        assert_eq!(decision, ActivationDecision::Inactive, "value {value:?}");
    }
}

#[test]
fn multiple_controller_activates_on_any_intersection() {
    let cfg = config(Some("tags"), &["a", "b"], &["detail"]);
    let filters = filters();

    let submitted = SubmittedInput::new().with_many("tags", ["b", "c"]);
    assert_eq!(evaluate(&cfg, &filters, &submitted), ActivationDecision::Active);

    let submitted = SubmittedInput::new().with_many("tags", ["c", "d"]);
    assert_eq!(evaluate(&cfg, &filters, &submitted), ActivationDecision::Inactive);
}

#[test]
fn no_controller_is_always_active() {
    let cfg = config(None, &["yes"], &["detail"]);
    let filters = filters();

    assert_eq!(
        evaluate(&cfg, &filters, &SubmittedInput::new()),
        ActivationDecision::Active
    );
    assert_eq!(
        evaluate(&cfg, &filters, &input(&[("answer", "no")])),
        ActivationDecision::Active
    );
}

#[test]
fn missing_controller_input_matches_empty_trigger() {
    let filters = filters();

    let cfg = config(Some("answer"), &["yes"], &["detail"]);
    assert_eq!(
        evaluate(&cfg, &filters, &SubmittedInput::new()),
        ActivationDecision::Inactive
    );

    let cfg = config(Some("answer"), &[""], &["detail"]);
    assert_eq!(
        evaluate(&cfg, &filters, &SubmittedInput::new()),
        ActivationDecision::Active
    );
}

#[test]
fn stale_references_fail_soft() {
    let mut filters = filters();

    let cfg = config(Some("removed"), &["yes"], &["detail"]);
    assert_eq!(
        evaluate(&cfg, &filters, &input(&[("removed", "yes")])),
        ActivationDecision::Inactive
    );

    let disabled = apply(
        ActivationDecision::Inactive,
        &["gone".to_string(), "detail".to_string()],
        &mut filters,
    );
    assert_eq!(disabled, 1);
    assert!(!exposed(&filters, "detail"));
}

#[test]
fn applying_twice_is_idempotent() {
    let cfg = config(Some("answer"), &["yes"], &["detail"]);
    let mut filters = filters();
    let decision = evaluate(&cfg, &filters, &input(&[("answer", "no")]));

    apply(decision, &cfg.dependent_filters, &mut filters);
    let once: Vec<bool> = filters.iter().map(|(_, f)| f.exposed).collect();
    apply(decision, &cfg.dependent_filters, &mut filters);
    let twice: Vec<bool> = filters.iter().map(|(_, f)| f.exposed).collect();

    assert_eq!(once, twice);
}

// -------------------------------------------------------------------------
// Candidates
// -------------------------------------------------------------------------

#[test]
fn candidates_respect_order_and_required() {
    let view = test_view(
        "v",
        vec![
            test_filter("first").build(),
            test_filter("hidden").fixed(FilterValue::Integer(1)).build(),
            dependent_instance("deps").build(),
            test_filter("optional").build(),
            test_filter("mandatory").required().build(),
            dependent_instance("deps2").build(),
        ],
    );
    let filters = DisplayFilters::from_definition(&view.definition);
    let handlers = FilterHandlerRegistry::new();
    let ctx = HandlerContext {
        filters: &filters,
        handlers: &handlers,
    };

    let controllers = filter_candidates(&ctx, "deps", CandidateKind::Controller);
    let ids: Vec<_> = controllers.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["first"]);

    let dependents = filter_candidates(&ctx, "deps", CandidateKind::Dependent);
    let ids: Vec<_> = dependents.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["optional"]);
}

// -------------------------------------------------------------------------
// Admin options
// -------------------------------------------------------------------------

#[test]
fn admin_form_locks_exposed_and_offers_candidates() {
    let service = GatherService::new();
    let form = service.admin_form(&event_view(), "deps").unwrap();

    let exposed = form.get_element("exposed").unwrap();
    assert!(exposed.disabled);
    assert_eq!(exposed.default_value, Some(json!(true)));

    let controller = form.get_element("controller_filter").unwrap();
    let keys: Vec<_> = controller.options().iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["type"]);

    let values = form.get_element("controller_values").unwrap();
    let keys: Vec<_> = values.options().iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["article", "event"]);

    let dependents = form.get_element("dependent_filters").unwrap();
    assert_eq!(dependents.options().len(), 2);
    assert!(form.warnings.is_empty());
}

#[test]
fn admin_form_warns_without_dependent_candidates() {
    let view = test_view(
        "v",
        vec![test_filter("type").build(), dependent_instance("deps").build()],
    );
    let form = GatherService::new().admin_form(&view, "deps").unwrap();

    assert_eq!(form.warnings.len(), 1);
    assert!(form.warnings[0].contains("placed below it"));
    let description = form
        .get_element("dependent_filters")
        .unwrap()
        .description
        .clone()
        .unwrap();
    assert!(description.contains("placed below it"));
}

#[test]
fn configure_stores_normalized_options() {
    let service = GatherService::new();
    let mut view = event_view();

    service
        .configure(
            &mut view,
            "deps",
            &json!({
                "controller_filter": "type",
                "controller_values": {"event": "event", "article": 0},
                "dependent_filters": ["location"],
            }),
        )
        .unwrap();

    let filter = view.definition.filter("deps").unwrap();
    let cfg = DependencyConfig::from_filter(filter).unwrap();
    assert_eq!(cfg.controller_filter.as_deref(), Some("type"));
    assert_eq!(cfg.controller_values, vec!["event"]);
    assert_eq!(cfg.dependent_filters, vec!["location"]);
    assert!(filter.exposed);

    let summaries = service.summaries(&view);
    assert_eq!(summaries[1].1, "type controlling location");
}

#[test]
fn configure_rejects_misplaced_filters() {
    let service = GatherService::new();
    let mut view = event_view();

    let err = service
        .configure(
            &mut view,
            "deps",
            &json!({
                "controller_filter": "date",
                "controller_values": [],
                "dependent_filters": ["type"],
            }),
        )
        .unwrap_err();

    match err {
        DependentFilterError::Validation { filter, errors } => {
            assert_eq!(filter, "deps");
            assert_eq!(errors.len(), 2);
            assert_eq!(errors[0].field.as_deref(), Some("controller_filter"));
            assert_eq!(errors[1].field.as_deref(), Some("dependent_filters"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let cfg = DependencyConfig::from_filter(view.definition.filter("deps").unwrap()).unwrap();
    assert_eq!(cfg.controller_filter.as_deref(), Some("type"));
}

#[test]
fn configure_rejects_unknown_controller_values() {
    let service = GatherService::new();
    let mut view = event_view();

    let err = service
        .configure(
            &mut view,
            "deps",
            &json!({
                "controller_filter": "type",
                "controller_values": ["podcast"],
                "dependent_filters": ["date"],
            }),
        )
        .unwrap_err();

    assert!(err.to_string().contains("podcast"));
}

#[test]
fn free_text_controller_accepts_comma_separated_values() {
    let service = GatherService::new();
    let mut view = test_view(
        "v",
        vec![
            test_filter("code").build(),
            dependent_instance("deps").build(),
            test_filter("detail").build(),
        ],
    );

    service
        .configure(
            &mut view,
            "deps",
            &json!({
                "controller_filter": "code",
                "controller_values": "a1, b2 ,",
                "dependent_filters": ["detail"],
            }),
        )
        .unwrap();

    let cfg = DependencyConfig::from_filter(view.definition.filter("deps").unwrap()).unwrap();
    assert_eq!(cfg.controller_values, vec!["a1", "b2"]);
}
