//! CLI command implementations for dependent filter management.
//!
//! Commands operate directly on the view config directory; nothing is
//! cached between invocations.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::config_storage;
use crate::gather::{DependencyConfig, GatherService, SubmittedInput};

/// List all views and their dependent filter instances.
pub fn cmd_list(views_dir: &Path) -> Result<()> {
    let loaded = config_storage::load_views(views_dir)
        .with_context(|| format!("failed to load views from {}", views_dir.display()))?;
    let service = GatherService::new();

    if loaded.views.is_empty() {
        println!("No views found in {}.", views_dir.display());
        return Ok(());
    }

    println!(
        "{:<24} {:<20} {:<20} {:<10}",
        "VIEW", "INSTANCE", "CONTROLLER", "DEPENDENTS"
    );
    println!("{}", "-".repeat(76));

    for view in &loaded.views {
        let instances = service.dependency_instances(view);
        if instances.is_empty() {
            println!("{:<24} {:<20} {:<20} {}", view.view_id, "-", "-", "-");
            continue;
        }
        for instance in instances {
            let (controller, dependents) = match DependencyConfig::from_filter(instance) {
                Ok(config) => (
                    config.controller_filter.unwrap_or_else(|| "-".to_string()),
                    config.dependent_filters.len().to_string(),
                ),
                Err(_) => ("(invalid)".to_string(), "?".to_string()),
            };
            println!(
                "{:<24} {:<20} {:<20} {}",
                view.view_id, instance.id, controller, dependents
            );
        }
    }

    println!();
    println!("Handlers: {}", service.handlers().names().join(", "));

    for warning in &loaded.warnings {
        eprintln!("warning: {warning}");
    }

    Ok(())
}

/// Print the admin summary of every filter in a view.
pub fn cmd_summary(views_dir: &Path, view_id: &str) -> Result<()> {
    let view = config_storage::load_view(views_dir, view_id)?;
    let service = GatherService::new();

    println!("{:<20} SUMMARY", "FILTER");
    println!("{}", "-".repeat(60));
    for (filter_id, summary) in service.summaries(&view) {
        println!("{filter_id:<20} {summary}");
    }
    Ok(())
}

/// Print the admin options form of one filter as JSON.
pub fn cmd_admin_form(views_dir: &Path, view_id: &str, filter_id: &str) -> Result<()> {
    let view = config_storage::load_view(views_dir, view_id)?;
    let form = GatherService::new()
        .admin_form(&view, filter_id)
        .with_context(|| format!("failed to build options form for '{filter_id}'"))?;

    println!("{}", serde_json::to_string_pretty(&form)?);
    Ok(())
}

/// Validate and store submitted admin values for one filter.
pub fn cmd_configure(
    views_dir: &Path,
    view_id: &str,
    filter_id: &str,
    values: &str,
) -> Result<()> {
    let values: Value = serde_json::from_str(values).context("--values must be valid JSON")?;
    let mut view = config_storage::load_view(views_dir, view_id)?;

    let service = GatherService::new();
    service.configure(&mut view, filter_id, &values)?;
    let path = config_storage::save_view(views_dir, &view)?;

    if let Some(filter) = view.definition.filter(filter_id) {
        println!("{}", service.handlers().handler_for(filter).admin_summary(filter));
    }
    println!("Saved {}", path.display());
    Ok(())
}

/// Add a filter driven by `handler` to a view.
pub fn cmd_add(
    views_dir: &Path,
    view_id: &str,
    filter_id: &str,
    handler: &str,
    position: Option<usize>,
) -> Result<()> {
    let mut view = config_storage::load_view(views_dir, view_id)?;
    GatherService::new().add_filter(&mut view, filter_id, handler, position)?;
    let path = config_storage::save_view(views_dir, &view)?;

    println!("Added '{filter_id}' ({handler}) to {view_id}, saved {}", path.display());
    Ok(())
}

/// Process submitted input and print decisions, accepted values and the
/// resolved definition as JSON. `input` is a file path or `-` for stdin.
pub fn cmd_evaluate(views_dir: &Path, view_id: &str, input: &str) -> Result<()> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read input from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?
    };
    let json: Value = serde_json::from_str(&raw).context("input must be a JSON object")?;
    let submitted = SubmittedInput::from_json(&json);
    if submitted.is_empty() {
        eprintln!("warning: no submitted values; every controller counts as empty");
    }

    let view = config_storage::load_view(views_dir, view_id)?;
    let result = GatherService::new().process_exposed(&view, &submitted);

    let output = json!({
        "dependencies": result.dependencies,
        "accepted": result.accepted,
        "definition": result.resolve_definition(&view.definition),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Validate every view. Returns the number of problems found.
pub fn cmd_validate(views_dir: &Path) -> Result<usize> {
    let loaded = config_storage::load_views(views_dir)
        .with_context(|| format!("failed to load views from {}", views_dir.display()))?;
    let service = GatherService::new();

    let mut problems = loaded.warnings;
    for view in &loaded.views {
        problems.extend(config_storage::validate_view(view, service.handlers()));
    }

    if problems.is_empty() {
        println!("{} view(s) OK.", loaded.views.len());
    } else {
        for problem in &problems {
            println!("{problem}");
        }
    }
    Ok(problems.len())
}
