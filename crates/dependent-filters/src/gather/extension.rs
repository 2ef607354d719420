//! Exposed filter handler registry.
//!
//! Every filter names the handler that drives it through exposed-form
//! processing. Built-in handlers are Rust implementations; plugins alias
//! them under their own names via `tap_gather_extend` JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::dependent::{DependencyEvaluation, DependentFilterHandler};
use super::handlers::StandardFilterHandler;
use super::registry::{DisplayFilters, FilterRegistry};
use super::types::{FilterValue, QueryFilter, STANDARD_HANDLER, SubmittedInput};
use crate::error::Result;
use crate::form::{Form, FormElement};

/// What a handler can see of the display it belongs to.
#[derive(Clone, Copy)]
pub struct HandlerContext<'a> {
    /// Sibling filters, in evaluation order.
    pub filters: &'a DisplayFilters,
    /// Handler lookup for sibling filters.
    pub handlers: &'a FilterHandlerRegistry,
}

/// Lifecycle contract for filters taking part in exposed-form processing.
pub trait ExposedFilterHandler: Send + Sync {
    /// Built-in handler name.
    fn name(&self) -> &'static str;

    /// Options a new filter of this kind starts with.
    fn default_options(&self) -> Value {
        Value::Null
    }

    /// Whether filters of this kind are exposed regardless of configuration.
    fn always_exposed(&self) -> bool {
        false
    }

    /// Build the admin options form for `filter`.
    fn build_admin_options(&self, filter: &QueryFilter, ctx: &HandlerContext<'_>) -> Result<Form>;

    /// Validate submitted admin values and return the options to persist.
    fn submit_admin_options(
        &self,
        filter: &QueryFilter,
        values: &Value,
        ctx: &HandlerContext<'_>,
    ) -> Result<Value>;

    /// One-line description for admin listings.
    fn admin_summary(&self, filter: &QueryFilter) -> String;

    /// Element rendered on the exposed form, if any.
    fn exposed_element(&self, filter: &QueryFilter) -> Option<FormElement>;

    /// Build-phase evaluation. Only dependency-gating handlers return `Some`.
    fn evaluate(
        &self,
        filter: &QueryFilter,
        ctx: &HandlerContext<'_>,
        input: &SubmittedInput,
    ) -> Option<DependencyEvaluation> {
        let _ = (filter, ctx, input);
        None
    }

    /// Apply an evaluation produced by this handler. Runs before any input
    /// is accepted.
    fn apply(&self, evaluation: &DependencyEvaluation, registry: &mut dyn FilterRegistry) {
        let _ = (evaluation, registry);
    }

    /// Take this filter's value from the submitted input.
    fn accept_input(&self, filter: &QueryFilter, input: &SubmittedInput) -> Option<FilterValue>;

    /// Whether the filter adds a condition to the query.
    fn contributes_condition(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Serde declaration types (from tap JSON)
// ---------------------------------------------------------------------------

/// Top-level declaration from a plugin's `tap_gather_extend` response.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatherExtensionDeclaration {
    /// Exposed filter handler aliases.
    #[serde(default)]
    pub filters: Vec<FilterExtension>,
}

/// A filter extension declaration from a plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterExtension {
    /// Name filters use in their `handler` field.
    pub name: String,
    /// Built-in handler name (e.g. "standard", "dependent").
    pub handler: String,
}

/// Validate an extension name: must be non-empty, alphanumeric/underscore/hyphen,
/// start with a letter or underscore, max 64 chars.
fn is_valid_extension_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registry of exposed filter handlers.
///
/// Two-level lookup: extension name → built-in handler name → handler impl.
/// Unknown names fall back to the standard handler.
pub struct FilterHandlerRegistry {
    handlers: HashMap<String, Box<dyn ExposedFilterHandler>>,
    /// Plugin aliases: extension name → built-in handler name.
    extensions: HashMap<String, String>,
    fallback: StandardFilterHandler,
}

impl Default for FilterHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterHandlerRegistry {
    /// Create a new registry with built-in handlers pre-registered.
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            extensions: HashMap::new(),
            fallback: StandardFilterHandler,
        };

        registry.register(Box::new(StandardFilterHandler));
        registry.register(Box::new(DependentFilterHandler));

        registry
    }

    /// Register a built-in handler under its own name.
    pub fn register(&mut self, handler: Box<dyn ExposedFilterHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    /// Apply plugin declarations, validating that referenced handlers exist.
    ///
    /// Each entry is `(plugin_name, declaration)`. Returns warnings for
    /// rejected or overwritten declarations.
    pub fn apply_declarations(
        &mut self,
        declarations: Vec<(String, GatherExtensionDeclaration)>,
    ) -> Vec<String> {
        let mut warnings = Vec::new();

        for (plugin_name, decl) in declarations {
            for filter in decl.filters {
                if !is_valid_extension_name(&filter.name) {
                    warnings.push(format!(
                        "plugin '{}': filter name '{}' is invalid (must be alphanumeric/underscore/hyphen, start with letter or underscore)",
                        plugin_name, filter.name
                    ));
                    continue;
                }
                if !self.handlers.contains_key(&filter.handler) {
                    warnings.push(format!(
                        "plugin '{}': filter '{}' references unknown handler '{}'",
                        plugin_name, filter.name, filter.handler
                    ));
                    continue;
                }
                if self.handlers.contains_key(&filter.name)
                    || self.extensions.contains_key(&filter.name)
                {
                    warnings.push(format!(
                        "plugin '{}': filter '{}' overwrites existing extension",
                        plugin_name, filter.name
                    ));
                    if self.handlers.contains_key(&filter.name) {
                        continue;
                    }
                }
                self.extensions.insert(filter.name, filter.handler);
            }
        }

        warnings
    }

    /// Resolve a handler or extension name to its built-in handler name.
    fn resolve_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.handlers.contains_key(name) {
            return Some(name);
        }
        self.extensions.get(name).map(String::as_str)
    }

    /// Look up a handler by handler or extension name.
    pub fn get(&self, name: &str) -> Option<&dyn ExposedFilterHandler> {
        let resolved = self.resolve_name(name)?;
        self.handlers.get(resolved).map(|h| h.as_ref())
    }

    /// Whether `name` is a known handler or extension.
    pub fn is_known(&self, name: &str) -> bool {
        self.resolve_name(name).is_some()
    }

    /// Whether `name` resolves to the built-in handler `handler_name`.
    pub fn resolves_to(&self, name: &str, handler_name: &str) -> bool {
        self.resolve_name(name) == Some(handler_name)
    }

    /// Handler driving `filter`, falling back to the standard handler.
    pub fn handler_for(&self, filter: &QueryFilter) -> &dyn ExposedFilterHandler {
        match self.get(&filter.handler) {
            Some(handler) => handler,
            None => {
                debug!(
                    filter = %filter.id,
                    handler = %filter.handler,
                    fallback = STANDARD_HANDLER,
                    "using fallback handler"
                );
                &self.fallback
            }
        }
    }

    /// List all registered handler and extension names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .handlers
            .keys()
            .chain(self.extensions.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::gather::dependent::DEPENDENT_HANDLER;

    fn alias(name: &str, handler: &str) -> GatherExtensionDeclaration {
        GatherExtensionDeclaration {
            filters: vec![FilterExtension {
                name: name.to_string(),
                handler: handler.to_string(),
            }],
        }
    }

    #[test]
    fn declaration_defaults_empty_collections() {
        let decl: GatherExtensionDeclaration = serde_json::from_str("{}").unwrap();
        assert!(decl.filters.is_empty());
    }

    #[test]
    fn registry_new_has_builtin_handlers() {
        let registry = FilterHandlerRegistry::new();
        assert!(registry.is_known(STANDARD_HANDLER));
        assert!(registry.is_known(DEPENDENT_HANDLER));
        assert_eq!(registry.names(), vec![DEPENDENT_HANDLER, STANDARD_HANDLER]);
    }

    #[test]
    fn registry_apply_valid_alias() {
        let mut registry = FilterHandlerRegistry::new();
        let warnings = registry
            .apply_declarations(vec![("events".to_string(), alias("event_gate", "dependent"))]);

        assert!(warnings.is_empty());
        assert!(registry.resolves_to("event_gate", DEPENDENT_HANDLER));
        assert_eq!(registry.get("event_gate").unwrap().name(), DEPENDENT_HANDLER);
    }

    #[test]
    fn registry_apply_unknown_handler_warns() {
        let mut registry = FilterHandlerRegistry::new();
        let warnings = registry
            .apply_declarations(vec![("bad".to_string(), alias("bad_filter", "nonexistent"))]);

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("unknown handler"));
        assert!(!registry.is_known("bad_filter"));
    }

    #[test]
    fn registry_apply_invalid_name_warns() {
        let mut registry = FilterHandlerRegistry::new();
        let warnings = registry.apply_declarations(vec![
            ("p".to_string(), alias("", "standard")),
            ("p".to_string(), alias("has spaces", "standard")),
            ("p".to_string(), alias("123start", "standard")),
        ]);

        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().all(|w| w.contains("invalid")));
    }

    #[test]
    fn registry_alias_cannot_shadow_builtin() {
        let mut registry = FilterHandlerRegistry::new();
        let warnings =
            registry.apply_declarations(vec![("p".to_string(), alias("standard", "dependent"))]);

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("overwrites"));
        assert!(registry.resolves_to("standard", STANDARD_HANDLER));
    }

    #[test]
    fn unknown_handler_falls_back_to_standard() {
        let registry = FilterHandlerRegistry::new();
        let mut filter = QueryFilter::new("color", "fields.color");
        filter.handler = "missing_plugin_handler".to_string();
        assert_eq!(registry.handler_for(&filter).name(), STANDARD_HANDLER);
    }

    #[test]
    fn valid_extension_names() {
        assert!(is_valid_extension_name("event_gate"));
        assert!(is_valid_extension_name("_private"));
        assert!(is_valid_extension_name("my-filter"));

        assert!(!is_valid_extension_name(""));
        assert!(!is_valid_extension_name("123abc"));
        assert!(!is_valid_extension_name("has.dots"));
    }
}
