//! Gather query types used by exposed filter processing.
//!
//! Provides the subset of the declarative query model that exposed filters
//! operate on:
//! - QueryDefinition: ordered filter list for a gather query
//! - QueryFilter: a single filter, optionally exposed to end users
//! - SubmittedInput: raw exposed-form input keyed by form identifier

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Handler name used when a filter does not declare one.
pub const STANDARD_HANDLER: &str = "standard";

/// Query definition: the ordered filters of a gather query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// Base table to query (typically "item").
    #[serde(default = "default_base_table")]
    pub base_table: String,

    /// Filter by content type (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,

    /// Filter conditions, in evaluation order.
    #[serde(default)]
    pub filters: Vec<QueryFilter>,
}

fn default_base_table() -> String {
    "item".to_string()
}

impl Default for QueryDefinition {
    fn default() -> Self {
        Self {
            base_table: default_base_table(),
            item_type: None,
            filters: Vec::new(),
        }
    }
}

impl QueryDefinition {
    /// Find a filter by its id.
    pub fn filter(&self, id: &str) -> Option<&QueryFilter> {
        self.filters.iter().find(|f| f.id == id)
    }

    /// Find a filter by its id, mutably.
    pub fn filter_mut(&mut self, id: &str) -> Option<&mut QueryFilter> {
        self.filters.iter_mut().find(|f| f.id == id)
    }
}

/// Filter condition for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Unique id of this filter within its definition.
    pub id: String,

    /// Field to filter on.
    #[serde(default)]
    pub field: String,

    /// Comparison operator.
    #[serde(default)]
    pub operator: FilterOperator,

    /// Admin-configured value, used when no exposed input is accepted.
    #[serde(default)]
    pub value: FilterValue,

    /// Whether user can modify this filter.
    #[serde(default)]
    pub exposed: bool,

    /// Label for exposed filter UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed_label: Option<String>,

    /// Exposed form settings.
    #[serde(default)]
    pub expose: ExposeSettings,

    /// Name of the exposed filter handler responsible for this filter.
    #[serde(default = "default_handler")]
    pub handler: String,

    /// Handler-specific options.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub options: serde_json::Value,
}

fn default_handler() -> String {
    STANDARD_HANDLER.to_string()
}

impl QueryFilter {
    /// Create a standard, non-exposed filter.
    pub fn new(id: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            field: field.into(),
            operator: FilterOperator::default(),
            value: FilterValue::default(),
            exposed: false,
            exposed_label: None,
            expose: ExposeSettings::default(),
            handler: default_handler(),
            options: serde_json::Value::Null,
        }
    }

    /// Form input identifier; falls back to the filter id.
    pub fn identifier(&self) -> &str {
        match self.expose.identifier.as_deref() {
            Some(identifier) if !identifier.is_empty() => identifier,
            _ => &self.id,
        }
    }

    /// Whether the exposed filter must receive a value.
    pub fn is_required(&self) -> bool {
        self.expose.required
    }

    /// Whether the exposed filter accepts several values.
    pub fn is_multiple(&self) -> bool {
        self.expose.multiple
    }

    /// Label shown to users, defaulting to the filter id.
    pub fn label(&self) -> &str {
        self.exposed_label.as_deref().unwrap_or(&self.id)
    }
}

/// Exposed form settings for a filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExposeSettings {
    /// Key under which the submitted value arrives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub multiple: bool,

    /// Selectable values as `(key, label)` pairs. Empty means free text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<(String, String)>,
}

/// Comparison operators for filtering.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Exact match.
    #[default]
    Equals,
    /// Not equal.
    NotEquals,
    /// Substring match.
    Contains,
    /// Value in list.
    In,
    /// Value not in list.
    NotIn,
    /// Field is NULL.
    IsNull,
    /// Field is not NULL.
    IsNotNull,
}

/// Filter value types.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FilterValue {
    /// No value configured.
    #[default]
    Null,
    /// String value.
    String(String),
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// List of values (for In/NotIn operators and multiple filters).
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Convert a scalar to its string representation.
    pub fn as_string(&self) -> Option<String> {
        match self {
            FilterValue::String(s) => Some(s.clone()),
            FilterValue::Integer(i) => Some(i.to_string()),
            FilterValue::Float(f) => Some(f.to_string()),
            FilterValue::Boolean(b) => Some(b.to_string()),
            FilterValue::Null | FilterValue::List(_) => None,
        }
    }

    /// Flatten to a list of string representations.
    pub fn as_string_list(&self) -> Vec<String> {
        match self {
            FilterValue::List(items) => items.iter().filter_map(FilterValue::as_string).collect(),
            other => other.as_string().into_iter().collect(),
        }
    }
}

impl From<&SubmittedValue> for FilterValue {
    fn from(value: &SubmittedValue) -> Self {
        match value {
            SubmittedValue::Single(s) => FilterValue::String(s.clone()),
            SubmittedValue::Multiple(items) => {
                FilterValue::List(items.iter().cloned().map(FilterValue::String).collect())
            }
        }
    }
}

/// A single submitted form value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SubmittedValue {
    Single(String),
    Multiple(Vec<String>),
}

impl SubmittedValue {
    /// Whether nothing meaningful was submitted.
    pub fn is_empty(&self) -> bool {
        match self {
            SubmittedValue::Single(s) => s.is_empty(),
            SubmittedValue::Multiple(items) => items.iter().all(String::is_empty),
        }
    }

    /// All submitted values, in submission order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            SubmittedValue::Single(s) => vec![s.as_str()],
            SubmittedValue::Multiple(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

/// Exposed-form input for one request, keyed by form identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SubmittedInput {
    values: HashMap<String, SubmittedValue>,
}

impl SubmittedInput {
    /// Create empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single value.
    pub fn with(mut self, identifier: impl Into<String>, value: impl Into<String>) -> Self {
        self.values
            .insert(identifier.into(), SubmittedValue::Single(value.into()));
        self
    }

    /// Add a multi-valued entry.
    pub fn with_many<I, S>(mut self, identifier: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values.insert(
            identifier.into(),
            SubmittedValue::Multiple(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Look up the value submitted under an identifier.
    pub fn get(&self, identifier: &str) -> Option<&SubmittedValue> {
        self.values.get(identifier)
    }

    /// Whether no identifier was submitted.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build input from a decoded JSON object.
    ///
    /// Scalars are stringified, arrays become multi-valued entries and
    /// `null` entries are treated as absent. Non-object input yields nothing.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };

        let values = map
            .iter()
            .filter_map(|(key, v)| {
                let submitted = match v {
                    serde_json::Value::Null => return None,
                    serde_json::Value::Array(items) => SubmittedValue::Multiple(
                        items.iter().filter_map(json_scalar_to_string).collect(),
                    ),
                    other => SubmittedValue::Single(json_scalar_to_string(other)?),
                };
                Some((key.clone(), submitted))
            })
            .collect();

        Self { values }
    }
}

/// Stringify a JSON scalar the way form submissions arrive.
pub(crate) fn json_scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Complete gather view: a persisted definition plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatherView {
    /// Unique view identifier.
    pub view_id: String,

    /// Human-readable label.
    #[serde(default)]
    pub label: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Query definition.
    #[serde(default)]
    pub definition: QueryDefinition,

    /// Owning plugin.
    #[serde(default = "default_plugin")]
    pub plugin: String,
}

fn default_plugin() -> String {
    "core".to_string()
}

impl GatherView {
    /// Create an empty view owned by core.
    pub fn new(view_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            view_id: view_id.into(),
            label: label.into(),
            description: None,
            definition: QueryDefinition::default(),
            plugin: default_plugin(),
        }
    }
}
