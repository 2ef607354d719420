//! Form and form element types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete form definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    /// Unique form identifier (e.g., "gather_dependent_filter_options").
    pub form_id: String,

    /// Unique build ID for this form instance.
    pub form_build_id: String,

    /// Form elements keyed by name.
    pub elements: BTreeMap<String, FormElement>,

    /// Optional form title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Warnings to show above the form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Form {
    /// Create a new form with the given ID.
    pub fn new(form_id: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            form_build_id: uuid::Uuid::now_v7().to_string(),
            elements: BTreeMap::new(),
            title: None,
            warnings: Vec::new(),
        }
    }

    /// Set the form title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add an element to the form.
    pub fn element(mut self, name: impl Into<String>, element: FormElement) -> Self {
        self.elements.insert(name.into(), element);
        self
    }

    /// Add a warning message.
    pub fn warning(mut self, message: impl Into<String>) -> Self {
        self.warnings.push(message.into());
        self
    }

    /// Insert or replace an element in place.
    pub fn insert(&mut self, name: impl Into<String>, element: FormElement) {
        self.elements.insert(name.into(), element);
    }

    pub fn get_element(&self, name: &str) -> Option<&FormElement> {
        self.elements.get(name)
    }

    /// Get a mutable reference to an element.
    pub fn get_element_mut(&mut self, name: &str) -> Option<&mut FormElement> {
        self.elements.get_mut(name)
    }
}

/// A form element definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormElement {
    /// Element type with type-specific configuration.
    #[serde(flatten)]
    pub element_type: ElementType,

    /// Element title/label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Element description/help text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Default value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    #[serde(default)]
    pub required: bool,

    /// Sort weight (lower = appears first).
    #[serde(default)]
    pub weight: i32,

    /// Additional attributes, including client-side `states`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,

    #[serde(default)]
    pub disabled: bool,
}

impl FormElement {
    /// Create a textfield element.
    pub fn textfield() -> Self {
        Self::new(ElementType::Textfield)
    }

    /// Create a select element.
    pub fn select(options: Vec<(String, String)>) -> Self {
        Self::new(ElementType::Select {
            options,
            multiple: false,
        })
    }

    /// Create a multi-select element.
    pub fn multi_select(options: Vec<(String, String)>) -> Self {
        Self::new(ElementType::Select {
            options,
            multiple: true,
        })
    }

    /// Create a checkbox element.
    pub fn checkbox() -> Self {
        Self::new(ElementType::Checkbox)
    }

    /// Create a checkboxes group.
    pub fn checkboxes(options: Vec<(String, String)>) -> Self {
        Self::new(ElementType::Checkboxes { options })
    }

    /// Create a radio button group.
    pub fn radio(options: Vec<(String, String)>) -> Self {
        Self::new(ElementType::Radio { options })
    }

    /// Create a markup element (display-only HTML).
    pub fn markup(value: impl Into<String>) -> Self {
        Self::new(ElementType::Markup {
            value: value.into(),
        })
    }

    fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            title: None,
            description: None,
            default_value: None,
            required: false,
            weight: 0,
            attributes: BTreeMap::new(),
            disabled: false,
        }
    }

    /// Set the element title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the element description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Mark as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the weight.
    pub fn weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    /// Mark as disabled.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Options offered by choice elements; empty for free-form elements.
    pub fn options(&self) -> &[(String, String)] {
        match &self.element_type {
            ElementType::Select { options, .. }
            | ElementType::Checkboxes { options }
            | ElementType::Radio { options } => options,
            _ => &[],
        }
    }
}

/// Element type variants with type-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementType {
    /// Single-line text input.
    Textfield,

    /// Dropdown select.
    Select {
        options: Vec<(String, String)>,
        #[serde(default)]
        multiple: bool,
    },

    /// Single checkbox.
    Checkbox,

    /// Multiple checkboxes.
    Checkboxes { options: Vec<(String, String)> },

    /// Radio button group.
    Radio { options: Vec<(String, String)> },

    /// Display-only markup.
    Markup { value: String },
}

/// A validation error on a submitted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Offending element name, or `None` for form-level errors.
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}
