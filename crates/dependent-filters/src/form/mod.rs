//! Declarative form definitions for admin options and exposed forms.
//!
//! Forms are plain data: handlers build them, the host renders them.

mod types;

pub use types::{ElementType, Form, FormElement, ValidationError};
