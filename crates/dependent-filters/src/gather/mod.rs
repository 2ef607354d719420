//! Gather exposed filter module.
//!
//! This module provides:
//! - GatherService: admin configuration and exposed form processing per view
//! - ExposedFormProcessor: build, apply and accept phases of one request
//! - FilterHandlerRegistry: handler lookup and plugin aliases
//! - DependentFilterHandler: controller/dependent filter gating
//! - Types: QueryDefinition, QueryFilter, SubmittedInput, etc.

pub mod dependent;
mod exposed_form;
mod extension;
mod gather_service;
mod handlers;
mod registry;
pub mod types;

pub use dependent::{
    ActivationDecision, CandidateKind, DEPENDENT_HANDLER, DependencyConfig, DependencyEvaluation,
    DependentFilterHandler,
};
pub use exposed_form::{EXPOSED_FORM_ID, ExposedFormProcessor, ExposedFormResult};
pub use extension::{
    ExposedFilterHandler, FilterExtension, FilterHandlerRegistry, GatherExtensionDeclaration,
    HandlerContext,
};
pub use gather_service::{GatherService, validate_definition};
pub use handlers::StandardFilterHandler;
pub use registry::{DisplayFilters, FilterHandle, FilterRegistry};
pub use types::{
    ExposeSettings, FilterOperator, FilterValue, GatherView, QueryDefinition, QueryFilter,
    STANDARD_HANDLER, SubmittedInput, SubmittedValue,
};
