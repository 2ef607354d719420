//! Per-request filter registry.
//!
//! Handlers never reach into another filter's options directly. They resolve
//! a [`FilterHandle`] by id and flip the exposed flag through the registry,
//! which only holds a request-local copy of the definition's filters.

use std::collections::HashMap;

use super::types::{QueryDefinition, QueryFilter};

/// Opaque reference to a filter in a [`FilterRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterHandle(usize);

impl FilterHandle {
    /// Position of the filter in evaluation order.
    pub fn position(self) -> usize {
        self.0
    }
}

/// Read/write access to the sibling filters of one display.
pub trait FilterRegistry {
    /// Resolve a filter id. Stale ids resolve to `None`.
    fn get_filter(&self, id: &str) -> Option<FilterHandle>;

    /// Access a resolved filter.
    fn filter(&self, handle: FilterHandle) -> &QueryFilter;

    /// Set whether a filter is exposed for the remainder of this request.
    fn set_exposed(&mut self, handle: FilterHandle, exposed: bool);

    fn is_exposed(&self, handle: FilterHandle) -> bool {
        self.filter(handle).exposed
    }
}

/// Ordered, request-local copy of a definition's filters.
#[derive(Debug, Clone, Default)]
pub struct DisplayFilters {
    filters: Vec<QueryFilter>,
    index: HashMap<String, usize>,
}

impl DisplayFilters {
    /// Build from an ordered filter list.
    ///
    /// When ids collide the first occurrence wins the lookup; the later
    /// duplicates are still iterated.
    pub fn new(filters: Vec<QueryFilter>) -> Self {
        let mut index = HashMap::with_capacity(filters.len());
        for (pos, filter) in filters.iter().enumerate() {
            index.entry(filter.id.clone()).or_insert(pos);
        }
        Self { filters, index }
    }

    /// Copy the filters of a definition.
    pub fn from_definition(definition: &QueryDefinition) -> Self {
        Self::new(definition.filters.clone())
    }

    /// Position of a filter id in evaluation order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Look up a filter by id.
    pub fn get(&self, id: &str) -> Option<&QueryFilter> {
        self.position(id).map(|pos| &self.filters[pos])
    }

    /// Iterate filters in evaluation order together with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (FilterHandle, &QueryFilter)> {
        self.filters
            .iter()
            .enumerate()
            .map(|(pos, f)| (FilterHandle(pos), f))
    }

    /// Handles of every filter, detached from the borrow of `self`.
    pub fn handles(&self) -> impl Iterator<Item = FilterHandle> + use<> {
        (0..self.filters.len()).map(FilterHandle)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Ids of every filter currently exposed, in order.
    #[cfg(test)]
    pub(crate) fn exposed_ids(&self) -> Vec<&str> {
        self.filters
            .iter()
            .filter(|f| f.exposed)
            .map(|f| f.id.as_str())
            .collect()
    }

    /// Consume the registry, returning the filters with their request state.
    pub fn into_filters(self) -> Vec<QueryFilter> {
        self.filters
    }
}

impl FilterRegistry for DisplayFilters {
    fn get_filter(&self, id: &str) -> Option<FilterHandle> {
        self.position(id).map(FilterHandle)
    }

    fn filter(&self, handle: FilterHandle) -> &QueryFilter {
        &self.filters[handle.0]
    }

    fn set_exposed(&mut self, handle: FilterHandle, exposed: bool) {
        if let Some(filter) = self.filters.get_mut(handle.0) {
            filter.exposed = exposed;
        }
    }
}
