//! Exclusive single-slot resources for the deadlock model.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

use super::id::{ProcessId, ResourceId};

/// A resource that at most one process can hold at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub(crate) id: ResourceId,
    pub(crate) name: String,
    pub(crate) allocated_to: Option<ProcessId>,
}

impl Resource {
    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current holder, if any.
    #[inline]
    pub fn allocated_to(&self) -> Option<ProcessId> {
        self.allocated_to
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.allocated_to.is_none()
    }
}

impl fmt::Display for Resource {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Creation-ordered resource arena keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    entries: IndexMap<String, Resource>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new resource. Returns `None` if the name is taken.
    pub(crate) fn insert(
        &mut self,
        name: String,
    ) -> Option<ResourceId> {
        if self.entries.contains_key(&name) {
            return None;
        }
        let id = ResourceId(self.entries.len());
        self.entries.insert(
            name.clone(),
            Resource {
                id,
                name,
                allocated_to: None,
            },
        );
        Some(id)
    }

    #[inline]
    pub fn get(
        &self,
        id: ResourceId,
    ) -> Option<&Resource> {
        self.entries.get_index(id.0).map(|(_, r)| r)
    }

    #[inline]
    pub(crate) fn get_mut(
        &mut self,
        id: ResourceId,
    ) -> Option<&mut Resource> {
        self.entries.get_index_mut(id.0).map(|(_, r)| r)
    }

    #[inline]
    pub fn id_of(
        &self,
        name: &str,
    ) -> Option<ResourceId> {
        self.entries.get_index_of(name).map(ResourceId)
    }

    /// Holder of `id`, if the resource exists and is held.
    #[inline]
    pub fn holder(
        &self,
        id: ResourceId,
    ) -> Option<ProcessId> {
        self.get(id).and_then(|r| r.allocated_to)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.entries.values()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
