//! Per-resource warning accumulation
//!
//! Warnings arise when a valid field cannot be honored (an ExternalName
//! service without a resolver, slow start with an incompatible LB
//! method). They never abort compilation; the compiler substitutes a safe
//! value and records a message against the resource that owns the field.

use std::collections::HashMap;

use trellis_common::ids::ResourceId;

/// Warning messages keyed by the resource that caused them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Warnings {
    by_resource: HashMap<ResourceId, Vec<String>>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning against a resource.
    pub fn add(&mut self, resource: ResourceId, message: impl Into<String>) {
        self.by_resource.entry(resource).or_default().push(message.into());
    }

    /// Merge another warning set into this one.
    pub fn merge(&mut self, other: Warnings) {
        for (resource, messages) in other.by_resource {
            self.by_resource.entry(resource).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_resource.is_empty()
    }

    /// Messages recorded for one resource, in insertion order.
    pub fn for_resource(&self, resource: &ResourceId) -> &[String] {
        self.by_resource.get(resource).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &Vec<String>)> {
        self.by_resource.iter()
    }

    pub fn len(&self) -> usize {
        self.by_resource.len()
    }
}
