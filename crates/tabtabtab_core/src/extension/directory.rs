//! Extension directory: identifier to descriptor mapping.

use crate::extension::contract::Extension;
use crate::extension::descriptor::{ExtensionDescriptor, ExtensionId, InvalidExtensionId};
use crate::llm::LlmProcessor;
use crate::sse::NotificationSender;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Directory registration and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    InvalidExtensionId(#[from] InvalidExtensionId),
    #[error("extension id already registered: {0}")]
    DuplicateExtensionId(ExtensionId),
    #[error("extension description must not be empty: {0}")]
    EmptyDescription(ExtensionId),
    #[error("extension depends on itself: {0}")]
    SelfDependency(ExtensionId),
    #[error("extension {extension_id} depends on unregistered extension {dependency}")]
    UnknownDependency {
        extension_id: ExtensionId,
        dependency: ExtensionId,
    },
    #[error("extension dependency cycle: {}", format_cycle(.0))]
    DependencyCycle(Vec<ExtensionId>),
    #[error("extension not found: {0}")]
    NotFound(String),
}

fn format_cycle(path: &[ExtensionId]) -> String {
    path.iter()
        .map(ExtensionId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Descriptors known to a host, keyed by extension id.
#[derive(Debug, Default, Clone)]
pub struct ExtensionDirectory {
    entries: BTreeMap<ExtensionId, ExtensionDescriptor>,
}

impl ExtensionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one descriptor. Dependencies are checked by [`validate`].
    ///
    /// [`validate`]: ExtensionDirectory::validate
    pub fn register(&mut self, descriptor: ExtensionDescriptor) -> Result<(), DirectoryError> {
        let id = descriptor.extension_id.clone();
        if descriptor.description.trim().is_empty() {
            return Err(DirectoryError::EmptyDescription(id));
        }
        if self.entries.contains_key(&id) {
            return Err(DirectoryError::DuplicateExtensionId(id));
        }
        self.entries.insert(id, descriptor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, extension_id: &str) -> Option<&ExtensionDescriptor> {
        let id = ExtensionId::parse(extension_id).ok()?;
        self.entries.get(&id)
    }

    /// Returns sorted extension ids.
    pub fn ids(&self) -> Vec<&ExtensionId> {
        self.entries.keys().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtensionDescriptor> {
        self.entries.values()
    }

    /// Checks that every dependency is registered and the graph is acyclic.
    pub fn validate(&self) -> Result<(), DirectoryError> {
        self.initialization_order().map(|_| ())
    }

    /// Returns ids ordered so that every dependency precedes its dependents.
    ///
    /// Ties are broken by id order, so the result is deterministic.
    pub fn initialization_order(&self) -> Result<Vec<ExtensionId>, DirectoryError> {
        for descriptor in self.entries.values() {
            for dependency in &descriptor.dependencies {
                if *dependency == descriptor.extension_id {
                    return Err(DirectoryError::SelfDependency(dependency.clone()));
                }
                if !self.entries.contains_key(dependency) {
                    return Err(DirectoryError::UnknownDependency {
                        extension_id: descriptor.extension_id.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        let mut marks = BTreeMap::<&ExtensionId, VisitMark>::new();
        let mut stack = Vec::new();
        let mut order = Vec::with_capacity(self.entries.len());
        for id in self.entries.keys() {
            self.visit(id, &mut marks, &mut stack, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        id: &'a ExtensionId,
        marks: &mut BTreeMap<&'a ExtensionId, VisitMark>,
        stack: &mut Vec<&'a ExtensionId>,
        order: &mut Vec<ExtensionId>,
    ) -> Result<(), DirectoryError> {
        match marks.get(id) {
            Some(VisitMark::Done) => return Ok(()),
            Some(VisitMark::InProgress) => {
                let start = stack.iter().position(|entry| *entry == id).unwrap_or(0);
                let mut cycle: Vec<ExtensionId> =
                    stack[start..].iter().map(|entry| (*entry).clone()).collect();
                cycle.push(id.clone());
                return Err(DirectoryError::DependencyCycle(cycle));
            }
            None => {}
        }

        marks.insert(id, VisitMark::InProgress);
        stack.push(id);
        if let Some(descriptor) = self.entries.get(id) {
            for dependency in &descriptor.dependencies {
                self.visit(dependency, marks, stack, order)?;
            }
        }
        stack.pop();
        marks.insert(id, VisitMark::Done);
        order.push(id.clone());
        Ok(())
    }

    /// Builds one registered extension with the given collaborators.
    pub fn instantiate(
        &self,
        extension_id: &str,
        sse_sender: Arc<dyn NotificationSender>,
        llm_processor: Arc<dyn LlmProcessor>,
    ) -> Result<Arc<dyn Extension>, DirectoryError> {
        let descriptor = self
            .get(extension_id)
            .ok_or_else(|| DirectoryError::NotFound(extension_id.to_string()))?;
        Ok(descriptor.instantiate(sse_sender, llm_processor))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitMark {
    InProgress,
    Done,
}
