//! Deterministic in-memory model store.
//!
//! Holds containers → models → elements (with nested components) in ordered
//! maps and records every collaborator call, so resolution can be checked
//! without any real storage behind it.

use crate::error::NotFound;
use crate::resolver::{ElementRef, ModelRef, ModelStore};
use crate::{ElementId, ModelId};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

/// Container handle.
pub type ContainerId = u32;

/// Loaded model handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryModel {
    pub container: ContainerId,
    pub model_id: ModelId,
}

impl ModelRef for MemoryModel {
    type Container = ContainerId;

    fn model_id(&self) -> ModelId {
        self.model_id
    }

    fn container(&self) -> ContainerId {
        self.container
    }
}

/// Resolved element handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryElement {
    pub container: ContainerId,
    pub model_id: ModelId,
    pub element_id: ElementId,

    /// Owning element for components; `None` at top level.
    pub parent: Option<ElementId>,
}

impl ElementRef for MemoryElement {
    fn element_id(&self) -> ElementId {
        self.element_id
    }
}

/// One collaborator call, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryCall {
    LoadModel {
        container: ContainerId,
        model_id: ModelId,
    },
    FindElement {
        model_id: ModelId,
        parent: Option<ElementId>,
        element_id: ElementId,
    },
}

#[derive(Debug, Default)]
struct ModelData {
    elements: BTreeSet<ElementId>,
    components: BTreeMap<ElementId, BTreeSet<ElementId>>,
}

/// In-memory [`ModelStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    models: BTreeMap<(ContainerId, ModelId), ModelData>,
    calls: RefCell<Vec<MemoryCall>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty model.
    pub fn add_model(&mut self, container: ContainerId, model_id: ModelId) {
        self.models.entry((container, model_id)).or_default();
    }

    /// Register a top-level element, creating its model if needed.
    pub fn add_element(&mut self, container: ContainerId, model_id: ModelId, element_id: ElementId) {
        self.models
            .entry((container, model_id))
            .or_default()
            .elements
            .insert(element_id);
    }

    /// Register `component` as nested inside `parent`.
    pub fn add_component(
        &mut self,
        container: ContainerId,
        model_id: ModelId,
        parent: ElementId,
        component: ElementId,
    ) {
        self.models
            .entry((container, model_id))
            .or_default()
            .components
            .entry(parent)
            .or_default()
            .insert(component);
    }

    /// Handle to a registered model, without recording a call.
    pub fn model(&self, container: ContainerId, model_id: ModelId) -> Option<MemoryModel> {
        self.models
            .contains_key(&(container, model_id))
            .then_some(MemoryModel {
                container,
                model_id,
            })
    }

    /// Calls made so far.
    pub fn calls(&self) -> Vec<MemoryCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: MemoryCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl ModelStore for MemoryStore {
    type Model = MemoryModel;
    type Element = MemoryElement;

    fn load_model(&self, container: &ContainerId, model_id: ModelId) -> Result<MemoryModel, NotFound> {
        self.record(MemoryCall::LoadModel {
            container: *container,
            model_id,
        });
        self.model(*container, model_id).ok_or(NotFound)
    }

    fn find_element(
        &self,
        model: &MemoryModel,
        parent: Option<&MemoryElement>,
        element_id: ElementId,
    ) -> Result<MemoryElement, NotFound> {
        let parent_id = parent.map(|p| p.element_id);
        self.record(MemoryCall::FindElement {
            model_id: model.model_id,
            parent: parent_id,
            element_id,
        });

        let data = self
            .models
            .get(&(model.container, model.model_id))
            .ok_or(NotFound)?;

        let found = match parent_id {
            None => data.elements.contains(&element_id),
            Some(owner) => data
                .components
                .get(&owner)
                .is_some_and(|children| children.contains(&element_id)),
        };

        if found {
            Ok(MemoryElement {
                container: model.container,
                model_id: model.model_id,
                element_id,
                parent: parent_id,
            })
        } else {
            Err(NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_records_call() {
        let mut store = MemoryStore::new();
        store.add_model(2, 8);

        assert!(store.load_model(&2, 8).is_ok());
        assert_eq!(store.load_model(&3, 8), Err(NotFound));
        assert_eq!(
            store.calls(),
            vec![
                MemoryCall::LoadModel {
                    container: 2,
                    model_id: 8
                },
                MemoryCall::LoadModel {
                    container: 3,
                    model_id: 8
                },
            ]
        );

        store.clear_calls();
        assert!(store.calls().is_empty());
    }

    #[test]
    fn components_need_their_parent() {
        let mut store = MemoryStore::new();
        store.add_element(1, 1, 10);
        store.add_component(1, 1, 10, 11);
        let model = store.model(1, 1).unwrap();

        let parent = store.find_element(&model, None, 10).unwrap();
        let child = store.find_element(&model, Some(&parent), 11).unwrap();
        assert_eq!(child.parent, Some(10));

        assert_eq!(store.find_element(&model, None, 11), Err(NotFound));
        assert_eq!(store.find_element(&model, Some(&child), 10), Err(NotFound));
    }
}
