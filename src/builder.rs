//! Assembles flat paths from a logical description.

use crate::error::PathError;
use crate::flat::FlatPath;
use crate::handle::PersistentPath;
use crate::resolver::{ElementRef, ModelRef, ResolvedPath};
use crate::{is_marker, ElementId, Identifier, ModelId, HOME_MODEL_MARKER, ROOT_MODEL_MARKER};

/// Builder for a persistent path.
///
/// # Example
///
/// ```
/// use persistent_path::{PathBuilder, ROOT_MODEL_MARKER};
///
/// let path = PathBuilder::new().root_model(9).element(100).flat_path().unwrap();
/// assert_eq!(path.ids(), &[ROOT_MODEL_MARKER, 9, 100]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    home: Option<ModelId>,
    prefix: Vec<Identifier>,
    root: Option<ModelId>,
    elements: Vec<ElementId>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-anchor to `model_id` before anything else.
    pub fn home_model(mut self, model_id: ModelId) -> Self {
        self.home = Some(model_id);
        self
    }

    /// Reference-attachment chain, written verbatim.
    pub fn prefix(mut self, ids: impl IntoIterator<Item = Identifier>) -> Self {
        self.prefix.extend(ids);
        self
    }

    /// Resolve the element path in `model_id`.
    pub fn root_model(mut self, model_id: ModelId) -> Self {
        self.root = Some(model_id);
        self
    }

    /// Append one element to the nested element path.
    pub fn element(mut self, element_id: ElementId) -> Self {
        self.elements.push(element_id);
        self
    }

    pub fn elements(mut self, ids: impl IntoIterator<Item = ElementId>) -> Self {
        self.elements.extend(ids);
        self
    }

    /// Lay out the identifiers:
    /// `[HOME, home]? prefix* [ROOT, root]? elements+`.
    ///
    /// A prefix needs a root model: the root pair is what separates it from
    /// the element path.
    pub fn flat_path(&self) -> Result<FlatPath, PathError> {
        if self.elements.is_empty() {
            return Err(PathError::EmptyPath);
        }
        if !self.prefix.is_empty() && self.root.is_none() {
            return Err(PathError::MalformedPath("prefix without root model"));
        }

        let reserved = self
            .home
            .iter()
            .chain(&self.prefix)
            .chain(self.root.iter())
            .chain(&self.elements)
            .find(|&&id| is_marker(id));
        if let Some(&id) = reserved {
            return Err(PathError::ReservedIdentifier(id));
        }

        let mut ids = Vec::with_capacity(self.prefix.len() + self.elements.len() + 4);
        if let Some(home) = self.home {
            ids.extend([HOME_MODEL_MARKER, home]);
        }
        ids.extend_from_slice(&self.prefix);
        if let Some(root) = self.root {
            ids.extend([ROOT_MODEL_MARKER, root]);
        }
        ids.extend_from_slice(&self.elements);

        Ok(FlatPath::new(ids))
    }

    pub fn build(&self) -> Result<PersistentPath, PathError> {
        Ok(PersistentPath::from_flat_path(&self.flat_path()?))
    }
}

impl PersistentPath {
    /// Path to a single element in the caller's current model.
    pub fn from_element(element_id: ElementId) -> Result<Self, PathError> {
        PathBuilder::new().element(element_id).build()
    }

    /// Path to `target` relative to the `anchor` model.
    ///
    /// The root-model pair is written only when the target lives in a
    /// different model. Nested element hops are kept in order. A target in
    /// another container needs a reference-attachment prefix, which is not
    /// built here.
    pub fn from_resolved<M: ModelRef, E: ElementRef>(
        anchor: &M,
        target: &ResolvedPath<M, E>,
    ) -> Result<Self, PathError> {
        if target.model.container() != anchor.container() {
            return Err(PathError::Unsupported("cross-container target"));
        }
        let mut builder = PathBuilder::new().elements(target.element_ids());
        if target.model_id() != anchor.model_id() {
            builder = builder.root_model(target.model_id());
        }
        builder.build()
    }

    /// Path that always switches to `root_model_id`, even when the caller's
    /// model would already be correct.
    pub fn with_root_model(root_model_id: ModelId, element_id: ElementId) -> Result<Self, PathError> {
        PathBuilder::new()
            .root_model(root_model_id)
            .element(element_id)
            .build()
    }
}
