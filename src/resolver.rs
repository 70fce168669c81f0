//! Path resolution against a model store.
//!
//! Resolution runs as a fixed sequence of phases:
//!
//! ```text
//! Start ──► HomeResolved ──► RootResolved ──► WalkingElements ──► Done
//!   │            │                │                  │
//!   └────────────┴────────────────┴──────────────────┴──► Failed
//! ```
//!
//! Absent marker pairs make their phase a no-op. Any collaborator failure is
//! fatal to the evaluation; nothing is retried here.

use crate::error::PathError;
use crate::flat::FlatPath;
use crate::{ElementId, ModelId, NONE_ID};
use tracing::{debug, trace};

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Handle to a loaded model.
pub trait ModelRef: Clone {
    /// Handle to the container (file) that holds models.
    type Container: Clone + PartialEq;

    fn model_id(&self) -> ModelId;

    /// Container this model was loaded from.
    fn container(&self) -> Self::Container;
}

/// Handle to a resolved element.
pub trait ElementRef: Clone {
    fn element_id(&self) -> ElementId;
}

/// Model and element lookup capabilities the resolver consumes.
///
/// Implementations may block (for instance to load model sections on
/// demand). The resolver treats every call as a single synchronous attempt.
pub trait ModelStore {
    type Model: ModelRef;
    type Element: ElementRef;

    /// Load `model_id` from `container`.
    fn load_model(
        &self,
        container: &<Self::Model as ModelRef>::Container,
        model_id: ModelId,
    ) -> Result<Self::Model, crate::NotFound>;

    /// Find `element_id` in `model`.
    ///
    /// `parent` is the previously resolved element when walking a nested
    /// element path; the store decides what nesting means.
    fn find_element(
        &self,
        model: &Self::Model,
        parent: Option<&Self::Element>,
        element_id: ElementId,
    ) -> Result<Self::Element, crate::NotFound>;
}

// =============================================================================
// RESULTS
// =============================================================================

/// A fully resolved path: the model reached and the element chain, outermost
/// first. Never empty when produced by [`PathResolver::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath<M, E> {
    pub model: M,
    pub elements: Vec<E>,
}

impl<M: ModelRef, E: ElementRef> ResolvedPath<M, E> {
    pub fn new(model: M, elements: Vec<E>) -> Self {
        Self { model, elements }
    }

    /// The innermost element - what the path refers to.
    pub fn tail(&self) -> Option<&E> {
        self.elements.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn model_id(&self) -> ModelId {
        self.model.model_id()
    }

    pub fn element_ids(&self) -> Vec<ElementId> {
        self.elements.iter().map(ElementRef::element_id).collect()
    }
}

/// Everything resolved before the first failure.
#[derive(Debug)]
pub struct PartialResolution<M, E> {
    /// Current model when evaluation stopped.
    pub model: M,

    /// Elements resolved in order before the failure.
    pub elements: Vec<E>,

    /// First failure, if any.
    pub failure: Option<PathError>,
}

impl<M, E> PartialResolution<M, E> {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Home,
    Root,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Phase::Home => "home",
            Phase::Root => "root",
        }
    }
}

/// Evaluates flat paths against a [`ModelStore`].
pub struct PathResolver<'s, S: ModelStore> {
    store: &'s S,
}

impl<'s, S: ModelStore> PathResolver<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Resolve the whole path. Fails on the first lookup that fails and
    /// returns no partial result.
    pub fn evaluate(
        &self,
        path: &FlatPath,
        start: &S::Model,
    ) -> Result<ResolvedPath<S::Model, S::Element>, PathError> {
        let (model, elements) = self.anchor(path, start)?;
        let mut resolved = Vec::with_capacity(elements.len());
        self.walk(&model, elements, usize::MAX, &mut resolved)?;
        debug!(
            model_id = model.model_id(),
            depth = resolved.len(),
            "resolved element path"
        );
        Ok(ResolvedPath::new(model, resolved))
    }

    /// Resolve as far as possible, keeping what succeeded.
    pub fn evaluate_partial(
        &self,
        path: &FlatPath,
        start: &S::Model,
    ) -> PartialResolution<S::Model, S::Element> {
        let mut model = start.clone();
        let mut elements = Vec::new();
        let failure = self
            .anchor_into(path, &mut model)
            .and_then(|ids| self.walk(&model, ids, usize::MAX, &mut elements))
            .err();

        PartialResolution {
            model,
            elements,
            failure,
        }
    }

    /// Resolve only the first element after the marker pairs.
    pub fn evaluate_first(&self, path: &FlatPath, start: &S::Model) -> Result<S::Element, PathError> {
        let (model, elements) = self.anchor(path, start)?;
        let mut resolved = Vec::with_capacity(1);
        self.walk(&model, elements, 1, &mut resolved)?;
        resolved.pop().ok_or(PathError::EmptyPath)
    }

    /// Stop after the model switches and return the model the element path
    /// lives in. No element is looked up.
    pub fn root_model(&self, path: &FlatPath, start: &S::Model) -> Result<S::Model, PathError> {
        let mut model = start.clone();
        self.anchor_into(path, &mut model)?;
        Ok(model)
    }

    /// Push the referenced element, or `None` if the path does not resolve.
    ///
    /// Used for dependency disclosure, where an unresolved reference is
    /// reported rather than treated as an error.
    pub fn disclose(&self, path: &FlatPath, start: &S::Model, out: &mut Vec<Option<S::Element>>) {
        match self.evaluate(path, start) {
            Ok(mut resolved) => out.push(resolved.elements.pop()),
            Err(err) => {
                debug!(error = %err, "disclosing unresolved path");
                out.push(None);
            }
        }
    }

    fn anchor<'p>(
        &self,
        path: &'p FlatPath,
        start: &S::Model,
    ) -> Result<(S::Model, &'p [ElementId]), PathError> {
        let mut model = start.clone();
        let elements = self.anchor_into(path, &mut model)?;
        Ok((model, elements))
    }

    /// Run the home and root phases, updating `model` as each succeeds.
    fn anchor_into<'p>(
        &self,
        path: &'p FlatPath,
        model: &mut S::Model,
    ) -> Result<&'p [ElementId], PathError> {
        if path.is_remap_keys() {
            return Err(PathError::RemapKeys);
        }
        if path.is_empty() {
            return Err(PathError::EmptyPath);
        }

        let layout = path.layout()?;

        if let Some(model_id) = layout.home {
            *model = self.switch_model(model, model_id, Phase::Home)?;
        }

        // Reference attachments are not walked; a prefix stops resolution.
        if !layout.prefix.is_empty() {
            return Err(PathError::Unsupported("reference-attachment prefix"));
        }

        if let Some(model_id) = layout.root {
            *model = self.switch_model(model, model_id, Phase::Root)?;
        }

        Ok(layout.elements)
    }

    fn switch_model(
        &self,
        current: &S::Model,
        model_id: ModelId,
        phase: Phase,
    ) -> Result<S::Model, PathError> {
        trace!(phase = phase.as_str(), from = current.model_id(), to = model_id, "switching model");
        self.store
            .load_model(&current.container(), model_id)
            .map_err(|_| {
                debug!(phase = phase.as_str(), model_id, "model lookup failed");
                PathError::ModelNotFound(model_id)
            })
    }

    /// Resolve up to `limit` elements, each anchored on the one before.
    fn walk(
        &self,
        model: &S::Model,
        ids: &[ElementId],
        limit: usize,
        out: &mut Vec<S::Element>,
    ) -> Result<(), PathError> {
        if ids.is_empty() {
            return Err(PathError::EmptyPath);
        }

        for &element_id in ids.iter().take(limit) {
            if element_id == NONE_ID {
                return Err(PathError::ElementNotFound(NONE_ID));
            }
            let element = self
                .store
                .find_element(model, out.last(), element_id)
                .map_err(|_| {
                    debug!(element_id, depth = out.len(), "element lookup failed");
                    PathError::ElementNotFound(element_id)
                })?;
            trace!(element_id, depth = out.len(), "resolved element");
            out.push(element);
        }
        Ok(())
    }
}

/// First element identifier after the marker pairs, without loading models.
pub fn peek_first_identifier(path: &FlatPath) -> Result<ElementId, PathError> {
    if path.is_empty() {
        return Err(PathError::EmptyPath);
    }
    let layout = path.layout()?;
    layout.elements.first().copied().ok_or(PathError::EmptyPath)
}
