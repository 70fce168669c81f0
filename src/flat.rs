//! Flat path: the decoded identifier sequence and its marker grammar.

use crate::error::PathError;
use crate::{codec, is_marker, ElementId, Identifier, ModelId, HOME_MODEL_MARKER, ROOT_MODEL_MARKER};

/// Decoded, ordered identifiers of one persistent path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FlatPath {
    ids: Vec<Identifier>,
    remap_keys: bool,
}

/// A flat path split into its grammar sections.
///
/// ```text
/// [ HOME, home ]?  prefix*  [ ROOT, root ]?  elements+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathLayout<'a> {
    /// Model to re-anchor to before anything else.
    pub home: Option<ModelId>,

    /// Reference-attachment chain leading to the root model's container.
    pub prefix: &'a [Identifier],

    /// Model holding the element path.
    pub root: Option<ModelId>,

    /// Nested element path, outermost first.
    pub elements: &'a [ElementId],
}

impl FlatPath {
    /// Direct element-reference identifiers.
    pub fn new(ids: Vec<Identifier>) -> Self {
        Self {
            ids,
            remap_keys: false,
        }
    }

    /// Identifiers to be read as remap keys.
    pub fn from_remap_keys(keys: Vec<Identifier>) -> Self {
        Self {
            ids: keys,
            remap_keys: true,
        }
    }

    pub(crate) fn from_decoded(decoded: codec::DecodedChain) -> Self {
        Self {
            ids: decoded.ids,
            remap_keys: decoded.remap_keys,
        }
    }

    #[inline]
    pub fn ids(&self) -> &[Identifier] {
        &self.ids
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn is_remap_keys(&self) -> bool {
        self.remap_keys
    }

    pub fn into_ids(self) -> Vec<Identifier> {
        self.ids
    }

    /// Encode as an IdBlock chain.
    pub fn encode(&self) -> Vec<u8> {
        codec::encode(&self.ids, self.remap_keys)
    }

    /// Split into home / prefix / root / elements.
    ///
    /// Marker pairs are optional. The element section may come back empty;
    /// callers that walk elements decide whether that is an error.
    pub fn layout(&self) -> Result<PathLayout<'_>, PathError> {
        let mut rest = self.ids.as_slice();

        let home = if rest.first() == Some(&HOME_MODEL_MARKER) {
            let model_id = marker_operand(rest, 0)?;
            rest = &rest[2..];
            Some(model_id)
        } else {
            None
        };

        if rest.contains(&HOME_MODEL_MARKER) {
            return Err(PathError::MalformedPath(
                "home model marker after start of path",
            ));
        }

        let (prefix, root, elements) = match rest.iter().position(|&id| id == ROOT_MODEL_MARKER) {
            Some(at) => {
                let model_id = marker_operand(rest, at)?;
                let elements = &rest[at + 2..];
                if elements.contains(&ROOT_MODEL_MARKER) {
                    return Err(PathError::MalformedPath("repeated root model marker"));
                }
                (&rest[..at], Some(model_id), elements)
            }
            None => (&rest[..0], None, rest),
        };

        Ok(PathLayout {
            home,
            prefix,
            root,
            elements,
        })
    }
}

fn marker_operand(ids: &[Identifier], marker_at: usize) -> Result<ModelId, PathError> {
    match ids.get(marker_at + 1) {
        None => Err(PathError::MalformedPath("marker without model id")),
        Some(&id) if is_marker(id) => Err(PathError::MalformedPath("marker used as model id")),
        Some(&id) => Ok(id),
    }
}

impl From<Vec<Identifier>> for FlatPath {
    fn from(ids: Vec<Identifier>) -> Self {
        Self::new(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_element_path() {
        let path = FlatPath::new(vec![5, 6, 7]);
        let layout = path.layout().unwrap();
        assert_eq!(layout.home, None);
        assert!(layout.prefix.is_empty());
        assert_eq!(layout.root, None);
        assert_eq!(layout.elements, &[5, 6, 7]);
    }

    #[test]
    fn full_layout() {
        let path = FlatPath::new(vec![HOME_MODEL_MARKER, 7, 11, 12, ROOT_MODEL_MARKER, 9, 100, 101]);
        let layout = path.layout().unwrap();
        assert_eq!(layout.home, Some(7));
        assert_eq!(layout.prefix, &[11, 12]);
        assert_eq!(layout.root, Some(9));
        assert_eq!(layout.elements, &[100, 101]);
    }

    #[test]
    fn markers_only_leaves_elements_empty() {
        let path = FlatPath::new(vec![ROOT_MODEL_MARKER, 9]);
        let layout = path.layout().unwrap();
        assert_eq!(layout.root, Some(9));
        assert!(layout.elements.is_empty());
    }

    #[test]
    fn dangling_marker_is_malformed() {
        let path = FlatPath::new(vec![HOME_MODEL_MARKER]);
        assert!(matches!(path.layout(), Err(PathError::MalformedPath(_))));

        let path = FlatPath::new(vec![1, ROOT_MODEL_MARKER]);
        assert!(matches!(path.layout(), Err(PathError::MalformedPath(_))));
    }

    #[test]
    fn late_home_marker_is_malformed() {
        let path = FlatPath::new(vec![1, HOME_MODEL_MARKER, 7, 2]);
        assert!(matches!(path.layout(), Err(PathError::MalformedPath(_))));
    }

    #[test]
    fn marker_as_model_id_is_malformed() {
        let path = FlatPath::new(vec![HOME_MODEL_MARKER, ROOT_MODEL_MARKER, 9, 1]);
        assert!(matches!(path.layout(), Err(PathError::MalformedPath(_))));
    }

    #[test]
    fn repeated_root_marker_is_malformed() {
        let path = FlatPath::new(vec![ROOT_MODEL_MARKER, 9, 1, ROOT_MODEL_MARKER, 3, 4]);
        assert!(matches!(path.layout(), Err(PathError::MalformedPath(_))));
    }
}
