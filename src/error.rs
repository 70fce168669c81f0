//! Error types for encoding, decoding, and resolving element paths.
//!
//! Every failure is terminal for the operation that produced it. Retry and
//! fallback policy belongs to the caller.

use crate::{ElementId, ModelId};
use thiserror::Error;

/// Why a byte chain failed integrity validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainDefect {
    /// No bytes at all.
    Empty,

    /// A block header promised more payload than the buffer holds.
    Truncated,

    /// A small-id flag is set on a slot the block does not use.
    UnusedSmallIdSlot { slot: usize, count: usize },

    /// The scan passed the caller's byte bound before seeing the last block.
    ExceedsBound { max: usize },

    /// Bytes remain after the last block of a buffer meant to hold one chain.
    TrailingBytes { extra: usize },
}

impl std::fmt::Display for ChainDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainDefect::Empty => write!(f, "empty buffer"),
            ChainDefect::Truncated => write!(f, "block payload truncated"),
            ChainDefect::UnusedSmallIdSlot { slot, count } => {
                write!(f, "small-id flag on slot {} of a {}-id block", slot, count)
            }
            ChainDefect::ExceedsBound { max } => write!(f, "chain exceeds {} bytes", max),
            ChainDefect::TrailingBytes { extra } => {
                write!(f, "{} trailing bytes after last block", extra)
            }
        }
    }
}

/// Failure of a path operation.
#[derive(Debug, Error)]
pub enum PathError {
    /// Byte chain failed block integrity validation.
    #[error("Corrupt chain at byte {offset}: {defect}")]
    CorruptChain { offset: usize, defect: ChainDefect },

    /// Hex transport string could not be decoded.
    #[error("Malformed hex: {0}")]
    MalformedHex(String),

    /// Model lookup failed during resolution.
    #[error("Model {0} not found")]
    ModelNotFound(ModelId),

    /// Element lookup failed during resolution.
    #[error("Element {0} not found")]
    ElementNotFound(ElementId),

    /// Path holds no identifiers to resolve.
    #[error("Empty path: nothing to resolve")]
    EmptyPath,

    /// Path uses a construct the resolver does not implement.
    #[error("Unsupported path: {0}")]
    Unsupported(&'static str),

    /// Chain decoded but its identifiers break the marker grammar.
    #[error("Malformed path: {0}")]
    MalformedPath(&'static str),

    /// A marker value was supplied where a real identifier belongs.
    #[error("Identifier {0:#x} is reserved as a marker")]
    ReservedIdentifier(u64),

    /// Remap-key chains cannot be resolved as element references.
    #[error("Chain holds remap keys, not element identifiers")]
    RemapKeys,

    /// Underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PathError {
    pub(crate) fn corrupt(offset: usize, defect: ChainDefect) -> Self {
        PathError::CorruptChain { offset, defect }
    }

    /// Check if this error means the stored data itself is damaged.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            PathError::CorruptChain { .. } | PathError::MalformedPath(_)
        )
    }

    /// Check if this error means the referenced item no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PathError::ModelNotFound(_) | PathError::ElementNotFound(_)
        )
    }
}

/// Collaborator lookup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not found")]
pub struct NotFound;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(PathError::corrupt(0, ChainDefect::Empty).is_corruption());
        assert!(PathError::MalformedPath("dangling marker").is_corruption());
        assert!(!PathError::EmptyPath.is_corruption());

        assert!(PathError::ModelNotFound(7).is_not_found());
        assert!(PathError::ElementNotFound(0).is_not_found());
        assert!(!PathError::RemapKeys.is_not_found());
    }

    #[test]
    fn error_display() {
        let err = PathError::corrupt(
            3,
            ChainDefect::UnusedSmallIdSlot { slot: 2, count: 1 },
        );
        let msg = err.to_string();
        assert!(msg.contains("byte 3"));
        assert!(msg.contains("slot 2"));

        let err = PathError::ReservedIdentifier(crate::ROOT_MODEL_MARKER);
        assert!(err.to_string().contains("0xfffffffffffffffe"));
    }
}
