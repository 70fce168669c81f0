//! Persistent Element Paths
//!
//! This crate defines the compact binary form of a hierarchical element
//! reference - a chain of 64-bit identifiers naming optional model switches
//! followed by a (possibly nested) element path - and resolves that form back
//! into live references against a caller-supplied model store.
//!
//! # Architecture
//!
//! ```text
//! PathBuilder ──► FlatPath ──► codec::encode ──► bytes (persisted)
//! bytes ──► codec::decode ──► FlatPath ──► PathResolver ──► ResolvedPath
//! ```
//!
//! # Flat Path Grammar
//!
//! ```text
//! [ HOME_MODEL_MARKER, homeModelId ]?  prefixId*  [ ROOT_MODEL_MARKER, rootModelId ]?  elementId+
//! ```
//!
//! # Sentinel Constants
//!
//! - `HOME_MODEL_MARKER` / `ROOT_MODEL_MARKER` - the next identifier is a model id
//! - `NONE_ID` (0) - "no element"; resolves to not-found, never corruption

mod block;
mod builder;
pub mod codec;
pub mod config;
mod dump;
mod error;
mod flat;
mod handle;
pub mod memory;
mod resolver;

pub use block::{BlockFlags, BlockHeader};
pub use builder::PathBuilder;
pub use codec::DecodedChain;
pub use config::{ConfigLoader, HexCase, PathConfig};
pub use error::{ChainDefect, NotFound, PathError};
pub use flat::{FlatPath, PathLayout};
pub use handle::{Chain, PersistentPath};
pub use resolver::{
    peek_first_identifier, ElementRef, ModelRef, ModelStore, PartialResolution, PathResolver,
    ResolvedPath,
};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Raw identifier as it appears in a flat path.
pub type Identifier = u64;

/// Identifier of an element within a model.
pub type ElementId = u64;

/// Identifier of a model within a container.
pub type ModelId = u64;

// =============================================================================
// SENTINEL CONSTANTS
// =============================================================================

/// Marker: the next identifier re-anchors resolution to another home model.
///
/// Bit pattern of signed -3.
pub const HOME_MODEL_MARKER: Identifier = 0xFFFF_FFFF_FFFF_FFFD;

/// Marker: the next identifier names the model holding the element path.
///
/// Bit pattern of signed -2.
pub const ROOT_MODEL_MARKER: Identifier = 0xFFFF_FFFF_FFFF_FFFE;

/// Element ID sentinel: no element.
///
/// Valid inside a chain. Resolution reports it as not found.
pub const NONE_ID: ElementId = 0;

/// Maximum identifiers carried by one block.
pub const MAX_IDS_PER_BLOCK: usize = 4;

/// Serialized form of the empty path (single zero header byte).
pub const LEGACY_EMPTY_CHAIN: [u8; 1] = [0x00];

/// Default upper bound on the bytes a stream load accepts for one chain.
pub const DEFAULT_MAX_CHAIN_BYTES: usize = 64 * 1024;

/// Check whether an identifier is one of the reserved markers.
#[inline]
pub fn is_marker(id: Identifier) -> bool {
    id == HOME_MODEL_MARKER || id == ROOT_MODEL_MARKER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_negative_bit_patterns() {
        assert_eq!(HOME_MODEL_MARKER, (-3i64) as u64);
        assert_eq!(ROOT_MODEL_MARKER, (-2i64) as u64);
    }

    #[test]
    fn marker_detection() {
        assert!(is_marker(HOME_MODEL_MARKER));
        assert!(is_marker(ROOT_MODEL_MARKER));
        assert!(!is_marker(NONE_ID));
        assert!(!is_marker(u64::MAX));
    }
}
