//! Persistent handle owning one encoded chain.

use crate::codec;
use crate::config::{HexCase, PathConfig};
use crate::error::{ChainDefect, PathError};
use crate::flat::FlatPath;
use crate::resolver::{ModelStore, PathResolver, ResolvedPath};
use crate::{ElementId, Identifier, PathBuilder, LEGACY_EMPTY_CHAIN};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::io::{Read, Write};
use tracing::warn;

/// An element path in its persisted form.
///
/// Equality is byte-for-byte over the owned chain. Two handles that resolve
/// to the same element can still differ, for example when one carries a
/// redundant home-model pair. Use [`PersistentPath::same_flat_path`] or
/// [`PersistentPath::semantically_eq`] for looser comparisons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum PersistentPath {
    /// No buffer owned.
    #[default]
    Empty,

    /// A validated chain. May be the one-byte legacy empty form.
    Encoded(Chain),
}

/// Owned chain bytes. Only built from encoder output or validated input, so
/// it is never zero-length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chain(Vec<u8>);

impl Chain {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True for the legacy one-byte empty chain.
    #[inline]
    pub fn is_legacy_empty(&self) -> bool {
        self.0.len() == LEGACY_EMPTY_CHAIN.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl PersistentPath {
    /// Encode a flat path. An empty flat path gives `Empty`.
    pub fn from_flat_path(path: &FlatPath) -> Self {
        if path.is_empty() {
            PersistentPath::Empty
        } else {
            PersistentPath::Encoded(Chain(path.encode()))
        }
    }

    /// Chain whose identifiers are remap keys rather than element ids.
    pub fn from_remap_keys(keys: &[Identifier]) -> Self {
        Self::from_flat_path(&FlatPath::from_remap_keys(keys.to_vec()))
    }

    /// Take ownership of a stored chain after validating it.
    ///
    /// `bytes` must hold exactly one chain.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PathError> {
        let decoded = codec::decode(bytes)?;
        if decoded.len != bytes.len() {
            return Err(PathError::corrupt(
                decoded.len,
                ChainDefect::TrailingBytes {
                    extra: bytes.len() - decoded.len,
                },
            ));
        }
        Ok(PersistentPath::Encoded(Chain(bytes.to_vec())))
    }

    /// True for `Empty` and for the legacy one-byte chain.
    pub fn is_empty(&self) -> bool {
        match self {
            PersistentPath::Empty => true,
            PersistentPath::Encoded(chain) => chain.is_legacy_empty(),
        }
    }

    /// Owned chain bytes, if any.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PersistentPath::Empty => None,
            PersistentPath::Encoded(chain) => Some(chain.as_bytes()),
        }
    }

    pub fn is_remap_keys(&self) -> bool {
        match self.flat_path() {
            Ok(path) => path.is_remap_keys(),
            Err(_) => false,
        }
    }

    /// Decode the owned chain.
    pub fn flat_path(&self) -> Result<FlatPath, PathError> {
        match self {
            PersistentPath::Empty => Ok(FlatPath::default()),
            PersistentPath::Encoded(chain) => {
                Ok(FlatPath::from_decoded(codec::decode(chain.as_bytes())?))
            }
        }
    }

    // =========================================================================
    // STREAMS
    // =========================================================================

    /// Write the chain. `Empty` writes the legacy one-byte form.
    pub fn store<W: Write + ?Sized>(&self, sink: &mut W) -> Result<(), PathError> {
        let bytes = self.as_bytes().unwrap_or(&LEGACY_EMPTY_CHAIN[..]);
        sink.write_all(bytes)?;
        Ok(())
    }

    /// Read exactly one chain, leaving the stream positioned after it.
    pub fn load<R: Read + ?Sized>(source: &mut R) -> Result<Self, PathError> {
        Self::load_with(source, &PathConfig::default())
    }

    pub fn load_with<R: Read + ?Sized>(source: &mut R, config: &PathConfig) -> Result<Self, PathError> {
        match codec::read_chain(source, config.max_chain_bytes) {
            Ok(bytes) => Ok(PersistentPath::Encoded(Chain(bytes))),
            Err(err) => {
                warn!(error = %err, "failed to load persistent path");
                Err(err)
            }
        }
    }

    // =========================================================================
    // HEX TRANSPORT
    // =========================================================================

    /// Lower-case hex, two digits per byte.
    pub fn to_hex(&self) -> String {
        self.to_hex_with(HexCase::Lower)
    }

    /// Hex in the digit case `config` asks for.
    pub fn to_hex_for(&self, config: &PathConfig) -> String {
        self.to_hex_with(config.hex_case)
    }

    pub fn to_hex_with(&self, case: HexCase) -> String {
        let bytes = self.as_bytes().unwrap_or(&LEGACY_EMPTY_CHAIN[..]);
        match case {
            HexCase::Lower => hex::encode(bytes),
            HexCase::Upper => hex::encode_upper(bytes),
        }
    }

    /// Parse a hex transport string. Either digit case is accepted; the
    /// empty string means `Empty`.
    pub fn from_hex(text: &str) -> Result<Self, PathError> {
        if text.is_empty() {
            return Ok(PersistentPath::Empty);
        }
        let bytes = hex::decode(text).map_err(|e| PathError::MalformedHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Human-readable block listing.
    pub fn dump(&self) -> String {
        crate::dump::render(self.as_bytes())
    }

    // =========================================================================
    // RESOLUTION
    // =========================================================================

    /// Decode and fully resolve against `start`.
    pub fn evaluate<S: ModelStore>(
        &self,
        resolver: &PathResolver<'_, S>,
        start: &S::Model,
    ) -> Result<ResolvedPath<S::Model, S::Element>, PathError> {
        if self.is_empty() {
            return Err(PathError::EmptyPath);
        }
        resolver.evaluate(&self.flat_path()?, start)
    }

    /// Compare decoded identifier sequences instead of raw bytes.
    pub fn same_flat_path(&self, other: &PersistentPath) -> Result<bool, PathError> {
        Ok(self.flat_path()? == other.flat_path()?)
    }

    /// True when both paths decode identically, or both resolve to the same
    /// model and element chain from `start`.
    pub fn semantically_eq<S: ModelStore>(
        &self,
        other: &PersistentPath,
        resolver: &PathResolver<'_, S>,
        start: &S::Model,
    ) -> Result<bool, PathError> {
        if self.same_flat_path(other)? {
            return Ok(true);
        }
        let lhs = self.evaluate(resolver, start)?;
        let rhs = other.evaluate(resolver, start)?;
        Ok(lhs.model_id() == rhs.model_id() && lhs.element_ids() == rhs.element_ids())
    }

    // =========================================================================
    // REMAPPING
    // =========================================================================

    /// Substitute element identifiers, keeping model switches.
    ///
    /// Prefix and element identifiers pass through `remap`; marker pairs are
    /// copied unchanged. A remap-key chain comes back as a direct chain.
    pub fn remap_elements(
        &self,
        mut remap: impl FnMut(ElementId) -> ElementId,
    ) -> Result<Self, PathError> {
        if self.is_empty() {
            return Ok(self.clone());
        }

        let path = self.flat_path()?;
        let layout = path.layout()?;

        let mut builder = PathBuilder::new()
            .prefix(layout.prefix.iter().map(|&id| remap(id)))
            .elements(layout.elements.iter().map(|&id| remap(id)));
        if let Some(home) = layout.home {
            builder = builder.home_model(home);
        }
        if let Some(root) = layout.root {
            builder = builder.root_model(root);
        }
        builder.build()
    }

    /// Number of identifiers that are neither markers nor model ids.
    pub fn element_count(&self) -> Result<usize, PathError> {
        let path = self.flat_path()?;
        let layout = path.layout()?;
        Ok(layout.prefix.len() + layout.elements.len())
    }
}

impl std::fmt::Display for PersistentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for PersistentPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for PersistentPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PersistentPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        PersistentPath::from_hex(&text).map_err(serde::de::Error::custom)
    }
}
