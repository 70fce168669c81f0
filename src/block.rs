//! IdBlock header layout.
//!
//! ```text
//! bit  7   6   5   4   3       2      1 0
//!     S3  S2  S1  S0  REMAP   LAST   COUNT
//! ```
//!
//! `COUNT` holds `count mod 4`, so `0` means four identifiers. `Sn` marks
//! slot `n` as a small (4-byte) identifier.

use crate::error::{ChainDefect, PathError};
use crate::{Identifier, MAX_IDS_PER_BLOCK};
use bitflags::bitflags;

bitflags! {
    /// Raw flag bits of a block header byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlockFlags: u8 {
        /// Identifier count, modulo 4.
        const COUNT = 0b0000_0011;

        /// No further blocks follow.
        const IS_LAST = 1 << 2;

        /// Chain holds remap keys. Only read from the first block.
        const IS_REMAP_KEYS = 1 << 3;

        const SMALL_ID_0 = 1 << 4;
        const SMALL_ID_1 = 1 << 5;
        const SMALL_ID_2 = 1 << 6;
        const SMALL_ID_3 = 1 << 7;
    }
}

/// Width in bytes of a small identifier slot.
pub(crate) const SMALL_ID_BYTES: usize = 4;

/// Width in bytes of a full identifier slot.
pub(crate) const LARGE_ID_BYTES: usize = 8;

/// One decoded block header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader(BlockFlags);

impl BlockHeader {
    /// Interpret a raw header byte. Does not validate.
    #[inline]
    pub fn from_byte(byte: u8) -> Self {
        Self(BlockFlags::from_bits_retain(byte))
    }

    /// Build the header for one group of 1-4 identifiers.
    pub fn for_group(ids: &[Identifier], is_last: bool, remap_keys: bool) -> Self {
        debug_assert!(!ids.is_empty() && ids.len() <= MAX_IDS_PER_BLOCK);

        let mut flags = BlockFlags::from_bits_retain((ids.len() % MAX_IDS_PER_BLOCK) as u8);
        flags.set(BlockFlags::IS_LAST, is_last);
        flags.set(BlockFlags::IS_REMAP_KEYS, remap_keys);
        for (slot, &id) in ids.iter().enumerate() {
            if fits_small(id) {
                flags.insert(small_flag(slot));
            }
        }
        Self(flags)
    }

    #[inline]
    pub fn byte(&self) -> u8 {
        self.0.bits()
    }

    #[inline]
    pub fn flags(&self) -> BlockFlags {
        self.0
    }

    /// Number of identifiers in this block (1-4).
    #[inline]
    pub fn count(&self) -> usize {
        match (self.0 & BlockFlags::COUNT).bits() as usize {
            0 => MAX_IDS_PER_BLOCK,
            n => n,
        }
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.0.contains(BlockFlags::IS_LAST)
    }

    #[inline]
    pub fn is_remap_keys(&self) -> bool {
        self.0.contains(BlockFlags::IS_REMAP_KEYS)
    }

    /// Check whether `slot` is stored in 4 bytes.
    #[inline]
    pub fn is_small(&self, slot: usize) -> bool {
        slot < MAX_IDS_PER_BLOCK && self.0.contains(small_flag(slot))
    }

    /// Width in bytes of the identifier in `slot`.
    #[inline]
    pub fn slot_width(&self, slot: usize) -> usize {
        if self.is_small(slot) {
            SMALL_ID_BYTES
        } else {
            LARGE_ID_BYTES
        }
    }

    /// Payload bytes that follow this header.
    pub fn payload_len(&self) -> usize {
        (0..self.count()).map(|slot| self.slot_width(slot)).sum()
    }

    /// Enforce the header invariants. `offset` locates the header for errors.
    pub fn validate(&self, offset: usize) -> Result<(), PathError> {
        let count = self.count();
        for slot in count..MAX_IDS_PER_BLOCK {
            if self.is_small(slot) {
                return Err(PathError::corrupt(
                    offset,
                    ChainDefect::UnusedSmallIdSlot { slot, count },
                ));
            }
        }
        Ok(())
    }
}

/// True when `id` has no bits set above bit 31.
#[inline]
pub(crate) fn fits_small(id: Identifier) -> bool {
    id <= u32::MAX as u64
}

#[inline]
fn small_flag(slot: usize) -> BlockFlags {
    BlockFlags::from_bits_retain(BlockFlags::SMALL_ID_0.bits() << slot)
}
