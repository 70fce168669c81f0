//! IdBlock chain codec.
//!
//! A chain is one or more blocks, each a header byte followed by up to four
//! little-endian identifiers (4 or 8 bytes wide). The last block carries
//! `IS_LAST`; no length is stored anywhere else, so readers find the end of
//! a chain by walking its blocks.
//!
//! A chain of exactly one byte is the legacy encoding of the empty path.

use crate::block::{BlockHeader, LARGE_ID_BYTES, SMALL_ID_BYTES};
use crate::error::{ChainDefect, PathError};
use crate::{Identifier, LEGACY_EMPTY_CHAIN, MAX_IDS_PER_BLOCK};
use std::io::Read;

/// Result of decoding one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedChain {
    /// Identifiers in chain order.
    pub ids: Vec<Identifier>,

    /// First block carried `IS_REMAP_KEYS`.
    pub remap_keys: bool,

    /// Bytes consumed, including all headers.
    pub len: usize,
}

// =============================================================================
// ENCODE
// =============================================================================

/// Encode identifiers as a chain.
///
/// An empty slice produces the single-byte legacy form, never zero bytes.
/// `remap_keys` is written into every block header.
pub fn encode(ids: &[Identifier], remap_keys: bool) -> Vec<u8> {
    if ids.is_empty() {
        return LEGACY_EMPTY_CHAIN.to_vec();
    }

    let mut out = Vec::with_capacity(encoded_len(ids));
    let block_count = ids.len().div_ceil(MAX_IDS_PER_BLOCK);

    for (idx, group) in ids.chunks(MAX_IDS_PER_BLOCK).enumerate() {
        let header = BlockHeader::for_group(group, idx + 1 == block_count, remap_keys);
        out.push(header.byte());

        for (slot, &id) in group.iter().enumerate() {
            if header.is_small(slot) {
                out.extend_from_slice(&(id as u32).to_le_bytes());
            } else {
                out.extend_from_slice(&id.to_le_bytes());
            }
        }
    }

    out
}

/// Exact byte length `encode` will produce for `ids`.
pub fn encoded_len(ids: &[Identifier]) -> usize {
    if ids.is_empty() {
        return LEGACY_EMPTY_CHAIN.len();
    }
    let headers = ids.len().div_ceil(MAX_IDS_PER_BLOCK);
    let payload: usize = ids
        .iter()
        .map(|&id| {
            if crate::block::fits_small(id) {
                SMALL_ID_BYTES
            } else {
                LARGE_ID_BYTES
            }
        })
        .sum();
    headers + payload
}

// =============================================================================
// DECODE
// =============================================================================

/// Decode the chain at the start of `buf`.
///
/// Bytes after the last block are ignored; `DecodedChain::len` says where the
/// chain ended. No size bound applies: anything `encode` produced decodes.
pub fn decode(buf: &[u8]) -> Result<DecodedChain, PathError> {
    decode_bounded(buf, usize::MAX)
}

/// Decode with an explicit upper bound on the chain's byte length.
pub fn decode_bounded(buf: &[u8], max_bytes: usize) -> Result<DecodedChain, PathError> {
    let mut ids = Vec::new();
    let summary = scan(buf, max_bytes, |event| {
        if let ScanEvent::Id { id, .. } = event {
            ids.push(id);
        }
    })?;
    Ok(DecodedChain {
        ids,
        remap_keys: summary.remap_keys,
        len: summary.len,
    })
}

/// Byte length of the chain at the start of `buf`, or 0 if it is corrupt.
///
/// 0 is also the answer for an empty buffer; callers that must tell the two
/// apart should use [`decode_bounded`].
pub fn chain_length(buf: &[u8], max_bytes: usize) -> usize {
    scan(buf, max_bytes, |_| {}).map(|s| s.len).unwrap_or(0)
}

pub(crate) struct ScanSummary {
    pub(crate) len: usize,
    pub(crate) remap_keys: bool,
}

/// What the scanner saw, in byte order.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ScanEvent {
    Block { offset: usize, header: BlockHeader },
    Id { slot: usize, id: Identifier },
}

/// Walk blocks until `IS_LAST`, validating each header.
///
/// The single-byte legacy form yields no events.
pub(crate) fn scan(
    buf: &[u8],
    max_bytes: usize,
    mut visit: impl FnMut(ScanEvent),
) -> Result<ScanSummary, PathError> {
    if buf.is_empty() {
        return Err(PathError::corrupt(0, ChainDefect::Empty));
    }
    if max_bytes == 0 {
        return Err(PathError::corrupt(0, ChainDefect::ExceedsBound { max: 0 }));
    }

    // Legacy single-byte empty path
    if buf.len() == 1 {
        return Ok(ScanSummary {
            len: 1,
            remap_keys: false,
        });
    }

    let first = BlockHeader::from_byte(buf[0]);
    let remap_keys = first.is_remap_keys();
    let mut pos = 0;

    loop {
        let header_at = pos;
        check_span(buf, max_bytes, header_at, pos + 1)?;
        let header = BlockHeader::from_byte(buf[pos]);
        header.validate(header_at)?;
        visit(ScanEvent::Block {
            offset: header_at,
            header,
        });
        pos += 1;

        check_span(buf, max_bytes, header_at, pos + header.payload_len())?;
        for slot in 0..header.count() {
            if header.is_small(slot) {
                let mut raw = [0u8; SMALL_ID_BYTES];
                raw.copy_from_slice(&buf[pos..pos + SMALL_ID_BYTES]);
                visit(ScanEvent::Id {
                    slot,
                    id: u32::from_le_bytes(raw) as Identifier,
                });
                pos += SMALL_ID_BYTES;
            } else {
                let mut raw = [0u8; LARGE_ID_BYTES];
                raw.copy_from_slice(&buf[pos..pos + LARGE_ID_BYTES]);
                visit(ScanEvent::Id {
                    slot,
                    id: u64::from_le_bytes(raw),
                });
                pos += LARGE_ID_BYTES;
            }
        }

        if header.is_last() {
            return Ok(ScanSummary {
                len: pos,
                remap_keys,
            });
        }
    }
}

fn check_span(buf: &[u8], max_bytes: usize, offset: usize, end: usize) -> Result<(), PathError> {
    if end > max_bytes {
        Err(PathError::corrupt(
            offset,
            ChainDefect::ExceedsBound { max: max_bytes },
        ))
    } else if end > buf.len() {
        Err(PathError::corrupt(offset, ChainDefect::Truncated))
    } else {
        Ok(())
    }
}

// =============================================================================
// STREAMING
// =============================================================================

/// Read exactly one chain from `reader` and return its raw bytes.
///
/// Chains may be stored back to back. A header byte followed immediately by
/// end of stream is the legacy empty path.
pub fn read_chain<R: Read + ?Sized>(reader: &mut R, max_bytes: usize) -> Result<Vec<u8>, PathError> {
    let mut out = Vec::new();
    let mut byte = [0u8; 1];

    if read_up_to(reader, &mut byte)? == 0 {
        return Err(PathError::corrupt(0, ChainDefect::Empty));
    }

    loop {
        let header_at = out.len();
        if header_at + 1 > max_bytes {
            return Err(PathError::corrupt(
                header_at,
                ChainDefect::ExceedsBound { max: max_bytes },
            ));
        }
        out.push(byte[0]);
        let header = BlockHeader::from_byte(byte[0]);

        // Never reads more than the bound allows; a lone header still
        // counts as the legacy empty path.
        let payload_len = header.payload_len();
        let room = max_bytes.saturating_sub(out.len());
        let mut payload = vec![0u8; payload_len.min(room)];
        let got = read_up_to(reader, &mut payload)?;
        if header_at == 0 && got == 0 {
            return Ok(out);
        }
        if payload_len > room {
            return Err(PathError::corrupt(
                header_at,
                ChainDefect::ExceedsBound { max: max_bytes },
            ));
        }
        header.validate(header_at)?;
        if got < payload_len {
            return Err(PathError::corrupt(header_at, ChainDefect::Truncated));
        }
        out.extend_from_slice(&payload);

        if header.is_last() {
            return Ok(out);
        }
        if read_up_to(reader, &mut byte)? == 0 {
            return Err(PathError::corrupt(out.len(), ChainDefect::Truncated));
        }
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
fn read_up_to<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HOME_MODEL_MARKER, ROOT_MODEL_MARKER};

    #[test]
    fn empty_path_is_one_byte() {
        let bytes = encode(&[], false);
        assert_eq!(bytes, vec![0x00]);

        let decoded = decode(&bytes).unwrap();
        assert!(decoded.ids.is_empty());
        assert_eq!(decoded.len, 1);
    }

    #[test]
    fn legacy_zero_byte_decodes_to_empty() {
        let decoded = decode(&[0x00]).unwrap();
        assert!(decoded.ids.is_empty());
        assert!(!decoded.remap_keys);
    }

    #[test]
    fn single_small_id_layout() {
        let bytes = encode(&[42], false);
        // count 1, last, slot 0 small
        assert_eq!(bytes, vec![0b0001_0101, 42, 0, 0, 0]);
    }

    #[test]
    fn small_threshold_round_trip() {
        let bytes = encode(&[0xFFFF_FFFF, 0x1_0000_0000], false);
        let header = BlockHeader::from_byte(bytes[0]);
        assert!(header.is_small(0));
        assert!(!header.is_small(1));
        assert_eq!(bytes.len(), 1 + 4 + 8);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.ids, vec![0xFFFF_FFFF, 0x1_0000_0000]);
    }

    #[test]
    fn markers_encode_large() {
        let ids = [HOME_MODEL_MARKER, 7, ROOT_MODEL_MARKER, 9, 100];
        let bytes = encode(&ids, false);

        // two blocks: 4 ids then 1 id
        let first = BlockHeader::from_byte(bytes[0]);
        assert_eq!(first.count(), 4);
        assert!(!first.is_last());
        assert!(!first.is_small(0));
        assert!(first.is_small(1));

        assert_eq!(decode(&bytes).unwrap().ids, ids.to_vec());
    }

    #[test]
    fn remap_flag_on_every_block() {
        let bytes = encode(&[1, 2, 3, 4, 5], true);
        assert!(BlockHeader::from_byte(bytes[0]).is_remap_keys());
        let second_at = 1 + 4 * 4;
        assert!(BlockHeader::from_byte(bytes[second_at]).is_remap_keys());
        assert!(decode(&bytes).unwrap().remap_keys);
    }

    #[test]
    fn unused_slot_small_flag_is_corrupt() {
        let mut bytes = encode(&[5], false);
        bytes[0] |= 1 << 5;

        let result = decode(&bytes);
        assert!(matches!(
            result,
            Err(PathError::CorruptChain {
                offset: 0,
                defect: ChainDefect::UnusedSmallIdSlot { slot: 1, count: 1 },
            })
        ));
        assert_eq!(chain_length(&bytes, usize::MAX), 0);
    }

    #[test]
    fn truncated_payload_is_corrupt() {
        let bytes = encode(&[1, 2, 3], false);
        let result = decode(&bytes[..bytes.len() - 1]);
        assert!(matches!(
            result,
            Err(PathError::CorruptChain {
                defect: ChainDefect::Truncated,
                ..
            })
        ));
    }

    #[test]
    fn missing_last_block_is_corrupt() {
        // A full non-last block with nothing after it
        let mut bytes = encode(&[1, 2, 3, 4], false);
        bytes[0] &= !crate::BlockFlags::IS_LAST.bits();
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn empty_buffer_is_corrupt() {
        assert!(matches!(
            decode(&[]),
            Err(PathError::CorruptChain {
                defect: ChainDefect::Empty,
                ..
            })
        ));
        assert_eq!(chain_length(&[], 100), 0);
    }

    #[test]
    fn bound_is_enforced() {
        let bytes = encode(&[1, 2, 3, 4, 5, 6], false);
        let result = decode_bounded(&bytes, bytes.len() - 1);
        assert!(matches!(
            result,
            Err(PathError::CorruptChain {
                defect: ChainDefect::ExceedsBound { .. },
                ..
            })
        ));
        assert_eq!(chain_length(&bytes, bytes.len()), bytes.len());
    }

    #[test]
    fn chain_length_ignores_trailing_bytes() {
        let mut bytes = encode(&[10, 20], false);
        let len = bytes.len();
        bytes.extend_from_slice(&[0xAB, 0xCD]);
        assert_eq!(chain_length(&bytes, usize::MAX), len);
        assert_eq!(decode(&bytes).unwrap().len, len);
    }

    #[test]
    fn read_chain_back_to_back() {
        let first = encode(&[1, 2, 3, 4, 5], false);
        let second = encode(&[u64::MAX - 10], false);
        let mut stream = first.clone();
        stream.extend_from_slice(&second);

        let mut reader = stream.as_slice();
        assert_eq!(read_chain(&mut reader, usize::MAX).unwrap(), first);
        assert_eq!(read_chain(&mut reader, usize::MAX).unwrap(), second);
        assert!(reader.is_empty());
    }

    #[test]
    fn read_chain_legacy_at_end_of_stream() {
        let mut reader: &[u8] = &[0x00];
        assert_eq!(read_chain(&mut reader, 16).unwrap(), vec![0x00]);

        // The smallest bound a config accepts still admits it
        let mut reader: &[u8] = &[0x00];
        assert_eq!(read_chain(&mut reader, 1).unwrap(), vec![0x00]);
    }

    #[test]
    fn read_chain_bound_applies_to_real_blocks() {
        let bytes = encode(&[1, 2, 3, 4, 5], false);
        let mut reader = bytes.as_slice();
        assert!(matches!(
            read_chain(&mut reader, 8),
            Err(PathError::CorruptChain {
                offset: 0,
                defect: ChainDefect::ExceedsBound { max: 8 },
            })
        ));
    }

    #[test]
    fn large_chain_decodes_without_bound() {
        let ids: Vec<Identifier> = (0..8000).map(|i| (1u64 << 40) + i).collect();
        let bytes = encode(&ids, false);
        assert!(bytes.len() > 64 * 1024);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.ids, ids);
        assert_eq!(decoded.len, bytes.len());
        assert_eq!(read_chain(&mut bytes.as_slice(), usize::MAX).unwrap(), bytes);
    }

    #[test]
    fn read_chain_empty_stream_is_corrupt() {
        let mut reader: &[u8] = &[];
        assert!(matches!(
            read_chain(&mut reader, 16),
            Err(PathError::CorruptChain {
                defect: ChainDefect::Empty,
                ..
            })
        ));
    }

    #[test]
    fn read_chain_truncated_is_corrupt() {
        let bytes = encode(&[1, 2, 3, 4, 5], false);
        let mut reader = &bytes[..bytes.len() - 2];
        assert!(read_chain(&mut reader, usize::MAX).is_err());
    }

    #[test]
    fn encoded_len_matches_encode() {
        for ids in [
            vec![],
            vec![0],
            vec![1, 2, 3, 4],
            vec![u64::MAX, 1, u64::MAX, 1, 1],
        ] {
            assert_eq!(encoded_len(&ids), encode(&ids, false).len());
        }
    }
}
