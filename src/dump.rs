//! Diagnostic rendering of a chain, block by block.

use crate::block::BlockHeader;
use crate::codec::{scan, ScanEvent};
use crate::{Identifier, HOME_MODEL_MARKER, ROOT_MODEL_MARKER};
use std::fmt::Write;

pub(crate) fn render(bytes: Option<&[u8]>) -> String {
    let Some(bytes) = bytes else {
        return "empty path (no buffer)\n".to_string();
    };

    let mut out = String::new();
    if bytes.len() == 1 {
        let _ = writeln!(out, "legacy empty chain: header {:#04x}", bytes[0]);
        return out;
    }

    let mut current: Option<BlockHeader> = None;
    let result = scan(bytes, usize::MAX, |event| match event {
        ScanEvent::Block { offset, header } => {
            current = Some(header);
            let _ = writeln!(
                out,
                "block @{}: header {:#04x} count={}{}{}",
                offset,
                header.byte(),
                header.count(),
                if header.is_last() { " last" } else { "" },
                if header.is_remap_keys() { " remap-keys" } else { "" },
            );
        }
        ScanEvent::Id { slot, id } => {
            let small = current.is_some_and(|h| h.is_small(slot));
            let width = if small { "small" } else { "large" };
            let _ = writeln!(out, "  [{}] {:<5} {}", slot, width, symbol(id));
        }
    });

    match result {
        Ok(summary) => {
            let _ = writeln!(out, "{} bytes", summary.len);
        }
        Err(err) => {
            let _ = writeln!(out, "corrupt: {}", err);
        }
    }
    out
}

fn symbol(id: Identifier) -> String {
    match id {
        HOME_MODEL_MARKER => "HOME_MODEL".to_string(),
        ROOT_MODEL_MARKER => "ROOT_MODEL".to_string(),
        _ => id.to_string(),
    }
}
