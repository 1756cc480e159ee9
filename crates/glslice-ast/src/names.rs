//! Stable GLSL identifier assignment for syntax-tree symbols.
//!
//! Every symbol gets one identifier per compile, used consistently across
//! all stage outputs. The base is the source name with underscores and
//! non-identifier characters stripped; collisions append a base-64 suffix
//! derived from the symbol's stable identity hash.

use std::collections::{BTreeMap, BTreeSet};

use crate::arena::{Arena, Handle};
use crate::symbol::{Symbol, SymbolKind};

/// Strips underscores and non-identifier characters from a source name.
///
/// A base that would start with a digit is prefixed so the result is
/// always a valid GLSL identifier.
pub fn sanitize(name: &str) -> String {
    let mut base: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if base.is_empty() {
        base.push_str("sym");
    } else if base.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        base.insert(0, 'n');
    }
    base
}

/// FNV-1a hash of a symbol's name and arena index: its stable identity.
pub fn identity_hash(name: &str, index: usize) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in name.bytes().chain((index as u32).to_le_bytes()) {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Encodes a hash as an identifier-safe base-64 string, consuming 6 bits
/// per symbol from low to high until the remaining bits are zero.
///
/// Alphabet entries are single characters except positions 62 and 63,
/// which are the digraphs `qx` and `qz`. The encoding is one-way; it is
/// never decoded.
pub fn base64_suffix(mut hash: u64) -> String {
    fn entry(value: u8) -> &'static str {
        const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        match value {
            0..=61 => &LETTERS[value as usize..value as usize + 1],
            62 => "qx",
            _ => "qz",
        }
    }

    let mut out = String::new();
    loop {
        out.push_str(entry((hash & 0x3f) as u8));
        hash >>= 6;
        if hash == 0 {
            break;
        }
    }
    out
}

/// Assigns collision-free GLSL identifiers to symbols, one per compile.
///
/// Flattened interface fields compose with their receiver: a field of the
/// `result` output record named `color` becomes `result_color`, while a
/// vertex-attribute field keeps its own name (`position`). Role prefixes
/// (`uniform_`, `vert_`, `vert2frag_`) are applied by the emitter on top
/// of these identifiers.
#[derive(Debug, Default)]
pub struct NameTable {
    assigned: BTreeMap<Handle<Symbol>, String>,
    used: BTreeSet<String>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifier for a symbol, assigning one on first use.
    pub fn ident(&mut self, symbols: &Arena<Symbol>, handle: Handle<Symbol>) -> String {
        if let Some(name) = self.assigned.get(&handle) {
            return name.clone();
        }

        let sym = &symbols[handle];
        let base = match sym.parent {
            Some(parent) if symbols[parent].kind == SymbolKind::Result => {
                format!(
                    "{}_{}",
                    sanitize(&symbols[parent].name),
                    sanitize(&sym.name)
                )
            }
            _ => sanitize(&sym.name),
        };

        let chosen = if self.used.contains(&base) {
            let suffixed = format!(
                "{base}{}",
                base64_suffix(identity_hash(&sym.name, handle.index()))
            );
            if self.used.contains(&suffixed) {
                // Hash collision on top of a name collision: fall back to
                // the arena index, which is unique by construction.
                format!("{suffixed}{}", handle.index())
            } else {
                suffixed
            }
        } else {
            base
        };

        self.used.insert(chosen.clone());
        self.assigned.insert(handle, chosen.clone());
        chosen
    }
}
