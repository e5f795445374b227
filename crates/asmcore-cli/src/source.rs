use std::collections::HashMap;

use asmcore::value::{is_symbol_char, is_symbol_start};
use asmcore::{AsmConfig, AsmError, Assembler, Insn};
use serde::Serialize;
use tracing::debug;

/// Passes before giving up on label addresses settling.
const MAX_PASSES: usize = 8;

#[derive(Debug, Clone, Serialize)]
pub struct Line {
    pub line: usize,
    pub address: u32,
    pub bytes: Vec<u8>,
    pub source: String,
    /// Fatal error, or an advisory when `warning` is set.
    pub error: Option<AsmError>,
    pub warning: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub lines: Vec<Line>,
    pub symbols: HashMap<String, i64>,
    pub passes: usize,
}

impl Program {
    pub fn errors(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(|l| l.error.is_some() && !l.warning)
    }

    /// Lowest address and a contiguous image, gaps zero-filled.
    pub fn image(&self) -> (u32, Vec<u8>) {
        let Some(lo) = self.lines.iter().filter(|l| !l.bytes.is_empty()).map(|l| l.address).min() else {
            return (0, Vec::new());
        };
        let hi = self
            .lines
            .iter()
            .filter(|l| !l.bytes.is_empty())
            .map(|l| l.address as usize + l.bytes.len())
            .max()
            .unwrap_or(lo as usize);
        let mut out = vec![0u8; hi - lo as usize];
        for l in self.lines.iter().filter(|l| !l.bytes.is_empty()) {
            let off = (l.address - lo) as usize;
            out[off..off + l.bytes.len()].copy_from_slice(&l.bytes);
        }
        (lo, out)
    }
}

/// Splits a leading `name:` off a line; the label is blanked so error
/// offsets still count from the start of the line.
fn split_label(text: &str) -> (Option<&str>, String) {
    let trimmed = text.trim_start();
    let lead = text.len() - trimmed.len();
    if !trimmed.starts_with(is_symbol_start) {
        return (None, text.to_string());
    }
    let len = trimmed.find(|c: char| !is_symbol_char(c)).unwrap_or(trimmed.len());
    if !trimmed[len..].starts_with(':') {
        return (None, text.to_string());
    }
    let blanked = format!("{}{}", " ".repeat(lead + len + 1), &trimmed[len + 1..]);
    (Some(&trimmed[..len]), blanked)
}

/// Assembles `source` from `base`, repeating passes until every label keeps
/// its address.
pub fn assemble<A: Assembler>(asm: &A, source: &str, base: u32, config: &AsmConfig) -> Program {
    let mut symbols: HashMap<String, i64> = HashMap::new();
    let mut lines = Vec::new();
    let mut passes = 0;
    while passes < MAX_PASSES {
        passes += 1;
        let mut cfg = *config;
        let mut pc = base;
        let mut defined = HashMap::new();
        lines.clear();
        for (n, text) in source.lines().enumerate() {
            let (label, body) = split_label(text);
            let mut insn = Insn::new(pc);
            let r = asm.encode(&body, &mut insn, &symbols, &mut cfg);
            if let Some(label) = label {
                defined.insert(label.to_string(), insn.address() as i64);
            }
            let error = insn.error().get();
            lines.push(Line {
                line: n + 1,
                address: insn.address(),
                bytes: insn.bytes().to_vec(),
                source: text.to_string(),
                error,
                warning: error.is_some() && r.is_ok(),
            });
            pc = insn.next_address();
        }
        let stable = defined == symbols;
        debug!(pass = passes, labels = defined.len(), stable, "pass done");
        symbols = defined;
        if stable {
            break;
        }
    }
    Program { lines, symbols, passes }
}
