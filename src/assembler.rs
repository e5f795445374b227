use tracing::debug;

use crate::config::AsmConfig;
use crate::directive::{self, Directive};
use crate::error::{AsmError, ErrorKind};
use crate::insn::{ByteOrder, Insn};
use crate::value::{EvalContext, Scanner, SymbolTable};

/// Line-at-a-time assembler.
///
/// Architectures supply [`encode_insn`](Assembler::encode_insn); the shared
/// directives and the error contract live in [`encode`](Assembler::encode).
pub trait Assembler {
    /// Byte order of data directives.
    fn data_order(&self) -> ByteOrder;

    /// Encodes one instruction. `scan` sits just past the mnemonic; errors go
    /// into `insn`.
    fn encode_insn(
        &self,
        name: &str,
        name_at: usize,
        scan: &mut Scanner<'_>,
        ctx: &EvalContext<'_>,
        insn: &mut Insn,
        config: &AsmConfig,
    );

    /// Encodes `line` into `insn`, whose address is the location counter.
    ///
    /// Bytes emitted before an error stay in `insn`, so the caller advances
    /// the location by `insn.len()` whether or not this fails. Advisory
    /// errors stay readable from `insn` but do not fail the call.
    fn encode(
        &self,
        line: &str,
        insn: &mut Insn,
        symbols: &dyn SymbolTable,
        config: &mut AsmConfig,
    ) -> Result<(), AsmError> {
        let mut scan = Scanner::new(line);
        if scan.at_end() {
            return Ok(());
        }
        let name_at = scan.skip_spaces().pos();
        let Some(name) = scan.symbol() else {
            insn.set_error(name_at, ErrorKind::UnknownInstruction);
            return insn.check();
        };
        let ctx = EvalContext {
            symbols,
            location: insn.address(),
            radix: config.radix,
        };
        match Directive::lookup(name) {
            Some(dir) => {
                let r = directive::apply(dir, &mut scan, &ctx, insn, config, self.data_order());
                match r {
                    Err((kind, at)) => {
                        insn.set_error(at, kind);
                    }
                    Ok(()) if !scan.at_end() => {
                        let at = scan.skip_spaces().pos();
                        insn.set_error(at, ErrorKind::GarbageAtEnd);
                    }
                    Ok(()) => {}
                }
            }
            None => self.encode_insn(name, name_at, &mut scan, &ctx, insn, config),
        }
        if let Some(err) = insn.error().get() {
            debug!(line, %err, len = insn.len(), "encode error");
        }
        insn.check()
    }
}
