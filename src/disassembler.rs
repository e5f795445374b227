use tracing::debug;

use crate::config::AsmConfig;
use crate::error::AsmError;
use crate::insn::Insn;
use crate::memory::DisMemory;

/// One-instruction-at-a-time disassembler.
pub trait Disassembler {
    /// Decodes one instruction from `mem` into `insn`, rendering operands
    /// into `out`. Errors go into `insn`; whatever was rendered before the
    /// error stays in `out`.
    fn decode_insn<M: DisMemory + ?Sized>(&self, mem: &mut M, insn: &mut Insn, out: &mut String, config: &AsmConfig);

    /// Decodes the instruction at the current position of `mem`.
    ///
    /// `insn` is restarted at `mem.address()`. On error the bytes consumed so
    /// far stay in `insn` and the partial rendering stays in `out`.
    fn decode<M: DisMemory + ?Sized>(
        &self,
        mem: &mut M,
        insn: &mut Insn,
        out: &mut String,
        config: &AsmConfig,
    ) -> Result<(), AsmError> {
        *insn = Insn::new(mem.address());
        out.clear();
        self.decode_insn(mem, insn, out, config);
        if let Some(err) = insn.error().get() {
            debug!(address = insn.address(), %err, bytes = ?insn.bytes(), "decode error");
        }
        insn.check()
    }
}
