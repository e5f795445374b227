pub mod addressing;
pub mod assembler;
pub mod bitfield;
pub mod config;
pub mod directive;
pub mod disassembler;
pub mod displacement;
pub mod error;
pub mod insn;
pub mod memory;
pub mod numeric;
pub mod reglist;
pub mod table;
pub mod value;

pub mod isa {
    pub mod ns32k; // NS32032 with optional NS32081
}

pub use assembler::Assembler;
pub use config::{AsmConfig, CpuType, FpuType};
pub use disassembler::Disassembler;
pub use error::{AsmError, ErrorAt, ErrorKind};
pub use insn::{ByteOrder, Insn};
pub use isa::ns32k::Ns32k;
pub use memory::{ArrayMemory, ByteReader, DisMemory};
pub use value::{NoSymbols, SymbolTable, Value};
