use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use asmcore::{AsmConfig, AsmError, DisMemory, Disassembler, FpuType, Insn, Ns32k};

mod model;
mod source;
use model::load_raw_bin;

#[derive(Parser, Debug)]
#[command(author, version, about = "NS32000 assembler and disassembler", long_about = None)]
struct Cli {
    /// Enable the NS32081 floating point instructions
    #[arg(long, global = true)]
    fpu: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble a source file into a raw binary
    Asm {
        /// Input assembly file (one instruction or directive per line)
        #[arg(value_name = "SRCFILE")]
        input: PathBuf,
        /// Output binary file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Initial location counter (hex or dec)
        #[arg(long, default_value = "0")]
        base: String,
        /// Listing format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Disassemble a range [start, end) of a raw binary
    Dis {
        /// Input binary path
        #[arg(value_name = "BINFILE")]
        input: PathBuf,
        /// Load address for the binary (hex or dec)
        #[arg(long, default_value = "0")]
        base: String,
        /// Skip N bytes at start of file before loading
        #[arg(long, default_value_t = 0usize)]
        skip: usize,
        /// Limit bytes loaded (default: to EOF after --skip)
        #[arg(long)]
        len: Option<usize>,
        /// Start address (default: load address)
        #[arg(long)]
        start: Option<String>,
        /// End address, exclusive (default: end of image)
        #[arg(long)]
        end: Option<String>,
        /// Show instruction bytes
        #[arg(long)]
        show_bytes: bool,
        /// Lower-case mnemonics and registers
        #[arg(long)]
        lowercase: bool,
        /// Render branch targets relative to the instruction
        #[arg(long)]
        relative: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize)]
struct DisLine {
    address: u32,
    bytes: Vec<u8>,
    text: String,
    error: Option<AsmError>,
}

fn parse_u32(s: &str) -> Result<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Ok(u32::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse::<u32>()?)
    }
}

fn hex_bytes(bytes: &[u8]) -> String {
    let mut s = String::new();
    for b in bytes {
        let _ = write!(s, "{b:02x} ");
    }
    s
}

fn run_asm(input: &Path, output: Option<&Path>, base: u32, format: OutputFormat, config: &AsmConfig) -> Result<()> {
    let text = std::fs::read_to_string(input)?;
    let prog = source::assemble(&Ns32k, &text, base, config);
    info!(lines = prog.lines.len(), passes = prog.passes, "assembled");

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prog)?),
        OutputFormat::Text => {
            for l in &prog.lines {
                println!("{:#010x}: {:<24} {}", l.address, hex_bytes(&l.bytes), l.source);
            }
        }
    }
    for l in &prog.lines {
        if let Some(err) = l.error {
            let what = if l.warning { "warning" } else { "error" };
            eprintln!("{}:{}:{}: {what}: {}", input.display(), l.line, err.at + 1, err.kind);
        }
    }
    let failed = prog.errors().count();
    anyhow::ensure!(failed == 0, "{failed} error(s)");

    if let Some(path) = output {
        let (lo, bytes) = prog.image();
        info!(start = lo, len = bytes.len(), path = %path.display(), "writing image");
        std::fs::write(path, bytes)?;
    }
    Ok(())
}

fn disassemble<M: DisMemory>(mem: &mut M, config: &AsmConfig) -> Vec<DisLine> {
    let mut lines = Vec::new();
    let mut insn = Insn::new(mem.address());
    let mut text = String::new();
    while mem.has_next() {
        let error = Ns32k.decode(mem, &mut insn, &mut text, config).err();
        lines.push(DisLine {
            address: insn.address(),
            bytes: insn.bytes().to_vec(),
            text: text.clone(),
            error,
        });
        if insn.is_empty() {
            break;
        }
    }
    lines
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AsmConfig::default();
    if cli.fpu {
        config.fpu = FpuType::Ns32081;
    }

    match cli.cmd {
        Command::Asm { input, output, base, format } => {
            run_asm(&input, output.as_deref(), parse_u32(&base)?, format, &config)?;
        }
        Command::Dis { input, base, skip, len, start, end, show_bytes, lowercase, relative, format } => {
            let img = load_raw_bin(&input, parse_u32(&base)?, skip, len)?;
            let start = start.as_deref().map(parse_u32).transpose()?.unwrap_or(img.base);
            let end = end.as_deref().map(parse_u32).transpose()?.unwrap_or(img.end());
            anyhow::ensure!(end >= start, "end must be >= start");
            anyhow::ensure!(img.contains(start) || start == end, "start {start:#x} is outside the image");
            config.uppercase = !lowercase;
            config.relative_targets = relative;

            let lines = disassemble(&mut img.memory(start, end), &config);
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&lines)?),
                OutputFormat::Text => {
                    let mut buf = String::new();
                    for l in &lines {
                        let _ = write!(buf, "{:#010x}: ", l.address);
                        if show_bytes {
                            let _ = write!(buf, "{:<24}", hex_bytes(&l.bytes));
                        }
                        match l.error {
                            Some(err) if !err.kind.is_warning() => {
                                let _ = writeln!(buf, "{}  ; {}", l.text, err);
                            }
                            _ => {
                                let _ = writeln!(buf, "{}", l.text);
                            }
                        }
                    }
                    print!("{buf}");
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use asmcore::{ArrayMemory, ErrorKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_hex_and_decimal() {
        assert_eq!(parse_u32("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_u32(" 42 ").unwrap(), 42);
        assert!(parse_u32("0xZZ").is_err());
    }

    #[test]
    fn linear_sweep_stops_at_truncation() {
        let mut mem = ArrayMemory::new(0x100, vec![0xA2, 0x12, 0x08, 0xA2]);
        let lines = disassemble(&mut mem, &AsmConfig::default());
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["NOP", "RET 8", "NOP"]);
        assert_eq!(lines[1].address, 0x101);

        let mut mem = ArrayMemory::new(0, vec![0x12]);
        let lines = disassemble(&mut mem, &AsmConfig::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].error.map(|e| e.kind), Some(ErrorKind::NoMemory));
    }
}
