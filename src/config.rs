use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuType {
    Ns32032,
}

impl CpuType {
    pub fn parse(name: &str) -> Result<Self, ErrorKind> {
        // the 32016/32008 share the 32032 instruction set
        match name.to_ascii_uppercase().as_str() {
            "NS32032" | "32032" | "NS32016" | "32016" | "NS32008" | "32008" => Ok(CpuType::Ns32032),
            _ => Err(ErrorKind::UnsupportedCpu),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CpuType::Ns32032 => "NS32032",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FpuType {
    None,
    Ns32081,
}

/// Caller-owned settings threaded through every encode/decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsmConfig {
    pub cpu: CpuType,
    pub fpu: FpuType,
    /// Radix of bare numeric literals (10 or 16).
    pub radix: u32,
    /// Upper-case mnemonics and registers in disassembly.
    pub uppercase: bool,
    /// Render branch targets as `*+n` instead of absolute addresses.
    pub relative_targets: bool,
}

impl Default for AsmConfig {
    fn default() -> Self {
        Self {
            cpu: CpuType::Ns32032,
            fpu: FpuType::None,
            radix: 10,
            uppercase: true,
            relative_targets: false,
        }
    }
}

fn parse_switch(value: &str) -> Result<bool, ErrorKind> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(ErrorKind::IllegalConstant),
    }
}

impl AsmConfig {
    /// Applies one `OPTION name, value` pair.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), ErrorKind> {
        match name.to_ascii_lowercase().as_str() {
            "fpu" => {
                self.fpu = match value.to_ascii_lowercase().as_str() {
                    "ns32081" | "on" => FpuType::Ns32081,
                    "none" | "off" => FpuType::None,
                    _ => return Err(ErrorKind::IllegalConstant),
                }
            }
            "radix" => {
                self.radix = match value {
                    "10" => 10,
                    "16" => 16,
                    _ => return Err(ErrorKind::IllegalConstant),
                }
            }
            "uppercase" => self.uppercase = parse_switch(value)?,
            "relative" => self.relative_targets = parse_switch(value)?,
            _ => return Err(ErrorKind::UnknownOption),
        }
        Ok(())
    }

    pub fn set_cpu(&mut self, name: &str) -> Result<(), ErrorKind> {
        self.cpu = CpuType::parse(name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_update_config() {
        let mut cfg = AsmConfig::default();
        cfg.set_option("FPU", "on").unwrap();
        assert_eq!(cfg.fpu, FpuType::Ns32081);
        cfg.set_option("radix", "16").unwrap();
        assert_eq!(cfg.radix, 16);
        assert_eq!(cfg.set_option("radix", "8"), Err(ErrorKind::IllegalConstant));
        assert_eq!(cfg.set_option("listing", "on"), Err(ErrorKind::UnknownOption));
    }

    #[test]
    fn unknown_cpu_is_rejected() {
        let mut cfg = AsmConfig::default();
        assert_eq!(cfg.set_cpu("68000"), Err(ErrorKind::UnsupportedCpu));
        assert!(cfg.set_cpu("ns32016").is_ok());
    }
}
