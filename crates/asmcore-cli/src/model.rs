use anyhow::Result;
use asmcore::ArrayMemory;
use std::path::Path;

/// A raw binary mapped at a load address.
#[derive(Debug, Clone)]
pub struct Image {
    pub base: u32,
    pub bytes: Vec<u8>,
}

impl Image {
    pub fn end(&self) -> u32 {
        self.base.wrapping_add(self.bytes.len() as u32)
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr < self.end()
    }

    /// Reader over `[start, end)`, clipped to the image.
    pub fn memory(&self, start: u32, end: u32) -> ArrayMemory {
        let lo = start.saturating_sub(self.base) as usize;
        let hi = (end.min(self.end()).saturating_sub(self.base) as usize).max(lo);
        let lo = lo.min(self.bytes.len());
        let hi = hi.min(self.bytes.len());
        ArrayMemory::new(self.base + lo as u32, &self.bytes[lo..hi])
    }
}

pub fn load_raw_bin(path: &Path, base: u32, skip: usize, len: Option<usize>) -> Result<Image> {
    let file = std::fs::read(path)?;
    anyhow::ensure!(skip <= file.len(), "--skip exceeds file size");
    let mut payload = &file[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining file size after skip");
        payload = &payload[..lim];
    }
    Ok(Image { base, bytes: payload.to_vec() })
}
