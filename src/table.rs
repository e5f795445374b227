//! Static instruction tables and the two searches over them.
//!
//! An [`Entry`] carries fixed opcode bits, a packed flags word owned by the
//! architecture and a mnemonic. Entries live in [`Page`]s keyed by an
//! instruction-stream prefix; a [`CpuVariant`] is an ordered list of pages.
//! Assembly searches by name and operand shape, disassembly by opcode bits.

use std::cmp::Ordering;
use std::sync::OnceLock;

use tracing::trace;

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub opcode: u16,
    pub flags: u32,
    pub name: &'static str,
}

impl Entry {
    pub const fn new(opcode: u16, flags: u32, name: &'static str) -> Self {
        Self { opcode, flags, name }
    }
}

#[derive(Debug)]
pub struct Page {
    pub prefix: &'static [u8],
    pub entries: &'static [Entry],
    index: OnceLock<Vec<u16>>,
}

impl Page {
    pub const fn new(prefix: &'static [u8], entries: &'static [Entry]) -> Self {
        Self {
            prefix,
            entries,
            index: OnceLock::new(),
        }
    }

    /// Entry positions sorted by name; equal names keep declaration order.
    fn index(&self) -> &[u16] {
        self.index.get_or_init(|| {
            let mut idx: Vec<u16> = (0..self.entries.len() as u16).collect();
            idx.sort_by(|&a, &b| cmp_name(self.entries[a as usize].name, self.entries[b as usize].name));
            idx
        })
    }

    /// Entries named `name`, ignoring case, in declaration order.
    pub fn by_name<'p>(&'p self, name: &'p str) -> impl Iterator<Item = &'static Entry> + 'p {
        let idx = self.index();
        let entries = self.entries;
        let start = idx.partition_point(|&i| cmp_name(entries[i as usize].name, name) == Ordering::Less);
        idx[start..]
            .iter()
            .map(move |&i| &entries[i as usize])
            .take_while(move |e| cmp_name(e.name, name) == Ordering::Equal)
    }
}

fn cmp_name(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_uppercase())
        .cmp(b.bytes().map(|c| c.to_ascii_uppercase()))
}

#[derive(Debug)]
pub struct CpuVariant {
    pub name: &'static str,
    pub pages: &'static [&'static Page],
}

/// The per-architecture half of both searches.
pub trait Matcher {
    type Operands: ?Sized;

    /// True when the parsed operands fit the operand shapes of `entry`.
    fn accept(&self, operands: &Self::Operands, page: &Page, entry: &Entry) -> bool;

    /// True when `opcode` read from the stream selects `entry`.
    fn matches(&self, opcode: u16, page: &Page, entry: &Entry) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct Found {
    pub page: &'static Page,
    pub entry: &'static Entry,
}

impl CpuVariant {
    pub fn has_name(&self, name: &str) -> bool {
        self.pages.iter().any(|p| p.by_name(name).next().is_some())
    }

    /// First entry, across pages in order, whose name matches and whose
    /// operand shapes `matcher` accepts.
    pub fn search_by_name<M: Matcher>(
        &self,
        name: &str,
        operands: &M::Operands,
        matcher: &M,
    ) -> Result<Found, ErrorKind> {
        let mut named = false;
        for &page in self.pages {
            for entry in page.by_name(name) {
                named = true;
                if matcher.accept(operands, page, entry) {
                    trace!(name, opcode = entry.opcode, "operands accepted");
                    return Ok(Found { page, entry });
                }
                trace!(name, opcode = entry.opcode, "operands rejected");
            }
        }
        if named {
            Err(ErrorKind::OperandNotAllowed)
        } else {
            Err(ErrorKind::UnknownInstruction)
        }
    }

    /// First entry whose opcode bits match.
    ///
    /// `page_filter` skips pages whose prefix does not match the bytes already
    /// seen; `opcode_of` supplies the opcode to test for an entry, reading more
    /// of the stream if it must.
    pub fn search_by_opcode<M, F, P>(&self, mut opcode_of: F, page_filter: P, matcher: &M) -> Result<Found, ErrorKind>
    where
        M: Matcher,
        F: FnMut(&Page, &Entry) -> Result<u16, ErrorKind>,
        P: Fn(&Page) -> bool,
    {
        for &page in self.pages {
            if !page_filter(page) {
                continue;
            }
            for entry in page.entries {
                let opcode = opcode_of(page, entry)?;
                if matcher.matches(opcode, page, entry) {
                    trace!(name = entry.name, opcode, "opcode matched");
                    return Ok(Found { page, entry });
                }
            }
        }
        Err(ErrorKind::UnknownInstruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // flags: low byte = widest immediate accepted, 0 = no operand
    static ENTRIES: &[Entry] = &[
        Entry::new(0x10, 8, "LD"),
        Entry::new(0x20, 16, "ld"),
        Entry::new(0x30, 0, "NOP"),
        Entry::new(0x40, 0, "HALT"),
        Entry::new(0x50, 16, "ADD"),
    ];
    static PAGE: Page = Page::new(&[], ENTRIES);
    static PREFIXED: Page = Page::new(&[0xED], &[Entry::new(0x10, 0, "NEG")]);
    static VARIANT: CpuVariant = CpuVariant {
        name: "test",
        pages: &[&PAGE, &PREFIXED],
    };

    /// Operand: `Some(bits)` for an immediate needing that many bits.
    struct Toy;

    impl Matcher for Toy {
        type Operands = Option<u32>;

        fn accept(&self, operands: &Option<u32>, _page: &Page, entry: &Entry) -> bool {
            match operands {
                None => entry.flags == 0,
                Some(bits) => entry.flags != 0 && *bits <= entry.flags,
            }
        }

        fn matches(&self, opcode: u16, _page: &Page, entry: &Entry) -> bool {
            opcode & 0xF0 == entry.opcode
        }
    }

    #[test]
    fn name_index_is_case_insensitive_and_ordered() {
        let names: Vec<u16> = PAGE.by_name("Ld").map(|e| e.opcode).collect();
        assert_eq!(names, vec![0x10, 0x20]);
        assert_eq!(PAGE.by_name("nop").count(), 1);
        assert_eq!(PAGE.by_name("NO").count(), 0);
    }

    #[test]
    fn narrow_operand_resolves_to_first_declared() {
        let found = VARIANT.search_by_name("LD", &Some(8), &Toy).unwrap();
        assert_eq!(found.entry.opcode, 0x10);
        let found = VARIANT.search_by_name("LD", &Some(12), &Toy).unwrap();
        assert_eq!(found.entry.opcode, 0x20);
    }

    #[test]
    fn name_errors() {
        assert_eq!(
            VARIANT.search_by_name("LD", &None, &Toy).unwrap_err(),
            ErrorKind::OperandNotAllowed
        );
        assert_eq!(
            VARIANT.search_by_name("JMP", &None, &Toy).unwrap_err(),
            ErrorKind::UnknownInstruction
        );
        let found = VARIANT.search_by_name("neg", &None, &Toy).unwrap();
        assert_eq!(found.page.prefix, &[0xED]);
    }

    #[test]
    fn opcode_search_honours_page_filter() {
        let found = VARIANT
            .search_by_opcode(|_, _| Ok(0x13), |p| p.prefix.is_empty(), &Toy)
            .unwrap();
        assert_eq!(found.entry.name, "LD");
        let found = VARIANT
            .search_by_opcode(|_, _| Ok(0x1F), |p| p.prefix == [0xED], &Toy)
            .unwrap();
        assert_eq!(found.entry.name, "NEG");
        let err = VARIANT
            .search_by_opcode(|_, _| Ok(0x60), |_| true, &Toy)
            .unwrap_err();
        assert_eq!(err, ErrorKind::UnknownInstruction);
        let err = VARIANT
            .search_by_opcode(|_, _| Err(ErrorKind::NoMemory), |_| true, &Toy)
            .unwrap_err();
        assert_eq!(err, ErrorKind::NoMemory);
    }
}
