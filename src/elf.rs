use eyre::{OptionExt, Result, bail};
use rvdsm::Xlen;

// PT_LOAD
const PT_LOAD: u32 = 1;
// PF_X
const PF_X: u32 = 1;

pub struct Elf<'a> {
    pub content: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

impl ElfClass {
    pub fn xlen(self) -> Xlen {
        match self {
            ElfClass::Elf32 => Xlen::Rv32,
            ElfClass::Elf64 => Xlen::Rv64,
        }
    }
}

#[derive(Debug)]
pub struct Header {
    pub class: ElfClass,
    pub e_type: u16,
    pub e_entry: Addr,
    pub e_phoff: Offset,
    pub e_phentsize: u16,
    pub e_phnum: u16,
}

#[derive(Debug)]
pub struct Phdr {
    pub p_type: u32,
    pub p_offset: Offset,
    pub p_vaddr: Addr,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_flags: u32,
}

/// The file contents of a loadable, executable segment.
#[derive(Debug)]
pub struct Segment<'a> {
    pub vaddr: Addr,
    pub bytes: &'a [u8],
}

impl<'a> Elf<'a> {
    pub fn header(&self) -> Result<Header> {
        let (ident, rest) = self.content.split_bytes(16)?;
        if ident[..4] != *b"\x7fELF" {
            bail!("not an elf file (invalid magic)");
        }

        let class = match ident[4] {
            // ELFCLASS32
            1 => ElfClass::Elf32,
            // ELFCLASS64
            2 => ElfClass::Elf64,
            _ => bail!("not a ELF32 or ELF64 file (EI_CLASS={})", ident[4]),
        };

        // ELFDATA2LSB
        if ident[5] != 1 {
            bail!("not a LE file (EI_DATA={})", ident[5]);
        }
        // EV_CURRENT
        if ident[6] != 1 {
            bail!("invalid ELF version (EI_VERSION={})", ident[6]);
        }

        let (e_type, rest) = rest.split_u16()?;
        // ET_REL|ET_EXEC|ET_DYN
        if !(1..=3).contains(&e_type) {
            bail!("not an object file with code (e_type={e_type})");
        }

        let (e_machine, rest) = rest.split_u16()?;
        // EM_RISCV
        if e_machine != 243 {
            bail!("not a RISC-V executable (e_machine={e_machine})");
        }

        let (e_version, rest) = rest.split_u32()?;
        if e_version != 1 {
            bail!("invalid ELF version (e_version={e_version})");
        }

        let (e_entry, e_phoff, rest) = match class {
            ElfClass::Elf32 => {
                let (e_entry, rest) = rest.split_u32()?;
                let (e_phoff, rest) = rest.split_u32()?;
                let (_e_shoff, rest) = rest.split_u32()?;
                (Addr(e_entry as u64), Offset(e_phoff as u64), rest)
            }
            ElfClass::Elf64 => {
                let (e_entry, rest) = rest.split_u64()?;
                let (e_phoff, rest) = rest.split_u64()?;
                let (_e_shoff, rest) = rest.split_u64()?;
                (Addr(e_entry), Offset(e_phoff), rest)
            }
        };

        let (_e_flags, rest) = rest.split_u32()?;
        let (_e_ehsize, rest) = rest.split_u16()?;
        let (e_phentsize, rest) = rest.split_u16()?;
        let (e_phnum, _) = rest.split_u16()?;

        Ok(Header {
            class,
            e_type,
            e_entry,
            e_phoff,
            e_phentsize,
            e_phnum,
        })
    }

    pub fn segments(&self) -> Result<Vec<Phdr>> {
        let header = self.header()?;
        let min_entsize = match header.class {
            ElfClass::Elf32 => 32,
            ElfClass::Elf64 => 56,
        };
        if header.e_phnum > 0 && (header.e_phentsize as usize) < min_entsize {
            bail!("program header entries too small (e_phentsize={})", header.e_phentsize);
        }

        let offset = usize::try_from(header.e_phoff.0)?;
        let (_, phdrs) = self.content.split_bytes(offset)?;
        let (mut phdrs, _) =
            phdrs.split_bytes(header.e_phentsize as usize * header.e_phnum as usize)?;

        let mut parsed_phdrs = vec![];

        while !phdrs.is_empty() {
            let phdr;
            (phdr, phdrs) = phdrs.split_bytes(header.e_phentsize as usize)?;

            let phdr = match header.class {
                ElfClass::Elf32 => {
                    let (p_type, phdr) = phdr.split_u32()?;
                    let (p_offset, phdr) = phdr.split_u32()?;
                    let (p_vaddr, phdr) = phdr.split_u32()?;
                    let (_p_paddr, phdr) = phdr.split_u32()?;
                    let (p_filesz, phdr) = phdr.split_u32()?;
                    let (p_memsz, phdr) = phdr.split_u32()?;
                    let (p_flags, _) = phdr.split_u32()?;

                    Phdr {
                        p_type,
                        p_offset: Offset(p_offset as u64),
                        p_vaddr: Addr(p_vaddr as u64),
                        p_filesz: p_filesz as u64,
                        p_memsz: p_memsz as u64,
                        p_flags,
                    }
                }
                ElfClass::Elf64 => {
                    let (p_type, phdr) = phdr.split_u32()?;
                    let (p_flags, phdr) = phdr.split_u32()?;
                    let (p_offset, phdr) = phdr.split_u64()?;
                    let (p_vaddr, phdr) = phdr.split_u64()?;
                    let (_p_paddr, phdr) = phdr.split_u64()?;
                    let (p_filesz, phdr) = phdr.split_u64()?;
                    let (p_memsz, _) = phdr.split_u64()?;

                    Phdr {
                        p_type,
                        p_offset: Offset(p_offset),
                        p_vaddr: Addr(p_vaddr),
                        p_filesz,
                        p_memsz,
                        p_flags,
                    }
                }
            };
            parsed_phdrs.push(phdr);
        }

        Ok(parsed_phdrs)
    }

    /// All `PT_LOAD` segments mapped executable, in program header order.
    pub fn executable_segments(&self) -> Result<Vec<Segment<'a>>> {
        let mut segments = vec![];
        for phdr in self.segments()? {
            if phdr.p_type != PT_LOAD || phdr.p_flags & PF_X == 0 || phdr.p_filesz == 0 {
                continue;
            }
            let start = usize::try_from(phdr.p_offset.0)?;
            let len = usize::try_from(phdr.p_filesz)?;
            let bytes = self
                .content
                .get(start..)
                .ok_or_eyre("invalid offset")?
                .get(..len)
                .ok_or_eyre("invalid offset")?;
            segments.push(Segment {
                vaddr: phdr.p_vaddr,
                bytes,
            });
        }
        Ok(segments)
    }
}

pub trait SplitAtCheckedErr {
    fn split_bytes(&self, split: usize) -> Result<(&[u8], &[u8])>;
    fn split_u16(&self) -> Result<(u16, &[u8])>;
    fn split_u32(&self) -> Result<(u32, &[u8])>;
    fn split_u64(&self) -> Result<(u64, &[u8])>;
}
impl SplitAtCheckedErr for [u8] {
    fn split_bytes(&self, mid: usize) -> Result<(&[u8], &[u8])> {
        self.split_at_checked(mid)
            .ok_or_eyre("invalid file: too short")
    }
    fn split_u16(&self) -> Result<(u16, &[u8])> {
        let (bytes, rest) = self.split_bytes(2)?;
        Ok((u16::from_le_bytes(bytes.try_into()?), rest))
    }
    fn split_u32(&self) -> Result<(u32, &[u8])> {
        let (bytes, rest) = self.split_bytes(4)?;
        Ok((u32::from_le_bytes(bytes.try_into()?), rest))
    }
    fn split_u64(&self) -> Result<(u64, &[u8])> {
        let (bytes, rest) = self.split_bytes(8)?;
        Ok((u64::from_le_bytes(bytes.try_into()?), rest))
    }
}
