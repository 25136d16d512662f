//! Opcode classification and mnemonic resolution.

use crate::fields::{InstCode, InstCodeC};
use crate::table::{CKey, COMPRESSED, Entry, Format, Key, Leaf, OP_FP_UNARY, STANDARD};
use crate::{DecodeError, Xlen, csr};

/// A classified instruction word.
#[derive(Clone, Copy)]
pub(crate) enum Word {
    Compressed(InstCodeC),
    Standard(InstCode),
}

impl Word {
    /// The quadrant for compressed words, the 7-bit major opcode otherwise.
    pub(crate) fn opcode(self) -> u32 {
        match self {
            Word::Compressed(code) => code.quadrant(),
            Word::Standard(code) => code.opcode(),
        }
    }

    pub(crate) fn raw(self) -> u32 {
        match self {
            Word::Compressed(code) => code.0 as u32,
            Word::Standard(code) => code.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolved {
    pub(crate) mnemonic: &'static str,
    pub(crate) format: Format,
}

/// Decides between the 16-bit and the 32-bit encoding space.
pub(crate) fn classify(word: u64) -> Result<Word, DecodeError> {
    if word & 0b11 != 0b11 && word <= u16::MAX as u64 {
        return Ok(Word::Compressed(InstCodeC(word as u16)));
    }
    let code = u32::try_from(word)
        .map(InstCode)
        .map_err(|_| DecodeError::Unclassifiable { word })?;
    if standard_root(code.opcode()).is_none() {
        return Err(DecodeError::Unclassifiable { word });
    }
    Ok(Word::Standard(code))
}

fn standard_root(opcode: u32) -> Option<(Format, &'static Entry<Key>)> {
    STANDARD
        .iter()
        .find(|(op, _, _)| *op == opcode)
        .map(|(_, format, entry)| (*format, entry))
}

/// Walks the tables for a classified word. `None` means the encoding is reserved or
/// outside of the supported extensions.
pub(crate) fn resolve(word: Word, xlen: Xlen) -> Option<Resolved> {
    match word {
        Word::Compressed(code) => {
            let leaf = walk(&COMPRESSED[code.quadrant() as usize], |key| {
                compressed_field(code, key, xlen)
            })?;
            let Some(format) = leaf.format else {
                unreachable!("compressed leaf {} has no format", leaf.mnemonic)
            };
            Some(Resolved {
                mnemonic: leaf.mnemonic,
                format,
            })
        }
        Word::Standard(code) => {
            let (format, root) = standard_root(code.opcode())?;
            let leaf = match code.opcode() {
                0x53 => op_fp(code, root)?,
                _ => walk(root, |key| standard_field(code, key))?,
            };
            if code.opcode() == 0x73
                && matches!(code.funct3(), 1..=3 | 5..=7)
                && csr::name(code.imm_i_raw()).is_none()
            {
                return None;
            }
            Some(Resolved {
                mnemonic: leaf.mnemonic,
                format,
            })
        }
    }
}

fn walk<K: Copy>(
    mut entry: &'static Entry<K>,
    field: impl Fn(K) -> u32,
) -> Option<&'static Leaf> {
    loop {
        match entry {
            Entry::Leaf(leaf) => return Some(leaf),
            Entry::Node(key, children) => entry = Entry::lookup(children, field(*key))?,
        }
    }
}

/// Binary operations are found by funct7. Only when that misses is the immediate
/// (funct7 and rs2 together) used to find a unary operation.
fn op_fp(code: InstCode, root: &'static Entry<Key>) -> Option<&'static Leaf> {
    let Entry::Node(Key::Funct7, binary) = root else {
        unreachable!("OP-FP must be keyed by funct7")
    };
    let entry = Entry::lookup(binary, code.funct7()).unwrap_or(&OP_FP_UNARY);
    walk(entry, |key| standard_field(code, key))
}

/// Whether an `OP-FP` word names a binary (three register) operation.
pub(crate) fn is_binary_fp(code: InstCode) -> bool {
    match standard_root(0x53) {
        Some((_, Entry::Node(_, binary))) => Entry::lookup(binary, code.funct7()).is_some(),
        _ => false,
    }
}

fn standard_field(code: InstCode, key: Key) -> u32 {
    match key {
        Key::Funct2 => code.funct2(),
        Key::Funct3 => code.funct3(),
        Key::Funct5 => code.funct5(),
        Key::Funct6 => code.funct6(),
        Key::Funct7 => code.funct7(),
        Key::Imm => code.imm_i_raw(),
    }
}

fn compressed_field(code: InstCodeC, key: CKey, xlen: Xlen) -> u32 {
    match key {
        CKey::Funct2 => code.funct2(),
        CKey::Funct3 => code.funct3(),
        CKey::Funct4 => code.funct4(),
        CKey::Funct6 => code.funct6(),
        CKey::Xlen => xlen.bits(),
        CKey::RdIsSp => (code.rd_rs1() == 2) as u32,
        CKey::NzuimmNonZero => (code.nzuimm() != 0) as u32,
        CKey::Rs2NonZero => (code.rs2() != 0) as u32,
        CKey::RdNonZero => (code.rd_rs1() != 0) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::{Word, classify, resolve};
    use crate::table::Format;
    use crate::{DecodeError, Xlen};

    #[track_caller]
    fn mnemonic(word: u64, xlen: Xlen) -> Option<(&'static str, Format)> {
        let word = classify(word).expect("classifiable");
        resolve(word, xlen).map(|r| (r.mnemonic, r.format))
    }

    #[test]
    fn classification() {
        assert!(matches!(classify(0x0001), Ok(Word::Compressed(_))));
        assert!(matches!(classify(0x9002), Ok(Word::Compressed(_))));
        assert!(matches!(classify(0xfc448493), Ok(Word::Standard(_))));
        // low bits 11 but fits in 16 bits: standard
        assert!(matches!(classify(0x0013), Ok(Word::Standard(_))));
        assert_eq!(
            classify(0x1_0000_0013).err(),
            Some(DecodeError::Unclassifiable { word: 0x1_0000_0013 })
        );
        assert_eq!(
            classify(0x7F).err(),
            Some(DecodeError::Unclassifiable { word: 0x7F })
        );
        // too wide for a compressed word, but not an 11 opcode either
        assert_eq!(
            classify(0x1_0001).err(),
            Some(DecodeError::Unclassifiable { word: 0x1_0001 })
        );
    }

    #[test]
    fn standard() {
        assert_eq!(mnemonic(0xfc448493, Xlen::Rv64), Some(("addi", Format::I)));
        assert_eq!(mnemonic(0x4000d093, Xlen::Rv64), Some(("srai", Format::I)));
        assert_eq!(mnemonic(0x0000d093, Xlen::Rv64), Some(("srli", Format::I)));
        assert_eq!(mnemonic(0x40b50533, Xlen::Rv64), Some(("sub", Format::R)));
        assert_eq!(mnemonic(0x02b50533, Xlen::Rv64), Some(("mul", Format::R)));
        assert_eq!(mnemonic(0x1005a52f, Xlen::Rv64), Some(("lr.w", Format::R)));
        assert_eq!(mnemonic(0x18b5b52f, Xlen::Rv64), Some(("sc.d", Format::R)));
        assert_eq!(mnemonic(0x00000073, Xlen::Rv64), Some(("ecall", Format::I)));
        assert_eq!(mnemonic(0x00100073, Xlen::Rv64), Some(("ebreak", Format::I)));
        assert_eq!(mnemonic(0x30200073, Xlen::Rv64), Some(("mret", Format::I)));
        assert_eq!(mnemonic(0x10500073, Xlen::Rv64), Some(("wfi", Format::I)));
        assert_eq!(mnemonic(0x7b200073, Xlen::Rv64), Some(("dret", Format::I)));
        assert_eq!(mnemonic(0x12000073, Xlen::Rv64), Some(("sfence.vma", Format::I)));
        assert_eq!(mnemonic(0xfc04c073, Xlen::Rv64), Some(("cfi.check", Format::I)));
        // reserved funct7 in OP
        assert_eq!(mnemonic(0x04b50533, Xlen::Rv64), None);
        // reserved funct3 in BRANCH
        assert_eq!(mnemonic(0x00002063, Xlen::Rv64), None);
    }

    #[test]
    fn csr_instructions_need_a_known_csr() {
        // csrrs x10, mstatus, x0
        assert_eq!(mnemonic(0x30002573, Xlen::Rv64), Some(("csrrs", Format::I)));
        // csrrw x0, 0x7ff, x1
        assert_eq!(mnemonic(0x7ff09073, Xlen::Rv64), None);
        // csrrwi x0, 0x7ff, 1
        assert_eq!(mnemonic(0x7ff0d073, Xlen::Rv64), None);
    }

    #[test]
    fn op_fp_prefers_funct7_then_immediate() {
        // fadd.s f1, f2, f3
        assert_eq!(mnemonic(0x003100d3, Xlen::Rv64), Some(("fadd.s", Format::Fdq)));
        // fsgnjn.d f1, f2, f3
        assert_eq!(mnemonic(0x223110d3, Xlen::Rv64), Some(("fsgnjn.d", Format::Fdq)));
        // feq.s x10, f1, f2
        assert_eq!(mnemonic(0xa020a553, Xlen::Rv64), Some(("feq.s", Format::Fdq)));
        // fsqrt.d f1, f2
        assert_eq!(mnemonic(0x5a0170d3, Xlen::Rv64), Some(("fsqrt.d", Format::Fdq)));
        // fcvt.w.s x10, f1
        assert_eq!(mnemonic(0xc000f553, Xlen::Rv64), Some(("fcvt.w.s", Format::Fdq)));
        // fmv.x.w x10, f1 and fclass.s x10, f1
        assert_eq!(mnemonic(0xe0008553, Xlen::Rv64), Some(("fmv.x.w", Format::Fdq)));
        assert_eq!(mnemonic(0xe0009553, Xlen::Rv64), Some(("fclass.s", Format::Fdq)));
        // fsqrt.s with a nonzero rs2 is reserved
        assert_eq!(mnemonic(0x581170d3, Xlen::Rv64), None);
    }

    #[test]
    fn fused_multiply_add() {
        // fmadd.d f1, f2, f3, f4
        assert_eq!(mnemonic(0x223170c3, Xlen::Rv64), Some(("fmadd.d", Format::R4)));
        // funct2 = 2 (half precision) is not supported
        assert_eq!(mnemonic(0x243170c3, Xlen::Rv64), None);
    }

    #[test]
    fn compressed() {
        assert_eq!(mnemonic(0x9002, Xlen::Rv64), Some(("c.ebreak", Format::Cr)));
        assert_eq!(mnemonic(0x9082, Xlen::Rv64), Some(("c.jalr", Format::Cr)));
        assert_eq!(mnemonic(0x8082, Xlen::Rv64), Some(("c.jr", Format::Cr)));
        assert_eq!(mnemonic(0x852e, Xlen::Rv64), Some(("c.mv", Format::Cr)));
        assert_eq!(mnemonic(0x952e, Xlen::Rv64), Some(("c.add", Format::Cr)));
        assert_eq!(mnemonic(0x7139, Xlen::Rv64), Some(("c.addi16sp", Format::Ci)));
        assert_eq!(mnemonic(0x6785, Xlen::Rv64), Some(("c.lui", Format::Ci)));
        assert_eq!(mnemonic(0x0000, Xlen::Rv64), Some(("c.addi4spn", Format::Ciw)));
        assert_eq!(mnemonic(0x8d89, Xlen::Rv64), Some(("c.sub", Format::Ca)));
        assert_eq!(mnemonic(0x9d89, Xlen::Rv64), Some(("c.subw", Format::Ca)));
        // funct2 2 and 3 of the W group are reserved
        assert_eq!(mnemonic(0x9dc9, Xlen::Rv64), None);
        assert_eq!(mnemonic(0x9de9, Xlen::Rv64), None);
    }

    #[test]
    fn compressed_depends_on_xlen() {
        // c.jal on RV32, c.addiw on RV64
        assert_eq!(mnemonic(0x2001, Xlen::Rv32), Some(("c.jal", Format::Cj)));
        assert_eq!(mnemonic(0x2001, Xlen::Rv64), Some(("c.addiw", Format::Ci)));
        assert_eq!(mnemonic(0x6000, Xlen::Rv32), Some(("c.flw", Format::Cl)));
        assert_eq!(mnemonic(0x6000, Xlen::Rv64), Some(("c.ld", Format::Cl)));
        assert_eq!(mnemonic(0xe006, Xlen::Rv32), Some(("c.fswsp", Format::Css)));
        assert_eq!(mnemonic(0xe006, Xlen::Rv64), Some(("c.sdsp", Format::Css)));
    }

    #[test]
    fn compressed_shift_by_zero_is_the_64_bit_form() {
        assert_eq!(mnemonic(0x8001, Xlen::Rv64), Some(("c.srli64", Format::Cb)));
        assert_eq!(mnemonic(0x8005, Xlen::Rv64), Some(("c.srli", Format::Cb)));
        assert_eq!(mnemonic(0x8401, Xlen::Rv64), Some(("c.srai64", Format::Cb)));
        assert_eq!(mnemonic(0x1002, Xlen::Rv64), Some(("c.slli", Format::Ci)));
        assert_eq!(mnemonic(0x0002, Xlen::Rv64), Some(("c.slli64", Format::Ci)));
    }
}
