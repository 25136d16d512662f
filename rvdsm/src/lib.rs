//! RISC-V disassembler.
//!
//! Turns a raw instruction word and the address it was fetched from into a line of
//! assembly text and the register operands it touches.
//!
//! ```rust
//! // addi s1, s1, -60
//! let dsm = rvdsm::decode(0xfc448493, 0x1000_0040).unwrap();
//! assert_eq!(dsm.text, "addi\tx9,x9,-0x3c");
//! assert_eq!((dsm.rd, dsm.rs1, dsm.rs2), (9, 9, 0));
//!
//! // Compressed ebreak
//! let dsm = rvdsm::decode(0x9002, 0).unwrap();
//! assert_eq!(dsm.mnemonic(), "c.ebreak");
//! ```
//!
//! Supported are RV32/RV64 `IMAFDQC`, `Zicsr`, `Zifencei`, the privileged and hypervisor
//! fences and returns. Anything else is reported as a [`DecodeError`].

pub mod csr;
mod fields;
mod format;
mod resolve;
mod table;

use std::fmt::{Debug, Display};

pub use table::Format;

/// An integer register, displayed with its ABI name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg(pub u8);

impl Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.0;
        match n {
            0 => write!(f, "zero"),
            1 => write!(f, "ra"),
            2 => write!(f, "sp"),
            3 => write!(f, "gp"),
            4 => write!(f, "tp"),
            5..=7 => write!(f, "t{}", n - 5),
            8 => write!(f, "s0"),
            9 => write!(f, "s1"),
            10..=17 => write!(f, "a{}", n - 10),
            18..=27 => write!(f, "s{}", n - 18 + 2),
            28..=31 => write!(f, "t{}", n - 28 + 3),
            _ => unreachable!("invalid register"),
        }
    }
}

/// A floating point register, displayed with its ABI name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FReg(pub u8);

impl Display for FReg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.0;
        match n {
            0..=7 => write!(f, "ft{n}"),
            8..=9 => write!(f, "fs{}", n - 8),
            10..=17 => write!(f, "fa{}", n - 10),
            18..=27 => write!(f, "fs{}", n - 18 + 2),
            28..=31 => write!(f, "ft{}", n - 28 + 8),
            _ => unreachable!("invalid register"),
        }
    }
}

/// Base integer width. Decides the meaning of some compressed encodings
/// and the width that branch and jump targets wrap at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Xlen {
    Rv32,
    #[default]
    Rv64,
}

impl Xlen {
    pub fn bits(self) -> u32 {
        match self {
            Xlen::Rv32 => 32,
            Xlen::Rv64 => 64,
        }
    }

    /// Truncates an address to the address width.
    pub fn wrap(self, addr: u64) -> u64 {
        match self {
            Xlen::Rv32 => addr & u32::MAX as u64,
            Xlen::Rv64 => addr,
        }
    }
}

/// How register operands are spelled in [`Disassembly::text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegNames {
    /// `x9`, for integer and floating point registers alike.
    #[default]
    Numeric,
    /// `s1`, `fa0`
    Abi,
}

/// One decoded instruction.
///
/// `rd`, `rs1` and `rs2` are `0` for operands the instruction does not have, which
/// is indistinguishable from an explicit use of register 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Disassembly {
    pub pc: u64,
    /// Mnemonic, a tab and the comma separated operands.
    pub text: String,
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
}

impl Disassembly {
    pub fn mnemonic(&self) -> &str {
        self.text.split('\t').next().unwrap_or_default()
    }

    pub fn operands(&self) -> &str {
        self.text.split_once('\t').map_or("", |(_, ops)| ops)
    }
}

impl Display for Disassembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeError {
    /// The word is wider than 32 bits, or its opcode is not in any table.
    Unclassifiable { word: u64 },
    /// The opcode is known, but none of its encodings match.
    Unresolved { word: u32, opcode: u32 },
}

impl DecodeError {
    pub fn word(&self) -> u64 {
        match *self {
            DecodeError::Unclassifiable { word } => word,
            DecodeError::Unresolved { word, .. } => word.into(),
        }
    }
}

impl Debug for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Unclassifiable { word } => f
                .debug_struct("Unclassifiable")
                .field("word", &format_args!("{word:#x}"))
                .finish(),
            DecodeError::Unresolved { word, opcode } => f
                .debug_struct("Unresolved")
                .field("word", &format!("{word:0>32b}"))
                .field("opcode", &format_args!("{opcode:#x}"))
                .finish(),
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Unclassifiable { word } => {
                write!(f, "failed to classify instruction word {word:#x}")
            }
            DecodeError::Unresolved { word, opcode } => write!(
                f,
                "no instruction with opcode {opcode:#x} is encoded as {word:#010x}"
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decoder settings. Decoding is a pure function of the settings and its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decoder {
    xlen: Xlen,
    reg_names: RegNames,
}

impl Decoder {
    pub const fn new(xlen: Xlen) -> Self {
        Self {
            xlen,
            reg_names: RegNames::Numeric,
        }
    }

    pub const fn with_reg_names(self, reg_names: RegNames) -> Self {
        Self { reg_names, ..self }
    }

    pub fn xlen(&self) -> Xlen {
        self.xlen
    }

    /// Decodes the instruction `word` located at `pc`.
    pub fn decode(&self, word: u64, pc: u64) -> Result<Disassembly, DecodeError> {
        let classified = resolve::classify(word)?;
        let resolved =
            resolve::resolve(classified, self.xlen).ok_or(DecodeError::Unresolved {
                word: classified.raw(),
                opcode: classified.opcode(),
            })?;
        let analyzer = format::Analyzer {
            pc,
            xlen: self.xlen,
            names: self.reg_names,
        };
        Ok(analyzer.analyze(classified, resolved))
    }
}

/// Decodes `word` located at `pc` as RV64 with numeric register names.
pub fn decode(word: u64, pc: u64) -> Result<Disassembly, DecodeError> {
    Decoder::default().decode(word, pc)
}

/// Length in bytes of the instruction starting with the halfword `low`.
pub const fn instruction_len(low: u16) -> usize {
    if low & 0b11 == 0b11 { 4 } else { 2 }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::io::Write;

    use super::{DecodeError, Decoder, Disassembly, RegNames, Xlen, decode};
    use crate::resolve::{classify, resolve};
    use crate::table::{COMPRESSED, OP_FP_UNARY, STANDARD};

    #[track_caller]
    fn dsm(xlen: Xlen, word: u64, pc: u64) -> Disassembly {
        Decoder::new(xlen)
            .decode(word, pc)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    #[track_caller]
    fn check(word: u64, text: &str, regs: (u8, u8, u8)) {
        check_at(Xlen::Rv64, word, 0x1000, text, regs);
    }

    #[track_caller]
    fn check_at(xlen: Xlen, word: u64, pc: u64, text: &str, (rd, rs1, rs2): (u8, u8, u8)) {
        let d = dsm(xlen, word, pc);
        assert_eq!(
            d,
            Disassembly {
                pc,
                text: text.to_owned(),
                rd,
                rs1,
                rs2
            },
            "{word:#x}"
        );
    }

    #[test]
    #[cfg_attr(not(slow_tests), ignore)]
    fn exhaustive_decode_no_panic() {
        for i in 0..u32::MAX {
            if (i % (2 << 25)) == 0 {
                let percent = i as f32 / (u32::MAX as f32);
                let done = (100.0 * percent) as usize;
                print!("\r{}{}", "#".repeat(done), "-".repeat(100 - done));
                std::io::stdout().flush().unwrap();
            }
            let _ = decode(i.into(), 0x8000_0000);
        }
        let _ = decode(u32::MAX.into(), 0);
    }

    #[test]
    fn compressed_space_never_panics() {
        for xlen in [Xlen::Rv32, Xlen::Rv64] {
            for names in [RegNames::Numeric, RegNames::Abi] {
                let decoder = Decoder::new(xlen).with_reg_names(names);
                for word in (0..=u16::MAX).filter(|w| w & 0b11 != 0b11) {
                    match decoder.decode(word.into(), u64::MAX - 1) {
                        Ok(d) => assert!(d.mnemonic().starts_with("c."), "{d:?}"),
                        Err(DecodeError::Unresolved { .. }) => {}
                        Err(err) => panic!("{err}"),
                    }
                }
            }
        }
    }

    /// Every table leaf is reachable from some word. Sweeps bits 31:20 and funct3 of
    /// every opcode, and the full compressed space.
    #[test]
    fn every_mnemonic_is_reachable() {
        let mut expected = BTreeSet::new();
        let mut leaves = Vec::new();
        STANDARD.iter().for_each(|(_, _, e)| e.leaves(&mut leaves));
        OP_FP_UNARY.leaves(&mut leaves);
        COMPRESSED.iter().for_each(|e| e.leaves(&mut leaves));
        expected.extend(leaves.iter().map(|leaf| leaf.mnemonic));

        let mut seen = BTreeSet::new();
        for xlen in [Xlen::Rv32, Xlen::Rv64] {
            let decoder = Decoder::new(xlen);
            for (opcode, _, _) in STANDARD {
                for funct3 in 0..8 {
                    for upper in 0..(1 << 12) {
                        let word = upper << 20 | 1 << 15 | funct3 << 12 | 1 << 7 | opcode;
                        if let Some(r) = resolve(classify(word.into()).unwrap(), xlen) {
                            seen.insert(r.mnemonic);
                            decoder.decode(word.into(), 0x1000).unwrap();
                        }
                    }
                }
            }
            for word in (0..=u16::MAX).filter(|w| w & 0b11 != 0b11) {
                if let Some(r) = resolve(classify(word.into()).unwrap(), xlen) {
                    seen.insert(r.mnemonic);
                }
            }
        }

        let missing: Vec<_> = expected.difference(&seen).collect();
        assert!(missing.is_empty(), "unreachable: {missing:?}");
    }

    #[test]
    fn decoding_is_deterministic_across_threads() {
        use rayon::prelude::*;

        let words: Vec<u64> = (0..1 << 16)
            .map(|i: u64| i.wrapping_mul(0x9E37_79B9) & 0xFFFF_FFFF)
            .collect();
        let sequential: Vec<_> = words.iter().map(|&w| decode(w, w << 1)).collect();
        let parallel: Vec<_> = words.par_iter().map(|&w| decode(w, w << 1)).collect();
        assert_eq!(sequential, parallel);
        assert_eq!(decode(0xfc448493, 4), decode(0xfc448493, 4));
    }

    #[test]
    fn scenarios() {
        check_at(
            Xlen::Rv64,
            0xfc448493,
            0x1000_0040,
            "addi\tx9,x9,-0x3c",
            (9, 9, 0),
        );
        // nop
        check(0x00000013, "addi\tx0,x0,0x0", (0, 0, 0));
        check(0x9002, "c.ebreak", (0, 0, 0));
        check(0x0000, "c.unimp", (0, 0, 0));
        check(0x001c, "c.unimp", (0, 0, 0));
        check(0xfe000ee3, "beq\tx0,x0,0xffc", (0, 0, 0));
        assert_eq!(decode(0x7F, 0), Err(DecodeError::Unclassifiable { word: 0x7F }));
        assert_eq!(
            decode(0xFFFF_FFFF, 0),
            Err(DecodeError::Unclassifiable { word: 0xFFFF_FFFF })
        );
    }

    #[test]
    fn not_decodable() {
        assert_eq!(
            decode(1 << 32 | 0x13, 0),
            Err(DecodeError::Unclassifiable { word: 1 << 32 | 0x13 })
        );
        assert_eq!(
            decode(0x04b50533, 0),
            Err(DecodeError::Unresolved {
                word: 0x04b50533,
                opcode: 0x33
            })
        );
        // unnamed CSR
        assert_eq!(
            decode(0x7ff09073, 0),
            Err(DecodeError::Unresolved {
                word: 0x7ff09073,
                opcode: 0x73
            })
        );
        // reserved compressed encoding
        assert_eq!(
            decode(0x9de9, 0),
            Err(DecodeError::Unresolved {
                word: 0x9de9,
                opcode: 1
            })
        );
    }

    #[test]
    fn loads_stores_and_immediates() {
        check(0xffc12503, "lw\tx10,-4(x2)", (10, 2, 0));
        check(0x00008067, "jalr\tx0,0(x1)", (0, 1, 0));
        check(0x00329293, "slli\tx5,x5,0x3", (5, 5, 0));
        check(0x43f55513, "srai\tx10,x10,0x3f", (10, 10, 0));
        check(0xfe512c23, "sw\tx5,-8(x2)", (0, 2, 5));
        check(0x123452b7, "lui\tx5,0x12345", (5, 0, 0));
    }

    #[test]
    fn control_flow_targets() {
        check(0x00b51863, "bne\tx10,x11,0x1010", (0, 10, 11));
        check(0x008000ef, "jal\tx1,0x1008", (1, 0, 0));
        check(0xffdff0ef, "jal\tx1,0xffc", (1, 0, 0));
        check_at(Xlen::Rv64, 0xfe000ee3, 0, "beq\tx0,x0,0xfffffffffffffffc", (0, 0, 0));
        check_at(Xlen::Rv32, 0xfe000ee3, 0, "beq\tx0,x0,0xfffffffc", (0, 0, 0));
    }

    #[test]
    fn atomics() {
        check(0x06c5a52f, "amoadd.w.aqrl\tx10,x12,(x11)", (10, 11, 12));
        check(0x04c5a52f, "amoadd.w.aq\tx10,x12,(x11)", (10, 11, 12));
        check(0x02c5a52f, "amoadd.w.rl\tx10,x12,(x11)", (10, 11, 12));
        check(0x00c5a52f, "amoadd.w\tx10,x12,(x11)", (10, 11, 12));
        check(0x1005a52f, "lr.w\tx10,(x11)", (10, 11, 0));
        check(0x18b5b52f, "sc.d\tx10,x11,(x11)", (10, 11, 11));
    }

    #[test]
    fn system() {
        check(0x30002573, "csrrs\tx10,mstatus,x0", (10, 0, 0));
        check(0x3052d073, "csrrwi\tx0,mtvec,5", (0, 0, 0));
        check(0xfc04c073, "cfi.check\tx9", (0, 9, 0));
        check(0x00000073, "ecall", (0, 0, 0));
        check(0x30200073, "mret", (0, 0, 0));
        check(0x12000073, "sfence.vma\tx0,x0", (0, 0, 0));
    }

    #[test]
    fn fences() {
        check(0x0310000f, "fence\trw,w", (0, 0, 0));
        check(0x0ff0000f, "fence\tiorw,iorw", (0, 0, 0));
        check(0x0a50000f, "fence\tir,ow", (0, 0, 0));
        check(0x8330000f, "fence.tso", (0, 0, 0));
        check(0x0000100f, "fence.i", (0, 0, 0));
    }

    #[test]
    fn empty_fence_set_is_pause() {
        // pred=w, succ empty
        check(0x0100000f, "pause", (0, 0, 0));
        check(0x0300000f, "pause", (0, 0, 0));
        check(0x0030000f, "pause", (0, 0, 0));
        check(0x0000000f, "pause", (0, 0, 0));
        // registers do not matter
        check(0x0105800f, "pause", (0, 0, 0));
        // fm=0b1000 with other sets is a plain fence
        check(0x8ff0000f, "fence\tiorw,iorw", (0, 0, 0));
        check(0x8300000f, "pause", (0, 0, 0));
    }

    #[test]
    fn floating_point() {
        check(0x223170c3, "fmadd.d\tx1,x2,x3,x4", (1, 2, 3));
        check(0x003100d3, "fadd.s\tx1,x2,x3", (1, 2, 3));
        check(0x5a0170d3, "fsqrt.d\tx1,x2", (1, 2, 0));
        check(0x01053407, "fld\tx8,16(x10)", (8, 10, 0));
        check(0x00853827, "fsd\tx8,16(x10)", (0, 10, 8));
    }

    #[test]
    fn compressed() {
        check(0x7139, "c.addi16sp\tx2,-64", (2, 2, 0));
        check(0x77fd, "c.lui\tx15,0xfffff", (15, 15, 0));
        check(0x7781, "c.lui\tx15,0xfffe0", (15, 15, 0));
        check(0x557d, "c.li\tx10,-1", (10, 10, 0));
        check(0x40b2, "c.lwsp\tx1,12(x2)", (1, 2, 0));
        check(0xec06, "c.sdsp\tx1,24(x2)", (0, 2, 1));
        check(0x0800, "c.addi4spn\tx8,x2,16", (8, 2, 0));
        check(0x41c8, "c.lw\tx10,4(x11)", (10, 11, 0));
        check(0xe404, "c.sd\tx9,8(x8)", (0, 8, 9));
        check(0x8c05, "c.sub\tx8,x9", (8, 8, 9));
        check(0x987d, "c.andi\tx8,-1", (8, 8, 0));
        check(0x8011, "c.srli\tx8,0x4", (8, 8, 0));
        check(0x852e, "c.mv\tx10,x11", (10, 10, 11));
        check(0x8082, "c.jr\tx1", (0, 1, 0));
        check(0x9082, "c.jalr\tx1", (1, 1, 0));
        check(0x0506, "c.slli\tx10,0x1", (10, 10, 0));
    }

    /// Compressed forms record the registers of their expanded instruction.
    #[test]
    fn compressed_records_expanded_registers() {
        // c.jalr x1 is jalr x1,0(x1)
        check(0x9082, "c.jalr\tx1", (1, 1, 0));
        check(0x9282, "c.jalr\tx5", (1, 5, 0));
        // c.jal is jal x1
        check_at(Xlen::Rv32, 0x2011, 0x1000, "c.jal\t0x1004", (1, 0, 0));
        // c.j is jal x0
        check(0xbffd, "c.j\t0xffe", (0, 0, 0));
        // c.sub x8,x9 is sub x8,x8,x9
        check(0x8c05, "c.sub\tx8,x9", (8, 8, 9));
        check(0x8c65, "c.and\tx8,x9", (8, 8, 9));
        // c.andi x8,-1 is andi x8,x8,-1
        check(0x987d, "c.andi\tx8,-1", (8, 8, 0));
        // c.srli x8,4 is srli x8,x8,4
        check(0x8011, "c.srli\tx8,0x4", (8, 8, 0));
    }

    #[test]
    fn compressed_control_flow() {
        check(0xdc7d, "c.beqz\tx8,0xffe", (0, 8, 0));
        check(0xe481, "c.bnez\tx9,0x1008", (0, 9, 0));
        check(0xbffd, "c.j\t0xffe", (0, 0, 0));
        check_at(Xlen::Rv32, 0x2011, 0x1000, "c.jal\t0x1004", (1, 0, 0));
    }

    #[test]
    fn xlen_dependent_compressed() {
        check_at(Xlen::Rv32, 0xe404, 0, "c.fsw\tx9,8(x8)", (0, 8, 9));
        check_at(Xlen::Rv64, 0x2011, 0, "c.addiw\tx0,4", (0, 0, 0));
    }

    #[test]
    fn abi_names() {
        let decoder = Decoder::default().with_reg_names(RegNames::Abi);
        let text = |word| decoder.decode(word, 0x1000).unwrap().text;
        assert_eq!(text(0xfc448493), "addi\ts1,s1,-0x3c");
        assert_eq!(text(0xa020a553), "feq.s\ta0,ft1,ft2");
        assert_eq!(text(0xc000f553), "fcvt.w.s\ta0,ft1");
        assert_eq!(text(0x01053407), "fld\tfs0,16(a0)");
        assert_eq!(text(0x9082), "c.jalr\tra");
        // register indices do not depend on the spelling
        assert_eq!(decoder.decode(0xfc448493, 0).unwrap().rd, 9);
    }

    #[test]
    fn record_accessors() {
        assert_eq!(Decoder::default().xlen(), Xlen::Rv64);
        assert_eq!(Decoder::new(Xlen::Rv32).with_reg_names(RegNames::Abi).xlen(), Xlen::Rv32);
        let d = decode(0xfc448493, 0).unwrap();
        assert_eq!(d.mnemonic(), "addi");
        assert_eq!(d.operands(), "x9,x9,-0x3c");
        assert_eq!(d.to_string(), d.text);
        let d = decode(0x00000073, 0).unwrap();
        assert_eq!(d.mnemonic(), "ecall");
        assert_eq!(d.operands(), "");
    }

    #[test]
    fn errors_display() {
        let err = decode(0x04b50533, 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no instruction with opcode 0x33 is encoded as 0x04b50533"
        );
        assert_eq!(err.word(), 0x04b50533);
        let err = decode(1 << 40, 0).unwrap_err();
        assert_eq!(err.to_string(), "failed to classify instruction word 0x10000000000");
    }

    #[test]
    fn instruction_len() {
        assert_eq!(super::instruction_len(0x9002), 2);
        assert_eq!(super::instruction_len(0x8493), 4);
    }
}
