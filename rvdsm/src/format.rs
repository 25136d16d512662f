//! Operand rendering. One handler per [`Format`].

use std::fmt::{self, Display, Formatter};

use crate::fields::{InstCode, InstCodeC};
use crate::resolve::{Resolved, Word, is_binary_fp};
use crate::table::Format;
use crate::{Disassembly, FReg, Reg, RegNames, Xlen, csr};

/// fence predecessor/successor sets, bits `i o r w`. An empty set makes the whole
/// fence a `pause`.
const FENCE_SETS: [&str; 16] = [
    "pause", "w", "r", "rw", "o", "ow", "or", "orw", "i", "iw", "ir", "irw", "io", "iow", "ior", "iorw",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bank {
    X,
    F,
}

struct Operand {
    index: u8,
    bank: Bank,
    names: RegNames,
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.names, self.bank) {
            (RegNames::Numeric, _) => write!(f, "x{}", self.index),
            (RegNames::Abi, Bank::X) => Display::fmt(&Reg(self.index), f),
            (RegNames::Abi, Bank::F) => Display::fmt(&FReg(self.index), f),
        }
    }
}

/// `-0x3c` rather than the two's complement `0xffffffc4`.
struct SignedHex(i32);

impl Display for SignedHex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-{:#x}", self.0.unsigned_abs())
        } else {
            write!(f, "{:#x}", self.0)
        }
    }
}

pub(crate) struct Analyzer {
    pub(crate) pc: u64,
    pub(crate) xlen: Xlen,
    pub(crate) names: RegNames,
}

impl Analyzer {
    pub(crate) fn analyze(&self, word: Word, resolved: Resolved) -> Disassembly {
        let Resolved { mnemonic, format } = resolved;
        match (format, word) {
            (Format::I, Word::Standard(code)) => self.i(code, mnemonic),
            (Format::R, Word::Standard(code)) => self.r(code, mnemonic),
            (Format::R4, Word::Standard(code)) => self.r4(code, mnemonic),
            (Format::S, Word::Standard(code)) => self.s(code, mnemonic),
            (Format::B, Word::Standard(code)) => self.b(code, mnemonic),
            (Format::U, Word::Standard(code)) => self.u(code, mnemonic),
            (Format::J, Word::Standard(code)) => self.j(code, mnemonic),
            (Format::Fdq, Word::Standard(code)) => self.fdq(code, mnemonic),
            (Format::Cr, Word::Compressed(code)) => self.cr(code, mnemonic),
            (Format::Ci, Word::Compressed(code)) => self.ci(code, mnemonic),
            (Format::Css, Word::Compressed(code)) => self.css(code, mnemonic),
            (Format::Ciw, Word::Compressed(code)) => self.ciw(code, mnemonic),
            (Format::Cl, Word::Compressed(code)) => self.cl(code, mnemonic),
            (Format::Cs, Word::Compressed(code)) => self.cs(code, mnemonic),
            (Format::Ca, Word::Compressed(code)) => self.ca(code, mnemonic),
            (Format::Cb, Word::Compressed(code)) => self.cb(code, mnemonic),
            (Format::Cj, Word::Compressed(code)) => self.cj(code, mnemonic),
            (format, word) => unreachable!(
                "{mnemonic} resolved to {format:?} for {:#x}, which has the wrong length",
                word.raw()
            ),
        }
    }

    fn reg(&self, index: u8, bank: Bank) -> Operand {
        Operand {
            index,
            bank,
            names: self.names,
        }
    }
    fn x(&self, index: u8) -> Operand {
        self.reg(index, Bank::X)
    }
    fn f(&self, index: u8) -> Operand {
        self.reg(index, Bank::F)
    }

    fn target(&self, offset: i32) -> u64 {
        self.xlen.wrap(self.pc.wrapping_add_signed(offset.into()))
    }

    fn record(&self, text: String, rd: u8, rs1: u8, rs2: u8) -> Disassembly {
        Disassembly {
            pc: self.pc,
            text,
            rd,
            rs1,
            rs2,
        }
    }

    fn bare(&self, mnemonic: &str) -> Disassembly {
        self.record(mnemonic.to_owned(), 0, 0, 0)
    }

    fn i(&self, code: InstCode, m: &str) -> Disassembly {
        let (rd, rs1) = (code.rd(), code.rs1());
        match code.opcode() {
            0x03 | 0x67 => self.record(
                format!("{m}\t{},{}({})", self.x(rd), code.imm_i(), self.x(rs1)),
                rd,
                rs1,
                0,
            ),
            0x13 | 0x1B if matches!(code.funct3(), 1 | 5) => self.record(
                format!("{m}\t{},{},{:#x}", self.x(rd), self.x(rs1), code.shamt()),
                rd,
                rs1,
                0,
            ),
            0x13 | 0x1B => self.record(
                format!(
                    "{m}\t{},{},{}",
                    self.x(rd),
                    self.x(rs1),
                    SignedHex(code.imm_i())
                ),
                rd,
                rs1,
                0,
            ),
            0x0F => self.fence(code, m),
            0x73 => self.system(code, m),
            opcode => unreachable!("{m} is not an I format instruction of opcode {opcode:#x}"),
        }
    }

    fn fence(&self, code: InstCode, m: &str) -> Disassembly {
        if m == "fence.i" {
            return self.bare(m);
        }
        let (fm, pred, succ) = (code.fence_fm(), code.fence_pred(), code.fence_succ());
        if fm == 0b1000 && pred == 0b0011 && succ == 0b0011 {
            return self.bare("fence.tso");
        }
        let (pred, succ) = (FENCE_SETS[pred as usize], FENCE_SETS[succ as usize]);
        if pred == "pause" || succ == "pause" {
            self.bare("pause")
        } else {
            self.record(format!("{m}\t{pred},{succ}"), 0, 0, 0)
        }
    }

    fn system(&self, code: InstCode, m: &str) -> Disassembly {
        let (rd, rs1, rs2) = (code.rd(), code.rs1(), code.rs2());
        match code.funct3() {
            funct3 @ (1..=3 | 5..=7) => {
                let Some(csr) = csr::name(code.imm_i_raw()) else {
                    unreachable!("{m} resolved without a named CSR")
                };
                if funct3 < 4 {
                    self.record(
                        format!("{m}\t{},{csr},{}", self.x(rd), self.x(rs1)),
                        rd,
                        rs1,
                        0,
                    )
                } else {
                    // rs1 holds a 5-bit immediate
                    self.record(format!("{m}\t{},{csr},{rs1}", self.x(rd)), rd, 0, 0)
                }
            }
            _ if code.imm_i_raw() == 0xFC0 => {
                self.record(format!("{m}\t{}", self.x(rs1)), 0, rs1, 0)
            }
            _ if matches!(m, "sfence.vma" | "hfence.vvma" | "hfence.gvma") => self.record(
                format!("{m}\t{},{}", self.x(rs1), self.x(rs2)),
                0,
                rs1,
                rs2,
            ),
            _ => self.bare(m),
        }
    }

    fn r(&self, code: InstCode, m: &str) -> Disassembly {
        let (rd, rs1, rs2) = (code.rd(), code.rs1(), code.rs2());
        if code.opcode() != 0x2F {
            return self.record(
                format!("{m}\t{},{},{}", self.x(rd), self.x(rs1), self.x(rs2)),
                rd,
                rs1,
                rs2,
            );
        }
        let ordering = match (code.aq(), code.rl()) {
            (false, false) => "",
            (true, false) => ".aq",
            (false, true) => ".rl",
            (true, true) => ".aqrl",
        };
        if m.starts_with("lr.") {
            self.record(
                format!("{m}{ordering}\t{},({})", self.x(rd), self.x(rs1)),
                rd,
                rs1,
                0,
            )
        } else {
            self.record(
                format!(
                    "{m}{ordering}\t{},{},({})",
                    self.x(rd),
                    self.x(rs2),
                    self.x(rs1)
                ),
                rd,
                rs1,
                rs2,
            )
        }
    }

    fn r4(&self, code: InstCode, m: &str) -> Disassembly {
        let (rd, rs1, rs2, rs3) = (code.rd(), code.rs1(), code.rs2(), code.rs3());
        self.record(
            format!(
                "{m}\t{},{},{},{}",
                self.f(rd),
                self.f(rs1),
                self.f(rs2),
                self.f(rs3)
            ),
            rd,
            rs1,
            rs2,
        )
    }

    fn s(&self, code: InstCode, m: &str) -> Disassembly {
        let (rs1, rs2) = (code.rs1(), code.rs2());
        self.record(
            format!("{m}\t{},{}({})", self.x(rs2), code.imm_s(), self.x(rs1)),
            0,
            rs1,
            rs2,
        )
    }

    fn b(&self, code: InstCode, m: &str) -> Disassembly {
        let (rs1, rs2) = (code.rs1(), code.rs2());
        let target = self.target(code.imm_b());
        self.record(
            format!("{m}\t{},{},{target:#x}", self.x(rs1), self.x(rs2)),
            0,
            rs1,
            rs2,
        )
    }

    fn u(&self, code: InstCode, m: &str) -> Disassembly {
        let rd = code.rd();
        self.record(format!("{m}\t{},{:#x}", self.x(rd), code.imm_u()), rd, 0, 0)
    }

    fn j(&self, code: InstCode, m: &str) -> Disassembly {
        let rd = code.rd();
        let target = self.target(code.imm_j());
        self.record(format!("{m}\t{},{target:#x}", self.x(rd)), rd, 0, 0)
    }

    fn fdq(&self, code: InstCode, m: &str) -> Disassembly {
        let (rd, rs1, rs2) = (code.rd(), code.rs1(), code.rs2());
        match code.opcode() {
            0x07 => self.record(
                format!("{m}\t{},{}({})", self.f(rd), code.imm_i(), self.x(rs1)),
                rd,
                rs1,
                0,
            ),
            0x27 => self.record(
                format!("{m}\t{},{}({})", self.f(rs2), code.imm_s(), self.x(rs1)),
                0,
                rs1,
                rs2,
            ),
            0x53 if is_binary_fp(code) => {
                let dest = match m.split('.').next() {
                    Some("fle" | "flt" | "feq") => Bank::X,
                    _ => Bank::F,
                };
                self.record(
                    format!(
                        "{m}\t{},{},{}",
                        self.reg(rd, dest),
                        self.f(rs1),
                        self.f(rs2)
                    ),
                    rd,
                    rs1,
                    rs2,
                )
            }
            0x53 => {
                let (dest, src) = unary_banks(m);
                self.record(
                    format!("{m}\t{},{}", self.reg(rd, dest), self.reg(rs1, src)),
                    rd,
                    rs1,
                    0,
                )
            }
            opcode => unreachable!("{m} is not a floating point instruction of opcode {opcode:#x}"),
        }
    }

    fn cr(&self, code: InstCodeC, m: &str) -> Disassembly {
        let (rd_rs1, rs2) = (code.rd_rs1(), code.rs2());
        match m {
            "c.mv" | "c.add" => self.record(
                format!("{m}\t{},{}", self.x(rd_rs1), self.x(rs2)),
                rd_rs1,
                rd_rs1,
                rs2,
            ),
            "c.ebreak" => self.bare(m),
            "c.jr" => self.record(format!("{m}\t{}", self.x(rd_rs1)), 0, rd_rs1, 0),
            // links to ra
            "c.jalr" => self.record(format!("{m}\t{}", self.x(rd_rs1)), 1, rd_rs1, 0),
            _ => unreachable!("{m} is not a CR instruction"),
        }
    }

    fn ci(&self, code: InstCodeC, m: &str) -> Disassembly {
        let rd = code.rd_rs1();
        let sp_load = |bank, offset| {
            self.record(
                format!("{m}\t{},{offset}({})", self.reg(rd, bank), self.x(2)),
                rd,
                2,
                0,
            )
        };
        match m {
            // nzimm[17] itself is the sign bit, so 0x20 is already negative
            "c.lui" => self.record(
                format!("{m}\t{},{:#x}", self.x(rd), code.lui_imm()),
                rd,
                rd,
                0,
            ),
            "c.li" | "c.addi" | "c.addiw" => {
                self.record(format!("{m}\t{},{}", self.x(rd), code.nzimm()), rd, rd, 0)
            }
            "c.addi16sp" => self.record(
                format!("{m}\t{},{}", self.x(rd), code.addi16sp_imm()),
                rd,
                rd,
                0,
            ),
            "c.slli" | "c.slli64" => self.record(
                format!("{m}\t{},{:#x}", self.x(rd), code.nzuimm()),
                rd,
                rd,
                0,
            ),
            "c.lwsp" => sp_load(Bank::X, code.sp_load_word()),
            "c.flwsp" => sp_load(Bank::F, code.sp_load_word()),
            "c.ldsp" => sp_load(Bank::X, code.sp_load_double()),
            "c.fldsp" => sp_load(Bank::F, code.sp_load_double()),
            _ => unreachable!("{m} is not a CI instruction"),
        }
    }

    fn css(&self, code: InstCodeC, m: &str) -> Disassembly {
        let rs2 = code.rs2();
        let (bank, offset) = match m {
            "c.swsp" => (Bank::X, code.sp_store_word()),
            "c.fswsp" => (Bank::F, code.sp_store_word()),
            "c.sdsp" => (Bank::X, code.sp_store_double()),
            "c.fsdsp" => (Bank::F, code.sp_store_double()),
            _ => unreachable!("{m} is not a CSS instruction"),
        };
        self.record(
            format!("{m}\t{},{offset}({})", self.reg(rs2, bank), self.x(2)),
            0,
            2,
            rs2,
        )
    }

    fn ciw(&self, code: InstCodeC, m: &str) -> Disassembly {
        assert_eq!(m, "c.addi4spn", "{m} is not a CIW instruction");
        let imm = code.addi4spn_imm();
        if imm == 0 {
            return self.bare("c.unimp");
        }
        let rd = code.rs2_short();
        self.record(
            format!("{m}\t{},{},{imm}", self.x(rd), self.x(2)),
            rd,
            2,
            0,
        )
    }

    fn cl(&self, code: InstCodeC, m: &str) -> Disassembly {
        let (rd, rs1) = (code.rs2_short(), code.rs1_short());
        let (bank, offset) = match m {
            "c.lw" => (Bank::X, code.mem_word()),
            "c.flw" => (Bank::F, code.mem_word()),
            "c.ld" => (Bank::X, code.mem_double()),
            "c.fld" => (Bank::F, code.mem_double()),
            _ => unreachable!("{m} is not a CL instruction"),
        };
        self.record(
            format!("{m}\t{},{offset}({})", self.reg(rd, bank), self.x(rs1)),
            rd,
            rs1,
            0,
        )
    }

    fn cs(&self, code: InstCodeC, m: &str) -> Disassembly {
        let (rs1, rs2) = (code.rs1_short(), code.rs2_short());
        let (bank, offset) = match m {
            "c.sw" => (Bank::X, code.mem_word()),
            "c.fsw" => (Bank::F, code.mem_word()),
            "c.sd" => (Bank::X, code.mem_double()),
            "c.fsd" => (Bank::F, code.mem_double()),
            _ => unreachable!("{m} is not a CS instruction"),
        };
        self.record(
            format!("{m}\t{},{offset}({})", self.reg(rs2, bank), self.x(rs1)),
            0,
            rs1,
            rs2,
        )
    }

    fn ca(&self, code: InstCodeC, m: &str) -> Disassembly {
        let (rd, rs2) = (code.rs1_short(), code.rs2_short());
        self.record(format!("{m}\t{},{}", self.x(rd), self.x(rs2)), rd, rd, rs2)
    }

    fn cb(&self, code: InstCodeC, m: &str) -> Disassembly {
        let rs1 = code.rs1_short();
        match m {
            "c.andi" => self.record(
                format!("{m}\t{},{}", self.x(rs1), code.nzimm()),
                rs1,
                rs1,
                0,
            ),
            "c.srli" | "c.srai" | "c.srli64" | "c.srai64" => self.record(
                format!("{m}\t{},{:#x}", self.x(rs1), code.nzuimm()),
                rs1,
                rs1,
                0,
            ),
            "c.beqz" | "c.bnez" => {
                let target = self.target(code.branch_offset());
                self.record(format!("{m}\t{},{target:#x}", self.x(rs1)), 0, rs1, 0)
            }
            _ => unreachable!("{m} is not a CB instruction"),
        }
    }

    fn cj(&self, code: InstCodeC, m: &str) -> Disassembly {
        let target = self.target(code.jump_offset());
        let rd = match m {
            "c.j" => 0,
            "c.jal" => 1,
            _ => unreachable!("{m} is not a CJ instruction"),
        };
        self.record(format!("{m}\t{target:#x}"), rd, 0, 0)
    }
}

/// Register banks of the destination and the source of a unary `OP-FP` operation.
fn unary_banks(m: &str) -> (Bank, Bank) {
    let bank = |ty: &str| match ty {
        "w" | "wu" | "l" | "lu" => Bank::X,
        _ => Bank::F,
    };
    let mut parts = m.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("fmv"), Some("x"), _) => (Bank::X, Bank::F),
        (Some("fmv"), _, _) => (Bank::F, Bank::X),
        (Some("fcvt"), Some(dest), Some(src)) => (bank(dest), bank(src)),
        (Some("fclass"), _, _) => (Bank::X, Bank::F),
        _ => (Bank::F, Bank::F),
    }
}
