//! Bit fields of RISC-V instruction words.
//!
//! ```text
//!  31 30 ... 25 24 ... 20 19 ... 15 14 .. 12 11 ... 07 06 ... 00
//! |  funct7    |   rs2   |   rs1   | funct3 |   rd    | opcode  | R
//! |   imm[11:0]          |   rs1   | funct3 |   rd    | opcode  | I
//! | imm[11:5]  |   rs2   |   rs1   | funct3 |imm[4:0] | opcode  | S
//! |12|imm[10:5]|   rs2   |   rs1   | funct3 |[4:1]|11 | opcode  | B
//! |             imm[31:12]                  |   rd    | opcode  | U
//! |20|  imm[10:1]  |11|  imm[19:12]         |   rd    | opcode  | J
//! |  rs3 |fn2  |   rs2   |   rs1   | funct3 |   rd    | opcode  | R4
//! ```
//!
//! Immediates are reassembled with the mask/shift arithmetic of the bit layouts above
//! (and of the compressed formats further down). Signed immediates go through [`signed`],
//! which only sign-extends when the sign bit of the reassembled field is set.

use std::ops::RangeInclusive;

/// Sign-extends a `width`-bit field whose sign bit is known to be set.
///
/// The width is inferred from the magnitude of `value` (`p = ceil(log2(value))`),
/// which is only sound when bit `width - 1` is the highest set bit. That precondition
/// is checked, so a zero or unguarded value aborts instead of producing garbage.
pub(crate) fn sign_extend(value: u32, width: u32) -> i32 {
    assert!(
        width >= 1 && width <= 31 && value >> (width - 1) == 1,
        "sign_extend({value:#x}, {width}) called without the sign bit set"
    );
    let p = u32::BITS - (value - 1).leading_zeros();
    if value == 1 << p {
        assert_eq!(p, width - 1);
        -(1_i32 << p)
    } else {
        assert_eq!(p, width);
        value as i32 - (1_i32 << p)
    }
}

/// Interprets a `width`-bit field as a two's complement number.
pub(crate) fn signed(value: u32, width: u32) -> i32 {
    if value & (1 << (width - 1)) != 0 {
        sign_extend(value, width)
    } else {
        value as i32
    }
}

/// A 32-bit (standard) instruction word.
#[derive(Clone, Copy)]
pub(crate) struct InstCode(pub(crate) u32);

impl InstCode {
    fn extract(self, range: RangeInclusive<u32>) -> u32 {
        let end_span = 32 - (range.end() + 1);
        (self.0 << (end_span)) >> (end_span + range.start())
    }

    pub(crate) fn opcode(self) -> u32 {
        self.0 & 0b1111111
    }
    pub(crate) fn funct2(self) -> u32 {
        self.extract(25..=26)
    }
    pub(crate) fn funct3(self) -> u32 {
        self.extract(12..=14)
    }
    pub(crate) fn funct5(self) -> u32 {
        self.extract(27..=31)
    }
    /// Upper six bits, which separate logical from arithmetic shifts.
    pub(crate) fn funct6(self) -> u32 {
        self.extract(26..=31)
    }
    pub(crate) fn funct7(self) -> u32 {
        self.extract(25..=31)
    }
    pub(crate) fn rd(self) -> u8 {
        self.extract(7..=11) as u8
    }
    pub(crate) fn rs1(self) -> u8 {
        self.extract(15..=19) as u8
    }
    pub(crate) fn rs2(self) -> u8 {
        self.extract(20..=24) as u8
    }
    /// rs3 shares its position with funct5.
    pub(crate) fn rs3(self) -> u8 {
        self.funct5() as u8
    }

    /// The raw 12-bit I immediate; also the CSR address of system instructions.
    pub(crate) fn imm_i_raw(self) -> u32 {
        let imm_11 = (0x8000_0000 & self.0) >> 20;
        let imm_10_0 = (0x7FF0_0000 & self.0) >> 20;
        imm_11 | imm_10_0
    }
    pub(crate) fn imm_i(self) -> i32 {
        signed(self.imm_i_raw(), 12)
    }
    pub(crate) fn shamt(self) -> u32 {
        (0x03F0_0000 & self.0) >> 20
    }
    pub(crate) fn imm_s(self) -> i32 {
        let imm_11 = (0x8000_0000 & self.0) >> 20;
        let imm_10_5 = (0x7E00_0000 & self.0) >> 20;
        let imm_4_0 = (0xF80 & self.0) >> 7;
        signed(imm_11 | imm_10_5 | imm_4_0, 12)
    }
    pub(crate) fn imm_b(self) -> i32 {
        let imm_12 = (0x8000_0000 & self.0) >> 19;
        let imm_11 = (0x80 & self.0) << 4;
        let imm_10_5 = (0x7E00_0000 & self.0) >> 20;
        let imm_4_1 = (0xF00 & self.0) >> 7;
        signed(imm_12 | imm_11 | imm_10_5 | imm_4_1, 13)
    }
    /// The 20 upper immediate bits, not shifted back into place.
    pub(crate) fn imm_u(self) -> u32 {
        (0xFFFF_F000 & self.0) >> 12
    }
    pub(crate) fn imm_j(self) -> i32 {
        let imm_20 = (0x8000_0000 & self.0) >> 11;
        let imm_10_1 = (0x7FE0_0000 & self.0) >> 20;
        let imm_11 = (0x0010_0000 & self.0) >> 9;
        let imm_19_12 = 0x000F_F000 & self.0;
        signed(imm_20 | imm_10_1 | imm_11 | imm_19_12, 21)
    }

    pub(crate) fn fence_fm(self) -> u32 {
        (0xF000_0000 & self.0) >> 28
    }
    pub(crate) fn fence_pred(self) -> u32 {
        (0x0F00_0000 & self.0) >> 24
    }
    pub(crate) fn fence_succ(self) -> u32 {
        (0x00F0_0000 & self.0) >> 20
    }
    pub(crate) fn aq(self) -> bool {
        (0x0400_0000 & self.0) >> 26 == 1
    }
    pub(crate) fn rl(self) -> bool {
        (0x0200_0000 & self.0) >> 25 == 1
    }
}

/// A 16-bit (compressed) instruction word.
#[derive(Clone, Copy)]
pub(crate) struct InstCodeC(pub(crate) u16);

impl InstCodeC {
    fn w(self) -> u32 {
        self.0 as u32
    }

    pub(crate) fn quadrant(self) -> u32 {
        self.w() & 0b11
    }
    /// CA funct2 (6..=5)
    pub(crate) fn funct2(self) -> u32 {
        (0x60 & self.w()) >> 5
    }
    pub(crate) fn funct3(self) -> u32 {
        (0xE000 & self.w()) >> 13
    }
    pub(crate) fn funct4(self) -> u32 {
        (0xF000 & self.w()) >> 12
    }
    pub(crate) fn funct6(self) -> u32 {
        (0xFC00 & self.w()) >> 10
    }
    /// rd/rs1 (11..=7)
    pub(crate) fn rd_rs1(self) -> u8 {
        ((0xF80 & self.w()) >> 7) as u8
    }
    /// rs2 (6..=2)
    pub(crate) fn rs2(self) -> u8 {
        ((0x7C & self.w()) >> 2) as u8
    }
    /// rs1'/rd' (9..=7), mapped to x8..=x15
    pub(crate) fn rs1_short(self) -> u8 {
        (((0x380 & self.w()) >> 7) + 8) as u8
    }
    /// rs2'/rd' (4..=2), mapped to x8..=x15
    pub(crate) fn rs2_short(self) -> u8 {
        (((0x1C & self.w()) >> 2) + 8) as u8
    }

    /// The six CI immediate bits `[12|6:2]`, unsigned.
    pub(crate) fn nzuimm(self) -> u32 {
        let nzuimm_5 = (0x1000 & self.w()) >> 7;
        let nzuimm_4_0 = (0x7C & self.w()) >> 2;
        nzuimm_5 | nzuimm_4_0
    }
    pub(crate) fn nzimm(self) -> i32 {
        signed(self.nzuimm(), 6)
    }
    /// c.lui: the CI immediate sign-extended to the 20 bits of a U immediate.
    pub(crate) fn lui_imm(self) -> u32 {
        let nzuimm = self.nzuimm();
        if nzuimm & 0x20 != 0 {
            0xF_FFC0 | nzuimm
        } else {
            nzuimm
        }
    }

    /// c.lwsp / c.flwsp: `uimm[5] | uimm[4:2|7:6]`
    pub(crate) fn sp_load_word(self) -> u32 {
        let imm_2 = (0x10 & self.w()) >> 2;
        let imm_3 = (0x20 & self.w()) >> 2;
        let imm_4 = (0x40 & self.w()) >> 2;
        let imm_5 = (0x1000 & self.w()) >> 7;
        let imm_6 = (0x4 & self.w()) << 4;
        let imm_7 = (0x8 & self.w()) << 4;
        imm_7 | imm_6 | imm_5 | imm_4 | imm_3 | imm_2
    }
    /// c.ldsp / c.fldsp: `uimm[5] | uimm[4:3|8:6]`
    pub(crate) fn sp_load_double(self) -> u32 {
        let imm_3 = (0x20 & self.w()) >> 2;
        let imm_4 = (0x40 & self.w()) >> 2;
        let imm_5 = (0x1000 & self.w()) >> 7;
        let imm_6 = (0x4 & self.w()) << 4;
        let imm_7 = (0x8 & self.w()) << 4;
        let imm_8 = (0x10 & self.w()) << 4;
        imm_8 | imm_7 | imm_6 | imm_5 | imm_4 | imm_3
    }
    /// c.swsp / c.fswsp: `uimm[5:2|7:6]`
    pub(crate) fn sp_store_word(self) -> u32 {
        let imm_2 = (0x200 & self.w()) >> 7;
        let imm_3 = (0x400 & self.w()) >> 7;
        let imm_4 = (0x800 & self.w()) >> 7;
        let imm_5 = (0x1000 & self.w()) >> 7;
        let imm_6 = (0x80 & self.w()) >> 1;
        let imm_7 = (0x100 & self.w()) >> 1;
        imm_7 | imm_6 | imm_5 | imm_4 | imm_3 | imm_2
    }
    /// c.sdsp / c.fsdsp: `uimm[5:3|8:6]`
    pub(crate) fn sp_store_double(self) -> u32 {
        let imm_3 = (0x400 & self.w()) >> 7;
        let imm_4 = (0x800 & self.w()) >> 7;
        let imm_5 = (0x1000 & self.w()) >> 7;
        let imm_6 = (0x80 & self.w()) >> 1;
        let imm_7 = (0x100 & self.w()) >> 1;
        let imm_8 = (0x200 & self.w()) >> 1;
        imm_8 | imm_7 | imm_6 | imm_5 | imm_4 | imm_3
    }

    /// c.lw / c.sw / c.flw / c.fsw: `uimm[5:3]` and `uimm[2|6]`
    pub(crate) fn mem_word(self) -> u32 {
        let imm_5_3 = (0x1C00 & self.w()) >> 7;
        let imm_2 = (0x40 & self.w()) >> 4;
        let imm_6 = (0x20 & self.w()) << 1;
        imm_6 | imm_5_3 | imm_2
    }
    /// c.ld / c.sd / c.fld / c.fsd: `uimm[5:3]` and `uimm[7:6]`
    pub(crate) fn mem_double(self) -> u32 {
        let imm_5_3 = (0x1C00 & self.w()) >> 7;
        let imm_6 = (0x20 & self.w()) << 1;
        let imm_7 = (0x40 & self.w()) << 1;
        imm_7 | imm_6 | imm_5_3
    }

    /// c.addi4spn: `nzuimm[5:4|9:6|2|3]`
    pub(crate) fn addi4spn_imm(self) -> u32 {
        let imm_9_6 = (0x780 & self.w()) >> 1;
        let imm_5_4 = (0x1800 & self.w()) >> 7;
        let imm_3 = (0x20 & self.w()) >> 2;
        let imm_2 = (0x40 & self.w()) >> 4;
        imm_9_6 | imm_5_4 | imm_3 | imm_2
    }
    /// c.addi16sp: `nzimm[9] | nzimm[4|6|8:7|5]`
    pub(crate) fn addi16sp_imm(self) -> i32 {
        let imm_9 = (0x1000 & self.w()) >> 3;
        let imm_8_7 = (0x18 & self.w()) << 4;
        let imm_6 = (0x20 & self.w()) << 1;
        let imm_5 = (0x4 & self.w()) << 3;
        let imm_4 = (0x40 & self.w()) >> 2;
        signed(imm_9 | imm_8_7 | imm_6 | imm_5 | imm_4, 10)
    }
    /// c.beqz / c.bnez: `offset[8|4:3] | offset[7:6|2:1|5]`
    pub(crate) fn branch_offset(self) -> i32 {
        let ofs_8 = (0x1000 & self.w()) >> 4;
        let ofs_7_6 = (0x60 & self.w()) << 1;
        let ofs_5 = (0x4 & self.w()) << 3;
        let ofs_4_3 = (0xC00 & self.w()) >> 7;
        let ofs_2_1 = (0x18 & self.w()) >> 2;
        signed(ofs_8 | ofs_7_6 | ofs_5 | ofs_4_3 | ofs_2_1, 9)
    }
    /// c.j / c.jal: `offset[11|4|9:8|10|6|7|3:1|5]`
    pub(crate) fn jump_offset(self) -> i32 {
        let jpt_11 = (0x1000 & self.w()) >> 1;
        let jpt_10 = (0x100 & self.w()) << 2;
        let jpt_9_8 = (0x600 & self.w()) >> 1;
        let jpt_7 = (0x40 & self.w()) << 1;
        let jpt_6 = (0x80 & self.w()) >> 1;
        let jpt_5 = (0x4 & self.w()) << 3;
        let jpt_4 = (0x800 & self.w()) >> 7;
        let jpt_3_1 = (0x38 & self.w()) >> 2;
        signed(
            jpt_11 | jpt_10 | jpt_9_8 | jpt_7 | jpt_6 | jpt_5 | jpt_4 | jpt_3_1,
            12,
        )
    }
}
