//! Encoding tables.
//!
//! Every opcode maps to a tree of discriminators. The tree is walked from the root,
//! each [`Entry::Node`] naming the field it is keyed by. A [`Entry::Leaf`] ends the walk
//! and absorbs any remaining discriminator bits.

/// Instruction format, selecting the handler that renders the operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    I,
    R,
    R4,
    S,
    B,
    U,
    J,
    /// Floating point loads, stores and `OP-FP`.
    Fdq,
    Cr,
    Ci,
    Css,
    Ciw,
    Cl,
    Cs,
    Ca,
    Cb,
    Cj,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Leaf {
    pub(crate) mnemonic: &'static str,
    /// Only compressed leaves carry a format, standard ones get it from the opcode.
    pub(crate) format: Option<Format>,
}

#[derive(Debug)]
pub(crate) enum Entry<K: 'static> {
    Leaf(Leaf),
    Node(K, &'static [(u32, Entry<K>)]),
}

impl<K> Entry<K> {
    pub(crate) fn lookup(
        children: &'static [(u32, Entry<K>)],
        value: u32,
    ) -> Option<&'static Entry<K>> {
        children.iter().find(|(v, _)| *v == value).map(|(_, e)| e)
    }

    /// Leaves reachable from this entry, in table order.
    pub(crate) fn leaves(&'static self, out: &mut Vec<&'static Leaf>) {
        match self {
            Entry::Leaf(leaf) => out.push(leaf),
            Entry::Node(_, children) => children.iter().for_each(|(_, e)| e.leaves(out)),
        }
    }
}

/// Discriminators of 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Key {
    Funct2,
    Funct3,
    Funct5,
    Funct6,
    Funct7,
    /// The raw 12-bit I immediate.
    Imm,
}

/// Discriminators of 16-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CKey {
    Funct2,
    Funct3,
    Funct4,
    Funct6,
    /// 32 or 64.
    Xlen,
    RdIsSp,
    NzuimmNonZero,
    Rs2NonZero,
    RdNonZero,
}

macro_rules! leaf {
    ($mnemonic:literal) => {
        Entry::Leaf(Leaf {
            mnemonic: $mnemonic,
            format: None,
        })
    };
    ($mnemonic:literal, $format:ident) => {
        Entry::Leaf(Leaf {
            mnemonic: $mnemonic,
            format: Some(Format::$format),
        })
    };
}

macro_rules! node {
    ($key:path { $($value:expr => $entry:expr),* $(,)? }) => {
        Entry::Node($key, &[$(($value, $entry)),*])
    };
}

/// Opcode, format of everything below it, and the discriminator tree.
pub(crate) const STANDARD: &[(u32, Format, Entry<Key>)] = &[
    (0x03, Format::I, node!(Key::Funct3 {
        0 => leaf!("lb"),
        1 => leaf!("lh"),
        2 => leaf!("lw"),
        3 => leaf!("ld"),
        4 => leaf!("lbu"),
        5 => leaf!("lhu"),
        6 => leaf!("lwu"),
    })),
    (0x07, Format::Fdq, node!(Key::Funct3 {
        2 => leaf!("flw"),
        3 => leaf!("fld"),
        4 => leaf!("flq"),
    })),
    (0x0F, Format::I, node!(Key::Funct3 {
        0 => leaf!("fence"),
        1 => leaf!("fence.i"),
    })),
    (0x13, Format::I, node!(Key::Funct3 {
        0 => leaf!("addi"),
        1 => leaf!("slli"),
        2 => leaf!("slti"),
        3 => leaf!("sltiu"),
        4 => leaf!("xori"),
        5 => node!(Key::Funct6 {
            0x00 => leaf!("srli"),
            0x10 => leaf!("srai"),
        }),
        6 => leaf!("ori"),
        7 => leaf!("andi"),
    })),
    (0x17, Format::U, leaf!("auipc")),
    (0x1B, Format::I, node!(Key::Funct3 {
        0 => leaf!("addiw"),
        1 => leaf!("slliw"),
        5 => node!(Key::Funct6 {
            0x00 => leaf!("srliw"),
            0x10 => leaf!("sraiw"),
        }),
    })),
    (0x23, Format::S, node!(Key::Funct3 {
        0 => leaf!("sb"),
        1 => leaf!("sh"),
        2 => leaf!("sw"),
        3 => leaf!("sd"),
    })),
    (0x27, Format::Fdq, node!(Key::Funct3 {
        2 => leaf!("fsw"),
        3 => leaf!("fsd"),
        4 => leaf!("fsq"),
    })),
    (0x2F, Format::R, node!(Key::Funct3 {
        2 => node!(Key::Funct5 {
            0x02 => leaf!("lr.w"),
            0x03 => leaf!("sc.w"),
            0x01 => leaf!("amoswap.w"),
            0x00 => leaf!("amoadd.w"),
            0x04 => leaf!("amoxor.w"),
            0x0C => leaf!("amoand.w"),
            0x08 => leaf!("amoor.w"),
            0x10 => leaf!("amomin.w"),
            0x14 => leaf!("amomax.w"),
            0x18 => leaf!("amominu.w"),
            0x1C => leaf!("amomaxu.w"),
        }),
        3 => node!(Key::Funct5 {
            0x02 => leaf!("lr.d"),
            0x03 => leaf!("sc.d"),
            0x01 => leaf!("amoswap.d"),
            0x00 => leaf!("amoadd.d"),
            0x04 => leaf!("amoxor.d"),
            0x0C => leaf!("amoand.d"),
            0x08 => leaf!("amoor.d"),
            0x10 => leaf!("amomin.d"),
            0x14 => leaf!("amomax.d"),
            0x18 => leaf!("amominu.d"),
            0x1C => leaf!("amomaxu.d"),
        }),
    })),
    (0x33, Format::R, node!(Key::Funct3 {
        0 => node!(Key::Funct7 { 0x00 => leaf!("add"), 0x01 => leaf!("mul"), 0x20 => leaf!("sub") }),
        1 => node!(Key::Funct7 { 0x00 => leaf!("sll"), 0x01 => leaf!("mulh") }),
        2 => node!(Key::Funct7 { 0x00 => leaf!("slt"), 0x01 => leaf!("mulhsu") }),
        3 => node!(Key::Funct7 { 0x00 => leaf!("sltu"), 0x01 => leaf!("mulhu") }),
        4 => node!(Key::Funct7 { 0x00 => leaf!("xor"), 0x01 => leaf!("div") }),
        5 => node!(Key::Funct7 { 0x00 => leaf!("srl"), 0x01 => leaf!("divu"), 0x20 => leaf!("sra") }),
        6 => node!(Key::Funct7 { 0x00 => leaf!("or"), 0x01 => leaf!("rem") }),
        7 => node!(Key::Funct7 { 0x00 => leaf!("and"), 0x01 => leaf!("remu") }),
    })),
    (0x37, Format::U, leaf!("lui")),
    (0x3B, Format::R, node!(Key::Funct3 {
        0 => node!(Key::Funct7 { 0x00 => leaf!("addw"), 0x01 => leaf!("mulw"), 0x20 => leaf!("subw") }),
        1 => node!(Key::Funct7 { 0x00 => leaf!("sllw") }),
        4 => node!(Key::Funct7 { 0x01 => leaf!("divw") }),
        5 => node!(Key::Funct7 { 0x00 => leaf!("srlw"), 0x01 => leaf!("divuw"), 0x20 => leaf!("sraw") }),
        6 => node!(Key::Funct7 { 0x01 => leaf!("remw") }),
        7 => node!(Key::Funct7 { 0x01 => leaf!("remuw") }),
    })),
    (0x43, Format::R4, node!(Key::Funct2 {
        0 => leaf!("fmadd.s"),
        1 => leaf!("fmadd.d"),
        3 => leaf!("fmadd.q"),
    })),
    (0x47, Format::R4, node!(Key::Funct2 {
        0 => leaf!("fmsub.s"),
        1 => leaf!("fmsub.d"),
        3 => leaf!("fmsub.q"),
    })),
    (0x4B, Format::R4, node!(Key::Funct2 {
        0 => leaf!("fnmsub.s"),
        1 => leaf!("fnmsub.d"),
        3 => leaf!("fnmsub.q"),
    })),
    (0x4F, Format::R4, node!(Key::Funct2 {
        0 => leaf!("fnmadd.s"),
        1 => leaf!("fnmadd.d"),
        3 => leaf!("fnmadd.q"),
    })),
    (0x53, Format::Fdq, OP_FP),
    (0x63, Format::B, node!(Key::Funct3 {
        0 => leaf!("beq"),
        1 => leaf!("bne"),
        4 => leaf!("blt"),
        5 => leaf!("bge"),
        6 => leaf!("bltu"),
        7 => leaf!("bgeu"),
    })),
    (0x67, Format::I, leaf!("jalr")),
    (0x6F, Format::J, leaf!("jal")),
    (0x73, Format::I, node!(Key::Funct3 {
        0 => node!(Key::Funct7 {
            0x00 => node!(Key::Imm { 0x000 => leaf!("ecall"), 0x001 => leaf!("ebreak") }),
            0x08 => node!(Key::Imm { 0x102 => leaf!("sret"), 0x105 => leaf!("wfi") }),
            0x09 => leaf!("sfence.vma"),
            0x11 => leaf!("hfence.vvma"),
            0x18 => node!(Key::Imm { 0x302 => leaf!("mret") }),
            0x31 => leaf!("hfence.gvma"),
            0x3D => node!(Key::Imm { 0x7B2 => leaf!("dret") }),
        }),
        1 => leaf!("csrrw"),
        2 => leaf!("csrrs"),
        3 => leaf!("csrrc"),
        4 => node!(Key::Funct7 {
            0x7E => node!(Key::Imm { 0xFC0 => leaf!("cfi.check") }),
        }),
        5 => leaf!("csrrwi"),
        6 => leaf!("csrrsi"),
        7 => leaf!("csrrci"),
    })),
];

/// `OP-FP` binary operations, keyed by funct7.
const OP_FP: Entry<Key> = node!(Key::Funct7 {
    0x00 => leaf!("fadd.s"),
    0x01 => leaf!("fadd.d"),
    0x03 => leaf!("fadd.q"),
    0x04 => leaf!("fsub.s"),
    0x05 => leaf!("fsub.d"),
    0x07 => leaf!("fsub.q"),
    0x08 => leaf!("fmul.s"),
    0x09 => leaf!("fmul.d"),
    0x0B => leaf!("fmul.q"),
    0x0C => leaf!("fdiv.s"),
    0x0D => leaf!("fdiv.d"),
    0x0F => leaf!("fdiv.q"),
    0x10 => node!(Key::Funct3 { 0 => leaf!("fsgnj.s"), 1 => leaf!("fsgnjn.s"), 2 => leaf!("fsgnjx.s") }),
    0x11 => node!(Key::Funct3 { 0 => leaf!("fsgnj.d"), 1 => leaf!("fsgnjn.d"), 2 => leaf!("fsgnjx.d") }),
    0x13 => node!(Key::Funct3 { 0 => leaf!("fsgnj.q"), 1 => leaf!("fsgnjn.q"), 2 => leaf!("fsgnjx.q") }),
    0x14 => node!(Key::Funct3 { 0 => leaf!("fmin.s"), 1 => leaf!("fmax.s") }),
    0x15 => node!(Key::Funct3 { 0 => leaf!("fmin.d"), 1 => leaf!("fmax.d") }),
    0x17 => node!(Key::Funct3 { 0 => leaf!("fmin.q"), 1 => leaf!("fmax.q") }),
    0x50 => node!(Key::Funct3 { 0 => leaf!("fle.s"), 1 => leaf!("flt.s"), 2 => leaf!("feq.s") }),
    0x51 => node!(Key::Funct3 { 0 => leaf!("fle.d"), 1 => leaf!("flt.d"), 2 => leaf!("feq.d") }),
    0x53 => node!(Key::Funct3 { 0 => leaf!("fle.q"), 1 => leaf!("flt.q"), 2 => leaf!("feq.q") }),
});

/// `OP-FP` unary operations, keyed by the raw immediate (`funct7 << 5 | rs2`).
/// Only consulted when [`OP_FP`] has no entry for the funct7.
pub(crate) static OP_FP_UNARY: Entry<Key> = node!(Key::Imm {
    0x580 => leaf!("fsqrt.s"),
    0x5A0 => leaf!("fsqrt.d"),
    0x5E0 => leaf!("fsqrt.q"),

    0x401 => leaf!("fcvt.s.d"),
    0x420 => leaf!("fcvt.d.s"),
    0x403 => leaf!("fcvt.s.q"),
    0x460 => leaf!("fcvt.q.s"),
    0x423 => leaf!("fcvt.d.q"),
    0x461 => leaf!("fcvt.q.d"),

    0xC00 => leaf!("fcvt.w.s"),
    0xC01 => leaf!("fcvt.wu.s"),
    0xC02 => leaf!("fcvt.l.s"),
    0xC03 => leaf!("fcvt.lu.s"),
    0xC20 => leaf!("fcvt.w.d"),
    0xC21 => leaf!("fcvt.wu.d"),
    0xC22 => leaf!("fcvt.l.d"),
    0xC23 => leaf!("fcvt.lu.d"),
    0xC60 => leaf!("fcvt.w.q"),
    0xC61 => leaf!("fcvt.wu.q"),
    0xC62 => leaf!("fcvt.l.q"),
    0xC63 => leaf!("fcvt.lu.q"),

    0xD00 => leaf!("fcvt.s.w"),
    0xD01 => leaf!("fcvt.s.wu"),
    0xD02 => leaf!("fcvt.s.l"),
    0xD03 => leaf!("fcvt.s.lu"),
    0xD20 => leaf!("fcvt.d.w"),
    0xD21 => leaf!("fcvt.d.wu"),
    0xD22 => leaf!("fcvt.d.l"),
    0xD23 => leaf!("fcvt.d.lu"),
    0xD60 => leaf!("fcvt.q.w"),
    0xD61 => leaf!("fcvt.q.wu"),
    0xD62 => leaf!("fcvt.q.l"),
    0xD63 => leaf!("fcvt.q.lu"),

    0xE00 => node!(Key::Funct3 { 0 => leaf!("fmv.x.w"), 1 => leaf!("fclass.s") }),
    0xE20 => node!(Key::Funct3 { 0 => leaf!("fmv.x.d"), 1 => leaf!("fclass.d") }),
    0xE60 => node!(Key::Funct3 { 1 => leaf!("fclass.q") }),
    0xF00 => leaf!("fmv.w.x"),
    0xF20 => leaf!("fmv.d.x"),
});

/// Compressed quadrants 0, 1 and 2, each keyed by funct3 first.
pub(crate) static COMPRESSED: [Entry<CKey>; 3] = [
    node!(CKey::Funct3 {
        0 => leaf!("c.addi4spn", Ciw),
        1 => leaf!("c.fld", Cl),
        2 => leaf!("c.lw", Cl),
        3 => node!(CKey::Xlen { 32 => leaf!("c.flw", Cl), 64 => leaf!("c.ld", Cl) }),
        5 => leaf!("c.fsd", Cs),
        6 => leaf!("c.sw", Cs),
        7 => node!(CKey::Xlen { 32 => leaf!("c.fsw", Cs), 64 => leaf!("c.sd", Cs) }),
    }),
    node!(CKey::Funct3 {
        0 => leaf!("c.addi", Ci),
        1 => node!(CKey::Xlen { 32 => leaf!("c.jal", Cj), 64 => leaf!("c.addiw", Ci) }),
        2 => leaf!("c.li", Ci),
        3 => node!(CKey::RdIsSp { 0 => leaf!("c.lui", Ci), 1 => leaf!("c.addi16sp", Ci) }),
        4 => node!(CKey::Funct6 {
            0x20 => node!(CKey::NzuimmNonZero { 0 => leaf!("c.srli64", Cb), 1 => leaf!("c.srli", Cb) }),
            0x21 => node!(CKey::NzuimmNonZero { 0 => leaf!("c.srai64", Cb), 1 => leaf!("c.srai", Cb) }),
            0x22 => leaf!("c.andi", Cb),
            0x23 => node!(CKey::Funct2 {
                0 => leaf!("c.sub", Ca),
                1 => leaf!("c.xor", Ca),
                2 => leaf!("c.or", Ca),
                3 => leaf!("c.and", Ca),
            }),
            0x24 => leaf!("c.srli", Cb),
            0x25 => leaf!("c.srai", Cb),
            0x26 => leaf!("c.andi", Cb),
            0x27 => node!(CKey::Funct2 { 0 => leaf!("c.subw", Ca), 1 => leaf!("c.addw", Ca) }),
        }),
        5 => leaf!("c.j", Cj),
        6 => leaf!("c.beqz", Cb),
        7 => leaf!("c.bnez", Cb),
    }),
    node!(CKey::Funct3 {
        0 => node!(CKey::NzuimmNonZero { 0 => leaf!("c.slli64", Ci), 1 => leaf!("c.slli", Ci) }),
        1 => leaf!("c.fldsp", Ci),
        2 => leaf!("c.lwsp", Ci),
        3 => node!(CKey::Xlen { 32 => leaf!("c.flwsp", Ci), 64 => leaf!("c.ldsp", Ci) }),
        4 => node!(CKey::Funct4 {
            0x8 => node!(CKey::Rs2NonZero { 0 => leaf!("c.jr", Cr), 1 => leaf!("c.mv", Cr) }),
            0x9 => node!(CKey::Rs2NonZero {
                0 => node!(CKey::RdNonZero { 0 => leaf!("c.ebreak", Cr), 1 => leaf!("c.jalr", Cr) }),
                1 => leaf!("c.add", Cr),
            }),
        }),
        5 => leaf!("c.fsdsp", Css),
        6 => leaf!("c.swsp", Css),
        7 => node!(CKey::Xlen { 32 => leaf!("c.fswsp", Css), 64 => leaf!("c.sdsp", Css) }),
    }),
];
