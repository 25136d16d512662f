//! Control and status register names.

use std::fmt::{Display, Formatter};

/// Symbolic name of a CSR address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsrName {
    Named(&'static str),
    /// One of a numbered family, like `pmpaddr12` or `hpmcounter5h`.
    Indexed {
        prefix: &'static str,
        index: u32,
        suffix: &'static str,
    },
}

impl Display for CsrName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CsrName::Named(name) => f.write_str(name),
            CsrName::Indexed {
                prefix,
                index,
                suffix,
            } => write!(f, "{prefix}{index}{suffix}"),
        }
    }
}

/// Looks up the name of the CSR at `addr`. Unknown addresses have no name.
pub fn name(addr: u32) -> Option<CsrName> {
    let indexed = |prefix, base, suffix| {
        Some(CsrName::Indexed {
            prefix,
            index: addr - base,
            suffix,
        })
    };
    let named = match addr {
        // unprivileged floating point, vector, entropy and table jump
        0x001 => "fflags",
        0x002 => "frm",
        0x003 => "fcsr",
        0x008 => "vstart",
        0x009 => "vxsat",
        0x00A => "vxrm",
        0x00F => "vcsr",
        0x015 => "seed",
        0x017 => "jvt",
        // unprivileged counters
        0xC00 => "cycle",
        0xC01 => "time",
        0xC02 => "instret",
        0xC03..=0xC1F => return indexed("hpmcounter", 0xC00, ""),
        0xC20 => "vl",
        0xC21 => "vtype",
        0xC22 => "vlenb",
        0xC80 => "cycleh",
        0xC81 => "timeh",
        0xC82 => "instreth",
        0xC83..=0xC9F => return indexed("hpmcounter", 0xC80, "h"),

        // supervisor
        0x100 => "sstatus",
        0x104 => "sie",
        0x105 => "stvec",
        0x106 => "scounteren",
        0x10A => "senvcfg",
        0x10C => "sstateen0",
        0x140 => "sscratch",
        0x141 => "sepc",
        0x142 => "scause",
        0x143 => "stval",
        0x144 => "sip",
        0x14D => "stimecmp",
        0x180 => "satp",
        0x5A8 => "scontext",

        // hypervisor and virtual supervisor
        0x200 => "vsstatus",
        0x204 => "vsie",
        0x205 => "vstvec",
        0x240 => "vsscratch",
        0x241 => "vsepc",
        0x242 => "vscause",
        0x243 => "vstval",
        0x244 => "vsip",
        0x280 => "vsatp",
        0x600 => "hstatus",
        0x602 => "hedeleg",
        0x603 => "hideleg",
        0x604 => "hie",
        0x605 => "htimedelta",
        0x606 => "hcounteren",
        0x607 => "hgeie",
        0x60A => "henvcfg",
        0x643 => "htval",
        0x644 => "hip",
        0x645 => "hvip",
        0x64A => "htinst",
        0x680 => "hgatp",
        0x6A8 => "hcontext",
        0xE12 => "hgeip",

        // machine
        0x300 => "mstatus",
        0x301 => "misa",
        0x302 => "medeleg",
        0x303 => "mideleg",
        0x304 => "mie",
        0x305 => "mtvec",
        0x306 => "mcounteren",
        0x30A => "menvcfg",
        0x310 => "mstatush",
        0x31A => "menvcfgh",
        0x320 => "mcountinhibit",
        0x323..=0x33F => return indexed("mhpmevent", 0x320, ""),
        0x340 => "mscratch",
        0x341 => "mepc",
        0x342 => "mcause",
        0x343 => "mtval",
        0x344 => "mip",
        0x34A => "mtinst",
        0x34B => "mtval2",
        0x3A0..=0x3AF => return indexed("pmpcfg", 0x3A0, ""),
        0x3B0..=0x3EF => return indexed("pmpaddr", 0x3B0, ""),
        0x747 => "mseccfg",
        0xB00 => "mcycle",
        0xB02 => "minstret",
        0xB03..=0xB1F => return indexed("mhpmcounter", 0xB00, ""),
        0xB80 => "mcycleh",
        0xB82 => "minstreth",
        0xB83..=0xB9F => return indexed("mhpmcounter", 0xB80, "h"),
        0xF11 => "mvendorid",
        0xF12 => "marchid",
        0xF13 => "mimpid",
        0xF14 => "mhartid",
        0xF15 => "mconfigptr",

        // trigger and debug mode
        0x7A0 => "tselect",
        0x7A1 => "tdata1",
        0x7A2 => "tdata2",
        0x7A3 => "tdata3",
        0x7A8 => "mcontext",
        0x7B0 => "dcsr",
        0x7B1 => "dpc",
        0x7B2 => "dscratch0",
        0x7B3 => "dscratch1",

        _ => return None,
    };
    Some(CsrName::Named(named))
}
