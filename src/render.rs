use std::io::{self, Write};

use owo_colors::OwoColorize;
use rvdsm::{DecodeError, Disassembly};

#[derive(Debug, Clone, Copy, Default)]
pub struct Style {
    pub color: bool,
}

impl Style {
    /// Writes one listing line: address, encoding, assembly and the registers used.
    pub fn write_line(
        self,
        out: &mut impl Write,
        pc: u64,
        word: u64,
        result: &Result<Disassembly, DecodeError>,
    ) -> io::Result<()> {
        write!(out, "{pc:#010x}  ")?;
        if rvdsm::instruction_len(word as u16) == 2 {
            write!(out, "{word:04x}      ")?;
        } else {
            write!(out, "{word:08x}  ")?;
        }

        match result {
            Ok(dsm) => {
                let mnemonic = format!("{:<12}", dsm.mnemonic());
                let operands = format!("{:<28}", dsm.operands());
                let regs = format!("rd={:<2} rs1={:<2} rs2={:<2}", dsm.rd, dsm.rs1, dsm.rs2);
                if self.color {
                    write!(out, "{}{operands}{}", mnemonic.green(), regs.dimmed())
                } else {
                    write!(out, "{mnemonic}{operands}{regs}")
                }
            }
            Err(err) => {
                let unknown = format!("{:<40}", "unknown");
                if self.color {
                    write!(out, "{}# {}", unknown.red(), err.red())
                } else {
                    write!(out, "{unknown}# {err}")
                }
            }
        }
    }

    pub fn write_note(self, out: &mut impl Write, note: &str) -> io::Result<()> {
        if self.color {
            write!(out, "  {}", note.cyan())
        } else {
            write!(out, "  {note}")
        }
    }
}
