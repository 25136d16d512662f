//! Disassembly of RISC-V Spike commit logs and ELF executables, built on [`rvdsm`].

pub mod elf;
pub mod listing;
pub mod render;
pub mod trace;
