//! Spike commit logs.
//!
//! Spike (`--log-commits`) prints up to two lines per retired instruction:
//!
//! ```text
//! core   0: 0x0000000080000000 (0x00000297) auipc   t0, 0x0
//! core   0: 3 0x0000000080000000 (0x00000297) x 5 0x0000000080000000
//! ```
//!
//! The first one carries Spike's own disassembly, the second one the privilege level and
//! the architectural effects of the instruction. Either may be missing.

use std::io::BufRead;

use eyre::{Context, OptionExt, Result, bail};
use rvdsm::{DecodeError, Decoder, Disassembly};
use tracing::debug;

/// A register, floating point register or CSR written by an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegWrite {
    pub reg: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemAccess {
    pub addr: u64,
    /// Present for stores.
    pub value: Option<u64>,
}

/// One retired instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub pc: u64,
    pub word: u64,
    /// What the simulator printed for the instruction, if it did.
    pub spike_text: Option<String>,
    pub writes: Vec<RegWrite>,
    pub mem: Vec<MemAccess>,
}

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Instruction {
        pc: u64,
        word: u64,
        text: String,
    },
    Commit {
        pc: u64,
        word: u64,
        writes: Vec<RegWrite>,
        mem: Vec<MemAccess>,
    },
}

fn parse_hex(token: &str) -> Result<u64> {
    let digits = token
        .strip_prefix("0x")
        .ok_or_else(|| eyre::eyre!("expected a 0x prefixed number, found '{token}'"))?;
    u64::from_str_radix(digits, 16).wrap_err_with(|| format!("invalid hex number '{token}'"))
}

fn parse_word(token: &str) -> Result<u64> {
    let inner = token
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| eyre::eyre!("expected a parenthesized instruction word, found '{token}'"))?;
    parse_hex(inner)
}

/// `Ok(None)` for lines that are not part of the instruction stream.
fn parse_line(line: &str) -> Result<Option<Line>> {
    let Some(rest) = line.trim_start().strip_prefix("core") else {
        return Ok(None);
    };
    let Some((hart, rest)) = rest.split_once(':') else {
        return Ok(None);
    };
    if hart.trim().parse::<u32>().is_err() {
        return Ok(None);
    }

    let mut tokens = rest.split_whitespace().peekable();
    let Some(first) = tokens.next() else {
        return Ok(None);
    };

    if first.starts_with("0x") {
        let pc = parse_hex(first)?;
        let word = parse_word(tokens.next().ok_or_eyre("missing instruction word")?)?;
        let text = tokens.collect::<Vec<_>>().join(" ");
        return Ok(Some(Line::Instruction { pc, word, text }));
    }

    if first.parse::<u8>().is_err() {
        // "core 0: exception ..." and friends
        return Ok(None);
    }
    let pc = parse_hex(tokens.next().ok_or_eyre("missing pc")?)?;
    let word = parse_word(tokens.next().ok_or_eyre("missing instruction word")?)?;

    let mut writes = Vec::new();
    let mut mem = Vec::new();
    while let Some(token) = tokens.next() {
        if token == "mem" {
            let addr = parse_hex(tokens.next().ok_or_eyre("missing memory address")?)?;
            let value = match tokens.next_if(|t| t.starts_with("0x")) {
                Some(value) => Some(parse_hex(value)?),
                None => None,
            };
            mem.push(MemAccess { addr, value });
            continue;
        }
        // `x 5` is how single digit registers are padded
        let reg = match token {
            "x" | "f" => {
                let index = tokens.next().ok_or_eyre("missing register number")?;
                format!("{token}{index}")
            }
            _ => token.to_owned(),
        };
        let value = parse_hex(
            tokens
                .next()
                .ok_or_else(|| eyre::eyre!("missing value written to {reg}"))?,
        )?;
        writes.push(RegWrite { reg, value });
    }

    Ok(Some(Line::Commit {
        pc,
        word,
        writes,
        mem,
    }))
}

/// Reads all entries of a commit log.
///
/// A commit line following the instruction line of the same pc and word completes
/// that entry. Any other commit line is an entry of its own.
pub fn read_trace(reader: impl BufRead) -> Result<Vec<TraceEntry>> {
    let mut entries: Vec<TraceEntry> = Vec::new();
    let mut awaiting_commit = false;

    for (i, line) in reader.lines().enumerate() {
        let lineno = i + 1;
        let line = line.wrap_err_with(|| format!("reading line {lineno}"))?;
        let parsed = parse_line(&line).wrap_err_with(|| format!("malformed line {lineno}"))?;

        match parsed {
            Some(Line::Instruction { pc, word, text }) => {
                entries.push(TraceEntry {
                    pc,
                    word,
                    spike_text: Some(text),
                    writes: Vec::new(),
                    mem: Vec::new(),
                });
                awaiting_commit = true;
            }
            Some(Line::Commit {
                pc,
                word,
                writes,
                mem,
            }) => {
                match entries.last_mut() {
                    Some(last) if awaiting_commit && last.pc == pc && last.word == word => {
                        last.writes = writes;
                        last.mem = mem;
                    }
                    _ => entries.push(TraceEntry {
                        pc,
                        word,
                        spike_text: None,
                        writes,
                        mem,
                    }),
                }
                awaiting_commit = false;
            }
            None => debug!(lineno, "skipping line"),
        }
    }

    Ok(entries)
}

/// A trace entry, its disassembly and where execution continued.
#[derive(Debug)]
pub struct Step {
    pub entry: TraceEntry,
    pub disassembly: Result<Disassembly, DecodeError>,
    /// The pc of the following entry. `None` for the last one.
    pub next_pc: Option<u64>,
}

impl Step {
    /// Whether the instruction did not fall through to the next one.
    pub fn is_taken_jump(&self) -> bool {
        let len = rvdsm::instruction_len(self.entry.word as u16) as u64;
        self.next_pc
            .is_some_and(|next| next != self.entry.pc.wrapping_add(len))
    }
}

pub fn steps(entries: Vec<TraceEntry>, decoder: Decoder) -> impl Iterator<Item = Step> {
    let next_pcs: Vec<Option<u64>> = entries
        .iter()
        .skip(1)
        .map(|entry| Some(entry.pc))
        .chain(std::iter::once(None))
        .collect();
    entries
        .into_iter()
        .zip(next_pcs)
        .map(move |(entry, next_pc)| Step {
            disassembly: decoder.decode(entry.word, entry.pc),
            entry,
            next_pc,
        })
}

/// Fails on the first step that does not decode.
pub fn check_decodable(steps: &[Step]) -> Result<()> {
    for step in steps {
        if let Err(err) = &step.disassembly {
            bail!(
                "unsupported instruction at {:#x}: {err} ({})",
                step.entry.pc,
                step.entry.spike_text.as_deref().unwrap_or("no spike disassembly")
            );
        }
    }
    Ok(())
}
