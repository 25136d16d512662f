use std::fs::File;
use std::io::{BufReader, BufWriter, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use eyre::{Context, Result};
use rvdsm::{Decoder, RegNames, Xlen};
use rvtrace::elf::Elf;
use rvtrace::listing::Listing;
use rvtrace::render::Style;
use rvtrace::trace;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
struct Args {
    /// Decode as RV32 instead of RV64 (or the class of the ELF file)
    #[clap(long, global = true)]
    rv32: bool,

    /// Print ABI register names instead of x0..x31
    #[clap(long, global = true)]
    abi: bool,

    /// When to color the output
    #[clap(long, global = true, value_enum, value_name = "WHEN", default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Decode instruction words given in hex
    Word {
        #[clap(required = true, value_name = "HEX", value_parser = parse_hex)]
        words: Vec<u64>,

        /// Address of the first word
        #[clap(long, value_name = "HEX", value_parser = parse_hex, default_value = "0")]
        pc: u64,
    },
    /// Decode every instruction of a Spike commit log
    Trace {
        file: PathBuf,

        /// Report undecodable instructions and continue instead of failing
        #[clap(long)]
        keep_going: bool,
    },
    /// Disassemble the executable segments of an ELF file
    Elf { file: PathBuf },
}

fn parse_hex(s: &str) -> Result<u64, std::num::ParseIntError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(&digits.replace('_', ""), 16)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let style = Style {
        color: match args.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::stdout().is_terminal(),
        },
    };
    let reg_names = if args.abi {
        RegNames::Abi
    } else {
        RegNames::Numeric
    };
    let xlen = args.rv32.then_some(Xlen::Rv32);

    let mut out = BufWriter::new(std::io::stdout().lock());

    match args.command {
        Command::Word { words, pc } => {
            let decoder = Decoder::new(xlen.unwrap_or_default()).with_reg_names(reg_names);
            let mut pc = pc;
            for word in words {
                style.write_line(&mut out, pc, word, &decoder.decode(word, pc))?;
                writeln!(out)?;
                pc = pc.wrapping_add(rvdsm::instruction_len(word as u16) as u64);
            }
        }
        Command::Trace { file, keep_going } => {
            let decoder = Decoder::new(xlen.unwrap_or_default()).with_reg_names(reg_names);
            let reader = File::open(&file)
                .wrap_err_with(|| format!("opening {}", file.display()))?;
            let entries = trace::read_trace(BufReader::new(reader))
                .wrap_err_with(|| format!("reading {}", file.display()))?;
            info!(entries = entries.len(), xlen = ?decoder.xlen(), "read trace");

            let steps: Vec<_> = trace::steps(entries, decoder).collect();
            if !keep_going {
                trace::check_decodable(&steps)?;
            }

            let mut unsupported = 0usize;
            for step in &steps {
                if let Err(err) = &step.disassembly {
                    warn!("unsupported instruction at {:#x}: {err}", step.entry.pc);
                    unsupported += 1;
                }
                style.write_line(&mut out, step.entry.pc, step.entry.word, &step.disassembly)?;
                if !step.entry.writes.is_empty() {
                    let writes = step
                        .entry
                        .writes
                        .iter()
                        .map(|w| format!("{}={:#x}", w.reg, w.value))
                        .collect::<Vec<_>>()
                        .join(" ");
                    style.write_note(&mut out, &writes)?;
                }
                if let Some(next_pc) = step.next_pc.filter(|_| step.is_taken_jump()) {
                    style.write_note(&mut out, &format!("-> {next_pc:#x}"))?;
                }
                writeln!(out)?;
            }
            info!(steps = steps.len(), unsupported, "decoded trace");
        }
        Command::Elf { file } => {
            let content =
                std::fs::read(&file).wrap_err_with(|| format!("reading {}", file.display()))?;
            let elf = Elf { content: &content };
            let header = elf.header()?;
            let decoder = Decoder::new(xlen.unwrap_or(header.class.xlen())).with_reg_names(reg_names);
            info!(
                class = ?header.class,
                xlen = ?decoder.xlen(),
                entry = header.e_entry.0,
                "read elf header"
            );

            for segment in elf.executable_segments()? {
                info!(
                    vaddr = segment.vaddr.0,
                    size = segment.bytes.len(),
                    "disassembling segment"
                );
                writeln!(out, "segment {:#x}:", segment.vaddr.0)?;
                let mut listing = Listing::new(decoder, segment.vaddr.0, segment.bytes);
                for item in listing.by_ref() {
                    style.write_line(&mut out, item.pc, item.word.into(), &item.disassembly)?;
                    writeln!(out)?;
                }
                if !listing.remainder().is_empty() {
                    warn!(
                        bytes = listing.remainder().len(),
                        "segment ends in a partial instruction"
                    );
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}
