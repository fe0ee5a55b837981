use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use riscv_rs::disasm::fmt_instruction;
use riscv_rs::DecoderRegistry;

mod analyze;
mod model;
use analyze::{analyze_entries, Block, Edge, EdgeKind, EdgeOut, FunctionOut, Report};
use model::{is_mapped, load_raw_bin, read_u8, read_u32, Image};

#[derive(Parser, Debug)]
#[command(author, version, about = "RISC-V disassembler CLI", long_about=None)]
struct Cli {
    /// Load address for the binary in target address space
    #[arg(long, default_value_t = 0u32)]
    base: u32,
    /// Skip N bytes at start of file before loading
    #[arg(long, default_value_t = 0usize)]
    skip: usize,
    /// Input binary path
    #[arg(value_name = "BINFILE")]
    input: String,
    /// Limit bytes loaded (default: to EOF after --skip)
    #[arg(long)]
    len: Option<usize>,
    /// Instruction set to decode against
    #[arg(long, value_enum, default_value_t = Xlen::Rv64)]
    xlen: Xlen,
    /// Subcommand
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Xlen {
    Rv32,
    Rv64,
}

impl Xlen {
    fn registry(self) -> DecoderRegistry {
        match self {
            Xlen::Rv32 => DecoderRegistry::rv32i(),
            Xlen::Rv64 => DecoderRegistry::rv64i(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List loaded segments (simple single-segment for raw .bin)
    Sections,
    /// Disassemble a range [start, end) in bytes
    Range {
        /// Start address (hex or dec)
        start: String,
        /// End address (hex or dec, exclusive)
        end: String,
        /// Show instruction bytes
        #[arg(long)]
        show_bytes: bool,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
    /// Analyze code graph from entry points
    Analyze {
        /// Entry addresses (hex or dec). Repeat flag to add multiple entries.
        #[arg(long = "entry", value_name = "ADDR", num_args = 1.., required = false)]
        entries: Vec<String>,
        /// Maximum instructions to decode before stopping
        #[arg(long, default_value_t = 100_000usize)]
        max_instr: usize,
        /// Output format: text or json
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Emit a linear disassembly listing of analyzed code (text format only)
        #[arg(long)]
        listing: bool,
        /// Import labels from JSON (Vec<{ addr, name }>)
        #[arg(long, value_name = "FILE")]
        labels_in: Option<String>,
        /// Export labels to JSON (Vec<{ addr, name }>)
        #[arg(long, value_name = "FILE")]
        labels_out: Option<String>,
        /// Write analysis output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct LabelKV {
    addr: u32,
    name: String,
}

fn parse_u32(s: &str) -> Result<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Ok(u32::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse::<u32>()?)
    }
}

fn render_line(img: &Image, reg: &DecoderRegistry, pc: u32, show_bytes: bool) -> Option<String> {
    use std::fmt::Write as _;
    let raw = read_u32(img, pc)?;
    let insn = reg.decode(raw);
    let mut line = String::new();
    let _ = write!(line, "{pc:#010x}: ");
    if show_bytes {
        for i in 0..4 {
            let _ = write!(line, "{:02x} ", read_u8(img, pc + i).unwrap_or(0));
        }
        let _ = write!(line, "  ");
    }
    if insn.is_valid() {
        let _ = write!(line, "{}", fmt_instruction(&insn));
    } else {
        let _ = write!(line, ".word {raw:#010x}");
    }
    Some(line)
}

fn build_blocks(visited: &HashSet<u32>, entries: &[u32], edges: &[Edge]) -> Vec<Block> {
    // Block starts: entries plus every edge destination; a block runs until
    // the next start or the end of decoded code.
    let mut starts: HashSet<u32> = entries.iter().copied().collect();
    for e in edges {
        starts.insert(e.to);
    }
    let enders: HashSet<u32> = edges
        .iter()
        .filter(|e| !matches!(e.kind, EdgeKind::Fallthrough))
        .map(|e| e.from)
        .collect();
    let mut ordered: Vec<u32> = starts.iter().copied().filter(|a| visited.contains(a)).collect();
    ordered.sort_unstable();
    let mut blocks = Vec::new();
    for &start in &ordered {
        let mut cur = start;
        loop {
            let next = cur.wrapping_add(4);
            if enders.contains(&cur) || !visited.contains(&next) || starts.contains(&next) {
                break;
            }
            cur = next;
        }
        blocks.push(Block { start, end: cur.wrapping_add(4) });
    }
    blocks
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let img = load_raw_bin(Path::new(&cli.input), cli.base, cli.skip, cli.len)?;
    let reg = cli.xlen.registry();

    match cli.cmd {
        Command::Sections => {
            println!("{:<10} {:<12} {:<12} {:<6} {:<6}", "name", "start", "end", "perms", "kind");
            for s in &img.segments {
                let start = s.base;
                let end = s.base + (s.bytes.len() as u32);
                println!(
                    "{:<10} {start:#010x} {end:#010x} {:<6} {:<6}",
                    s.name, s.perms, s.kind
                );
            }
        }
        Command::Range { start, end, show_bytes, out } => {
            let start = parse_u32(&start)?;
            let end = parse_u32(&end)?;
            anyhow::ensure!(end >= start, "end must be >= start");

            let mut buf = String::new();
            let mut pc = start;
            while pc < end {
                match render_line(&img, &reg, pc, show_bytes) {
                    Some(line) => buf.push_str(&line),
                    None => {
                        buf.push_str(&format!("{pc:#010x}: <oob>"));
                        buf.push('\n');
                        break;
                    }
                }
                buf.push('\n');
                pc = pc.wrapping_add(4);
            }
            if let Some(path) = out {
                std::fs::write(path, buf)?;
            } else {
                print!("{buf}");
            }
        }
        Command::Analyze {
            entries,
            max_instr,
            format,
            listing,
            labels_in,
            labels_out,
            out,
        } => {
            // default seed: start of first segment
            let mut seeds: Vec<u32> = if entries.is_empty() {
                img.segments.first().map(|s| s.base).into_iter().collect()
            } else {
                let mut v = Vec::new();
                for e in entries {
                    v.push(parse_u32(&e)?);
                }
                v
            };
            seeds.sort_unstable();
            seeds.dedup();
            let (visited, edges, rets) = analyze_entries(&img, &reg, &seeds, max_instr);
            let blocks = build_blocks(&visited, &seeds, &edges);

            // Functions: entry seeds plus every call target
            let mut fn_entries: HashSet<u32> = seeds.iter().copied().collect();
            for e in &edges {
                if matches!(e.kind, EdgeKind::Call) {
                    fn_entries.insert(e.to);
                }
            }
            let mut fn_entries: Vec<u32> =
                fn_entries.into_iter().filter(|a| is_mapped(&img, *a)).collect();
            fn_entries.sort_unstable();
            let functions: Vec<FunctionOut> = fn_entries
                .iter()
                .enumerate()
                .map(|(i, &entry)| {
                    let limit = fn_entries.get(i + 1).copied().unwrap_or(u32::MAX);
                    FunctionOut {
                        entry,
                        blocks: blocks
                            .iter()
                            .filter(|b| b.start >= entry && b.start < limit)
                            .map(|b| b.start)
                            .collect(),
                    }
                })
                .collect();

            // Labels: imported names win, call targets get fn_ defaults
            let mut labels: HashMap<u32, String> = HashMap::new();
            for &entry in &fn_entries {
                labels.insert(entry, format!("fn_{entry:08x}"));
            }
            if let Some(path) = labels_in {
                let txt = std::fs::read_to_string(path)?;
                if let Ok(v) = serde_json::from_str::<Vec<LabelKV>>(&txt) {
                    for kv in v {
                        labels.insert(kv.addr, kv.name);
                    }
                }
            }

            let edges_out: Vec<EdgeOut> = edges
                .iter()
                .map(|e| EdgeOut { from: e.from, to: e.to, kind: format!("{:?}", e.kind) })
                .collect();
            let report = Report {
                entries: seeds.clone(),
                blocks: blocks.clone(),
                edges: edges_out,
                functions,
            };

            let mut buf = String::new();
            match format {
                OutputFormat::Json => {
                    buf = serde_json::to_string_pretty(&report)?;
                    buf.push('\n');
                }
                OutputFormat::Text => {
                    use std::fmt::Write as _;
                    let _ = writeln!(buf, "entries: {:?}", seeds);
                    let _ = writeln!(buf, "blocks: {}", blocks.len());
                    for b in &blocks {
                        let _ = writeln!(buf, "  [{:#010x}, {:#010x})", b.start, b.end);
                    }
                    let _ = writeln!(buf, "returns: {}", rets.len());
                    if listing {
                        let mut pcs: Vec<u32> = visited.iter().copied().collect();
                        pcs.sort_unstable();
                        for pc in pcs {
                            if let Some(name) = labels.get(&pc) {
                                let _ = writeln!(buf, "{name}:");
                            }
                            if let Some(line) = render_line(&img, &reg, pc, false) {
                                let _ = writeln!(buf, "  {line}");
                            }
                        }
                    }
                }
            }

            if let Some(path) = labels_out {
                let mut arr: Vec<LabelKV> =
                    labels.iter().map(|(&addr, name)| LabelKV { addr, name: name.clone() }).collect();
                arr.sort_by_key(|kv| kv.addr);
                std::fs::write(path, serde_json::to_string_pretty(&arr)?)?;
            }
            if let Some(path) = out {
                std::fs::write(path, buf)?;
            } else {
                print!("{buf}");
            }
        }
    }
    Ok(())
}
