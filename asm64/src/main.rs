//! Command-line front end for the `asm64-core` assembler engine: argument
//! parsing, filesystem wiring, and colored diagnostic rendering.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use log::info;

use asm64_core::engine::{AssembledOutput, Assembler, Options};
use asm64_core::error::Severity;
use asm64_core::output::{write_image, write_listing, write_vice_labels, OutputFormat};
use asm64_core::source::FsSourceProvider;
use asm64_core::Cpu;

/// Two-pass 6502/6510/65C02 cross-assembler for the Commodore 64.
#[derive(Parser)]
#[command(name = "asm64", author, version, about, long_about = None)]
struct Cli {
    /// Source file to assemble.
    input: PathBuf,

    /// Output image path. Defaults to the input file's name with its
    /// extension replaced by `.prg` (or `.bin` for `-f raw`).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(short = 'f', long, value_enum, default_value_t = FormatArg::Prg)]
    format: FormatArg,

    /// Write a VICE-compatible monitor label file to this path.
    #[arg(short = 's', long)]
    symbols: Option<PathBuf>,

    /// Write an assembly listing to this path.
    #[arg(short = 'l', long)]
    listing: Option<PathBuf>,

    /// Define a symbol as `NAME` or `NAME=VALUE` (decimal or `$hex`).
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    defines: Vec<String>,

    /// Add a directory to the `!source`/`!binary` include search path.
    #[arg(short = 'I', long = "include-dir", value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Target CPU variant.
    #[arg(long, value_enum, default_value_t = CpuArg::Mos6510)]
    cpu: CpuArg,

    /// Annotate the listing with per-instruction cycle counts.
    #[arg(long)]
    cycles: bool,

    /// Increase logging verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum FormatArg {
    Prg,
    Raw,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CpuArg {
    #[value(name = "6502")]
    Mos6502,
    #[value(name = "6510")]
    Mos6510,
    #[value(name = "65c02")]
    Wdc65c02,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}: {}", "asm64".red().bold(), message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let include_dirs = resolve_include_dirs(cli);
    let defines = parse_defines(&cli.defines)?;

    let options = Options {
        cpu: match cli.cpu {
            CpuArg::Mos6502 => Cpu::Mos6502,
            CpuArg::Mos6510 => Cpu::Mos6510,
            CpuArg::Wdc65c02 => Cpu::Wdc65c02,
        },
        format: match cli.format {
            FormatArg::Prg => OutputFormat::Prg,
            FormatArg::Raw => OutputFormat::Raw,
        },
        include_paths: include_dirs,
        defines,
        show_cycles: cli.cycles,
    };

    let provider = FsSourceProvider;
    let mut assembler = Assembler::new(&provider, options);
    let AssembledOutput { segment, listing } = assembler
        .assemble_file(&cli.input)
        .map_err(|e| e.to_string())?;

    for diag in assembler.diagnostics().iter() {
        let rendered = diag.to_string();
        match diag.severity {
            Severity::Error => eprintln!("{}", rendered.red()),
            Severity::Warning => eprintln!("{}", rendered.yellow()),
        }
    }

    if assembler.diagnostics().has_errors() {
        return Err(format!(
            "{} error(s), {} warning(s)",
            assembler.diagnostics().error_count(),
            assembler.diagnostics().warning_count()
        ));
    }

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input, cli.format));
    let image = write_image(&segment, output_format(cli.format));
    std::fs::write(&output_path, &image).map_err(|e| format!("writing {}: {e}", output_path.display()))?;
    info!("wrote {} bytes to {}", image.len(), output_path.display());

    if let Some(symbols_path) = &cli.symbols {
        let text = write_vice_labels(assembler.symbols());
        std::fs::write(symbols_path, text)
            .map_err(|e| format!("writing {}: {e}", symbols_path.display()))?;
    }

    if let Some(listing_path) = &cli.listing {
        let text = write_listing(&listing);
        std::fs::write(listing_path, text)
            .map_err(|e| format!("writing {}: {e}", listing_path.display()))?;
    }

    if assembler.diagnostics().warning_count() > 0 {
        eprintln!(
            "{}",
            format!("{} warning(s)", assembler.diagnostics().warning_count()).yellow()
        );
    }

    Ok(())
}

fn output_format(format: FormatArg) -> OutputFormat {
    match format {
        FormatArg::Prg => OutputFormat::Prg,
        FormatArg::Raw => OutputFormat::Raw,
    }
}

fn default_output_path(input: &Path, format: FormatArg) -> PathBuf {
    let ext = match format {
        FormatArg::Prg => "prg",
        FormatArg::Raw => "bin",
    };
    input.with_extension(ext)
}

/// CLI `-I` directories take priority over the `ASM64_INCLUDE` environment
/// variable (a `:`-separated list), matching the usual "flags override
/// environment" convention.
fn resolve_include_dirs(cli: &Cli) -> Vec<PathBuf> {
    let mut dirs = cli.include_dirs.clone();
    if let Ok(env_value) = std::env::var("ASM64_INCLUDE") {
        for part in env_value.split(':') {
            if !part.is_empty() {
                dirs.push(PathBuf::from(part));
            }
        }
    }
    dirs
}

fn parse_defines(raw: &[String]) -> Result<Vec<(String, i64)>, String> {
    raw.iter()
        .map(|entry| match entry.split_once('=') {
            Some((name, value)) => parse_define_value(value)
                .map(|v| (name.to_string(), v))
                .ok_or_else(|| format!("invalid -D value: '{entry}'")),
            None => Ok((entry.clone(), 1)),
        })
        .collect()
}

fn parse_define_value(text: &str) -> Option<i64> {
    if let Some(hex) = text.strip_prefix('$') {
        i64::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}
