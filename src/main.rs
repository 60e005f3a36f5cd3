use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use ic11c::{CompilerOpts, Source};

#[derive(Parser)]
#[command(
    name = "ic11c",
    version,
    about = "Compile µC source to the MIPS dialect used by Stationeers ICs"
)]
struct Cli {
    /// Input files, concatenated in argument order
    files: Vec<PathBuf>,

    /// Keep L_n: lines instead of resolving labels to absolute addresses
    #[arg(long)]
    emit_labels: bool,

    /// Do not precompute expressions at compile time
    #[arg(long)]
    no_expr_opt: bool,

    /// Do not emit fused jump instructions (bne, bgt, ...)
    #[arg(long)]
    no_jump_opt: bool,

    /// Accepted for compatibility; variable propagation is not performed
    #[arg(long)]
    no_var_opt: bool,

    /// Do not emit device alias instructions
    #[arg(long)]
    no_device_aliases: bool,

    /// Do not precompute hashes at compile time
    #[arg(long)]
    no_compute_hashes: bool,

    /// Optimization preset: 2 enables every pass, anything lower disables them
    #[arg(short = 'O', long = "optimize", default_value_t = 2)]
    optimize: u8,

    /// Output file
    #[arg(short, long, default_value = "a.out")]
    out: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new().filter_level(level).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{} {message}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    if cli.files.is_empty() {
        return Err("no input files".into());
    }

    let mut sources = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
        sources.push(Source::new(path.display().to_string(), text));
    }

    let opts = compiler_opts(cli);
    log::debug!("compiler options: {opts:?}");

    let compiled = ic11c::compile(&sources, &opts).map_err(|e| e.to_string())?;

    fs::write(&cli.out, compiled).map_err(|e| format!("{}: {e}", cli.out.display()))?;
    log::info!("wrote {}", cli.out.display());
    Ok(())
}

fn compiler_opts(cli: &Cli) -> CompilerOpts {
    let mut opts = if cli.optimize == 2 {
        CompilerOpts::all()
    } else {
        CompilerOpts::none()
    };

    if cli.emit_labels {
        opts.optimize_labels = false;
    }
    if cli.no_expr_opt {
        opts.precompute_exprs = false;
    }
    if cli.no_jump_opt {
        opts.optimize_jumps = false;
    }
    if cli.no_device_aliases {
        opts.emit_device_aliases = false;
    }
    if cli.no_compute_hashes {
        opts.precompute_hashes = false;
    }
    if cli.no_var_opt {
        log::debug!("--no-var-opt: variable propagation is already off");
    }

    opts
}
