//! µC to Stationeers-MIPS compiler.
//!
//! The pipeline is linear: tokenize each input, parse it, concatenate the
//! top-level declarations, then lower `main` into the assembly buffer and
//! render the result. Compilation is a pure function of the sources and
//! options; nothing is cached between calls.

pub mod asm;
pub mod compiler;
pub mod error;
pub mod hash;
pub mod lexer;
pub mod parse;

pub use error::{CompileError, ErrorKind, Pos};

/// Toggles for the individual optimization passes.
#[derive(Debug, Clone)]
pub struct CompilerOpts {
    /// Erase `L_n:` lines and rewrite label operands to absolute addresses.
    pub optimize_labels: bool,
    /// Evaluate expressions over literals at compile time.
    pub precompute_exprs: bool,
    /// Use fused compare-and-branch instructions and fold literal branches.
    pub optimize_jumps: bool,
    /// Emit one `alias` line per `#define`d device.
    pub emit_device_aliases: bool,
    /// Replace `hash("s")` with its CRC32 value instead of a `HASH` token.
    pub precompute_hashes: bool,
}

impl CompilerOpts {
    /// The `-O2` preset: every optimization on.
    pub fn all() -> Self {
        CompilerOpts {
            optimize_labels: true,
            precompute_exprs: true,
            optimize_jumps: true,
            emit_device_aliases: true,
            precompute_hashes: true,
        }
    }

    /// The `-O0` preset. Alias emission is not an optimization and stays on.
    pub fn none() -> Self {
        CompilerOpts {
            optimize_labels: false,
            precompute_exprs: false,
            optimize_jumps: false,
            emit_device_aliases: true,
            precompute_hashes: false,
        }
    }
}

impl Default for CompilerOpts {
    fn default() -> Self {
        CompilerOpts::all()
    }
}

/// One named input file.
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Source {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Compiles the sources, concatenated in order, to assembly text.
pub fn compile(sources: &[Source], opts: &CompilerOpts) -> Result<String, CompileError> {
    let mut program = parse::Program::default();
    for source in sources {
        let tokens = lexer::tokenize(&source.name, &source.text)?;
        log::debug!("{}: {} tokens", source.name, tokens.len());
        let ast = parse::parse(tokens)?;
        program.top.extend(ast.top);
    }
    log::debug!("parsed {} top-level declarations", program.top.len());
    compiler::compile(&program, opts)
}
