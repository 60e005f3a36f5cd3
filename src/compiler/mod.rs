//! Top-level compilation: symbol gathering, alias emission, lowering of
//! `main`, rendering.

mod fold;
mod func;
mod regs;

use std::collections::HashMap;

use crate::asm::{AsmProgram, Mnemonic, Operand};
use crate::error::{CompileError, ErrorKind, Result};
use crate::parse::{FunBody, FunDec, Program, TopDec};
use crate::CompilerOpts;

use func::FuncCompiler;

/// Compiles a merged program to assembly text.
pub fn compile(program: &Program, opts: &CompilerOpts) -> Result<String> {
    let mut asm = AsmProgram::new(opts.optimize_labels);

    let consts = gather_consts(program);
    let devices = gather_devices(program, opts, &mut asm);
    log::debug!(
        "symbol environment: {} constants, {} device aliases",
        consts.len(),
        devices.len()
    );

    let (main, body) = find_main(program).ok_or_else(|| {
        CompileError::new(ErrorKind::NoMain)
    })?;

    FuncCompiler::new(&mut asm, opts, main, body, &consts, &devices)?.compile()?;
    log::debug!("lowered `main` to {} instructions", asm.len());

    asm.render()
}

/// Numeric `#define`s. The last definition of a name wins.
fn gather_consts(program: &Program) -> HashMap<String, f64> {
    let mut consts = HashMap::new();
    for top in &program.top {
        if let TopDec::DefineNum { name, value, .. } = top {
            consts.insert(name.clone(), *value);
        }
    }
    consts
}

/// Device `#define`s, emitting one `alias` line per definition in source
/// order when enabled.
fn gather_devices(
    program: &Program,
    opts: &CompilerOpts,
    asm: &mut AsmProgram,
) -> HashMap<String, String> {
    let mut devices = HashMap::new();
    for top in &program.top {
        if let TopDec::DefineDevice { name, device, .. } = top {
            devices.insert(name.clone(), device.clone());
            if opts.emit_device_aliases {
                asm.emit(
                    Mnemonic::Alias,
                    vec![Operand::Str(name.clone()), Operand::Device(device.clone())],
                );
            }
        }
    }
    devices
}

/// The first `main` that actually has a body; prototypes do not count.
fn find_main(program: &Program) -> Option<(&FunDec, &FunBody)> {
    program.top.iter().find_map(|top| match top {
        TopDec::Fun(fun) if fun.name == "main" => fun.body.as_ref().map(|body| (fun, body)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parse::parse;

    fn program(src: &str) -> Program {
        parse(tokenize("test.uc", src).unwrap()).unwrap()
    }

    fn compile_src(src: &str, opts: &CompilerOpts) -> Result<String> {
        compile(&program(src), opts)
    }

    #[test]
    fn missing_main_is_fatal() {
        let err = compile_src("void notmain(void) {}", &CompilerOpts::all()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NoMain);
    }

    #[test]
    fn a_prototype_is_not_a_main() {
        let err = compile_src("void main(void);", &CompilerOpts::all()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NoMain);
    }

    #[test]
    fn sixteen_locals_are_too_many() {
        let locals: String = (0..16).map(|i| format!("num v{i}; ")).collect();
        let src = format!("void main(void) {{ {locals} }}");
        let err = compile_src(&src, &CompilerOpts::all()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::TooManyVars);
    }

    #[test]
    fn fifteen_locals_fit() {
        let locals: String = (0..15).map(|i| format!("num v{i}; ")).collect();
        let src = format!("void main(void) {{ {locals} v0 = 1; }}");
        assert_eq!(compile_src(&src, &CompilerOpts::all()).unwrap(), "move r0 1");
    }

    #[test]
    fn aliases_come_before_code_in_source_order() {
        let src = "#define B d1\n#define A d0\nvoid main(void) { yield(); }";
        let out = compile_src(src, &CompilerOpts::all()).unwrap();
        assert_eq!(out, "alias B d1\nalias A d0\nyield");
    }

    #[test]
    fn alias_emission_can_be_suppressed() {
        let mut opts = CompilerOpts::all();
        opts.emit_device_aliases = false;
        let src = "#define A d0\nvoid main(void) { store(A, \"On\", 1); }";
        let out = compile_src(src, &opts).unwrap();
        assert!(!out.contains("alias"));
        // the alias still resolves as a symbol
        assert!(out.contains("s d0"));
    }

    #[test]
    fn constants_shadow_nothing_but_resolve_first() {
        let src = "#define x 4\nvoid main(void) { num x; x = x; }";
        // `x` on the right resolves to the constant, so this moves 4
        let out = compile_src(src, &CompilerOpts::all()).unwrap();
        assert_eq!(out, "move r0 4");
    }

    #[test]
    fn last_define_wins() {
        let src = "#define Limit 1\n#define Limit 2\nvoid main(void) { num a; a = Limit; }";
        let out = compile_src(src, &CompilerOpts::all()).unwrap();
        assert_eq!(out, "move r0 2");
    }

    #[test]
    fn other_functions_are_parsed_and_ignored() {
        let src = "num helper(num x) { x = 1; }\nvoid main(void) { yield(); }";
        let out = compile_src(src, &CompilerOpts::all()).unwrap();
        assert_eq!(out, "yield");
    }

    #[test]
    fn top_level_variables_are_ignored() {
        let src = "num shared;\nvoid main(void) { yield(); }";
        assert_eq!(compile_src(src, &CompilerOpts::all()).unwrap(), "yield");
    }
}
