//! The append-only assembly buffer and its label bookkeeping.

use std::collections::HashMap;

use crate::asm::{Instr, Mnemonic, Operand};
use crate::error::{CompileError, ErrorKind, Result};

/// Ordered list of emitted instructions plus a label map.
///
/// Whether labels are erased is decided once, at construction. With label
/// optimization on, `emit_label` records the current instruction index and
/// `render` rewrites every `Label` operand to that index; otherwise labels
/// stay first-class instructions and operands keep their names.
pub struct AsmProgram {
    instrs: Vec<Instr>,
    optimize_labels: bool,
    label_map: HashMap<String, usize>,
    label_count: usize,
}

impl AsmProgram {
    pub fn new(optimize_labels: bool) -> Self {
        AsmProgram {
            instrs: vec![],
            optimize_labels,
            label_map: HashMap::new(),
            label_count: 0,
        }
    }

    /// Returns a fresh `L_<n>` name, unique within this compilation.
    pub fn new_label(&mut self) -> String {
        let label = format!("L_{}", self.label_count);
        self.label_count += 1;
        label
    }

    pub fn emit_label(&mut self, label: &str) {
        if self.optimize_labels {
            // a label after the last instruction resolves one past the end
            self.label_map.insert(label.to_string(), self.instrs.len());
        } else {
            self.instrs.push(Instr::Label(label.to_string()));
        }
    }

    pub fn emit(&mut self, op: Mnemonic, args: Vec<Operand>) {
        self.instrs.push(Instr::Op(op, args));
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// Renders the program, one instruction per line. Fails with
    /// `UnknownLabel` if a label operand cannot be resolved.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        for (i, instr) in self.instrs.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            match instr {
                Instr::Op(op, args) if self.optimize_labels => {
                    out.push_str(op.as_str());
                    for arg in args {
                        out.push(' ');
                        out.push_str(&self.resolve(arg)?.to_string());
                    }
                }
                _ => out.push_str(&instr.to_string()),
            }
        }
        Ok(out)
    }

    fn resolve(&self, operand: &Operand) -> Result<Operand> {
        match operand {
            Operand::Label(name) => match self.label_map.get(name) {
                Some(&index) => Ok(Operand::Number(index as f64)),
                None => Err(CompileError::new(ErrorKind::UnknownLabel(name.clone()))),
            },
            other => Ok(other.clone()),
        }
    }
}
