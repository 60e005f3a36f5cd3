//! Lowering of `main`'s statements and expressions to instructions.

use std::collections::HashMap;

use crate::asm::{AsmProgram, Mnemonic, Operand, Reg};
use crate::compiler::fold::{fold_binop, fold_builtin1, fold_builtin2};
use crate::compiler::regs::RegFile;
use crate::error::{CompileError, ErrorKind, Pos, Result};
use crate::parse::{
    BinOp, Builtin0, Builtin1, Builtin2, Builtin3, Expr, ExprKind, FunBody, FunDec, Stmt, StmtKind,
};
use crate::CompilerOpts;

pub(crate) struct FuncCompiler<'a> {
    asm: &'a mut AsmProgram,
    opts: &'a CompilerOpts,
    body: &'a FunBody,
    consts: &'a HashMap<String, f64>,
    devices: &'a HashMap<String, String>,
    locals: HashMap<String, Reg>,
    regs: RegFile,
}

impl<'a> FuncCompiler<'a> {
    pub fn new(
        asm: &'a mut AsmProgram,
        opts: &'a CompilerOpts,
        fun: &'a FunDec,
        body: &'a FunBody,
        consts: &'a HashMap<String, f64>,
        devices: &'a HashMap<String, String>,
    ) -> Result<Self> {
        // parameters reserve slots too, though only locals are addressable
        let reserved = fun.params.len() + body.locals.len();
        let regs = RegFile::new(reserved)
            .map_err(|kind| CompileError::at(kind, fun.pos.clone()))?;

        let mut locals = HashMap::new();
        for (i, var) in body.locals.iter().enumerate() {
            locals.insert(var.name.clone(), Reg(i as u8));
        }

        Ok(FuncCompiler {
            asm,
            opts,
            body,
            consts,
            devices,
            locals,
            regs,
        })
    }

    pub fn compile(mut self) -> Result<()> {
        for stmt in &self.body.stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    //Statements

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Empty => Ok(()),
            StmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.compile_stmt(stmt)?;
                }
                Ok(())
            }
            StmtKind::Assign { name, value } => self.compile_assignment(name, value, &stmt.pos),
            StmtKind::If {
                cond,
                body,
                else_body,
            } => self.compile_if(cond, body, else_body.as_deref()),
            StmtKind::While { cond, body } => self.compile_while(cond, body),
            StmtKind::Expr(expr) => {
                if let Some(value) = self.compile_expr(expr, None)? {
                    self.release_if_temp(&value);
                }
                Ok(())
            }
            // the target has no call/return; `return` is never lowered
            StmtKind::Return(_) => Err(CompileError::at(ErrorKind::InvalidState, stmt.pos.clone())),
        }
    }

    fn compile_assignment(&mut self, name: &str, value: &Expr, pos: &Pos) -> Result<()> {
        let dest = *self
            .locals
            .get(name)
            .ok_or_else(|| CompileError::at(ErrorKind::UnknownVar(name.into()), pos.clone()))?;

        let out = self.compile_expr(value, Some(dest))?;
        match out {
            // a void builtin on the right keeps its side effect and moves nothing
            None => Ok(()),
            Some(Operand::Register(r)) if r == dest => Ok(()),
            Some(value) => {
                self.asm.emit(
                    Mnemonic::Move,
                    vec![Operand::Register(dest), value.clone()],
                );
                self.release_if_temp(&value);
                Ok(())
            }
        }
    }

    fn compile_if(&mut self, cond: &Expr, body: &Stmt, else_body: Option<&Stmt>) -> Result<()> {
        match else_body {
            None => {
                let end = self.asm.new_label();
                self.compile_condition(cond, &end, true)?;
                self.compile_stmt(body)?;
                self.asm.emit_label(&end);
            }
            Some(else_body) => {
                let then_lbl = self.asm.new_label();
                let end = self.asm.new_label();
                self.compile_condition(cond, &then_lbl, false)?;
                self.compile_stmt(else_body)?;
                self.asm.emit(Mnemonic::J, vec![Operand::Label(end.clone())]);
                self.asm.emit_label(&then_lbl);
                self.compile_stmt(body)?;
                self.asm.emit_label(&end);
            }
        }
        Ok(())
    }

    /// Bottom-tested loop: the condition is evaluated once per iteration.
    fn compile_while(&mut self, cond: &Expr, body: &Stmt) -> Result<()> {
        let start = self.asm.new_label();
        let end_of_body = self.asm.new_label();
        self.asm
            .emit(Mnemonic::J, vec![Operand::Label(end_of_body.clone())]);
        self.asm.emit_label(&start);
        self.compile_stmt(body)?;
        self.asm.emit_label(&end_of_body);
        self.compile_condition(cond, &start, false)
    }

    //Conditions and jumps

    /// Emits the branch(es) sending control to `target` when the condition
    /// holds (`invert == false`) or fails to hold (`invert == true`).
    fn compile_condition(&mut self, cond: &Expr, target: &str, invert: bool) -> Result<()> {
        if self.opts.optimize_jumps {
            if let ExprKind::Binary { op, lhs, rhs } = &cond.kind {
                if op.is_comparison() {
                    let l = require_value(self.compile_expr(lhs, None)?, &lhs.pos)?;
                    let r = require_value(self.compile_expr(rhs, None)?, &rhs.pos)?;

                    if self.opts.precompute_exprs {
                        if let (Some(lv), Some(rv)) = (l.as_number(), r.as_number()) {
                            let v = fold_binop(*op, lv, rv)
                                .map_err(|kind| CompileError::at(kind, cond.pos.clone()))?;
                            self.compile_jump(Operand::Number(v), target, invert);
                            return Ok(());
                        }
                    }

                    let branch_op = if invert { complement(*op) } else { *op };
                    self.asm.emit(
                        branch_mnemonic(branch_op),
                        vec![l.clone(), r.clone(), Operand::Label(target.into())],
                    );
                    self.release_if_temp(&l);
                    self.release_if_temp(&r);
                    return Ok(());
                }
            }
        }

        let cond_value = require_value(self.compile_expr(cond, None)?, &cond.pos)?;
        self.compile_jump(cond_value, target, invert);
        Ok(())
    }

    fn compile_jump(&mut self, cond: Operand, target: &str, invert: bool) {
        if self.opts.optimize_jumps {
            if let Some(v) = cond.as_number() {
                if (v != 0.0) ^ invert {
                    self.asm
                        .emit(Mnemonic::J, vec![Operand::Label(target.into())]);
                }
                return;
            }
        }

        let mnemonic = if invert {
            Mnemonic::Beqz
        } else {
            Mnemonic::Bnez
        };
        self.asm
            .emit(mnemonic, vec![cond.clone(), Operand::Label(target.into())]);
        self.release_if_temp(&cond);
    }

    //Expressions

    /// Lowers one expression. `out` is the register the caller would like
    /// the value in; the value is NOT guaranteed to land there, the returned
    /// operand is authoritative. `None` means the expression was void.
    fn compile_expr(&mut self, expr: &Expr, out: Option<Reg>) -> Result<Option<Operand>> {
        match &expr.kind {
            ExprKind::Number(v) => Ok(Some(Operand::Number(*v))),
            ExprKind::Str(s) => Ok(Some(Operand::Str(s.clone()))),
            ExprKind::Device(d) => Ok(Some(Operand::Device(d.clone()))),
            ExprKind::Ident(name) => self.resolve_symbol(name, &expr.pos).map(Some),
            ExprKind::Hash(s) => {
                if self.opts.precompute_hashes {
                    Ok(Some(Operand::Number(f64::from(crate::hash::hash32_signed(
                        s,
                    )))))
                } else {
                    Ok(Some(Operand::HashString(s.clone())))
                }
            }
            ExprKind::Neg(rhs) => self.compile_neg(rhs, &expr.pos, out),
            ExprKind::Binary { op, lhs, rhs } => self.compile_binary(*op, lhs, rhs, &expr.pos, out),
            ExprKind::Builtin0(op) => self.compile_builtin0(*op, &expr.pos, out),
            ExprKind::Builtin1 { op, arg } => self.compile_builtin1(*op, arg, &expr.pos, out),
            ExprKind::Builtin2 { op, arg1, arg2 } => {
                self.compile_builtin2(*op, arg1, arg2, &expr.pos, out)
            }
            ExprKind::Builtin3 {
                op,
                arg1,
                arg2,
                arg3,
            } => self.compile_builtin3(*op, arg1, arg2, arg3, &expr.pos, out),
            ExprKind::Call { name, .. } => Err(CompileError::at(
                ErrorKind::InvalidFuncCall(format!("`{name}` is not a builtin; only `main` is compiled")),
                expr.pos.clone(),
            )),
        }
    }

    /// Lookup order: constant, then device alias, then local register.
    fn resolve_symbol(&self, name: &str, pos: &Pos) -> Result<Operand> {
        if let Some(&value) = self.consts.get(name) {
            return Ok(Operand::Number(value));
        }
        if let Some(device) = self.devices.get(name) {
            return Ok(Operand::Device(device.clone()));
        }
        if let Some(&reg) = self.locals.get(name) {
            return Ok(Operand::Register(reg));
        }
        Err(CompileError::at(
            ErrorKind::UnknownVar(name.into()),
            pos.clone(),
        ))
    }

    fn compile_neg(&mut self, rhs: &Expr, pos: &Pos, out: Option<Reg>) -> Result<Option<Operand>> {
        let value = require_value(self.compile_expr(rhs, out)?, pos)?;

        if self.opts.precompute_exprs {
            if let Some(v) = value.as_number() {
                return Ok(Some(Operand::Number(-v)));
            }
        }

        let target = match out {
            Some(r) => r,
            None => self.alloc_temp(pos)?,
        };
        self.asm.emit(
            Mnemonic::Move,
            vec![Operand::Register(target), value.clone()],
        );
        self.asm.emit(
            Mnemonic::Sub,
            vec![
                Operand::Register(target),
                Operand::Number(0.0),
                Operand::Register(target),
            ],
        );
        self.release_other_temp(&value, target);
        Ok(Some(Operand::Register(target)))
    }

    fn compile_binary(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        pos: &Pos,
        out: Option<Reg>,
    ) -> Result<Option<Operand>> {
        // the hint may flow into a side only while the other side cannot
        // emit code, otherwise the hinted register could be clobbered
        // before both operands are read
        let left_hint = match rhs.kind {
            ExprKind::Number(_) => out,
            _ => None,
        };
        let right_hint = match lhs.kind {
            ExprKind::Number(_) => out,
            _ => None,
        };

        let l = require_value(self.compile_expr(lhs, left_hint)?, &lhs.pos)?;
        let r = require_value(self.compile_expr(rhs, right_hint)?, &rhs.pos)?;

        if self.opts.precompute_exprs {
            if let (Some(lv), Some(rv)) = (l.as_number(), r.as_number()) {
                let v = fold_binop(op, lv, rv)
                    .map_err(|kind| CompileError::at(kind, pos.clone()))?;
                return Ok(Some(Operand::Number(v)));
            }
        }

        let target = match out {
            Some(r) => r,
            None => self
                .temp_of(&l)
                .or_else(|| self.temp_of(&r))
                .map(Ok)
                .unwrap_or_else(|| self.alloc_temp(pos))?,
        };

        self.asm.emit(
            binop_mnemonic(op),
            vec![Operand::Register(target), l.clone(), r.clone()],
        );
        self.release_other_temp(&l, target);
        self.release_other_temp(&r, target);
        Ok(Some(Operand::Register(target)))
    }

    fn compile_builtin0(
        &mut self,
        op: Builtin0,
        pos: &Pos,
        out: Option<Reg>,
    ) -> Result<Option<Operand>> {
        match op {
            Builtin0::Yield => {
                self.asm.emit(Mnemonic::Yield, vec![]);
                Ok(None)
            }
            Builtin0::Rand => {
                let target = match out {
                    Some(r) => r,
                    None => self.alloc_temp(pos)?,
                };
                self.asm
                    .emit(Mnemonic::Rand, vec![Operand::Register(target)]);
                Ok(Some(Operand::Register(target)))
            }
        }
    }

    fn compile_builtin1(
        &mut self,
        op: Builtin1,
        arg: &Expr,
        pos: &Pos,
        out: Option<Reg>,
    ) -> Result<Option<Operand>> {
        if op == Builtin1::Sleep {
            let value = require_value(self.compile_expr(arg, None)?, pos)?;
            self.asm.emit(Mnemonic::Sleep, vec![value.clone()]);
            self.release_if_temp(&value);
            return Ok(None);
        }

        let value = require_value(self.compile_expr(arg, out)?, pos)?;

        if self.opts.precompute_exprs {
            if let Some(v) = value.as_number() {
                if let Some(folded) = fold_builtin1(op, v) {
                    return Ok(Some(Operand::Number(folded)));
                }
            }
        }

        let target = match out {
            Some(r) => r,
            // the argument's temporary can hold the result directly
            None => match self.temp_of(&value) {
                Some(r) => r,
                None => self.alloc_temp(pos)?,
            },
        };
        self.asm.emit(
            builtin1_mnemonic(op),
            vec![Operand::Register(target), value.clone()],
        );
        self.release_other_temp(&value, target);
        Ok(Some(Operand::Register(target)))
    }

    fn compile_builtin2(
        &mut self,
        op: Builtin2,
        arg1: &Expr,
        arg2: &Expr,
        pos: &Pos,
        out: Option<Reg>,
    ) -> Result<Option<Operand>> {
        let a1 = require_value(self.compile_expr(arg1, None)?, &arg1.pos)?;
        let a2 = require_value(self.compile_expr(arg2, None)?, &arg2.pos)?;

        if op == Builtin2::Load {
            require_device("load", &a1, &arg1.pos)?;
            require_key("load", &a2, &arg2.pos)?;
        } else if self.opts.precompute_exprs {
            if let (Some(lv), Some(rv)) = (a1.as_number(), a2.as_number()) {
                if let Some(folded) = fold_builtin2(op, lv, rv) {
                    return Ok(Some(Operand::Number(folded)));
                }
            }
        }

        let target = match out {
            Some(r) => r,
            None => self
                .temp_of(&a1)
                .or_else(|| self.temp_of(&a2))
                .map(Ok)
                .unwrap_or_else(|| self.alloc_temp(pos))?,
        };
        self.asm.emit(
            builtin2_mnemonic(op),
            vec![Operand::Register(target), a1.clone(), a2.clone()],
        );
        self.release_other_temp(&a1, target);
        self.release_other_temp(&a2, target);
        Ok(Some(Operand::Register(target)))
    }

    fn compile_builtin3(
        &mut self,
        op: Builtin3,
        arg1: &Expr,
        arg2: &Expr,
        arg3: &Expr,
        pos: &Pos,
        out: Option<Reg>,
    ) -> Result<Option<Operand>> {
        let a1 = require_value(self.compile_expr(arg1, None)?, &arg1.pos)?;
        let a2 = require_value(self.compile_expr(arg2, None)?, &arg2.pos)?;
        let a3 = require_value(self.compile_expr(arg3, None)?, &arg3.pos)?;

        match op {
            Builtin3::Store => {
                require_device("store", &a1, &arg1.pos)?;
                require_key("store", &a2, &arg2.pos)?;
                self.asm
                    .emit(Mnemonic::S, vec![a1.clone(), a2.clone(), a3.clone()]);
                self.release_if_temp(&a1);
                self.release_if_temp(&a2);
                self.release_if_temp(&a3);
                Ok(None)
            }
            Builtin3::StoreBatch => {
                require_type_hash("store_batch", &a1, &arg1.pos)?;
                self.asm
                    .emit(Mnemonic::Sb, vec![a1.clone(), a2.clone(), a3.clone()]);
                self.release_if_temp(&a1);
                self.release_if_temp(&a2);
                self.release_if_temp(&a3);
                Ok(None)
            }
            Builtin3::LoadBatch => {
                require_type_hash("load_batch", &a1, &arg1.pos)?;
                let target = match out {
                    Some(r) => r,
                    None => self.alloc_temp(pos)?,
                };
                self.asm.emit(
                    Mnemonic::Lb,
                    vec![
                        Operand::Register(target),
                        a1.clone(),
                        a2.clone(),
                        a3.clone(),
                    ],
                );
                self.release_other_temp(&a1, target);
                self.release_other_temp(&a2, target);
                self.release_other_temp(&a3, target);
                Ok(Some(Operand::Register(target)))
            }
        }
    }

    //Operand helpers

    fn alloc_temp(&mut self, pos: &Pos) -> Result<Reg> {
        self.regs
            .alloc_temp()
            .map_err(|kind| CompileError::at(kind, pos.clone()))
    }

    fn temp_of(&self, operand: &Operand) -> Option<Reg> {
        operand.as_register().filter(|&r| self.regs.is_temp(r))
    }

    fn release_if_temp(&mut self, operand: &Operand) {
        if let Some(r) = self.temp_of(operand) {
            self.regs.release(r);
        }
    }

    /// Releases the operand's temporary unless it is the result register.
    fn release_other_temp(&mut self, operand: &Operand, target: Reg) {
        if let Some(r) = self.temp_of(operand) {
            if r != target {
                self.regs.release(r);
            }
        }
    }
}

fn require_value(value: Option<Operand>, pos: &Pos) -> Result<Operand> {
    value.ok_or_else(|| CompileError::at(ErrorKind::InvalidState, pos.clone()))
}

fn require_device(what: &str, operand: &Operand, pos: &Pos) -> Result<()> {
    match operand {
        Operand::Device(_) => Ok(()),
        _ => Err(CompileError::at(
            ErrorKind::InvalidFuncCall(format!(
                "`{what}` expects a device as its first argument"
            )),
            pos.clone(),
        )),
    }
}

fn require_key(what: &str, operand: &Operand, pos: &Pos) -> Result<()> {
    match operand {
        Operand::Str(_) | Operand::HashString(_) | Operand::Number(_) => Ok(()),
        _ => Err(CompileError::at(
            ErrorKind::InvalidFuncCall(format!(
                "`{what}` expects a logic name or hash as its second argument"
            )),
            pos.clone(),
        )),
    }
}

fn require_type_hash(what: &str, operand: &Operand, pos: &Pos) -> Result<()> {
    match operand {
        Operand::Str(_) | Operand::HashString(_) | Operand::Number(_) => Ok(()),
        _ => Err(CompileError::at(
            ErrorKind::InvalidFuncCall(format!(
                "`{what}` expects a device type hash as its first argument"
            )),
            pos.clone(),
        )),
    }
}

fn binop_mnemonic(op: BinOp) -> Mnemonic {
    match op {
        BinOp::Add => Mnemonic::Add,
        BinOp::Sub => Mnemonic::Sub,
        BinOp::Mul => Mnemonic::Mul,
        BinOp::Div => Mnemonic::Div,
        BinOp::Gt => Mnemonic::Sgt,
        BinOp::Ge => Mnemonic::Sge,
        BinOp::Lt => Mnemonic::Slt,
        BinOp::Le => Mnemonic::Sle,
        BinOp::Eq => Mnemonic::Seq,
        BinOp::Ne => Mnemonic::Sne,
        BinOp::And => Mnemonic::And,
        BinOp::Or => Mnemonic::Or,
    }
}

/// Fused branch instruction for a comparison operator.
fn branch_mnemonic(op: BinOp) -> Mnemonic {
    match op {
        BinOp::Gt => Mnemonic::Bgt,
        BinOp::Ge => Mnemonic::Bge,
        BinOp::Lt => Mnemonic::Blt,
        BinOp::Le => Mnemonic::Ble,
        BinOp::Eq => Mnemonic::Beq,
        BinOp::Ne => Mnemonic::Bne,
        _ => unreachable!("not a comparison: {op:?}"),
    }
}

/// The comparison testing the opposite outcome.
fn complement(op: BinOp) -> BinOp {
    match op {
        BinOp::Gt => BinOp::Le,
        BinOp::Ge => BinOp::Lt,
        BinOp::Lt => BinOp::Ge,
        BinOp::Le => BinOp::Gt,
        BinOp::Eq => BinOp::Ne,
        BinOp::Ne => BinOp::Eq,
        _ => unreachable!("not a comparison: {op:?}"),
    }
}

fn builtin1_mnemonic(op: Builtin1) -> Mnemonic {
    match op {
        Builtin1::Sin => Mnemonic::Sin,
        Builtin1::Cos => Mnemonic::Cos,
        Builtin1::Tan => Mnemonic::Tan,
        Builtin1::Abs => Mnemonic::Abs,
        Builtin1::Acos => Mnemonic::Acos,
        Builtin1::Asin => Mnemonic::Asin,
        Builtin1::Atan => Mnemonic::Atan,
        Builtin1::Ceil => Mnemonic::Ceil,
        Builtin1::Floor => Mnemonic::Floor,
        Builtin1::Log => Mnemonic::Log,
        Builtin1::Sqrt => Mnemonic::Sqrt,
        Builtin1::Round => Mnemonic::Round,
        Builtin1::Trunc => Mnemonic::Trunc,
        Builtin1::Sleep => unreachable!("sleep is emitted without a target"),
    }
}

fn builtin2_mnemonic(op: Builtin2) -> Mnemonic {
    match op {
        Builtin2::Load => Mnemonic::L,
        Builtin2::Mod => Mnemonic::Mod,
        Builtin2::Xor => Mnemonic::Xor,
        Builtin2::Nor => Mnemonic::Nor,
        Builtin2::Max => Mnemonic::Max,
        Builtin2::Min => Mnemonic::Min,
    }
}
