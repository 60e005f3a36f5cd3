//! Operand and instruction model for the target assembly dialect.

pub mod program;

pub use program::AsmProgram;

use std::fmt;

/// Number of general-purpose registers on the target chip.
pub const NUM_REGISTERS: usize = 15;

/// Index into the register file. Allocation state lives in the compiler's
/// register pool; operands carry only the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg(pub u8);

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// An instruction operand, knowable at runtime by its tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Register(Reg),
    Number(f64),
    Label(String),
    /// `d0`..`d6`, `db`, optionally with a `:n` channel suffix
    Device(String),
    /// A hash the target runtime resolves itself, rendered `HASH("...")`
    HashString(String),
    /// A raw string, e.g. a logic name or an alias
    Str(String),
}

impl Operand {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Operand::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_register(&self) -> Option<Reg> {
        match self {
            Operand::Register(r) => Some(*r),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "{r}"),
            // f64 Display is the shortest round-tripping decimal form and
            // never switches to exponent notation
            Operand::Number(v) => write!(f, "{v}"),
            Operand::Label(name) => write!(f, "{name}"),
            Operand::Device(d) => write!(f, "{d}"),
            Operand::HashString(s) => write!(f, "HASH(\"{s}\")"),
            Operand::Str(s) => write!(f, "{s}"),
        }
    }
}

/// The instruction set of the chip, in the order the dialect documents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Move,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Nor,
    Sge,
    Sgt,
    Sle,
    Slt,
    Seq,
    Sne,
    J,
    Bnez,
    Beqz,
    Sin,
    Cos,
    Tan,
    Mod,
    L,
    Lb,
    Lr,
    Ls,
    S,
    Sb,
    Yield,
    Bge,
    Bgt,
    Ble,
    Blt,
    Beq,
    Bne,
    Abs,
    Acos,
    Asin,
    Atan,
    Ceil,
    Exp,
    Floor,
    Log,
    Max,
    Min,
    Sqrt,
    Round,
    Trunc,
    Rand,
    Sleep,
    Alias,
}

impl Mnemonic {
    pub fn as_str(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Move => "move",
            Add => "add",
            Sub => "sub",
            Mul => "mul",
            Div => "div",
            And => "and",
            Or => "or",
            Xor => "xor",
            Nor => "nor",
            Sge => "sge",
            Sgt => "sgt",
            Sle => "sle",
            Slt => "slt",
            Seq => "seq",
            Sne => "sne",
            J => "j",
            Bnez => "bnez",
            Beqz => "beqz",
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Mod => "mod",
            L => "l",
            Lb => "lb",
            Lr => "lr",
            Ls => "ls",
            S => "s",
            Sb => "sb",
            Yield => "yield",
            Bge => "bge",
            Bgt => "bgt",
            Ble => "ble",
            Blt => "blt",
            Beq => "beq",
            Bne => "bne",
            Abs => "abs",
            Acos => "acos",
            Asin => "asin",
            Atan => "atan",
            Ceil => "ceil",
            Exp => "exp",
            Floor => "floor",
            Log => "log",
            Max => "max",
            Min => "min",
            Sqrt => "sqrt",
            Round => "round",
            Trunc => "trunc",
            Rand => "rand",
            Sleep => "sleep",
            Alias => "alias",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of output: either a label or an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Label(String),
    Op(Mnemonic, Vec<Operand>),
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Label(name) => write!(f, "{name}:"),
            Instr::Op(op, args) => {
                f.write_str(op.as_str())?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
        }
    }
}
