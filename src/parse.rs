//! AST for µC and the recursive-descent parser producing it.

use crate::error::{CompileError, ErrorKind, Pos, Result};
use crate::lexer::{Token, TokenKind};

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub top: Vec<TopDec>,
}

#[derive(Debug, Clone)]
pub enum TopDec {
    Fun(FunDec),
    DefineNum { name: String, value: f64, pos: Pos },
    DefineDevice { name: String, device: String, pos: Pos },
    Var(VarDec),
}

#[derive(Debug, Clone)]
pub struct VarDec {
    pub name: String,
    pub pos: Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunRet {
    Num,
    Void,
}

#[derive(Debug, Clone)]
pub struct FunDec {
    pub ret: FunRet,
    pub name: String,
    pub params: Vec<VarDec>,
    /// `None` for a `;`-terminated prototype.
    pub body: Option<FunBody>,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub struct FunBody {
    pub locals: Vec<VarDec>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    If {
        cond: Expr,
        body: Box<Stmt>,
        else_body: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Assign {
        name: String,
        value: Expr,
    },
    Expr(Expr),
    Block(Vec<Stmt>),
    Empty,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Pos,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Number(f64),
    Str(String),
    Ident(String),
    Device(String),
    /// `hash("...")`
    Hash(String),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Builtin0(Builtin0),
    Builtin1 {
        op: Builtin1,
        arg: Box<Expr>,
    },
    Builtin2 {
        op: Builtin2,
        arg1: Box<Expr>,
        arg2: Box<Expr>,
    },
    Builtin3 {
        op: Builtin3,
        arg1: Box<Expr>,
        arg2: Box<Expr>,
        arg3: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    /// True for the six operators with fused branch instructions.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin0 {
    Yield,
    Rand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin1 {
    Sin,
    Cos,
    Tan,
    Abs,
    Acos,
    Asin,
    Atan,
    Ceil,
    Floor,
    Log,
    Sqrt,
    Round,
    Trunc,
    Sleep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin2 {
    Load,
    Mod,
    Xor,
    Nor,
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin3 {
    Store,
    StoreBatch,
    LoadBatch,
}

impl Builtin0 {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "yield" => Some(Builtin0::Yield),
            "rand" => Some(Builtin0::Rand),
            _ => None,
        }
    }
}

impl Builtin1 {
    fn from_name(name: &str) -> Option<Self> {
        use Builtin1::*;
        match name {
            "sin" => Some(Sin),
            "cos" => Some(Cos),
            "tan" => Some(Tan),
            "abs" => Some(Abs),
            "acos" => Some(Acos),
            "asin" => Some(Asin),
            "atan" => Some(Atan),
            "ceil" => Some(Ceil),
            "floor" => Some(Floor),
            "log" => Some(Log),
            "sqrt" => Some(Sqrt),
            "round" => Some(Round),
            "trunc" => Some(Trunc),
            "sleep" => Some(Sleep),
            _ => None,
        }
    }
}

impl Builtin2 {
    fn from_name(name: &str) -> Option<Self> {
        use Builtin2::*;
        match name {
            "load" => Some(Load),
            "mod" => Some(Mod),
            "xor" => Some(Xor),
            "nor" => Some(Nor),
            "max" => Some(Max),
            "min" => Some(Min),
            _ => None,
        }
    }
}

impl Builtin3 {
    fn from_name(name: &str) -> Option<Self> {
        use Builtin3::*;
        match name {
            "store" => Some(Store),
            "store_batch" => Some(StoreBatch),
            "load_batch" => Some(LoadBatch),
            _ => None,
        }
    }
}

/// Parses one token stream into a program. Call once per input file and
/// concatenate the `top` lists to merge files.
pub fn parse(tokens: Vec<Token>) -> Result<Program> {
    let mut parser = Parser::new(tokens);
    let mut top = vec![];
    while !parser.at_end() {
        top.push(parser.top_dec()?);
    }
    Ok(Program { top })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end_pos: Pos,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        let end_pos = tokens
            .last()
            .map(|t| t.pos.clone())
            .unwrap_or_else(|| Pos::new("", 1, 1));
        Parser {
            tokens,
            pos: 0,
            end_pos,
        }
    }

    //Tool functions
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn current_pos(&self) -> Pos {
        self.tokens
            .get(self.pos)
            .map(|t| t.pos.clone())
            .unwrap_or_else(|| self.end_pos.clone())
    }

    fn advance(&mut self) -> Result<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| self.eof_error())?;
        self.pos += 1;
        Ok(token)
    }

    fn eof_error(&self) -> CompileError {
        CompileError::at(
            ErrorKind::Parse("unexpected end of input".into()),
            self.end_pos.clone(),
        )
    }

    fn error(&self, expected: &str) -> CompileError {
        let found = match self.peek() {
            Some(kind) => format!("{kind:?}"),
            None => "end of input".into(),
        };
        CompileError::at(
            ErrorKind::Parse(format!("expected {expected}, found {found}")),
            self.current_pos(),
        )
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        if self.peek() == Some(&kind) {
            self.advance()
        } else {
            Err(self.error(expected))
        }
    }

    /// Consumes the token and reports true iff it matches.
    fn seek(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self, expected: &str) -> Result<(String, Pos)> {
        match self.peek() {
            Some(TokenKind::Ident(_)) => {
                let token = self.advance()?;
                match token.kind {
                    TokenKind::Ident(name) => Ok((name, token.pos)),
                    _ => unreachable!(),
                }
            }
            _ => Err(self.error(expected)),
        }
    }

    //Top-level declarations
    fn top_dec(&mut self) -> Result<TopDec> {
        match self.peek() {
            Some(TokenKind::Define) => self.define_dec(),
            Some(TokenKind::Void) => self.fun_dec(),
            Some(TokenKind::Num) => {
                // `num f(...)` is a function, `num x;` a variable
                if self.peek_at(2) == Some(&TokenKind::LParen) {
                    self.fun_dec()
                } else {
                    let var = self.var_dec()?;
                    self.expect(TokenKind::Semi, "`;`")?;
                    Ok(TopDec::Var(var))
                }
            }
            _ => Err(self.error("a declaration")),
        }
    }

    fn define_dec(&mut self) -> Result<TopDec> {
        let define = self.expect(TokenKind::Define, "`#define`")?;
        let (name, _) = self.ident("a name after `#define`")?;
        match self.peek() {
            Some(TokenKind::Device(_)) => {
                let token = self.advance()?;
                match token.kind {
                    TokenKind::Device(device) => Ok(TopDec::DefineDevice {
                        name,
                        device,
                        pos: define.pos,
                    }),
                    _ => unreachable!(),
                }
            }
            _ => {
                let value = self.signed_number()?;
                Ok(TopDec::DefineNum {
                    name,
                    value,
                    pos: define.pos,
                })
            }
        }
    }

    fn signed_number(&mut self) -> Result<f64> {
        let negative = self.seek(&TokenKind::Minus);
        match self.peek() {
            Some(TokenKind::Number(_)) => {
                let token = self.advance()?;
                match token.kind {
                    TokenKind::Number(v) => Ok(if negative { -v } else { v }),
                    _ => unreachable!(),
                }
            }
            _ => Err(self.error("a number")),
        }
    }

    fn var_dec(&mut self) -> Result<VarDec> {
        self.expect(TokenKind::Num, "`num`")?;
        let (name, pos) = self.ident("a variable name")?;
        Ok(VarDec { name, pos })
    }

    fn fun_dec(&mut self) -> Result<TopDec> {
        let pos = self.current_pos();
        let ret = if self.seek(&TokenKind::Void) {
            FunRet::Void
        } else {
            self.expect(TokenKind::Num, "`num` or `void`")?;
            FunRet::Num
        };
        let (name, _) = self.ident("a function name")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let params = self.params()?;
        self.expect(TokenKind::RParen, "`)`")?;

        let body = if self.seek(&TokenKind::Semi) {
            None
        } else {
            self.expect(TokenKind::LBrace, "`{` or `;`")?;
            let body = self.fun_body()?;
            self.expect(TokenKind::RBrace, "`}`")?;
            Some(body)
        };

        Ok(TopDec::Fun(FunDec {
            ret,
            name,
            params,
            body,
            pos,
        }))
    }

    fn params(&mut self) -> Result<Vec<VarDec>> {
        if self.seek(&TokenKind::Void) || self.peek() == Some(&TokenKind::RParen) {
            return Ok(vec![]);
        }
        let mut params = vec![self.var_dec()?];
        while self.seek(&TokenKind::Comma) {
            params.push(self.var_dec()?);
        }
        Ok(params)
    }

    fn fun_body(&mut self) -> Result<FunBody> {
        let mut locals = vec![];
        // locals come first: `num x;` before any statement
        while self.peek() == Some(&TokenKind::Num) {
            locals.push(self.var_dec()?);
            self.expect(TokenKind::Semi, "`;`")?;
        }
        let mut stmts = vec![];
        while !self.at_end() && self.peek() != Some(&TokenKind::RBrace) {
            stmts.push(self.stmt()?);
        }
        Ok(FunBody { locals, stmts })
    }

    //Statements
    fn stmt(&mut self) -> Result<Stmt> {
        let pos = self.current_pos();
        let kind = match self.peek() {
            Some(TokenKind::If) => self.if_stmt()?,
            Some(TokenKind::While) => self.while_stmt()?,
            Some(TokenKind::Return) => self.return_stmt()?,
            Some(TokenKind::LBrace) => self.block()?,
            Some(TokenKind::Semi) => {
                self.pos += 1;
                StmtKind::Empty
            }
            Some(TokenKind::Ident(_)) if self.peek_at(1) == Some(&TokenKind::Assign) => {
                let (name, _) = self.ident("a variable name")?;
                self.pos += 1; // `=`
                let value = self.expr()?;
                self.expect(TokenKind::Semi, "`;`")?;
                StmtKind::Assign { name, value }
            }
            _ => {
                let expr = self.expr()?;
                self.expect(TokenKind::Semi, "`;`")?;
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt { kind, pos })
    }

    fn if_stmt(&mut self) -> Result<StmtKind> {
        self.expect(TokenKind::If, "`if`")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let cond = self.expr()?;
        self.expect(TokenKind::RParen, "`)`")?;
        let body = Box::new(self.stmt()?);
        let else_body = if self.seek(&TokenKind::Else) {
            Some(Box::new(self.stmt()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            cond,
            body,
            else_body,
        })
    }

    fn while_stmt(&mut self) -> Result<StmtKind> {
        self.expect(TokenKind::While, "`while`")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let cond = self.expr()?;
        self.expect(TokenKind::RParen, "`)`")?;
        let body = Box::new(self.stmt()?);
        Ok(StmtKind::While { cond, body })
    }

    fn return_stmt(&mut self) -> Result<StmtKind> {
        self.expect(TokenKind::Return, "`return`")?;
        if self.seek(&TokenKind::Semi) {
            return Ok(StmtKind::Return(None));
        }
        let expr = self.expr()?;
        self.expect(TokenKind::Semi, "`;`")?;
        Ok(StmtKind::Return(Some(expr)))
    }

    fn block(&mut self) -> Result<StmtKind> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut stmts = vec![];
        while !self.at_end() && self.peek() != Some(&TokenKind::RBrace) {
            stmts.push(self.stmt()?);
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(StmtKind::Block(stmts))
    }

    //Expressions (priority low to high)
    fn expr(&mut self) -> Result<Expr> {
        self.or_expr()
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr>,
        match_op: fn(&TokenKind) -> Option<BinOp>,
    ) -> Result<Expr> {
        let pos = self.current_pos();
        let mut lhs = next(self)?;
        while let Some(op) = self.peek().and_then(match_op) {
            self.pos += 1;
            let rhs = next(self)?;
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                pos: pos.clone(),
            };
        }
        Ok(lhs)
    }

    fn or_expr(&mut self) -> Result<Expr> {
        self.binary_level(Self::and_expr, |t| match t {
            TokenKind::OrOr => Some(BinOp::Or),
            _ => None,
        })
    }

    fn and_expr(&mut self) -> Result<Expr> {
        self.binary_level(Self::eq_expr, |t| match t {
            TokenKind::AndAnd => Some(BinOp::And),
            _ => None,
        })
    }

    fn eq_expr(&mut self) -> Result<Expr> {
        self.binary_level(Self::rel_expr, |t| match t {
            TokenKind::Eq => Some(BinOp::Eq),
            TokenKind::Ne => Some(BinOp::Ne),
            _ => None,
        })
    }

    fn rel_expr(&mut self) -> Result<Expr> {
        self.binary_level(Self::add_expr, |t| match t {
            TokenKind::Lt => Some(BinOp::Lt),
            TokenKind::Le => Some(BinOp::Le),
            TokenKind::Gt => Some(BinOp::Gt),
            TokenKind::Ge => Some(BinOp::Ge),
            _ => None,
        })
    }

    fn add_expr(&mut self) -> Result<Expr> {
        self.binary_level(Self::mul_expr, |t| match t {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn mul_expr(&mut self) -> Result<Expr> {
        self.binary_level(Self::unary_expr, |t| match t {
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            _ => None,
        })
    }

    fn unary_expr(&mut self) -> Result<Expr> {
        let pos = self.current_pos();
        if self.seek(&TokenKind::Minus) {
            // a literal directly after `-` is a negative number, not a negation
            if let Some(TokenKind::Number(v)) = self.peek().cloned() {
                self.pos += 1;
                return Ok(Expr {
                    kind: ExprKind::Number(-v),
                    pos,
                });
            }
            let rhs = self.primary()?;
            return Ok(Expr {
                kind: ExprKind::Neg(Box::new(rhs)),
                pos,
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        let pos = self.current_pos();
        let kind = match self.peek().cloned() {
            Some(TokenKind::LParen) => {
                self.pos += 1;
                let expr = self.expr()?;
                self.expect(TokenKind::RParen, "`)`")?;
                expr.kind
            }
            Some(TokenKind::Number(v)) => {
                self.pos += 1;
                ExprKind::Number(v)
            }
            Some(TokenKind::Str(s)) => {
                self.pos += 1;
                ExprKind::Str(s)
            }
            Some(TokenKind::Device(d)) => {
                self.pos += 1;
                ExprKind::Device(d)
            }
            Some(TokenKind::Ident(name)) => {
                self.pos += 1;
                if self.peek() == Some(&TokenKind::LParen) {
                    self.call_like(&name)?
                } else {
                    ExprKind::Ident(name)
                }
            }
            _ => return Err(self.error("an expression")),
        };
        Ok(Expr { kind, pos })
    }

    /// `name(` has been recognised; dispatches to `hash`, a builtin, or a
    /// plain function call.
    fn call_like(&mut self, name: &str) -> Result<ExprKind> {
        self.expect(TokenKind::LParen, "`(`")?;

        if name == "hash" {
            let arg = match self.peek().cloned() {
                Some(TokenKind::Str(s)) => {
                    self.pos += 1;
                    s
                }
                _ => return Err(self.error("a string literal in `hash(...)`")),
            };
            self.expect(TokenKind::RParen, "`)`")?;
            return Ok(ExprKind::Hash(arg));
        }

        if let Some(op) = Builtin0::from_name(name) {
            self.expect(TokenKind::RParen, "`)`")?;
            return Ok(ExprKind::Builtin0(op));
        }

        if let Some(op) = Builtin1::from_name(name) {
            let arg = Box::new(self.expr()?);
            self.expect(TokenKind::RParen, "`)`")?;
            return Ok(ExprKind::Builtin1 { op, arg });
        }

        if let Some(op) = Builtin2::from_name(name) {
            let arg1 = Box::new(self.expr()?);
            self.expect(TokenKind::Comma, "`,`")?;
            let arg2 = Box::new(self.expr()?);
            self.expect(TokenKind::RParen, "`)`")?;
            return Ok(ExprKind::Builtin2 { op, arg1, arg2 });
        }

        if let Some(op) = Builtin3::from_name(name) {
            let arg1 = Box::new(self.expr()?);
            self.expect(TokenKind::Comma, "`,`")?;
            let arg2 = Box::new(self.expr()?);
            self.expect(TokenKind::Comma, "`,`")?;
            let arg3 = Box::new(self.expr()?);
            self.expect(TokenKind::RParen, "`)`")?;
            return Ok(ExprKind::Builtin3 {
                op,
                arg1,
                arg2,
                arg3,
            });
        }

        let mut args = vec![];
        if self.peek() != Some(&TokenKind::RParen) {
            args.push(self.expr()?);
            while self.seek(&TokenKind::Comma) {
                args.push(self.expr()?);
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;
        Ok(ExprKind::Call {
            name: name.to_string(),
            args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_src(src: &str) -> Program {
        parse(tokenize("test.uc", src).unwrap()).unwrap()
    }

    fn main_body(src: &str) -> FunBody {
        let program = parse_src(src);
        for top in program.top {
            if let TopDec::Fun(fun) = top {
                if fun.name == "main" {
                    return fun.body.unwrap();
                }
            }
        }
        panic!("no main in test source");
    }

    #[test]
    fn parses_defines() {
        let program = parse_src("#define Sensor d0\n#define Limit 21.5");
        assert!(matches!(
            &program.top[0],
            TopDec::DefineDevice { name, device, .. } if name == "Sensor" && device == "d0"
        ));
        assert!(matches!(
            &program.top[1],
            TopDec::DefineNum { name, value, .. } if name == "Limit" && *value == 21.5
        ));
    }

    #[test]
    fn parses_negative_define() {
        let program = parse_src("#define Offset -3");
        assert!(matches!(
            &program.top[0],
            TopDec::DefineNum { value, .. } if *value == -3.0
        ));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let body = main_body("void main(void) { num a; a = 2 + 3 * 4; }");
        let StmtKind::Assign { value, .. } = &body.stmts[0].kind else {
            panic!("expected assignment");
        };
        let ExprKind::Binary { op, rhs, .. } = &value.kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(
            rhs.kind,
            ExprKind::Binary { op: BinOp::Mul, .. }
        ));
    }

    #[test]
    fn comparison_is_looser_than_arithmetic() {
        let body = main_body("void main(void) { num a; if (a + 1 < 5) ; }");
        let StmtKind::If { cond, .. } = &body.stmts[0].kind else {
            panic!("expected if");
        };
        assert!(matches!(
            cond.kind,
            ExprKind::Binary { op: BinOp::Lt, .. }
        ));
    }

    #[test]
    fn negative_literal_is_a_number() {
        let body = main_body("void main(void) { num a; a = -5; }");
        let StmtKind::Assign { value, .. } = &body.stmts[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(value.kind, ExprKind::Number(v) if v == -5.0));
    }

    #[test]
    fn negation_of_identifier() {
        let body = main_body("void main(void) { num a; a = -a; }");
        let StmtKind::Assign { value, .. } = &body.stmts[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(value.kind, ExprKind::Neg(_)));
    }

    #[test]
    fn builtins_by_arity() {
        let body =
            main_body("void main(void) { yield(); sleep(2); store(d0, \"On\", max(1, 2)); }");
        assert!(matches!(
            body.stmts[0].kind,
            StmtKind::Expr(Expr {
                kind: ExprKind::Builtin0(Builtin0::Yield),
                ..
            })
        ));
        assert!(matches!(
            body.stmts[1].kind,
            StmtKind::Expr(Expr {
                kind: ExprKind::Builtin1 {
                    op: Builtin1::Sleep,
                    ..
                },
                ..
            })
        ));
        let StmtKind::Expr(expr) = &body.stmts[2].kind else {
            panic!("expected expression statement");
        };
        let ExprKind::Builtin3 {
            op: Builtin3::Store,
            arg3,
            ..
        } = &expr.kind
        else {
            panic!("expected store");
        };
        assert!(matches!(
            arg3.kind,
            ExprKind::Builtin2 {
                op: Builtin2::Max,
                ..
            }
        ));
    }

    #[test]
    fn builtin_name_without_call_is_identifier() {
        let body = main_body("void main(void) { num sin; sin = 1; }");
        assert!(matches!(
            &body.stmts[0].kind,
            StmtKind::Assign { name, .. } if name == "sin"
        ));
    }

    #[test]
    fn hash_takes_a_string() {
        let body = main_body("void main(void) { num a; a = hash(\"On\"); }");
        let StmtKind::Assign { value, .. } = &body.stmts[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(&value.kind, ExprKind::Hash(s) if s == "On"));

        let tokens = tokenize("test.uc", "void main(void) { num a; a = hash(5); }").unwrap();
        assert!(parse(tokens).is_err());
    }

    #[test]
    fn else_binds_to_nearest_if() {
        let body = main_body("void main(void) { num a; if (a) if (a) ; else a = 1; }");
        let StmtKind::If {
            body: outer_body,
            else_body,
            ..
        } = &body.stmts[0].kind
        else {
            panic!("expected if");
        };
        assert!(else_body.is_none());
        assert!(matches!(
            outer_body.kind,
            StmtKind::If {
                else_body: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn prototype_has_no_body() {
        let program = parse_src("num helper(num x);");
        let TopDec::Fun(fun) = &program.top[0] else {
            panic!("expected function");
        };
        assert!(fun.body.is_none());
        assert_eq!(fun.params.len(), 1);
    }

    #[test]
    fn rejects_trailing_garbage() {
        let tokens = tokenize("test.uc", "void main(void) { ; } ]").unwrap();
        assert!(parse(tokens).is_err());
    }

    #[test]
    fn locals_precede_statements() {
        let body = main_body("void main(void) { num a; num b; a = 1; }");
        assert_eq!(body.locals.len(), 2);
        assert_eq!(body.locals[0].name, "a");
        assert_eq!(body.locals[1].name, "b");
    }
}
