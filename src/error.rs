use std::fmt;

use thiserror::Error;

/// Location of a token or AST node in the original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pos {
    pub file: String,
    pub line: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(file: impl Into<String>, line: usize, col: usize) -> Self {
        Pos {
            file: file.into(),
            line,
            col,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// Everything that can go wrong between source text and rendered assembly.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("main function is missing")]
    NoMain,
    #[error("maximum number of variables supported is 15")]
    TooManyVars,
    #[error("variable `{0}` is not known")]
    UnknownVar(String),
    #[error("unknown label `{0}`")]
    UnknownLabel(String),
    #[error("compiler ran out of temporary registers")]
    OutOfTempRegisters,
    #[error("division by 0")]
    Div0,
    #[error("invalid function call: {0}")]
    InvalidFuncCall(String),
    #[error("parser produced invalid state")]
    InvalidState,
    #[error("parse error: {0}")]
    Parse(String),
}

/// A compilation failure: the kind of error, where it happened, and an
/// optional underlying error. The first error aborts the compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub pos: Option<Pos>,
    pub caused_by: Option<Box<CompileError>>,
}

impl CompileError {
    pub fn new(kind: ErrorKind) -> Self {
        CompileError {
            kind,
            pos: None,
            caused_by: None,
        }
    }

    pub fn at(kind: ErrorKind, pos: Pos) -> Self {
        CompileError {
            kind,
            pos: Some(pos),
            caused_by: None,
        }
    }

    pub fn because(mut self, cause: CompileError) -> Self {
        self.caused_by = Some(Box::new(cause));
        self
    }

    /// Attaches a position unless the error already carries one.
    pub fn with_pos(mut self, pos: &Pos) -> Self {
        if self.pos.is_none() {
            self.pos = Some(pos.clone());
        }
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pos {
            Some(pos) => write!(f, "{} {}", pos, self.kind)?,
            None => write!(f, "{}", self.kind)?,
        }
        if let Some(cause) = &self.caused_by {
            write!(f, "\ncaused by: {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.caused_by
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<ErrorKind> for CompileError {
    fn from(kind: ErrorKind) -> Self {
        CompileError::new(kind)
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_position() {
        let err = CompileError::at(
            ErrorKind::UnknownVar("flow".into()),
            Pos::new("pump.uc", 3, 9),
        );
        assert_eq!(err.to_string(), "pump.uc:3:9 variable `flow` is not known");
    }

    #[test]
    fn display_chains_causes() {
        let inner = CompileError::new(ErrorKind::OutOfTempRegisters);
        let err = CompileError::at(ErrorKind::InvalidState, Pos::new("a.uc", 1, 1)).because(inner);
        let text = err.to_string();
        assert!(text.starts_with("a.uc:1:1 parser produced invalid state"));
        assert!(text.contains("caused by: compiler ran out of temporary registers"));
    }

    #[test]
    fn with_pos_keeps_existing() {
        let err = CompileError::at(ErrorKind::Div0, Pos::new("a.uc", 2, 2));
        let err = err.with_pos(&Pos::new("b.uc", 9, 9));
        assert_eq!(err.pos, Some(Pos::new("a.uc", 2, 2)));
    }
}
