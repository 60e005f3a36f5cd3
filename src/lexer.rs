use std::collections::HashMap;

use crate::error::{CompileError, ErrorKind, Pos, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    //Literals
    Number(f64),
    Ident(String),
    /// `d0`..`d6` or `db`, optionally with a `:n` channel suffix
    Device(String),
    Str(String),

    //Keywords
    /// "#define"
    Define,
    /// "num"
    Num,
    /// "void"
    Void,
    /// "if"
    If,
    /// "else"
    Else,
    /// "while"
    While,
    /// "return"
    Return,

    //Arithmetical operators
    /// =
    Assign,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,

    //Relational operators
    /// ==
    Eq,
    /// !=
    Ne,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Le,
    /// >=
    Ge,

    //Logical operators
    /// !
    Not,
    /// &&
    AndAnd,
    /// ||
    OrOr,

    //Symbols
    /// ;
    Semi,
    /// ,
    Comma,
    /// :
    Colon,
    /// (
    LParen,
    /// )
    RParen,
    /// [
    LBracket,
    /// ]
    RBracket,
    /// {
    LBrace,
    /// }
    RBrace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
}

/// Scans `text` into a token stream. The first lexical error aborts.
pub fn tokenize(file: &str, text: &str) -> Result<Vec<Token>> {
    let mut scanner = Scanner::new(file, text);
    scanner.scan(&keyword_map())?;
    Ok(scanner.tokens)
}

fn keyword_map() -> HashMap<&'static str, TokenKind> {
    let mut map = HashMap::new();
    map.insert("num", TokenKind::Num);
    map.insert("void", TokenKind::Void);
    map.insert("if", TokenKind::If);
    map.insert("else", TokenKind::Else);
    map.insert("while", TokenKind::While);
    map.insert("return", TokenKind::Return);
    map
}

fn is_device_word(word: &str) -> bool {
    let mut chars = word.chars();
    if chars.next() != Some('d') {
        return false;
    }
    matches!(chars.next(), Some('0'..='6') | Some('b')) && chars.next().is_none()
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    lineno: usize,
    lstart: usize,
    file: String,
    tokens: Vec<Token>,
}

impl Scanner {
    fn new(file: &str, text: &str) -> Self {
        Scanner {
            chars: text.chars().collect(),
            pos: 0,
            lineno: 1,
            lstart: 0,
            file: file.to_string(),
            tokens: vec![],
        }
    }

    fn scan(&mut self, keywords: &HashMap<&'static str, TokenKind>) -> Result<()> {
        while let Some(&c) = self.chars.get(self.pos) {
            match c {
                ' ' | '\t' | '\r' => self.pos += 1,
                '\n' => self.newline(),
                '/' => match self.chars.get(self.pos + 1) {
                    Some('/') => self.line_comment(),
                    Some('*') => self.block_comment()?,
                    _ => self.push_symbol(TokenKind::Slash, 1),
                },
                '"' => self.quoted_string()?,
                '#' => self.define_keyword()?,
                c if c.is_ascii_digit() => self.number()?,
                c if c.is_ascii_alphabetic() || c == '_' => self.ident_or_keyword(keywords),
                _ => self.symbol()?,
            }
        }
        Ok(())
    }

    fn newline(&mut self) {
        self.lineno += 1;
        self.pos += 1;
        self.lstart = self.pos;
    }

    fn current_pos(&self) -> Pos {
        Pos::new(self.file.clone(), self.lineno, self.pos - self.lstart + 1)
    }

    fn push(&mut self, kind: TokenKind, pos: Pos) {
        self.tokens.push(Token { kind, pos });
    }

    fn push_symbol(&mut self, kind: TokenKind, len: usize) {
        let pos = self.current_pos();
        self.pos += len;
        self.push(kind, pos);
    }

    fn line_comment(&mut self) {
        while let Some(&c) = self.chars.get(self.pos) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn block_comment(&mut self) -> Result<()> {
        let start = self.current_pos();
        self.pos += 2;
        while let Some(&c) = self.chars.get(self.pos) {
            if c == '*' && self.chars.get(self.pos + 1) == Some(&'/') {
                self.pos += 2;
                return Ok(());
            }
            if c == '\n' {
                self.lineno += 1;
                self.lstart = self.pos + 1;
            }
            self.pos += 1;
        }
        Err(CompileError::at(
            ErrorKind::Parse("unclosed block comment".into()),
            start,
        ))
    }

    fn quoted_string(&mut self) -> Result<()> {
        let start = self.current_pos();
        self.pos += 1;
        let from = self.pos;
        while let Some(&c) = self.chars.get(self.pos) {
            if c == '"' {
                let value: String = self.chars[from..self.pos].iter().collect();
                self.pos += 1;
                self.push(TokenKind::Str(value), start);
                return Ok(());
            }
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
        Err(CompileError::at(
            ErrorKind::Parse("unterminated string literal".into()),
            start,
        ))
    }

    fn define_keyword(&mut self) -> Result<()> {
        let start = self.current_pos();
        let word: String = self
            .chars
            .get(self.pos..self.pos + 7)
            .map(|w| w.iter().collect())
            .unwrap_or_default();
        if word != "#define" {
            return Err(CompileError::at(
                ErrorKind::Parse("expected `#define`".into()),
                start,
            ));
        }
        self.pos += 7;
        self.push(TokenKind::Define, start);
        Ok(())
    }

    fn number(&mut self) -> Result<()> {
        let start = self.current_pos();
        let from = self.pos;
        while matches!(self.chars.get(self.pos), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        // fractional part only when a digit actually follows the dot
        if self.chars.get(self.pos) == Some(&'.')
            && matches!(self.chars.get(self.pos + 1), Some(c) if c.is_ascii_digit())
        {
            self.pos += 1;
            while matches!(self.chars.get(self.pos), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text: String = self.chars[from..self.pos].iter().collect();
        let value = text.parse::<f64>().map_err(|_| {
            CompileError::at(
                ErrorKind::Parse(format!("invalid number literal `{text}`")),
                start.clone(),
            )
        })?;
        self.push(TokenKind::Number(value), start);
        Ok(())
    }

    fn ident_or_keyword(&mut self, keywords: &HashMap<&'static str, TokenKind>) {
        let start = self.current_pos();
        let from = self.pos;
        while matches!(self.chars.get(self.pos), Some(c) if c.is_ascii_alphanumeric() || *c == '_')
        {
            self.pos += 1;
        }
        let word: String = self.chars[from..self.pos].iter().collect();

        if let Some(kind) = keywords.get(word.as_str()) {
            self.push(kind.clone(), start);
            return;
        }

        if is_device_word(&word) {
            // optional `:n` channel suffix is part of the device token
            let mut device = word;
            if self.chars.get(self.pos) == Some(&':') {
                if let Some(digit @ '0'..='9') = self.chars.get(self.pos + 1).copied() {
                    device.push(':');
                    device.push(digit);
                    self.pos += 2;
                }
            }
            self.push(TokenKind::Device(device), start);
            return;
        }

        self.push(TokenKind::Ident(word), start);
    }

    fn symbol(&mut self) -> Result<()> {
        use TokenKind::*;

        if let Some(pair) = self.chars.get(self.pos..self.pos + 2) {
            let two: String = pair.iter().collect();
            let kind = match two.as_str() {
                "==" => Some(Eq),
                "!=" => Some(Ne),
                "<=" => Some(Le),
                ">=" => Some(Ge),
                "&&" => Some(AndAnd),
                "||" => Some(OrOr),
                _ => None,
            };
            if let Some(kind) = kind {
                self.push_symbol(kind, 2);
                return Ok(());
            }
        }

        let kind = match self.chars[self.pos] {
            '=' => Some(Assign),
            '+' => Some(Plus),
            '-' => Some(Minus),
            '*' => Some(Star),
            '%' => Some(Percent),
            '<' => Some(Lt),
            '>' => Some(Gt),
            '!' => Some(Not),
            ';' => Some(Semi),
            ',' => Some(Comma),
            ':' => Some(Colon),
            '(' => Some(LParen),
            ')' => Some(RParen),
            '[' => Some(LBracket),
            ']' => Some(RBracket),
            '{' => Some(LBrace),
            '}' => Some(RBrace),
            _ => None,
        };
        match kind {
            Some(kind) => {
                self.push_symbol(kind, 1);
                Ok(())
            }
            None => Err(CompileError::at(
                ErrorKind::Parse(format!("unexpected character `{}`", self.chars[self.pos])),
                self.current_pos(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize("test.uc", src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_declaration() {
        use TokenKind::*;
        assert_eq!(
            kinds("num x;"),
            vec![Num, Ident("x".into()), Semi],
        );
    }

    #[test]
    fn scans_define_with_device() {
        use TokenKind::*;
        assert_eq!(
            kinds("#define Sensor d0"),
            vec![Define, Ident("Sensor".into()), Device("d0".into())],
        );
    }

    #[test]
    fn device_channel_suffix() {
        use TokenKind::*;
        assert_eq!(kinds("d0:3"), vec![Device("d0:3".into())]);
        assert_eq!(kinds("db"), vec![Device("db".into())]);
        // not a device shape: plain identifier
        assert_eq!(kinds("d7"), vec![Ident("d7".into())]);
        assert_eq!(kinds("db2"), vec![Ident("db2".into())]);
    }

    #[test]
    fn scans_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("a <= b && c != d"),
            vec![
                Ident("a".into()),
                Le,
                Ident("b".into()),
                AndAnd,
                Ident("c".into()),
                Ne,
                Ident("d".into()),
            ],
        );
    }

    #[test]
    fn scans_numbers() {
        use TokenKind::*;
        assert_eq!(kinds("10 2.5"), vec![Number(10.0), Number(2.5)]);
    }

    #[test]
    fn skips_comments() {
        let src = "num a; // trailing\n/* block\nspanning */ num b;";
        use TokenKind::*;
        assert_eq!(
            kinds(src),
            vec![Num, Ident("a".into()), Semi, Num, Ident("b".into()), Semi],
        );
    }

    #[test]
    fn string_literal() {
        assert_eq!(
            kinds("\"Temperature\""),
            vec![TokenKind::Str("Temperature".into())],
        );
    }

    #[test]
    fn tracks_positions() {
        let tokens = tokenize("test.uc", "num a;\nnum b;").unwrap();
        assert_eq!(tokens[3].pos, Pos::new("test.uc", 2, 1));
        assert_eq!(tokens[4].pos, Pos::new("test.uc", 2, 5));
    }

    #[test]
    fn rejects_unknown_character() {
        let err = tokenize("test.uc", "num a @").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Parse(_)));
        assert_eq!(err.pos, Some(Pos::new("test.uc", 1, 7)));
    }

    #[test]
    fn rejects_unclosed_comment() {
        assert!(tokenize("test.uc", "/* never closed").is_err());
    }
}
