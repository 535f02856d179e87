//! Tokenizer for the program text format.
//!
//! The [`Lexer`] is a cursor over the source bytes that tracks a 1-based line and
//! column for every token it produces, so parse errors can point at the offending
//! position. The grammar is line-insensitive; whitespace and `;` comments are
//! skipped between tokens.

use std::fmt;

use crate::{ir::value::is_name_char, Error, Result};

/// The kind and payload of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Keywords, types, opcodes, predicates and bare labels
    Word(String),
    /// `%name`
    Local(String),
    /// `@name`
    Global(String),
    /// `!7`
    MetaRef(u32),
    /// `!DILocation`
    MetaKind(String),
    /// Integer literal
    Int(i64),
    /// `"quoted"` label
    Str(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Equals,
    Colon,
    Ellipsis,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Word(word) => write!(f, "'{word}'"),
            TokenKind::Local(name) => write!(f, "'%{name}'"),
            TokenKind::Global(name) => write!(f, "'@{name}'"),
            TokenKind::MetaRef(id) => write!(f, "'!{id}'"),
            TokenKind::MetaKind(kind) => write!(f, "'!{kind}'"),
            TokenKind::Int(value) => write!(f, "'{value}'"),
            TokenKind::Str(text) => write!(f, "'\"{text}\"'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Equals => write!(f, "'='"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Ellipsis => write!(f, "'...'"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A token with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Byte cursor producing [`Token`]s.
pub(crate) struct Lexer<'a> {
    data: &'a [u8],
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer at the start of `source`.
    pub fn new(source: &'a str) -> Self {
        Lexer {
            data: source.as_bytes(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenizes the whole input. The last token is always [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Produces the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia();

        let (line, column) = (self.line, self.column);
        let Some(byte) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                line,
                column,
            });
        };

        let kind = match byte {
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b',' => self.single(TokenKind::Comma),
            b'=' => self.single(TokenKind::Equals),
            b':' => self.single(TokenKind::Colon),
            b'%' => {
                self.bump();
                TokenKind::Local(self.read_name(line, column, '%')?)
            }
            b'@' => {
                self.bump();
                TokenKind::Global(self.read_name(line, column, '@')?)
            }
            b'!' => {
                self.bump();
                self.read_metadata(line, column)?
            }
            b'"' => TokenKind::Str(self.read_quoted(line, column)?),
            b'.' if self.data[self.position..].starts_with(b"...") => {
                self.bump();
                self.bump();
                self.bump();
                TokenKind::Ellipsis
            }
            b'-' | b'0'..=b'9' => self.read_int(line, column)?,
            c if c.is_ascii_alphabetic() || matches!(c, b'_' | b'.' | b'$') => {
                TokenKind::Word(self.read_word())
            }
            other => {
                return Err(Error::Parse {
                    line,
                    column,
                    message: format!("unexpected character '{}'", char::from(other)),
                })
            }
        };

        Ok(Token { kind, line, column })
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.position + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.position += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if byte & 0xC0 != 0x80 {
            // continuation bytes of multi-byte characters share the column
            self.column += 1;
        }
        Some(byte)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn skip_trivia(&mut self) {
        while let Some(byte) = self.peek() {
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump();
                }
                b';' => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn take_while(&mut self, predicate: impl Fn(u8) -> bool) -> &'a str {
        let start = self.position;
        while self.peek().is_some_and(&predicate) {
            self.bump();
        }
        // only ASCII bytes are accepted by every predicate used here
        std::str::from_utf8(&self.data[start..self.position]).unwrap_or_default()
    }

    fn read_word(&mut self) -> String {
        self.take_while(is_name_char).to_string()
    }

    fn read_name(&mut self, line: usize, column: usize, sigil: char) -> Result<String> {
        if self.peek() == Some(b'"') {
            return self.read_quoted(line, column);
        }

        let name = self.take_while(is_name_char);
        if name.is_empty() {
            return Err(Error::Parse {
                line,
                column,
                message: format!("expected a name after '{sigil}'"),
            });
        }
        Ok(name.to_string())
    }

    fn read_quoted(&mut self, line: usize, column: usize) -> Result<String> {
        self.bump();
        let start = self.position;
        loop {
            match self.peek() {
                Some(b'"') => break,
                Some(b'\n') | None => {
                    return Err(Error::Parse {
                        line,
                        column,
                        message: "unterminated quoted name".to_string(),
                    })
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let text = String::from_utf8_lossy(&self.data[start..self.position]).into_owned();
        self.bump();
        if text.is_empty() {
            return Err(Error::Parse {
                line,
                column,
                message: "empty quoted name".to_string(),
            });
        }
        Ok(text)
    }

    fn read_int(&mut self, line: usize, column: usize) -> Result<TokenKind> {
        let negative = self.peek() == Some(b'-');
        if negative {
            if !self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                return Err(Error::Parse {
                    line,
                    column,
                    message: "expected digits after '-'".to_string(),
                });
            }
            self.bump();
        }

        let digits = self.take_while(|c| c.is_ascii_digit());
        let text = if negative {
            format!("-{digits}")
        } else {
            digits.to_string()
        };
        text.parse::<i64>()
            .map(TokenKind::Int)
            .map_err(|_| Error::Parse {
                line,
                column,
                message: format!("integer literal {text} is out of range"),
            })
    }

    fn read_metadata(&mut self, line: usize, column: usize) -> Result<TokenKind> {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => {
                let digits = self.take_while(|c| c.is_ascii_digit());
                digits
                    .parse::<u32>()
                    .map(TokenKind::MetaRef)
                    .map_err(|_| Error::Parse {
                        line,
                        column,
                        message: format!("metadata id !{digits} is out of range"),
                    })
            }
            Some(c) if c.is_ascii_alphabetic() => Ok(TokenKind::MetaKind(self.read_word())),
            _ => Err(Error::Parse {
                line,
                column,
                message: "expected a metadata id or kind after '!'".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_call_line() {
        assert_eq!(
            kinds("call void @_Z3bari(i32 -1), !dbg !3"),
            vec![
                TokenKind::Word("call".into()),
                TokenKind::Word("void".into()),
                TokenKind::Global("_Z3bari".into()),
                TokenKind::LParen,
                TokenKind::Word("i32".into()),
                TokenKind::Int(-1),
                TokenKind::RParen,
                TokenKind::Comma,
                TokenKind::MetaKind("dbg".into()),
                TokenKind::MetaRef(3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_positions() {
        let tokens = Lexer::new("; header\n  ret void ; trailing\n")
            .tokenize()
            .unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Word("ret".into()));
        assert_eq!((tokens[0].line, tokens[0].column), (2, 3));
        assert_eq!(tokens[1].kind, TokenKind::Word("void".into()));
        assert_eq!(tokens[2].kind, TokenKind::Eof);
    }

    #[test]
    fn test_quoted_names_and_ellipsis() {
        assert_eq!(
            kinds("@\"a b\"(ptr, ...)"),
            vec![
                TokenKind::Global("a b".into()),
                TokenKind::LParen,
                TokenKind::Word("ptr".into()),
                TokenKind::Comma,
                TokenKind::Ellipsis,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_errors_carry_position() {
        let err = Lexer::new("ret void\n  #").tokenize().unwrap_err();
        match err {
            Error::Parse { line, column, .. } => assert_eq!((line, column), (2, 3)),
            other => panic!("unexpected error {other:?}"),
        }

        assert!(Lexer::new("%").tokenize().is_err());
        assert!(Lexer::new("@\"open").tokenize().is_err());
        assert!(Lexer::new("99999999999999999999").tokenize().is_err());
    }
}
