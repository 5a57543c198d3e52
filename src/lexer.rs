//! Character stream -> token stream.
//!
//! Single-character pull model per `spec.md` §4.2: the lexer reads one
//! byte at a time from the source, tracks line/column, and supports a
//! one-character put-back so two-character operators can be recognized
//! with a single character of lookahead.

use crate::diagnostics::{EccoError, SourceSpan};
use crate::token::{Token, TokenKind, TokenPayload};

/// Identifiers longer than this are rejected - matches the source
/// system's fixed identifier buffer (`spec.md` §4.2).
const MAX_IDENTIFIER_LEN: usize = 512;

#[derive(Clone)]
pub struct Lexer {
    bytes: Vec<u8>,
    pos: usize,
    line: usize,
    column: usize,
    putback: Option<u8>,
    current_token: Token,
}

impl Lexer {
    pub fn new(source: &str) -> Result<Self, EccoError> {
        let mut lexer = Lexer {
            bytes: source.as_bytes().to_vec(),
            pos: 0,
            line: 1,
            column: 0,
            putback: None,
            current_token: Token::eof(1, 0),
        };
        lexer.advance()?;
        Ok(lexer)
    }

    /// The most recently produced token; does not consume it.
    pub fn current_token(&self) -> &Token {
        &self.current_token
    }

    pub fn span(&self) -> SourceSpan {
        SourceSpan::new(self.line, self.column)
    }

    fn next_char(&mut self) -> Option<u8> {
        if let Some(c) = self.putback.take() {
            return Some(c);
        }
        if self.pos >= self.bytes.len() {
            return None;
        }
        let c = self.bytes[self.pos];
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn put_back(&mut self, c: u8) {
        debug_assert!(self.putback.is_none(), "at most one character can be put back");
        self.putback = Some(c);
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.next_char() {
                Some(c) if c.is_ascii_whitespace() => continue,
                Some(b'/') => match self.next_char() {
                    Some(b'/') => {
                        while let Some(c) = self.next_char() {
                            if c == b'\n' {
                                break;
                            }
                        }
                    }
                    Some(other) => {
                        self.put_back(other);
                        self.put_back(b'/');
                        return;
                    }
                    None => {
                        self.put_back(b'/');
                        return;
                    }
                },
                Some(c) => {
                    self.put_back(c);
                    return;
                }
                None => return,
            }
        }
    }

    /// Produce the next token, replacing and returning `current_token`.
    pub fn advance(&mut self) -> Result<&Token, EccoError> {
        self.skip_whitespace_and_comments();
        let start_line = self.line;
        let start_col = self.column + 1;

        let token = match self.next_char() {
            None => Token::eof(start_line, start_col),
            Some(c) if c.is_ascii_digit() => {
                self.put_back(c);
                self.lex_integer(start_line, start_col)
            }
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                self.put_back(c);
                self.lex_identifier(start_line, start_col)?
            }
            Some(c) => self.lex_operator(c, start_line, start_col)?,
        };

        self.current_token = token;
        Ok(&self.current_token)
    }

    fn lex_integer(&mut self, line: usize, column: usize) -> Token {
        let mut digits = String::new();
        while let Some(c) = self.next_char() {
            if c.is_ascii_digit() {
                digits.push(c as char);
            } else {
                self.put_back(c);
                break;
            }
        }
        let value: i64 = digits.parse().unwrap_or(0);
        Token::new(TokenKind::IntegerLiteral, TokenPayload::Int(value), line, column)
    }

    fn lex_identifier(&mut self, line: usize, column: usize) -> Result<Token, EccoError> {
        let mut name = String::new();
        while let Some(c) = self.next_char() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                if name.len() >= MAX_IDENTIFIER_LEN {
                    return Err(EccoError::SyntaxError {
                        span: SourceSpan::new(line, column),
                        message: format!(
                            "identifier exceeds maximum length of {} characters",
                            MAX_IDENTIFIER_LEN
                        ),
                    });
                }
                name.push(c as char);
            } else {
                self.put_back(c);
                break;
            }
        }

        if let Some(kind) = TokenKind::keyword(&name) {
            Ok(Token::new(kind, TokenPayload::None, line, column))
        } else {
            Ok(Token::new(TokenKind::Identifier, TokenPayload::Name(name), line, column))
        }
    }

    fn lex_operator(&mut self, c: u8, line: usize, column: usize) -> Result<Token, EccoError> {
        let kind = match c {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'&' => TokenKind::Amp,
            b'.' => TokenKind::Dot,
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'=' => return Ok(self.lex_maybe_two_char(b'=', TokenKind::Assign, TokenKind::Eq, line, column)),
            b'!' => {
                return match self.next_char() {
                    Some(b'=') => Ok(Token::new(TokenKind::NotEq, TokenPayload::None, line, column)),
                    other => {
                        if let Some(c) = other {
                            self.put_back(c);
                        }
                        Err(EccoError::SyntaxError {
                            span: SourceSpan::new(line, column),
                            message: "unexpected character '!'".to_string(),
                        })
                    }
                };
            }
            b'<' => return Ok(self.lex_maybe_two_char(b'=', TokenKind::Lt, TokenKind::LtEq, line, column)),
            b'>' => return Ok(self.lex_maybe_two_char(b'=', TokenKind::Gt, TokenKind::GtEq, line, column)),
            other => {
                return Err(EccoError::SyntaxError {
                    span: SourceSpan::new(line, column),
                    message: format!("unexpected character '{}'", other as char),
                });
            }
        };
        Ok(Token::new(kind, TokenPayload::None, line, column))
    }

    /// Peek one character; if it matches `extend_on`, consume it and
    /// return `two_char_kind`, otherwise put it back and return
    /// `one_char_kind` (`spec.md` §4.2's two-character operator rule).
    fn lex_maybe_two_char(
        &mut self,
        extend_on: u8,
        one_char_kind: TokenKind,
        two_char_kind: TokenKind,
        line: usize,
        column: usize,
    ) -> Token {
        match self.next_char() {
            Some(c) if c == extend_on => Token::new(two_char_kind, TokenPayload::None, line, column),
            Some(c) => {
                self.put_back(c);
                Token::new(one_char_kind, TokenPayload::None, line, column)
            }
            None => Token::new(one_char_kind, TokenPayload::None, line, column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source).unwrap();
        let mut out = vec![lexer.current_token().kind];
        loop {
            let tok = lexer.advance().unwrap();
            let kind = tok.kind;
            out.push(kind);
            if kind == TokenKind::Eof {
                break;
            }
        }
        out
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(kinds("== != <= >= < >"), vec![
            TokenKind::Eq, TokenKind::NotEq, TokenKind::LtEq, TokenKind::GtEq,
            TokenKind::Lt, TokenKind::Gt, TokenKind::Eof,
        ]);
    }

    #[test]
    fn keywords_vs_identifiers() {
        assert_eq!(kinds("int xyz"), vec![TokenKind::Int, TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn line_comment_consumed_to_newline() {
        let mut lexer = Lexer::new("// comment\n42").unwrap();
        assert_eq!(lexer.current_token().kind, TokenKind::IntegerLiteral);
        assert_eq!(lexer.current_token().payload.as_int(), Some(42));
    }

    #[test]
    fn integer_literal_value() {
        let lexer = Lexer::new("12345").unwrap();
        assert_eq!(lexer.current_token().payload.as_int(), Some(12345));
    }

    #[test]
    fn unknown_character_is_syntax_error() {
        let err = Lexer::new("$").unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn tracks_line_and_column() {
        let mut lexer = Lexer::new("a\nb").unwrap();
        assert_eq!(lexer.current_token().line, 1);
        lexer.advance().unwrap();
        assert_eq!(lexer.current_token().line, 2);
    }
}
