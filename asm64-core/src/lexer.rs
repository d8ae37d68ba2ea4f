//! Tokenizer: turns one line of assembly source into a stream of `Token`s.
//!
//! Token kinds mirror `original_source/include/lexer.h`'s `TokenType`
//! closely; the Rust port folds the lexer-vs-directive ambiguity (`!if`
//! as a directive, `!` as bitwise-not elsewhere) into the `Bang` token and
//! lets the statement parser decide, same as the original.

use crate::error::AsmError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Eof,
    Eol,

    Number(i64),
    /// Already decoded to bytes (PETSCII conversion happens later, in the
    /// directive handler -- the lexer keeps the raw string).
    Str(String),
    Char(char),

    Identifier(String),
    /// `.name` -- a label local to the current zone.
    LocalLabel(String),
    /// A lone `-` used as an anonymous backward-reference label/operand.
    AnonBack(usize),
    /// A lone `+` used as an anonymous forward-reference label/operand.
    AnonForward(usize),

    /// `!name`
    Directive(String),
    /// `+name` used as a macro invocation (statement-initial position).
    MacroCall(String),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Lt,
    Gt,
    Eq,
    Ne,
    Le,
    Ge,
    Shl,
    Shr,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Hash,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

/// Tokenizes a single source line. The assembler calls `Lexer::new` per
/// line since statements never span lines (string literals included).
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    peeked: Option<(usize, char)>,
    line: u32,
    /// Running count of anonymous `+`/`-` runs seen on this line, used to
    /// distinguish `++` (two forward anon labels in a row) from a single
    /// token; mirrors the original's plus/minus-run counting.
    anon_run: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, line: u32) -> Self {
        Lexer {
            source,
            chars: source.char_indices(),
            peeked: None,
            line,
            anon_run: 0,
        }
    }

    fn bump(&mut self) -> Option<char> {
        if let Some((_, c)) = self.peeked.take() {
            return Some(c);
        }
        self.chars.next().map(|(_, c)| c)
    }

    fn peek_char(&mut self) -> Option<char> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked.map(|(_, c)| c)
    }

    fn column_at(&self, byte_pos: usize) -> u32 {
        self.source[..byte_pos.min(self.source.len())]
            .chars()
            .count() as u32
            + 1
    }

    fn current_byte_pos(&self) -> usize {
        match self.peeked {
            Some((pos, _)) => pos,
            None => self.source.len(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c == ' ' || c == '\t' => {
                    self.bump();
                }
                Some(';') => {
                    // Rest of line is a comment.
                    while self.peek_char().is_some() {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    /// Produce the next token.
    pub fn next(&mut self) -> Result<Token, AsmError> {
        self.skip_whitespace_and_comments();
        let col = self.column_at(self.current_byte_pos());
        let line = self.line;

        let c = match self.peek_char() {
            None => return Ok(Token { kind: TokenKind::Eof, line, column: col }),
            Some(c) => c,
        };

        if c.is_ascii_digit() {
            return self.lex_number(line, col);
        }
        if c == '$' {
            return self.lex_hex_or_current(line, col);
        }
        if c == '%' && self.is_binary_prefix() {
            return self.lex_binary(line, col);
        }
        if c == '"' {
            return self.lex_string(line, col);
        }
        if c == '\'' {
            return self.lex_char(line, col);
        }
        if c == '.' {
            return self.lex_local_label(line, col);
        }
        if c == '!' {
            self.bump();
            if matches!(self.peek_char(), Some(c2) if c2.is_alphabetic() || c2 == '_' || c2.is_ascii_digit()) {
                return self.lex_name(line, col, TokenKind::Directive as fn(String) -> TokenKind);
            }
            return Ok(Token { kind: TokenKind::Bang, line, column: col });
        }
        if c == '+' {
            self.bump();
            if matches!(self.peek_char(), Some(c2) if c2.is_alphabetic() || c2 == '_') {
                return self.lex_name(line, col, TokenKind::MacroCall as fn(String) -> TokenKind);
            }
            self.anon_run += 1;
            return Ok(Token {
                kind: TokenKind::AnonForward(self.anon_run),
                line,
                column: col,
            });
        }
        if c == '-' {
            self.bump();
            self.anon_run += 1;
            return Ok(Token {
                kind: TokenKind::AnonBack(self.anon_run),
                line,
                column: col,
            });
        }
        if c.is_alphabetic() || c == '_' {
            return self.lex_name(line, col, TokenKind::Identifier as fn(String) -> TokenKind);
        }

        self.bump();
        let kind = match c {
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '&' => TokenKind::Amp,
            '|' => TokenKind::Pipe,
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '<' => {
                if self.peek_char() == Some('<') {
                    self.bump();
                    TokenKind::Shl
                } else if self.peek_char() == Some('>') {
                    self.bump();
                    TokenKind::Ne
                } else if self.peek_char() == Some('=') {
                    self.bump();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek_char() == Some('>') {
                    self.bump();
                    TokenKind::Shr
                } else if self.peek_char() == Some('=') {
                    self.bump();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '=' => TokenKind::Eq,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '#' => TokenKind::Hash,
            other => return Err(AsmError::Lexical { found: other }),
        };
        Ok(Token { kind, line, column: col })
    }

    fn is_binary_prefix(&mut self) -> bool {
        // `%` is ambiguous with the modulo operator; a binary literal must
        // be followed immediately by a 0/1 digit. `self.peeked` already
        // holds the '%' itself, so look one further into the clone.
        let mut clone = self.chars.clone();
        matches!(clone.next().map(|(_, c)| c), Some('0') | Some('1'))
    }

    fn lex_name(
        &mut self,
        line: u32,
        col: u32,
        wrap: fn(String) -> TokenKind,
    ) -> Result<Token, AsmError> {
        let mut name = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Ok(Token { kind: wrap(name), line, column: col })
    }

    fn lex_local_label(&mut self, line: u32, col: u32) -> Result<Token, AsmError> {
        self.bump(); // consume '.'
        let mut name = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Ok(Token {
            kind: TokenKind::LocalLabel(name),
            line,
            column: col,
        })
    }

    fn lex_number(&mut self, line: u32, col: u32) -> Result<Token, AsmError> {
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let value = text
            .parse::<i64>()
            .map_err(|_| AsmError::MalformedNumber { text: text.clone() })?;
        Ok(Token { kind: TokenKind::Number(value), line, column: col })
    }

    fn lex_hex_or_current(&mut self, line: u32, col: u32) -> Result<Token, AsmError> {
        self.bump(); // consume '$'
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_hexdigit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if text.is_empty() {
            return Err(AsmError::MalformedNumber { text: "$".into() });
        }
        let value = i64::from_str_radix(&text, 16)
            .map_err(|_| AsmError::MalformedNumber { text: format!("${text}") })?;
        Ok(Token { kind: TokenKind::Number(value), line, column: col })
    }

    fn lex_binary(&mut self, line: u32, col: u32) -> Result<Token, AsmError> {
        self.bump(); // consume '%'
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if c == '0' || c == '1' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let value = i64::from_str_radix(&text, 2)
            .map_err(|_| AsmError::MalformedNumber { text: format!("%{text}") })?;
        Ok(Token { kind: TokenKind::Number(value), line, column: col })
    }

    fn lex_string(&mut self, line: u32, col: u32) -> Result<Token, AsmError> {
        self.bump(); // consume opening quote
        let mut s = String::new();
        loop {
            match self.bump() {
                None => return Err(AsmError::UnterminatedString),
                Some('"') => break,
                Some('\\') => match self.bump() {
                    // C64 text uses CR (0x0D), not LF, as its line break.
                    Some('n') => s.push('\r'),
                    Some('r') => s.push('\r'),
                    Some('t') => s.push('\t'),
                    Some('0') => s.push('\0'),
                    Some('"') => s.push('"'),
                    Some('\'') => s.push('\''),
                    Some('\\') => s.push('\\'),
                    Some(other) => s.push(other),
                    None => return Err(AsmError::UnterminatedString),
                },
                Some(c) => s.push(c),
            }
        }
        Ok(Token { kind: TokenKind::Str(s), line, column: col })
    }

    fn lex_char(&mut self, line: u32, col: u32) -> Result<Token, AsmError> {
        self.bump(); // consume opening quote
        let c = match self.bump() {
            Some('\\') => match self.bump() {
                Some('n') => '\r',
                Some('r') => '\r',
                Some('t') => '\t',
                Some('0') => '\0',
                Some('\'') => '\'',
                Some('"') => '"',
                Some('\\') => '\\',
                Some(other) => other,
                None => return Err(AsmError::UnterminatedString),
            },
            Some(c) => c,
            None => return Err(AsmError::UnterminatedString),
        };
        match self.bump() {
            Some('\'') => Ok(Token { kind: TokenKind::Char(c), line, column: col }),
            _ => Err(AsmError::UnterminatedString),
        }
    }
}

/// Tokenize an entire line eagerly, ending with `Eof`. Used by the
/// statement parser, which wants to look ahead freely.
pub fn tokenize_line(source: &str, line: u32) -> Result<Vec<Token>, AsmError> {
    let mut lexer = Lexer::new(source, line);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next()?;
        let is_eof = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize_line(src, 1)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_hex_and_decimal_numbers() {
        assert_eq!(kinds("$FF"), vec![TokenKind::Number(255), TokenKind::Eof]);
        assert_eq!(kinds("255"), vec![TokenKind::Number(255), TokenKind::Eof]);
    }

    #[test]
    fn lexes_binary_literal_distinct_from_modulo() {
        assert_eq!(kinds("%101"), vec![TokenKind::Number(5), TokenKind::Eof]);
        assert_eq!(
            kinds("10 % 3"),
            vec![
                TokenKind::Number(10),
                TokenKind::Percent,
                TokenKind::Number(3),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lexes_directive_and_identifier() {
        assert_eq!(
            kinds("!if x"),
            vec![
                TokenKind::Directive("if".into()),
                TokenKind::Identifier("x".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lexes_local_label() {
        assert_eq!(
            kinds(".loop"),
            vec![TokenKind::LocalLabel("loop".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_macro_call_vs_anon_forward() {
        assert_eq!(
            kinds("+greet"),
            vec![TokenKind::MacroCall("greet".into()), TokenKind::Eof]
        );
        assert_eq!(
            kinds("+"),
            vec![TokenKind::AnonForward(1), TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_string_with_escapes() {
        // `\n` targets CR (0x0D), matching the C64's line-break convention.
        assert_eq!(
            kinds("\"hi\\n\""),
            vec![TokenKind::Str("hi\r".into()), TokenKind::Eof]
        );
        assert_eq!(
            kinds("\"a\\rb\\'c\""),
            vec![TokenKind::Str("a\rb'c".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_comparison_and_shift_operators() {
        assert_eq!(kinds("<>"), vec![TokenKind::Ne, TokenKind::Eof]);
        assert_eq!(kinds("<<"), vec![TokenKind::Shl, TokenKind::Eof]);
        assert_eq!(kinds(">>"), vec![TokenKind::Shr, TokenKind::Eof]);
        assert_eq!(kinds("<="), vec![TokenKind::Le, TokenKind::Eof]);
        assert_eq!(kinds(">="), vec![TokenKind::Ge, TokenKind::Eof]);
    }

    #[test]
    fn semicolon_starts_a_comment() {
        assert_eq!(
            kinds("lda #1 ; comment"),
            vec![
                TokenKind::Identifier("lda".into()),
                TokenKind::Hash,
                TokenKind::Number(1),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn bang_alone_is_bitwise_not() {
        assert_eq!(
            kinds("!1"),
            vec![TokenKind::Bang, TokenKind::Number(1), TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(tokenize_line("\"abc", 1).is_err());
    }
}
