//! The tokenizer: source bytes to a lazy token stream.
//!
//! A 256-entry byte-to-class table drives the hot loop; each byte is
//! classified once and the class dispatches to the matching scanner.
//! Tokens are produced on demand by [`Tokenizer::next_token`] and never
//! stored. The tokenizer is single-threaded and non-restartable from
//! arbitrary positions, but [`Tokenizer::reset`] rewinds to the start.

use smallvec::SmallVec;

use crate::{
    error::{CompileError, ErrorKind},
    intern::Interner,
    token::{Span, Token, TokenKind, TokenPayload},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum CharClass {
    Unknown = 0,
    Space,
    Digit,
    Alpha,
    Quote,
    Slash,
    Operator,
}

/// Byte classification table. Bytes not listed (controls, bytes >= 0x80)
/// stay `Unknown` and fail with `UNKNOWN_SYMBOL`.
static CHAR_MAP: [CharClass; 256] = build_char_map();

const fn build_char_map() -> [CharClass; 256] {
    let mut map = [CharClass::Unknown; 256];
    map[b'\t' as usize] = CharClass::Space;
    map[b'\n' as usize] = CharClass::Space;
    map[0x0b] = CharClass::Space; // vertical tab
    map[0x0c] = CharClass::Space; // form feed
    map[b'\r' as usize] = CharClass::Space;
    map[b' ' as usize] = CharClass::Space;

    let mut b = b'0';
    while b <= b'9' {
        map[b as usize] = CharClass::Digit;
        b += 1;
    }
    let mut b = b'a';
    while b <= b'z' {
        map[b as usize] = CharClass::Alpha;
        b += 1;
    }
    let mut b = b'A';
    while b <= b'Z' {
        map[b as usize] = CharClass::Alpha;
        b += 1;
    }
    map[b'_' as usize] = CharClass::Alpha;

    map[b'"' as usize] = CharClass::Quote;
    map[b'/' as usize] = CharClass::Slash;

    let operators = [
        b'{', b'}', b'[', b']', b'(', b')', b'.', b',', b';', b':', b'^', b'~', b'?', b'@', b'!',
        b'*', b'<', b'>', b'=', b'+', b'-', b'%', b'|', b'&', b'#', b'$', b'\'',
    ];
    let mut i = 0;
    while i < operators.len() {
        map[operators[i] as usize] = CharClass::Operator;
        i += 1;
    }
    map
}

/// Streaming lexer over an immutable source buffer.
pub struct Tokenizer<'src> {
    source: &'src [u8],
    cursor: usize,
    token_start: usize,
}

impl<'src> Tokenizer<'src> {
    #[must_use]
    pub fn new(source: &'src [u8]) -> Self {
        Self {
            source,
            cursor: 0,
            token_start: 0,
        }
    }

    /// Rewinds to the start of the source.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.token_start = 0;
    }

    #[must_use]
    pub fn source(&self) -> &'src [u8] {
        self.source
    }

    fn span_from_start(&self) -> Span {
        Span::new(
            self.token_start as u32,
            (self.cursor - self.token_start) as u32,
        )
    }

    /// Produces the next token, interning identifiers and string literals.
    pub fn next_token(&mut self, interner: &mut Interner) -> Result<Token, CompileError> {
        loop {
            while self.cursor < self.source.len()
                && CHAR_MAP[self.source[self.cursor] as usize] == CharClass::Space
            {
                self.cursor += 1;
            }
            if self.cursor >= self.source.len() {
                return Ok(Token::new(
                    TokenKind::Eof,
                    Span::new(self.source.len() as u32, 0),
                ));
            }

            self.token_start = self.cursor;
            let byte = self.source[self.cursor];
            self.cursor += 1;

            match CHAR_MAP[byte as usize] {
                CharClass::Alpha => return Ok(self.lex_identifier(interner)),
                CharClass::Digit => return self.lex_number(),
                CharClass::Quote => return self.lex_string(interner),
                CharClass::Slash => match self.lex_slash()? {
                    Some(token) => return Ok(token),
                    // A comment was skipped; restart at the next byte.
                    None => continue,
                },
                CharClass::Operator => return self.lex_operator(byte),
                CharClass::Space | CharClass::Unknown => {
                    return Err(CompileError::with_byte(
                        ErrorKind::UnknownSymbol,
                        Span::new(self.token_start as u32, 1),
                        byte,
                    ));
                }
            }
        }
    }

    fn lex_identifier(&mut self, interner: &mut Interner) -> Token {
        while self.cursor < self.source.len() {
            match CHAR_MAP[self.source[self.cursor] as usize] {
                CharClass::Alpha | CharClass::Digit => self.cursor += 1,
                _ => break,
            }
        }

        let lexeme = &self.source[self.token_start..self.cursor];
        let span = self.span_from_start();

        // Keyword set is tiny and every keyword is three bytes long.
        if lexeme.len() == 3 {
            let kind = match lexeme {
                b"i64" => Some(TokenKind::I64Type),
                b"f64" => Some(TokenKind::F64Type),
                b"str" => Some(TokenKind::StrType),
                _ => None,
            };
            if let Some(kind) = kind {
                return Token::new(kind, span);
            }
        }

        // Identifiers are ASCII by the class table, so this cannot fail.
        let text = std::str::from_utf8(lexeme).unwrap_or_default();
        let name = interner.intern_name(text);
        Token {
            kind: TokenKind::Identifier,
            span,
            payload: TokenPayload::Name(name),
        }
    }

    fn lex_number(&mut self) -> Result<Token, CompileError> {
        let start = self.token_start;
        let first = self.source[start];
        let mut radix = 10u32;

        if first == b'0' && self.cursor < self.source.len() {
            match self.source[self.cursor] {
                b'x' | b'X' => {
                    radix = 16;
                    self.cursor += 1;
                }
                b'b' | b'B' => {
                    radix = 2;
                    self.cursor += 1;
                }
                b'o' | b'O' => {
                    radix = 8;
                    self.cursor += 1;
                }
                _ => {}
            }
        }

        let mut saw_dot = false;
        let mut saw_exponent = false;
        if radix == 16 {
            while self.cursor < self.source.len() && self.source[self.cursor].is_ascii_hexdigit() {
                self.cursor += 1;
            }
        } else {
            while self.cursor < self.source.len() {
                let byte = self.source[self.cursor];
                if byte.is_ascii_digit() {
                    self.cursor += 1;
                } else if byte == b'.' && !saw_dot && !saw_exponent {
                    saw_dot = true;
                    self.cursor += 1;
                } else if (byte == b'e' || byte == b'E') && radix == 10 && !saw_exponent {
                    saw_exponent = true;
                    self.cursor += 1;
                    if self.cursor < self.source.len()
                        && (self.source[self.cursor] == b'+' || self.source[self.cursor] == b'-')
                    {
                        self.cursor += 1;
                    }
                } else {
                    break;
                }
            }
        }

        let span = self.span_from_start();

        // Stack scratch for the common case, heap past 64 bytes.
        let mut buffer: SmallVec<[u8; 64]> = SmallVec::new();
        buffer.extend_from_slice(&self.source[start..self.cursor]);

        let is_float = radix == 10 && (saw_dot || saw_exponent);
        if is_float {
            let text = std::str::from_utf8(&buffer)
                .map_err(|_| CompileError::new(ErrorKind::NumberParse, span))?;
            let value: f64 = text
                .parse()
                .map_err(|_| CompileError::new(ErrorKind::NumberParse, span))?;
            if value.is_infinite() {
                return Err(CompileError::new(ErrorKind::NumberOverflow, span));
            }
            return Ok(Token {
                kind: TokenKind::FloatLiteral,
                span,
                payload: TokenPayload::Float(value),
            });
        }

        let digits = if radix == 10 { &buffer[..] } else { &buffer[2..] };
        if digits.is_empty() {
            return Err(CompileError::new(ErrorKind::UnknownNumberFormat, span));
        }

        let mut value: i64 = 0;
        for &byte in digits {
            let digit = match byte {
                b'0'..=b'9' => i64::from(byte - b'0'),
                b'a'..=b'f' => i64::from(byte - b'a' + 10),
                b'A'..=b'F' => i64::from(byte - b'A' + 10),
                _ => return Err(CompileError::new(ErrorKind::NumberParse, span)),
            };
            if digit >= i64::from(radix) {
                return Err(CompileError::new(ErrorKind::NumberParse, span));
            }
            value = value
                .checked_mul(i64::from(radix))
                .and_then(|v| v.checked_add(digit))
                .ok_or(CompileError::new(ErrorKind::NumberOverflow, span))?;
        }

        Ok(Token {
            kind: TokenKind::IntLiteral,
            span,
            payload: TokenPayload::Int(value),
        })
    }

    fn lex_string(&mut self, interner: &mut Interner) -> Result<Token, CompileError> {
        let quote = self.source[self.token_start];
        let mut content: Vec<u8> = Vec::new();
        loop {
            if self.cursor >= self.source.len() {
                // Unterminated string.
                return Err(CompileError::with_byte(
                    ErrorKind::UnexpectedSymbol,
                    Span::new(self.token_start as u32, 1),
                    quote,
                ));
            }
            let byte = self.source[self.cursor];
            self.cursor += 1;
            if byte == quote {
                break;
            }
            if byte != b'\\' {
                content.push(byte);
                continue;
            }
            if self.cursor >= self.source.len() {
                return Err(CompileError::with_byte(
                    ErrorKind::UnexpectedSymbol,
                    Span::new((self.cursor - 1) as u32, 1),
                    b'\\',
                ));
            }
            let escape = self.source[self.cursor];
            self.cursor += 1;
            let unescaped = match escape {
                b'n' => b'\n',
                b't' => b'\t',
                b'r' => b'\r',
                b'"' => b'"',
                b'\'' => b'\'',
                b'\\' => b'\\',
                b'0' => b'\0',
                other => {
                    return Err(CompileError::with_byte(
                        ErrorKind::UnexpectedSymbol,
                        Span::new((self.cursor - 2) as u32, 2),
                        other,
                    ));
                }
            };
            content.push(unescaped);
        }

        let id = interner.intern_str(&content);
        Ok(Token {
            kind: TokenKind::StrLiteral,
            span: self.span_from_start(),
            payload: TokenPayload::Str(id),
        })
    }

    /// Divide, integer-divide, or a comment. Returns `None` when a comment
    /// was consumed and scanning should restart.
    fn lex_slash(&mut self) -> Result<Option<Token>, CompileError> {
        match self.source.get(self.cursor) {
            Some(b'/') => {
                self.cursor += 1;
                if self.source.get(self.cursor) == Some(&b'/') {
                    // `///` opens a line comment; skip to end of line or EOF.
                    self.cursor += 1;
                    while self.cursor < self.source.len() && self.source[self.cursor] != b'\n' {
                        self.cursor += 1;
                    }
                    return Ok(None);
                }
                Ok(Some(Token::new(
                    TokenKind::SlashSlash,
                    self.span_from_start(),
                )))
            }
            Some(b'*') => {
                self.cursor += 1;
                while self.cursor + 1 < self.source.len() {
                    if self.source[self.cursor] == b'*' && self.source[self.cursor + 1] == b'/' {
                        self.cursor += 2;
                        return Ok(None);
                    }
                    self.cursor += 1;
                }
                // Unterminated block comment.
                Err(CompileError::with_byte(
                    ErrorKind::UnexpectedSymbol,
                    Span::new(self.token_start as u32, 2),
                    b'*',
                ))
            }
            _ => Ok(Some(Token::new(TokenKind::Slash, self.span_from_start()))),
        }
    }

    /// Single- and two-character punctuation, maximal munch.
    fn lex_operator(&mut self, byte: u8) -> Result<Token, CompileError> {
        let next = self.source.get(self.cursor).copied();
        let (kind, wide) = match byte {
            b'(' => (TokenKind::LParen, false),
            b')' => (TokenKind::RParen, false),
            b'{' => (TokenKind::LBrace, false),
            b'}' => (TokenKind::RBrace, false),
            b'[' => (TokenKind::LBracket, false),
            b']' => (TokenKind::RBracket, false),
            b';' => (TokenKind::Semicolon, false),
            b',' => (TokenKind::Comma, false),
            b'.' => (TokenKind::Dot, false),
            b'^' => (TokenKind::Caret, false),
            b'~' => (TokenKind::Tilde, false),
            b'?' => (TokenKind::Question, false),
            b'@' => (TokenKind::While, false),
            b'\'' => (TokenKind::Return, false),
            b'#' => (TokenKind::If, false),
            b'+' => match next {
                Some(b'+') => (TokenKind::Increment, true),
                _ => (TokenKind::Plus, false),
            },
            b'-' => match next {
                Some(b'-') => (TokenKind::Decrement, true),
                Some(b'>') => (TokenKind::Arrow, true),
                _ => (TokenKind::Minus, false),
            },
            b'*' => match next {
                Some(b'*') => (TokenKind::Power, true),
                _ => (TokenKind::Star, false),
            },
            b'=' => match next {
                Some(b'=') => (TokenKind::EqEq, true),
                Some(b'>') => (TokenKind::FatArrow, true),
                _ => (TokenKind::Assign, false),
            },
            b'!' => match next {
                Some(b'=') => (TokenKind::NotEq, true),
                Some(b'#') => (TokenKind::ElseIf, true),
                _ => (TokenKind::Bang, false),
            },
            b'<' => match next {
                Some(b'=') => (TokenKind::LessEq, true),
                Some(b'>') => (TokenKind::Namespace, true),
                _ => (TokenKind::Less, false),
            },
            b'>' => match next {
                Some(b'=') => (TokenKind::GreaterEq, true),
                _ => (TokenKind::Greater, false),
            },
            b'&' => match next {
                Some(b'&') => (TokenKind::AmpAmp, true),
                _ => (TokenKind::Amp, false),
            },
            b'|' => match next {
                Some(b'|') => (TokenKind::PipePipe, true),
                _ => (TokenKind::Pipe, false),
            },
            b'%' => match next {
                Some(b'%') => (TokenKind::For, true),
                _ => (TokenKind::Percent, false),
            },
            b'$' => match next {
                Some(b'>') => (TokenKind::Structure, true),
                _ => (TokenKind::NameDecl, false),
            },
            b':' => match next {
                Some(b':') => (TokenKind::Print, true),
                Some(b'>') => (TokenKind::Input, true),
                _ => (TokenKind::Colon, false),
            },
            other => {
                return Err(CompileError::with_byte(
                    ErrorKind::UnknownSymbol,
                    Span::new(self.token_start as u32, 1),
                    other,
                ));
            }
        };

        if wide {
            self.cursor += 1;
        }
        Ok(Token::new(kind, self.span_from_start()))
    }
}
