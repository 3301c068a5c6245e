//! The token model: spans, token kinds, and literal payloads.

use strum::IntoStaticStr;

use crate::{
    intern::{NameId, StrId},
    value::{Value, ValueType},
};

/// Byte range into the source buffer. Spans are offset-based so they stay
/// valid if the buffer moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub offset: u32,
    pub length: u32,
}

impl Span {
    #[must_use]
    pub fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// One past the last byte covered.
    #[must_use]
    pub fn end(self) -> u32 {
        self.offset + self.length
    }

    /// The smallest span covering both `self` and `to`.
    #[must_use]
    pub fn join(self, to: Self) -> Self {
        Self {
            offset: self.offset,
            length: to.end() - self.offset,
        }
    }
}

/// The full token set, including sigils reserved for future statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum TokenKind {
    #[strum(serialize = "<eof>")]
    Eof,
    #[strum(serialize = "i64")]
    I64Type,
    #[strum(serialize = "f64")]
    F64Type,
    #[strum(serialize = "str")]
    StrType,
    #[strum(serialize = "<identifier>")]
    Identifier,
    /// `$` — name declaration.
    #[strum(serialize = "$")]
    NameDecl,
    /// `#` — if statement.
    #[strum(serialize = "#")]
    If,
    /// `!#` — else-if; the parser rewrites it to a nested if.
    #[strum(serialize = "!#")]
    ElseIf,
    /// `!` — else clause or logical not, by position.
    #[strum(serialize = "!")]
    Bang,
    #[strum(serialize = "?")]
    Question,
    /// `@` — while statement.
    #[strum(serialize = "@")]
    While,
    #[strum(serialize = "%")]
    Percent,
    /// `%%` — reserved for statement.
    #[strum(serialize = "%%")]
    For,
    /// `<>` — reserved namespace declaration.
    #[strum(serialize = "<>")]
    Namespace,
    /// `$>` — reserved structure declaration.
    #[strum(serialize = "$>")]
    Structure,
    /// `'` — reserved return statement.
    #[strum(serialize = "'")]
    Return,
    /// `::` — print statement.
    #[strum(serialize = "::")]
    Print,
    /// `:>` — reserved input statement.
    #[strum(serialize = ":>")]
    Input,
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "++")]
    Increment,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "--")]
    Decrement,
    #[strum(serialize = "*")]
    Star,
    #[strum(serialize = "**")]
    Power,
    #[strum(serialize = "/")]
    Slash,
    #[strum(serialize = "//")]
    SlashSlash,
    #[strum(serialize = "->")]
    Arrow,
    #[strum(serialize = "=>")]
    FatArrow,
    #[strum(serialize = ".")]
    Dot,
    #[strum(serialize = ",")]
    Comma,
    #[strum(serialize = ";")]
    Semicolon,
    #[strum(serialize = ":")]
    Colon,
    #[strum(serialize = "{")]
    LBrace,
    #[strum(serialize = "}")]
    RBrace,
    #[strum(serialize = "[")]
    LBracket,
    #[strum(serialize = "]")]
    RBracket,
    #[strum(serialize = "(")]
    LParen,
    #[strum(serialize = ")")]
    RParen,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEq,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEq,
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "==")]
    EqEq,
    #[strum(serialize = "!=")]
    NotEq,
    #[strum(serialize = "|")]
    Pipe,
    #[strum(serialize = "||")]
    PipePipe,
    #[strum(serialize = "&")]
    Amp,
    #[strum(serialize = "&&")]
    AmpAmp,
    #[strum(serialize = "^")]
    Caret,
    #[strum(serialize = "~")]
    Tilde,
    #[strum(serialize = "<i64 literal>")]
    IntLiteral,
    #[strum(serialize = "<f64 literal>")]
    FloatLiteral,
    #[strum(serialize = "<str literal>")]
    StrLiteral,
}

impl TokenKind {
    /// The token's source text, or a `<...>` placeholder for payload kinds.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Payload carried by literal and identifier tokens.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TokenPayload {
    #[default]
    None,
    Int(i64),
    Float(f64),
    Str(StrId),
    Name(NameId),
}

/// One token. Tokens are consumed one at a time by the parser and never
/// stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub payload: TokenPayload,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            payload: TokenPayload::None,
        }
    }

    /// The literal value of a literal token, if it is one.
    #[must_use]
    pub fn literal_value(&self) -> Option<Value> {
        match self.payload {
            TokenPayload::Int(v) => Some(Value::I64(v)),
            TokenPayload::Float(v) => Some(Value::F64(v)),
            TokenPayload::Str(id) => Some(Value::Str(id)),
            _ => None,
        }
    }

    /// The declared type named by a type-keyword token, if it is one.
    #[must_use]
    pub fn type_keyword(&self) -> Option<ValueType> {
        match self.kind {
            TokenKind::I64Type => Some(ValueType::I64),
            TokenKind::F64Type => Some(ValueType::F64),
            TokenKind::StrType => Some(ValueType::Str),
            _ => None,
        }
    }
}
