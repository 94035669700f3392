//! Lexer for trial scripts using logos.
//!
//! Newlines are significant (they terminate statements), so they survive as
//! tokens. Every token carries the 1-based line it starts on; coverage and
//! failure locations are line-granular.

use logos::Logos;
use std::fmt;

/// Raw token from logos (before unescaping and line tagging).
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")]
enum RawToken {
    #[regex(r"#[^\n]*", logos::skip)]
    Comment,

    #[token("\n")]
    Newline,

    // === Keywords ===
    #[token("use")]
    Use,
    #[token("let")]
    Let,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("wait")]
    Wait,
    #[token("expect")]
    Expect,
    #[token("fail")]
    Fail,
    #[token("mock")]
    Mock,
    #[token("describe")]
    Describe,
    #[token("test")]
    Test,
    #[token("timeout")]
    Timeout,
    #[token("before_all")]
    BeforeAll,
    #[token("after_all")]
    AfterAll,
    #[token("before_each")]
    BeforeEach,
    #[token("after_each")]
    AfterEach,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nil")]
    Nil,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,

    // === Literals ===
    #[regex("[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,
    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    // === Punctuation ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(";")]
    Semi,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
}

/// Token kind with owned payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Int(i64),
    Str(String),
    Ident(String),

    Use,
    Let,
    If,
    Else,
    While,
    Wait,
    Expect,
    Fail,
    Mock,
    Describe,
    Test,
    Timeout,
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
    True,
    False,
    Nil,
    And,
    Or,
    Not,

    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Semi,
    Eq,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    Newline,
    /// Unrecognized input; the parser turns it into a diagnostic.
    Error(String),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Int(n) => return write!(f, "integer `{n}`"),
            TokenKind::Str(s) => return write!(f, "string \"{s}\""),
            TokenKind::Ident(name) => return write!(f, "identifier `{name}`"),
            TokenKind::Error(slice) => return write!(f, "unexpected input `{slice}`"),
            TokenKind::Use => "`use`",
            TokenKind::Let => "`let`",
            TokenKind::If => "`if`",
            TokenKind::Else => "`else`",
            TokenKind::While => "`while`",
            TokenKind::Wait => "`wait`",
            TokenKind::Expect => "`expect`",
            TokenKind::Fail => "`fail`",
            TokenKind::Mock => "`mock`",
            TokenKind::Describe => "`describe`",
            TokenKind::Test => "`test`",
            TokenKind::Timeout => "`timeout`",
            TokenKind::BeforeAll => "`before_all`",
            TokenKind::AfterAll => "`after_all`",
            TokenKind::BeforeEach => "`before_each`",
            TokenKind::AfterEach => "`after_each`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::Nil => "`nil`",
            TokenKind::And => "`and`",
            TokenKind::Or => "`or`",
            TokenKind::Not => "`not`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::Comma => "`,`",
            TokenKind::Dot => "`.`",
            TokenKind::Semi => "`;`",
            TokenKind::Eq => "`=`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::Lt => "`<`",
            TokenKind::LtEq => "`<=`",
            TokenKind::Gt => "`>`",
            TokenKind::GtEq => "`>=`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Newline => "end of line",
            TokenKind::Eof => "end of file",
        };
        f.write_str(text)
    }
}

/// A token tagged with the line it starts on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

/// Lex `source` into tokens, always terminated by `Eof`.
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(source);
    let mut line: u32 = 1;

    while let Some(result) = lexer.next() {
        let slice = lexer.slice();
        let kind = match result {
            Ok(RawToken::Newline) => {
                tokens.push(Token {
                    kind: TokenKind::Newline,
                    line,
                });
                line += 1;
                continue;
            }
            Ok(raw) => convert(raw, slice),
            Err(()) => TokenKind::Error(slice.to_string()),
        };
        tokens.push(Token { kind, line });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
    });
    tokens
}

fn convert(raw: RawToken, slice: &str) -> TokenKind {
    match raw {
        RawToken::Int(n) => TokenKind::Int(n),
        RawToken::Str => TokenKind::Str(unescape(&slice[1..slice.len() - 1])),
        RawToken::Ident => TokenKind::Ident(slice.to_string()),
        RawToken::Use => TokenKind::Use,
        RawToken::Let => TokenKind::Let,
        RawToken::If => TokenKind::If,
        RawToken::Else => TokenKind::Else,
        RawToken::While => TokenKind::While,
        RawToken::Wait => TokenKind::Wait,
        RawToken::Expect => TokenKind::Expect,
        RawToken::Fail => TokenKind::Fail,
        RawToken::Mock => TokenKind::Mock,
        RawToken::Describe => TokenKind::Describe,
        RawToken::Test => TokenKind::Test,
        RawToken::Timeout => TokenKind::Timeout,
        RawToken::BeforeAll => TokenKind::BeforeAll,
        RawToken::AfterAll => TokenKind::AfterAll,
        RawToken::BeforeEach => TokenKind::BeforeEach,
        RawToken::AfterEach => TokenKind::AfterEach,
        RawToken::True => TokenKind::True,
        RawToken::False => TokenKind::False,
        RawToken::Nil => TokenKind::Nil,
        RawToken::And => TokenKind::And,
        RawToken::Or => TokenKind::Or,
        RawToken::Not => TokenKind::Not,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Semi => TokenKind::Semi,
        RawToken::Eq => TokenKind::Eq,
        RawToken::EqEq => TokenKind::EqEq,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::Lt => TokenKind::Lt,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::Gt => TokenKind::Gt,
        RawToken::GtEq => TokenKind::GtEq,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Percent => TokenKind::Percent,
        // Both are consumed before conversion (skip callback / line counting).
        RawToken::Comment | RawToken::Newline => TokenKind::Newline,
    }
}

fn unescape(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
