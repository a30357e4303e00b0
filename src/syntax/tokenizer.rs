//! logos-based tokenizer for the Swift declaration subset.
//!
//! Token priority in logos is determined by:
//! 1. Longest match wins (e.g. `->` as [`Token::Arrow`] beats `-` + `>`)
//! 2. For equal length matches, the higher priority wins. [`Token::Operator`]
//!    is pinned to `priority = 1` so single-character punctuation beats it
//!
//! Our ordering ensures:
//! - `@Outlet` matches [`Token::Attribute`], not an operator + `Ident`
//! - `$name` matches [`Token::DollarIdent`]
//! - `=`, `.`, `<`, `>`, `?`, `!` and `&` are single tokens when they stand alone,
//!   while runs such as `==`, `?.` or `>>` lex as [`Token::Operator`]
//!
//! Names follow Unicode `XID_Start`/`XID_Continue`, as Swift identifiers do.
//!
//! Whitespace and comments are skipped. Newlines matter for Swift statement
//! separation, so [`tokenize`] records whether a line break precedes each token.

use logos::Logos;

use crate::syntax::span::Span;

/// Input the lexer has no token for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized input at bytes {}..{}", span.start, span.end)]
pub struct LexError {
    pub span: Span,
}

/// Swift token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\n\r\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token {
    // ── Compound tokens ──────────────────────────────────────────────

    /// Attribute name: `@Outlet`, `@MainActor`.
    #[regex(r"@[\p{XID_Start}_]\p{XID_Continue}*")]
    Attribute,

    /// Pound keyword: `#Preview`, `#if`.
    #[regex(r"#[\p{XID_Start}_]\p{XID_Continue}*")]
    PoundKeyword,

    /// Projected value or closure argument: `$count`, `$0`.
    #[regex(r"\$\p{XID_Continue}+")]
    DollarIdent,

    /// Back-ticked identifier: `` `default` ``.
    #[regex(r"`[\p{XID_Start}_]\p{XID_Continue}*`")]
    EscapedIdent,

    /// Triple-quoted string literal.
    #[regex(r#""""([^"]|"[^"]|""[^"])*""""#)]
    MultilineString,

    /// Raw string literal with one `#`: `#"a "quoted" word"#`.
    #[regex(r##"#"([^"]|"[^#])*"#"##)]
    RawString,

    /// Double-quoted string literal (interpolations are kept as text).
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    StringLiteral,

    /// Integer or floating point literal.
    #[regex(r"[0-9][0-9_]*(\.[0-9][0-9_]*)?([eE][+-]?[0-9]+)?")]
    #[regex(r"0[xob][0-9a-fA-F_]+")]
    Number,

    /// Identifier or keyword.
    #[regex(r"[\p{XID_Start}_]\p{XID_Continue}*")]
    Ident,

    /// `->`
    #[token("->")]
    Arrow,

    /// Any other operator run: `==`, `+=`, `?.`, `...`, `>>`.
    #[regex(r"[-+*/%=!&|^~?<>.]+", priority = 1)]
    Operator,

    // ── Single-character punctuation ─────────────────────────────────

    /// `{`
    #[token("{")]
    BraceOpen,

    /// `}`
    #[token("}")]
    BraceClose,

    /// `(`
    #[token("(")]
    ParenOpen,

    /// `)`
    #[token(")")]
    ParenClose,

    /// `[`
    #[token("[")]
    BracketOpen,

    /// `]`
    #[token("]")]
    BracketClose,

    /// `:`
    #[token(":")]
    Colon,

    /// `;`
    #[token(";")]
    Semicolon,

    /// `,`
    #[token(",")]
    Comma,

    /// `.`
    #[token(".")]
    Dot,

    /// `=`
    #[token("=")]
    Equals,

    /// `<`
    #[token("<")]
    LessThan,

    /// `>`
    #[token(">")]
    GreaterThan,

    /// `?`
    #[token("?")]
    Question,

    /// `!`
    #[token("!")]
    Bang,

    /// `&`
    #[token("&")]
    Ampersand,

    /// `\` (key path root).
    #[token("\\")]
    Backslash,
}

impl Token {
    /// Opening bracket of any kind.
    pub fn is_open(self) -> bool {
        matches!(self, Token::BraceOpen | Token::ParenOpen | Token::BracketOpen)
    }

    /// Closing bracket of any kind.
    pub fn is_close(self) -> bool {
        matches!(self, Token::BraceClose | Token::ParenClose | Token::BracketClose)
    }

    /// Tokens that may spell a name in declaration position.
    pub fn is_name(self) -> bool {
        matches!(self, Token::Ident | Token::EscapedIdent)
    }
}

/// A token with its byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme {
    pub token: Token,
    pub span: Span,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

impl Lexeme {
    /// Source text of this token.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }
}

/// Tokenize Swift source into lexemes.
///
/// Fails on the first character the lexer has no token for.
pub fn tokenize(input: &str) -> Result<Vec<Lexeme>, LexError> {
    let mut lexemes: Vec<Lexeme> = Vec::new();
    let mut previous_end = 0;

    for (result, range) in Token::lexer(input).spanned() {
        let span = Span::from(range);
        let Ok(token) = result else {
            return Err(LexError { span });
        };
        let gap = input.get(previous_end..span.start).unwrap_or("");
        lexemes.push(Lexeme {
            token,
            span,
            newline_before: !lexemes.is_empty() && gap.contains('\n'),
        });
        previous_end = span.end;
    }

    Ok(lexemes)
}
