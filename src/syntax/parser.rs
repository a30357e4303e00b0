//! Recursive descent parser for the Swift declaration subset.
//!
//! Parses source text into a [`SourceFile`]. Struct bodies are parsed member
//! by member. Other nominal bodies are parsed the same way when they can be,
//! so nested features are found, and kept raw otherwise. Everything else the
//! feature pass does not inspect (initializers, imports, statements) is kept
//! as a raw span. Types,
//! expressions and bodies are never parsed, only delimited: brackets are
//! balanced, and Swift's newline-separated statements are detected from the
//! `newline_before` flag on each token.

use crate::syntax::ir::*;
use crate::syntax::span::{LineIndex, Position, Span};
use crate::syntax::tokenizer::{tokenize, LexError, Lexeme, Token};

/// Errors from parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected token at {position}: {message}")]
    UnexpectedToken { position: Position, message: String },
    #[error("unexpected end of input: {0}")]
    UnexpectedEof(String),
    #[error("mismatched delimiter at {position}: {message}")]
    MismatchedDelimiter { position: Position, message: String },
    #[error("unrecognized character at {position}: {text:?}")]
    InvalidCharacter { position: Position, text: String },
}

/// Declaration modifiers. `class` is handled separately because it is also a
/// declaration keyword.
const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "fileprivate",
    "internal",
    "package",
    "open",
    "static",
    "final",
    "override",
    "mutating",
    "nonmutating",
    "lazy",
    "weak",
    "unowned",
    "nonisolated",
    "dynamic",
    "required",
    "convenience",
    "optional",
    "indirect",
    "prefix",
    "postfix",
    "infix",
    "distributed",
];

const ACCESSOR_MODIFIERS: &[&str] = &["mutating", "nonmutating", "__consuming"];

const EFFECTS: &[&str] = &["async", "throws", "rethrows", "reasync"];

/// Parse Swift source into a [`SourceFile`].
pub fn parse_source(input: &str) -> Result<SourceFile, ParseError> {
    let mut parser = Parser::new(input)?;

    let mut decls = Vec::new();
    while !parser.is_eof() {
        if parser.eat(Token::Semicolon) {
            continue;
        }
        decls.push(parser.parse_decl()?);
    }

    Ok(SourceFile::new(decls))
}

/// Recursive descent parser state.
struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Lexeme>,
    cursor: usize,
    lines: LineIndex<'a>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self, ParseError> {
        let lines = LineIndex::new(source);
        let tokens = tokenize(source).map_err(|LexError { span }| ParseError::InvalidCharacter {
            position: lines.position(span.start),
            text: span.text(source).to_string(),
        })?;
        Ok(Self {
            source,
            tokens,
            cursor: 0,
            lines,
        })
    }

    // -----------------------------------------------------------------------
    // Cursor helpers
    // -----------------------------------------------------------------------

    fn is_eof(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    fn peek(&self) -> Option<Lexeme> {
        self.tokens.get(self.cursor).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<Lexeme> {
        self.tokens.get(self.cursor + offset).copied()
    }

    fn peek_token(&self) -> Option<Token> {
        self.peek().map(|l| l.token)
    }

    fn advance(&mut self) -> Option<Lexeme> {
        let lexeme = self.peek()?;
        self.cursor += 1;
        Some(lexeme)
    }

    fn text(&self, lexeme: &Lexeme) -> &'a str {
        lexeme.span.text(self.source)
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        Span::new(start, end).text(self.source)
    }

    /// The current token is the identifier `keyword`.
    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek()
            .is_some_and(|l| l.token == Token::Ident && self.text(&l) == keyword)
    }

    fn at_keyword_in(&self, offset: usize, keywords: &[&str]) -> bool {
        self.peek_at(offset)
            .is_some_and(|l| l.token == Token::Ident && keywords.contains(&self.text(&l)))
    }

    fn eat(&mut self, token: Token) -> bool {
        if self.peek_token() == Some(token) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Returns `true` if the current token is immediately adjacent (no
    /// whitespace) to the previous token.
    fn is_adjacent(&self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = &self.tokens[self.cursor - 1];
        self.peek().is_some_and(|curr| curr.span.start == prev.span.end)
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<Lexeme, ParseError> {
        match self.advance() {
            Some(l) if l.token == expected => Ok(l),
            Some(l) => Err(self.error_at(&l, &format!("expected {what}"))),
            None => Err(ParseError::UnexpectedEof(format!("expected {what}"))),
        }
    }

    fn expect_name(&mut self, what: &str) -> Result<Identifier, ParseError> {
        match self.advance() {
            Some(l) if l.token.is_name() => Ok(Identifier::new(self.text(&l), l.span)),
            Some(l) => Err(self.error_at(&l, &format!("expected {what}"))),
            None => Err(ParseError::UnexpectedEof(format!("expected {what}"))),
        }
    }

    fn error_at(&self, lexeme: &Lexeme, message: &str) -> ParseError {
        ParseError::UnexpectedToken {
            position: self.lines.position(lexeme.span.start),
            message: format!("{message}, got '{}'", self.text(lexeme)),
        }
    }

    fn error_here(&self, message: &str) -> ParseError {
        match self.peek() {
            Some(l) => self.error_at(&l, message),
            None => ParseError::UnexpectedEof(message.to_string()),
        }
    }

    /// Consume a bracketed group starting at the current opening token and
    /// return the matching closing token.
    fn skip_balanced(&mut self) -> Result<Lexeme, ParseError> {
        let open = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof("expected an opening bracket".into()))?;
        let mut stack = vec![closer_for(open.token)];

        while let Some(l) = self.advance() {
            if l.token.is_open() {
                stack.push(closer_for(l.token));
            } else if l.token.is_close() {
                if stack.pop() != Some(l.token) {
                    return Err(ParseError::MismatchedDelimiter {
                        position: self.lines.position(l.span.start),
                        message: format!(
                            "'{}' does not close '{}' opened at {}",
                            self.text(&l),
                            self.text(&open),
                            self.lines.position(open.span.start)
                        ),
                    });
                }
                if stack.is_empty() {
                    return Ok(l);
                }
            }
        }

        Err(ParseError::UnexpectedEof(format!(
            "'{}' opened at {} is never closed",
            self.text(&open),
            self.lines.position(open.span.start)
        )))
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    /// Parse one declaration: attributes, modifiers, then the keyword-specific
    /// remainder.
    fn parse_decl(&mut self) -> Result<Decl, ParseError> {
        let start = self
            .peek()
            .map(|l| l.span.start)
            .ok_or_else(|| ParseError::UnexpectedEof("expected a declaration".into()))?;

        let attributes = self.parse_attributes()?;
        let modifiers = self.parse_modifiers();

        let keyword = match self.peek() {
            Some(l) if l.token == Token::Ident => self.text(&l),
            _ => "",
        };

        match keyword {
            "struct" => self
                .parse_struct(start, attributes, modifiers)
                .map(Decl::Struct),
            "var" | "let" => self
                .parse_variable(start, attributes, modifiers)
                .map(Decl::Variable),
            "func" => self
                .parse_function(start, attributes, modifiers)
                .map(Decl::Function),
            other => match NominalKind::from_keyword(other) {
                Some(kind) => self
                    .parse_nominal(start, kind, attributes, modifiers)
                    .map(Decl::Nominal),
                None => self
                    .parse_other(start, attributes, modifiers)
                    .map(Decl::Other),
            },
        }
    }

    /// Parse `@Name`, `@Name<Args>` and `@Name(args)` attributes.
    fn parse_attributes(&mut self) -> Result<Vec<Attribute>, ParseError> {
        let mut attributes = Vec::new();

        while let Some(at) = self.peek().filter(|l| l.token == Token::Attribute) {
            self.advance();
            let name = self.text(&at)[1..].to_string();
            let mut end = at.span.end;
            let mut generic_arguments = Vec::new();
            let mut arguments = None;

            if self.peek_token() == Some(Token::LessThan) && self.is_adjacent() {
                let (args, args_end) = self.parse_generic_arguments()?;
                generic_arguments = args;
                end = args_end;
            }

            if self.peek_token() == Some(Token::ParenOpen) && self.is_adjacent() {
                let open = self.peek().map(|l| l.span.end).unwrap_or(end);
                let close = self.skip_balanced()?;
                arguments = Some(self.slice(open, close.span.start).trim().to_string());
                end = close.span.end;
            }

            attributes.push(Attribute {
                name,
                generic_arguments,
                arguments,
                span: Span::new(at.span.start, end),
            });
        }

        Ok(attributes)
    }

    /// Parse a `<...>` clause starting at the current `<`.
    ///
    /// Angle brackets are counted per character because `?>` or `>>` lex as a
    /// single operator token. Returns the top-level arguments and the byte
    /// offset just past the closing `>`.
    fn parse_generic_arguments(&mut self) -> Result<(Vec<String>, usize), ParseError> {
        let open = self.expect(Token::LessThan, "'<'")?;
        let mut depth = 1usize;
        let mut nesting = 0usize;
        let mut arg_start = open.span.end;
        let mut args = Vec::new();

        loop {
            let l = self.advance().ok_or_else(|| {
                ParseError::UnexpectedEof("expected '>' closing generic arguments".into())
            })?;
            match l.token {
                t if t.is_open() => nesting += 1,
                t if t.is_close() => nesting = nesting.saturating_sub(1),
                Token::Comma if depth == 1 && nesting == 0 => {
                    args.push(self.slice(arg_start, l.span.start).trim().to_string());
                    arg_start = l.span.end;
                }
                Token::LessThan | Token::GreaterThan | Token::Operator => {
                    for (i, ch) in self.text(&l).char_indices() {
                        match ch {
                            '<' => depth += 1,
                            '>' => {
                                depth -= 1;
                                if depth == 0 {
                                    let close = l.span.start + i;
                                    args.push(self.slice(arg_start, close).trim().to_string());
                                    return Ok((args, close + 1));
                                }
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn parse_modifiers(&mut self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();

        while let Some(l) = self.peek().filter(|l| l.token == Token::Ident) {
            let name = self.text(&l);
            let is_modifier = MODIFIERS.contains(&name)
                || (name == "class" && self.class_is_modifier());
            if !is_modifier {
                break;
            }
            self.advance();

            let mut span = l.span;
            let mut detail = None;
            // `private(set)`, `unowned(safe)`
            if self.peek_token() == Some(Token::ParenOpen) && self.is_adjacent() {
                if let (Some(inner), Some(close)) = (self.peek_at(1), self.peek_at(2)) {
                    if inner.token == Token::Ident && close.token == Token::ParenClose {
                        self.cursor += 3;
                        detail = Some(self.text(&inner).to_string());
                        span = span.join(close.span);
                    }
                }
            }

            modifiers.push(Modifier {
                name: name.to_string(),
                detail,
                span,
            });
        }

        modifiers
    }

    /// `class var`, `class func`: `class` used as a modifier.
    fn class_is_modifier(&self) -> bool {
        self.peek_at(1).is_some_and(|next| {
            let text = self.text(&next);
            next.token == Token::Ident
                && (matches!(text, "var" | "let" | "func" | "subscript" | "typealias")
                    || MODIFIERS.contains(&text))
        })
    }

    fn parse_struct(
        &mut self,
        start: usize,
        attributes: Vec<Attribute>,
        modifiers: Vec<Modifier>,
    ) -> Result<StructDecl, ParseError> {
        self.advance(); // `struct`
        let name = self.expect_name("struct name")?;

        let generic_parameters = self.parse_generic_clause()?;

        let mut inherited = Vec::new();
        if self.eat(Token::Colon) {
            loop {
                let span = self
                    .scan_type()
                    .ok_or_else(|| self.error_here("expected an inherited type"))?;
                inherited.push(span.text(self.source).trim().to_string());
                if !self.eat(Token::Comma) {
                    break;
                }
            }
        }

        let mut where_clause = None;
        if self.at_keyword("where") {
            self.advance();
            let clause_start = self.peek().map_or(self.source.len(), |l| l.span.start);
            let mut clause_end = clause_start;
            while let Some(l) = self.peek().filter(|l| l.token != Token::BraceOpen) {
                self.advance();
                clause_end = l.span.end;
            }
            where_clause = Some(self.slice(clause_start, clause_end).trim().to_string());
        }

        let open = self.expect(Token::BraceOpen, "'{' to open the struct body")?;
        let (members, close) = self.parse_members(&name.text)?;

        Ok(StructDecl {
            attributes,
            modifiers,
            name,
            generic_parameters,
            inherited,
            where_clause,
            members,
            span: Span::new(start, close.span.end),
            body: Span::new(open.span.start, close.span.end),
        })
    }

    /// Declarations up to and including the closing brace of a body whose
    /// `{` was already consumed.
    fn parse_members(&mut self, owner: &str) -> Result<(Vec<Decl>, Lexeme), ParseError> {
        let mut members = Vec::new();
        loop {
            match self.peek_token() {
                None => {
                    return Err(ParseError::UnexpectedEof(format!(
                        "expected '}}' closing '{owner}'"
                    )))
                }
                Some(Token::BraceClose) => break,
                Some(Token::Semicolon) => {
                    self.advance();
                }
                Some(_) => members.push(self.parse_decl()?),
            }
        }
        let close = self.expect(Token::BraceClose, "'}'")?;
        Ok((members, close))
    }

    /// Raw `<...>` generic parameter clause, if the current token opens one.
    fn parse_generic_clause(&mut self) -> Result<Option<String>, ParseError> {
        let Some(open) = self.peek().filter(|l| l.token == Token::LessThan) else {
            return Ok(None);
        };
        let (_, end) = self.parse_generic_arguments()?;
        Ok(Some(self.slice(open.span.start, end).to_string()))
    }

    fn parse_nominal(
        &mut self,
        start: usize,
        kind: NominalKind,
        attributes: Vec<Attribute>,
        modifiers: Vec<Modifier>,
    ) -> Result<NominalDecl, ParseError> {
        self.advance(); // keyword
        let name = self.expect_name("type name")?;

        // Header: generics, inheritance, where clause.
        while let Some(l) = self.peek() {
            match l.token {
                Token::BraceOpen => break,
                Token::ParenOpen | Token::BracketOpen => {
                    self.skip_balanced()?;
                }
                _ => {
                    self.advance();
                }
            }
        }
        if self.peek_token() != Some(Token::BraceOpen) {
            return Err(ParseError::UnexpectedEof(format!(
                "expected '{{' to open the body of '{}'",
                name.text
            )));
        }

        // Bodies the declaration parser cannot follow (enum cases with
        // payloads it misreads, protocol requirements) stay raw.
        let checkpoint = self.cursor;
        self.advance();
        let (members, close) = match self.parse_members(&name.text) {
            Ok(parsed) => parsed,
            Err(_) => {
                self.cursor = checkpoint;
                (Vec::new(), self.skip_balanced()?)
            }
        };

        Ok(NominalDecl {
            kind,
            attributes,
            modifiers,
            name,
            members,
            span: Span::new(start, close.span.end),
        })
    }

    /// Anything that is not a struct, nominal type, property or method.
    fn parse_other(
        &mut self,
        start: usize,
        attributes: Vec<Attribute>,
        modifiers: Vec<Modifier>,
    ) -> Result<OtherDecl, ParseError> {
        let mut end = start;
        let mut prev: Option<Lexeme> = None;

        while let Some(l) = self.peek() {
            if let Some(p) = prev {
                if l.newline_before && !continues_statement(p.token, l.token) {
                    break;
                }
            }
            match l.token {
                Token::Semicolon => break,
                t if t.is_close() => break,
                t if t.is_open() => {
                    let close = self.skip_balanced()?;
                    end = close.span.end;
                    prev = Some(close);
                    continue;
                }
                _ => {}
            }
            self.advance();
            end = l.span.end;
            prev = Some(l);
        }

        if prev.is_none() {
            return Err(self.error_here("expected a declaration"));
        }

        Ok(OtherDecl {
            attributes,
            modifiers,
            text: self.slice(start, end).to_string(),
            span: Span::new(start, end),
        })
    }

    // -----------------------------------------------------------------------
    // Variables
    // -----------------------------------------------------------------------

    fn parse_variable(
        &mut self,
        start: usize,
        attributes: Vec<Attribute>,
        modifiers: Vec<Modifier>,
    ) -> Result<VariableDecl, ParseError> {
        let keyword = self.expect(Token::Ident, "'var' or 'let'")?;
        let specifier = if self.text(&keyword) == "let" {
            BindingSpecifier::Let
        } else {
            BindingSpecifier::Var
        };

        let mut bindings = Vec::new();
        let end = loop {
            let binding = self.parse_pattern_binding()?;
            let end = binding.span.end;
            bindings.push(binding);
            if !self.eat(Token::Comma) {
                break end;
            }
        };

        Ok(VariableDecl {
            attributes,
            modifiers,
            specifier,
            bindings,
            span: Span::new(start, end),
        })
    }

    fn parse_pattern_binding(&mut self) -> Result<PatternBinding, ParseError> {
        let first = self
            .peek()
            .ok_or_else(|| ParseError::UnexpectedEof("expected a binding pattern".into()))?;

        let pattern = match first.token {
            t if t.is_name() => {
                self.advance();
                if self.text(&first) == "_" {
                    Pattern::Wildcard { span: first.span }
                } else {
                    Pattern::Identifier(Identifier::new(self.text(&first), first.span))
                }
            }
            Token::ParenOpen => {
                let close = self.skip_balanced()?;
                let span = Span::new(first.span.start, close.span.end);
                Pattern::Complex {
                    text: span.text(self.source).to_string(),
                    span,
                }
            }
            _ => return Err(self.error_at(&first, "expected a binding pattern")),
        };
        let mut end = pattern.span().end;

        let mut type_annotation = None;
        if self.eat(Token::Colon) {
            let span = self
                .scan_type()
                .ok_or_else(|| self.error_here("expected a type after ':'"))?;
            type_annotation = Some(TypeAnnotation {
                ty: span.text(self.source).trim().to_string(),
                span,
            });
            end = span.end;
        }

        let mut initializer = None;
        if self.eat(Token::Equals) {
            let span = self
                .scan_expression()
                .ok_or_else(|| self.error_here("expected an initial value after '='"))?;
            initializer = Some(Initializer {
                value: span.text(self.source).trim().to_string(),
                span,
            });
            end = span.end;
        }

        let mut accessor_block = None;
        if self.peek_token() == Some(Token::BraceOpen)
            && (initializer.is_none() || self.brace_starts_observers())
        {
            let block = self.parse_accessor_block()?;
            end = block.span().end;
            accessor_block = Some(block);
        }

        Ok(PatternBinding {
            pattern,
            type_annotation,
            initializer,
            accessor_block,
            span: Span::new(first.span.start, end),
        })
    }

    /// The current `{` opens a `willSet`/`didSet` block.
    fn brace_starts_observers(&self) -> bool {
        self.at_keyword_in(1, &["willSet", "didSet"])
    }

    /// The current `{` opens an explicit accessor list rather than an
    /// implicit getter body.
    fn brace_starts_accessors(&self) -> bool {
        let mut offset = 1;
        while self.at_keyword_in(offset, ACCESSOR_MODIFIERS) {
            offset += 1;
        }
        let Some(keyword) = self.peek_at(offset) else {
            return false;
        };
        if keyword.token != Token::Ident || AccessorKind::from_keyword(self.text(&keyword)).is_none()
        {
            return false;
        }
        self.peek_at(offset + 1).is_some_and(|next| {
            matches!(
                next.token,
                Token::BraceOpen | Token::BraceClose | Token::ParenOpen | Token::Ident
            )
        })
    }

    fn parse_accessor_block(&mut self) -> Result<AccessorBlock, ParseError> {
        let open = self
            .peek()
            .filter(|l| l.token == Token::BraceOpen)
            .ok_or_else(|| self.error_here("expected '{'"))?;

        if !self.brace_starts_accessors() {
            let close = self.skip_balanced()?;
            return Ok(AccessorBlock::Getter {
                body: self.slice(open.span.end, close.span.start).to_string(),
                span: Span::new(open.span.start, close.span.end),
            });
        }

        self.advance(); // `{`
        let mut accessors = Vec::new();
        loop {
            match self.peek_token() {
                None => {
                    return Err(ParseError::UnexpectedEof(
                        "expected '}' closing accessor block".into(),
                    ))
                }
                Some(Token::BraceClose) => break,
                Some(Token::Semicolon) => {
                    self.advance();
                }
                Some(_) => accessors.push(self.parse_accessor()?),
            }
        }
        let close = self.expect(Token::BraceClose, "'}'")?;

        Ok(AccessorBlock::Accessors {
            accessors,
            span: Span::new(open.span.start, close.span.end),
        })
    }

    fn parse_accessor(&mut self) -> Result<Accessor, ParseError> {
        let start = self.peek().map(|l| l.span.start).unwrap_or_default();

        let mut modifiers = Vec::new();
        while self.at_keyword_in(0, ACCESSOR_MODIFIERS) {
            if let Some(l) = self.advance() {
                modifiers.push(self.text(&l).to_string());
            }
        }

        let keyword = self.expect(Token::Ident, "an accessor")?;
        let kind = AccessorKind::from_keyword(self.text(&keyword))
            .ok_or_else(|| self.error_at(&keyword, "expected get, set, willSet or didSet"))?;
        let mut end = keyword.span.end;

        let mut parameter = None;
        if self.eat(Token::ParenOpen) {
            parameter = Some(self.expect_name("accessor parameter name")?.text);
            end = self.expect(Token::ParenClose, "')'")?.span.end;
        }

        let (effects, effects_end) = self.parse_effects()?;
        end = effects_end.unwrap_or(end);

        let mut body = None;
        if let Some(open) = self.peek().filter(|l| l.token == Token::BraceOpen) {
            let close = self.skip_balanced()?;
            body = Some(self.slice(open.span.end, close.span.start).to_string());
            end = close.span.end;
        }

        Ok(Accessor {
            kind,
            modifiers,
            parameter,
            effects,
            body,
            span: Span::new(start, end),
        })
    }

    /// `async`, `throws`, `throws(E)`, `rethrows`.
    fn parse_effects(&mut self) -> Result<(Vec<String>, Option<usize>), ParseError> {
        let mut effects = Vec::new();
        let mut end = None;

        while self.at_keyword_in(0, EFFECTS) {
            let Some(keyword) = self.advance() else { break };
            let mut effect_end = keyword.span.end;
            if self.peek_token() == Some(Token::ParenOpen) && self.is_adjacent() {
                effect_end = self.skip_balanced()?.span.end;
            }
            effects.push(self.slice(keyword.span.start, effect_end).to_string());
            end = Some(effect_end);
        }

        Ok((effects, end))
    }

    // -----------------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------------

    fn parse_function(
        &mut self,
        start: usize,
        attributes: Vec<Attribute>,
        modifiers: Vec<Modifier>,
    ) -> Result<FunctionDecl, ParseError> {
        self.advance(); // `func`

        let name_tok = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof("expected a function name".into()))?;
        let is_valid_name = name_tok.token.is_name()
            || matches!(
                name_tok.token,
                Token::Operator | Token::LessThan | Token::GreaterThan | Token::Bang | Token::Equals
            );
        if !is_valid_name {
            return Err(self.error_at(&name_tok, "expected a function name"));
        }
        let name = Identifier::new(self.text(&name_tok), name_tok.span);

        let generic_parameters = self.parse_generic_clause()?;

        self.expect(Token::ParenOpen, "'(' to open the parameter list")?;
        let parameters = self.parse_parameters()?;
        let mut end = self.expect(Token::ParenClose, "')' closing the parameter list")?.span.end;

        let (effects, effects_end) = self.parse_effects()?;
        end = effects_end.unwrap_or(end);

        let mut return_type = None;
        if self.eat(Token::Arrow) {
            let span = self
                .scan_type()
                .ok_or_else(|| self.error_here("expected a return type after '->'"))?;
            return_type = Some(span.text(self.source).trim().to_string());
            end = span.end;
        }

        let mut where_clause = None;
        if self.at_keyword("where") {
            self.advance();
            let clause_start = self.peek().map(|l| l.span.start).unwrap_or(end);
            let mut clause_end = clause_start;
            while let Some(l) = self.peek() {
                if l.token == Token::BraceOpen || (l.newline_before && clause_end > clause_start) {
                    break;
                }
                self.advance();
                clause_end = l.span.end;
            }
            where_clause = Some(self.slice(clause_start, clause_end).trim().to_string());
            end = clause_end;
        }

        let mut body = None;
        if let Some(open) = self.peek().filter(|l| l.token == Token::BraceOpen) {
            let close = self.skip_balanced()?;
            body = Some(self.slice(open.span.end, close.span.start).to_string());
            end = close.span.end;
        }

        Ok(FunctionDecl {
            attributes,
            modifiers,
            name,
            generic_parameters,
            parameters,
            effects,
            return_type,
            where_clause,
            body,
            span: Span::new(start, end),
        })
    }

    /// Parse parameters up to (not including) the closing `)`.
    fn parse_parameters(&mut self) -> Result<Vec<Parameter>, ParseError> {
        let mut parameters = Vec::new();

        while self
            .peek_token()
            .is_some_and(|t| t != Token::ParenClose)
        {
            parameters.push(self.parse_parameter()?);
            if !self.eat(Token::Comma) {
                break;
            }
        }

        Ok(parameters)
    }

    /// `first second: Type = default`
    fn parse_parameter(&mut self) -> Result<Parameter, ParseError> {
        let first = self.expect_name("a parameter name")?;

        let mut second_name = None;
        if self.peek().is_some_and(|l| l.token.is_name()) {
            second_name = Some(self.expect_name("a parameter name")?.text);
        }

        self.expect(Token::Colon, "':' after the parameter name")?;
        let ty_span = self
            .scan_type()
            .ok_or_else(|| self.error_here("expected a parameter type"))?;
        let mut end = ty_span.end;

        let mut default_value = None;
        if self.eat(Token::Equals) {
            let span = self
                .scan_expression()
                .ok_or_else(|| self.error_here("expected a default value after '='"))?;
            default_value = Some(span.text(self.source).trim().to_string());
            end = span.end;
        }

        Ok(Parameter {
            first_name: first.text,
            second_name,
            ty: ty_span.text(self.source).trim().to_string(),
            default_value,
            span: Span::new(first.span.start, end),
        })
    }

    // -----------------------------------------------------------------------
    // Raw scanning
    // -----------------------------------------------------------------------

    /// Consume a type and return its span.
    ///
    /// Stops before `,` `=` `{` `;`, a closing bracket, `where`, or a line
    /// break, as long as no `<`, `(` or `[` is still open.
    fn scan_type(&mut self) -> Option<Span> {
        let start = self.peek()?.span.start;
        let mut end = start;
        let mut angle = 0usize;
        let mut nesting = 0usize;

        while let Some(l) = self.peek() {
            let at_top = angle == 0 && nesting == 0;
            if at_top {
                let stops = matches!(
                    l.token,
                    Token::Comma | Token::Equals | Token::BraceOpen | Token::Semicolon
                ) || (l.token == Token::Ident && self.text(&l) == "where")
                    || (l.newline_before && end > start && l.token != Token::Arrow);
                if stops {
                    break;
                }
            }
            match l.token {
                t if t.is_open() => nesting += 1,
                t if t.is_close() => {
                    if nesting == 0 {
                        break;
                    }
                    nesting -= 1;
                }
                Token::LessThan | Token::GreaterThan | Token::Operator => {
                    for ch in self.text(&l).chars() {
                        match ch {
                            '<' => angle += 1,
                            '>' => angle = angle.saturating_sub(1),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
            self.advance();
            end = l.span.end;
        }

        (end > start).then(|| Span::new(start, end))
    }

    /// Consume an expression and return its span.
    ///
    /// Stops before `,` `;` or a closing bracket at depth zero, before a line
    /// break that does not continue the expression, and before a `{` that
    /// opens a property observer block.
    fn scan_expression(&mut self) -> Option<Span> {
        let start = self.peek()?.span.start;
        let mut end = start;
        let mut depth = 0usize;
        let mut prev: Option<Lexeme> = None;

        while let Some(l) = self.peek() {
            if depth == 0 {
                if let Some(p) = prev {
                    if l.newline_before && !continues_statement(p.token, l.token) {
                        break;
                    }
                }
                match l.token {
                    Token::Comma | Token::Semicolon => break,
                    t if t.is_close() => break,
                    Token::BraceOpen if prev.is_some() && self.brace_starts_observers() => break,
                    _ => {}
                }
            }
            if l.token.is_open() {
                depth += 1;
            } else if l.token.is_close() {
                depth = depth.saturating_sub(1);
            }
            self.advance();
            end = l.span.end;
            prev = Some(l);
        }

        (end > start).then(|| Span::new(start, end))
    }
}

fn closer_for(open: Token) -> Token {
    match open {
        Token::ParenOpen => Token::ParenClose,
        Token::BracketOpen => Token::BracketClose,
        _ => Token::BraceClose,
    }
}

/// A line break between `prev` and `next` does not end the statement.
fn continues_statement(prev: Token, next: Token) -> bool {
    matches!(
        next,
        Token::Dot | Token::Operator | Token::Arrow | Token::BraceOpen
    ) || matches!(
        prev,
        Token::Operator
            | Token::Equals
            | Token::Dot
            | Token::Comma
            | Token::Colon
            | Token::Arrow
            | Token::Question
    )
}
