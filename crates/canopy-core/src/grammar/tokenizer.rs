//! Grammar tokenizer - converts grammar text into a token stream
//!
//! Handles: the `terminals` and `ε` keywords, symbol names, `->`, `|`, `:`.
//! Comments (`//` or `#` to end of line) are discarded. Newlines carry no
//! meaning; rule boundaries are found by the parser.
//!
//! Every error carries the line:column where it occurred. `offset` in a
//! [`Span`] is a byte offset into the source.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

/// Token types for grammar text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `terminals`
    Terminals,
    /// `ε`, an empty right-hand side
    Empty,
    /// A grammar symbol name
    Symbol(String),

    Arrow, // ->
    Pipe,  // |
    Colon, // :

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Terminals => write!(f, "`terminals`"),
            Token::Empty => write!(f, "`ε`"),
            Token::Symbol(name) => write!(f, "symbol `{}`", name),
            Token::Arrow => write!(f, "`->`"),
            Token::Pipe => write!(f, "`|`"),
            Token::Colon => write!(f, "`:`"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// Source position of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenizer for grammar source text
pub struct Tokenizer<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Tokenizer {
            text,
            chars: text.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input; the stream always ends with [`Token::Eof`].
    pub fn tokenize(&mut self) -> crate::Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();

        while let Some((span, ch)) = self.skip_trivia() {
            let token = match ch {
                '|' => {
                    self.bump();
                    Token::Pipe
                }
                ':' => {
                    self.bump();
                    Token::Colon
                }
                '-' => {
                    self.bump();
                    if !self.eat('>') {
                        return Err(unexpected(ch, span));
                    }
                    Token::Arrow
                }
                c if is_symbol_char(c) => self.symbol(span.offset),
                c => return Err(unexpected(c, span)),
            };
            tokens.push(SpannedToken { token, span });
        }

        let span = self.span();
        tokens.push(SpannedToken {
            token: Token::Eof,
            span,
        });
        Ok(tokens)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn span(&mut self) -> Span {
        let offset = self
            .chars
            .peek()
            .map(|&(i, _)| i)
            .unwrap_or(self.text.len());
        Span {
            line: self.line,
            column: self.column,
            offset,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        let found = self.peek() == Some(expected);
        if found {
            self.bump();
        }
        found
    }

    /// Skip whitespace and comments, then report where the next token starts.
    fn skip_trivia(&mut self) -> Option<(Span, char)> {
        loop {
            let span = self.span();
            let ch = self.peek()?;
            if ch.is_whitespace() {
                self.bump();
            } else if ch == '#' || self.text[span.offset..].starts_with("//") {
                while self.peek().map_or(false, |c| c != '\n') {
                    self.bump();
                }
            } else {
                return Some((span, ch));
            }
        }
    }

    fn symbol(&mut self, start: usize) -> Token {
        while self.peek().map_or(false, is_symbol_char) {
            self.bump();
        }
        let end = self.span().offset;
        match &self.text[start..end] {
            "terminals" => Token::Terminals,
            EMPTY => Token::Empty,
            name => Token::Symbol(name.to_string()),
        }
    }
}

/// Written for an empty right-hand side
pub const EMPTY: &str = "ε";

/// Words that tokenize as keywords and so cannot name a symbol
pub const KEYWORDS: [&str; 2] = ["terminals", EMPTY];

pub fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '\'' | '.' | '$')
}

fn unexpected(ch: char, span: Span) -> crate::Error {
    crate::Error::ParseError(format!("Unexpected character '{}' at {}", ch, span))
}
