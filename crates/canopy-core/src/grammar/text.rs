//! Grammar text format - parser and canonical printer
//!
//! ```text
//! // comment
//! terminals: Det N V
//! S  -> NP VP
//! NP -> N | Det N
//!     | NP PP
//! Det -> ε | D
//! ```
//!
//! Alternatives expand into consecutive rules in source order, so the first
//! alternative written becomes rule 0, the start rule. `terminals:` may appear
//! any number of times; the declared sets are unioned. `ε` alone stands for an
//! empty right-hand side.

use super::tokenizer::{Span, SpannedToken, Token, Tokenizer, EMPTY};
use super::{Grammar, Rule, Symbol};
use crate::{Error, Result};

// ── Public API ────────────────────────────────────────────

/// Parse grammar text and validate the resulting tables.
///
/// # Errors
/// `ParseError` (with line:column) for syntax violations, then any
/// `ConfigurationError` raised by [`Grammar::new`].
pub fn parse_grammar(text: &str) -> Result<Grammar> {
    let tokens = Tokenizer::new(text).tokenize()?;
    let (rules, terminals) = TextParser::new(tokens).parse()?;
    Grammar::new(rules, terminals)
}

/// Print a grammar in canonical text form.
///
/// Consecutive rules sharing a left-hand side are grouped with `|`; rule order
/// is preserved exactly, so `parse_grammar(&to_text(g)) == g`.
pub fn to_text(grammar: &Grammar) -> String {
    let mut out = String::new();

    if !grammar.terminals().is_empty() {
        out.push_str("terminals:");
        for terminal in grammar.terminals() {
            out.push(' ');
            out.push_str(terminal.as_str());
        }
        out.push('\n');
    }

    let width = grammar
        .rules()
        .iter()
        .map(|r| r.lhs.as_str().chars().count())
        .max()
        .unwrap_or(0);

    let mut previous: Option<&Symbol> = None;
    for rule in grammar.rules() {
        let rhs = if rule.rhs.is_empty() {
            EMPTY.to_string()
        } else {
            rule.rhs
                .iter()
                .map(Symbol::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        };
        if previous == Some(&rule.lhs) {
            out.push_str(&format!("{:width$}  | {}\n", "", rhs, width = width));
        } else {
            out.push_str(&format!("{:width$} -> {}\n", rule.lhs, rhs, width = width));
        }
        previous = Some(&rule.lhs);
    }

    out
}

// ── Parser ────────────────────────────────────────────────

struct TextParser {
    tokens: Vec<SpannedToken>,
    position: usize,
}

impl TextParser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        TextParser {
            tokens,
            position: 0,
        }
    }

    fn parse(mut self) -> Result<(Vec<Rule>, Vec<Symbol>)> {
        let mut rules = Vec::new();
        let mut terminals = Vec::new();

        loop {
            match self.peek() {
                Token::Eof => break,
                Token::Terminals => self.parse_terminals(&mut terminals)?,
                Token::Symbol(_) => self.parse_rule(&mut rules)?,
                other => {
                    return Err(Error::ParseError(format!(
                        "Expected a rule or `terminals:` at {}, found {}",
                        self.span(),
                        other
                    )));
                }
            }
        }

        Ok((rules, terminals))
    }

    // ── Token helpers ──────────────────────────────────────

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.position + offset)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or(Span {
                line: 1,
                column: 1,
                offset: 0,
            })
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn expect(&mut self, expected: Token, context: &str) -> Result<()> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(Error::ParseError(format!(
                "Expected {} {} at {}, found {}",
                expected,
                context,
                self.span(),
                self.peek()
            )))
        }
    }

    /// A rule begins wherever a symbol is directly followed by `->`.
    fn at_rule_start(&self) -> bool {
        matches!(self.peek(), Token::Symbol(_)) && *self.peek_at(1) == Token::Arrow
    }

    /// Symbols up to the next `|`, rule head, declaration, or end of input.
    fn symbol_run(&mut self) -> Vec<Symbol> {
        let mut symbols = Vec::new();
        while !self.at_rule_start() {
            match self.peek() {
                Token::Symbol(name) => {
                    symbols.push(Symbol::new(name.clone()));
                    self.advance();
                }
                _ => break,
            }
        }
        symbols
    }

    // ── Declarations ───────────────────────────────────────

    fn parse_terminals(&mut self, terminals: &mut Vec<Symbol>) -> Result<()> {
        self.advance(); // `terminals`
        self.expect(Token::Colon, "after `terminals`")?;
        terminals.extend(self.symbol_run());
        Ok(())
    }

    fn parse_rule(&mut self, rules: &mut Vec<Rule>) -> Result<()> {
        let lhs = match self.peek() {
            Token::Symbol(name) => Symbol::new(name.clone()),
            other => {
                return Err(Error::ParseError(format!(
                    "Expected rule head at {}, found {}",
                    self.span(),
                    other
                )));
            }
        };
        self.advance();
        self.expect(Token::Arrow, &format!("after `{}`", lhs))?;

        loop {
            let rhs = self.alternative(&lhs)?;
            rules.push(Rule {
                lhs: lhs.clone(),
                rhs,
            });

            if *self.peek() == Token::Pipe {
                self.advance();
            } else {
                break;
            }
        }

        Ok(())
    }

    /// One right-hand side: `ε`, or a non-empty run of symbols.
    fn alternative(&mut self, lhs: &Symbol) -> Result<Vec<Symbol>> {
        let span = self.span();
        if *self.peek() == Token::Empty {
            self.advance();
            if matches!(self.peek(), Token::Symbol(_)) && !self.at_rule_start() {
                return Err(Error::ParseError(format!(
                    "`{}` must stand alone in an alternative for `{}` at {}",
                    EMPTY, lhs, span
                )));
            }
            return Ok(Vec::new());
        }

        let rhs = self.symbol_run();
        if rhs.is_empty() {
            return Err(Error::ParseError(format!(
                "Empty alternative for `{}` at {} (write `{}` for an empty right-hand side)",
                lhs, span, EMPTY
            )));
        }
        Ok(rhs)
    }
}
