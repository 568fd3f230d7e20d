//! Grammar model - ordered rule table plus terminal-symbol set
//!
//! Rule 0 is the designated start rule: its left-hand side labels the root
//! of every tree the parser returns. A symbol in the terminal set is matched
//! directly against input tokens; every other symbol is a non-terminal and
//! must be defined by at least one rule. Any rule but rule 0 may have an
//! empty right-hand side; a non-terminal that derives the empty string is
//! *nullable*.
//!
//! A [`Grammar`] can only be obtained through validation, so the chart
//! builder and forest extractor never see a malformed table.

pub mod text;
pub mod tokenizer;

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

pub use text::{parse_grammar, to_text};

// ── Symbols & Rules ───────────────────────────────────────

/// An opaque grammar symbol name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol(s.to_string())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol(s)
    }
}

impl From<&String> for Symbol {
    fn from(s: &String) -> Self {
        Symbol(s.clone())
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Build a symbol sequence, e.g. an input of category tags.
pub fn symbols<I, S>(names: I) -> Vec<Symbol>
where
    I: IntoIterator<Item = S>,
    S: Into<Symbol>,
{
    names.into_iter().map(Into::into).collect()
}

/// A production `lhs -> rhs[0] rhs[1] ...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RuleRepr")]
pub struct Rule {
    pub lhs: Symbol,
    pub rhs: Vec<Symbol>,
}

impl Rule {
    pub fn new<L, I, S>(lhs: L, rhs: I) -> Self
    where
        L: Into<Symbol>,
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        Rule {
            lhs: lhs.into(),
            rhs: symbols(rhs),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ->", self.lhs)?;
        if self.rhs.is_empty() {
            return write!(f, " {}", tokenizer::EMPTY);
        }
        for sym in &self.rhs {
            write!(f, " {}", sym)?;
        }
        Ok(())
    }
}

/// Accepts both `{"lhs": "S", "rhs": [...]}` and the `["S", [...]]` tuple form.
#[derive(Deserialize)]
#[serde(untagged)]
enum RuleRepr {
    Object { lhs: Symbol, rhs: Vec<Symbol> },
    Tuple(Symbol, Vec<Symbol>),
}

impl From<RuleRepr> for Rule {
    fn from(repr: RuleRepr) -> Self {
        match repr {
            RuleRepr::Object { lhs, rhs } | RuleRepr::Tuple(lhs, rhs) => Rule { lhs, rhs },
        }
    }
}

// ── Grammar ───────────────────────────────────────────────

/// A validated, immutable grammar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GrammarTables", into = "GrammarTables")]
pub struct Grammar {
    rules: Vec<Rule>,
    terminals: BTreeSet<Symbol>,
    /// Rule ids per left-hand side, in table order
    by_lhs: HashMap<Symbol, Vec<usize>>,
    nullable: BTreeSet<Symbol>,
}

/// Serialized shape of a grammar
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GrammarTables {
    rules: Vec<Rule>,
    terminals: Vec<Symbol>,
}

impl TryFrom<GrammarTables> for Grammar {
    type Error = Error;

    fn try_from(tables: GrammarTables) -> Result<Self> {
        Grammar::new(tables.rules, tables.terminals)
    }
}

impl From<Grammar> for GrammarTables {
    fn from(grammar: Grammar) -> Self {
        GrammarTables {
            rules: grammar.rules,
            terminals: grammar.terminals.into_iter().collect(),
        }
    }
}

impl Grammar {
    /// Validate a rule table and terminal set.
    ///
    /// # Errors
    /// `ConfigurationError` when the table is empty, rule 0 has an empty
    /// right-hand side, a symbol name cannot be written in grammar text, a
    /// terminal appears as a left-hand side, a non-terminal has no defining
    /// rule, or a non-terminal derives itself.
    pub fn new<I, S>(rules: Vec<Rule>, terminals: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        let terminals: BTreeSet<Symbol> = terminals.into_iter().map(Into::into).collect();
        validate(&rules, &terminals)?;
        Ok(Self::from_validated(rules, terminals))
    }

    fn from_validated(rules: Vec<Rule>, terminals: BTreeSet<Symbol>) -> Self {
        let mut by_lhs: HashMap<Symbol, Vec<usize>> = HashMap::new();
        for (id, rule) in rules.iter().enumerate() {
            by_lhs.entry(rule.lhs.clone()).or_default().push(id);
        }
        let nullable = nullable_symbols(&rules);
        Grammar {
            rules,
            terminals,
            by_lhs,
            nullable,
        }
    }

    /// The phrase-structure grammar for simple English sentences that ships
    /// with Canopy (terminals: Det N V C Adv A P).
    pub fn english() -> Self {
        let rules = ENGLISH_RULES
            .iter()
            .map(|(lhs, rhs)| Rule::new(*lhs, rhs.iter().copied()))
            .collect();
        let terminals = ENGLISH_TERMINALS.iter().map(|t| Symbol::from(*t)).collect();
        Self::from_validated(rules, terminals)
    }

    /// Decode a grammar from JSON and validate it.
    ///
    /// # Errors
    /// `SerializationError` if the JSON does not have the grammar shape, then
    /// any `ConfigurationError` raised by [`Grammar::new`].
    pub fn from_json(json: &str) -> Result<Self> {
        let tables: GrammarTables = serde_json::from_str(json)?;
        Grammar::try_from(tables)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rule by id.
    ///
    /// # Panics
    /// On an out-of-range id; ids only come from this grammar's own tables.
    pub fn rule(&self, id: usize) -> &Rule {
        &self.rules[id]
    }

    pub fn start_rule(&self) -> &Rule {
        &self.rules[0]
    }

    pub fn terminals(&self) -> &BTreeSet<Symbol> {
        &self.terminals
    }

    pub fn is_terminal(&self, sym: &Symbol) -> bool {
        self.terminals.contains(sym)
    }

    /// Ids of the rules whose left-hand side is `sym`, in table order
    pub fn rules_for(&self, sym: &Symbol) -> &[usize] {
        self.by_lhs.get(sym).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nonterminals(&self) -> BTreeSet<&Symbol> {
        self.rules.iter().map(|r| &r.lhs).collect()
    }

    /// Whether `sym` is a non-terminal deriving the empty string
    pub fn is_nullable(&self, sym: &Symbol) -> bool {
        self.nullable.contains(sym)
    }

    pub fn nullable(&self) -> &BTreeSet<Symbol> {
        &self.nullable
    }

    /// Fewest input positions `symbols` can derive: one per terminal or
    /// non-nullable non-terminal.
    pub fn min_width(&self, symbols: &[Symbol]) -> usize {
        symbols.iter().filter(|s| !self.is_nullable(s)).count()
    }

    /// Canonical text form (see [`text::to_text`])
    pub fn to_text(&self) -> String {
        text::to_text(self)
    }

    /// Hex SHA-256 of the canonical text form.
    ///
    /// Validation keeps every symbol name within the text charset, so the
    /// text form is lossless: two grammars share a fingerprint iff they have
    /// the same rules in the same order and the same terminal set.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_text().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn summary(&self) -> GrammarSummary {
        GrammarSummary {
            rules: self.rules.len(),
            terminals: self.terminals.len(),
            nonterminals: self.nonterminals().len(),
            start: self.start_rule().lhs.clone(),
            fingerprint: self.fingerprint(),
        }
    }
}

/// Size and identity of a grammar, as reported by `canopy check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrammarSummary {
    pub rules: usize,
    pub terminals: usize,
    pub nonterminals: usize,
    pub start: Symbol,
    pub fingerprint: String,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Load a grammar file: `.json` is decoded as JSON, anything else as text.
pub fn load(path: &Path) -> Result<Grammar> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        Error::InputError(format!("cannot read grammar {}: {}", path.display(), e))
    })?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        Grammar::from_json(&source)
    } else {
        parse_grammar(&source)
    }
}

// ── Validation ────────────────────────────────────────────

fn validate(rules: &[Rule], terminals: &BTreeSet<Symbol>) -> Result<()> {
    let start = rules
        .first()
        .ok_or_else(|| Error::ConfigurationError("grammar has no rules".into()))?;
    if start.rhs.is_empty() {
        return Err(Error::ConfigurationError(format!(
            "start rule `{}` has an empty right-hand side",
            start.lhs
        )));
    }

    for sym in terminals {
        check_name(sym)?;
    }
    for rule in rules {
        check_name(&rule.lhs)?;
        for sym in &rule.rhs {
            check_name(sym)?;
        }
    }

    let defined: HashSet<&Symbol> = rules.iter().map(|r| &r.lhs).collect();

    for (id, rule) in rules.iter().enumerate() {
        if terminals.contains(&rule.lhs) {
            return Err(Error::ConfigurationError(format!(
                "terminal `{}` is the left-hand side of rule {}",
                rule.lhs, id
            )));
        }
        for sym in &rule.rhs {
            if !terminals.contains(sym) && !defined.contains(sym) {
                return Err(Error::ConfigurationError(format!(
                    "non-terminal `{}` in rule {} (`{}`) has no defining rule",
                    sym, id, rule
                )));
            }
        }
    }

    let nullable = nullable_symbols(rules);
    if let Some(cycle) = find_cycle(rules, terminals, &nullable) {
        let path: Vec<&str> = cycle.iter().map(|s| s.as_str()).collect();
        return Err(Error::ConfigurationError(format!(
            "derivation cycle: {}",
            path.join(" -> ")
        )));
    }

    Ok(())
}

/// Every name must survive a trip through the text form.
fn check_name(sym: &Symbol) -> Result<()> {
    let name = sym.as_str();
    if name.is_empty() {
        return Err(Error::ConfigurationError("empty symbol name".into()));
    }
    if let Some(bad) = name.chars().find(|&c| !tokenizer::is_symbol_char(c)) {
        return Err(Error::ConfigurationError(format!(
            "symbol `{}` contains {:?}; names use letters, digits, `_`, `'`, `.` and `$`",
            name, bad
        )));
    }
    if tokenizer::KEYWORDS.contains(&name) {
        return Err(Error::ConfigurationError(format!(
            "`{}` is a keyword and cannot name a symbol",
            name
        )));
    }
    Ok(())
}

/// Fixpoint: a left-hand side is nullable once some rule for it has only
/// nullable symbols on its right-hand side.
fn nullable_symbols(rules: &[Rule]) -> BTreeSet<Symbol> {
    let mut nullable = BTreeSet::new();
    loop {
        let before = nullable.len();
        for rule in rules {
            if !nullable.contains(&rule.lhs) && rule.rhs.iter().all(|s| nullable.contains(s)) {
                nullable.insert(rule.lhs.clone());
            }
        }
        if nullable.len() == before {
            return nullable;
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

/// A cycle `A -> B -> ... -> A`, if any, where each step is a rule whose
/// other right-hand side symbols are all nullable. Such a grammar derives the
/// same span in infinitely many ways.
fn find_cycle<'a>(
    rules: &'a [Rule],
    terminals: &BTreeSet<Symbol>,
    nullable: &BTreeSet<Symbol>,
) -> Option<Vec<&'a Symbol>> {
    let mut edges: BTreeMap<&Symbol, Vec<&Symbol>> = BTreeMap::new();
    for rule in rules {
        for (i, sym) in rule.rhs.iter().enumerate() {
            if terminals.contains(sym) {
                continue;
            }
            let rest_nullable = rule
                .rhs
                .iter()
                .enumerate()
                .all(|(j, other)| j == i || nullable.contains(other));
            if rest_nullable {
                edges.entry(&rule.lhs).or_default().push(sym);
            }
        }
    }

    let mut marks: HashMap<&Symbol, Mark> = HashMap::new();
    let mut path: Vec<&Symbol> = Vec::new();
    for &start in edges.keys() {
        if visit(start, &edges, &mut marks, &mut path) {
            // keep only the cycle itself, not the walk that led into it
            let last = path[path.len() - 1];
            let first = path.iter().position(|s| *s == last).unwrap_or(0);
            return Some(path.split_off(first));
        }
    }
    None
}

fn visit<'a>(
    node: &'a Symbol,
    edges: &BTreeMap<&'a Symbol, Vec<&'a Symbol>>,
    marks: &mut HashMap<&'a Symbol, Mark>,
    path: &mut Vec<&'a Symbol>,
) -> bool {
    match marks.get(node) {
        Some(Mark::Done) => return false,
        Some(Mark::Active) => {
            path.push(node);
            return true;
        }
        None => {}
    }

    marks.insert(node, Mark::Active);
    path.push(node);
    for &next in edges.get(node).into_iter().flatten() {
        if visit(next, edges, marks, path) {
            return true;
        }
    }
    path.pop();
    marks.insert(node, Mark::Done);
    false
}

// ── Built-in English grammar ──────────────────────────────

const ENGLISH_TERMINALS: &[&str] = &["Det", "N", "V", "C", "Adv", "A", "P"];

const ENGLISH_RULES: &[(&str, &[&str])] = &[
    ("S", &["NP", "VP"]),
    ("NP", &["N"]),
    ("NP", &["Det", "N"]),
    ("NP", &["AP", "N"]),
    ("NP", &["Det", "AP", "N"]),
    ("NP", &["N", "PP"]),
    ("NP", &["Det", "N", "PP"]),
    ("NP", &["AP", "N", "PP"]),
    ("NP", &["Det", "AP", "N", "PP"]),
    ("VP", &["V"]),
    ("VP", &["V", "NP"]),
    ("VP", &["V", "CP"]),
    ("VP", &["V", "PP"]),
    ("VP", &["V", "NP", "PP"]),
    ("VP", &["V", "CP", "PP"]),
    ("CP", &["C", "S"]),
    ("AP", &["Adv", "A"]),
    ("AP", &["A"]),
    ("PP", &["P", "NP"]),
];
