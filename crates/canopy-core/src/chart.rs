//! Chart builder - predict / scan / complete until fixpoint
//!
//! For an input of length `n` the chart holds `n + 1` state sets. State set
//! `k` contains every [`Item`] consistent with the first `k` input symbols.
//!
//! # Construction
//!
//! Set 0 is seeded with `(rule 0, dot 0, start 0)`. Sets are then processed in
//! order; each is a FIFO work queue walked by index, so items appended while
//! it is being processed are visited in the same pass:
//!
//! - **Complete** (dot at end): advance every item in set `start` that waits
//!   on this rule's left-hand side, into set `k`
//! - **Predict** (non-terminal after dot): add `(r, 0, k)` for every rule `r`
//!   defining it, into set `k`. If the non-terminal is nullable, also advance
//!   the item over it in place: its empty completion may already have been
//!   processed earlier in this set, before the item was added.
//! - **Scan** (terminal after dot): if `input[k]` matches, advance the item
//!   into set `k + 1`
//!
//! Additions that are already present are dropped, which bounds every set
//! and guarantees the fixpoint is reached.

use std::collections::HashSet;
use std::fmt;

use log::{debug, trace};

use crate::grammar::{Grammar, Symbol};

/// "Recognized `rhs[..dot]` of `rule`, beginning at input position `start`."
///
/// The current position is implicit: it is the index of the state set
/// holding the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Item {
    pub rule: usize,
    pub dot: usize,
    pub start: usize,
}

impl Item {
    pub fn is_complete(&self, grammar: &Grammar) -> bool {
        self.dot == grammar.rule(self.rule).rhs.len()
    }

    /// The symbol right after the dot, if any
    pub fn next_symbol<'g>(&self, grammar: &'g Grammar) -> Option<&'g Symbol> {
        grammar.rule(self.rule).rhs.get(self.dot)
    }

    fn advanced(self) -> Item {
        Item {
            dot: self.dot + 1,
            ..self
        }
    }
}

/// Items at one input position, deduplicated, in discovery order
#[derive(Debug, Clone, Default)]
pub struct StateSet {
    items: Vec<Item>,
    seen: HashSet<Item>,
}

impl StateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` unless an equal item is already present.
    /// Returns whether it was added.
    pub fn insert(&mut self, item: Item) -> bool {
        if self.seen.insert(item) {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, item: &Item) -> bool {
        self.seen.contains(item)
    }

    pub fn get(&self, index: usize) -> Option<Item> {
        self.items.get(index).copied()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// All state sets for one input
#[derive(Debug, Clone)]
pub struct Chart {
    sets: Vec<StateSet>,
}

impl Chart {
    /// Run the recognizer over `input` to fixpoint.
    pub fn build(grammar: &Grammar, input: &[Symbol]) -> Chart {
        let n = input.len();
        let mut sets: Vec<StateSet> = (0..=n).map(|_| StateSet::new()).collect();
        sets[0].insert(Item {
            rule: 0,
            dot: 0,
            start: 0,
        });

        for k in 0..=n {
            let mut cursor = 0;
            while let Some(item) = sets[k].get(cursor) {
                assert!(
                    item.start <= k,
                    "item {:?} in state set {} starts beyond its position",
                    item,
                    k
                );

                match item.next_symbol(grammar) {
                    None => complete(grammar, &mut sets, k, item),
                    Some(sym) if grammar.is_terminal(sym) => {
                        if k < n && input[k] == *sym && sets[k + 1].insert(item.advanced()) {
                            trace!("scan {:?} into set {}", item.advanced(), k + 1);
                        }
                    }
                    Some(sym) => {
                        for &rule in grammar.rules_for(sym) {
                            let predicted = Item {
                                rule,
                                dot: 0,
                                start: k,
                            };
                            if sets[k].insert(predicted) {
                                trace!("predict {:?} in set {}", predicted, k);
                            }
                        }
                        if grammar.is_nullable(sym) && sets[k].insert(item.advanced()) {
                            trace!("skip nullable {:?} in set {}", item.advanced(), k);
                        }
                    }
                }

                cursor += 1;
            }
        }

        let chart = Chart { sets };
        debug!(
            "chart built: {} positions, {} items",
            chart.sets.len(),
            chart.item_count()
        );
        chart
    }

    /// Whether the last state set holds `(rule 0, dot at end, start 0)`.
    ///
    /// Only rule 0 itself counts, not other rules sharing its left-hand side.
    pub fn is_accepted(&self, grammar: &Grammar) -> bool {
        let accepting = Item {
            rule: 0,
            dot: grammar.start_rule().rhs.len(),
            start: 0,
        };
        self.sets
            .last()
            .map(|set| set.contains(&accepting))
            .unwrap_or(false)
    }

    pub fn sets(&self) -> &[StateSet] {
        &self.sets
    }

    /// Length of the input this chart was built for
    pub fn input_len(&self) -> usize {
        self.sets.len() - 1
    }

    pub fn item_count(&self) -> usize {
        self.sets.iter().map(StateSet::len).sum()
    }

    /// Human-readable dump, one item per line:
    /// `[2] NP -> Det • N  (1)`
    pub fn display<'a>(&'a self, grammar: &'a Grammar) -> ChartDisplay<'a> {
        ChartDisplay {
            chart: self,
            grammar,
        }
    }
}

/// Advance every item in `sets[item.start]` waiting on `item`'s left-hand side.
///
/// An empty completion has `item.start == k` and reads the set being built.
fn complete(grammar: &Grammar, sets: &mut [StateSet], k: usize, item: Item) {
    let lhs = &grammar.rule(item.rule).lhs;
    let waiting: Vec<Item> = sets[item.start]
        .items()
        .iter()
        .filter(|parent| parent.next_symbol(grammar) == Some(lhs))
        .map(|parent| parent.advanced())
        .collect();

    for advanced in waiting {
        if sets[k].insert(advanced) {
            trace!("complete {:?} in set {}", advanced, k);
        }
    }
}

pub struct ChartDisplay<'a> {
    chart: &'a Chart,
    grammar: &'a Grammar,
}

impl fmt::Display for ChartDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (k, set) in self.chart.sets.iter().enumerate() {
            writeln!(f, "== state set {} ({} items)", k, set.len())?;
            for item in set.items() {
                let rule = self.grammar.rule(item.rule);
                write!(f, "[{}] {} ->", k, rule.lhs)?;
                for (i, sym) in rule.rhs.iter().enumerate() {
                    if i == item.dot {
                        write!(f, " •")?;
                    }
                    write!(f, " {}", sym)?;
                }
                if item.dot == rule.rhs.len() {
                    write!(f, " •")?;
                }
                writeln!(f, "  ({})", item.start)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{symbols, Rule};

    fn tiny() -> Grammar {
        Grammar::new(
            vec![
                Rule::new("S", ["NP", "VP"]),
                Rule::new("NP", ["N"]),
                Rule::new("VP", ["V"]),
            ],
            ["N", "V"],
        )
        .unwrap()
    }

    fn item(rule: usize, dot: usize, start: usize) -> Item {
        Item { rule, dot, start }
    }

    // ── StateSet ───────────────────────────────────────

    #[test]
    fn test_state_set_dedup_keeps_order() {
        let mut set = StateSet::new();
        assert!(set.insert(item(1, 0, 0)));
        assert!(set.insert(item(0, 0, 0)));
        assert!(!set.insert(item(1, 0, 0)));
        assert_eq!(set.items(), &[item(1, 0, 0), item(0, 0, 0)]);
        assert!(set.contains(&item(0, 0, 0)));
        assert!(!set.contains(&item(0, 1, 0)));
    }

    // ── Construction ───────────────────────────────────

    #[test]
    fn test_build_tiny_accepts() {
        let grammar = tiny();
        let chart = Chart::build(&grammar, &symbols(["N", "V"]));
        assert_eq!(chart.sets().len(), 3);
        assert_eq!(chart.input_len(), 2);
        assert_eq!(chart.sets()[0].items(), &[item(0, 0, 0), item(1, 0, 0)]);
        assert_eq!(
            chart.sets()[1].items(),
            &[item(1, 1, 0), item(0, 1, 0), item(2, 0, 1)]
        );
        assert_eq!(chart.sets()[2].items(), &[item(2, 1, 1), item(0, 2, 0)]);
        assert!(chart.is_accepted(&grammar));
    }

    #[test]
    fn test_build_rejects() {
        let grammar = tiny();
        let chart = Chart::build(&grammar, &symbols(["V", "V"]));
        assert!(!chart.is_accepted(&grammar));
        assert!(chart.sets()[1].is_empty());
        assert!(chart.sets()[2].is_empty());
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let grammar = tiny();
        let chart = Chart::build(&grammar, &[]);
        assert_eq!(chart.sets().len(), 1);
        assert!(!chart.is_accepted(&grammar));
    }

    #[test]
    fn test_prefix_is_not_accepted() {
        let grammar = tiny();
        let chart = Chart::build(&grammar, &symbols(["N"]));
        assert!(!chart.is_accepted(&grammar));
    }

    #[test]
    fn test_unknown_symbol_stops_scanning() {
        let grammar = tiny();
        let chart = Chart::build(&grammar, &symbols(["N", "Q"]));
        assert!(!chart.is_accepted(&grammar));
        assert!(chart.sets()[2].is_empty());
    }

    #[test]
    fn test_left_recursion_terminates() {
        let grammar = Grammar::new(
            vec![Rule::new("S", ["S", "N"]), Rule::new("S", ["N"])],
            ["N"],
        )
        .unwrap();
        let chart = Chart::build(&grammar, &symbols(["N", "N", "N"]));
        assert!(chart.is_accepted(&grammar));
    }

    // ── Empty right-hand sides ─────────────────────────

    #[test]
    fn test_nullable_is_skipped_at_prediction() {
        let grammar = Grammar::new(
            vec![Rule::new("S", ["A", "N"]), Rule::new("A", Vec::<&str>::new())],
            ["N"],
        )
        .unwrap();
        let chart = Chart::build(&grammar, &symbols(["N"]));
        assert_eq!(
            chart.sets()[0].items(),
            &[item(0, 0, 0), item(1, 0, 0), item(0, 1, 0)]
        );
        assert_eq!(chart.sets()[1].items(), &[item(0, 2, 0)]);
        assert!(chart.is_accepted(&grammar));
    }

    #[test]
    fn test_nullable_completed_before_its_parent_is_predicted() {
        // A -> ε completes before B -> • A is predicted in the same set
        let grammar = Grammar::new(
            vec![
                Rule::new("S", ["A", "B", "N"]),
                Rule::new("A", Vec::<&str>::new()),
                Rule::new("B", ["A"]),
            ],
            ["N"],
        )
        .unwrap();
        let chart = Chart::build(&grammar, &symbols(["N"]));
        assert!(chart.sets()[0].contains(&item(2, 1, 0)), "B -> A • missing");
        assert!(chart.is_accepted(&grammar));
    }

    #[test]
    fn test_nullable_start_accepts_empty_input() {
        let grammar = Grammar::new(
            vec![Rule::new("S", ["A"]), Rule::new("A", Vec::<&str>::new())],
            ["N"],
        )
        .unwrap();
        assert!(Chart::build(&grammar, &[]).is_accepted(&grammar));
        assert!(!Chart::build(&grammar, &symbols(["N"])).is_accepted(&grammar));
    }

    #[test]
    fn test_acceptance_requires_rule_zero() {
        // S -> N N is rule 0; the input only matches the second S rule
        let grammar = Grammar::new(
            vec![Rule::new("S", ["N", "N"]), Rule::new("S", ["N"])],
            ["N"],
        )
        .unwrap();
        let chart = Chart::build(&grammar, &symbols(["N"]));
        assert!(!chart.is_accepted(&grammar));
    }

    #[test]
    fn test_no_duplicate_items_in_any_set() {
        let grammar = Grammar::english();
        let input = symbols(["N", "V", "Det", "N", "P", "Det", "N", "P", "N"]);
        let chart = Chart::build(&grammar, &input);
        for (k, set) in chart.sets().iter().enumerate() {
            let unique: HashSet<&Item> = set.items().iter().collect();
            assert_eq!(unique.len(), set.len(), "duplicate item in set {}", k);
            for it in set.items() {
                assert!(it.start <= k);
            }
        }
    }

    #[test]
    fn test_build_does_not_mutate_grammar() {
        let grammar = Grammar::english();
        let before = grammar.clone();
        let _ = Chart::build(&grammar, &symbols(["N", "V"]));
        assert_eq!(grammar, before);
    }

    // ── Display ────────────────────────────────────────

    #[test]
    fn test_display() {
        let grammar = tiny();
        let chart = Chart::build(&grammar, &symbols(["N", "V"]));
        let dump = chart.display(&grammar).to_string();
        assert!(dump.contains("== state set 0 (2 items)"));
        assert!(dump.contains("[0] S -> • NP VP  (0)"));
        assert!(dump.contains("[1] S -> NP • VP  (0)"));
        assert!(dump.contains("[2] S -> NP VP •  (0)"));
    }
}
