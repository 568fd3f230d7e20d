//! Canopy Core - chart parsing with full parse-forest enumeration
//!
//! Given a context-free grammar, its terminal set, and a sequence of input
//! symbols (typically part-of-speech tags), Canopy decides whether the grammar
//! derives the input and, if it does, returns *every* distinct derivation as
//! its own tree.
//!
//! # Architecture
//!
//! ```text
//! Grammar + input → Chart Builder → accepted? → Completed-Item Index
//!                                                   ↓
//!                                   Forest Extractor → Vec<TreeNode>
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: same grammar and input always produce the same forest
//! - **Pure**: no I/O, no shared state; grammars are only ever borrowed
//! - **Exclusive**: no two returned trees (or sibling branches) share a node,
//!   so trees can be rewritten in place
//! - **Total**: an input the grammar cannot derive yields an empty forest,
//!   never an error

pub mod chart;
pub mod completed;
pub mod error;
pub mod forest;
pub mod grammar;
pub mod sentence;
pub mod tree;

use log::debug;

pub use error::{Error, Result};
pub use grammar::{symbols, Grammar, GrammarSummary, Rule, Symbol};
pub use sentence::{parse_sentence, split_words, ParseLimits, TagLattice};
pub use tree::TreeNode;

use chart::Chart;
use completed::CompletedIndex;

/// Parse `input` and return every derivation rooted at the start rule.
///
/// An empty result means the grammar does not derive `input`.
///
/// # Example
/// ```
/// use canopy_core::{parse, symbols, Grammar};
///
/// let grammar = Grammar::english();
/// let forest = parse(&grammar, &symbols(["N", "V"]));
/// assert_eq!(forest[0].to_string(), "S(NP(N), VP(V))");
/// ```
pub fn parse(grammar: &Grammar, input: &[Symbol]) -> Vec<TreeNode> {
    let chart = Chart::build(grammar, input);
    if !chart.is_accepted(grammar) {
        debug!(
            "input of {} symbols is not derivable from `{}`",
            input.len(),
            grammar.start_rule().lhs
        );
        return Vec::new();
    }

    let index = CompletedIndex::from_chart(&chart, grammar);
    forest::extract(grammar, &index, input)
}

/// Validate a rule table and terminal set, then parse `input`.
///
/// `rules[0]` is the start rule.
///
/// # Errors
/// `ConfigurationError` if the grammar is malformed. A non-derivable input
/// is not an error; it yields `Ok(vec![])`.
pub fn parse_rules<I, S>(
    rules: Vec<Rule>,
    terminals: I,
    input: &[Symbol],
) -> Result<Vec<TreeNode>>
where
    I: IntoIterator<Item = S>,
    S: Into<Symbol>,
{
    let grammar = Grammar::new(rules, terminals)?;
    Ok(parse(&grammar, input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn tiny_rules() -> Vec<Rule> {
        vec![
            Rule::new("S", ["NP", "VP"]),
            Rule::new("NP", ["N"]),
            Rule::new("VP", ["V"]),
        ]
    }

    fn pp_sentence() -> Vec<Symbol> {
        symbols(["N", "V", "Det", "N", "P", "Det", "N"])
    }

    fn rendered_set(trees: &[TreeNode]) -> BTreeSet<String> {
        trees.iter().map(|t| t.to_string()).collect()
    }

    // ── Membership ─────────────────────────────────────

    #[test]
    fn test_non_membership_is_empty_forest() {
        let forest = parse_rules(tiny_rules(), ["N", "V"], &symbols(["V", "V"])).unwrap();
        assert!(forest.is_empty());
    }

    #[test]
    fn test_unique_minimal_parse() {
        let forest = parse_rules(tiny_rules(), ["N", "V"], &symbols(["N", "V"])).unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(
            forest[0],
            TreeNode::new(
                "S",
                vec![
                    TreeNode::new("NP", vec![TreeNode::leaf("N")]),
                    TreeNode::new("VP", vec![TreeNode::leaf("V")]),
                ]
            )
        );
    }

    #[test]
    fn test_malformed_grammar_fails_before_parsing() {
        let err = parse_rules(vec![], ["N"], &symbols(["N"])).unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse(&Grammar::english(), &[]).is_empty());
    }

    // ── Empty right-hand sides ─────────────────────────

    #[test]
    fn test_empty_rule_derives_empty_subtree() {
        let rules = vec![Rule::new("S", ["A", "N"]), Rule::new("A", Vec::<&str>::new())];
        let forest = parse_rules(rules, ["N"], &symbols(["N"])).unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].to_string(), "S(A, N)");
        assert!(forest[0].children[0].empty);
    }

    #[test]
    fn test_optional_determiner_keeps_leaf_fidelity() {
        let rules = vec![
            Rule::new("S", ["NP", "VP"]),
            Rule::new("NP", ["D", "N"]),
            Rule::new("D", Vec::<&str>::new()),
            Rule::new("D", ["Det"]),
            Rule::new("VP", ["V", "NP"]),
        ];
        let grammar = Grammar::new(rules, ["Det", "N", "V"]).unwrap();
        let input = symbols(["N", "V", "Det", "N"]);
        let mut forest = parse(&grammar, &input);
        assert_eq!(
            rendered_set(&forest),
            BTreeSet::from(["S(NP(D, N), VP(V, NP(D(Det), N)))".to_string()])
        );

        let expected: Vec<&str> = input.iter().map(Symbol::as_str).collect();
        assert_eq!(forest[0].leaf_labels(), expected);
        forest[0].substitute_words(&["dogs", "chase", "the", "cats"]).unwrap();
        assert_eq!(forest[0].to_string(), "S(NP(D, dogs), VP(chase, NP(D(the), cats)))");
    }

    // ── Forest properties ──────────────────────────────

    #[test]
    fn test_ambiguity_enumeration() {
        let forest = parse(&Grammar::english(), &pp_sentence());
        assert!(forest.len() >= 2);
        assert_eq!(rendered_set(&forest).len(), forest.len(), "trees must be distinct");
    }

    #[test]
    fn test_leaf_sequence_and_root_label() {
        let grammar = Grammar::english();
        let inputs = [
            pp_sentence(),
            symbols(["Det", "A", "N", "V", "C", "N", "V"]),
            symbols(["N", "V", "N", "P", "N", "P", "N"]),
            symbols(["Det", "Adv", "A", "N", "V", "P", "N"]),
        ];
        for input in &inputs {
            let forest = parse(&grammar, input);
            assert!(!forest.is_empty(), "expected a parse for {:?}", input);
            for tree in &forest {
                assert_eq!(tree.name, "S");
                let leaves: Vec<&str> = tree.leaf_labels();
                let expected: Vec<&str> = input.iter().map(Symbol::as_str).collect();
                assert_eq!(leaves, expected);
            }
        }
    }

    #[test]
    fn test_determinism_100_iterations() {
        let grammar = Grammar::english();
        let input = pp_sentence();
        let first = rendered_set(&parse(&grammar, &input));
        for i in 0..100 {
            let again = rendered_set(&parse(&grammar, &input));
            assert_eq!(first, again, "Non-determinism at iteration {}", i);
        }
    }

    #[test]
    fn test_parse_does_not_mutate_inputs() {
        let grammar = Grammar::english();
        let before = grammar.clone();
        let input = pp_sentence();
        let input_before = input.clone();
        let _ = parse(&grammar, &input);
        assert_eq!(grammar, before);
        assert_eq!(input, input_before);
    }

    #[test]
    fn test_trees_are_exclusively_owned() {
        let grammar = Grammar::english();
        let mut forest = parse(&grammar, &pp_sentence());
        let snapshot = forest.clone();

        // rewrite every leaf of the first tree
        let words = ["I", "saw", "the", "man", "with", "the", "telescope"];
        forest[0].substitute_words(&words).unwrap();

        for (tree, original) in forest.iter().zip(&snapshot).skip(1) {
            assert_eq!(tree, original, "mutation leaked into another tree");
        }
        assert_eq!(forest[0].leaf_labels(), words.to_vec());
    }

    #[test]
    fn test_sibling_branches_are_independent() {
        // VP -> V NP PP holds two NP(Det, N) derivations side by side
        let grammar = Grammar::english();
        let mut forest = parse(&grammar, &pp_sentence());
        let tree = forest
            .iter_mut()
            .find(|t| t.to_string() == "S(NP(N), VP(V, NP(Det, N), PP(P, NP(Det, N))))")
            .unwrap();

        let vp = &mut tree.children[1];
        vp.children[1].children[0].name = "the".into();
        assert_eq!(vp.children[2].children[1].children[0].name, "Det");
    }

    #[test]
    fn test_concurrent_parses_share_grammar() {
        let grammar = Grammar::english();
        let input = pp_sentence();
        let expected = rendered_set(&parse(&grammar, &input));

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| rendered_set(&parse(&grammar, &input))))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
