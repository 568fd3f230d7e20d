//! Forest extractor - enumerate every derivation of an accepted input
//!
//! Starting from the completed start rule over `[0, n)`, each rule's
//! right-hand side is expanded left to right while the remaining span is
//! threaded through:
//!
//! - a terminal consumes exactly one position, and only where the input
//!   holds that terminal
//! - a non-terminal may consume any span `[start, end')` for which the
//!   completed index holds a rule defining it, including the empty span
//!   `[start, start)` when it is nullable
//! - a sibling list is accepted only when its widths sum to the whole span
//!
//! A span is never handed to a symbol unless the symbols after it can still
//! fit: each terminal and non-nullable non-terminal needs one position. With
//! derivation cycles ruled out by validation, this makes every recursive call
//! either shrink the span or descend to a different non-terminal, so
//! extraction terminates on left-recursive and nullable grammars alike.
//!
//! Every partition of a span that is consistent with the grammar yields its
//! own tree; this is how ambiguous attachments (a prepositional phrase under
//! the verb phrase *or* under the object noun phrase) surface as distinct
//! results.
//!
//! Trees are materialized independently, with no sharing: a sub-derivation
//! reused by several candidates is cloned into each of them. Output size is
//! therefore exponential in the worst case, and callers bound input length.

use log::debug;

use crate::completed::CompletedIndex;
use crate::grammar::{Grammar, Symbol};
use crate::tree::TreeNode;

/// A sibling list together with the number of input positions it covers
type Candidate = (Vec<TreeNode>, usize);

/// Every tree rooted at rule 0 spanning the whole input.
///
/// Returns an empty forest when the index holds no `(rule 0, end n)` entry.
pub fn extract(grammar: &Grammar, index: &CompletedIndex, input: &[Symbol]) -> Vec<TreeNode> {
    let n = input.len();
    let extractor = Extractor {
        grammar,
        index,
        input,
    };

    let forest = match index.at(0).iter().find(|c| c.rule == 0 && c.end == n) {
        Some(root) => extractor.build_trees(root.rule, 0, root.end),
        None => Vec::new(),
    };

    debug!("forest extracted: {} tree(s) over {} symbols", forest.len(), n);
    forest
}

struct Extractor<'a> {
    grammar: &'a Grammar,
    index: &'a CompletedIndex,
    input: &'a [Symbol],
}

impl Extractor<'_> {
    /// All trees for `rule` recognized over `[start, end)`
    fn build_trees(&self, rule: usize, start: usize, end: usize) -> Vec<TreeNode> {
        let lhs = &self.grammar.rule(rule).lhs;
        if self.grammar.rule(rule).rhs.is_empty() {
            return vec![TreeNode::empty(lhs.as_str())];
        }
        self.siblings(rule, 0, start, end)
            .into_iter()
            .filter(|(_, width)| *width == end - start)
            .map(|(children, _)| TreeNode::new(lhs.as_str(), children))
            .collect()
    }

    /// All ways to derive `rhs[dot..]` of `rule` over exactly `[start, end)`
    fn siblings(&self, rule: usize, dot: usize, start: usize, end: usize) -> Vec<Candidate> {
        let rhs = &self.grammar.rule(rule).rhs;

        let target = match rhs.get(dot) {
            Some(target) => target,
            None if start == end => return vec![(Vec::new(), 0)],
            None => return Vec::new(),
        };

        if end < start + self.grammar.min_width(&rhs[dot..]) {
            return Vec::new();
        }
        let rest_min = self.grammar.min_width(&rhs[dot + 1..]);

        if self.grammar.is_terminal(target) {
            if self.input.get(start) != Some(target) {
                return Vec::new();
            }
            return self
                .siblings(rule, dot + 1, start + 1, end)
                .into_iter()
                .map(|(rest, rest_width)| {
                    let mut list = Vec::with_capacity(rest.len() + 1);
                    list.push(TreeNode::leaf(target.as_str()));
                    list.extend(rest);
                    (list, 1 + rest_width)
                })
                .collect();
        }

        let mut candidates = Vec::new();
        for entry in self.index.at(start) {
            let sub_rule = self.grammar.rule(entry.rule);
            if sub_rule.lhs != *target || entry.end + rest_min > end {
                continue;
            }

            let subtrees = self.build_trees(entry.rule, start, entry.end);
            if subtrees.is_empty() {
                continue;
            }
            let continuations = self.siblings(rule, dot + 1, entry.end, end);
            let width = entry.end - start;

            for subtree in &subtrees {
                if subtree.children.len() != sub_rule.rhs.len() {
                    continue;
                }
                for (rest, rest_width) in &continuations {
                    if width + rest_width != end - start {
                        continue;
                    }
                    let mut list = Vec::with_capacity(rest.len() + 1);
                    list.push(subtree.clone());
                    list.extend(rest.iter().cloned());
                    candidates.push((list, width + rest_width));
                }
            }
        }

        candidates
    }
}
