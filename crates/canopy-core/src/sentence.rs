//! Sentence driver - from tagged words to word-labelled parse trees
//!
//! A part-of-speech tagger supplies, per word, a possibly empty list of
//! category guesses. Empty lists fall back to [`DEFAULT_GUESSES`]. Every
//! element of the cartesian product of the guess lists is parsed on its own,
//! each resulting tree gets the original words substituted into its leaves,
//! and the forests are concatenated in combination order.
//!
//! The number of combinations and trees grows multiplicatively, so the
//! driver enforces [`ParseLimits`] before and during the run.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::grammar::{Grammar, Symbol};
use crate::tree::TreeNode;
use crate::{Error, Result};

/// Guesses used for a word the tagger could not classify
pub const DEFAULT_GUESSES: [&str; 4] = ["N", "V", "A", "Adv"];

// ── Limits ────────────────────────────────────────────────

/// Caller-imposed bounds on a sentence parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseLimits {
    /// Longest accepted sentence, in words
    pub max_words: usize,
    /// Most tag combinations tried
    pub max_combinations: usize,
    /// Most trees returned
    pub max_trees: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        ParseLimits {
            max_words: 24,
            max_combinations: 4096,
            max_trees: 10_000,
        }
    }
}

// ── Tag lattice ───────────────────────────────────────────

/// Per-word category guesses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLattice {
    columns: Vec<Vec<Symbol>>,
}

/// Tagger output, either wrapped or bare
#[derive(Deserialize)]
#[serde(untagged)]
enum TaggerResponse {
    Wrapped {
        #[serde(rename = "partsOfSpeech")]
        parts_of_speech: Vec<Vec<Symbol>>,
    },
    Bare(Vec<Vec<Symbol>>),
}

impl TagLattice {
    /// Build a lattice; an empty guess list becomes [`DEFAULT_GUESSES`].
    pub fn new(columns: Vec<Vec<Symbol>>) -> Self {
        let columns = columns
            .into_iter()
            .map(|guesses| {
                if guesses.is_empty() {
                    DEFAULT_GUESSES.iter().map(|g| Symbol::from(*g)).collect()
                } else {
                    guesses
                }
            })
            .collect();
        TagLattice { columns }
    }

    /// Decode tagger output: `{"partsOfSpeech": [[...], ...]}` or `[[...], ...]`.
    pub fn from_json(json: &str) -> Result<Self> {
        let response: TaggerResponse = serde_json::from_str(json)
            .map_err(|e| Error::InputError(format!("unreadable tag guesses: {}", e)))?;
        let columns = match response {
            TaggerResponse::Wrapped { parts_of_speech } => parts_of_speech,
            TaggerResponse::Bare(columns) => columns,
        };
        Ok(Self::new(columns))
    }

    pub fn columns(&self) -> &[Vec<Symbol>] {
        &self.columns
    }

    /// Number of words covered
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Size of the cartesian product, or `None` if it overflows `usize`
    pub fn combination_count(&self) -> Option<usize> {
        self.columns
            .iter()
            .try_fold(1usize, |acc, column| acc.checked_mul(column.len()))
    }

    /// Lazily walk the cartesian product; the last column varies fastest.
    pub fn combinations(&self) -> Combinations<'_> {
        Combinations {
            columns: &self.columns,
            odometer: vec![0; self.columns.len()],
            exhausted: false,
        }
    }
}

/// Iterator over tag combinations, see [`TagLattice::combinations`]
pub struct Combinations<'a> {
    columns: &'a [Vec<Symbol>],
    odometer: Vec<usize>,
    exhausted: bool,
}

impl Iterator for Combinations<'_> {
    type Item = Vec<Symbol>;

    fn next(&mut self) -> Option<Vec<Symbol>> {
        if self.exhausted {
            return None;
        }

        let current: Vec<Symbol> = self
            .odometer
            .iter()
            .zip(self.columns)
            .map(|(&i, column)| column[i].clone())
            .collect();

        // advance, carrying leftwards
        self.exhausted = true;
        for pos in (0..self.odometer.len()).rev() {
            self.odometer[pos] += 1;
            if self.odometer[pos] < self.columns[pos].len() {
                self.exhausted = false;
                break;
            }
            self.odometer[pos] = 0;
        }

        Some(current)
    }
}

// ── Driver ────────────────────────────────────────────────

/// Split a sentence into words on whitespace
pub fn split_words(sentence: &str) -> Vec<&str> {
    sentence.split_whitespace().collect()
}

/// Parse every tag combination of a sentence and substitute its words.
///
/// # Errors
/// - `InputError` if `words` and `lattice` differ in length
/// - `LimitExceeded` if the sentence, the combination count, or the number
///   of trees exceeds `limits`
pub fn parse_sentence<S: AsRef<str>>(
    grammar: &Grammar,
    words: &[S],
    lattice: &TagLattice,
    limits: &ParseLimits,
) -> Result<Vec<TreeNode>> {
    if words.len() != lattice.len() {
        return Err(Error::InputError(format!(
            "{} words but {} tag guess lists",
            words.len(),
            lattice.len()
        )));
    }
    if words.len() > limits.max_words {
        return Err(Error::LimitExceeded(format!(
            "sentence has {} words (max {})",
            words.len(),
            limits.max_words
        )));
    }
    let combinations = lattice
        .combination_count()
        .filter(|&count| count <= limits.max_combinations)
        .ok_or_else(|| {
            Error::LimitExceeded(format!(
                "too many tag combinations (max {})",
                limits.max_combinations
            ))
        })?;

    info!(
        "parsing {} words across {} tag combination(s)",
        words.len(),
        combinations
    );

    let mut trees = Vec::new();
    for combination in lattice.combinations() {
        let forest = crate::parse(grammar, &combination);
        if !forest.is_empty() {
            debug!("{} tree(s) for tags {:?}", forest.len(), combination);
        }
        for mut tree in forest {
            tree.substitute_words(words)?;
            trees.push(tree);
            if trees.len() > limits.max_trees {
                return Err(Error::LimitExceeded(format!(
                    "more than {} trees",
                    limits.max_trees
                )));
            }
        }
    }

    Ok(trees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::symbols;

    fn lattice(columns: &[&[&str]]) -> TagLattice {
        TagLattice::new(columns.iter().map(|c| symbols(c.iter().copied())).collect())
    }

    fn joined(combo: &[Symbol]) -> String {
        combo.iter().map(Symbol::as_str).collect::<Vec<_>>().join(" ")
    }

    // ── Lattice ────────────────────────────────────────

    #[test]
    fn test_empty_guesses_use_defaults() {
        let lat = lattice(&[&["Det"], &[]]);
        assert_eq!(lat.columns()[1], symbols(DEFAULT_GUESSES));
        assert_eq!(lat.combination_count(), Some(4));
    }

    #[test]
    fn test_combinations_last_column_fastest() {
        let lat = lattice(&[&["A", "B"], &["x"], &["1", "2"]]);
        let combos: Vec<String> = lat.combinations().map(|c| joined(&c)).collect();
        assert_eq!(combos, vec!["A x 1", "A x 2", "B x 1", "B x 2"]);
    }

    #[test]
    fn test_empty_lattice_has_one_empty_combination() {
        let lat = TagLattice::new(vec![]);
        assert_eq!(lat.combination_count(), Some(1));
        let combos: Vec<Vec<Symbol>> = lat.combinations().collect();
        assert_eq!(combos, vec![Vec::<Symbol>::new()]);
    }

    #[test]
    fn test_combination_count_overflow() {
        let wide: Vec<Symbol> = (0..1000).map(|i| Symbol::new(format!("T{}", i))).collect();
        let lat = TagLattice::new(vec![wide; 10]);
        assert_eq!(lat.combination_count(), None);
    }

    #[test]
    fn test_from_json_wrapped_and_bare() {
        let wrapped =
            TagLattice::from_json(r#"{"partsOfSpeech": [["N"], ["V", "N"], []]}"#).unwrap();
        let bare = TagLattice::from_json(r#"[["N"], ["V", "N"], []]"#).unwrap();
        assert_eq!(wrapped, bare);
        assert_eq!(wrapped.len(), 3);
        assert_eq!(wrapped.combination_count(), Some(8));
    }

    #[test]
    fn test_from_json_invalid() {
        let err = TagLattice::from_json(r#"{"tags": 1}"#).unwrap_err();
        assert!(matches!(err, Error::InputError(_)), "got: {:?}", err);
    }

    // ── Driver ─────────────────────────────────────────

    #[test]
    fn test_parse_sentence_substitutes_words() {
        let grammar = Grammar::english();
        let words = split_words("dogs bark");
        let tags = lattice(&[&["N"], &["V"]]);
        let trees = parse_sentence(&grammar, &words, &tags, &ParseLimits::default()).unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].to_string(), "S(NP(dogs), VP(bark))");
        let leaves = trees[0].leaves();
        assert_eq!(leaves[0].attributes.get("Type").map(String::as_str), Some("N"));
        assert_eq!(leaves[1].attributes.get("Type").map(String::as_str), Some("V"));
    }

    #[test]
    fn test_parse_sentence_expands_guesses() {
        // "time flies": N N is not a sentence, N V is
        let grammar = Grammar::english();
        let trees = parse_sentence(
            &grammar,
            &["time", "flies"],
            &lattice(&[&["N", "V"], &["N", "V"]]),
            &ParseLimits::default(),
        )
        .unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].to_string(), "S(NP(time), VP(flies))");
    }

    #[test]
    fn test_parse_sentence_unknown_words_fall_back_to_defaults() {
        let grammar = Grammar::english();
        let trees = parse_sentence(
            &grammar,
            &["the", "glorp", "sleeps"],
            &lattice(&[&["Det"], &[], &["V"]]),
            &ParseLimits::default(),
        )
        .unwrap();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].to_string(), "S(NP(the, glorp), VP(sleeps))");
    }

    #[test]
    fn test_parse_sentence_concatenates_forests_in_order() {
        let grammar = Grammar::new(
            vec![
                crate::Rule::new("S", ["NP", "VP"]),
                crate::Rule::new("NP", ["N"]),
                crate::Rule::new("NP", ["A"]),
                crate::Rule::new("VP", ["V"]),
            ],
            ["N", "A", "V"],
        )
        .unwrap();
        let trees = parse_sentence(
            &grammar,
            &["green", "wins"],
            &lattice(&[&["N", "A"], &["V"]]),
            &ParseLimits::default(),
        )
        .unwrap();
        let categories: Vec<String> = trees
            .iter()
            .map(|t| t.leaves()[0].attributes["Type"].clone())
            .collect();
        assert_eq!(categories, vec!["N", "A"]);
    }

    #[test]
    fn test_parse_sentence_ambiguous_attachment() {
        let grammar = Grammar::english();
        let words = split_words("I saw her duck with binoculars");
        let tags = lattice(&[&["N"], &["V"], &["Det", "N"], &["N", "V"], &["P"], &["N"]]);
        let trees = parse_sentence(&grammar, &words, &tags, &ParseLimits::default()).unwrap();

        let mut rendered: Vec<String> = trees.iter().map(|t| t.to_string()).collect();
        rendered.sort();
        assert_eq!(
            rendered,
            vec![
                "S(NP(I), VP(saw, NP(her, duck), PP(with, NP(binoculars))))",
                "S(NP(I), VP(saw, NP(her, duck, PP(with, NP(binoculars)))))",
            ]
        );
        for tree in &trees {
            assert_eq!(tree.leaf_labels(), words);
        }
    }

    #[test]
    fn test_parse_sentence_no_parse_is_empty() {
        let grammar = Grammar::english();
        let tags = lattice(&[&["Adv"]]);
        let trees = parse_sentence(&grammar, &["quickly"], &tags, &ParseLimits::default()).unwrap();
        assert!(trees.is_empty());
    }

    #[test]
    fn test_parse_sentence_length_mismatch() {
        let grammar = Grammar::english();
        let tags = lattice(&[&["N"]]);
        let err =
            parse_sentence(&grammar, &["a", "b"], &tags, &ParseLimits::default()).unwrap_err();
        assert!(matches!(err, Error::InputError(_)));
    }

    #[test]
    fn test_parse_sentence_limits() {
        let grammar = Grammar::english();
        let words = ["dogs", "bark"];
        let tags = lattice(&[&[], &[]]);

        let tight = ParseLimits {
            max_words: 1,
            ..ParseLimits::default()
        };
        let err = parse_sentence(&grammar, &words, &tags, &tight).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));

        let tight = ParseLimits {
            max_combinations: 15,
            ..ParseLimits::default()
        };
        let err = parse_sentence(&grammar, &words, &tags, &tight).unwrap_err();
        assert!(err.to_string().contains("too many tag combinations"));

        let tight = ParseLimits {
            max_trees: 0,
            ..ParseLimits::default()
        };
        let err = parse_sentence(&grammar, &words, &tags, &tight).unwrap_err();
        assert!(err.to_string().contains("more than 0 trees"));
    }

    #[test]
    fn test_limits_deserialize_with_defaults() {
        let limits: ParseLimits = serde_json::from_str(r#"{"max_words": 8}"#).unwrap();
        assert_eq!(limits.max_words, 8);
        assert_eq!(limits.max_trees, ParseLimits::default().max_trees);
    }
}
