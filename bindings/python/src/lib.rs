//! Python bindings for Canopy
//!
//! Thin wrapper around `canopy-core`. Grammars are passed as text in the
//! Canopy grammar format; trees and reports come back as JSON strings.

use canopy_core::{grammar, ParseLimits, TagLattice};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn value_error(e: canopy_core::Error) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn serialization_error(e: serde_json::Error) -> PyErr {
    PyValueError::new_err(format!("Serialization error: {}", e))
}

/// Parse a sequence of categories and return every tree.
///
/// Args:
///     grammar_text: grammar in Canopy text format
///     symbols: input categories, e.g. ["N", "V", "Det", "N"]
///
/// Returns:
///     JSON array of trees; empty when the grammar does not derive the input
///
/// Raises:
///     ValueError: If the grammar is malformed
#[pyfunction]
fn parse(grammar_text: &str, symbols: Vec<String>) -> PyResult<String> {
    let grammar = grammar::parse_grammar(grammar_text).map_err(value_error)?;
    let trees = canopy_core::parse(&grammar, &canopy_core::symbols(symbols));
    serde_json::to_string_pretty(&trees).map_err(serialization_error)
}

/// Parse a sentence using per-word tag guesses.
///
/// Args:
///     grammar_text: grammar in Canopy text format
///     sentence: whitespace-separated words
///     tags_json: `{"partsOfSpeech": [[...], ...]}` or `[[...], ...]`
///
/// Returns:
///     JSON array of trees whose leaves carry the words, with the
///     category kept under `attributes.Type`
///
/// Raises:
///     ValueError: On a malformed grammar, bad tags, or a limit being hit
#[pyfunction]
fn parse_sentence(grammar_text: &str, sentence: &str, tags_json: &str) -> PyResult<String> {
    let grammar = grammar::parse_grammar(grammar_text).map_err(value_error)?;
    let lattice = TagLattice::from_json(tags_json).map_err(value_error)?;
    let words = canopy_core::split_words(sentence);
    let trees = canopy_core::parse_sentence(&grammar, &words, &lattice, &ParseLimits::default())
        .map_err(value_error)?;
    serde_json::to_string_pretty(&trees).map_err(serialization_error)
}

/// Validate a grammar.
///
/// Returns:
///     JSON: {"rules": int, "terminals": int, "nonterminals": int,
///            "start": str, "fingerprint": str}
///
/// Raises:
///     ValueError: If the grammar is malformed
#[pyfunction]
fn check(grammar_text: &str) -> PyResult<String> {
    let grammar = grammar::parse_grammar(grammar_text).map_err(value_error)?;
    serde_json::to_string_pretty(&grammar.summary()).map_err(serialization_error)
}

/// Hex SHA-256 fingerprint of a grammar's canonical form.
#[pyfunction]
fn fingerprint(grammar_text: &str) -> PyResult<String> {
    let grammar = grammar::parse_grammar(grammar_text).map_err(value_error)?;
    Ok(grammar.fingerprint())
}

/// Canopy Python module
#[pymodule]
fn canopy(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(parse, m)?)?;
    m.add_function(wrap_pyfunction!(parse_sentence, m)?)?;
    m.add_function(wrap_pyfunction!(check, m)?)?;
    m.add_function(wrap_pyfunction!(fingerprint, m)?)?;
    Ok(())
}
