//! C-FFI layer for Canopy, for cgo and other FFI consumers.
//!
//! No parsing logic lives here; every call delegates to `canopy-core`.
//!
//! # Memory Contract
//!
//! All functions that return `*mut c_char` allocate via `CString`.
//! The caller MUST free the returned string by calling `canopy_free_string()`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use canopy_core::{grammar, Grammar, ParseLimits, TagLattice};

/// Result from a Canopy FFI call.
/// If `error` is null, the call succeeded and `result` contains the output.
/// If `error` is non-null, the call failed and `error` contains the error message.
/// The caller MUST free both `result` and `error` with `canopy_free_string()`.
#[repr(C)]
pub struct CanopyResult {
    pub result: *mut c_char,
    pub error: *mut c_char,
}

impl CanopyResult {
    fn ok(value: String) -> Self {
        CanopyResult {
            result: into_c_string(value),
            error: std::ptr::null_mut(),
        }
    }

    fn err(msg: String) -> Self {
        CanopyResult {
            result: std::ptr::null_mut(),
            error: into_c_string(msg),
        }
    }

    fn from_result(result: canopy_core::Result<String>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

/// Interior NULs cannot cross the boundary; they are dropped.
fn into_c_string(s: String) -> *mut c_char {
    CString::new(s.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

/// Helper: convert a C string pointer to a Rust &str.
/// Returns None if the pointer is null or not valid UTF-8.
unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

fn load(grammar_text: &str) -> canopy_core::Result<Grammar> {
    grammar::parse_grammar(grammar_text)
}

/// Parse a space-separated category sequence.
/// Returns a JSON array of trees (empty when there is no parse).
///
/// # Safety
/// `grammar_text` and `symbols` must be valid null-terminated UTF-8 C strings.
/// The caller must free the returned strings with `canopy_free_string()`.
#[no_mangle]
pub unsafe extern "C" fn canopy_parse(
    grammar_text: *const c_char,
    symbols: *const c_char,
) -> CanopyResult {
    let grammar_text = match cstr_to_str(grammar_text) {
        Some(s) => s,
        None => return CanopyResult::err("null or invalid UTF-8 grammar".into()),
    };
    let symbols = match cstr_to_str(symbols) {
        Some(s) => s,
        None => return CanopyResult::err("null or invalid UTF-8 symbols".into()),
    };

    CanopyResult::from_result(load(grammar_text).and_then(|grammar| {
        let input = canopy_core::symbols(canopy_core::split_words(symbols));
        let trees = canopy_core::parse(&grammar, &input);
        Ok(serde_json::to_string_pretty(&trees)?)
    }))
}

/// Parse a sentence from per-word tag guesses (JSON).
/// Returns a JSON array of word-labelled trees.
///
/// # Safety
/// All arguments must be valid null-terminated UTF-8 C strings.
/// The caller must free the returned strings with `canopy_free_string()`.
#[no_mangle]
pub unsafe extern "C" fn canopy_parse_sentence(
    grammar_text: *const c_char,
    sentence: *const c_char,
    tags_json: *const c_char,
) -> CanopyResult {
    let grammar_text = match cstr_to_str(grammar_text) {
        Some(s) => s,
        None => return CanopyResult::err("null or invalid UTF-8 grammar".into()),
    };
    let sentence = match cstr_to_str(sentence) {
        Some(s) => s,
        None => return CanopyResult::err("null or invalid UTF-8 sentence".into()),
    };
    let tags_json = match cstr_to_str(tags_json) {
        Some(s) => s,
        None => return CanopyResult::err("null or invalid UTF-8 tags".into()),
    };

    CanopyResult::from_result(load(grammar_text).and_then(|grammar| {
        let lattice = TagLattice::from_json(tags_json)?;
        let words = canopy_core::split_words(sentence);
        let trees =
            canopy_core::parse_sentence(&grammar, &words, &lattice, &ParseLimits::default())?;
        Ok(serde_json::to_string_pretty(&trees)?)
    }))
}

/// Validate a grammar.
/// Returns JSON: { "rules", "terminals", "nonterminals", "start", "fingerprint" }
///
/// # Safety
/// `grammar_text` must be a valid null-terminated UTF-8 C string.
/// The caller must free the returned strings with `canopy_free_string()`.
#[no_mangle]
pub unsafe extern "C" fn canopy_check(grammar_text: *const c_char) -> CanopyResult {
    let grammar_text = match cstr_to_str(grammar_text) {
        Some(s) => s,
        None => return CanopyResult::err("null or invalid UTF-8 input".into()),
    };

    CanopyResult::from_result(load(grammar_text).and_then(|grammar| {
        Ok(serde_json::to_string_pretty(&grammar.summary())?)
    }))
}

/// Free a string previously returned by a Canopy FFI function.
///
/// # Safety
/// `ptr` must be a pointer previously returned by a Canopy FFI function,
/// or null (in which case this is a no-op).
#[no_mangle]
pub unsafe extern "C" fn canopy_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}
