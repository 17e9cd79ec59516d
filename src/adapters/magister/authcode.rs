//! Extract the dynamic `authCode` from the accounts page JavaScript bundle.
//!
//! The bundle builds the code from two array literals right before a `.map(function(t)` call:
//! a character table and an index list. We take the last two parseable arrays before the marker.

use crate::domain::DomainError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Markers seen in different bundle builds, tried in order.
const MARKERS: &[&str] = &["].map((function(t)", "].map(function(t)"];

/// How far before the marker to look for the arrays.
const LOOKBEHIND: usize = 500;

static ARRAY_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]").expect("array literal regex"));

pub fn extract_authcode(js: &str) -> Result<String, DomainError> {
    let (pos, marker) = MARKERS
        .iter()
        .find_map(|m| js.find(m).map(|p| (p, *m)))
        .ok_or_else(|| DomainError::Auth("authCode marker not found in JS".into()))?;

    let mut start = pos.saturating_sub(LOOKBEHIND);
    while !js.is_char_boundary(start) {
        start -= 1;
    }
    let snippet = &js[start..pos + marker.len()];

    let arrays: Vec<Vec<Value>> = ARRAY_LITERAL
        .find_iter(snippet)
        .filter_map(|m| serde_json::from_str::<Vec<Value>>(&m.as_str().replace('\'', "\"")).ok())
        .collect();

    if arrays.len() < 2 {
        return Err(DomainError::Auth(
            "could not find obfuscated authCode arrays".into(),
        ));
    }
    let indices = &arrays[arrays.len() - 1];
    let chars = &arrays[arrays.len() - 2];

    let mut code = String::new();
    for idx in indices {
        let i = as_index(idx)
            .ok_or_else(|| DomainError::Auth(format!("invalid authCode index: {}", idx)))?;
        let c = chars
            .get(i)
            .ok_or_else(|| DomainError::Auth(format!("authCode index out of range: {}", i)))?;
        match c {
            Value::String(s) => code.push_str(s),
            other => code.push_str(&other.to_string()),
        }
    }
    Ok(code)
}

/// Indices appear both as numbers and as numeric strings.
fn as_index(v: &Value) -> Option<usize> {
    match v {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
