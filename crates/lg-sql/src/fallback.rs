//! Pattern rules for TRIGGER and SYNONYM definitions.
//!
//! These are best-effort text rules applied to statements the structured
//! path cannot fully describe. They can miss definitions written in unusual
//! shapes and can match inside string literals; keep them out of the
//! tree-based extraction.

use lg_core::naming::split_name;
use lg_core::record::{SynonymDef, TriggerDef};
use regex::Regex;
use std::sync::OnceLock;

fn trigger_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // TRIGGER <name> [timing/events] ON <target>
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)\bTRIGGER\s+([^\s(]+)\s+(?:.*?\s)??ON\s+([^\s(;]+)")
            .expect("valid regex")
    })
}

fn synonym_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // SYNONYM <name> FOR <target>
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)\bSYNONYM\s+([^\s(]+)\s+FOR\s+([^\s(;]+)")
            .expect("valid regex")
    })
}

/// Strip identifier quoting from a matched object name
fn clean_name(raw: &str) -> Option<String> {
    let name = split_name(raw).join(".");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Find a `TRIGGER <name> ... ON <target>` definition
pub fn match_trigger(text: &str) -> Option<TriggerDef> {
    let caps = trigger_pattern().captures(text)?;
    Some(TriggerDef {
        name: clean_name(caps.get(1)?.as_str())?,
        target_table: clean_name(caps.get(2)?.as_str())?,
    })
}

/// Find a `SYNONYM <name> FOR <target>` definition
pub fn match_synonym(text: &str) -> Option<SynonymDef> {
    let caps = synonym_pattern().captures(text)?;
    Some(SynonymDef {
        name: clean_name(caps.get(1)?.as_str())?,
        target_object: clean_name(caps.get(2)?.as_str())?,
    })
}

#[cfg(test)]
#[path = "fallback_test.rs"]
mod tests;
