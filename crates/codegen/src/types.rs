//! Name-based inference for generated variables.
//!
//! Both functions are total: every name maps to exactly one value type and
//! one entity, decided by a fixed priority table.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Str,
    Float,
}

impl ValueType {
    pub fn as_python(self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Str => "str",
            ValueType::Float => "float",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_python())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Person,
    Family,
}

impl EntityKind {
    pub fn as_python(self) -> &'static str {
        match self {
            EntityKind::Person => "Person",
            EntityKind::Family => "Family",
        }
    }
}

const BOOL_PREFIXES: &[&str] = &["is_", "has_"];
const STR_SUFFIXES: &[&str] = &["_status", "_type", "_category"];
const PERSON_NAMES: &[&str] = &["age", "income", "assets"];

const PY_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Locals every generated formula already binds.
const FORMULA_LOCALS: &[&str] = &["person", "period", "parameters", "eligible"];

/// Value type for a variable name.
///
/// | rule                                   | type  |
/// |----------------------------------------|-------|
/// | starts `is_`/`has_`, or has `eligible` | bool  |
/// | ends `_status`/`_type`/`_category`     | str   |
/// | anything else                          | float |
pub fn infer_value_type(name: &str) -> ValueType {
    if BOOL_PREFIXES.iter().any(|p| name.starts_with(p)) || name.contains("eligible") {
        return ValueType::Bool;
    }
    if STR_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return ValueType::Str;
    }
    ValueType::Float
}

pub fn infer_entity(name: &str) -> EntityKind {
    if PERSON_NAMES.contains(&name) {
        EntityKind::Person
    } else if name.contains("family") || name.contains("household") {
        EntityKind::Family
    } else {
        EntityKind::Person
    }
}

/// Name a variable takes in the generated module. Python keywords and the
/// formula's own arguments get a trailing `_`; the same name is used for the
/// variable class, its lookup key and the formula local.
pub fn python_name(name: &str) -> String {
    if PY_KEYWORDS.contains(&name) || FORMULA_LOCALS.contains(&name) {
        format!("{}_", name)
    } else {
        name.to_owned()
    }
}

/// Python identifier for an arbitrary display name: lower-cased, runs of
/// other characters collapsed to `_`, never starting with a digit, never a
/// reserved name.
pub fn sanitize_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    python_name(&out)
}

/// `residence_years` -> `Residence Years`.
pub fn label_for(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
