//! courgette-codegen: renders a parsed Courgette document into OpenFisca
//! rule definitions (Python) and parameter tables (YAML).
//!
//! # Public API
//!
//! - [`compile()`] / [`compile_with()`] -- source text to `(rules, parameters)`
//! - [`compile_document()`] -- the same plus diagnostics
//! - [`GenerateConfig`] -- output settings

pub mod compile;
pub mod config;
pub mod parameters;
pub mod render;
pub mod rules;
pub mod types;

pub use compile::{compile, compile_document, compile_with, generate, Compilation};
pub use config::{DefinitionPeriod, GenerateConfig};
pub use parameters::generate_parameters;
pub use rules::RuleEmitter;
pub use types::{
    infer_entity, infer_value_type, python_name, sanitize_ident, EntityKind, ValueType,
};
