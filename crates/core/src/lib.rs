//! courgette-core: the Courgette rule language front end.
//!
//! Turns Courgette source text into a [`Document`]: scenarios with nested
//! condition groups, definitions and rate schedules. Nothing here knows
//! about the generated output; see `courgette-codegen` for that.
//!
//! # Public API
//!
//! - [`parse_expression()`] -- one line of condition text to an [`Expression`]
//! - [`parse_document()`] -- whole source text to a [`Document`]
//! - [`classify_outcome()`] -- one outcome line to an [`Outcome`]
//! - [`lint()`] -- editor diagnostics without building a model

pub mod ast;
pub mod diagnostic;
pub mod document;
pub mod error;
pub mod lexer;
pub mod lint;
pub mod outcome;
pub mod parser;

// ── Convenience re-exports ───────────────────────────────────────────

pub use ast::{
    Calculation, CompareOp, ConditionNode, Definition, DefinitionContent, Document, Eligibility,
    Expression, GroupOperator, LogicalOp, Reference, ReferenceKind, Rule, RuleBody, RuleGroup,
    Scenario, Schedule, ScheduleEntry,
};
pub use diagnostic::{Diagnostic, LineIndex, Severity};
pub use document::parse_document;
pub use error::GrammarError;
pub use lint::lint;
pub use outcome::{classify_outcome, Outcome};
pub use parser::parse_expression;
