//! Compilation entry points: source text in, rules and parameters out.

use courgette_core::{parse_document, Diagnostic, Document, LineIndex};
use serde::Serialize;
use tracing::info;

use crate::config::GenerateConfig;
use crate::parameters::generate_parameters;
use crate::rules::RuleEmitter;

/// Everything produced from one source text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compilation {
    pub rules: String,
    pub parameters: String,
    /// Parser and generator diagnostics, ordered by position.
    pub diagnostics: Vec<Diagnostic>,
}

/// Generate both artifacts for an already parsed document. `source` must be
/// the text `doc` was parsed from; it is only used to position diagnostics.
pub fn generate(doc: &Document, source: &str, config: &GenerateConfig) -> Compilation {
    let index = LineIndex::new(source);
    let (rules, generated) = RuleEmitter::new(doc, config, &index).emit();
    let parameters = generate_parameters(&doc.schedules);

    let mut diagnostics = doc.diagnostics.clone();
    diagnostics.extend(generated);
    diagnostics.sort_by_key(|d| (d.line, d.column));

    info!(
        scenarios = doc.scenarios.len(),
        definitions = doc.definitions.len(),
        schedules = doc.schedules.len(),
        diagnostics = diagnostics.len(),
        "compiled"
    );

    Compilation {
        rules,
        parameters,
        diagnostics,
    }
}

pub fn compile_document(source: &str, config: &GenerateConfig) -> Compilation {
    let doc = parse_document(source);
    generate(&doc, source, config)
}

/// Compile with an explicit configuration.
pub fn compile_with(source: &str, config: &GenerateConfig) -> (String, String) {
    let c = compile_document(source, config);
    (c.rules, c.parameters)
}

/// Compile with default settings. Never fails: anything that cannot be
/// understood shows up as a TODO marker in the output.
pub fn compile(source: &str) -> (String, String) {
    compile_with(source, &GenerateConfig::default())
}
