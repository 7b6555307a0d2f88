//! OpenFisca rule emission.
//!
//! Output order is fixed: header, entity preamble, base variables (sorted),
//! definitions (sorted by identifier), then one eligibility rule and an
//! optional payment rule per scenario in source order.

use std::collections::{BTreeMap, BTreeSet};

use courgette_core::{
    Calculation, ConditionNode, Definition, DefinitionContent, Diagnostic, Document, LineIndex,
    RuleGroup, Scenario, Severity,
};
use tracing::{debug, warn};

use crate::config::GenerateConfig;
use crate::render::{py_escape_double, render_expression, render_group};
use crate::types::{
    infer_entity, infer_value_type, label_for, python_name, sanitize_ident, EntityKind,
};

const HEADER: &str = r#""""
Generated OpenFisca implementation from Courgette rules

This file implements eligibility rules and payment calculations
for Australian social security benefits.
"""

from openfisca_core.model_api import *
from openfisca_core.periods import MONTH, YEAR, ETERNITY, period

"#;

const ENTITIES: &str = r#"
class Person(Entity):
    """An individual person"""
    plural = "persons"
    label = "Person"
    doc = "An individual. The minimal legal entity on which a rule might be applied."


class Family(Entity):
    """A family unit for benefit calculations"""
    plural = "families"
    label = "Family"
    doc = "A family unit as defined for social security purposes"
    roles = [
        {
            "key": "parent",
            "plural": "parents",
            "label": "Parent",
            "max": 2,
        },
        {
            "key": "child",
            "plural": "children",
            "label": "Child",
        },
    ]

"#;

const TODO_MARKER: &str = "TODO: not yet implemented:";

/// Contents for a multi-line triple-quoted Python string.
fn py_doc(text: &str) -> String {
    text.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"")
}

/// Emits the Python module for one [`Document`].
pub struct RuleEmitter<'a> {
    doc: &'a Document,
    config: &'a GenerateConfig,
    index: &'a LineIndex,
    out: String,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RuleEmitter<'a> {
    pub fn new(doc: &'a Document, config: &'a GenerateConfig, index: &'a LineIndex) -> Self {
        RuleEmitter {
            doc,
            config,
            index,
            out: String::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn emit(mut self) -> (String, Vec<Diagnostic>) {
        let definitions = self.definitions_by_ident();
        let scenarios = self.scenarios_by_ident();

        self.out.push_str(HEADER);
        self.out.push_str(ENTITIES);
        self.emit_base_variables(&definitions, &scenarios);

        if !definitions.is_empty() {
            self.out.push_str("\n# Definitions\n");
            for (ident, definition) in &definitions {
                self.emit_definition(ident, definition);
            }
        }

        if !scenarios.is_empty() {
            self.out.push_str("\n# Scenarios\n");
            for (ident, scenario) in &scenarios {
                self.emit_eligibility(ident, scenario);
                if scenario
                    .outcomes
                    .iter()
                    .any(|o| o.text.to_lowercase().contains("payment"))
                {
                    self.emit_payment(ident, scenario);
                }
            }
        }

        (self.out, self.diagnostics)
    }

    // -- Name tables ---------------------------------------------

    /// One definition per identifier. Names are visited in sorted order, so
    /// when two terms collapse to one identifier the later term wins.
    fn definitions_by_ident(&self) -> BTreeMap<String, &'a Definition> {
        let mut out = BTreeMap::new();
        for definition in self.doc.definitions.values() {
            let ident = sanitize_ident(&definition.term);
            if out.insert(ident.clone(), definition).is_some() {
                warn!(ident = %ident, "two definitions share an identifier; keeping the later");
            }
        }
        out
    }

    /// Scenarios in source order, one per identifier; a later scenario
    /// replaces an earlier one in place.
    fn scenarios_by_ident(&self) -> Vec<(String, &'a Scenario)> {
        let mut out: Vec<(String, &Scenario)> = Vec::new();
        for scenario in &self.doc.scenarios {
            let ident = sanitize_ident(&scenario.name);
            match out.iter_mut().find(|(i, _)| *i == ident) {
                Some(slot) => {
                    warn!(ident = %ident, "two scenarios share an identifier; keeping the later");
                    slot.1 = scenario;
                }
                None => out.push((ident, scenario)),
            }
        }
        out
    }

    // -- Variables -----------------------------------------------

    fn emit_variable_header(&mut self, class: &str, value_type: &str, entity: EntityKind, label: &str) {
        self.out.push_str(&format!("\nclass {}(Variable):\n", class));
        self.out.push_str(&format!("    value_type = {}\n", value_type));
        self.out.push_str(&format!("    entity = {}\n", entity.as_python()));
        self.out.push_str(&format!(
            "    definition_period = {}\n",
            self.config.definition_period.as_python()
        ));
        self.out
            .push_str(&format!("    label = \"{}\"\n", py_escape_double(label)));
    }

    fn emit_base_variables(
        &mut self,
        definitions: &BTreeMap<String, &'a Definition>,
        scenarios: &[(String, &'a Scenario)],
    ) {
        let mut names = BTreeSet::new();
        for (_, scenario) in scenarios {
            scenario.conditions.collect_variables(&mut names);
        }
        for definition in definitions.values() {
            if let DefinitionContent::Structured(expr) = &definition.content {
                expr.collect_variables(&mut names);
            }
        }

        // Names produced elsewhere in the module shadow base variables.
        let mut generated: BTreeSet<String> = definitions.keys().cloned().collect();
        for (ident, _) in scenarios {
            generated.insert(format!("{}_eligible", ident));
            generated.insert(format!("{}_payment", ident));
        }
        names.retain(|name| !generated.contains(&python_name(name)));

        self.out.push_str("\n# Base Variables\n");
        for name in &names {
            let value_type = infer_value_type(name);
            self.emit_variable_header(
                &python_name(name),
                value_type.as_python(),
                infer_entity(name),
                &label_for(name),
            );
        }
        debug!(count = names.len(), "emitted base variables");
    }

    fn emit_declarations(&mut self, names: &BTreeSet<String>) {
        if names.is_empty() {
            return;
        }
        self.out.push_str("        # Get all required variables\n");
        for name in names {
            let accessor = match infer_entity(name) {
                EntityKind::Person => "person",
                EntityKind::Family => "person.family",
            };
            let local = python_name(name);
            self.out
                .push_str(&format!("        {} = {}('{}', period)\n", local, accessor, local));
        }
        self.out.push('\n');
    }

    // -- Definitions ---------------------------------------------

    fn emit_definition(&mut self, ident: &str, definition: &Definition) {
        let reference = definition
            .source
            .as_ref()
            .and_then(|s| s.location.clone())
            .unwrap_or_default();

        match &definition.content {
            DefinitionContent::Structured(expr) => {
                self.emit_variable_header(ident, "bool", EntityKind::Person, &definition.term);
                self.out.push_str(&format!(
                    "    reference = \"{}\"\n\n",
                    py_escape_double(&reference)
                ));
                self.out
                    .push_str("    def formula(person, period, parameters):\n");
                let mut names = BTreeSet::new();
                expr.collect_variables(&mut names);
                self.emit_declarations(&names);
                self.out
                    .push_str(&format!("        return {}\n", render_expression(expr)));
            }
            DefinitionContent::Opaque(text) => {
                self.emit_variable_header(ident, "float", EntityKind::Person, &definition.term);
                self.out.push_str(&format!(
                    "    reference = \"{}\"\n\n",
                    py_escape_double(&reference)
                ));
                self.out
                    .push_str("    def formula(person, period, parameters):\n");
                if !text.is_empty() {
                    self.out.push_str(&format!("        # {}\n", text));
                }
                self.out
                    .push_str("        return 0  # TODO: Implement calculation\n");
            }
        }
        debug!(definition = %definition.term, "emitted definition");
    }

    // -- Scenarios -----------------------------------------------

    fn format_conditions(group: &RuleGroup, indent: usize, out: &mut String) {
        let prefix = " ".repeat(indent);
        for node in &group.rules {
            match node {
                ConditionNode::Rule(rule) => out.push_str(&format!("{}- {}\n", prefix, rule.text)),
                ConditionNode::Group(inner) => {
                    out.push_str(&format!("{}{}:\n", prefix, inner.operator.as_str()));
                    Self::format_conditions(inner, indent + 2, out);
                }
            }
        }
    }

    fn documentation(scenario: &Scenario) -> String {
        let mut doc = format!("Scenario: {}\n\nConditions:\n", scenario.name);
        Self::format_conditions(&scenario.conditions, 2, &mut doc);
        doc.push_str("\nOutcomes:\n");
        for outcome in &scenario.outcomes {
            doc.push_str(&format!("  - {}\n", outcome.text));
        }
        doc
    }

    fn emit_eligibility(&mut self, ident: &str, scenario: &Scenario) {
        let class = format!("{}_eligible", ident);
        self.out.push_str(&format!("\nclass {}(Variable):\n", class));
        self.out.push_str(&format!(
            "    \"\"\"Eligibility for {}\"\"\"\n",
            py_escape_double(&scenario.name)
        ));
        self.out.push_str("    value_type = bool\n");
        self.out.push_str("    entity = Person\n");
        self.out.push_str(&format!(
            "    definition_period = {}\n",
            self.config.definition_period.as_python()
        ));
        self.out.push_str(&format!(
            "    label = \"{} eligibility\"\n",
            py_escape_double(&scenario.name)
        ));
        if self.config.documentation {
            self.out.push_str("    documentation = \"\"\"\n");
            for line in py_doc(&Self::documentation(scenario)).lines() {
                if line.is_empty() {
                    self.out.push('\n');
                } else {
                    self.out.push_str(&format!("    {}\n", line));
                }
            }
            self.out.push_str("    \"\"\"\n");
        }
        self.out.push('\n');
        self.out
            .push_str("    def formula(person, period, parameters):\n");
        self.emit_declarations(&scenario.variables());

        let mut unparsed = Vec::new();
        let body = render_group(&scenario.conditions, &mut unparsed);
        self.out.push_str("        # Check eligibility conditions\n");
        for text in &unparsed {
            self.out
                .push_str(&format!("        # {} {}\n", TODO_MARKER, text));
        }
        for outcome in scenario.outcomes.iter().filter(|o| o.parsed.is_none()) {
            self.out
                .push_str(&format!("        # {} {}\n", TODO_MARKER, outcome.text));
        }
        self.out.push_str(&format!("        return {}\n", body));
        debug!(scenario = %scenario.name, "emitted eligibility rule");
    }

    fn payment_return(&mut self, scenario: &Scenario) -> String {
        for outcome in &scenario.outcomes {
            match outcome.calculation() {
                Some(Calculation::FixedPayment { amount, .. }) => {
                    return format!("return {:?}", amount);
                }
                Some(Calculation::ScheduleLookup { schedule }) => {
                    if self.doc.schedules.contains_key(schedule) {
                        return format!("return parameters(period).{}", sanitize_ident(schedule));
                    }
                    let message = format!("Schedule '{}' is not defined", schedule);
                    warn!(scenario = %scenario.name, "{}", message);
                    let idx = outcome.line.saturating_sub(1) as usize;
                    self.diagnostics
                        .push(self.index.whole_line(idx, Severity::Warning, message));
                    return format!(
                        "return 0  # TODO: schedule '{}' is not defined",
                        schedule
                    );
                }
                _ => {}
            }
        }
        "return 0  # TODO: Implement payment calculation".to_owned()
    }

    fn emit_payment(&mut self, ident: &str, scenario: &Scenario) {
        self.out.push_str(&format!("\n\nclass {}_payment(Variable):\n", ident));
        self.out.push_str(&format!(
            "    \"\"\"Payment amount for {}\"\"\"\n",
            py_escape_double(&scenario.name)
        ));
        self.out.push_str("    value_type = float\n");
        self.out.push_str("    entity = Person\n");
        self.out.push_str(&format!(
            "    definition_period = {}\n",
            self.config.definition_period.as_python()
        ));
        self.out.push_str(&format!(
            "    label = \"{} payment amount\"\n\n",
            py_escape_double(&scenario.name)
        ));
        self.out
            .push_str("    def formula(person, period, parameters):\n");
        self.out.push_str(&format!(
            "        eligible = person('{}_eligible', period)\n\n",
            ident
        ));
        self.out.push_str("        if not eligible:\n");
        self.out.push_str("            return 0\n\n");

        for outcome in &scenario.outcomes {
            if matches!(
                outcome.calculation(),
                Some(Calculation::Reduction { .. })
                    | Some(Calculation::Threshold { .. })
                    | Some(Calculation::BaseRate { .. })
            ) {
                self.out
                    .push_str(&format!("        # {} {}\n", TODO_MARKER, outcome.text));
            }
        }

        let ret = self.payment_return(scenario);
        self.out.push_str(&format!("        {}\n", ret));
        debug!(scenario = %scenario.name, "emitted payment rule");
    }
}
