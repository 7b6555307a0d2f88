//! Structural document parser.
//!
//! A single forward scan over physical lines. Three block kinds are
//! recognised by their header prefix (`Scenario:`, `Definition:`,
//! `Schedule:`); a new header implicitly ends the current block. Nothing in
//! here fails: malformed lines degrade to fallback rules or free text and
//! leave a [`Diagnostic`] behind.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::ast::{
    ConditionNode, Definition, DefinitionContent, Document, GroupOperator, Rule, RuleBody,
    RuleGroup, Scenario, Schedule, ScheduleEntry, DEFAULT_PERIOD,
};
use crate::diagnostic::{Diagnostic, LineIndex, Severity};
use crate::outcome::{outcome_rule, parse_amount};
use crate::parser::parse_expression;

static SCHEDULE_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^When (.+?):\s*\$?([\d,._]+)(?:\s+per\s+(\w+))?").unwrap()
});

const CONDITION_KEYWORDS: &[&str] = &["When", "Given", "And", "Or"];
const OUTCOME_TOKENS: &[&str] = &["payment", "rate", "eligible", "=", "is"];
const GROUP_OPENERS: &[&str] = &["these are true:", "the following:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Scenario,
    Definition,
    Schedule,
}

/// Recognise a block header, returning its kind and the trimmed name.
pub fn block_header(line: &str) -> Option<(BlockKind, &str)> {
    let trimmed = line.trim_start();
    [
        ("Scenario:", BlockKind::Scenario),
        ("Definition:", BlockKind::Definition),
        ("Schedule:", BlockKind::Schedule),
    ]
    .into_iter()
    .find_map(|(prefix, kind)| {
        trimmed
            .strip_prefix(prefix)
            .map(|rest| (kind, rest.trim()))
    })
}

/// Split `When age >= 18` into `("When", "age >= 18")`.
fn split_keyword(stripped: &str) -> (&str, &str) {
    match stripped.split_once(char::is_whitespace) {
        Some((kw, rest)) => (kw, rest.trim_start()),
        None => (stripped, ""),
    }
}

/// Operator for a group-opening phrase such as `any of these are true:`.
fn group_operator(rest: &str) -> Option<GroupOperator> {
    if !GROUP_OPENERS.iter().any(|p| rest.ends_with(p)) {
        return None;
    }
    Some(if rest.contains("any of") {
        GroupOperator::AnyOf
    } else if rest.contains("all of") {
        GroupOperator::AllOf
    } else {
        GroupOperator::NoneOf
    })
}

pub(crate) fn is_outcome_text(rest: &str) -> bool {
    let lower = rest.to_lowercase();
    OUTCOME_TOKENS.iter().any(|t| lower.contains(t))
}

/// Pop every nested group into its parent until only the root is left.
fn close_groups(stack: &mut Vec<RuleGroup>) {
    while stack.len() > 1 {
        if let Some(group) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.rules.push(ConditionNode::Group(group));
            }
        }
    }
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct DocumentParser<'a> {
    lines: Vec<&'a str>,
    index: LineIndex,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> DocumentParser<'a> {
    fn new(source: &'a str) -> Self {
        DocumentParser {
            lines: source.split('\n').map(str::trim_end).collect(),
            index: LineIndex::new(source),
            diagnostics: Vec::new(),
        }
    }

    fn warn_line(&mut self, idx: usize, message: String) {
        warn!(line = idx + 1, "{}", message);
        let d = self.index.whole_line(idx, Severity::Warning, message);
        self.diagnostics.push(d);
    }

    /// True while `idx` is inside the body of the current block.
    fn in_body(&self, idx: usize) -> bool {
        idx < self.lines.len()
            && !self.lines[idx].trim().is_empty()
            && block_header(self.lines[idx]).is_none()
    }

    fn parse(mut self) -> Document {
        let mut doc = Document::default();
        let mut idx = 0;

        while idx < self.lines.len() {
            let Some((kind, name)) = block_header(self.lines[idx]) else {
                idx += 1;
                continue;
            };
            if name.is_empty() {
                self.warn_line(idx, format!("{:?} block without a name is ignored", kind));
                idx += 1;
                while self.in_body(idx) {
                    idx += 1;
                }
                continue;
            }
            let name = name.to_owned();

            match kind {
                BlockKind::Definition => {
                    let (definition, next) = self.parse_definition(idx, name);
                    if let Some(previous) = doc.definitions.get(&definition.term) {
                        let msg = format!(
                            "Definition '{}' replaces the one on line {}",
                            definition.term, previous.line
                        );
                        self.warn_line(idx, msg);
                    }
                    doc.definitions
                        .insert(definition.term.clone(), definition);
                    idx = next;
                }
                BlockKind::Schedule => {
                    let (schedule, next) = self.parse_schedule(idx, name);
                    if let Some(previous) = doc.schedules.get(&schedule.name) {
                        let msg = format!(
                            "Schedule '{}' replaces the one on line {}",
                            schedule.name, previous.line
                        );
                        self.warn_line(idx, msg);
                    }
                    doc.schedules.insert(schedule.name.clone(), schedule);
                    idx = next;
                }
                BlockKind::Scenario => {
                    let (scenario, next) = self.parse_scenario(idx, name);
                    match doc.scenarios.iter_mut().find(|s| s.name == scenario.name) {
                        Some(existing) => {
                            let msg = format!(
                                "Scenario '{}' replaces the one on line {}",
                                scenario.name, existing.line
                            );
                            *existing = scenario;
                            self.warn_line(idx, msg);
                        }
                        None => doc.scenarios.push(scenario),
                    }
                    idx = next;
                }
            }
        }

        doc.diagnostics = self.diagnostics;
        doc
    }

    // -- Definition ----------------------------------------------

    fn parse_definition(&mut self, start: usize, term: String) -> (Definition, usize) {
        let mut idx = start + 1;
        let mut body = Vec::new();
        while self.in_body(idx) {
            body.push(self.lines[idx].trim());
            idx += 1;
        }
        let text = body.join(" ");

        let content = match parse_expression(&text) {
            Ok(expr) => DefinitionContent::Structured(expr),
            Err(e) => {
                debug!(term = %term, reason = %e.message, "definition kept as text");
                DefinitionContent::Opaque(text)
            }
        };
        debug!(term = %term, line = start + 1, "parsed definition");

        let definition = Definition {
            term,
            content,
            source: None,
            line: start as u32 + 1,
        };
        (definition, idx)
    }

    // -- Schedule ------------------------------------------------

    fn parse_schedule(&mut self, start: usize, name: String) -> (Schedule, usize) {
        let mut idx = start + 1;
        let mut entries = Vec::new();
        let mut notes = Vec::new();

        while self.in_body(idx) {
            let line = self.lines[idx].trim();
            if let Some(caps) = SCHEDULE_ENTRY.captures(line) {
                match parse_amount(&caps[2]) {
                    Some(amount) => entries.push(ScheduleEntry {
                        condition: caps[1].to_owned(),
                        amount,
                        period: caps
                            .get(3)
                            .map(|m| m.as_str().to_owned())
                            .unwrap_or_else(|| DEFAULT_PERIOD.to_owned()),
                    }),
                    None => {
                        let msg = format!("Schedule entry amount '{}' is not a number", &caps[2]);
                        self.warn_line(idx, msg);
                    }
                }
            } else if let Some(note) = line.strip_prefix("Note:") {
                notes.push(note.trim().to_owned());
            }
            idx += 1;
        }
        debug!(schedule = %name, entries = entries.len(), "parsed schedule");

        let schedule = Schedule {
            name,
            schedule_type: "rates".to_owned(),
            entries,
            notes,
            line: start as u32 + 1,
        };
        (schedule, idx)
    }

    // -- Scenario ------------------------------------------------

    fn condition_rule(&mut self, idx: usize, text: &str) -> Rule {
        let line = idx as u32 + 1;
        match parse_expression(text) {
            Ok(expr) => Rule {
                text: text.to_owned(),
                parsed: Some(RuleBody::Expression(expr)),
                references: Vec::new(),
                line,
            },
            Err(e) => {
                self.warn_line(idx, format!("Condition not understood ({})", e.message));
                Rule {
                    text: text.to_owned(),
                    parsed: None,
                    references: Vec::new(),
                    line,
                }
            }
        }
    }

    fn parse_scenario(&mut self, start: usize, name: String) -> (Scenario, usize) {
        let mut stack = vec![RuleGroup::new(GroupOperator::AllOf)];
        let mut outcomes = Vec::new();
        let mut seen_then = false;
        let mut idx = start + 1;

        while self.in_body(idx) {
            let stripped = self.lines[idx].trim();
            let (keyword, rest) = split_keyword(stripped);

            // Outcomes: `Then ...`, or `And ...` once a `Then` has been seen.
            let outcome_keyword = keyword == "Then" || (keyword == "And" && seen_then);
            if outcome_keyword && !rest.is_empty() && is_outcome_text(rest) {
                seen_then = true;
                close_groups(&mut stack);
                let rule = outcome_rule(rest, idx as u32 + 1);
                if rule.parsed.is_none() {
                    self.warn_line(idx, format!("Outcome not recognised: '{}'", rule.text));
                }
                outcomes.push(rule);
                idx += 1;
                continue;
            }
            if keyword == "Then" {
                seen_then = true;
                idx += 1;
                continue;
            }

            if CONDITION_KEYWORDS.contains(&keyword) && !rest.is_empty() {
                if let Some(operator) = group_operator(rest) {
                    stack.push(RuleGroup::new(operator));
                    idx += 1;
                    continue;
                }

                let rule = self.condition_rule(idx, rest);
                if let Some(top) = stack.last_mut() {
                    match top.rules.pop() {
                        // A trailing `Or` turns the previous sibling and this
                        // rule into an explicit disjunction.
                        Some(previous) if keyword == "Or" => {
                            top.rules.push(ConditionNode::Group(RuleGroup {
                                operator: GroupOperator::AnyOf,
                                rules: vec![previous, ConditionNode::Rule(rule)],
                            }));
                        }
                        Some(previous) => {
                            top.rules.push(previous);
                            top.rules.push(ConditionNode::Rule(rule));
                        }
                        None => top.rules.push(ConditionNode::Rule(rule)),
                    }
                }
                idx += 1;
                continue;
            }

            if let Some(item) = stripped.strip_prefix("- ") {
                let rule = self.condition_rule(idx, item.trim());
                if let Some(top) = stack.last_mut() {
                    top.rules.push(ConditionNode::Rule(rule));
                }
            }
            // Anything else is stray prose.
            idx += 1;
        }

        close_groups(&mut stack);
        let conditions = stack
            .pop()
            .unwrap_or_else(|| RuleGroup::new(GroupOperator::AllOf));
        debug!(
            scenario = %name,
            conditions = conditions.rules.len(),
            outcomes = outcomes.len(),
            "parsed scenario"
        );

        let scenario = Scenario {
            name,
            conditions,
            outcomes,
            line: start as u32 + 1,
        };
        (scenario, idx)
    }
}

/// Parse a whole source text. Never fails; see [`Document::diagnostics`].
pub fn parse_document(source: &str) -> Document {
    DocumentParser::new(source).parse()
}
