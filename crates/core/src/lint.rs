//! Editor-facing linter.
//!
//! Independent of the document parser: a plain two-pass line scan. The first
//! pass collects schedule names so outcome references can be checked; the
//! second validates every line against the block it sits in.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostic::{Diagnostic, LineIndex, Severity};
use crate::document::{block_header, is_outcome_text, BlockKind};
use crate::outcome::parse_amount;

static OPERATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(==|!=|<=|>=|<|>|\b(?:between|is|not)\b)").unwrap());
static BETWEEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\w+\s+between\s+\S+\s+and\s+\S+").unwrap());
static BOOL_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(true|false)\b").unwrap());

static ELIGIBLE_EQ: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\w+\s*=\s*true").unwrap());
static ELIGIBLE_IS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\w+\s+is\s+eligible").unwrap());
static PAYMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)payment\s+is\s+\$?([\d,._]+)").unwrap());
static SCHEDULE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)rate\s+is\s+determined\s+by\s+(.+)").unwrap());
static REDUCTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)reduces?\s+by\s+[\d.]+\s+cents?\s+per\s+dollar").unwrap());
static THRESHOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)cut[- ]?out\s+at").unwrap());
static BASE_RATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)base\s+rate\s+is").unwrap());

static SCHEDULE_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^When\s+(.+?):\s*\$?([\d,._]+)(?:\s+per\s+(\w+))?$").unwrap()
});

const PERIODS: &[&str] = &["fortnight", "week", "month", "year"];

/// Character column of byte offset `byte` within `s`.
fn char_col(s: &str, byte: usize) -> usize {
    s[..byte].chars().count()
}

fn leading_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

#[derive(Debug, Clone, Copy)]
struct ScenarioState {
    header: usize,
    has_conditions: bool,
    has_outcomes: bool,
    expecting_items: bool,
    seen_then: bool,
}

#[derive(Debug, Clone, Copy)]
enum Block {
    Outside,
    Scenario(ScenarioState),
    Definition,
    Schedule,
}

struct Linter<'a> {
    lines: Vec<&'a str>,
    index: LineIndex,
    schedules: BTreeSet<&'a str>,
    definition_lines: BTreeMap<&'a str, usize>,
    schedule_lines: BTreeMap<&'a str, usize>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Linter<'a> {
    fn new(source: &'a str) -> Self {
        let lines: Vec<&str> = source.split('\n').map(str::trim_end).collect();
        let schedules = lines
            .iter()
            .copied()
            .filter_map(|l| match block_header(l) {
                Some((BlockKind::Schedule, name)) if !name.is_empty() => Some(name),
                _ => None,
            })
            .collect();
        Linter {
            lines,
            index: LineIndex::new(source),
            schedules,
            definition_lines: BTreeMap::new(),
            schedule_lines: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    fn push(&mut self, idx: usize, col: usize, len: usize, severity: Severity, msg: String) {
        let d = self.index.span(idx, col, len, severity, msg);
        self.diagnostics.push(d);
    }

    fn run(mut self) -> Vec<Diagnostic> {
        let mut block = Block::Outside;

        for idx in 0..self.lines.len() {
            let line = self.lines[idx];
            if let Some(tab) = line.find('\t') {
                let col = char_col(line, tab);
                self.push(
                    idx,
                    col,
                    1,
                    Severity::Warning,
                    "Use spaces instead of tabs for indentation".to_owned(),
                );
            }

            if line.trim().is_empty() {
                self.finish_block(block);
                block = Block::Outside;
                continue;
            }

            if let Some((kind, name)) = block_header(line) {
                self.finish_block(block);
                block = self.header(idx, kind, name);
                continue;
            }

            block = match block {
                Block::Scenario(state) => Block::Scenario(self.scenario_line(idx, state)),
                Block::Schedule => {
                    self.schedule_line(idx);
                    Block::Schedule
                }
                Block::Definition => Block::Definition,
                Block::Outside => {
                    let trimmed = line.trim();
                    if !trimmed.starts_with('#') {
                        let lead = leading_width(line);
                        self.push(
                            idx,
                            lead,
                            trimmed.chars().count(),
                            Severity::Warning,
                            "Text outside a Scenario, Definition or Schedule block is ignored"
                                .to_owned(),
                        );
                    }
                    Block::Outside
                }
            };
        }

        self.finish_block(block);
        self.diagnostics
    }

    fn finish_block(&mut self, block: Block) {
        if let Block::Scenario(state) = block {
            if !state.has_outcomes {
                let d = self.index.whole_line(
                    state.header,
                    Severity::Error,
                    "Scenario missing outcome statements (Then...)",
                );
                self.diagnostics.push(d);
            }
        }
    }

    // -- Headers -------------------------------------------------

    fn header(&mut self, idx: usize, kind: BlockKind, name: &'a str) -> Block {
        let line = self.lines[idx];
        let lead = leading_width(line);
        let prefix_len = match kind {
            BlockKind::Scenario => "Scenario:".len(),
            BlockKind::Definition => "Definition:".len(),
            BlockKind::Schedule => "Schedule:".len(),
        };
        let name_col = lead + prefix_len;
        let rest_len = line.chars().count().saturating_sub(name_col);

        if name.is_empty() {
            let msg = match kind {
                BlockKind::Scenario => "Scenario name is required",
                BlockKind::Definition => "Definition term is required",
                BlockKind::Schedule => "Schedule name is required",
            };
            self.push(idx, name_col, rest_len, Severity::Error, msg.to_owned());
        }

        match kind {
            BlockKind::Scenario => {
                if !name.is_empty() && !name.starts_with(|c: char| c.is_ascii_uppercase()) {
                    self.push(
                        idx,
                        name_col,
                        rest_len,
                        Severity::Warning,
                        "Scenario names should start with a capital letter".to_owned(),
                    );
                }
                Block::Scenario(ScenarioState {
                    header: idx,
                    has_conditions: false,
                    has_outcomes: false,
                    expecting_items: false,
                    seen_then: false,
                })
            }
            BlockKind::Definition => {
                self.check_duplicate(idx, name_col, rest_len, kind, name);
                Block::Definition
            }
            BlockKind::Schedule => {
                self.check_duplicate(idx, name_col, rest_len, kind, name);
                Block::Schedule
            }
        }
    }

    fn check_duplicate(
        &mut self,
        idx: usize,
        col: usize,
        len: usize,
        kind: BlockKind,
        name: &'a str,
    ) {
        if name.is_empty() {
            return;
        }
        let seen = match kind {
            BlockKind::Schedule => &mut self.schedule_lines,
            _ => &mut self.definition_lines,
        };
        if let Some(first) = seen.insert(name, idx) {
            let msg = format!(
                "{:?} '{}' is already defined on line {}; the later block wins",
                kind,
                name,
                first + 1
            );
            self.push(idx, col, len, Severity::Warning, msg);
        }
    }

    // -- Scenarios -----------------------------------------------

    fn scenario_line(&mut self, idx: usize, mut state: ScenarioState) -> ScenarioState {
        let line = self.lines[idx];
        let lead = leading_width(line);
        let trimmed = line.trim();
        let (keyword, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((kw, rest)) => (kw, rest.trim_start()),
            None => (trimmed, ""),
        };
        let rest_col = lead + trimmed.chars().count() - rest.chars().count();

        let is_outcome = !rest.is_empty()
            && (keyword == "Then" || (keyword == "And" && state.seen_then && is_outcome_text(rest)));
        if is_outcome {
            if !state.has_conditions {
                self.push(
                    idx,
                    lead,
                    keyword.chars().count(),
                    Severity::Error,
                    "Outcomes (Then) must follow conditions (When/Given)".to_owned(),
                );
            }
            state.has_outcomes = true;
            state.seen_then = true;
            state.expecting_items = false;
            self.check_outcome(idx, rest_col, rest);
            return state;
        }

        if matches!(keyword, "When" | "Given" | "And" | "Or") && !rest.is_empty() {
            if rest.ends_with("these are true:") || rest.ends_with("the following:") {
                state.expecting_items = true;
                return state;
            }
            if keyword == "Or" && !state.has_conditions {
                self.push(
                    idx,
                    lead,
                    2,
                    Severity::Error,
                    "Or cannot be used before any conditions".to_owned(),
                );
            }
            self.check_condition(idx, rest_col, rest);
            state.has_conditions = true;
            return state;
        }

        if let Some(item) = trimmed.strip_prefix("- ") {
            if !state.expecting_items {
                self.push(
                    idx,
                    lead,
                    2,
                    Severity::Error,
                    "List items must follow a group declaration (e.g., \"any of these are true:\")"
                        .to_owned(),
                );
            }
            let item = item.trim_start();
            let item_col = lead + trimmed.chars().count() - item.chars().count();
            self.check_condition(idx, item_col, item);
            state.has_conditions = true;
            return state;
        }

        if !trimmed.starts_with('#') {
            self.push(
                idx,
                lead,
                trimmed.chars().count(),
                Severity::Error,
                "Expected When, Given, And, Or, Then, or list item (-)".to_owned(),
            );
        }
        state
    }

    fn check_condition(&mut self, idx: usize, col: usize, condition: &str) {
        let len = condition.chars().count();

        if !OPERATOR.is_match(condition) {
            self.push(
                idx,
                col,
                len,
                Severity::Error,
                "Condition missing comparison operator (e.g., ==, <, >, between)".to_owned(),
            );
            return;
        }

        let lower = condition.to_lowercase();
        if let Some(pos) = lower.find("between") {
            if !BETWEEN.is_match(condition) {
                self.push(
                    idx,
                    col + char_col(&lower, pos),
                    "between".len(),
                    Severity::Error,
                    "Invalid \"between\" syntax. Use: variable between X and Y".to_owned(),
                );
            }
        }

        let quotes = condition.chars().filter(|c| *c == '"' || *c == '\'').count();
        if quotes % 2 != 0 {
            self.push(
                idx,
                col,
                len,
                Severity::Error,
                "Unmatched quotes in condition".to_owned(),
            );
        }

        let odd_case: Vec<(usize, String)> = BOOL_WORD
            .find_iter(condition)
            .filter(|m| m.as_str() != "true" && m.as_str() != "false")
            .map(|m| (char_col(condition, m.start()), m.as_str().to_owned()))
            .collect();
        for (pos, word) in odd_case {
            self.push(
                idx,
                col + pos,
                word.chars().count(),
                Severity::Warning,
                format!("Boolean values should be lowercase: {}", word.to_lowercase()),
            );
        }
    }

    fn check_outcome(&mut self, idx: usize, col: usize, outcome: &str) {
        if ELIGIBLE_EQ.is_match(outcome) || ELIGIBLE_IS.is_match(outcome) {
            return;
        }

        if let Some(caps) = PAYMENT.captures(outcome) {
            if let Some(m) = caps.get(1) {
                if parse_amount(m.as_str()).is_none() {
                    self.push(
                        idx,
                        col + char_col(outcome, m.start()),
                        m.as_str().chars().count(),
                        Severity::Error,
                        "Invalid payment amount format".to_owned(),
                    );
                }
            }
            return;
        }

        if let Some(caps) = SCHEDULE_REF.captures(outcome) {
            if let Some(m) = caps.get(1) {
                let name = m.as_str().trim();
                if !self.schedules.contains(name) {
                    self.push(
                        idx,
                        col + char_col(outcome, m.start()),
                        name.chars().count(),
                        Severity::Error,
                        format!("Schedule '{}' not defined", name),
                    );
                }
            }
            return;
        }

        if REDUCTION.is_match(outcome) || THRESHOLD.is_match(outcome) || BASE_RATE.is_match(outcome)
        {
            return;
        }

        self.push(
            idx,
            col,
            outcome.chars().count(),
            Severity::Warning,
            "Unrecognised outcome format".to_owned(),
        );
    }

    // -- Schedules -----------------------------------------------

    fn schedule_line(&mut self, idx: usize) {
        let line = self.lines[idx];
        let lead = leading_width(line);
        let trimmed = line.trim();
        let len = trimmed.chars().count();

        if trimmed.starts_with("When ") {
            let Some(caps) = SCHEDULE_ENTRY.captures(trimmed) else {
                self.push(
                    idx,
                    lead,
                    len,
                    Severity::Error,
                    "Invalid schedule entry format. Expected: \"When [condition]: $[amount] per [period]\""
                        .to_owned(),
                );
                return;
            };
            if let Some(amount) = caps.get(2) {
                if parse_amount(amount.as_str()).is_none() {
                    self.push(
                        idx,
                        lead + char_col(trimmed, amount.start()),
                        amount.as_str().chars().count(),
                        Severity::Error,
                        "Invalid amount format".to_owned(),
                    );
                }
            }
            if let Some(period) = caps.get(3) {
                let p = period.as_str();
                if !PERIODS.contains(&p.to_lowercase().as_str()) {
                    self.push(
                        idx,
                        lead + char_col(trimmed, period.start()),
                        p.chars().count(),
                        Severity::Warning,
                        format!(
                            "Unknown period '{}'. Use: fortnight, week, month, or year",
                            p
                        ),
                    );
                }
            }
        } else if !trimmed.starts_with("Note:") && !trimmed.starts_with('#') {
            self.push(
                idx,
                lead,
                len,
                Severity::Error,
                "Expected schedule entry starting with \"When\" or \"Note:\"".to_owned(),
            );
        }
    }
}

/// Check `source` and return every diagnostic in line order.
pub fn lint(source: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Linter::new(source).run();
    diagnostics.sort_by_key(|d| (d.line, d.column));
    diagnostics
}
