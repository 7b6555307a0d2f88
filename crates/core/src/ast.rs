//! Document model produced by the parsers.
//!
//! Every entity is built once while parsing a single source text and read
//! once by the generator. Nothing here is resolved at parse time: schedule
//! and definition names are plain strings until generation.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostic::Diagnostic;

// ──────────────────────────────────────────────
// Expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Neq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// A tagged computation named by an outcome line. Parameters are resolved by
/// the generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "calc_type", rename_all = "snake_case")]
pub enum Calculation {
    FixedPayment { amount: f64, period: String },
    ScheduleLookup { schedule: String },
    BaseRate { amount: f64 },
    /// `rate` is dollars withdrawn per dollar over `threshold`.
    Reduction { rate: f64, threshold: f64 },
    Threshold { cutout: f64 },
}

impl Calculation {
    pub fn calc_type(&self) -> &'static str {
        match self {
            Calculation::FixedPayment { .. } => "fixed_payment",
            Calculation::ScheduleLookup { .. } => "schedule_lookup",
            Calculation::BaseRate { .. } => "base_rate",
            Calculation::Reduction { .. } => "reduction",
            Calculation::Threshold { .. } => "threshold",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Variable {
        name: String,
    },
    Number {
        value: f64,
    },
    String {
        value: String,
    },
    Boolean {
        value: bool,
    },
    Calculation(Calculation),
    Comparison {
        left: Box<Expression>,
        operator: CompareOp,
        right: Box<Expression>,
    },
    /// `Not` holds exactly one operand; `And`/`Or` hold at least two once
    /// built through [`Expression::all`] / [`Expression::any`].
    Logical {
        operator: LogicalOp,
        operands: Vec<Expression>,
    },
}

impl Expression {
    pub fn var(name: impl Into<String>) -> Self {
        Expression::Variable { name: name.into() }
    }

    pub fn number(value: f64) -> Self {
        Expression::Number { value }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::String {
            value: value.into(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Expression::Boolean { value }
    }

    pub fn compare(left: Expression, operator: CompareOp, right: Expression) -> Self {
        Expression::Comparison {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    /// Conjunction; a single operand collapses to itself.
    pub fn all(mut operands: Vec<Expression>) -> Self {
        if operands.len() == 1 {
            return operands.remove(0);
        }
        Expression::Logical {
            operator: LogicalOp::And,
            operands,
        }
    }

    /// Disjunction; a single operand collapses to itself.
    pub fn any(mut operands: Vec<Expression>) -> Self {
        if operands.len() == 1 {
            return operands.remove(0);
        }
        Expression::Logical {
            operator: LogicalOp::Or,
            operands,
        }
    }

    pub fn negate(operand: Expression) -> Self {
        Expression::Logical {
            operator: LogicalOp::Not,
            operands: vec![operand],
        }
    }

    /// Collect every variable name referenced by this expression.
    pub fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Expression::Variable { name } => {
                out.insert(name.clone());
            }
            Expression::Comparison { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            Expression::Logical { operands, .. } => {
                for op in operands {
                    op.collect_variables(out);
                }
            }
            Expression::Number { .. }
            | Expression::String { .. }
            | Expression::Boolean { .. }
            | Expression::Calculation(_) => {}
        }
    }
}

// ──────────────────────────────────────────────
// References and definitions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Section,
    Schedule,
    Definition,
}

/// Traceability handle; never resolved by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub ref_type: ReferenceKind,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "definition_type", content = "content", rename_all = "snake_case")]
pub enum DefinitionContent {
    /// Body parsed as an expression.
    #[serde(rename = "expression")]
    Structured(Expression),
    /// Body kept as free text.
    #[serde(rename = "text")]
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub term: String,
    #[serde(flatten)]
    pub content: DefinitionContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Reference>,
    pub line: u32,
}

impl Definition {
    pub fn definition_type(&self) -> &'static str {
        match self.content {
            DefinitionContent::Structured(_) => "expression",
            DefinitionContent::Opaque(_) => "text",
        }
    }
}

// ──────────────────────────────────────────────
// Schedules
// ──────────────────────────────────────────────

pub const DEFAULT_PERIOD: &str = "fortnight";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub condition: String,
    pub amount: f64,
    pub period: String,
}

/// Rate table. Entries keep source order; lookup semantics belong to the
/// target runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    pub name: String,
    pub schedule_type: String,
    pub entries: Vec<ScheduleEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    pub line: u32,
}

// ──────────────────────────────────────────────
// Rules, groups, scenarios
// ──────────────────────────────────────────────

/// Structured record for an `x = true` / `x is eligible` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub benefit: String,
    pub variable: String,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleBody {
    Expression(Expression),
    Eligibility(Eligibility),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    /// Source line with its leading keyword removed.
    pub text: String,
    /// `None` when the line could not be parsed or classified.
    pub parsed: Option<RuleBody>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
    pub line: u32,
}

impl Rule {
    pub fn expression(&self) -> Option<&Expression> {
        match &self.parsed {
            Some(RuleBody::Expression(e)) => Some(e),
            _ => None,
        }
    }

    pub fn calculation(&self) -> Option<&Calculation> {
        match &self.parsed {
            Some(RuleBody::Expression(Expression::Calculation(c))) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupOperator {
    #[serde(rename = "all of")]
    AllOf,
    #[serde(rename = "any of")]
    AnyOf,
    #[serde(rename = "none of")]
    NoneOf,
}

impl GroupOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupOperator::AllOf => "all of",
            GroupOperator::AnyOf => "any of",
            GroupOperator::NoneOf => "none of",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Rule(Rule),
    Group(RuleGroup),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleGroup {
    pub operator: GroupOperator,
    pub rules: Vec<ConditionNode>,
}

impl RuleGroup {
    pub fn new(operator: GroupOperator) -> Self {
        RuleGroup {
            operator,
            rules: Vec::new(),
        }
    }

    pub fn collect_variables(&self, out: &mut BTreeSet<String>) {
        for node in &self.rules {
            match node {
                ConditionNode::Rule(rule) => {
                    if let Some(expr) = rule.expression() {
                        expr.collect_variables(out);
                    }
                }
                ConditionNode::Group(group) => group.collect_variables(out),
            }
        }
    }

    /// Condition rules that carry no parsed expression, in source order.
    pub fn unparsed_rules(&self) -> Vec<&Rule> {
        let mut out = Vec::new();
        self.walk_unparsed(&mut out);
        out
    }

    fn walk_unparsed<'a>(&'a self, out: &mut Vec<&'a Rule>) {
        for node in &self.rules {
            match node {
                ConditionNode::Rule(rule) if rule.parsed.is_none() => out.push(rule),
                ConditionNode::Rule(_) => {}
                ConditionNode::Group(group) => group.walk_unparsed(out),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub name: String,
    /// Root group; always present, operator `all of`.
    pub conditions: RuleGroup,
    pub outcomes: Vec<Rule>,
    pub line: u32,
}

impl Scenario {
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.conditions.collect_variables(&mut out);
        out
    }
}

/// Everything parsed from one source text. Definitions and schedules are
/// shared by all scenarios of the document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Document {
    pub scenarios: Vec<Scenario>,
    pub definitions: BTreeMap<String, Definition>,
    pub schedules: BTreeMap<String, Schedule>,
    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(text: &str, parsed: Option<Expression>) -> ConditionNode {
        ConditionNode::Rule(Rule {
            text: text.to_owned(),
            parsed: parsed.map(RuleBody::Expression),
            references: Vec::new(),
            line: 1,
        })
    }

    #[test]
    fn single_operand_chains_collapse() {
        let e = Expression::all(vec![Expression::var("a")]);
        assert_eq!(e, Expression::var("a"));
        let e = Expression::any(vec![Expression::var("b")]);
        assert_eq!(e, Expression::var("b"));
    }

    #[test]
    fn collects_variables_from_both_sides() {
        let e = Expression::all(vec![
            Expression::compare(Expression::var("age"), CompareOp::Gte, Expression::number(18.0)),
            Expression::negate(Expression::compare(
                Expression::var("income"),
                CompareOp::Lt,
                Expression::var("limit"),
            )),
        ]);
        let mut vars = BTreeSet::new();
        e.collect_variables(&mut vars);
        let vars: Vec<_> = vars.into_iter().collect();
        assert_eq!(vars, vec!["age", "income", "limit"]);
    }

    #[test]
    fn group_walk_reaches_nested_rules() {
        let mut inner = RuleGroup::new(GroupOperator::AnyOf);
        inner.rules.push(rule(
            "x == 1",
            Some(Expression::compare(
                Expression::var("x"),
                CompareOp::Eq,
                Expression::number(1.0),
            )),
        ));
        inner.rules.push(rule("gibberish here", None));
        let mut root = RuleGroup::new(GroupOperator::AllOf);
        root.rules.push(ConditionNode::Group(inner));

        let mut vars = BTreeSet::new();
        root.collect_variables(&mut vars);
        assert!(vars.contains("x"));
        let unparsed = root.unparsed_rules();
        assert_eq!(unparsed.len(), 1);
        assert_eq!(unparsed[0].text, "gibberish here");
    }

    #[test]
    fn definition_type_follows_content() {
        let d = Definition {
            term: "t".into(),
            content: DefinitionContent::Opaque("prose".into()),
            source: None,
            line: 1,
        };
        assert_eq!(d.definition_type(), "text");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["definition_type"], "text");
        assert_eq!(json["content"], "prose");
    }
}
