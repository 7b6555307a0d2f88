//! Python boolean rendering for expressions and condition groups.
//!
//! Variables render as bare locals; the emitter declares each one at the top
//! of the formula. Multi-member chains and groups parenthesise every member
//! so precedence never depends on Python's rules.

use courgette_core::{ConditionNode, Expression, GroupOperator, LogicalOp, RuleGroup};

use crate::types::python_name;

/// Python string literal with single quotes.
pub fn py_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Contents for a double-quoted Python string (without the quotes).
pub fn py_escape_double(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn join_members(members: Vec<String>, sep: &str) -> String {
    if members.len() == 1 {
        return members.into_iter().collect();
    }
    members
        .iter()
        .map(|m| format!("({})", m))
        .collect::<Vec<_>>()
        .join(sep)
}

pub fn render_expression(expr: &Expression) -> String {
    match expr {
        Expression::Variable { name } => python_name(name),
        Expression::Number { value } => format!("{}", value),
        Expression::String { value } => py_string(value),
        Expression::Boolean { value } => {
            if *value {
                "True".to_owned()
            } else {
                "False".to_owned()
            }
        }
        // Calculations only appear in outcomes; the payment emitter handles them.
        Expression::Calculation(_) => "0".to_owned(),
        Expression::Comparison {
            left,
            operator,
            right,
        } => format!(
            "{} {} {}",
            render_expression(left),
            operator.as_str(),
            render_expression(right)
        ),
        Expression::Logical { operator, operands } => {
            let members: Vec<String> = operands.iter().map(render_expression).collect();
            match operator {
                LogicalOp::And => join_members(members, " and "),
                LogicalOp::Or => join_members(members, " or "),
                LogicalOp::Not => format!("not ({})", members.join(", ")),
            }
        }
    }
}

/// Render a condition group. Rules without a parsed expression render as
/// `False` and their text is appended to `unparsed`.
pub fn render_group(group: &RuleGroup, unparsed: &mut Vec<String>) -> String {
    let members: Vec<String> = group
        .rules
        .iter()
        .map(|node| match node {
            ConditionNode::Rule(rule) => match rule.expression() {
                Some(expr) => render_expression(expr),
                None => {
                    unparsed.push(rule.text.clone());
                    "False".to_owned()
                }
            },
            ConditionNode::Group(inner) => render_group(inner, unparsed),
        })
        .collect();

    match group.operator {
        GroupOperator::AllOf if members.is_empty() => "True".to_owned(),
        GroupOperator::AnyOf if members.is_empty() => "False".to_owned(),
        GroupOperator::NoneOf if members.is_empty() => "True".to_owned(),
        GroupOperator::AllOf => join_members(members, " and "),
        GroupOperator::AnyOf => join_members(members, " or "),
        GroupOperator::NoneOf => format!("not ({})", join_members(members, " or ")),
    }
}
