//! Property tests for Python rendering.
//!
//! Random conditions are printed as Courgette text, parsed, rendered to
//! Python, and the Python is evaluated by a small interpreter for the subset
//! the renderer emits. The result must match direct evaluation of the
//! condition under the same bindings.

use std::collections::BTreeMap;

use courgette_codegen::python_name;
use courgette_codegen::render::{render_expression, render_group};
use courgette_core::{
    parse_expression, CompareOp, ConditionNode, GroupOperator, Rule, RuleBody, RuleGroup,
};
use proptest::prelude::*;

// `period` and `class` exercise the reserved-name suffix.
const VARS: &[&str] = &["age", "income", "period", "class"];

#[derive(Debug, Clone)]
enum Cond {
    Cmp(usize, CompareOp, i64),
    Between(usize, i64, i64),
    And(Vec<Cond>),
    Or(Vec<Cond>),
    Not(Box<Cond>),
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(Cond),
    Group(GroupOperator, Vec<Node>),
}

fn op_strategy() -> impl Strategy<Value = CompareOp> {
    prop_oneof![
        Just(CompareOp::Eq),
        Just(CompareOp::Neq),
        Just(CompareOp::Lt),
        Just(CompareOp::Lte),
        Just(CompareOp::Gt),
        Just(CompareOp::Gte),
    ]
}

fn group_op_strategy() -> impl Strategy<Value = GroupOperator> {
    prop_oneof![
        Just(GroupOperator::AllOf),
        Just(GroupOperator::AnyOf),
        Just(GroupOperator::NoneOf),
    ]
}

fn cond_strategy() -> impl Strategy<Value = Cond> {
    let leaf = prop_oneof![
        (0..VARS.len(), op_strategy(), 0i64..20).prop_map(|(v, op, n)| Cond::Cmp(v, op, n)),
        (0..VARS.len(), 0i64..20, 0i64..20).prop_map(|(v, lo, hi)| Cond::Between(v, lo, hi)),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2..4).prop_map(Cond::And),
            prop::collection::vec(inner.clone(), 2..4).prop_map(Cond::Or),
            inner.prop_map(|c| Cond::Not(Box::new(c))),
        ]
    })
}

fn node_strategy() -> impl Strategy<Value = Node> {
    cond_strategy().prop_map(Node::Leaf).prop_recursive(3, 16, 4, |inner| {
        (group_op_strategy(), prop::collection::vec(inner, 0..4))
            .prop_map(|(op, members)| Node::Group(op, members))
    })
}

fn bindings_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..20, VARS.len())
}

fn print(c: &Cond) -> String {
    let join = |items: &[Cond], sep: &str| {
        items
            .iter()
            .map(|i| format!("({})", print(i)))
            .collect::<Vec<_>>()
            .join(sep)
    };
    match c {
        Cond::Cmp(v, op, n) => format!("{} {} {}", VARS[*v], op.as_str(), n),
        Cond::Between(v, lo, hi) => format!("{} between {} and {}", VARS[*v], lo, hi),
        Cond::And(items) => join(items, " and "),
        Cond::Or(items) => join(items, " or "),
        Cond::Not(inner) => format!("not ({})", print(inner)),
    }
}

fn compare(l: f64, op: CompareOp, r: f64) -> bool {
    match op {
        CompareOp::Eq => l == r,
        CompareOp::Neq => l != r,
        CompareOp::Lt => l < r,
        CompareOp::Lte => l <= r,
        CompareOp::Gt => l > r,
        CompareOp::Gte => l >= r,
    }
}

fn eval_cond(c: &Cond, env: &[i64]) -> bool {
    match c {
        Cond::Cmp(v, op, n) => compare(env[*v] as f64, *op, *n as f64),
        Cond::Between(v, lo, hi) => *lo <= env[*v] && env[*v] <= *hi,
        Cond::And(items) => items.iter().all(|i| eval_cond(i, env)),
        Cond::Or(items) => items.iter().any(|i| eval_cond(i, env)),
        Cond::Not(inner) => !eval_cond(inner, env),
    }
}

fn eval_node(n: &Node, env: &[i64]) -> bool {
    match n {
        Node::Leaf(c) => eval_cond(c, env),
        Node::Group(op, members) => {
            let mut results = members.iter().map(|m| eval_node(m, env));
            match op {
                GroupOperator::AllOf => results.all(|b| b),
                GroupOperator::AnyOf => results.any(|b| b),
                GroupOperator::NoneOf => !results.any(|b| b),
            }
        }
    }
}

fn build_group(op: GroupOperator, members: &[Node]) -> RuleGroup {
    let rules = members
        .iter()
        .map(|m| match m {
            Node::Leaf(c) => {
                let text = print(c);
                ConditionNode::Rule(Rule {
                    parsed: parse_expression(&text).ok().map(RuleBody::Expression),
                    text,
                    references: Vec::new(),
                    line: 1,
                })
            }
            Node::Group(inner_op, inner) => ConditionNode::Group(build_group(*inner_op, inner)),
        })
        .collect();
    RuleGroup { operator: op, rules }
}

/// Bindings keyed by the names the generated module uses.
fn python_env(env: &[i64]) -> BTreeMap<String, f64> {
    VARS.iter()
        .map(|v| python_name(v))
        .zip(env.iter().map(|n| *n as f64))
        .collect()
}

// ──────────────────────────────────────────────
// Interpreter for the rendered Python subset
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Name(String),
    Num(f64),
    Cmp(CompareOp),
    LParen,
    RParen,
}

fn tokenize(src: &str) -> Vec<Tok> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '(' {
            out.push(Tok::LParen);
            i += 1;
        } else if c == ')' {
            out.push(Tok::RParen);
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            out.push(Tok::Num(text.parse().expect("number")));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            out.push(Tok::Name(chars[start..i].iter().collect()));
        } else {
            let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
            let (op, width) = match two.as_str() {
                "==" => (CompareOp::Eq, 2),
                "!=" => (CompareOp::Neq, 2),
                "<=" => (CompareOp::Lte, 2),
                ">=" => (CompareOp::Gte, 2),
                _ if c == '<' => (CompareOp::Lt, 1),
                _ if c == '>' => (CompareOp::Gt, 1),
                _ => panic!("unexpected character {:?} in {}", c, src),
            };
            out.push(Tok::Cmp(op));
            i += width;
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
enum Val {
    Num(f64),
    Bool(bool),
}

impl Val {
    fn truthy(self) -> bool {
        match self {
            Val::Bool(b) => b,
            Val::Num(n) => n != 0.0,
        }
    }
}

struct PyEval<'a> {
    toks: Vec<Tok>,
    pos: usize,
    env: &'a BTreeMap<String, f64>,
}

impl PyEval<'_> {
    fn peek_name(&self, name: &str) -> bool {
        matches!(self.toks.get(self.pos), Some(Tok::Name(n)) if n == name)
    }

    fn or_expr(&mut self) -> Val {
        let mut v = self.and_expr();
        while self.peek_name("or") {
            self.pos += 1;
            let r = self.and_expr();
            v = Val::Bool(v.truthy() || r.truthy());
        }
        v
    }

    fn and_expr(&mut self) -> Val {
        let mut v = self.not_expr();
        while self.peek_name("and") {
            self.pos += 1;
            let r = self.not_expr();
            v = Val::Bool(v.truthy() && r.truthy());
        }
        v
    }

    fn not_expr(&mut self) -> Val {
        if self.peek_name("not") {
            self.pos += 1;
            return Val::Bool(!self.not_expr().truthy());
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Val {
        let left = self.atom();
        if let Some(Tok::Cmp(op)) = self.toks.get(self.pos).cloned() {
            self.pos += 1;
            let right = self.atom();
            return match (left, right) {
                (Val::Num(l), Val::Num(r)) => Val::Bool(compare(l, op, r)),
                other => panic!("comparison of non-numbers {:?}", other),
            };
        }
        left
    }

    fn atom(&mut self) -> Val {
        let tok = self.toks.get(self.pos).cloned().expect("unexpected end");
        self.pos += 1;
        match tok {
            Tok::LParen => {
                let v = self.or_expr();
                assert_eq!(self.toks.get(self.pos), Some(&Tok::RParen));
                self.pos += 1;
                v
            }
            Tok::Num(n) => Val::Num(n),
            Tok::Name(n) if n == "True" => Val::Bool(true),
            Tok::Name(n) if n == "False" => Val::Bool(false),
            Tok::Name(n) => Val::Num(
                *self
                    .env
                    .get(&n)
                    .unwrap_or_else(|| panic!("unbound name {}", n)),
            ),
            other => panic!("unexpected token {:?}", other),
        }
    }
}

fn eval_python(src: &str, env: &BTreeMap<String, f64>) -> bool {
    let mut p = PyEval {
        toks: tokenize(src),
        pos: 0,
        env,
    };
    let v = p.or_expr();
    assert_eq!(p.pos, p.toks.len(), "trailing tokens in {}", src);
    v.truthy()
}

proptest! {
    #[test]
    fn rendered_expressions_keep_their_meaning(cond in cond_strategy(), env in bindings_strategy()) {
        let text = print(&cond);
        let expr = parse_expression(&text);
        prop_assert!(expr.is_ok(), "failed to parse: {}", text);
        if let Ok(expr) = expr {
            let python = render_expression(&expr);
            prop_assert_eq!(
                eval_python(&python, &python_env(&env)),
                eval_cond(&cond, &env),
                "{} -> {}", text, python
            );
        }
    }

    #[test]
    fn rendered_groups_keep_their_meaning(
        op in group_op_strategy(),
        members in prop::collection::vec(node_strategy(), 0..4),
        env in bindings_strategy(),
    ) {
        let group = build_group(op, &members);
        let mut unparsed = Vec::new();
        let python = render_group(&group, &mut unparsed);
        prop_assert!(unparsed.is_empty());
        let expected = eval_node(&Node::Group(op, members), &env);
        prop_assert_eq!(eval_python(&python, &python_env(&env)), expected, "{}", python);
    }
}

#[test]
fn nested_none_of_inside_any_of() {
    let members = vec![
        Node::Leaf(Cond::Cmp(0, CompareOp::Gte, 18)),
        Node::Group(
            GroupOperator::NoneOf,
            vec![
                Node::Leaf(Cond::Cmp(1, CompareOp::Gt, 5)),
                Node::Leaf(Cond::Cmp(2, CompareOp::Eq, 1)),
            ],
        ),
    ];
    let group = build_group(GroupOperator::AnyOf, &members);
    let python = render_group(&group, &mut Vec::new());
    assert_eq!(
        python,
        "(age >= 18) or (not ((income > 5) or (period_ == 1)))"
    );
    let env = [10, 3, 0, 0];
    assert!(eval_python(&python, &python_env(&env)));
    let env = [10, 9, 0, 0];
    assert!(!eval_python(&python, &python_env(&env)));
}
