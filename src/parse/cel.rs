//! CEL import. Match modes arrive as method calls (`f.contains(x)`),
//! membership as `in`, and negation as a prefix `!` that the builder absorbs
//! into operators where one exists.
//!
//! Precedence is `|| < && < ! < primary`.

use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated};
use winnow::error::ModalResult;
use winnow::prelude::*;

use crate::types::{
    field, Combinator, Operator, QueryNode, RuleGroup, RuleValue, ValueSource,
};

use super::common::{double_quoted, ident, number, word, ws};
use super::{
    into_group, keep_rule, negate_node, pack_list, reverse_comparison, ParseOptions,
};

pub(crate) fn parse(input: &str, options: &ParseOptions) -> RuleGroup {
    let mut stream = input;
    let Ok(ast) = expression(&mut stream) else {
        return RuleGroup::default();
    };
    if !stream.trim().is_empty() {
        return RuleGroup::default();
    }
    into_group(node(&ast, options))
}

// -- AST --------------------------------------------------------------------

#[derive(Clone, Debug)]
enum CelExpr {
    Or(Box<CelExpr>, Box<CelExpr>),
    And(Box<CelExpr>, Box<CelExpr>),
    Not(Box<CelExpr>),
    Paren(Box<CelExpr>),
    Predicate(Predicate),
}

#[derive(Clone, Debug)]
enum CelOperand {
    Value(RuleValue),
    Ident(String),
    List(Vec<CelOperand>),
}

#[derive(Clone, Debug)]
enum Predicate {
    Compare(CelOperand, Operator, CelOperand),
    Method {
        target: String,
        operator: Operator,
        arg: CelOperand,
    },
    In {
        needle: CelOperand,
        haystack: CelOperand,
    },
}

// -- Grammar ----------------------------------------------------------------

fn literal(input: &mut &str) -> ModalResult<RuleValue> {
    alt((
        double_quoted.map(RuleValue::String),
        word("true").value(RuleValue::Bool(true)),
        word("false").value(RuleValue::Bool(false)),
        word("null").value(RuleValue::Null),
        number,
    ))
    .parse_next(input)
}

fn element(input: &mut &str) -> ModalResult<CelOperand> {
    ws.parse_next(input)?;
    alt((
        literal.map(CelOperand::Value),
        ident.map(|name: &str| CelOperand::Ident(name.to_owned())),
    ))
    .parse_next(input)
}

fn list_literal(input: &mut &str) -> ModalResult<CelOperand> {
    '['.parse_next(input)?;
    let items: Vec<CelOperand> = separated(0.., element, (ws, ',')).parse_next(input)?;
    (ws, ']').parse_next(input)?;
    Ok(CelOperand::List(items))
}

fn operand(input: &mut &str) -> ModalResult<CelOperand> {
    ws.parse_next(input)?;
    alt((
        list_literal,
        literal.map(CelOperand::Value),
        ident.map(|name: &str| CelOperand::Ident(name.to_owned())),
    ))
    .parse_next(input)
}

fn compare_op(input: &mut &str) -> ModalResult<Operator> {
    ws.parse_next(input)?;
    alt((
        "==".value(Operator::Eq),
        "!=".value(Operator::Neq),
        "<=".value(Operator::Lte),
        ">=".value(Operator::Gte),
        '<'.value(Operator::Lt),
        '>'.value(Operator::Gt),
    ))
    .parse_next(input)
}

/// A dotted path whose last segment is a recognized match method.
fn method_split(path: &str) -> Option<(&str, Operator)> {
    let table = [
        (".contains", Operator::Contains),
        (".startsWith", Operator::BeginsWith),
        (".endsWith", Operator::EndsWith),
    ];
    for (suffix, operator) in table {
        if let Some(target) = path.strip_suffix(suffix) {
            if !target.is_empty() {
                return Some((target, operator));
            }
        }
    }
    None
}

fn method_call(input: &mut &str) -> ModalResult<CelExpr> {
    ws.parse_next(input)?;
    let (target, operator) = ident.verify_map(method_split).parse_next(input)?;
    (ws, '(').parse_next(input)?;
    let arg = operand(input)?;
    (ws, ')').parse_next(input)?;
    Ok(CelExpr::Predicate(Predicate::Method {
        target: target.to_owned(),
        operator,
        arg,
    }))
}

fn comparison(input: &mut &str) -> ModalResult<CelExpr> {
    let left = operand(input)?;
    let operator = compare_op(input)?;
    let right = operand(input)?;
    Ok(CelExpr::Predicate(Predicate::Compare(left, operator, right)))
}

fn membership(input: &mut &str) -> ModalResult<CelExpr> {
    let needle = operand(input)?;
    (ws, word("in")).parse_next(input)?;
    let haystack = operand(input)?;
    Ok(CelExpr::Predicate(Predicate::In { needle, haystack }))
}

fn predicate(input: &mut &str) -> ModalResult<CelExpr> {
    alt((method_call, comparison, membership)).parse_next(input)
}

fn primary(input: &mut &str) -> ModalResult<CelExpr> {
    ws.parse_next(input)?;
    alt((
        delimited('(', expression, (ws, ')')).map(|inner| CelExpr::Paren(Box::new(inner))),
        predicate,
    ))
    .parse_next(input)
}

fn unary(input: &mut &str) -> ModalResult<CelExpr> {
    ws.parse_next(input)?;
    if opt('!').parse_next(input)?.is_some() {
        let inner = unary(input)?;
        Ok(CelExpr::Not(Box::new(inner)))
    } else {
        primary(input)
    }
}

fn and_expr(input: &mut &str) -> ModalResult<CelExpr> {
    let first = unary(input)?;
    let rest: Vec<CelExpr> = repeat(0.., preceded((ws, "&&"), unary)).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| CelExpr::And(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut &str) -> ModalResult<CelExpr> {
    let first = and_expr(input)?;
    let rest: Vec<CelExpr> = repeat(0.., preceded((ws, "||"), and_expr)).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| CelExpr::Or(Box::new(acc), Box::new(r))))
}

fn expression(input: &mut &str) -> ModalResult<CelExpr> {
    ws.parse_next(input)?;
    or_expr(input)
}

// -- Builder ----------------------------------------------------------------

fn node(expr: &CelExpr, options: &ParseOptions) -> Option<QueryNode> {
    match expr {
        CelExpr::Or(..) => chain(expr, Combinator::Or, options),
        CelExpr::And(..) => chain(expr, Combinator::And, options),
        CelExpr::Not(inner) => node(inner, options).map(negate_node),
        CelExpr::Paren(inner) => node(inner, options),
        CelExpr::Predicate(predicate) => predicate_node(predicate, options),
    }
}

/// Flatten a same-combinator run into one group; parenthesized subtrees
/// keep their own level.
fn chain(expr: &CelExpr, combinator: Combinator, options: &ParseOptions) -> Option<QueryNode> {
    let mut rules = Vec::new();
    collect(expr, combinator, options, &mut rules);
    match rules.len() {
        0 => None,
        1 => rules.pop(),
        _ => Some(QueryNode::Group(RuleGroup {
            id: None,
            combinator,
            not: false,
            rules,
        })),
    }
}

fn collect(expr: &CelExpr, combinator: Combinator, options: &ParseOptions, out: &mut Vec<QueryNode>) {
    match (expr, combinator) {
        (CelExpr::And(left, right), Combinator::And)
        | (CelExpr::Or(left, right), Combinator::Or) => {
            collect(left, combinator, options, out);
            collect(right, combinator, options, out);
        }
        _ => out.extend(node(expr, options)),
    }
}

fn predicate_node(predicate: &Predicate, options: &ParseOptions) -> Option<QueryNode> {
    match predicate {
        Predicate::Compare(left, operator, right) => {
            compare_node(left, operator.clone(), right, options)
        }
        Predicate::Method {
            target,
            operator,
            arg,
        } => method_node(target, operator.clone(), arg, options),
        Predicate::In { needle, haystack } => in_node(needle, haystack, options),
    }
}

fn compare_node(
    left: &CelOperand,
    operator: Operator,
    right: &CelOperand,
    options: &ParseOptions,
) -> Option<QueryNode> {
    match (left, right) {
        (CelOperand::Ident(name), CelOperand::Ident(other)) => {
            keep_rule(field(name).op_field(operator, other), options)
        }
        (CelOperand::Ident(name), CelOperand::Value(value)) => {
            literal_rule(name, operator, value.clone(), options)
        }
        (CelOperand::Value(value), CelOperand::Ident(name)) => {
            literal_rule(name, reverse_comparison(operator), value.clone(), options)
        }
        _ => None,
    }
}

/// `f == null` and `f != null` read as the dedicated null-test operators.
fn literal_rule(
    name: &str,
    operator: Operator,
    value: RuleValue,
    options: &ParseOptions,
) -> Option<QueryNode> {
    if value.is_null() {
        return match operator {
            Operator::Eq => keep_rule(field(name).is_null(), options),
            Operator::Neq => keep_rule(field(name).is_not_null(), options),
            other => keep_rule(field(name).op(other, RuleValue::Null), options),
        };
    }
    keep_rule(field(name).op(operator, value), options)
}

fn method_node(
    target: &str,
    operator: Operator,
    arg: &CelOperand,
    options: &ParseOptions,
) -> Option<QueryNode> {
    match arg {
        CelOperand::Value(value) => keep_rule(field(target).op(operator, value.clone()), options),
        CelOperand::Ident(other) => keep_rule(field(target).op_field(operator, other), options),
        CelOperand::List(_) => None,
    }
}

/// `f in [..]` is membership; a string or field needle against a field
/// haystack is a substring test.
fn in_node(
    needle: &CelOperand,
    haystack: &CelOperand,
    options: &ParseOptions,
) -> Option<QueryNode> {
    match (needle, haystack) {
        (CelOperand::Ident(name), CelOperand::List(items)) => list_rule(name, items, options),
        (CelOperand::Value(RuleValue::String(text)), CelOperand::Ident(name)) => {
            keep_rule(field(name).contains(text.clone()), options)
        }
        (CelOperand::Ident(other), CelOperand::Ident(name)) => {
            keep_rule(field(name).contains_field(other), options)
        }
        _ => None,
    }
}

fn list_rule(name: &str, items: &[CelOperand], options: &ParseOptions) -> Option<QueryNode> {
    let values: Option<Vec<RuleValue>> = items
        .iter()
        .map(|item| match item {
            CelOperand::Value(value) => Some(value.clone()),
            _ => None,
        })
        .collect();
    if let Some(values) = values {
        let value = pack_list(values, ", ", options);
        return keep_rule(field(name).in_list(value), options);
    }
    // all field references: a field-sourced membership test
    let names: Option<Vec<&str>> = items
        .iter()
        .map(|item| match item {
            CelOperand::Ident(other) => Some(other.as_str()),
            _ => None,
        })
        .collect();
    let items = names?
        .iter()
        .map(|other| RuleValue::from(*other))
        .collect();
    let value = pack_list(items, ", ", options);
    keep_rule(
        field(name)
            .op(Operator::In, value)
            .with_value_source(ValueSource::Field),
        options,
    )
}
