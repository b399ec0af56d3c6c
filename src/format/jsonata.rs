//! JSONata filter expressions.

use super::{FormatOptions, GroupRef, Node, Resolved};
use crate::transform::coerce_numbers;
use crate::types::{Combinator, Operator, Rule, RuleValue, ValueSource};
use crate::validate::ValidationState;

const FALLBACK: &str = "(1 = 1)";

pub(crate) fn render(query: GroupRef<'_>, options: &FormatOptions) -> String {
    let resolved = options.resolve();
    let state = ValidationState::compute(options.validator.as_ref(), query.as_query_ref());
    if state.tree_invalid() {
        return resolved.fallback_or(FALLBACK);
    }
    render_group(query, true, &state, options, &resolved)
}

fn render_group(
    group: GroupRef<'_>,
    outermost_or_lonely: bool,
    state: &ValidationState,
    options: &FormatOptions,
    resolved: &Resolved,
) -> String {
    let fallback = resolved.fallback_or(FALLBACK);
    let children = match group.children() {
        Some(children) if state.id_is_valid(group.id()) => children,
        _ => {
            return if outermost_or_lonely {
                fallback
            } else {
                String::new()
            }
        }
    };
    if group.is_empty() {
        return fallback;
    }

    let lonely = group.raw_len() == 1;
    let (first, rest) = children;
    let mut joined = String::new();
    if let Some(node) = first {
        joined = render_node(node, lonely, state, options, resolved);
    }
    for (combinator, node) in rest {
        let fragment = render_node(node, lonely, state, options, resolved);
        if fragment.is_empty() {
            continue;
        }
        if joined.is_empty() {
            joined = fragment;
        } else {
            joined.push_str(match combinator {
                Combinator::And => " and ",
                Combinator::Or => " or ",
            });
            joined.push_str(&fragment);
        }
    }

    if group.not() {
        format!("$not({joined})")
    } else {
        format!("({joined})")
    }
}

fn render_node(
    node: Node<'_>,
    outermost_or_lonely: bool,
    state: &ValidationState,
    options: &FormatOptions,
    resolved: &Resolved,
) -> String {
    match node {
        Node::Group(group) => render_group(group, outermost_or_lonely, state, options, resolved),
        Node::Rule(rule) => render_rule(rule, state, options, resolved),
    }
}

fn render_rule(
    rule: &Rule,
    state: &ValidationState,
    options: &FormatOptions,
    resolved: &Resolved,
) -> String {
    if resolved.is_placeholder(rule) {
        return String::new();
    }
    if !state.rule_is_valid(rule, options.fields.as_ref()) {
        return String::new();
    }
    let value = if resolved.parse_numbers {
        coerce_numbers(&rule.value)
    } else {
        rule.value.clone()
    };
    let field_sourced = rule.value_source() == ValueSource::Field;
    rule_text(rule, &value, field_sourced, resolved).unwrap_or_default()
}

fn rule_text(
    rule: &Rule,
    value: &RuleValue,
    field_sourced: bool,
    resolved: &Resolved,
) -> Option<String> {
    let field = rule.field.as_str();
    Some(match &rule.operator {
        Operator::Eq => format!("{field} = {}", operand(value, field_sourced)?),
        Operator::Neq => format!("{field} != {}", operand(value, field_sourced)?),
        Operator::Lt => format!("{field} < {}", operand(value, field_sourced)?),
        Operator::Gt => format!("{field} > {}", operand(value, field_sourced)?),
        Operator::Lte => format!("{field} <= {}", operand(value, field_sourced)?),
        Operator::Gte => format!("{field} >= {}", operand(value, field_sourced)?),
        Operator::Contains => {
            format!("$contains({field}, {})", operand(value, field_sourced)?)
        }
        Operator::DoesNotContain => {
            format!("$not($contains({field}, {}))", operand(value, field_sourced)?)
        }
        Operator::BeginsWith => {
            let op = operand(value, field_sourced)?;
            format!("$substring({field}, 0, $length({op})) = {op}")
        }
        Operator::DoesNotBeginWith => {
            let op = operand(value, field_sourced)?;
            format!("$not($substring({field}, 0, $length({op})) = {op})")
        }
        Operator::EndsWith => {
            let op = operand(value, field_sourced)?;
            format!("$substring({field}, -$length({op})) = {op}")
        }
        Operator::DoesNotEndWith => {
            let op = operand(value, field_sourced)?;
            format!("$not($substring({field}, -$length({op})) = {op})")
        }
        Operator::Null => format!("{field} = null"),
        Operator::NotNull => format!("{field} != null"),
        Operator::In => format!("{field} in {}", list(value, field_sourced, resolved)?),
        Operator::NotIn => {
            format!("$not({field} in {})", list(value, field_sourced, resolved)?)
        }
        Operator::Between => {
            let (low, high) = bounds(value, field_sourced, resolved)?;
            format!("({field} >= {low} and {field} <= {high})")
        }
        Operator::NotBetween => {
            let (low, high) = bounds(value, field_sourced, resolved)?;
            format!("$not({field} >= {low} and {field} <= {high})")
        }
        Operator::Custom(_) => return None,
    })
}

fn operand(value: &RuleValue, field_sourced: bool) -> Option<String> {
    if field_sourced {
        value.as_str().map(str::to_owned)
    } else {
        Some(literal(value))
    }
}

fn list(value: &RuleValue, field_sourced: bool, resolved: &Resolved) -> Option<String> {
    let items = super::coerced_list(value, resolved.parse_numbers);
    let rendered: Vec<String> = items
        .iter()
        .map(|item| operand(item, field_sourced))
        .collect::<Option<_>>()?;
    Some(format!("[{}]", rendered.join(", ")))
}

fn bounds(
    value: &RuleValue,
    field_sourced: bool,
    resolved: &Resolved,
) -> Option<(String, String)> {
    let items = super::coerced_list(value, resolved.parse_numbers);
    if items.len() < 2 {
        return None;
    }
    Some((
        operand(&items[0], field_sourced)?,
        operand(&items[1], field_sourced)?,
    ))
}

fn literal(value: &RuleValue) -> String {
    match value {
        RuleValue::Null => "null".to_owned(),
        RuleValue::Bool(b) => b.to_string(),
        RuleValue::Int(i) => i.to_string(),
        RuleValue::Float(f) => f.to_string(),
        RuleValue::String(s) => quote(s),
        RuleValue::List(items) => {
            let rendered: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", rendered.join(", "))
        }
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
