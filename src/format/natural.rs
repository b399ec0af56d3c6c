//! Natural-language rendering, for showing a query to end users.

use super::{FormatOptions, GroupRef, Node, Resolved};
use crate::transform::coerce_numbers;
use crate::types::{Combinator, Operator, Rule, RuleValue, ValueSource};
use crate::validate::ValidationState;

const FALLBACK: &str = "1 is 1";

pub(crate) fn render(query: GroupRef<'_>, options: &FormatOptions) -> String {
    let resolved = options.resolve();
    let state = ValidationState::compute(options.validator.as_ref(), query.as_query_ref());
    if state.tree_invalid() {
        return resolved.fallback_or(FALLBACK);
    }
    render_group(query, true, true, &state, options, &resolved)
}

fn render_group(
    group: GroupRef<'_>,
    outermost: bool,
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
                Combinator::And => ", and ",
                Combinator::Or => ", or ",
            });
            joined.push_str(&fragment);
        }
    }

    if group.not() {
        format!("({joined}) is not true")
    } else if outermost {
        joined
    } else {
        format!("({joined}) is true")
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
        Node::Group(group) => {
            render_group(group, false, outermost_or_lonely, state, options, resolved)
        }
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
    rule_text(rule, &value, field_sourced, options, resolved).unwrap_or_default()
}

fn rule_text(
    rule: &Rule,
    value: &RuleValue,
    field_sourced: bool,
    options: &FormatOptions,
    resolved: &Resolved,
) -> Option<String> {
    let subject = label(&rule.field, options);
    let wording = match &rule.operator {
        Operator::Eq => "is",
        Operator::Neq => "is not",
        Operator::Lt => "is less than",
        Operator::Gt => "is greater than",
        Operator::Lte => "is less than or equal to",
        Operator::Gte => "is greater than or equal to",
        Operator::Contains => "contains",
        Operator::DoesNotContain => "does not contain",
        Operator::BeginsWith => "starts with",
        Operator::DoesNotBeginWith => "does not start with",
        Operator::EndsWith => "ends with",
        Operator::DoesNotEndWith => "does not end with",
        Operator::Null => return Some(format!("{subject} is null")),
        Operator::NotNull => return Some(format!("{subject} is not null")),
        Operator::In => "is one of the values",
        Operator::NotIn => "is not one of the values",
        Operator::Between => "is between",
        Operator::NotBetween => "is not between",
        Operator::Custom(_) => return None,
    };

    let value_part = match &rule.operator {
        Operator::In | Operator::NotIn => {
            let items = super::coerced_list(value, resolved.parse_numbers);
            if items.is_empty() {
                return None;
            }
            let rendered: Vec<String> = items
                .iter()
                .map(|item| operand(item, field_sourced, options))
                .collect::<Option<_>>()?;
            rendered.join(", ")
        }
        Operator::Between | Operator::NotBetween => {
            let items = super::coerced_list(value, resolved.parse_numbers);
            if items.len() < 2 {
                return None;
            }
            format!(
                "{} and {}",
                operand(&items[0], field_sourced, options)?,
                operand(&items[1], field_sourced, options)?
            )
        }
        _ => operand(value, field_sourced, options)?,
    };
    Some(format!("{subject} {wording} {value_part}"))
}

/// Display label for a field, from the registry when one is supplied.
fn label<'a>(name: &'a str, options: &'a FormatOptions) -> &'a str {
    options
        .fields
        .as_ref()
        .and_then(|fields| fields.get(name))
        .map_or(name, |field| field.label_or_name())
}

/// Field-sourced values read as the other field's label; literals get
/// prose-style quoting.
fn operand(
    value: &RuleValue,
    field_sourced: bool,
    options: &FormatOptions,
) -> Option<String> {
    if field_sourced {
        return value.as_str().map(|name| label(name, options).to_owned());
    }
    Some(match value {
        RuleValue::Null => "null".to_owned(),
        RuleValue::Bool(b) => b.to_string(),
        RuleValue::Int(i) => i.to_string(),
        RuleValue::Float(f) => f.to_string(),
        RuleValue::String(s) => {
            let escaped: String = s
                .chars()
                .flat_map(|c| if c == '\'' { vec![c, c] } else { vec![c] })
                .collect();
            format!("'{escaped}'")
        }
        RuleValue::List(items) => {
            let rendered: Vec<String> = items
                .iter()
                .filter_map(|item| operand(item, false, options))
                .collect();
            rendered.join(", ")
        }
    })
}
