//! Elasticsearch `bool` query bodies.

use serde_json::{json, Value};

use super::{FormatOptions, GroupRef, Resolved};
use crate::transform::{coerce_numbers, to_standard_combinators};
use crate::types::{Combinator, Operator, QueryNode, QueryRef, Rule, RuleGroup, RuleValue, ValueSource};
use crate::validate::ValidationState;

fn default_fallback() -> Value {
    json!({"match_all": {}})
}

pub(crate) fn render(query: GroupRef<'_>, options: &FormatOptions) -> Value {
    let resolved = options.resolve();
    let fallback = resolved.fallback_object(default_fallback());
    let normalized;
    let group = match query {
        GroupRef::Standard(group) => group,
        GroupRef::Ic(ic) => match to_standard_combinators(ic) {
            Ok(converted) => {
                normalized = converted;
                &normalized
            }
            Err(_) => return fallback,
        },
    };
    let state = ValidationState::compute(options.validator.as_ref(), QueryRef::Standard(group));
    if state.tree_invalid() {
        return fallback;
    }
    match render_group(group, true, &state, options, &resolved, &fallback) {
        Some(value) => value,
        None => fallback,
    }
}

fn render_group(
    group: &RuleGroup,
    outermost_or_lonely: bool,
    state: &ValidationState,
    options: &FormatOptions,
    resolved: &Resolved,
    fallback: &Value,
) -> Option<Value> {
    if !state.id_is_valid(group.id.as_deref()) {
        return outermost_or_lonely.then(|| fallback.clone());
    }
    if group.rules.is_empty() {
        return Some(fallback.clone());
    }
    let lonely = group.rules.len() == 1;
    let children: Vec<Value> = group
        .rules
        .iter()
        .filter_map(|node| match node {
            QueryNode::Rule(rule) => render_rule(rule, state, options, resolved),
            QueryNode::Group(inner) => {
                render_group(inner, lonely, state, options, resolved, fallback)
            }
        })
        .collect();

    // Negation of an `or` group nests the `should` under `must_not`; an
    // `and` group puts its children under `must_not` directly.
    Some(match (group.not, group.combinator) {
        (false, Combinator::And) => json!({"bool": {"must": children}}),
        (false, Combinator::Or) => json!({"bool": {"should": children}}),
        (true, Combinator::And) => json!({"bool": {"must_not": children}}),
        (true, Combinator::Or) => {
            json!({"bool": {"must_not": {"bool": {"should": children}}}})
        }
    })
}

fn render_rule(
    rule: &Rule,
    state: &ValidationState,
    options: &FormatOptions,
    resolved: &Resolved,
) -> Option<Value> {
    if resolved.is_placeholder(rule) {
        return None;
    }
    if !state.rule_is_valid(rule, options.fields.as_ref()) {
        return None;
    }
    if rule.value_source() == ValueSource::Field {
        return None;
    }
    let value = if resolved.parse_numbers {
        coerce_numbers(&rule.value)
    } else {
        rule.value.clone()
    };

    let field = rule.field.as_str();
    let clause = match &rule.operator {
        Operator::Eq => json!({"term": { field: super::json_value(&value) }}),
        Operator::Neq => {
            json!({"bool": {"must_not": {"term": { field: super::json_value(&value) }}}})
        }
        Operator::Lt => json!({"range": { field: {"lt": super::json_value(&value)} }}),
        Operator::Gt => json!({"range": { field: {"gt": super::json_value(&value)} }}),
        Operator::Lte => json!({"range": { field: {"lte": super::json_value(&value)} }}),
        Operator::Gte => json!({"range": { field: {"gte": super::json_value(&value)} }}),
        Operator::Contains => {
            json!({"regexp": { field: {"value": regexp(&value, true, true)?} }})
        }
        Operator::BeginsWith => {
            json!({"regexp": { field: {"value": regexp(&value, false, true)?} }})
        }
        Operator::EndsWith => {
            json!({"regexp": { field: {"value": regexp(&value, true, false)?} }})
        }
        Operator::DoesNotContain => {
            json!({"bool": {"must_not": {"regexp": { field: {"value": regexp(&value, true, true)?} }}}})
        }
        Operator::DoesNotBeginWith => {
            json!({"bool": {"must_not": {"regexp": { field: {"value": regexp(&value, false, true)?} }}}})
        }
        Operator::DoesNotEndWith => {
            json!({"bool": {"must_not": {"regexp": { field: {"value": regexp(&value, true, false)?} }}}})
        }
        Operator::Null => json!({"bool": {"must_not": {"exists": {"field": field}}}}),
        Operator::NotNull => json!({"exists": {"field": field}}),
        Operator::In => json!({"terms": { field: list_json(&value, resolved) }}),
        Operator::NotIn => {
            json!({"bool": {"must_not": {"terms": { field: list_json(&value, resolved) }}}})
        }
        Operator::Between => {
            let (low, high) = bounds(&value, resolved)?;
            json!({"range": { field: {"gte": low, "lte": high} }})
        }
        Operator::NotBetween => {
            let (low, high) = bounds(&value, resolved)?;
            json!({"bool": {"must_not": {"range": { field: {"gte": low, "lte": high} }}}})
        }
        Operator::Custom(_) => return None,
    };
    Some(clause)
}

/// ES regexp patterns match the whole term, so partial matches anchor with
/// `.*` on the open sides.
fn regexp(value: &RuleValue, leading: bool, trailing: bool) -> Option<String> {
    let text = super::pattern_text(value)?;
    Some(format!(
        "{}{text}{}",
        if leading { ".*" } else { "" },
        if trailing { ".*" } else { "" }
    ))
}

fn list_json(value: &RuleValue, resolved: &Resolved) -> Value {
    Value::Array(
        super::coerced_list(value, resolved.parse_numbers)
            .iter()
            .map(super::json_value)
            .collect(),
    )
}

fn bounds(value: &RuleValue, resolved: &Resolved) -> Option<(Value, Value)> {
    let items = super::coerced_list(value, resolved.parse_numbers);
    if items.len() < 2 {
        return None;
    }
    Some((super::json_value(&items[0]), super::json_value(&items[1])))
}
