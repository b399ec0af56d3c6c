//! MongoDB query documents.

use serde_json::{json, Value};

use super::{FormatOptions, GroupRef, Resolved};
use crate::transform::{coerce_numbers, to_standard_combinators};
use crate::types::{Combinator, Operator, QueryNode, QueryRef, Rule, RuleGroup, ValueSource};
use crate::validate::ValidationState;

fn default_fallback() -> Value {
    json!({"$and": [{"$expr": true}]})
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

    let combined = if children.len() == 1 {
        children.into_iter().next()?
    } else {
        match group.combinator {
            Combinator::And => json!({"$and": children}),
            Combinator::Or => json!({"$or": children}),
        }
    };
    Some(if group.not {
        json!({"$nor": [combined]})
    } else {
        combined
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
    let value = if resolved.parse_numbers {
        coerce_numbers(&rule.value)
    } else {
        rule.value.clone()
    };
    if rule.value_source() == ValueSource::Field {
        return field_comparison(rule);
    }

    let field = rule.field.as_str();
    let doc = match &rule.operator {
        Operator::Eq => json!({ field: super::json_value(&value) }),
        Operator::Neq => json!({ field: {"$ne": super::json_value(&value)} }),
        Operator::Lt => json!({ field: {"$lt": super::json_value(&value)} }),
        Operator::Gt => json!({ field: {"$gt": super::json_value(&value)} }),
        Operator::Lte => json!({ field: {"$lte": super::json_value(&value)} }),
        Operator::Gte => json!({ field: {"$gte": super::json_value(&value)} }),
        Operator::Contains => json!({ field: {"$regex": super::pattern_text(&value)?} }),
        Operator::BeginsWith => {
            json!({ field: {"$regex": format!("^{}", super::pattern_text(&value)?)} })
        }
        Operator::EndsWith => {
            json!({ field: {"$regex": format!("{}$", super::pattern_text(&value)?)} })
        }
        Operator::DoesNotContain => {
            json!({ field: {"$not": {"$regex": super::pattern_text(&value)?}} })
        }
        Operator::DoesNotBeginWith => {
            json!({ field: {"$not": {"$regex": format!("^{}", super::pattern_text(&value)?)}} })
        }
        Operator::DoesNotEndWith => {
            json!({ field: {"$not": {"$regex": format!("{}$", super::pattern_text(&value)?)}} })
        }
        Operator::Null => json!({ field: null }),
        Operator::NotNull => json!({ field: {"$ne": null} }),
        Operator::In => json!({ field: {"$in": list_json(&value, resolved)} }),
        Operator::NotIn => json!({ field: {"$nin": list_json(&value, resolved)} }),
        Operator::Between => {
            let (low, high) = bounds(&value, resolved)?;
            json!({ field: {"$gte": low, "$lte": high} })
        }
        Operator::NotBetween => {
            let (low, high) = bounds(&value, resolved)?;
            json!({ field: {"$not": {"$gte": low, "$lte": high}} })
        }
        Operator::Custom(_) => return None,
    };
    Some(doc)
}

/// Field-to-field comparison through `$expr` with `$`-prefixed paths. Only
/// the six comparison operators carry over.
fn field_comparison(rule: &Rule) -> Option<Value> {
    let op = match rule.operator {
        Operator::Eq => "$eq",
        Operator::Neq => "$ne",
        Operator::Lt => "$lt",
        Operator::Gt => "$gt",
        Operator::Lte => "$lte",
        Operator::Gte => "$gte",
        _ => return None,
    };
    let other = rule.value.as_str()?;
    Some(json!({"$expr": { op: [format!("${}", rule.field), format!("${other}")] }}))
}

fn list_json(value: &crate::types::RuleValue, resolved: &Resolved) -> Value {
    Value::Array(
        super::coerced_list(value, resolved.parse_numbers)
            .iter()
            .map(super::json_value)
            .collect(),
    )
}

fn bounds(value: &crate::types::RuleValue, resolved: &Resolved) -> Option<(Value, Value)> {
    let items = super::coerced_list(value, resolved.parse_numbers);
    if items.len() < 2 {
        return None;
    }
    Some((super::json_value(&items[0]), super::json_value(&items[1])))
}
