//! PostgREST-style filter objects: JsonLogic-shaped trees carrying PostgREST
//! operator keywords and `*` wildcards.

use serde_json::{json, Value};

use super::{FormatOptions, GroupRef, Resolved};
use crate::transform::{coerce_numbers, to_standard_combinators};
use crate::types::{Combinator, Operator, QueryNode, QueryRef, Rule, RuleGroup, RuleValue, ValueSource};
use crate::validate::ValidationState;

pub(crate) fn render(query: GroupRef<'_>, options: &FormatOptions) -> Value {
    let resolved = options.resolve();
    let fallback = resolved.fallback_object(Value::Bool(true));
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

    let combined = match group.combinator {
        Combinator::And => json!({"and": children}),
        Combinator::Or => json!({"or": children}),
    };
    Some(if group.not {
        json!({"not": combined})
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
    let field_sourced = rule.value_source() == ValueSource::Field;
    let var = json!({"var": rule.field});

    let filter = match &rule.operator {
        Operator::Eq => json!({"eq": [var, operand(&value, field_sourced)?]}),
        Operator::Neq => json!({"neq": [var, operand(&value, field_sourced)?]}),
        Operator::Lt => json!({"lt": [var, operand(&value, field_sourced)?]}),
        Operator::Gt => json!({"gt": [var, operand(&value, field_sourced)?]}),
        Operator::Lte => json!({"lte": [var, operand(&value, field_sourced)?]}),
        Operator::Gte => json!({"gte": [var, operand(&value, field_sourced)?]}),
        Operator::Contains => json!({"like": [var, pattern(&value, field_sourced, true, true)?]}),
        Operator::BeginsWith => {
            json!({"like": [var, pattern(&value, field_sourced, false, true)?]})
        }
        Operator::EndsWith => json!({"like": [var, pattern(&value, field_sourced, true, false)?]}),
        Operator::DoesNotContain => {
            json!({"not": {"like": [var, pattern(&value, field_sourced, true, true)?]}})
        }
        Operator::DoesNotBeginWith => {
            json!({"not": {"like": [var, pattern(&value, field_sourced, false, true)?]}})
        }
        Operator::DoesNotEndWith => {
            json!({"not": {"like": [var, pattern(&value, field_sourced, true, false)?]}})
        }
        Operator::Null => json!({"is": [var, null]}),
        Operator::NotNull => json!({"not": {"is": [var, null]}}),
        Operator::In => json!({"in": [var, list(&value, field_sourced, resolved)?]}),
        Operator::NotIn => json!({"not": {"in": [var, list(&value, field_sourced, resolved)?]}}),
        Operator::Between => {
            let (low, high) = bounds(&value, field_sourced, resolved)?;
            json!({"lte": [low, var, high]})
        }
        Operator::NotBetween => {
            let (low, high) = bounds(&value, field_sourced, resolved)?;
            json!({"not": {"lte": [low, var, high]}})
        }
        Operator::Custom(_) => return None,
    };
    Some(filter)
}

fn operand(value: &RuleValue, field_sourced: bool) -> Option<Value> {
    if field_sourced {
        Some(json!({"var": value.as_str()?}))
    } else {
        Some(super::json_value(value))
    }
}

/// `*`-wildcard pattern. Field-sourced wildcards have no PostgREST form and
/// drop the rule.
fn pattern(
    value: &RuleValue,
    field_sourced: bool,
    leading: bool,
    trailing: bool,
) -> Option<Value> {
    if field_sourced {
        return None;
    }
    let text = super::pattern_text(value)?;
    Some(Value::String(format!(
        "{}{text}{}",
        if leading { "*" } else { "" },
        if trailing { "*" } else { "" }
    )))
}

fn list(value: &RuleValue, field_sourced: bool, resolved: &Resolved) -> Option<Value> {
    let items = super::coerced_list(value, resolved.parse_numbers);
    let rendered: Option<Vec<Value>> = items
        .iter()
        .map(|item| operand(item, field_sourced))
        .collect();
    rendered.map(Value::Array)
}

fn bounds(
    value: &RuleValue,
    field_sourced: bool,
    resolved: &Resolved,
) -> Option<(Value, Value)> {
    let items = super::coerced_list(value, resolved.parse_numbers);
    if items.len() < 2 {
        return None;
    }
    Some((
        operand(&items[0], field_sourced)?,
        operand(&items[1], field_sourced)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::to_postgrest;
    use crate::types::field;

    fn opts() -> FormatOptions {
        FormatOptions::new()
    }

    #[test]
    fn keyword_comparisons() {
        let query = RuleGroup::and()
            .rule(field("first_name").eq("Steve"))
            .rule(field("age").gte(26_i64));
        assert_eq!(
            to_postgrest(&query, &opts()),
            json!({"and": [
                {"eq": [{"var": "first_name"}, "Steve"]},
                {"gte": [{"var": "age"}, 26]}
            ]})
        );
    }

    #[test]
    fn wildcards_use_stars() {
        let query = RuleGroup::and()
            .rule(field("a").contains("x"))
            .rule(field("b").begins_with("y"))
            .rule(field("c").ends_with("z"));
        assert_eq!(
            to_postgrest(&query, &opts()),
            json!({"and": [
                {"like": [{"var": "a"}, "*x*"]},
                {"like": [{"var": "b"}, "y*"]},
                {"like": [{"var": "c"}, "*z"]}
            ]})
        );
    }

    #[test]
    fn negations_wrap_in_not() {
        let query = RuleGroup::and()
            .rule(field("a").does_not_contain("x"))
            .rule(field("b").is_not_null())
            .rule(field("c").not_in_list(vec!["p", "q"]));
        assert_eq!(
            to_postgrest(&query, &opts()),
            json!({"and": [
                {"not": {"like": [{"var": "a"}, "*x*"]}},
                {"not": {"is": [{"var": "b"}, null]}},
                {"not": {"in": [{"var": "c"}, ["p", "q"]]}}
            ]})
        );
    }

    #[test]
    fn between_chains_lte() {
        let query = RuleGroup::and().rule(field("age").between(26_i64, 37_i64));
        assert_eq!(
            to_postgrest(&query, &opts()),
            json!({"and": [{"lte": [26, {"var": "age"}, 37]}]})
        );
    }

    #[test]
    fn negated_group_wraps_in_not() {
        let query = RuleGroup::or()
            .rule(field("a").eq(1_i64))
            .rule(field("b").eq(2_i64))
            .negate();
        assert_eq!(
            to_postgrest(&query, &opts()),
            json!({"not": {"or": [
                {"eq": [{"var": "a"}, 1]},
                {"eq": [{"var": "b"}, 2]}
            ]}})
        );
    }

    #[test]
    fn empty_group_renders_true() {
        assert_eq!(to_postgrest(&RuleGroup::and(), &opts()), json!(true));
    }

    #[test]
    fn field_valued_like_drops() {
        let query = RuleGroup::and()
            .rule(field("bio").contains_field("nickname"))
            .rule(field("a").eq(1_i64));
        assert_eq!(
            to_postgrest(&query, &opts()),
            json!({"and": [{"eq": [{"var": "a"}, 1]}]})
        );
    }

    #[test]
    fn field_valued_comparison_keeps_var() {
        let query = RuleGroup::and().rule(field("first_name").neq_field("last_name"));
        assert_eq!(
            to_postgrest(&query, &opts()),
            json!({"and": [{"neq": [{"var": "first_name"}, {"var": "last_name"}]}]})
        );
    }
}
