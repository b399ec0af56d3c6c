//! JsonLogic rule objects.

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
        json!({"!": combined})
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

    let logic = match &rule.operator {
        Operator::Eq => json!({"==": [var, operand(&value, field_sourced)?]}),
        Operator::Neq => json!({"!=": [var, operand(&value, field_sourced)?]}),
        Operator::Lt => json!({"<": [var, operand(&value, field_sourced)?]}),
        Operator::Gt => json!({">": [var, operand(&value, field_sourced)?]}),
        Operator::Lte => json!({"<=": [var, operand(&value, field_sourced)?]}),
        Operator::Gte => json!({">=": [var, operand(&value, field_sourced)?]}),
        Operator::Contains => json!({"in": [operand(&value, field_sourced)?, var]}),
        Operator::DoesNotContain => {
            json!({"!": {"in": [operand(&value, field_sourced)?, var]}})
        }
        Operator::BeginsWith => json!({"startsWith": [var, operand(&value, field_sourced)?]}),
        Operator::DoesNotBeginWith => {
            json!({"!": {"startsWith": [var, operand(&value, field_sourced)?]}})
        }
        Operator::EndsWith => json!({"endsWith": [var, operand(&value, field_sourced)?]}),
        Operator::DoesNotEndWith => {
            json!({"!": {"endsWith": [var, operand(&value, field_sourced)?]}})
        }
        Operator::Null => json!({"==": [var, null]}),
        Operator::NotNull => json!({"!=": [var, null]}),
        Operator::In => json!({"in": [var, list(&value, field_sourced, resolved)?]}),
        Operator::NotIn => json!({"!": {"in": [var, list(&value, field_sourced, resolved)?]}}),
        Operator::Between => {
            let (low, high) = bounds(&value, field_sourced, resolved)?;
            json!({"<=": [low, var, high]})
        }
        Operator::NotBetween => {
            let (low, high) = bounds(&value, field_sourced, resolved)?;
            json!({"!": {"<=": [low, var, high]}})
        }
        Operator::Custom(_) => return None,
    };
    Some(logic)
}

/// One comparison operand; field-sourced values become `var` references.
fn operand(value: &RuleValue, field_sourced: bool) -> Option<Value> {
    if field_sourced {
        Some(json!({"var": value.as_str()?}))
    } else {
        Some(super::json_value(value))
    }
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
    use crate::format::to_jsonlogic;
    use crate::types::field;
    use crate::validate::Validation;

    fn opts() -> FormatOptions {
        FormatOptions::new()
    }

    #[test]
    fn comparisons_use_var_references() {
        let query = RuleGroup::and()
            .rule(field("first_name").eq("Steve"))
            .rule(field("age").gte(26_i64));
        assert_eq!(
            to_jsonlogic(&query, &opts()),
            json!({"and": [
                {"==": [{"var": "first_name"}, "Steve"]},
                {">=": [{"var": "age"}, 26]}
            ]})
        );
    }

    #[test]
    fn contains_flips_operands() {
        let query = RuleGroup::and().rule(field("bio").contains("rust"));
        assert_eq!(
            to_jsonlogic(&query, &opts()),
            json!({"and": [{"in": ["rust", {"var": "bio"}]}]})
        );
    }

    #[test]
    fn single_child_does_not_collapse() {
        let query = RuleGroup::or().rule(field("a").eq(1_i64));
        assert_eq!(
            to_jsonlogic(&query, &opts()),
            json!({"or": [{"==": [{"var": "a"}, 1]}]})
        );
    }

    #[test]
    fn membership_and_between() {
        let query = RuleGroup::and()
            .rule(field("last_name").in_list("Vai, Vaughan"))
            .rule(field("age").between(26_i64, 37_i64));
        assert_eq!(
            to_jsonlogic(&query, &opts()),
            json!({"and": [
                {"in": [{"var": "last_name"}, ["Vai", "Vaughan"]]},
                {"<=": [26, {"var": "age"}, 37]}
            ]})
        );
    }

    #[test]
    fn negated_operators_wrap_in_not() {
        let query = RuleGroup::and()
            .rule(field("a").does_not_contain("x"))
            .rule(field("b").not_between(1_i64, 5_i64));
        assert_eq!(
            to_jsonlogic(&query, &opts()),
            json!({"and": [
                {"!": {"in": ["x", {"var": "a"}]}},
                {"!": {"<=": [1, {"var": "b"}, 5]}}
            ]})
        );
    }

    #[test]
    fn negated_group_wraps_in_not() {
        let query = RuleGroup::or()
            .rule(field("a").eq(1_i64))
            .rule(field("b").eq(2_i64))
            .negate();
        assert_eq!(
            to_jsonlogic(&query, &opts()),
            json!({"!": {"or": [
                {"==": [{"var": "a"}, 1]},
                {"==": [{"var": "b"}, 2]}
            ]}})
        );
    }

    #[test]
    fn null_tests_compare_against_null() {
        let query = RuleGroup::and()
            .rule(field("email").is_null())
            .rule(field("phone").is_not_null());
        assert_eq!(
            to_jsonlogic(&query, &opts()),
            json!({"and": [
                {"==": [{"var": "email"}, null]},
                {"!=": [{"var": "phone"}, null]}
            ]})
        );
    }

    #[test]
    fn empty_group_renders_true() {
        assert_eq!(to_jsonlogic(&RuleGroup::and(), &opts()), json!(true));
    }

    #[test]
    fn all_filtered_renders_empty_wrapper() {
        let query = RuleGroup::and().rule(field("~").eq("x"));
        assert_eq!(to_jsonlogic(&query, &opts()), json!({"and": []}));
    }

    #[test]
    fn tree_invalid_renders_fallback() {
        let query = RuleGroup::and().rule(field("a").eq(1_i64));
        let options = opts().validator(|_| Validation::Bool(false));
        assert_eq!(to_jsonlogic(&query, &options), json!(true));
    }

    #[test]
    fn field_valued_rules_use_var_on_both_sides() {
        let query = RuleGroup::and().rule(field("first_name").eq_field("last_name"));
        assert_eq!(
            to_jsonlogic(&query, &opts()),
            json!({"and": [{"==": [{"var": "first_name"}, {"var": "last_name"}]}]})
        );
    }

    #[test]
    fn parse_numbers_coerces_list_elements() {
        let query = RuleGroup::and()
            .rule(field("age").op(Operator::Between, RuleValue::from("26,37")));
        assert_eq!(
            to_jsonlogic(&query, &opts().parse_numbers(true)),
            json!({"and": [{"<=": [26, {"var": "age"}, 37]}]})
        );
    }
}
