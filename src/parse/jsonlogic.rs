//! JsonLogic import. Nodes are single-key objects; `{"var": f}` marks a
//! field reference, `in` doubles as membership and substring test, and
//! ternary range shapes collapse to `between` when inclusive.

use serde_json::Value;

use crate::types::{field, Combinator, Operator, QueryNode, Rule, RuleGroup, RuleValue};

use super::{
    into_group, json_list, json_scalar, keep_rule, negate_node, pack_list, reverse_comparison,
    var_name, ObjectParseOptions,
};

pub(crate) fn parse_value(value: &Value, options: &ObjectParseOptions) -> RuleGroup {
    into_group(node(value, options))
}

fn node(value: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    let Value::Object(map) = value else {
        return None;
    };
    if map.len() != 1 {
        return None;
    }
    let (key, operand) = map.iter().next()?;
    match key.as_str() {
        "and" => group(operand, Combinator::And, options),
        "or" => group(operand, Combinator::Or, options),
        "!" => node(unwrap_single(operand), options).map(negate_node),
        // double negation casts to boolean, a structural no-op here
        "!!" => node(unwrap_single(operand), options),
        "==" => comparison(Operator::Eq, operand, options),
        "!=" => comparison(Operator::Neq, operand, options),
        "<" => ranged(Operator::Lt, operand, options),
        "<=" => ranged(Operator::Lte, operand, options),
        ">" => ranged(Operator::Gt, operand, options),
        ">=" => ranged(Operator::Gte, operand, options),
        "in" => membership(operand, options),
        "startsWith" => edge(Operator::BeginsWith, operand, options),
        "endsWith" => edge(Operator::EndsWith, operand, options),
        _ => {
            let parser = options.custom_ops.get(key)?;
            parser(key, operand)
        }
    }
}

/// JsonLogic wraps unary operands in one-element arrays interchangeably.
fn unwrap_single(operand: &Value) -> &Value {
    match operand {
        Value::Array(items) if items.len() == 1 => &items[0],
        other => other,
    }
}

/// Group structure is preserved exactly, including one-child groups.
fn group(operand: &Value, combinator: Combinator, options: &ObjectParseOptions) -> Option<QueryNode> {
    let Value::Array(items) = operand else {
        return None;
    };
    let rules: Vec<QueryNode> = items.iter().filter_map(|item| node(item, options)).collect();
    if rules.is_empty() {
        return None;
    }
    Some(QueryNode::Group(RuleGroup {
        id: None,
        combinator,
        not: false,
        rules,
    }))
}

fn comparison(operator: Operator, operand: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    let Value::Array(args) = operand else {
        return None;
    };
    let [left, right] = args.as_slice() else {
        return None;
    };
    binary(operator, left, right, options)
}

fn ranged(operator: Operator, operand: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    let Value::Array(args) = operand else {
        return None;
    };
    match args.as_slice() {
        [left, right] => binary(operator, left, right, options),
        [low, middle, high] => ternary(operator, low, middle, high, options),
        _ => None,
    }
}

fn binary(
    operator: Operator,
    left: &Value,
    right: &Value,
    options: &ObjectParseOptions,
) -> Option<QueryNode> {
    match (var_name(left), var_name(right)) {
        (Some(name), Some(other)) => keep(field(name).op_field(operator, other), options),
        (Some(name), None) => literal_comparison(name, operator, right, options),
        (None, Some(name)) => literal_comparison(name, reverse_comparison(operator), left, options),
        (None, None) => None,
    }
}

fn literal_comparison(
    name: &str,
    operator: Operator,
    literal: &Value,
    options: &ObjectParseOptions,
) -> Option<QueryNode> {
    let value = json_scalar(literal)?;
    if value == RuleValue::Null {
        return match operator {
            Operator::Eq => keep(field(name).is_null(), options),
            Operator::Neq => keep(field(name).is_not_null(), options),
            other => keep(field(name).op(other, RuleValue::Null), options),
        };
    }
    keep(field(name).op(operator, value), options)
}

/// `lo <= f <= hi` is a between; the exclusive variants have no single
/// canonical operator and decompose into two comparisons.
fn ternary(
    operator: Operator,
    low: &Value,
    middle: &Value,
    high: &Value,
    options: &ObjectParseOptions,
) -> Option<QueryNode> {
    let name = var_name(middle)?;
    let first = json_scalar(low)?;
    let second = json_scalar(high)?;
    match operator {
        Operator::Lte => between(name, first, second, options),
        Operator::Gte => between(name, second, first, options),
        Operator::Lt => pair(name, (Operator::Gt, first), (Operator::Lt, second), options),
        Operator::Gt => pair(name, (Operator::Lt, first), (Operator::Gt, second), options),
        _ => None,
    }
}

fn between(
    name: &str,
    low: RuleValue,
    high: RuleValue,
    options: &ObjectParseOptions,
) -> Option<QueryNode> {
    let value = pack_list(vec![low, high], ",", &options.common);
    keep(field(name).op(Operator::Between, value), options)
}

fn pair(
    name: &str,
    first: (Operator, RuleValue),
    second: (Operator, RuleValue),
    options: &ObjectParseOptions,
) -> Option<QueryNode> {
    let mut rules = Vec::new();
    rules.extend(keep(field(name).op(first.0, first.1), options));
    rules.extend(keep(field(name).op(second.0, second.1), options));
    match rules.len() {
        0 => None,
        1 => rules.pop(),
        _ => Some(QueryNode::Group(RuleGroup {
            id: None,
            combinator: Combinator::And,
            not: false,
            rules,
        })),
    }
}

/// `in` disambiguates by operand type: an array haystack is membership, a
/// field haystack is a substring test.
fn membership(operand: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    let Value::Array(args) = operand else {
        return None;
    };
    let [needle, haystack] = args.as_slice() else {
        return None;
    };
    if let Some(name) = var_name(needle) {
        if matches!(haystack, Value::Array(_)) {
            let items = json_list(haystack)?;
            let value = pack_list(items, ", ", &options.common);
            return keep(field(name).op(Operator::In, value), options);
        }
    }
    let name = var_name(haystack)?;
    if let Some(other) = var_name(needle) {
        return keep(field(name).contains_field(other), options);
    }
    let value = json_scalar(needle)?;
    keep(field(name).op(Operator::Contains, value), options)
}

fn edge(operator: Operator, operand: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    let Value::Array(args) = operand else {
        return None;
    };
    let [target, needle] = args.as_slice() else {
        return None;
    };
    let name = var_name(target)?;
    if let Some(other) = var_name(needle) {
        return keep(field(name).op_field(operator, other), options);
    }
    let value = json_scalar(needle)?;
    keep(field(name).op(operator, value), options)
}

fn keep(rule: Rule, options: &ObjectParseOptions) -> Option<QueryNode> {
    keep_rule(rule, &options.common)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_jsonlogic;
    use crate::types::{Field, FieldMap};

    fn parse(input: &str) -> RuleGroup {
        parse_jsonlogic(input, &ObjectParseOptions::new())
    }

    #[test]
    fn simple_comparison() {
        let parsed = parse(r#"{"==": [{"var": "first_name"}, "Steve"]}"#);
        let expected = RuleGroup::and().rule(field("first_name").eq("Steve"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn malformed_input_yields_empty_group() {
        assert_eq!(parse("nope"), RuleGroup::default());
        assert_eq!(parse("true"), RuleGroup::default());
        assert_eq!(parse(r#"{"bogus": []}"#), RuleGroup::default());
    }

    #[test]
    fn and_or_groups_preserved() {
        let parsed = parse(
            r#"{"or": [{"==": [{"var": "a"}, 1]}, {"and": [{"==": [{"var": "b"}, 2]}, {"==": [{"var": "c"}, 3]}]}]}"#,
        );
        let expected = RuleGroup::or().rule(field("a").eq(1_i64)).group(
            RuleGroup::and()
                .rule(field("b").eq(2_i64))
                .rule(field("c").eq(3_i64)),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn single_child_group_not_collapsed() {
        let parsed = parse(r#"{"and": [{"==": [{"var": "a"}, 1]}]}"#);
        let expected = RuleGroup::and().rule(field("a").eq(1_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn negation_absorbs_into_not_in() {
        let options = ObjectParseOptions::new().lists_as_arrays(true);
        let parsed = parse_jsonlogic(r#"{"!": {"in": [{"var": "a"}, [1, 2]]}}"#, &options);
        let expected = RuleGroup::and().rule(field("a").not_in_list(RuleValue::List(vec![
            RuleValue::Int(1),
            RuleValue::Int(2),
        ])));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn negation_wraps_equality() {
        let parsed = parse(r#"{"!": {"==": [{"var": "a"}, 1]}}"#);
        match &parsed.rules[0] {
            QueryNode::Group(group) => {
                assert!(group.not);
                assert_eq!(group.rules.len(), 1);
            }
            QueryNode::Rule(_) => panic!("expected a negated group"),
        }
    }

    #[test]
    fn double_negation_passes_through() {
        let parsed = parse(r#"{"!!": {"==": [{"var": "a"}, 1]}}"#);
        let expected = RuleGroup::and().rule(field("a").eq(1_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn null_comparisons() {
        let parsed = parse(
            r#"{"and": [{"==": [{"var": "a"}, null]}, {"!=": [{"var": "b"}, null]}]}"#,
        );
        let expected = RuleGroup::and()
            .rule(field("a").is_null())
            .rule(field("b").is_not_null());
        assert_eq!(parsed, expected);
    }

    #[test]
    fn inclusive_ternary_is_between() {
        let parsed = parse(r#"{"<=": [21, {"var": "age"}, 65]}"#);
        let expected = RuleGroup::and().rule(field("age").op(Operator::Between, "21,65"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn reversed_inclusive_ternary_swaps_bounds() {
        let parsed = parse(r#"{">=": [65, {"var": "age"}, 21]}"#);
        let expected = RuleGroup::and().rule(field("age").op(Operator::Between, "21,65"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn exclusive_ternary_decomposes() {
        let parsed = parse(r#"{"<": [21, {"var": "age"}, 65]}"#);
        let expected = RuleGroup::and()
            .rule(field("age").gt(21_i64))
            .rule(field("age").lt(65_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn membership_with_array_is_in() {
        let parsed = parse(r#"{"in": [{"var": "last_name"}, ["Vai", "Vaughan"]]}"#);
        let expected = RuleGroup::and().rule(field("last_name").in_list("Vai, Vaughan"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn membership_with_field_haystack_is_contains() {
        let parsed = parse(r#"{"in": ["Stev", {"var": "first_name"}]}"#);
        let expected = RuleGroup::and().rule(field("first_name").contains("Stev"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn membership_var_needle_is_field_sourced_contains() {
        let parsed = parse(r#"{"in": [{"var": "nickname"}, {"var": "biography"}]}"#);
        let expected = RuleGroup::and().rule(field("biography").contains_field("nickname"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn starts_and_ends_with() {
        let parsed = parse(
            r#"{"and": [{"startsWith": [{"var": "a"}, "St"]}, {"endsWith": [{"var": "b"}, "ai"]}]}"#,
        );
        let expected = RuleGroup::and()
            .rule(field("a").begins_with("St"))
            .rule(field("b").ends_with("ai"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn field_to_field_comparison() {
        let parsed = parse(r#"{"==": [{"var": "first_name"}, {"var": "last_name"}]}"#);
        let expected = RuleGroup::and().rule(field("first_name").eq_field("last_name"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn reversed_literal_comparison_flips() {
        let parsed = parse(r#"{"<": [18, {"var": "age"}]}"#);
        let expected = RuleGroup::and().rule(field("age").gt(18_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn custom_op_extension() {
        let options = ObjectParseOptions::new().custom_op("regexMatch", |_, operand| {
            let args = operand.as_array()?;
            let name = super::var_name(args.first()?)?;
            let pattern = args.get(1)?.as_str()?;
            Some(QueryNode::Rule(field(name).contains(pattern)))
        });
        let parsed = parse_jsonlogic(
            r#"{"regexMatch": [{"var": "name"}, "St"]}"#,
            &options,
        );
        let expected = RuleGroup::and().rule(field("name").contains("St"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn registry_filters_rules() {
        let options =
            ObjectParseOptions::new().fields(FieldMap::new().field(Field::new("age")));
        let parsed = parse_jsonlogic(
            r#"{"and": [{">": [{"var": "age"}, 21]}, {"==": [{"var": "nope"}, 1]}]}"#,
            &options,
        );
        let expected = RuleGroup::and().rule(field("age").gt(21_i64));
        assert_eq!(parsed, expected);
    }
}
