//! PostgREST-style filter import: JsonLogic-shaped trees with PostgREST
//! operator keywords, `*` wildcards, and an explicit `not` wrapper.

use serde_json::Value;

use crate::types::{
    field, Combinator, Operator, QueryNode, Rule, RuleGroup, RuleValue, ValueSource,
};

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
        "not" => negated(operand, options),
        "eq" => comparison(Operator::Eq, operand, options),
        "neq" => comparison(Operator::Neq, operand, options),
        "lt" => ranged(Operator::Lt, operand, options),
        "lte" => ranged(Operator::Lte, operand, options),
        "gt" => ranged(Operator::Gt, operand, options),
        "gte" => ranged(Operator::Gte, operand, options),
        "like" => like(operand, options),
        "is" => is_test(operand, options),
        "in" => membership(operand, options),
        _ => {
            let parser = options.custom_ops.get(key)?;
            parser(key, operand)
        }
    }
}

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

/// `not` over `is null` reads as the dedicated not-null operator; everything
/// else goes through ordinary negation.
fn negated(operand: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    match node(operand, options)? {
        QueryNode::Rule(mut rule) if rule.operator == Operator::Null => {
            rule.operator = Operator::NotNull;
            Some(QueryNode::Rule(rule))
        }
        other => Some(negate_node(other)),
    }
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
        (Some(name), None) => {
            let value = json_scalar(right)?;
            keep(field(name).op(operator, value), options)
        }
        (None, Some(name)) => {
            let value = json_scalar(left)?;
            keep(field(name).op(reverse_comparison(operator), value), options)
        }
        (None, None) => None,
    }
}

/// `lo lte f lte hi` chains collapse to `between`; exclusive chains
/// decompose into two comparisons.
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

fn like(operand: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    let Value::Array(args) = operand else {
        return None;
    };
    let [target, pattern] = args.as_slice() else {
        return None;
    };
    let name = var_name(target)?;
    if let Some(other) = var_name(pattern) {
        return keep(field(name).eq_field(other), options);
    }
    match json_scalar(pattern)? {
        RuleValue::String(text) => {
            let (operator, inner) = star_shape(&text);
            keep(field(name).op(operator, inner), options)
        }
        other => keep(field(name).eq(other), options),
    }
}

/// Split a `*`-wildcard pattern into operator and bare text. No wildcards
/// means plain equality.
fn star_shape(text: &str) -> (Operator, String) {
    let leading = text.starts_with('*');
    let trailing = text.len() > usize::from(leading) && text.ends_with('*');
    let inner = text[usize::from(leading)..text.len() - usize::from(trailing)].to_owned();
    let operator = match (leading, trailing) {
        (true, true) => Operator::Contains,
        (false, true) => Operator::BeginsWith,
        (true, false) => Operator::EndsWith,
        (false, false) => Operator::Eq,
    };
    (operator, inner)
}

fn is_test(operand: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    let Value::Array(args) = operand else {
        return None;
    };
    let [target, tested] = args.as_slice() else {
        return None;
    };
    let name = var_name(target)?;
    match tested {
        Value::Null => keep(field(name).is_null(), options),
        Value::Bool(b) => keep(field(name).eq(*b), options),
        _ => None,
    }
}

fn membership(operand: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    let Value::Array(args) = operand else {
        return None;
    };
    let [target, haystack] = args.as_slice() else {
        return None;
    };
    let name = var_name(target)?;
    if let Some(items) = json_list(haystack) {
        let value = pack_list(items, ", ", &options.common);
        return keep(field(name).op(Operator::In, value), options);
    }
    // a list of field references becomes a field-sourced membership test
    let Value::Array(elements) = haystack else {
        return None;
    };
    let names: Option<Vec<&str>> = elements.iter().map(var_name).collect();
    let names = names?;
    if names.is_empty() {
        return None;
    }
    let items = names.iter().map(|other| RuleValue::from(*other)).collect();
    let value = pack_list(items, ", ", &options.common);
    keep(
        field(name)
            .op(Operator::In, value)
            .with_value_source(ValueSource::Field),
        options,
    )
}

fn keep(rule: Rule, options: &ObjectParseOptions) -> Option<QueryNode> {
    keep_rule(rule, &options.common)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_postgrest;
    use crate::types::{Field, FieldMap};

    fn parse(input: &str) -> RuleGroup {
        parse_postgrest(input, &ObjectParseOptions::new())
    }

    #[test]
    fn keyword_comparisons() {
        let parsed = parse(
            r#"{"and": [{"eq": [{"var": "first_name"}, "Steve"]}, {"gte": [{"var": "age"}, 26]}]}"#,
        );
        let expected = RuleGroup::and()
            .rule(field("first_name").eq("Steve"))
            .rule(field("age").gte(26_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn malformed_input_yields_empty_group() {
        assert_eq!(parse("not json"), RuleGroup::default());
        assert_eq!(parse(r#"{"weird": 1}"#), RuleGroup::default());
        assert_eq!(parse(r#"{"eq": [1, 2]}"#), RuleGroup::default());
    }

    #[test]
    fn star_wildcards_map_to_match_modes() {
        let parsed = parse(
            r#"{"and": [
                {"like": [{"var": "a"}, "*x*"]},
                {"like": [{"var": "b"}, "y*"]},
                {"like": [{"var": "c"}, "*z"]},
                {"like": [{"var": "d"}, "w"]}
            ]}"#,
        );
        let expected = RuleGroup::and()
            .rule(field("a").contains("x"))
            .rule(field("b").begins_with("y"))
            .rule(field("c").ends_with("z"))
            .rule(field("d").eq("w"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_over_like_absorbs() {
        let parsed = parse(r#"{"not": {"like": [{"var": "a"}, "*x*"]}}"#);
        let expected = RuleGroup::and().rule(field("a").does_not_contain("x"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_over_is_null_reads_not_null() {
        let parsed = parse(r#"{"not": {"is": [{"var": "email"}, null]}}"#);
        let expected = RuleGroup::and().rule(field("email").is_not_null());
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_over_in_absorbs() {
        let parsed = parse(r#"{"not": {"in": [{"var": "a"}, [1, 2]]}}"#);
        let expected = RuleGroup::and().rule(field("a").op(Operator::NotIn, "1, 2"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_over_between_chain_absorbs() {
        let parsed = parse(r#"{"not": {"lte": [26, {"var": "age"}, 37]}}"#);
        let expected = RuleGroup::and().rule(field("age").op(Operator::NotBetween, "26,37"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_over_group_toggles_flag() {
        let parsed = parse(
            r#"{"not": {"or": [{"eq": [{"var": "a"}, 1]}, {"eq": [{"var": "b"}, 2]}]}}"#,
        );
        let expected = RuleGroup::or()
            .rule(field("a").eq(1_i64))
            .rule(field("b").eq(2_i64))
            .negate();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_over_equality_wraps() {
        let parsed = parse(r#"{"not": {"eq": [{"var": "a"}, 1]}}"#);
        match &parsed.rules[0] {
            QueryNode::Group(group) => assert!(group.not),
            QueryNode::Rule(_) => panic!("expected a negated group"),
        }
    }

    #[test]
    fn is_null_and_is_bool() {
        let parsed = parse(
            r#"{"and": [{"is": [{"var": "email"}, null]}, {"is": [{"var": "active"}, true]}]}"#,
        );
        let expected = RuleGroup::and()
            .rule(field("email").is_null())
            .rule(field("active").eq(true));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn lte_chain_is_between() {
        let parsed = parse(r#"{"lte": [26, {"var": "age"}, 37]}"#);
        let expected = RuleGroup::and().rule(field("age").op(Operator::Between, "26,37"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn gte_chain_swaps_bounds() {
        let parsed = parse(r#"{"gte": [37, {"var": "age"}, 26]}"#);
        let expected = RuleGroup::and().rule(field("age").op(Operator::Between, "26,37"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn exclusive_chain_decomposes() {
        let parsed = parse(r#"{"lt": [26, {"var": "age"}, 37]}"#);
        let expected = RuleGroup::and()
            .rule(field("age").gt(26_i64))
            .rule(field("age").lt(37_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn membership_joins_by_default() {
        let parsed = parse(r#"{"in": [{"var": "last_name"}, ["Vai", "Vaughan"]]}"#);
        let expected = RuleGroup::and().rule(field("last_name").in_list("Vai, Vaughan"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn membership_as_arrays() {
        let options = ObjectParseOptions::new().lists_as_arrays(true);
        let parsed = parse_postgrest(r#"{"in": [{"var": "n"}, [1, 2]]}"#, &options);
        let expected = RuleGroup::and().rule(
            field("n").in_list(RuleValue::List(vec![RuleValue::Int(1), RuleValue::Int(2)])),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn membership_of_field_references() {
        let parsed = parse(r#"{"in": [{"var": "a"}, [{"var": "b"}, {"var": "c"}]]}"#);
        let expected = RuleGroup::and().rule(
            field("a")
                .op(Operator::In, "b, c")
                .with_value_source(ValueSource::Field),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn field_valued_comparison() {
        let parsed = parse(r#"{"neq": [{"var": "first_name"}, {"var": "last_name"}]}"#);
        let expected = RuleGroup::and().rule(field("first_name").neq_field("last_name"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn reversed_comparison_flips() {
        let parsed = parse(r#"{"lt": [18, {"var": "age"}]}"#);
        let expected = RuleGroup::and().rule(field("age").gt(18_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn single_child_group_preserved() {
        let parsed = parse(r#"{"or": [{"eq": [{"var": "a"}, 1]}]}"#);
        let expected = RuleGroup::or().rule(field("a").eq(1_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn custom_op_extension() {
        let options = ObjectParseOptions::new().custom_op("ilike", |_, operand| {
            let args = operand.as_array()?;
            let name = super::var_name(args.first()?)?;
            let text = args.get(1)?.as_str()?;
            Some(QueryNode::Rule(field(name).contains(text)))
        });
        let parsed = parse_postgrest(r#"{"ilike": [{"var": "name"}, "st"]}"#, &options);
        let expected = RuleGroup::and().rule(field("name").contains("st"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn registry_filters_rules() {
        let options =
            ObjectParseOptions::new().fields(FieldMap::new().field(Field::new("age")));
        let parsed = parse_postgrest(
            r#"{"and": [{"gt": [{"var": "age"}, 21]}, {"eq": [{"var": "nope"}, 1]}]}"#,
            &options,
        );
        let expected = RuleGroup::and().rule(field("age").gt(21_i64));
        assert_eq!(parsed, expected);
    }
}
