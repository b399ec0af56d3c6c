//! MongoDB import: query documents back to the canonical tree.
//!
//! Sibling keys in one document are an implicit AND. `$nor` carries group
//! negation, `$not` per-field negation, `$expr` field-to-field comparisons.

use serde_json::Value;

use crate::types::{field, Combinator, Operator, QueryNode, Rule, RuleGroup};

use super::{
    into_group, json_list, json_scalar, keep_rule, negate_node, pack_list, ObjectParseOptions,
};

pub(crate) fn parse_value(value: &Value, options: &ObjectParseOptions) -> RuleGroup {
    let Value::Object(map) = value else {
        return RuleGroup::default();
    };
    into_group(document(map, options))
}

fn document(map: &serde_json::Map<String, Value>, options: &ObjectParseOptions) -> Option<QueryNode> {
    let mut nodes = Vec::new();
    for (key, operand) in map {
        nodes.extend(entry(key, operand, options));
    }
    combine(nodes, Combinator::And)
}

fn combine(nodes: Vec<QueryNode>, combinator: Combinator) -> Option<QueryNode> {
    match nodes.len() {
        0 => None,
        1 => nodes.into_iter().next(),
        _ => Some(QueryNode::Group(RuleGroup {
            id: None,
            combinator,
            not: false,
            rules: nodes,
        })),
    }
}

fn entry(key: &str, operand: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    match key {
        "$and" => children(operand, options).and_then(|nodes| combine(nodes, Combinator::And)),
        "$or" => children(operand, options).and_then(|nodes| combine(nodes, Combinator::Or)),
        "$nor" => nor(operand, options),
        "$expr" => field_comparison(operand, options),
        _ if key.starts_with('$') => {
            let parser = options.custom_ops.get(key)?;
            parser(key, operand)
        }
        name => field_entry(name, operand, options),
    }
}

fn children(operand: &Value, options: &ObjectParseOptions) -> Option<Vec<QueryNode>> {
    let Value::Array(items) = operand else {
        return None;
    };
    let mut nodes = Vec::new();
    for item in items {
        if let Value::Object(map) = item {
            nodes.extend(document(map, options));
        }
    }
    Some(nodes)
}

/// `$nor` is NOT-OR. A single clause is plain negation; several become a
/// negated `or` group.
fn nor(operand: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    let mut nodes = children(operand, options)?;
    match nodes.len() {
        0 => None,
        1 => nodes.pop().map(negate_node),
        _ => Some(QueryNode::Group(RuleGroup {
            id: None,
            combinator: Combinator::Or,
            not: true,
            rules: nodes,
        })),
    }
}

fn field_comparison(operand: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    let Value::Object(map) = operand else {
        return None;
    };
    if map.len() != 1 {
        return None;
    }
    let (op_key, args) = map.iter().next()?;
    let operator = match op_key.as_str() {
        "$eq" => Operator::Eq,
        "$ne" => Operator::Neq,
        "$lt" => Operator::Lt,
        "$lte" => Operator::Lte,
        "$gt" => Operator::Gt,
        "$gte" => Operator::Gte,
        _ => return None,
    };
    let Value::Array(args) = args else {
        return None;
    };
    let [left, right] = args.as_slice() else {
        return None;
    };
    let left = dollar_path(left)?;
    let right = dollar_path(right)?;
    keep(field(left).op_field(operator, right), options)
}

fn dollar_path(value: &Value) -> Option<&str> {
    match value {
        Value::String(path) => path.strip_prefix('$'),
        _ => None,
    }
}

fn field_entry(name: &str, operand: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    match operand {
        Value::Null => keep(field(name).is_null(), options),
        Value::Object(ops) => field_ops(name, ops, options),
        Value::Array(_) => None,
        scalar => {
            let value = json_scalar(scalar)?;
            keep(field(name).eq(value), options)
        }
    }
}

fn field_ops(
    name: &str,
    ops: &serde_json::Map<String, Value>,
    options: &ObjectParseOptions,
) -> Option<QueryNode> {
    // The {$gte, $lte} pair is a between; anything else combines per key.
    if ops.len() == 2 && ops.contains_key("$gte") && ops.contains_key("$lte") {
        let low = json_scalar(ops.get("$gte")?)?;
        let high = json_scalar(ops.get("$lte")?)?;
        let value = pack_list(vec![low, high], ",", &options.common);
        return keep(field(name).op(Operator::Between, value), options);
    }
    let mut nodes = Vec::new();
    for (op_key, arg) in ops {
        nodes.extend(field_op(name, op_key, arg, options));
    }
    combine(nodes, Combinator::And)
}

fn field_op(
    name: &str,
    op_key: &str,
    arg: &Value,
    options: &ObjectParseOptions,
) -> Option<QueryNode> {
    match op_key {
        "$eq" => keep(field(name).eq(json_scalar(arg)?), options),
        "$ne" if arg.is_null() => keep(field(name).is_not_null(), options),
        "$ne" => keep(field(name).neq(json_scalar(arg)?), options),
        "$lt" => keep(field(name).lt(json_scalar(arg)?), options),
        "$lte" => keep(field(name).lte(json_scalar(arg)?), options),
        "$gt" => keep(field(name).gt(json_scalar(arg)?), options),
        "$gte" => keep(field(name).gte(json_scalar(arg)?), options),
        "$regex" => regex_rule(name, arg, options),
        "$in" => membership(name, Operator::In, arg, options),
        "$nin" => membership(name, Operator::NotIn, arg, options),
        "$not" => {
            let Value::Object(inner) = arg else {
                return None;
            };
            field_ops(name, inner, options).map(negate_node)
        }
        _ => None,
    }
}

/// Anchors pick the operator: `^v` begins-with, `v$` ends-with, bare
/// patterns are contains.
fn regex_rule(name: &str, arg: &Value, options: &ObjectParseOptions) -> Option<QueryNode> {
    let Value::String(pattern) = arg else {
        return None;
    };
    let (operator, text) = if let Some(rest) = pattern.strip_prefix('^') {
        (Operator::BeginsWith, rest)
    } else if let Some(rest) = pattern.strip_suffix('$') {
        (Operator::EndsWith, rest)
    } else {
        (Operator::Contains, pattern.as_str())
    };
    keep(field(name).op(operator, text), options)
}

fn membership(
    name: &str,
    operator: Operator,
    arg: &Value,
    options: &ObjectParseOptions,
) -> Option<QueryNode> {
    let items = json_list(arg)?;
    let value = pack_list(items, ", ", &options.common);
    keep(field(name).op(operator, value), options)
}

fn keep(rule: Rule, options: &ObjectParseOptions) -> Option<QueryNode> {
    keep_rule(rule, &options.common)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{parse_mongodb, parse_mongodb_value};
    use crate::types::{Field, FieldMap, RuleValue};
    use serde_json::json;

    fn parse(input: &str) -> RuleGroup {
        parse_mongodb(input, &ObjectParseOptions::new())
    }

    #[test]
    fn bare_equality() {
        let parsed = parse(r#"{"first_name": "Steve"}"#);
        let expected = RuleGroup::and().rule(field("first_name").eq("Steve"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn malformed_input_yields_empty_group() {
        assert_eq!(parse("not json"), RuleGroup::default());
        assert_eq!(parse("[1, 2]"), RuleGroup::default());
        assert_eq!(parse("{}"), RuleGroup::default());
    }

    #[test]
    fn and_or_arrays() {
        let parsed = parse(r#"{"$or": [{"a": 1}, {"$and": [{"b": 2}, {"c": 3}]}]}"#);
        let expected = RuleGroup::or().rule(field("a").eq(1_i64)).group(
            RuleGroup::and()
                .rule(field("b").eq(2_i64))
                .rule(field("c").eq(3_i64)),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn sibling_keys_are_implicit_and() {
        let parsed = parse(r#"{"age": {"$gt": 21}, "name": "Bob"}"#);
        let expected = RuleGroup::and()
            .rule(field("age").gt(21_i64))
            .rule(field("name").eq("Bob"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn comparison_operators() {
        let parsed = parse(r#"{"a": {"$ne": 1}, "b": {"$lt": 2}, "c": {"$gte": 3}}"#);
        let expected = RuleGroup::and()
            .rule(field("a").neq(1_i64))
            .rule(field("b").lt(2_i64))
            .rule(field("c").gte(3_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn regex_anchors() {
        let parsed = parse(
            r#"{"a": {"$regex": "^Stev"}, "b": {"$regex": "vai$"}, "c": {"$regex": "ev"}}"#,
        );
        let expected = RuleGroup::and()
            .rule(field("a").begins_with("Stev"))
            .rule(field("b").ends_with("vai"))
            .rule(field("c").contains("ev"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn negated_regex_absorbs() {
        let parsed = parse(r#"{"a": {"$not": {"$regex": "^Stev"}}}"#);
        let expected = RuleGroup::and().rule(field("a").does_not_begin_with("Stev"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn null_tests() {
        let parsed = parse(r#"{"middle": null, "last": {"$ne": null}}"#);
        let expected = RuleGroup::and()
            .rule(field("last").is_not_null())
            .rule(field("middle").is_null());
        // serde_json object iteration is key-sorted
        assert_eq!(parsed, expected);
    }

    #[test]
    fn in_and_nin() {
        let parsed = parse(r#"{"last_name": {"$in": ["Vai", "Vaughan"]}}"#);
        let expected = RuleGroup::and().rule(field("last_name").in_list("Vai, Vaughan"));
        assert_eq!(parsed, expected);

        let parsed = parse(r#"{"last_name": {"$nin": ["Vai"]}}"#);
        let expected = RuleGroup::and().rule(field("last_name").not_in_list("Vai"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn gte_lte_pair_is_between() {
        let parsed = parse(r#"{"age": {"$gte": 21, "$lte": 65}}"#);
        let expected = RuleGroup::and().rule(field("age").op(Operator::Between, "21,65"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_wrapped_between() {
        let parsed = parse(r#"{"age": {"$not": {"$gte": 21, "$lte": 65}}}"#);
        let expected = RuleGroup::and().rule(field("age").op(Operator::NotBetween, "21,65"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn exclusive_range_stays_two_rules() {
        let parsed = parse(r#"{"age": {"$gt": 21, "$lt": 65}}"#);
        let expected = RuleGroup::and()
            .rule(field("age").gt(21_i64))
            .rule(field("age").lt(65_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn nor_single_clause_negates() {
        let parsed = parse(r#"{"$nor": [{"a": {"$regex": "x"}}]}"#);
        let expected = RuleGroup::and().rule(field("a").does_not_contain("x"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn nor_group_toggles_not() {
        let parsed = parse(r#"{"$nor": [{"$and": [{"a": 1}, {"b": 2}]}]}"#);
        match &parsed.rules[0] {
            QueryNode::Group(group) => {
                assert!(group.not);
                assert_eq!(group.combinator, Combinator::And);
                assert_eq!(group.rules.len(), 2);
            }
            QueryNode::Rule(_) => panic!("expected a group"),
        }
    }

    #[test]
    fn nor_multiple_clauses() {
        let parsed = parse(r#"{"$nor": [{"a": 1}, {"b": 2}]}"#);
        match &parsed.rules[0] {
            QueryNode::Group(group) => {
                assert!(group.not);
                assert_eq!(group.combinator, Combinator::Or);
                assert_eq!(group.rules.len(), 2);
            }
            QueryNode::Rule(_) => panic!("expected a group"),
        }
    }

    #[test]
    fn expr_field_comparison() {
        let parsed = parse(r#"{"$expr": {"$eq": ["$first_name", "$last_name"]}}"#);
        let expected = RuleGroup::and().rule(field("first_name").eq_field("last_name"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn unknown_dollar_key_uses_custom_ops() {
        let options = ObjectParseOptions::new().custom_op("$near", |_, operand| {
            let distance = operand.get("distance")?.as_i64()?;
            Some(QueryNode::Rule(field("distance").lte(distance)))
        });
        let parsed = parse_mongodb(r#"{"$near": {"distance": 5}}"#, &options);
        let expected = RuleGroup::and().rule(field("distance").lte(5_i64));
        assert_eq!(parsed, expected);

        // without the extension the key drops
        assert_eq!(
            parse_mongodb(r#"{"$near": {"distance": 5}}"#, &ObjectParseOptions::new()),
            RuleGroup::default()
        );
    }

    #[test]
    fn registry_drops_unknown_fields() {
        let options =
            ObjectParseOptions::new().fields(FieldMap::new().field(Field::new("age")));
        let parsed = parse_mongodb(r#"{"age": {"$gt": 21}, "nope": 1}"#, &options);
        let expected = RuleGroup::and().rule(field("age").gt(21_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn value_entry_point_accepts_ready_documents() {
        let doc = json!({"age": {"$gte": 21}});
        let parsed = parse_mongodb_value(&doc, &ObjectParseOptions::new());
        let expected = RuleGroup::and().rule(field("age").gte(21_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn lists_as_arrays() {
        let options = ObjectParseOptions::new().lists_as_arrays(true);
        let parsed = parse_mongodb(r#"{"last_name": {"$in": ["Vai", "Vaughan"]}}"#, &options);
        let expected = RuleGroup::and().rule(field("last_name").in_list(RuleValue::List(vec![
            RuleValue::from("Vai"),
            RuleValue::from("Vaughan"),
        ])));
        assert_eq!(parsed, expected);
    }
}
