//! JSONata import. Match modes arrive as function calls (`$contains`, the
//! `$substring`/`$length` prefix and suffix tests), negation as `$not(..)`,
//! and combinators as lowercase `and`/`or` words.

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
enum JsonataExpr {
    Or(Box<JsonataExpr>, Box<JsonataExpr>),
    And(Box<JsonataExpr>, Box<JsonataExpr>),
    Not(Box<JsonataExpr>),
    Paren(Box<JsonataExpr>),
    Compare(JsonataOperand, Operator, JsonataOperand),
    Contains {
        target: String,
        needle: JsonataOperand,
    },
    /// A `$substring(f, ..) = x` prefix or suffix test.
    Edge {
        target: String,
        operator: Operator,
        needle: JsonataOperand,
        expected: JsonataOperand,
    },
    In {
        target: String,
        items: Vec<JsonataOperand>,
    },
}

#[derive(Clone, Debug, PartialEq)]
enum JsonataOperand {
    Value(RuleValue),
    Ident(String),
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

fn operand(input: &mut &str) -> ModalResult<JsonataOperand> {
    ws.parse_next(input)?;
    alt((
        literal.map(JsonataOperand::Value),
        ident.map(|name: &str| JsonataOperand::Ident(name.to_owned())),
    ))
    .parse_next(input)
}

fn compare_op(input: &mut &str) -> ModalResult<Operator> {
    ws.parse_next(input)?;
    alt((
        "!=".value(Operator::Neq),
        "<=".value(Operator::Lte),
        ">=".value(Operator::Gte),
        '='.value(Operator::Eq),
        '<'.value(Operator::Lt),
        '>'.value(Operator::Gt),
    ))
    .parse_next(input)
}

fn contains_call(input: &mut &str) -> ModalResult<JsonataExpr> {
    ws.parse_next(input)?;
    ("$contains", ws, '(', ws).parse_next(input)?;
    let target = ident.parse_next(input)?.to_owned();
    (ws, ',').parse_next(input)?;
    let needle = operand(input)?;
    (ws, ')').parse_next(input)?;
    Ok(JsonataExpr::Contains { target, needle })
}

fn length_call(input: &mut &str) -> ModalResult<JsonataOperand> {
    (ws, "$length", ws, '(').parse_next(input)?;
    let needle = operand(input)?;
    (ws, ')').parse_next(input)?;
    Ok(needle)
}

/// `$substring(f, 0, $length(x)) = x` tests a prefix; the negative-offset
/// two-argument form tests a suffix.
fn substring_test(input: &mut &str) -> ModalResult<JsonataExpr> {
    ws.parse_next(input)?;
    ("$substring", ws, '(', ws).parse_next(input)?;
    let target = ident.parse_next(input)?.to_owned();
    (ws, ',', ws).parse_next(input)?;
    let (operator, needle) = alt((
        preceded(('0', ws, ','), length_call).map(|needle| (Operator::BeginsWith, needle)),
        preceded('-', length_call).map(|needle| (Operator::EndsWith, needle)),
    ))
    .parse_next(input)?;
    (ws, ')', ws, '=').parse_next(input)?;
    let expected = operand(input)?;
    Ok(JsonataExpr::Edge {
        target,
        operator,
        needle,
        expected,
    })
}

fn membership(input: &mut &str) -> ModalResult<JsonataExpr> {
    ws.parse_next(input)?;
    let target = ident.parse_next(input)?.to_owned();
    (ws, word("in"), ws, '[').parse_next(input)?;
    let items: Vec<JsonataOperand> = separated(0.., operand, (ws, ',')).parse_next(input)?;
    (ws, ']').parse_next(input)?;
    Ok(JsonataExpr::In { target, items })
}

fn comparison(input: &mut &str) -> ModalResult<JsonataExpr> {
    let left = operand(input)?;
    let operator = compare_op(input)?;
    let right = operand(input)?;
    Ok(JsonataExpr::Compare(left, operator, right))
}

fn predicate(input: &mut &str) -> ModalResult<JsonataExpr> {
    alt((contains_call, substring_test, membership, comparison)).parse_next(input)
}

fn primary(input: &mut &str) -> ModalResult<JsonataExpr> {
    ws.parse_next(input)?;
    alt((
        delimited('(', expression, (ws, ')')).map(|inner| JsonataExpr::Paren(Box::new(inner))),
        predicate,
    ))
    .parse_next(input)
}

fn unary(input: &mut &str) -> ModalResult<JsonataExpr> {
    ws.parse_next(input)?;
    if opt(("$not", ws, '(')).parse_next(input)?.is_some() {
        let inner = expression(input)?;
        (ws, ')').parse_next(input)?;
        Ok(JsonataExpr::Not(Box::new(inner)))
    } else {
        primary(input)
    }
}

fn and_expr(input: &mut &str) -> ModalResult<JsonataExpr> {
    let first = unary(input)?;
    let rest: Vec<JsonataExpr> =
        repeat(0.., preceded((ws, word("and")), unary)).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| JsonataExpr::And(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut &str) -> ModalResult<JsonataExpr> {
    let first = and_expr(input)?;
    let rest: Vec<JsonataExpr> =
        repeat(0.., preceded((ws, word("or")), and_expr)).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| JsonataExpr::Or(Box::new(acc), Box::new(r))))
}

fn expression(input: &mut &str) -> ModalResult<JsonataExpr> {
    ws.parse_next(input)?;
    or_expr(input)
}

// -- Builder ----------------------------------------------------------------

fn node(expr: &JsonataExpr, options: &ParseOptions) -> Option<QueryNode> {
    match expr {
        JsonataExpr::Or(..) => chain(expr, Combinator::Or, options),
        JsonataExpr::And(..) => chain(expr, Combinator::And, options),
        JsonataExpr::Not(inner) => node(inner, options).map(negate_node),
        JsonataExpr::Paren(inner) => node(inner, options),
        JsonataExpr::Compare(left, operator, right) => {
            compare_node(left, operator.clone(), right, options)
        }
        JsonataExpr::Contains { target, needle } => contains_node(target, needle, options),
        JsonataExpr::Edge {
            target,
            operator,
            needle,
            expected,
        } => edge_node(target, operator.clone(), needle, expected, options),
        JsonataExpr::In { target, items } => list_rule(target, items, options),
    }
}

fn chain(expr: &JsonataExpr, combinator: Combinator, options: &ParseOptions) -> Option<QueryNode> {
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

fn collect(
    expr: &JsonataExpr,
    combinator: Combinator,
    options: &ParseOptions,
    out: &mut Vec<QueryNode>,
) {
    match (expr, combinator) {
        (JsonataExpr::And(left, right), Combinator::And)
        | (JsonataExpr::Or(left, right), Combinator::Or) => {
            collect(left, combinator, options, out);
            collect(right, combinator, options, out);
        }
        _ => out.extend(node(expr, options)),
    }
}

fn compare_node(
    left: &JsonataOperand,
    operator: Operator,
    right: &JsonataOperand,
    options: &ParseOptions,
) -> Option<QueryNode> {
    match (left, right) {
        (JsonataOperand::Ident(name), JsonataOperand::Ident(other)) => {
            keep_rule(field(name).op_field(operator, other), options)
        }
        (JsonataOperand::Ident(name), JsonataOperand::Value(value)) => {
            literal_rule(name, operator, value.clone(), options)
        }
        (JsonataOperand::Value(value), JsonataOperand::Ident(name)) => {
            literal_rule(name, reverse_comparison(operator), value.clone(), options)
        }
        (JsonataOperand::Value(_), JsonataOperand::Value(_)) => None,
    }
}

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

fn contains_node(
    target: &str,
    needle: &JsonataOperand,
    options: &ParseOptions,
) -> Option<QueryNode> {
    match needle {
        JsonataOperand::Value(value) => keep_rule(field(target).contains(value.clone()), options),
        JsonataOperand::Ident(other) => keep_rule(field(target).contains_field(other), options),
    }
}

/// Both needle positions must agree or the test has no canonical form.
fn edge_node(
    target: &str,
    operator: Operator,
    needle: &JsonataOperand,
    expected: &JsonataOperand,
    options: &ParseOptions,
) -> Option<QueryNode> {
    if needle != expected {
        return None;
    }
    match needle {
        JsonataOperand::Value(RuleValue::String(text)) => {
            keep_rule(field(target).op(operator, text.clone()), options)
        }
        JsonataOperand::Ident(other) => keep_rule(field(target).op_field(operator, other), options),
        JsonataOperand::Value(_) => None,
    }
}

fn list_rule(name: &str, items: &[JsonataOperand], options: &ParseOptions) -> Option<QueryNode> {
    let values: Option<Vec<RuleValue>> = items
        .iter()
        .map(|item| match item {
            JsonataOperand::Value(value) => Some(value.clone()),
            JsonataOperand::Ident(_) => None,
        })
        .collect();
    if let Some(values) = values {
        let value = pack_list(values, ", ", options);
        return keep_rule(field(name).in_list(value), options);
    }
    let names: Option<Vec<&str>> = items
        .iter()
        .map(|item| match item {
            JsonataOperand::Ident(other) => Some(other.as_str()),
            JsonataOperand::Value(_) => None,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_jsonata;
    use crate::types::{Field, FieldMap};

    fn parse(input: &str) -> RuleGroup {
        parse_jsonata(input, &ParseOptions::new())
    }

    #[test]
    fn parenthesized_conjunction() {
        let parsed = parse("(first_name = \"Steve\" and age >= 26)");
        let expected = RuleGroup::and()
            .rule(field("first_name").eq("Steve"))
            .rule(field("age").gte(26_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn bare_expression_also_accepted() {
        let parsed = parse("age >= 26");
        let expected = RuleGroup::and().rule(field("age").gte(26_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn malformed_input_yields_empty_group() {
        assert_eq!(parse("and and"), RuleGroup::default());
        assert_eq!(parse("(a = 1) trailing"), RuleGroup::default());
        assert_eq!(parse(""), RuleGroup::default());
    }

    #[test]
    fn tautology_collapses_to_empty_group() {
        assert_eq!(parse("(1 = 1)"), RuleGroup::default());
    }

    #[test]
    fn contains_function() {
        let parsed = parse("($contains(bio, \"rust\") and $not($contains(tag, \"x\")))");
        let expected = RuleGroup::and()
            .rule(field("bio").contains("rust"))
            .rule(field("tag").does_not_contain("x"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn substring_prefix_and_suffix_tests() {
        let parsed = parse(
            "($substring(name, 0, $length(\"St\")) = \"St\" and $substring(mail, -$length(\".io\")) = \".io\")",
        );
        let expected = RuleGroup::and()
            .rule(field("name").begins_with("St"))
            .rule(field("mail").ends_with(".io"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn negated_substring_test_absorbs() {
        let parsed = parse("$not($substring(name, 0, $length(\"St\")) = \"St\")");
        let expected = RuleGroup::and().rule(field("name").does_not_begin_with("St"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn mismatched_substring_needles_drop() {
        let parsed = parse("($substring(name, 0, $length(\"St\")) = \"Zz\" and a = 1)");
        let expected = RuleGroup::and().rule(field("a").eq(1_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn field_sourced_prefix_test() {
        let parsed = parse("($substring(full_name, 0, $length(first_name)) = first_name)");
        let expected =
            RuleGroup::and().rule(field("full_name").begins_with_field("first_name"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn membership_list() {
        let parsed = parse("last_name in [\"Vai\", \"Vaughan\"]");
        let expected = RuleGroup::and().rule(field("last_name").in_list("Vai, Vaughan"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn negated_membership_absorbs() {
        let parsed = parse("$not(x in [1, 2])");
        let expected = RuleGroup::and().rule(field("x").op(Operator::NotIn, "1, 2"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn membership_as_arrays() {
        let options = ParseOptions::new().lists_as_arrays(true);
        let parsed = parse_jsonata("n in [1, 2]", &options);
        let expected = RuleGroup::and().rule(
            field("n").in_list(RuleValue::List(vec![RuleValue::Int(1), RuleValue::Int(2)])),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn range_pair_stays_two_comparisons() {
        let parsed = parse("(age >= 26 and age <= 37)");
        let expected = RuleGroup::and()
            .rule(field("age").gte(26_i64))
            .rule(field("age").lte(37_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn negated_group_toggles_flag() {
        let parsed = parse("$not(a = 1 or b = 2)");
        let expected = RuleGroup::or()
            .rule(field("a").eq(1_i64))
            .rule(field("b").eq(2_i64))
            .negate();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn null_tests() {
        let parsed = parse("(email = null and phone != null)");
        let expected = RuleGroup::and()
            .rule(field("email").is_null())
            .rule(field("phone").is_not_null());
        assert_eq!(parsed, expected);
    }

    #[test]
    fn string_escapes_unwind() {
        let parsed = parse("note = \"say \\\"hi\\\"\"");
        let expected = RuleGroup::and().rule(field("note").eq("say \"hi\""));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn field_to_field_comparison() {
        let parsed = parse("first_name != last_name");
        let expected = RuleGroup::and().rule(field("first_name").neq_field("last_name"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn reversed_comparison_flips() {
        let parsed = parse("18 < age");
        let expected = RuleGroup::and().rule(field("age").gt(18_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn nested_groups_keep_structure() {
        let parsed = parse("(a = 1 and (b = 2 or c = 3))");
        let expected = RuleGroup::and().rule(field("a").eq(1_i64)).group(
            RuleGroup::or()
                .rule(field("b").eq(2_i64))
                .rule(field("c").eq(3_i64)),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn registry_filters_rules() {
        let options = ParseOptions::new().fields(FieldMap::new().field(Field::new("age")));
        let parsed = parse_jsonata("(age > 21 and nope = 1)", &options);
        let expected = RuleGroup::and().rule(field("age").gt(21_i64));
        assert_eq!(parsed, expected);
    }
}
