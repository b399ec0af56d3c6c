//! SpEL import. Combinators arrive as `and`/`or` words (the symbolic forms
//! are accepted too), match modes as `matches` with an anchored regex, and
//! negation as a prefix `!` or `not`.

use winnow::ascii::Caseless;
use winnow::combinator::{alt, delimited, opt, preceded, repeat};
use winnow::error::{ContextError, ErrMode, ModalResult};
use winnow::prelude::*;

use crate::types::{field, Combinator, Operator, QueryNode, RuleGroup, RuleValue};

use super::common::{ident, number, single_quoted, word_boundary, ws};
use super::{into_group, keep_rule, negate_node, reverse_comparison, ParseOptions};

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
enum SpelExpr {
    Or(Box<SpelExpr>, Box<SpelExpr>),
    And(Box<SpelExpr>, Box<SpelExpr>),
    Not(Box<SpelExpr>),
    Paren(Box<SpelExpr>),
    Compare(SpelOperand, Operator, SpelOperand),
    Matches { target: SpelOperand, pattern: String },
}

#[derive(Clone, Debug)]
enum SpelOperand {
    Value(RuleValue),
    Ident(String),
}

// -- Grammar ----------------------------------------------------------------

fn kw<'i>(word: &'static str) -> impl Parser<&'i str, (), ErrMode<ContextError>> {
    (Caseless(word), word_boundary).void()
}

fn literal(input: &mut &str) -> ModalResult<RuleValue> {
    alt((
        single_quoted.map(RuleValue::String),
        kw("true").value(RuleValue::Bool(true)),
        kw("false").value(RuleValue::Bool(false)),
        kw("null").value(RuleValue::Null),
        number,
    ))
    .parse_next(input)
}

fn operand(input: &mut &str) -> ModalResult<SpelOperand> {
    ws.parse_next(input)?;
    alt((
        literal.map(SpelOperand::Value),
        ident.map(|name: &str| SpelOperand::Ident(name.to_owned())),
    ))
    .parse_next(input)
}

fn compare_op(input: &mut &str) -> ModalResult<Operator> {
    ws.parse_next(input)?;
    alt((
        "==".value(Operator::Eq),
        "!=".value(Operator::Neq),
        "<=".value(Operator::Lte),
        ">=".value(Operator::Gte),
        '<'.value(Operator::Lt),
        '>'.value(Operator::Gt),
    ))
    .parse_next(input)
}

fn predicate(input: &mut &str) -> ModalResult<SpelExpr> {
    let left = operand(input)?;
    ws.parse_next(input)?;
    if opt(kw("matches")).parse_next(input)?.is_some() {
        ws.parse_next(input)?;
        let pattern = single_quoted.parse_next(input)?;
        return Ok(SpelExpr::Matches {
            target: left,
            pattern,
        });
    }
    let operator = compare_op(input)?;
    let right = operand(input)?;
    Ok(SpelExpr::Compare(left, operator, right))
}

fn primary(input: &mut &str) -> ModalResult<SpelExpr> {
    ws.parse_next(input)?;
    alt((
        delimited('(', expression, (ws, ')')).map(|inner| SpelExpr::Paren(Box::new(inner))),
        predicate,
    ))
    .parse_next(input)
}

fn unary(input: &mut &str) -> ModalResult<SpelExpr> {
    ws.parse_next(input)?;
    if opt(alt(('!'.void(), kw("not")))).parse_next(input)?.is_some() {
        let inner = unary(input)?;
        Ok(SpelExpr::Not(Box::new(inner)))
    } else {
        primary(input)
    }
}

fn and_expr(input: &mut &str) -> ModalResult<SpelExpr> {
    let first = unary(input)?;
    let rest: Vec<SpelExpr> =
        repeat(0.., preceded((ws, alt((kw("and"), "&&".void()))), unary)).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| SpelExpr::And(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut &str) -> ModalResult<SpelExpr> {
    let first = and_expr(input)?;
    let rest: Vec<SpelExpr> =
        repeat(0.., preceded((ws, alt((kw("or"), "||".void()))), and_expr)).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| SpelExpr::Or(Box::new(acc), Box::new(r))))
}

fn expression(input: &mut &str) -> ModalResult<SpelExpr> {
    ws.parse_next(input)?;
    or_expr(input)
}

// -- Builder ----------------------------------------------------------------

fn node(expr: &SpelExpr, options: &ParseOptions) -> Option<QueryNode> {
    match expr {
        SpelExpr::Or(..) => chain(expr, Combinator::Or, options),
        SpelExpr::And(..) => chain(expr, Combinator::And, options),
        SpelExpr::Not(inner) => node(inner, options).map(negate_node),
        SpelExpr::Paren(inner) => node(inner, options),
        SpelExpr::Compare(left, operator, right) => {
            compare_node(left, operator.clone(), right, options)
        }
        SpelExpr::Matches { target, pattern } => matches_node(target, pattern, options),
    }
}

fn chain(expr: &SpelExpr, combinator: Combinator, options: &ParseOptions) -> Option<QueryNode> {
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

fn collect(expr: &SpelExpr, combinator: Combinator, options: &ParseOptions, out: &mut Vec<QueryNode>) {
    match (expr, combinator) {
        (SpelExpr::And(left, right), Combinator::And)
        | (SpelExpr::Or(left, right), Combinator::Or) => {
            collect(left, combinator, options, out);
            collect(right, combinator, options, out);
        }
        _ => out.extend(node(expr, options)),
    }
}

fn compare_node(
    left: &SpelOperand,
    operator: Operator,
    right: &SpelOperand,
    options: &ParseOptions,
) -> Option<QueryNode> {
    match (left, right) {
        (SpelOperand::Ident(name), SpelOperand::Ident(other)) => {
            keep_rule(field(name).op_field(operator, other), options)
        }
        (SpelOperand::Ident(name), SpelOperand::Value(value)) => {
            literal_rule(name, operator, value.clone(), options)
        }
        (SpelOperand::Value(value), SpelOperand::Ident(name)) => {
            literal_rule(name, reverse_comparison(operator), value.clone(), options)
        }
        (SpelOperand::Value(_), SpelOperand::Value(_)) => None,
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

/// Regex anchors pick the operator: `^v` begins-with, `v$` ends-with, bare
/// patterns are contains.
fn matches_node(
    target: &SpelOperand,
    pattern: &str,
    options: &ParseOptions,
) -> Option<QueryNode> {
    let SpelOperand::Ident(name) = target else {
        return None;
    };
    let (operator, text) = if let Some(rest) = pattern.strip_prefix('^') {
        (Operator::BeginsWith, rest)
    } else if let Some(rest) = pattern.strip_suffix('$') {
        (Operator::EndsWith, rest)
    } else {
        (Operator::Contains, pattern)
    };
    keep_rule(field(name).op(operator, text), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_spel;
    use crate::types::{Field, FieldMap};

    fn parse(input: &str) -> RuleGroup {
        parse_spel(input, &ParseOptions::new())
    }

    #[test]
    fn word_combinators() {
        let parsed = parse("first_name == 'Steve' or age >= 26");
        let expected = RuleGroup::or()
            .rule(field("first_name").eq("Steve"))
            .rule(field("age").gte(26_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn symbolic_combinators() {
        let parsed = parse("a == 1 && b == 2 || c == 3");
        let expected = RuleGroup::or()
            .group(RuleGroup::and().rule(field("a").eq(1_i64)).rule(field("b").eq(2_i64)))
            .rule(field("c").eq(3_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn malformed_input_yields_empty_group() {
        assert_eq!(parse("or or"), RuleGroup::default());
        assert_eq!(parse("a == 1 trailing"), RuleGroup::default());
        assert_eq!(parse(""), RuleGroup::default());
    }

    #[test]
    fn matches_anchors() {
        let parsed = parse("a matches 'x' and b matches '^y' and c matches 'z$'");
        let expected = RuleGroup::and()
            .rule(field("a").contains("x"))
            .rule(field("b").begins_with("y"))
            .rule(field("c").ends_with("z"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn negated_matches_absorbs() {
        let parsed = parse("!(a matches '^y')");
        let expected = RuleGroup::and().rule(field("a").does_not_begin_with("y"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn membership_disjunction_stays_a_group() {
        let parsed = parse("(last_name == 'Vai' or last_name == 'Vaughan')");
        let expected = RuleGroup::or()
            .rule(field("last_name").eq("Vai"))
            .rule(field("last_name").eq("Vaughan"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn negated_disjunction_toggles_group() {
        let parsed = parse("!(x == 1 or x == 2)");
        let expected = RuleGroup::or()
            .rule(field("x").eq(1_i64))
            .rule(field("x").eq(2_i64))
            .negate();
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
    fn nested_negated_group() {
        let parsed = parse("a == 1 and !(b == 2 or c == 3)");
        let expected = RuleGroup::and().rule(field("a").eq(1_i64)).group(
            RuleGroup::or()
                .rule(field("b").eq(2_i64))
                .rule(field("c").eq(3_i64))
                .negate(),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_keyword_wraps() {
        let parsed = parse("not (a == 1)");
        match &parsed.rules[0] {
            QueryNode::Group(group) => assert!(group.not),
            QueryNode::Rule(_) => panic!("expected a negated group"),
        }
    }

    #[test]
    fn doubled_quotes_unwind() {
        let parsed = parse("name == 'O''Hara'");
        let expected = RuleGroup::and().rule(field("name").eq("O'Hara"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn null_tests() {
        let parsed = parse("email == null and phone != null");
        let expected = RuleGroup::and()
            .rule(field("email").is_null())
            .rule(field("phone").is_not_null());
        assert_eq!(parsed, expected);
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let parsed = parse("a == 1 AND b == 2");
        let expected = RuleGroup::and()
            .rule(field("a").eq(1_i64))
            .rule(field("b").eq(2_i64));
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
    fn registry_filters_rules() {
        let options = ParseOptions::new().fields(FieldMap::new().field(Field::new("age")));
        let parsed = parse_spel("age > 21 and nope == 1", &options);
        let expected = RuleGroup::and().rule(field("age").gt(21_i64));
        assert_eq!(parsed, expected);
    }
}
