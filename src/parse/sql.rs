//! SQL import: a bare boolean expression or a full `SELECT` statement.
//!
//! Grammar is two-stage. A winnow pass builds a small expression AST, then a
//! builder walks it resolving placeholders and mapping LIKE patterns onto
//! canonical operators. Precedence is `OR < AND < NOT < predicate`.

use winnow::ascii::Caseless;
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated, terminated};
use winnow::error::{ContextError, ErrMode, ModalResult};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::types::{field, Combinator, Operator, QueryNode, Rule, RuleGroup, RuleValue};

use super::common::{ident, number, single_quoted, word_boundary, ws};
use super::{into_group, keep_rule, negate_node, pack_list, reverse_comparison, SqlParseOptions};

pub(crate) fn parse(input: &str, options: &SqlParseOptions) -> RuleGroup {
    let Some(text) = where_clause(input) else {
        return RuleGroup::default();
    };
    let mut stream = text;
    let Ok(ast) = expression(&mut stream) else {
        return RuleGroup::default();
    };
    if !trailing_ignorable(stream) {
        return RuleGroup::default();
    }
    let mut builder = TreeBuilder::new(options);
    into_group(builder.node(&ast))
}

/// Locate the boolean expression to parse. Bare input is taken whole; a
/// `SELECT` statement contributes everything after its `WHERE` keyword.
fn where_clause(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if !keyword_at(trimmed, 0, "select") {
        return Some(trimmed);
    }
    let mut in_string = false;
    let mut prev_word = true;
    for (i, c) in trimmed.char_indices() {
        if in_string {
            if c == '\'' {
                in_string = false;
            }
        } else if c == '\'' {
            in_string = true;
        } else if !prev_word && keyword_at(trimmed, i, "where") {
            return Some(&trimmed[i + "where".len()..]);
        }
        prev_word = c.is_ascii_alphanumeric() || c == '_';
    }
    None
}

/// Content allowed after the parsed expression: nothing, a statement
/// terminator, or a trailing clause we ignore wholesale.
fn trailing_ignorable(rest: &str) -> bool {
    let rest = rest.trim_start();
    if rest.is_empty() || rest.starts_with(';') {
        return true;
    }
    ["group", "order", "limit", "having", "offset"]
        .iter()
        .any(|word| keyword_at(rest, 0, word))
}

fn keyword_at(text: &str, at: usize, word: &str) -> bool {
    let end = at + word.len();
    if end > text.len() || !text.is_char_boundary(end) {
        return false;
    }
    if !text[at..end].eq_ignore_ascii_case(word) {
        return false;
    }
    text[end..]
        .chars()
        .next()
        .map_or(true, |c| !c.is_ascii_alphanumeric() && c != '_')
}

// -- AST --------------------------------------------------------------------

#[derive(Clone, Debug)]
enum SqlExpr {
    Or(Box<SqlExpr>, Box<SqlExpr>),
    And(Box<SqlExpr>, Box<SqlExpr>),
    Not(Box<SqlExpr>),
    Paren(Box<SqlExpr>),
    Predicate { left: SqlOperand, tail: Tail },
}

#[derive(Clone, Debug)]
enum SqlOperand {
    Value(RuleValue),
    Ident(String),
    /// `?`, resolved positionally at build time.
    Positional,
    /// Named placeholder with its sigil, e.g. `:age`.
    Named(String),
    /// `||` chain or `CONCAT(..)` call, kept raw for LIKE shape matching.
    Concat(Vec<SqlOperand>),
}

#[derive(Clone, Debug)]
enum Tail {
    Compare(Operator, SqlOperand),
    Like { negated: bool, pattern: SqlOperand },
    Null { negated: bool },
    In { negated: bool, items: Vec<SqlOperand> },
    Between { negated: bool, low: SqlOperand, high: SqlOperand },
}

// -- Grammar ----------------------------------------------------------------

fn kw<'i>(word: &'static str) -> impl Parser<&'i str, (), ErrMode<ContextError>> {
    (Caseless(word), word_boundary).void()
}

fn literal(input: &mut &str) -> ModalResult<RuleValue> {
    ws.parse_next(input)?;
    alt((
        single_quoted.map(RuleValue::String),
        terminated(Caseless("true"), word_boundary).value(RuleValue::Bool(true)),
        terminated(Caseless("false"), word_boundary).value(RuleValue::Bool(false)),
        terminated(Caseless("null"), word_boundary).value(RuleValue::Null),
        number,
    ))
    .parse_next(input)
}

/// Bare, double-quoted, backtick-quoted, or bracketed identifier.
fn field_ref(input: &mut &str) -> ModalResult<String> {
    alt((
        delimited('"', take_while(1.., |c: char| c != '"'), '"'),
        delimited('`', take_while(1.., |c: char| c != '`'), '`'),
        delimited('[', take_while(1.., |c: char| c != ']'), ']'),
        ident,
    ))
    .map(|name: &str| name.to_owned())
    .parse_next(input)
}

fn named_param(input: &mut &str) -> ModalResult<SqlOperand> {
    (one_of((':', '@', '$')), ident)
        .take()
        .map(|text: &str| SqlOperand::Named(text.to_owned()))
        .parse_next(input)
}

fn concat_call(input: &mut &str) -> ModalResult<SqlOperand> {
    (kw("concat"), ws, '(').parse_next(input)?;
    let parts: Vec<SqlOperand> = separated(1.., operand_atom, (ws, ',')).parse_next(input)?;
    (ws, ')').parse_next(input)?;
    Ok(SqlOperand::Concat(parts))
}

fn operand_atom(input: &mut &str) -> ModalResult<SqlOperand> {
    ws.parse_next(input)?;
    alt((
        concat_call,
        '?'.value(SqlOperand::Positional),
        named_param,
        literal.map(SqlOperand::Value),
        field_ref.map(SqlOperand::Ident),
    ))
    .parse_next(input)
}

/// An atom optionally followed by `||` concatenation.
fn operand_chain(input: &mut &str) -> ModalResult<SqlOperand> {
    let first = operand_atom(input)?;
    let rest: Vec<SqlOperand> =
        repeat(0.., preceded((ws, "||"), operand_atom)).parse_next(input)?;
    if rest.is_empty() {
        Ok(first)
    } else {
        let mut parts = vec![first];
        parts.extend(rest);
        Ok(SqlOperand::Concat(parts))
    }
}

fn compare_op(input: &mut &str) -> ModalResult<Operator> {
    ws.parse_next(input)?;
    alt((
        ">=".value(Operator::Gte),
        "<=".value(Operator::Lte),
        "<>".value(Operator::Neq),
        "!=".value(Operator::Neq),
        '='.value(Operator::Eq),
        '>'.value(Operator::Gt),
        '<'.value(Operator::Lt),
    ))
    .parse_next(input)
}

fn null_tail(input: &mut &str) -> ModalResult<Tail> {
    (kw("is"), ws).parse_next(input)?;
    alt((
        (kw("not"), ws, kw("null")).value(Tail::Null { negated: true }),
        kw("null").value(Tail::Null { negated: false }),
    ))
    .parse_next(input)
}

fn in_list(input: &mut &str) -> ModalResult<Vec<SqlOperand>> {
    (kw("in"), ws, '(').parse_next(input)?;
    let items: Vec<SqlOperand> = separated(1.., operand_atom, (ws, ',')).parse_next(input)?;
    (ws, ')').parse_next(input)?;
    Ok(items)
}

fn between_pair(input: &mut &str) -> ModalResult<(SqlOperand, SqlOperand)> {
    kw("between").parse_next(input)?;
    let low = operand_atom(input)?;
    (ws, kw("and")).parse_next(input)?;
    let high = operand_atom(input)?;
    Ok((low, high))
}

fn like_in_between<'i>(negated: bool) -> impl Parser<&'i str, Tail, ErrMode<ContextError>> {
    alt((
        preceded((kw("like"), ws), operand_chain)
            .map(move |pattern| Tail::Like { negated, pattern }),
        in_list.map(move |items| Tail::In { negated, items }),
        between_pair.map(move |(low, high)| Tail::Between { negated, low, high }),
    ))
}

fn negated_tail(input: &mut &str) -> ModalResult<Tail> {
    (kw("not"), ws).parse_next(input)?;
    like_in_between(true).parse_next(input)
}

fn plain_tail(input: &mut &str) -> ModalResult<Tail> {
    like_in_between(false).parse_next(input)
}

fn compare_tail(input: &mut &str) -> ModalResult<Tail> {
    let op = compare_op(input)?;
    let right = operand_chain(input)?;
    Ok(Tail::Compare(op, right))
}

fn predicate_tail(input: &mut &str) -> ModalResult<Tail> {
    ws.parse_next(input)?;
    alt((null_tail, negated_tail, plain_tail, compare_tail)).parse_next(input)
}

fn predicate(input: &mut &str) -> ModalResult<SqlExpr> {
    let left = operand_chain(input)?;
    let tail = predicate_tail(input)?;
    Ok(SqlExpr::Predicate { left, tail })
}

fn primary(input: &mut &str) -> ModalResult<SqlExpr> {
    ws.parse_next(input)?;
    alt((
        delimited('(', expression, (ws, ')')).map(|inner| SqlExpr::Paren(Box::new(inner))),
        predicate,
    ))
    .parse_next(input)
}

fn unary(input: &mut &str) -> ModalResult<SqlExpr> {
    ws.parse_next(input)?;
    if opt(terminated(kw("not"), ws)).parse_next(input)?.is_some() {
        let inner = unary(input)?;
        Ok(SqlExpr::Not(Box::new(inner)))
    } else {
        primary(input)
    }
}

fn and_expr(input: &mut &str) -> ModalResult<SqlExpr> {
    let first = unary(input)?;
    let rest: Vec<SqlExpr> =
        repeat(0.., preceded((ws, kw("and")), unary)).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| SqlExpr::And(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut &str) -> ModalResult<SqlExpr> {
    let first = and_expr(input)?;
    let rest: Vec<SqlExpr> =
        repeat(0.., preceded((ws, kw("or")), and_expr)).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| SqlExpr::Or(Box::new(acc), Box::new(r))))
}

fn expression(input: &mut &str) -> ModalResult<SqlExpr> {
    ws.parse_next(input)?;
    or_expr(input)
}

// -- Tree building ----------------------------------------------------------

struct TreeBuilder<'o> {
    options: &'o SqlParseOptions,
    next_param: usize,
}

impl<'o> TreeBuilder<'o> {
    fn new(options: &'o SqlParseOptions) -> TreeBuilder<'o> {
        TreeBuilder {
            options,
            next_param: 0,
        }
    }

    fn node(&mut self, expr: &SqlExpr) -> Option<QueryNode> {
        match expr {
            SqlExpr::Or(..) | SqlExpr::And(..) => self.chain(expr),
            SqlExpr::Not(inner) => self.node(inner).map(negate_node),
            SqlExpr::Paren(inner) => self.node(inner),
            SqlExpr::Predicate { left, tail } => self.predicate(left, tail),
        }
    }

    /// Flatten a run of the same combinator into one group. A lone survivor
    /// is returned bare; an empty run drops.
    fn chain(&mut self, expr: &SqlExpr) -> Option<QueryNode> {
        let combinator = match expr {
            SqlExpr::Or(..) => Combinator::Or,
            _ => Combinator::And,
        };
        let mut children = Vec::new();
        self.collect(expr, combinator, &mut children);
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(QueryNode::Group(RuleGroup {
                id: None,
                combinator,
                not: false,
                rules: children,
            })),
        }
    }

    fn collect(&mut self, expr: &SqlExpr, combinator: Combinator, out: &mut Vec<QueryNode>) {
        match expr {
            SqlExpr::And(l, r) if combinator == Combinator::And => {
                self.collect(l, combinator, out);
                self.collect(r, combinator, out);
            }
            SqlExpr::Or(l, r) if combinator == Combinator::Or => {
                self.collect(l, combinator, out);
                self.collect(r, combinator, out);
            }
            other => out.extend(self.node(other)),
        }
    }

    fn predicate(&mut self, left: &SqlOperand, tail: &Tail) -> Option<QueryNode> {
        match tail {
            Tail::Compare(op, right) => self.comparison(op.clone(), left, right),
            Tail::Like { negated, pattern } => self.like(left, *negated, pattern),
            Tail::Null { negated } => {
                let name = ident_name(left)?;
                let operator = if *negated {
                    Operator::NotNull
                } else {
                    Operator::Null
                };
                self.keep(field(name).op(operator, RuleValue::Null))
            }
            Tail::In { negated, items } => {
                // Resolve every item first so positional placeholders stay
                // aligned even when the rule ends up dropped.
                let resolved: Vec<Option<RuleValue>> =
                    items.iter().map(|item| self.scalar(item)).collect();
                let name = ident_name(left)?;
                let values: Vec<RuleValue> = resolved.into_iter().collect::<Option<_>>()?;
                if values.is_empty() {
                    return None;
                }
                let operator = if *negated { Operator::NotIn } else { Operator::In };
                let value = pack_list(values, ", ", &self.options.common);
                self.keep(field(name).op(operator, value))
            }
            Tail::Between { negated, low, high } => {
                let low_value = self.scalar(low);
                let high_value = self.scalar(high);
                let name = ident_name(left)?;
                let pair = vec![low_value?, high_value?];
                let operator = if *negated {
                    Operator::NotBetween
                } else {
                    Operator::Between
                };
                let value = pack_list(pair, ",", &self.options.common);
                self.keep(field(name).op(operator, value))
            }
        }
    }

    fn comparison(
        &mut self,
        op: Operator,
        left: &SqlOperand,
        right: &SqlOperand,
    ) -> Option<QueryNode> {
        match (left, right) {
            (SqlOperand::Ident(name), SqlOperand::Ident(other)) => {
                self.keep(field(name).op_field(op, other))
            }
            (SqlOperand::Ident(name), _) => {
                let value = self.scalar(right)?;
                self.keep(field(name).op(op, value))
            }
            (_, SqlOperand::Ident(name)) => {
                let value = self.scalar(left)?;
                self.keep(field(name).op(reverse_comparison(op), value))
            }
            _ => {
                let _ = self.scalar(left);
                let _ = self.scalar(right);
                None
            }
        }
    }

    fn like(&mut self, left: &SqlOperand, negated: bool, pattern: &SqlOperand) -> Option<QueryNode> {
        match pattern {
            SqlOperand::Concat(parts) => {
                let name = ident_name(left)?;
                let (operator, other) = concat_shape(parts)?;
                let operator = if negated { operator.negated()? } else { operator };
                self.keep(field(name).op_field(operator, other))
            }
            // LIKE against a plain field reference has no wildcard, so it is
            // equality in disguise.
            SqlOperand::Ident(other) => {
                let name = ident_name(left)?;
                let operator = if negated { Operator::Neq } else { Operator::Eq };
                self.keep(field(name).op_field(operator, other))
            }
            _ => {
                let value = self.scalar(pattern);
                let name = ident_name(left)?;
                match value? {
                    RuleValue::String(text) => {
                        let (operator, inner) = wildcard_shape(&text, negated)?;
                        self.keep(field(name).op(operator, inner))
                    }
                    other => {
                        let operator = if negated { Operator::Neq } else { Operator::Eq };
                        self.keep(field(name).op(operator, other))
                    }
                }
            }
        }
    }

    /// Resolve an operand to a literal value. Positional placeholders always
    /// advance the cursor, resolved or not.
    fn scalar(&mut self, operand: &SqlOperand) -> Option<RuleValue> {
        match operand {
            SqlOperand::Value(value) => Some(value.clone()),
            SqlOperand::Positional => {
                let index = self.next_param;
                self.next_param += 1;
                self.options.params.get(index).cloned()
            }
            SqlOperand::Named(text) => {
                let prefix = self.options.param_prefix.as_deref().unwrap_or(":");
                let named = &self.options.params_named;
                match text.strip_prefix(prefix) {
                    Some(name) => named.get(name).or_else(|| named.get(text.as_str())).cloned(),
                    None => named.get(text.as_str()).cloned(),
                }
            }
            SqlOperand::Ident(_) | SqlOperand::Concat(_) => None,
        }
    }

    fn keep(&self, rule: Rule) -> Option<QueryNode> {
        keep_rule(rule, &self.options.common)
    }
}

fn ident_name(operand: &SqlOperand) -> Option<&str> {
    match operand {
        SqlOperand::Ident(name) => Some(name),
        _ => None,
    }
}

/// Map a LIKE pattern onto a canonical operator by its `%` positions.
fn wildcard_shape(text: &str, negated: bool) -> Option<(Operator, String)> {
    let lead = text.starts_with('%');
    let trail = text.len() > usize::from(lead) && text.ends_with('%');
    let inner = text[usize::from(lead)..text.len() - usize::from(trail)].to_owned();
    let operator = match (lead, trail) {
        (true, true) => Operator::Contains,
        (false, true) => Operator::BeginsWith,
        (true, false) => Operator::EndsWith,
        (false, false) => Operator::Eq,
    };
    if !negated {
        return Some((operator, inner));
    }
    match operator {
        Operator::Eq => Some((Operator::Neq, inner)),
        other => other.negated().map(|negation| (negation, inner)),
    }
}

/// Recognize `'%' || field`, `field || '%'`, and `'%' || field || '%'`.
fn concat_shape(parts: &[SqlOperand]) -> Option<(Operator, &str)> {
    let is_pct =
        |part: &SqlOperand| matches!(part, SqlOperand::Value(RuleValue::String(s)) if s == "%");
    match parts {
        [lead, SqlOperand::Ident(name)] if is_pct(lead) => Some((Operator::EndsWith, name.as_str())),
        [SqlOperand::Ident(name), trail] if is_pct(trail) => {
            Some((Operator::BeginsWith, name.as_str()))
        }
        [lead, SqlOperand::Ident(name), trail] if is_pct(lead) && is_pct(trail) => {
            Some((Operator::Contains, name.as_str()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_sql;
    use crate::types::{Field, FieldMap, ValueSource};

    fn parse(input: &str) -> RuleGroup {
        parse_sql(input, &SqlParseOptions::new())
    }

    #[test]
    fn select_statement_where_clause() {
        let parsed = parse(
            "SELECT * FROM t WHERE first_name LIKE 'Stev%' AND last_name in ('Vai','Vaughan')",
        );
        let expected = RuleGroup::and()
            .rule(field("first_name").begins_with("Stev"))
            .rule(field("last_name").in_list("Vai, Vaughan"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn bare_expression() {
        let parsed = parse("age >= 21");
        let expected = RuleGroup::and().rule(field("age").gte(21_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn malformed_input_yields_empty_group() {
        assert_eq!(parse("age >"), RuleGroup::default());
        assert_eq!(parse("%%%"), RuleGroup::default());
        assert_eq!(parse("a = 1 extra garbage"), RuleGroup::default());
    }

    #[test]
    fn select_without_where_yields_empty_group() {
        assert_eq!(parse("SELECT * FROM t"), RuleGroup::default());
    }

    #[test]
    fn trailing_clauses_ignored() {
        let expected = RuleGroup::and().rule(field("age").gt(21_i64));
        assert_eq!(parse("SELECT id FROM t WHERE age > 21 ORDER BY id;"), expected);
        assert_eq!(parse("age > 21;"), expected);
        assert_eq!(parse("SELECT id FROM t WHERE age > 21 LIMIT 10 OFFSET 5"), expected);
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let parsed = parse("a = 1 or b = 2 and c = 3");
        let expected = RuleGroup::or().rule(field("a").eq(1_i64)).group(
            RuleGroup::and()
                .rule(field("b").eq(2_i64))
                .rule(field("c").eq(3_i64)),
        );
        assert_eq!(parsed, expected);
    }

    #[test]
    fn parentheses_nest_groups() {
        let parsed = parse("(a = 1 or b = 2) and c = 3");
        let expected = RuleGroup::and()
            .group(
                RuleGroup::or()
                    .rule(field("a").eq(1_i64))
                    .rule(field("b").eq(2_i64)),
            )
            .rule(field("c").eq(3_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn same_combinator_chain_flattens() {
        let parsed = parse("a = 1 and b = 2 and c = 3");
        assert_eq!(parsed.rules.len(), 3);
        assert_eq!(parsed.combinator, Combinator::And);
    }

    #[test]
    fn not_absorbs_into_negatable_operator() {
        let parsed = parse("NOT first_name LIKE '%Stev%'");
        let expected = RuleGroup::and().rule(field("first_name").does_not_contain("Stev"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_like_absorbs() {
        let parsed = parse("name not like 'St%'");
        let expected = RuleGroup::and().rule(field("name").does_not_begin_with("St"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_over_equality_wraps_group() {
        let parsed = parse("NOT (a = 1)");
        match &parsed.rules[0] {
            QueryNode::Group(group) => {
                assert!(group.not);
                assert_eq!(group.rules.len(), 1);
            }
            QueryNode::Rule(_) => panic!("expected a negated group"),
        }
    }

    #[test]
    fn not_over_group_sets_flag() {
        let parsed = parse("NOT (a = 1 AND b = 2)");
        match &parsed.rules[0] {
            QueryNode::Group(group) => {
                assert!(group.not);
                assert_eq!(group.rules.len(), 2);
            }
            QueryNode::Rule(_) => panic!("expected a group"),
        }
    }

    #[test]
    fn null_tests() {
        let parsed = parse("middle_name IS NULL and suffix IS NOT NULL");
        let expected = RuleGroup::and()
            .rule(field("middle_name").is_null())
            .rule(field("suffix").is_not_null());
        assert_eq!(parsed, expected);
    }

    #[test]
    fn between_joins_with_bare_comma() {
        let parsed = parse("age between 21 and 65");
        let expected = RuleGroup::and().rule(field("age").op(Operator::Between, "21,65"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_between() {
        let parsed = parse("age not between 21 and 65");
        let expected = RuleGroup::and().rule(field("age").op(Operator::NotBetween, "21,65"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn positional_params_resolve_in_order() {
        let options = SqlParseOptions::new()
            .params(vec![RuleValue::from(21_i64), RuleValue::from("Bob")]);
        let parsed = parse_sql("age > ? and name = ?", &options);
        let expected = RuleGroup::and()
            .rule(field("age").gt(21_i64))
            .rule(field("name").eq("Bob"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn missing_positional_param_drops_rule() {
        let options = SqlParseOptions::new().params(vec![RuleValue::from(21_i64)]);
        let parsed = parse_sql("age > ? and name = ?", &options);
        let expected = RuleGroup::and().rule(field("age").gt(21_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn named_params_resolve() {
        let options = SqlParseOptions::new().params_named([("min", 21_i64)]);
        let parsed = parse_sql("age >= :min", &options);
        let expected = RuleGroup::and().rule(field("age").gte(21_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn named_param_prefix_configurable() {
        let options = SqlParseOptions::new()
            .params_named([("min", 21_i64)])
            .param_prefix("$");
        let parsed = parse_sql("age >= $min", &options);
        let expected = RuleGroup::and().rule(field("age").gte(21_i64));
        assert_eq!(parsed, expected);
        // the default prefix no longer resolves
        assert_eq!(parse_sql("age >= :min", &options), RuleGroup::default());
    }

    #[test]
    fn field_to_field_comparison() {
        let parsed = parse("first_name = last_name");
        let expected = RuleGroup::and().rule(field("first_name").eq_field("last_name"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn reversed_comparison_flips_operator() {
        let parsed = parse("18 < age");
        let expected = RuleGroup::and().rule(field("age").gt(18_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn like_concat_maps_to_field_sourced_wildcard() {
        let parsed = parse("name like '%' || last_name || '%'");
        let expected = RuleGroup::and().rule(field("name").contains_field("last_name"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn like_concat_function_style() {
        let parsed = parse("name like CONCAT(last_name, '%')");
        let expected = RuleGroup::and().rule(field("name").begins_with_field("last_name"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn like_without_wildcard_is_equality() {
        let parsed = parse("name like 'Steve'");
        let expected = RuleGroup::and().rule(field("name").eq("Steve"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn like_with_number_param_is_equality() {
        let options = SqlParseOptions::new().params(vec![RuleValue::from(42_i64)]);
        let parsed = parse_sql("code like ?", &options);
        let expected = RuleGroup::and().rule(field("code").eq(42_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn field_registry_drops_unknown_fields() {
        let options = SqlParseOptions::new()
            .fields(FieldMap::new().field(Field::new("age")));
        let parsed = parse_sql("age > 21 and nope = 'x'", &options);
        let expected = RuleGroup::and().rule(field("age").gt(21_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn field_valued_rules_checked_against_registry() {
        let registry = FieldMap::new()
            .field(Field::new("a").with_value_sources(vec![ValueSource::Value, ValueSource::Field]))
            .field(Field::new("b"));
        let options = SqlParseOptions::new().fields(registry);
        let parsed = parse_sql("a = b and a = zzz", &options);
        let expected = RuleGroup::and().rule(field("a").eq_field("b"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn lists_as_arrays_keeps_real_lists() {
        let options = SqlParseOptions::new().lists_as_arrays(true);
        let parsed = parse_sql("last_name in ('Vai', 'Vaughan')", &options);
        let expected = RuleGroup::and().rule(field("last_name").in_list(RuleValue::List(vec![
            RuleValue::from("Vai"),
            RuleValue::from("Vaughan"),
        ])));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn quoted_identifiers() {
        let parsed = parse("\"first name\" = 'x' and [last name] = 'y' and `nick` = 'z'");
        let expected = RuleGroup::and()
            .rule(field("first name").eq("x"))
            .rule(field("last name").eq("y"))
            .rule(field("nick").eq("z"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn literal_only_comparison_drops() {
        assert_eq!(parse("1 = 1"), RuleGroup::default());
        assert_eq!(parse("(1 = 1)"), RuleGroup::default());
    }

    #[test]
    fn dropped_sibling_collapses_wrapper() {
        let options = SqlParseOptions::new()
            .fields(FieldMap::new().field(Field::new("a")));
        let parsed = parse_sql("(a = 1 and bad = 2) or a = 3", &options);
        let expected = RuleGroup::or()
            .rule(field("a").eq(1_i64))
            .rule(field("a").eq(3_i64));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn in_list_strings_join_with_comma_space() {
        let parsed = parse("last_name IN ('Vai', 'Vaughan')");
        let expected = RuleGroup::and().rule(field("last_name").in_list("Vai, Vaughan"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn not_in_list() {
        let parsed = parse("last_name NOT IN ('Vai')");
        let expected = RuleGroup::and().rule(field("last_name").not_in_list("Vai"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn case_insensitive_keywords() {
        let parsed = parse("a like 'x%' AND b Is Null oR c BETWEEN 1 aNd 2");
        assert_eq!(parsed.combinator, Combinator::Or);
        assert_eq!(parsed.rules.len(), 2);
    }

    #[test]
    fn string_with_quote_doubling() {
        let parsed = parse("name = 'O''Brien'");
        let expected = RuleGroup::and().rule(field("name").eq("O'Brien"));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn where_keyword_inside_string_not_split() {
        let parsed = parse("SELECT * FROM t WHERE note = 'where it began'");
        let expected = RuleGroup::and().rule(field("note").eq("where it began"));
        assert_eq!(parsed, expected);
    }
}
