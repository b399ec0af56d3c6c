//! SpEL boolean expressions.

use super::{FormatOptions, GroupRef, Node, Resolved};
use crate::transform::coerce_numbers;
use crate::types::{Combinator, Operator, Rule, RuleValue, ValueSource};
use crate::validate::ValidationState;

const FALLBACK: &str = "1 == 1";

pub(crate) fn render(query: GroupRef<'_>, options: &FormatOptions) -> String {
    let resolved = options.resolve();
    let state = ValidationState::compute(options.validator.as_ref(), query.as_query_ref());
    if state.tree_invalid() {
        return resolved.fallback_or(FALLBACK);
    }
    render_group(query, true, true, &state, options, &resolved)
}

fn render_group(
    group: GroupRef<'_>,
    outermost: bool,
    outermost_or_lonely: bool,
    state: &ValidationState,
    options: &FormatOptions,
    resolved: &Resolved,
) -> String {
    let fallback = resolved.fallback_or(FALLBACK);
    let children = match group.children() {
        Some(children) if state.id_is_valid(group.id()) => children,
        _ => {
            return if outermost_or_lonely {
                fallback
            } else {
                String::new()
            }
        }
    };
    if group.is_empty() {
        return fallback;
    }

    let lonely = group.raw_len() == 1;
    let (first, rest) = children;
    let mut joined = String::new();
    if let Some(node) = first {
        joined = render_node(node, lonely, state, options, resolved);
    }
    for (combinator, node) in rest {
        let fragment = render_node(node, lonely, state, options, resolved);
        if fragment.is_empty() {
            continue;
        }
        if joined.is_empty() {
            joined = fragment;
        } else {
            joined.push_str(match combinator {
                Combinator::And => " and ",
                Combinator::Or => " or ",
            });
            joined.push_str(&fragment);
        }
    }

    if group.not() {
        format!("!({joined})")
    } else if outermost {
        joined
    } else {
        format!("({joined})")
    }
}

fn render_node(
    node: Node<'_>,
    outermost_or_lonely: bool,
    state: &ValidationState,
    options: &FormatOptions,
    resolved: &Resolved,
) -> String {
    match node {
        Node::Group(group) => {
            render_group(group, false, outermost_or_lonely, state, options, resolved)
        }
        Node::Rule(rule) => render_rule(rule, state, options, resolved),
    }
}

fn render_rule(
    rule: &Rule,
    state: &ValidationState,
    options: &FormatOptions,
    resolved: &Resolved,
) -> String {
    if resolved.is_placeholder(rule) {
        return String::new();
    }
    if !state.rule_is_valid(rule, options.fields.as_ref()) {
        return String::new();
    }
    let value = if resolved.parse_numbers {
        coerce_numbers(&rule.value)
    } else {
        rule.value.clone()
    };
    let field_sourced = rule.value_source() == ValueSource::Field;
    rule_text(rule, &value, field_sourced, resolved).unwrap_or_default()
}

fn rule_text(
    rule: &Rule,
    value: &RuleValue,
    field_sourced: bool,
    resolved: &Resolved,
) -> Option<String> {
    let field = rule.field.as_str();
    Some(match &rule.operator {
        Operator::Eq => format!("{field} == {}", operand(value, field_sourced)?),
        Operator::Neq => format!("{field} != {}", operand(value, field_sourced)?),
        Operator::Lt => format!("{field} < {}", operand(value, field_sourced)?),
        Operator::Gt => format!("{field} > {}", operand(value, field_sourced)?),
        Operator::Lte => format!("{field} <= {}", operand(value, field_sourced)?),
        Operator::Gte => format!("{field} >= {}", operand(value, field_sourced)?),
        Operator::Contains => format!("{field} matches {}", regex(value, field_sourced, "", "")?),
        Operator::DoesNotContain => {
            format!("!({field} matches {})", regex(value, field_sourced, "", "")?)
        }
        Operator::BeginsWith => {
            format!("{field} matches {}", regex(value, field_sourced, "^", "")?)
        }
        Operator::DoesNotBeginWith => {
            format!("!({field} matches {})", regex(value, field_sourced, "^", "")?)
        }
        Operator::EndsWith => format!("{field} matches {}", regex(value, field_sourced, "", "$")?),
        Operator::DoesNotEndWith => {
            format!("!({field} matches {})", regex(value, field_sourced, "", "$")?)
        }
        Operator::Null => format!("{field} == null"),
        Operator::NotNull => format!("{field} != null"),
        Operator::In => format!("({})", disjunction(field, value, field_sourced, resolved)?),
        Operator::NotIn => {
            format!("!({})", disjunction(field, value, field_sourced, resolved)?)
        }
        Operator::Between => {
            let (low, high) = bounds(value, field_sourced, resolved)?;
            format!("({field} >= {low} and {field} <= {high})")
        }
        Operator::NotBetween => {
            let (low, high) = bounds(value, field_sourced, resolved)?;
            format!("!({field} >= {low} and {field} <= {high})")
        }
        Operator::Custom(_) => return None,
    })
}

fn operand(value: &RuleValue, field_sourced: bool) -> Option<String> {
    if field_sourced {
        value.as_str().map(str::to_owned)
    } else {
        Some(literal(value))
    }
}

fn regex(
    value: &RuleValue,
    field_sourced: bool,
    prefix: &str,
    suffix: &str,
) -> Option<String> {
    if field_sourced {
        return None;
    }
    let text = super::pattern_text(value)?;
    Some(quote(&format!("{prefix}{text}{suffix}")))
}

/// SpEL has no list literal in this position, so membership expands into a
/// chained `==` disjunction.
fn disjunction(
    field: &str,
    value: &RuleValue,
    field_sourced: bool,
    resolved: &Resolved,
) -> Option<String> {
    let items = super::coerced_list(value, resolved.parse_numbers);
    if items.is_empty() {
        return None;
    }
    let rendered: Vec<String> = items
        .iter()
        .map(|item| Some(format!("{field} == {}", operand(item, field_sourced)?)))
        .collect::<Option<_>>()?;
    Some(rendered.join(" or "))
}

fn bounds(
    value: &RuleValue,
    field_sourced: bool,
    resolved: &Resolved,
) -> Option<(String, String)> {
    let items = super::coerced_list(value, resolved.parse_numbers);
    if items.len() < 2 {
        return None;
    }
    Some((
        operand(&items[0], field_sourced)?,
        operand(&items[1], field_sourced)?,
    ))
}

fn literal(value: &RuleValue) -> String {
    match value {
        RuleValue::Null => "null".to_owned(),
        RuleValue::Bool(b) => b.to_string(),
        RuleValue::Int(i) => i.to_string(),
        RuleValue::Float(f) => f.to_string(),
        RuleValue::String(s) => quote(s),
        RuleValue::List(items) => {
            let rendered: Vec<String> = items.iter().map(literal).collect();
            format!("{{{}}}", rendered.join(", "))
        }
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::to_spel;
    use crate::types::{field, RuleGroup};
    use crate::validate::Validation;

    fn opts() -> FormatOptions {
        FormatOptions::new()
    }

    #[test]
    fn word_combinators() {
        let query = RuleGroup::or()
            .rule(field("first_name").eq("Steve"))
            .rule(field("age").gte(26_i64));
        assert_eq!(to_spel(&query, &opts()), "first_name == 'Steve' or age >= 26");
    }

    #[test]
    fn matches_with_anchors() {
        let query = RuleGroup::and()
            .rule(field("a").contains("x"))
            .rule(field("b").begins_with("y"))
            .rule(field("c").ends_with("z"));
        assert_eq!(
            to_spel(&query, &opts()),
            "a matches 'x' and b matches '^y' and c matches 'z$'"
        );
    }

    #[test]
    fn negated_matches() {
        let query = RuleGroup::and().rule(field("a").does_not_begin_with("y"));
        assert_eq!(to_spel(&query, &opts()), "!(a matches '^y')");
    }

    #[test]
    fn membership_expands_to_disjunction() {
        let query = RuleGroup::and().rule(field("last_name").in_list("Vai, Vaughan"));
        assert_eq!(
            to_spel(&query, &opts()),
            "(last_name == 'Vai' or last_name == 'Vaughan')"
        );
    }

    #[test]
    fn negated_membership() {
        let query = RuleGroup::and().rule(field("x").not_in_list(vec![1_i64, 2]));
        assert_eq!(to_spel(&query, &opts()), "!(x == 1 or x == 2)");
    }

    #[test]
    fn between_pair() {
        let query = RuleGroup::and().rule(field("age").between(26_i64, 37_i64));
        assert_eq!(to_spel(&query, &opts()), "(age >= 26 and age <= 37)");
    }

    #[test]
    fn nested_negated_group() {
        let query = RuleGroup::and().rule(field("a").eq(1_i64)).group(
            RuleGroup::or()
                .rule(field("b").eq(2_i64))
                .rule(field("c").eq(3_i64))
                .negate(),
        );
        assert_eq!(to_spel(&query, &opts()), "a == 1 and !(b == 2 or c == 3)");
    }

    #[test]
    fn string_quotes_are_doubled() {
        let query = RuleGroup::and().rule(field("name").eq("O'Hara"));
        assert_eq!(to_spel(&query, &opts()), "name == 'O''Hara'");
    }

    #[test]
    fn empty_group_renders_fallback() {
        assert_eq!(to_spel(&RuleGroup::and(), &opts()), "1 == 1");
    }

    #[test]
    fn tree_invalid_renders_fallback() {
        let query = RuleGroup::and().rule(field("a").eq(1_i64));
        let options = opts().validator(|_| Validation::Bool(false));
        assert_eq!(to_spel(&query, &options), "1 == 1");
    }

    #[test]
    fn field_valued_matches_drops() {
        let query = RuleGroup::and()
            .rule(field("bio").contains_field("nickname"))
            .rule(field("a").eq(1_i64));
        assert_eq!(to_spel(&query, &opts()), "a == 1");
    }
}
