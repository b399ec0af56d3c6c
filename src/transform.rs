//! Conversions between the two tree shapes and whole-tree copy transforms.

use thiserror::Error;

use crate::parse::common::numeric_value;
use crate::types::{IcElement, QueryNode, RuleGroup, RuleGroupIc, RuleValue};

/// Shape violations found while converting an independent-combinator list
/// back to standard form.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("combinator token at operand position {index}")]
    MisplacedCombinator { index: usize },

    #[error("expected a combinator token at position {index}")]
    MissingCombinator { index: usize },

    #[error("combinator list ends on a dangling token")]
    DanglingCombinator,
}

/// Expand a standard tree into independent-combinator form by inserting the
/// group's combinator between every pair of adjacent children. Lossless.
#[must_use]
pub fn to_independent_combinators(query: &RuleGroup) -> RuleGroupIc {
    let mut rules = Vec::new();
    for (i, node) in query.rules.iter().enumerate() {
        if i > 0 {
            rules.push(IcElement::Combinator(query.combinator));
        }
        match node {
            QueryNode::Rule(rule) => rules.push(IcElement::Rule(rule.clone())),
            QueryNode::Group(group) => {
                rules.push(IcElement::Group(to_independent_combinators(group)));
            }
        }
    }
    RuleGroupIc {
        id: query.id.clone(),
        not: query.not,
        rules,
    }
}

/// Re-nest an independent-combinator list into standard form.
///
/// Combinator tokens bind left to right with no precedence: a run of equal
/// tokens accumulates siblings into one group, and a token change pushes the
/// accumulated group down as the first child of a fresh group under the new
/// token. So `a AND b OR c` becomes `{or: [{and: [a, b]}, c]}`.
///
/// An empty list yields an empty `and` group and a single operand a
/// one-element `and` group; the input's `id` and `not` stay on the outermost
/// result group.
pub fn to_standard_combinators(query: &RuleGroupIc) -> Result<RuleGroup, TransformError> {
    let mut operands = Vec::new();
    let mut tokens = Vec::new();
    for (index, element) in query.rules.iter().enumerate() {
        if index % 2 == 0 {
            match element {
                IcElement::Combinator(_) => {
                    return Err(TransformError::MisplacedCombinator { index });
                }
                IcElement::Rule(rule) => operands.push(QueryNode::Rule(rule.clone())),
                IcElement::Group(group) => {
                    operands.push(QueryNode::Group(to_standard_combinators(group)?));
                }
            }
        } else {
            match element {
                IcElement::Combinator(combinator) => tokens.push(*combinator),
                _ => return Err(TransformError::MissingCombinator { index }),
            }
        }
    }
    if query.rules.len() % 2 == 0 && !query.rules.is_empty() {
        return Err(TransformError::DanglingCombinator);
    }

    let mut operands = operands.into_iter();
    let mut group = match operands.next() {
        Some(first) => RuleGroup {
            id: None,
            combinator: tokens.first().copied().unwrap_or_default(),
            not: false,
            rules: vec![first],
        },
        None => RuleGroup::and(),
    };
    for (token, operand) in tokens.into_iter().zip(operands) {
        if token == group.combinator {
            group.rules.push(operand);
        } else {
            group = RuleGroup {
                id: None,
                combinator: token,
                not: false,
                rules: vec![QueryNode::Group(group), operand],
            };
        }
    }

    group.id = query.id.clone();
    group.not = query.not;
    Ok(group)
}

/// Recursive copy with every `id` removed.
#[must_use]
pub fn strip_ids(query: &RuleGroup) -> RuleGroup {
    RuleGroup {
        id: None,
        combinator: query.combinator,
        not: query.not,
        rules: query
            .rules
            .iter()
            .map(|node| match node {
                QueryNode::Rule(rule) => {
                    let mut rule = rule.clone();
                    rule.id = None;
                    QueryNode::Rule(rule)
                }
                QueryNode::Group(group) => QueryNode::Group(strip_ids(group)),
            })
            .collect(),
    }
}

/// Recursive copy with every `id` removed, independent-combinator form.
#[must_use]
pub fn strip_ids_ic(query: &RuleGroupIc) -> RuleGroupIc {
    RuleGroupIc {
        id: None,
        not: query.not,
        rules: query
            .rules
            .iter()
            .map(|element| match element {
                IcElement::Combinator(c) => IcElement::Combinator(*c),
                IcElement::Rule(rule) => {
                    let mut rule = rule.clone();
                    rule.id = None;
                    IcElement::Rule(rule)
                }
                IcElement::Group(group) => IcElement::Group(strip_ids_ic(group)),
            })
            .collect(),
    }
}

/// Recursive copy that turns string values holding full numeric literals
/// into numbers, element-wise inside lists. Everything else passes through.
#[must_use]
pub fn parse_number_values(query: &RuleGroup) -> RuleGroup {
    RuleGroup {
        id: query.id.clone(),
        combinator: query.combinator,
        not: query.not,
        rules: query
            .rules
            .iter()
            .map(|node| match node {
                QueryNode::Rule(rule) => {
                    let mut rule = rule.clone();
                    rule.value = coerce_numbers(&rule.value);
                    QueryNode::Rule(rule)
                }
                QueryNode::Group(group) => QueryNode::Group(parse_number_values(group)),
            })
            .collect(),
    }
}

/// [`parse_number_values`] for independent-combinator trees.
#[must_use]
pub fn parse_number_values_ic(query: &RuleGroupIc) -> RuleGroupIc {
    RuleGroupIc {
        id: query.id.clone(),
        not: query.not,
        rules: query
            .rules
            .iter()
            .map(|element| match element {
                IcElement::Combinator(c) => IcElement::Combinator(*c),
                IcElement::Rule(rule) => {
                    let mut rule = rule.clone();
                    rule.value = coerce_numbers(&rule.value);
                    IcElement::Rule(rule)
                }
                IcElement::Group(group) => IcElement::Group(parse_number_values_ic(group)),
            })
            .collect(),
    }
}

pub(crate) fn coerce_numbers(value: &RuleValue) -> RuleValue {
    match value {
        RuleValue::String(s) => numeric_value(s).unwrap_or_else(|| value.clone()),
        RuleValue::List(items) => RuleValue::List(items.iter().map(coerce_numbers).collect()),
        other => other.clone(),
    }
}
