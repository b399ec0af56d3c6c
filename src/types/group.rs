use serde::{Deserialize, Serialize};

use super::{Combinator, Rule};

/// Child of a standard group: either a leaf rule or a nested group.
///
/// The serde representation is untagged; objects carrying a `rules` key
/// deserialize as groups, everything else as rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryNode {
    Group(RuleGroup),
    Rule(Rule),
}

impl From<Rule> for QueryNode {
    fn from(rule: Rule) -> Self {
        QueryNode::Rule(rule)
    }
}

impl From<RuleGroup> for QueryNode {
    fn from(group: RuleGroup) -> Self {
        QueryNode::Group(group)
    }
}

/// A group of rules joined by a single combinator, optionally negated.
///
/// This is the standard tree shape. The alternative shape, where each pair
/// of adjacent rules carries its own combinator token, is [`RuleGroupIc`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not: bool,
    pub rules: Vec<QueryNode>,
}

impl RuleGroup {
    #[must_use]
    pub fn new(combinator: Combinator) -> RuleGroup {
        RuleGroup {
            id: None,
            combinator,
            not: false,
            rules: Vec::new(),
        }
    }

    /// An empty `and` group.
    #[must_use]
    pub fn and() -> RuleGroup {
        RuleGroup::new(Combinator::And)
    }

    /// An empty `or` group.
    #[must_use]
    pub fn or() -> RuleGroup {
        RuleGroup::new(Combinator::Or)
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> RuleGroup {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_not(mut self, not: bool) -> RuleGroup {
        self.not = not;
        self
    }

    /// Mark the group as negated.
    #[must_use]
    pub fn negate(self) -> RuleGroup {
        self.with_not(true)
    }

    /// Append a leaf rule.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> RuleGroup {
        self.rules.push(QueryNode::Rule(rule));
        self
    }

    /// Append a nested group.
    #[must_use]
    pub fn group(mut self, group: RuleGroup) -> RuleGroup {
        self.rules.push(QueryNode::Group(group));
        self
    }

    pub(crate) fn push(&mut self, node: impl Into<QueryNode>) {
        self.rules.push(node.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleGroup {
    /// The canonical empty query: an `and` group with no rules. Parsers
    /// return this when their input cannot be understood.
    fn default() -> Self {
        RuleGroup::and()
    }
}

/// Element of an independent-combinator list: operands at even positions
/// and the combinator joining each adjacent pair between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IcElement {
    Combinator(Combinator),
    Group(RuleGroupIc),
    Rule(Rule),
}

impl From<Rule> for IcElement {
    fn from(rule: Rule) -> Self {
        IcElement::Rule(rule)
    }
}

impl From<RuleGroupIc> for IcElement {
    fn from(group: RuleGroupIc) -> Self {
        IcElement::Group(group)
    }
}

impl From<Combinator> for IcElement {
    fn from(combinator: Combinator) -> Self {
        IcElement::Combinator(combinator)
    }
}

/// A group in independent-combinator form: no group-level combinator,
/// instead an alternating list of operands and combinator tokens.
///
/// A well-formed list is empty or holds an odd number of elements with
/// operands at even indices and combinators at odd indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleGroupIc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not: bool,
    pub rules: Vec<IcElement>,
}

impl RuleGroupIc {
    #[must_use]
    pub fn new() -> RuleGroupIc {
        RuleGroupIc::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> RuleGroupIc {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_not(mut self, not: bool) -> RuleGroupIc {
        self.not = not;
        self
    }

    /// Append the first operand of the list.
    #[must_use]
    pub fn operand(mut self, operand: impl Into<IcElement>) -> RuleGroupIc {
        self.rules.push(operand.into());
        self
    }

    /// Append an `and` token followed by the next operand.
    #[must_use]
    pub fn and(mut self, operand: impl Into<IcElement>) -> RuleGroupIc {
        self.rules.push(IcElement::Combinator(Combinator::And));
        self.rules.push(operand.into());
        self
    }

    /// Append an `or` token followed by the next operand.
    #[must_use]
    pub fn or(mut self, operand: impl Into<IcElement>) -> RuleGroupIc {
        self.rules.push(IcElement::Combinator(Combinator::Or));
        self.rules.push(operand.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Borrowed view over either tree shape.
///
/// Formatters and transforms accept `impl Into<QueryRef>` so callers pass
/// `&RuleGroup` or `&RuleGroupIc` directly.
#[derive(Debug, Clone, Copy)]
pub enum QueryRef<'a> {
    Standard(&'a RuleGroup),
    Ic(&'a RuleGroupIc),
}

impl<'a> From<&'a RuleGroup> for QueryRef<'a> {
    fn from(group: &'a RuleGroup) -> Self {
        QueryRef::Standard(group)
    }
}

impl<'a> From<&'a RuleGroupIc> for QueryRef<'a> {
    fn from(group: &'a RuleGroupIc) -> Self {
        QueryRef::Ic(group)
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}
