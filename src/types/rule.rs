use serde::{Deserialize, Serialize};

use super::{Operator, RuleValue, ValueSource, PLACEHOLDER_NAME};

/// A single leaf condition: `field operator value`.
///
/// `value_source` defaults to [`ValueSource::Value`]; when set to
/// [`ValueSource::Field`] the value holds the name of another field and
/// formatters render an identifier instead of a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: RuleValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_source: Option<ValueSource>,
}

impl Rule {
    #[must_use]
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<RuleValue>) -> Rule {
        Rule {
            id: None,
            field: field.into(),
            operator,
            value: value.into(),
            value_source: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Rule {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_value_source(mut self, source: ValueSource) -> Rule {
        self.value_source = Some(source);
        self
    }

    /// Effective value source, treating the absent case as `Value`.
    #[must_use]
    pub fn value_source(&self) -> ValueSource {
        self.value_source.unwrap_or_default()
    }

    /// Whether this rule is a placeholder (`~` field or operator) that
    /// formatters must drop.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.field == PLACEHOLDER_NAME || self.operator.is_placeholder()
    }
}

/// Intermediate builder for rules on a named field.
/// Created by [`field()`]; requires an operator method to produce a [`Rule`].
#[derive(Debug, Clone)]
pub struct FieldRule {
    name: String,
}

impl FieldRule {
    #[must_use]
    pub fn eq(self, value: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::Eq, value)
    }

    #[must_use]
    pub fn neq(self, value: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::Neq, value)
    }

    #[must_use]
    pub fn lt(self, value: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::Lt, value)
    }

    #[must_use]
    pub fn gt(self, value: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::Gt, value)
    }

    #[must_use]
    pub fn lte(self, value: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::Lte, value)
    }

    #[must_use]
    pub fn gte(self, value: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::Gte, value)
    }

    #[must_use]
    pub fn contains(self, value: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::Contains, value)
    }

    #[must_use]
    pub fn begins_with(self, value: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::BeginsWith, value)
    }

    #[must_use]
    pub fn ends_with(self, value: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::EndsWith, value)
    }

    #[must_use]
    pub fn does_not_contain(self, value: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::DoesNotContain, value)
    }

    #[must_use]
    pub fn does_not_begin_with(self, value: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::DoesNotBeginWith, value)
    }

    #[must_use]
    pub fn does_not_end_with(self, value: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::DoesNotEndWith, value)
    }

    #[must_use]
    pub fn is_null(self) -> Rule {
        Rule::new(self.name, Operator::Null, RuleValue::Null)
    }

    #[must_use]
    pub fn is_not_null(self) -> Rule {
        Rule::new(self.name, Operator::NotNull, RuleValue::Null)
    }

    #[must_use]
    pub fn in_list(self, values: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::In, values)
    }

    #[must_use]
    pub fn not_in_list(self, values: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, Operator::NotIn, values)
    }

    #[must_use]
    pub fn between(self, low: impl Into<RuleValue>, high: impl Into<RuleValue>) -> Rule {
        Rule::new(
            self.name,
            Operator::Between,
            RuleValue::List(vec![low.into(), high.into()]),
        )
    }

    #[must_use]
    pub fn not_between(self, low: impl Into<RuleValue>, high: impl Into<RuleValue>) -> Rule {
        Rule::new(
            self.name,
            Operator::NotBetween,
            RuleValue::List(vec![low.into(), high.into()]),
        )
    }

    /// Build a rule with any operator, including custom ones.
    #[must_use]
    pub fn op(self, operator: Operator, value: impl Into<RuleValue>) -> Rule {
        Rule::new(self.name, operator, value)
    }

    /// Compare against another field instead of a literal.
    #[must_use]
    pub fn eq_field(self, other: &str) -> Rule {
        self.op_field(Operator::Eq, other)
    }

    #[must_use]
    pub fn neq_field(self, other: &str) -> Rule {
        self.op_field(Operator::Neq, other)
    }

    #[must_use]
    pub fn lt_field(self, other: &str) -> Rule {
        self.op_field(Operator::Lt, other)
    }

    #[must_use]
    pub fn gt_field(self, other: &str) -> Rule {
        self.op_field(Operator::Gt, other)
    }

    #[must_use]
    pub fn lte_field(self, other: &str) -> Rule {
        self.op_field(Operator::Lte, other)
    }

    #[must_use]
    pub fn gte_field(self, other: &str) -> Rule {
        self.op_field(Operator::Gte, other)
    }

    #[must_use]
    pub fn contains_field(self, other: &str) -> Rule {
        self.op_field(Operator::Contains, other)
    }

    #[must_use]
    pub fn begins_with_field(self, other: &str) -> Rule {
        self.op_field(Operator::BeginsWith, other)
    }

    #[must_use]
    pub fn ends_with_field(self, other: &str) -> Rule {
        self.op_field(Operator::EndsWith, other)
    }

    /// Build a field-valued rule with any operator.
    #[must_use]
    pub fn op_field(self, operator: Operator, other: &str) -> Rule {
        Rule::new(self.name, operator, other).with_value_source(ValueSource::Field)
    }
}

#[must_use]
pub fn field(name: &str) -> FieldRule {
    FieldRule {
        name: name.to_owned(),
    }
}
