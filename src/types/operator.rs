use std::fmt;

use serde::{Deserialize, Serialize};

/// Comparison operators a rule can carry.
///
/// Names outside the builtin set are preserved verbatim in [`Operator::Custom`]
/// so application-defined operators survive a round trip untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    Contains,
    BeginsWith,
    EndsWith,
    DoesNotContain,
    DoesNotBeginWith,
    DoesNotEndWith,
    Null,
    NotNull,
    In,
    NotIn,
    Between,
    NotBetween,
    Custom(String),
}

impl Operator {
    /// Canonical name as it appears in serialized queries.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::Contains => "contains",
            Operator::BeginsWith => "beginsWith",
            Operator::EndsWith => "endsWith",
            Operator::DoesNotContain => "doesNotContain",
            Operator::DoesNotBeginWith => "doesNotBeginWith",
            Operator::DoesNotEndWith => "doesNotEndWith",
            Operator::Null => "null",
            Operator::NotNull => "notNull",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::Between => "between",
            Operator::NotBetween => "notBetween",
            Operator::Custom(name) => name,
        }
    }

    /// Resolve a name to an operator, matching the builtin set
    /// case-insensitively. Unknown names become [`Operator::Custom`] with
    /// their original spelling.
    #[must_use]
    pub fn from_name(name: &str) -> Operator {
        match name.to_ascii_lowercase().as_str() {
            "=" | "==" => Operator::Eq,
            "!=" | "<>" => Operator::Neq,
            "<" => Operator::Lt,
            ">" => Operator::Gt,
            "<=" => Operator::Lte,
            ">=" => Operator::Gte,
            "contains" => Operator::Contains,
            "beginswith" => Operator::BeginsWith,
            "endswith" => Operator::EndsWith,
            "doesnotcontain" => Operator::DoesNotContain,
            "doesnotbeginwith" => Operator::DoesNotBeginWith,
            "doesnotendwith" => Operator::DoesNotEndWith,
            "null" => Operator::Null,
            "notnull" => Operator::NotNull,
            "in" => Operator::In,
            "notin" => Operator::NotIn,
            "between" => Operator::Between,
            "notbetween" => Operator::NotBetween,
            _ => Operator::Custom(name.to_owned()),
        }
    }

    /// The negated counterpart, for operators that have one.
    ///
    /// Parsers use this to absorb a surrounding NOT into the rule instead of
    /// emitting a negated wrapper group. Plain comparisons return `None` and
    /// keep the wrapper.
    #[must_use]
    pub fn negated(&self) -> Option<Operator> {
        match self {
            Operator::Between => Some(Operator::NotBetween),
            Operator::NotBetween => Some(Operator::Between),
            Operator::In => Some(Operator::NotIn),
            Operator::NotIn => Some(Operator::In),
            Operator::Contains => Some(Operator::DoesNotContain),
            Operator::DoesNotContain => Some(Operator::Contains),
            Operator::BeginsWith => Some(Operator::DoesNotBeginWith),
            Operator::DoesNotBeginWith => Some(Operator::BeginsWith),
            Operator::EndsWith => Some(Operator::DoesNotEndWith),
            Operator::DoesNotEndWith => Some(Operator::EndsWith),
            _ => None,
        }
    }

    /// Whether the operator takes no value operand (`null` / `notNull`).
    #[must_use]
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::Null | Operator::NotNull)
    }

    /// Whether this is the placeholder operator name that marks a rule as
    /// not-yet-filled-in. Placeholder rules are dropped during formatting.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Operator::Custom(name) if name == super::PLACEHOLDER_NAME)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operator {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Operator::from_name(&name))
    }
}

/// Boolean connective joining the rules of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Combinator::And => "and",
            Combinator::Or => "or",
        }
    }

    /// Case-insensitive name lookup.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Combinator> {
        if name.eq_ignore_ascii_case("and") {
            Some(Combinator::And)
        } else if name.eq_ignore_ascii_case("or") {
            Some(Combinator::Or)
        } else {
            None
        }
    }
}

impl Default for Combinator {
    fn default() -> Self {
        Combinator::And
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a rule's value names a literal or another field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Value,
    Field,
}

impl ValueSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ValueSource::Value => "value",
            ValueSource::Field => "field",
        }
    }
}

impl Default for ValueSource {
    fn default() -> Self {
        ValueSource::Value
    }
}
