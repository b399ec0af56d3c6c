use std::fmt;

use serde::{Deserialize, Serialize};

/// Value carried by a rule: a scalar, a string, or a small list
/// (two elements for `between`, any length for `in`).
///
/// The serde representation is untagged, so rule values round-trip through
/// JSON as plain scalars and arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// Absent or explicit null.
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// An ordered list of values.
    List(Vec<RuleValue>),
}

impl Default for RuleValue {
    fn default() -> Self {
        RuleValue::Null
    }
}

impl RuleValue {
    /// The string content, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RuleValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Whether this is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, RuleValue::Null)
    }

    /// View this value as a list of elements.
    ///
    /// Lists pass through; a string is split on commas with each segment
    /// trimmed (empty segments dropped); `Null` is empty; any other scalar
    /// becomes a one-element list. This is the shared reading used by the
    /// `in` and `between` operators, which accept both real lists and
    /// comma-joined strings.
    #[must_use]
    pub fn to_list(&self) -> Vec<RuleValue> {
        match self {
            RuleValue::List(items) => items.clone(),
            RuleValue::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| RuleValue::String(part.to_owned()))
                .collect(),
            RuleValue::Null => Vec::new(),
            other => vec![other.clone()],
        }
    }

    /// Join elements into the comma-separated string form used when a parser
    /// is asked for string-typed lists (`", "` between elements for `in`,
    /// `","` for `between`).
    #[must_use]
    pub fn join_list(items: &[RuleValue], separator: &str) -> RuleValue {
        let joined = items
            .iter()
            .map(|item| match item {
                RuleValue::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(separator);
        RuleValue::String(joined)
    }
}

impl From<i64> for RuleValue {
    fn from(v: i64) -> Self {
        RuleValue::Int(v)
    }
}

impl From<f64> for RuleValue {
    fn from(v: f64) -> Self {
        RuleValue::Float(v)
    }
}

impl From<bool> for RuleValue {
    fn from(v: bool) -> Self {
        RuleValue::Bool(v)
    }
}

impl From<&str> for RuleValue {
    fn from(v: &str) -> Self {
        RuleValue::String(v.to_owned())
    }
}

impl From<String> for RuleValue {
    fn from(v: String) -> Self {
        RuleValue::String(v)
    }
}

impl<T: Into<RuleValue>> From<Vec<T>> for RuleValue {
    fn from(v: Vec<T>) -> Self {
        RuleValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Null => write!(f, "null"),
            RuleValue::Bool(v) => write!(f, "{v}"),
            RuleValue::Int(v) => write!(f, "{v}"),
            RuleValue::Float(v) => write!(f, "{v}"),
            RuleValue::String(v) => write!(f, "{v}"),
            RuleValue::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}
