mod field;
mod group;
mod operator;
mod rule;
mod value;

pub use field::{Field, FieldMap, FieldValidator};
pub use group::{IcElement, QueryNode, QueryRef, RuleGroup, RuleGroupIc};
pub use operator::{Combinator, Operator, ValueSource};
pub use rule::{field, FieldRule, Rule};
pub use value::RuleValue;

/// Field or operator name marking a rule as not yet filled in.
/// Rules carrying it are dropped from every output format.
pub const PLACEHOLDER_NAME: &str = "~";
