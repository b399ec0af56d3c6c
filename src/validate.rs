//! Pre-emission validation: a caller-supplied tree validator plus per-field
//! validators, combined into one state consulted by every formatter.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{FieldMap, QueryRef, Rule};

/// Validity of a single node, keyed by id in a [`ValidationMap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Plain(bool),
    Detailed { valid: bool, reasons: Vec<String> },
}

impl Validity {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Validity::Plain(valid) | Validity::Detailed { valid, .. } => *valid,
        }
    }
}

impl From<bool> for Validity {
    fn from(valid: bool) -> Self {
        Validity::Plain(valid)
    }
}

/// Per-node validity keyed by node id.
pub type ValidationMap = HashMap<String, Validity>;

/// Result of a whole-tree validator: a plain verdict, or a per-id map.
///
/// `Bool(false)` condemns the entire tree; every formatter then emits its
/// fallback expression. A map only affects the nodes it names.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Bool(bool),
    Map(ValidationMap),
}

/// Caller-supplied validator run once per export call.
pub type QueryValidator = Arc<dyn Fn(QueryRef<'_>) -> Validation + Send + Sync>;

/// Validation outcome shared by all formatters for one export call.
#[derive(Default)]
pub(crate) struct ValidationState {
    tree_invalid: bool,
    by_id: ValidationMap,
}

impl ValidationState {
    pub(crate) fn compute(
        validator: Option<&QueryValidator>,
        query: QueryRef<'_>,
    ) -> ValidationState {
        match validator {
            None => ValidationState::default(),
            Some(validate) => match validate(query) {
                Validation::Bool(ok) => ValidationState {
                    tree_invalid: !ok,
                    by_id: ValidationMap::new(),
                },
                Validation::Map(by_id) => ValidationState {
                    tree_invalid: false,
                    by_id,
                },
            },
        }
    }

    pub(crate) fn tree_invalid(&self) -> bool {
        self.tree_invalid
    }

    /// Nodes with no recorded entry count as valid.
    pub(crate) fn id_is_valid(&self, id: Option<&str>) -> bool {
        id.and_then(|id| self.by_id.get(id))
            .map_or(true, Validity::is_valid)
    }

    /// A rule passes when its id is not condemned and the validator attached
    /// to its field, if any, accepts its value.
    pub(crate) fn rule_is_valid(&self, rule: &Rule, fields: Option<&FieldMap>) -> bool {
        if !self.id_is_valid(rule.id.as_deref()) {
            return false;
        }
        if let Some(validator) = fields
            .and_then(|fields| fields.get(&rule.field))
            .and_then(|field| field.validator.as_ref())
        {
            if !validator(&rule.value) {
                return false;
            }
        }
        true
    }
}
