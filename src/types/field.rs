use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{Operator, RuleValue, ValueSource};

/// Per-field validation callback. Returning `false` drops the rule from
/// formatted output.
pub type FieldValidator = Arc<dyn Fn(&RuleValue) -> bool + Send + Sync>;

/// Metadata for one queryable field.
///
/// `operators` and `value_sources`, when present, restrict what parsers
/// accept for this field; `label` feeds the natural-language formatter.
#[derive(Clone, Default)]
pub struct Field {
    pub name: String,
    pub label: Option<String>,
    pub operators: Option<Vec<Operator>>,
    pub value_sources: Option<Vec<ValueSource>>,
    pub validator: Option<FieldValidator>,
}

impl Field {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Field {
        Field {
            name: name.into(),
            label: None,
            operators: None,
            value_sources: None,
            validator: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Field {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_operators(mut self, operators: Vec<Operator>) -> Field {
        self.operators = Some(operators);
        self
    }

    #[must_use]
    pub fn with_value_sources(mut self, sources: Vec<ValueSource>) -> Field {
        self.value_sources = Some(sources);
        self
    }

    #[must_use]
    pub fn with_validator(
        mut self,
        validator: impl Fn(&RuleValue) -> bool + Send + Sync + 'static,
    ) -> Field {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Display name, falling back to the field name itself.
    #[must_use]
    pub fn label_or_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("operators", &self.operators)
            .field("value_sources", &self.value_sources)
            .field("validator", &self.validator.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Maps field names to their [`Field`] metadata.
///
/// Formatters consult it for labels and per-field validators; parsers given
/// a non-empty map drop rules that reference unknown fields.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    fields: HashMap<String, Field>,
}

impl FieldMap {
    #[must_use]
    pub fn new() -> FieldMap {
        FieldMap::default()
    }

    /// Add a field, replacing any earlier entry with the same name.
    #[must_use]
    pub fn field(mut self, field: Field) -> FieldMap {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The number of registered fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over all registered fields.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }
}

impl FromIterator<Field> for FieldMap {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for field in iter {
            map.fields.insert(field.name.clone(), field);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let map = FieldMap::new().field(Field::new("age").with_label("Age"));
        assert!(map.contains("age"));
        assert_eq!(map.get("age").unwrap().label.as_deref(), Some("Age"));
    }

    #[test]
    fn duplicate_insert_replaces() {
        let map = FieldMap::new()
            .field(Field::new("age").with_label("Old"))
            .field(Field::new("age").with_label("New"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("age").unwrap().label.as_deref(), Some("New"));
    }

    #[test]
    fn get_missing_returns_none() {
        let map = FieldMap::new();
        assert!(map.get("nonexistent").is_none());
    }

    #[test]
    fn empty_map() {
        let map = FieldMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn from_iterator() {
        let map: FieldMap = ["a", "b", "c"].into_iter().map(Field::new).collect();
        assert_eq!(map.len(), 3);
        assert!(map.contains("b"));
    }

    #[test]
    fn label_or_name_falls_back() {
        assert_eq!(Field::new("age").label_or_name(), "age");
        assert_eq!(
            Field::new("age").with_label("Age").label_or_name(),
            "Age"
        );
    }

    #[test]
    fn validator_runs_against_value() {
        let map = FieldMap::new()
            .field(Field::new("age").with_validator(|value| !value.is_null()));
        let validator = map.get("age").unwrap().validator.as_ref().unwrap();
        assert!(validator(&RuleValue::Int(21)));
        assert!(!validator(&RuleValue::Null));
    }
}
