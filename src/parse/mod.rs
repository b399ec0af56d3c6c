//! Import side: one parser per dialect, each rebuilding the canonical tree.
//!
//! Every parser fails soft. Input that does not lex, deserialize, or match a
//! known shape yields the empty `and` group (or drops the offending node)
//! instead of returning an error.

mod cel;
pub(crate) mod common;
mod jsonata;
mod jsonlogic;
mod mongodb;
mod postgrest;
mod spel;
mod sql;

use std::collections::HashMap;
use std::sync::Arc;

use crate::transform::to_independent_combinators;
use crate::types::{
    Combinator, FieldMap, Operator, QueryNode, Rule, RuleGroup, RuleGroupIc, RuleValue,
    ValueSource,
};

// -- Options ----------------------------------------------------------------

/// Resolves the value sources allowed for a field/operator pair, overriding
/// the field's declared list.
pub type ValueSourceResolver = Arc<dyn Fn(&str, &Operator) -> Vec<ValueSource> + Send + Sync>;

/// Reconstruction hook for operator keys the object parsers do not
/// recognize. Receives the key and its operand; `None` drops the node.
pub type CustomOpParser =
    Arc<dyn Fn(&str, &serde_json::Value) -> Option<QueryNode> + Send + Sync>;

/// Options shared by every parser.
#[derive(Clone, Default)]
pub struct ParseOptions {
    pub(crate) fields: Option<FieldMap>,
    pub(crate) get_value_sources: Option<ValueSourceResolver>,
    pub(crate) lists_as_arrays: bool,
}

impl ParseOptions {
    #[must_use]
    pub fn new() -> ParseOptions {
        ParseOptions::default()
    }

    /// Field registry; reconstructed rules that fail its checks are dropped.
    #[must_use]
    pub fn fields(mut self, fields: FieldMap) -> ParseOptions {
        self.fields = Some(fields);
        self
    }

    #[must_use]
    pub fn value_sources(
        mut self,
        resolver: impl Fn(&str, &Operator) -> Vec<ValueSource> + Send + Sync + 'static,
    ) -> ParseOptions {
        self.get_value_sources = Some(Arc::new(resolver));
        self
    }

    /// Keep `in`/`between` values as lists instead of joined strings.
    #[must_use]
    pub fn lists_as_arrays(mut self, as_arrays: bool) -> ParseOptions {
        self.lists_as_arrays = as_arrays;
        self
    }
}

/// SQL parser options: the common set plus placeholder resolution.
#[derive(Clone, Default)]
pub struct SqlParseOptions {
    pub(crate) common: ParseOptions,
    pub(crate) params: Vec<RuleValue>,
    pub(crate) params_named: HashMap<String, RuleValue>,
    pub(crate) param_prefix: Option<String>,
}

impl SqlParseOptions {
    #[must_use]
    pub fn new() -> SqlParseOptions {
        SqlParseOptions::default()
    }

    #[must_use]
    pub fn fields(mut self, fields: FieldMap) -> SqlParseOptions {
        self.common = self.common.fields(fields);
        self
    }

    #[must_use]
    pub fn value_sources(
        mut self,
        resolver: impl Fn(&str, &Operator) -> Vec<ValueSource> + Send + Sync + 'static,
    ) -> SqlParseOptions {
        self.common = self.common.value_sources(resolver);
        self
    }

    #[must_use]
    pub fn lists_as_arrays(mut self, as_arrays: bool) -> SqlParseOptions {
        self.common = self.common.lists_as_arrays(as_arrays);
        self
    }

    /// Values substituted for `?` placeholders, in order of appearance.
    #[must_use]
    pub fn params(
        mut self,
        params: impl IntoIterator<Item = impl Into<RuleValue>>,
    ) -> SqlParseOptions {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Values substituted for named placeholders, keyed without the prefix.
    #[must_use]
    pub fn params_named(
        mut self,
        params: impl IntoIterator<Item = (impl Into<String>, impl Into<RuleValue>)>,
    ) -> SqlParseOptions {
        self.params_named = params
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        self
    }

    /// Named-placeholder sigil (default `:`).
    #[must_use]
    pub fn param_prefix(mut self, prefix: &str) -> SqlParseOptions {
        self.param_prefix = Some(prefix.to_owned());
        self
    }
}

/// Object-dialect parser options: the common set plus extension operators.
#[derive(Clone, Default)]
pub struct ObjectParseOptions {
    pub(crate) common: ParseOptions,
    pub(crate) custom_ops: HashMap<String, CustomOpParser>,
}

impl ObjectParseOptions {
    #[must_use]
    pub fn new() -> ObjectParseOptions {
        ObjectParseOptions::default()
    }

    #[must_use]
    pub fn fields(mut self, fields: FieldMap) -> ObjectParseOptions {
        self.common = self.common.fields(fields);
        self
    }

    #[must_use]
    pub fn value_sources(
        mut self,
        resolver: impl Fn(&str, &Operator) -> Vec<ValueSource> + Send + Sync + 'static,
    ) -> ObjectParseOptions {
        self.common = self.common.value_sources(resolver);
        self
    }

    #[must_use]
    pub fn lists_as_arrays(mut self, as_arrays: bool) -> ObjectParseOptions {
        self.common = self.common.lists_as_arrays(as_arrays);
        self
    }

    /// Register a reconstruction function for an unrecognized operator key.
    #[must_use]
    pub fn custom_op(
        mut self,
        name: &str,
        parser: impl Fn(&str, &serde_json::Value) -> Option<QueryNode> + Send + Sync + 'static,
    ) -> ObjectParseOptions {
        self.custom_ops.insert(name.to_owned(), Arc::new(parser));
        self
    }
}

// -- Entry points -----------------------------------------------------------

/// Parse a SQL `WHERE` fragment or full `SELECT` statement.
#[must_use]
pub fn parse_sql(input: &str, options: &SqlParseOptions) -> RuleGroup {
    sql::parse(input, options)
}

#[must_use]
pub fn parse_sql_ic(input: &str, options: &SqlParseOptions) -> RuleGroupIc {
    to_independent_combinators(&parse_sql(input, options))
}

/// Parse a MongoDB query document from JSON text.
#[must_use]
pub fn parse_mongodb(input: &str, options: &ObjectParseOptions) -> RuleGroup {
    match serde_json::from_str(input) {
        Ok(value) => mongodb::parse_value(&value, options),
        Err(_) => RuleGroup::default(),
    }
}

/// Parse an already-deserialized MongoDB query document.
#[must_use]
pub fn parse_mongodb_value(value: &serde_json::Value, options: &ObjectParseOptions) -> RuleGroup {
    mongodb::parse_value(value, options)
}

#[must_use]
pub fn parse_mongodb_ic(input: &str, options: &ObjectParseOptions) -> RuleGroupIc {
    to_independent_combinators(&parse_mongodb(input, options))
}

/// Parse a JsonLogic rule object from JSON text.
#[must_use]
pub fn parse_jsonlogic(input: &str, options: &ObjectParseOptions) -> RuleGroup {
    match serde_json::from_str(input) {
        Ok(value) => jsonlogic::parse_value(&value, options),
        Err(_) => RuleGroup::default(),
    }
}

/// Parse an already-deserialized JsonLogic rule object.
#[must_use]
pub fn parse_jsonlogic_value(
    value: &serde_json::Value,
    options: &ObjectParseOptions,
) -> RuleGroup {
    jsonlogic::parse_value(value, options)
}

#[must_use]
pub fn parse_jsonlogic_ic(input: &str, options: &ObjectParseOptions) -> RuleGroupIc {
    to_independent_combinators(&parse_jsonlogic(input, options))
}

/// Parse a PostgREST-style filter object from JSON text.
#[must_use]
pub fn parse_postgrest(input: &str, options: &ObjectParseOptions) -> RuleGroup {
    match serde_json::from_str(input) {
        Ok(value) => postgrest::parse_value(&value, options),
        Err(_) => RuleGroup::default(),
    }
}

/// Parse an already-deserialized PostgREST-style filter object.
#[must_use]
pub fn parse_postgrest_value(
    value: &serde_json::Value,
    options: &ObjectParseOptions,
) -> RuleGroup {
    postgrest::parse_value(value, options)
}

#[must_use]
pub fn parse_postgrest_ic(input: &str, options: &ObjectParseOptions) -> RuleGroupIc {
    to_independent_combinators(&parse_postgrest(input, options))
}

/// Parse a CEL boolean expression.
#[must_use]
pub fn parse_cel(input: &str, options: &ParseOptions) -> RuleGroup {
    cel::parse(input, options)
}

#[must_use]
pub fn parse_cel_ic(input: &str, options: &ParseOptions) -> RuleGroupIc {
    to_independent_combinators(&parse_cel(input, options))
}

/// Parse a SpEL boolean expression.
#[must_use]
pub fn parse_spel(input: &str, options: &ParseOptions) -> RuleGroup {
    spel::parse(input, options)
}

#[must_use]
pub fn parse_spel_ic(input: &str, options: &ParseOptions) -> RuleGroupIc {
    to_independent_combinators(&parse_spel(input, options))
}

/// Parse a JSONata filter expression.
#[must_use]
pub fn parse_jsonata(input: &str, options: &ParseOptions) -> RuleGroup {
    jsonata::parse(input, options)
}

#[must_use]
pub fn parse_jsonata_ic(input: &str, options: &ParseOptions) -> RuleGroupIc {
    to_independent_combinators(&parse_jsonata(input, options))
}

// -- Shared reconstruction --------------------------------------------------

/// A parsed node becomes the final tree: groups pass through, a lone rule is
/// wrapped in a one-element `and` group, nothing parseable means the empty
/// group.
pub(crate) fn into_group(node: Option<QueryNode>) -> RuleGroup {
    match node {
        Some(QueryNode::Group(group)) => group,
        Some(QueryNode::Rule(rule)) => RuleGroup {
            id: None,
            combinator: Combinator::And,
            not: false,
            rules: vec![QueryNode::Rule(rule)],
        },
        None => RuleGroup::default(),
    }
}

/// Apply logical negation to a reconstructed node. Negatable operators
/// absorb it, groups toggle their `not` flag, anything else wraps in a
/// negated one-element group.
pub(crate) fn negate_node(node: QueryNode) -> QueryNode {
    match node {
        QueryNode::Rule(mut rule) => match rule.operator.negated() {
            Some(negated) => {
                rule.operator = negated;
                QueryNode::Rule(rule)
            }
            None => QueryNode::Group(RuleGroup {
                id: None,
                combinator: Combinator::And,
                not: true,
                rules: vec![QueryNode::Rule(rule)],
            }),
        },
        QueryNode::Group(mut group) => {
            group.not = !group.not;
            QueryNode::Group(group)
        }
    }
}

/// Pack reconstructed `in`/`between` values per the list policy.
pub(crate) fn pack_list(
    items: Vec<RuleValue>,
    separator: &str,
    options: &ParseOptions,
) -> RuleValue {
    if options.lists_as_arrays {
        RuleValue::List(items)
    } else {
        RuleValue::join_list(&items, separator)
    }
}

/// Flip a comparison so `18 < age` reads as `age > 18`.
pub(crate) fn reverse_comparison(operator: Operator) -> Operator {
    match operator {
        Operator::Lt => Operator::Gt,
        Operator::Gt => Operator::Lt,
        Operator::Lte => Operator::Gte,
        Operator::Gte => Operator::Lte,
        other => other,
    }
}

/// A JSON scalar as a rule value; arrays and objects are not scalars.
pub(crate) fn json_scalar(value: &serde_json::Value) -> Option<RuleValue> {
    match value {
        serde_json::Value::Null => Some(RuleValue::Null),
        serde_json::Value::Bool(b) => Some(RuleValue::Bool(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(RuleValue::Int(i)),
            None => n.as_f64().map(RuleValue::Float),
        },
        serde_json::Value::String(s) => Some(RuleValue::String(s.clone())),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}

/// A JSON array of scalars; any non-scalar element rejects the whole list.
pub(crate) fn json_list(value: &serde_json::Value) -> Option<Vec<RuleValue>> {
    let serde_json::Value::Array(items) = value else {
        return None;
    };
    items.iter().map(json_scalar).collect()
}

/// The field name inside a `{"var": name}` reference.
pub(crate) fn var_name(value: &serde_json::Value) -> Option<&str> {
    let serde_json::Value::Object(map) = value else {
        return None;
    };
    if map.len() != 1 {
        return None;
    }
    match map.get("var") {
        Some(serde_json::Value::String(name)) => Some(name),
        _ => None,
    }
}

/// Import-side validity filter: rules that fail it are silently dropped.
pub(crate) fn field_is_valid(rule: &Rule, options: &ParseOptions) -> bool {
    let Some(fields) = &options.fields else {
        return true;
    };
    let Some(field) = fields.get(&rule.field) else {
        return false;
    };
    if let Some(operators) = &field.operators {
        if !operators.contains(&rule.operator) {
            return false;
        }
    }
    if rule.value_source() == ValueSource::Field {
        let Some(other) = rule.value.as_str() else {
            return false;
        };
        if other == rule.field || !fields.contains(other) {
            return false;
        }
        let sources = match &options.get_value_sources {
            Some(resolver) => resolver(&rule.field, &rule.operator),
            None => field
                .value_sources
                .clone()
                .unwrap_or_else(|| vec![ValueSource::Value]),
        };
        if !sources.contains(&ValueSource::Field) {
            return false;
        }
    }
    true
}

/// Keep a reconstructed rule only if it passes the validity filter.
pub(crate) fn keep_rule(rule: Rule, options: &ParseOptions) -> Option<QueryNode> {
    field_is_valid(&rule, options).then(|| QueryNode::Rule(rule))
}
