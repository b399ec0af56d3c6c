//! Export side: one codec per dialect, all sharing the validation pass,
//! placeholder filtering, and fallback policy.

mod cel;
mod elasticsearch;
mod jsonata;
mod jsonlogic;
mod mongodb;
mod natural;
mod postgrest;
mod spel;
pub mod sql;

pub use sql::{
    NamedSql, ParamState, ParameterizedSql, RuleProcessor, SqlContext, SqlExportMode,
    ValueProcessor,
};

use crate::transform::{
    parse_number_values, parse_number_values_ic, strip_ids, strip_ids_ic,
};
use crate::types::{Combinator, FieldMap, QueryRef, Rule, RuleGroup, RuleGroupIc};
use crate::validate::QueryValidator;

// -- Format selection -------------------------------------------------------

/// Export dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    JsonWithoutIds,
    Sql,
    Parameterized,
    ParameterizedNamed,
    MongoDb,
    Cel,
    Spel,
    JsonLogic,
    Postgrest,
    ElasticSearch,
    Jsonata,
    Natural,
}

impl Format {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::JsonWithoutIds => "json_without_ids",
            Format::Sql => "sql",
            Format::Parameterized => "parameterized",
            Format::ParameterizedNamed => "parameterized_named",
            Format::MongoDb => "mongodb",
            Format::Cel => "cel",
            Format::Spel => "spel",
            Format::JsonLogic => "jsonlogic",
            Format::Postgrest => "postgrest",
            Format::ElasticSearch => "elasticsearch",
            Format::Jsonata => "jsonata",
            Format::Natural => "natural_language",
        }
    }

    /// Case-insensitive name lookup.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Format> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "json_without_ids" => Some(Format::JsonWithoutIds),
            "sql" => Some(Format::Sql),
            "parameterized" => Some(Format::Parameterized),
            "parameterized_named" => Some(Format::ParameterizedNamed),
            "mongodb" => Some(Format::MongoDb),
            "cel" => Some(Format::Cel),
            "spel" => Some(Format::Spel),
            "jsonlogic" => Some(Format::JsonLogic),
            "postgrest" => Some(Format::Postgrest),
            "elasticsearch" => Some(Format::ElasticSearch),
            "jsonata" => Some(Format::Jsonata),
            "natural_language" => Some(Format::Natural),
            _ => None,
        }
    }
}

/// Output of [`format_query`]: text for the string dialects, `sql` plus
/// collected parameters for the parameterized pair, and a JSON value for the
/// object dialects.
#[derive(Debug, Clone, PartialEq)]
pub enum FormattedQuery {
    Text(String),
    Parameterized(ParameterizedSql),
    Named(NamedSql),
    Object(serde_json::Value),
}

// -- Options ----------------------------------------------------------------

/// SQL dialect presets. A preset fills defaults; explicitly set options
/// always win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlPreset {
    Ansi,
    Sqlite,
    Postgresql,
    Mysql,
    Mssql,
    Oracle,
}

impl SqlPreset {
    fn quote_fields(self) -> Option<(&'static str, &'static str)> {
        match self {
            SqlPreset::Postgresql => Some(("\"", "\"")),
            SqlPreset::Mssql => Some(("[", "]")),
            _ => None,
        }
    }

    fn separator(self) -> Option<&'static str> {
        match self {
            SqlPreset::Mssql => Some("."),
            _ => None,
        }
    }

    fn numbered_params(self) -> Option<bool> {
        match self {
            SqlPreset::Postgresql => Some(true),
            _ => None,
        }
    }

    fn params_keep_prefix(self) -> Option<bool> {
        match self {
            SqlPreset::Sqlite => Some(true),
            _ => None,
        }
    }

    fn concat_operator(self) -> Option<&'static str> {
        match self {
            SqlPreset::Mysql => Some("CONCAT"),
            SqlPreset::Mssql => Some("+"),
            _ => None,
        }
    }
}

/// Options accepted by every formatter. All fields default; the SQL-specific
/// knobs are ignored by the other dialects.
#[derive(Clone, Default)]
pub struct FormatOptions {
    pub(crate) validator: Option<QueryValidator>,
    pub(crate) fields: Option<FieldMap>,
    pub(crate) rule_processor: Option<RuleProcessor>,
    pub(crate) value_processor: Option<ValueProcessor>,
    quote_field_names_with: Option<(String, String)>,
    field_identifier_separator: Option<String>,
    quote_values_with: Option<char>,
    fallback_expression: Option<String>,
    param_prefix: Option<String>,
    params_keep_prefix: Option<bool>,
    numbered_params: Option<bool>,
    parse_numbers: bool,
    placeholder_field_name: Option<String>,
    placeholder_operator_name: Option<String>,
    concat_operator: Option<String>,
    preset: Option<SqlPreset>,
}

impl FormatOptions {
    #[must_use]
    pub fn new() -> FormatOptions {
        FormatOptions::default()
    }

    #[must_use]
    pub fn preset(mut self, preset: SqlPreset) -> FormatOptions {
        self.preset = Some(preset);
        self
    }

    /// Whole-tree validator consulted before anything is emitted.
    #[must_use]
    pub fn validator(
        mut self,
        validator: impl Fn(QueryRef<'_>) -> crate::validate::Validation + Send + Sync + 'static,
    ) -> FormatOptions {
        self.validator = Some(std::sync::Arc::new(validator));
        self
    }

    /// Field metadata for labels and per-field validators.
    #[must_use]
    pub fn fields(mut self, fields: FieldMap) -> FormatOptions {
        self.fields = Some(fields);
        self
    }

    /// Override rendering of whole rules in the SQL family. Returning `None`
    /// falls through to the default processor.
    #[must_use]
    pub fn rule_processor(
        mut self,
        processor: impl Fn(&Rule, &mut SqlContext<'_>) -> Option<String> + Send + Sync + 'static,
    ) -> FormatOptions {
        self.rule_processor = Some(std::sync::Arc::new(processor));
        self
    }

    /// Override rendering of rule values in the SQL family. Returning `None`
    /// falls through to the default processor.
    #[must_use]
    pub fn value_processor(
        mut self,
        processor: impl Fn(&Rule, &mut SqlContext<'_>) -> Option<String> + Send + Sync + 'static,
    ) -> FormatOptions {
        self.value_processor = Some(std::sync::Arc::new(processor));
        self
    }

    #[must_use]
    pub fn quote_field_names_with(mut self, prefix: &str, suffix: &str) -> FormatOptions {
        self.quote_field_names_with = Some((prefix.to_owned(), suffix.to_owned()));
        self
    }

    /// Split field names on this separator and quote each segment
    /// individually (`[table].[column]`).
    #[must_use]
    pub fn field_identifier_separator(mut self, separator: &str) -> FormatOptions {
        self.field_identifier_separator = Some(separator.to_owned());
        self
    }

    #[must_use]
    pub fn quote_values_with(mut self, quote: char) -> FormatOptions {
        self.quote_values_with = Some(quote);
        self
    }

    /// Replace the dialect's always-true fallback expression. Object
    /// dialects parse it as JSON and keep their default when that fails.
    #[must_use]
    pub fn fallback_expression(mut self, expression: &str) -> FormatOptions {
        self.fallback_expression = Some(expression.to_owned());
        self
    }

    #[must_use]
    pub fn param_prefix(mut self, prefix: &str) -> FormatOptions {
        self.param_prefix = Some(prefix.to_owned());
        self
    }

    /// Keep the prefix on the keys of the named-parameter map.
    #[must_use]
    pub fn params_keep_prefix(mut self, keep: bool) -> FormatOptions {
        self.params_keep_prefix = Some(keep);
        self
    }

    /// Emit `$1`-style numbered placeholders instead of `?`.
    #[must_use]
    pub fn numbered_params(mut self, numbered: bool) -> FormatOptions {
        self.numbered_params = Some(numbered);
        self
    }

    /// Coerce string values that are full numeric literals into numbers at
    /// render time.
    #[must_use]
    pub fn parse_numbers(mut self, parse: bool) -> FormatOptions {
        self.parse_numbers = parse;
        self
    }

    #[must_use]
    pub fn placeholder_field_name(mut self, name: &str) -> FormatOptions {
        self.placeholder_field_name = Some(name.to_owned());
        self
    }

    #[must_use]
    pub fn placeholder_operator_name(mut self, name: &str) -> FormatOptions {
        self.placeholder_operator_name = Some(name.to_owned());
        self
    }

    /// String concatenation operator for field-sourced wildcard values.
    /// The literal `CONCAT` selects function-call style.
    #[must_use]
    pub fn concat_operator(mut self, operator: &str) -> FormatOptions {
        self.concat_operator = Some(operator.to_owned());
        self
    }

    pub(crate) fn resolve(&self) -> Resolved {
        let preset = self.preset;
        Resolved {
            quote_fields: self
                .quote_field_names_with
                .clone()
                .or_else(|| {
                    preset
                        .and_then(SqlPreset::quote_fields)
                        .map(|(p, s)| (p.to_owned(), s.to_owned()))
                })
                .unwrap_or_default(),
            separator: self
                .field_identifier_separator
                .clone()
                .or_else(|| preset.and_then(SqlPreset::separator).map(str::to_owned)),
            quote_values: self.quote_values_with.unwrap_or('\''),
            fallback: self.fallback_expression.clone(),
            param_prefix: self.param_prefix.clone().unwrap_or_else(|| ":".to_owned()),
            params_keep_prefix: self
                .params_keep_prefix
                .or_else(|| preset.and_then(SqlPreset::params_keep_prefix))
                .unwrap_or(false),
            numbered_params: self
                .numbered_params
                .or_else(|| preset.and_then(SqlPreset::numbered_params))
                .unwrap_or(false),
            parse_numbers: self.parse_numbers,
            placeholder_field: self
                .placeholder_field_name
                .clone()
                .unwrap_or_else(|| crate::types::PLACEHOLDER_NAME.to_owned()),
            placeholder_operator: self
                .placeholder_operator_name
                .clone()
                .unwrap_or_else(|| crate::types::PLACEHOLDER_NAME.to_owned()),
            concat: self
                .concat_operator
                .clone()
                .or_else(|| {
                    preset
                        .and_then(SqlPreset::concat_operator)
                        .map(str::to_owned)
                })
                .unwrap_or_else(|| "||".to_owned()),
        }
    }
}

/// Options after the preset merge, with every knob filled in.
pub(crate) struct Resolved {
    pub(crate) quote_fields: (String, String),
    pub(crate) separator: Option<String>,
    pub(crate) quote_values: char,
    pub(crate) fallback: Option<String>,
    pub(crate) param_prefix: String,
    pub(crate) params_keep_prefix: bool,
    pub(crate) numbered_params: bool,
    pub(crate) parse_numbers: bool,
    pub(crate) placeholder_field: String,
    pub(crate) placeholder_operator: String,
    pub(crate) concat: String,
}

impl Resolved {
    pub(crate) fn quote_field(&self, name: &str) -> String {
        let (prefix, suffix) = &self.quote_fields;
        if prefix.is_empty() && suffix.is_empty() {
            return name.to_owned();
        }
        match &self.separator {
            Some(sep) if !sep.is_empty() => name
                .split(sep.as_str())
                .map(|segment| format!("{prefix}{segment}{suffix}"))
                .collect::<Vec<_>>()
                .join(sep),
            _ => format!("{prefix}{name}{suffix}"),
        }
    }

    pub(crate) fn is_placeholder(&self, rule: &Rule) -> bool {
        rule.field == self.placeholder_field
            || rule.operator.as_str() == self.placeholder_operator
    }

    pub(crate) fn fallback_or(&self, default: &str) -> String {
        self.fallback
            .clone()
            .unwrap_or_else(|| default.to_owned())
    }

    pub(crate) fn fallback_object(&self, default: serde_json::Value) -> serde_json::Value {
        self.fallback
            .as_ref()
            .and_then(|text| serde_json::from_str(text).ok())
            .unwrap_or(default)
    }
}

// -- Shared leaf helpers ----------------------------------------------------

pub(crate) fn json_value(value: &crate::types::RuleValue) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// List view of a value with numeric coercion applied per element, so a
/// comma-joined string like `"26,37"` coerces after splitting.
pub(crate) fn coerced_list(
    value: &crate::types::RuleValue,
    parse_numbers: bool,
) -> Vec<crate::types::RuleValue> {
    let items = value.to_list();
    if parse_numbers {
        items.iter().map(crate::transform::coerce_numbers).collect()
    } else {
        items
    }
}

/// Pattern text for the wildcard operators. `None` for values with no
/// sensible pattern form.
pub(crate) fn pattern_text(value: &crate::types::RuleValue) -> Option<String> {
    use crate::types::RuleValue;
    match value {
        RuleValue::String(s) => Some(s.clone()),
        RuleValue::Int(_) | RuleValue::Float(_) | RuleValue::Bool(_) => Some(value.to_string()),
        RuleValue::Null | RuleValue::List(_) => None,
    }
}

// -- Tree walking -----------------------------------------------------------

/// Borrowed group in either shape, as seen by the codecs.
#[derive(Clone, Copy)]
pub(crate) enum GroupRef<'a> {
    Standard(&'a RuleGroup),
    Ic(&'a RuleGroupIc),
}

pub(crate) enum Node<'a> {
    Rule(&'a Rule),
    Group(GroupRef<'a>),
}

impl<'a> From<QueryRef<'a>> for GroupRef<'a> {
    fn from(query: QueryRef<'a>) -> Self {
        match query {
            QueryRef::Standard(group) => GroupRef::Standard(group),
            QueryRef::Ic(group) => GroupRef::Ic(group),
        }
    }
}

impl<'a> GroupRef<'a> {
    pub(crate) fn as_query_ref(self) -> QueryRef<'a> {
        match self {
            GroupRef::Standard(group) => QueryRef::Standard(group),
            GroupRef::Ic(group) => QueryRef::Ic(group),
        }
    }

    pub(crate) fn id(self) -> Option<&'a str> {
        match self {
            GroupRef::Standard(group) => group.id.as_deref(),
            GroupRef::Ic(group) => group.id.as_deref(),
        }
    }

    pub(crate) fn not(self) -> bool {
        match self {
            GroupRef::Standard(group) => group.not,
            GroupRef::Ic(group) => group.not,
        }
    }

    pub(crate) fn raw_len(self) -> usize {
        match self {
            GroupRef::Standard(group) => group.rules.len(),
            GroupRef::Ic(group) => group.rules.len(),
        }
    }

    pub(crate) fn is_empty(self) -> bool {
        self.raw_len() == 0
    }

    /// Decompose into the first operand plus `(combinator, operand)` pairs.
    /// Standard groups repeat their one combinator; IC lists use their
    /// inline tokens. Returns `None` when an IC list breaks alternation, so
    /// codecs treat the group as invalid.
    pub(crate) fn children(self) -> Option<(Option<Node<'a>>, Vec<(Combinator, Node<'a>)>)> {
        match self {
            GroupRef::Standard(group) => {
                let mut nodes = group.rules.iter().map(|node| match node {
                    crate::types::QueryNode::Rule(rule) => Node::Rule(rule),
                    crate::types::QueryNode::Group(inner) => {
                        Node::Group(GroupRef::Standard(inner))
                    }
                });
                let first = nodes.next();
                let rest = nodes.map(|node| (group.combinator, node)).collect();
                Some((first, rest))
            }
            GroupRef::Ic(group) => {
                if group.rules.len() % 2 == 0 && !group.rules.is_empty() {
                    return None;
                }
                let mut first = None;
                let mut rest = Vec::new();
                let mut pending: Option<Combinator> = None;
                for (index, element) in group.rules.iter().enumerate() {
                    let operand = match element {
                        crate::types::IcElement::Combinator(combinator) => {
                            if index % 2 == 0 {
                                return None;
                            }
                            pending = Some(*combinator);
                            continue;
                        }
                        crate::types::IcElement::Rule(rule) => Node::Rule(rule),
                        crate::types::IcElement::Group(inner) => Node::Group(GroupRef::Ic(inner)),
                    };
                    if index == 0 {
                        first = Some(operand);
                    } else {
                        match pending.take() {
                            Some(combinator) => rest.push((combinator, operand)),
                            None => return None,
                        }
                    }
                }
                Some((first, rest))
            }
        }
    }
}

// -- Entry points -----------------------------------------------------------

/// Format a query in any dialect through one dispatch point.
pub fn format_query<'a>(
    query: impl Into<QueryRef<'a>>,
    format: Format,
    options: &FormatOptions,
) -> FormattedQuery {
    let query = query.into();
    match format {
        Format::Json => FormattedQuery::Text(to_json(query, options)),
        Format::JsonWithoutIds => FormattedQuery::Text(to_json_without_ids(query, options)),
        Format::Sql => FormattedQuery::Text(to_sql(query, options)),
        Format::Parameterized => {
            FormattedQuery::Parameterized(to_parameterized_sql(query, options))
        }
        Format::ParameterizedNamed => FormattedQuery::Named(to_named_sql(query, options)),
        Format::MongoDb => FormattedQuery::Object(to_mongodb(query, options)),
        Format::Cel => FormattedQuery::Text(to_cel(query, options)),
        Format::Spel => FormattedQuery::Text(to_spel(query, options)),
        Format::JsonLogic => FormattedQuery::Object(to_jsonlogic(query, options)),
        Format::Postgrest => FormattedQuery::Object(to_postgrest(query, options)),
        Format::ElasticSearch => FormattedQuery::Object(to_elasticsearch(query, options)),
        Format::Jsonata => FormattedQuery::Text(to_jsonata(query, options)),
        Format::Natural => FormattedQuery::Text(to_natural_language(query, options)),
    }
}

/// Render a SQL `WHERE` fragment with inline values.
pub fn to_sql<'a>(query: impl Into<QueryRef<'a>>, options: &FormatOptions) -> String {
    sql::render(query.into().into(), options, SqlExportMode::Inline).sql
}

/// Render SQL with `?` (or numbered) placeholders and the positional
/// parameter list.
pub fn to_parameterized_sql<'a>(
    query: impl Into<QueryRef<'a>>,
    options: &FormatOptions,
) -> ParameterizedSql {
    let rendered = sql::render(query.into().into(), options, SqlExportMode::Positional);
    ParameterizedSql {
        sql: rendered.sql,
        params: rendered.positional,
    }
}

/// Render SQL with named placeholders and the parameter map.
pub fn to_named_sql<'a>(query: impl Into<QueryRef<'a>>, options: &FormatOptions) -> NamedSql {
    let rendered = sql::render(query.into().into(), options, SqlExportMode::Named);
    NamedSql {
        sql: rendered.sql,
        params: rendered.named,
    }
}

pub fn to_mongodb<'a>(query: impl Into<QueryRef<'a>>, options: &FormatOptions) -> serde_json::Value {
    mongodb::render(query.into().into(), options)
}

pub fn to_cel<'a>(query: impl Into<QueryRef<'a>>, options: &FormatOptions) -> String {
    cel::render(query.into().into(), options)
}

pub fn to_spel<'a>(query: impl Into<QueryRef<'a>>, options: &FormatOptions) -> String {
    spel::render(query.into().into(), options)
}

pub fn to_jsonlogic<'a>(
    query: impl Into<QueryRef<'a>>,
    options: &FormatOptions,
) -> serde_json::Value {
    jsonlogic::render(query.into().into(), options)
}

pub fn to_postgrest<'a>(
    query: impl Into<QueryRef<'a>>,
    options: &FormatOptions,
) -> serde_json::Value {
    postgrest::render(query.into().into(), options)
}

pub fn to_elasticsearch<'a>(
    query: impl Into<QueryRef<'a>>,
    options: &FormatOptions,
) -> serde_json::Value {
    elasticsearch::render(query.into().into(), options)
}

pub fn to_jsonata<'a>(query: impl Into<QueryRef<'a>>, options: &FormatOptions) -> String {
    jsonata::render(query.into().into(), options)
}

pub fn to_natural_language<'a>(
    query: impl Into<QueryRef<'a>>,
    options: &FormatOptions,
) -> String {
    natural::render(query.into().into(), options)
}

/// Pretty-printed canonical JSON. Validation does not apply; the only
/// option honored is `parse_numbers`.
pub fn to_json<'a>(query: impl Into<QueryRef<'a>>, options: &FormatOptions) -> String {
    match query.into() {
        QueryRef::Standard(group) => {
            if options.parse_numbers {
                serde_json::to_string_pretty(&parse_number_values(group))
            } else {
                serde_json::to_string_pretty(group)
            }
        }
        QueryRef::Ic(group) => {
            if options.parse_numbers {
                serde_json::to_string_pretty(&parse_number_values_ic(group))
            } else {
                serde_json::to_string_pretty(group)
            }
        }
    }
    .unwrap_or_default()
}

/// Compact canonical JSON with every `id` stripped.
pub fn to_json_without_ids<'a>(query: impl Into<QueryRef<'a>>, options: &FormatOptions) -> String {
    match query.into() {
        QueryRef::Standard(group) => {
            let stripped = strip_ids(group);
            if options.parse_numbers {
                serde_json::to_string(&parse_number_values(&stripped))
            } else {
                serde_json::to_string(&stripped)
            }
        }
        QueryRef::Ic(group) => {
            let stripped = strip_ids_ic(group);
            if options.parse_numbers {
                serde_json::to_string(&parse_number_values_ic(&stripped))
            } else {
                serde_json::to_string(&stripped)
            }
        }
    }
    .unwrap_or_default()
}
