mod format;
mod parse;
mod transform;
mod types;
mod validate;

pub use format::{
    format_query, to_cel, to_elasticsearch, to_json, to_json_without_ids, to_jsonata,
    to_jsonlogic, to_mongodb, to_named_sql, to_natural_language, to_parameterized_sql,
    to_postgrest, to_spel, to_sql, Format, FormatOptions, FormattedQuery, NamedSql, ParamState,
    ParameterizedSql, RuleProcessor, SqlContext, SqlExportMode, SqlPreset, ValueProcessor,
};
pub use parse::{
    parse_cel, parse_cel_ic, parse_jsonata, parse_jsonata_ic, parse_jsonlogic,
    parse_jsonlogic_ic, parse_jsonlogic_value, parse_mongodb, parse_mongodb_ic,
    parse_mongodb_value, parse_postgrest, parse_postgrest_ic, parse_postgrest_value, parse_spel,
    parse_spel_ic, parse_sql, parse_sql_ic, CustomOpParser, ObjectParseOptions, ParseOptions,
    SqlParseOptions, ValueSourceResolver,
};
pub use transform::{
    parse_number_values, parse_number_values_ic, strip_ids, strip_ids_ic,
    to_independent_combinators, to_standard_combinators, TransformError,
};
pub use types::{
    field, Combinator, Field, FieldMap, FieldRule, FieldValidator, IcElement, Operator,
    QueryNode, QueryRef, Rule, RuleGroup, RuleGroupIc, RuleValue, ValueSource, PLACEHOLDER_NAME,
};
pub use validate::{QueryValidator, Validation, ValidationMap, Validity};
