use quarrel::{field, format_query, Format, FormatOptions, FormattedQuery, RuleGroup};

fn main() {
    // Build a query
    let query = RuleGroup::and()
        .rule(field("first_name").begins_with("Stev"))
        .rule(field("last_name").in_list("Vai, Vaughan"))
        .group(
            RuleGroup::or()
                .rule(field("age").between(26_i64, 37_i64))
                .rule(field("city").eq("Austin"))
                .negate(),
        );

    // Render it in every dialect
    let options = FormatOptions::new();
    for format in [
        Format::Sql,
        Format::Parameterized,
        Format::ParameterizedNamed,
        Format::MongoDb,
        Format::Cel,
        Format::Spel,
        Format::JsonLogic,
        Format::Postgrest,
        Format::ElasticSearch,
        Format::Jsonata,
        Format::Natural,
    ] {
        match format_query(&query, format, &options) {
            FormattedQuery::Text(text) => println!("{}: {text}", format.as_str()),
            FormattedQuery::Parameterized(p) => {
                println!("{}: {} with {:?}", format.as_str(), p.sql, p.params);
            }
            FormattedQuery::Named(n) => {
                println!("{}: {} with {:?}", format.as_str(), n.sql, n.params);
            }
            FormattedQuery::Object(value) => println!("{}: {value}", format.as_str()),
        }
    }
}
