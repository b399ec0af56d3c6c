use quarrel::{
    parse_cel, parse_mongodb, parse_sql, parse_sql_ic, to_json, FormatOptions,
    ObjectParseOptions, ParseOptions, SqlParseOptions,
};

fn main() {
    // The same filter written three ways
    let sql = "SELECT * FROM musicians WHERE first_name LIKE 'Stev%' AND (age >= 26 OR city = 'Austin')";
    let mongo = r#"{"$and": [
        {"first_name": {"$regex": "^Stev"}},
        {"$or": [{"age": {"$gte": 26}}, {"city": "Austin"}]}
    ]}"#;
    let cel = r#"first_name.startsWith("Stev") && (age >= 26 || city == "Austin")"#;

    let from_sql = parse_sql(sql, &SqlParseOptions::new());
    let from_mongo = parse_mongodb(mongo, &ObjectParseOptions::new());
    let from_cel = parse_cel(cel, &ParseOptions::new());

    let options = FormatOptions::new();
    println!("sql:     {}", to_json(&from_sql, &options));
    println!("mongodb: {}", to_json(&from_mongo, &options));
    println!("cel:     {}", to_json(&from_cel, &options));

    // Combinators can also stay inline between the operands
    let list = parse_sql_ic("a = 1 AND b = 2 OR c = 3", &SqlParseOptions::new());
    println!("inline:  {}", serde_json::to_string(&list).expect("token list serializes"));
}
