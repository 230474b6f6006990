//! # Key Filters
//!
//! Purpose: Predicate and transform tokens that restrict which keys of a
//! bucket feed a map-reduce query. Each token serializes as a JSON array of
//! its name and arguments, e.g. `["starts_with", "a"]`.

use serde_json::{json, Value};

/// One key-filter token.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyFilter {
    // Transforms
    IntToString,
    StringToInt,
    FloatToString,
    StringToFloat,
    ToUpper,
    ToLower,
    UrlDecode,
    /// Splits the key on `separator` and keeps the token at `position`
    /// (one-based).
    Tokenize { separator: String, position: u32 },

    // Predicates
    StartsWith(String),
    EndsWith(String),
    /// Regular-expression match.
    Matches(String),
    Equal(Value),
    NotEqual(Value),
    GreaterThan(Value),
    GreaterThanEq(Value),
    LessThan(Value),
    LessThanEq(Value),
    Between { low: Value, high: Value, inclusive: bool },
    SetMember(Vec<Value>),
    /// Levenshtein distance match.
    SimilarTo { value: String, distance: u32 },

    // Composition
    And { left: Vec<KeyFilter>, right: Vec<KeyFilter> },
    Or { left: Vec<KeyFilter>, right: Vec<KeyFilter> },
    Not(Vec<KeyFilter>),
}

impl KeyFilter {
    /// Serializes the token for the `key_filters` section of a query.
    pub fn to_json(&self) -> Value {
        match self {
            KeyFilter::IntToString => json!(["int_to_string"]),
            KeyFilter::StringToInt => json!(["string_to_int"]),
            KeyFilter::FloatToString => json!(["float_to_string"]),
            KeyFilter::StringToFloat => json!(["string_to_float"]),
            KeyFilter::ToUpper => json!(["to_upper"]),
            KeyFilter::ToLower => json!(["to_lower"]),
            KeyFilter::UrlDecode => json!(["urldecode"]),
            KeyFilter::Tokenize { separator, position } => {
                json!(["tokenize", separator, position])
            }
            KeyFilter::StartsWith(arg) => json!(["starts_with", arg]),
            KeyFilter::EndsWith(arg) => json!(["ends_with", arg]),
            KeyFilter::Matches(arg) => json!(["matches", arg]),
            KeyFilter::Equal(arg) => json!(["eq", arg]),
            KeyFilter::NotEqual(arg) => json!(["neq", arg]),
            KeyFilter::GreaterThan(arg) => json!(["greater_than", arg]),
            KeyFilter::GreaterThanEq(arg) => json!(["greater_than_eq", arg]),
            KeyFilter::LessThan(arg) => json!(["less_than", arg]),
            KeyFilter::LessThanEq(arg) => json!(["less_than_eq", arg]),
            KeyFilter::Between { low, high, inclusive } => {
                json!(["between", low, high, inclusive])
            }
            KeyFilter::SetMember(values) => {
                let mut token = vec![json!("set_member")];
                token.extend(values.iter().cloned());
                Value::Array(token)
            }
            KeyFilter::SimilarTo { value, distance } => {
                json!(["similar_to", value, distance])
            }
            KeyFilter::And { left, right } => {
                json!(["and", Self::tokens(left), Self::tokens(right)])
            }
            KeyFilter::Or { left, right } => {
                json!(["or", Self::tokens(left), Self::tokens(right)])
            }
            KeyFilter::Not(filters) => json!(["not", Self::tokens(filters)]),
        }
    }

    fn tokens(filters: &[KeyFilter]) -> Value {
        Value::Array(filters.iter().map(KeyFilter::to_json).collect())
    }
}
