use serde_json::Value;

/// Predicate over stored JSON documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    /// Case-insensitive substring match on a string field.
    Contains(String, String),
    StartsWith(String, String),
    In(String, Vec<Value>),
    /// Field is present and not null.
    Exists(String),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Filter::Contains(field.into(), needle.into())
    }

    pub fn starts_with(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Filter::StartsWith(field.into(), prefix.into())
    }

    pub fn any_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::In(field.into(), values)
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Filter::Exists(field.into())
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, expected) => doc.get(field) == Some(expected),
            Filter::Contains(field, needle) => doc
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
            Filter::StartsWith(field, prefix) => doc
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.starts_with(prefix.as_str())),
            Filter::In(field, values) => doc.get(field).is_some_and(|v| values.contains(v)),
            Filter::Exists(field) => doc.get(field).is_some_and(|v| !v.is_null()),
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
        }
    }
}

/// Keeps only the listed top-level fields of a document.
pub fn project(doc: Value, fields: Option<&[&str]>) -> Value {
    match (doc, fields) {
        (Value::Object(map), Some(fields)) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| fields.contains(&k.as_str()))
                .collect(),
        ),
        (doc, _) => doc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block() -> Value {
        json!({ "slot": 10, "proposer_index": 7, "graffiti": "RocketPool Lighthouse", "fee_recipient": null })
    }

    #[test]
    fn contains_is_case_insensitive() {
        assert!(Filter::contains("graffiti", "rocketpool").matches(&block()));
        assert!(Filter::contains("graffiti", "").matches(&block()));
        assert!(!Filter::contains("graffiti", "teku").matches(&block()));
        assert!(!Filter::contains("missing", "").matches(&block()));
    }

    #[test]
    fn eq_in_and_exists() {
        assert!(Filter::eq("slot", 10).matches(&block()));
        assert!(!Filter::eq("slot", 11).matches(&block()));
        assert!(Filter::any_of("proposer_index", vec![json!(1), json!(7)]).matches(&block()));
        assert!(!Filter::exists("fee_recipient").matches(&block()));
        assert!(Filter::exists("graffiti").matches(&block()));
    }

    #[test]
    fn and_requires_all() {
        let filter = Filter::And(vec![
            Filter::starts_with("graffiti", "Rocket"),
            Filter::eq("proposer_index", 8),
        ]);
        assert!(!filter.matches(&block()));
    }

    #[test]
    fn projection_keeps_listed_fields() {
        let projected = project(block(), Some(&["slot", "graffiti"][..]));
        assert_eq!(projected, json!({ "slot": 10, "graffiti": "RocketPool Lighthouse" }));
        assert_eq!(project(block(), None), block());
    }
}
