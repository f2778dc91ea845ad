use url::form_urlencoded::byte_serialize;

/// A single query parameter value as WordPress understands it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    /// Multi-value filter, sent as one comma-separated value.
    List(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        QueryValue::Text(value.clone())
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Integer(value)
    }
}

impl From<u64> for QueryValue {
    fn from(value: u64) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Integer(i64::from(value))
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::List(values)
    }
}

impl From<&Vec<String>> for QueryValue {
    fn from(values: &Vec<String>) -> Self {
        QueryValue::List(values.clone())
    }
}

impl From<&Vec<u64>> for QueryValue {
    fn from(values: &Vec<u64>) -> Self {
        QueryValue::List(values.iter().map(u64::to_string).collect())
    }
}

/// Ordered parameter set for one request. Absent values are kept so callers
/// can push optional fields unconditionally; they are dropped at encode time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, Option<QueryValue>)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(self, key: &str, value: impl Into<QueryValue>) -> Self {
        self.opt(key, Some(value))
    }

    pub fn opt<V: Into<QueryValue>>(mut self, key: &str, value: Option<V>) -> Self {
        self.push(key, value.map(Into::into));
        self
    }

    pub fn push(&mut self, key: &str, value: Option<QueryValue>) {
        self.entries.push((key.to_string(), value));
    }

    /// True when encoding would produce no parameters.
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    /// Canonical query string: `""` when empty, otherwise `?k=v&...`.
    pub fn encode(&self) -> String {
        let pairs: Vec<String> = self
            .present()
            .map(|(key, value)| format!("{}={}", encode_component(key), encode_value(value)))
            .collect();
        if pairs.is_empty() {
            String::new()
        } else {
            format!("?{}", pairs.join("&"))
        }
    }

    fn present(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().filter_map(|(key, value)| match value {
            Some(QueryValue::List(items)) if items.is_empty() => None,
            Some(value) => Some((key.as_str(), value)),
            None => None,
        })
    }
}

fn encode_value(value: &QueryValue) -> String {
    match value {
        QueryValue::Text(text) => encode_component(text),
        QueryValue::Integer(number) => number.to_string(),
        QueryValue::Bool(flag) => if *flag { "true" } else { "false" }.to_string(),
        // Each item is encoded on its own so the separator stays a literal comma.
        QueryValue::List(items) => items
            .iter()
            .map(|item| encode_component(item))
            .collect::<Vec<_>>()
            .join(","),
    }
}

fn encode_component(raw: &str) -> String {
    byte_serialize(raw.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_params_encode_to_empty_string() {
        assert_eq!(QueryParams::new().encode(), "");
        assert!(QueryParams::new().is_empty());
    }

    #[test]
    fn absent_values_are_omitted() {
        let query = QueryParams::new()
            .opt("search", None::<String>)
            .set("page", 2_u32)
            .opt("status", None::<Vec<String>>);
        assert_eq!(query.encode(), "?page=2");
        assert!(!query.encode().contains("search"));
    }

    #[test]
    fn only_absent_values_yield_empty_string() {
        let query = QueryParams::new().opt("search", None::<&str>);
        assert!(query.is_empty());
        assert_eq!(query.encode(), "");
    }

    #[test]
    fn lists_join_with_single_key_and_literal_commas() {
        let query = QueryParams::new().set(
            "status",
            vec!["publish".to_string(), "draft".to_string(), "publish".to_string()],
        );
        let encoded = query.encode();
        assert_eq!(encoded, "?status=publish,draft,publish");
        assert_eq!(encoded.matches("status=").count(), 1);
    }

    #[test]
    fn list_items_are_percent_encoded_individually() {
        let query = QueryParams::new().set("slug", vec!["a b".to_string(), "c&d".to_string()]);
        assert_eq!(query.encode(), "?slug=a+b,c%26d");
    }

    #[test]
    fn numeric_lists_keep_order() {
        let ids = vec![3_u64, 1, 2];
        let query = QueryParams::new().set("include", &ids);
        assert_eq!(query.encode(), "?include=3,1,2");
    }

    #[test]
    fn booleans_encode_as_literals() {
        let query = QueryParams::new()
            .set("force", true)
            .set("hide_empty", false);
        assert_eq!(query.encode(), "?force=true&hide_empty=false");
    }

    #[test]
    fn scalars_are_percent_encoded() {
        let query = QueryParams::new().set("search", "hello world & more");
        assert_eq!(query.encode(), "?search=hello+world+%26+more");
    }

    #[test]
    fn insertion_order_is_preserved() {
        let query = QueryParams::new()
            .set("per_page", 10_u32)
            .set("page", 1_u32)
            .set("order", "asc");
        assert_eq!(query.encode(), "?per_page=10&page=1&order=asc");
    }

    #[test]
    fn empty_list_is_treated_as_absent() {
        let query = QueryParams::new().set("tags", Vec::<String>::new());
        assert_eq!(query.encode(), "");
    }
}
