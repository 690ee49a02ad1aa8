/// XRPC query parameters
///
/// Array values serialize as one `key=value` pair per element, in order,
/// which is how XRPC expects multi-value filters (`uris=a&uris=b`).

/// Single query parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::One(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::One(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::One(value.clone())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::One(value.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::One(value.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Many(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ParamValue {
    fn from(values: [&str; N]) -> Self {
        ParamValue::Many(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Ordered parameter list for a GET call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, keeping insertion order
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Percent-encoded query string without the leading `?`
    pub fn to_query_string(&self) -> String {
        let mut pairs = Vec::new();

        for (key, value) in &self.entries {
            let key = urlencoding::encode(key);
            match value {
                ParamValue::One(v) => {
                    pairs.push(format!("{}={}", key, urlencoding::encode(v)));
                }
                ParamValue::Many(values) => {
                    for v in values {
                        pairs.push(format!("{}={}", key, urlencoding::encode(v)));
                    }
                }
            }
        }

        pairs.join("&")
    }
}
