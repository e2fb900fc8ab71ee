//! Query parameters with key-only identity.
//!
//! # Design
//! A `QueryParameter` is identified by its key alone: two parameters with
//! the same key and different values compare equal. `QueryParameters`
//! stores them in an explicit insertion-ordered list keyed by name, so a
//! collection behaves as a key-unique map and renders a deterministic
//! query string. Overwriting a key keeps the key's original position.

use std::fmt;
use std::hash::{Hash, Hasher};

/// A scalar query value with a canonical, lossless string form.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Int(v) => write!(f, "{v}"),
            QueryValue::UInt(v) => write!(f, "{v}"),
            QueryValue::Float(v) => write!(f, "{v}"),
            QueryValue::Bool(v) => write!(f, "{v}"),
            QueryValue::Str(v) => f.write_str(v),
        }
    }
}

macro_rules! query_value_from {
    ($variant:ident, $target:ty, [$($source:ty),*]) => {
        $(
            impl From<$source> for QueryValue {
                fn from(value: $source) -> Self {
                    QueryValue::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

query_value_from!(Int, i64, [i8, i16, i32, i64]);
query_value_from!(UInt, u64, [u8, u16, u32, u64]);
query_value_from!(Float, f64, [f32, f64]);
query_value_from!(Bool, bool, [bool]);
query_value_from!(Str, String, [String, &str]);

/// One key/value element of a query string.
#[derive(Debug, Clone)]
pub struct QueryParameter {
    key: String,
    value: QueryValue,
}

impl QueryParameter {
    pub fn new(key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &QueryValue {
        &self.value
    }

    /// The `(name, value)` pair written into the query string.
    pub fn to_query_item(&self) -> (String, String) {
        (self.key.clone(), self.value.to_string())
    }
}

impl PartialEq for QueryParameter {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for QueryParameter {}

impl Hash for QueryParameter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Key-unique, insertion-ordered collection of query parameters.
#[derive(Debug, Clone, Default)]
pub struct QueryParameters {
    entries: Vec<QueryParameter>,
}

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `parameter`, replacing any entry with the same key.
    ///
    /// Returns the replaced entry, if there was one.
    pub fn insert(&mut self, parameter: QueryParameter) -> Option<QueryParameter> {
        match self.position(&parameter.key) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index], parameter)),
            None => {
                self.entries.push(parameter);
                None
            }
        }
    }

    /// Merge `incoming` into this collection, last writer wins per key.
    pub fn merge<I>(&mut self, incoming: I)
    where
        I: IntoIterator<Item = QueryParameter>,
    {
        for parameter in incoming {
            self.insert(parameter);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryParameter> {
        self.position(key).map(|index| self.entries.remove(index))
    }

    pub fn get(&self, key: &str) -> Option<&QueryParameter> {
        self.entries.iter().find(|p| p.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryParameter> {
        self.entries.iter()
    }

    /// Wire `(name, value)` pairs in insertion order.
    pub fn to_query_items(&self) -> Vec<(String, String)> {
        self.entries.iter().map(QueryParameter::to_query_item).collect()
    }

    /// Build parameters from wire query items. Values are kept verbatim as
    /// strings and the last occurrence of a repeated name wins.
    pub fn from_query_items<I, K, V>(items: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        items
            .into_iter()
            .map(|(key, value)| QueryParameter::new(key, QueryValue::Str(value.into())))
            .collect()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|p| p.key == key)
    }
}

/// Same set of keys, regardless of order or values.
impl PartialEq for QueryParameters {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.entries.iter().all(|p| other.contains_key(&p.key))
    }
}

impl Eq for QueryParameters {}

impl FromIterator<QueryParameter> for QueryParameters {
    fn from_iter<I: IntoIterator<Item = QueryParameter>>(iter: I) -> Self {
        let mut parameters = QueryParameters::new();
        parameters.merge(iter);
        parameters
    }
}

impl Extend<QueryParameter> for QueryParameters {
    fn extend<I: IntoIterator<Item = QueryParameter>>(&mut self, iter: I) {
        self.merge(iter);
    }
}

impl<const N: usize> From<[QueryParameter; N]> for QueryParameters {
    fn from(parameters: [QueryParameter; N]) -> Self {
        parameters.into_iter().collect()
    }
}

impl From<Vec<QueryParameter>> for QueryParameters {
    fn from(parameters: Vec<QueryParameter>) -> Self {
        parameters.into_iter().collect()
    }
}

impl IntoIterator for QueryParameters {
    type Item = QueryParameter;
    type IntoIter = std::vec::IntoIter<QueryParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a QueryParameters {
    type Item = &'a QueryParameter;
    type IntoIter = std::slice::Iter<'a, QueryParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
