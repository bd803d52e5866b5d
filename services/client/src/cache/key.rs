//! services/client/src/cache/key.rs
//!
//! Cache keys: a resource path plus every parameter that affects the result.
//! Equality is by value, so two keys built in different orders share a slot.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    path: Vec<String>,
    params: BTreeMap<String, String>,
}

impl QueryKey {
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            params: BTreeMap::new(),
        }
    }

    /// Adds a parameter. Blank values are dropped so "" and "unset" collide.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        let value = value.to_string();
        if !value.trim().is_empty() {
            self.params.insert(name.into(), value);
        }
        self
    }

    pub fn params<I, K, V>(self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        params
            .into_iter()
            .fold(self, |key, (name, value)| key.param(name, value))
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// True when `prefix`'s path is a leading segment run of this key's path
    /// and every parameter of `prefix` is present here with the same value.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.path.len() >= prefix.path.len()
            && self.path.iter().zip(&prefix.path).all(|(a, b)| a == b)
            && prefix
                .params
                .iter()
                .all(|(k, v)| self.params.get(k) == Some(v))
    }
}

/// Stable serialisation: `a/b?k1=v1&k2=v2` with parameters sorted by name.
impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path.join("/"))?;
        let mut sep = '?';
        for (k, v) in &self.params {
            write!(f, "{}{}={}", sep, k, v)?;
            sep = '&';
        }
        Ok(())
    }
}
