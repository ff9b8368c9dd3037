//! Cache key derivation.
//!
//! Keys are `<namespace>:<part>[-<part>…]` where every part is trimmed and
//! lowercased, so `"Paris"`, `" paris "` and `"PARIS"` share one entry.

use std::collections::HashMap;

/// Canonical form of a single key component.
pub fn normalize_part(part: &str) -> String {
    part.trim().to_lowercase()
}

/// Build a namespaced key from its components.
///
/// Returns `None` when there are no parts or any part is blank, in which
/// case the request is not cacheable.
pub fn cache_key<S: AsRef<str>>(namespace: &str, parts: &[S]) -> Option<String> {
    if parts.is_empty() {
        return None;
    }
    let mut normalized = Vec::with_capacity(parts.len());
    for part in parts {
        let part = normalize_part(part.as_ref());
        if part.is_empty() {
            return None;
        }
        normalized.push(part);
    }
    Some(format!("{namespace}:{}", normalized.join("-")))
}

/// Which path parameters make up the key for one cached endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    pub namespace: String,
    pub params: Vec<String>,
}

impl KeySpec {
    pub fn new<I, S>(namespace: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: namespace.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Derive the key from extracted path parameters.
    pub fn derive(&self, values: &HashMap<String, String>) -> Option<String> {
        let parts: Option<Vec<&str>> = self
            .params
            .iter()
            .map(|p| values.get(p).map(String::as_str))
            .collect();
        cache_key(&self.namespace, &parts?)
    }
}
