//! Captured path parameters.
//!
//! Parameters are collected on a small stack during the trie walk and only
//! turned into owned strings when a match is produced.

use std::collections::HashMap;

use smallvec::SmallVec;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Parameters captured for one match, in pattern order.
///
/// # Example
///
/// ```rust
/// use jsonrest_router::Params;
///
/// let mut params = Params::new();
/// params.push("id", "123");
/// params.push("format", "json");
///
/// assert_eq!(params.get("id"), Some("123"));
/// assert_eq!(params.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates a new empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter to the set.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value for a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Converts to the map stored on the request.
    #[must_use]
    pub fn into_map(self) -> HashMap<String, String> {
        self.inner.into_iter().collect()
    }

    /// Builds the owned set from the borrowed capture stack of a trie walk.
    pub(crate) fn from_captures(captures: &[(&str, &[u8])]) -> Self {
        Self {
            inner: captures
                .iter()
                .map(|(name, value)| {
                    ((*name).to_string(), String::from_utf8_lossy(value).into_owned())
                })
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_push_and_get() {
        let mut params = Params::new();
        params.push("id", "123");
        params.push("name", "test");

        assert_eq!(params.get("id"), Some("123"));
        assert_eq!(params.get("name"), Some("test"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_params_from_captures() {
        let captures: [(&str, &[u8]); 2] = [("id", b"42"), ("rest", b"a/b.txt")];
        let params = Params::from_captures(&captures);

        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("rest"), Some("a/b.txt"));
    }

    #[test]
    fn test_params_into_map() {
        let mut params = Params::new();
        params.push("id", "1");
        let map = params.into_map();
        assert_eq!(map.get("id").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_params_iter_order() {
        let mut params = Params::new();
        params.push("a", "1");
        params.push("b", "2");

        let collected: Vec<_> = params.iter().collect();
        assert_eq!(collected, vec![("a", "1"), ("b", "2")]);
    }
}
