//! Byte-level routing trie.
//!
//! Literal pattern text is stored one byte per edge until [`Trie::compress`]
//! merges chains of route-less nodes into multi-byte keys. Placeholders get
//! their own edges:
//!
//! - `:name` captures up to the next `/` or `.`
//! - `#name` captures up to the next `/`
//! - `*name` captures the rest of the path
//!
//! Lookup explores every edge that could apply and reports all matches, so
//! ambiguity is resolved by the caller.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::mem;

use jsonrest_core::ConfigError;
use smallvec::SmallVec;

use crate::params::Params;

const PARAM_MARKER: u8 = b':';
const RELAXED_MARKER: u8 = b'#';
const SPLAT_MARKER: u8 = b'*';

type Captures<'a, 'p> = SmallVec<[(&'a str, &'p [u8]); 4]>;

/// A value found for a path, with the placeholders captured on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'a, V> {
    /// The value stored for the matched method.
    pub value: &'a V,
    /// Captured placeholder values, raw (still percent-encoded).
    pub params: Params,
}

/// Routing trie keyed by method and path pattern.
///
/// # Example
///
/// ```rust
/// use jsonrest_router::Trie;
///
/// let mut trie = Trie::new();
/// trie.add("GET", "/users/:id", 1).unwrap();
/// trie.add("GET", "/files/*path", 2).unwrap();
/// trie.compress();
///
/// let (matches, path_matched) = trie.find("GET", "/users/123");
/// assert!(path_matched);
/// assert_eq!(*matches[0].value, 1);
/// assert_eq!(matches[0].params.get("id"), Some("123"));
///
/// let (matches, path_matched) = trie.find("DELETE", "/users/123");
/// assert!(matches.is_empty());
/// assert!(path_matched);
/// ```
#[derive(Debug, Clone)]
pub struct Trie<V> {
    root: Node<V>,
    compressed: bool,
    route_count: usize,
}

#[derive(Debug, Clone)]
struct Node<V> {
    routes: HashMap<String, V>,
    children: HashMap<Vec<u8>, Node<V>>,
    children_key_len: usize,
    param: Option<Placeholder<V>>,
    relaxed: Option<Placeholder<V>>,
    splat: Option<Placeholder<V>>,
}

#[derive(Debug, Clone)]
struct Placeholder<V> {
    name: String,
    node: Box<Node<V>>,
}

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Trie<V> {
    /// Creates an empty trie.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::default(),
            compressed: false,
            route_count: 0,
        }
    }

    /// Number of (method, pattern) entries added.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.route_count
    }

    /// Returns true once [`compress`](Self::compress) has run.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Adds `value` for `method` at `pattern`.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate (method, pattern), a placeholder name used twice
    /// in one pattern, placeholders named differently at the same position,
    /// an empty or malformed placeholder name, or when the trie has already
    /// been compressed.
    pub fn add(&mut self, method: &str, pattern: &str, value: V) -> Result<(), ConfigError> {
        if self.compressed {
            return Err(ConfigError::TrieCompressed);
        }
        // Checked before anything is created so a rejected pattern leaves
        // the trie as it was.
        Node::check(Some(&self.root), method, pattern.as_bytes(), pattern, &mut Vec::new())?;
        self.root
            .add(method, pattern.as_bytes(), pattern, value, &mut Vec::new())?;
        self.route_count += 1;
        Ok(())
    }

    /// Merges route-less literal chains into longer keys.
    ///
    /// Lookups give the same results before and after. Nothing can be added
    /// afterwards.
    pub fn compress(&mut self) {
        self.root.compress();
        self.compressed = true;
    }

    /// Finds every value registered for `method` that matches `path`.
    ///
    /// The flag is true when some route matches the path for any method,
    /// which tells a 405 apart from a 404.
    #[must_use]
    pub fn find(&self, method: &str, path: &str) -> (Vec<Match<'_, V>>, bool) {
        let mut matches = Vec::new();
        let mut path_matched = false;
        let mut captures = Captures::new();
        self.root
            .find(path.as_bytes(), &mut captures, &mut |node, captures| {
                if node.routes.is_empty() {
                    return;
                }
                path_matched = true;
                if let Some(value) = node.routes.get(method) {
                    matches.push(Match {
                        value,
                        params: Params::from_captures(captures),
                    });
                }
            });
        (matches, path_matched)
    }

    /// Finds the values of every method that matches `path`.
    #[must_use]
    pub fn find_routes_for_path(&self, path: &str) -> Vec<Match<'_, V>> {
        let mut matches = Vec::new();
        let mut captures = Captures::new();
        self.root
            .find(path.as_bytes(), &mut captures, &mut |node, captures| {
                for value in node.routes.values() {
                    matches.push(Match {
                        value,
                        params: Params::from_captures(captures),
                    });
                }
            });
        matches
    }

    /// Renders the tree, one node per line, for debugging.
    #[must_use]
    pub fn print_debug(&self) -> String {
        let mut out = String::new();
        self.root.print_debug(&mut out, 0, "");
        out
    }
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
            children: HashMap::new(),
            children_key_len: 1,
            param: None,
            relaxed: None,
            splat: None,
        }
    }
}

impl<V> Node<V> {
    fn add(
        &mut self,
        method: &str,
        rest: &[u8],
        pattern: &str,
        value: V,
        used_names: &mut Vec<String>,
    ) -> Result<(), ConfigError> {
        let Some(&first) = rest.first() else {
            if self.routes.contains_key(method) {
                return Err(ConfigError::DuplicateRoute {
                    method: method.to_string(),
                    pattern: pattern.to_string(),
                });
            }
            self.routes.insert(method.to_string(), value);
            return Ok(());
        };

        if !matches!(first, PARAM_MARKER | RELAXED_MARKER | SPLAT_MARKER) {
            return self
                .children
                .entry(rest[..1].to_vec())
                .or_default()
                .add(method, &rest[1..], pattern, value, used_names);
        }

        let tail = &rest[1..];
        let end = match first {
            PARAM_MARKER => tail.iter().position(|b| *b == b'/' || *b == b'.'),
            RELAXED_MARKER => tail.iter().position(|b| *b == b'/'),
            _ => None,
        }
        .unwrap_or(tail.len());
        let name = placeholder_name(&tail[..end], pattern)?;
        if used_names.iter().any(|used| used == name) {
            return Err(ConfigError::DuplicatePlaceholder(name.to_string()));
        }
        used_names.push(name.to_string());

        let slot = match first {
            PARAM_MARKER => &mut self.param,
            RELAXED_MARKER => &mut self.relaxed,
            _ => &mut self.splat,
        };
        let child = slot.get_or_insert_with(|| Placeholder {
            name: name.to_string(),
            node: Box::default(),
        });
        if child.name != name {
            return Err(ConfigError::InconsistentPlaceholder {
                existing: child.name.clone(),
                found: name.to_string(),
            });
        }
        child
            .node
            .add(method, &tail[end..], pattern, value, used_names)
    }

    /// Runs the checks of [`add`](Self::add) along the existing nodes
    /// without creating any.
    fn check(
        node: Option<&Self>,
        method: &str,
        rest: &[u8],
        pattern: &str,
        used_names: &mut Vec<String>,
    ) -> Result<(), ConfigError> {
        let Some(&first) = rest.first() else {
            if node.is_some_and(|n| n.routes.contains_key(method)) {
                return Err(ConfigError::DuplicateRoute {
                    method: method.to_string(),
                    pattern: pattern.to_string(),
                });
            }
            return Ok(());
        };

        if !matches!(first, PARAM_MARKER | RELAXED_MARKER | SPLAT_MARKER) {
            let child = node.and_then(|n| n.children.get(&rest[..1]));
            return Self::check(child, method, &rest[1..], pattern, used_names);
        }

        let tail = &rest[1..];
        let end = match first {
            PARAM_MARKER => tail.iter().position(|b| *b == b'/' || *b == b'.'),
            RELAXED_MARKER => tail.iter().position(|b| *b == b'/'),
            _ => None,
        }
        .unwrap_or(tail.len());
        let name = placeholder_name(&tail[..end], pattern)?;
        if used_names.iter().any(|used| used == name) {
            return Err(ConfigError::DuplicatePlaceholder(name.to_string()));
        }
        used_names.push(name.to_string());

        let slot = node.and_then(|n| match first {
            PARAM_MARKER => n.param.as_ref(),
            RELAXED_MARKER => n.relaxed.as_ref(),
            _ => n.splat.as_ref(),
        });
        if let Some(existing) = slot.filter(|p| p.name != name) {
            return Err(ConfigError::InconsistentPlaceholder {
                existing: existing.name.clone(),
                found: name.to_string(),
            });
        }
        Self::check(
            slot.map(|p| &*p.node),
            method,
            &tail[end..],
            pattern,
            used_names,
        )
    }

    /// A literal child that only links to deeper literals.
    fn is_plain_link(&self) -> bool {
        self.routes.is_empty()
            && self.param.is_none()
            && self.relaxed.is_none()
            && self.splat.is_none()
    }

    fn compress(&mut self) {
        for placeholder in [&mut self.splat, &mut self.param, &mut self.relaxed]
            .into_iter()
            .flatten()
        {
            placeholder.node.compress();
        }

        while !self.children.is_empty() && self.children.values().all(Self::is_plain_link) {
            let mut merged = HashMap::new();
            for (key, child) in mem::take(&mut self.children) {
                for (grand_key, grand_child) in child.children {
                    let mut joined = key.clone();
                    joined.extend_from_slice(&grand_key);
                    merged.insert(joined, grand_child);
                }
            }
            self.children = merged;
            self.children_key_len += 1;
        }

        for child in self.children.values_mut() {
            child.compress();
        }
    }

    fn find<'a, 'p>(
        &'a self,
        path: &'p [u8],
        captures: &mut Captures<'a, 'p>,
        visit: &mut dyn FnMut(&'a Self, &[(&'a str, &'p [u8])]),
    ) {
        if path.is_empty() {
            visit(self, captures);
            return;
        }

        if let Some(splat) = &self.splat {
            captures.push((splat.name.as_str(), path));
            splat.node.find(&[], captures, visit);
            captures.pop();
        }

        if let Some(param) = &self.param {
            let end = path
                .iter()
                .position(|b| *b == b'/' || *b == b'.')
                .unwrap_or(path.len());
            captures.push((param.name.as_str(), &path[..end]));
            param.node.find(&path[end..], captures, visit);
            captures.pop();
        }

        if let Some(relaxed) = &self.relaxed {
            let end = path.iter().position(|b| *b == b'/').unwrap_or(path.len());
            captures.push((relaxed.name.as_str(), &path[..end]));
            relaxed.node.find(&path[end..], captures, visit);
            captures.pop();
        }

        if path.len() < self.children_key_len {
            return;
        }
        let (token, remaining) = path.split_at(self.children_key_len);
        if let Some(child) = self.children.get(token) {
            child.find(remaining, captures, visit);
        }
    }

    fn print_debug(&self, out: &mut String, depth: usize, label: &str) {
        let mut methods: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        methods.sort_unstable();
        let _ = writeln!(
            out,
            "{}{} {:?}",
            "  ".repeat(depth),
            if label.is_empty() { "(root)" } else { label },
            methods
        );

        for (marker, placeholder) in [("*", &self.splat), (":", &self.param), ("#", &self.relaxed)] {
            if let Some(placeholder) = placeholder {
                let label = format!("{marker}{}", placeholder.name);
                placeholder.node.print_debug(out, depth + 1, &label);
            }
        }

        let mut keys: Vec<&Vec<u8>> = self.children.keys().collect();
        keys.sort();
        for key in keys {
            let label = String::from_utf8_lossy(key);
            self.children[key].print_debug(out, depth + 1, &label);
        }
    }
}

fn placeholder_name<'n>(raw: &'n [u8], pattern: &str) -> Result<&'n str, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::EmptyPlaceholderName(pattern.to_string()));
    }
    let invalid = || ConfigError::InvalidPlaceholderName(String::from_utf8_lossy(raw).into_owned());
    let name = std::str::from_utf8(raw).map_err(|_| invalid())?;
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid());
    }
    Ok(name)
}
