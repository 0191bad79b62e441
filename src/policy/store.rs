//! The hierarchical path store: a trie over dotted-path segments.
//!
//! Each node carries two independent flags. `allowed` marks the node's own
//! path as permitted; `suppressed` blocks the node and its entire subtree.
//! The flags never clear each other: `allow` after `suppress` leaves the
//! path blocked, and a later operator decision can flip either flag without
//! losing the other. Children are kept in a `BTreeMap` so every traversal
//! (flatten, intersection, serialization) is deterministic.

use super::path::FieldPath;

use std::collections::BTreeMap;

/// Result of a single path lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The terminal node is explicitly allowed and nothing above it is
    /// suppressed.
    Allowed,
    /// The path or one of its ancestors carries a suppression flag.
    BlockedSuppressed,
    /// The path does not exist, or exists without an allow flag.
    DeniedNotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TrieNode {
    pub(crate) allowed: bool,
    pub(crate) suppressed: bool,
    pub(crate) children: BTreeMap<String, TrieNode>,
}

/// A per-service policy store. Cloning produces a deep, independent copy.
/// Equality is structural: same tree, same flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyStore {
    root: TrieNode,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn root(&self) -> &TrieNode {
        &self.root
    }

    pub(crate) fn from_root(root: TrieNode) -> Self {
        Self { root }
    }

    /// Mark `path` as explicitly allowed, creating intermediate nodes as
    /// needed. Idempotent; never touches suppression flags.
    pub fn allow(&mut self, path: &FieldPath) {
        self.walk_create(path).allowed = true;
    }

    /// Mark `path` as suppressed, blocking it and everything beneath it.
    /// Idempotent; never touches allow flags.
    pub fn suppress(&mut self, path: &FieldPath) {
        self.walk_create(path).suppressed = true;
    }

    fn walk_create(&mut self, path: &FieldPath) -> &mut TrieNode {
        let mut node = &mut self.root;
        for segment in path.segments() {
            node = node.children.entry(segment.to_owned()).or_default();
        }
        node
    }

    /// Look up `path`. Suppression anywhere on the walk wins immediately,
    /// even when deeper segments are missing; a missing segment otherwise
    /// denies; the terminal's allow flag decides the rest.
    pub fn check(&self, path: &FieldPath) -> Access {
        if self.root.suppressed {
            return Access::BlockedSuppressed;
        }
        let mut node = &self.root;
        for segment in path.segments() {
            match node.children.get(segment) {
                Some(child) => {
                    if child.suppressed {
                        return Access::BlockedSuppressed;
                    }
                    node = child;
                }
                None => return Access::DeniedNotFound,
            }
        }
        if node.allowed {
            Access::Allowed
        } else {
            Access::DeniedNotFound
        }
    }

    /// Emit every path allowed in both `self` and `other`, walking the two
    /// tries in lockstep along shared keys. Output order is the pre-order
    /// traversal of `self`. Suppression flags are ignored here; pruning is
    /// the compiler's job.
    pub fn intersection(&self, other: &PolicyStore) -> Vec<String> {
        let mut out = Vec::new();
        intersect_into(&self.root, &other.root, String::new(), &mut out);
        out
    }

    /// Emit the effective allow set in pre-order: a suppressed node emits
    /// nothing and prunes its whole subtree; an allowed node emits its
    /// dotted path. The root itself never emits.
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::new();
        flatten_into(&self.root, String::new(), &mut out);
        out
    }

    /// Copy suppression (and only suppression) from `other` into `self`:
    /// every path whose terminal is suppressed in `other` and accepted by
    /// `filter` is suppressed here, creating nodes as needed.
    pub fn transduce_from<F>(&mut self, other: &PolicyStore, mut filter: F)
    where
        F: FnMut(&str) -> bool,
    {
        for path in other.suppressed_paths() {
            if filter(&path) {
                self.suppress_segments(path.split('.'));
            }
        }
    }

    /// Every path whose terminal node is suppressed, in pre-order. Unlike
    /// `flatten`, this does not prune: suppressed nodes below suppressed
    /// ancestors are still reported.
    pub fn suppressed_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        suppressed_into(&self.root, String::new(), &mut out);
        out
    }

    /// Total number of nodes, including the root.
    pub fn node_count(&self) -> u64 {
        count_nodes(&self.root)
    }

    /// Suppress along raw pre-validated segments. Used for transduction and
    /// codec reload, where paths come out of an existing trie rather than
    /// untrusted input.
    pub(crate) fn suppress_segments<'a, I>(&mut self, segments: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut node = &mut self.root;
        for segment in segments {
            node = node.children.entry(segment.to_owned()).or_default();
        }
        node.suppressed = true;
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

fn flatten_into(node: &TrieNode, prefix: String, out: &mut Vec<String>) {
    if node.suppressed {
        return;
    }
    if node.allowed && !prefix.is_empty() {
        out.push(prefix.clone());
    }
    for (key, child) in &node.children {
        flatten_into(child, join(&prefix, key), out);
    }
}

fn intersect_into(a: &TrieNode, b: &TrieNode, prefix: String, out: &mut Vec<String>) {
    if a.allowed && b.allowed && !prefix.is_empty() {
        out.push(prefix.clone());
    }
    for (key, a_child) in &a.children {
        if let Some(b_child) = b.children.get(key) {
            intersect_into(a_child, b_child, join(&prefix, key), out);
        }
    }
}

fn suppressed_into(node: &TrieNode, prefix: String, out: &mut Vec<String>) {
    if node.suppressed && !prefix.is_empty() {
        out.push(prefix.clone());
    }
    for (key, child) in &node.children {
        suppressed_into(child, join(&prefix, key), out);
    }
}

fn count_nodes(node: &TrieNode) -> u64 {
    1 + node.children.values().map(count_nodes).sum::<u64>()
}
