//! Compilation of a trie store into the immutable flat snapshot the data
//! plane queries.

use super::store::PolicyStore;
use super::PolicyError;

use std::collections::HashSet;

/// An immutable allow set for one service, published to the data plane.
///
/// Membership answers ALLOW in O(1); everything absent is blocked after
/// flattening, so the sidecar's decision is the complement of `contains`.
/// Snapshots are never mutated after construction and are shared as
/// `Arc<FlatSnapshot>`.
#[derive(Debug, Clone)]
pub struct FlatSnapshot {
    service_id: String,
    version: u64,
    paths: HashSet<String>,
}

impl FlatSnapshot {
    /// An empty snapshot, used when a service registers before any policy
    /// exists for it.
    pub(crate) fn empty(service_id: impl Into<String>, version: u64) -> Self {
        Self {
            service_id: service_id.into(),
            version,
            paths: HashSet::new(),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Exact-match membership; no wildcard or prefix semantics. Prefix
    /// matching was resolved at compile time by emitting one entry per
    /// allowed node.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Paths in sorted order, for listings and the wire encoding.
    pub fn sorted_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.paths.iter().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub(crate) fn from_paths(
        service_id: impl Into<String>,
        version: u64,
        paths: HashSet<String>,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            version,
            paths,
        }
    }
}

/// Flatten `store` into a snapshot carrying `version`.
///
/// Suppression pruning happens inside `flatten`, so every member of the
/// output set is reachable without crossing a suppressed node. Fails with
/// `Capacity` when the allow set exceeds `max_paths`; the caller keeps the
/// previously published snapshot in that case.
pub fn compile(
    store: &PolicyStore,
    service_id: &str,
    version: u64,
    max_paths: usize,
) -> Result<FlatSnapshot, PolicyError> {
    let flattened = store.flatten();
    let paths: HashSet<String> = flattened.into_iter().collect();
    if paths.len() > max_paths {
        return Err(PolicyError::Capacity(format!(
            "snapshot for {service_id} has {} paths, limit is {max_paths}",
            paths.len()
        )));
    }
    Ok(FlatSnapshot::from_paths(service_id, version, paths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::path::{FieldPath, PathLimits};
    use crate::policy::store::Access;

    fn p(raw: &str) -> FieldPath {
        FieldPath::parse(raw, &PathLimits::default()).unwrap()
    }

    #[test]
    fn compile_contains_exactly_the_flattened_set() {
        let mut store = PolicyStore::new();
        store.allow(&p("a.b.c"));
        store.allow(&p("a.b.d"));
        store.suppress(&p("a.b"));
        store.allow(&p("x.y"));

        let snapshot = compile(&store, "svc", 1, 1_000).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains("x.y"));
        assert!(!snapshot.contains("a.b.c"));
        assert!(!snapshot.contains("a.b.d"));
    }

    #[test]
    fn compile_excludes_paths_under_suppressed_ancestors() {
        let mut store = PolicyStore::new();
        store.allow(&p("user.email"));
        store.suppress(&p("user"));

        let snapshot = compile(&store, "svc", 1, 1_000).unwrap();
        assert!(snapshot.is_empty());
        assert!(!snapshot.contains("user.email"));
    }

    #[test]
    fn compile_fidelity_against_check() {
        let mut store = PolicyStore::new();
        for path in ["a.b", "a.b.c", "a.x", "q.r", "q.r.s.t"] {
            store.allow(&p(path));
        }
        store.suppress(&p("q.r.s"));
        store.suppress(&p("a.x"));

        let snapshot = compile(&store, "svc", 1, 1_000).unwrap();
        for path in ["a.b", "a.b.c", "a.x", "q.r", "q.r.s.t", "nope"] {
            let check_allows = store.check(&p(path)) == Access::Allowed;
            assert_eq!(
                snapshot.contains(path),
                check_allows,
                "snapshot and check disagree on {path}"
            );
        }
    }

    #[test]
    fn compile_rejects_oversized_snapshots() {
        let mut store = PolicyStore::new();
        store.allow(&p("a"));
        store.allow(&p("b"));
        store.allow(&p("c"));

        let result = compile(&store, "svc", 1, 2);
        assert!(matches!(result, Err(PolicyError::Capacity(_))));
    }

    #[test]
    fn exact_match_only_no_prefix_semantics() {
        let mut store = PolicyStore::new();
        store.allow(&p("user.profile"));

        let snapshot = compile(&store, "svc", 1, 1_000).unwrap();
        assert!(snapshot.contains("user.profile"));
        assert!(!snapshot.contains("user"));
        assert!(!snapshot.contains("user.profile.email"));
    }

    #[test]
    fn sorted_paths_are_sorted() {
        let mut store = PolicyStore::new();
        store.allow(&p("zebra"));
        store.allow(&p("apple.pie"));
        store.allow(&p("mango"));

        let snapshot = compile(&store, "svc", 3, 1_000).unwrap();
        assert_eq!(snapshot.sorted_paths(), vec!["apple.pie", "mango", "zebra"]);
        assert_eq!(snapshot.version(), 3);
        assert_eq!(snapshot.service_id(), "svc");
    }
}
