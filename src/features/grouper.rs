//! Path-heuristic feature grouping and inter-feature dependencies.
//!
//! Functions are partitioned into named groups by their defining file's
//! path: the `src/<segment>` convention takes priority, then the bare top
//! directory, then a `common` fallback bucket. Each function belongs to
//! exactly one feature.
//!
//! Dependency edges are name-based at group granularity: feature A depends
//! on feature B when some function in A references a bare name declared in
//! B. Mutual dependencies (cycles) are valid and reported as-is.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::callgraph::FunctionId;
use crate::types::FactStore;

/// Fallback bucket for files outside any recognized structure.
const COMMON_FEATURE: &str = "common";

/// A named group of functions with its inter-feature dependencies.
///
/// `depends_on` is always present; a feature with no outgoing calls to any
/// other group carries an empty set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub name: String,
    /// Identities of member functions, in the store's stable order
    pub members: Vec<FunctionId>,
    pub source_files: BTreeSet<String>,
    pub depends_on: BTreeSet<String>,
}

/// Grouping key for a defining-file path.
///
/// `src/api/users.ts` -> `api`, `billing/pay.ts` -> `billing`,
/// `src/index.ts` and bare `util.ts` -> `common`.
pub fn feature_key(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] | [_] => COMMON_FEATURE.to_string(),
        ["src", _file] => COMMON_FEATURE.to_string(),
        ["src", segment, ..] => (*segment).to_string(),
        [segment, ..] => (*segment).to_string(),
    }
}

/// Partition the store's functions into features and compute dependencies.
///
/// Features come back sorted by name; membership order within a feature
/// follows the store's stable enumeration.
pub fn group_features(store: &FactStore) -> Vec<Feature> {
    let mut features: BTreeMap<String, Feature> = BTreeMap::new();

    for fact in store.functions() {
        let key = feature_key(fact.file.as_ref());
        let feature = features.entry(key.clone()).or_insert_with(|| Feature {
            name: key,
            members: Vec::new(),
            source_files: BTreeSet::new(),
            depends_on: BTreeSet::new(),
        });
        feature.members.push(FunctionId::new(fact.file.clone(), fact.name.clone()));
        feature.source_files.insert(fact.file.to_string());
    }

    // Bare name -> features declaring it. Ambiguity-tolerant like call
    // resolution, but at group granularity: every declaring feature counts.
    let mut declared_in: HashMap<&str, BTreeSet<String>> = HashMap::new();
    for fact in store.functions() {
        declared_in
            .entry(fact.name.as_ref())
            .or_default()
            .insert(feature_key(fact.file.as_ref()));
    }

    let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for fact in store.functions() {
        let from = feature_key(fact.file.as_ref());
        for callee in &fact.callees {
            let Some(declaring) = declared_in.get(callee.as_ref()) else {
                continue;
            };
            for target in declaring {
                if *target != from {
                    dependencies
                        .entry(from.clone())
                        .or_default()
                        .insert(target.clone());
                }
            }
        }
    }

    for (name, deps) in dependencies {
        if let Some(feature) = features.get_mut(&name) {
            feature.depends_on = deps;
        }
    }

    features.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileFacts, FunctionFact};
    use std::sync::Arc;

    fn make_fn(file: &str, name: &str, line: u32, callees: &[&str]) -> FunctionFact {
        let mut fact = FunctionFact::new(file, name, line);
        fact.callees = callees.iter().map(|c| Arc::from(*c)).collect();
        fact
    }

    fn store_of(entries: Vec<(&str, Vec<FunctionFact>)>) -> FactStore {
        let files = entries
            .into_iter()
            .map(|(path, functions)| {
                let mut file = FileFacts::new(path, "typescript");
                file.functions = functions;
                file
            })
            .collect();
        FactStore::from_files(files)
    }

    #[test]
    fn test_feature_key_src_convention() {
        assert_eq!(feature_key("src/api/users.ts"), "api");
        assert_eq!(feature_key("src/billing/invoices/pay.ts"), "billing");
    }

    #[test]
    fn test_feature_key_bare_top_segment() {
        assert_eq!(feature_key("billing/pay.ts"), "billing");
        assert_eq!(feature_key("lib/util/strings.ts"), "lib");
    }

    #[test]
    fn test_feature_key_common_fallback() {
        assert_eq!(feature_key("util.ts"), "common");
        assert_eq!(feature_key("src/index.ts"), "common");
        assert_eq!(feature_key(""), "common");
    }

    #[test]
    fn test_grouping_membership() {
        let store = store_of(vec![
            ("src/api/users.ts", vec![make_fn("src/api/users.ts", "listUsers", 1, &[])]),
            ("src/api/auth.ts", vec![make_fn("src/api/auth.ts", "login", 1, &[])]),
            ("src/billing/pay.ts", vec![make_fn("src/billing/pay.ts", "charge", 1, &[])]),
        ]);

        let features = group_features(&store);
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].name, "api");
        assert_eq!(features[0].members.len(), 2);
        assert_eq!(features[1].name, "billing");
        assert!(features[0].source_files.contains("src/api/users.ts"));
    }

    #[test]
    fn test_dependency_edges() {
        let store = store_of(vec![
            (
                "src/api/users.ts",
                vec![make_fn("src/api/users.ts", "listUsers", 1, &["queryUsers"])],
            ),
            (
                "src/db/users.ts",
                vec![make_fn("src/db/users.ts", "queryUsers", 1, &[])],
            ),
        ]);

        let features = group_features(&store);
        let api = features.iter().find(|f| f.name == "api").unwrap();
        let db = features.iter().find(|f| f.name == "db").unwrap();

        assert!(api.depends_on.contains("db"));
        assert!(db.depends_on.is_empty());
    }

    #[test]
    fn test_no_outgoing_calls_yields_empty_set() {
        let store = store_of(vec![(
            "src/island/alone.ts",
            vec![make_fn("src/island/alone.ts", "solo", 1, &["console"])],
        )]);

        let features = group_features(&store);
        assert_eq!(features.len(), 1);
        assert!(features[0].depends_on.is_empty());
    }

    #[test]
    fn test_mutual_dependency_cycle_is_kept() {
        let store = store_of(vec![
            ("src/a/x.ts", vec![make_fn("src/a/x.ts", "fromA", 1, &["fromB"])]),
            ("src/b/y.ts", vec![make_fn("src/b/y.ts", "fromB", 1, &["fromA"])]),
        ]);

        let features = group_features(&store);
        let a = features.iter().find(|f| f.name == "a").unwrap();
        let b = features.iter().find(|f| f.name == "b").unwrap();
        assert!(a.depends_on.contains("b"));
        assert!(b.depends_on.contains("a"));
    }

    #[test]
    fn test_homonym_callee_links_every_declaring_feature() {
        let store = store_of(vec![
            ("src/a/x.ts", vec![make_fn("src/a/x.ts", "caller", 1, &["validate"])]),
            ("src/b/y.ts", vec![make_fn("src/b/y.ts", "validate", 1, &[])]),
            ("src/c/z.ts", vec![make_fn("src/c/z.ts", "validate", 1, &[])]),
        ]);

        let features = group_features(&store);
        let a = features.iter().find(|f| f.name == "a").unwrap();
        assert!(a.depends_on.contains("b"));
        assert!(a.depends_on.contains("c"));
    }

    #[test]
    fn test_intra_feature_calls_are_not_dependencies() {
        let store = store_of(vec![(
            "src/api/users.ts",
            vec![
                make_fn("src/api/users.ts", "listUsers", 1, &["formatUser"]),
                make_fn("src/api/users.ts", "formatUser", 9, &[]),
            ],
        )]);

        let features = group_features(&store);
        assert!(features[0].depends_on.is_empty());
    }
}
