//! Name similarity heuristics for entity clustering.
//!
//! Two channels decide whether two type names refer to the same concept:
//! - a hand-authored synonym table keyed by normalized name, intersected
//!   against names actually present in the corpus
//! - direct similarity: identical normalized forms, substring containment
//!   in either direction, or more than 60% multiset character overlap
//!
//! The table anchors the domain vocabulary: `Money` pulls in `Coin` and
//! `Balance`, but `Coin` and `Balance` alone never cluster through the
//! table because neither normalizes to a table key. The 60% threshold and
//! the substring shortcut are load-bearing; retuning either reshapes the
//! entity catalog.

use std::collections::{BTreeMap, BTreeSet};

use crate::normalize::normalize;

/// Similarity threshold for the character-overlap channel (exclusive).
const OVERLAP_THRESHOLD: f64 = 0.6;

/// Multiset character overlap: `2 x |common| / (|a| + |b|)`.
///
/// Counts shared characters regardless of position. Inputs are expected to
/// be normalized (ascii lowercase), but the function is total either way.
pub fn char_overlap(a: &str, b: &str) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }

    let mut counts = [0i32; 256];
    for byte in a.bytes() {
        counts[byte as usize] += 1;
    }
    let mut common = 0usize;
    for byte in b.bytes() {
        if counts[byte as usize] > 0 {
            counts[byte as usize] -= 1;
            common += 1;
        }
    }

    2.0 * common as f64 / total as f64
}

/// Direct-similarity channel over two normalized names.
pub fn names_similar(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || a.contains(b) || b.contains(a) || char_overlap(a, b) > OVERLAP_THRESHOLD
}

/// Injectable synonym table: normalized term -> set of normalized synonyms.
///
/// Hand-authored and domain-specific (financial/CRUD vocabulary). Extend
/// conservatively; every entry widens clusters for the whole corpus.
#[derive(Debug, Clone)]
pub struct SynonymTable {
    map: BTreeMap<String, BTreeSet<String>>,
}

impl SynonymTable {
    /// Build from raw configuration entries; keys and values are normalized
    /// on the way in so `Money = ["Coin"]` and `money = ["coin"]` behave
    /// identically.
    pub fn from_map(raw: BTreeMap<String, Vec<String>>) -> Self {
        let mut map = BTreeMap::new();
        for (term, synonyms) in raw {
            let key = normalize(&term);
            if key.is_empty() {
                continue;
            }
            let set: BTreeSet<String> = synonyms
                .iter()
                .map(|s| normalize(s))
                .filter(|s| !s.is_empty())
                .collect();
            if !set.is_empty() {
                map.insert(key, set);
            }
        }
        Self { map }
    }

    /// Synonyms for a normalized name, if the table has an entry for it.
    pub fn synonyms(&self, normalized: &str) -> Option<&BTreeSet<String>> {
        self.map.get(normalized)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        let entries: &[(&str, &[&str])] = &[
            ("money", &["coin", "amount", "balance", "value", "price"]),
            ("user", &["userdata", "userinfo", "profile", "account"]),
            ("order", &["purchase", "transaction", "cart"]),
            ("product", &["item", "goods", "sku"]),
            ("payment", &["charge", "invoice", "billing"]),
        ];
        let raw = entries
            .iter()
            .map(|(term, syns)| {
                (
                    (*term).to_string(),
                    syns.iter().map(|s| (*s).to_string()).collect(),
                )
            })
            .collect();
        Self::from_map(raw)
    }
}
