//! Entity reconciliation: from raw type declarations to a semantic catalog.
//!
//! Declarations cluster into entities through two similarity channels
//! (synonym table + direct similarity), transitively closed. A cluster
//! reports only when it holds at least two declarations - the catalog
//! surfaces drift, it does not inventory every type. Within a cluster the
//! longest alias becomes the primary name (first-seen wins ties), fields
//! merge by normalized name, and DB-tagged declarations are checked against
//! API-tagged ones through a fixed compatibility table.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::similarity::{names_similar, SynonymTable};
use crate::normalize::normalize;
use crate::types::{LayerTag, TypeDeclaration};

/// One row of the DB->API type compatibility table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatRule {
    /// Database-side type key, matched when the DB type text contains it
    pub database: String,
    /// API-side type texts accepted for this key
    pub api: Vec<String>,
}

/// Fixed, injectable compatibility table.
///
/// Matching is case-insensitive: a rule applies when the DB type text
/// contains the rule key (containment is one-directional on purpose - `int`
/// must not select the `bigint` row); the API text then matches any listed
/// type by containment in either direction. Identical type texts are always
/// compatible, table or no table.
#[derive(Debug, Clone)]
pub struct CompatTable {
    rules: Vec<CompatRule>,
}

impl CompatTable {
    pub fn from_rules(rules: Vec<CompatRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| CompatRule {
                database: rule.database.to_ascii_lowercase(),
                api: rule.api.into_iter().map(|t| t.to_ascii_lowercase()).collect(),
            })
            .collect();
        Self { rules }
    }

    pub fn compatible(&self, db_type: &str, api_type: &str) -> bool {
        let db = db_type.trim().to_ascii_lowercase();
        let api = api_type.trim().to_ascii_lowercase();
        if db == api {
            return true;
        }
        for rule in &self.rules {
            if db.contains(&rule.database) {
                return rule
                    .api
                    .iter()
                    .any(|t| api.contains(t.as_str()) || t.contains(&api));
            }
        }
        false
    }
}

impl Default for CompatTable {
    fn default() -> Self {
        let rule = |database: &str, api: &[&str]| CompatRule {
            database: database.to_string(),
            api: api.iter().map(|t| (*t).to_string()).collect(),
        };
        Self::from_rules(vec![
            rule("bigint", &["string", "number"]),
            rule("varchar", &["string"]),
            rule("text", &["string"]),
            rule("uuid", &["string"]),
            rule("boolean", &["bool", "boolean"]),
            rule("timestamp", &["Date", "DateTime", "string"]),
            rule("decimal", &["number", "float", "Decimal"]),
        ])
    }
}

/// One field whose DB-side and API-side type texts are judged incompatible.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMismatch {
    pub entity: String,
    pub database_field: String,
    pub database_type: String,
    pub api_field: String,
    pub api_type: String,
}

impl TypeMismatch {
    /// Human-readable one-liner for the text report.
    pub fn describe(&self) -> String {
        format!(
            "{}: database field '{}' ({}) is incompatible with API field '{}' ({})",
            self.entity, self.database_field, self.database_type, self.api_field, self.api_type
        )
    }
}

/// A reconciled entity: declarations judged to describe the same concept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticEntity {
    /// Longest alias, first-seen order breaking ties
    pub primary_name: String,
    pub aliases: BTreeSet<String>,
    /// Member declarations in corpus order
    pub declarations: Vec<TypeDeclaration>,
    /// Normalized field name -> "DeclName.fieldName" per occurrence
    pub field_groups: BTreeMap<String, Vec<String>>,
    pub warnings: Vec<String>,
}

/// The reconciler's complete output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityCatalog {
    pub entities: Vec<SemanticEntity>,
    pub mismatches: Vec<TypeMismatch>,
    pub recommendations: Vec<String>,
}

/// Disjoint-set over name indices; path compression only, the corpus of
/// unique type names is small.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let parent = self.parent[i];
        if parent == i {
            return i;
        }
        let root = self.find(parent);
        self.parent[i] = root;
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // lower index as root keeps first-seen order meaningful
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

/// The entity reconciler. Holds the injectable heuristic tables.
pub struct EntityReconciler {
    synonyms: SynonymTable,
    compat: CompatTable,
}

impl EntityReconciler {
    pub fn new(synonyms: SynonymTable, compat: CompatTable) -> Self {
        Self { synonyms, compat }
    }

    /// Cluster declarations into entities and flag cross-layer drift.
    ///
    /// Declarations must arrive in corpus order (sorted file, then source
    /// order); first-seen tie-breaking depends on it.
    pub fn reconcile(&self, declarations: &[TypeDeclaration]) -> EntityCatalog {
        // Unique names in first-seen order
        let mut names: Vec<&str> = Vec::new();
        let mut name_index: BTreeMap<&str, usize> = BTreeMap::new();
        for decl in declarations {
            if !name_index.contains_key(decl.name.as_ref()) {
                name_index.insert(decl.name.as_ref(), names.len());
                names.push(decl.name.as_ref());
            }
        }

        let normalized: Vec<String> = names.iter().map(|n| normalize(n)).collect();
        let mut sets = UnionFind::new(names.len());

        // Channel (a): synonym table, anchored on the candidate's own
        // normalized name, intersected with corpus names by substring
        // containment in either direction
        for i in 0..names.len() {
            let Some(synonyms) = self.synonyms.synonyms(&normalized[i]) else {
                continue;
            };
            for j in 0..names.len() {
                if i == j {
                    continue;
                }
                let other = &normalized[j];
                if synonyms
                    .iter()
                    .any(|s| other.contains(s.as_str()) || s.contains(other.as_str()))
                {
                    sets.union(i, j);
                }
            }
        }

        // Channel (b): direct similarity
        for i in 0..names.len() {
            for j in (i + 1)..names.len() {
                if names_similar(&normalized[i], &normalized[j]) {
                    sets.union(i, j);
                }
            }
        }

        // Gather clusters keyed by root, in first-seen order of the root
        let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for i in 0..names.len() {
            let root = sets.find(i);
            clusters.entry(root).or_default().push(i);
        }

        let mut entities = Vec::new();
        let mut mismatches: BTreeSet<TypeMismatch> = BTreeSet::new();

        for member_names in clusters.values() {
            let name_set: BTreeSet<&str> = member_names.iter().map(|&i| names[i]).collect();
            let members: Vec<&TypeDeclaration> = declarations
                .iter()
                .filter(|d| name_set.contains(d.name.as_ref()))
                .collect();

            // Only clusters of two or more declarations report; singleton
            // declarations with no similar peers are not entities
            if members.len() < 2 {
                continue;
            }

            let primary = primary_name(member_names, &names);
            let entity_mismatches = detect_mismatches(&primary, &members, &self.compat);
            mismatches.extend(entity_mismatches);

            let field_groups = group_fields(&members);
            let warnings = entity_warnings(&members, &field_groups);

            entities.push(SemanticEntity {
                primary_name: primary,
                aliases: name_set.iter().map(|n| (*n).to_string()).collect(),
                declarations: members.into_iter().cloned().collect(),
                field_groups,
                warnings,
            });
        }

        let mismatches: Vec<TypeMismatch> = mismatches.into_iter().collect();
        let recommendations = recommendations(&entities, &mismatches);

        EntityCatalog {
            entities,
            mismatches,
            recommendations,
        }
    }
}

impl Default for EntityReconciler {
    fn default() -> Self {
        Self::new(SynonymTable::default(), CompatTable::default())
    }
}

/// Longest alias wins; ties break to the earliest-seen name.
fn primary_name(member_names: &[usize], names: &[&str]) -> String {
    let mut best: &str = names[member_names[0]];
    for &i in member_names {
        if names[i].len() > best.len() {
            best = names[i];
        }
    }
    best.to_string()
}

/// Merge fields across a cluster's declarations by normalized field name.
fn group_fields(members: &[&TypeDeclaration]) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for decl in members {
        for field in &decl.fields {
            groups
                .entry(normalize(&field.name))
                .or_default()
                .push(format!("{}.{}", decl.name, field.name));
        }
    }
    groups
}

fn entity_warnings(
    members: &[&TypeDeclaration],
    field_groups: &BTreeMap<String, Vec<String>>,
) -> Vec<String> {
    let mut warnings = Vec::new();

    // (a) one normalized field name, several raw type texts
    for key in field_groups.keys() {
        let mut seen: Vec<&str> = Vec::new();
        for decl in members {
            for field in &decl.fields {
                if normalize(&field.name) == *key && !seen.contains(&field.type_text.as_str()) {
                    seen.push(&field.type_text);
                }
            }
        }
        if seen.len() > 1 {
            warnings.push(format!(
                "field '{}' has different types: {}",
                key,
                seen.join(", ")
            ));
        }
    }

    // (b) declarations disagree on field counts
    let counts: BTreeSet<usize> = members.iter().map(|d| d.fields.len()).collect();
    if counts.len() > 1 {
        let detail: Vec<String> = members
            .iter()
            .map(|d| format!("{} ({}) has {}", d.name, d.source_file, d.fields.len()))
            .collect();
        warnings.push(format!(
            "declarations have differing field counts: {}",
            detail.join(", ")
        ));
    }

    warnings
}

/// DB->API mismatch detection for one cluster.
///
/// Fires only when both a database-tagged and an API-tagged declaration are
/// present. A DB field with no normalized-name match on the API side is
/// silently skipped - only present-but-incompatible pairs are mismatches.
fn detect_mismatches(
    entity: &str,
    members: &[&TypeDeclaration],
    compat: &CompatTable,
) -> Vec<TypeMismatch> {
    let db_decls: Vec<&&TypeDeclaration> = members
        .iter()
        .filter(|d| d.has_layer(LayerTag::Database))
        .collect();
    let api_decls: Vec<&&TypeDeclaration> = members
        .iter()
        .filter(|d| d.has_layer(LayerTag::Api))
        .collect();

    if db_decls.is_empty() || api_decls.is_empty() {
        return vec![];
    }

    let mut out = Vec::new();
    for db in &db_decls {
        for db_field in &db.fields {
            let key = normalize(&db_field.name);
            let api_field = api_decls
                .iter()
                .flat_map(|d| d.fields.iter())
                .find(|f| normalize(&f.name) == key);
            let Some(api_field) = api_field else {
                continue;
            };
            if !compat.compatible(&db_field.type_text, &api_field.type_text) {
                out.push(TypeMismatch {
                    entity: entity.to_string(),
                    database_field: db_field.name.clone(),
                    database_type: db_field.type_text.clone(),
                    api_field: api_field.name.clone(),
                    api_type: api_field.type_text.clone(),
                });
            }
        }
    }
    out
}

fn recommendations(entities: &[SemanticEntity], mismatches: &[TypeMismatch]) -> Vec<String> {
    let mut out = Vec::new();

    for entity in entities {
        if entity.warnings.is_empty() {
            continue;
        }
        let aliases: Vec<&str> = entity.aliases.iter().map(String::as_str).collect();
        out.push(format!(
            "Standardize on '{}' for related type names: {}",
            entity.primary_name,
            aliases.join(", ")
        ));
    }

    if !mismatches.is_empty() {
        out.push(format!(
            "{} database/API type mismatch(es) detected; align field types across layers",
            mismatches.len()
        ));
    }

    if entities.is_empty() {
        out.push("No multi-declaration entities detected; type names are consistent".to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDecl, TypeKind};
    use std::collections::BTreeSet;

    fn make_decl(
        name: &str,
        kind: TypeKind,
        file: &str,
        layers: &[LayerTag],
        fields: &[(&str, &str)],
    ) -> TypeDeclaration {
        TypeDeclaration {
            name: name.into(),
            kind,
            fields: fields
                .iter()
                .map(|(n, t)| FieldDecl::new(*n, *t))
                .collect(),
            source_file: file.into(),
            layers: layers.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_same_name_declarations_form_entity() {
        // interface Money (api) + model Money (db): one entity, two members
        let decls = vec![
            make_decl(
                "Money",
                TypeKind::SchemaModel,
                "schema.prisma",
                &[LayerTag::Database],
                &[("amount", "Int")],
            ),
            make_decl(
                "Money",
                TypeKind::Interface,
                "src/api/dto.ts",
                &[LayerTag::Api, LayerTag::Backend],
                &[("amount", "number")],
            ),
        ];

        let catalog = EntityReconciler::default().reconcile(&decls);
        assert_eq!(catalog.entities.len(), 1);

        let entity = &catalog.entities[0];
        assert_eq!(entity.primary_name, "Money");
        assert_eq!(entity.declarations.len(), 2);
        assert_eq!(
            entity.field_groups["amount"],
            vec!["Money.amount".to_string(), "Money.amount".to_string()]
        );

        // Int vs number is not in the compatibility table and the texts
        // are not identical, so the mismatch path fires
        assert_eq!(catalog.mismatches.len(), 1);
        let mismatch = &catalog.mismatches[0];
        assert_eq!(mismatch.database_type, "Int");
        assert_eq!(mismatch.api_type, "number");
    }

    #[test]
    fn test_coin_and_balance_alone_do_not_cluster() {
        // Synonym table is keyed by normalized candidate name; without a
        // declaration named Money there is no anchor, and coin/balance
        // fail both substring and 60%-overlap checks
        let decls = vec![
            make_decl("Coin", TypeKind::Interface, "src/a.ts", &[], &[("value", "number")]),
            make_decl("Balance", TypeKind::Interface, "src/b.ts", &[], &[("value", "number")]),
        ];

        let catalog = EntityReconciler::default().reconcile(&decls);
        assert!(catalog.entities.is_empty());
        assert_eq!(
            catalog.recommendations,
            vec!["No multi-declaration entities detected; type names are consistent".to_string()]
        );
    }

    #[test]
    fn test_money_anchors_coin_and_balance() {
        let decls = vec![
            make_decl("Money", TypeKind::Interface, "src/a.ts", &[], &[("amount", "number")]),
            make_decl("Coin", TypeKind::Interface, "src/b.ts", &[], &[("amount", "number")]),
            make_decl("Balance", TypeKind::Class, "src/c.ts", &[], &[("amount", "number")]),
        ];

        let catalog = EntityReconciler::default().reconcile(&decls);
        assert_eq!(catalog.entities.len(), 1);

        let entity = &catalog.entities[0];
        // longest alias wins: Balance (7) over Money (5) and Coin (4)
        assert_eq!(entity.primary_name, "Balance");
        assert_eq!(entity.aliases.len(), 3);
        assert_eq!(entity.declarations.len(), 3);
    }

    #[test]
    fn test_singletons_are_discarded() {
        let decls = vec![
            make_decl("Invoice", TypeKind::Interface, "src/a.ts", &[], &[("id", "string")]),
            make_decl("Widget", TypeKind::Interface, "src/b.ts", &[], &[("id", "string")]),
        ];
        let catalog = EntityReconciler::default().reconcile(&decls);
        assert!(catalog.entities.is_empty());
    }

    #[test]
    fn test_primary_name_tie_breaks_to_first_seen() {
        // UserData and UserInfo are the same length; both cluster with
        // User by substring, and the first-seen of the two wins the tie
        let decls = vec![
            make_decl("UserData", TypeKind::Interface, "src/a.ts", &[], &[]),
            make_decl("User", TypeKind::Interface, "src/b.ts", &[], &[]),
            make_decl("UserInfo", TypeKind::Interface, "src/c.ts", &[], &[]),
        ];
        let catalog = EntityReconciler::default().reconcile(&decls);
        assert_eq!(catalog.entities.len(), 1);
        assert_eq!(catalog.entities[0].primary_name, "UserData");
    }

    #[test]
    fn test_different_type_texts_warn() {
        let decls = vec![
            make_decl("Price", TypeKind::Interface, "src/a.ts", &[], &[("value", "number")]),
            make_decl("Price", TypeKind::Interface, "src/b.ts", &[], &[("value", "string")]),
        ];
        let catalog = EntityReconciler::default().reconcile(&decls);
        let warnings = &catalog.entities[0].warnings;
        assert!(warnings.iter().any(|w| w.contains("different types")));
        assert!(catalog.recommendations.iter().any(|r| r.contains("Standardize on 'Price'")));
    }

    #[test]
    fn test_differing_field_counts_warn() {
        let decls = vec![
            make_decl("Cart", TypeKind::Interface, "src/a.ts", &[], &[("id", "string")]),
            make_decl(
                "Cart",
                TypeKind::Interface,
                "src/b.ts",
                &[],
                &[("id", "string"), ("items", "string[]")],
            ),
        ];
        let catalog = EntityReconciler::default().reconcile(&decls);
        let warnings = &catalog.entities[0].warnings;
        assert!(warnings.iter().any(|w| w.contains("differing field counts")));
    }

    #[test]
    fn test_api_only_entity_reports_no_mismatch() {
        // Mismatch detection is database->API only; with no DB-tagged
        // declaration nothing is flagged
        let decls = vec![
            make_decl(
                "Money",
                TypeKind::Interface,
                "src/api/dto.ts",
                &[LayerTag::Api],
                &[("amount", "number")],
            ),
            make_decl(
                "Money",
                TypeKind::Class,
                "src/services/money.ts",
                &[LayerTag::Backend],
                &[("amount", "string")],
            ),
        ];
        let catalog = EntityReconciler::default().reconcile(&decls);
        assert_eq!(catalog.entities.len(), 1);
        assert!(catalog.mismatches.is_empty());
    }

    #[test]
    fn test_db_field_missing_on_api_side_is_silent() {
        let decls = vec![
            make_decl(
                "Money",
                TypeKind::SchemaModel,
                "schema.prisma",
                &[LayerTag::Database],
                &[("internalFlag", "Boolean")],
            ),
            make_decl(
                "Money",
                TypeKind::Interface,
                "src/api/dto.ts",
                &[LayerTag::Api],
                &[("amount", "number")],
            ),
        ];
        let catalog = EntityReconciler::default().reconcile(&decls);
        assert!(catalog.mismatches.is_empty());
    }

    #[test]
    fn test_compatible_pairs_pass() {
        let decls = vec![
            make_decl(
                "Account",
                TypeKind::SchemaModel,
                "db/schema.prisma",
                &[LayerTag::Database],
                &[("id", "bigint"), ("name", "varchar(255)"), ("createdAt", "timestamp")],
            ),
            make_decl(
                "AccountInfo",
                TypeKind::Interface,
                "src/api/accounts.ts",
                &[LayerTag::Api],
                &[("id", "string"), ("name", "string"), ("created_at", "Date")],
            ),
        ];
        let catalog = EntityReconciler::default().reconcile(&decls);
        assert_eq!(catalog.entities.len(), 1);
        assert!(catalog.mismatches.is_empty(), "{:?}", catalog.mismatches);
    }

    #[test]
    fn test_cluster_monotonicity_on_exact_alias() {
        // Adding a declaration whose name exactly matches an existing
        // alias joins the existing cluster, never creates a second one
        let base = vec![
            make_decl("Money", TypeKind::Interface, "src/a.ts", &[], &[]),
            make_decl("Coin", TypeKind::Interface, "src/b.ts", &[], &[]),
        ];
        let mut extended = base.clone();
        extended.push(make_decl("Coin", TypeKind::Class, "src/c.ts", &[], &[]));

        let reconciler = EntityReconciler::default();
        let before = reconciler.reconcile(&base);
        let after = reconciler.reconcile(&extended);

        assert_eq!(before.entities.len(), 1);
        assert_eq!(after.entities.len(), 1);
        assert_eq!(after.entities[0].declarations.len(), 3);
    }

    #[test]
    fn test_compat_table_direction() {
        let table = CompatTable::default();
        // DB text selects a row only by containing the key
        assert!(table.compatible("BIGINT", "number"));
        assert!(table.compatible("varchar(128)", "string"));
        assert!(table.compatible("timestamp with time zone", "DateTime"));
        // int does not contain "bigint": no row, no identity, incompatible
        assert!(!table.compatible("Int", "number"));
        // identical normalized text always passes
        assert!(table.compatible("Int", "int"));
        assert!(!table.compatible("boolean", "number"));
        assert!(table.compatible("boolean", "bool"));
    }

    #[test]
    fn test_deterministic_output() {
        let decls = vec![
            make_decl("Money", TypeKind::Interface, "src/a.ts", &[], &[("amount", "number")]),
            make_decl("Coin", TypeKind::Interface, "src/b.ts", &[], &[("amount", "Int")]),
        ];
        let reconciler = EntityReconciler::default();
        let a = format!("{:?}", reconciler.reconcile(&decls));
        let b = format!("{:?}", reconciler.reconcile(&decls));
        assert_eq!(a, b);
    }
}
