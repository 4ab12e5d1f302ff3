//! Final artifact assembly and rendering.
//!
//! Packages the call graph, feature list, and entity catalog into one
//! serializable report. Two renderings: pretty JSON for tooling, plain
//! text for terminals. Assembly is a straight repackaging - all analysis
//! happened upstream.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::callgraph::{CallGraph, EdgeKind, ResolutionStats};
use crate::entities::EntityCatalog;
use crate::features::Feature;

/// One call graph node in the report, keyed by its `name@file` id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub name: String,
    pub file: String,
}

/// One call graph edge in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// Serialized call graph: nodes keyed by composite id, edges as a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphReport {
    pub nodes: BTreeMap<String, GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Headline counts for the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub files: usize,
    pub functions: usize,
    pub call_edges: usize,
    pub references_total: usize,
    pub references_resolved: usize,
    pub references_denylisted: usize,
    pub references_unresolved: usize,
    pub features: usize,
    pub entities: usize,
    pub mismatches: usize,
}

/// The complete analysis artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub call_graph: CallGraphReport,
    pub features: Vec<Feature>,
    pub entity_catalog: EntityCatalog,
    pub summary: Summary,
    /// Per-file degradation notices ("facts unavailable for ...")
    pub notices: Vec<String>,
}

impl AnalysisReport {
    /// Package the analysis outputs into the final artifact.
    pub fn assemble(
        graph: &CallGraph,
        features: Vec<Feature>,
        entity_catalog: EntityCatalog,
        stats: &ResolutionStats,
        file_count: usize,
        notices: Vec<String>,
    ) -> Self {
        let nodes: BTreeMap<String, GraphNode> = graph
            .functions()
            .map(|id| {
                (
                    id.composite_key(),
                    GraphNode {
                        name: id.name.to_string(),
                        file: id.file.to_string(),
                    },
                )
            })
            .collect();

        let edges: Vec<GraphEdge> = graph
            .edges()
            .map(|(from, to, edge)| GraphEdge {
                from: from.composite_key(),
                to: to.composite_key(),
                kind: edge.kind,
            })
            .collect();

        let summary = Summary {
            files: file_count,
            functions: graph.function_count(),
            call_edges: graph.call_count(),
            references_total: stats.total_references,
            references_resolved: stats.resolved,
            references_denylisted: stats.denylisted,
            references_unresolved: stats.unresolved,
            features: features.len(),
            entities: entity_catalog.entities.len(),
            mismatches: entity_catalog.mismatches.len(),
        };

        Self {
            call_graph: CallGraphReport { nodes, edges },
            features,
            entity_catalog,
            summary,
            notices,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Plain-text rendering for terminal use.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;

        out.push_str("factmap analysis\n");
        out.push_str("================\n");
        out.push_str(&format!(
            "Files: {}   Functions: {}   Call edges: {}\n",
            s.files, s.functions, s.call_edges
        ));
        out.push_str(&format!(
            "References: {} total, {} resolved, {} denylisted, {} unresolved\n",
            s.references_total,
            s.references_resolved,
            s.references_denylisted,
            s.references_unresolved
        ));

        out.push_str("\nFeatures\n--------\n");
        if self.features.is_empty() {
            out.push_str("(none)\n");
        }
        for feature in &self.features {
            let deps = if feature.depends_on.is_empty() {
                "no dependencies".to_string()
            } else {
                let names: Vec<&str> = feature.depends_on.iter().map(String::as_str).collect();
                format!("depends on: {}", names.join(", "))
            };
            out.push_str(&format!(
                "{} ({} functions, {} files) - {}\n",
                feature.name,
                feature.members.len(),
                feature.source_files.len(),
                deps
            ));
        }

        out.push_str("\nEntities\n--------\n");
        if self.entity_catalog.entities.is_empty() {
            out.push_str("(none)\n");
        }
        for entity in &self.entity_catalog.entities {
            let aliases: Vec<&str> = entity.aliases.iter().map(String::as_str).collect();
            out.push_str(&format!(
                "{} ({} declarations; aliases: {})\n",
                entity.primary_name,
                entity.declarations.len(),
                aliases.join(", ")
            ));
            for warning in &entity.warnings {
                out.push_str(&format!("  warning: {warning}\n"));
            }
        }

        if !self.entity_catalog.mismatches.is_empty() {
            out.push_str("\nType mismatches\n---------------\n");
            for mismatch in &self.entity_catalog.mismatches {
                out.push_str(&format!("{}\n", mismatch.describe()));
            }
        }

        if !self.entity_catalog.recommendations.is_empty() {
            out.push_str("\nRecommendations\n---------------\n");
            for rec in &self.entity_catalog.recommendations {
                out.push_str(&format!("- {rec}\n"));
            }
        }

        if !self.notices.is_empty() {
            out.push_str("\nNotices\n-------\n");
            for notice in &self.notices {
                out.push_str(&format!("- {notice}\n"));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callgraph::{CallGraph, FunctionId};
    use crate::entities::EntityCatalog;

    fn sample_report() -> AnalysisReport {
        let mut graph = CallGraph::new();
        graph.add_call(
            FunctionId::new("src/api/users.ts", "listUsers"),
            FunctionId::new("src/db/users.ts", "queryUsers"),
        );
        let stats = ResolutionStats {
            total_references: 3,
            resolved: 1,
            denylisted: 1,
            unresolved: 1,
        };
        AnalysisReport::assemble(
            &graph,
            vec![],
            EntityCatalog::default(),
            &stats,
            2,
            vec!["facts unavailable for src/broken.ts: permission denied".to_string()],
        )
    }

    #[test]
    fn test_assemble_counts() {
        let report = sample_report();
        assert_eq!(report.summary.files, 2);
        assert_eq!(report.summary.functions, 2);
        assert_eq!(report.summary.call_edges, 1);
        assert_eq!(report.summary.references_resolved, 1);
        assert_eq!(report.call_graph.nodes.len(), 2);
        assert_eq!(report.call_graph.edges.len(), 1);
    }

    #[test]
    fn test_nodes_keyed_by_composite_id() {
        let report = sample_report();
        assert!(report
            .call_graph
            .nodes
            .contains_key("listUsers@src/api/users.ts"));
        let edge = &report.call_graph.edges[0];
        assert_eq!(edge.from, "listUsers@src/api/users.ts");
        assert_eq!(edge.to, "queryUsers@src/db/users.ts");
    }

    #[test]
    fn test_json_shape() {
        let report = sample_report();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"callGraph\""));
        assert!(json.contains("\"entityCatalog\""));
        assert!(json.contains("\"kind\": \"calls\""));

        // round-trips
        let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.summary.call_edges, 1);
    }

    #[test]
    fn test_text_rendering_sections() {
        let report = sample_report();
        let text = report.render_text();
        assert!(text.contains("factmap analysis"));
        assert!(text.contains("Call edges: 1"));
        assert!(text.contains("Notices"));
        assert!(text.contains("facts unavailable for src/broken.ts"));
    }
}
