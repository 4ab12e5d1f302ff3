//! Type declaration extraction from raw source text.
//!
//! This pass is independent of function-fact extraction: it re-reads the
//! file and runs its own regexes, because declaration bodies (field lists,
//! optional markers, schema annotations) are not part of the structured
//! facts. Patterns cover TypeScript/JavaScript `interface`/`type`/`class`
//! bodies and Prisma `model` blocks.
//!
//! Limitations, by design:
//! - brace matching is textual and does not understand strings or block
//!   comments containing braces
//! - only depth-1 lines of a body are considered field candidates; method
//!   bodies and nested object types are skipped
//! - a line that looks like a field but yields no type text is kept with
//!   the `unknown` sentinel rather than dropped

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{FieldDecl, LayerTag, TypeDeclaration, TypeKind, UNKNOWN_TYPE};

/// Path keyword sets for layer tagging. Injectable via configuration.
///
/// Matching is case-insensitive substring containment against the relative
/// path; the `.prisma` entry in the database set doubles as the schema-file
/// extension check. Backend additionally tags anything under the top-level
/// `src/` root, so a path may carry several tags at once.
#[derive(Debug, Clone)]
pub struct LayerKeywords {
    pub database: Vec<String>,
    pub api: Vec<String>,
    pub backend: Vec<String>,
}

impl Default for LayerKeywords {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect();
        Self {
            database: owned(&["schema", "migration", "database", ".prisma"]),
            api: owned(&["api", "routes", "controller", "handler", "dto"]),
            backend: owned(&["service", "model", "entity"]),
        }
    }
}

/// Layer tags for a relative path.
pub fn layer_tags(rel_path: &str, keywords: &LayerKeywords) -> BTreeSet<LayerTag> {
    let path = rel_path.to_ascii_lowercase();
    let mut tags = BTreeSet::new();

    if keywords.database.iter().any(|k| path.contains(k.as_str())) {
        tags.insert(LayerTag::Database);
    }
    if keywords.api.iter().any(|k| path.contains(k.as_str())) {
        tags.insert(LayerTag::Api);
    }
    if keywords.backend.iter().any(|k| path.contains(k.as_str())) || path.starts_with("src/") {
        tags.insert(LayerTag::Backend);
    }

    tags
}

/// Regex patterns for declaration headers and field lines.
/// Cached as statics to avoid recompilation on every file.
mod decl_patterns {
    use super::*;

    /// `interface Money {` / `export interface Money extends Base {`
    pub static INTERFACE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^[ \t]*(?:export\s+)?interface\s+(\w+)[^{\n]*\{")
            .expect("invalid interface regex")
    });

    /// `type Money = {` - only object-literal aliases carry fields
    pub static TYPE_ALIAS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^[ \t]*(?:export\s+)?type\s+(\w+)\s*=\s*\{")
            .expect("invalid type alias regex")
    });

    /// `class Wallet {` / `export abstract class Wallet extends Base {`
    pub static CLASS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^[ \t]*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(\w+)[^{\n]*\{")
            .expect("invalid class regex")
    });

    /// Prisma `model Money {`
    pub static MODEL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^[ \t]*model\s+(\w+)\s*\{").expect("invalid model regex")
    });

    /// `amount: number;` / `readonly id?: string,`
    pub static TS_FIELD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^\s*(?:readonly\s+)?(\w+)\??\s*:\s*(.+?)\s*[;,]?\s*$")
            .expect("invalid ts field regex")
    });

    /// `amount;` - field-shaped line with no type annotation
    pub static BARE_FIELD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^\s*(\w+)\??\s*[;,]?\s*$").expect("invalid bare field regex")
    });

    /// Class property with modifiers, optional type, optional initializer
    pub static CLASS_FIELD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^\s*(?:(?:public|private|protected|readonly|static|declare|override)\s+)*(\w+)\??\s*(?::\s*([^;=\n]+?))?\s*(?:=.*)?[;,]?\s*$",
        )
        .expect("invalid class field regex")
    });

    /// Prisma field: `amount Int @default(0)` - name, then the type token
    pub static MODEL_FIELD: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\s*(\w+)\s+(\S+)").expect("invalid model field regex"));
}

/// The declaration extractor: stateless apart from its layer keywords.
pub struct DeclarationExtractor {
    keywords: LayerKeywords,
}

impl DeclarationExtractor {
    pub fn new(keywords: LayerKeywords) -> Self {
        Self { keywords }
    }

    /// Re-read a source file and extract its type declarations.
    ///
    /// The I/O failure propagates so the caller can downgrade it to a
    /// per-file "facts unavailable" notice instead of aborting the run.
    pub fn extract_file(&self, path: &Path, rel_path: &str) -> Result<Vec<TypeDeclaration>> {
        let content = std::fs::read_to_string(path)?;
        Ok(self.extract_source(&content, rel_path))
    }

    /// Extract declarations from already-loaded source text.
    pub fn extract_source(&self, content: &str, rel_path: &str) -> Vec<TypeDeclaration> {
        let layers = layer_tags(rel_path, &self.keywords);
        let is_schema = rel_path.ends_with(".prisma");

        let mut declarations: Vec<(usize, TypeDeclaration)> = Vec::new();

        if is_schema {
            collect_blocks(
                content,
                &decl_patterns::MODEL,
                TypeKind::SchemaModel,
                rel_path,
                &layers,
                &mut declarations,
            );
        } else {
            collect_blocks(
                content,
                &decl_patterns::INTERFACE,
                TypeKind::Interface,
                rel_path,
                &layers,
                &mut declarations,
            );
            collect_blocks(
                content,
                &decl_patterns::TYPE_ALIAS,
                TypeKind::TypeAlias,
                rel_path,
                &layers,
                &mut declarations,
            );
            collect_blocks(
                content,
                &decl_patterns::CLASS,
                TypeKind::Class,
                rel_path,
                &layers,
                &mut declarations,
            );
        }

        // Source order regardless of which pattern matched first
        declarations.sort_by_key(|(offset, _)| *offset);
        declarations.into_iter().map(|(_, decl)| decl).collect()
    }
}

impl Default for DeclarationExtractor {
    fn default() -> Self {
        Self::new(LayerKeywords::default())
    }
}

fn collect_blocks(
    content: &str,
    pattern: &Regex,
    kind: TypeKind,
    rel_path: &str,
    layers: &BTreeSet<LayerTag>,
    out: &mut Vec<(usize, TypeDeclaration)>,
) {
    for caps in pattern.captures_iter(content) {
        let whole = caps.get(0).expect("regex match has group 0");
        let name = &caps[1];
        // the header pattern ends at the opening brace
        let open = whole.end() - 1;
        let body = brace_block(content, open);
        let fields = match kind {
            TypeKind::SchemaModel => schema_fields(body),
            TypeKind::Class => class_fields(body),
            TypeKind::Interface | TypeKind::TypeAlias => object_fields(body),
        };
        out.push((
            whole.start(),
            TypeDeclaration {
                name: name.into(),
                kind,
                fields,
                source_file: rel_path.into(),
                layers: layers.clone(),
            },
        ));
    }
}

/// Body text between the brace at `open` and its matching close brace.
/// Unbalanced input degrades to "rest of file" rather than failing.
fn brace_block(content: &str, open: usize) -> &str {
    let bytes = content.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &content[open + 1..i];
                }
            }
            _ => {}
        }
    }
    &content[(open + 1).min(content.len())..]
}

fn strip_line_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Walk a body's lines, yielding only those at brace depth 1.
fn depth_one_lines(body: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut depth = 1usize;
    for raw in body.lines() {
        let line = strip_line_comment(raw);
        if depth == 1 {
            lines.push(line);
        }
        for b in line.bytes() {
            match b {
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }
    lines
}

fn sanitize_type(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "{" {
        UNKNOWN_TYPE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Fields of an interface or object-literal type alias body.
fn object_fields(body: &str) -> Vec<FieldDecl> {
    let mut fields = Vec::new();
    for line in depth_one_lines(body) {
        if line.contains('(') {
            continue; // method signature
        }
        if let Some(caps) = decl_patterns::TS_FIELD.captures(line) {
            fields.push(FieldDecl::new(&caps[1], sanitize_type(&caps[2])));
        } else if let Some(caps) = decl_patterns::BARE_FIELD.captures(line) {
            fields.push(FieldDecl::new(&caps[1], UNKNOWN_TYPE));
        }
    }
    fields
}

/// Property declarations of a class body. Methods (any line containing a
/// parenthesis) and decorators are skipped.
fn class_fields(body: &str) -> Vec<FieldDecl> {
    let mut fields = Vec::new();
    for line in depth_one_lines(body) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('@') || line.contains('(') {
            continue;
        }
        if let Some(caps) = decl_patterns::CLASS_FIELD.captures(line) {
            let type_text = caps
                .get(2)
                .map(|m| sanitize_type(m.as_str()))
                .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
            fields.push(FieldDecl::new(&caps[1], type_text));
        }
    }
    fields
}

/// Fields of a Prisma model body. Lines whose first token starts with `@`
/// (field and block annotations alike) are excluded.
fn schema_fields(body: &str) -> Vec<FieldDecl> {
    let mut fields = Vec::new();
    for line in depth_one_lines(body) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('@') || trimmed.starts_with('}') {
            continue;
        }
        if let Some(caps) = decl_patterns::MODEL_FIELD.captures(line) {
            let type_token = &caps[2];
            let type_text = if type_token.starts_with('@') {
                UNKNOWN_TYPE.to_string()
            } else {
                type_token.to_string()
            };
            fields.push(FieldDecl::new(&caps[1], type_text));
        } else if decl_patterns::BARE_FIELD.is_match(trimmed) {
            fields.push(FieldDecl::new(trimmed.trim_end_matches([';', ',']), UNKNOWN_TYPE));
        }
    }
    fields
}
