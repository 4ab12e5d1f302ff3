//! Regex-based fact extraction for JavaScript/TypeScript sources.
//!
//! This is deliberately not a type-checker: regex patterns pull out
//! function/method/arrow definitions, class shells, and call-shaped
//! references, and each reference is attributed to the nearest preceding
//! definition in the same file. That heuristic is what the downstream
//! resolver consumes; precision beyond it belongs to real semantic
//! tooling, not here.
//!
//! Limitations:
//! - nested function expressions attribute their calls to the enclosing
//!   named definition
//! - object-literal methods are not extracted as definitions
//! - `.prisma` files carry no functions; they exist for the declaration
//!   pass and produce empty facts here

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{ClassFact, FileFacts, FunctionFact};

/// Languages the fact extractor recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    JavaScript,
    TypeScript,
    Prisma,
    Unknown,
}

impl Language {
    pub fn tag(self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Prisma => "prisma",
            Language::Unknown => "unknown",
        }
    }
}

/// Detect language from file extension.
pub fn detect_language(path: &Path) -> Language {
    match path.extension().and_then(|e| e.to_str()) {
        Some("js" | "jsx" | "mjs" | "cjs") => Language::JavaScript,
        Some("ts" | "tsx") => Language::TypeScript,
        Some("prisma") => Language::Prisma,
        _ => Language::Unknown,
    }
}

/// Calculate 1-indexed line number from byte offset.
fn line_number(content: &str, byte_offset: usize) -> u32 {
    content[..byte_offset].matches('\n').count() as u32 + 1
}

/// Keywords that look like calls to the reference regex (`if (...)`).
const JS_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "catch", "try", "finally",
    "return", "throw", "new", "delete", "typeof", "instanceof", "void", "in", "of",
    "function", "class", "extends", "super", "this", "import", "export", "default",
    "await", "async", "yield", "let", "const", "var",
];

/// Regex patterns for JS/TS fact extraction.
/// Cached as statics to avoid recompilation on every parse.
mod js_patterns {
    use super::*;

    /// `export async function charge(amount: number): Promise<void>`
    pub static FUNCTION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?m)^[ \t]*(export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)\s*\(([^)]*)\)(?:\s*:\s*([^{\n]+))?",
        )
        .expect("invalid function regex")
    });

    /// `const charge = async (amount) =>` / `export const f = (): T =>`
    pub static ARROW: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?m)^[ \t]*(export\s+)?(?:const|let|var)\s+(\w+)\s*(?::[^=\n]+)?=\s*(?:async\s+)?\(([^)]*)\)\s*(?::\s*([^=\n{]+?))?\s*=>",
        )
        .expect("invalid arrow regex")
    });

    /// Single-parameter arrow without parentheses: `const f = x =>`
    pub static ARROW_BARE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^[ \t]*(export\s+)?(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s+)?(\w+)\s*=>")
            .expect("invalid bare arrow regex")
    });

    /// `export abstract class Wallet extends Base {`
    pub static CLASS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^[ \t]*(export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(\w+)[^{\n]*\{")
            .expect("invalid class regex")
    });

    /// Indented method with a body: `  async charge(amount): void {`
    pub static METHOD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?m)^[ \t]+(?:(?:public|private|protected|static|async|override|readonly)\s+)*(\w+)\s*\(([^)]*)\)(?:\s*:\s*([^{\n]+))?\s*\{",
        )
        .expect("invalid method regex")
    });

    /// Class property at body depth 1: `balance: number;` / `count = 0;`
    pub static PROPERTY: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"^\s*(?:(?:public|private|protected|readonly|static|declare|override)\s+)*(\w+)\??\s*[:=]",
        )
        .expect("invalid property regex")
    });

    /// Call-shaped reference: `chargeCard(` (bare or after a dot)
    pub static CALL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b([A-Za-z_]\w*)\s*\(").expect("invalid call regex")
    });
}

/// One definition found in a file, before attribution.
struct RawDef {
    offset: usize,
    fact: FunctionFact,
    /// Index into the classes vec, if this is a method
    class: Option<usize>,
}

/// The fact parser. Stateless; one instance serves the whole run.
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Read a file and extract its facts.
    ///
    /// The I/O error propagates so the caller can record a per-file
    /// "facts unavailable" notice instead of aborting the run.
    pub fn parse_file(&self, path: &Path, rel_path: &str) -> Result<FileFacts> {
        let content = std::fs::read_to_string(path)?;
        Ok(self.parse_source(&content, rel_path, detect_language(path)))
    }

    /// Extract facts from already-loaded source text.
    pub fn parse_source(&self, content: &str, rel_path: &str, language: Language) -> FileFacts {
        let mut facts = FileFacts::new(rel_path, language.tag());
        if !matches!(language, Language::JavaScript | Language::TypeScript) {
            return facts;
        }

        let file: Arc<str> = Arc::from(rel_path);
        let mut defs: Vec<RawDef> = Vec::new();

        // Class shells first, so methods can be attributed to them
        let mut class_spans: Vec<(usize, usize, bool)> = Vec::new();
        for caps in js_patterns::CLASS.captures_iter(content) {
            let whole = caps.get(0).expect("match group 0");
            let exported = caps.get(1).is_some();
            let open = whole.end() - 1;
            let end = block_end(content, open);
            class_spans.push((whole.start(), end, exported));
            facts.classes.push(ClassFact {
                name: caps[2].into(),
                methods: Vec::new(),
                properties: class_properties(&content[open + 1..end]),
            });
        }

        for caps in js_patterns::FUNCTION.captures_iter(content) {
            let whole = caps.get(0).expect("match group 0");
            let mut fact = FunctionFact::new(
                file.clone(),
                &caps[2],
                line_number(content, whole.start()),
            );
            fact.parameters = split_params(&caps[3]);
            fact.return_type = caps.get(4).map(|m| m.as_str().trim().to_string());
            fact.exported = caps.get(1).is_some();
            defs.push(RawDef {
                offset: whole.start(),
                fact,
                class: None,
            });
        }

        for caps in js_patterns::ARROW.captures_iter(content) {
            let whole = caps.get(0).expect("match group 0");
            let mut fact = FunctionFact::new(
                file.clone(),
                &caps[2],
                line_number(content, whole.start()),
            );
            fact.parameters = split_params(&caps[3]);
            fact.return_type = caps.get(4).map(|m| m.as_str().trim().to_string());
            fact.exported = caps.get(1).is_some();
            defs.push(RawDef {
                offset: whole.start(),
                fact,
                class: None,
            });
        }

        for caps in js_patterns::ARROW_BARE.captures_iter(content) {
            let whole = caps.get(0).expect("match group 0");
            let name = &caps[2];
            // paren form already captured this definition
            if defs
                .iter()
                .any(|d| d.offset == whole.start() && d.fact.name.as_ref() == name)
            {
                continue;
            }
            let mut fact =
                FunctionFact::new(file.clone(), name, line_number(content, whole.start()));
            fact.parameters = vec![caps[3].to_string()];
            fact.exported = caps.get(1).is_some();
            defs.push(RawDef {
                offset: whole.start(),
                fact,
                class: None,
            });
        }

        for caps in js_patterns::METHOD.captures_iter(content) {
            let whole = caps.get(0).expect("match group 0");
            let name = &caps[1];
            if JS_KEYWORDS.contains(&name) {
                continue;
            }
            let Some(class_idx) = class_spans
                .iter()
                .position(|(start, end, _)| whole.start() > *start && whole.start() < *end)
            else {
                continue; // indented call or object-literal method
            };
            let mut fact =
                FunctionFact::new(file.clone(), name, line_number(content, whole.start()));
            fact.parameters = split_params(&caps[2]);
            fact.return_type = caps.get(3).map(|m| m.as_str().trim().to_string());
            fact.exported = class_spans[class_idx].2;
            defs.push(RawDef {
                offset: whole.start(),
                fact,
                class: Some(class_idx),
            });
        }

        defs.sort_by_key(|d| d.offset);

        // Name-group offsets of definitions, so the call scan skips them
        let def_offsets: Vec<usize> = defs.iter().map(|d| d.offset).collect();
        let def_name_positions: std::collections::HashSet<usize> = defs
            .iter()
            .map(|d| d.offset)
            .chain(method_name_offsets(content))
            .collect();

        for caps in js_patterns::CALL.captures_iter(content) {
            let name_match = caps.get(1).expect("match group 1");
            let name = name_match.as_str();
            if JS_KEYWORDS.contains(&name) {
                continue;
            }
            if def_name_positions.contains(&name_match.start()) {
                continue;
            }
            // nearest preceding definition owns this reference
            let owner = match def_offsets.partition_point(|&o| o < name_match.start()) {
                0 => continue, // reference before any definition
                n => n - 1,
            };
            // a definition header's own parameter list is not a call site
            if defs[owner].fact.name.as_ref() == name
                && line_number(content, defs[owner].offset) == line_number(content, name_match.start())
            {
                continue;
            }
            defs[owner].fact.callees.push(Arc::from(name));
        }

        for def in defs {
            match def.class {
                Some(idx) => facts.classes[idx].methods.push(def.fact),
                None => facts.functions.push(def.fact),
            }
        }

        facts
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte offsets where a method definition's name starts (the METHOD
/// pattern has leading whitespace, so group 0's start is not the name).
fn method_name_offsets(content: &str) -> Vec<usize> {
    js_patterns::METHOD
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).map(|m| m.start()))
        .collect()
}

/// Index of the brace matching the one at `open`; end of content when
/// unbalanced.
fn block_end(content: &str, open: usize) -> usize {
    let bytes = content.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
    }
    content.len()
}

fn split_params(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Property names at depth 1 of a class body (methods excluded).
fn class_properties(body: &str) -> Vec<String> {
    let mut props = Vec::new();
    let mut depth = 1usize;
    for line in body.lines() {
        if depth == 1 && !line.contains('(') && !line.trim_start().starts_with('@') {
            if let Some(caps) = js_patterns::PROPERTY.captures(line) {
                props.push(caps[1].to_string());
            }
        }
        for b in line.bytes() {
            match b {
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }
    props
}
