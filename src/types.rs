//! Core fact types for factmap - the cross-file reconciliation engine.
//!
//! Everything here is a build-once record: the extractor produces per-file
//! facts, the analysis passes read them, and the only mutation allowed after
//! construction is appending resolved `called_by` backlinks during graph
//! resolution. Key design decisions:
//! - `Arc<str>` for shared ownership of interned names and paths
//! - Deterministic ordering baked into the store (sorted file paths,
//!   declaration order within a file) so repeated runs are byte-identical
//! - Homonyms are legal: the same bare function name may exist in many files

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Serde serialization helpers for Arc<str> fields
pub(crate) mod arc_str_serde {
    use super::*;

    pub fn serialize<S>(arc: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(arc.as_ref())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(s.into())
    }

    pub fn serialize_vec<S>(v: &[Arc<str>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(v.iter().map(|s| s.as_ref()))
    }

    pub fn deserialize_vec<'de, D>(deserializer: D) -> Result<Vec<Arc<str>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v: Vec<String> = Vec::deserialize(deserializer)?;
        Ok(v.into_iter().map(|s| s.into()).collect())
    }
}

/// One extracted function or method.
///
/// Identity is `(file, name)`; the composite key renders as `name@file`.
/// `called_by` starts empty and is filled by the resolver with the composite
/// keys of callers, in resolution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionFact {
    /// Bare function/method name
    #[serde(with = "arc_str_serde")]
    pub name: Arc<str>,
    /// Defining file, relative path
    #[serde(with = "arc_str_serde")]
    pub file: Arc<str>,
    /// Line of the definition (1-indexed)
    pub line: u32,
    /// Parameter signatures as written in source ("id: string")
    pub parameters: Vec<String>,
    /// Return type annotation text if present
    pub return_type: Option<String>,
    /// Raw callee names found in the function body, in source order
    #[serde(
        serialize_with = "arc_str_serde::serialize_vec",
        deserialize_with = "arc_str_serde::deserialize_vec"
    )]
    pub callees: Vec<Arc<str>>,
    /// Whether the definition is exported
    pub exported: bool,
    /// Composite keys of resolved callers, appended during resolution
    #[serde(
        serialize_with = "arc_str_serde::serialize_vec",
        deserialize_with = "arc_str_serde::deserialize_vec"
    )]
    pub called_by: Vec<Arc<str>>,
}

impl FunctionFact {
    pub fn new(file: impl Into<Arc<str>>, name: impl Into<Arc<str>>, line: u32) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            line,
            parameters: Vec::new(),
            return_type: None,
            callees: Vec::new(),
            exported: false,
            called_by: Vec::new(),
        }
    }

    /// Composite identity key: `name@file`
    pub fn composite_key(&self) -> String {
        format!("{}@{}", self.name, self.file)
    }
}

/// One extracted class with its methods and property names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFact {
    #[serde(with = "arc_str_serde")]
    pub name: Arc<str>,
    /// Methods, flattened into the function enumeration by the store
    pub methods: Vec<FunctionFact>,
    /// Declared property names (bodies are handled by declaration extraction)
    pub properties: Vec<String>,
}

/// Per-file extraction output: the input contract from the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFacts {
    /// Relative path of the source file
    #[serde(with = "arc_str_serde")]
    pub path: Arc<str>,
    /// Language tag ("typescript", "javascript", "prisma", ...)
    #[serde(with = "arc_str_serde")]
    pub language: Arc<str>,
    pub functions: Vec<FunctionFact>,
    pub classes: Vec<ClassFact>,
}

impl FileFacts {
    pub fn new(path: impl Into<Arc<str>>, language: impl Into<Arc<str>>) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            functions: Vec::new(),
            classes: Vec::new(),
        }
    }
}

/// The immutable-for-the-run collection of extracted facts.
///
/// Construction flattens class methods into the function enumeration and
/// fixes the global order: lexicographic by file path, then declaration
/// order (line, then name) within a file. Every downstream pass - resolution,
/// grouping, reconciliation - iterates this order, which is what makes
/// first-match resolution deterministic across runs.
#[derive(Debug, Default)]
pub struct FactStore {
    functions: Vec<FunctionFact>,
    source_files: Vec<Arc<str>>,
}

impl FactStore {
    /// Build the store from per-file facts.
    ///
    /// Files arriving in any order produce the same store: paths are sorted
    /// and functions within a file are ordered by line.
    pub fn from_files(files: Vec<FileFacts>) -> Self {
        let mut files = files;
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut functions = Vec::new();
        let mut source_files = Vec::with_capacity(files.len());

        for file in files {
            source_files.push(file.path.clone());
            let mut in_file: Vec<FunctionFact> = file.functions;
            for class in file.classes {
                in_file.extend(class.methods);
            }
            in_file.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.name.cmp(&b.name)));
            functions.extend(in_file);
        }

        Self {
            functions,
            source_files,
        }
    }

    /// All functions in the stable enumeration order.
    pub fn functions(&self) -> &[FunctionFact] {
        &self.functions
    }

    /// All analyzed file paths, sorted.
    pub fn source_files(&self) -> &[Arc<str>] {
        &self.source_files
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Append a resolved caller reference to the function at `index`.
    /// The only mutation the store permits after construction.
    pub fn append_called_by(&mut self, index: usize, caller: Arc<str>) {
        if let Some(fact) = self.functions.get_mut(index) {
            fact.called_by.push(caller);
        }
    }
}

/// Kind of a type-like declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKind {
    Interface,
    Class,
    TypeAlias,
    SchemaModel,
}

/// Layer classification assigned by path-keyword heuristics.
/// Used only for cross-layer mismatch detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerTag {
    Database,
    Api,
    Backend,
}

/// Sentinel type text for field lines the extractor recognized as fields
/// but could not parse a type out of.
pub const UNKNOWN_TYPE: &str = "unknown";

/// One field of a type declaration: an ordered name/type-text pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDecl {
    pub name: String,
    /// Raw type text as written; [`UNKNOWN_TYPE`] when unparsable
    pub type_text: String,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, type_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_text: type_text.into(),
        }
    }
}

/// One type-like declaration occurrence.
///
/// Multiple declarations may share a name across files - legitimate
/// redeclaration or accidental duplication, both retained. Merging happens
/// later, in the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDeclaration {
    #[serde(with = "arc_str_serde")]
    pub name: Arc<str>,
    pub kind: TypeKind,
    /// Ordered field list as written in the declaration body
    pub fields: Vec<FieldDecl>,
    #[serde(with = "arc_str_serde")]
    pub source_file: Arc<str>,
    /// A path may carry multiple tags simultaneously
    pub layers: BTreeSet<LayerTag>,
}

impl TypeDeclaration {
    pub fn has_layer(&self, layer: LayerTag) -> bool {
        self.layers.contains(&layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_file(path: &str, names: &[(&str, u32)]) -> FileFacts {
        let mut file = FileFacts::new(path, "typescript");
        for (name, line) in names {
            file.functions.push(FunctionFact::new(path, *name, *line));
        }
        file
    }

    #[test]
    fn test_store_orders_files_lexicographically() {
        let store = FactStore::from_files(vec![
            make_file("src/zeta.ts", &[("z", 1)]),
            make_file("src/alpha.ts", &[("a", 1)]),
        ]);

        let files: Vec<&str> = store.functions().iter().map(|f| f.file.as_ref()).collect();
        assert_eq!(files, vec!["src/alpha.ts", "src/zeta.ts"]);
    }

    #[test]
    fn test_store_orders_declarations_by_line() {
        let store = FactStore::from_files(vec![make_file(
            "src/a.ts",
            &[("second", 20), ("first", 5)],
        )]);

        let names: Vec<&str> = store.functions().iter().map(|f| f.name.as_ref()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_store_flattens_class_methods() {
        let mut file = FileFacts::new("src/a.ts", "typescript");
        file.functions.push(FunctionFact::new("src/a.ts", "top", 1));
        file.classes.push(ClassFact {
            name: "Svc".into(),
            methods: vec![FunctionFact::new("src/a.ts", "run", 10)],
            properties: vec![],
        });

        let store = FactStore::from_files(vec![file]);
        let names: Vec<&str> = store.functions().iter().map(|f| f.name.as_ref()).collect();
        assert_eq!(names, vec!["top", "run"]);
    }

    #[test]
    fn test_composite_key() {
        let fact = FunctionFact::new("src/billing/pay.ts", "charge", 3);
        assert_eq!(fact.composite_key(), "charge@src/billing/pay.ts");
    }

    #[test]
    fn test_same_input_same_order() {
        let build = || {
            FactStore::from_files(vec![
                make_file("b.ts", &[("f", 2), ("g", 1)]),
                make_file("a.ts", &[("h", 1)]),
            ])
        };
        let keys = |s: &FactStore| -> Vec<String> {
            s.functions().iter().map(|f| f.composite_key()).collect()
        };
        assert_eq!(keys(&build()), keys(&build()));
    }
}
