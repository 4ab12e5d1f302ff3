//! Configuration loading from factmap.toml and package.json.
//!
//! Follows the convention of host-ecosystem tooling: a standalone
//! `factmap.toml`, or a `"factmap"` key inside the project's package.json,
//! found by walking up from the analyzed directory.
//!
//! ## Example
//!
//! ```toml
//! include = ["src/**", "db/**"]
//! extend-exclude = ["**/__generated__/**"]
//!
//! [synonyms]
//! money = ["coin", "amount", "balance"]
//!
//! [layer-keywords]
//! api = ["api", "routes", "controller", "handler", "dto", "gateway"]
//!
//! [[type-compat]]
//! database = "jsonb"
//! api = ["object", "Record"]
//! ```
//!
//! The heuristic tables (synonyms, layer keywords, type compatibility) are
//! injectable here so they can be extended without touching clustering or
//! mismatch logic.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::entities::{CompatRule, CompatTable, LayerKeywords, SynonymTable};

/// Default exclude patterns (common non-source directories).
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/dist/**",
    "**/build/**",
    "**/out/**",
    "**/coverage/**",
    "**/.next/**",
    "**/.nuxt/**",
    "**/vendor/**",
    "**/__generated__/**",
];

/// Factmap configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Source file this config was loaded from (for display).
    pub source: Option<PathBuf>,

    /// Glob patterns for files to include. Empty means include all.
    pub include: Vec<String>,

    /// Glob patterns for files to exclude. Replaces defaults if set.
    pub exclude: Vec<String>,

    /// Additional exclude patterns (extends defaults).
    pub extend_exclude: Vec<String>,

    /// Synonym table for entity clustering.
    pub synonyms: SynonymTable,

    /// Path keyword sets for layer tagging.
    pub layer_keywords: LayerKeywords,

    /// DB->API type compatibility table.
    pub compat: CompatTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: None,
            include: Vec::new(),
            exclude: Vec::new(),
            extend_exclude: Vec::new(),
            synonyms: SynonymTable::default(),
            layer_keywords: LayerKeywords::default(),
            compat: CompatTable::default(),
        }
    }
}

/// Raw config as deserialized from TOML or JSON.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    extend_exclude: Option<Vec<String>>,
    synonyms: Option<BTreeMap<String, Vec<String>>>,
    layer_keywords: Option<RawLayerKeywords>,
    type_compat: Option<Vec<CompatRule>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawLayerKeywords {
    database: Option<Vec<String>>,
    api: Option<Vec<String>>,
    backend: Option<Vec<String>>,
}

/// Wrapper for the package.json structure.
#[derive(Debug, Deserialize)]
struct PackageJson {
    factmap: Option<RawConfig>,
}

impl Config {
    /// Load configuration for the given directory.
    ///
    /// Search order:
    /// 1. factmap.toml in the directory
    /// 2. package.json `"factmap"` key in the directory
    /// 3. Walk up, trying both at each level
    /// 4. Defaults if nothing is found
    pub fn load(directory: &Path) -> Self {
        let mut current = Some(directory.to_path_buf());
        while let Some(dir) = current {
            let toml_path = dir.join("factmap.toml");
            if toml_path.exists() {
                if let Some(config) = Self::load_toml(&toml_path) {
                    return config;
                }
            }
            let pkg_path = dir.join("package.json");
            if pkg_path.exists() {
                if let Some(config) = Self::load_package_json(&pkg_path) {
                    return config;
                }
            }
            current = dir.parent().map(Path::to_path_buf);
        }
        Self::default()
    }

    fn load_toml(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let raw: RawConfig = toml::from_str(&content).ok()?;
        Some(Self::from_raw(raw, path.to_path_buf()))
    }

    fn load_package_json(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let pkg: PackageJson = serde_json::from_str(&content).ok()?;
        let raw = pkg.factmap?;
        Some(Self::from_raw(raw, path.to_path_buf()))
    }

    fn from_raw(raw: RawConfig, source: PathBuf) -> Self {
        let defaults = LayerKeywords::default();
        let layer_keywords = match raw.layer_keywords {
            Some(layers) => LayerKeywords {
                database: layers.database.unwrap_or(defaults.database),
                api: layers.api.unwrap_or(defaults.api),
                backend: layers.backend.unwrap_or(defaults.backend),
            },
            None => defaults,
        };

        Self {
            source: Some(source),
            include: raw.include.unwrap_or_default(),
            exclude: raw.exclude.unwrap_or_default(),
            extend_exclude: raw.extend_exclude.unwrap_or_default(),
            synonyms: raw
                .synonyms
                .map(SynonymTable::from_map)
                .unwrap_or_default(),
            layer_keywords,
            compat: raw
                .type_compat
                .map(CompatTable::from_rules)
                .unwrap_or_default(),
        }
    }

    /// Effective exclude patterns: custom exclude replaces the defaults,
    /// extend-exclude appends to them.
    pub fn effective_excludes(&self) -> Vec<String> {
        if !self.exclude.is_empty() {
            self.exclude.clone()
        } else {
            let mut patterns: Vec<String> =
                DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
            patterns.extend(self.extend_exclude.clone());
            patterns
        }
    }

    /// True if no include patterns are set or the path matches one.
    pub fn matches_include(&self, path: &Path) -> bool {
        if self.include.is_empty() {
            return true;
        }
        let path_str = path.to_string_lossy();
        self.include
            .iter()
            .any(|pattern| glob_match::glob_match(pattern, &path_str))
    }

    /// True if the path matches any effective exclude pattern.
    pub fn matches_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.effective_excludes()
            .iter()
            .any(|pattern| glob_match::glob_match(pattern, &path_str))
    }

    /// Include AND not exclude.
    pub fn should_include(&self, path: &Path) -> bool {
        self.matches_include(path) && !self.matches_exclude(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_excludes() {
        let config = Config::default();
        assert!(config.matches_exclude(Path::new("web/node_modules/left-pad/index.js")));
        assert!(config.matches_exclude(Path::new("app/dist/bundle.js")));
        assert!(!config.matches_exclude(Path::new("src/api/users.ts")));
    }

    #[test]
    fn test_include_patterns() {
        let config = Config {
            include: vec!["src/**".to_string(), "db/**".to_string()],
            ..Default::default()
        };
        assert!(config.matches_include(Path::new("src/app.ts")));
        assert!(config.matches_include(Path::new("db/schema.prisma")));
        assert!(!config.matches_include(Path::new("scripts/build.ts")));
    }

    #[test]
    fn test_extend_exclude_keeps_defaults() {
        let config = Config {
            extend_exclude: vec!["**/fixtures/**".to_string()],
            ..Default::default()
        };
        assert!(config.matches_exclude(Path::new("node_modules/a.js")));
        assert!(config.matches_exclude(Path::new("test/fixtures/sample.ts")));
    }

    #[test]
    fn test_load_factmap_toml() {
        let dir = std::env::temp_dir().join("factmap_test_config_toml");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("factmap.toml"),
            r#"
include = ["src/**"]

[synonyms]
cash = ["wallet", "funds"]
"#,
        )
        .unwrap();

        let config = Config::load(&dir);
        assert!(config.source.is_some());
        assert_eq!(config.include, vec!["src/**"]);
        assert!(config.synonyms.synonyms("cash").unwrap().contains("wallet"));
        // unspecified tables fall back to defaults
        assert!(config.compat.compatible("varchar", "string"));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_load_package_json() {
        let dir = std::env::temp_dir().join("factmap_test_config_pkg");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("package.json"),
            r#"{
  "name": "demo",
  "factmap": { "extend-exclude": ["**/legacy/**"] }
}"#,
        )
        .unwrap();

        let config = Config::load(&dir);
        assert!(config.matches_exclude(Path::new("src/legacy/old.ts")));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_load_defaults_when_nothing_found() {
        let dir = std::env::temp_dir().join("factmap_test_config_none");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let config = Config::load(&dir);
        // walk-up may find nothing or a system-level file; either way the
        // call must not fail and include must default to open
        assert!(config.matches_include(Path::new("anything.ts")));

        fs::remove_dir_all(dir).unwrap();
    }
}
