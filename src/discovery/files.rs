//! Git-aware file discovery.
//!
//! Finds the sources both extraction passes will read:
//! - Respects .gitignore automatically via the `ignore` crate
//! - Keeps only analyzable extensions (JS/TS and Prisma schemas)
//! - Applies factmap.toml include/exclude patterns
//! - Returns deterministic (sorted) results
//!
//! Sorting is not cosmetic: the resolver's first-match rule keys off the
//! lexicographic file order, so discovery must hand over a stable list.

use std::path::{Path, PathBuf};

use anyhow::Result;
use ignore::WalkBuilder;

use crate::config::Config;

/// Extensions the analysis understands. Everything else is skipped at
/// discovery time rather than parsed into empty facts.
pub const ANALYZABLE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "prisma"];

/// Find analyzable source files under a directory.
///
/// Uses the `ignore` crate for gitignore-aware traversal, filters by
/// extension and config patterns, and sorts the result.
pub fn find_source_files(directory: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    // Single file fast path
    if directory.is_file() {
        if has_analyzable_extension(directory) && config.should_include(directory) {
            return Ok(vec![directory.to_path_buf()]);
        }
        return Ok(vec![]);
    }

    if !directory.is_dir() {
        anyhow::bail!("Path does not exist: {}", directory.display());
    }

    let walker = WalkBuilder::new(directory)
        .hidden(false) // let .gitignore decide about hidden files
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false) // work in non-git directories too
        .follow_links(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let Ok(entry) = entry else {
            // unreadable entries (permissions, broken symlinks) are skipped
            continue;
        };
        let path = entry.path();
        if !path.is_file() || !has_analyzable_extension(path) {
            continue;
        }
        let rel = path.strip_prefix(directory).unwrap_or(path);
        if !config.should_include(rel) {
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Relative display path for a discovered file, with forward slashes.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let s = rel.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

fn has_analyzable_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let lower = ext.to_ascii_lowercase();
            ANALYZABLE_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}
