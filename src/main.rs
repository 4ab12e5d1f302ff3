//! factmap CLI - cross-file call graph and entity reconciliation
//!
//! Orchestrates the full pipeline:
//!
//! 1. File Discovery: find JS/TS/Prisma sources respecting .gitignore
//! 2. Fact Extraction: regex extraction of functions and call references
//! 3. Call Resolution: ambiguous-tolerant bare-name resolution
//! 4. Feature Grouping: path-derived groups with dependency edges
//! 5. Declaration Extraction: raw-text re-read for type declarations
//! 6. Entity Reconciliation: synonym clustering and mismatch detection
//! 7. Report: JSON artifact or plain-text summary
//!
//! Resolution and reconciliation run strictly after the whole corpus is
//! extracted; a single unreadable file degrades to a notice instead of
//! aborting the run.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;

use factmap::callgraph::CallResolver;
use factmap::config::Config;
use factmap::discovery::{find_source_files, relative_path};
use factmap::entities::{DeclarationExtractor, EntityReconciler};
use factmap::extraction::Parser as FactParser;
use factmap::features::group_features;
use factmap::report::AnalysisReport;
use factmap::types::{FactStore, TypeDeclaration};

/// Cross-file call graph and semantic entity reconciliation
///
/// factmap links callers to the callee implementation they likely invoke
/// and reconciles differently-named types (Money, Balance, Coin) scattered
/// across database, API, and backend layers into one entity catalog with
/// drift warnings.
///
/// Examples:
///   factmap .                        # Analyze the current project
///   factmap src --json               # JSON artifact for tooling
///   factmap . --exclude "**/e2e/**"  # Skip test fixtures
#[derive(Parser, Debug)]
#[command(name = "factmap")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Directory or file to analyze
    #[arg(value_name = "PATH", default_value = ".")]
    path: PathBuf,

    /// Emit the full artifact as pretty-printed JSON on stdout
    #[arg(long)]
    json: bool,

    /// Restrict analysis to paths matching these globs
    ///
    /// Extends any include patterns from factmap.toml / package.json.
    #[arg(long, value_name = "GLOB")]
    include: Vec<String>,

    /// Exclude paths matching these globs (extends the defaults)
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Print progress information to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let start = Instant::now();
    let root = &cli.path;
    // For a single-file target, config and relative paths key off its parent
    let base = if root.is_file() {
        root.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
    } else {
        root.clone()
    };

    let mut config = Config::load(&base);
    config.include.extend(cli.include.iter().cloned());
    config.extend_exclude.extend(cli.exclude.iter().cloned());

    if cli.verbose {
        eprintln!("🧭 factmap v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("📂 Scanning: {}", root.display());
        if let Some(ref source) = config.source {
            eprintln!("   Config: {}", source.display());
        }
    }

    let files = find_source_files(root, &config)?;
    if cli.verbose {
        eprintln!("✓ Found {} files ({:.2?})", files.len(), start.elapsed());
    }

    // Extraction: facts and declarations are independent passes over the
    // same sorted file list. A file that cannot be read degrades to a
    // notice and is skipped by both passes.
    let parser = FactParser::new();
    let decl_extractor = DeclarationExtractor::new(config.layer_keywords.clone());

    let mut per_file = Vec::new();
    let mut declarations: Vec<TypeDeclaration> = Vec::new();
    let mut notices = Vec::new();

    for path in &files {
        let rel = relative_path(&base, path);
        let facts = match parser.parse_file(path, &rel) {
            Ok(facts) => facts,
            Err(err) => {
                notices.push(format!("facts unavailable for {rel}: {err}"));
                continue;
            }
        };
        per_file.push(facts);

        match decl_extractor.extract_file(path, &rel) {
            Ok(decls) => declarations.extend(decls),
            Err(err) => notices.push(format!("facts unavailable for {rel}: {err}")),
        }
    }

    // Analysis: strictly after the full corpus is in memory
    let mut store = FactStore::from_files(per_file);
    if cli.verbose {
        eprintln!(
            "✓ Extracted {} functions, {} type declarations",
            store.len(),
            declarations.len()
        );
    }

    let (graph, stats) = CallResolver::new().resolve(&mut store);
    if cli.verbose {
        eprintln!(
            "✓ Resolved {}/{} references ({:.0}% rate, {} denylisted)",
            stats.resolved,
            stats.total_references,
            stats.resolution_rate() * 100.0,
            stats.denylisted
        );
    }

    let features = group_features(&store);
    let reconciler = EntityReconciler::new(config.synonyms.clone(), config.compat.clone());
    let catalog = reconciler.reconcile(&declarations);
    if cli.verbose {
        eprintln!(
            "✓ {} features, {} entities, {} mismatches ({:.2?} total)",
            features.len(),
            catalog.entities.len(),
            catalog.mismatches.len(),
            start.elapsed()
        );
    }

    let report = AnalysisReport::assemble(&graph, features, catalog, &stats, files.len(), notices);

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_text());
    }

    Ok(())
}
