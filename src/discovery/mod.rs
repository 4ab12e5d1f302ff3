//! File discovery - finding analyzable sources.

mod files;

pub use files::{find_source_files, relative_path, ANALYZABLE_EXTENSIONS};
