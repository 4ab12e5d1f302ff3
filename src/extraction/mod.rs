//! Fact extraction from source code.
//!
//! Regex-based extraction of function facts and raw call references. The
//! declaration pass (types, fields, layers) lives in [`crate::entities`]
//! and re-reads files independently; the two passes share nothing but the
//! file list.

mod parser;

pub use parser::{detect_language, Language, Parser};
