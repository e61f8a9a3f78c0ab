//! edefter - Flatten E-Defter (XBRL Global Ledger) documents into table rows
//!
//! Licensed under AGPL-3.0

pub mod flatten;
pub mod model;
pub mod parser;
pub mod schema;
pub mod summary;
pub mod tree;

pub use flatten::{flatten, Flattener};
pub use model::{QName, Record};
pub use parser::Parser;
pub use schema::{Schema, SchemaVariant};
pub use summary::LedgerSummary;
pub use tree::{Document, ElementTree, NodeId};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::path::Path;

/// Parse one ledger file and flatten it with `schema`.
pub fn extract_file<P: AsRef<Path>>(path: P, schema: &Schema) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let doc = Parser::new().parse_file(path)?;
    let records = Flattener::new(schema).flatten(&doc)?;
    log::info!("{}: {} records", path.display(), records.len());
    Ok(records)
}

/// One result per input, in input order. A failing file does not stop the others.
#[cfg(feature = "parallel")]
pub fn extract_files<P: AsRef<Path> + Sync>(paths: &[P], schema: &Schema) -> Vec<Result<Vec<Record>>> {
    paths
        .par_iter()
        .map(|path| extract_file(path, schema))
        .collect()
}

/// One result per input, in input order. A failing file does not stop the others.
#[cfg(not(feature = "parallel"))]
pub fn extract_files<P: AsRef<Path> + Sync>(paths: &[P], schema: &Schema) -> Vec<Result<Vec<Record>>> {
    paths.iter().map(|path| extract_file(path, schema)).collect()
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Tree access error: {0}")]
    TreeAccess(String),

    #[error("Structure error: {0}")]
    Structure(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
