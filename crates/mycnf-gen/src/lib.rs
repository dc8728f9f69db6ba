//! Generates `my.cnf` for a MySQL pod from its memory budget.
//!
//! The template supplies every section and key; generation overwrites the
//! `server-id`, query cache, buffer pool and per-session buffer values of
//! the `mysqld` section and writes the result over the target file.

use std::path::PathBuf;

use mysql_ops_common::OpsError;
use thiserror::Error;

pub mod document;
pub mod generator;
pub mod memory;

pub use document::{Entry, MyCnfDocument, Section};
pub use generator::{
    apply_settings, compute_settings, MyCnfGenerator, MyCnfSettings, DEFAULT_OUTPUT_PATH,
    DEFAULT_TEMPLATE_PATH, MYSQLD_SECTION, QUERY_CACHE_CAP,
};
pub use memory::{
    parse_budget, parse_memory, parse_memory_size, MemoryBudget, MemoryParseError, MemorySize,
    DEFAULT_MEMORY, DEFAULT_POOL_SIZE, GB, KB, MB,
};

#[derive(Error, Debug)]
pub enum MyCnfError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Template parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Section [{0}] not found in template")]
    MissingSection(String),
    #[error("Key {key} not found in section [{section}]")]
    MissingKey { section: String, key: String },
    #[error(transparent)]
    Ops(#[from] OpsError),
}

pub type Result<T> = std::result::Result<T, MyCnfError>;
