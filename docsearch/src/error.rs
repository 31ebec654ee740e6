//! Error types for loading and building a search index.
//!
//! Queries never fail; everything here is raised while an index is being
//! constructed, either by [`crate::builder::IndexBuilder`] or when a
//! persisted payload is loaded back.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::DocId;

/// Which of the two term tables a posting belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermTable {
    Title,
    Body,
}

impl fmt::Display for TermTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermTable::Title => f.write_str("titleterms"),
            TermTable::Body => f.write_str("terms"),
        }
    }
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary snapshot error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Payload is not shaped like an index at all.
    #[error("malformed index payload: {0}")]
    Malformed(String),

    #[error("index payload is missing the `{0}` table")]
    MissingTable(&'static str),

    #[error("table `{table}` has {len} entries, expected {expected}")]
    TableLength {
        table: &'static str,
        len: usize,
        expected: usize,
    },

    #[error("document at position {position} carries id {id}")]
    DocumentId { position: usize, id: DocId },

    #[error("term `{term}` in {table} references unknown document {doc_id}")]
    DanglingPosting {
        table: TermTable,
        term: String,
        doc_id: DocId,
    },

    #[error("term `{term}` in {table} has an empty posting set")]
    EmptyPosting { table: TermTable, term: String },

    #[error("object `{name}` references unknown document {doc_id}")]
    DanglingObject { name: String, doc_id: DocId },

    #[error("section `{title}` references unknown document {doc_id}")]
    DanglingSection { title: String, doc_id: DocId },

    #[error("file name `{0}` is used by more than one document")]
    DuplicateFilename(String),

    #[error("object name `{0}` is declared more than once")]
    DuplicateObject(String),

    #[error("unknown stemmer `{0}`, expected `porter` or `snowball`")]
    UnknownStemmer(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;
