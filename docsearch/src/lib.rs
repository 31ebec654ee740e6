//! Client-side full-text search over a documentation site.
//!
//! An index is built once, offline, with [`IndexBuilder`], persisted in a
//! Sphinx-compatible `searchindex.js` (plus a binary snapshot), then loaded
//! and queried with [`SearchIndex::search`]. Loaded indexes are immutable and
//! can be shared freely between threads.

pub mod builder;
pub mod error;
pub mod index;
pub mod persist;
pub mod porter;
pub mod query;
pub mod tokenizer;

pub use builder::{IndexBuilder, SourceDocument, SourceObject, SourceSection};
pub use error::{IndexError, Result, TermTable};
pub use index::{DocId, Document, ObjectEntry, PostingSet, SearchIndex, Section};
pub use query::{HitKind, Scorer, SearchHit, SearchOptions};
pub use tokenizer::Stemming;
