use crate::error::{IndexError, Result, TermTable};
use crate::tokenizer::Stemming;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub type DocId = u32;

/// Set of documents a term occurs in.
pub type PostingSet = BTreeSet<DocId>;

/// Term table: normalized term -> documents containing it.
pub type TermMap = BTreeMap<String, PostingSet>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    /// In-page anchor; `None` for headings that have no id of their own.
    pub anchor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    /// Permalink base, e.g. `collections/sva/sentinelone/sentinelone_groups_module`.
    pub docname: String,
    /// Source path; unique per document.
    pub filename: String,
    pub title: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub doc_id: DocId,
    pub anchor: Option<String>,
}

/// Raw tables as they come off the wire, before any invariant has been checked.
#[derive(Debug, Default, Deserialize)]
pub struct IndexTables {
    pub docs: Vec<Document>,
    pub title_terms: TermMap,
    pub terms: TermMap,
    pub objects: BTreeMap<String, ObjectEntry>,
    /// How the terms were stemmed.
    pub stemming: Stemming,
}

/// Immutable full-text index over a documentation corpus.
///
/// The only way to obtain one is through [`SearchIndex::from_tables`] (directly, via
/// [`crate::builder::IndexBuilder`], or by deserializing), so every instance satisfies:
///
/// * document `i` has id `i`, and file names are unique;
/// * every posting set is non-empty and only names existing documents;
/// * every object entry names an existing document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IndexTables")]
pub struct SearchIndex {
    docs: Vec<Document>,
    title_terms: TermMap,
    terms: TermMap,
    objects: BTreeMap<String, ObjectEntry>,
    stemming: Stemming,
}

impl TryFrom<IndexTables> for SearchIndex {
    type Error = IndexError;

    fn try_from(tables: IndexTables) -> Result<Self> {
        SearchIndex::from_tables(tables)
    }
}

impl SearchIndex {
    /// Validate raw tables and freeze them into an index.
    pub fn from_tables(tables: IndexTables) -> Result<Self> {
        let IndexTables { docs, title_terms, terms, objects, stemming } = tables;
        let num_docs = docs.len();

        let mut filenames: HashSet<&str> = HashSet::with_capacity(num_docs);
        for (position, doc) in docs.iter().enumerate() {
            if doc.id as usize != position {
                return Err(IndexError::DocumentId { position, id: doc.id });
            }
            if !filenames.insert(doc.filename.as_str()) {
                return Err(IndexError::DuplicateFilename(doc.filename.clone()));
            }
        }

        check_postings(TermTable::Title, &title_terms, num_docs)?;
        check_postings(TermTable::Body, &terms, num_docs)?;

        for (name, entry) in &objects {
            if entry.doc_id as usize >= num_docs {
                return Err(IndexError::DanglingObject { name: name.clone(), doc_id: entry.doc_id });
            }
        }

        Ok(Self { docs, title_terms, terms, objects, stemming })
    }

    pub fn num_docs(&self) -> usize { self.docs.len() }

    /// Distinct keys across both term tables.
    pub fn num_terms(&self) -> usize {
        self.terms.len() + self.title_terms.keys().filter(|t| !self.terms.contains_key(*t)).count()
    }

    pub fn documents(&self) -> &[Document] { &self.docs }

    pub fn document(&self, id: DocId) -> Option<&Document> { self.docs.get(id as usize) }

    pub fn title_postings(&self, term: &str) -> Option<&PostingSet> { self.title_terms.get(term) }

    pub fn body_postings(&self, term: &str) -> Option<&PostingSet> { self.terms.get(term) }

    pub fn title_terms(&self) -> &TermMap { &self.title_terms }

    pub fn body_terms(&self) -> &TermMap { &self.terms }

    pub fn objects(&self) -> &BTreeMap<String, ObjectEntry> { &self.objects }

    pub fn object(&self, name: &str) -> Option<&ObjectEntry> { self.objects.get(name) }

    /// Algorithm queries have to stem with to match this index's terms.
    pub fn stemming(&self) -> Stemming { self.stemming }
}

fn check_postings(table: TermTable, map: &TermMap, num_docs: usize) -> Result<()> {
    for (term, postings) in map {
        // Sets are ordered, so the last id is the only one that can be out of range.
        match postings.last() {
            None => return Err(IndexError::EmptyPosting { table, term: term.clone() }),
            Some(&doc_id) if doc_id as usize >= num_docs => {
                return Err(IndexError::DanglingPosting { table, term: term.clone(), doc_id });
            }
            Some(_) => {}
        }
    }
    Ok(())
}
