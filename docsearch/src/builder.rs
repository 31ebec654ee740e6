//! Offline construction of a [`SearchIndex`] from documentation sources.

use crate::error::{IndexError, Result};
use crate::index::{DocId, Document, IndexTables, ObjectEntry, SearchIndex, Section};
use crate::tokenizer::Stemming;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// One documentation page as handed over by the site generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub filename: String,
    /// Defaults to `filename` without its extension.
    #[serde(default)]
    pub docname: Option<String>,
    pub title: String,
    /// Text before the first section heading.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub sections: Vec<SourceSection>,
    /// Fully-qualified names documented on this page.
    #[serde(default)]
    pub objects: Vec<SourceObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    pub title: String,
    #[serde(default)]
    pub anchor: Option<String>,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceObject {
    pub name: String,
    #[serde(default)]
    pub anchor: Option<String>,
}

impl SourceDocument {
    pub fn docname(&self) -> String {
        match &self.docname {
            Some(name) => name.clone(),
            None => match self.filename.rsplit_once('.') {
                Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => stem.to_string(),
                _ => self.filename.clone(),
            },
        }
    }
}

/// Terms found in a single document, before they are merged into shared tables.
struct DocTerms {
    title: BTreeSet<String>,
    body: BTreeSet<String>,
}

fn analyze(doc: &SourceDocument, stemming: Stemming) -> DocTerms {
    let mut title: BTreeSet<String> = stemming.title_terms(&doc.title).into_iter().collect();
    for section in &doc.sections {
        title.extend(stemming.title_terms(&section.title));
    }

    let mut body: BTreeSet<String> = stemming.tokenize(&doc.body).into_iter().map(|(t, _)| t).collect();
    for section in &doc.sections {
        body.extend(stemming.tokenize(&section.body).into_iter().map(|(t, _)| t));
    }
    // A title hit already outranks a body hit for the same page.
    body.retain(|t| !title.contains(t));

    DocTerms { title, body }
}

/// Collects source documents and turns them into an immutable [`SearchIndex`].
///
/// Document ids are assigned by sorted file name, so the order in which documents
/// are added never changes the resulting index.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    sources: Vec<SourceDocument>,
    stemming: Stemming,
}

impl IndexBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, doc: SourceDocument) -> &mut Self {
        self.sources.push(doc);
        self
    }

    pub fn extend<I: IntoIterator<Item = SourceDocument>>(&mut self, docs: I) -> &mut Self {
        self.sources.extend(docs);
        self
    }

    /// Porter by default, which keeps built indexes interchangeable with Sphinx output.
    pub fn stemming(&mut self, stemming: Stemming) -> &mut Self {
        self.stemming = stemming;
        self
    }

    pub fn len(&self) -> usize { self.sources.len() }

    pub fn is_empty(&self) -> bool { self.sources.is_empty() }

    pub fn build(self) -> Result<SearchIndex> {
        let mut sources = self.sources;
        sources.sort_by(|a, b| a.filename.cmp(&b.filename));

        let mut filenames: HashSet<&str> = HashSet::with_capacity(sources.len());
        for doc in &sources {
            if !filenames.insert(doc.filename.as_str()) {
                return Err(IndexError::DuplicateFilename(doc.filename.clone()));
            }
        }

        // Tokenization is independent per document; the merge below stays single-writer.
        let stemming = self.stemming;
        let analyzed: Vec<DocTerms> = sources.par_iter().map(|doc| analyze(doc, stemming)).collect();

        let mut tables = IndexTables { stemming, ..Default::default() };
        for (position, (doc, doc_terms)) in sources.iter().zip(analyzed).enumerate() {
            let id = position as DocId;
            for term in doc_terms.title {
                tables.title_terms.entry(term).or_default().insert(id);
            }
            for term in doc_terms.body {
                tables.terms.entry(term).or_default().insert(id);
            }
            for object in &doc.objects {
                if tables.objects.contains_key(&object.name) {
                    return Err(IndexError::DuplicateObject(object.name.clone()));
                }
                tables
                    .objects
                    .insert(object.name.clone(), ObjectEntry { doc_id: id, anchor: object.anchor.clone() });
            }
        }

        tables.docs = sources
            .into_iter()
            .enumerate()
            .map(|(position, doc)| Document {
                id: position as DocId,
                docname: doc.docname(),
                sections: doc
                    .sections
                    .into_iter()
                    .map(|s| Section { title: s.title, anchor: s.anchor })
                    .collect(),
                filename: doc.filename,
                title: doc.title,
            })
            .collect();

        let index = SearchIndex::from_tables(tables)?;
        tracing::info!(
            num_docs = index.num_docs(),
            num_title_terms = index.title_terms().len(),
            num_body_terms = index.body_terms().len(),
            num_objects = index.objects().len(),
            stemming = %stemming,
            "built search index"
        );
        Ok(index)
    }
}
