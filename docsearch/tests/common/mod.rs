#![allow(dead_code)]

use docsearch::tokenizer::{title_terms, tokenize};
use docsearch::{IndexBuilder, SearchIndex, SourceDocument};
use std::collections::HashSet;

const SAMPLE: &str = include_str!("../../../sample_data/sentinelone.jsonl");
pub const SPHINX_FIXTURE: &str = include_str!("../fixtures/searchindex.js");

pub fn sample_corpus() -> Vec<SourceDocument> {
    SAMPLE
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

pub fn build(docs: Vec<SourceDocument>) -> SearchIndex {
    let mut builder = IndexBuilder::new();
    builder.extend(docs);
    builder.build().unwrap()
}

pub fn sample_index() -> SearchIndex {
    build(sample_corpus())
}

/// Every term a source document could be found by, recomputed from scratch.
pub fn source_terms(doc: &SourceDocument) -> HashSet<String> {
    let mut terms: HashSet<String> = title_terms(&doc.title).into_iter().collect();
    terms.extend(tokenize(&doc.body).into_iter().map(|(t, _)| t));
    for section in &doc.sections {
        terms.extend(title_terms(&section.title));
        terms.extend(tokenize(&section.body).into_iter().map(|(t, _)| t));
    }
    terms
}

/// Terms coming from headings only.
pub fn heading_terms(doc: &SourceDocument) -> HashSet<String> {
    let mut terms: HashSet<String> = title_terms(&doc.title).into_iter().collect();
    for section in &doc.sections {
        terms.extend(title_terms(&section.title));
    }
    terms
}

pub fn source_for<'a>(corpus: &'a [SourceDocument], filename: &str) -> &'a SourceDocument {
    corpus.iter().find(|d| d.filename == filename).unwrap()
}
