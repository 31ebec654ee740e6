//! Query side of the index: free-text and object-name lookups.
//!
//! A query is a pure read. Object-name matches are returned first, followed by
//! documents containing every query term, ranked by [`Scorer`] weights.

use crate::index::{DocId, Document, SearchIndex};
use crate::tokenizer::{QueryTerm, Stemming};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Ranking weights.
///
/// The defaults mirror the weights Sphinx uses for its client-side search, which
/// produced the indexes this crate reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scorer {
    /// Query equals an object name, or its last dotted component.
    pub object: f32,
    pub object_partial: f32,
    pub title: f32,
    pub partial_title: f32,
    pub term: f32,
    pub partial_term: f32,
}

impl Default for Scorer {
    fn default() -> Self {
        Self {
            object: 11.0,
            object_partial: 6.0,
            title: 15.0,
            partial_title: 7.0,
            term: 5.0,
            partial_term: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub scorer: Scorer,
    /// Also match index terms that merely contain a query word (words longer than two chars).
    pub partial_matches: bool,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    Object,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub title: String,
    pub docname: String,
    pub filename: String,
    pub anchor: Option<String>,
    pub score: f32,
    pub kind: HitKind,
}

impl SearchHit {
    fn new(doc: &Document, anchor: Option<String>, score: f32, kind: HitKind) -> Self {
        Self {
            doc_id: doc.id,
            title: doc.title.clone(),
            docname: doc.docname.clone(),
            filename: doc.filename.clone(),
            anchor,
            score,
            kind,
        }
    }
}

const PARTIAL_MIN_LEN: usize = 3;

impl SearchIndex {
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.search_with(query, &SearchOptions::default())
    }

    pub fn search_with(&self, query: &str, options: &SearchOptions) -> Vec<SearchHit> {
        let mut hits = self.object_hits(query, options);
        let claimed: HashSet<DocId> = hits.iter().map(|h| h.doc_id).collect();

        let terms = self.stemming().query_terms(query);
        let text_hits = self.text_hits(&terms, options);
        let total_text = text_hits.len();
        hits.extend(text_hits.into_iter().filter(|h| !claimed.contains(&h.doc_id)));

        if let Some(limit) = options.limit {
            hits.truncate(limit);
        }
        tracing::debug!(
            query,
            num_terms = terms.len(),
            object_hits = claimed.len(),
            text_hits = total_text,
            returned = hits.len(),
            "search complete"
        );
        hits
    }

    fn object_hits(&self, query: &str, options: &SearchOptions) -> Vec<SearchHit> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() || needle.chars().any(char::is_whitespace) {
            return Vec::new();
        }

        // (exact, doc id, name) orders exact matches first, then by page, then by name.
        let mut found: Vec<(bool, DocId, &str)> = Vec::new();
        for (name, entry) in self.objects() {
            let lowered = name.to_lowercase();
            let last = lowered.rsplit('.').next().unwrap_or(lowered.as_str());
            if lowered == needle || last == needle {
                found.push((true, entry.doc_id, name.as_str()));
            } else if options.partial_matches && lowered.contains(&needle) {
                found.push((false, entry.doc_id, name.as_str()));
            }
        }
        found.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(b.2)));

        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for (exact, doc_id, name) in found {
            if !seen.insert(doc_id) {
                continue;
            }
            let (Some(doc), Some(entry)) = (self.document(doc_id), self.object(name)) else { continue };
            let score = if exact { options.scorer.object } else { options.scorer.object_partial };
            hits.push(SearchHit::new(doc, entry.anchor.clone(), score, HitKind::Object));
        }
        hits
    }

    /// Per-document score for one query term; absent documents did not match it.
    /// With `partial` set, index terms that merely contain the word count as well.
    fn term_scores(&self, term: &QueryTerm, options: &SearchOptions, partial: bool) -> BTreeMap<DocId, f32> {
        let scorer = &options.scorer;
        let mut scores: BTreeMap<DocId, f32> = BTreeMap::new();
        let mut bump = |docs: &BTreeSet<DocId>, score: f32| {
            for &doc_id in docs {
                let slot = scores.entry(doc_id).or_insert(score);
                if *slot < score {
                    *slot = score;
                }
            }
        };

        if let Some(docs) = self.title_postings(&term.stem) {
            bump(docs, scorer.title);
        }
        if term.raw != term.stem {
            if let Some(docs) = self.title_postings(&term.raw) {
                bump(docs, scorer.title);
            }
        }
        if let Some(docs) = self.body_postings(&term.stem) {
            bump(docs, scorer.term);
        }

        if partial && term.raw.chars().count() >= PARTIAL_MIN_LEN {
            for (key, docs) in self.title_terms() {
                if key != &term.stem && key != &term.raw && key.contains(term.stem.as_str()) {
                    bump(docs, scorer.partial_title);
                }
            }
            for (key, docs) in self.body_terms() {
                if key != &term.stem && key.contains(term.stem.as_str()) {
                    bump(docs, scorer.partial_term);
                }
            }
        }
        scores
    }

    fn text_hits(&self, terms: &[QueryTerm], options: &SearchOptions) -> Vec<SearchHit> {
        let (excluded, included): (Vec<&QueryTerm>, Vec<&QueryTerm>) = terms.iter().partition(|t| t.excluded);
        if included.is_empty() {
            return Vec::new();
        }

        // Conjunctive: start from the first term and intersect with each following one.
        let mut candidates: Option<BTreeMap<DocId, f32>> = None;
        for term in &included {
            let scores = self.term_scores(term, options, options.partial_matches);
            candidates = Some(match candidates {
                None => scores,
                Some(acc) => acc
                    .into_iter()
                    .filter_map(|(doc_id, total)| scores.get(&doc_id).map(|s| (doc_id, total + s)))
                    .collect(),
            });
            if candidates.as_ref().is_some_and(|c| c.is_empty()) {
                return Vec::new();
            }
        }
        let mut candidates = candidates.unwrap_or_default();

        // Only documents holding the excluded word itself are dropped.
        for term in &excluded {
            for doc_id in self.term_scores(term, options, false).keys() {
                candidates.remove(doc_id);
            }
        }

        let mut ranked: Vec<(DocId, f32)> = candidates.into_iter().collect();
        // Ids arrive ascending; a stable sort keeps them that way among equal scores.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        ranked
            .into_iter()
            .filter_map(|(doc_id, score)| {
                let doc = self.document(doc_id)?;
                let anchor = section_anchor(doc, &included, self.stemming());
                Some(SearchHit::new(doc, anchor, score, HitKind::Text))
            })
            .collect()
    }
}

/// Anchor of the first section whose heading holds every query term.
fn section_anchor(doc: &Document, terms: &[&QueryTerm], stemming: Stemming) -> Option<String> {
    doc.sections
        .iter()
        .filter(|s| s.anchor.is_some())
        .find(|s| {
            let heading: HashSet<String> = stemming.title_terms(&s.title).into_iter().collect();
            terms.iter().all(|t| heading.contains(&t.stem) || heading.contains(&t.raw))
        })
        .and_then(|s| s.anchor.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{IndexBuilder, SourceDocument, SourceObject, SourceSection};

    fn page(filename: &str, title: &str, body: &str) -> SourceDocument {
        SourceDocument {
            filename: filename.to_string(),
            docname: None,
            title: title.to_string(),
            body: body.to_string(),
            sections: vec![],
            objects: vec![],
        }
    }

    fn corpus() -> SearchIndex {
        let mut groups = page("groups.rst", "Manage SentinelOne Groups", "Create static and dynamic groups.");
        groups.objects.push(SourceObject { name: "sva.sentinelone.sentinelone_groups".into(), anchor: None });
        groups.sections.push(SourceSection {
            title: "Parameters".into(),
            anchor: Some("parameters".into()),
            body: "The site name the group belongs to.".into(),
        });

        let mut sites = page("sites.rst", "Manage SentinelOne Sites", "Create sites. Sites hold groups.");
        sites.objects.push(SourceObject {
            name: "sva.sentinelone.sentinelone_sites".into(),
            anchor: Some("module-sentinelone_sites".into()),
        });

        let index_page = page(
            "index.rst",
            "Plugin Index",
            "Modules: sentinelone_groups and sentinelone_sites manage groups and sites.",
        );

        let mut builder = IndexBuilder::new();
        builder.add(sites).add(groups).add(index_page);
        builder.build().unwrap()
    }

    fn ids(hits: &[SearchHit]) -> Vec<DocId> { hits.iter().map(|h| h.doc_id).collect() }

    // Sorted file names: groups.rst = 0, index.rst = 1, sites.rst = 2.

    #[test]
    fn title_match_ranks_first() {
        let index = corpus();
        let hits = index.search("groups");
        assert_eq!(ids(&hits), vec![0, 1, 2]);
        assert_eq!(hits[0].score, 15.0);
        assert_eq!(hits[1].score, 5.0);
        assert_eq!(hits[0].kind, HitKind::Text);
    }

    #[test]
    fn equal_scores_fall_back_to_document_id() {
        let index = corpus();
        let hits = index.search("create");
        assert_eq!(ids(&hits), vec![0, 2]);
        assert_eq!(hits[0].score, hits[1].score);
    }

    #[test]
    fn terms_are_conjunctive() {
        let index = corpus();
        assert_eq!(ids(&index.search("static groups")), vec![0]);
        assert!(index.search("groups nonexistentword").is_empty());
    }

    #[test]
    fn excluded_terms_remove_documents() {
        let index = corpus();
        assert_eq!(ids(&index.search("groups -modules")), vec![0, 2]);
    }

    #[test]
    fn object_names_take_priority() {
        let index = corpus();
        let hits = index.search("sentinelone_sites");
        assert_eq!(hits[0].doc_id, 2);
        assert_eq!(hits[0].kind, HitKind::Object);
        assert_eq!(hits[0].anchor.as_deref(), Some("module-sentinelone_sites"));
        assert_eq!(hits.iter().filter(|h| h.doc_id == 2).count(), 1);

        let hits = index.search("SVA.SentinelOne.sentinelone_groups");
        assert_eq!(hits[0].doc_id, 0);
        assert_eq!(hits[0].score, Scorer::default().object);
    }

    #[test]
    fn partial_matches_are_opt_in() {
        let index = corpus();
        assert!(index.search("stat").is_empty());

        let options = SearchOptions { partial_matches: true, ..Default::default() };
        let hits = index.search_with("stat", &options);
        assert_eq!(ids(&hits), vec![0]);
        assert_eq!(hits[0].score, Scorer::default().partial_term);

        let hits = index.search_with("sentinelone", &options);
        assert!(hits.iter().take_while(|h| h.kind == HitKind::Object).count() >= 2);
    }

    #[test]
    fn exclusions_ignore_partial_matches() {
        let index = corpus();
        let options = SearchOptions { partial_matches: true, ..Default::default() };
        // Only groups.rst has "static"; nothing holds the word "stat" itself.
        assert_eq!(ids(&index.search_with("groups -stat", &options)), vec![0, 1, 2]);
        assert_eq!(ids(&index.search_with("groups -static", &options)), vec![1, 2]);
    }

    #[test]
    fn anchor_points_at_matching_section() {
        let index = corpus();
        let hits = index.search("parameters");
        assert_eq!(hits[0].doc_id, 0);
        assert_eq!(hits[0].anchor.as_deref(), Some("parameters"));

        let hits = index.search("groups");
        assert_eq!(hits[0].anchor, None);
    }

    #[test]
    fn limit_and_custom_weights() {
        let index = corpus();
        let options = SearchOptions { limit: Some(1), ..Default::default() };
        assert_eq!(index.search_with("groups", &options).len(), 1);

        let scorer = Scorer { title: 1.0, term: 2.0, ..Default::default() };
        let options = SearchOptions { scorer, ..Default::default() };
        assert_eq!(ids(&index.search_with("groups", &options)), vec![1, 2, 0]);
    }

    #[test]
    fn empty_and_stopword_queries_return_nothing() {
        let index = corpus();
        assert!(index.search("").is_empty());
        assert!(index.search("   ").is_empty());
        assert!(index.search("the of and").is_empty());
        assert!(index.search("-groups").is_empty());
    }

    #[test]
    fn scorer_loads_with_partial_overrides() {
        let scorer: Scorer = serde_json::from_str(r#"{"title": 20}"#).unwrap();
        assert_eq!(scorer.title, 20.0);
        assert_eq!(scorer.term, 5.0);
    }
}
