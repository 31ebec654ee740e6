use crate::error::{IndexError, Result};
use crate::index::{DocId, Document, IndexTables, ObjectEntry, PostingSet, SearchIndex, Section, TermMap};
use crate::tokenizer::Stemming;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

const JS_PREFIX: &str = "Search.setIndex(";
const JS_SUFFIX: &str = ")";

/// Tables every payload has to carry; Sphinx-only extras like `envversion` are ignored.
const REQUIRED_TABLES: [&str; 7] = ["docnames", "filenames", "titles", "alltitles", "terms", "titleterms", "objects"];

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
}

/// Posting list as written by Sphinx: a bare id when the term occurs in one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WirePostings {
    One(DocId),
    Many(Vec<DocId>),
}

impl From<&PostingSet> for WirePostings {
    fn from(set: &PostingSet) -> Self {
        match (set.len(), set.first()) {
            (1, Some(&id)) => WirePostings::One(id),
            _ => WirePostings::Many(set.iter().copied().collect()),
        }
    }
}

impl From<WirePostings> for PostingSet {
    fn from(p: WirePostings) -> Self {
        match p {
            WirePostings::One(id) => PostingSet::from([id]),
            WirePostings::Many(ids) => ids.into_iter().collect(),
        }
    }
}

/// JSON layout of `searchindex.js`.
#[derive(Debug, Serialize, Deserialize)]
struct WireIndex {
    docnames: Vec<String>,
    filenames: Vec<String>,
    titles: Vec<String>,
    alltitles: BTreeMap<String, Vec<(DocId, Option<String>)>>,
    terms: BTreeMap<String, WirePostings>,
    titleterms: BTreeMap<String, WirePostings>,
    objects: BTreeMap<String, (DocId, Option<String>)>,
    /// Absent from Sphinx output, which is always Porter-stemmed.
    #[serde(default, skip_serializing_if = "Stemming::is_porter")]
    stemmer: Stemming,
}

impl WireIndex {
    fn from_index(index: &SearchIndex) -> Self {
        let docs = index.documents();
        let mut alltitles: BTreeMap<String, Vec<(DocId, Option<String>)>> = BTreeMap::new();
        for doc in docs {
            for section in &doc.sections {
                alltitles.entry(section.title.clone()).or_default().push((doc.id, section.anchor.clone()));
            }
        }
        Self {
            docnames: docs.iter().map(|d| d.docname.clone()).collect(),
            filenames: docs.iter().map(|d| d.filename.clone()).collect(),
            titles: docs.iter().map(|d| d.title.clone()).collect(),
            alltitles,
            terms: index.body_terms().iter().map(|(t, p)| (t.clone(), p.into())).collect(),
            titleterms: index.title_terms().iter().map(|(t, p)| (t.clone(), p.into())).collect(),
            objects: index
                .objects()
                .iter()
                .map(|(name, entry)| (name.clone(), (entry.doc_id, entry.anchor.clone())))
                .collect(),
            stemmer: index.stemming(),
        }
    }

    fn into_index(self) -> Result<SearchIndex> {
        let expected = self.docnames.len();
        for (table, len) in [("filenames", self.filenames.len()), ("titles", self.titles.len())] {
            if len != expected {
                return Err(IndexError::TableLength { table, len, expected });
            }
        }

        let mut docs: Vec<Document> = self
            .docnames
            .into_iter()
            .zip(self.filenames)
            .zip(self.titles)
            .enumerate()
            .map(|(position, ((docname, filename), title))| Document {
                id: position as DocId,
                docname,
                filename,
                title,
                sections: Vec::new(),
            })
            .collect();

        for (title, places) in self.alltitles {
            for (doc_id, anchor) in places {
                let doc = docs
                    .get_mut(doc_id as usize)
                    .ok_or_else(|| IndexError::DanglingSection { title: title.clone(), doc_id })?;
                doc.sections.push(Section { title: title.clone(), anchor });
            }
        }

        let to_map = |wire: BTreeMap<String, WirePostings>| -> TermMap {
            wire.into_iter().map(|(t, p)| (t, PostingSet::from(p))).collect()
        };
        SearchIndex::from_tables(IndexTables {
            docs,
            title_terms: to_map(self.titleterms),
            terms: to_map(self.terms),
            objects: self
                .objects
                .into_iter()
                .map(|(name, (doc_id, anchor))| (name, ObjectEntry { doc_id, anchor }))
                .collect(),
            stemming: self.stemmer,
        })
    }
}

/// Render the index as a `searchindex.js` script.
pub fn to_js(index: &SearchIndex) -> Result<String> {
    let json = serde_json::to_string(&WireIndex::from_index(index))?;
    Ok(format!("{JS_PREFIX}{json}{JS_SUFFIX}"))
}

/// Parse either a bare JSON payload or one wrapped in `Search.setIndex(...)`.
pub fn from_js(text: &str) -> Result<SearchIndex> {
    let trimmed = text.trim().trim_end_matches(';').trim_end();
    let json = match trimmed.strip_prefix(JS_PREFIX) {
        Some(rest) => rest
            .strip_suffix(JS_SUFFIX)
            .ok_or_else(|| IndexError::Malformed("unterminated Search.setIndex(...) call".into()))?,
        None => trimmed,
    };

    let value: serde_json::Value = serde_json::from_str(json)?;
    let obj = value
        .as_object()
        .ok_or_else(|| IndexError::Malformed("top-level value is not an object".into()))?;
    if let Some(missing) = REQUIRED_TABLES.iter().copied().find(|t| !obj.contains_key(*t)) {
        return Err(IndexError::MissingTable(missing));
    }
    let wire: WireIndex = serde_json::from_value(value)?;
    wire.into_index()
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn script(&self) -> PathBuf { self.root.join("searchindex.js") }
    pub fn snapshot(&self) -> PathBuf { self.root.join("searchindex.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

pub fn save_index_js(path: &Path, index: &SearchIndex) -> Result<()> {
    let mut f = File::create(path)?;
    f.write_all(to_js(index)?.as_bytes())?;
    Ok(())
}

pub fn load_index_js(path: &Path) -> Result<SearchIndex> {
    let mut f = File::open(path)?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    from_js(&buf)
}

pub fn save_index_bin(path: &Path, index: &SearchIndex) -> Result<()> {
    let mut f = File::create(path)?;
    let bytes = bincode::serialize(index)?;
    f.write_all(&bytes)?;
    Ok(())
}

/// Decoding goes through the same validation as every other constructor.
pub fn load_index_bin(path: &Path) -> Result<SearchIndex> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let index = bincode::deserialize(&buf)?;
    Ok(index)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Write script, binary snapshot and meta file; a new build fully replaces the old one.
pub fn save_index(paths: &IndexPaths, index: &SearchIndex, created_at: &str) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_index_js(&paths.script(), index)?;
    save_index_bin(&paths.snapshot(), index)?;
    let meta = MetaFile {
        num_docs: index.num_docs() as u32,
        num_terms: index.num_terms() as u32,
        created_at: created_at.to_string(),
        version: FORMAT_VERSION,
    };
    save_meta(paths, &meta)
}

/// A snapshot is only trusted when `searchindex.js` was not rewritten after it.
fn snapshot_is_current(paths: &IndexPaths) -> bool {
    let Ok(snapshot) = fs::metadata(paths.snapshot()) else { return false };
    if !snapshot.is_file() {
        return false;
    }
    let Ok(script) = fs::metadata(paths.script()) else { return true };
    match (snapshot.modified(), script.modified()) {
        (Ok(snapshot), Ok(script)) => snapshot >= script,
        _ => true,
    }
}

/// Load an index directory, preferring the binary snapshot over the script
/// unless the script is newer.
pub fn load_index(paths: &IndexPaths) -> Result<SearchIndex> {
    let snapshot = paths.snapshot();
    let index = if snapshot_is_current(paths) {
        load_index_bin(&snapshot)?
    } else {
        if snapshot.is_file() {
            tracing::warn!(path = %snapshot.display(), "binary snapshot is older than searchindex.js, ignoring it");
        } else {
            tracing::warn!(path = %snapshot.display(), "no binary snapshot, loading searchindex.js");
        }
        load_index_js(&paths.script())?
    };
    tracing::info!(root = %paths.root.display(), num_docs = index.num_docs(), num_terms = index.num_terms(), "loaded search index");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = r#"Search.setIndex({"alltitles": {"Synopsis": [[1, "synopsis"]], "Collection Index": [[0, "collection-index"]]},
        "docnames": ["collections/index", "collections/sva/sentinelone/sentinelone_sites_module"],
        "envversion": {"sphinx": 61},
        "filenames": ["collections/index.rst", "collections/sva/sentinelone/sentinelone_sites_module.rst"],
        "objects": {}, "objnames": {}, "objtypes": {}, "indexentries": {},
        "terms": {"site": [0, 1], "sva": 0},
        "titleterms": {"sentinelone_sit": 1, "index": 0},
        "titles": ["Collection Index", "sva.sentinelone.sentinelone_sites module"]})"#;

    #[test]
    fn parses_sphinx_script_with_compact_postings() {
        let index = from_js(TINY).unwrap();
        assert_eq!(index.num_docs(), 2);
        assert_eq!(index.body_postings("sva").unwrap(), &PostingSet::from([0]));
        assert_eq!(index.body_postings("site").unwrap().len(), 2);
        assert_eq!(index.documents()[1].sections[0].anchor.as_deref(), Some("synopsis"));
    }

    #[test]
    fn accepts_bare_json_and_trailing_semicolon() {
        let bare = TINY.trim_start_matches(JS_PREFIX).trim_end_matches(JS_SUFFIX);
        assert_eq!(from_js(bare).unwrap().num_docs(), 2);
        assert_eq!(from_js(&format!("{TINY};\n")).unwrap().num_docs(), 2);
    }

    #[test]
    fn script_round_trip_preserves_tables() {
        let index = from_js(TINY).unwrap();
        let again = from_js(&to_js(&index).unwrap()).unwrap();
        assert_eq!(index, again);
        let script = to_js(&index).unwrap();
        assert!(script.starts_with("Search.setIndex({"));
        assert!(script.contains(r#""sva":0"#));
    }

    #[test]
    fn stemmer_is_written_only_when_not_porter() {
        let index = from_js(TINY).unwrap();
        assert_eq!(index.stemming(), Stemming::Porter);
        assert!(!to_js(&index).unwrap().contains("stemmer"));

        let snowball = TINY.replace(r#""objects": {}"#, r#""objects": {}, "stemmer": "snowball""#);
        let index = from_js(&snowball).unwrap();
        assert_eq!(index.stemming(), Stemming::Snowball);
        assert!(to_js(&index).unwrap().contains(r#""stemmer":"snowball""#));
        assert_eq!(from_js(&to_js(&index).unwrap()).unwrap(), index);
    }

    #[test]
    fn missing_table_is_reported_by_name() {
        let err = from_js(r#"{"docnames": [], "filenames": [], "titles": []}"#).unwrap_err();
        assert!(matches!(err, IndexError::MissingTable("alltitles")));
    }

    #[test]
    fn dangling_references_fail_the_load() {
        let bad = TINY.replace(r#""sva": 0"#, r#""sva": 7"#);
        assert!(matches!(from_js(&bad), Err(IndexError::DanglingPosting { doc_id: 7, .. })));

        let bad = TINY.replace(r#"[[1, "synopsis"]]"#, r#"[[5, "synopsis"]]"#);
        assert!(matches!(from_js(&bad), Err(IndexError::DanglingSection { doc_id: 5, .. })));

        let bad = TINY.replace(r#""objects": {}"#, r#""objects": {"sva.sentinelone.sentinelone_sites": [4, null]}"#);
        assert!(matches!(from_js(&bad), Err(IndexError::DanglingObject { doc_id: 4, .. })));
    }

    #[test]
    fn mismatched_tables_fail_the_load() {
        let bad = TINY.replace(r#""titles": ["Collection Index", "#, r#""titles": ["#);
        assert!(matches!(from_js(&bad), Err(IndexError::TableLength { table: "titles", len: 1, expected: 2 })));
        assert!(matches!(from_js("[1, 2]"), Err(IndexError::Malformed(_))));
        assert!(matches!(from_js("Search.setIndex({}"), Err(IndexError::Malformed(_))));
    }
}
