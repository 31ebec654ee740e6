use crate::error::IndexError;
use crate::porter::PorterStemmer;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    // Underscores stay inside a word so module names like `sentinelone_sites` index as one term.
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref SNOWBALL: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// Stemming algorithm an index was built with. Queries must be reduced the same way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stemming {
    /// Original Porter algorithm, what Sphinx uses for English indexes.
    #[default]
    Porter,
    /// Snowball English, also known as Porter2.
    Snowball,
}

impl Stemming {
    pub fn is_porter(&self) -> bool { *self == Stemming::Porter }

    /// Stem a single already-normalized word.
    pub fn stem(self, word: &str) -> String {
        match self {
            Stemming::Porter => PorterStemmer::new().stem(word),
            Stemming::Snowball => SNOWBALL.stem(word).to_string(),
        }
    }

    /// Tokenize body text into (term, position) using NFKC normalization, lowercase, stopword removal, and stemming.
    pub fn tokenize(self, text: &str) -> Vec<(String, usize)> {
        let normalized = normalize(text);
        let mut tokens = Vec::new();
        for (pos, mat) in RE.find_iter(&normalized).enumerate() {
            let token = mat.as_str();
            if is_stopword(token) { continue; }
            tokens.push((self.stem(token), pos));
        }
        tokens
    }

    /// Terms for a title: every word both verbatim (lowercased) and stemmed.
    ///
    /// Stopwords are indexed too, like Sphinx does for titles, so the table agrees
    /// with payloads it wrote. Queries never look them up since [`Stemming::query_terms`]
    /// drops stopwords.
    pub fn title_terms(self, text: &str) -> Vec<String> {
        let normalized = normalize(text);
        let mut terms = Vec::new();
        for mat in RE.find_iter(&normalized) {
            let word = mat.as_str();
            let stemmed = self.stem(word);
            if stemmed != word {
                terms.push(word.to_string());
            }
            terms.push(stemmed);
        }
        terms
    }

    /// Split a query into terms, normalized the same way documents are at build time.
    ///
    /// Stopwords are dropped and repeated words collapse onto their first occurrence,
    /// so a blank or punctuation-only query yields no terms at all.
    pub fn query_terms(self, query: &str) -> Vec<QueryTerm> {
        let normalized = normalize(query);
        let mut seen: HashSet<(String, bool)> = HashSet::new();
        let mut terms = Vec::new();
        for piece in normalized.split_whitespace() {
            let (excluded, piece) = match piece.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, piece),
            };
            for mat in RE.find_iter(piece) {
                let word = mat.as_str();
                if is_stopword(word) { continue; }
                let stemmed = self.stem(word);
                if !seen.insert((stemmed.clone(), excluded)) { continue; }
                terms.push(QueryTerm { raw: word.to_string(), stem: stemmed, excluded });
            }
        }
        terms
    }
}

impl fmt::Display for Stemming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stemming::Porter => "porter",
            Stemming::Snowball => "snowball",
        })
    }
}

impl FromStr for Stemming {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "porter" => Ok(Stemming::Porter),
            "snowball" | "porter2" => Ok(Stemming::Snowball),
            other => Err(IndexError::UnknownStemmer(other.to_string())),
        }
    }
}

/// One normalized word of a free-text query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    /// Lowercased word as typed, matched against verbatim title terms.
    pub raw: String,
    pub stem: String,
    /// Set for words written as `-word`; matching documents are removed.
    pub excluded: bool,
}

/// [`Stemming::stem`] with the default algorithm.
pub fn stem(word: &str) -> String {
    Stemming::default().stem(word)
}

pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    Stemming::default().tokenize(text)
}

pub fn title_terms(text: &str) -> Vec<String> {
    Stemming::default().title_terms(text)
}

pub fn query_terms(query: &str) -> Vec<QueryTerm> {
    Stemming::default().query_terms(query)
}
