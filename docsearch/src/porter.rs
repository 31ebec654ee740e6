//! Martin Porter's original English stemmer.
//!
//! Sphinx stems the terms of its `searchindex.js` with this algorithm rather than
//! the later Snowball English revision, so `keys` is stored as `kei` and `monday`
//! as `mondai`. Queries against such an index must be reduced the same way.
//!
//! The rewrite rules run in five steps:
//! 1. plurals, `-ed`/`-ing`, and a terminal `y` after a vowel-bearing stem
//! 2. double suffixes such as `-ational` → `-ate`
//! 3. `-icate` → `-ic`, `-ness` → "", etc.
//! 4. single suffixes like `-ance` or `-ment` on long stems
//! 5. a final `-e`, and `-ll` → `-l`

/// Stateless Porter stemmer over lowercased words.
#[derive(Debug, Clone, Copy, Default)]
pub struct PorterStemmer;

impl PorterStemmer {
    pub fn new() -> Self {
        PorterStemmer
    }

    pub fn stem(&self, word: &str) -> String {
        let mut w: Vec<char> = word.chars().collect();
        if w.len() < 3 {
            return word.to_string();
        }
        step1a(&mut w);
        step1b(&mut w);
        step1c(&mut w);
        step2(&mut w);
        step3(&mut w);
        step4(&mut w);
        step5(&mut w);
        w.into_iter().collect()
    }
}

const STEP2: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("tional", "tion"),
    ("enci", "ence"),
    ("anci", "ance"),
    ("izer", "ize"),
    ("abli", "able"),
    ("alli", "al"),
    ("entli", "ent"),
    ("eli", "e"),
    ("ousli", "ous"),
    ("ization", "ize"),
    ("ation", "ate"),
    ("ator", "ate"),
    ("alism", "al"),
    ("iveness", "ive"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("aliti", "al"),
    ("iviti", "ive"),
    ("biliti", "ble"),
];

const STEP3: &[(&str, &str)] = &[
    ("icate", "ic"),
    ("ative", ""),
    ("alize", "al"),
    ("iciti", "ic"),
    ("ical", "ic"),
    ("ful", ""),
    ("ness", ""),
];

const STEP4: &[&str] = &[
    "al", "ance", "ence", "er", "ic", "able", "ible", "ant", "ement", "ment", "ent", "ion", "ou", "ism", "ate",
    "iti", "ous", "ive", "ize",
];

/// `y` is a consonant at the start of a word or after a vowel.
fn is_consonant(w: &[char], i: usize) -> bool {
    match w[i] {
        'a' | 'e' | 'i' | 'o' | 'u' => false,
        'y' => i == 0 || !is_consonant(w, i - 1),
        _ => true,
    }
}

/// Number of vowel-consonant sequences, the `m` in `[C](VC)^m[V]`.
fn measure(w: &[char]) -> usize {
    let mut m = 0;
    let mut after_vowel = false;
    for i in 0..w.len() {
        let consonant = is_consonant(w, i);
        if consonant && after_vowel {
            m += 1;
        }
        after_vowel = !consonant;
    }
    m
}

fn has_vowel(w: &[char]) -> bool {
    (0..w.len()).any(|i| !is_consonant(w, i))
}

fn ends_with(w: &[char], suffix: &str) -> bool {
    let n = suffix.chars().count();
    n <= w.len() && w[w.len() - n..].iter().copied().eq(suffix.chars())
}

fn ends_double_consonant(w: &[char]) -> bool {
    let n = w.len();
    n >= 2 && w[n - 1] == w[n - 2] && is_consonant(w, n - 1)
}

/// consonant-vowel-consonant, where the last consonant is not w, x or y.
fn ends_cvc(w: &[char]) -> bool {
    let n = w.len();
    n >= 3
        && is_consonant(w, n - 3)
        && !is_consonant(w, n - 2)
        && is_consonant(w, n - 1)
        && !matches!(w[n - 1], 'w' | 'x' | 'y')
}

fn replace_tail(w: &mut Vec<char>, strip: usize, with: &str) {
    w.truncate(w.len() - strip);
    w.extend(with.chars());
}

/// Apply the rule with the longest matching suffix, if its stem has `m > 0`.
/// A shorter suffix is never tried once a longer one matched.
fn longest_rule(w: &mut Vec<char>, rules: &[(&str, &str)]) {
    let Some(&(suffix, replacement)) = rules.iter().filter(|(s, _)| ends_with(w, s)).max_by_key(|(s, _)| s.len())
    else {
        return;
    };
    let strip = suffix.len();
    if measure(&w[..w.len() - strip]) > 0 {
        replace_tail(w, strip, replacement);
    }
}

fn step1a(w: &mut Vec<char>) {
    if ends_with(w, "sses") || ends_with(w, "ies") {
        replace_tail(w, 2, "");
    } else if !ends_with(w, "ss") && ends_with(w, "s") {
        w.pop();
    }
}

fn step1b(w: &mut Vec<char>) {
    if ends_with(w, "eed") {
        if measure(&w[..w.len() - 3]) > 0 {
            w.pop();
        }
        return;
    }
    let strip = if ends_with(w, "ed") {
        2
    } else if ends_with(w, "ing") {
        3
    } else {
        return;
    };
    if !has_vowel(&w[..w.len() - strip]) {
        return;
    }
    replace_tail(w, strip, "");

    if ends_with(w, "at") || ends_with(w, "bl") || ends_with(w, "iz") {
        w.push('e');
    } else if ends_double_consonant(w) && !matches!(w.last(), Some('l' | 's' | 'z')) {
        w.pop();
    } else if measure(w) == 1 && ends_cvc(w) {
        w.push('e');
    }
}

fn step1c(w: &mut Vec<char>) {
    if ends_with(w, "y") && has_vowel(&w[..w.len() - 1]) {
        replace_tail(w, 1, "i");
    }
}

fn step2(w: &mut Vec<char>) {
    longest_rule(w, STEP2);
}

fn step3(w: &mut Vec<char>) {
    longest_rule(w, STEP3);
}

fn step4(w: &mut Vec<char>) {
    let Some(suffix) = STEP4.iter().filter(|s| ends_with(w, s)).max_by_key(|s| s.len()) else {
        return;
    };
    let stem = &w[..w.len() - suffix.len()];
    if measure(stem) <= 1 {
        return;
    }
    if *suffix == "ion" && !matches!(stem.last(), Some('s' | 't')) {
        return;
    }
    let len = stem.len();
    w.truncate(len);
}

fn step5(w: &mut Vec<char>) {
    if ends_with(w, "e") {
        let stem = &w[..w.len() - 1];
        let m = measure(stem);
        if m > 1 || (m == 1 && !ends_cvc(stem)) {
            w.pop();
        }
    }
    if ends_with(w, "ll") && measure(&w[..w.len() - 1]) > 1 {
        w.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stem(word: &str) -> String {
        PorterStemmer::new().stem(word)
    }

    #[test]
    fn test_porter_stemmer() {
        assert_eq!(stem("running"), "run");
        assert_eq!(stem("flies"), "fli");
        assert_eq!(stem("agreed"), "agre");
        assert_eq!(stem("disabled"), "disabl");
        assert_eq!(stem("measuring"), "measur");
        assert_eq!(stem("itemization"), "itemiz");
        assert_eq!(stem("sensational"), "sensat");
        assert_eq!(stem("traditional"), "tradit");
        assert_eq!(stem("controlling"), "control");
        assert_eq!(stem("filing"), "file");
    }

    #[test]
    fn terminal_y_becomes_i() {
        assert_eq!(stem("keys"), "kei");
        assert_eq!(stem("monday"), "mondai");
        assert_eq!(stem("always"), "alwai");
        assert_eq!(stem("may"), "mai");
        assert_eq!(stem("policies"), "polici");
        assert_eq!(stem("sky"), "sky");
    }

    #[test]
    fn matches_terms_in_published_sphinx_indexes() {
        assert_eq!(stem("use"), "us");
        assert_eq!(stem("yes"), "ye");
        assert_eq!(stem("groups"), "group");
        assert_eq!(stem("manage"), "manag");
        assert_eq!(stem("sentinelone_sites"), "sentinelone_sit");
        assert_eq!(stem("performance_focus"), "performance_focu");
        assert_eq!(stem("parameters"), "paramet");
        assert_eq!(stem("dynamic"), "dynam");
        assert_eq!(stem("static"), "static");
    }

    #[test]
    fn short_words_are_left_alone() {
        assert_eq!(stem("is"), "is");
        assert_eq!(stem("as"), "as");
        assert_eq!(stem(""), "");
    }

    #[test]
    fn test_porter_measure() {
        let chars = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(measure(&chars("tree")), 0);
        assert_eq!(measure(&chars("trees")), 1);
        assert_eq!(measure(&chars("trouble")), 1);
        assert_eq!(measure(&chars("troubles")), 2);
        assert_eq!(measure(&chars("toy")), 1);
    }
}
