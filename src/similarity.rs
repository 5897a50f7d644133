//! Lexical similarity between statement texts.
//!
//! Texts are reduced to bags of unigrams and contiguous bigrams, weighted by smoothed inverse
//! document frequency over the texts passed to a single call, and compared by cosine similarity.
//! Nothing is cached between calls: the vocabulary is refit from the exact input every time, so a
//! score is a function of the input set alone.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use unicode_normalization::UnicodeNormalization;

use crate::error::{Result, TenetError};

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("static token pattern is valid"));

static STOP_WORDS: Lazy<BTreeSet<&'static str>> =
    Lazy::new(|| ENGLISH_STOP_WORDS.iter().copied().collect());

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "amoungst",
    "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere",
    "are", "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "becoming",
    "been", "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
    "beyond", "bill", "both", "bottom", "but", "by", "call", "can", "cannot", "cant", "co", "con",
    "could", "couldnt", "cry", "de", "describe", "detail", "do", "done", "down", "due", "during",
    "each", "eg", "eight", "either", "eleven", "else", "elsewhere", "empty", "enough", "etc", "even",
    "ever", "every", "everyone", "everything", "everywhere", "except", "few", "fifteen", "fifty",
    "fill", "find", "fire", "first", "five", "for", "former", "formerly", "forty", "found", "four",
    "from", "front", "full", "further", "get", "give", "go", "had", "has", "hasnt", "have", "he",
    "hence", "her", "here", "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him",
    "himself", "his", "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed",
    "interest", "into", "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least",
    "less", "ltd", "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more",
    "moreover", "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely",
    "neither", "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor",
    "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
    "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own", "part",
    "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed", "seeming",
    "seems", "serious", "several", "she", "should", "show", "side", "since", "sincere", "six",
    "sixty", "so", "some", "somehow", "someone", "something", "sometime", "sometimes", "somewhere",
    "still", "such", "system", "take", "ten", "than", "that", "the", "their", "them", "themselves",
    "then", "thence", "there", "thereafter", "thereby", "therefore", "therein", "thereupon",
    "these", "they", "thick", "thin", "third", "this", "those", "though", "three", "through",
    "throughout", "thru", "thus", "to", "together", "too", "top", "toward", "towards", "twelve",
    "twenty", "two", "un", "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well",
    "were", "what", "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas",
    "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while", "whither", "who",
    "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without", "would", "yet",
    "you", "your", "yours", "yourself", "yourselves",
];

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}

/// Fold a handful of English inflections so that "taxes" and "taxation" share a stem.
///
/// Tokens of three characters or fewer are left alone and every rule keeps a stem of at least
/// three characters.
pub fn fold_inflection(token: &str) -> String {
    if token.chars().count() <= 3 {
        return token.to_string();
    }
    let stem_ok = |stem: &str| stem.chars().count() >= 3;
    for suffix in ["ations", "ation"] {
        if let Some(stem) = token.strip_suffix(suffix) {
            if stem_ok(stem) {
                return stem.to_string();
            }
        }
    }
    if let Some(stem) = token.strip_suffix("ies") {
        if stem_ok(stem) {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = token.strip_suffix("es") {
        let sibilant = ["s", "x", "z", "ch", "sh"].iter().any(|s| stem.ends_with(s));
        if sibilant && stem_ok(stem) {
            return stem.to_string();
        }
    }
    if let Some(stem) = token.strip_suffix('s') {
        let keep = ["ss", "us", "is"].iter().any(|s| token.ends_with(s));
        if !keep && stem_ok(stem) {
            return stem.to_string();
        }
    }
    token.to_string()
}

/// Case-insensitive substring test, the degraded comparison used when vectorization fails.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    let haystack: String = haystack.nfkc().collect::<String>().to_lowercase();
    let needle: String = needle.nfkc().collect::<String>().to_lowercase();
    haystack.contains(&needle)
}

/// Sparse TF-IDF rows, L2-normalised. Row entries are `(term index, weight)` sorted by index.
#[derive(Debug, Clone, PartialEq)]
pub struct TermMatrix {
    vocabulary: Vec<String>,
    rows: Vec<Vec<(usize, f64)>>,
}

impl TermMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Cosine similarity of two rows, clamped to `[0, 1]`.
    pub fn cosine(&self, i: usize, j: usize) -> f64 {
        let (a, b) = (&self.rows[i], &self.rows[j]);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        if i == j || a == b {
            return 1.0;
        }
        let (mut x, mut y, mut dot) = (0, 0, 0.0);
        while x < a.len() && y < b.len() {
            match a[x].0.cmp(&b[y].0) {
                std::cmp::Ordering::Less => x += 1,
                std::cmp::Ordering::Greater => y += 1,
                std::cmp::Ordering::Equal => {
                    dot += a[x].1 * b[y].1;
                    x += 1;
                    y += 1;
                }
            }
        }
        dot.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vectorizer {
    max_features: usize,
    fold_inflections: bool,
}

impl Vectorizer {
    pub fn new(max_features: usize, fold_inflections: bool) -> Result<Self> {
        if max_features == 0 {
            return Err(TenetError::Config(
                "similarity vocabulary cap must be at least 1".to_string(),
            ));
        }
        Ok(Vectorizer {
            max_features,
            fold_inflections,
        })
    }

    /// Reduce a text to its unigram and bigram terms, in order of appearance.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let normalized: String = text.nfkc().collect::<String>().to_lowercase();
        let tokens: Vec<String> = TOKEN_PATTERN
            .find_iter(&normalized)
            .map(|m| m.as_str())
            .filter(|t| !is_stop_word(t))
            .map(|t| {
                if self.fold_inflections {
                    fold_inflection(t)
                } else {
                    t.to_string()
                }
            })
            .collect();
        let mut terms = tokens.clone();
        terms.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
        terms
    }

    pub fn fit_transform<S: AsRef<str>>(&self, texts: &[S]) -> Result<TermMatrix> {
        let analyzed: Vec<Vec<String>> = texts.iter().map(|t| self.analyze(t.as_ref())).collect();

        let mut frequency: BTreeMap<&str, usize> = BTreeMap::new();
        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for terms in analyzed.iter() {
            let mut seen = BTreeSet::new();
            for term in terms {
                *frequency.entry(term.as_str()).or_default() += 1;
                if seen.insert(term.as_str()) {
                    *document_frequency.entry(term.as_str()).or_default() += 1;
                }
            }
        }
        if frequency.is_empty() {
            return Err(TenetError::EmptyVocabulary);
        }

        let mut kept: Vec<(&str, usize)> = frequency.into_iter().collect();
        if kept.len() > self.max_features {
            kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            kept.truncate(self.max_features);
        }
        let mut vocabulary: Vec<String> = kept.into_iter().map(|(t, _)| t.to_string()).collect();
        vocabulary.sort();
        let index: BTreeMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let n = texts.len() as f64;
        let idf: Vec<f64> = vocabulary
            .iter()
            .map(|t| {
                let df = document_frequency.get(t.as_str()).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let rows = analyzed
            .iter()
            .map(|terms| {
                let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
                for term in terms {
                    if let Some(&i) = index.get(term.as_str()) {
                        *counts.entry(i).or_default() += 1.0;
                    }
                }
                let mut row: Vec<(usize, f64)> =
                    counts.into_iter().map(|(i, c)| (i, c * idf[i])).collect();
                let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.iter_mut().for_each(|(_, w)| *w /= norm);
                }
                row
            })
            .collect();

        tracing::debug!(
            "Fitted vocabulary of {} terms over {} texts",
            vocabulary.len(),
            texts.len()
        );
        Ok(TermMatrix { vocabulary, rows })
    }
}

/// Where a set of scores came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Tfidf,
    ContainmentFallback,
}

/// A square, symmetric score matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    pub scores: Vec<Vec<f64>>,
    pub source: ScoreSource,
}

impl SimilarityMatrix {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.scores[i][j]
    }
}

/// Scores of one query text against a list of candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryScores {
    pub scores: Vec<f64>,
    pub source: ScoreSource,
}

impl QueryScores {
    /// Index and score of the best candidate; ties go to the earliest index.
    pub fn best(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &score) in self.scores.iter().enumerate() {
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((i, score)),
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimilarityEngine {
    vectorizer: Vectorizer,
}

impl SimilarityEngine {
    pub fn new(max_features: usize, fold_inflections: bool) -> Result<Self> {
        Ok(SimilarityEngine {
            vectorizer: Vectorizer::new(max_features, fold_inflections)?,
        })
    }

    /// All-pairs TF-IDF cosine similarity. Fails with [`TenetError::EmptyVocabulary`] when no text
    /// carries a countable term.
    pub fn pairwise<S: AsRef<str>>(&self, texts: &[S]) -> Result<SimilarityMatrix> {
        if texts.is_empty() {
            return Ok(SimilarityMatrix {
                scores: Vec::new(),
                source: ScoreSource::Tfidf,
            });
        }
        let matrix = self.vectorizer.fit_transform(texts)?;
        let n = matrix.len();
        let mut scores = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in i..n {
                let s = matrix.cosine(i, j);
                scores[i][j] = s;
                scores[j][i] = s;
            }
        }
        Ok(SimilarityMatrix {
            scores,
            source: ScoreSource::Tfidf,
        })
    }

    /// [`Self::pairwise`], falling back to case-insensitive containment when vectorization fails.
    pub fn pairwise_or_containment<S: AsRef<str>>(&self, texts: &[S]) -> SimilarityMatrix {
        match self.pairwise(texts) {
            Ok(matrix) => matrix,
            Err(e) => {
                tracing::warn!("Similarity falling back to substring containment: {e}");
                containment_matrix(texts)
            }
        }
    }

    /// Similarity of `query` to each candidate, fit over `[query] + candidates`.
    pub fn query<S: AsRef<str>>(&self, query: &str, candidates: &[S]) -> Result<Vec<f64>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let mut corpus: Vec<&str> = Vec::with_capacity(candidates.len() + 1);
        corpus.push(query);
        corpus.extend(candidates.iter().map(|c| c.as_ref()));
        let matrix = self.vectorizer.fit_transform(&corpus)?;
        Ok((1..matrix.len()).map(|j| matrix.cosine(0, j)).collect())
    }

    /// [`Self::query`], falling back to containment of the query in each candidate.
    pub fn query_or_containment<S: AsRef<str>>(&self, query: &str, candidates: &[S]) -> QueryScores {
        match self.query(query, candidates) {
            Ok(scores) => QueryScores {
                scores,
                source: ScoreSource::Tfidf,
            },
            Err(e) => {
                tracing::warn!("Query similarity falling back to substring containment: {e}");
                QueryScores {
                    scores: candidates
                        .iter()
                        .map(|c| bool_score(contains_ignore_case(c.as_ref(), query)))
                        .collect(),
                    source: ScoreSource::ContainmentFallback,
                }
            }
        }
    }
}

fn bool_score(hit: bool) -> f64 {
    if hit {
        1.0
    } else {
        0.0
    }
}

/// 1 where either text contains the other, 0 elsewhere.
pub fn containment_matrix<S: AsRef<str>>(texts: &[S]) -> SimilarityMatrix {
    let n = texts.len();
    let mut scores = vec![vec![0.0; n]; n];
    for i in 0..n {
        scores[i][i] = 1.0;
        for j in (i + 1)..n {
            let (a, b) = (texts[i].as_ref(), texts[j].as_ref());
            let s = bool_score(contains_ignore_case(a, b) || contains_ignore_case(b, a));
            scores[i][j] = s;
            scores[j][i] = s;
        }
    }
    SimilarityMatrix {
        scores,
        source: ScoreSource::ContainmentFallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn engine() -> SimilarityEngine {
        SimilarityEngine::new(1000, true).unwrap()
    }

    #[test]
    fn analyze_drops_stop_words_and_adds_bigrams() {
        let v = Vectorizer::new(10, false).unwrap();
        assert_eq!(
            v.analyze("The sky is BLUE"),
            vec!["sky".to_string(), "blue".to_string(), "sky blue".to_string()]
        );
        assert!(v.analyze("it is a").is_empty());
    }

    #[test]
    fn folding_collapses_common_inflections() {
        assert_eq!(fold_inflection("taxes"), "tax");
        assert_eq!(fold_inflection("taxation"), "tax");
        assert_eq!(fold_inflection("policies"), "policy");
        assert_eq!(fold_inflection("values"), "value");
        assert_eq!(fold_inflection("beliefs"), "belief");
        assert_eq!(fold_inflection("class"), "class");
        assert_eq!(fold_inflection("virus"), "virus");
        assert_eq!(fold_inflection("sky"), "sky");
    }

    #[test]
    fn restatements_score_high_and_unrelated_texts_score_zero() {
        let m = engine()
            .pairwise(&["taxes are theft", "taxation is theft", "the sky is blue"])
            .unwrap();
        assert_eq!(m.source, ScoreSource::Tfidf);
        assert!(m.get(0, 1) >= 0.6);
        assert!(m.get(0, 2).abs() < EPSILON);
        assert!(m.get(1, 2).abs() < EPSILON);
        for i in 0..3 {
            assert!((m.get(i, i) - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn matrix_is_symmetric() {
        let texts = [
            "markets allocate capital efficiently",
            "free markets allocate resources",
            "capital should be taxed",
        ];
        let m = engine().pairwise(&texts).unwrap();
        for i in 0..texts.len() {
            for j in 0..texts.len() {
                assert!((m.get(i, j) - m.get(j, i)).abs() < EPSILON);
                assert!((0.0..=1.0).contains(&m.get(i, j)));
            }
        }
        assert!(m.get(0, 1) > 0.0);
    }

    #[test]
    fn query_scores_against_candidates() {
        let e = engine();
        let weak = e
            .query("freedom is important", &["freedom is the highest value"])
            .unwrap();
        assert!(weak[0] > 0.1 && weak[0] < 0.6);
        let strong = e
            .query("freedom is the highest value", &["freedom is the highest value"])
            .unwrap();
        assert!((strong[0] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn empty_vocabulary_is_an_error_and_fallback_is_explicit() {
        let e = engine();
        assert_eq!(
            e.pairwise(&["it is", "to be or not to be"]),
            Err(TenetError::EmptyVocabulary)
        );
        let m = e.pairwise_or_containment(&["it is", "IT IS so", "we"]);
        assert_eq!(m.source, ScoreSource::ContainmentFallback);
        assert_eq!(m.get(0, 1), 1.0);
        assert_eq!(m.get(0, 2), 0.0);

        let q = e.query_or_containment("it is", &["we are", "so it is"]);
        assert_eq!(q.source, ScoreSource::ContainmentFallback);
        assert_eq!(q.best(), Some((1, 1.0)));
    }

    #[test]
    fn vocabulary_cap_keeps_most_frequent_terms() {
        let v = Vectorizer::new(2, false).unwrap();
        let m = v
            .fit_transform(&["alpha", "gamma", "alpha", "beta"])
            .unwrap();
        assert_eq!(m.vocabulary(), &["alpha".to_string(), "beta".to_string()]);
        assert!(Vectorizer::new(0, true).is_err());
    }

    #[test]
    fn best_prefers_earliest_on_ties() {
        let q = QueryScores {
            scores: vec![0.3, 0.7, 0.7],
            source: ScoreSource::Tfidf,
        };
        assert_eq!(q.best(), Some((1, 0.7)));
        let empty = QueryScores {
            scores: vec![],
            source: ScoreSource::Tfidf,
        };
        assert_eq!(empty.best(), None);
    }
}
