
// imports
use rayon::prelude::*;
use std::collections::HashMap;

// counts gathered in one scan over the corpus: adjacent pair frequencies,
// unigram frequencies and the total token count. Transient, discarded once
// the scores are turned into a PhraseMap.
#[derive(Default)]
struct PhraseStats {
    pairs: HashMap<(String, String), usize>,
    tokens: HashMap<String, usize>,
    total: usize,
}

impl PhraseStats {
    fn scan(sentences: &[Vec<String>]) -> PhraseStats {
        // counting is partitioned over sentences and the partial maps are
        // merged, no ordering requirement on the merge
        sentences
            .par_iter()
            .fold(PhraseStats::default, |mut stats, sentence| {
                stats.accumulate(sentence);
                stats
            })
            .reduce(PhraseStats::default, PhraseStats::merge)
    }

    fn accumulate(&mut self, sentence: &[String]) {
        for tok in sentence {
            *self.tokens.entry(tok.to_owned()).or_insert(0) += 1;
            self.total += 1;
        }
        for pair in sentence.windows(2) {
            let key = (pair[0].to_owned(), pair[1].to_owned());
            *self.pairs.entry(key).or_insert(0) += 1;
        }
    }

    fn merge(mut self, other: PhraseStats) -> PhraseStats {
        for (k, v) in other.pairs {
            *self.pairs.entry(k).or_insert(0) += v;
        }
        for (k, v) in other.tokens {
            *self.tokens.entry(k).or_insert(0) += v;
        }
        self.total += other.total;
        self
    }
}

// a discounted pointwise-mutual-information variant: pairs must beat the
// min_count discount and the independence baseline to qualify
fn score(pair_count: usize, left_count: usize, right_count: usize, total: usize, min_count: usize) -> f64 {
    ((pair_count - min_count) as f64 * total as f64) / ((left_count * right_count) as f64)
}

pub struct PhraseDetector {}

impl PhraseDetector {
    /// Scores every adjacent token pair seen at least `min_count` times and
    /// freezes the pairs scoring above `threshold` into a [`PhraseMap`].
    pub fn detect(sentences: &[Vec<String>], min_count: usize, threshold: f64) -> PhraseMap {
        let stats = PhraseStats::scan(sentences);

        let mut map = PhraseMap::default();
        for ((left, right), pair_count) in &stats.pairs {
            if *pair_count < min_count {
                continue;
            }
            // unigram counts exist for every observed pair member
            let left_count = stats.tokens[left];
            let right_count = stats.tokens[right];
            if score(*pair_count, left_count, right_count, stats.total, min_count) > threshold {
                map.insert(left, right);
            }
        }
        map
    }
}

/// Frozen pair -> merged-token mapping, applied greedily to sentences. Saved
/// next to the vectors so future raw text can be rewritten consistently with
/// the merges seen at training time.
#[derive(Default, Clone)]
pub struct PhraseMap {
    // first token -> (second token -> merged token)
    pairs: HashMap<String, HashMap<String, String>>,
    len: usize,
}

impl PhraseMap {
    pub fn insert(&mut self, left: &str, right: &str) {
        let joined = format!("{}_{}", left, right);
        let inner = self.pairs.entry(left.to_owned()).or_default();
        if inner.insert(right.to_owned(), joined).is_none() {
            self.len += 1;
        }
    }

    pub fn get(&self, left: &str, right: &str) -> Option<&String> {
        self.pairs.get(left).and_then(|inner| inner.get(right))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rewrites one sentence in a single greedy left-to-right pass: a mapped
    /// pair becomes its merged token and the scan advances past both members,
    /// so a merged token is never reconsidered within the same application.
    pub fn apply(&self, sentence: &[String]) -> Vec<String> {
        let mut merged = Vec::with_capacity(sentence.len());
        let mut i = 0;
        while i < sentence.len() {
            if i + 1 < sentence.len() {
                if let Some(joined) = self.get(&sentence[i], &sentence[i + 1]) {
                    merged.push(joined.to_owned());
                    i += 2;
                    continue;
                }
            }
            merged.push(sentence[i].to_owned());
            i += 1;
        }
        merged
    }

    pub fn apply_corpus(&self, sentences: &[Vec<String>]) -> Vec<Vec<String>> {
        if self.is_empty() {
            return sentences.to_vec();
        }
        sentences
            .par_iter()
            .map(|sentence| self.apply(sentence))
            .collect()
    }

    /// Flattens to a space-joined-pair map for the json artifact.
    pub fn to_flat(&self) -> HashMap<String, String> {
        let mut flat = HashMap::new();
        for (left, inner) in &self.pairs {
            for (right, joined) in inner {
                flat.insert(format!("{} {}", left, right), joined.to_owned());
            }
        }
        flat
    }

    pub fn from_flat(flat: &HashMap<String, String>) -> PhraseMap {
        let mut map = PhraseMap::default();
        for pair in flat.keys() {
            if let Some((left, right)) = pair.split_once(' ') {
                map.insert(left, right);
            }
        }
        map
    }
}
