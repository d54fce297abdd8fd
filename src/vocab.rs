
// imports
use crate::errors::{Result, TrainerError};

use rand::Rng;
use std::collections::HashMap;

// exponent for the unigram-with-smoothing negative sampling distribution,
// moderately frequent words are preferred over the raw frequency ranking
const NEG_SAMPLING_POWER: f64 = 0.75;

/// One retained token: its raw corpus frequency and the probability that a
/// single occurrence of it survives subsampling during window construction.
#[derive(Clone, Debug)]
pub struct VocabEntry {
    pub token: String,
    pub count: usize,
    pub retain_prob: f32,
}

/// The frozen vocabulary: dense indices `[0, V)` assigned frequency-descending
/// with ties broken by first occurrence, so identical corpora always produce
/// identical indices. Immutable once built.
pub struct Vocab {
    entries: Vec<VocabEntry>,
    t2i: HashMap<String, usize>,
    corpus_tokens: usize,
    // running sums of count^0.75 per index, sampled by binary search
    neg_cumulative: Vec<f64>,
}

impl Vocab {
    /// Counts token frequencies over the corpus, drops tokens rarer than
    /// `min_count` and freezes the rest into an indexed table together with
    /// subsampling and negative-sampling weights.
    pub fn build(
        sentences: &[Vec<String>],
        min_count: usize,
        subsample_threshold: f32,
    ) -> Result<Vocab> {
        // count occurrences, remembering the order tokens first appeared in
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        for sentence in sentences {
            for tok in sentence {
                let first_seen = counts.len();
                let entry = counts.entry(tok.to_owned()).or_insert((0, first_seen));
                entry.0 += 1;
            }
        }

        // cut rare tokens, they stay out-of-vocabulary and are silently
        // skipped downstream
        let mut retained: Vec<(String, usize, usize)> = counts
            .into_iter()
            .filter(|(_, (count, _))| *count >= min_count)
            .map(|(token, (count, first_seen))| (token, count, first_seen))
            .collect();
        if retained.is_empty() {
            return Err(TrainerError::EmptyVocabulary(min_count));
        }

        retained.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        let corpus_tokens: usize = retained.iter().map(|(_, count, _)| count).sum();

        let mut entries = Vec::with_capacity(retained.len());
        let mut t2i = HashMap::with_capacity(retained.len());
        let mut neg_cumulative = Vec::with_capacity(retained.len());
        let mut mass = 0.0f64;
        for (index, (token, count, _)) in retained.into_iter().enumerate() {
            t2i.insert(token.to_owned(), index);
            mass += (count as f64).powf(NEG_SAMPLING_POWER);
            neg_cumulative.push(mass);
            entries.push(VocabEntry {
                token,
                count,
                retain_prob: retain_prob(count, corpus_tokens, subsample_threshold),
            });
        }

        Ok(Vocab {
            entries,
            t2i,
            corpus_tokens,
            neg_cumulative,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of in-vocabulary token occurrences in the corpus.
    pub fn corpus_tokens(&self) -> usize {
        self.corpus_tokens
    }

    pub fn index(&self, token: &str) -> Option<usize> {
        self.t2i.get(token).copied()
    }

    pub fn entry(&self, index: usize) -> &VocabEntry {
        &self.entries[index]
    }

    /// Index-ordered token list.
    pub fn tokens(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.token.to_owned()).collect()
    }

    pub fn token_to_index_map(&self) -> HashMap<String, usize> {
        self.t2i.clone()
    }

    /// Draws one token index from the count^0.75 unigram distribution.
    pub fn sample_negative<R: Rng>(&self, rng: &mut R) -> usize {
        // safe to unwrap, the vocabulary is never empty after build
        let total_mass = *self.neg_cumulative.last().unwrap();
        let x = rng.gen::<f64>() * total_mass;
        self.neg_cumulative
            .partition_point(|&c| c <= x)
            .min(self.entries.len() - 1)
    }
}

// p(w) = (sqrt(f/t) + 1) * (t/f) with f the relative frequency, clipped to
// [0, 1]. Very frequent words are probabilistically dropped from individual
// windows but keep their vocabulary slot and negative-sampling weight.
fn retain_prob(count: usize, corpus_tokens: usize, threshold: f32) -> f32 {
    let f = count as f32 / corpus_tokens as f32;
    let p = ((f / threshold).sqrt() + 1.0) * (threshold / f);
    p.min(1.0)
}

#[cfg(test)]
mod tests {

    use super::{retain_prob, Vocab};
    use crate::errors::TrainerError;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn to_sentences(lines: &[&str]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|l| l.split(' ').map(|x| x.to_string()).collect())
            .collect()
    }

    #[test]
    fn min_count_and_dense_indices() {
        let sentences = to_sentences(&[
            "you are what you say you are",
            "what you say makes sense",
        ]);

        let vocab = Vocab::build(&sentences, 2, 1e-4).unwrap();

        // you:4, what:2, say:2, are:2 survive; makes/sense are cut
        assert_eq!(vocab.len(), 4);
        assert!(vocab.index("makes").is_none());
        assert!(vocab.index("sense").is_none());

        // all retained counts are at or above the cutoff, indices are a dense
        // permutation-free range
        let mut seen = vec![false; vocab.len()];
        for i in 0..vocab.len() {
            let entry = vocab.entry(i);
            assert!(entry.count >= 2);
            let index = vocab.index(&entry.token).unwrap();
            assert_eq!(index, i);
            assert!(!seen[index]);
            seen[index] = true;
        }

        // frequency-descending with first-seen tie break: "you" leads, then
        // the three count-2 tokens in order of first appearance
        assert_eq!(vocab.entry(0).token, "you");
        assert_eq!(vocab.entry(1).token, "are");
        assert_eq!(vocab.entry(2).token, "what");
        assert_eq!(vocab.entry(3).token, "say");
    }

    #[test]
    fn empty_vocabulary_is_an_error() {
        let sentences = to_sentences(&["every token here appears once only"]);
        match Vocab::build(&sentences, 5, 1e-4) {
            Err(TrainerError::EmptyVocabulary(5)) => {}
            other => panic!("expected EmptyVocabulary, got {:?}", other.map(|v| v.len())),
        }
    }

    // golden value: counts a=8, b=2, so f(a) = 0.8 and with t = 0.1
    // p(a) = (sqrt(8) + 1) * 0.125 = 0.47855...
    #[test]
    fn retain_prob_golden() {
        let p = retain_prob(8, 10, 0.1);
        assert!((p - 0.478_553_4).abs() < 1e-5);

        // rare words are always retained (clipped to 1)
        assert_eq!(retain_prob(2, 10, 0.1), 1.0);
    }

    #[test]
    fn subsampling_rate_converges_to_retain_prob() {
        let p = retain_prob(8, 10, 0.1);
        let mut rng = StdRng::seed_from_u64(17);

        let draws = 100_000;
        let mut kept = 0usize;
        for _ in 0..draws {
            if rng.gen::<f32>() < p {
                kept += 1;
            }
        }
        let rate = kept as f32 / draws as f32;
        assert!((rate - p).abs() < 0.01, "rate {} vs p {}", rate, p);
    }

    #[test]
    fn negative_sampling_follows_smoothed_unigram() {
        let mut lines = vec!["a"; 8];
        lines.extend(vec!["b"; 2]);
        let sentences = to_sentences(&lines);
        let vocab = Vocab::build(&sentences, 1, 1e-4).unwrap();

        let ia = vocab.index("a").unwrap();
        let mass_a = 8f64.powf(0.75);
        let mass_b = 2f64.powf(0.75);
        let expected = mass_a / (mass_a + mass_b);

        let mut rng = StdRng::seed_from_u64(99);
        let draws = 100_000;
        let mut hits = 0usize;
        for _ in 0..draws {
            if vocab.sample_negative(&mut rng) == ia {
                hits += 1;
            }
        }
        let rate = hits as f64 / draws as f64;
        assert!((rate - expected).abs() < 0.01, "rate {} vs {}", rate, expected);
    }
}
