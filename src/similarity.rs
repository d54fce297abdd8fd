
// imports
use crate::errors::{Result, TrainerError};
use crate::train::EmbeddingTable;
use crate::vocab::Vocab;

use ndarray::prelude::*;
use ndarray_stats::QuantileExt;
use std::collections::HashMap;

/// Read-only queries over a frozen vector table: nearest neighbors, vector
/// arithmetic analogies and odd-one-out. Rows are L2-normalized once at
/// construction so cosine similarity is a plain dot product.
pub struct Similarity {
    w: Array2<f32>,
    t2i: HashMap<String, usize>,
    i2t: HashMap<usize, String>,
}

impl Similarity {
    pub fn new(mut w: Array2<f32>, t2i: HashMap<String, usize>) -> Similarity {
        // normalize so each row has unit l2 norm
        for mut row in w.axis_iter_mut(Axis(0)) {
            let norm = row.mapv(|a| a * a).sum().sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|a| a / norm);
            }
        }

        let mut i2t: HashMap<usize, String> = HashMap::new();
        for (t, i) in &t2i {
            i2t.entry(*i).or_insert(t.to_owned());
        }

        Self { w, t2i, i2t }
    }

    /// Convenience constructor straight off a training run. Only the input
    /// vectors take part in queries.
    pub fn from_table(table: &EmbeddingTable, vocab: &Vocab) -> Similarity {
        Similarity::new(table.input().to_owned(), vocab.token_to_index_map())
    }

    /// The unit-normalized vector of a token.
    pub fn extract_vec_from_word(&self, token: &str) -> Result<Array1<f32>> {
        match self.t2i.get(token) {
            Some(i) => Ok(self.w.slice(s![*i, ..]).to_owned()),
            None => Err(TrainerError::UnknownWord(token.to_string())),
        }
    }

    /// The `k` nearest tokens by cosine similarity, the query itself excluded.
    pub fn most_similar(&self, token: &str, k: usize) -> Result<Vec<(String, f32)>> {
        let index = self.lookup(token)?;
        let vec = self.w.slice(s![index, ..]).to_owned();
        Ok(self.rank(&vec, k, &[index]))
    }

    /// Nearest tokens to `sum(positive) - sum(negative)`, every input token
    /// excluded from the result.
    pub fn most_similar_combined(
        &self,
        positive: &[&str],
        negative: &[&str],
        k: usize,
    ) -> Result<Vec<(String, f32)>> {
        let mut composite: Array1<f32> = Array1::zeros(self.w.dim().1);
        let mut exclude = Vec::with_capacity(positive.len() + negative.len());

        for token in positive {
            let index = self.lookup(token)?;
            composite += &self.w.slice(s![index, ..]);
            exclude.push(index);
        }
        for token in negative {
            let index = self.lookup(token)?;
            composite -= &self.w.slice(s![index, ..]);
            exclude.push(index);
        }

        Ok(self.rank(&composite, k, &exclude))
    }

    /// a is to b as like c is to ? -- translates to b - a + c.
    pub fn extract_analogies(&self, inputs: [&str; 3], k: usize) -> Result<Vec<(String, f32)>> {
        self.most_similar_combined(&[inputs[1], inputs[2]], &[inputs[0]], k)
    }

    /// The token farthest from the centroid of the given tokens. Well defined
    /// already for two tokens, whichever sits farther from their midpoint.
    pub fn doesnt_match(&self, tokens: &[&str]) -> Result<String> {
        assert!(tokens.len() >= 2, "need at least two tokens to pick an outlier");

        let mut indices = Vec::with_capacity(tokens.len());
        let mut centroid: Array1<f32> = Array1::zeros(self.w.dim().1);
        for token in tokens {
            let index = self.lookup(token)?;
            centroid += &self.w.slice(s![index, ..]);
            indices.push(index);
        }
        centroid /= tokens.len() as f32;
        let norm = centroid.mapv(|a| a * a).sum().sqrt();
        if norm > 0.0 {
            centroid /= norm;
        }

        let sims: Array1<f32> = indices
            .iter()
            .map(|i| self.w.slice(s![*i, ..]).dot(&centroid))
            .collect();
        let worst = sims.argmin()?;
        Ok(tokens[worst].to_string())
    }

    fn lookup(&self, token: &str) -> Result<usize> {
        self.t2i
            .get(token)
            .copied()
            .ok_or_else(|| TrainerError::UnknownWord(token.to_string()))
    }

    // scores every row against the (renormalized) query vector and returns
    // the k best in descending order, skipping excluded indices. Ties keep
    // index order, the sort is stable.
    fn rank(&self, vec: &Array1<f32>, k: usize, exclude: &[usize]) -> Vec<(String, f32)> {
        let norm = vec.mapv(|a| a * a).sum().sqrt();
        let query = if norm > 0.0 { vec / norm } else { vec.to_owned() };

        let scores = self.w.dot(&query);
        let mut indexed: Vec<(usize, f32)> = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(i, _)| !exclude.contains(i))
            .collect();
        indexed.sort_by(|(_, s), (_, t)| t.total_cmp(s));
        indexed.truncate(k);

        indexed
            .into_iter()
            .map(|(i, score)| (self.i2t.get(&i).unwrap().to_owned(), score))
            .collect()
    }
}

#[cfg(test)]
mod tests {

    use super::Similarity;
    use crate::errors::TrainerError;
    use ndarray::array;
    use std::collections::HashMap;

    // four tokens with hand-picked directions: "b" nearly parallel to "a",
    // "c" and "d" orthogonal to both
    fn toy_similarity() -> Similarity {
        let w = array![
            [1.0f32, 0.0, 0.0],
            [0.9, 0.1, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let mut t2i = HashMap::new();
        for (i, t) in ["a", "b", "c", "d"].iter().enumerate() {
            t2i.insert(t.to_string(), i);
        }
        Similarity::new(w, t2i)
    }

    #[test]
    fn most_similar_excludes_query_and_sorts_descending() {
        let sim = toy_similarity();

        let neighbors = sim.most_similar("a", 10).unwrap();
        // never returns the query itself, at most k results
        assert!(neighbors.len() <= 10);
        assert_eq!(neighbors.len(), 3);
        assert!(neighbors.iter().all(|(t, _)| t != "a"));
        assert_eq!(neighbors[0].0, "b");
        for pair in neighbors.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }

        let top1 = sim.most_similar("a", 1).unwrap();
        assert_eq!(top1.len(), 1);
        assert_eq!(top1[0].0, "b");
    }

    #[test]
    fn unknown_word_is_an_error() {
        let sim = toy_similarity();
        match sim.most_similar("nope", 3) {
            Err(TrainerError::UnknownWord(w)) => assert_eq!(w, "nope"),
            other => panic!("expected UnknownWord, got {:?}", other.map(|v| v.len())),
        }
        assert!(sim.extract_vec_from_word("nope").is_err());
        assert!(sim.doesnt_match(&["a", "nope"]).is_err());
    }

    #[test]
    fn combined_query_excludes_all_inputs() {
        let sim = toy_similarity();
        let results = sim.most_similar_combined(&["a", "c"], &["d"], 10).unwrap();
        assert!(results.iter().all(|(t, _)| t != "a" && t != "c" && t != "d"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "b");
    }

    #[test]
    fn doesnt_match_picks_the_outlier() {
        let sim = toy_similarity();
        assert_eq!(sim.doesnt_match(&["a", "b", "d"]).unwrap(), "d");

        // two tokens: whichever is farther from the two-point centroid; for
        // unit vectors both are equidistant, the first stable minimum wins
        let two = sim.doesnt_match(&["a", "b"]).unwrap();
        assert!(two == "a" || two == "b");
    }

    #[test]
    fn vector_lookup_is_unit_length() {
        let sim = toy_similarity();
        let v = sim.extract_vec_from_word("b").unwrap();
        let norm = v.mapv(|a| a * a).sum().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    // end to end: train on a small corpus where royal terms appear in
    // parallel male / female contexts, then ask for king - man + woman and
    // expect queen among the top candidates
    #[test]
    fn analogy_scenario_ranks_queen_high() {
        use crate::config::TrainParams;
        use crate::train::Train;
        use crate::vocab::Vocab;

        let template = [
            "king man royal crown",
            "queen woman royal crown",
            "man person works",
            "woman person works",
            "king rules court",
            "queen rules court",
        ];
        let mut sentences: Vec<Vec<String>> = Vec::new();
        for _ in 0..30 {
            for line in template {
                sentences.push(line.split(' ').map(|x| x.to_string()).collect());
            }
        }

        let params = TrainParams {
            min_count: 1,
            window_max: 3,
            vector_size: 16,
            subsample_threshold: 1.0,
            alpha_start: 0.05,
            alpha_min: 1e-4,
            negative_k: 5,
            epochs: 40,
            worker_count: 1,
            seed: 3,
            ..TrainParams::default()
        };

        let vocab = Vocab::build(&sentences, 1, params.subsample_threshold).unwrap();
        let table = Train::run(&sentences, &vocab, &params).unwrap();
        let sim = Similarity::from_table(&table, &vocab);

        let results = sim
            .most_similar_combined(&["king", "woman"], &["man"], 10)
            .unwrap();
        assert!(
            results.iter().any(|(t, _)| t == "queen"),
            "queen missing from {:?}",
            results
        );
    }
}
