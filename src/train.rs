
// imports
use crate::config::TrainParams;
use crate::errors::Result;
use crate::vocab::Vocab;

use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

// logistic loss saturates quickly, dot products beyond this are treated as
// fully confident
const MAX_EXP: f32 = 6.0;

fn sigmoid(x: f32) -> f32 {
    if x > MAX_EXP {
        1.0
    } else if x < -MAX_EXP {
        0.0
    } else {
        1.0 / (1.0 + (-x).exp())
    }
}

// splitmix64 scramble, gives every (seed, epoch, sentence) combination an
// independent rng stream so the thread schedule does not change which updates
// are computed
fn scramble(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// The two trained matrices: `w_in` holds the input vectors (context side,
/// the vectors exposed for querying) and `w_out` the output vectors used for
/// the center word and its negative-sampling targets. Frozen once training
/// ends.
pub struct EmbeddingTable {
    w_in: Array2<f32>,
    w_out: Array2<f32>,
}

impl EmbeddingTable {
    /// The input vectors, read-only. This is the matrix queries run against.
    pub fn input(&self) -> &Array2<f32> {
        &self.w_in
    }

    pub(crate) fn output(&self) -> &Array2<f32> {
        &self.w_out
    }

    pub fn into_input(self) -> Array2<f32> {
        self.w_in
    }

    pub fn dims(&self) -> (usize, usize) {
        self.w_in.dim()
    }
}

// The shared weight storage workers update without locks. This is Hogwild
// style asynchronous SGD: rows written by one worker may be read or written
// by another at the same time, and the races are accepted as part of the
// stochastic objective rather than guarded against. Locking every row update
// would serialize the whole inner loop, while the staleness the races
// introduce is bounded and tolerated by the objective.
struct SharedWeights {
    w_in: UnsafeCell<Vec<f32>>,
    w_out: UnsafeCell<Vec<f32>>,
    dim: usize,
}

// Sync is asserted on purpose, see the comment above: concurrent unguarded
// row access is the intended update scheme, not an omission.
unsafe impl Sync for SharedWeights {}

impl SharedWeights {
    // callers may hold overlapping mutable rows across worker threads, the
    // data race is intentional
    unsafe fn in_row(&self, index: usize) -> &mut [f32] {
        let ptr = (*self.w_in.get()).as_mut_ptr();
        std::slice::from_raw_parts_mut(ptr.add(index * self.dim), self.dim)
    }

    unsafe fn out_row(&self, index: usize) -> &mut [f32] {
        let ptr = (*self.w_out.get()).as_mut_ptr();
        std::slice::from_raw_parts_mut(ptr.add(index * self.dim), self.dim)
    }
}

pub struct Train<'a> {
    vocab: &'a Vocab,
    params: &'a TrainParams,
    weights: SharedWeights,
    // in-vocabulary tokens processed so far, drives the learning rate decay
    processed: AtomicU64,
    planned: f64,
}

impl<'a> Train<'a> {
    fn new(vocab: &'a Vocab, params: &'a TrainParams) -> Train<'a> {
        let v = vocab.len();
        let d = params.vector_size;

        // input vectors start at small uniform noise, output vectors at zero
        let mut rng = StdRng::seed_from_u64(params.seed);
        let w_in: Array2<f32> =
            Array2::random_using((v, d), Uniform::new(-0.5, 0.5), &mut rng) / d as f32;

        Self {
            vocab,
            params,
            weights: SharedWeights {
                w_in: UnsafeCell::new(w_in.into_raw_vec()),
                w_out: UnsafeCell::new(vec![0.0; v * d]),
                dim: d,
            },
            processed: AtomicU64::new(0),
            planned: (vocab.corpus_tokens() * params.epochs) as f64,
        }
    }

    /// Validates the hyper parameters, runs `epochs` full passes over the
    /// corpus and returns the frozen table. There is no early stopping, the
    /// epoch count is the only termination control.
    pub fn run(
        sentences: &[Vec<String>],
        vocab: &'a Vocab,
        params: &'a TrainParams,
    ) -> Result<EmbeddingTable> {
        params.validate()?;
        let trainer = Train::new(vocab, params);
        trainer.train(sentences)?;
        trainer.into_table()
    }

    fn train(&self, sentences: &[Vec<String>]) -> Result<()> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.params.worker_count)
            .build()?;

        for epoch in 0..self.params.epochs {
            let timer = Instant::now();

            // workers pull sentences from the shared pool queue and update
            // the weights concurrently
            pool.install(|| {
                sentences
                    .par_iter()
                    .enumerate()
                    .for_each(|(ordinal, sentence)| {
                        self.train_sentence(epoch, ordinal, sentence);
                    });
            });

            println!(
                "finished epoch {} / {}, took {} seconds ...",
                epoch + 1,
                self.params.epochs,
                timer.elapsed().as_secs()
            );
        }

        Ok(())
    }

    // the rate decays linearly from alpha_start to alpha_min over all planned
    // token occurrences, recomputed once per sentence rather than per pair
    fn current_alpha(&self, processed: u64) -> f32 {
        let progress = (processed as f64 / self.planned.max(1.0)) as f32;
        let alpha =
            self.params.alpha_start - (self.params.alpha_start - self.params.alpha_min) * progress;
        alpha.max(self.params.alpha_min)
    }

    fn train_sentence(&self, epoch: usize, ordinal: usize, sentence: &[String]) {
        let mut rng = StdRng::seed_from_u64(scramble(
            self.params.seed ^ ((epoch as u64) << 40) ^ ordinal as u64,
        ));

        // out-of-vocabulary tokens are silently dropped, frequent tokens are
        // subsampled out of this particular pass with their retain probability
        let mut ids = Vec::with_capacity(sentence.len());
        let mut in_vocab = 0u64;
        for tok in sentence {
            if let Some(index) = self.vocab.index(tok) {
                in_vocab += 1;
                if rng.gen::<f32>() < self.vocab.entry(index).retain_prob {
                    ids.push(index);
                }
            }
        }

        let processed = self.processed.fetch_add(in_vocab, Ordering::Relaxed) + in_vocab;
        let alpha = self.current_alpha(processed);

        if ids.len() < 2 {
            return;
        }

        for center in 0..ids.len() {
            // dynamic window: each center position draws its own radius
            let window = rng.gen_range(1..=self.params.window_max);
            let lo = center.saturating_sub(window);
            let hi = (center + window).min(ids.len() - 1);
            for context in lo..=hi {
                if context == center {
                    continue;
                }
                unsafe { self.train_pair(ids[center], ids[context], alpha, &mut rng) };
            }
        }
    }

    // one negative-sampling update for a (center, context) pair: the context
    // input row against the center output row with label 1, then against
    // negative_k drawn output rows with label 0
    unsafe fn train_pair(&self, center: usize, context: usize, alpha: f32, rng: &mut StdRng) {
        let dim = self.weights.dim;
        let l1 = self.weights.in_row(context);
        let mut l1_err = vec![0.0f32; dim];

        for s in 0..=self.params.negative_k {
            let (target, label) = if s == 0 {
                (center, 1.0f32)
            } else {
                let draw = self.vocab.sample_negative(rng);
                // drop draws colliding with the true pair
                if draw == center || draw == context {
                    continue;
                }
                (draw, 0.0f32)
            };

            let l2 = self.weights.out_row(target);
            let mut dot = 0.0f32;
            for d in 0..dim {
                dot += l1[d] * l2[d];
            }
            let g = (label - sigmoid(dot)) * alpha;
            for d in 0..dim {
                l1_err[d] += g * l2[d];
            }
            for d in 0..dim {
                l2[d] += g * l1[d];
            }
        }

        for d in 0..dim {
            l1[d] += l1_err[d];
        }
    }

    fn into_table(self) -> Result<EmbeddingTable> {
        let v = self.vocab.len();
        let d = self.params.vector_size;
        Ok(EmbeddingTable {
            w_in: Array2::from_shape_vec((v, d), self.weights.w_in.into_inner())?,
            w_out: Array2::from_shape_vec((v, d), self.weights.w_out.into_inner())?,
        })
    }
}
