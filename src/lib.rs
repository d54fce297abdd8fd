
mod config;
mod corpus;
mod errors;
mod phrases;
mod pipeline;
mod similarity;
mod train;
mod vocab;

pub use config::{files_handling, Config, JsonTypes, TrainParams};
pub use corpus::{Corpus, Tokenizer};
pub use errors::{Result, TrainerError};
pub use phrases::{PhraseDetector, PhraseMap};
pub use pipeline::Pipeline;
pub use similarity::Similarity;
pub use train::{EmbeddingTable, Train};
pub use vocab::{Vocab, VocabEntry};
