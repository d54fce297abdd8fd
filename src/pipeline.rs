
// imports
use crate::config::files_handling::{self, ModelBundle};
use crate::config::{Config, JsonTypes};
use crate::corpus::Corpus;
use crate::errors::Result;
use crate::phrases::PhraseDetector;
use crate::train::Train;
use crate::vocab::Vocab;

use std::env;
use std::time::Instant;

pub struct Pipeline {}

impl Pipeline {
    // runs the main procedure of 5 steps -
    // -> configuration of arguments
    // -> corpus loading
    // -> phrase detection and corpus rewriting
    // -> vocabulary building
    // -> training and artifact saving

    pub fn run() {
        println!("entering program...");
        let args: Vec<String> = env::args().collect();

        println!("building parameters...");
        let params = match Config::new(&args) {
            Ok(config) => config.get_params(),
            Err(e) => panic!("{}", e),
        };
        println!("{}", params);

        if let Err(e) = Pipeline::execute(&params) {
            panic!("{}", e)
        }
    }

    pub fn execute(params: &JsonTypes) -> Result<()> {
        let timer = Instant::now();
        println!("loading corpus...");
        let corpus = Corpus::load(&params.corpus_file)?;
        println!(
            "loaded {} sentences, took {} seconds ...",
            corpus.sentences.len(),
            timer.elapsed().as_secs()
        );

        // rewrite frequent collocations into single compound tokens, and keep
        // the map so future text can be preprocessed the same way
        let sentences = if params.train.use_phrases {
            let timer = Instant::now();
            println!("starting phrase detection...");
            let phrase_map = PhraseDetector::detect(
                &corpus.sentences,
                params.train.phrase_min_count,
                params.train.phrase_threshold,
            );
            let merged = phrase_map.apply_corpus(&corpus.sentences);
            files_handling::save_output(&params.output_dir, "phrases", &phrase_map.to_flat())?;
            println!(
                "merged {} phrases, took {} seconds ...",
                phrase_map.len(),
                timer.elapsed().as_secs()
            );
            merged
        } else {
            corpus.sentences
        };

        let timer = Instant::now();
        println!("starting vocab building...");
        let vocab = Vocab::build(
            &sentences,
            params.train.min_count,
            params.train.subsample_threshold,
        )?;
        println!(
            "kept {} tokens covering {} corpus occurrences, took {} seconds ...",
            vocab.len(),
            vocab.corpus_tokens(),
            timer.elapsed().as_secs()
        );

        let timer = Instant::now();
        println!("starting training part...");
        let table = Train::run(&sentences, &vocab, &params.train)?;
        println!(
            "finished training, took {} seconds ...",
            timer.elapsed().as_secs()
        );

        // save the weights, the tokens and the reloadable bundle
        files_handling::save_output(&params.output_dir, "vecs", table.input())?;
        files_handling::save_output(&params.output_dir, "words", &vocab.token_to_index_map())?;
        let bundle = ModelBundle::new(vocab.tokens(), &table);
        files_handling::save_output(&params.output_dir, "model", &bundle)?;
        println!("saved vecs, words and model to {}", params.output_dir);

        Ok(())
    }
}
