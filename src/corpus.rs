
// imports
use crate::errors::{Result, TrainerError};

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// An ordered collection of tokenized sentences. Built once from a text file
/// and then scanned multiple times by the downstream stages.
pub struct Corpus {
    pub sentences: Vec<Vec<String>>,
}

impl Corpus {
    /// Reads a corpus file line by line, one sentence per line. Files ending
    /// with ".gz" are decompressed on the fly. Empty lines are dropped.
    pub fn load(file_path: &str) -> Result<Corpus> {
        if Path::new(file_path).is_dir() {
            return Err(TrainerError::PathIsDirectory(file_path.into()));
        }

        let lines = Corpus::read_file(file_path)?;
        let mut sentences: Vec<Vec<String>> = Vec::new();
        for line in lines {
            let sequence = Corpus::parse_line(&line?);
            if sequence.is_empty() {
                continue;
            }
            sentences.push(Corpus::tokenize(&sequence));
        }

        Ok(Corpus { sentences })
    }

    fn read_file(file_path: &str) -> Result<Box<dyn Iterator<Item = std::io::Result<String>>>> {
        let f = File::open(file_path)?;
        if file_path.ends_with(".gz") {
            Ok(Box::new(BufReader::new(GzDecoder::new(f)).lines()))
        } else {
            Ok(Box::new(BufReader::new(f).lines()))
        }
    }

    // line is a string of raw text, it is trimmed for trailing and leading
    // spaces and lower cased
    fn parse_line(line: &str) -> String {
        line.trim().to_lowercase()
    }
}

// defines the behavior needed for tokenizing a corpus. Normalization beyond
// casing and whitespace is left to whoever produced the text.
pub trait Tokenizer {
    fn tokenize(sequence: &str) -> Vec<String>;
}

impl Tokenizer for Corpus {
    // simple tokenizer by whitespace split
    fn tokenize(sequence: &str) -> Vec<String> {
        sequence.split_whitespace().map(|x| x.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {

    use super::{Corpus, Tokenizer};
    use std::fs;

    #[test]
    fn parse_and_tokenize() {
        let line = "  What you Say makes\ta lot of SENSE  ";
        let parsed = Corpus::parse_line(line);
        assert_eq!(parsed, "what you say makes\ta lot of sense");

        let tokens = Corpus::tokenize(&parsed);
        assert_eq!(
            tokens,
            vec!["what", "you", "say", "makes", "a", "lot", "of", "sense"]
        );
    }

    #[test]
    fn load_drops_empty_lines() {
        let path = std::env::temp_dir().join("skipgram_trainer_corpus_test.txt");
        fs::write(&path, "Hello World\n\n  \nsecond LINE here\n").unwrap();

        let corpus = Corpus::load(path.to_str().unwrap()).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(corpus.sentences.len(), 2);
        assert_eq!(corpus.sentences[0], vec!["hello", "world"]);
        assert_eq!(corpus.sentences[1], vec!["second", "line", "here"]);
    }
}
