
// imports
use crate::errors::{Result, TrainerError};

use serde_json::Value;
use std::fmt::Display;
use std::fs;

/// Training hyper parameters, the recognized configuration surface of the
/// embedding stages. Validation happens at setup, never inside training.
#[derive(Clone, Debug)]
pub struct TrainParams {
    pub min_count: usize,
    pub window_max: usize,
    pub vector_size: usize,
    pub subsample_threshold: f32,
    pub alpha_start: f32,
    pub alpha_min: f32,
    pub negative_k: usize,
    pub epochs: usize,
    pub worker_count: usize,
    pub phrase_min_count: usize,
    pub phrase_threshold: f64,
    pub use_phrases: bool,
    pub seed: u64,
}

// one core stays reserved for the rest of the machine
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1).max(1))
        .unwrap_or(1)
}

impl Default for TrainParams {
    fn default() -> TrainParams {
        TrainParams {
            min_count: 5,
            window_max: 5,
            vector_size: 100,
            subsample_threshold: 1e-4,
            alpha_start: 0.025,
            alpha_min: 1e-4,
            negative_k: 20,
            epochs: 5,
            worker_count: default_workers(),
            phrase_min_count: 5,
            phrase_threshold: 10.0,
            use_phrases: true,
            seed: 1,
        }
    }
}

impl TrainParams {
    pub fn validate(&self) -> Result<()> {
        if self.vector_size == 0 {
            return Err(TrainerError::invalid_configuration(
                "vector_size",
                "must be positive",
            ));
        }
        if self.epochs == 0 {
            return Err(TrainerError::invalid_configuration(
                "epochs",
                "must be positive",
            ));
        }
        if self.negative_k == 0 {
            return Err(TrainerError::invalid_configuration(
                "negative_k",
                "must be positive",
            ));
        }
        if self.window_max == 0 {
            return Err(TrainerError::invalid_configuration(
                "window_max",
                "must be positive",
            ));
        }
        if self.worker_count == 0 {
            return Err(TrainerError::invalid_configuration(
                "worker_count",
                "must be positive",
            ));
        }
        if self.min_count == 0 {
            return Err(TrainerError::invalid_configuration(
                "min_count",
                "must be positive",
            ));
        }
        if self.phrase_min_count == 0 {
            return Err(TrainerError::invalid_configuration(
                "phrase_min_count",
                "must be positive",
            ));
        }
        if !(self.subsample_threshold > 0.0) {
            return Err(TrainerError::invalid_configuration(
                "subsample_threshold",
                "must be positive",
            ));
        }
        if !(self.alpha_min > 0.0) || !(self.alpha_start > 0.0) {
            return Err(TrainerError::invalid_configuration(
                "alpha_start",
                "learning rates must be positive",
            ));
        }
        if self.alpha_min > self.alpha_start {
            return Err(TrainerError::invalid_configuration(
                "alpha_min",
                format!(
                    "alpha_min {} must not exceed alpha_start {}",
                    self.alpha_min, self.alpha_start
                ),
            ));
        }
        if self.phrase_threshold < 0.0 {
            return Err(TrainerError::invalid_configuration(
                "phrase_threshold",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

impl Display for TrainParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "training hyper parameters:
        min_count: {},
        window_max: {},
        vector_size: {},
        subsample_threshold: {},
        alpha_start: {},
        alpha_min: {},
        negative_k: {},
        epochs: {},
        worker_count: {},
        phrase_min_count: {},
        phrase_threshold: {},
        use_phrases: {},
        seed: {}",
            self.min_count,
            self.window_max,
            self.vector_size,
            self.subsample_threshold,
            self.alpha_start,
            self.alpha_min,
            self.negative_k,
            self.epochs,
            self.worker_count,
            self.phrase_min_count,
            self.phrase_threshold,
            self.use_phrases,
            self.seed
        )
    }
}

#[derive(Clone, Debug)]
pub struct JsonTypes {
    pub corpus_file: String,
    pub output_dir: String,
    pub train: TrainParams,
}

impl Display for JsonTypes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "using hyper-params:
        corpus_file: {}
        output_dir: {}
        Using training hyper-params: {}",
            self.corpus_file, self.output_dir, self.train
        )
    }
}

pub struct Config {
    params: JsonTypes,
}

impl Config {
    pub fn get_params(&self) -> JsonTypes {
        self.params.clone()
    }

    /// Expects one argument: a path to the json hyper-parameter file.
    pub fn new(args: &[String]) -> Result<Config> {
        if args.len() != 2 {
            return Err(TrainerError::invalid_configuration(
                "args",
                "input should be a path to a json file only",
            ));
        }

        let f = fs::File::open(&args[1])?;
        let json: Value = serde_json::from_reader(f)?;
        Config::from_json(&json)
    }

    /// Builds and validates the full parameter set from parsed json, filling
    /// defaults for missing keys.
    pub fn from_json(json: &Value) -> Result<Config> {
        let corpus_file = get_str(json, "corpus_file")?;
        let output_dir = get_str(json, "output_dir")?;

        let defaults = TrainParams::default();
        let train = TrainParams {
            min_count: get_usize(json, "min_count", defaults.min_count)?,
            window_max: get_usize(json, "window_max", defaults.window_max)?,
            vector_size: get_usize(json, "vector_size", defaults.vector_size)?,
            subsample_threshold: get_f32(json, "subsample_threshold", defaults.subsample_threshold)?,
            alpha_start: get_f32(json, "alpha_start", defaults.alpha_start)?,
            alpha_min: get_f32(json, "alpha_min", defaults.alpha_min)?,
            negative_k: get_usize(json, "negative_k", defaults.negative_k)?,
            epochs: get_usize(json, "epochs", defaults.epochs)?,
            worker_count: get_usize(json, "worker_count", defaults.worker_count)?,
            phrase_min_count: get_usize(json, "phrase_min_count", defaults.phrase_min_count)?,
            phrase_threshold: get_f64(json, "phrase_threshold", defaults.phrase_threshold)?,
            use_phrases: get_bool(json, "use_phrases", defaults.use_phrases)?,
            seed: get_u64(json, "seed", defaults.seed)?,
        };
        train.validate()?;

        Ok(Self {
            params: JsonTypes {
                corpus_file,
                output_dir,
                train,
            },
        })
    }
}

// handle default vs input parameters, bad types are configuration errors
// raised here rather than deferred into training

fn get_str(json: &Value, key: &'static str) -> Result<String> {
    match json.get(key) {
        Some(v) => v.as_str().map(|s| s.to_owned()).ok_or_else(|| {
            TrainerError::invalid_configuration(key, format!("expected a string, got {}", v))
        }),
        None => Err(TrainerError::invalid_configuration(
            key,
            "was not supplied through json",
        )),
    }
}

fn get_usize(json: &Value, key: &'static str, default: usize) -> Result<usize> {
    match json.get(key) {
        Some(v) => v.as_u64().map(|x| x as usize).ok_or_else(|| {
            TrainerError::invalid_configuration(
                key,
                format!("expected a non-negative integer, got {}", v),
            )
        }),
        None => Ok(default),
    }
}

fn get_u64(json: &Value, key: &'static str, default: u64) -> Result<u64> {
    match json.get(key) {
        Some(v) => v.as_u64().ok_or_else(|| {
            TrainerError::invalid_configuration(
                key,
                format!("expected a non-negative integer, got {}", v),
            )
        }),
        None => Ok(default),
    }
}

fn get_f32(json: &Value, key: &'static str, default: f32) -> Result<f32> {
    match json.get(key) {
        Some(v) => v.as_f64().map(|x| x as f32).ok_or_else(|| {
            TrainerError::invalid_configuration(key, format!("expected a number, got {}", v))
        }),
        None => Ok(default),
    }
}

fn get_f64(json: &Value, key: &'static str, default: f64) -> Result<f64> {
    match json.get(key) {
        Some(v) => v.as_f64().ok_or_else(|| {
            TrainerError::invalid_configuration(key, format!("expected a number, got {}", v))
        }),
        None => Ok(default),
    }
}

fn get_bool(json: &Value, key: &'static str, default: bool) -> Result<bool> {
    match json.get(key) {
        Some(v) => v.as_bool().ok_or_else(|| {
            TrainerError::invalid_configuration(key, format!("expected a boolean, got {}", v))
        }),
        None => Ok(default),
    }
}

/// Reading and writing the pipeline artifacts: the vector matrix as npy, the
/// token and phrase maps as json, the full model bundle as bincode.
pub mod files_handling {

    use super::Result;
    use crate::train::EmbeddingTable;
    use ndarray::Array2;
    use ndarray_npy::{read_npy, write_npy};
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::fs::{self, File};
    use std::io::{BufReader, BufWriter};

    pub fn read_input<R: ReadFile>(file_path: &str) -> Result<<R as ReadFile>::Item> {
        <R as ReadFile>::read_file(file_path)
    }

    pub fn save_output<S: SaveFile>(output_dir: &str, file_name: &str, item: &S) -> Result<()> {
        fs::create_dir_all(output_dir)?;
        item.save_file(output_dir, file_name)
    }

    pub trait ReadFile {
        type Item;
        fn read_file(file_path: &str) -> Result<Self::Item>;
    }

    pub trait SaveFile {
        fn save_file(&self, output_dir: &str, file_name: &str) -> Result<()>;
    }

    impl ReadFile for Array2<f32> {
        type Item = Self;
        fn read_file(file_path: &str) -> Result<Self::Item> {
            let in_file = file_path.to_string() + ".npy";
            let item = read_npy(in_file)?;
            Ok(item)
        }
    }

    impl SaveFile for Array2<f32> {
        fn save_file(&self, output_dir: &str, file_name: &str) -> Result<()> {
            let out = output_dir.to_string() + "/" + file_name + ".npy";
            write_npy(out, self)?;
            Ok(())
        }
    }

    impl ReadFile for HashMap<String, usize> {
        type Item = Self;
        fn read_file(file_path: &str) -> Result<Self::Item> {
            let in_file = file_path.to_string() + ".json";
            let f = BufReader::new(File::open(in_file)?);
            let item = serde_json::from_reader(f)?;
            Ok(item)
        }
    }

    impl SaveFile for HashMap<String, usize> {
        fn save_file(&self, output_dir: &str, file_name: &str) -> Result<()> {
            let out = output_dir.to_string() + "/" + file_name + ".json";
            let f = BufWriter::new(File::create(out)?);
            serde_json::to_writer(f, self)?;
            Ok(())
        }
    }

    impl ReadFile for HashMap<String, String> {
        type Item = Self;
        fn read_file(file_path: &str) -> Result<Self::Item> {
            let in_file = file_path.to_string() + ".json";
            let f = BufReader::new(File::open(in_file)?);
            let item = serde_json::from_reader(f)?;
            Ok(item)
        }
    }

    impl SaveFile for HashMap<String, String> {
        fn save_file(&self, output_dir: &str, file_name: &str) -> Result<()> {
            let out = output_dir.to_string() + "/" + file_name + ".json";
            let f = BufWriter::new(File::create(out)?);
            serde_json::to_writer(f, self)?;
            Ok(())
        }
    }

    /// Everything needed to reload a trained model: the index-ordered token
    /// list and both weight matrices.
    #[derive(Serialize, Deserialize)]
    pub struct ModelBundle {
        pub tokens: Vec<String>,
        pub w_in: Array2<f32>,
        pub w_out: Array2<f32>,
    }

    impl ModelBundle {
        pub fn new(tokens: Vec<String>, table: &EmbeddingTable) -> ModelBundle {
            ModelBundle {
                tokens,
                w_in: table.input().to_owned(),
                w_out: table.output().to_owned(),
            }
        }
    }

    impl ReadFile for ModelBundle {
        type Item = Self;
        fn read_file(file_path: &str) -> Result<Self::Item> {
            let in_file = file_path.to_string() + ".bin";
            let f = BufReader::new(File::open(in_file)?);
            let item = bincode::deserialize_from(f)?;
            Ok(item)
        }
    }

    impl SaveFile for ModelBundle {
        fn save_file(&self, output_dir: &str, file_name: &str) -> Result<()> {
            let out = output_dir.to_string() + "/" + file_name + ".bin";
            let mut f = BufWriter::new(File::create(out)?);
            bincode::serialize_into(&mut f, self)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {

    use super::{Config, TrainParams};
    use crate::errors::TrainerError;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_keys() {
        let json = json!({
            "corpus_file": "Input/corpus.txt",
            "output_dir": "Output"
        });
        let params = Config::from_json(&json).unwrap().get_params();

        assert_eq!(params.corpus_file, "Input/corpus.txt");
        assert_eq!(params.output_dir, "Output");
        assert_eq!(params.train.min_count, 5);
        assert_eq!(params.train.vector_size, 100);
        assert_eq!(params.train.negative_k, 20);
        assert_eq!(params.train.epochs, 5);
        assert!(params.train.use_phrases);
        assert!(params.train.worker_count >= 1);
    }

    #[test]
    fn explicit_keys_override_defaults() {
        let json = json!({
            "corpus_file": "Input/corpus.txt.gz",
            "output_dir": "Output",
            "vector_size": 64,
            "epochs": 12,
            "use_phrases": false,
            "seed": 42
        });
        let params = Config::from_json(&json).unwrap().get_params();
        assert_eq!(params.train.vector_size, 64);
        assert_eq!(params.train.epochs, 12);
        assert!(!params.train.use_phrases);
        assert_eq!(params.train.seed, 42);
    }

    #[test]
    fn missing_required_key_is_an_error() {
        let json = json!({ "output_dir": "Output" });
        match Config::from_json(&json) {
            Err(TrainerError::InvalidConfiguration { field, .. }) => {
                assert_eq!(field, "corpus_file")
            }
            _ => panic!("expected InvalidConfiguration"),
        }
    }

    #[test]
    fn setup_rejects_bad_values() {
        let cases = [
            json!({ "corpus_file": "c", "output_dir": "o", "vector_size": 0 }),
            json!({ "corpus_file": "c", "output_dir": "o", "epochs": 0 }),
            json!({ "corpus_file": "c", "output_dir": "o", "negative_k": 0 }),
            json!({ "corpus_file": "c", "output_dir": "o", "epochs": -3 }),
            json!({ "corpus_file": "c", "output_dir": "o", "subsample_threshold": 0.0 }),
            json!({ "corpus_file": "c", "output_dir": "o",
                    "alpha_start": 0.001, "alpha_min": 0.01 }),
        ];
        for json in &cases {
            assert!(
                matches!(
                    Config::from_json(json),
                    Err(TrainerError::InvalidConfiguration { .. })
                ),
                "accepted bad config {}",
                json
            );
        }
    }

    #[test]
    fn validate_catches_zero_workers() {
        let params = TrainParams {
            worker_count: 0,
            ..TrainParams::default()
        };
        assert!(params.validate().is_err());
    }
}
