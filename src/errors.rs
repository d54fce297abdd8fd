
use std::path::PathBuf;

/// Crate-wide result type, defaulting to [`TrainerError`].
pub type Result<T, E = TrainerError> = std::result::Result<T, E>;

/// All failures this crate can report.
///
/// Failures are deterministic given input and configuration; there is no
/// transient class and nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    /// No token survived the minimum-count filter.
    #[error("no tokens survived the min_count={0} cutoff, vocabulary is empty")]
    EmptyVocabulary(usize),

    /// A query referenced a token that was never seen or was filtered out.
    #[error("token '{0}' is not in the vocabulary")]
    UnknownWord(String),

    /// A hyper-parameter failed validation at setup.
    #[error("invalid configuration for '{field}': {msg}")]
    InvalidConfiguration { field: &'static str, msg: String },

    /// A directory was given where a corpus file was expected.
    #[error("the path '{0}' is a directory, but a corpus file was expected")]
    PathIsDirectory(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    NpyRead(#[from] ndarray_npy::ReadNpyError),

    #[error(transparent)]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Stats(#[from] ndarray_stats::errors::MinMaxError),

    #[error("could not build the training thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl TrainerError {
    pub(crate) fn invalid_configuration<S>(field: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidConfiguration {
            field,
            msg: msg.into(),
        }
    }
}
