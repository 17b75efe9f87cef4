use std::fmt;
use std::path::PathBuf;

/// All errors that can occur while building, training or persisting a network.
#[derive(Debug)]
pub enum NnError {
    /// A vector length did not match the matrix dimension it feeds.
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Adjacent layers do not chain, or a layer has a zero dimension.
    InvalidTopology(String),
    /// An activation id outside the function table.
    InvalidActivation(i32),
    /// Activation and derivative ids that are not an adjacent `(2k, 2k + 1)` pair.
    UnpairedActivation { activation: i32, derivative: i32 },
    /// A model or dataset file that is truncated or internally inconsistent.
    Corrupt(String),
    /// Another out-of-core matrix already owns this backing file.
    BackingFileCollision(PathBuf),
    /// Row index past the end of a matrix.
    RowOutOfRange { row: usize, rows: usize },
    /// Record index past the end of a dataset stream.
    EntryOutOfRange { index: usize, count: usize },
    /// Rejected trainer or network configuration.
    InvalidConfig(String),
    /// A search worker panicked.
    WorkerPanicked { worker: usize },
    Io(std::io::Error),
    Json(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NnError>;

impl NnError {
    pub(crate) fn shape(context: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            context,
            expected,
            actual,
        }
    }

    /// Maps a short read to `Corrupt`; anything else stays an I/O error.
    pub(crate) fn from_read(e: std::io::Error, what: &str) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::Corrupt(format!("{what}: unexpected end of file"))
        } else {
            Self::Io(e)
        }
    }
}

impl fmt::Display for NnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch {
                context,
                expected,
                actual,
            } => write!(
                f,
                "{context}: expected length {expected}, got {actual}"
            ),
            Self::InvalidTopology(msg) => write!(f, "invalid topology: {msg}"),
            Self::InvalidActivation(id) => write!(f, "unknown activation id {id}"),
            Self::UnpairedActivation {
                activation,
                derivative,
            } => write!(
                f,
                "activation {activation} and derivative {derivative} are not a table pair"
            ),
            Self::Corrupt(msg) => write!(f, "corrupt file: {msg}"),
            Self::BackingFileCollision(path) => {
                write!(f, "backing file {} already exists", path.display())
            }
            Self::RowOutOfRange { row, rows } => {
                write!(f, "row {row} out of range for {rows} rows")
            }
            Self::EntryOutOfRange { index, count } => {
                write!(f, "entry {index} out of range for {count} entries")
            }
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::WorkerPanicked { worker } => write!(f, "search worker {worker} panicked"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl std::error::Error for NnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NnError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for NnError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
