use std::path::PathBuf;

use crate::region::BucketKey;

#[derive(Debug, thiserror::Error)]
pub enum DoublesError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid magic in {path:?}: expected {expected:?}, got {actual:?}")]
    BadMagic {
        path: PathBuf,
        expected: [u8; 4],
        actual: [u8; 4],
    },

    #[error("Unsupported format version in {path:?}: expected {expected}, got {actual}")]
    UnsupportedVersion {
        path: PathBuf,
        expected: u32,
        actual: u32,
    },

    #[error("Truncated record in {path:?}: {trailing} trailing bytes")]
    TruncatedRecord { path: PathBuf, trailing: usize },

    #[error("Bucket {key} has no storage in {root:?}")]
    MissingBucket { key: BucketKey, root: PathBuf },

    #[error("Region directory {0:?} already holds partition output")]
    RegionsNotEmpty(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DoublesError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DoublesError>;
