//! Error types shared by the loaders.

use thiserror::Error;

pub type LoadResult<T> = Result<T, LoadError>;
pub type StoreResult<T> = Result<T, StoreError>;

/// A bundled resource could not be read.
#[derive(Debug, Error)]
#[error("asset '{name}' could not be read: {source}")]
pub struct AssetError {
    pub name: String,
    #[source]
    pub source: std::io::Error,
}

/// Failures of a remote document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store request failed: {0}")]
    Transport(String),

    #[error("document store returned {status} for {path}")]
    Status { status: u16, path: String },

    #[error("undecodable document at {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("document at {path} could not be encoded: {reason}")]
    Encode { path: String, reason: String },
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Everything that stops a test from being loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed test data: {0}")]
    Malformed(String),

    #[error("test document not found: {0}")]
    TestNotFound(String),

    #[error("part not found in test data: {0}")]
    PartNotFound(String),

    #[error("no questions found for part: {0}")]
    NoQuestions(String),
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

impl LoadError {
    /// Missing resources as opposed to data that is present but broken.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Asset(_) | Self::TestNotFound(_) | Self::PartNotFound(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown TEST_SOURCE '{0}', expected 'bundled' or 'remote'")]
    UnknownTestSource(String),

    #[error("{0} must be set to use the remote document store")]
    Missing(&'static str),

    #[error("{key} must be true or false, got '{value}'")]
    InvalidFlag { key: &'static str, value: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_errors_are_told_apart_from_malformed_data() {
        assert!(LoadError::PartNotFound("part_3".into()).is_not_found());
        assert!(LoadError::TestNotFound("toeic38_test".into()).is_not_found());
        assert!(!LoadError::Malformed("missing field `options`".into()).is_not_found());
        assert!(!LoadError::NoQuestions("part_1".into()).is_not_found());
    }

    #[test]
    fn json_errors_become_malformed() {
        let err: LoadError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, LoadError::Malformed(_)));
    }
}
