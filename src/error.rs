//! Error types for dictionary loading, configuration and document translation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::dictionary_lib::DictionaryTier;

/// The error type for every fallible operation in this crate.
///
/// Translation itself never fails: [`crate::translate_paragraph`] is total over
/// any Unicode input. Errors only come from the file system, configuration,
/// snapshot (de)serialization or a cancelled document run.
#[derive(Debug, Error)]
pub enum QuickTranslatorError {
    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A dictionary file that translation cannot run without is missing.
    #[error("{tier} dictionary not found at {}", path.display())]
    MissingDictionary { tier: DictionaryTier, path: PathBuf },

    /// The TOML configuration file could not be parsed.
    #[error("Invalid configuration in {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A dictionary snapshot could not be encoded or decoded.
    #[error("Dictionary snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A document translation was stopped through its cancel flag.
    #[error("Translation cancelled")]
    Cancelled,
}

impl QuickTranslatorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        QuickTranslatorError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A convenience `Result` alias using [`QuickTranslatorError`].
pub type Result<T> = std::result::Result<T, QuickTranslatorError>;
