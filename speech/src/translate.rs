//! Machine translation.

use serde::{Deserialize, Serialize};

/// Error type for translation operations.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("translation failed: {0}")]
    TranslationFailed(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("other error: {0}")]
    Other(String),
}

/// Source and target language codes, fixed for the lifetime of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self {
            source: "hi".to_string(),
            target: "en".to_string(),
        }
    }
}

impl std::fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

/// Interface for text translation.
pub trait Translator: Send + Sync {
    /// Translates `text` into the target language.
    ///
    /// Empty input is valid and yields an empty result, not an error.
    fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

impl<T: Translator + ?Sized> Translator for std::sync::Arc<T> {
    fn translate(&self, text: &str) -> Result<String, TranslateError> {
        (**self).translate(text)
    }
}
