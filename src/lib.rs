use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::info;

use crate::dictionary_lib::{
    load_trie, DictionarySet, DictionaryTier, LoadReport, SharedDictionaries, TierStatus,
};

pub mod config;
pub mod dictionary_lib;
pub mod error;
pub mod rephrase;
pub mod special_chars;
pub mod translator;

pub use config::{ConversionConfig, DictionaryPaths, TranslatorConfig};
pub use error::{QuickTranslatorError, Result};
pub use rephrase::rephrase;
pub use special_chars::replace_special_chars;
pub use translator::{convert_to_sino_vietnamese, Token, TokenSource};

// Characters Windows and most file systems refuse in a file name.
const ILLEGAL_FILENAME_CHARS: &str = r#"<>:"/\|?*"#;

/// Loads the four dictionaries. See [`DictionarySet::load`].
pub fn load_dictionary_set(paths: &DictionaryPaths) -> Result<(DictionarySet, LoadReport)> {
    DictionarySet::load(paths)
}

/// Translates one paragraph: tokenize against `dictionaries`, then rephrase.
pub fn translate_paragraph(text: &str, dictionaries: &DictionarySet) -> String {
    if text.is_empty() {
        return String::new();
    }
    let tokens = convert_to_sino_vietnamese(text, dictionaries);
    rephrase(&tokens)
}

/// Translates the stem of `filename`, keeps its extension and removes characters
/// that are not allowed in file names. Any directory part is dropped.
pub fn translate_filename(filename: &str, dictionaries: &DictionarySet) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename);
    let (stem, extension) = split_extension(base);
    let converted = translate_paragraph(stem, dictionaries);
    sanitize_filename(&format!("{converted}{extension}"))
}

/// Removes `< > : " / \ | ? *` from `name`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(*c))
        .collect()
}

/// Splits `"name.ext"` into `("name", ".ext")`. Leading dots belong to the stem,
/// so `".hidden"` has no extension.
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if file_name[..idx].chars().any(|c| c != '.') => {
            (&file_name[..idx], &file_name[idx..])
        }
        _ => (file_name, ""),
    }
}

pub fn format_thousand(n: usize) -> String {
    let mut result_str = n.to_string();
    let mut offset = result_str.len() % 3;
    if offset == 0 {
        offset = 3;
    }

    while offset < result_str.len() {
        result_str.insert(offset, ',');
        offset += 4; // Including the added comma
    }
    result_str
}

/// Cooperative stop signal for [`QuickTranslator::translate_document`].
///
/// Clones share the same flag, so one can be handed to a UI or signal handler
/// while the translation holds another.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Translator bound to a set of dictionary files.
///
/// Holds the loaded dictionaries behind [`SharedDictionaries`], so a names2
/// reload can happen while other threads keep translating.
pub struct QuickTranslator {
    dictionaries: SharedDictionaries,
    paths: DictionaryPaths,
    parallel_threshold: usize,
}

impl QuickTranslator {
    /// Loads the dictionaries named in `config`.
    pub fn load(config: &TranslatorConfig) -> Result<(Self, LoadReport)> {
        let (set, report) = DictionarySet::load(&config.dictionaries)?;
        let translator = QuickTranslator {
            dictionaries: SharedDictionaries::new(set),
            paths: config.dictionaries.clone(),
            parallel_threshold: config.conversion.parallel_threshold,
        };
        Ok((translator, report))
    }

    /// Wraps an already built set, e.g. one read from a snapshot.
    pub fn with_dictionaries(set: DictionarySet, config: &TranslatorConfig) -> Self {
        QuickTranslator {
            dictionaries: SharedDictionaries::new(set),
            paths: config.dictionaries.clone(),
            parallel_threshold: config.conversion.parallel_threshold,
        }
    }

    /// The set currently in use.
    pub fn dictionaries(&self) -> Arc<DictionarySet> {
        self.dictionaries.snapshot()
    }

    /// Rebuilds names2 from its file and swaps it in. The file is read outside
    /// the lock; building the new set from the current one and installing it
    /// happen under a single write lock. On failure the current set stays in place.
    pub fn reload_names2(&self) -> Result<TierStatus> {
        let tier = DictionaryTier::Names2;
        let path = self.paths.path(tier);
        let (names2, status) = load_trie(tier, path)?;
        if !status.loaded {
            return Err(QuickTranslatorError::MissingDictionary {
                tier,
                path: path.to_path_buf(),
            });
        }

        self.dictionaries.update(|current| current.with_names2(names2));
        info!(
            "Reloaded {} names from {} in {:.2} seconds",
            status.count,
            path.display(),
            status.elapsed.as_secs_f64()
        );
        Ok(status)
    }

    pub fn translate_paragraph(&self, text: &str) -> String {
        translate_paragraph(text, &self.dictionaries.snapshot())
    }

    /// Translates a whole document paragraph by paragraph (split on `\n`) and
    /// joins the results with `\n`.
    ///
    /// `cancel` is checked before each paragraph; once set, the call returns
    /// [`QuickTranslatorError::Cancelled`] and discards the partial output.
    /// `progress(done, total)` runs after every translated paragraph. Large
    /// documents are translated on the rayon pool; output order always matches
    /// input order.
    pub fn translate_document<F>(&self, text: &str, cancel: &CancelFlag, progress: F) -> Result<String>
    where
        F: Fn(usize, usize) + Sync,
    {
        let dictionaries = self.dictionaries.snapshot();
        let paragraphs: Vec<&str> = text
            .split('\n')
            .map(|p| p.strip_suffix('\r').unwrap_or(p))
            .collect();
        let total = paragraphs.len();
        let done = AtomicUsize::new(0);

        let translate_one = |paragraph: &str| -> Option<String> {
            if cancel.is_cancelled() {
                return None;
            }
            let converted = translate_paragraph(paragraph, &dictionaries);
            progress(done.fetch_add(1, Ordering::Relaxed) + 1, total);
            Some(converted)
        };

        let converted: Option<Vec<String>> = if total >= self.parallel_threshold {
            paragraphs.par_iter().map(|p| translate_one(*p)).collect()
        } else {
            paragraphs.iter().map(|p| translate_one(*p)).collect()
        };

        match converted {
            Some(paragraphs) => Ok(paragraphs.join("\n")),
            None => {
                info!(
                    "Translation cancelled after {} of {} paragraphs",
                    done.load(Ordering::Relaxed),
                    total
                );
                Err(QuickTranslatorError::Cancelled)
            }
        }
    }
}
