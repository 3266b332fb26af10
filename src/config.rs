//! TOML configuration for dictionary locations and conversion options.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dictionary_lib::DictionaryTier;
use crate::error::{QuickTranslatorError, Result};

/// Paragraph count from which document translation switches to rayon.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default)]
    pub dictionaries: DictionaryPaths,

    #[serde(default)]
    pub conversion: ConversionConfig,
}

impl TranslatorConfig {
    /// Reads a TOML file. Absent sections and keys fall back to their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| QuickTranslatorError::io(path, e))?;
        Self::from_toml_str(&content).map_err(|source| QuickTranslatorError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Where each dictionary file lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryPaths {
    #[serde(default = "default_names2")]
    pub names2: PathBuf,
    #[serde(default = "default_names")]
    pub names: PathBuf,
    #[serde(default = "default_viet_phrase")]
    pub viet_phrase: PathBuf,
    #[serde(default = "default_chinese_phien_am")]
    pub chinese_phien_am: PathBuf,
}

impl DictionaryPaths {
    /// The default file names, resolved inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        DictionaryPaths {
            names2: dir.join(DictionaryTier::Names2.default_file_name()),
            names: dir.join(DictionaryTier::Names.default_file_name()),
            viet_phrase: dir.join(DictionaryTier::VietPhrase.default_file_name()),
            chinese_phien_am: dir.join(DictionaryTier::ChinesePhienAm.default_file_name()),
        }
    }

    pub fn path(&self, tier: DictionaryTier) -> &Path {
        match tier {
            DictionaryTier::Names2 => &self.names2,
            DictionaryTier::Names => &self.names,
            DictionaryTier::VietPhrase => &self.viet_phrase,
            DictionaryTier::ChinesePhienAm => &self.chinese_phien_am,
        }
    }
}

impl Default for DictionaryPaths {
    fn default() -> Self {
        DictionaryPaths::in_dir("")
    }
}

fn default_names2() -> PathBuf {
    PathBuf::from(DictionaryTier::Names2.default_file_name())
}

fn default_names() -> PathBuf {
    PathBuf::from(DictionaryTier::Names.default_file_name())
}

fn default_viet_phrase() -> PathBuf {
    PathBuf::from(DictionaryTier::VietPhrase.default_file_name())
}

fn default_chinese_phien_am() -> PathBuf {
    PathBuf::from(DictionaryTier::ChinesePhienAm.default_file_name())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Appended to the translated file stem when writing a converted novel.
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Input encodings tried in order when reading a novel.
    #[serde(default = "default_encodings")]
    pub encodings: Vec<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        ConversionConfig {
            output_suffix: default_output_suffix(),
            parallel_threshold: default_parallel_threshold(),
            encodings: default_encodings(),
        }
    }
}

fn default_output_suffix() -> String {
    "_Converted".to_string()
}

fn default_parallel_threshold() -> usize {
    DEFAULT_PARALLEL_THRESHOLD
}

fn default_encodings() -> Vec<String> {
    ["utf-8", "gbk", "gb2312", "big5"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = TranslatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, TranslatorConfig::default());
        assert_eq!(config.dictionaries.viet_phrase, PathBuf::from("VietPhrase.txt"));
        assert_eq!(config.conversion.output_suffix, "_Converted");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = TranslatorConfig::from_toml_str(
            r#"
            [dictionaries]
            names2 = "data/MyNames2.txt"

            [conversion]
            encodings = ["gbk"]
            "#,
        )
        .unwrap();
        assert_eq!(config.dictionaries.names2, PathBuf::from("data/MyNames2.txt"));
        assert_eq!(config.dictionaries.names, PathBuf::from("Names.txt"));
        assert_eq!(config.conversion.encodings, vec!["gbk".to_string()]);
        assert_eq!(config.conversion.parallel_threshold, DEFAULT_PARALLEL_THRESHOLD);
    }

    #[test]
    fn in_dir_joins_default_names() {
        let paths = DictionaryPaths::in_dir("dicts");
        assert_eq!(
            paths.path(DictionaryTier::ChinesePhienAm),
            Path::new("dicts").join("ChinesePhienAmWords.txt")
        );
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(TranslatorConfig::from_toml_str("[conversion]\nparallel_threshold = \"many\"").is_err());
    }
}
