use std::fmt;

use serde::{Deserialize, Serialize};

/// The four dictionary sources, in lookup priority order.
///
/// | Variant          | Default file                | Lookup                  | Required |
/// |-----------------:|-----------------------------|-------------------------|----------|
/// | `Names2`         | `Names2.txt`                | longest prefix (trie)   | no       |
/// | `Names`          | `Names.txt`                 | longest prefix (trie)   | no       |
/// | `VietPhrase`     | `VietPhrase.txt`            | longest prefix (trie)   | yes      |
/// | `ChinesePhienAm` | `ChinesePhienAmWords.txt`   | exact single character  | no       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictionaryTier {
    /// Curated, user-editable proper-noun overrides. Highest priority.
    Names2,

    /// Secondary proper-noun list.
    Names,

    /// General phrase dictionary.
    VietPhrase,

    /// Single-character Sino-Vietnamese readings, used as the last fallback.
    ChinesePhienAm,
}

impl DictionaryTier {
    /// All tiers, highest priority first.
    pub const ALL: [DictionaryTier; 4] = [
        DictionaryTier::Names2,
        DictionaryTier::Names,
        DictionaryTier::VietPhrase,
        DictionaryTier::ChinesePhienAm,
    ];

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Names2 => "names2",
            Self::Names => "names",
            Self::VietPhrase => "viet_phrase",
            Self::ChinesePhienAm => "chinese_phien_am",
        }
    }

    /// Conventional file name of this dictionary.
    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::Names2 => "Names2.txt",
            Self::Names => "Names.txt",
            Self::VietPhrase => "VietPhrase.txt",
            Self::ChinesePhienAm => "ChinesePhienAmWords.txt",
        }
    }

    /// Whether a missing file for this tier aborts loading.
    #[inline]
    pub fn is_required(self) -> bool {
        matches!(self, Self::VietPhrase)
    }

    /// Whether values of this tier keep only the first `/` or `|` separated gloss.
    #[inline]
    pub fn keeps_first_gloss(self) -> bool {
        matches!(self, Self::Names | Self::VietPhrase)
    }
}

impl fmt::Display for DictionaryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_snake_case_names() {
        let names: Vec<String> = DictionaryTier::ALL.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["names2", "names", "viet_phrase", "chinese_phien_am"]);
    }

    #[test]
    fn only_viet_phrase_is_required() {
        let required: Vec<_> = DictionaryTier::ALL
            .into_iter()
            .filter(|t| t.is_required())
            .collect();
        assert_eq!(required, vec![DictionaryTier::VietPhrase]);
    }
}
