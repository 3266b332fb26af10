use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use zstd::stream::read::Decoder;
use zstd::Encoder;

use crate::config::DictionaryPaths;
use crate::error::{QuickTranslatorError, Result};
use crate::format_thousand;

pub mod prefix_trie;
pub mod tier;

pub use prefix_trie::PrefixTrie;
pub use tier::DictionaryTier;

const SNAPSHOT_ZSTD_LEVEL: i32 = 19;

/// The four lookup sources a translation pass reads from.
///
/// Every tier sits behind an `Arc`, so a set is cheap to clone and a reload of
/// one tier produces a new set that shares the untouched ones. A set is never
/// mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct DictionarySet {
    pub names2: Arc<PrefixTrie>,
    pub names: Arc<PrefixTrie>,
    pub viet_phrase: Arc<PrefixTrie>,
    pub chinese_phien_am: Arc<HashMap<char, String>>,
}

impl DictionarySet {
    pub fn new(
        names2: PrefixTrie,
        names: PrefixTrie,
        viet_phrase: PrefixTrie,
        chinese_phien_am: HashMap<char, String>,
    ) -> Self {
        DictionarySet {
            names2: Arc::new(names2),
            names: Arc::new(names),
            viet_phrase: Arc::new(viet_phrase),
            chinese_phien_am: Arc::new(chinese_phien_am),
        }
    }

    /// Loads all four dictionaries from `paths`.
    ///
    /// Missing optional files leave their tier empty and are logged; a missing
    /// VietPhrase file is an error.
    pub fn load(paths: &DictionaryPaths) -> Result<(Self, LoadReport)> {
        let (names2, names2_status) = load_trie(DictionaryTier::Names2, &paths.names2)?;
        let (names, names_status) = load_trie(DictionaryTier::Names, &paths.names)?;
        let (phien_am, phien_am_status) = load_phien_am(&paths.chinese_phien_am)?;
        let (viet_phrase, viet_phrase_status) =
            load_trie(DictionaryTier::VietPhrase, &paths.viet_phrase)?;

        let set = DictionarySet::new(names2, names, viet_phrase, phien_am);
        let report = LoadReport {
            names2: names2_status,
            names: names_status,
            viet_phrase: viet_phrase_status,
            chinese_phien_am: phien_am_status,
        };
        Ok((set, report))
    }

    /// A copy of this set with the names2 tier replaced.
    pub fn with_names2(&self, names2: PrefixTrie) -> Self {
        DictionarySet {
            names2: Arc::new(names2),
            ..self.clone()
        }
    }

    #[inline]
    pub fn phien_am(&self, ch: char) -> Option<&str> {
        self.chinese_phien_am.get(&ch).map(String::as_str)
    }

    pub fn to_snapshot(&self) -> DictionarySnapshot {
        let sorted = |trie: &PrefixTrie| {
            let mut entries = trie.entries();
            entries.sort();
            entries
        };
        DictionarySnapshot {
            names2: sorted(&*self.names2),
            names: sorted(&*self.names),
            viet_phrase: sorted(&*self.viet_phrase),
            names2_count: self.names2.count(),
            names_count: self.names.count(),
            viet_phrase_count: self.viet_phrase.count(),
            chinese_phien_am: self
                .chinese_phien_am
                .iter()
                .map(|(ch, value)| (ch.to_string(), value.clone()))
                .collect(),
        }
    }

    /// Rebuilds the tries from `snapshot`. Each trie's [`count`](PrefixTrie::count)
    /// is restored to the insert count recorded when the snapshot was taken.
    pub fn from_snapshot(snapshot: DictionarySnapshot) -> Self {
        let rebuild = |entries: Vec<(String, String)>, count: usize| {
            let mut trie: PrefixTrie = entries.into_iter().collect();
            trie.restore_count(count);
            trie
        };
        let chinese_phien_am = snapshot
            .chinese_phien_am
            .into_iter()
            .filter_map(|(key, value)| single_char(&key).map(|ch| (ch, value)))
            .collect();
        DictionarySet::new(
            rebuild(snapshot.names2, snapshot.names2_count),
            rebuild(snapshot.names, snapshot.names_count),
            rebuild(snapshot.viet_phrase, snapshot.viet_phrase_count),
            chinese_phien_am,
        )
    }

    /// Writes the set as zstd-compressed JSON.
    pub fn save_compressed<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| QuickTranslatorError::io(path, e))?;
        let writer = BufWriter::new(file);
        let mut encoder = Encoder::new(writer, SNAPSHOT_ZSTD_LEVEL)
            .map_err(|e| QuickTranslatorError::io(path, e))?;
        serde_json::to_writer(&mut encoder, &self.to_snapshot())?;
        let mut writer = encoder
            .finish()
            .map_err(|e| QuickTranslatorError::io(path, e))?;
        writer.flush().map_err(|e| QuickTranslatorError::io(path, e))?;
        Ok(())
    }

    /// Reads a set written by [`save_compressed`](Self::save_compressed).
    ///
    /// Every tier in the report points at the snapshot file and shares the
    /// total load time.
    pub fn load_compressed<P: AsRef<Path>>(path: P) -> Result<(Self, LoadReport)> {
        let path = path.as_ref();
        let started = Instant::now();
        let file = File::open(path).map_err(|e| QuickTranslatorError::io(path, e))?;
        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|e| QuickTranslatorError::io(path, e))?;
        let snapshot: DictionarySnapshot = serde_json::from_reader(decoder)?;
        let set = DictionarySet::from_snapshot(snapshot);
        let elapsed = started.elapsed();
        info!(
            "Loaded dictionary snapshot {} in {:.2} seconds",
            path.display(),
            elapsed.as_secs_f64()
        );

        let status = |tier, count| TierStatus {
            tier,
            path: path.to_path_buf(),
            loaded: true,
            count,
            elapsed,
        };
        let report = LoadReport {
            names2: status(DictionaryTier::Names2, set.names2.count()),
            names: status(DictionaryTier::Names, set.names.count()),
            viet_phrase: status(DictionaryTier::VietPhrase, set.viet_phrase.count()),
            chinese_phien_am: status(DictionaryTier::ChinesePhienAm, set.chinese_phien_am.len()),
        };
        Ok((set, report))
    }

    /// Writes the set as uncompressed, pretty-printed JSON.
    pub fn serialize_to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| QuickTranslatorError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.to_snapshot())?;
        writer.flush().map_err(|e| QuickTranslatorError::io(path, e))?;
        Ok(())
    }
}

/// Serializable form of a [`DictionarySet`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DictionarySnapshot {
    #[serde(default)]
    pub names2: Vec<(String, String)>,
    #[serde(default)]
    pub names: Vec<(String, String)>,
    #[serde(default)]
    pub viet_phrase: Vec<(String, String)>,
    #[serde(default)]
    pub names2_count: usize,
    #[serde(default)]
    pub names_count: usize,
    #[serde(default)]
    pub viet_phrase_count: usize,
    #[serde(default)]
    pub chinese_phien_am: BTreeMap<String, String>,
}

/// Load outcome for one dictionary file.
#[derive(Debug, Clone, PartialEq)]
pub struct TierStatus {
    pub tier: DictionaryTier,
    pub path: PathBuf,
    pub loaded: bool,
    pub count: usize,
    pub elapsed: Duration,
}

impl TierStatus {
    fn missing(tier: DictionaryTier, path: &Path) -> Self {
        TierStatus {
            tier,
            path: path.to_path_buf(),
            loaded: false,
            count: 0,
            elapsed: Duration::ZERO,
        }
    }
}

impl fmt::Display for TierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.loaded {
            write!(
                f,
                "{}: {} entries from {} ({:.2}s)",
                self.tier,
                format_thousand(self.count),
                self.path.display(),
                self.elapsed.as_secs_f64()
            )
        } else {
            write!(f, "{}: not loaded ({})", self.tier, self.path.display())
        }
    }
}

/// Per-tier status of a [`DictionarySet::load`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub names2: TierStatus,
    pub names: TierStatus,
    pub viet_phrase: TierStatus,
    pub chinese_phien_am: TierStatus,
}

impl LoadReport {
    pub fn get(&self, tier: DictionaryTier) -> &TierStatus {
        match tier {
            DictionaryTier::Names2 => &self.names2,
            DictionaryTier::Names => &self.names,
            DictionaryTier::VietPhrase => &self.viet_phrase,
            DictionaryTier::ChinesePhienAm => &self.chinese_phien_am,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TierStatus> {
        DictionaryTier::ALL.into_iter().map(move |tier| self.get(tier))
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for status in self.iter() {
            writeln!(f, "{status}")?;
        }
        Ok(())
    }
}

/// Holder for the dictionary set in use, swapped as a whole on reload.
///
/// Readers take an `Arc` snapshot and keep translating against it even if a
/// new set is installed meanwhile; they never observe a half-built set.
#[derive(Debug, Default)]
pub struct SharedDictionaries {
    current: RwLock<Arc<DictionarySet>>,
}

impl SharedDictionaries {
    pub fn new(set: DictionarySet) -> Self {
        SharedDictionaries {
            current: RwLock::new(Arc::new(set)),
        }
    }

    pub fn snapshot(&self) -> Arc<DictionarySet> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Builds a new set from the current one and installs it, all under the
    /// write lock. Returns the set it replaced.
    pub fn update<F>(&self, f: F) -> Arc<DictionarySet>
    where
        F: FnOnce(&DictionarySet) -> DictionarySet,
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(f(&guard));
        std::mem::replace(&mut *guard, next)
    }
}

/// Splits a `key=value` line. Lines that do not contain exactly one `=` after
/// trimming yield `None`.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.trim().split('=');
    let key = parts.next()?;
    let value = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some((key, value))
}

/// Keeps the text before the first `/` or `|` alternative separator.
pub fn first_gloss(value: &str) -> &str {
    value
        .split(|c| c == '/' || c == '|')
        .next()
        .unwrap_or(value)
}

/// Builds the trie for `tier` from dictionary file contents.
pub fn load_trie_from_str(tier: DictionaryTier, content: &str) -> PrefixTrie {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut trie = PrefixTrie::new();
    trie.batch_insert(content.lines().filter_map(parse_line).map(|(key, value)| {
        if tier.keeps_first_gloss() {
            (key, first_gloss(value))
        } else {
            (key, value)
        }
    }));
    trie
}

/// Builds the single-character PhienAm map. Keys longer than one character can
/// never be looked up and are skipped with the malformed lines.
pub fn load_phien_am_from_str(content: &str) -> HashMap<char, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .lines()
        .filter_map(parse_line)
        .filter_map(|(key, value)| single_char(key).map(|ch| (ch, value.to_string())))
        .collect()
}

/// Reads and builds one trie tier from disk.
pub fn load_trie(tier: DictionaryTier, path: &Path) -> Result<(PrefixTrie, TierStatus)> {
    let started = Instant::now();
    let Some(content) = read_dictionary_file(tier, path)? else {
        return Ok((PrefixTrie::new(), TierStatus::missing(tier, path)));
    };

    let trie = load_trie_from_str(tier, &content);
    let status = TierStatus {
        tier,
        path: path.to_path_buf(),
        loaded: true,
        count: trie.count(),
        elapsed: started.elapsed(),
    };
    info!(
        "Loaded {} entries from {} in {:.2} seconds",
        trie.count(),
        path.display(),
        status.elapsed.as_secs_f64()
    );
    Ok((trie, status))
}

fn load_phien_am(path: &Path) -> Result<(HashMap<char, String>, TierStatus)> {
    let tier = DictionaryTier::ChinesePhienAm;
    let started = Instant::now();
    let Some(content) = read_dictionary_file(tier, path)? else {
        return Ok((HashMap::new(), TierStatus::missing(tier, path)));
    };

    let map = load_phien_am_from_str(&content);
    let status = TierStatus {
        tier,
        path: path.to_path_buf(),
        loaded: true,
        count: map.len(),
        elapsed: started.elapsed(),
    };
    info!(
        "Loaded {} Chinese words in {:.2} seconds",
        map.len(),
        status.elapsed.as_secs_f64()
    );
    Ok((map, status))
}

fn read_dictionary_file(tier: DictionaryTier, path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if tier.is_required() {
                return Err(QuickTranslatorError::MissingDictionary {
                    tier,
                    path: path.to_path_buf(),
                });
            }
            warn!(
                "{} not found. Proceeding without {} data.",
                path.display(),
                tier
            );
            Ok(None)
        }
        Err(e) => Err(QuickTranslatorError::io(path, e)),
    }
}

fn single_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(ch),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_requires_exactly_one_separator() {
        assert_eq!(parse_line("你好=xin chào"), Some(("你好", "xin chào")));
        assert_eq!(parse_line("  的=  \r"), Some(("的", "")));
        assert_eq!(parse_line("no separator"), None);
        assert_eq!(parse_line("a=b=c"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn first_gloss_handles_both_separators() {
        assert_eq!(first_gloss("đẹp/xinh đẹp/mỹ lệ"), "đẹp");
        assert_eq!(first_gloss("đi|tới"), "đi");
        assert_eq!(first_gloss("một"), "một");
        assert_eq!(first_gloss("/lead"), "");
    }

    #[test]
    fn names2_keeps_full_value_but_viet_phrase_does_not() {
        let content = "美丽=đẹp/xinh đẹp\n";
        let names2 = load_trie_from_str(DictionaryTier::Names2, content);
        let viet_phrase = load_trie_from_str(DictionaryTier::VietPhrase, content);
        let names = load_trie_from_str(DictionaryTier::Names, content);
        assert_eq!(names2.get("美丽"), Some("đẹp/xinh đẹp"));
        assert_eq!(viet_phrase.get("美丽"), Some("đẹp"));
        assert_eq!(names.get("美丽"), Some("đẹp"));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let content = "\u{feff}一=nhất\nbroken line\n二=nhị=extra\n\n三=tam\n";
        let trie = load_trie_from_str(DictionaryTier::VietPhrase, content);
        assert_eq!(trie.count(), 2);
        assert_eq!(trie.get("一"), Some("nhất"));
        assert_eq!(trie.get("三"), Some("tam"));
    }

    #[test]
    fn phien_am_only_keeps_single_characters() {
        let map = load_phien_am_from_str("我=ngã\n中国=trung quốc\n是=thị\n");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&'我').map(String::as_str), Some("ngã"));
    }

    #[test]
    fn shared_swap_keeps_old_snapshot_alive() {
        let mut names2 = PrefixTrie::new();
        names2.insert("张三", "Trương Tam");
        let shared = SharedDictionaries::new(DictionarySet::default());

        let before = shared.snapshot();
        let old = shared.update(|current| current.with_names2(names2));

        assert!(Arc::ptr_eq(&before, &old));
        assert!(before.names2.is_empty());
        assert_eq!(shared.snapshot().names2.get("张三"), Some("Trương Tam"));
    }

    #[test]
    fn concurrent_updates_are_never_lost() {
        let shared = SharedDictionaries::new(DictionarySet::default());

        std::thread::scope(|scope| {
            for i in 0..8 {
                let shared = &shared;
                scope.spawn(move || {
                    for j in 0..25 {
                        shared.update(|current| {
                            let mut names2: PrefixTrie = current.names2.entries().into_iter().collect();
                            names2.insert(&format!("{i}-{j}"), "x");
                            current.with_names2(names2)
                        });
                    }
                });
            }
        });

        assert_eq!(shared.snapshot().names2.entries().len(), 200);
    }

    #[test]
    fn snapshot_rebuilds_the_same_lookups() {
        let mut phien_am = HashMap::new();
        phien_am.insert('我', "Ngã".to_string());
        let set = DictionarySet::new(
            [("张三", "Trương Tam")].into_iter().collect(),
            PrefixTrie::new(),
            [("你好", "Xin chào"), ("的", "")].into_iter().collect(),
            phien_am,
        );

        let rebuilt = DictionarySet::from_snapshot(set.to_snapshot());
        assert_eq!(rebuilt.names2.get("张三"), Some("Trương Tam"));
        assert_eq!(rebuilt.viet_phrase.get("的"), Some(""));
        assert_eq!(rebuilt.phien_am('我'), Some("Ngã"));
        assert_eq!(rebuilt.to_snapshot(), set.to_snapshot());
    }

    #[test]
    fn snapshot_keeps_insert_counts_of_duplicate_keys() {
        let viet_phrase =
            load_trie_from_str(DictionaryTier::VietPhrase, "你好=xin chào\n你好=chào\n的=\n");
        assert_eq!(viet_phrase.count(), 3);
        let set = DictionarySet::new(PrefixTrie::new(), PrefixTrie::new(), viet_phrase, HashMap::new());

        let snapshot = set.to_snapshot();
        assert_eq!(snapshot.viet_phrase.len(), 2);
        let rebuilt = DictionarySet::from_snapshot(snapshot);
        assert_eq!(rebuilt.viet_phrase.count(), 3);
        assert_eq!(rebuilt.viet_phrase.get("你好"), Some("chào"));
    }

    #[test]
    fn compressed_snapshot_reports_tier_counts() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("dictionary.json.zst");
        let set = DictionarySet::new(
            [("张三", "Trương Tam")].into_iter().collect(),
            PrefixTrie::new(),
            [("你好", "Xin chào"), ("你好", "chào")].into_iter().collect(),
            [('我', "ngã".to_string())].into_iter().collect(),
        );
        set.save_compressed(&cache).unwrap();

        let (_, report) = DictionarySet::load_compressed(&cache).unwrap();
        assert!(report.iter().all(|status| status.loaded && status.path == cache));
        assert_eq!(report.names2.count, 1);
        assert_eq!(report.names.count, 0);
        assert_eq!(report.viet_phrase.count, 2);
        assert_eq!(report.chinese_phien_am.count, 1);
    }
}
