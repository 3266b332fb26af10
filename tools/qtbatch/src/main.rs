use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Arg, Command};
use encoding_rs::{Encoding, UTF_8};
use tempfile::NamedTempFile;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use walkdir::WalkDir;

use quick_translator_rs::dictionary_lib::DictionarySet;
use quick_translator_rs::{
    sanitize_filename, split_extension, CancelFlag, DictionaryPaths, QuickTranslator,
    TranslatorConfig,
};

const BLUE: &str = "\x1B[1;34m";
const RESET: &str = "\x1B[0m";
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = Command::new("QTBatch")
        .arg(
            Arg::new("input")
                .value_name("path")
                .required(true)
                .help("Novel .txt file, or a directory searched recursively for .txt files."),
        )
        .arg(
            Arg::new("output_dir")
                .short('o')
                .long("output-dir")
                .value_name("dir")
                .help("Write converted files to <dir> instead of next to each input."),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("file")
                .help("TOML configuration file."),
        )
        .arg(
            Arg::new("dict_dir")
                .short('d')
                .long("dict-dir")
                .value_name("dir")
                .help("Directory holding Names2.txt, Names.txt, VietPhrase.txt and ChinesePhienAmWords.txt."),
        )
        .arg(
            Arg::new("cache")
                .long("cache")
                .value_name("file")
                .help("Load dictionaries from a dict-generate snapshot (.json.zst)."),
        )
        .arg(
            Arg::new("in_enc")
                .long("in-enc")
                .value_name("encoding")
                .help("Input encoding. Without it the configured encodings are tried in order."),
        )
        .about(format!(
            "{BLUE}QTBatch: batch Chinese to Sino-Vietnamese novel converter{RESET}"
        ))
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => TranslatorConfig::load(path)?,
        None => TranslatorConfig::default(),
    };
    if let Some(dir) = matches.get_one::<String>("dict_dir") {
        config.dictionaries = DictionaryPaths::in_dir(dir);
    }
    if let Some(encoding) = matches.get_one::<String>("in_enc") {
        config.conversion.encodings = vec![encoding.clone()];
    }

    let translator = match matches.get_one::<String>("cache") {
        Some(cache) => {
            let (set, report) = DictionarySet::load_compressed(cache)
                .with_context(|| format!("Cannot load dictionary snapshot {cache}"))?;
            eprint!("{BLUE}{report}{RESET}");
            QuickTranslator::with_dictionaries(set, &config)
        }
        None => {
            let (translator, report) = QuickTranslator::load(&config)
                .context("Dictionaries must be loaded before conversion can start")?;
            eprint!("{BLUE}{report}{RESET}");
            translator
        }
    };

    let input = PathBuf::from(
        matches
            .get_one::<String>("input")
            .context("missing input path")?,
    );
    let output_dir = matches.get_one::<String>("output_dir").map(PathBuf::from);
    if let Some(dir) = &output_dir {
        fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
    }

    let novels = collect_novels(&input, &config.conversion.output_suffix)?;
    if novels.is_empty() {
        bail!("No .txt files found at {}", input.display());
    }

    let cancel = CancelFlag::new();
    let mut failures = 0;
    for novel in &novels {
        if let Err(err) = convert_novel(&translator, &config, novel, output_dir.as_deref(), &cancel) {
            warn!("Conversion of {} failed: {err:#}", novel.display());
            failures += 1;
        }
    }

    eprintln!(
        "{BLUE}Converted {} of {} file(s){RESET}",
        novels.len() - failures,
        novels.len()
    );
    if failures > 0 {
        bail!("{failures} file(s) could not be converted");
    }
    Ok(())
}

/// The input itself, or every `.txt` below it that is not already a converted output.
fn collect_novels(input: &Path, output_suffix: &str) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("{} does not exist", input.display());
    }

    let mut novels = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        let is_txt = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("txt"));
        let is_output = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map_or(false, |stem| !output_suffix.is_empty() && stem.ends_with(output_suffix));
        if entry.file_type().is_file() && is_txt && !is_output {
            novels.push(path.to_path_buf());
        }
    }
    Ok(novels)
}

fn convert_novel(
    translator: &QuickTranslator,
    config: &TranslatorConfig,
    novel: &Path,
    output_dir: Option<&Path>,
    cancel: &CancelFlag,
) -> Result<()> {
    let started = Instant::now();
    let bytes = fs::read(novel).with_context(|| format!("Cannot read {}", novel.display()))?;
    let (text, encoding) = decode_novel(&bytes, &config.conversion.encodings)?;
    info!(
        "Read {} ({} bytes) using {} encoding",
        novel.display(),
        bytes.len(),
        encoding
    );

    let converted = translator.translate_document(&text, cancel, |done, total| {
        if done == total || done % 1000 == 0 {
            info!("{}: {done}/{total} paragraphs", novel.display());
        }
    })?;

    let file_name = novel
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_name = output_file_name(translator, &file_name, &config.conversion.output_suffix);
    let target_dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => novel
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let written = write_output(&target_dir, &output_name, &converted)?;

    eprintln!(
        "{BLUE}Conversion complete: {} -> {} ({:.2} seconds){RESET}",
        novel.display(),
        written.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Decodes with the first encoding that accepts the bytes without replacement.
fn decode_novel(bytes: &[u8], encodings: &[String]) -> Result<(String, &'static str)> {
    for label in encodings {
        let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
            warn!("Unsupported encoding label: {label}");
            continue;
        };
        let input = if encoding == UTF_8 {
            bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
        } else {
            bytes
        };
        match encoding.decode_without_bom_handling_and_without_replacement(input) {
            Some(text) => return Ok((text.into_owned(), encoding.name())),
            None => warn!("Failed to read with {label} encoding."),
        }
    }
    bail!("Unable to read the novel file with any of the attempted encodings.")
}

/// `<translated stem><suffix><extension>`. Only the last extension is split
/// off; dots inside the stem are translated along with it.
fn output_file_name(translator: &QuickTranslator, file_name: &str, suffix: &str) -> String {
    let (stem, extension) = split_extension(file_name);
    let converted = sanitize_filename(&translator.translate_paragraph(stem));
    format!("{converted}{suffix}{extension}")
}

/// Writes through a temp file in `dir`. If the translated name cannot be used,
/// falls back to `Converted_Novel_<unix seconds>.txt`.
fn write_output(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Cannot create a temporary file in {}", dir.display()))?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;

    let target = dir.join(file_name);
    match tmp.persist(&target) {
        Ok(_) => Ok(target),
        Err(err) => {
            warn!("Used shortened filename due to error: {}", err.error);
            let secs = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            let fallback = dir.join(format!("Converted_Novel_{secs}.txt"));
            err.file
                .persist(&fallback)
                .with_context(|| format!("Cannot write {}", fallback.display()))?;
            Ok(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_translator_rs::dictionary_lib::PrefixTrie;
    use std::collections::HashMap;

    fn translator() -> QuickTranslator {
        let phien_am: HashMap<char, String> = [('第', "đệ"), ('章', "chương")]
            .into_iter()
            .map(|(ch, reading)| (ch, reading.to_string()))
            .collect();
        let set = DictionarySet::new(
            [("三国", "Tam Quốc")].into_iter().collect(),
            PrefixTrie::new(),
            [("演义", "diễn nghĩa")].into_iter().collect(),
            phien_am,
        );
        QuickTranslator::with_dictionaries(set, &TranslatorConfig::default())
    }

    #[test]
    fn output_name_keeps_extension_after_suffix() {
        assert_eq!(
            output_file_name(&translator(), "三国演义.txt", "_Converted"),
            "Tam Quốc diễn nghĩa_Converted.txt"
        );
    }

    #[test]
    fn output_name_translates_dotted_stem() {
        let name = output_file_name(&translator(), "第1.5章.txt", "_Converted");
        assert_eq!(name, "Đệ 1. 5 chương_Converted.txt");
        assert!(!name.contains('章'));
    }

    #[test]
    fn output_name_strips_illegal_chars() {
        assert_eq!(
            output_file_name(&translator(), "三国：演义？.txt", "_Converted"),
            "Tam Quốc Diễn nghĩa_Converted.txt"
        );
    }

    #[test]
    fn decode_falls_back_to_gbk() {
        let (gbk_bytes, _, _) = encoding_rs::GBK.encode("三国演义");
        let encodings = vec!["utf-8".to_string(), "gbk".to_string()];
        let (text, name) = decode_novel(&gbk_bytes, &encodings).unwrap();
        assert_eq!(text, "三国演义");
        assert_eq!(name, "GBK");
    }

    #[test]
    fn decode_strips_utf8_bom() {
        let bytes = [UTF8_BOM, "你好".as_bytes()].concat();
        let (text, name) = decode_novel(&bytes, &["utf-8".to_string()]).unwrap();
        assert_eq!(text, "你好");
        assert_eq!(name, "UTF-8");
    }

    #[test]
    fn write_output_creates_target() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_output(dir.path(), "out.txt", "Xin chào").unwrap();
        assert_eq!(written, dir.path().join("out.txt"));
        assert_eq!(fs::read_to_string(written).unwrap(), "Xin chào");
    }
}
