use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Arg, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quick_translator_rs::{load_dictionary_set, DictionaryPaths, TranslatorConfig};

fn main() -> Result<()> {
    const BLUE: &str = "\x1B[1;34m"; // Bold Blue
    const RESET: &str = "\x1B[0m"; // Reset color

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = Command::new("Dictionary Generator")
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("format")
                .default_value("zstd")
                .help("Dictionary format: [zstd|json]"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("filename")
                .help("Write generated dictionary to <filename>. If not specified, a default filename is used."),
        )
        .arg(
            Arg::new("dict_dir")
                .short('d')
                .long("dict-dir")
                .value_name("dir")
                .help("Directory holding the dictionary .txt files (default: current directory)."),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("file")
                .help("TOML configuration naming the dictionary files."),
        )
        .about(format!(
            "{BLUE}Dict Generator: compile Names2/Names/VietPhrase/PhienAm into one snapshot{RESET}"
        ))
        .get_matches();

    let mut paths = match matches.get_one::<String>("config") {
        Some(path) => TranslatorConfig::load(path)?.dictionaries,
        None => DictionaryPaths::default(),
    };
    if let Some(dir) = matches.get_one::<String>("dict_dir") {
        let dir = Path::new(dir);
        if !dir.is_dir() {
            bail!("Dictionary directory {} not found", dir.display());
        }
        paths = DictionaryPaths::in_dir(dir);
    }

    let dict_format = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("zstd");

    let default_output = match dict_format {
        "zstd" => "dictionary.json.zst",
        "json" => "dictionary.json",
        _ => "dictionary.unknown",
    };

    let output_file = matches
        .get_one::<String>("output")
        .map(|s| s.as_str())
        .unwrap_or(default_output);

    generate(&paths, dict_format, output_file)?;
    eprintln!("{BLUE}Dictionary saved in {dict_format} format at: {output_file}{RESET}");
    Ok(())
}

fn generate(paths: &DictionaryPaths, dict_format: &str, output_file: &str) -> Result<()> {
    if !matches!(dict_format, "zstd" | "json") {
        bail!("Unsupported format: {dict_format}");
    }

    let (dictionaries, report) =
        load_dictionary_set(paths).context("Cannot build dictionary snapshot")?;
    eprint!("{report}");
    if dict_format == "zstd" {
        dictionaries.save_compressed(output_file)?;
    } else {
        dictionaries.serialize_to_json(output_file)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn unsupported_format_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("dictionary.xml");
        let err = generate(
            &DictionaryPaths::in_dir(dir.path()),
            "xml",
            output.to_str().unwrap(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unsupported format: xml"));
        assert!(!output.exists());
    }

    #[test]
    fn json_format_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("VietPhrase.txt"), "你好=Xin chào\n").unwrap();
        let output = dir.path().join("dictionary.json");
        generate(
            &DictionaryPaths::in_dir(dir.path()),
            "json",
            output.to_str().unwrap(),
        )
        .unwrap();
        assert!(fs::read_to_string(output).unwrap().contains("Xin chào"));
    }
}
