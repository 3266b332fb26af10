use crate::dictionary_lib::{DictionarySet, PrefixTrie};
use crate::special_chars::replace_special_chars;

/// Where a token's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSource {
    Names2,
    Names,
    VietPhrase,
    /// Single-character reading from the PhienAm map.
    PhienAm,
    /// A run of ASCII letters and digits copied verbatim.
    Latin,
    /// An input character no dictionary knows, copied verbatim.
    Passthrough,
}

/// One unit of translated, not yet formatted output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub source: TokenSource,
}

impl Token {
    pub fn new(text: impl Into<String>, source: TokenSource) -> Self {
        Token {
            text: text.into(),
            source,
        }
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Runs the special-character pre-pass, then [`tokenize`].
pub fn convert_to_sino_vietnamese(text: &str, dictionaries: &DictionarySet) -> Vec<Token> {
    let text = replace_special_chars(text);
    tokenize(&text, dictionaries)
}

/// Splits `text` into tokens with a fixed lookup chain per position:
/// ASCII run, names2, names, VietPhrase, then the PhienAm reading or the
/// character itself.
///
/// Tiers are strictly ordered; a shorter match in a higher tier beats a longer
/// one below it. Every step consumes at least one character, so the scan is
/// linear in the number of positions and never backtracks.
pub fn tokenize(text: &str, dictionaries: &DictionarySet) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let consumed = next_token(rest, dictionaries, &mut tokens);
        rest = &rest[consumed..];
    }

    tokens
}

/// Emits at most one token for the start of `rest` and returns the number of
/// bytes consumed (always > 0 for non-empty input).
fn next_token(rest: &str, dictionaries: &DictionarySet, tokens: &mut Vec<Token>) -> usize {
    let latin_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    if latin_len > 0 {
        tokens.push(Token::new(&rest[..latin_len], TokenSource::Latin));
        return latin_len;
    }

    let tries: [(&PrefixTrie, TokenSource); 3] = [
        (&*dictionaries.names2, TokenSource::Names2),
        (&*dictionaries.names, TokenSource::Names),
        (&*dictionaries.viet_phrase, TokenSource::VietPhrase),
    ];
    for (trie, source) in tries {
        let (prefix, value) = trie.find_longest_prefix(rest);
        if prefix.is_empty() {
            continue;
        }
        let value = value.unwrap_or_default();
        // An empty VietPhrase value deletes the matched function word.
        if !(source == TokenSource::VietPhrase && value.is_empty()) {
            tokens.push(Token::new(value, source));
        }
        return prefix.len();
    }

    let mut chars = rest.chars();
    let Some(ch) = chars.next() else {
        return 0;
    };
    match dictionaries.phien_am(ch) {
        Some(reading) => tokens.push(Token::new(reading, TokenSource::PhienAm)),
        None => tokens.push(Token::new(ch, TokenSource::Passthrough)),
    }
    ch.len_utf8()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn dictionaries() -> DictionarySet {
        let mut phien_am = HashMap::new();
        phien_am.insert('我', "Ngã".to_string());
        phien_am.insert('是', "Thị".to_string());
        phien_am.insert('中', "trung".to_string());
        DictionarySet::new(
            [("张三", "Trương Tam"), ("王", "Vương")].into_iter().collect(),
            [("李四", "Lý Tứ")].into_iter().collect(),
            [("你好", "Xin chào"), ("的", ""), ("王大锤子", "búa lớn")]
                .into_iter()
                .collect(),
            phien_am,
        )
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn empty_input_gives_no_tokens() {
        assert!(convert_to_sino_vietnamese("", &dictionaries()).is_empty());
    }

    #[test]
    fn latin_runs_pass_through_whole() {
        let tokens = convert_to_sino_vietnamese("中abc文", &dictionaries());
        assert_eq!(texts(&tokens), vec!["trung", "abc", "文"]);
        assert_eq!(tokens[1].source, TokenSource::Latin);
        assert_eq!(tokens[2].source, TokenSource::Passthrough);
    }

    #[test]
    fn higher_tier_wins_even_when_shorter() {
        let tokens = tokenize("王大锤子", &dictionaries());
        assert_eq!(tokens[0], Token::new("Vương", TokenSource::Names2));
        assert_eq!(texts(&tokens), vec!["Vương", "大", "锤", "子"]);
    }

    #[test]
    fn empty_viet_phrase_value_consumes_without_emitting() {
        let tokens = tokenize("我的", &dictionaries());
        assert_eq!(texts(&tokens), vec!["Ngã"]);
    }

    #[test]
    fn literal_round_trip_tokens() {
        let tokens = convert_to_sino_vietnamese("张三和李四说你好，我是中国人。", &dictionaries());
        assert_eq!(
            texts(&tokens),
            vec!["Trương Tam", "和", "Lý Tứ", "说", "Xin chào", ",", "Ngã", "Thị", "trung", "国", "人", "."]
        );
        assert_eq!(tokens[0].source, TokenSource::Names2);
        assert_eq!(tokens[2].source, TokenSource::Names);
        assert_eq!(tokens[4].source, TokenSource::VietPhrase);
    }

    #[test]
    fn unknown_characters_never_panic() {
        let input = "🦀\u{0}\u{10FFFF}é";
        let tokens = tokenize(input, &DictionarySet::default());
        assert_eq!(texts(&tokens), vec!["🦀", "\u{0}", "\u{10FFFF}", "é"]);
    }
}
