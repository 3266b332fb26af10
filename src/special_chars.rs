//! Typography pre-pass applied to raw Chinese text before tokenizing.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::debug;

// CJK punctuation with no fullwidth-ASCII counterpart.
static SPECIAL_CHARS: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
    [
        ('。', "."),
        ('、', ","),
        ('「', "“"),
        ('」', "”"),
        ('『', "‘"),
        ('』', "’"),
        ('《', "«"),
        ('》', "»"),
        ('〈', "⟨"),
        ('〉', "⟩"),
        ('【', "["),
        ('】', "]"),
        ('〔', "["),
        ('〕', "]"),
        ('〖', "["),
        ('〗', "]"),
        ('…', "..."),
        ('—', "-"),
        ('·', " "),
        ('・', " "),
        ('\u{3000}', " "),
    ]
    .into_iter()
    .collect()
});

const FULLWIDTH_START: u32 = 0xFF01;
const FULLWIDTH_END: u32 = 0xFF5E;
const FULLWIDTH_OFFSET: u32 = 0xFEE0;

/// Folds a fullwidth ASCII form (`！` … `～`) onto its ASCII character.
#[inline]
fn fold_fullwidth(ch: char) -> Option<char> {
    let code = ch as u32;
    if (FULLWIDTH_START..=FULLWIDTH_END).contains(&code) {
        char::from_u32(code - FULLWIDTH_OFFSET)
    } else {
        None
    }
}

#[inline]
fn is_special(ch: char) -> bool {
    SPECIAL_CHARS.contains_key(&ch) || fold_fullwidth(ch).is_some()
}

/// Replaces CJK punctuation and fullwidth forms with the characters used in
/// Vietnamese typography. Fullwidth letters and digits become ASCII, so they are
/// later picked up as Latin runs.
pub fn replace_special_chars(text: &str) -> String {
    if !text.chars().any(is_special) {
        return text.to_owned();
    }

    let mut replaced = String::with_capacity(text.len());
    for ch in text.chars() {
        if let Some(viet) = SPECIAL_CHARS.get(&ch) {
            replaced.push_str(viet);
        } else if let Some(ascii) = fold_fullwidth(ch) {
            replaced.push(ascii);
        } else {
            replaced.push(ch);
        }
    }

    debug!("Special characters replaced: '{}' -> '{}'", text, replaced);
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_sentence_punctuation() {
        assert_eq!(replace_special_chars("你好，世界！"), "你好,世界!");
        assert_eq!(replace_special_chars("结束。"), "结束.");
        assert_eq!(replace_special_chars("「说」"), "“说”");
        assert_eq!(replace_special_chars("等等……"), "等等......");
    }

    #[test]
    fn folds_fullwidth_alphanumerics() {
        assert_eq!(replace_special_chars("ＡＢＣ１２３"), "ABC123");
        assert_eq!(replace_special_chars("（注）"), "(注)");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(replace_special_chars("张三abc"), "张三abc");
        assert_eq!(replace_special_chars(""), "");
    }
}
