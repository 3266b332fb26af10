//! Reassembles translated tokens into spaced, capitalized prose.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// Tokens that attach to the previous word without a separating space.
const NON_WORD_TOKENS: [&str; 10] = ["\"", "[", "{", " ", ",", "!", "?", ";", "'", "."];

static AFTER_OPENING: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\[“‘])\s*(\w)").unwrap());
static BEFORE_CLOSING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([”’\]])").unwrap());
static AFTER_SENTENCE_MARK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([?!⟨:«])\s+(\w)").unwrap());
static BEFORE_TRAILING_MARK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([;:?!.])").unwrap());

/// Joins `tokens` into a sentence.
///
/// The first word is capitalized, words are separated by single spaces,
/// punctuation tokens attach to the word before them and blank tokens collapse
/// into one space. The assembled text then goes through the punctuation passes
/// in [`normalize_punctuation`].
pub fn rephrase<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut assembled = String::new();
    let mut upper = false;
    let mut last_token_empty = false;

    for (i, token) in tokens.iter().enumerate() {
        let token = token.as_ref();

        if token.trim().is_empty() {
            if i > 0 && !last_token_empty {
                assembled.push(' ');
            }
            last_token_empty = true;
            continue;
        }

        let non_word = NON_WORD_TOKENS.contains(&token);
        if i == 0 || (!upper && !non_word) {
            if !assembled.is_empty() && !last_token_empty {
                assembled.push(' ');
            }
            push_capitalized(&mut assembled, token);
            upper = true;
        } else {
            if !non_word && !last_token_empty {
                assembled.push(' ');
            }
            assembled.push_str(token);
        }
        last_token_empty = false;
    }

    normalize_punctuation(assembled.trim())
}

/// Applies the spacing and capitalization passes, in this order:
///
/// 1. after `[`, `“`, `‘`: drop whitespace, uppercase the next letter
/// 2. before `”`, `’`, `]`: drop whitespace
/// 3. after `?`, `!`, `⟨`, `:`, `«` and whitespace: one space, uppercase the next letter
/// 4. before `;`, `:`, `?`, `!`, `.`: drop whitespace
/// 5. after a lone `.` (not part of `..`) and whitespace: one space, uppercase the next letter
///
/// Each pass reads the output of the previous one.
pub fn normalize_punctuation(text: &str) -> String {
    let text = AFTER_OPENING.replace_all(text, |caps: &Captures| {
        format!("{}{}", &caps[1], caps[2].to_uppercase())
    });
    let text = BEFORE_CLOSING.replace_all(&text, "$1");
    let text = AFTER_SENTENCE_MARK.replace_all(&text, |caps: &Captures| {
        format!("{} {}", &caps[1], caps[2].to_uppercase())
    });
    let text = BEFORE_TRAILING_MARK.replace_all(&text, "$1");
    capitalize_after_period(&text)
}

fn push_capitalized(out: &mut String, token: &str) {
    let mut chars = token.chars();
    if let Some(first) = chars.next() {
        if first.is_uppercase() {
            out.push(first);
        } else {
            out.extend(first.to_uppercase());
        }
        out.push_str(chars.as_str());
    }
}

#[inline]
fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

// The regex crate has no lookaround, so the "single dot" rule is a scan.
fn capitalize_after_period(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        out.push(ch);
        i += 1;

        if ch != '.' {
            continue;
        }
        let after_dot = i >= 2 && chars[i - 2] == '.';
        let before_dot = chars.get(i) == Some(&'.');
        if after_dot || before_dot {
            continue;
        }

        let mut j = i;
        while j < chars.len() && chars[j].is_whitespace() {
            j += 1;
        }
        if j > i && j < chars.len() && is_word_char(chars[j]) {
            out.push(' ');
            out.extend(chars[j].to_uppercase());
            i = j + 1;
        }
    }

    out
}
