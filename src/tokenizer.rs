use regex::Regex;
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+|\S+").expect("Failed to compile token regex"));

/// Stripped from both ends of a clicked word. U+0387 is the Greek ano teleia,
/// which renders like the middle dot.
const CLICK_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '·', '\u{0387}', '[', ']', '(', ')',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Char offset of the token within the tokenized run.
    pub offset: usize,
}

impl Token<'_> {
    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Splits a run into alternating whitespace and word tokens.
/// Concatenating the token texts in order gives back `run` unchanged.
pub fn tokenize(run: &str) -> Vec<Token<'_>> {
    let mut offset = 0;
    TOKEN_RE
        .find_iter(run)
        .map(|m| {
            let text = m.as_str();
            let kind = if text.starts_with(char::is_whitespace) {
                TokenKind::Whitespace
            } else {
                TokenKind::Word
            };
            let token = Token { kind, text, offset };
            offset += token.char_len();
            token
        })
        .collect()
}

/// The word a click on `text` should report, or `None` when nothing but
/// punctuation and whitespace is left.
pub fn clicked_word(text: &str) -> Option<&str> {
    let word = text.trim_matches(|c: char| c.is_whitespace() || CLICK_PUNCTUATION.contains(&c));
    if word.is_empty() { None } else { Some(word) }
}

/// Reports a click on `token` through `on_click`. Whitespace tokens and
/// punctuation-only words are never reported.
pub fn report_word_click(token: &Token<'_>, on_click: impl FnOnce(&str)) -> bool {
    if !token.is_word() {
        return false;
    }
    match clicked_word(token.text) {
        Some(word) => {
            on_click(word);
            true
        }
        None => false,
    }
}
