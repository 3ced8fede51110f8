//! Deterministic cleanup pass for raw OCR output.
//!
//! Handwriting OCR produces predictable artifacts: pipes where an "l" was,
//! zeros inside words, wrong accent glyphs, broken sentences, stray noise
//! lines. This pass fixes them with pattern-based, context-local rules only —
//! no external calls, no model. Safe to recompute any number of times from
//! the same input.

use once_cell::sync::Lazy;
use regex::Regex;

/// Glyphs Tesseract commonly emits in place of a lowercase "l".
static L_ARTIFACTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[|¦]").unwrap());

/// Accented-vowel misreads folded to the canonical Spanish form.
static ACCENT_FOLDS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"[àâä]", "á"),
        (r"[èêë]", "é"),
        (r"[ìîï]", "í"),
        (r"[òôö]", "ó"),
        (r"[ùûü]", "ú"),
    ]
    .iter()
    .map(|(pat, rep)| (Regex::new(pat).unwrap(), *rep))
    .collect()
});

/// Three or more whitespace characters on one line.
static SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]{3,}").unwrap());

/// Three or more newlines (blank lines may carry stray spaces).
static BLANK_LINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n([^\S\n]*\n){2,}").unwrap());

/// Sentence-ending punctuation, a single line break, then a lowercase letter:
/// a sentence the line segmenter broke in half.
static BROKEN_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?])[^\S\n]*\n[^\S\n]*([a-záéíóúüñ])").unwrap());

/// Whitespace squeezed in before punctuation ("word ,").
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+([.,;:!?])").unwrap());

/// Punctuation followed by a letter — force exactly one space between them.
static PUNCT_THEN_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.,;:!?])[^\S\n]*(\p{L})").unwrap());

/// A lone space between a word's final letter and its closing punctuation.
static LETTER_SPACE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{L})[^\S\n]+([.!?])").unwrap());

/// Punctuation and paired marks that may legitimately stand alone on a line.
const KEPT_SYMBOLS: &str = ".!?¿¡,;:()[]{}'\"«»\u{201C}\u{201D}\u{2018}\u{2019}—–-";

/// Clean raw OCR text. Pure and total: identical input always yields
/// identical output, empty input yields the empty string.
///
/// The rule list is applied in a fixed order; because removing a noise line
/// can expose a broken sentence for the line-join rule, the whole list is
/// re-applied until the text stops changing (observed to converge within two
/// passes, capped at three).
pub fn normalize(raw: &str) -> String {
    let mut out = apply_rules(raw);
    for _ in 0..2 {
        let next = apply_rules(&out);
        if next == out {
            break;
        }
        out = next;
    }
    out
}

fn apply_rules(text: &str) -> String {
    let mut cleaned = L_ARTIFACTS.replace_all(text, "l").into_owned();
    cleaned = disambiguate_o_zero(&cleaned);
    for (pat, rep) in ACCENT_FOLDS.iter() {
        cleaned = pat.replace_all(&cleaned, *rep).into_owned();
    }
    cleaned = SPACE_RUNS.replace_all(&cleaned, " ").into_owned();
    cleaned = BLANK_LINE_RUNS.replace_all(&cleaned, "\n\n").into_owned();
    cleaned = BROKEN_SENTENCE.replace_all(&cleaned, "$1 $2").into_owned();
    cleaned = drop_noise_lines(&cleaned);
    cleaned = SPACE_BEFORE_PUNCT.replace_all(&cleaned, "$1").into_owned();
    cleaned = PUNCT_THEN_LETTER.replace_all(&cleaned, "$1 $2").into_owned();
    cleaned = LETTER_SPACE_PUNCT.replace_all(&cleaned, "$1$2").into_owned();
    cleaned.trim().to_string()
}

/// `0` and `O` sandwiched between letters are almost always a misread `o`.
/// Only immediate neighbors count; "0 apples" and "10" stay untouched.
fn disambiguate_o_zero(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == '0' || c == 'O' {
            let prev_is_letter = i > 0 && chars[i - 1].is_ascii_alphabetic();
            let next_is_letter = chars
                .get(i + 1)
                .map(|n| n.is_ascii_alphabetic())
                .unwrap_or(false);
            if prev_is_letter && next_is_letter {
                out.push('o');
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Delete lines that consist of a single stray symbol — isolated OCR noise
/// like a lone `#` or `~` between paragraphs.
fn drop_noise_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !is_noise_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_noise_line(line: &str) -> bool {
    let mut chars = line.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => !(c.is_alphanumeric() || c == '_' || KEPT_SYMBOLS.contains(c)),
        _ => false,
    }
}
