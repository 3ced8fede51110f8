//! Date detection over normalized OCR text.
//!
//! Journal pages usually carry the entry date somewhere in the handwriting.
//! This scan finds date-like substrings so the caller can tell the user how
//! many were spotted. Purely advisory — the text is never modified.

use once_cell::sync::Lazy;
use regex::Regex;

/// Numeric `D-M-YY(YY)` / `D/M/YY(YY)` or spelled-out Spanish
/// `D de <mes> de YYYY`.
static DATE_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})[-/](\d{1,2})[-/](\d{2,4})|(\d{1,2}) de (\w+) de (\d{4})").unwrap()
});

/// Return every date-like substring found in `text`, in order of appearance.
pub fn find_dates(text: &str) -> Vec<&str> {
    DATE_LIKE.find_iter(text).map(|m| m.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_numeric_dates() {
        let found = find_dates("El 12/3/2024 fuimos al parque. Volvimos el 1-4-24.");
        assert_eq!(found, vec!["12/3/2024", "1-4-24"]);
    }

    #[test]
    fn finds_spelled_out_spanish_dates() {
        let found = find_dates("Hoy es 5 de marzo de 2024 y llueve.");
        assert_eq!(found, vec!["5 de marzo de 2024"]);
    }

    #[test]
    fn ignores_text_without_dates() {
        assert!(find_dates("un día cualquiera sin fecha").is_empty());
        assert!(find_dates("").is_empty());
    }
}
