//! Title normalization for artifact URLs.
//!
//! A raw title goes through [`trim`], [`capitalize_words`], [`diacritic_fold`]
//! and [`escape`], in that order. [`normalize_title`] runs the whole chain.

/// Words kept lowercase unless they open the title
const PREPOSITIONS: [&str; 5] = ["do", "da", "de", "e", "das"];

/// Words rendered fully uppercase
const ROMAN_NUMERALS: [&str; 10] = ["i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x"];

/// Full URL-segment normalization of a raw title
pub fn normalize_title(raw: &str) -> String {
    escape(&diacritic_fold(&capitalize_words(trim(raw))))
}

/// Removes leading and trailing whitespace
pub fn trim(text: &str) -> &str {
    text.trim()
}

/// Title-cases `input` under Portuguese capitalization rules.
///
/// Prepositions stay lowercase except as the first word, roman numerals are
/// uppercased, every other word is lowercased with an uppercase first letter.
/// Words are rejoined with single spaces.
pub fn capitalize_words(input: &str) -> String {
    input
        .split_whitespace()
        .enumerate()
        .map(|(position, word)| {
            let lower = word.to_lowercase();
            if ROMAN_NUMERALS.contains(&lower.as_str()) {
                word.to_uppercase()
            } else if position > 0 && PREPOSITIONS.contains(&lower.as_str()) {
                lower
            } else {
                capitalize_first(&lower)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Replaces accented vowels and cedillas with their ASCII letters
pub fn diacritic_fold(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'ã' | 'â' => 'a',
        'é' | 'è' | 'ê' => 'e',
        'í' | 'ì' | 'î' => 'i',
        'ó' | 'ò' | 'õ' | 'ô' => 'o',
        'ú' | 'ù' | 'û' => 'u',
        'ç' => 'c',
        // Capitalization can put an accented letter first; these fold too,
        // so `Ética` yields `Etica` where the site's own links keep the accent
        'Á' | 'À' | 'Ã' | 'Â' => 'A',
        'É' | 'È' | 'Ê' => 'E',
        'Í' | 'Ì' | 'Î' => 'I',
        'Ó' | 'Ò' | 'Õ' | 'Ô' => 'O',
        'Ú' | 'Ù' | 'Û' => 'U',
        'Ç' => 'C',
        other => other,
    }
}

/// Makes a folded title safe to splice into the artifact URL.
///
/// Spaces and slashes must become `%20` before `N.` collapses to `N`.
pub fn escape(text: &str) -> String {
    text.replace([' ', '/'], "%20")
        .replace("N.", "N")
        .replace(':', "")
        .replace('.', "%20")
        .replace(['(', ')'], "")
}
