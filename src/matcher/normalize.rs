//! Unicode title normalization (§4.8). A single owned function produces a
//! sort key; a complementary function expands a query into search variants
//! so repositories can OR-match across what embedded SQL engines only
//! case-fold over ASCII.

use unicode_normalization::UnicodeNormalization;

const LEADING_ARTICLES: &[&str] = &["the", "le", "la", "les", "l'", "el", "los", "las", "un", "une"];

const LIGATURES: &[(char, &str)] = &[('œ', "oe"), ('Œ', "OE"), ('æ', "ae"), ('Æ', "AE")];

fn expand_ligatures(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if let Some((_, rep)) = LIGATURES.iter().find(|(l, _)| *l == c) {
            out.push_str(rep);
        } else {
            out.push(c);
        }
    }
    out
}

fn strip_zero_width(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '\u{200B}'..='\u{200F}' | '\u{FEFF}' | '\u{202A}'..='\u{202E}'))
        .collect()
}

fn fold_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

const fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}' | '\u{1AB0}'..='\u{1AFF}' | '\u{1DC0}'..='\u{1DFF}')
}

fn strip_leading_non_alphanumeric(s: &str) -> &str {
    s.trim_start_matches(|c: char| !c.is_alphanumeric())
}

fn strip_leading_article(s: &str) -> String {
    let lower = s.to_lowercase();
    for article in LEADING_ARTICLES {
        let prefix = if article.ends_with('\'') {
            (*article).to_string()
        } else {
            format!("{article} ")
        };
        if lower.starts_with(&prefix) {
            return s[prefix.len()..].trim_start().to_string();
        }
    }
    s.to_string()
}

/// Sort/compare key for a title: ligature-expanded, NFD-folded,
/// article-stripped, lowercased. Two titles that differ only by accents,
/// leading article, or case collapse to the same key.
#[must_use]
pub fn sort_key(title: &str) -> String {
    let s = strip_zero_width(title);
    let s = expand_ligatures(&s);
    let s = strip_leading_non_alphanumeric(&s);
    let s = strip_leading_article(s);
    let s = fold_accents(&s);
    s.to_lowercase()
}

/// Emits `{original, ligature-expanded, ligature-collapsed, accent-folded,
/// lowercase}` variants of `query` for OR-based LIKE searches (§4.8).
#[must_use]
pub fn search_variants(query: &str) -> Vec<String> {
    let mut variants = Vec::new();
    let mut push_unique = |v: String| {
        if !v.is_empty() && !variants.contains(&v) {
            variants.push(v);
        }
    };

    push_unique(query.to_string());
    push_unique(query.to_lowercase());
    push_unique(expand_ligatures(query));
    push_unique(collapse_ligatures(query));
    push_unique(fold_accents(query));
    push_unique(fold_accents(&query.to_lowercase()));

    variants
}

fn collapse_ligatures(s: &str) -> String {
    s.replace("oe", "œ").replace("ae", "æ")
}

/// Token-set ratio (0-100) between two titles, normalized with [`sort_key`]
/// before comparison (§4.3). Tokens are split on whitespace and compared as
/// sets so reordered words still score highly.
#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let ka = sort_key(a);
    let kb = sort_key(b);
    if ka == kb {
        return 100.0;
    }

    let mut tokens_a: Vec<&str> = ka.split_whitespace().collect();
    let mut tokens_b: Vec<&str> = kb.split_whitespace().collect();
    tokens_a.sort_unstable();
    tokens_b.sort_unstable();
    tokens_a.dedup();
    tokens_b.dedup();

    let sorted_a = tokens_a.join(" ");
    let sorted_b = tokens_b.join(" ");

    strsim::normalized_levenshtein(&sorted_a, &sorted_b) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_strips_leading_article() {
        assert_eq!(sort_key("The Matrix"), sort_key("Matrix"));
    }

    #[test]
    fn sort_key_expands_ligatures() {
        assert_eq!(sort_key("Sœur"), sort_key("Soeur"));
    }

    #[test]
    fn sort_key_folds_accents() {
        assert_eq!(sort_key("Amélie"), sort_key("Amelie"));
    }

    #[test]
    fn token_set_ratio_ignores_word_order() {
        let r = token_set_ratio("Lord of the Rings", "Rings of the Lord");
        assert!((r - 100.0).abs() < 1.0, "expected ~100, got {r}");
    }

    #[test]
    fn token_set_ratio_low_for_unrelated_titles() {
        let r = token_set_ratio("Inception", "Paddington");
        assert!(r < 60.0, "expected low score, got {r}");
    }

    #[test]
    fn search_variants_includes_original_and_lowercase() {
        let variants = search_variants("Amélie");
        assert!(variants.contains(&"Amélie".to_string()));
        assert!(variants.contains(&"amélie".to_string()));
    }
}
