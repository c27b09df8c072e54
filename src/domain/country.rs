//! Country code resolution.
//!
//! Publications label their columns with country names ("France", "Euro", ...)
//! while the store keys records by short code. The mapping is a plain table;
//! resolution is a single case-insensitive exact match against the code or any
//! accepted label.

/// Country code → accepted labels.
pub const COUNTRY_LABELS: &[(&str, &[&str])] = &[
    ("FR", &["France", "French"]),
    ("DE", &["Germany", "German"]),
    ("IT", &["Italy", "Italian"]),
    ("ES", &["Spain", "Spanish"]),
    ("NL", &["Netherlands", "Dutch"]),
    ("BE", &["Belgium", "Belgian"]),
    ("EUR", &["Euro", "Eurozone", "Euro area"]),
    ("GB", &["United Kingdom", "UK", "GBP"]),
    ("US", &["United States", "USA", "USD"]),
];

/// Resolve a code or label to its country code.
///
/// Returns `None` for labels not present in [`COUNTRY_LABELS`].
pub fn resolve_country_code(label: &str) -> Option<&'static str> {
    let needle = label.trim();
    if needle.is_empty() {
        return None;
    }
    COUNTRY_LABELS
        .iter()
        .find(|(code, labels)| {
            code.eq_ignore_ascii_case(needle) || labels.iter().any(|l| l.eq_ignore_ascii_case(needle))
        })
        .map(|(code, _)| *code)
}

/// Canonical code for a country field: table match if known, else the trimmed
/// input in upper case.
pub fn normalize_country(label: &str) -> String {
    resolve_country_code(label)
        .map(str::to_string)
        .unwrap_or_else(|| label.trim().to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_codes_and_labels() {
        assert_eq!(resolve_country_code("FR"), Some("FR"));
        assert_eq!(resolve_country_code("fr"), Some("FR"));
        assert_eq!(resolve_country_code(" France "), Some("FR"));
        assert_eq!(resolve_country_code("united kingdom"), Some("GB"));
        assert_eq!(resolve_country_code("Euro"), Some("EUR"));
    }

    #[test]
    fn no_substring_matching() {
        // "Franc" is not a label; partial matches are never accepted.
        assert_eq!(resolve_country_code("Franc"), None);
        assert_eq!(resolve_country_code(""), None);
    }

    #[test]
    fn unknown_labels_fall_back_to_upper_case() {
        assert_eq!(normalize_country("Germany"), "DE");
        assert_eq!(normalize_country(" pl "), "PL");
    }
}
