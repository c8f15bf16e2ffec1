use unicode_normalization::UnicodeNormalization;

/// Normalizes a free-text name for comparison.
///
/// Decomposes the input with NFKD, drops every non-ASCII code point left
/// over (combining accents included), lower-cases and trims. Missing input
/// yields an empty string.
pub fn normalize_name(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };

    let ascii: String = raw.nfkd().filter(char::is_ascii).collect();
    ascii.to_ascii_lowercase().trim().to_string()
}

/// Renders a JSON attribute value as text before normalizing it.
///
/// Strings are used as-is, numbers and booleans through their display
/// form. `null` counts as missing.
pub fn normalize_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => normalize_name(Some(s)),
        other => normalize_name(Some(&other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_is_empty() {
        assert_eq!(normalize_name(None), "");
        assert_eq!(normalize_value(&json!(null)), "");
    }

    #[test]
    fn test_strips_accents_and_case() {
        assert_eq!(normalize_name(Some("Álava")), "alava");
        assert_eq!(normalize_name(Some("Castelló")), "castello");
        assert_eq!(normalize_name(Some("A Coruña")), "a coruna");
        assert_eq!(normalize_name(Some("  Araba/Álava  ")), "araba/alava");
    }

    #[test]
    fn test_output_is_ascii_lowercase() {
        let out = normalize_name(Some("ÀÉÎÕÜ Ñandú ß"));
        assert!(out.is_ascii());
        assert_eq!(out, out.to_lowercase());
        assert_eq!(out, "aeiou nandu");
    }

    #[test]
    fn test_compatibility_forms_decompose() {
        assert_eq!(normalize_name(Some("ﬁnca")), "finca");
    }

    #[test]
    fn test_non_string_values() {
        assert_eq!(normalize_value(&json!(46)), "46");
        assert_eq!(normalize_value(&json!(true)), "true");
    }

    #[test]
    fn test_deterministic() {
        let a = normalize_name(Some("València"));
        let b = normalize_name(Some("València"));
        assert_eq!(a, b);
    }
}
