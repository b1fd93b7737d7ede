//! Free-form message parsing: pull a product code and "label: value" pairs
//! out of unstructured chat text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Trigger patterns marking the product code, in priority order. Two
/// languages only: "Код"/"Код товара" and "code".
static CODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\bкод(?:\s*товара)?\s*[:=\-]\s*([A-Za-z0-9_\-\.]+)")
            .expect("code pattern should parse"),
        Regex::new(r"(?i)\bcode\s*[:=\-]\s*([A-Za-z0-9_\-\.]+)")
            .expect("code pattern should parse"),
    ]
});

/// Generic "Label: value" / "Label=value" / "Label - value" shape. The value
/// class excludes newline, semicolon, pipe and comma so adjacent pairs stay
/// isolated from each other.
static FIELD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<k>[А-Яа-яA-Za-z0-9_\.\s/\-]{2,30})\s*[:=\-]\s*(?P<v>[^\n;|,]{1,120})")
        .expect("field pattern should parse")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Absent when no trigger pattern matched; downstream must reject the
    /// message in that case.
    pub code: Option<String>,
    pub fields: BTreeMap<String, String>,
}

/// Extracts the code and every key/value pair from `text`. Whole-string regex
/// scanning, not line-by-line. Duplicate labels resolve last-write-wins.
pub fn parse_message(text: &str) -> ParsedMessage {
    let code = CODE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(text))
        .map(|caps| caps[1].trim().to_string());

    let mut fields = BTreeMap::new();
    for caps in FIELD_PATTERN.captures_iter(text) {
        let key = caps["k"].trim().trim_matches('.').trim();
        let value = caps["v"].trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        // The code travels only in the code slot, never duplicated as a field.
        let lowered = key.to_lowercase();
        if lowered.starts_with("код") || lowered.starts_with("code") {
            continue;
        }
        fields.insert(key.to_string(), value.to_string());
    }

    ParsedMessage { code, fields }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields_of(text: &str) -> BTreeMap<String, String> {
        parse_message(text).fields
    }

    #[test]
    fn russian_message_with_code_and_fields() {
        let parsed = parse_message("Код: A123; Цена=36500; Город: Алматы");
        assert_eq!(parsed.code.as_deref(), Some("A123"));
        assert_eq!(parsed.fields.len(), 2);
        assert_eq!(parsed.fields["Цена"], "36500");
        assert_eq!(parsed.fields["Город"], "Алматы");
    }

    #[test]
    fn code_label_never_becomes_a_field() {
        let parsed = parse_message("Код товара = X-1.2_3; Вес: 12 кг");
        assert_eq!(parsed.code.as_deref(), Some("X-1.2_3"));
        assert!(parsed.fields.keys().all(|k| !k.to_lowercase().contains("код")));
        assert_eq!(parsed.fields["Вес"], "12 кг");
    }

    #[test]
    fn english_trigger_and_last_write_wins() {
        let parsed = parse_message("code: X9-9; note - first unit; note: second unit");
        assert_eq!(parsed.code.as_deref(), Some("X9-9"));
        assert_eq!(
            parsed.fields,
            BTreeMap::from([("note".to_string(), "second unit".to_string())])
        );
    }

    #[test]
    fn no_trigger_means_no_code() {
        let parsed = parse_message("просто текст без кода товара, Цена: 99");
        assert_eq!(parsed.code, None);
    }

    #[test]
    fn trigger_is_case_insensitive() {
        assert_eq!(
            parse_message("КОД:ABC9").code.as_deref(),
            Some("ABC9")
        );
        assert_eq!(parse_message("CODE - z_7").code.as_deref(), Some("z_7"));
    }

    #[test]
    fn russian_trigger_takes_priority() {
        // Both triggers present; the first pattern in the list wins.
        let parsed = parse_message("code: EN1 и Код: RU1");
        assert_eq!(parsed.code.as_deref(), Some("RU1"));
    }

    #[test]
    fn labels_lose_surrounding_dots_and_whitespace() {
        let fields = fields_of("Код: A1;  Цена. : 500 ");
        assert_eq!(fields["Цена"], "500");
    }

    #[test]
    fn all_three_separators_accepted() {
        let fields = fields_of("Код: A1; Цвет=синий; Размер - XL | Склад: №2");
        assert_eq!(fields["Цвет"], "синий");
        assert_eq!(fields["Размер"], "XL");
        assert_eq!(fields["Склад"], "№2");
    }

    #[test]
    fn separators_isolate_adjacent_pairs() {
        let fields = fields_of("Код: A1\nГород: Астана, Цена: 10");
        assert_eq!(fields["Город"], "Астана");
        assert_eq!(fields["Цена"], "10");
    }

    #[test]
    fn slash_and_digits_allowed_in_labels() {
        let fields = fields_of("Код: A1; Цена/шт: 5");
        assert_eq!(fields["Цена/шт"], "5");
    }

    #[test]
    fn code_only_message_has_empty_fields() {
        let parsed = parse_message("Код: SOLO-1");
        assert_eq!(parsed.code.as_deref(), Some("SOLO-1"));
        assert!(parsed.fields.is_empty());
    }
}
