use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

static TICKER_RE: OnceLock<Regex> = OnceLock::new();

fn ticker_re() -> &'static Regex {
    TICKER_RE.get_or_init(|| Regex::new(r"\b[A-Z]{1,5}\b").expect("ticker regex is valid"))
}

/// Pull every distinct all-caps alphabetic token of length 1-5 out of the
/// text. Naive on purpose: no whitelist is applied here, so shouted English
/// words come through as candidates. The curated registry artifact exists for
/// downstream refinement.
pub fn extract(text: &str) -> BTreeSet<String> {
    ticker_re()
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|token| token.chars().all(|c| c.is_ascii_alphabetic()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_candidates() {
        let set = extract("GME to the moon AMC");
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            vec!["AMC".to_string(), "GME".to_string()]
        );
    }

    #[test]
    fn test_only_uppercase_alpha_tokens() {
        let set = extract("buy $GME123 and Tsla, maybe NVDA or B2B");
        for token in &set {
            assert!(token.len() <= 5);
            assert!(token.chars().all(|c| c.is_ascii_uppercase()));
        }
        assert!(set.contains("NVDA"));
        assert!(!set.contains("Tsla"));
        assert!(!set.contains("B2B"));
    }

    #[test]
    fn test_length_bounds() {
        let set = extract("A ABCDE ABCDEF");
        assert!(set.contains("A"));
        assert!(set.contains("ABCDE"));
        assert!(!set.contains("ABCDEF"));
    }

    #[test]
    fn test_empty_input() {
        assert!(extract("").is_empty());
        assert!(extract("no shouting here").is_empty());
    }

    #[test]
    fn test_deterministic() {
        let text = "YOLO GME AMC GME";
        assert_eq!(extract(text), extract(text));
    }
}
