use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Letters of any script, combining marks, digits and underscore
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{M}\p{N}_]+").expect("token pattern is valid"));

/// Tokens shorter than this (in characters) carry no signal
const MIN_TOKEN_CHARS: usize = 2;

/// Extract lower-cased lexical tokens from a question
pub fn extract(question: &str) -> BTreeSet<String> {
    let lowered = question.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// Merge externally supplied tokens into `local`, case-insensitively
pub fn merge<I, S>(mut local: BTreeSet<String>, external: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for token in external {
        let token = token.as_ref().trim().to_lowercase();
        if !token.is_empty() {
            local.insert(token);
        }
    }
    local
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_lowercases_and_dedups() {
        let tokens = extract("Show ORDERS and orders per Customer_ID");
        let expected: BTreeSet<String> = ["show", "orders", "and", "per", "customer_id"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_extract_drops_short_tokens() {
        let tokens = extract("a b c 7 ok");
        assert_eq!(tokens.len(), 1);
        assert!(tokens.contains("ok"));
    }

    #[test]
    fn test_extract_native_script() {
        let tokens = extract("先月の注文数を教えて");
        assert_eq!(tokens.len(), 1);
        assert!(tokens.contains("先月の注文数を教えて"));

        let tokens = extract("売上 と 注文");
        assert!(tokens.contains("売上"));
        assert!(tokens.contains("注文"));
        // Single character tokens are discarded
        assert!(!tokens.contains("と"));
    }

    #[test]
    fn test_extract_empty_question() {
        assert!(extract("").is_empty());
        assert!(extract("?! ... -").is_empty());
    }

    #[test]
    fn test_merge_external_tokens() {
        let local = extract("orders");
        let merged = merge(local, vec!["Orders", "  Daily Sales ", "", "customer"]);
        let expected: BTreeSet<String> = ["orders", "daily sales", "customer"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(merged, expected);
    }
}
