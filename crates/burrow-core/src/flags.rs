//! Flag parsing over a token list.
//!
//! Peels `-x` / `--long` markers (with optional following values) out of a
//! token list, leaving the positional tokens in order.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use burrow_models::FlagValue;

/// `-X` where X is any single non-dash character.
fn short_flag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-([^-\s])$").unwrap())
}

/// `--name` with 2+ word characters.
fn long_flag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^--(\w{2,})$").unwrap())
}

/// The flag key a token denotes, dashes stripped, or `None` for a
/// positional token.
fn flag_key(token: &str) -> Option<String> {
    if let Some(captures) = long_flag().captures(token) {
        return Some(captures[1].to_string());
    }
    if let Some(captures) = short_flag().captures(token) {
        return Some(captures[1].to_string());
    }
    None
}

/// Partition tokens into positionals and flags.
///
/// A token immediately following a flag marker is consumed as that flag's
/// value unless it is itself a marker; consumed tokens never reappear as
/// positionals. Duplicate flags keep the last occurrence.
pub fn parse_flags(tokens: Vec<String>) -> (Vec<String>, HashMap<String, FlagValue>) {
    let mut positional = Vec::new();
    let mut flags = HashMap::new();

    let mut i = 0;
    while i < tokens.len() {
        match flag_key(&tokens[i]) {
            Some(key) => {
                let value = match tokens.get(i + 1) {
                    Some(next) if flag_key(next).is_none() => {
                        i += 1;
                        FlagValue::Value(next.clone())
                    }
                    _ => FlagValue::Set(true),
                };
                flags.insert(key, value);
            }
            None => positional.push(tokens[i].clone()),
        }
        i += 1;
    }

    (positional, flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(tokens: &[&str]) -> (Vec<String>, HashMap<String, FlagValue>) {
        parse_flags(tokens.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_value_capture() {
        let (positional, flags) = parse(&["--reason", "because", "42"]);
        assert_eq!(positional, vec!["42"]);
        assert_eq!(
            flags.get("reason"),
            Some(&FlagValue::Value("because".to_string()))
        );
    }

    #[test]
    fn test_marker_followed_by_marker_is_boolean() {
        let (positional, flags) = parse(&["--reason", "--force"]);
        assert!(positional.is_empty());
        assert_eq!(flags.get("reason"), Some(&FlagValue::Set(true)));
        assert_eq!(flags.get("force"), Some(&FlagValue::Set(true)));
    }

    #[test]
    fn test_trailing_marker_is_boolean() {
        let (positional, flags) = parse(&["x", "-f"]);
        assert_eq!(positional, vec!["x"]);
        assert_eq!(flags.get("f"), Some(&FlagValue::Set(true)));
    }

    #[test]
    fn test_positional_order_preserved() {
        let (positional, flags) = parse(&["a", "-v", "loud", "b", "c"]);
        assert_eq!(positional, vec!["a", "b", "c"]);
        assert_eq!(flags.get("v"), Some(&FlagValue::Value("loud".to_string())));
    }

    #[test]
    fn test_duplicate_flags_last_wins() {
        let (_, flags) = parse(&["--mode", "a", "--mode", "b"]);
        assert_eq!(flags.get("mode"), Some(&FlagValue::Value("b".to_string())));
        assert_eq!(flags.len(), 1);
    }

    #[test]
    fn test_non_marker_dashes_stay_positional() {
        // `--x` has too few word chars for a long flag; `---a` is no marker.
        let (positional, flags) = parse(&["--x", "---a", "-"]);
        assert!(flags.is_empty());
        assert_eq!(positional, vec!["--x", "---a", "-"]);
    }

    #[test]
    fn test_partition_accounting() {
        // len(positional) + 2*valued + bare <= len(tokens)
        let tokens = ["a", "--k", "v", "-b", "c", "--last"];
        let (positional, flags) = parse(&tokens);
        let valued = flags.values().filter(|v| v.as_str().is_some()).count();
        let bare = flags.len() - valued;
        assert!(positional.len() + 2 * valued + bare <= tokens.len());
    }
}
