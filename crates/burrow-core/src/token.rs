//! Command-line tokenizer.
//!
//! Splits on whitespace and commas, honors single/double/backtick quoting,
//! and treats an unquoted semicolon as a comment leader that truncates the
//! rest of the line.

/// Quote characters recognized by the tokenizer.
const QUOTES: [char; 3] = ['\'', '"', '`'];

/// Split a raw command line into tokens plus its "short form".
///
/// The short form is the literal substring of `line` up to (but not
/// including) the first unquoted `;`, trimmed. Handlers that need "the
/// rest of the line verbatim" read it instead of re-joining tokens.
pub fn tokenize(line: &str) -> (Vec<String>, String) {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut short_end = line.len();

    for (i, c) in line.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
                // An explicitly quoted token survives even when empty.
                if current.is_empty() {
                    tokens.push(String::new());
                }
            } else {
                current.push(c);
            }
            continue;
        }

        if QUOTES.contains(&c) {
            quote = Some(c);
        } else if c == ';' {
            short_end = i;
            break;
        } else if c.is_whitespace() || c == ',' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    let short_form = line[..short_end].trim().to_string();
    (tokens, short_form)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(line: &str) -> Vec<String> {
        tokenize(line).0
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(tokenize(""), (vec![], String::new()));
        assert_eq!(tokenize("   "), (vec![], String::new()));
    }

    #[test]
    fn test_whitespace_and_comma_split() {
        assert_eq!(toks("a b  c"), vec!["a", "b", "c"]);
        assert_eq!(toks("a,b, c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_comment_truncates_tokens_and_short_form() {
        let (tokens, short) = tokenize("a b; c d");
        assert_eq!(tokens, vec!["a", "b"]);
        assert_eq!(short, "a b");
    }

    #[test]
    fn test_quoted_run_is_one_token() {
        assert_eq!(toks("say 'hello there' now"), vec!["say", "hello there", "now"]);
        assert_eq!(toks(r#"say "a, b; c""#), vec!["say", "a, b; c"]);
        assert_eq!(toks("say `back tick`"), vec!["say", "back tick"]);
    }

    #[test]
    fn test_quote_characters_are_stripped() {
        assert_eq!(toks("'x'"), vec!["x"]);
        assert_eq!(toks("pre'mid dle'post"), vec!["premid dlepost"]);
    }

    #[test]
    fn test_empty_quoted_token_survives() {
        assert_eq!(toks("set key ''"), vec!["set", "key", ""]);
    }

    #[test]
    fn test_semicolon_inside_quotes_is_not_a_comment() {
        let (tokens, short) = tokenize("say 'a; b' tail");
        assert_eq!(tokens, vec!["say", "a; b", "tail"]);
        assert_eq!(short, "say 'a; b' tail");
    }

    #[test]
    fn test_short_form_trims_surrounding_whitespace() {
        let (_, short) = tokenize("  spaced out   ; comment");
        assert_eq!(short, "spaced out");
    }

    #[test]
    fn test_unterminated_quote_consumes_rest() {
        assert_eq!(toks("say 'oops trailing"), vec!["say", "oops trailing"]);
    }

    #[test]
    fn test_retokenize_rejoined_tokens_is_stable() {
        // Quoting idempotence: for token text without embedded quotes,
        // re-tokenizing the space-joined tokens yields the same tokens.
        for line in ["a b c", "a,b  c", "x 'two words' y", "one"] {
            let first = toks(line);
            let rejoined = first.join(" ");
            // Tokens with embedded whitespace need re-quoting to survive a
            // round trip, so only compare the flat cases.
            if first.iter().all(|t| !t.contains(char::is_whitespace)) {
                assert_eq!(toks(&rejoined), first, "line: {line}");
            }
        }
    }
}
