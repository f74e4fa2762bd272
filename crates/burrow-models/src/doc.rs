//! Structured help text for commands.
//!
//! A command's doc text is a set of sections separated by blank lines. The
//! first section is the one-line summary; sections whose first line starts
//! with `Syntax:` or `Options:` are recognized specially; everything else
//! is free-form detail.

use serde::{Deserialize, Serialize};

/// Parsed help text for one command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDoc {
    /// One-line summary shown in command listings.
    pub summary: String,
    /// Longer free-form description, possibly empty.
    pub details: String,
    /// The `Syntax:` section body, if present.
    pub syntax: Option<String>,
    /// The `Options:` section body, if present.
    pub options: Option<String>,
}

impl CommandDoc {
    /// Parse doc text into sections. Absent or empty text degrades to an
    /// empty doc rather than erroring.
    pub fn parse(text: &str) -> Self {
        let mut doc = CommandDoc::default();
        let mut details = Vec::new();

        for (i, section) in split_sections(text).into_iter().enumerate() {
            if i == 0 {
                doc.summary = section.lines().collect::<Vec<_>>().join(" ");
            } else if let Some(rest) = section.strip_prefix("Syntax:") {
                doc.syntax = Some(rest.trim().to_string());
            } else if let Some(rest) = section.strip_prefix("Options:") {
                doc.options = Some(rest.trim().to_string());
            } else {
                details.push(section);
            }
        }

        doc.details = details.join("\n\n");
        doc
    }

    /// Convenience for a summary-only doc.
    pub fn summary(text: impl Into<String>) -> Self {
        Self {
            summary: text.into(),
            ..Self::default()
        }
    }

    /// Whether there is anything beyond the summary to show.
    pub fn has_detail(&self) -> bool {
        !self.details.is_empty() || self.syntax.is_some() || self.options.is_some()
    }
}

/// Split text on blank lines into trimmed, non-empty sections.
fn split_sections(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|s| {
            s.lines()
                .map(str::trim)
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_doc() {
        let doc = CommandDoc::parse(
            "Ban a member from the server.\n\n\
             Removes the member and records the reason.\n\n\
             Syntax: ban <user> [--reason <text>]\n\n\
             Options: --reason  why the ban was issued\n--noconfirm  skip the prompt",
        );
        assert_eq!(doc.summary, "Ban a member from the server.");
        assert_eq!(doc.details, "Removes the member and records the reason.");
        assert_eq!(doc.syntax.as_deref(), Some("ban <user> [--reason <text>]"));
        assert!(doc.options.as_deref().unwrap().contains("--noconfirm"));
        assert!(doc.has_detail());
    }

    #[test]
    fn test_parse_summary_only() {
        let doc = CommandDoc::parse("Check that the bot is alive.");
        assert_eq!(doc.summary, "Check that the bot is alive.");
        assert!(doc.details.is_empty());
        assert!(doc.syntax.is_none());
        assert!(!doc.has_detail());
    }

    #[test]
    fn test_parse_empty_degrades() {
        let doc = CommandDoc::parse("");
        assert!(doc.summary.is_empty());
        assert!(!doc.has_detail());
    }

    #[test]
    fn test_indented_sections_are_trimmed() {
        let doc = CommandDoc::parse("Summary line.\n\n    Syntax: roll <dice>");
        assert_eq!(doc.syntax.as_deref(), Some("roll <dice>"));
    }
}
