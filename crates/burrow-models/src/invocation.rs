//! Parsed command invocations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Value of a parsed flag: bare markers are `Set`, markers followed by a
/// non-marker token capture that token as `Value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Set(bool),
    Value(String),
}

impl FlagValue {
    /// The captured string value, if one was given.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::Value(v) => Some(v),
            FlagValue::Set(_) => None,
        }
    }

    /// True for bare flags and any captured value.
    pub fn is_set(&self) -> bool {
        match self {
            FlagValue::Set(b) => *b,
            FlagValue::Value(_) => true,
        }
    }
}

impl From<bool> for FlagValue {
    fn from(b: bool) -> Self {
        FlagValue::Set(b)
    }
}

impl From<String> for FlagValue {
    fn from(v: String) -> Self {
        FlagValue::Value(v)
    }
}

/// One parsed run of a command, constructed per incoming message and
/// discarded after rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The full line as typed, including the prefix.
    pub raw_text: String,
    /// The keyword the command was resolved by.
    pub command_word: String,
    /// Everything after the command word, comment-stripped and trimmed.
    pub rest: String,
    /// Positional arguments in order, flags removed.
    pub args: Vec<String>,
    /// Flag keys (dashes stripped) to values; duplicates keep the last.
    pub flags: HashMap<String, FlagValue>,
    /// The message that triggered the invocation.
    pub source: Message,
}

impl Invocation {
    /// Positional argument by index.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Captured string value of a flag, if present.
    pub fn flag_value(&self, key: &str) -> Option<&str> {
        self.flags.get(key).and_then(FlagValue::as_str)
    }

    /// Whether a flag was given at all (bare or with a value).
    pub fn flag_set(&self, key: &str) -> bool {
        self.flags.get(key).is_some_and(FlagValue::is_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ChannelId, MessageId, UserId};
    use crate::message::{Channel, User};

    #[test]
    fn test_flag_accessors() {
        let mut flags = HashMap::new();
        flags.insert("reason".to_string(), FlagValue::Value("spam".to_string()));
        flags.insert("force".to_string(), FlagValue::Set(true));

        let inv = Invocation {
            raw_text: "!ban 123 --reason spam --force".to_string(),
            command_word: "ban".to_string(),
            rest: "123 --reason spam --force".to_string(),
            args: vec!["123".to_string()],
            flags,
            source: Message::new(
                MessageId(1),
                Channel::group(ChannelId(2), "general"),
                User::new(UserId(3), "alice"),
                "!ban 123 --reason spam --force",
            ),
        };

        assert_eq!(inv.arg(0), Some("123"));
        assert_eq!(inv.arg(1), None);
        assert_eq!(inv.flag_value("reason"), Some("spam"));
        assert_eq!(inv.flag_value("force"), None);
        assert!(inv.flag_set("force"));
        assert!(!inv.flag_set("missing"));
    }
}
