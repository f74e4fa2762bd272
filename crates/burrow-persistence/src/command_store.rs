//! Runtime-defined custom reply commands.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use burrow_models::UserId;

use crate::atomic;
use crate::error::Result;

/// A custom command defined at runtime by an operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomCommand {
    /// Reply text posted when the command is invoked.
    pub reply: String,
    /// Gated commands produce no output outside permitted channels.
    pub nsfw: bool,
    /// Who defined it.
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Store of custom commands, keyed by invocation word.
pub struct CommandStore {
    path: PathBuf,
    commands: RwLock<HashMap<String, CustomCommand>>,
}

impl CommandStore {
    /// Open (or create) the custom command store under `state_dir`.
    pub fn open(state_dir: impl AsRef<Path>) -> Result<Self> {
        let path = state_dir.as_ref().join("commands.json");
        let commands = atomic::read_json_or_default(&path)?;
        Ok(Self {
            path,
            commands: RwLock::new(commands),
        })
    }

    /// Look up a custom command by word.
    pub fn get(&self, word: &str) -> Option<CustomCommand> {
        self.commands.read().unwrap().get(word).cloned()
    }

    /// Define (or redefine) a custom command.
    pub fn define(&self, word: &str, command: CustomCommand) -> Result<()> {
        let mut commands = self.commands.write().unwrap();
        commands.insert(word.to_string(), command);
        atomic::write_json(&self.path, &*commands)
    }

    /// Remove a custom command. Returns whether it existed.
    pub fn remove(&self, word: &str) -> Result<bool> {
        let mut commands = self.commands.write().unwrap();
        let existed = commands.remove(word).is_some();
        if existed {
            atomic::write_json(&self.path, &*commands)?;
        }
        Ok(existed)
    }

    /// All command words, sorted.
    pub fn words(&self) -> Vec<String> {
        let mut words: Vec<_> = self.commands.read().unwrap().keys().cloned().collect();
        words.sort();
        words
    }
}
