//! Alternate invocation words for real commands.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::atomic;
use crate::error::Result;

/// Store mapping alias words to real command words.
///
/// The router consults this only after direct lookup fails; the anti-shadow
/// rule (an alias never hides a real command) is enforced at lookup time by
/// the router, not here.
pub struct AliasStore {
    path: PathBuf,
    aliases: RwLock<HashMap<String, String>>,
}

impl AliasStore {
    /// Open (or create) the alias store under `state_dir`.
    pub fn open(state_dir: impl AsRef<Path>) -> Result<Self> {
        let path = state_dir.as_ref().join("aliases.json");
        let aliases = atomic::read_json_or_default(&path)?;
        Ok(Self {
            path,
            aliases: RwLock::new(aliases),
        })
    }

    /// The command word an alias points at, if defined.
    pub fn resolve(&self, alias: &str) -> Option<String> {
        self.aliases.read().unwrap().get(alias).cloned()
    }

    /// Define (or redefine) an alias.
    pub fn set(&self, alias: &str, target: &str) -> Result<()> {
        let mut aliases = self.aliases.write().unwrap();
        aliases.insert(alias.to_string(), target.to_string());
        atomic::write_json(&self.path, &*aliases)
    }

    /// Remove an alias. Returns whether it existed.
    pub fn remove(&self, alias: &str) -> Result<bool> {
        let mut aliases = self.aliases.write().unwrap();
        let existed = aliases.remove(alias).is_some();
        if existed {
            atomic::write_json(&self.path, &*aliases)?;
        }
        Ok(existed)
    }

    /// All aliases, sorted by alias word for stable listings.
    pub fn all(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self
            .aliases
            .read()
            .unwrap()
            .iter()
            .map(|(a, t)| (a.clone(), t.clone()))
            .collect();
        pairs.sort();
        pairs
    }
}
