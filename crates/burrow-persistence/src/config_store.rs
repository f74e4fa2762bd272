//! The bot configuration document.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use burrow_models::{ChannelId, UserId};

use crate::atomic;
use crate::error::Result;

fn default_prefix() -> String {
    "!".to_string()
}

fn default_tunnel_timeout() -> u64 {
    300
}

/// Bot configuration, persisted as one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Command prefix recognized by the dispatcher.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// The owner account; bypasses every authorization rule.
    #[serde(default)]
    pub owner: Option<UserId>,
    /// Channel unanticipated faults are reported into.
    #[serde(default)]
    pub report_channel: Option<ChannelId>,
    /// Tunnel inactivity timeout, seconds.
    #[serde(default = "default_tunnel_timeout")]
    pub tunnel_timeout_secs: u64,
    /// Channels where gated custom commands are allowed.
    #[serde(default)]
    pub nsfw_channels: Vec<ChannelId>,
    /// Decorate every outbound text with a devmode marker.
    #[serde(default)]
    pub devmode: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            owner: None,
            report_channel: None,
            tunnel_timeout_secs: default_tunnel_timeout(),
            nsfw_channels: Vec::new(),
            devmode: false,
        }
    }
}

/// Store wrapping the config document with get/set/save semantics.
///
/// Mutations go through [`ConfigStore::set`], which applies the edit and
/// persists in one step, so no task ever observes a half-applied change.
pub struct ConfigStore {
    path: PathBuf,
    config: RwLock<BotConfig>,
}

impl ConfigStore {
    /// Open (or create) the config store under `state_dir`.
    pub fn open(state_dir: impl AsRef<Path>) -> Result<Self> {
        let path = state_dir.as_ref().join("config.json");
        let config = if path.exists() {
            atomic::read_json_or_default(&path)?
        } else {
            BotConfig::default()
        };
        Ok(Self {
            path,
            config: RwLock::new(config),
        })
    }

    /// Snapshot of the current configuration.
    pub fn get(&self) -> BotConfig {
        self.config.read().unwrap().clone()
    }

    /// Apply an edit to the configuration and persist it.
    pub fn set(&self, edit: impl FnOnce(&mut BotConfig)) -> Result<()> {
        let mut config = self.config.write().unwrap();
        edit(&mut config);
        atomic::write_json(&self.path, &*config)
    }

    /// Persist the current configuration unchanged.
    pub fn save(&self) -> Result<()> {
        atomic::write_json(&self.path, &*self.config.read().unwrap())
    }
}
