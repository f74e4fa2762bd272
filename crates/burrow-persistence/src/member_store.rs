//! Per-member attribute documents.
//!
//! Each member owns a loosely-typed JSON document addressed by dotted
//! paths (`profile.level`, `minecraft.username`). The store also keeps the
//! named id whitelists used by whitelist-gated commands.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use burrow_models::UserId;

use crate::atomic;
use crate::error::Result;

/// On-disk shape of the member store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MemberFile {
    /// User id (stringified) to attribute document.
    members: HashMap<String, Value>,
    /// Whitelist name to member ids.
    whitelists: HashMap<String, Vec<i64>>,
}

/// Store of member attribute documents and id whitelists.
///
/// Reads issued after a write from the same logical command observe the
/// write; every mutation persists before returning.
pub struct MemberStore {
    path: PathBuf,
    file: RwLock<MemberFile>,
}

impl MemberStore {
    /// Open (or create) the member store under `state_dir`.
    pub fn open(state_dir: impl AsRef<Path>) -> Result<Self> {
        let path = state_dir.as_ref().join("members.json");
        let file = atomic::read_json_or_default(&path)?;
        Ok(Self {
            path,
            file: RwLock::new(file),
        })
    }

    /// Look up one attribute by dotted path. `None` when the member or any
    /// path segment is absent.
    pub fn get_attribute(&self, user: UserId, path: &str) -> Option<Value> {
        let file = self.file.read().unwrap();
        let mut node = file.members.get(&user.to_string())?;
        for segment in path.split('.') {
            node = node.get(segment)?;
        }
        Some(node.clone())
    }

    /// Set one attribute by dotted path, creating intermediate objects.
    pub fn set_attribute(&self, user: UserId, path: &str, value: Value) -> Result<()> {
        let mut patch = HashMap::new();
        patch.insert(path.to_string(), value);
        self.update(user, patch)
    }

    /// Apply a patch of dotted-path keys to a member's document in one
    /// persisted step.
    pub fn update(&self, user: UserId, patch: HashMap<String, Value>) -> Result<()> {
        let mut file = self.file.write().unwrap();
        let doc = file
            .members
            .entry(user.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
        for (path, value) in patch {
            apply_path(doc, &path, value);
        }
        atomic::write_json(&self.path, &*file)
    }

    /// The member's operator level, 0 when unset.
    pub fn operator_level(&self, user: UserId) -> u8 {
        self.get_attribute(user, "level")
            .and_then(|v| v.as_u64())
            .map(|v| v.min(u8::MAX as u64) as u8)
            .unwrap_or(0)
    }

    /// Set the member's operator level.
    pub fn set_operator_level(&self, user: UserId, level: u8) -> Result<()> {
        self.set_attribute(user, "level", level.into())
    }

    /// Roles recorded for the member, empty when unset.
    pub fn roles(&self, user: UserId) -> Vec<String> {
        self.get_attribute(user, "roles")
            .and_then(|v| {
                v.as_array().map(|a| {
                    a.iter()
                        .filter_map(|r| r.as_str().map(String::from))
                        .collect()
                })
            })
            .unwrap_or_default()
    }

    /// Grant a role to the member (idempotent).
    pub fn add_role(&self, user: UserId, role: &str) -> Result<()> {
        let mut roles = self.roles(user);
        if !roles.iter().any(|r| r == role) {
            roles.push(role.to_string());
        }
        self.set_attribute(user, "roles", roles.into())
    }

    /// Whether `user` is in the named whitelist.
    pub fn in_whitelist(&self, name: &str, user: UserId) -> bool {
        self.file
            .read()
            .unwrap()
            .whitelists
            .get(name)
            .is_some_and(|ids| ids.contains(&user.0))
    }

    /// Add `user` to the named whitelist, creating it if needed.
    pub fn add_to_whitelist(&self, name: &str, user: UserId) -> Result<()> {
        let mut file = self.file.write().unwrap();
        let ids = file.whitelists.entry(name.to_string()).or_default();
        if !ids.contains(&user.0) {
            ids.push(user.0);
        }
        atomic::write_json(&self.path, &*file)
    }

    /// Remove `user` from the named whitelist.
    pub fn remove_from_whitelist(&self, name: &str, user: UserId) -> Result<()> {
        let mut file = self.file.write().unwrap();
        if let Some(ids) = file.whitelists.get_mut(name) {
            ids.retain(|&id| id != user.0);
        }
        atomic::write_json(&self.path, &*file)
    }
}

/// Walk `path` into `doc`, creating objects along the way, and set the leaf.
fn apply_path(doc: &mut Value, path: &str, value: Value) {
    let mut node = doc;
    let segments: Vec<&str> = path.split('.').collect();
    for segment in &segments[..segments.len() - 1] {
        if !node.is_object() {
            *node = Value::Object(Default::default());
        }
        node = node
            .as_object_mut()
            .unwrap()
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
    if !node.is_object() {
        *node = Value::Object(Default::default());
    }
    node.as_object_mut()
        .unwrap()
        .insert(segments[segments.len() - 1].to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_set_and_get_attribute() {
        let dir = tempdir().unwrap();
        let store = MemberStore::open(dir.path()).unwrap();

        store
            .set_attribute(UserId(1), "profile.color", json!("teal"))
            .unwrap();

        assert_eq!(
            store.get_attribute(UserId(1), "profile.color"),
            Some(json!("teal"))
        );
        assert_eq!(store.get_attribute(UserId(1), "profile.missing"), None);
        assert_eq!(store.get_attribute(UserId(2), "profile.color"), None);
    }

    #[test]
    fn test_update_patch_applies_all_paths() {
        let dir = tempdir().unwrap();
        let store = MemberStore::open(dir.path()).unwrap();

        let mut patch = HashMap::new();
        patch.insert("level".to_string(), json!(3));
        patch.insert("minecraft.username".to_string(), json!("steve"));
        store.update(UserId(5), patch).unwrap();

        assert_eq!(store.operator_level(UserId(5)), 3);
        assert_eq!(
            store.get_attribute(UserId(5), "minecraft.username"),
            Some(json!("steve"))
        );
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = MemberStore::open(dir.path()).unwrap();
            store.set_operator_level(UserId(9), 4).unwrap();
            store.add_role(UserId(9), "moderator").unwrap();
        }
        let store = MemberStore::open(dir.path()).unwrap();
        assert_eq!(store.operator_level(UserId(9)), 4);
        assert_eq!(store.roles(UserId(9)), vec!["moderator".to_string()]);
    }

    #[test]
    fn test_whitelist_membership() {
        let dir = tempdir().unwrap();
        let store = MemberStore::open(dir.path()).unwrap();

        assert!(!store.in_whitelist("trusted", UserId(7)));
        store.add_to_whitelist("trusted", UserId(7)).unwrap();
        store.add_to_whitelist("trusted", UserId(7)).unwrap();
        assert!(store.in_whitelist("trusted", UserId(7)));

        store.remove_from_whitelist("trusted", UserId(7)).unwrap();
        assert!(!store.in_whitelist("trusted", UserId(7)));
    }

    #[test]
    fn test_add_role_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = MemberStore::open(dir.path()).unwrap();

        store.add_role(UserId(3), "helper").unwrap();
        store.add_role(UserId(3), "helper").unwrap();
        assert_eq!(store.roles(UserId(3)).len(), 1);
    }
}
