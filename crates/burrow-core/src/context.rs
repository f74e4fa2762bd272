//! Shared context handed to every command handler.

use std::sync::Arc;

use burrow_persistence::{AliasStore, CommandStore, ConfigStore, MemberStore};
use burrow_platform::{ChatClient, Waiters};

/// Everything a handler may need beyond its parsed invocation: the platform
/// client, the wait registry, and the persistent stores.
///
/// Cheap to clone; all members are shared.
#[derive(Clone)]
pub struct Context {
    pub client: Arc<dyn ChatClient>,
    pub waiters: Arc<Waiters>,
    pub members: Arc<MemberStore>,
    pub aliases: Arc<AliasStore>,
    pub customs: Arc<CommandStore>,
    pub config: Arc<ConfigStore>,
}

impl Context {
    pub fn new(
        client: Arc<dyn ChatClient>,
        waiters: Arc<Waiters>,
        members: Arc<MemberStore>,
        aliases: Arc<AliasStore>,
        customs: Arc<CommandStore>,
        config: Arc<ConfigStore>,
    ) -> Self {
        Self {
            client,
            waiters,
            members,
            aliases,
            customs,
            config,
        }
    }
}
