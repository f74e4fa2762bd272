//! Registry and lifecycle owner for live tunnels.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;

use burrow_models::{ChannelId, TunnelId};
use burrow_platform::{ChatClient, Waiters};

use crate::error::{Result, TunnelError};
use crate::tunnel::Tunnel;

/// One row of a tunnel listing.
#[derive(Debug, Clone)]
pub struct TunnelSummary {
    pub id: TunnelId,
    pub channels: Vec<String>,
    pub active: bool,
}

/// Owns the set of live tunnels.
///
/// Registration happens only after a successful activation, and removal
/// only after full teardown; registry mutations never straddle an await.
pub struct TunnelManager {
    client: Arc<dyn ChatClient>,
    waiters: Arc<Waiters>,
    tunnels: Mutex<Vec<Arc<Tunnel>>>,
}

impl TunnelManager {
    pub fn new(client: Arc<dyn ChatClient>, waiters: Arc<Waiters>) -> Self {
        Self {
            client,
            waiters,
            tunnels: Mutex::new(Vec::new()),
        }
    }

    /// Dig a tunnel across `gates` (channel or user ids; the origin channel
    /// is normally among them).
    ///
    /// On setup failure the tunnel is discarded unregistered. On success it
    /// joins the registry and its relay loop runs as a background task;
    /// the call returns once the tunnel is established.
    pub async fn dig(
        self: &Arc<Self>,
        origin: ChannelId,
        gates: Vec<i64>,
        anon: bool,
        timeout: Duration,
        prefix: String,
    ) -> Result<TunnelId> {
        let tunnel = Arc::new(Tunnel::new(
            gates,
            origin,
            timeout,
            prefix,
            anon,
            Arc::clone(&self.client),
            Arc::clone(&self.waiters),
        ));

        tunnel.activate(self).await?;

        let id = tunnel.id();
        self.tunnels.lock().unwrap().push(Arc::clone(&tunnel));
        tokio::spawn(tunnel.run(Arc::clone(self)));
        info!(tunnel = %id, "tunnel registered");
        Ok(id)
    }

    /// The first live tunnel carrying `channel`.
    pub fn find(&self, channel: ChannelId) -> Option<Arc<Tunnel>> {
        self.tunnels
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.connected_ids().contains(&channel))
            .cloned()
    }

    /// Look up a tunnel by its id's display prefix (as shown in listings).
    pub fn get(&self, id_prefix: &str) -> Option<Arc<Tunnel>> {
        self.tunnels
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id().to_string().starts_with(id_prefix))
            .cloned()
    }

    /// Drop `channel` from every live tunnel.
    pub async fn close_tunnels_to(&self, channel: ChannelId) {
        let tunnels: Vec<_> = self.tunnels.lock().unwrap().clone();
        for tunnel in tunnels {
            tunnel.drop_channel(channel).await;
        }
    }

    /// Kill a tunnel by id prefix. Returns whether one was found.
    pub async fn kill(&self, id_prefix: &str, message: &str) -> bool {
        match self.get(id_prefix) {
            Some(tunnel) => {
                tunnel.kill(message).await;
                true
            }
            None => false,
        }
    }

    /// Deregister a tunnel after teardown. Rejects a still-active tunnel.
    pub fn remove(&self, tunnel: &Tunnel) -> Result<()> {
        if tunnel.is_active() {
            return Err(TunnelError::StillActive);
        }
        self.tunnels
            .lock()
            .unwrap()
            .retain(|t| t.id() != tunnel.id());
        info!(tunnel = %tunnel.id(), "tunnel deregistered");
        Ok(())
    }

    /// Number of registered tunnels.
    pub fn count(&self) -> usize {
        self.tunnels.lock().unwrap().len()
    }

    /// Summaries of every registered tunnel.
    pub fn list(&self) -> Vec<TunnelSummary> {
        self.tunnels
            .lock()
            .unwrap()
            .iter()
            .map(|t| TunnelSummary {
                id: t.id(),
                channels: t.connected_names(),
                active: t.is_active(),
            })
            .collect()
    }
}
