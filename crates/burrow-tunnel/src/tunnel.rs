//! The tunnel state machine.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use burrow_models::{Channel, ChannelId, Embed, Message, SendPayload, TunnelId, UserId};
use burrow_platform::{ChatClient, Waiters};

use crate::error::{Result, TunnelError};
use crate::manager::TunnelManager;

/// Mutable endpoint state, guarded so membership and the active flag change
/// in one step, never across an await.
struct State {
    connected: Vec<Channel>,
    active: bool,
}

/// A live relay bridging two or more channels.
///
/// Lifecycle: `Setting-Up → Active → Closed`, with no re-entry to Active.
/// The invariant `active == true` implies at least two connected endpoints;
/// dropping below two forces teardown.
pub struct Tunnel {
    id: TunnelId,
    /// Channel or user ids targeted for inclusion, before resolution.
    gates: Vec<i64>,
    /// Where setup errors are reported.
    origin: ChannelId,
    timeout: Duration,
    /// Command prefix; prefixed messages are never relayed.
    prefix: String,
    /// Relay without author attribution.
    anon: bool,
    client: Arc<dyn ChatClient>,
    waiters: Arc<Waiters>,
    state: Mutex<State>,
    /// Wakes the relay loop's pending wait on an explicit kill.
    cancel: Notify,
}

impl Tunnel {
    pub fn new(
        gates: Vec<i64>,
        origin: ChannelId,
        timeout: Duration,
        prefix: String,
        anon: bool,
        client: Arc<dyn ChatClient>,
        waiters: Arc<Waiters>,
    ) -> Self {
        Self {
            id: TunnelId::new(),
            gates,
            origin,
            timeout,
            prefix,
            anon,
            client,
            waiters,
            state: Mutex::new(State {
                connected: Vec::new(),
                active: false,
            }),
            cancel: Notify::new(),
        }
    }

    pub fn id(&self) -> TunnelId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().unwrap().active
    }

    /// Ids of the currently connected channels, in connection order.
    pub fn connected_ids(&self) -> Vec<ChannelId> {
        self.state
            .lock()
            .unwrap()
            .connected
            .iter()
            .map(|c| c.id)
            .collect()
    }

    /// Names of the currently connected channels, for listings.
    pub fn connected_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .connected
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Resolve every gate to a live channel and bring the tunnel up.
    ///
    /// Unresolvable targets and targets already carried by another tunnel
    /// are skipped with an error report to the origin channel. A
    /// "connecting" notice is posted into each channel before it counts as
    /// connected. Fewer than two connections aborts the whole operation:
    /// a failure notice goes to whatever did connect, and the tunnel is
    /// never registered.
    pub async fn activate(&self, manager: &TunnelManager) -> Result<()> {
        let mut connected = Vec::new();
        let mut unreachable = Vec::new();

        for &gate in &self.gates {
            if connected.iter().any(|c: &Channel| c.id.0 == gate) {
                continue;
            }

            let channel = match self.resolve_gate(gate).await {
                Some(channel) => channel,
                None => {
                    unreachable.push(gate);
                    self.report(format!("Could not reach tunnel target `{gate}`."))
                        .await;
                    continue;
                }
            };

            if manager.find(channel.id).is_some() {
                self.report(format!(
                    "`{}` is already connected to a tunnel.",
                    channel.name
                ))
                .await;
                continue;
            }

            let notice = SendPayload::text("Connecting a tunnel to this channel...");
            if self.client.send(channel.id, notice).await.is_err() {
                unreachable.push(gate);
                self.report(format!("Could not post into `{}`.", channel.name))
                    .await;
                continue;
            }

            connected.push(channel);
        }

        if connected.len() < 2 {
            for channel in &connected {
                let _ = self
                    .client
                    .send(
                        channel.id,
                        SendPayload::text("Tunnel setup failed; not enough endpoints connected."),
                    )
                    .await;
            }
            debug!(tunnel = %self.id, ?unreachable, "tunnel setup failed");
            return Err(TunnelError::Setup { unreachable });
        }

        let count = connected.len();
        {
            let mut state = self.state.lock().unwrap();
            state.connected = connected;
            state.active = true;
        }
        info!(tunnel = %self.id, channels = count, "tunnel established");
        self.broadcast(
            SendPayload::text(format!("Tunnel established — {count} channels linked.")),
            &[],
        )
        .await;
        Ok(())
    }

    /// Resolve one gate id: a channel id, or a user id for which a DM
    /// channel is created.
    async fn resolve_gate(&self, gate: i64) -> Option<Channel> {
        if let Ok(channel) = self.client.get_channel(ChannelId(gate)).await {
            return Some(channel);
        }
        if self.client.get_user(UserId(gate)).await.is_ok() {
            return self.client.create_dm(UserId(gate)).await.ok();
        }
        None
    }

    /// The relay loop. Runs until timeout, explicit kill, or teardown.
    ///
    /// The inactivity timer resets on every relayed message. An explicit
    /// kill cancels the pending wait promptly rather than waiting out the
    /// timeout.
    pub async fn run(self: Arc<Self>, manager: Arc<TunnelManager>) {
        loop {
            if !self.is_active() {
                break;
            }

            let connected = self.connected_ids();
            let bot = self.client.bot_id();
            let prefix = self.prefix.clone();
            let qualifies = move |m: &Message| {
                m.author.id != bot
                    && !m.text.starts_with(&prefix)
                    && connected.contains(&m.channel.id)
            };

            tokio::select! {
                _ = self.cancel.notified() => {
                    if self.is_active() {
                        self.broadcast(SendPayload::text("Tunnel relay cancelled."), &[])
                            .await;
                    }
                    break;
                }
                waited = self.waiters.wait_for(qualifies, self.timeout) => {
                    match waited {
                        Ok(message) => self.receive(&message).await,
                        Err(_) => {
                            self.kill("Tunnel closed after inactivity.").await;
                            break;
                        }
                    }
                }
            }
        }

        self.close(&manager).await;
    }

    /// Relay a message to every connected channel except its source.
    pub async fn receive(&self, message: &Message) {
        let mut embed = Embed::new()
            .description(message.text.clone())
            .footer(format!("via #{}", message.channel.name));
        if !self.anon {
            embed = embed.title(message.author.name.clone());
        }
        self.broadcast(SendPayload::embed(embed), &[message.channel.id])
            .await;
    }

    /// Send a payload to every connected channel not excluded, returning
    /// the channels whose send failed. Never mutates membership.
    async fn send_all(&self, payload: SendPayload, exclude: &[ChannelId]) -> Vec<ChannelId> {
        let targets: Vec<ChannelId> = self
            .connected_ids()
            .into_iter()
            .filter(|id| !exclude.contains(id))
            .collect();

        let mut failed = Vec::new();
        for target in targets {
            if let Err(err) = self.client.send(target, payload.clone()).await {
                warn!(tunnel = %self.id, channel = %target, error = %err, "broadcast send failed");
                failed.push(target);
            }
        }
        failed
    }

    /// Send a payload to every connected channel not excluded. Channels
    /// whose send fails are collected and dropped after the full broadcast
    /// attempt completes, not during it.
    pub async fn broadcast(&self, payload: SendPayload, exclude: &[ChannelId]) {
        let failed = self.send_all(payload, exclude).await;
        for target in failed {
            self.drop_channel(target).await;
        }
    }

    /// Remove a channel from the tunnel.
    ///
    /// Dropping below two endpoints deactivates the tunnel in the same
    /// step as the removal, then announces the teardown. Teardown notices
    /// are best-effort; the channels they fail to reach are torn down by
    /// `close` anyway.
    pub async fn drop_channel(&self, channel: ChannelId) {
        let (was_active, remaining) = {
            let mut state = self.state.lock().unwrap();
            let before = state.connected.len();
            state.connected.retain(|c| c.id != channel);
            if state.connected.len() == before {
                return;
            }
            let was_active = state.active;
            let remaining = state.connected.len();
            if remaining < 2 {
                state.active = false;
            }
            (was_active, remaining)
        };

        if !was_active {
            return;
        }
        if remaining >= 2 {
            self.send_all(SendPayload::text("A tunnel endpoint disconnected."), &[])
                .await;
        } else {
            self.send_all(
                SendPayload::text("No active endpoints remain; closing the tunnel."),
                &[],
            )
            .await;
            self.cancel.notify_waiters();
        }
    }

    /// Deactivate the tunnel, broadcasting `message` first when non-empty,
    /// and cancel any outstanding relay wait.
    pub async fn kill(&self, message: &str) {
        if !message.is_empty() {
            self.send_all(SendPayload::text(message), &[]).await;
        }
        self.state.lock().unwrap().active = false;
        self.cancel.notify_waiters();
    }

    /// Drop every endpoint, then leave the manager's registry. The only
    /// path that removes a tunnel from the live set.
    pub async fn close(&self, manager: &TunnelManager) {
        loop {
            let next = self
                .state
                .lock()
                .unwrap()
                .connected
                .first()
                .map(|c| c.id);
            match next {
                Some(channel) => self.drop_channel(channel).await,
                None => break,
            }
        }
        if let Err(err) = manager.remove(self) {
            warn!(tunnel = %self.id, error = %err, "could not deregister tunnel");
        }
    }

    /// Post a setup error into the origin channel.
    async fn report(&self, text: String) {
        if let Err(err) = self.client.send(self.origin, SendPayload::text(text)).await {
            warn!(tunnel = %self.id, error = %err, "could not report to origin");
        }
    }
}
