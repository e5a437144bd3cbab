use std::collections::HashMap;

use tokio::time::Instant;

use crate::discovery::DiscoveredServer;

/// Everything the agent remembers about one server between ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRuntimeState {
    pub last_cpu_usage_usec: Option<u64>,
    pub last_write_bytes: Option<u64>,
    pub last_sample_at: Option<Instant>,
    /// Last player count a probe reported; kept across failed probes.
    pub players_online: Option<u32>,
    pub next_player_probe_at: Instant,
}

impl ServerRuntimeState {
    /// Fresh state with no baseline and a player probe due at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            last_cpu_usage_usec: None,
            last_write_bytes: None,
            last_sample_at: None,
            players_online: None,
            next_player_probe_at: now,
        }
    }

    pub fn player_probe_due(&self, now: Instant) -> bool {
        now >= self.next_player_probe_at
    }

    /// Stores a probe outcome. A failed probe never erases a known count.
    pub fn record_players(&mut self, players: Option<u32>) {
        if players.is_some() {
            self.players_online = players;
        }
    }
}

/// Runtime state of every server the last discovery reported, keyed by server id.
#[derive(Debug, Default)]
pub struct ServerStates {
    states: HashMap<String, ServerRuntimeState>,
}

/// What a [`ServerStates::reconcile`] call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reconciled {
    pub added: usize,
    pub removed: usize,
}

impl ServerStates {
    /// Aligns the tracked servers with `servers`: state of servers no longer
    /// listed is dropped, newly listed ones start fresh at `now`.
    pub fn reconcile(&mut self, servers: &[DiscoveredServer], now: Instant) -> Reconciled {
        let before = self.states.len();
        self.states.retain(|server_id, _| {
            servers
                .iter()
                .any(|server| &server.server_id == server_id)
        });
        let removed = before - self.states.len();

        let mut added = 0;
        for server in servers {
            self.states
                .entry(server.server_id.clone())
                .or_insert_with(|| {
                    added += 1;
                    ServerRuntimeState::new(now)
                });
        }

        Reconciled { added, removed }
    }

    pub fn get(&self, server_id: &str) -> Option<&ServerRuntimeState> {
        self.states.get(server_id)
    }

    /// Returns the state of `server_id`, creating it if a server slipped past reconciliation.
    pub fn get_or_insert(&mut self, server_id: &str, now: Instant) -> &mut ServerRuntimeState {
        self.states
            .entry(server_id.to_owned())
            .or_insert_with(|| ServerRuntimeState::new(now))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
