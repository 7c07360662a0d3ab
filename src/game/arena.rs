//! Arena task: connection roles, input ingestion, and the authoritative clocks
//!
//! All match state lives inside a single task that owns a command channel.
//! Socket handlers, the tick clock, the round timer, and attack-cooldown
//! expiries all funnel through it, so every mutation runs to completion
//! before the next is admitted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::{unix_millis, ATTACK_COOLDOWN_MILLIS, TICK_MILLIS, TIMER_PERIOD};
use crate::ws::protocol::{MatchSnapshot, Role, ServerMsg};

use super::input::InputStore;
use super::r#match::{MatchState, TickEvent};
use super::FighterSlot;

/// Commands processed by the arena task
#[derive(Debug)]
pub enum ArenaCommand {
    /// New connection; replies with the assigned role and current state
    Connect {
        conn_id: Uuid,
        reply: oneshot::Sender<ConnectAck>,
    },
    /// Key snapshot from a connection (ignored unless it owns a slot)
    Input {
        conn_id: Uuid,
        keys: HashMap<String, bool>,
    },
    /// Reset and (re)start the match
    StartGame { conn_id: Uuid },
    /// Connection closed
    Disconnect { conn_id: Uuid },
    /// Attack cooldown expired; stale if the match epoch moved on
    ClearAttack { slot: FighterSlot, epoch: u64 },
}

/// Reply to a Connect command
#[derive(Debug)]
pub struct ConnectAck {
    pub role: Role,
    pub snapshot: MatchSnapshot,
}

/// Read-only roster and match-phase view for the health endpoint.
/// The arena task is the only writer.
#[derive(Default)]
pub struct RosterView {
    connections: DashMap<Uuid, Role>,
    game_running: AtomicBool,
}

impl RosterView {
    pub fn total_connections(&self) -> usize {
        self.connections.len()
    }

    pub fn slot_filled(&self, role: Role) -> bool {
        self.connections.iter().any(|entry| *entry.value() == role)
    }

    pub fn game_running(&self) -> bool {
        self.game_running.load(Ordering::Relaxed)
    }
}

/// Handle used by socket handlers to reach the arena task
#[derive(Clone)]
pub struct ArenaHandle {
    cmd_tx: mpsc::Sender<ArenaCommand>,
    broadcast_tx: broadcast::Sender<ServerMsg>,
}

impl ArenaHandle {
    /// Register a connection and get its role plus the current snapshot.
    /// Returns None if the arena task is gone (shutdown).
    pub async fn connect(&self, conn_id: Uuid) -> Option<ConnectAck> {
        let (reply, ack) = oneshot::channel();
        self.cmd_tx
            .send(ArenaCommand::Connect { conn_id, reply })
            .await
            .ok()?;
        ack.await.ok()
    }

    pub async fn send(&self, cmd: ArenaCommand) {
        if self.cmd_tx.send(cmd).await.is_err() {
            warn!("Arena task unavailable, dropping command");
        }
    }

    /// Subscribe to outbound broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.broadcast_tx.subscribe()
    }
}

/// The arena: owns the match, the input store, and the role map
pub struct Arena {
    state: MatchState,
    inputs: InputStore,
    player1: Option<Uuid>,
    player2: Option<Uuid>,
    /// Match generation; bumped on restart so stale cooldown expiries no-op
    epoch: u64,
    round_seconds: u32,
    cmd_rx: mpsc::Receiver<ArenaCommand>,
    /// Weak so the command channel closes once every handle is gone;
    /// in-flight cooldown tasks must not keep the arena alive
    cmd_tx: mpsc::WeakSender<ArenaCommand>,
    broadcast_tx: broadcast::Sender<ServerMsg>,
    roster: Arc<RosterView>,
}

impl Arena {
    pub fn new(round_seconds: u32) -> (Self, ArenaHandle, Arc<RosterView>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let (broadcast_tx, _) = broadcast::channel(64);
        let roster = Arc::new(RosterView::default());

        let handle = ArenaHandle {
            cmd_tx: cmd_tx.clone(),
            broadcast_tx: broadcast_tx.clone(),
        };

        let arena = Self {
            state: MatchState::new(round_seconds),
            inputs: InputStore::default(),
            player1: None,
            player2: None,
            epoch: 0,
            round_seconds,
            cmd_rx,
            cmd_tx: cmd_tx.downgrade(),
            broadcast_tx,
            roster: roster.clone(),
        };

        (arena, handle, roster)
    }

    /// Run the arena task: commands and both clocks share one writer
    pub async fn run(mut self) {
        let (mut tick, mut timer) = Self::fresh_clocks();

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if self.handle_command(cmd) {
                                // Restart replaces both clocks so the old
                                // cadence never carries into the new match
                                let (t, r) = Self::fresh_clocks();
                                tick = t;
                                timer = r;
                            }
                        }
                        None => {
                            info!("All arena handles dropped, stopping");
                            break;
                        }
                    }
                }
                _ = tick.tick() => self.on_tick(),
                _ = timer.tick() => self.on_timer(),
            }
        }
    }

    /// Both clocks first fire a full period after creation: a freshly
    /// started match keeps its opening second instead of losing it to the
    /// immediate first tick of `interval`
    fn fresh_clocks() -> (Interval, Interval) {
        let now = Instant::now();
        let tick_period = Duration::from_millis(TICK_MILLIS);

        let mut tick = interval_at(now + tick_period, tick_period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut timer = interval_at(now + TIMER_PERIOD, TIMER_PERIOD);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        (tick, timer)
    }

    /// Process one command. Returns true if the clocks must be restarted.
    fn handle_command(&mut self, cmd: ArenaCommand) -> bool {
        match cmd {
            ArenaCommand::Connect { conn_id, reply } => {
                let role = self.handle_connect(conn_id);
                let _ = reply.send(ConnectAck {
                    role,
                    snapshot: MatchSnapshot::from(&self.state),
                });
                false
            }
            ArenaCommand::Input { conn_id, keys } => {
                self.handle_input(conn_id, keys);
                false
            }
            ArenaCommand::StartGame { conn_id } => {
                self.handle_start(conn_id);
                true
            }
            ArenaCommand::Disconnect { conn_id } => {
                self.handle_disconnect(conn_id);
                false
            }
            ArenaCommand::ClearAttack { slot, epoch } => {
                self.handle_clear_attack(slot, epoch);
                false
            }
        }
    }

    /// First free fighter slot wins; everyone else spectates
    fn handle_connect(&mut self, conn_id: Uuid) -> Role {
        let role = if self.player1.is_none() {
            self.player1 = Some(conn_id);
            Role::Player1
        } else if self.player2.is_none() {
            self.player2 = Some(conn_id);
            Role::Player2
        } else {
            Role::Spectator
        };

        self.roster.connections.insert(conn_id, role);
        info!(conn_id = %conn_id, ?role, "Connection assigned");

        self.broadcast_roster();
        role
    }

    fn slot_of(&self, conn_id: Uuid) -> Option<FighterSlot> {
        if self.player1 == Some(conn_id) {
            Some(FighterSlot::One)
        } else if self.player2 == Some(conn_id) {
            Some(FighterSlot::Two)
        } else {
            None
        }
    }

    /// Overwrite the sender's key snapshot; non-fighters are ignored
    fn handle_input(&mut self, conn_id: Uuid, keys: HashMap<String, bool>) {
        match self.slot_of(conn_id) {
            Some(slot) => self.inputs.set(slot, keys),
            None => debug!(conn_id = %conn_id, "Input from non-fighter ignored"),
        }
    }

    /// Replace the match wholesale and bump the epoch. Any connection may
    /// trigger this, spectators included.
    fn handle_start(&mut self, conn_id: Uuid) {
        info!(conn_id = %conn_id, epoch = self.epoch + 1, "Match (re)started");

        self.epoch += 1;
        self.state = MatchState::start(self.round_seconds);
        self.broadcast_snapshot();
    }

    /// Release a fighter slot and pause a running match; spectator
    /// departures change nothing visible
    fn handle_disconnect(&mut self, conn_id: Uuid) {
        self.roster.connections.remove(&conn_id);

        let Some(slot) = self.slot_of(conn_id) else {
            debug!(conn_id = %conn_id, "Spectator disconnected");
            return;
        };

        match slot {
            FighterSlot::One => self.player1 = None,
            FighterSlot::Two => self.player2 = None,
        }
        self.inputs.clear(slot);

        if self.state.game_started {
            self.state.pause();
            info!(conn_id = %conn_id, ?slot, "Fighter left, match paused");
        }

        self.broadcast_roster();
        self.broadcast_snapshot();
    }

    fn handle_clear_attack(&mut self, slot: FighterSlot, epoch: u64) {
        if epoch != self.epoch {
            debug!(?slot, epoch, current = self.epoch, "Stale cooldown ignored");
            return;
        }
        self.state.clear_attack(slot);
        self.broadcast_snapshot();
    }

    /// One fixed simulation step
    fn on_tick(&mut self) {
        if !self.state.running() {
            return;
        }

        let events = self.state.tick(&self.inputs, unix_millis());

        for event in events {
            let TickEvent::AttackStarted { slot } = event;
            self.schedule_attack_clear(slot);
        }

        self.broadcast_snapshot();
    }

    /// One round-timer firing; broadcasts whether or not the winner changed
    fn on_timer(&mut self) {
        if !self.state.running() {
            return;
        }

        self.state.timer_tick();
        self.broadcast_snapshot();
    }

    /// Schedule the attacking flag to clear after the cooldown. The task is
    /// stamped with the current epoch so a restart invalidates it.
    fn schedule_attack_clear(&self, slot: FighterSlot) {
        let cmd_tx = self.cmd_tx.clone();
        let epoch = self.epoch;

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ATTACK_COOLDOWN_MILLIS)).await;
            if let Some(cmd_tx) = cmd_tx.upgrade() {
                let _ = cmd_tx.send(ArenaCommand::ClearAttack { slot, epoch }).await;
            }
        });
    }

    fn broadcast_roster(&self) {
        let player1_connected = self.player1.is_some();
        let player2_connected = self.player2.is_some();

        let _ = self.broadcast_tx.send(ServerMsg::PlayersUpdate {
            player1_connected,
            player2_connected,
            total: usize::from(player1_connected) + usize::from(player2_connected),
        });
    }

    fn broadcast_snapshot(&self) {
        // Every phase change (start, pause, winner) passes through here
        self.roster
            .game_running
            .store(self.state.running(), Ordering::Relaxed);

        let _ = self
            .broadcast_tx
            .send(ServerMsg::GameStateUpdate(MatchSnapshot::from(&self.state)));
    }
}
