//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::game::r#match::{Fighter, MatchState};

/// Role held by a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Player1,
    Player2,
    Spectator,
}

/// Horizontal facing of a fighter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Left,
    Right,
}

/// Match outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    #[serde(rename = "Player 1")]
    Player1,
    #[serde(rename = "Player 2")]
    Player2,
    Draw,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Full key snapshot for the sender's fighter slot (last-write-wins)
    PlayerAction { keys: HashMap<String, bool> },

    /// Reset and (re)start the match
    StartGame,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Role assignment, sent to one connection right after it connects
    #[serde(rename_all = "camelCase")]
    AssignPlayer { role: Role },

    /// Roster change broadcast
    #[serde(rename_all = "camelCase")]
    PlayersUpdate {
        player1_connected: bool,
        player2_connected: bool,
        total: usize,
    },

    /// Authoritative state push: the full match snapshot, never a delta
    GameStateUpdate(MatchSnapshot),
}

/// One fighter's state on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FighterSnapshot {
    pub x: f32,
    pub y: f32,
    pub facing: Facing,
    pub hp: f32,
    pub max_hp: f32,
    pub is_attacking: bool,
    pub is_blocking: bool,
    pub is_jumping: bool,
    pub jump_velocity: f32,
    pub combo: u32,
    pub special: f32,
    pub last_attack_time: u64,
}

impl From<&Fighter> for FighterSnapshot {
    fn from(f: &Fighter) -> Self {
        Self {
            x: f.x,
            y: f.y,
            facing: f.facing,
            hp: f.hp,
            max_hp: f.max_hp,
            is_attacking: f.is_attacking,
            is_blocking: f.is_blocking,
            is_jumping: f.is_jumping,
            jump_velocity: f.jump_velocity,
            combo: f.combo,
            special: f.special,
            last_attack_time: f.last_attack_time,
        }
    }
}

/// The complete serializable match state at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    pub player1: FighterSnapshot,
    pub player2: FighterSnapshot,
    pub game_started: bool,
    pub winner: Option<Winner>,
    pub round: u32,
    pub timer: u32,
}

impl From<&MatchState> for MatchSnapshot {
    fn from(state: &MatchState) -> Self {
        Self {
            player1: FighterSnapshot::from(&state.player1),
            player2: FighterSnapshot::from(&state.player2),
            game_started: state.game_started,
            winner: state.winner,
            round: state.round,
            timer: state.timer,
        }
    }
}
