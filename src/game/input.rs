//! Input store - latest known key state per fighter slot

use std::collections::HashMap;

use super::FighterSlot;

/// Key symbols the simulation reads for one fighter slot.
/// Bindings are fixed: WASD + FGH for player 1, arrows + 123 for player 2.
#[derive(Debug, Clone, Copy)]
pub struct KeyBindings {
    pub left: &'static str,
    pub right: &'static str,
    pub jump: &'static str,
    pub attack: &'static str,
    pub block: &'static str,
    pub special: &'static str,
}

impl KeyBindings {
    pub fn for_slot(slot: FighterSlot) -> Self {
        match slot {
            FighterSlot::One => Self {
                left: "a",
                right: "d",
                jump: "w",
                attack: "f",
                block: "g",
                special: "h",
            },
            FighterSlot::Two => Self {
                left: "arrowleft",
                right: "arrowright",
                jump: "arrowup",
                attack: "1",
                block: "2",
                special: "3",
            },
        }
    }
}

/// Latest known key state for one fighter slot.
/// Overwritten wholesale on each input message (last-write-wins, no queue).
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    keys: HashMap<String, bool>,
}

impl KeyState {
    /// Replace the whole key map. Keys are normalized to lowercase.
    pub fn replace(&mut self, keys: HashMap<String, bool>) {
        self.keys = keys
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
    }

    /// Drop all state (slot released)
    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn pressed(&self, symbol: &str) -> bool {
        self.keys.get(symbol).copied().unwrap_or(false)
    }
}

/// Per-slot input state held by the arena
#[derive(Debug, Clone, Default)]
pub struct InputStore {
    player1: KeyState,
    player2: KeyState,
}

impl InputStore {
    pub fn set(&mut self, slot: FighterSlot, keys: HashMap<String, bool>) {
        self.state_mut(slot).replace(keys);
    }

    pub fn clear(&mut self, slot: FighterSlot) {
        self.state_mut(slot).clear();
    }

    pub fn state(&self, slot: FighterSlot) -> &KeyState {
        match slot {
            FighterSlot::One => &self.player1,
            FighterSlot::Two => &self.player2,
        }
    }

    fn state_mut(&mut self, slot: FighterSlot) -> &mut KeyState {
        match slot {
            FighterSlot::One => &mut self.player1,
            FighterSlot::Two => &mut self.player2,
        }
    }
}
