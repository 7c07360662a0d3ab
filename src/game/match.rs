//! Authoritative match state and the fixed-step simulation

use crate::util::time::COMBO_DECAY_MILLIS;
use crate::ws::protocol::{Facing, Winner};

use super::combat::{AttackKind, CombatSystem, SPECIAL_COST, SPECIAL_MAX, SPECIAL_REGEN};
use super::input::{InputStore, KeyBindings};
use super::physics::{PhysicsSystem, GROUND_Y, JUMP_VELOCITY};
use super::FighterSlot;

/// Starting health for both fighters
pub const START_HP: f32 = 100.0;
/// Default round length in seconds
pub const DEFAULT_ROUND_SECS: u32 = 90;

/// One combatant's authoritative state
#[derive(Debug, Clone)]
pub struct Fighter {
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
    /// Special key observed pressed on the previous tick (edge detection,
    /// not part of the broadcast snapshot)
    pub special_held: bool,
}

impl Fighter {
    /// Fresh fighter at its slot's spawn point, facing the opponent
    pub fn spawn(slot: FighterSlot) -> Self {
        let (x, facing) = match slot {
            FighterSlot::One => (100.0, Facing::Right),
            FighterSlot::Two => (600.0, Facing::Left),
        };

        Self {
            x,
            y: GROUND_Y,
            facing,
            hp: START_HP,
            max_hp: START_HP,
            is_attacking: false,
            is_blocking: false,
            is_jumping: false,
            jump_velocity: 0.0,
            combo: 0,
            special: SPECIAL_MAX,
            last_attack_time: 0,
            special_held: false,
        }
    }
}

/// Event produced by a tick that needs follow-up outside the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEvent {
    /// A fighter initiated an attack; its attacking flag clears after the
    /// cooldown, scheduled by the caller
    AttackStarted { slot: FighterSlot },
}

/// The aggregate authoritative match state.
///
/// Replaced wholesale on start/restart, mutated in place by the tick and
/// round timer while running, frozen once a winner is set.
#[derive(Debug, Clone)]
pub struct MatchState {
    pub player1: Fighter,
    pub player2: Fighter,
    pub game_started: bool,
    pub winner: Option<Winner>,
    pub round: u32,
    pub timer: u32,
}

impl MatchState {
    /// Idle match shown to clients before anyone presses start
    pub fn new(round_seconds: u32) -> Self {
        Self {
            player1: Fighter::spawn(FighterSlot::One),
            player2: Fighter::spawn(FighterSlot::Two),
            game_started: false,
            winner: None,
            round: 1,
            timer: round_seconds,
        }
    }

    /// Fresh match, running
    pub fn start(round_seconds: u32) -> Self {
        Self {
            game_started: true,
            ..Self::new(round_seconds)
        }
    }

    /// A tick or timer firing may mutate only while this holds
    pub fn running(&self) -> bool {
        self.game_started && self.winner.is_none()
    }

    /// Pause in place (fighter disconnect): values are kept so a later
    /// restart decision is up to the players, but clocks stop mattering
    pub fn pause(&mut self) {
        self.game_started = false;
    }

    pub fn fighter_mut(&mut self, slot: FighterSlot) -> &mut Fighter {
        match slot {
            FighterSlot::One => &mut self.player1,
            FighterSlot::Two => &mut self.player2,
        }
    }

    /// Split borrow: (fighter in `slot`, its opponent)
    fn pair_mut(&mut self, slot: FighterSlot) -> (&mut Fighter, &mut Fighter) {
        match slot {
            FighterSlot::One => (&mut self.player1, &mut self.player2),
            FighterSlot::Two => (&mut self.player2, &mut self.player1),
        }
    }

    /// Advance one fixed simulation step.
    ///
    /// Input handling runs in fixed order (player 1 then player 2), then
    /// physics, meter regeneration, combo decay, and the win check apply to
    /// both fighters. No-op unless the match is running.
    pub fn tick(&mut self, inputs: &InputStore, now_ms: u64) -> Vec<TickEvent> {
        if !self.running() {
            return Vec::new();
        }

        let mut events = Vec::new();

        for slot in [FighterSlot::One, FighterSlot::Two] {
            self.apply_fighter_inputs(slot, inputs, now_ms, &mut events);
        }

        for slot in [FighterSlot::One, FighterSlot::Two] {
            let fighter = self.fighter_mut(slot);

            if fighter.is_jumping {
                let (y, vel, airborne) =
                    PhysicsSystem::integrate_jump(fighter.y, fighter.jump_velocity);
                fighter.y = y;
                fighter.jump_velocity = vel;
                fighter.is_jumping = airborne;
            }

            if fighter.special < SPECIAL_MAX {
                fighter.special = (fighter.special + SPECIAL_REGEN).min(SPECIAL_MAX);
            }

            if now_ms.saturating_sub(fighter.last_attack_time) > COMBO_DECAY_MILLIS {
                fighter.combo = 0;
            }
        }

        // Fixed tie-break: player 2's hp is checked first, so a simultaneous
        // knockout resolves in favor of player 1
        if self.player2.hp <= 0.0 {
            self.winner = Some(Winner::Player1);
        } else if self.player1.hp <= 0.0 {
            self.winner = Some(Winner::Player2);
        }

        events
    }

    fn apply_fighter_inputs(
        &mut self,
        slot: FighterSlot,
        inputs: &InputStore,
        now_ms: u64,
        events: &mut Vec<TickEvent>,
    ) {
        let bindings = KeyBindings::for_slot(slot);
        let keys = inputs.state(slot);
        let (fighter, opponent) = self.pair_mut(slot);

        if keys.pressed(bindings.left) {
            fighter.x = PhysicsSystem::step_left(fighter.x);
            fighter.facing = Facing::Left;
        }
        if keys.pressed(bindings.right) {
            fighter.x = PhysicsSystem::step_right(fighter.x);
            fighter.facing = Facing::Right;
        }

        if keys.pressed(bindings.jump) && !fighter.is_jumping {
            fighter.is_jumping = true;
            fighter.jump_velocity = JUMP_VELOCITY;
        }

        // Block mirrors the key exactly, not edge-triggered
        fighter.is_blocking = keys.pressed(bindings.block);

        // Normal attack is edge-triggered via the attacking flag; the flag
        // clears after the cooldown, scheduled by the arena
        if keys.pressed(bindings.attack) && !fighter.is_attacking {
            fighter.is_attacking = true;
            fighter.last_attack_time = now_ms;

            let outcome = CombatSystem::resolve(fighter, opponent, AttackKind::Normal);
            opponent.hp = outcome.defender_hp;
            fighter.combo = if outcome.combo_broken {
                0
            } else {
                fighter.combo + 1
            };

            events.push(TickEvent::AttackStarted { slot });
        }

        // Special fires once per key press, never while the key stays held
        let special_pressed = keys.pressed(bindings.special);
        if special_pressed && !fighter.special_held && fighter.special >= SPECIAL_COST {
            fighter.special -= SPECIAL_COST;

            let outcome = CombatSystem::resolve(fighter, opponent, AttackKind::Special);
            opponent.hp = outcome.defender_hp;
            fighter.combo += 1;
        }
        fighter.special_held = special_pressed;
    }

    /// One round-timer firing (nominal once per second). No-op unless the
    /// match is running. At zero, higher hp wins; equal hp is a draw.
    pub fn timer_tick(&mut self) {
        if !self.running() {
            return;
        }

        self.timer = self.timer.saturating_sub(1);
        if self.timer == 0 {
            self.winner = Some(if self.player1.hp > self.player2.hp {
                Winner::Player1
            } else if self.player2.hp > self.player1.hp {
                Winner::Player2
            } else {
                Winner::Draw
            });
        }
    }

    /// Attack cooldown expiry: clear the slot's attacking flag
    pub fn clear_attack(&mut self, slot: FighterSlot) {
        self.fighter_mut(slot).is_attacking = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::combat::ATTACK_RANGE;
    use std::collections::HashMap;

    const NOW: u64 = 1_000_000;

    fn started() -> MatchState {
        MatchState::start(DEFAULT_ROUND_SECS)
    }

    fn press(store: &mut InputStore, slot: FighterSlot, keys: &[&str]) {
        let map: HashMap<String, bool> = keys.iter().map(|k| (k.to_string(), true)).collect();
        store.set(slot, map);
    }

    #[test]
    fn tick_is_noop_before_start() {
        let mut state = MatchState::new(DEFAULT_ROUND_SECS);
        let mut inputs = InputStore::default();
        press(&mut inputs, FighterSlot::One, &["d"]);

        let events = state.tick(&inputs, NOW);
        assert!(events.is_empty());
        assert_eq!(state.player1.x, 100.0);
    }

    #[test]
    fn tick_is_noop_after_winner() {
        let mut state = started();
        state.winner = Some(Winner::Player1);
        let mut inputs = InputStore::default();
        press(&mut inputs, FighterSlot::One, &["d"]);

        state.tick(&inputs, NOW);
        assert_eq!(state.player1.x, 100.0);
    }

    #[test]
    fn movement_updates_position_and_facing() {
        let mut state = started();
        let mut inputs = InputStore::default();
        press(&mut inputs, FighterSlot::One, &["d"]);
        press(&mut inputs, FighterSlot::Two, &["arrowleft"]);

        state.tick(&inputs, NOW);
        assert_eq!(state.player1.x, 105.0);
        assert_eq!(state.player1.facing, Facing::Right);
        assert_eq!(state.player2.x, 595.0);
        assert_eq!(state.player2.facing, Facing::Left);
    }

    #[test]
    fn jump_initiates_once_and_lands() {
        let mut state = started();
        let mut inputs = InputStore::default();
        press(&mut inputs, FighterSlot::One, &["w"]);

        state.tick(&inputs, NOW);
        assert!(state.player1.is_jumping);
        assert!(state.player1.y < GROUND_Y);

        // Holding jump mid-air must not re-launch
        let vel_after_first = state.player1.jump_velocity;
        state.tick(&inputs, NOW);
        assert!(state.player1.jump_velocity > vel_after_first);

        for _ in 0..60 {
            state.tick(&inputs, NOW);
        }
        // Lands and immediately re-jumps while held; y never passes the floor
        assert!(state.player1.y <= GROUND_Y);
    }

    #[test]
    fn block_mirrors_key_state() {
        let mut state = started();
        let mut inputs = InputStore::default();
        press(&mut inputs, FighterSlot::One, &["g"]);

        state.tick(&inputs, NOW);
        assert!(state.player1.is_blocking);

        inputs.set(FighterSlot::One, HashMap::new());
        state.tick(&inputs, NOW);
        assert!(!state.player1.is_blocking);
    }

    #[test]
    fn out_of_range_attack_leaves_hp_unchanged() {
        let mut state = started();
        // Spawn distance is 500, well past attack range
        assert!((state.player1.x - state.player2.x).abs() >= ATTACK_RANGE);

        let mut inputs = InputStore::default();
        press(&mut inputs, FighterSlot::One, &["f"]);

        state.tick(&inputs, NOW);
        assert_eq!(state.player2.hp, START_HP);
        assert!(state.player1.is_attacking);
    }

    #[test]
    fn in_range_attack_lands_and_builds_combo() {
        let mut state = started();
        state.player1.x = 550.0;

        let mut inputs = InputStore::default();
        press(&mut inputs, FighterSlot::One, &["f"]);

        let events = state.tick(&inputs, NOW);
        assert_eq!(state.player2.hp, 85.0);
        assert_eq!(state.player1.combo, 1);
        assert_eq!(
            events,
            vec![TickEvent::AttackStarted {
                slot: FighterSlot::One
            }]
        );
    }

    #[test]
    fn held_attack_key_does_not_refire_during_cooldown() {
        let mut state = started();
        state.player1.x = 550.0;

        let mut inputs = InputStore::default();
        press(&mut inputs, FighterSlot::One, &["f"]);

        state.tick(&inputs, NOW);
        state.tick(&inputs, NOW + 16);
        state.tick(&inputs, NOW + 32);
        assert_eq!(state.player2.hp, 85.0, "attack fired more than once");

        // Cooldown expiry re-arms the attack
        state.clear_attack(FighterSlot::One);
        state.tick(&inputs, NOW + 200);
        assert_eq!(state.player2.hp, 85.0 - (15.0 + 2.0)); // combo 1 bonus
    }

    #[test]
    fn blocked_attack_resets_attacker_combo() {
        let mut state = started();
        state.player1.x = 550.0;
        state.player1.combo = 3;
        state.player1.last_attack_time = NOW;

        // Player 2 raises block one tick before the attack arrives; within a
        // tick, player 1 acts on player 2's state from the previous tick
        let mut inputs = InputStore::default();
        press(&mut inputs, FighterSlot::Two, &["2"]);
        state.tick(&inputs, NOW);
        assert!(state.player2.is_blocking);

        press(&mut inputs, FighterSlot::One, &["f"]);
        state.tick(&inputs, NOW + 16);

        assert_eq!(state.player1.combo, 0);
        // 15 + 3*2 = 21 raw, blocked to 30%
        assert_eq!(state.player2.hp, START_HP - 21.0 * 0.3);
    }

    #[test]
    fn special_fires_once_per_press_and_costs_meter() {
        let mut state = started();
        state.player1.x = 550.0;
        // Keep the combo streak alive through the test window
        state.player1.last_attack_time = NOW;

        let mut inputs = InputStore::default();
        press(&mut inputs, FighterSlot::One, &["h"]);

        state.tick(&inputs, NOW);
        let hp_after_one = state.player2.hp;
        // First special at combo 0: raw 25 damage
        assert_eq!(hp_after_one, START_HP - 25.0);
        assert_eq!(state.player1.combo, 1);
        // 100 - 50 cost + 0.5 regen
        assert_eq!(state.player1.special, 50.5);

        // Held key must not rapid-fire even though meter still suffices
        state.tick(&inputs, NOW + 16);
        assert_eq!(state.player2.hp, hp_after_one);

        // Release then press again fires a second special
        inputs.set(FighterSlot::One, HashMap::new());
        state.tick(&inputs, NOW + 32);
        press(&mut inputs, FighterSlot::One, &["h"]);
        state.tick(&inputs, NOW + 48);
        assert!(state.player2.hp < hp_after_one);
    }

    #[test]
    fn special_requires_half_meter() {
        let mut state = started();
        state.player1.x = 550.0;
        state.player1.special = 49.0;

        let mut inputs = InputStore::default();
        press(&mut inputs, FighterSlot::One, &["h"]);

        state.tick(&inputs, NOW);
        assert_eq!(state.player2.hp, START_HP);
        assert_eq!(state.player1.special, 49.5); // regen only
    }

    #[test]
    fn special_meter_regenerates_and_caps_at_max() {
        let mut state = started();
        state.player1.special = 99.8;

        let inputs = InputStore::default();
        state.tick(&inputs, NOW);
        assert_eq!(state.player1.special, SPECIAL_MAX);

        state.tick(&inputs, NOW);
        assert_eq!(state.player1.special, SPECIAL_MAX);
    }

    #[test]
    fn combo_decays_after_inactivity() {
        let mut state = started();
        state.player1.combo = 4;
        state.player1.last_attack_time = NOW;

        let inputs = InputStore::default();
        state.tick(&inputs, NOW + COMBO_DECAY_MILLIS);
        assert_eq!(state.player1.combo, 4);

        state.tick(&inputs, NOW + COMBO_DECAY_MILLIS + 1);
        assert_eq!(state.player1.combo, 0);
    }

    #[test]
    fn simultaneous_knockout_resolves_to_player1() {
        let mut state = started();
        state.player1.hp = 0.0;
        state.player2.hp = 0.0;

        state.tick(&InputStore::default(), NOW);
        assert_eq!(state.winner, Some(Winner::Player1));
    }

    #[test]
    fn knockout_sets_winner() {
        let mut state = started();
        state.player1.hp = 0.0;

        state.tick(&InputStore::default(), NOW);
        assert_eq!(state.winner, Some(Winner::Player2));
    }

    #[test]
    fn hp_and_special_stay_bounded_over_many_ticks() {
        let mut state = started();
        state.player1.x = 550.0;

        let mut inputs = InputStore::default();
        press(&mut inputs, FighterSlot::One, &["f", "h"]);
        press(&mut inputs, FighterSlot::Two, &["1", "2", "3"]);

        for i in 0..500 {
            let now = NOW + i * 16;
            state.tick(&inputs, now);
            state.clear_attack(FighterSlot::One);
            state.clear_attack(FighterSlot::Two);

            for f in [&state.player1, &state.player2] {
                assert!(f.hp >= 0.0 && f.hp <= f.max_hp);
                assert!(f.special >= 0.0 && f.special <= SPECIAL_MAX);
            }
        }
    }

    #[test]
    fn timer_counts_down_only_while_running() {
        let mut state = MatchState::new(DEFAULT_ROUND_SECS);
        state.timer_tick();
        assert_eq!(state.timer, DEFAULT_ROUND_SECS);

        let mut state = started();
        state.timer_tick();
        assert_eq!(state.timer, DEFAULT_ROUND_SECS - 1);
    }

    #[test]
    fn timer_expiry_equal_hp_is_draw() {
        let mut state = started();
        state.timer = 1;

        state.timer_tick();
        assert_eq!(state.timer, 0);
        assert_eq!(state.winner, Some(Winner::Draw));
    }

    #[test]
    fn timer_expiry_higher_hp_wins() {
        let mut state = started();
        state.timer = 1;
        state.player2.hp = 40.0;

        state.timer_tick();
        assert_eq!(state.winner, Some(Winner::Player1));

        let mut state = started();
        state.timer = 1;
        state.player1.hp = 40.0;

        state.timer_tick();
        assert_eq!(state.winner, Some(Winner::Player2));
    }

    #[test]
    fn timer_never_goes_below_zero() {
        let mut state = started();
        state.timer = 0;

        // Running with timer already at 0: decrement saturates, match ends
        state.timer_tick();
        assert_eq!(state.timer, 0);
    }

    #[test]
    fn pause_freezes_simulation_but_keeps_values() {
        let mut state = started();
        state.player2.hp = 42.0;
        state.pause();

        assert!(!state.game_started);
        assert_eq!(state.player2.hp, 42.0);

        let mut inputs = InputStore::default();
        press(&mut inputs, FighterSlot::One, &["d"]);
        state.tick(&inputs, NOW);
        assert_eq!(state.player1.x, 100.0);
    }

    #[test]
    fn restart_replaces_state_wholesale() {
        let mut state = started();
        state.player1.hp = 5.0;
        state.player2.combo = 9;
        state.timer = 3;
        state.winner = Some(Winner::Player2);

        state = MatchState::start(DEFAULT_ROUND_SECS);
        assert!(state.running());
        assert_eq!(state.player1.hp, START_HP);
        assert_eq!(state.player2.combo, 0);
        assert_eq!(state.timer, DEFAULT_ROUND_SECS);
        assert_eq!(state.winner, None);
    }
}
