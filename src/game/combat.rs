//! Combat resolution - damage, range, blocking, combo scaling

use super::r#match::Fighter;

/// Maximum horizontal distance for an attack to land
pub const ATTACK_RANGE: f32 = 80.0;
/// Base damage of a normal attack
pub const NORMAL_DAMAGE: f32 = 15.0;
/// Base damage of a special attack
pub const SPECIAL_DAMAGE: f32 = 25.0;
/// Damage multiplier while the defender holds block
pub const BLOCK_MULTIPLIER: f32 = 0.3;
/// Special meter cost of a special attack
pub const SPECIAL_COST: f32 = 50.0;
/// Special meter ceiling
pub const SPECIAL_MAX: f32 = 100.0;
/// Passive special meter regeneration per tick
pub const SPECIAL_REGEN: f32 = 0.5;

/// Attack flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackKind {
    Normal,
    Special,
}

impl AttackKind {
    pub fn base_damage(self) -> f32 {
        match self {
            AttackKind::Normal => NORMAL_DAMAGE,
            AttackKind::Special => SPECIAL_DAMAGE,
        }
    }
}

/// Outcome of resolving one attack against one defender
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOutcome {
    /// Defender hp after the attack (floored at 0)
    pub defender_hp: f32,
    /// The hit was blocked, so the attacker's combo streak resets
    pub combo_broken: bool,
}

/// Combat system for resolving attacks
pub struct CombatSystem;

impl CombatSystem {
    /// Resolve one attack. Pure: callers apply the outcome themselves.
    ///
    /// Out-of-range attacks whiff: hp unchanged, no combo break. Blocked
    /// hits land at 30% damage (fractional hp is allowed transiently) and
    /// break the attacker's combo.
    pub fn resolve(attacker: &Fighter, defender: &Fighter, kind: AttackKind) -> HitOutcome {
        let distance = (attacker.x - defender.x).abs();
        if distance >= ATTACK_RANGE {
            return HitOutcome {
                defender_hp: defender.hp,
                combo_broken: false,
            };
        }

        let mut damage = kind.base_damage();
        if attacker.combo > 0 {
            damage += (attacker.combo * 2) as f32;
        }

        if defender.is_blocking {
            damage *= BLOCK_MULTIPLIER;
            HitOutcome {
                defender_hp: (defender.hp - damage).max(0.0),
                combo_broken: true,
            }
        } else {
            HitOutcome {
                defender_hp: (defender.hp - damage).max(0.0),
                combo_broken: false,
            }
        }
    }
}
