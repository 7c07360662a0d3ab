//! Fighter movement and jump physics

/// Left arena boundary
pub const ARENA_MIN_X: f32 = 50.0;
/// Right arena boundary
pub const ARENA_MAX_X: f32 = 720.0;
/// Horizontal movement per tick
pub const MOVE_STEP: f32 = 5.0;
/// Ground level (y grows downward)
pub const GROUND_Y: f32 = 300.0;
/// Initial jump velocity (negative = upward)
pub const JUMP_VELOCITY: f32 = -15.0;
/// Gravity applied per tick
pub const GRAVITY: f32 = 1.0;

/// Physics system for fighter movement and jumping
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Step a fighter one move to the left, clamped to the arena
    pub fn step_left(x: f32) -> f32 {
        (x - MOVE_STEP).max(ARENA_MIN_X)
    }

    /// Step a fighter one move to the right, clamped to the arena
    pub fn step_right(x: f32) -> f32 {
        (x + MOVE_STEP).min(ARENA_MAX_X)
    }

    /// Integrate one tick of jump physics.
    /// Returns (new_y, new_velocity, still_airborne). Landing clamps to the
    /// ground and zeroes velocity.
    pub fn integrate_jump(y: f32, velocity: f32) -> (f32, f32, bool) {
        let new_y = y + velocity;
        let new_velocity = velocity + GRAVITY;

        if new_y >= GROUND_Y {
            (GROUND_Y, 0.0, false)
        } else {
            (new_y, new_velocity, true)
        }
    }
}
