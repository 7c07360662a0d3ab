//! Time utilities for game simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Simulation tick period in milliseconds
pub const TICK_MILLIS: u64 = 16;

/// Round timer period (one countdown step per second)
pub const TIMER_PERIOD: Duration = Duration::from_secs(1);

/// Attack animation clears this long after initiation (milliseconds)
pub const ATTACK_COOLDOWN_MILLIS: u64 = 200;

/// Combo resets after this much attack inactivity (milliseconds)
pub const COMBO_DECAY_MILLIS: u64 = 2000;
