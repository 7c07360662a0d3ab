//! Game simulation modules

pub mod arena;
pub mod combat;
pub mod input;
pub mod r#match;
pub mod physics;

pub use arena::{Arena, ArenaHandle, RosterView};
pub use r#match::{Fighter, MatchState};

/// One of the two privileged fighter slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FighterSlot {
    One,
    Two,
}
