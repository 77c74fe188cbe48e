//! Endgame solving
//!
//! Level 1: decompose the board into capturable and non-capturable components
//! Level 2: exact alpha-beta over those components

pub mod components;
pub mod search;

pub use components::{CapturableComponent, CaptureSplit, Decomposition, EndgameState, NonCapturableComponent};
pub use search::{EndgameAgent, EndgameConfig, EndgameSolution};
