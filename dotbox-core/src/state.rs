//! Abstract game-state contract shared by the search agents

use crate::player::GameResult;

/// A position that can be searched by making and unmaking actions in place
///
/// Implementors own whatever caches they need, which is why evaluation and
/// action generation take `&mut self`.
pub trait SearchState {
    type Action: Clone + std::fmt::Debug;

    /// Heuristic value from player 1's point of view
    fn evaluate(&mut self) -> f64;

    fn is_player1s_turn(&self) -> bool;

    /// Candidate actions, best-first where the state can tell
    fn actions(&mut self) -> Vec<Self::Action>;

    /// Play an action returned by [`SearchState::actions`]
    fn execute(&mut self, action: &Self::Action);

    /// Undo the most recent [`SearchState::execute`] of `action`
    fn revert(&mut self, action: &Self::Action);

    fn result(&self) -> GameResult;

    fn is_game_over(&self) -> bool;
}
