//! Players and game outcomes

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Player identity. On the wire a player is `1` or `-1`, matching the sign
/// it contributes to score differences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Player {
    Player1,
    Player2,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::Player1 => Player::Player2,
            Player::Player2 => Player::Player1,
        }
    }

    /// `+1` for player 1, `-1` for player 2
    pub fn sign(self) -> i32 {
        match self {
            Player::Player1 => 1,
            Player::Player2 => -1,
        }
    }
}

impl From<Player> for i8 {
    fn from(player: Player) -> i8 {
        player.sign() as i8
    }
}

impl TryFrom<i8> for Player {
    type Error = GameError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Player::Player1),
            -1 => Ok(Player::Player2),
            other => Err(GameError::InvalidPlayer(other)),
        }
    }
}

/// Game result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Ongoing,
    Player1Wins,
    Player2Wins,
    Draw,
}

impl GameResult {
    /// Result for a finished game with the given score difference
    pub fn from_score_difference(diff: i32) -> Self {
        match diff.signum() {
            1 => GameResult::Player1Wins,
            -1 => GameResult::Player2Wins,
            _ => GameResult::Draw,
        }
    }

    pub fn winner(self) -> Option<Player> {
        match self {
            GameResult::Player1Wins => Some(Player::Player1),
            GameResult::Player2Wins => Some(Player::Player2),
            GameResult::Ongoing | GameResult::Draw => None,
        }
    }

    pub fn is_over(self) -> bool {
        self != GameResult::Ongoing
    }
}
