//! Game rounds. Every session starts with round zero, which holds the
//! starting resources and collects the first moves.

use serde::{Deserialize, Serialize};
use tapestry_core::{EntryHash, Player, Result};

use super::game_session::{PlayerStats, ResourceAmount};

pub const GAME_ROUND: &str = "game_round";
pub const SESSION_TO_ROUND_TAG: &str = "GAME_ROUND";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GameRound {
    pub round_num: u32,
    pub session: EntryHash,
    pub resources_left: ResourceAmount,
    pub resources_taken: ResourceAmount,
    pub resources_grown: ResourceAmount,
    pub player_moves: PlayerStats,
}

impl GameRound {
    pub fn zero(session: EntryHash, start_amount: ResourceAmount) -> Self {
        Self {
            round_num: 0,
            session,
            resources_left: start_amount,
            resources_taken: 0,
            resources_grown: 0,
            player_moves: PlayerStats::new(),
        }
    }
}

/// Publish round zero of `session` and link it from the session.
pub fn create_round_zero(
    player: &Player,
    session: &EntryHash,
    start_amount: ResourceAmount,
) -> Result<EntryHash> {
    let round = GameRound::zero(session.clone(), start_amount);
    let hash = player.create_entry(GAME_ROUND, &round)?;
    player.create_link(session, &hash, SESSION_TO_ROUND_TAG)?;
    Ok(hash)
}

/// Rounds linked from a session, in creation order.
pub fn get_rounds_for_session(player: &Player, session: &EntryHash) -> Result<Vec<GameRound>> {
    player.get_linked(session, SESSION_TO_ROUND_TAG)
}
