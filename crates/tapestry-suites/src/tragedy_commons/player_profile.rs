//! Player profiles linked from a game code.

use serde::{Deserialize, Serialize};
use tapestry_core::{AgentKey, EntryHash, Player, Result};

use super::game_code::get_game_code_anchor;

pub const PLAYER_PROFILE: &str = "player_profile";
pub const PLAYER_LINK_TAG: &str = "PLAYER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player_id: AgentKey,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGameInfo {
    pub game_code: String,
    pub nickname: String,
}

/// Publish the calling agent's profile and return its hash.
pub fn create_and_hash_entry_player_profile(player: &Player, nickname: &str) -> Result<EntryHash> {
    let profile = PlayerProfile {
        player_id: player.key().clone(),
        nickname: nickname.to_string(),
    };
    player.create_entry(PLAYER_PROFILE, &profile)
}

/// Link a fresh profile from the game's anchor. Returns the anchor.
pub fn join_game_with_code(player: &Player, input: &JoinGameInfo) -> Result<EntryHash> {
    let anchor = get_game_code_anchor(player, &input.game_code)?;
    let profile = create_and_hash_entry_player_profile(player, &input.nickname)?;
    player.create_link(&anchor, &profile, PLAYER_LINK_TAG)?;
    tracing::debug!(agent = %player.key().short(), game_code = %input.game_code, "joined game");
    Ok(anchor)
}

/// Profiles of everyone who joined `short_unique_code`, in join order.
pub fn get_player_profiles_for_game_code(
    player: &Player,
    short_unique_code: &str,
) -> Result<Vec<PlayerProfile>> {
    let anchor = get_game_code_anchor(player, short_unique_code)?;
    player.get_linked(&anchor, PLAYER_LINK_TAG)
}
