//! Game sessions started from a game code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tapestry_core::{AgentKey, EntryHash, Player, Result};

use super::game_code::get_game_code_anchor;
use super::game_round::create_round_zero;
use super::player_profile::get_player_profiles_for_game_code;

pub const GAME_SESSION: &str = "game_session";
pub const OWNER_SESSION_TAG: &str = "MY_GAMES";
pub const GAME_CODE_TO_SESSION_TAG: &str = "GAME_SESSION";

/// Anchor kind for per-agent link bases.
const AGENT_ANCHOR: &str = "AGENT";

pub type ResourceAmount = i32;

pub type PlayerStats = BTreeMap<AgentKey, ResourceAmount>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum SessionState {
    InProgress,
    /// All resources spent before the last round.
    Lost { last_round: EntryHash },
    /// Every round played with resources left.
    Finished { last_round: EntryHash },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct GameParams {
    pub regeneration_factor: f32,
    pub start_amount: ResourceAmount,
    pub num_rounds: u32,
}

impl Default for GameParams {
    fn default() -> Self {
        Self {
            regeneration_factor: 1.1,
            start_amount: 100,
            num_rounds: 3,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GameSession {
    pub owner: AgentKey,
    pub status: SessionState,
    pub game_params: GameParams,
    pub players: Vec<AgentKey>,
    pub scores: PlayerStats,
    /// Game code anchor.
    pub anchor: EntryHash,
}

fn agent_anchor(player: &Player) -> EntryHash {
    player.anchor(AGENT_ANCHOR, player.key().as_str())
}

/// Start a session with everyone who joined `game_code` so far.
pub fn start_game_session_with_code(player: &Player, game_code: &str) -> Result<EntryHash> {
    let anchor = get_game_code_anchor(player, game_code)?;
    let players = get_player_profiles_for_game_code(player, game_code)?
        .into_iter()
        .map(|profile| profile.player_id)
        .collect();
    new_session(player, players, GameParams::default(), anchor)
}

/// Publish a session owned by the calling agent and make it discoverable
/// from both the owner and the game code. Round zero is created and linked
/// from the session, so the path is game code, session, round.
pub fn new_session(
    player: &Player,
    players: Vec<AgentKey>,
    game_params: GameParams,
    anchor: EntryHash,
) -> Result<EntryHash> {
    let session = GameSession {
        owner: player.key().clone(),
        status: SessionState::InProgress,
        game_params,
        players,
        scores: PlayerStats::new(),
        anchor: anchor.clone(),
    };
    let hash = player.create_entry(GAME_SESSION, &session)?;
    player.create_link(&agent_anchor(player), &hash, OWNER_SESSION_TAG)?;
    player.create_link(&anchor, &hash, GAME_CODE_TO_SESSION_TAG)?;
    create_round_zero(player, &hash, session.game_params.start_amount)?;
    Ok(hash)
}

/// Sessions owned by the calling agent, with their hashes.
pub fn get_my_own_sessions(player: &Player) -> Result<Vec<(EntryHash, GameSession)>> {
    player
        .get_links(&agent_anchor(player), Some(OWNER_SESSION_TAG))
        .into_iter()
        .map(|link| {
            let session = player.get_as::<GameSession>(&link.target)?;
            Ok((link.target, session))
        })
        .collect()
}

pub fn get_sessions_for_game_code(player: &Player, game_code: &str) -> Result<Vec<GameSession>> {
    let anchor = get_game_code_anchor(player, game_code)?;
    player.get_linked(&anchor, GAME_CODE_TO_SESSION_TAG)
}
