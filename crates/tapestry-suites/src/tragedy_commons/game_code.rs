//! Game code anchors.
//!
//! Every game is found through an anchor `(GAME_CODES, code)`. The first
//! player creates it, later players compute the same hash from the code.
//! Each code anchor is also linked from the root `GAME_CODES` anchor so all
//! codes can be listed.

use serde::Deserialize;
use tapestry_core::{EntryHash, Player, Result};

pub const GAME_CODES_ANCHOR: &str = "GAME_CODES";
pub const GAME_CODE_LINK_TAG: &str = "GAME_CODE";

#[derive(Deserialize)]
struct AnchorContent {
    text: String,
}

fn root_anchor(player: &Player) -> EntryHash {
    player.anchor(GAME_CODES_ANCHOR, "")
}

pub fn create_game_code_anchor(player: &Player, short_unique_code: &str) -> Result<EntryHash> {
    let root = root_anchor(player);
    let anchor = player.anchor(GAME_CODES_ANCHOR, short_unique_code);
    let listed = player
        .get_links(&root, Some(GAME_CODE_LINK_TAG))
        .iter()
        .any(|link| link.target == anchor);
    if !listed {
        player.create_link(&root, &anchor, GAME_CODE_LINK_TAG)?;
    }
    Ok(anchor)
}

/// Anchor of an existing game. Anchors are idempotent, so this is the same
/// call the creator made.
pub fn get_game_code_anchor(player: &Player, game_code: &str) -> Result<EntryHash> {
    create_game_code_anchor(player, game_code)
}

/// Every game code ever anchored in this network, in creation order.
pub fn get_all_game_codes(player: &Player) -> Result<Vec<String>> {
    let root = root_anchor(player);
    player
        .get_links(&root, Some(GAME_CODE_LINK_TAG))
        .iter()
        .map(|link| player.get_as::<AnchorContent>(&link.target).map(|a| a.text))
        .collect()
}
