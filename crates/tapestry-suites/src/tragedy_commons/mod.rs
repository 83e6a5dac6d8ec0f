//! Tragedy of the commons: players gather under a game code and start a
//! shared game session.

pub mod game_code;
pub mod game_round;
pub mod game_session;
pub mod player_profile;

use tapestry_core::{HarnessError, Network, Orchestrator, Result, Tape};

use crate::fixture::{self, SESSION3_HAPP, TRAGEDY_COMMONS_HAPP};
use game_session::{GameParams, SessionState};
use player_profile::JoinGameInfo;

const GAME_CODE: &str = "ABCDE";

pub fn register(orchestrator: &mut Orchestrator) {
    orchestrator.register_scenario("game code anchor is shared", |network, t, done| async move {
        done.finish(anchor_is_shared(&network, &t).await);
    });
    orchestrator.register_scenario("players join with a game code", |network, t, done| async move {
        done.finish(players_join(&network, &t).await);
    });
    orchestrator.register_scenario("owner starts a game session", |network, t, done| async move {
        done.finish(owner_starts_session(&network, &t).await);
    });
    orchestrator.register_scenario(
        "agents without the game dna cannot join",
        |network, t, done| async move {
            done.finish(join_requires_game_dna(&network, &t).await);
        },
    );
}

fn join(code: &str, nickname: &str) -> JoinGameInfo {
    JoinGameInfo {
        game_code: code.to_string(),
        nickname: nickname.to_string(),
    }
}

async fn anchor_is_shared(network: &Network, t: &Tape) -> Result<()> {
    let players = fixture::spawn(network, fixture::uniform(TRAGEDY_COMMONS_HAPP, 2)?).await?;
    let (alice, bob) = (&players[0], &players[1]);

    let created = game_code::create_game_code_anchor(alice, GAME_CODE)?;
    let found = game_code::get_game_code_anchor(bob, GAME_CODE)?;
    t.equal(&created, &found, "bob finds alice's anchor from the code");
    t.equal(
        game_code::get_all_game_codes(bob)?,
        vec![GAME_CODE.to_string()],
        "game code listed once",
    );
    Ok(())
}

async fn players_join(network: &Network, t: &Tape) -> Result<()> {
    let players = fixture::spawn(network, fixture::uniform(TRAGEDY_COMMONS_HAPP, 2)?).await?;
    let (alice, bob) = (&players[0], &players[1]);

    game_code::create_game_code_anchor(alice, GAME_CODE)?;
    let alice_anchor = player_profile::join_game_with_code(alice, &join(GAME_CODE, "alice"))?;
    let bob_anchor = player_profile::join_game_with_code(bob, &join(GAME_CODE, "bob"))?;
    t.equal(&alice_anchor, &bob_anchor, "both joined the same game");

    let profiles = player_profile::get_player_profiles_for_game_code(bob, GAME_CODE)?;
    let nicknames: Vec<&str> = profiles.iter().map(|p| p.nickname.as_str()).collect();
    t.equal(nicknames, vec!["alice", "bob"], "profiles listed in join order");
    t.ok(
        profiles[0].player_id == *alice.key() && profiles[1].player_id == *bob.key(),
        "profiles carry the joining agents' keys",
    );
    t.equal(
        player_profile::get_player_profiles_for_game_code(alice, "ZZZZZ")?.len(),
        0,
        "another code has no players",
    );
    Ok(())
}

async fn owner_starts_session(network: &Network, t: &Tape) -> Result<()> {
    let players = fixture::spawn(network, fixture::uniform(TRAGEDY_COMMONS_HAPP, 2)?).await?;
    let (alice, bob) = (&players[0], &players[1]);

    player_profile::join_game_with_code(alice, &join(GAME_CODE, "alice"))?;
    player_profile::join_game_with_code(bob, &join(GAME_CODE, "bob"))?;
    let hash = game_session::start_game_session_with_code(alice, GAME_CODE)?;

    let mine = game_session::get_my_own_sessions(alice)?;
    t.equal(mine.len(), 1, "alice owns one session");
    let Some((owned_hash, session)) = mine.into_iter().next() else {
        return Ok(());
    };
    t.equal(&owned_hash, &hash, "owned session is the one just started");
    t.equal(&session.owner, alice.key(), "alice is the owner");
    t.equal(
        session.players.clone(),
        vec![alice.key().clone(), bob.key().clone()],
        "session includes everyone who joined",
    );
    t.equal(session.status.clone(), SessionState::InProgress, "session in progress");
    t.equal(session.game_params, GameParams::default(), "default game parameters");
    t.ok(session.scores.is_empty(), "no scores yet");

    let rounds = game_round::get_rounds_for_session(bob, &hash)?;
    t.equal(rounds.len(), 1, "session starts with one round");
    if let Some(round) = rounds.first() {
        t.equal(round.round_num, 0, "first round is round zero");
        t.equal(
            round.resources_left,
            session.game_params.start_amount,
            "round zero holds the starting resources",
        );
        t.equal(&round.session, &hash, "round points back at its session");
    }

    t.equal(game_session::get_my_own_sessions(bob)?.len(), 0, "bob owns none");
    t.equal(
        game_session::get_sessions_for_game_code(bob, GAME_CODE)?,
        vec![session],
        "session discoverable from the game code",
    );
    Ok(())
}

async fn join_requires_game_dna(network: &Network, t: &Tape) -> Result<()> {
    let descriptor = fixture::per_agent(&[SESSION3_HAPP, TRAGEDY_COMMONS_HAPP])?;
    let players = fixture::spawn(network, descriptor).await?;
    let (outsider, carol) = (&players[0], &players[1]);

    t.ok(!outsider.has_zome("zome_01"), "agent 0 installed session3 only");
    t.ok(carol.has_zome("zome_01"), "agent 1 installed tragedy-commons");

    let rejected = player_profile::join_game_with_code(outsider, &join(GAME_CODE, "mallory"));
    t.ok(
        matches!(rejected, Err(HarnessError::UnknownEntryType { .. })),
        "profile creation rejected without the game dna",
    );
    player_profile::join_game_with_code(carol, &join(GAME_CODE, "carol"))?;
    let profiles = player_profile::get_player_profiles_for_game_code(carol, GAME_CODE)?;
    t.equal(profiles.len(), 1, "only carol joined");
    Ok(())
}
