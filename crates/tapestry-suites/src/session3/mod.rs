//! Developer exercise suite: entries and hashes.

pub mod exercise;

use tapestry_core::{HarnessError, Network, Orchestrator, Result, Tape};

use crate::fixture::{self, SESSION3_HAPP};
use exercise::{Book, Greeting};

pub fn register(orchestrator: &mut Orchestrator) {
    orchestrator.register_scenario(
        "alice greets and bob reads the greeting",
        |network, t, done| async move {
            done.finish(greeting_is_shared(&network, &t).await);
        },
    );
    orchestrator.register_scenario("books are content addressed", |network, t, done| async move {
        done.finish(books_are_content_addressed(&network, &t).await);
    });
    orchestrator.register_scenario(
        "entry types outside the dna are rejected",
        |network, t, done| async move {
            done.finish(undeclared_entry_type(&network, &t).await);
        },
    );
}

async fn greeting_is_shared(network: &Network, t: &Tape) -> Result<()> {
    let players = fixture::spawn(network, fixture::uniform(SESSION3_HAPP, 2)?).await?;
    let (alice, bob) = (&players[0], &players[1]);

    let hash = exercise::say_greeting(alice, "Hello Holochain")?;
    let greeting = exercise::get_greeting(bob, &hash)?;
    t.equal(
        greeting,
        Greeting("Hello Holochain".to_string()),
        "bob reads alice's greeting",
    );
    t.ok(
        bob.get(&hash).is_some_and(|entry| &entry.author == alice.key()),
        "alice is recorded as author",
    );
    Ok(())
}

async fn books_are_content_addressed(network: &Network, t: &Tape) -> Result<()> {
    let players = fixture::spawn(network, fixture::uniform(SESSION3_HAPP, 2)?).await?;
    let (alice, bob) = (&players[0], &players[1]);
    let book = Book {
        title: "Sapiens".to_string(),
        content: "Once upon a time...".to_string(),
    };

    let from_alice = exercise::add_book(alice, &book)?;
    let from_bob = exercise::add_book(bob, &book)?;
    t.equal(&from_alice, &from_bob, "same book hashes the same for both agents");
    t.equal(network.ledger().entry_count(), 1, "ledger stores the book once");
    t.equal(exercise::get_book(bob, &from_alice)?, book.clone(), "bob fetches the book by hash");

    let sequel = Book {
        title: "Homo Deus".to_string(),
        ..book
    };
    let sequel_hash = exercise::add_book(alice, &sequel)?;
    t.ok(sequel_hash != from_alice, "different content gets a different hash");
    t.ok(
        exercise::get_greeting(bob, &sequel_hash).is_err(),
        "a book is not readable as a greeting",
    );
    Ok(())
}

async fn undeclared_entry_type(network: &Network, t: &Tape) -> Result<()> {
    let players = fixture::spawn(network, fixture::uniform(SESSION3_HAPP, 1)?).await?;
    let alice = &players[0];

    t.ok(alice.has_zome("exercise"), "exercise zome installed");
    t.not_ok(alice.has_zome("zome_01"), "game zome not installed");
    let rejected = alice.create_entry("player_profile", &Greeting("intruder".to_string()));
    t.ok(
        matches!(rejected, Err(HarnessError::UnknownEntryType { .. })),
        "player_profile is not a session3 entry type",
    );
    Ok(())
}
