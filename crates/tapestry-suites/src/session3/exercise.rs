//! Entries of the `exercise` zome: greetings and books.

use serde::{Deserialize, Serialize};
use tapestry_core::{EntryHash, HarnessError, Player, Result};

pub const GREETING: &str = "greeting";
pub const BOOK: &str = "book";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub content: String,
}

pub fn say_greeting(player: &Player, content: impl Into<String>) -> Result<EntryHash> {
    player.create_entry(GREETING, &Greeting(content.into()))
}

pub fn get_greeting(player: &Player, hash: &EntryHash) -> Result<Greeting> {
    get_typed(player, hash, GREETING)
}

/// Publish a book. Its hash depends on content only.
pub fn add_book(player: &Player, book: &Book) -> Result<EntryHash> {
    player.create_entry(BOOK, book)
}

pub fn get_book(player: &Player, hash: &EntryHash) -> Result<Book> {
    get_typed(player, hash, BOOK)
}

fn get_typed<T: serde::de::DeserializeOwned>(
    player: &Player,
    hash: &EntryHash,
    entry_type: &str,
) -> Result<T> {
    match player.get(hash) {
        Some(entry) if entry.entry_type == entry_type => player.get_as(hash),
        _ => Err(HarnessError::EntryNotFound(hash.to_string())),
    }
}
