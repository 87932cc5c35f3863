//! Organizes an enriched decklist into named buckets of ownership-aware
//! stacks, with move/merge/split transfers and per-deck saved state.
//!
//! # Examples
//!
//! Seeding the default buckets and merging two partitions of a card:
//! ```
//! use deckbucket::{
//!     card::CardEntry,
//!     config::OrganizerConfig,
//!     core::transfer::Destination,
//!     session::Organizer,
//!     types::CardStatus,
//! };
//!
//! let entries = vec![CardEntry {
//!     name: "Gate".to_string(),
//!     required_quantity: 3,
//!     owned_quantity: 1,
//!     net_needed_quantity: 2,
//!     status: CardStatus::ProxyNeeded,
//!     image_url: None,
//!     rarity: None,
//!     price_usd: None,
//! }];
//!
//! let mut organizer = Organizer::open("My Deck", &entries, None, OrganizerConfig::default());
//! let payload = organizer.drag_payload("Gate-unowned").expect("stack exists");
//! let outcome = organizer.drop_payload(payload, Destination::Stack("Gate-owned".to_string()));
//! assert!(outcome.is_change());
//!
//! let merged = organizer.store().stack("Gate-owned").expect("target survives");
//! assert_eq!((merged.owned_count, merged.unowned_count), (1, 2));
//! ```
//!
//! Runtime usage with a SQLite store:
//! ```no_run
//! use deckbucket::{
//!     config::OrganizerConfig,
//!     op::Gesture,
//!     persist::sqlite::SqliteStateStore,
//!     runtime::handle::{spawn_organizer, RuntimeConfig},
//!     session::Organizer,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = SqliteStateStore::open("decks.db").expect("open sqlite");
//! let mut organizer = Organizer::open("My Deck", &[], Some(Box::new(store)), OrganizerConfig::default());
//! // The runtime saves through its own worker from here on.
//! let sink = organizer.take_store();
//! let handle = spawn_organizer(organizer, sink, RuntimeConfig::default());
//! handle
//!     .apply(Gesture::CreateBucket { name: "Print batch 1".to_string() })
//!     .await
//!     .expect("apply");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```

/// Configuration types.
pub mod config;
/// Card entries, stacks, and export lines.
pub mod card;
/// Stack builder, bucket store, and transfer protocol.
pub mod core;
/// Filter engine.
pub mod filter;
/// Gesture model.
pub mod op;
/// Persistence abstraction with memory and SQLite stores.
pub mod persist;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Selection tracker.
pub mod selection;
/// Organizer session for one deck.
pub mod session;
/// Shared primitive types and enums.
pub mod types;
