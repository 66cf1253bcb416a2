//! # Ringside
//!
//! A turn-based poker table engine built around three pieces:
//!
//! - a **seating ring**: the circular rotation of seated players,
//!   carrying the two blind roles and surviving eliminations;
//! - a **ledger** on every player whose balance can never go negative
//!   and whose wager accumulators feed pot accounting;
//! - a **betting-round state machine** that solicits actions from a
//!   swappable input collaborator and closes the round the moment the
//!   rotation returns to the last player who changed the bet.
//!
//! The [`Table`] orchestrator ties them together for one hand at a
//! time: reset, deal, collect the forced stakes (eliminating players
//! who cannot pay, cascading as needed), run the betting round, and
//! report standings.
//!
//! Community-card phases (flop, turn, river, showdown) and hand
//! evaluation are deliberately out of scope; the dealer and input
//! boundaries are the extension points they would plug into.
//!
//! ## Example
//!
//! ```
//! use ringside::{Action, GameSettings, Table};
//! use ringside::game::ScriptedInput;
//!
//! let mut table = Table::new(GameSettings::default()).unwrap();
//! table.add_player("alice").unwrap();
//! table.add_player("bob").unwrap();
//!
//! let mut input = ScriptedInput::new([Action::Call, Action::Check]);
//! let standings = table.play_hand(&mut input).unwrap();
//! assert_eq!(standings.players.len(), 2);
//! ```

/// Core game logic: entities, the seating ring, and the betting round.
pub mod game;
pub use game::{
    FirstActorRule, GameEvent, GameSettings, Table, TableError,
    constants::{self, DEFAULT_BIG_BLIND, DEFAULT_BUY_IN, DEFAULT_SMALL_BLIND, MAX_PLAYERS},
    entities::{self, Action, Chips, Player, PlayerName, TableSnapshot},
};
