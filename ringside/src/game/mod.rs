//! Poker table engine - seating ring, ledger, and betting round.
//!
//! This module provides the core game implementation:
//! - Entities: cards, chips, players and their money ledger
//! - The seating ring with its rotating blind roles
//! - The betting-round state machine and action-input boundary
//! - The table orchestrator that plays complete hands

pub mod constants;
pub mod entities;
pub mod ring;
pub mod round;
pub mod table;

pub use ring::{Ring, RingError, SeatIndex};
pub use round::{
    ActionInput, ActionRequest, BettingRound, ChannelInput, EngineError, InputError, RoundPhase,
    RoundState, ScriptedInput,
};
pub use table::{FirstActorRule, GameEvent, GameSettings, RemovalReason, Table, TableError};
