use log::debug;
use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    collections::HashSet,
    fmt,
    hash::{Hash, Hasher},
    mem::discriminant,
};
use thiserror::Error;

use super::constants;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values (2u8 ... ace=14u8).
pub type Value = u8;

/// A card is a tuple of a uInt8 value and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            14 => "A",
            11 => "J",
            12 => "Q",
            13 => "K",
            v => &v.to_string(),
        };
        let repr = format!("{value}/{}", self.1);
        write!(f, "{repr:>4}")
    }
}

/// Card source the table draws from when dealing a hand. Swappable so
/// tests can stack the order or count the draws.
pub trait Dealer: fmt::Debug {
    fn draw_one(&mut self) -> Card;
    fn reset_and_shuffle(&mut self);
}

#[derive(Debug)]
pub struct Deck {
    cards: [Card; 52],
    deck_idx: usize,
}

impl Default for Deck {
    fn default() -> Self {
        const SUITS: [Suit; 4] = [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart];
        let cards = std::array::from_fn(|i| Card(2 + (i / 4) as Value, SUITS[i % 4]));
        Self { cards, deck_idx: 0 }
    }
}

impl Dealer for Deck {
    fn draw_one(&mut self) -> Card {
        let card = self.cards[self.deck_idx];
        self.deck_idx += 1;
        card
    }

    fn reset_and_shuffle(&mut self) {
        self.cards.shuffle(&mut rand::rng());
        self.deck_idx = 0;
    }
}

/// Type alias for chips, the smallest stake denomination. All bets and
/// player stacks are whole chip counts.
///
/// If the total money at a table ever surpasses ~4.2 billion, then we
/// may have a problem.
pub type Chips = u32;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PlayerName(String);

impl PlayerName {
    pub fn new(s: &str) -> Self {
        let mut name: String = s
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .collect();
        name.truncate(constants::MAX_NAME_LENGTH);
        Self(name)
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PlayerName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerName {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Blinds {
    pub small: Chips,
    pub big: Chips,
}

impl fmt::Display for Blinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = format!("${}/{}", self.small, self.big);
        write!(f, "{repr}")
    }
}

/// Recoverable money errors. Both variants are converted into
/// elimination at the table boundary and never escape it.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum LedgerError {
    #[error("{name} needs ${needed} but has ${stack}")]
    InsufficientFunds {
        name: PlayerName,
        stack: Chips,
        needed: Chips,
    },
    #[error("{name} is out of chips")]
    OutOfFunds { name: PlayerName },
}

#[derive(Debug, Error)]
#[error("cannot hold more than {max} cards")]
pub struct DealError {
    pub max: usize,
}

/// Per-player lifetime action statistics, surfaced in snapshots.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ActionCounters {
    pub folds: u32,
    pub raises: u32,
    pub calls: u32,
    pub checks: u32,
}

/// A seated participant and their ledger. The stack can never go
/// negative: any deduction that would overdraw it fails without
/// touching the balance.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Player {
    pub name: PlayerName,
    pub stack: Chips,
    /// Chips wagered since the start of the current betting round.
    pub bet_this_round: Chips,
    /// Chips wagered since the player sat down.
    pub bet_this_game: Chips,
    pub chips_won: Chips,
    pub chips_spent: Chips,
    pub counters: ActionCounters,
    pub cards: Vec<Card>,
}

impl Player {
    #[must_use]
    pub fn new(name: PlayerName, stack: Chips) -> Self {
        Self {
            name,
            stack,
            bet_this_round: 0,
            bet_this_game: 0,
            chips_won: 0,
            chips_spent: 0,
            counters: ActionCounters::default(),
            cards: Vec::with_capacity(constants::DEFAULT_MAX_HAND_SIZE),
        }
    }

    /// A player still holding cards is live in the current hand.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.cards.is_empty()
    }

    /// Apply a signed balance change. Spending updates the wager
    /// accumulators as a side effect. A change that would overdraw the
    /// stack fails and leaves every field untouched; a result of exactly
    /// zero is valid here, but the caller must treat it as terminal and
    /// schedule the player for removal.
    pub fn adjust_balance(&mut self, delta: i64) -> Result<Chips, LedgerError> {
        let new = i64::from(self.stack) + delta;
        if new < 0 {
            return Err(LedgerError::InsufficientFunds {
                name: self.name.clone(),
                stack: self.stack,
                needed: delta.unsigned_abs() as Chips,
            });
        }
        let new = Chips::try_from(new).unwrap_or(Chips::MAX);
        if new < self.stack {
            let spent = self.stack - new;
            self.chips_spent += spent;
            self.bet_this_game += spent;
            self.bet_this_round += spent;
            debug!("{} spends ${spent}", self.name);
        } else if new > self.stack {
            let won = new - self.stack;
            self.chips_won += won;
            debug!("{} gains ${won}", self.name);
        }
        self.stack = new;
        Ok(new)
    }

    /// Credit winnings. Unlike spending, a credit cannot fail.
    pub fn credit(&mut self, amount: Chips) {
        self.chips_won += amount;
        self.stack = self.stack.saturating_add(amount);
        debug!("{} gains ${amount}", self.name);
    }

    /// Attempt a forced stake. Nothing is collected unless the player
    /// can pay the full amount and still have chips left afterwards:
    /// an exact-cover payment would strand them at zero, so it is
    /// refused up front as `OutOfFunds`.
    pub fn try_stake(&mut self, amount: Chips) -> Result<Chips, LedgerError> {
        if self.stack < amount {
            return Err(LedgerError::InsufficientFunds {
                name: self.name.clone(),
                stack: self.stack,
                needed: amount,
            });
        }
        if self.stack == amount {
            return Err(LedgerError::OutOfFunds {
                name: self.name.clone(),
            });
        }
        self.adjust_balance(-i64::from(amount))
    }

    pub fn take_card(&mut self, card: Card, max_hand_size: usize) -> Result<(), DealError> {
        if self.cards.len() >= max_hand_size {
            return Err(DealError { max: max_hand_size });
        }
        debug!("{} drew {card}", self.name);
        self.cards.push(card);
        Ok(())
    }

    /// Forfeit the hand: the player keeps their seat and stack but sits
    /// out the rest of the hand.
    pub fn fold_hand(&mut self) {
        self.cards.clear();
        self.counters.folds += 1;
    }

    pub fn reset_for_hand(&mut self) {
        self.cards.clear();
        self.bet_this_round = 0;
    }

    #[must_use]
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            name: self.name.clone(),
            stack: self.stack,
            cards: self.cards.clone(),
            counters: self.counters,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    Call,
    Check,
    Fold,
    /// The amount is the increment on top of the current bet level.
    Raise(Chips),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Call => "calls",
            Self::Check => "checks",
            Self::Fold => "folds",
            Self::Raise(amount) => &format!("raises ${amount}"),
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum ActionChoice {
    Call(Chips),
    Check,
    Fold,
    Raise { min: Chips, max: Chips },
}

impl fmt::Display for ActionChoice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Call(amount) => format!("call (== ${amount})"),
            Self::Check => "check".to_string(),
            Self::Fold => "fold".to_string(),
            Self::Raise { min, max } => format!("raise (${min}-${max})"),
        };
        write!(f, "{repr}")
    }
}

// Legality checks only compare enum variants: a user picking "raise"
// is choosing a kind of action, and the attached bounds are validated
// separately by the betting engine.
impl Eq for ActionChoice {}

impl Hash for ActionChoice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(self).hash(state);
    }
}

impl PartialEq for ActionChoice {
    fn eq(&self, other: &Self) -> bool {
        discriminant(self) == discriminant(other)
    }
}

/// The subset of actions currently legal for an actor.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ActionChoices(pub HashSet<ActionChoice>);

impl ActionChoices {
    #[must_use]
    pub fn contains(&self, action: &Action) -> bool {
        // ActionChoice hashes by variant, so the amounts don't matter.
        let choice = match action {
            Action::Call => ActionChoice::Call(0),
            Action::Check => ActionChoice::Check,
            Action::Fold => ActionChoice::Fold,
            Action::Raise(_) => ActionChoice::Raise { min: 0, max: 0 },
        };
        self.0.contains(&choice)
    }
}

impl fmt::Display for ActionChoices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num_options = self.0.len();
        let repr = self
            .0
            .iter()
            .enumerate()
            .map(|(i, choice)| {
                let repr = choice.to_string();
                match i {
                    0 if num_options == 1 => repr,
                    i if i == num_options - 1 => format!("or {repr}"),
                    _ => format!("{repr}, "),
                }
            })
            .collect::<String>();
        write!(f, "{repr}")
    }
}

impl<I> From<I> for ActionChoices
where
    I: IntoIterator<Item = ActionChoice>,
{
    fn from(iter: I) -> Self {
        Self(iter.into_iter().collect::<HashSet<_>>())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerSnapshot {
    pub name: PlayerName,
    pub stack: Chips,
    pub cards: Vec<Card>,
    pub counters: ActionCounters,
}

impl fmt::Display for PlayerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "|{}: ${}", self.name, self.stack)?;
        write!(f, "|cards:")?;
        for card in &self.cards {
            write!(f, " {card}")?;
        }
        writeln!(f)?;
        write!(
            f,
            "|folds {} / raises {} / calls {} / checks {}",
            self.counters.folds, self.counters.raises, self.counters.calls, self.counters.checks
        )
    }
}

/// Per-hand standings report: every seated player in rotation order,
/// plus whatever is left in the pot.
#[derive(Clone, Debug, Serialize)]
pub struct TableSnapshot {
    pub pot: Chips,
    pub players: Vec<PlayerSnapshot>,
}

impl fmt::Display for TableSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-------------- Overview --------------")?;
        writeln!(f, "pot: ${}", self.pot)?;
        for player in &self.players {
            writeln!(f, "{player}")?;
        }
        write!(f, "--------------------------------------")
    }
}
