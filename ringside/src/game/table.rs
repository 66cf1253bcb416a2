//! The round orchestrator: wires the ring, the ledger, and the betting
//! engine together for one full hand, and owns the event queue that
//! reports what happened.

use log::info;
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt};
use thiserror::Error;

use super::constants;
use super::entities::{
    Action, Blinds, Chips, DealError, Dealer, Deck, Player, PlayerName, TableSnapshot,
};
use super::ring::{Ring, RingError, SeatIndex};
use super::round::{ActionInput, BettingRound, EngineError, RoundState};

/// Who opens the betting round.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum FirstActorRule {
    /// The small-blind holder acts first. Non-standard, but it is what
    /// the game has always done, so it stays the default.
    #[default]
    SmallBlind,
    /// The player after the big blind acts first (standard play).
    AfterBigBlind,
}

/// Table configuration. All amounts are externally supplied; nothing
/// here is hardcoded into the engine.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GameSettings {
    pub buy_in: Chips,
    pub small_blind: Chips,
    pub big_blind: Chips,
    /// Minimum increment a raise must add on top of the current bet.
    pub min_raise: Chips,
    pub max_raises_per_round: u32,
    pub max_hand_size: usize,
    pub first_actor: FirstActorRule,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            buy_in: constants::DEFAULT_BUY_IN,
            small_blind: constants::DEFAULT_SMALL_BLIND,
            big_blind: constants::DEFAULT_BIG_BLIND,
            min_raise: constants::DEFAULT_MIN_RAISE,
            max_raises_per_round: constants::DEFAULT_MAX_RAISES_PER_ROUND,
            max_hand_size: constants::DEFAULT_MAX_HAND_SIZE,
            first_actor: FirstActorRule::default(),
        }
    }
}

impl GameSettings {
    /// The table stakes, for display.
    #[must_use]
    pub fn blinds(&self) -> Blinds {
        Blinds {
            small: self.small_blind,
            big: self.big_blind,
        }
    }

    /// Reject configurations under which a game is not viable.
    pub fn validate(&self) -> Result<(), TableError> {
        if self.buy_in == 0
            || self.small_blind == 0
            || self.big_blind == 0
            || self.min_raise == 0
            || self.max_raises_per_round == 0
            || self.max_hand_size == 0
        {
            return Err(TableError::InvalidSettings(
                "all amounts and limits must be positive".to_string(),
            ));
        }
        if self.big_blind < self.small_blind {
            return Err(TableError::InvalidSettings(
                "big blind must be at least the small blind".to_string(),
            ));
        }
        if self.buy_in < self.big_blind {
            return Err(TableError::InvalidSettings(
                "buy-in must cover the big blind".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum RemovalReason {
    CannotPostBlind,
    OutOfChips,
    Left,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::CannotPostBlind => "cannot post the blind",
            Self::OutOfChips => "out of chips",
            Self::Left => "left the table",
        };
        write!(f, "{repr}")
    }
}

/// Notifications of gameplay updates, drained by the embedding
/// application after each call into the table.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum GameEvent {
    PlayerSeated {
        name: PlayerName,
        order: Vec<PlayerName>,
    },
    PlayerRemoved {
        name: PlayerName,
        stack: Chips,
        reason: RemovalReason,
    },
    BlindPosted {
        name: PlayerName,
        amount: Chips,
    },
    ActionTaken {
        name: PlayerName,
        action: Action,
    },
    PotAwarded {
        name: PlayerName,
        amount: Chips,
    },
    RoundClosed {
        pot: Chips,
    },
    GameOver,
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::PlayerSeated { name, order } => {
                let order = order
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                format!("{name} joined the table (order: {order})")
            }
            Self::PlayerRemoved {
                name,
                stack,
                reason,
            } => format!("{name} removed from the game ({reason}, ${stack})"),
            Self::BlindPosted { name, amount } => format!("{name} posts a blind of ${amount}"),
            Self::ActionTaken { name, action } => format!("{name} {action}"),
            Self::PotAwarded { name, amount } => format!("{name} won ${amount}"),
            Self::RoundClosed { pot } => format!("betting round closed with ${pot} in the pot"),
            Self::GameOver => "game over".to_string(),
        };
        write!(f, "{repr}")
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("need 2+ players")]
    NotEnoughPlayers,
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("table is full")]
    TableFull,
    #[error("{name} is already seated")]
    NameTaken { name: PlayerName },
    #[error("{name} is not seated here")]
    UnknownPlayer { name: PlayerName },
    #[error(transparent)]
    Deal(#[from] DealError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Ring(#[from] RingError),
}

enum BlindRole {
    Small,
    Big,
}

impl fmt::Display for BlindRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Small => "small",
            Self::Big => "big",
        };
        write!(f, "{repr}")
    }
}

/// A single poker table. Each table owns its ring, dealer, and event
/// queue outright; running many tables side by side needs no shared
/// state whatsoever.
#[derive(Debug)]
pub struct Table {
    pub ring: Ring,
    dealer: Box<dyn Dealer>,
    settings: GameSettings,
    events: VecDeque<GameEvent>,
}

impl Table {
    pub fn new(settings: GameSettings) -> Result<Self, TableError> {
        Self::with_dealer(settings, Box::new(Deck::default()))
    }

    /// Build a table around a custom card source, e.g. a stacked deck
    /// in tests.
    pub fn with_dealer(
        settings: GameSettings,
        dealer: Box<dyn Dealer>,
    ) -> Result<Self, TableError> {
        settings.validate()?;
        Ok(Self {
            ring: Ring::new(),
            dealer,
            settings,
            events: VecDeque::new(),
        })
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Seat a new player at the end of the rotation with the configured
    /// starting stack.
    pub fn add_player(&mut self, name: impl Into<PlayerName>) -> Result<SeatIndex, TableError> {
        let name = name.into();
        if self.ring.len() >= constants::MAX_PLAYERS {
            return Err(TableError::TableFull);
        }
        if self.ring.find(&name).is_some() {
            return Err(TableError::NameTaken { name });
        }
        let idx = self.ring.seat(Player::new(name.clone(), self.settings.buy_in));
        info!("{name} added to the game");
        self.events.push_back(GameEvent::PlayerSeated {
            name,
            order: self.ring.rotation(),
        });
        Ok(idx)
    }

    pub fn remove_player(&mut self, name: &PlayerName) -> Result<Player, TableError> {
        let idx = self
            .ring
            .find(name)
            .ok_or_else(|| TableError::UnknownPlayer { name: name.clone() })?;
        self.remove_seat(idx, RemovalReason::Left)
    }

    /// Drain pending notifications, oldest first.
    pub fn drain_events(&mut self) -> VecDeque<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current standings, in rotation order.
    #[must_use]
    pub fn standings(&self) -> TableSnapshot {
        self.make_snapshot(0)
    }

    /// Advance the blind roles one seat for the next hand.
    pub fn rotate_blinds(&mut self) {
        self.ring.rotate_blinds();
    }

    /// Play one full hand: reset, deal, collect the forced stakes, run
    /// the betting round, sweep busted players, and report standings.
    pub fn play_hand(&mut self, input: &mut dyn ActionInput) -> Result<TableSnapshot, TableError> {
        if !self.ring.is_viable() {
            return Err(TableError::NotEnoughPlayers);
        }
        let mut round = RoundState::default();

        // Reset the deck and every player's per-hand state.
        self.dealer.reset_and_shuffle();
        let seats: Vec<SeatIndex> = self.ring.iter().map(|(idx, _)| idx).collect();
        for &idx in &seats {
            if let Some(player) = self.ring.player_mut(idx) {
                player.reset_for_hand();
            }
        }

        // Deal one card at a time, two full passes starting at the
        // small blind.
        for _ in 0..self.settings.max_hand_size {
            for &idx in &seats {
                let card = self.dealer.draw_one();
                if let Some(player) = self.ring.player_mut(idx) {
                    player.take_card(card, self.settings.max_hand_size)?;
                }
            }
        }

        // Forced stakes. Either call may shrink or rotate the ring.
        self.post_blind(&mut round, BlindRole::Small)?;
        self.post_blind(&mut round, BlindRole::Big)?;
        round.current_bet = self.settings.big_blind;

        let first_actor = match self.settings.first_actor {
            FirstActorRule::SmallBlind => self.ring.small_blind(),
            FirstActorRule::AfterBigBlind => self
                .ring
                .big_blind()
                .and_then(|bb| self.ring.next_active(bb)),
        }
        .ok_or(TableError::NotEnoughPlayers)?;

        BettingRound::new(
            &mut self.ring,
            &mut round,
            &self.settings,
            &mut self.events,
            first_actor,
        )
        .run(input)?;
        self.events.push_back(GameEvent::RoundClosed { pot: round.pot });

        // Players stranded at exactly zero are done for.
        let busted: Vec<SeatIndex> = self
            .ring
            .iter()
            .filter(|(_, p)| p.stack == 0)
            .map(|(idx, _)| idx)
            .collect();
        for idx in busted {
            self.remove_seat(idx, RemovalReason::OutOfChips)?;
        }

        Ok(self.make_snapshot(round.pot))
    }

    /// Collect one forced stake, kicking and retrying until a role
    /// holder can pay. Bounded by the ring size: every failed attempt
    /// removes a player.
    fn post_blind(
        &mut self,
        round: &mut RoundState,
        role: BlindRole,
    ) -> Result<SeatIndex, TableError> {
        loop {
            if !self.ring.is_viable() {
                return Err(TableError::NotEnoughPlayers);
            }
            let (holder, amount) = match role {
                BlindRole::Small => (self.ring.small_blind(), self.settings.small_blind),
                BlindRole::Big => (self.ring.big_blind(), self.settings.big_blind),
            };
            let idx = holder.ok_or(TableError::NotEnoughPlayers)?;
            let player = self
                .ring
                .player_mut(idx)
                .ok_or(RingError::Vacant(idx))?;
            match player.try_stake(amount) {
                Ok(_) => {
                    let name = player.name.clone();
                    round.pot += amount;
                    info!("{name} pays the {role} blind (${amount})");
                    self.events.push_back(GameEvent::BlindPosted { name, amount });
                    return Ok(idx);
                }
                Err(err) => {
                    info!("{err}; kicked from the game");
                    self.remove_seat(idx, RemovalReason::CannotPostBlind)?;
                }
            }
        }
    }

    fn remove_seat(
        &mut self,
        idx: SeatIndex,
        reason: RemovalReason,
    ) -> Result<Player, TableError> {
        let was_viable = self.ring.is_viable();
        let player = self.ring.remove(idx)?;
        info!("{} has been removed from the game", player.name);
        self.events.push_back(GameEvent::PlayerRemoved {
            name: player.name.clone(),
            stack: player.stack,
            reason,
        });
        if was_viable && !self.ring.is_viable() {
            self.events.push_back(GameEvent::GameOver);
        }
        Ok(player)
    }

    fn make_snapshot(&self, pot: Chips) -> TableSnapshot {
        TableSnapshot {
            pot,
            players: self.ring.iter().map(|(_, p)| p.snapshot()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::entities::{Card, Suit};
    use super::super::round::ScriptedInput;
    use super::*;

    use std::{cell::RefCell, rc::Rc};

    /// Deals an endless fixed card and counts draws and reshuffles
    /// through shared cells the test can keep a handle on.
    #[derive(Debug, Default)]
    struct CountingDealer {
        draws: Rc<RefCell<usize>>,
        resets: Rc<RefCell<usize>>,
    }

    impl Dealer for CountingDealer {
        fn draw_one(&mut self) -> Card {
            *self.draws.borrow_mut() += 1;
            Card(2, Suit::Club)
        }

        fn reset_and_shuffle(&mut self) {
            *self.resets.borrow_mut() += 1;
        }
    }

    fn table_with(names: &[&str]) -> Table {
        let mut table = Table::new(GameSettings::default()).unwrap();
        for name in names {
            table.add_player(*name).unwrap();
        }
        table
    }

    fn stack_of(table: &Table, name: &str) -> Chips {
        let idx = table.ring.find(&name.into()).unwrap();
        table.ring.player(idx).unwrap().stack
    }

    fn set_stack(table: &mut Table, name: &str, stack: Chips) {
        let idx = table.ring.find(&name.into()).unwrap();
        table.ring.player_mut(idx).unwrap().stack = stack;
    }

    // === Settings ===

    #[test]
    fn test_settings_validation() {
        let mut settings = GameSettings::default();
        settings.big_blind = 4;
        assert!(matches!(
            Table::new(settings).unwrap_err(),
            TableError::InvalidSettings(_)
        ));

        let mut settings = GameSettings::default();
        settings.buy_in = 5;
        assert!(Table::new(settings).is_err());

        let mut settings = GameSettings::default();
        settings.small_blind = 0;
        assert!(Table::new(settings).is_err());
    }

    #[test]
    fn test_blinds_display() {
        let settings = GameSettings::default();
        assert_eq!(settings.blinds().to_string(), "$5/10");
    }

    // === Seating ===

    #[test]
    fn test_add_player_starts_with_buy_in() {
        let table = table_with(&["alice", "bob"]);
        assert_eq!(stack_of(&table, "alice"), 100);
        assert_eq!(stack_of(&table, "bob"), 100);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut table = table_with(&["alice"]);
        assert!(matches!(
            table.add_player("alice").unwrap_err(),
            TableError::NameTaken { .. }
        ));
    }

    #[test]
    fn test_table_capacity() {
        let mut table = Table::new(GameSettings::default()).unwrap();
        for i in 0..constants::MAX_PLAYERS {
            table.add_player(format!("p{i}")).unwrap();
        }
        assert!(matches!(
            table.add_player("late").unwrap_err(),
            TableError::TableFull
        ));
    }

    // === Forced stakes ===

    #[test]
    fn test_blinds_fund_the_pot() {
        // 4 players, buy-in 100, blinds 5/10.
        let mut table = table_with(&["a", "b", "c", "d"]);
        let mut round = RoundState::default();
        table.post_blind(&mut round, BlindRole::Small).unwrap();
        table.post_blind(&mut round, BlindRole::Big).unwrap();
        assert_eq!(round.pot, 15);
        assert_eq!(stack_of(&table, "a"), 95);
        assert_eq!(stack_of(&table, "b"), 90);
    }

    #[test]
    fn test_short_stacked_blind_holder_is_kicked() {
        let mut table = table_with(&["a", "b", "c", "d"]);
        set_stack(&mut table, "a", 4);
        let mut round = RoundState::default();
        table.post_blind(&mut round, BlindRole::Small).unwrap();
        // a could not pay 5 and is gone; b inherited the role and paid.
        assert_eq!(table.ring.len(), 3);
        assert!(table.ring.find(&"a".into()).is_none());
        let sb = table.ring.small_blind().unwrap();
        assert_eq!(table.ring.player(sb).unwrap().name, "b".into());
        assert_eq!(stack_of(&table, "b"), 95);
        assert_eq!(round.pot, 5);
    }

    #[test]
    fn test_blind_elimination_cascade() {
        // Both blind candidates are broke; the roles fall through to
        // the funded players behind them.
        let mut table = table_with(&["a", "b", "c", "d"]);
        set_stack(&mut table, "a", 4);
        set_stack(&mut table, "b", 4);
        let mut round = RoundState::default();
        table.post_blind(&mut round, BlindRole::Small).unwrap();
        table.post_blind(&mut round, BlindRole::Big).unwrap();
        assert_eq!(table.ring.len(), 2);
        assert_eq!(round.pot, 15);
        assert_eq!(stack_of(&table, "c"), 95);
        assert_eq!(stack_of(&table, "d"), 90);
        let sb = table.ring.small_blind().unwrap();
        let bb = table.ring.big_blind().unwrap();
        assert_eq!(table.ring.player(sb).unwrap().name, "c".into());
        assert_eq!(table.ring.player(bb).unwrap().name, "d".into());
    }

    #[test]
    fn test_cascade_to_game_over() {
        let mut table = table_with(&["a", "b", "c"]);
        set_stack(&mut table, "a", 4);
        set_stack(&mut table, "b", 4);
        set_stack(&mut table, "c", 4);
        let mut round = RoundState::default();
        let err = table.post_blind(&mut round, BlindRole::Small).unwrap_err();
        assert!(matches!(err, TableError::NotEnoughPlayers));
        assert!(table.drain_events().contains(&GameEvent::GameOver));
    }

    // === Full hands ===

    #[test]
    fn test_play_hand_requires_two_players() {
        let mut table = table_with(&["alone"]);
        let mut input = ScriptedInput::default();
        assert!(matches!(
            table.play_hand(&mut input).unwrap_err(),
            TableError::NotEnoughPlayers
        ));
    }

    #[test]
    fn test_play_hand_everyone_calls() {
        let mut table = table_with(&["a", "b", "c", "d"]);
        let mut input = ScriptedInput::new([
            Action::Call,  // a (small blind) owes 5
            Action::Check, // b (big blind) owes 0
            Action::Call,  // c owes 10
            Action::Call,  // d owes 10
        ]);
        let snapshot = table.play_hand(&mut input).unwrap();
        assert_eq!(snapshot.pot, 40);
        for name in ["a", "b", "c", "d"] {
            assert_eq!(stack_of(&table, name), 90);
        }
        // Everyone got a full hand.
        for (_, player) in table.ring.iter() {
            assert_eq!(player.cards.len(), 2);
        }
    }

    #[test]
    fn test_play_hand_pot_conservation() {
        let mut table = table_with(&["a", "b", "c"]);
        let mut input = ScriptedInput::new([
            Action::Raise(20), // a
            Action::Call,      // b
            Action::Fold,      // c
        ]);
        let snapshot = table.play_hand(&mut input).unwrap();
        let wagered: Chips = table
            .ring
            .iter()
            .map(|(_, p)| p.bet_this_round)
            .sum();
        assert_eq!(snapshot.pot, wagered);
    }

    #[test]
    fn test_play_hand_sweeps_busted_players() {
        let mut table = table_with(&["a", "b", "c", "d"]);
        set_stack(&mut table, "c", 10);
        let mut input = ScriptedInput::new([
            Action::Call,  // a
            Action::Check, // b
            Action::Call,  // c goes to exactly zero
            Action::Call,  // d
        ]);
        table.play_hand(&mut input).unwrap();
        assert_eq!(table.ring.len(), 3);
        assert!(table.ring.find(&"c".into()).is_none());
        let removed = table.drain_events().into_iter().any(|e| {
            matches!(
                e,
                GameEvent::PlayerRemoved {
                    reason: RemovalReason::OutOfChips,
                    ..
                }
            )
        });
        assert!(removed);
    }

    #[test]
    fn test_play_hand_deals_two_passes() {
        let dealer = CountingDealer::default();
        let draws = Rc::clone(&dealer.draws);
        let resets = Rc::clone(&dealer.resets);
        let mut table = Table::with_dealer(GameSettings::default(), Box::new(dealer)).unwrap();
        for name in ["a", "b", "c", "d"] {
            table.add_player(name).unwrap();
        }
        let mut input = ScriptedInput::new([
            Action::Call,
            Action::Check,
            Action::Call,
            Action::Call,
        ]);
        table.play_hand(&mut input).unwrap();
        // Exactly 2 x live-player-count draws, preceded by a reshuffle.
        assert_eq!(*draws.borrow(), 8);
        assert_eq!(*resets.borrow(), 1);
    }

    #[test]
    fn test_after_big_blind_rule_changes_opener() {
        let mut settings = GameSettings::default();
        settings.first_actor = FirstActorRule::AfterBigBlind;
        let mut table = Table::new(settings).unwrap();
        for name in ["a", "b", "c"] {
            table.add_player(name).unwrap();
        }
        let mut input = ScriptedInput::new([
            Action::Call,  // c opens (after the big blind)
            Action::Call,  // a
            Action::Check, // b
        ]);
        table.play_hand(&mut input).unwrap();
        assert_eq!(input.requests[0].name, "c".into());
        assert_eq!(input.requests[0].amount_owed, 10);
    }

    #[test]
    fn test_blinds_rotate_between_hands() {
        let mut table = table_with(&["a", "b", "c"]);
        table.rotate_blinds();
        let sb = table.ring.small_blind().unwrap();
        assert_eq!(table.ring.player(sb).unwrap().name, "b".into());
    }
}
