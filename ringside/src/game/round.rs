//! One discrete phase of wagering, driven to completion.
//!
//! The engine is a two-state machine: it is either awaiting an action
//! from a specific seat or the round is closed. It suspends inside the
//! [`ActionInput`] collaborator while an actor decides, re-solicits the
//! same actor on invalid input, and closes the round the instant the
//! rotation comes back around to the player who last changed the bet.

use log::{debug, error, info, warn};
use std::{
    collections::VecDeque,
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::Duration,
};
use thiserror::Error;

use super::entities::{
    Action, ActionChoice, ActionChoices, Chips, LedgerError, PlayerName,
};
use super::ring::{Ring, RingError, SeatIndex};
use super::table::{GameEvent, GameSettings};

/// Pot and wager bookkeeping for a single hand. One value per table per
/// hand, owned by the orchestrator and lent to the engine; never
/// ambient state, so independent tables cannot interfere.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RoundState {
    pub pot: Chips,
    /// The highest single-round wager every active player must match.
    pub current_bet: Chips,
    pub times_raised: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoundPhase {
    AwaitingAction(SeatIndex),
    Closed,
}

/// Fatal engine failures. Everything recoverable (bad input, short
/// stacks) is handled inside the engine; if one of these comes out,
/// the round is aborted.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bookkeeping violation: {name} has bet ${bet_this_round} above the current bet ${current_bet}")]
    Bookkeeping {
        name: PlayerName,
        bet_this_round: Chips,
        current_bet: Chips,
    },
    #[error("betting round failed to terminate within {0} steps")]
    NonTermination(usize),
    #[error(transparent)]
    Ring(#[from] RingError),
}

/// Input collaborator failures. `Malformed` re-solicits the same actor;
/// `Disconnected` is treated as a fold so a dead input source cannot
/// wedge the round.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("malformed action: {0}")]
    Malformed(String),
    #[error("input source disconnected")]
    Disconnected,
}

/// Everything an actor needs to know to choose a legal action.
#[derive(Clone, Debug)]
pub struct ActionRequest {
    pub name: PlayerName,
    /// What it costs to stay in: `current_bet - bet_this_round`.
    pub amount_owed: Chips,
    pub choices: ActionChoices,
    /// Smallest legal raise increment.
    pub min_raise: Chips,
    /// Largest raise increment the actor's stack can cover.
    pub max_raise: Chips,
}

/// The swappable decision source: a human prompt, a scripted agent, or
/// a network client. The engine blocks here until an action comes back.
pub trait ActionInput {
    fn request_action(&mut self, req: &ActionRequest) -> Result<Action, InputError>;
}

/// Actions delivered over a channel, with an optional deadline per
/// decision. On expiry the actor folds; the engine contract is
/// unchanged either way.
#[derive(Debug)]
pub struct ChannelInput {
    actions: Receiver<Action>,
    deadline: Option<Duration>,
}

impl ChannelInput {
    #[must_use]
    pub fn new(actions: Receiver<Action>) -> Self {
        Self {
            actions,
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

impl ActionInput for ChannelInput {
    fn request_action(&mut self, req: &ActionRequest) -> Result<Action, InputError> {
        match self.deadline {
            Some(deadline) => match self.actions.recv_timeout(deadline) {
                Ok(action) => Ok(action),
                Err(RecvTimeoutError::Timeout) => {
                    info!("{} ran out of time and folds", req.name);
                    Ok(Action::Fold)
                }
                Err(RecvTimeoutError::Disconnected) => Err(InputError::Disconnected),
            },
            None => self
                .actions
                .recv()
                .map_err(|_| InputError::Disconnected),
        }
    }
}

/// A fixed sequence of actions, for tests, benches, and bots. Records
/// every request it sees; once the script runs dry it disconnects,
/// which the engine turns into folds.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    script: VecDeque<Action>,
    pub requests: Vec<ActionRequest>,
}

impl ScriptedInput {
    pub fn new(actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            script: actions.into_iter().collect(),
            requests: Vec::new(),
        }
    }
}

impl ActionInput for ScriptedInput {
    fn request_action(&mut self, req: &ActionRequest) -> Result<Action, InputError> {
        self.requests.push(req.clone());
        self.script.pop_front().ok_or(InputError::Disconnected)
    }
}

/// The betting-round state machine. Borrows the ring and round state
/// from the orchestrator for the duration of one round.
#[derive(Debug)]
pub struct BettingRound<'a> {
    ring: &'a mut Ring,
    round: &'a mut RoundState,
    settings: &'a GameSettings,
    events: &'a mut VecDeque<GameEvent>,
    phase: RoundPhase,
    /// The player who most recently set the bet; reaching them again
    /// closes the round. Starts as the first actor.
    closer: SeatIndex,
    steps: usize,
}

impl<'a> BettingRound<'a> {
    pub fn new(
        ring: &'a mut Ring,
        round: &'a mut RoundState,
        settings: &'a GameSettings,
        events: &'a mut VecDeque<GameEvent>,
        first_actor: SeatIndex,
    ) -> Self {
        Self {
            ring,
            round,
            settings,
            events,
            phase: RoundPhase::AwaitingAction(first_actor),
            closer: first_actor,
            steps: 0,
        }
    }

    #[must_use]
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Drive the round to closure. Bounded: at most
    /// `N * (max_raises_per_round + 1)` actions are solicited.
    pub fn run(&mut self, input: &mut dyn ActionInput) -> Result<(), EngineError> {
        if let Err(err) = self.ring.check_integrity() {
            error!("{err}; ring state: {:?}", self.ring);
            return Err(err.into());
        }
        while let RoundPhase::AwaitingAction(_) = self.phase {
            self.step(input)?;
        }
        Ok(())
    }

    /// Solicit and apply one action, then advance the turn.
    pub fn step(&mut self, input: &mut dyn ActionInput) -> Result<RoundPhase, EngineError> {
        let RoundPhase::AwaitingAction(actor) = self.phase else {
            return Ok(RoundPhase::Closed);
        };

        // A lone survivor takes the pot without being solicited.
        if self.ring.active_count() <= 1 {
            self.award_pot_to_survivor();
            self.phase = RoundPhase::Closed;
            return Ok(self.phase);
        }

        let step_limit = self.ring.len() * (self.settings.max_raises_per_round as usize + 1);
        self.steps += 1;
        if self.steps > step_limit {
            return Err(EngineError::NonTermination(step_limit));
        }

        let request = self.build_request(actor)?;
        let action = self.solicit(&request, input);
        self.apply(actor, action, request.amount_owed)?;

        self.phase = self.advance(actor)?;
        // Closure can coincide with everyone else folding; the lone
        // survivor still takes the pot.
        if self.phase == RoundPhase::Closed && self.ring.active_count() == 1 {
            self.award_pot_to_survivor();
        }
        Ok(self.phase)
    }

    fn build_request(&self, actor: SeatIndex) -> Result<ActionRequest, EngineError> {
        let player = self
            .ring
            .player(actor)
            .ok_or(RingError::Vacant(actor))?;
        let amount_owed = self
            .round
            .current_bet
            .checked_sub(player.bet_this_round)
            .ok_or_else(|| EngineError::Bookkeeping {
                name: player.name.clone(),
                bet_this_round: player.bet_this_round,
                current_bet: self.round.current_bet,
            })?;

        let min_raise = self.settings.min_raise;
        let max_raise = player.stack.saturating_sub(amount_owed);
        let mut choices = vec![ActionChoice::Fold];
        if amount_owed > 0 {
            choices.push(ActionChoice::Call(amount_owed));
        } else {
            choices.push(ActionChoice::Check);
        }
        let can_raise = self.round.times_raised < self.settings.max_raises_per_round
            && player.stack >= amount_owed + min_raise;
        if can_raise {
            choices.push(ActionChoice::Raise {
                min: min_raise,
                max: max_raise,
            });
        }

        Ok(ActionRequest {
            name: player.name.clone(),
            amount_owed,
            choices: choices.into(),
            min_raise,
            max_raise,
        })
    }

    /// Block on the input collaborator until it produces an action from
    /// the legal subset. Anything else re-solicits the same actor; a
    /// disconnected source folds.
    fn solicit(&mut self, request: &ActionRequest, input: &mut dyn ActionInput) -> Action {
        loop {
            match input.request_action(request) {
                Ok(action) if self.is_legal(request, action) => return action,
                Ok(action) => {
                    debug!("{}: rejecting illegal {action:?}, re-soliciting", request.name);
                }
                Err(InputError::Malformed(reason)) => {
                    debug!("{}: {reason}, re-soliciting", request.name);
                }
                Err(InputError::Disconnected) => {
                    warn!("{}: input source disconnected, folding", request.name);
                    return Action::Fold;
                }
            }
        }
    }

    fn is_legal(&self, request: &ActionRequest, action: Action) -> bool {
        if !request.choices.contains(&action) {
            return false;
        }
        match action {
            Action::Raise(amount) => amount >= request.min_raise && amount <= request.max_raise,
            _ => true,
        }
    }

    /// Apply a validated action. The balance change and the pot credit
    /// happen together, so an abort between actions never leaves a
    /// deduction without its matching pot entry.
    fn apply(&mut self, actor: SeatIndex, action: Action, amount_owed: Chips) -> Result<(), EngineError> {
        let player = self
            .ring
            .player_mut(actor)
            .ok_or(RingError::Vacant(actor))?;
        let name = player.name.clone();
        let applied = match action {
            Action::Check => {
                player.counters.checks += 1;
                action
            }
            Action::Call => match player.adjust_balance(-i64::from(amount_owed)) {
                Ok(_) => {
                    player.counters.calls += 1;
                    self.round.pot += amount_owed;
                    action
                }
                // Cannot cover the call: degrade to a fold.
                Err(LedgerError::InsufficientFunds { .. } | LedgerError::OutOfFunds { .. }) => {
                    info!("{name} cannot cover the call and folds");
                    player.fold_hand();
                    Action::Fold
                }
            },
            Action::Raise(amount) => {
                let total = amount_owed + amount;
                match player.adjust_balance(-i64::from(total)) {
                    Ok(_) => {
                        player.counters.raises += 1;
                        self.round.pot += total;
                        self.round.current_bet += amount;
                        self.round.times_raised += 1;
                        self.closer = actor;
                        action
                    }
                    // Affordability was validated against the stack, so
                    // this only fires if the stack changed underneath us.
                    Err(err) => {
                        warn!("{name}: {err}, folding instead");
                        player.fold_hand();
                        Action::Fold
                    }
                }
            }
            Action::Fold => {
                player.fold_hand();
                action
            }
        };
        debug!("{name} {applied}");
        self.events.push_back(GameEvent::ActionTaken {
            name,
            action: applied,
        });
        Ok(())
    }

    /// Find the next actor, walking seat by seat so that crossing the
    /// closing player is detected even if they have since folded.
    fn advance(&self, from: SeatIndex) -> Result<RoundPhase, EngineError> {
        let mut cursor = from;
        for _ in 0..self.ring.len() {
            cursor = self
                .ring
                .next(cursor)
                .ok_or(RingError::Vacant(cursor))?;
            if cursor == self.closer {
                return Ok(RoundPhase::Closed);
            }
            if self.ring.player(cursor).is_some_and(super::entities::Player::is_active) {
                return Ok(RoundPhase::AwaitingAction(cursor));
            }
        }
        Ok(RoundPhase::Closed)
    }

    fn award_pot_to_survivor(&mut self) {
        let survivor = self
            .ring
            .iter()
            .find(|(_, p)| p.is_active())
            .map(|(idx, _)| idx);
        let Some(idx) = survivor else { return };
        let amount = self.round.pot;
        if let Some(player) = self.ring.player_mut(idx) {
            player.credit(amount);
            self.round.pot = 0;
            info!("{} wins the pot of ${amount} uncontested", player.name);
            self.events.push_back(GameEvent::PotAwarded {
                name: player.name.clone(),
                amount,
            });
        }
    }
}
