//! The seating ring: a circular ordering of seated players that defines
//! turn sequence and tracks the two rotating blind roles.
//!
//! Seats live in a slab and link to their neighbors by index, so the
//! structure is a doubly linked cycle without reference cycles. Neighbor
//! lookup and removal are O(1); vacated slots are recycled.

use thiserror::Error;

use super::entities::{Player, PlayerName};

/// Type alias for seat positions. Indices are stable across removals of
/// other seats.
pub type SeatIndex = usize;

/// Traversal breakage is a programming defect, not a runtime condition
/// to recover from. Callers abort the round when they see it.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RingError {
    #[error("seat {0} is vacant")]
    Vacant(SeatIndex),
    #[error("ring links are inconsistent at seat {0}")]
    IntegrityViolation(SeatIndex),
}

#[derive(Debug)]
struct Seat {
    player: Player,
    next: SeatIndex,
    prev: SeatIndex,
}

#[derive(Debug, Default)]
pub struct Ring {
    seats: Vec<Option<Seat>>,
    free: Vec<SeatIndex>,
    len: usize,
    small_blind: Option<SeatIndex>,
    big_blind: Option<SeatIndex>,
}

impl Ring {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// A game needs two live members for the blind roles to be defined.
    #[must_use]
    pub fn is_viable(&self) -> bool {
        self.len >= 2
    }

    #[must_use]
    pub fn small_blind(&self) -> Option<SeatIndex> {
        self.small_blind
    }

    #[must_use]
    pub fn big_blind(&self) -> Option<SeatIndex> {
        self.big_blind
    }

    #[must_use]
    pub fn player(&self, idx: SeatIndex) -> Option<&Player> {
        self.seats.get(idx)?.as_ref().map(|seat| &seat.player)
    }

    pub fn player_mut(&mut self, idx: SeatIndex) -> Option<&mut Player> {
        self.seats.get_mut(idx)?.as_mut().map(|seat| &mut seat.player)
    }

    #[must_use]
    pub fn next(&self, idx: SeatIndex) -> Option<SeatIndex> {
        self.seats.get(idx)?.as_ref().map(|seat| seat.next)
    }

    #[must_use]
    pub fn prev(&self, idx: SeatIndex) -> Option<SeatIndex> {
        self.seats.get(idx)?.as_ref().map(|seat| seat.prev)
    }

    /// The next seat after `idx` whose player still holds cards.
    /// Excludes `idx` itself; wraps around the rotation.
    #[must_use]
    pub fn next_active(&self, idx: SeatIndex) -> Option<SeatIndex> {
        let mut cursor = idx;
        for _ in 0..self.len {
            cursor = self.next(cursor)?;
            if self.player(cursor).is_some_and(Player::is_active) {
                return Some(cursor);
            }
        }
        None
    }

    /// Number of players still holding cards.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.iter().filter(|(_, p)| p.is_active()).count()
    }

    /// Insert a player at the end of the rotation, immediately before
    /// the small-blind holder. The first player seated becomes the
    /// small blind and forms a self-loop; the second becomes the big
    /// blind. Relative order of existing members never changes.
    pub fn seat(&mut self, player: Player) -> SeatIndex {
        let idx = match self.free.pop() {
            Some(idx) => idx,
            None => {
                self.seats.push(None);
                self.seats.len() - 1
            }
        };
        match (self.small_blind, self.big_blind) {
            (None, _) => {
                self.seats[idx] = Some(Seat {
                    player,
                    next: idx,
                    prev: idx,
                });
                self.small_blind = Some(idx);
                self.big_blind = None;
            }
            (Some(sb), None) => {
                self.seats[idx] = Some(Seat {
                    player,
                    next: sb,
                    prev: sb,
                });
                if let Some(seat) = self.seats[sb].as_mut() {
                    seat.next = idx;
                    seat.prev = idx;
                }
                self.big_blind = Some(idx);
            }
            (Some(sb), Some(_)) => {
                // Splice in between the current tail and the small blind.
                let tail = self.seats[sb].as_ref().map(|seat| seat.prev).unwrap_or(sb);
                self.seats[idx] = Some(Seat {
                    player,
                    next: sb,
                    prev: tail,
                });
                if let Some(seat) = self.seats[tail].as_mut() {
                    seat.next = idx;
                }
                if let Some(seat) = self.seats[sb].as_mut() {
                    seat.prev = idx;
                }
            }
        }
        self.len += 1;
        idx
    }

    /// Splice a seat out of the rotation and hand its player back.
    ///
    /// Role reassignment: a removed small blind passes the role to its
    /// former next (the big blind follows to stay adjacent); a removed
    /// big blind passes the role to its former previous. When fewer
    /// than two members remain the roles are no longer meaningful and
    /// `is_viable` reports game termination to the caller.
    pub fn remove(&mut self, idx: SeatIndex) -> Result<Player, RingError> {
        let seat = self
            .seats
            .get_mut(idx)
            .and_then(Option::take)
            .ok_or(RingError::Vacant(idx))?;
        self.free.push(idx);
        self.len -= 1;

        if self.len == 0 {
            self.small_blind = None;
            self.big_blind = None;
            return Ok(seat.player);
        }

        {
            let prev_seat = self.seats[seat.prev]
                .as_mut()
                .ok_or(RingError::IntegrityViolation(seat.prev))?;
            prev_seat.next = seat.next;
        }
        {
            let next_seat = self.seats[seat.next]
                .as_mut()
                .ok_or(RingError::IntegrityViolation(seat.next))?;
            next_seat.prev = seat.prev;
        }

        if self.small_blind == Some(idx) {
            self.small_blind = Some(seat.next);
            self.big_blind = self.next(seat.next);
        }
        if self.big_blind == Some(idx) {
            self.big_blind = Some(seat.prev);
        }
        Ok(seat.player)
    }

    /// Rotate the blind roles one seat forward for the next hand.
    pub fn rotate_blinds(&mut self) {
        if !self.is_viable() {
            return;
        }
        if let Some(bb) = self.big_blind {
            self.small_blind = Some(bb);
            self.big_blind = self.next(bb);
        }
    }

    /// Lazy walk of one full circuit beginning at `start`. Yields
    /// `start` first and stops when the rotation comes back around.
    #[must_use]
    pub fn circuit(&self, start: SeatIndex) -> Circuit<'_> {
        Circuit {
            ring: self,
            start,
            cursor: Some(start),
            steps: 0,
        }
    }

    /// Seats and players in rotation order, starting at the small blind
    /// (or an arbitrary member when the roles are undefined).
    pub fn iter(&self) -> impl Iterator<Item = (SeatIndex, &Player)> {
        let start = self
            .small_blind
            .or_else(|| self.seats.iter().position(Option::is_some));
        start
            .map(|idx| self.circuit(idx))
            .into_iter()
            .flatten()
            .filter_map(|idx| self.player(idx).map(|p| (idx, p)))
    }

    /// Player names in rotation order, for order reporting.
    #[must_use]
    pub fn rotation(&self) -> Vec<PlayerName> {
        self.iter().map(|(_, p)| p.name.clone()).collect()
    }

    #[must_use]
    pub fn find(&self, name: &PlayerName) -> Option<SeatIndex> {
        self.iter().find(|(_, p)| &p.name == name).map(|(idx, _)| idx)
    }

    /// Verify link symmetry and strong connectivity. Cheap enough to
    /// run before every betting round; a failure is fatal to the round.
    pub fn check_integrity(&self) -> Result<(), RingError> {
        let mut occupied = 0;
        for (idx, seat) in self.seats.iter().enumerate() {
            let Some(seat) = seat else { continue };
            occupied += 1;
            let next_ok = self
                .prev(seat.next)
                .is_some_and(|back| back == idx);
            let prev_ok = self
                .next(seat.prev)
                .is_some_and(|forward| forward == idx);
            if !next_ok || !prev_ok {
                return Err(RingError::IntegrityViolation(idx));
            }
        }
        if occupied != self.len {
            return Err(RingError::IntegrityViolation(self.len));
        }
        if let Some(start) = self.small_blind.or_else(|| {
            self.seats.iter().position(Option::is_some)
        }) {
            if self.player(start).is_none() {
                return Err(RingError::IntegrityViolation(start));
            }
            if self.circuit(start).count() != self.len {
                return Err(RingError::IntegrityViolation(start));
            }
        }
        Ok(())
    }
}

pub struct Circuit<'a> {
    ring: &'a Ring,
    start: SeatIndex,
    cursor: Option<SeatIndex>,
    steps: usize,
}

impl Iterator for Circuit<'_> {
    type Item = SeatIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        // Guard against walking a corrupted cycle forever.
        if self.steps > self.ring.len() {
            return None;
        }
        self.steps += 1;
        let next = self.ring.next(current)?;
        self.cursor = if next == self.start { None } else { Some(next) };
        Some(current)
    }
}
