//! Default table configuration values.

use super::entities::Chips;

/// Hard cap on seats at a single table. Two hole cards per player means
/// a 52-card deck can serve at most 26 seats; a couple of cards are kept
/// in reserve for burns and future community-card phases.
pub const MAX_PLAYERS: usize = 22;

/// Longest player name kept verbatim; longer names are truncated.
pub const MAX_NAME_LENGTH: usize = 16;

pub const DEFAULT_BUY_IN: Chips = 100;
pub const DEFAULT_SMALL_BLIND: Chips = 5;
pub const DEFAULT_BIG_BLIND: Chips = 10;

/// The minimum amount a raise must add on top of the current bet.
pub const DEFAULT_MIN_RAISE: Chips = DEFAULT_BIG_BLIND;

/// How many raises a single betting round will accept before the
/// option is taken off the table.
pub const DEFAULT_MAX_RAISES_PER_ROUND: u32 = 3;

/// Hole cards per player in the only implemented variant.
pub const DEFAULT_MAX_HAND_SIZE: usize = 2;
