//! End-to-end hand scenarios driven through the public table API.

use ringside::{
    Action, Chips, GameEvent, GameSettings, Table, TableError,
    game::{RemovalReason, ScriptedInput},
};

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

fn total_chips(table: &Table) -> Chips {
    table.ring.iter().map(|(_, p)| p.stack).sum()
}

#[test]
fn blinds_are_posted_before_any_action() {
    let mut table = table_with(&["a", "b", "c", "d"]);
    table.drain_events();

    let mut input = ScriptedInput::new([Action::Call, Action::Check, Action::Call, Action::Call]);
    table.play_hand(&mut input).unwrap();

    let events: Vec<_> = table.drain_events().into_iter().collect();
    assert_eq!(
        events[0],
        GameEvent::BlindPosted {
            name: "a".into(),
            amount: 5,
        }
    );
    assert_eq!(
        events[1],
        GameEvent::BlindPosted {
            name: "b".into(),
            amount: 10,
        }
    );
    // The small blind already owes only the difference when asked.
    assert_eq!(input.requests[0].amount_owed, 5);
}

#[test]
fn short_stacked_blind_holder_is_replaced() {
    let mut table = table_with(&["a", "b", "c", "d"]);
    set_stack(&mut table, "a", 4);

    // a cannot pay the small blind of 5; b inherits the role and the
    // hand goes on with three players.
    let mut input = ScriptedInput::new([Action::Call, Action::Check, Action::Call]);
    table.play_hand(&mut input).unwrap();

    assert!(table.ring.find(&"a".into()).is_none());
    assert_eq!(table.ring.len(), 3);
    let sb = table.ring.small_blind().unwrap();
    assert_eq!(table.ring.player(sb).unwrap().name, "b".into());
}

#[test]
fn elimination_cascade_reaches_funded_players() {
    let mut table = table_with(&["a", "b", "c", "d"]);
    set_stack(&mut table, "a", 4);
    set_stack(&mut table, "b", 4);

    let mut input = ScriptedInput::new([Action::Call, Action::Check]);
    let snapshot = table.play_hand(&mut input).unwrap();

    // Both broke candidates were removed during blind collection and
    // the roles fell through to c and d.
    assert_eq!(table.ring.len(), 2);
    let sb = table.ring.small_blind().unwrap();
    let bb = table.ring.big_blind().unwrap();
    assert_eq!(table.ring.player(sb).unwrap().name, "c".into());
    assert_eq!(table.ring.player(bb).unwrap().name, "d".into());
    assert_eq!(snapshot.pot, 20);
}

#[test]
fn cascade_that_busts_the_table_ends_the_game() {
    let mut table = table_with(&["a", "b", "c"]);
    set_stack(&mut table, "a", 4);
    set_stack(&mut table, "b", 4);
    set_stack(&mut table, "c", 4);

    let mut input = ScriptedInput::default();
    let err = table.play_hand(&mut input).unwrap_err();
    assert!(matches!(err, TableError::NotEnoughPlayers));
    assert!(table.drain_events().contains(&GameEvent::GameOver));
}

#[test]
fn pot_matches_round_wagers_exactly() {
    let mut table = table_with(&["a", "b", "c"]);
    let mut input = ScriptedInput::new([
        Action::Raise(20), // a
        Action::Call,      // b
        Action::Call,      // c
        // rotation returns to a, the last bet-setter: round closes
    ]);
    let snapshot = table.play_hand(&mut input).unwrap();

    let wagered: Chips = table.ring.iter().map(|(_, p)| p.bet_this_round).sum();
    assert_eq!(snapshot.pot, wagered);
    assert_eq!(input.requests.len(), 3);
}

#[test]
fn adversarial_raising_stays_within_the_step_bound() {
    let settings = GameSettings::default();
    let max = settings.max_raises_per_round as usize;
    let mut table = Table::new(settings).unwrap();
    for name in ["a", "b", "c", "d"] {
        table.add_player(name).unwrap();
        set_stack(&mut table, name, 100_000);
    }

    let mut script = vec![Action::Raise(10); max];
    script.extend(vec![Action::Call; 4 * (max + 1)]);
    let mut input = ScriptedInput::new(script);
    table.play_hand(&mut input).unwrap();

    assert!(input.requests.len() <= 4 * (max + 1));
}

#[test]
fn folded_out_hand_awards_the_pot_uncontested() {
    let mut table = table_with(&["a", "b", "c"]);
    let mut input = ScriptedInput::new([Action::Fold, Action::Fold]);
    let snapshot = table.play_hand(&mut input).unwrap();

    // a and b folded; c collected the blinds without acting.
    assert_eq!(snapshot.pot, 0);
    assert_eq!(stack_of(&table, "c"), 115);
    let awarded = table
        .drain_events()
        .into_iter()
        .any(|e| matches!(e, GameEvent::PotAwarded { amount: 15, .. }));
    assert!(awarded);
}

#[test]
fn busted_caller_is_swept_after_the_hand() {
    let mut table = table_with(&["a", "b", "c"]);
    set_stack(&mut table, "c", 10);
    let mut input = ScriptedInput::new([Action::Call, Action::Check, Action::Call]);
    table.play_hand(&mut input).unwrap();

    assert!(table.ring.find(&"c".into()).is_none());
    let swept = table.drain_events().into_iter().any(|e| {
        matches!(
            e,
            GameEvent::PlayerRemoved {
                reason: RemovalReason::OutOfChips,
                ..
            }
        )
    });
    assert!(swept);
}

#[test]
fn chips_are_conserved_across_rotating_hands() {
    let mut table = table_with(&["a", "b", "c"]);
    assert_eq!(total_chips(&table), 300);

    for _ in 0..3 {
        // The two players in front fold; the third collects the blinds.
        let mut input = ScriptedInput::new([Action::Fold, Action::Fold]);
        table.play_hand(&mut input).unwrap();
        assert_eq!(total_chips(&table), 300);
        table.rotate_blinds();
    }
    // After a full orbit the roles are back where they started.
    let sb = table.ring.small_blind().unwrap();
    assert_eq!(table.ring.player(sb).unwrap().name, "a".into());
    assert!(table.ring.is_viable());
}

#[test]
fn standings_report_counters_and_cards() {
    let mut table = table_with(&["a", "b"]);
    let mut input = ScriptedInput::new([Action::Call, Action::Check]);
    let snapshot = table.play_hand(&mut input).unwrap();

    assert_eq!(snapshot.players.len(), 2);
    let a = &snapshot.players[0];
    assert_eq!(a.name, "a".into());
    assert_eq!(a.cards.len(), 2);
    assert_eq!(a.counters.calls, 1);
    let b = &snapshot.players[1];
    assert_eq!(b.counters.checks, 1);

    // The snapshot doubles as structured output.
    let json = serde_json::to_value(&snapshot).unwrap();
    assert!(json.get("pot").is_some());
}
