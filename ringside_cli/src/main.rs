//! An interactive console table.
//!
//! Seats a configurable set of players at one table and prompts each
//! of them on stdin when it is their turn to act. Useful for poking at
//! the engine by hand and as a reference embedding of [`ActionInput`].

use anyhow::{Result, bail};
use log::info;
use pico_args::Arguments;
use ringside::{
    Action, Chips, FirstActorRule, GameSettings, Table, TableError, constants,
    game::{ActionInput, ActionRequest, InputError},
};
use std::io::{self, BufRead, Write};

const HELP: &str = "\
Play hands of poker at a local table

USAGE:
  ringside_cli [OPTIONS]

OPTIONS:
  --names LIST          Comma-separated player names
  --players N           Number of auto-named players  [default: 2]
  --hands N             Stop after N hands  [default: play until game over]
  --buy-in AMOUNT       Starting stack  [default: 100]
  --small-blind AMOUNT  Small blind  [default: 5]
  --big-blind AMOUNT    Big blind  [default: 10]
  --standard-opener     First action goes to the seat after the big blind
  --json                Print standings as JSON after each hand

FLAGS:
  -h, --help            Print help information
";

struct Args {
    names: Vec<String>,
    hands: Option<usize>,
    buy_in: Chips,
    small_blind: Chips,
    big_blind: Chips,
    standard_opener: bool,
    json: bool,
}

fn parse_args() -> Result<Args> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let names: Option<String> = pargs.opt_value_from_str("--names")?;
    let players: usize = pargs.value_from_str("--players").unwrap_or(2);
    let args = Args {
        names: names.map_or_else(
            || (1..=players).map(|i| format!("player{i}")).collect(),
            |list| list.split(',').map(|s| s.trim().to_string()).collect(),
        ),
        hands: pargs.opt_value_from_str("--hands")?,
        buy_in: pargs
            .value_from_str("--buy-in")
            .unwrap_or(constants::DEFAULT_BUY_IN),
        small_blind: pargs
            .value_from_str("--small-blind")
            .unwrap_or(constants::DEFAULT_SMALL_BLIND),
        big_blind: pargs
            .value_from_str("--big-blind")
            .unwrap_or(constants::DEFAULT_BIG_BLIND),
        standard_opener: pargs.contains("--standard-opener"),
        json: pargs.contains("--json"),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        bail!("unrecognized arguments: {remaining:?}");
    }
    Ok(args)
}

/// Prompts on stdout and reads one action per line from stdin. Bad
/// lines come back as [`InputError::Malformed`], which makes the engine
/// ask the same player again.
struct ConsoleInput<R> {
    lines: R,
}

impl<R: BufRead> ActionInput for ConsoleInput<R> {
    fn request_action(&mut self, req: &ActionRequest) -> Result<Action, InputError> {
        let mut options = Vec::new();
        if req.amount_owed > 0 {
            options.push(format!("call ${}", req.amount_owed));
        } else {
            options.push("check".to_string());
        }
        if req.choices.contains(&Action::Raise(req.min_raise)) {
            options.push(format!("raise {}-{}", req.min_raise, req.max_raise));
        }
        options.push("fold".to_string());
        print!("{} to act ({}) > ", req.name, options.join(", "));
        io::stdout().flush().ok();

        let mut line = String::new();
        match self.lines.read_line(&mut line) {
            Ok(0) => Err(InputError::Disconnected),
            Ok(_) => parse_action(line.trim()),
            Err(err) => Err(InputError::Malformed(err.to_string())),
        }
    }
}

fn parse_action(line: &str) -> Result<Action, InputError> {
    let mut words = line.split_whitespace();
    match words.next().map(str::to_ascii_lowercase).as_deref() {
        Some("call" | "c") => Ok(Action::Call),
        Some("check" | "k") => Ok(Action::Check),
        Some("fold" | "f") => Ok(Action::Fold),
        Some("raise" | "r") => {
            let amount = words
                .next()
                .ok_or_else(|| InputError::Malformed("raise needs an amount".to_string()))?
                .parse()
                .map_err(|_| InputError::Malformed("raise amount must be a number".to_string()))?;
            Ok(Action::Raise(amount))
        }
        _ => Err(InputError::Malformed(format!("unrecognized action {line:?}"))),
    }
}

fn report(table: &mut Table) {
    for event in table.drain_events() {
        println!("* {event}");
    }
}

fn main() -> Result<()> {
    env_logger::builder().format_target(false).init();
    let args = parse_args()?;

    let settings = GameSettings {
        buy_in: args.buy_in,
        small_blind: args.small_blind,
        big_blind: args.big_blind,
        first_actor: if args.standard_opener {
            FirstActorRule::AfterBigBlind
        } else {
            FirstActorRule::SmallBlind
        },
        ..GameSettings::default()
    };
    let mut table = Table::new(settings)?;
    for name in &args.names {
        table.add_player(name.as_str())?;
    }
    info!("seated {} players", args.names.len());
    println!("table stakes: {}", table.settings().blinds());
    report(&mut table);

    let mut input = ConsoleInput {
        lines: io::stdin().lock(),
    };
    let mut hand = 0;
    loop {
        hand += 1;
        if args.hands.is_some_and(|max| hand > max) {
            break;
        }
        println!("--- hand {hand} ---");
        let standings = match table.play_hand(&mut input) {
            Ok(standings) => standings,
            Err(TableError::NotEnoughPlayers) => {
                report(&mut table);
                println!("not enough players to continue");
                break;
            }
            Err(err) => return Err(err.into()),
        };
        report(&mut table);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&standings)?);
        } else {
            println!("{standings}");
        }
        table.rotate_blinds();
    }
    Ok(())
}
