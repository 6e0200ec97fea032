//! AI-vs-AI batch games.
//!
//! Both sides are driven by the computer controller until the battle ends.
//! Each finished game is summarised as a [`GameRecord`]; records are written
//! as JSON lines for offline balance analysis of the unit roster.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::board::catalog::UnitCatalog;
use crate::board::map::MapKind;
use crate::board::state::{Battle, BattleError, BattleOutcome, EventSink};
use crate::board::unit::{Side, Unit, UnitId};
use crate::config::BattleConfig;
use crate::decision::{PerSide, Policy};

/// Errors from a self-play run.
#[derive(Debug, thiserror::Error)]
pub enum SelfPlayError {
    #[error("game {game_id}: {source}")]
    Battle {
        game_id: usize,
        source: BattleError,
    },

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("self-play worker thread panicked")]
    WorkerPanicked,
}

#[derive(Clone)]
pub struct SelfPlayConfig {
    /// Number of games to play.
    pub num_games: usize,
    /// Turn limit of each battle.
    pub turn_limit: u32,
    pub map: MapKind,
    /// Number of parallel threads for concurrent games.
    pub threads: usize,
    /// Random seed (0 = use entropy).
    pub seed: u64,
    /// Suppress per-game progress output.
    pub quiet: bool,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        SelfPlayConfig {
            num_games: 10,
            turn_limit: 8,
            map: MapKind::Scripted,
            threads: 4,
            seed: 0,
            quiet: false,
        }
    }
}

/// Summary of one finished battle.
#[derive(Debug, Clone, Serialize)]
pub struct GameRecord {
    pub game_id: usize,
    pub seed: u64,
    /// Winning side (1 or 2), `None` for a draw.
    pub winner: Option<u8>,
    /// Turn counter when the battle ended.
    pub turns: u32,
    pub score: [u32; 2],
    /// Platoons left on the field per side.
    pub units_left: [usize; 2],
    /// Fighters left on the field per side.
    pub fighters_left: [i32; 2],
    /// Side turns that ended with the battle still undecided.
    pub side_turns: u32,
    /// Battle log lines written over the game.
    pub log_lines: u32,
}

/// Drains battle events between side turns, keeping only a count of the
/// log lines.
#[derive(Default)]
struct LogCounter {
    lines: u32,
}

impl EventSink for LogCounter {
    fn on_message(&mut self, _text: &str) {
        self.lines += 1;
    }

    fn on_unit_changed(&mut self, _id: UnitId, _unit: Option<&Unit>) {}

    fn on_battle_state_changed(&mut self, _battle: &Battle) {}
}

impl GameRecord {
    fn outcome_text(&self) -> String {
        match self.winner {
            Some(w) => format!("side {} wins", w),
            None => "draw".to_string(),
        }
    }
}

/// Derives the seed of game `game_id`.
fn game_seed(config: &SelfPlayConfig, game_id: usize) -> u64 {
    if config.seed != 0 {
        config.seed.wrapping_add(game_id as u64)
    } else {
        SmallRng::from_entropy().gen()
    }
}

/// Plays one battle to its end with both sides under AI control.
pub fn play_game(
    config: &SelfPlayConfig,
    catalog: &UnitCatalog,
    game_id: usize,
    seed: u64,
) -> Result<GameRecord, BattleError> {
    let battle_config = BattleConfig {
        turn_limit: config.turn_limit,
        seed: Some(seed),
        map: config.map,
        ..BattleConfig::default()
    };
    let mut battle = Battle::standard(catalog, battle_config)?;
    let mut decider = PerSide([Policy::Ai, Policy::Ai]);
    let mut log = LogCounter::default();
    let mut side_turns = 0;

    let outcome = loop {
        if let Some(outcome) = battle.outcome() {
            break outcome;
        }
        battle.run_side_turn(&mut decider)?;
        let ended = battle.end_turn();
        battle.flush_events(&mut log);
        if let Some(outcome) = ended {
            break outcome;
        }
        side_turns += 1;
    };
    battle.flush_events(&mut log);

    let tally = |side: Side| {
        let units = battle.units().iter().filter(|u| u.side == side);
        (units.clone().count(), units.map(|u| u.fighters).sum::<i32>())
    };
    let (first_units, first_fighters) = tally(Side::First);
    let (second_units, second_fighters) = tally(Side::Second);

    Ok(GameRecord {
        game_id,
        seed,
        winner: match outcome {
            BattleOutcome::Victory(side) => Some(side.index() as u8 + 1),
            BattleOutcome::Draw => None,
        },
        turns: battle.turn(),
        score: [battle.score(Side::First), battle.score(Side::Second)],
        units_left: [first_units, second_units],
        fighters_left: [first_fighters, second_fighters],
        side_turns,
        log_lines: log.lines,
    })
}

/// Runs a batch of games, returning their records in completion order.
///
/// When `config.threads > 1`, games are played concurrently using rayon.
pub fn run_self_play(
    config: &SelfPlayConfig,
    catalog: &UnitCatalog,
) -> Result<Vec<GameRecord>, SelfPlayError> {
    let mut games = Vec::with_capacity(config.num_games);
    if config.threads > 1 {
        run_parallel(config, catalog, |game| games.push(game))?;
    } else {
        for game_id in 0..config.num_games {
            let seed = game_seed(config, game_id);
            let start = Instant::now();
            let game = play_game(config, catalog, game_id, seed)
                .map_err(|source| SelfPlayError::Battle { game_id, source })?;
            report_progress(config, game_id + 1, &game, start);
            games.push(game);
        }
    }
    Ok(games)
}

fn report_progress(config: &SelfPlayConfig, n: usize, game: &GameRecord, start: Instant) {
    if config.quiet {
        return;
    }
    eprintln!(
        "Game {}/{}: {} on turn {} ({:.2}s)",
        n,
        config.num_games,
        game.outcome_text(),
        game.turns,
        start.elapsed().as_secs_f64()
    );
}

/// Plays games on a rayon pool; completed records are delivered to
/// `on_game` on the calling thread.
fn run_parallel<F>(config: &SelfPlayConfig, catalog: &UnitCatalog, mut on_game: F) -> Result<(), SelfPlayError>
where
    F: FnMut(GameRecord),
{
    use rayon::prelude::*;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()?;
    let completed = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<Result<GameRecord, SelfPlayError>>();

    std::thread::scope(|scope| {
        let worker = scope.spawn(|| {
            pool.install(|| {
                (0..config.num_games).into_par_iter().for_each_with(tx, |tx, game_id| {
                    let seed = game_seed(config, game_id);
                    let start = Instant::now();
                    let result = play_game(config, catalog, game_id, seed)
                        .map_err(|source| SelfPlayError::Battle { game_id, source });
                    if let Ok(game) = &result {
                        let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
                        report_progress(config, n, game, start);
                    }
                    let _ = tx.send(result);
                });
            });
        });

        let mut first_error = None;
        for result in rx {
            match result {
                Ok(game) => on_game(game),
                Err(err) => {
                    tracing::warn!(error = %err, "self-play game failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        if worker.join().is_err() {
            return Err(SelfPlayError::WorkerPanicked);
        }
        first_error.map_or(Ok(()), Err)
    })
}

/// Writes game records as JSONL (one JSON object per game, one per line).
pub fn write_jsonl<W: Write>(games: &[GameRecord], out: &mut W) -> std::io::Result<()> {
    for game in games {
        serde_json::to_writer(&mut *out, game)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Prints win rates and averages to stderr.
pub fn print_summary(games: &[GameRecord]) {
    let total = games.len().max(1) as f64;
    let mut wins = [0usize; 2];
    let mut draws = 0usize;
    let mut turns = 0u64;
    let mut decisive = 0usize;

    for game in games {
        turns += u64::from(game.turns);
        match game.winner {
            Some(w) => wins[usize::from(w.saturating_sub(1)).min(1)] += 1,
            None => draws += 1,
        }
        if game.units_left.contains(&0) {
            decisive += 1;
        }
    }

    eprintln!("=== Self-Play Summary ===");
    eprintln!("Games: {}", games.len());
    eprintln!("Avg turns/game: {:.1}", turns as f64 / total);
    eprintln!("Ended by annihilation: {}", decisive);
    eprintln!("Draws: {} ({:.1}%)", draws, 100.0 * draws as f64 / total);
    for (i, &count) in wins.iter().enumerate() {
        eprintln!(
            "  side {}: {} ({:.1}%)",
            i + 1,
            count,
            100.0 * count as f64 / total
        );
    }
}
