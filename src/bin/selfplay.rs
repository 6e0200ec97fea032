//! AI-vs-AI batch CLI.
//!
//! Plays standard battles with both sides under computer control and writes
//! one JSON record per game.
//!
//! Usage:
//!   cargo run --release --bin selfplay -- [OPTIONS]
//!
//! Options:
//!   --games N        Number of games to play (default: 10)
//!   --turn-limit N   Turns per battle (default: 8)
//!   --map KIND       scripted or random (default: scripted)
//!   --threads N      Number of parallel threads (default: 4)
//!   --seed N         Random seed, 0 for entropy (default: 0)
//!   --output FILE    Output file path (default: stdout)
//!   --quiet          Suppress progress and summary output

use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process;
use std::str::FromStr;
use std::time::Instant;

use tracing_subscriber::EnvFilter;

use hexfront::board::catalog::UnitCatalog;
use hexfront::board::map::MapKind;
use hexfront::selfplay::{self, SelfPlayConfig};

/// Reads the value following flag `args[*i]`, exiting on a missing or bad value.
fn flag_value<T: FromStr>(args: &[String], i: &mut usize) -> T {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i).map(|v| v.parse()) {
        Some(Ok(v)) => v,
        _ => {
            eprintln!("invalid {} value", flag);
            print_usage();
            process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hexfront=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = SelfPlayConfig::default();
    let mut output_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--games" => config.num_games = flag_value(&args, &mut i),
            "--turn-limit" => config.turn_limit = flag_value(&args, &mut i),
            "--threads" => config.threads = flag_value(&args, &mut i),
            "--seed" => config.seed = flag_value(&args, &mut i),
            "--map" => {
                let name: String = flag_value(&args, &mut i);
                config.map = match MapKind::from_name(&name) {
                    Some(kind) => kind,
                    None => {
                        eprintln!("unknown map kind: {}", name);
                        process::exit(1);
                    }
                };
            }
            "--output" => output_path = Some(flag_value(&args, &mut i)),
            "--quiet" => config.quiet = true,
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let catalog = match UnitCatalog::builtin() {
        Ok(c) => c,
        Err(err) => {
            eprintln!("failed to load unit catalog: {}", err);
            process::exit(1);
        }
    };

    if !config.quiet {
        eprintln!(
            "Self-play: {} games, turn limit {}, {:?} map, {} threads",
            config.num_games, config.turn_limit, config.map, config.threads
        );
    }

    let start = Instant::now();
    let games = match selfplay::run_self_play(&config, &catalog) {
        Ok(games) => games,
        Err(err) => {
            eprintln!("self-play failed: {}", err);
            process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    if !config.quiet {
        eprintln!(
            "Completed {} games in {:.1}s",
            games.len(),
            elapsed.as_secs_f64()
        );
        selfplay::print_summary(&games);
    }

    let written = match &output_path {
        Some(path) => File::create(path).and_then(|file| {
            let mut writer = BufWriter::new(file);
            selfplay::write_jsonl(&games, &mut writer)?;
            writer.flush()
        }),
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            selfplay::write_jsonl(&games, &mut writer)
        }
    };
    if let Err(err) = written {
        eprintln!("failed to write output: {}", err);
        process::exit(1);
    }
    if let (Some(path), false) = (&output_path, config.quiet) {
        eprintln!("Wrote {} games to {}", games.len(), path);
    }
}

fn print_usage() {
    eprintln!("Usage: selfplay [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --games N        Number of games to play (default: 10)");
    eprintln!("  --turn-limit N   Turns per battle (default: 8)");
    eprintln!("  --map KIND       scripted or random (default: scripted)");
    eprintln!("  --threads N      Number of parallel threads (default: 4)");
    eprintln!("  --seed N         Random seed, 0 for entropy (default: 0)");
    eprintln!("  --output FILE    Output file path (default: stdout)");
    eprintln!("  --quiet          Suppress progress and summary output");
    eprintln!("  --help           Show this help");
}
