//! Hexfront -- a hex-grid platoon battle engine driven over stdin/stdout.
//!
//! Each input line is one command; responses are written to stdout as
//! protocol lines. Diagnostics go to stderr through `tracing`.

use std::io::{self, BufRead, Write};

use tracing_subscriber::EnvFilter;

use hexfront::engine::{Engine, EngineError};
use hexfront::protocol::parser::{parse_command, Command};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hexfront=info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut engine = match Engine::new() {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("failed to load unit catalog: {}", err);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        let cmd = match parse_command(&line) {
            Some(c) => c,
            None => continue,
        };

        let result = match cmd {
            Command::Hello => engine.handle_hello(&mut out),
            Command::IsReady => engine.handle_isready(&mut out),
            Command::SetOption { name, value } => {
                engine.set_option(name, value);
                Ok(())
            }
            Command::NewGame => engine.new_game(&mut out),
            Command::State => engine.handle_state(&mut out),
            Command::Select { id } => engine.handle_select(id, &mut out),
            Command::Next => engine.handle_next(&mut out),
            Command::Act { id, intent } => engine.handle_act(id, intent, &mut out),
            Command::EndTurn => engine.handle_end_turn(&mut out),
            Command::Ai => engine.handle_ai(&mut out),
            Command::Save => engine.handle_save(&mut out),
            Command::Load { json } => engine.handle_load(&json, &mut out),
            Command::Quit => break,
        };

        match result {
            Ok(()) => {}
            Err(EngineError::Io(err)) => {
                tracing::error!(error = %err, "output closed");
                break;
            }
            Err(err) => {
                tracing::warn!(error = %err, "command failed");
                if writeln!(out, "error {}", err).is_err() {
                    break;
                }
            }
        }
        if out.flush().is_err() {
            break;
        }
    }
}
