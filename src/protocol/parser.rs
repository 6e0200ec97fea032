//! Text command parser.
//!
//! Parses incoming protocol lines into structured `Command` variants that
//! the main loop dispatches on. Unit ids are the numbers shown in `state`
//! reports; hexes are written `hx,hy`.

use crate::board::hex::HexCoord;
use crate::board::unit::UnitId;
use crate::decision::Intent;

/// A parsed client-to-engine command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Protocol handshake; the engine lists its options.
    Hello,

    /// Synchronization ping; engine must reply `readyok`.
    IsReady,

    /// Set an engine option: `setoption name <id> [value <x>]`.
    SetOption { name: String, value: Option<String> },

    /// Start the standard battle with the current options.
    NewGame,

    /// Print the full battle state.
    State,

    /// Select a unit for display.
    Select { id: UnitId },

    /// Select the active side's next unit.
    Next,

    /// A player intent for one unit.
    Act { id: UnitId, intent: Intent },

    /// Hand play to the other side.
    EndTurn,

    /// Let the AI play the active side's units.
    Ai,

    /// Print the battle as a JSON snapshot.
    Save,

    /// Restore a battle from a JSON snapshot.
    Load { json: String },

    /// Terminate the engine process.
    Quit,
}

/// Parses a single line of input into a `Command`.
///
/// Returns `None` for empty lines or unrecognized commands. Malformed
/// arguments for known commands also return `None` after logging to stderr.
pub fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let first = *tokens.first()?;

    match first {
        "hexfront" => Some(Command::Hello),
        "isready" => Some(Command::IsReady),
        "quit" => Some(Command::Quit),
        "newgame" => Some(Command::NewGame),
        "state" => Some(Command::State),
        "next" => Some(Command::Next),
        "endturn" => Some(Command::EndTurn),
        "ai" => Some(Command::Ai),
        "save" => Some(Command::Save),

        "setoption" => parse_setoption(&tokens),
        "select" => parse_unit(&tokens).map(|id| Command::Select { id }),
        "rotate" | "forward" | "move" | "attack" | "breakfree" => parse_act(&tokens),
        "load" => parse_load(trimmed),

        other => {
            eprintln!("unknown command: {}", other);
            None
        }
    }
}

/// Parses `setoption name <id> [value <x>]`.
fn parse_setoption(tokens: &[&str]) -> Option<Command> {
    if tokens.len() < 3 || tokens[1] != "name" {
        eprintln!("malformed setoption: expected 'setoption name <id> [value <x>]'");
        return None;
    }

    let (name, value) = match tokens.iter().position(|&t| t == "value") {
        Some(vi) => {
            let name = tokens[2..vi].join(" ");
            if name.is_empty() {
                eprintln!("malformed setoption: empty name");
                return None;
            }
            let rest = &tokens[vi + 1..];
            (name, (!rest.is_empty()).then(|| rest.join(" ")))
        }
        None => (tokens[2..].join(" "), None),
    };

    Some(Command::SetOption { name, value })
}

/// Parses the unit id in position 1.
fn parse_unit(tokens: &[&str]) -> Option<UnitId> {
    let Some(raw) = tokens.get(1) else {
        eprintln!("malformed {}: missing unit id", tokens[0]);
        return None;
    };
    match raw.parse::<u32>() {
        Ok(n) => Some(UnitId(n)),
        Err(_) => {
            eprintln!("invalid unit id: '{}'", raw);
            None
        }
    }
}

/// Parses a hex written `hx,hy`.
pub fn parse_hex(s: &str) -> Option<HexCoord> {
    let (hx, hy) = s.split_once(',')?;
    Some(HexCoord::new(hx.trim().parse().ok()?, hy.trim().parse().ok()?))
}

/// Parses `rotate <id> <delta>`, `forward <id>`, `move <id> <hex>`,
/// `attack <id> <hex>` and `breakfree <id>`.
fn parse_act(tokens: &[&str]) -> Option<Command> {
    let id = parse_unit(tokens)?;
    let arg = tokens.get(2).copied();

    let intent = match (tokens[0], arg) {
        ("forward", _) => Intent::MoveForward,
        ("breakfree", _) => Intent::FreeAttempt,
        ("rotate", Some(delta)) => match delta.parse::<i32>() {
            Ok(d) => Intent::Rotate(d),
            Err(_) => {
                eprintln!("invalid rotation: '{}'", delta);
                return None;
            }
        },
        ("move", Some(hex)) | ("attack", Some(hex)) => {
            let Some(hex) = parse_hex(hex) else {
                eprintln!("invalid hex: '{}'", hex);
                return None;
            };
            if tokens[0] == "move" {
                Intent::MoveTo(hex)
            } else {
                Intent::Attack(hex)
            }
        }
        (cmd, None) => {
            eprintln!("malformed {}: missing argument", cmd);
            return None;
        }
        (cmd, Some(_)) => {
            eprintln!("unknown action: '{}'", cmd);
            return None;
        }
    };

    Some(Command::Act { id, intent })
}

/// Parses `load <json>`; the JSON is everything after the keyword.
fn parse_load(line: &str) -> Option<Command> {
    let json = line.strip_prefix("load").unwrap_or("").trim();
    if json.is_empty() {
        eprintln!("malformed load: expected 'load <snapshot json>'");
        return None;
    }
    Some(Command::Load {
        json: json.to_string(),
    })
}
