//! Operator input parsed into console actions.

use anyhow::{anyhow, bail, Result};
use console_core::parse_floor_list;
use shared::domain::{CarName, Direction, FloorNumber};

pub const HELP: &str = "\
commands:
  call <floor> <up|down>          press a hall call button
  go <floor> <floors> <car name>  answer a waiting car, e.g. `go 1 3,5 Car 1`
  show                            print the current console state
  help                            print this help
  quit                            leave the console";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Call {
        floor: FloorNumber,
        direction: Direction,
    },
    Go {
        floor: FloorNumber,
        requested_floors: Vec<FloorNumber>,
        car: CarName,
    },
    Show,
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ConsoleCommand::Call { .. } => "call",
            ConsoleCommand::Go { .. } => "go",
            ConsoleCommand::Show => "show",
            ConsoleCommand::Help => "help",
            ConsoleCommand::Quit => "quit",
        }
    }
}

/// `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>> {
    let line = line.trim();
    let Some((verb, rest)) = split_word(line) else {
        return Ok(None);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "call" => {
            let usage = "usage: call <floor> <up|down>";
            let (floor, rest) = split_word(rest).ok_or_else(|| anyhow!(usage))?;
            let (direction, rest) = split_word(rest).ok_or_else(|| anyhow!(usage))?;
            if !rest.is_empty() {
                bail!(usage);
            }
            ConsoleCommand::Call {
                floor: parse_floor(floor)?,
                direction: parse_direction(direction)?,
            }
        }
        "go" => {
            let usage = "usage: go <floor> <floors> <car name>";
            let (floor, rest) = split_word(rest).ok_or_else(|| anyhow!(usage))?;
            let (floors, car) = split_word(rest).ok_or_else(|| anyhow!(usage))?;
            if car.is_empty() {
                bail!(usage);
            }
            ConsoleCommand::Go {
                floor: parse_floor(floor)?,
                requested_floors: parse_floor_list(floors)?,
                car: CarName::new(car),
            }
        }
        "show" | "status" => ConsoleCommand::Show,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => bail!("unknown command '{other}'; type `help`"),
    };
    Ok(Some(command))
}

fn split_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim())),
        None => Some((input, "")),
    }
}

fn parse_floor(raw: &str) -> Result<FloorNumber> {
    raw.parse()
        .map_err(|_| anyhow!("'{raw}' is not a floor number"))
}

fn parse_direction(raw: &str) -> Result<Direction> {
    match raw.to_ascii_lowercase().as_str() {
        "up" | "u" | "ascending" => Ok(Direction::Ascending),
        "down" | "d" | "descending" => Ok(Direction::Descending),
        _ => bail!("'{raw}' is not a direction; use up or down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call() {
        assert_eq!(
            parse_command("call 2 DOWN").expect("parse"),
            Some(ConsoleCommand::Call {
                floor: 2,
                direction: Direction::Descending,
            })
        );
    }

    #[test]
    fn go_keeps_spaces_in_car_names() {
        assert_eq!(
            parse_command("  go 1 3,5   Car 1 ").expect("parse"),
            Some(ConsoleCommand::Go {
                floor: 1,
                requested_floors: vec![3, 5],
                car: CarName::from("Car 1"),
            })
        );
    }

    #[test]
    fn blank_line_is_no_command() {
        assert_eq!(parse_command("   ").expect("parse"), None);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("call x up").is_err());
        assert!(parse_command("call 1 sideways").is_err());
        assert!(parse_command("call 1").is_err());
        assert!(parse_command("go 1 3,x Car 1").is_err());
        assert!(parse_command("go 1 3").is_err());
        assert!(parse_command("dance").is_err());
    }
}
