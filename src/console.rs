//! # Operator Console
//!
//! Line-oriented operator commands read from stdin.
//!
//! This module handles:
//! - Parsing one command per line
//! - Mapping valve commands onto [`ValveCommand`]
//!
//! Commands:
//!
//! ```text
//! connect <umb|tlm>        open the configured port for a link
//! disconnect <umb|tlm>     close a link
//! source <umb|tlm>         select the displayed link
//! log                      toggle the logging session
//! sv <0-7> <open|close> [umb|tlm]  actuate a solenoid valve (UMB unless named)
//! mv <0-3> <open|close> [umb|tlm]  actuate a motor valve (UMB unless named)
//! status                   print the latest display record
//! help                     list commands
//! quit                     shut down
//! ```

use std::str::FromStr;

use crate::command::ValveCommand;
use crate::error::GcsError;
use crate::telemetry::record::SourceId;

/// Link valve commands go out on when none is named
pub const DEFAULT_VALVE_LINK: SourceId = SourceId::Umb;

/// Usage text printed by `help`
pub const HELP: &str = "commands: connect <umb|tlm>, disconnect <umb|tlm>, source <umb|tlm>, \
log, sv <0-7> <open|close> [umb|tlm], mv <0-3> <open|close> [umb|tlm] (valves default to UMB), \
status, help, quit";

/// A parsed operator command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Connect(SourceId),
    Disconnect(SourceId),
    Source(SourceId),
    ToggleLog,
    Valve { command: ValveCommand, link: SourceId },
    Status,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = GcsError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(GcsError::InvalidCommand("empty command".into()));
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("connect", [source]) => Self::Connect(parse_source(source)?),
            ("disconnect", [source]) => Self::Disconnect(parse_source(source)?),
            ("source", [source]) => Self::Source(parse_source(source)?),
            ("log", []) => Self::ToggleLog,
            ("sv", [index, state, link @ ..]) if link.len() <= 1 => Self::Valve {
                command: ValveCommand::solenoid(parse_index(index)?, parse_state(state)?)?,
                link: parse_valve_link(link)?,
            },
            ("mv", [index, state, link @ ..]) if link.len() <= 1 => Self::Valve {
                command: ValveCommand::motor(parse_index(index)?, parse_state(state)?)?,
                link: parse_valve_link(link)?,
            },
            ("status", []) => Self::Status,
            ("help" | "?", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            _ => return Err(GcsError::InvalidCommand(format!("'{}' ({})", line.trim(), HELP))),
        };
        Ok(command)
    }
}

fn parse_source(word: &str) -> Result<SourceId, GcsError> {
    word.parse().map_err(GcsError::InvalidCommand)
}

fn parse_valve_link(link: &[&str]) -> Result<SourceId, GcsError> {
    match link {
        [source] => parse_source(source),
        _ => Ok(DEFAULT_VALVE_LINK),
    }
}

fn parse_index(word: &str) -> Result<usize, GcsError> {
    word.parse()
        .map_err(|_| GcsError::InvalidCommand(format!("invalid valve index '{}'", word)))
}

fn parse_state(word: &str) -> Result<bool, GcsError> {
    match word.to_ascii_lowercase().as_str() {
        "open" | "1" | "on" => Ok(true),
        "close" | "closed" | "0" | "off" => Ok(false),
        other => Err(GcsError::InvalidCommand(format!(
            "invalid valve state '{}' (expected open or close)",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_commands() {
        assert_eq!(
            "connect umb".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Connect(SourceId::Umb)
        );
        assert_eq!(
            "DISCONNECT TLM".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Disconnect(SourceId::Tlm)
        );
        assert_eq!(
            "  source tlm ".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Source(SourceId::Tlm)
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("log".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::ToggleLog);
        assert_eq!("status".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::Status);
        assert_eq!("?".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::Help);
        assert_eq!("exit".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::Quit);
    }

    #[test]
    fn test_parse_valve_commands() {
        let sv = "sv 2 open".parse::<ConsoleCommand>().unwrap();
        assert_eq!(
            sv,
            ConsoleCommand::Valve {
                command: ValveCommand::Solenoid { index: 2, open: true },
                link: SourceId::Umb,
            }
        );

        let mv = "mv 3 close".parse::<ConsoleCommand>().unwrap();
        assert_eq!(
            mv,
            ConsoleCommand::Valve {
                command: ValveCommand::Motor { index: 3, open: false },
                link: SourceId::Umb,
            }
        );
    }

    #[test]
    fn test_valve_command_with_named_link() {
        assert_eq!(DEFAULT_VALVE_LINK, SourceId::Umb);

        let sv = "sv 0 close tlm".parse::<ConsoleCommand>().unwrap();
        assert_eq!(
            sv,
            ConsoleCommand::Valve {
                command: ValveCommand::Solenoid { index: 0, open: false },
                link: SourceId::Tlm,
            }
        );
    }

    #[test]
    fn test_invalid_commands() {
        let lines = [
            "",
            "fly",
            "connect",
            "connect gps",
            "sv 9 open",
            "mv 1 ajar",
            "sv x open",
            "log now",
            "sv 1 open gps",
            "mv 1 open umb tlm",
        ];
        for line in lines {
            assert!(
                matches!(line.parse::<ConsoleCommand>(), Err(GcsError::InvalidCommand(_))),
                "accepted {:?}",
                line
            );
        }
    }
}
