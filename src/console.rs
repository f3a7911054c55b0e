//! # Operator Console Module
//!
//! Line commands typed on stdin, parsed on a reader thread and handed to the
//! tick loop over a channel. The reader never touches core state; the tick
//! loop applies each command between its own steps.
//!
//! ## Commands
//! - `ack <n>`: acknowledge the active alert at index `n`
//! - `clear`: dismiss every active alert
//! - `reset`: discard the sample window and beat state
//! - `status`: log the current vitals and log sizes
//! - `csv`: print the vitals history as CSV

use crate::error::CommandError;
use crossbeam_channel::Sender;
use std::io::{self, BufRead};
use std::str::FromStr;
use std::thread;

pub const HELP: &str = "commands: ack <n> | clear | reset | status | csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Acknowledge(usize),
    ClearAlerts,
    ResetSensor,
    Status,
    ExportCsv,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err(CommandError::Empty);
        };

        match word.to_ascii_lowercase().as_str() {
            "ack" => {
                let index = words.next().ok_or(CommandError::MissingIndex)?;
                index
                    .parse()
                    .map(Command::Acknowledge)
                    .map_err(CommandError::BadIndex)
            }
            "clear" => Ok(Command::ClearAlerts),
            "reset" => Ok(Command::ResetSensor),
            "status" => Ok(Command::Status),
            "csv" => Ok(Command::ExportCsv),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Read stdin line by line until EOF or until the tick loop goes away
pub fn spawn_reader(sender: Sender<Command>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::warn!("Console read failed: {}", e);
                        break;
                    }
                };

                match line.parse::<Command>() {
                    Ok(command) => {
                        if sender.send(command).is_err() {
                            break;
                        }
                    }
                    Err(CommandError::Empty) => {}
                    Err(e) => log::warn!("{} ({})", e, HELP),
                }
            }
            log::debug!("Console reader finished");
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("ack 2".parse(), Ok(Command::Acknowledge(2)));
        assert_eq!("  CLEAR ".parse(), Ok(Command::ClearAlerts));
        assert_eq!("reset".parse(), Ok(Command::ResetSensor));
        assert_eq!("status".parse(), Ok(Command::Status));
        assert_eq!("csv".parse(), Ok(Command::ExportCsv));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!("ack".parse::<Command>(), Err(CommandError::MissingIndex));
        assert!(matches!("ack -1".parse::<Command>(), Err(CommandError::BadIndex(_))));
        assert_eq!(
            "beep".parse::<Command>(),
            Err(CommandError::Unknown("beep".to_string()))
        );
    }
}
