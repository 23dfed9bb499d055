//! Operator console
//!
//! One command per line, words separated by whitespace:
//!
//! | command                  | effect                                        |
//! |--------------------------|-----------------------------------------------|
//! | `as name [timeout]`      | expect sensor `name` for `timeout` seconds    |
//! | `rs id`                  | remove sensor `id` and free its slot          |
//! | `ls filename`            | save the registry file                        |
//! | `lm filename id [days]`  | export the last `days` of history (360)       |
//! | `mp minutes`             | set the measurement period                    |
//! | `x`                      | stop the base station                         |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::info;
use sensnet_core::time::Timestamp;

use crate::export;
use crate::network::Network;
use crate::{Result, ServerError};

/// History exported by `lm` when no day count is given
pub const DEFAULT_EXPORT_DAYS: u32 = 360;

const SECS_PER_DAY: u32 = 24 * 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Accept the next pairing request under `name`
    AddSensor { name: String, timeout: Option<Duration> },
    RemoveSensor { address: u32 },
    SaveSensors { path: PathBuf },
    ExportMeasurements { path: PathBuf, address: u32, days: u32 },
    MeasurementPeriod { minutes: u32 },
    Exit,
}

/// What the console loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

impl FromStr for Command {
    type Err = ServerError;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else {
            return Err(ServerError::Command("empty command".into()));
        };

        let command = match cmd {
            "as" => {
                let name = required(words.next(), "as name [timeout]")?;
                let timeout = optional::<u64>(words.next(), "as name [timeout]")?;
                Command::AddSensor {
                    name: name.to_string(),
                    timeout: timeout.map(Duration::from_secs),
                }
            }
            "rs" => Command::RemoveSensor {
                address: parse(words.next(), "rs id")?,
            },
            "ls" => Command::SaveSensors {
                path: required(words.next(), "ls filename")?.into(),
            },
            "lm" => {
                let usage = "lm filename id [days]";
                let path = required(words.next(), usage)?.into();
                let address = parse(words.next(), usage)?;
                let days = optional(words.next(), usage)?.unwrap_or(DEFAULT_EXPORT_DAYS);
                Command::ExportMeasurements { path, address, days }
            }
            "mp" => Command::MeasurementPeriod {
                minutes: parse::<u32>(words.next(), "mp minutes")?.max(1),
            },
            "x" => Command::Exit,
            other => return Err(ServerError::Command(format!("unrecognized command '{}'", other))),
        };
        Ok(command)
    }
}

impl Command {
    /// Apply to `network` at `now`
    ///
    /// `default_window` is used by `as` when no timeout is given.
    pub fn execute(&self, network: &mut Network, now: Timestamp, default_window: Duration) -> Result<Flow> {
        match self {
            Command::AddSensor { name, timeout } => {
                network.open_pairing_window(name.clone(), timeout.unwrap_or(default_window), now);
            }
            Command::RemoveSensor { address } => {
                network.remove_sensor(*address)?;
            }
            Command::SaveSensors { path } => {
                network.save_registry(path)?;
                info!("sensors saved to {}", path.display());
            }
            Command::ExportMeasurements { path, address, days } => {
                let sensor = network
                    .sensor(*address)
                    .ok_or(ServerError::UnknownSensor(*address))?;
                let end = (now / 1000).min(u64::from(u32::MAX)) as u32;
                let begin = end.saturating_sub(days.saturating_mul(SECS_PER_DAY));
                let rows = export::export_file(path, sensor, begin, end)?;
                info!(
                    "saved {} measurements of sensor {} from '{}' to '{}' to {}",
                    rows,
                    address,
                    export::format_time(begin),
                    export::format_time(end),
                    path.display()
                );
            }
            Command::MeasurementPeriod { minutes } => {
                let scheduler = network.scheduler_mut();
                scheduler.set_measurement_period(Duration::from_secs(u64::from(*minutes) * 60));
                info!("measurement period is now {:?}", scheduler.get_measurement_period());
            }
            Command::Exit => {
                info!("exiting");
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }
}

fn required<'a>(word: Option<&'a str>, usage: &str) -> Result<&'a str> {
    word.ok_or_else(|| ServerError::Command(format!("syntax: {}", usage)))
}

fn parse<T: FromStr>(word: Option<&str>, usage: &str) -> Result<T> {
    required(word, usage)?
        .parse()
        .map_err(|_| ServerError::Command(format!("syntax: {}", usage)))
}

fn optional<T: FromStr>(word: Option<&str>, usage: &str) -> Result<Option<T>> {
    word.map(|w| parse(Some(w), usage)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Record;
    use sensnet_core::Measurement;

    const WINDOW: Duration = Duration::from_secs(30);

    #[test]
    fn parses_console_syntax() {
        assert_eq!(
            "as attic 45".parse::<Command>().unwrap(),
            Command::AddSensor {
                name: "attic".into(),
                timeout: Some(Duration::from_secs(45))
            }
        );
        assert_eq!(
            "as attic".parse::<Command>().unwrap(),
            Command::AddSensor { name: "attic".into(), timeout: None }
        );
        assert_eq!("rs 1003".parse::<Command>().unwrap(), Command::RemoveSensor { address: 1003 });
        assert_eq!(
            "  lm out.tsv 1002 ".parse::<Command>().unwrap(),
            Command::ExportMeasurements {
                path: "out.tsv".into(),
                address: 1002,
                days: DEFAULT_EXPORT_DAYS
            }
        );
        assert_eq!("mp 0".parse::<Command>().unwrap(), Command::MeasurementPeriod { minutes: 1 });
        assert_eq!("x".parse::<Command>().unwrap(), Command::Exit);
    }

    #[test]
    fn rejects_bad_input() {
        for line in ["", "   ", "as", "rs abc", "ls", "lm out.tsv", "lm out.tsv 1002 many", "mp", "zz"] {
            assert!(
                matches!(line.parse::<Command>(), Err(ServerError::Command(_))),
                "{:?} should not parse",
                line
            );
        }
    }

    #[test]
    fn add_sensor_opens_window() {
        let mut network = Network::default();
        let flow = Command::AddSensor { name: "porch".into(), timeout: None }
            .execute(&mut network, 0, WINDOW)
            .unwrap();
        assert_eq!(flow, Flow::Continue);
        assert!(network.pairing().is_window_open(30_000));
        assert!(!network.pairing().is_window_open(30_001));
        assert_eq!(network.pair(1_000).unwrap().name, "porch");
    }

    #[test]
    fn huge_pairing_timeout_is_accepted() {
        let mut network = Network::default();
        let command = "as attic 18446744073709551615".parse::<Command>().unwrap();
        let flow = command.execute(&mut network, 1_700_000_000_000, WINDOW).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert!(network.pairing().is_window_open(u64::MAX));
    }

    #[test]
    fn remove_unknown_sensor_fails() {
        let mut network = Network::default();
        let result = Command::RemoveSensor { address: 77 }.execute(&mut network, 0, WINDOW);
        assert!(matches!(result, Err(ServerError::UnknownSensor(77))));
    }

    #[test]
    fn measurement_period_in_minutes() {
        let mut network = Network::default();
        Command::MeasurementPeriod { minutes: 2 }
            .execute(&mut network, 0, WINDOW)
            .unwrap();
        assert_eq!(network.scheduler().get_measurement_period(), Duration::from_secs(120));
    }

    #[test]
    fn export_covers_requested_days() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.tsv");

        let mut network = Network::default();
        let grant = network.pair(0).unwrap();
        let now_secs = 10 * SECS_PER_DAY;
        for t in [now_secs - 3 * SECS_PER_DAY, now_secs - SECS_PER_DAY, now_secs] {
            let record = Record {
                timestamp: t,
                index: 0,
                measurement: Measurement::new(20.0, 50.0, 3.0),
            };
            network.record(grant.address, record, 0).unwrap();
        }

        let command = Command::ExportMeasurements {
            path: path.clone(),
            address: grant.address,
            days: 2,
        };
        let flow = command
            .execute(&mut network, u64::from(now_secs) * 1000, WINDOW)
            .unwrap();
        assert_eq!(flow, Flow::Continue);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn exit_stops() {
        let mut network = Network::default();
        assert_eq!(Command::Exit.execute(&mut network, 0, WINDOW).unwrap(), Flow::Exit);
    }
}
