//! Tab-separated export of a sensor's history
//!
//! One row per record, readable by spreadsheets and plotting tools:
//!
//! ```text
//! time                 temperature  humidity  vcc
//! 2024-01-01 12:00:00  21.37        45.1      3.30
//! ```
//!
//! Times are UTC.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::registry::{Record, Sensor};
use crate::Result;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Unix seconds as `YYYY-MM-DD HH:MM:SS`
pub fn format_time(timestamp: u32) -> String {
    match DateTime::<Utc>::from_timestamp(i64::from(timestamp), 0) {
        Some(time) => time.format(TIME_FORMAT).to_string(),
        None => timestamp.to_string(),
    }
}

/// Write the records of `sensor` in `[begin, end]` to `out`
///
/// Returns the number of rows written.
pub fn write_tsv<W: Write>(mut out: W, sensor: &Sensor, begin: u32, end: u32) -> Result<usize> {
    writeln!(out, "time\ttemperature\thumidity\tvcc")?;

    let records = sensor.records_between(begin, end);
    for record in records {
        write_row(&mut out, record)?;
    }
    out.flush()?;
    Ok(records.len())
}

/// Same as [`write_tsv`] into a new file at `path`
pub fn export_file(path: impl AsRef<Path>, sensor: &Sensor, begin: u32, end: u32) -> Result<usize> {
    let file = File::create(path)?;
    write_tsv(BufWriter::new(file), sensor, begin, end)
}

fn write_row<W: Write>(out: &mut W, record: &Record) -> Result<()> {
    let m = &record.measurement;
    writeln!(
        out,
        "{}\t{:.2}\t{:.1}\t{:.2}",
        format_time(record.timestamp),
        m.temperature,
        m.humidity,
        m.vcc
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SensorRegistry;
    use sensnet_core::Measurement;

    #[test]
    fn formats_utc() {
        assert_eq!(format_time(0), "1970-01-01 00:00:00");
        assert_eq!(format_time(1_704_110_400), "2024-01-01 12:00:00");
    }

    #[test]
    fn writes_range_only() {
        let mut registry = SensorRegistry::new();
        registry.insert(Sensor::new(1002, "kitchen", 0, 0));
        for (i, t) in [100u32, 200, 300].into_iter().enumerate() {
            let record = Record {
                timestamp: t,
                index: i as u8,
                measurement: Measurement::new(21.37, 45.1, 3.3),
            };
            registry.add_record(1002, record, 0).unwrap();
        }

        let mut out = Vec::new();
        let rows = write_tsv(&mut out, registry.get(1002).unwrap(), 150, 300).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time\ttemperature\thumidity\tvcc");
        assert_eq!(lines[1], "1970-01-01 00:03:20\t21.37\t45.1\t3.30");
        assert_eq!(lines.len(), 3);
    }
}
