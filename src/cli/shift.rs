use std::fmt::Display;

use ansi_term::Colour::{Cyan, Green, Red, Yellow};
use anyhow::{bail, Result};
use chrono::{Duration, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::ValueEnum;

use crate::{
    daemon::storage::{
        entities::{CheckInRecord, NotifiedFlags},
        kv::{JsonFileStore, KeyValueStore},
    },
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        percentage::duration_percentage,
        time::{
            checkout_instant, format_clock_time, minutes_until, parse_clock_time,
            SHIFT_DURATION_HOURS,
        },
    },
};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

pub fn open_store() -> Result<JsonFileStore> {
    let dir = create_application_default_path()?;
    Ok(JsonFileStore::new(dir.join("store"))?)
}

/// Command to record today's shift start. Saving again overwrites the earlier check-in;
/// reminder flags stay with the scheduler, which cleans them up on its own tick.
pub async fn process_check_in(time: Option<String>) -> Result<()> {
    let store = open_store()?;
    let clock = DefaultClock;
    let now = clock.now();

    let in_time = match &time {
        Some(raw) => match parse_clock_time(raw) {
            Some(parsed) => parsed,
            None => bail!("Expected a check-in time like 09:00, got {raw:?}"),
        },
        None => now.time(),
    };

    let record = CheckInRecord {
        in_time: format_clock_time(in_time),
        saved_at: now,
    };
    record.save(&store, clock.today()).await?;

    match checkout_instant(clock.today(), in_time) {
        Some(checkout) => println!(
            "Checked in at {}. Checkout at {}.",
            Green.paint(record.in_time.as_str()),
            Green.paint(checkout.format("%H:%M").to_string()),
        ),
        None => println!("Checked in at {}.", Green.paint(record.in_time.as_str())),
    }
    Ok(())
}

/// Command to drop today's check-in. Leftover reminder flags are the scheduler's to collect;
/// its next tick notices the missing record and removes them.
pub async fn process_clear() -> Result<()> {
    let store = open_store()?;
    let clock = DefaultClock;

    CheckInRecord::clear(&store, clock.today()).await?;

    println!("Cleared today's check-in.");
    Ok(())
}

/// Command to show the check-in, the derived checkout and the reminder state for a day.
pub async fn process_status(day: Option<String>, date_style: DateStyle) -> Result<()> {
    let store = open_store()?;
    let clock = DefaultClock;
    let now = clock.now();

    let date = match day {
        Some(expr) => match parse_date_string(&expr, now, date_style.into()) {
            Ok(parsed) => parsed.with_timezone(&Local).date_naive(),
            Err(e) => bail!("Failed to parse day {expr:?}: {e}"),
        },
        None => clock.today(),
    };

    let Some(record) = CheckInRecord::load(&store, date).await? else {
        println!("No check-in recorded for {date}.");
        return Ok(());
    };
    let Some(in_time) = record.clock_time() else {
        println!(
            "Check-in for {date} is unreadable: {}",
            Red.paint(record.in_time.as_str())
        );
        return Ok(());
    };

    println!("{}", Cyan.paint(date.to_string()));
    println!("Checked in   {}", Green.paint(format_clock_time(in_time)));

    let Some(checkout) = checkout_instant(date, in_time) else {
        println!("Checkout time does not exist on this day.");
        return Ok(());
    };
    println!(
        "Checkout     {}",
        Green.paint(checkout.format("%H:%M").to_string())
    );

    if date == clock.today() {
        print_progress(&store, date, checkout, now).await?;
    }
    Ok(())
}

async fn print_progress(
    store: &dyn KeyValueStore,
    date: NaiveDate,
    checkout: chrono::DateTime<Local>,
    now: chrono::DateTime<Local>,
) -> Result<()> {
    let diff_min = minutes_until(now, checkout);
    if diff_min > 0.0 {
        let worked = Duration::hours(SHIFT_DURATION_HOURS) - (checkout - now);
        let progress = duration_percentage(
            worked.max(Duration::zero()),
            Duration::hours(SHIFT_DURATION_HOURS),
        );
        println!(
            "Remaining    {} ({}% of the shift done)",
            Yellow.paint(format_minutes(diff_min)),
            *progress as i32,
        );
    } else {
        println!(
            "Shift ended {} ago",
            Yellow.paint(format_minutes(-diff_min))
        );
    }

    let flags = NotifiedFlags::load(store, date).await?;
    if flags.any() {
        let mut sent = vec![];
        if flags.one_hour_sent {
            sent.push("1-hour");
        }
        if flags.five_min_sent {
            sent.push("5-minute");
        }
        if flags.completed_sent {
            sent.push("completion");
        }
        println!("Reminders    {}", sent.join(", "));
    }
    Ok(())
}

fn format_minutes(minutes: f64) -> String {
    let whole = minutes as i64;
    if whole >= 60 {
        format!("{}h{}m", whole / 60, whole % 60)
    } else {
        format!("{whole}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_format_switches_to_hours() {
        assert_eq!(format_minutes(59.9), "59m");
        assert_eq!(format_minutes(60.0), "1h0m");
        assert_eq!(format_minutes(125.0), "2h5m");
    }
}
