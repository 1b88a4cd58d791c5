use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::{
    notify::{send_or_log, NotificationSink},
    utils::{
        clock::Clock,
        time::{checkout_instant, minutes_until},
    },
};

use super::storage::{
    entities::{CheckInRecord, NotifiedFlags},
    kv::KeyValueStore,
};

/// Trigger windows in minutes-until-checkout, half-open on the lower bound. Each is wider
/// than the one-minute tick so a tick can't step over it, and narrow enough that the three
/// never overlap.
const ONE_HOUR_WINDOW: (f64, f64) = (59.0, 60.5);
const FIVE_MIN_WINDOW: (f64, f64) = (4.0, 5.5);
const COMPLETED_WINDOW: (f64, f64) = (-30.0, 0.5);

/// Minutes past checkout after which the day's flags are garbage collected.
const FLAG_RETENTION_MINUTES: f64 = 120.0;

fn in_window(diff_min: f64, (lower, upper): (f64, f64)) -> bool {
    lower < diff_min && diff_min <= upper
}

/// Turns the day's check-in into the three one-shot checkout reminders. Driven by the
/// periodic tick; any single evaluation is safe to repeat because delivery is gated on the
/// persisted [NotifiedFlags].
///
/// A window that fully elapsed while the process was suspended is skipped for the day. There
/// is deliberately no catch-up firing.
pub struct ShiftScheduler {
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl ShiftScheduler {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }

    pub async fn evaluate(&self) -> Result<()> {
        let today = self.clock.today();
        let record = CheckInRecord::load(&*self.store, today).await?;
        let mut flags = NotifiedFlags::load(&*self.store, today).await?;

        let Some(in_time) = record.as_ref().and_then(CheckInRecord::clock_time) else {
            // No usable check-in. Flags left over from a cleared record would re-arm the
            // wrong day, so drop them.
            if flags.any() {
                debug!("No check-in for {today}, removing stale reminder flags");
                NotifiedFlags::clear(&*self.store, today).await?;
            }
            return Ok(());
        };

        let Some(checkout) = checkout_instant(today, in_time) else {
            debug!("Check-in {in_time} does not exist on {today}, skipping");
            return Ok(());
        };
        let now = self.clock.now();
        let diff_min = minutes_until(now, checkout);
        let checkout_clock = checkout.format("%H:%M");

        if !flags.one_hour_sent && in_window(diff_min, ONE_HOUR_WINDOW) {
            info!("Firing one-hour reminder, {diff_min:.1} minutes left");
            send_or_log(
                &*self.notifier,
                "Checkout in 1 hour ⏳",
                &format!("Your checkout is at {checkout_clock}. 1 hour left."),
            );
            flags.one_hour_sent = true;
        }

        if !flags.five_min_sent && in_window(diff_min, FIVE_MIN_WINDOW) {
            info!("Firing five-minute reminder, {diff_min:.1} minutes left");
            send_or_log(
                &*self.notifier,
                "Checkout in 5 minutes ⏰",
                &format!("Your checkout is at {checkout_clock}. 5 minutes left."),
            );
            flags.five_min_sent = true;
        }

        if !flags.completed_sent && in_window(diff_min, COMPLETED_WINDOW) {
            info!("Firing completion notice");
            send_or_log(
                &*self.notifier,
                "Shift completed ✅",
                &format!("Your 7-hour shift completed at {checkout_clock}."),
            );
            flags.completed_sent = true;
        }

        // Written even when unchanged to keep the path simple.
        flags.save(&*self.store, today).await?;

        if -diff_min > FLAG_RETENTION_MINUTES {
            debug!("Checkout long past, purging reminder flags for {today}");
            NotifiedFlags::clear(&*self.store, today).await?;
        }

        Ok(())
    }
}
