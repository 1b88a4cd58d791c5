use std::{collections::HashSet, sync::Arc, time::Duration};

use tracing::{debug, info};

use crate::notify::{send_or_log, NotificationSink};

use super::alarm::AlarmService;

/// A recurring health reminder kind. The set is fixed at compile time; everything else about
/// a reminder is plain configuration.
pub struct ReminderSpec {
    pub kind: &'static str,
    pub title: &'static str,
    pub message: &'static str,
    pub interval: Duration,
}

pub static HEALTH_REMINDERS: [ReminderSpec; 3] = [
    ReminderSpec {
        kind: "water",
        title: "💧 Water reminder",
        message: "Time for a sip! Take a few sips of water 💦",
        interval: Duration::from_secs(10),
    },
    ReminderSpec {
        kind: "eye",
        title: "👀 Eye break",
        message: "Look away from the screen for 20 seconds.",
        interval: Duration::from_secs(10),
    },
    ReminderSpec {
        kind: "stretch",
        title: "🏃 Walk / stretch break",
        message: "Stand up and stretch for 2-3 minutes 🧘",
        interval: Duration::from_secs(10),
    },
];

pub fn reminder_spec(kind: &str) -> Option<&'static ReminderSpec> {
    HEALTH_REMINDERS.iter().find(|spec| spec.kind == kind)
}

pub const HEALTH_ALARM_PREFIX: &str = "health_";

fn alarm_name(kind: &str) -> String {
    format!("{HEALTH_ALARM_PREFIX}{kind}")
}

/// Owns the per-kind Stopped/Running state for the recurring health reminders. One instance
/// per process, living inside the engine task, so transitions never race each other. Holds no
/// memory across restarts; the cli persists which kinds should run and the daemon replays
/// starts at boot.
pub struct HealthReminderManager {
    alarms: Arc<AlarmService>,
    notifier: Arc<dyn NotificationSink>,
    active: HashSet<&'static str>,
    stopped_all: bool,
}

impl HealthReminderManager {
    pub fn new(alarms: Arc<AlarmService>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            alarms,
            notifier,
            active: HashSet::new(),
            stopped_all: false,
        }
    }

    /// Starts a reminder: registers its recurring alarm and notifies once immediately.
    /// Starting an already running kind changes nothing. Returns the spec of the now-running
    /// reminder, or None for an unknown kind.
    pub fn start(&mut self, kind: &str) -> Option<&'static ReminderSpec> {
        let spec = reminder_spec(kind)?;
        self.stopped_all = false;

        if !self.active.insert(spec.kind) {
            debug!("Health reminder {kind} already running");
            return Some(spec);
        }

        info!("Starting health reminder {kind}");
        self.alarms
            .create_periodic(&alarm_name(spec.kind), spec.interval);
        send_or_log(&*self.notifier, spec.title, spec.message);
        Some(spec)
    }

    /// Stops a single reminder. Unknown or already stopped kinds are a no-op.
    pub fn stop(&mut self, kind: &str) -> bool {
        if !self.active.remove(kind) {
            return false;
        }
        info!("Stopping health reminder {kind}");
        self.alarms.clear(&alarm_name(kind));
        true
    }

    /// Stops every running reminder and raises the global stop flag so firings already queued
    /// behind this operation get suppressed too.
    pub fn stop_all(&mut self) -> usize {
        let stopped = self.active.len();
        for kind in self.active.drain() {
            info!("Stopping health reminder {kind}");
            self.alarms.clear(&alarm_name(kind));
        }
        self.stopped_all = true;
        stopped
    }

    /// Alarm callback for a kind. Cancelling an alarm can't recall a firing that is already
    /// sitting on the engine channel, so both stop paths are re-checked here.
    pub fn on_alarm(&self, kind: &str) {
        if self.stopped_all {
            debug!("Health reminders stopped, suppressing {kind}");
            return;
        }
        if !self.active.contains(kind) {
            debug!("Health reminder {kind} not running, suppressing");
            return;
        }
        if let Some(spec) = reminder_spec(kind) {
            send_or_log(&*self.notifier, spec.title, spec.message);
        }
    }

    pub fn is_running(&self, kind: &str) -> bool {
        self.active.contains(kind)
    }
}
