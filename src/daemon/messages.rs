//! Wire types for the daemon's control socket. Requests are newline-delimited JSON with an
//! externally tagged `type`, answered with a `{ok, message}` line each.

use serde::Deserialize;
use serde::Serialize;

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum ControlRequest {
    /// Demo notification explaining the checkout reminders.
    #[serde(rename = "TEST_NOTIFICATION")]
    TestNotification,
    #[serde(rename = "TEST_1HR")]
    TestOneHour,
    #[serde(rename = "TEST_5MIN")]
    TestFiveMinute,
    #[serde(rename = "TEST_COMPLETE")]
    TestComplete,
    /// One-off health nudge, independent of the recurring reminders.
    #[serde(rename = "HEALTH_REMINDER")]
    HealthNudge,
    #[serde(rename = "START_HEALTH_REMINDER")]
    StartHealthReminder { reminder_type: String },
    #[serde(rename = "STOP_HEALTH_REMINDER")]
    StopHealthReminder { reminder_type: String },
    #[serde(rename = "STOP_ALL_HEALTH_REMINDERS")]
    StopAllHealthReminders,
}

impl ControlRequest {
    /// The fixed notification for requests that only display one. Shared between the daemon
    /// handler and the cli fallback that fires directly when the daemon is unreachable.
    pub fn canned_notification(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::TestNotification => Some((
                "Work time tracker 🔔",
                "You'll receive two reminders before checkout: one hour and five minutes before your shift ends.",
            )),
            Self::TestOneHour => Some((
                "Reminder ⏳",
                "You have 1 hour remaining before your checkout time. Please wrap up your ongoing tasks.",
            )),
            Self::TestFiveMinute => Some((
                "Final reminder ⏰",
                "Only 5 minutes left until checkout. Save your work and prepare to log out.",
            )),
            Self::TestComplete => Some((
                "Shift completed ✅",
                "Good job today! Your shift time is completed.",
            )),
            Self::HealthNudge => Some((
                "Take care of your health",
                "Take care of your health while working!",
            )),
            Self::StartHealthReminder { .. }
            | Self::StopHealthReminder { .. }
            | Self::StopAllHealthReminders => None,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct ControlResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ControlResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            message: None,
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(message.into()),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
        }
    }
}
