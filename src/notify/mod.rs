//! Contains logic for surfacing reminders to the user. [DesktopNotifier] is the main
//! artifact of this module; everything that fires a reminder goes through the
//! [NotificationSink] contract so tests can observe deliveries.

use anyhow::Result;
use notify_rust::Notification;
use tracing::{debug, warn};

/// Intended to serve as a contract every notification backend must implement. Delivery is
/// fire-and-forget: a failed notification is logged by the caller and never stops a cycle.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send + Sync + 'static {
    fn notify(&self, title: &str, message: &str) -> Result<()>;
}

/// Sends notifications through the desktop environment.
pub struct DesktopNotifier;

impl NotificationSink for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) -> Result<()> {
        Notification::new()
            .appname("shiftwatch")
            .summary(title)
            .body(message)
            .icon("appointment-soon")
            .show()?;
        debug!("Notification created: {title}");
        Ok(())
    }
}

/// The standard log-and-swallow send used by the reminder components.
pub fn send_or_log(sink: &dyn NotificationSink, title: &str, message: &str) {
    if let Err(e) = sink.notify(title, message) {
        warn!("Failed to deliver notification {title:?}: {e:?}");
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use anyhow::Result;

    use super::NotificationSink;

    /// Sink that remembers everything sent through it, in order.
    #[derive(Default)]
    pub struct RecordingSink {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSink {
        pub fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn titles(&self) -> Vec<String> {
            self.sent().into_iter().map(|(title, _)| title).collect()
        }

        pub fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, title: &str, message: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((title.to_owned(), message.to_owned()));
            Ok(())
        }
    }
}
