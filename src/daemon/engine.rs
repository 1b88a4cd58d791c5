use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::notify::{send_or_log, NotificationSink};

use super::{
    health::{HealthReminderManager, HEALTH_ALARM_PREFIX},
    messages::{ControlRequest, ControlResponse},
    shift::ShiftScheduler,
};

/// Name of the periodic alarm driving [ShiftScheduler::evaluate].
pub const CHECKOUT_TICK_ALARM: &str = "checkout_tick";

pub const CHECKOUT_TICK_PERIOD: Duration = Duration::from_secs(60);

/// A unit of work for the engine. Alarm firings and control requests share one channel, which
/// is what serializes them: no two reminder operations ever run at the same time.
#[derive(Debug)]
pub enum EngineEvent {
    Alarm(String),
    Control {
        request: ControlRequest,
        respond: oneshot::Sender<ControlResponse>,
    },
}

/// Represents the reminder event loop. Receives events and applies them to the shift
/// scheduler and the health reminder manager it owns.
pub struct ReminderEngine {
    receiver: mpsc::Receiver<EngineEvent>,
    scheduler: ShiftScheduler,
    health: HealthReminderManager,
    notifier: Arc<dyn NotificationSink>,
}

impl ReminderEngine {
    pub fn new(
        receiver: mpsc::Receiver<EngineEvent>,
        scheduler: ShiftScheduler,
        health: HealthReminderManager,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            receiver,
            scheduler,
            health,
            notifier,
        }
    }

    /// Executes the engine event loop until shutdown is requested.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping engine");
                    return Ok(());
                }
                event = self.receiver.recv() => event,
            };
            let Some(event) = event else {
                info!("Engine channel closed, stopping");
                return Ok(());
            };

            match event {
                EngineEvent::Alarm(name) => self.on_alarm(&name).await,
                EngineEvent::Control { request, respond } => {
                    debug!("Handling control request {request:?}");
                    let response = self.handle_request(request).await;
                    // The client may have hung up already; that's its business.
                    let _ = respond.send(response);
                }
            }
        }
    }

    async fn on_alarm(&mut self, name: &str) {
        if name == CHECKOUT_TICK_ALARM {
            if let Err(e) = self.scheduler.evaluate().await {
                // Ticks are periodic and idempotent, the next one retries naturally.
                error!("Failed to evaluate checkout reminders {e:?}");
            }
        } else if let Some(kind) = name.strip_prefix(HEALTH_ALARM_PREFIX) {
            self.health.on_alarm(kind);
        } else {
            debug!("Ignoring unknown alarm {name}");
        }
    }

    async fn handle_request(&mut self, request: ControlRequest) -> ControlResponse {
        if let Some((title, message)) = request.canned_notification() {
            send_or_log(&*self.notifier, title, message);
            return ControlResponse::ok();
        }

        match request {
            ControlRequest::TestNotification
            | ControlRequest::TestOneHour
            | ControlRequest::TestFiveMinute
            | ControlRequest::TestComplete
            | ControlRequest::HealthNudge => unreachable!("handled as canned notifications"),
            ControlRequest::StartHealthReminder { reminder_type } => {
                match self.health.start(&reminder_type) {
                    Some(spec) => {
                        ControlResponse::ok_with(format!("{} reminder started", spec.kind))
                    }
                    None => ControlResponse::fail(format!("unknown reminder type {reminder_type}")),
                }
            }
            ControlRequest::StopHealthReminder { reminder_type } => {
                self.health.stop(&reminder_type);
                ControlResponse::ok_with(format!("{reminder_type} reminder stopped"))
            }
            ControlRequest::StopAllHealthReminders => {
                let stopped = self.health.stop_all();
                ControlResponse::ok_with(format!("all health reminders stopped ({stopped})"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tokio::sync::{mpsc, oneshot};
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{
            alarm::AlarmService, health::HealthReminderManager, shift::ShiftScheduler,
            storage::kv::testing::MemoryStore,
        },
        notify::testing::RecordingSink,
        utils::clock::{Clock, DefaultClock},
    };

    use super::*;

    struct Fixture {
        sender: mpsc::Sender<EngineEvent>,
        sink: Arc<RecordingSink>,
        alarms: Arc<AlarmService>,
        engine: ReminderEngine,
    }

    fn fixture() -> Fixture {
        let (sender, receiver) = mpsc::channel(16);
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let store = Arc::new(MemoryStore::default());
        let sink = Arc::new(RecordingSink::default());
        let alarms = Arc::new(AlarmService::new(sender.clone(), clock.clone()));
        let scheduler = ShiftScheduler::new(store, sink.clone(), clock);
        let health = HealthReminderManager::new(alarms.clone(), sink.clone());
        let engine = ReminderEngine::new(receiver, scheduler, health, sink.clone());
        Fixture {
            sender,
            sink,
            alarms,
            engine,
        }
    }

    async fn request(
        sender: &mpsc::Sender<EngineEvent>,
        request: ControlRequest,
    ) -> ControlResponse {
        let (tx, rx) = oneshot::channel();
        sender
            .send(EngineEvent::Control {
                request,
                respond: tx,
            })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn test_start_request_starts_reminder_and_acknowledges() -> Result<()> {
        let Fixture {
            sender,
            sink,
            alarms,
            engine,
        } = fixture();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(engine.run(shutdown.clone()));

        let response = request(
            &sender,
            ControlRequest::StartHealthReminder {
                reminder_type: "water".into(),
            },
        )
        .await;
        assert!(response.ok);
        assert_eq!(response.message.as_deref(), Some("water reminder started"));
        assert!(alarms.is_registered("health_water"));
        assert_eq!(sink.count(), 1);

        shutdown.cancel();
        alarms.clear_all();
        drop(sender);
        handle.await??;
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_reminder_type_is_answered_not_dropped() -> Result<()> {
        let Fixture {
            sender,
            sink: _sink,
            alarms,
            engine,
        } = fixture();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(engine.run(shutdown.clone()));

        let response = request(
            &sender,
            ControlRequest::StartHealthReminder {
                reminder_type: "coffee".into(),
            },
        )
        .await;
        assert!(!response.ok);

        shutdown.cancel();
        alarms.clear_all();
        drop(sender);
        handle.await??;
        Ok(())
    }

    #[tokio::test]
    async fn test_stop_all_suppresses_alarm_queued_behind_it() -> Result<()> {
        let Fixture {
            sender,
            sink,
            alarms,
            engine,
        } = fixture();

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(engine.run(shutdown.clone()));

        request(
            &sender,
            ControlRequest::StartHealthReminder {
                reminder_type: "eye".into(),
            },
        )
        .await;
        assert_eq!(sink.count(), 1);

        // Queue a firing first, then the stop-all behind it, then a second firing that a
        // cancelled-but-dequeued timer could still produce.
        sender
            .send(EngineEvent::Alarm("health_eye".into()))
            .await
            .unwrap();
        request(&sender, ControlRequest::StopAllHealthReminders).await;
        sender
            .send(EngineEvent::Alarm("health_eye".into()))
            .await
            .unwrap();
        let response = request(&sender, ControlRequest::TestComplete).await;
        assert!(response.ok);

        // Start notification, the pre-stop firing, the test notification. The post-stop
        // firing was suppressed.
        assert_eq!(sink.count(), 3);

        shutdown.cancel();
        alarms.clear_all();
        drop(sender);
        handle.await??;
        Ok(())
    }

    #[tokio::test]
    async fn test_test_messages_notify() -> Result<()> {
        let (sender, receiver) = mpsc::channel(16);
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let mut mock = crate::notify::MockNotificationSink::new();
        mock.expect_notify().times(5).returning(|_, _| Ok(()));
        let notifier: Arc<dyn crate::notify::NotificationSink> = Arc::new(mock);
        let alarms = Arc::new(AlarmService::new(sender.clone(), clock.clone()));
        let scheduler = ShiftScheduler::new(
            Arc::new(MemoryStore::default()),
            notifier.clone(),
            clock.clone(),
        );
        let health = HealthReminderManager::new(alarms.clone(), notifier.clone());
        let engine = ReminderEngine::new(receiver, scheduler, health, notifier);

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(engine.run(shutdown.clone()));

        for message in [
            ControlRequest::TestNotification,
            ControlRequest::TestOneHour,
            ControlRequest::TestFiveMinute,
            ControlRequest::TestComplete,
            ControlRequest::HealthNudge,
        ] {
            assert!(request(&sender, message).await.ok);
        }

        shutdown.cancel();
        drop(sender);
        handle.await??;
        Ok(())
    }
}
