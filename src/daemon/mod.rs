use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    notify::{DesktopNotifier, NotificationSink},
    utils::clock::{Clock, DefaultClock},
};

use alarm::AlarmService;
use engine::{EngineEvent, ReminderEngine, CHECKOUT_TICK_ALARM, CHECKOUT_TICK_PERIOD};
use health::HealthReminderManager;
use messages::ControlRequest;
use shift::ShiftScheduler;
use storage::{
    entities::load_health_selection,
    kv::{JsonFileStore, KeyValueStore},
};

pub mod alarm;
pub mod args;
#[cfg(unix)]
pub mod control;
pub mod engine;
pub mod health;
pub mod messages;
pub mod shift;
pub mod shutdown;
pub mod storage;

const ENGINE_QUEUE_SIZE: usize = 16;

/// Represents the starting point for the daemon
pub async fn start_daemon(dir: PathBuf) -> Result<()> {
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(dir.join("store"))?);
    let notifier: Arc<dyn NotificationSink> = Arc::new(DesktopNotifier);
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let (sender, receiver) = mpsc::channel::<EngineEvent>(ENGINE_QUEUE_SIZE);
    let shutdown_token = CancellationToken::new();

    let alarms = Arc::new(AlarmService::new(sender.clone(), clock.clone()));
    alarms.create_periodic(CHECKOUT_TICK_ALARM, CHECKOUT_TICK_PERIOD);

    let engine = create_engine(receiver, store.clone(), notifier, clock, alarms.clone());

    #[cfg(unix)]
    let control = control::ControlListener::bind(&dir, sender.clone(), shutdown_token.clone())?;

    replay_health_selection(&*store, &sender).await;
    drop(sender);

    #[cfg(unix)]
    let (_, engine_result, control_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        engine.run(shutdown_token.clone()),
        control.run(),
    );

    #[cfg(not(unix))]
    let (_, engine_result, control_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        engine.run(shutdown_token.clone()),
        async { Result::<()>::Ok(()) },
    );

    alarms.clear_all();

    if let Err(engine_result) = engine_result {
        error!("Engine module got an error {:?}", engine_result);
    }

    if let Err(control_result) = control_result {
        error!("Control module got an error {:?}", control_result);
    }

    Ok(())
}

fn create_engine(
    receiver: mpsc::Receiver<EngineEvent>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    alarms: Arc<AlarmService>,
) -> ReminderEngine {
    let scheduler = ShiftScheduler::new(store, notifier.clone(), clock);
    let health = HealthReminderManager::new(alarms, notifier.clone());
    ReminderEngine::new(receiver, scheduler, health, notifier)
}

/// The health manager forgets everything on restart, so the starts the user asked for get
/// re-issued from the persisted selection before the engine begins consuming events.
async fn replay_health_selection(store: &dyn KeyValueStore, engine: &mpsc::Sender<EngineEvent>) {
    let kinds = match load_health_selection(store).await {
        Ok(kinds) => kinds,
        Err(e) => {
            error!("Failed to read health reminder selection {e:?}");
            return;
        }
    };

    for kind in kinds {
        info!("Resuming health reminder {kind}");
        // Nobody is waiting on these acknowledgements.
        let (respond, _) = oneshot::channel();
        let request = ControlRequest::StartHealthReminder {
            reminder_type: kind,
        };
        if engine
            .send(EngineEvent::Control { request, respond })
            .await
            .is_err()
        {
            return;
        }
    }
}

#[cfg(test)]
mod daemon_tests {
    use std::time::Duration;

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{DateTime, Local, TimeZone};
    use tokio::time::Instant;

    use crate::{
        daemon::storage::entities::{save_health_selection, CheckInRecord, NotifiedFlags},
        daemon::storage::kv::testing::MemoryStore,
        notify::testing::RecordingSink,
        utils::logging::TEST_LOGGING,
    };

    use super::*;

    /// Wall time pinned inside the one-hour window; instants stay real so alarms still fire.
    struct PinnedClock {
        now: DateTime<Local>,
    }

    impl PinnedClock {
        fn at_one_hour_mark() -> Self {
            Self {
                now: Local.with_ymd_and_hms(2025, 3, 3, 15, 0, 0).unwrap(),
            }
        }
    }

    #[async_trait]
    impl Clock for PinnedClock {
        fn now(&self) -> DateTime<Local> {
            self.now
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep_until(&self, instant: tokio::time::Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }

    /// Very simple smoke test: a ticking engine over a checked-in day delivers the one-hour
    /// reminder exactly once, no matter how many ticks land inside the window.
    #[tokio::test]
    async fn smoke_test_ticking_engine() -> Result<()> {
        *TEST_LOGGING;
        let clock: Arc<dyn Clock> = Arc::new(PinnedClock::at_one_hour_mark());
        let store = Arc::new(MemoryStore::default());
        let sink = Arc::new(RecordingSink::default());

        CheckInRecord {
            in_time: "09:00".into(),
            saved_at: clock.now(),
        }
        .save(&*store, clock.today())
        .await?;

        let (sender, receiver) = mpsc::channel(ENGINE_QUEUE_SIZE);
        let shutdown_token = CancellationToken::new();
        let alarms = Arc::new(AlarmService::new(sender.clone(), clock.clone()));
        alarms.create_periodic(CHECKOUT_TICK_ALARM, Duration::from_millis(40));

        let engine = create_engine(
            receiver,
            store.clone(),
            sink.clone(),
            clock.clone(),
            alarms.clone(),
        );

        let (_, engine_result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(220)).await;
                shutdown_token.cancel();
            },
            engine.run(shutdown_token.clone()),
        );
        engine_result?;
        alarms.clear_all();

        assert_eq!(sink.titles(), vec!["Checkout in 1 hour ⏳"]);
        let flags = NotifiedFlags::load(&*store, clock.today()).await?;
        assert!(flags.one_hour_sent);
        Ok(())
    }

    #[tokio::test]
    async fn persisted_selection_is_replayed_into_running_reminders() -> Result<()> {
        let clock: Arc<dyn Clock> = Arc::new(PinnedClock::at_one_hour_mark());
        let store = Arc::new(MemoryStore::default());
        let sink = Arc::new(RecordingSink::default());
        save_health_selection(&*store, &["water".into(), "stretch".into()]).await?;

        let (sender, receiver) = mpsc::channel(ENGINE_QUEUE_SIZE);
        let shutdown_token = CancellationToken::new();
        let alarms = Arc::new(AlarmService::new(sender.clone(), clock.clone()));

        let engine = create_engine(
            receiver,
            store.clone(),
            sink.clone(),
            clock.clone(),
            alarms.clone(),
        );

        replay_health_selection(&*store, &sender).await;
        drop(sender);

        let (_, engine_result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                shutdown_token.cancel();
            },
            engine.run(shutdown_token.clone()),
        );
        engine_result?;

        assert!(alarms.is_registered("health_water"));
        assert!(alarms.is_registered("health_stretch"));
        // One immediate notification per resumed reminder.
        assert_eq!(sink.count(), 2);
        alarms.clear_all();
        Ok(())
    }
}
