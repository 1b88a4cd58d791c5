use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::utils::clock::Clock;

use super::engine::EngineEvent;

/// Named timer registry backing both the shift tick and the health reminders. Every alarm is
/// a task that pushes its name onto the engine channel, so firings arrive interleaved with
/// control messages and never run concurrently with them.
pub struct AlarmService {
    sender: mpsc::Sender<EngineEvent>,
    clock: Arc<dyn Clock>,
    active: Mutex<HashMap<String, CancellationToken>>,
}

impl AlarmService {
    pub fn new(sender: mpsc::Sender<EngineEvent>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sender,
            clock,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a repeating alarm. Re-creating a live name is a no-op, which makes duplicate
    /// start messages harmless.
    pub fn create_periodic(self: &Arc<Self>, name: &str, period: Duration) {
        let mut active = self.active.lock().unwrap();
        if active.contains_key(name) {
            debug!("Alarm {name} already registered");
            return;
        }
        let cancel = CancellationToken::new();
        active.insert(name.to_owned(), cancel.clone());

        let service = self.clone();
        let name = name.to_owned();
        tokio::spawn(async move {
            let mut fire_point = service.clock.instant() + period;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = service.clock.sleep_until(fire_point) => (),
                }
                fire_point += period;

                if service.fire(&name).await.is_err() {
                    return;
                }
            }
        });
    }

    /// Registers an alarm that fires once after `delay` and unregisters itself.
    pub fn create_oneshot(self: &Arc<Self>, name: &str, delay: Duration) {
        let mut active = self.active.lock().unwrap();
        if active.contains_key(name) {
            debug!("Alarm {name} already registered");
            return;
        }
        let cancel = CancellationToken::new();
        active.insert(name.to_owned(), cancel.clone());

        let service = self.clone();
        let name = name.to_owned();
        tokio::spawn(async move {
            let fire_point = service.clock.instant() + delay;
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = service.clock.sleep_until(fire_point) => (),
            }
            service.active.lock().unwrap().remove(&name);
            let _ = service.fire(&name).await;
        });
    }

    /// Cancels an alarm. A firing already queued on the engine channel is not recalled;
    /// consumers suppress those themselves.
    pub fn clear(&self, name: &str) -> bool {
        match self.active.lock().unwrap().remove(name) {
            Some(cancel) => {
                cancel.cancel();
                debug!("Alarm {name} cleared");
                true
            }
            None => false,
        }
    }

    pub fn clear_all(&self) {
        let mut active = self.active.lock().unwrap();
        for (name, cancel) in active.drain() {
            debug!("Alarm {name} cleared");
            cancel.cancel();
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.active.lock().unwrap().contains_key(name)
    }

    async fn fire(&self, name: &str) -> Result<(), ()> {
        self.sender
            .send(EngineEvent::Alarm(name.to_owned()))
            .await
            .map_err(|e| error!("Engine is gone, dropping alarm {e:?}"))
    }
}
