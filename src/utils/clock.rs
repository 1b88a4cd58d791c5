use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};
use tokio::time::Instant;

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing. Times are local because check-ins are wall-clock `HH:MM` values.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn now(&self) -> DateTime<Local>;

    /// The calendar day every stored record is keyed by.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: tokio::time::Instant);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}
