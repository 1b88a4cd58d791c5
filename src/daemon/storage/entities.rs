use anyhow::Result;
use chrono::DateTime;
use chrono::Local;
use chrono::NaiveDate;
use chrono::NaiveTime;
use serde::Deserialize;
use serde::Serialize;

use crate::utils::time::{day_key, parse_clock_time};

use super::kv::KeyValueStore;

/// A day's check-in as the cli saved it. The daemon only ever reads these; creating,
/// overwriting and clearing them belongs to the cli side.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct CheckInRecord {
    /// User-entered `HH:MM` shift start.
    pub in_time: String,
    pub saved_at: DateTime<Local>,
}

impl CheckInRecord {
    pub fn key(date: NaiveDate) -> String {
        format!("in_{}", day_key(date))
    }

    /// The parsed clock time, if the stored string is usable. A record with garbage in it
    /// counts as "not checked in".
    pub fn clock_time(&self) -> Option<NaiveTime> {
        parse_clock_time(&self.in_time)
    }

    pub async fn load(store: &dyn KeyValueStore, date: NaiveDate) -> Result<Option<Self>> {
        let Some(value) = store.get(&Self::key(date)).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_value(value).ok())
    }

    pub async fn save(&self, store: &dyn KeyValueStore, date: NaiveDate) -> Result<()> {
        store
            .set(&Self::key(date), serde_json::to_value(self)?)
            .await
    }

    pub async fn clear(store: &dyn KeyValueStore, date: NaiveDate) -> Result<()> {
        store.remove(&Self::key(date)).await
    }
}

/// Per-day at-most-once delivery flags for the three checkout reminders. Monotonic: a flag
/// that went true stays true until the whole record is deleted.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, Default)]
pub struct NotifiedFlags {
    #[serde(default)]
    pub one_hour_sent: bool,
    #[serde(default)]
    pub five_min_sent: bool,
    #[serde(default)]
    pub completed_sent: bool,
}

impl NotifiedFlags {
    pub fn key(date: NaiveDate) -> String {
        format!("notified_{}", day_key(date))
    }

    pub fn any(&self) -> bool {
        self.one_hour_sent || self.five_min_sent || self.completed_sent
    }

    /// Missing or unreadable flags default to all-false, which only risks an extra
    /// notification after data loss, never a missed flag write.
    pub async fn load(store: &dyn KeyValueStore, date: NaiveDate) -> Result<Self> {
        let Some(value) = store.get(&Self::key(date)).await? else {
            return Ok(Self::default());
        };
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    pub async fn save(&self, store: &dyn KeyValueStore, date: NaiveDate) -> Result<()> {
        store
            .set(&Self::key(date), serde_json::to_value(self)?)
            .await
    }

    pub async fn clear(store: &dyn KeyValueStore, date: NaiveDate) -> Result<()> {
        store.remove(&Self::key(date)).await
    }
}

/// Key holding the health reminder kinds the user wants running. The daemon replays these as
/// start requests when it boots; the manager itself keeps no state across restarts.
pub const HEALTH_SELECTION_KEY: &str = "health_active";

pub async fn load_health_selection(store: &dyn KeyValueStore) -> Result<Vec<String>> {
    let Some(value) = store.get(HEALTH_SELECTION_KEY).await? else {
        return Ok(vec![]);
    };
    Ok(serde_json::from_value(value).unwrap_or_default())
}

pub async fn save_health_selection(store: &dyn KeyValueStore, kinds: &[String]) -> Result<()> {
    store
        .set(HEALTH_SELECTION_KEY, serde_json::to_value(kinds)?)
        .await
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;

    use crate::daemon::storage::kv::testing::MemoryStore;

    use super::*;

    const DAY: NaiveDate = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();

    #[tokio::test]
    async fn check_in_round_trip_is_keyed_by_day() -> Result<()> {
        let store = MemoryStore::default();
        let record = CheckInRecord {
            in_time: "09:00".into(),
            saved_at: Local::now(),
        };

        record.save(&store, DAY).await?;

        assert!(store.contains("in_2025-03-03"));
        assert_eq!(CheckInRecord::load(&store, DAY).await?, Some(record));
        let other = DAY.succ_opt().unwrap();
        assert_eq!(CheckInRecord::load(&store, other).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn missing_flags_default_to_all_false() -> Result<()> {
        let store = MemoryStore::default();

        let flags = NotifiedFlags::load(&store, DAY).await?;

        assert_eq!(flags, NotifiedFlags::default());
        assert!(!flags.any());
        Ok(())
    }

    #[tokio::test]
    async fn garbage_in_time_counts_as_not_checked_in() {
        let record = CheckInRecord {
            in_time: "whenever".into(),
            saved_at: Local::now(),
        };

        assert_eq!(record.clock_time(), None);
    }
}
