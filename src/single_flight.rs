//! Per-date exclusion for ingestion.
//!
//! A [`DateLease`] is held for the whole fetch → parse → store pipeline of one date. Slots are
//! created on demand and removed once nobody holds or waits on them.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// What a second caller for a busy date gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyPolicy {
    /// Fail immediately.
    #[default]
    Reject,
    /// Wait for the running ingestion to finish, then proceed.
    Wait,
}

impl FromStr for ConcurrencyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(ConcurrencyPolicy::Reject),
            "wait" => Ok(ConcurrencyPolicy::Wait),
            other => Err(format!("unknown concurrency policy {other:?}")),
        }
    }
}

type Slot = Arc<AsyncMutex<()>>;

#[derive(Debug, Default)]
pub struct DateLocks {
    slots: Mutex<HashMap<NaiveDate, Slot>>,
}

#[derive(Debug)]
pub struct DateLease<'a> {
    locks: &'a DateLocks,
    date: NaiveDate,
    guard: Option<OwnedMutexGuard<()>>,
}

impl DateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, date: NaiveDate) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(date).or_default().clone()
    }

    /// Takes the lease for `date`, or `None` if another caller holds it.
    pub fn try_acquire(&self, date: NaiveDate) -> Option<DateLease<'_>> {
        let guard = self.slot(date).try_lock_owned().ok()?;
        Some(self.lease(date, guard))
    }

    /// Takes the lease for `date`, waiting for the current holder if any.
    pub async fn acquire(&self, date: NaiveDate) -> DateLease<'_> {
        let slot = self.slot(date);
        let guard = slot.lock_owned().await;
        self.lease(date, guard)
    }

    pub async fn acquire_with(
        &self,
        date: NaiveDate,
        policy: ConcurrencyPolicy,
    ) -> Option<DateLease<'_>> {
        match policy {
            ConcurrencyPolicy::Reject => self.try_acquire(date),
            ConcurrencyPolicy::Wait => Some(self.acquire(date).await),
        }
    }

    pub fn is_held(&self, date: NaiveDate) -> bool {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .get(&date)
            .is_some_and(|slot| slot.try_lock().is_err())
    }

    /// Number of dates with a holder or waiter.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lease(&self, date: NaiveDate, guard: OwnedMutexGuard<()>) -> DateLease<'_> {
        DateLease {
            locks: self,
            date,
            guard: Some(guard),
        }
    }

    fn release(&self, date: NaiveDate) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map's own reference left: no holder, no waiter.
        if slots
            .get(&date)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&date);
        }
    }
}

impl DateLease<'_> {
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Drop for DateLease<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(self.date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 4, d).unwrap()
    }

    #[test]
    fn second_try_for_same_date_is_refused() {
        let locks = DateLocks::new();

        let lease = locks.try_acquire(day(28)).unwrap();
        assert!(locks.try_acquire(day(28)).is_none());
        assert!(locks.is_held(day(28)));

        drop(lease);
        assert!(!locks.is_held(day(28)));
        assert!(locks.try_acquire(day(28)).is_some());
    }

    #[test]
    fn different_dates_do_not_contend() {
        let locks = DateLocks::new();

        let a = locks.try_acquire(day(27)).unwrap();
        let b = locks.try_acquire(day(28)).unwrap();

        assert_eq!(a.date(), day(27));
        assert_eq!(b.date(), day(28));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn slots_are_removed_after_release() {
        let locks = DateLocks::new();

        drop(locks.try_acquire(day(28)).unwrap());
        let held = locks.try_acquire(day(27)).unwrap();
        assert!(locks.try_acquire(day(27)).is_none());

        assert_eq!(locks.len(), 1);
        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn waiter_proceeds_after_holder_releases() {
        let locks = Arc::new(DateLocks::new());
        let lease = locks.try_acquire(day(28)).unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let lease = locks.acquire(day(28)).await;
                lease.date()
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(lease);
        assert_eq!(waiter.await.unwrap(), day(28));
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn policy_selects_behaviour() {
        let locks = DateLocks::new();
        let _held = locks.try_acquire(day(28)).unwrap();

        assert!(
            locks
                .acquire_with(day(28), ConcurrencyPolicy::Reject)
                .await
                .is_none()
        );
        assert!(
            locks
                .acquire_with(day(29), ConcurrencyPolicy::Wait)
                .await
                .is_some()
        );
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("reject".parse(), Ok(ConcurrencyPolicy::Reject));
        assert_eq!(" Wait ".parse(), Ok(ConcurrencyPolicy::Wait));
        assert!("queue".parse::<ConcurrencyPolicy>().is_err());
    }
}
