// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::Engine;
use anyhow::{Context, Error};
use chrono::{Local, NaiveDate};
use controller::{error::ErrorKind, Controller, NewSet, DAILY_LIMIT_KEY};
use std::convert::TryFrom;
use std::thread;
use std::time::Duration;

/// Current date on the server clock
pub fn today() -> NaiveDate {
    Local::now().naive_local().date()
}

// The store keeps counts non-negative, anything else is a corrupt row
fn checked_count(count: i32, date: NaiveDate) -> Result<u32, Error> {
    u32::try_from(count).with_context(|| format!("Invalid creation count {} on {}", count, date))
}

fn is_counter_conflict(e: &Error) -> bool {
    matches!(e.downcast_ref::<ErrorKind>(), Some(ErrorKind::CounterConflict(_)))
}

#[derive(Debug, Clone)]
pub struct SetCreation<S> {
    pub set: S,
    /// Counter value after this creation, `None` when it wasn't counted
    pub created_today: Option<u32>,
}

impl<'a, C> Engine<'a, C>
where
    C: Controller,
{
    /// Configured daily limit, or the fallback when the store has none
    pub fn daily_limit(&self) -> Result<u32, Error> {
        let fallback = self.limiter.fallback_daily_limit;

        match self.controller.setting(DAILY_LIMIT_KEY)? {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(limit) => Ok(limit),
                Err(e) => {
                    log::warn!(
                        "Invalid {} value '{}' ({}), using {}",
                        DAILY_LIMIT_KEY,
                        value,
                        e,
                        fallback
                    );
                    Ok(fallback)
                }
            },

            None => {
                log::warn!(
                    "Setting {} not found, store may not be seeded, using {}",
                    DAILY_LIMIT_KEY,
                    fallback
                );
                Ok(fallback)
            }
        }
    }

    /// Sets created on `date` (today by default)
    pub fn daily_count(&self, date: Option<NaiveDate>) -> Result<u32, Error> {
        let date = date.unwrap_or_else(today);
        let count = self.controller.daily_count(date)?.unwrap_or(0);

        checked_count(count, date)
    }

    pub fn can_create(&self, date: Option<NaiveDate>) -> Result<bool, Error> {
        Ok(self.daily_count(date)? < self.daily_limit()?)
    }

    /// Count one more creation on `date` (today by default), returns the new total
    pub fn increment_count(&self, date: Option<NaiveDate>) -> Result<u32, Error> {
        let date = date.unwrap_or_else(today);
        let retries = self.limiter.increment_retries;
        let mut attempt = 0;

        loop {
            match self.controller.increment_daily_count(date) {
                Ok(total) => return checked_count(total, date),

                // Someone else created the row first, next try is an increment
                Err(e) if is_counter_conflict(&e) && attempt < retries => {
                    attempt += 1;
                    log::debug!("Counter race on {}, retry {}/{}", date, attempt, retries);
                    thread::sleep(Duration::from_millis(
                        self.limiter.retry_backoff_ms * u64::from(attempt),
                    ));
                }

                Err(e) => return Err(e),
            }
        }
    }

    /// Change the daily limit, administrators only. Returns `false` when the
    /// setting row doesn't exist, it is never created here.
    pub fn update_daily_limit(&self, actor: i32, new_limit: i64) -> Result<bool, Error> {
        if !self.controller.user_role(actor)?.is_admin() {
            return Err(ErrorKind::Forbidden(actor, "change the daily limit").into());
        }

        if u32::try_from(new_limit).is_err() {
            return Err(ErrorKind::InvalidDailyLimit(new_limit).into());
        }

        let updated = self
            .controller
            .update_setting(DAILY_LIMIT_KEY, &new_limit.to_string())?;

        if updated {
            log::info!("Daily limit changed to {} by user({})", new_limit, actor);
        } else {
            log::warn!("Setting {} not found, daily limit left unchanged", DAILY_LIMIT_KEY);
        }

        Ok(updated)
    }

    /// Create a flashcard set if today's quota allows it.
    ///
    /// The slot is reserved by incrementing the counter first and checking the
    /// returned total, inside the same transaction as the insert. A rejected or
    /// failed creation rolls its increment back, so concurrent callers can never
    /// push the count over the limit. Administrators skip the check.
    pub fn create_set(&self, proto: &NewSet) -> Result<SetCreation<C::Set>, Error> {
        let date = today();

        self.controller.transaction(|| {
            let role = self.controller.user_role(proto.user_id)?;

            let created_today = if role.is_admin() {
                if self.limiter.count_admin_creations {
                    Some(self.increment_count(Some(date))?)
                } else {
                    None
                }
            } else {
                let limit = self.daily_limit()?;
                let total = self.increment_count(Some(date))?;

                if total > limit {
                    log::info!(
                        "Rejected set from user({}), limit of {} reached on {}",
                        proto.user_id,
                        limit,
                        date
                    );
                    return Err(ErrorKind::DailyLimitReached(date, limit).into());
                }

                Some(total)
            };

            let set = self.controller.insert_set(proto)?;
            Ok(SetCreation { set, created_today })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faulty::Faulty;
    use config::Config;
    use controller::{NewUser, Role, SearchBy};
    use memory::MemoryController;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn user(controller: &MemoryController, name: &str, role: Role) -> Result<i32, Error> {
        Ok(controller
            .insert_user(&NewUser {
                username: name.into(),
                role,
            })?
            .id)
    }

    fn new_set(user_id: i32, name: &str) -> NewSet {
        NewSet {
            user_id,
            name: name.into(),
            description: None,
            private: false,
        }
    }

    #[test]
    fn limit_falls_back_when_not_seeded() -> Result<(), Error> {
        let controller = MemoryController::unseeded();
        let engine = Engine::with_controller(&controller);

        assert_eq!(engine.daily_limit()?, config::DEFAULT_DAILY_LIMIT);

        Ok(())
    }

    #[test]
    fn limit_falls_back_on_garbage() -> Result<(), Error> {
        let controller = MemoryController::new(7);
        let admin = user(&controller, "root", Role::Admin)?;
        controller.update_setting(DAILY_LIMIT_KEY, "seven")?;

        let mut config = Config::default();
        config.limiter.fallback_daily_limit = 3;
        let engine = Engine::with_config(&controller, &config);
        assert_eq!(engine.daily_limit()?, 3);

        assert!(engine.update_daily_limit(admin, 7)?);
        assert_eq!(engine.daily_limit()?, 7);

        Ok(())
    }

    #[test]
    fn count_defaults_to_zero() -> Result<(), Error> {
        let controller = MemoryController::new(5);
        let engine = Engine::with_controller(&controller);
        let date = NaiveDate::from_ymd_opt(2021, 2, 3).unwrap();

        assert_eq!(engine.daily_count(Some(date))?, 0);
        assert_eq!(engine.daily_count(None)?, 0);

        Ok(())
    }

    #[test]
    fn corrupt_count_is_an_error() -> Result<(), Error> {
        let store = Faulty::new();
        store.negative_count.store(true, Ordering::SeqCst);
        let engine = Engine::with_controller(&store);

        assert!(engine.daily_count(None).is_err());
        assert!(engine.can_create(None).is_err());

        Ok(())
    }

    #[test]
    fn two_increments_share_one_row() -> Result<(), Error> {
        let controller = MemoryController::new(5);
        let engine = Engine::with_controller(&controller);
        let date = NaiveDate::from_ymd_opt(2021, 2, 3).unwrap();

        assert_eq!(engine.increment_count(Some(date))?, 1);
        assert_eq!(engine.increment_count(Some(date))?, 2);
        assert_eq!(engine.daily_count(Some(date))?, 2);
        assert_eq!(engine.daily_count(date.succ_opt())?, 0);

        Ok(())
    }

    #[test]
    fn can_create_compares_count_to_limit() -> Result<(), Error> {
        let controller = MemoryController::new(2);
        let engine = Engine::with_controller(&controller);
        let date = NaiveDate::from_ymd_opt(2021, 2, 3).unwrap();

        assert!(engine.can_create(Some(date))?);
        engine.increment_count(Some(date))?;
        assert!(engine.can_create(Some(date))?);
        engine.increment_count(Some(date))?;
        assert!(!engine.can_create(Some(date))?);
        engine.increment_count(Some(date))?;
        assert!(!engine.can_create(Some(date))?);

        Ok(())
    }

    #[test]
    fn zero_limit_blocks_creation() -> Result<(), Error> {
        let controller = MemoryController::new(10);
        let admin = user(&controller, "root", Role::Admin)?;
        let engine = Engine::with_controller(&controller);

        engine.increment_count(None)?;
        assert!(engine.update_daily_limit(admin, 0)?);
        assert!(!engine.can_create(None)?);

        Ok(())
    }

    #[test]
    fn update_limit_checks_role_and_value() -> Result<(), Error> {
        let controller = MemoryController::new(10);
        let admin = user(&controller, "root", Role::Admin)?;
        let student = user(&controller, "student", Role::User)?;
        let engine = Engine::with_controller(&controller);

        let forbidden = engine.update_daily_limit(student, 50).unwrap_err();
        assert_eq!(
            forbidden.downcast::<ErrorKind>()?,
            ErrorKind::Forbidden(student, "change the daily limit")
        );

        let negative = engine.update_daily_limit(admin, -1).unwrap_err();
        assert_eq!(negative.downcast::<ErrorKind>()?, ErrorKind::InvalidDailyLimit(-1));
        assert_eq!(engine.daily_limit()?, 10);

        Ok(())
    }

    #[test]
    fn update_limit_without_row_returns_false() -> Result<(), Error> {
        let controller = MemoryController::unseeded();
        let admin = user(&controller, "root", Role::Admin)?;
        let engine = Engine::with_controller(&controller);

        assert!(!engine.update_daily_limit(admin, 30)?);
        assert_eq!(controller.setting(DAILY_LIMIT_KEY)?, None);

        Ok(())
    }

    #[test]
    fn admin_bypasses_zero_limit_and_is_counted() -> Result<(), Error> {
        let controller = MemoryController::new(0);
        let student = user(&controller, "student", Role::User)?;
        let admin = user(&controller, "root", Role::Admin)?;
        let engine = Engine::with_controller(&controller);

        let rejected = engine.create_set(&new_set(student, "Verbs")).unwrap_err();
        assert!(matches!(
            rejected.downcast_ref::<ErrorKind>(),
            Some(ErrorKind::DailyLimitReached(_, 0))
        ));
        assert_eq!(engine.daily_count(None)?, 0);

        let created = engine.create_set(&new_set(admin, "Verbs"))?;
        assert_eq!(created.created_today, Some(1));
        assert_eq!(engine.daily_count(None)?, 1);

        Ok(())
    }

    #[test]
    fn admin_creations_can_be_left_uncounted() -> Result<(), Error> {
        let controller = MemoryController::new(0);
        let admin = user(&controller, "root", Role::Admin)?;

        let mut config = Config::default();
        config.limiter.count_admin_creations = false;
        let engine = Engine::with_config(&controller, &config);

        let created = engine.create_set(&new_set(admin, "Nouns"))?;
        assert_eq!(created.created_today, None);
        assert_eq!(engine.daily_count(None)?, 0);

        Ok(())
    }

    #[test]
    fn rejected_creations_release_the_slot() -> Result<(), Error> {
        let controller = MemoryController::new(1);
        let student = user(&controller, "student", Role::User)?;
        let engine = Engine::with_controller(&controller);

        assert!(engine.create_set(&new_set(404, "Ghost")).is_err());
        assert_eq!(engine.daily_count(None)?, 0);

        engine.create_set(&new_set(student, "First"))?;
        assert!(engine.create_set(&new_set(student, "Second")).is_err());
        assert_eq!(engine.daily_count(None)?, 1);
        assert!(controller
            .sets_by(&SearchBy::Name("Second".into()))
            .is_err());

        Ok(())
    }

    #[test]
    fn concurrent_creations_never_exceed_limit() -> Result<(), Error> {
        const LIMIT: u32 = 5;
        const REQUESTS: usize = 12;

        let controller = MemoryController::new(LIMIT);
        let student = user(&controller, "student", Role::User)?;
        let engine = Engine::with_controller(&controller);
        let admitted = AtomicUsize::new(0);
        let rejected = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for i in 0..REQUESTS {
                let (engine, admitted, rejected) = (&engine, &admitted, &rejected);
                scope.spawn(move || match engine.create_set(&new_set(student, &format!("Set {}", i))) {
                    Ok(_) => admitted.fetch_add(1, Ordering::SeqCst),
                    Err(_) => rejected.fetch_add(1, Ordering::SeqCst),
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), LIMIT as usize);
        assert_eq!(rejected.load(Ordering::SeqCst), REQUESTS - LIMIT as usize);
        assert_eq!(engine.daily_count(None)?, LIMIT);

        Ok(())
    }
}
