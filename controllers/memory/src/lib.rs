// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

//! A `Controller` that keeps everything in process memory.
//!
//! Transactions are serialized through a single gate and rolled back by
//! restoring a snapshot of the whole state. Every write outside an explicit
//! transaction runs in its own one, so a rollback never discards writes made
//! by another thread. Reads from other threads wait on the same gate and only
//! ever see committed state.

pub mod models;

use crate::models::{Collection, Flashcard, FlashcardSet, User};
use anyhow::Error;
use chrono::{Local, NaiveDate};
use controller::{
    error::ErrorKind, Controller, NewCollection, NewFlashcard, NewReview, NewSet, NewUser, Result,
    Review, ReviewKind, Role, SearchBy, DAILY_LIMIT_KEY,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ThreadId};

#[derive(Debug, Clone, Default)]
struct State {
    last_id: i32,
    users: BTreeMap<i32, User>,
    sets: BTreeMap<i32, FlashcardSet>,
    collections: BTreeMap<i32, Collection>,
    flashcards: BTreeMap<i32, Flashcard>,
    set_reviews: BTreeMap<i32, Review>,
    collection_reviews: BTreeMap<i32, Review>,
    settings: HashMap<String, String>,
    daily_set_creations: BTreeMap<NaiveDate, i32>,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn reviews(&self, kind: ReviewKind) -> &BTreeMap<i32, Review> {
        match kind {
            ReviewKind::FlashcardSet => &self.set_reviews,
            ReviewKind::Collection => &self.collection_reviews,
        }
    }

    fn reviews_mut(&mut self, kind: ReviewKind) -> &mut BTreeMap<i32, Review> {
        match kind {
            ReviewKind::FlashcardSet => &mut self.set_reviews,
            ReviewKind::Collection => &mut self.collection_reviews,
        }
    }

    fn parent_exists(&self, kind: ReviewKind, parent_id: i32) -> bool {
        match kind {
            ReviewKind::FlashcardSet => self.sets.contains_key(&parent_id),
            ReviewKind::Collection => self.collections.contains_key(&parent_id),
        }
    }

    fn parent_average_mut(&mut self, kind: ReviewKind, parent_id: i32) -> Option<&mut f64> {
        match kind {
            ReviewKind::FlashcardSet => self
                .sets
                .get_mut(&parent_id)
                .map(|set| &mut set.average_rating),
            ReviewKind::Collection => self
                .collections
                .get_mut(&parent_id)
                .map(|collection| &mut collection.average_rating),
        }
    }

    fn require_user(&self, user_id: i32) -> Result<&User> {
        self.users
            .get(&user_id)
            .ok_or_else(|| ErrorKind::NotFoundById(user_id.to_string()).into())
    }
}

#[derive(Default)]
pub struct MemoryController {
    state: Mutex<State>,
    tx_gate: Mutex<()>,
    tx_owner: Mutex<Option<ThreadId>>,
}

impl MemoryController {
    /// An empty store with the daily limit setting seeded to `limit`
    pub fn new(limit: u32) -> Self {
        let controller = Self::unseeded();
        if let Ok(mut state) = controller.state.lock() {
            state
                .settings
                .insert(DAILY_LIMIT_KEY.to_string(), limit.to_string());
        }

        controller
    }

    /// An empty store without any settings row
    pub fn unseeded() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| ErrorKind::Poisoned.into())
    }

    fn owner(&self) -> Result<MutexGuard<'_, Option<ThreadId>>> {
        self.tx_owner.lock().map_err(|_| ErrorKind::Poisoned.into())
    }

    fn rollback_on_err<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let snapshot = self.state()?.clone();
        let result = f();

        if let Err(e) = &result {
            log::debug!("Rolling back memory transaction: {}", e);
            *self.state()? = snapshot;
        }

        result
    }

    fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&State) -> Result<T>,
    {
        let owned = *self.owner()? == Some(thread::current().id());
        let _gate = if owned {
            None
        } else {
            Some(self.tx_gate.lock().map_err(|_| Error::from(ErrorKind::Poisoned))?)
        };

        let state = self.state()?;
        f(&*state)
    }

    fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut State) -> Result<T>,
    {
        self.transaction(|| {
            let mut state = self.state()?;
            f(&mut *state)
        })
    }

    fn search<E, P>(items: &BTreeMap<i32, E>, by: &SearchBy, name_of: P) -> Result<Vec<E>>
    where
        E: Clone,
        P: Fn(&E) -> &str,
    {
        let found: Vec<E> = match by {
            SearchBy::Id(id) => items.get(id).cloned().into_iter().collect(),
            SearchBy::Name(name) => items
                .values()
                .filter(|item| name_of(item) == name.as_str())
                .cloned()
                .collect(),
        };

        if found.is_empty() {
            Err(by.not_found().into())
        } else {
            Ok(found)
        }
    }
}

impl Controller for MemoryController {
    type User = User;
    type Set = FlashcardSet;
    type Collection = Collection;
    type Flashcard = Flashcard;

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let me = thread::current().id();
        let nested = *self.owner()? == Some(me);

        // Nested calls behave like savepoints
        if nested {
            return self.rollback_on_err(f);
        }

        let _gate = self.tx_gate.lock().map_err(|_| Error::from(ErrorKind::Poisoned))?;
        *self.owner()? = Some(me);
        let result = self.rollback_on_err(f);
        *self.owner()? = None;

        result
    }

    fn users_by(&self, by: &SearchBy) -> Result<Vec<Self::User>> {
        self.read(|state| Self::search(&state.users, by, |user| user.username.as_str()))
    }

    fn user_role(&self, user_id: i32) -> Result<Role> {
        self.read(|state| Ok(state.require_user(user_id)?.role))
    }

    fn insert_user(&self, proto: &NewUser) -> Result<Self::User> {
        self.write(|state| {
            let now = Local::now().naive_local();
            let id = state.next_id();
            let user = User {
                id,
                username: proto.username.clone(),
                role: proto.role,
                created_at: now,
                updated_at: now,
            };

            state.users.insert(id, user.clone());
            Ok(user)
        })
    }

    fn sets_by(&self, by: &SearchBy) -> Result<Vec<Self::Set>> {
        self.read(|state| Self::search(&state.sets, by, |set| set.name.as_str()))
    }

    fn insert_set(&self, proto: &NewSet) -> Result<Self::Set> {
        self.write(|state| {
            state.require_user(proto.user_id)?;

            let now = Local::now().naive_local();
            let id = state.next_id();
            let set = FlashcardSet {
                id,
                user_id: proto.user_id,
                name: proto.name.clone(),
                description: proto.description.clone(),
                private: proto.private,
                average_rating: 0.0,
                created_at: now,
                updated_at: now,
            };

            state.sets.insert(id, set.clone());
            Ok(set)
        })
    }

    fn remove_set(&self, id: i32) -> Result<Self::Set> {
        self.write(|state| {
            let set = state
                .sets
                .remove(&id)
                .ok_or_else(|| ErrorKind::NotFoundById(id.to_string()))?;

            state.flashcards.retain(|_, card| card.set_id != id);
            state.set_reviews.retain(|_, review| review.parent_id != id);
            Ok(set)
        })
    }

    fn collections_by(&self, by: &SearchBy) -> Result<Vec<Self::Collection>> {
        self.read(|state| {
            Self::search(&state.collections, by, |collection| {
                collection.name.as_str()
            })
        })
    }

    fn insert_collection(&self, proto: &NewCollection) -> Result<Self::Collection> {
        self.write(|state| {
            state.require_user(proto.user_id)?;

            let now = Local::now().naive_local();
            let id = state.next_id();
            let collection = Collection {
                id,
                user_id: proto.user_id,
                name: proto.name.clone(),
                average_rating: 0.0,
                created_at: now,
                updated_at: now,
            };

            state.collections.insert(id, collection.clone());
            Ok(collection)
        })
    }

    fn remove_collection(&self, id: i32) -> Result<Self::Collection> {
        self.write(|state| {
            let collection = state
                .collections
                .remove(&id)
                .ok_or_else(|| ErrorKind::NotFoundById(id.to_string()))?;

            state
                .collection_reviews
                .retain(|_, review| review.parent_id != id);
            Ok(collection)
        })
    }

    fn insert_flashcard(&self, proto: &NewFlashcard) -> Result<Self::Flashcard> {
        self.write(|state| {
            if !state.sets.contains_key(&proto.set_id) {
                return Err(ErrorKind::NotFoundById(proto.set_id.to_string()).into());
            }

            let now = Local::now().naive_local();
            let id = state.next_id();
            let card = Flashcard {
                id,
                set_id: proto.set_id,
                term: proto.term.clone(),
                definition: proto.definition.clone(),
                created_at: now,
                updated_at: now,
            };

            state.flashcards.insert(id, card.clone());
            Ok(card)
        })
    }

    fn flashcards_of(&self, set_id: i32) -> Result<Vec<Self::Flashcard>> {
        self.read(|state| {
            Ok(state
                .flashcards
                .values()
                .filter(|card| card.set_id == set_id)
                .cloned()
                .collect())
        })
    }

    fn parents_offset_limit(
        &self,
        kind: ReviewKind,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<i32>> {
        self.read(|state| {
            let ids: Vec<i32> = match kind {
                ReviewKind::FlashcardSet => {
                    state.sets.keys().skip(offset).take(limit).copied().collect()
                }
                ReviewKind::Collection => state
                    .collections
                    .keys()
                    .skip(offset)
                    .take(limit)
                    .copied()
                    .collect(),
            };

            Ok(ids)
        })
    }

    fn reviews_of(&self, kind: ReviewKind, parent_id: i32) -> Result<Vec<Review>> {
        self.read(|state| {
            Ok(state
                .reviews(kind)
                .values()
                .filter(|review| review.parent_id == parent_id)
                .cloned()
                .collect())
        })
    }

    fn review_by_id(&self, kind: ReviewKind, id: i32) -> Result<Review> {
        self.read(|state| {
            state
                .reviews(kind)
                .get(&id)
                .cloned()
                .ok_or_else(|| ErrorKind::NotFoundById(id.to_string()).into())
        })
    }

    fn insert_review(&self, proto: &NewReview) -> Result<Review> {
        self.write(|state| {
            state.require_user(proto.user_id)?;
            if !state.parent_exists(proto.kind, proto.parent_id) {
                return Err(ErrorKind::NotFoundById(proto.parent_id.to_string()).into());
            }

            let duplicated = state.reviews(proto.kind).values().any(|review| {
                review.user_id == proto.user_id && review.parent_id == proto.parent_id
            });

            if duplicated {
                return Err(ErrorKind::DuplicateReview(
                    proto.user_id,
                    proto.kind.name(),
                    proto.parent_id,
                )
                .into());
            }

            let now = Local::now().naive_local();
            let id = state.next_id();
            let review = Review {
                id,
                kind: proto.kind,
                rating: proto.rating,
                review: proto.review.clone(),
                user_id: proto.user_id,
                parent_id: proto.parent_id,
                created_at: now,
                updated_at: now,
            };

            state.reviews_mut(proto.kind).insert(id, review.clone());
            Ok(review)
        })
    }

    fn update_review(
        &self,
        kind: ReviewKind,
        id: i32,
        rating: i32,
        review: &str,
    ) -> Result<Review> {
        self.write(|state| {
            let stored = state
                .reviews_mut(kind)
                .get_mut(&id)
                .ok_or_else(|| ErrorKind::NotFoundById(id.to_string()))?;

            stored.rating = rating;
            stored.review = review.to_owned();
            stored.updated_at = Local::now().naive_local();

            Ok(stored.clone())
        })
    }

    fn remove_review(&self, kind: ReviewKind, id: i32) -> Result<Review> {
        self.write(|state| {
            state
                .reviews_mut(kind)
                .remove(&id)
                .ok_or_else(|| ErrorKind::NotFoundById(id.to_string()).into())
        })
    }

    fn lock_parent(&self, kind: ReviewKind, parent_id: i32) -> Result<bool> {
        // The transaction gate already serializes writers
        self.read(|state| Ok(state.parent_exists(kind, parent_id)))
    }

    fn average_rating(&self, kind: ReviewKind, parent_id: i32) -> Result<Option<f64>> {
        let ratings: Vec<i32> = self.read(|state| {
            Ok(state
                .reviews(kind)
                .values()
                .filter(|review| review.parent_id == parent_id)
                .map(|review| review.rating)
                .collect())
        })?;

        if ratings.is_empty() {
            return Ok(None);
        }

        let total: i64 = ratings.iter().map(|&rating| i64::from(rating)).sum();
        Ok(Some(total as f64 / ratings.len() as f64))
    }

    fn set_average_rating(&self, kind: ReviewKind, parent_id: i32, value: f64) -> Result<bool> {
        self.write(|state| match state.parent_average_mut(kind, parent_id) {
            Some(average) => {
                *average = value;
                Ok(true)
            }
            None => Ok(false),
        })
    }

    fn stored_average_rating(&self, kind: ReviewKind, parent_id: i32) -> Result<Option<f64>> {
        self.read(|state| {
            let average = match kind {
                ReviewKind::FlashcardSet => {
                    state.sets.get(&parent_id).map(|set| set.average_rating)
                }
                ReviewKind::Collection => state
                    .collections
                    .get(&parent_id)
                    .map(|collection| collection.average_rating),
            };

            Ok(average)
        })
    }

    fn setting(&self, key: &str) -> Result<Option<String>> {
        self.read(|state| Ok(state.settings.get(key).cloned()))
    }

    fn update_setting(&self, key: &str, value: &str) -> Result<bool> {
        self.write(|state| match state.settings.get_mut(key) {
            Some(stored) => {
                *stored = value.to_owned();
                Ok(true)
            }
            None => Ok(false),
        })
    }

    fn daily_count(&self, date: NaiveDate) -> Result<Option<i32>> {
        self.read(|state| Ok(state.daily_set_creations.get(&date).copied()))
    }

    fn increment_daily_count(&self, date: NaiveDate) -> Result<i32> {
        self.write(|state| {
            let total = state.daily_set_creations.entry(date).or_insert(0);
            *total += 1;
            Ok(*total)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Error;
    use std::sync::mpsc;
    use std::time::Duration;

    fn seeded() -> Result<(MemoryController, User, FlashcardSet), Error> {
        let controller = MemoryController::new(20);
        let user = controller.insert_user(&NewUser {
            username: "ana".into(),
            role: Role::User,
        })?;

        let set = controller.insert_set(&NewSet {
            user_id: user.id,
            name: "Hiragana".into(),
            description: None,
            private: false,
        })?;

        Ok((controller, user, set))
    }

    #[test]
    fn failed_transaction_rolls_back() -> Result<(), Error> {
        let (controller, _, _) = seeded()?;
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let result: Result<()> = controller.transaction(|| {
            controller.increment_daily_count(date)?;
            Err(ErrorKind::DailyLimitReached(date, 0).into())
        });

        assert!(result.is_err());
        assert_eq!(controller.daily_count(date)?, None);

        Ok(())
    }

    #[test]
    fn other_threads_never_see_uncommitted_writes() -> Result<(), Error> {
        let (controller, _, _) = seeded()?;
        let controller = &controller;
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        controller.increment_daily_count(date)?;

        let (reserved, wait_reserved) = mpsc::channel();

        let observed = thread::scope(|scope| {
            let writer = scope.spawn(move || {
                let result: Result<()> = controller.transaction(|| {
                    controller.increment_daily_count(date)?;
                    reserved.send(()).ok();
                    thread::sleep(Duration::from_millis(50));
                    Err(ErrorKind::DailyLimitReached(date, 1).into())
                });

                assert!(result.is_err());
            });

            wait_reserved.recv().ok();
            let observed = controller.daily_count(date);
            writer.join().ok();
            observed
        })?;

        assert_eq!(observed, Some(1));
        assert_eq!(controller.daily_count(date)?, Some(1));

        Ok(())
    }

    #[test]
    fn nested_transaction_only_undoes_inner_writes() -> Result<(), Error> {
        let (controller, _, _) = seeded()?;
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        controller.transaction(|| {
            controller.increment_daily_count(date)?;
            let inner: Result<()> = controller.transaction(|| {
                controller.increment_daily_count(date)?;
                Err(ErrorKind::CounterConflict(date).into())
            });

            assert!(inner.is_err());
            Ok(())
        })?;

        assert_eq!(controller.daily_count(date)?, Some(1));

        Ok(())
    }

    #[test]
    fn duplicate_review_is_rejected() -> Result<(), Error> {
        let (controller, user, set) = seeded()?;
        let review = NewReview::new(ReviewKind::FlashcardSet, set.id, user.id, 4, "nice")?;

        controller.insert_review(&review)?;
        let again = controller.insert_review(&review);

        let kind = again.unwrap_err().downcast::<ErrorKind>()?;
        assert_eq!(kind, ErrorKind::DuplicateReview(user.id, "set", set.id));

        Ok(())
    }

    #[test]
    fn removing_set_cascades() -> Result<(), Error> {
        let (controller, user, set) = seeded()?;
        let review = NewReview::new(ReviewKind::FlashcardSet, set.id, user.id, 4, "nice")?;
        controller.insert_review(&review)?;
        controller.insert_flashcard(&NewFlashcard {
            set_id: set.id,
            term: "あ".into(),
            definition: "a".into(),
        })?;

        controller.remove_set(set.id)?;

        assert!(controller.reviews_of(ReviewKind::FlashcardSet, set.id)?.is_empty());
        assert!(controller.flashcards_of(set.id)?.is_empty());
        assert!(!controller.lock_parent(ReviewKind::FlashcardSet, set.id)?);

        Ok(())
    }

    #[test]
    fn storing_average_keeps_updated_at() -> Result<(), Error> {
        let (controller, _, set) = seeded()?;

        thread::sleep(Duration::from_millis(5));
        assert!(controller.set_average_rating(ReviewKind::FlashcardSet, set.id, 3.5)?);

        let stored = controller.sets_by(&SearchBy::Id(set.id))?.remove(0);
        assert_eq!(stored.average_rating, 3.5);
        assert_eq!(stored.updated_at, set.updated_at);

        Ok(())
    }

    #[test]
    fn update_setting_does_not_create_rows() -> Result<(), Error> {
        let controller = MemoryController::unseeded();

        assert!(!controller.update_setting(DAILY_LIMIT_KEY, "5")?);
        assert_eq!(controller.setting(DAILY_LIMIT_KEY)?, None);

        Ok(())
    }

    #[test]
    fn parents_come_in_chunks() -> Result<(), Error> {
        let (controller, user, _) = seeded()?;
        for name in &["Katakana", "Kanji N5"] {
            controller.insert_set(&NewSet {
                user_id: user.id,
                name: name.to_string(),
                description: None,
                private: false,
            })?;
        }

        let chunks = controller
            .parents_by_chunks(ReviewKind::FlashcardSet, 2)
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 2);
        assert_eq!(chunks[1].len(), 1);

        Ok(())
    }
}
