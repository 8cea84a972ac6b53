// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use anyhow::Error;
use chrono::NaiveDate;
use controller::{
    Controller, NewCollection, NewFlashcard, NewReview, NewSet, NewUser, Review, ReviewKind, Role,
    SearchBy,
};
use memory::models::{Collection, Flashcard, FlashcardSet, User};
use memory::MemoryController;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Memory store that can be told to fail storing averages, to fail paging
/// parents past some offset, or to hand back a corrupt counter
pub struct Faulty {
    inner: MemoryController,
    pub fail_averages: AtomicBool,
    pub fail_parents_from: AtomicUsize,
    pub negative_count: AtomicBool,
}

impl Faulty {
    pub fn new() -> Self {
        Self {
            inner: MemoryController::new(20),
            fail_averages: AtomicBool::new(false),
            fail_parents_from: AtomicUsize::new(usize::MAX),
            negative_count: AtomicBool::new(false),
        }
    }
}

impl Controller for Faulty {
    type User = User;
    type Set = FlashcardSet;
    type Collection = Collection;
    type Flashcard = Flashcard;

    fn transaction<T, F>(&self, f: F) -> controller::Result<T>
    where
        F: FnOnce() -> controller::Result<T>,
    {
        self.inner.transaction(f)
    }

    fn users_by(&self, by: &SearchBy) -> controller::Result<Vec<User>> {
        self.inner.users_by(by)
    }

    fn user_role(&self, user_id: i32) -> controller::Result<Role> {
        self.inner.user_role(user_id)
    }

    fn insert_user(&self, proto: &NewUser) -> controller::Result<User> {
        self.inner.insert_user(proto)
    }

    fn sets_by(&self, by: &SearchBy) -> controller::Result<Vec<FlashcardSet>> {
        self.inner.sets_by(by)
    }

    fn insert_set(&self, proto: &NewSet) -> controller::Result<FlashcardSet> {
        self.inner.insert_set(proto)
    }

    fn remove_set(&self, id: i32) -> controller::Result<FlashcardSet> {
        self.inner.remove_set(id)
    }

    fn collections_by(&self, by: &SearchBy) -> controller::Result<Vec<Collection>> {
        self.inner.collections_by(by)
    }

    fn insert_collection(&self, proto: &NewCollection) -> controller::Result<Collection> {
        self.inner.insert_collection(proto)
    }

    fn remove_collection(&self, id: i32) -> controller::Result<Collection> {
        self.inner.remove_collection(id)
    }

    fn insert_flashcard(&self, proto: &NewFlashcard) -> controller::Result<Flashcard> {
        self.inner.insert_flashcard(proto)
    }

    fn flashcards_of(&self, set_id: i32) -> controller::Result<Vec<Flashcard>> {
        self.inner.flashcards_of(set_id)
    }

    fn parents_offset_limit(
        &self,
        kind: ReviewKind,
        offset: usize,
        limit: usize,
    ) -> controller::Result<Vec<i32>> {
        if offset >= self.fail_parents_from.load(Ordering::SeqCst) {
            return Err(Error::msg("connection reset by peer"));
        }

        self.inner.parents_offset_limit(kind, offset, limit)
    }

    fn reviews_of(&self, kind: ReviewKind, parent_id: i32) -> controller::Result<Vec<Review>> {
        self.inner.reviews_of(kind, parent_id)
    }

    fn review_by_id(&self, kind: ReviewKind, id: i32) -> controller::Result<Review> {
        self.inner.review_by_id(kind, id)
    }

    fn insert_review(&self, proto: &NewReview) -> controller::Result<Review> {
        self.inner.insert_review(proto)
    }

    fn update_review(
        &self,
        kind: ReviewKind,
        id: i32,
        rating: i32,
        review: &str,
    ) -> controller::Result<Review> {
        self.inner.update_review(kind, id, rating, review)
    }

    fn remove_review(&self, kind: ReviewKind, id: i32) -> controller::Result<Review> {
        self.inner.remove_review(kind, id)
    }

    fn lock_parent(&self, kind: ReviewKind, parent_id: i32) -> controller::Result<bool> {
        self.inner.lock_parent(kind, parent_id)
    }

    fn average_rating(
        &self,
        kind: ReviewKind,
        parent_id: i32,
    ) -> controller::Result<Option<f64>> {
        self.inner.average_rating(kind, parent_id)
    }

    fn set_average_rating(
        &self,
        kind: ReviewKind,
        parent_id: i32,
        value: f64,
    ) -> controller::Result<bool> {
        if self.fail_averages.load(Ordering::SeqCst) {
            return Err(Error::msg("statement timeout"));
        }

        self.inner.set_average_rating(kind, parent_id, value)
    }

    fn stored_average_rating(
        &self,
        kind: ReviewKind,
        parent_id: i32,
    ) -> controller::Result<Option<f64>> {
        self.inner.stored_average_rating(kind, parent_id)
    }

    fn setting(&self, key: &str) -> controller::Result<Option<String>> {
        self.inner.setting(key)
    }

    fn update_setting(&self, key: &str, value: &str) -> controller::Result<bool> {
        self.inner.update_setting(key, value)
    }

    fn daily_count(&self, date: NaiveDate) -> controller::Result<Option<i32>> {
        if self.negative_count.load(Ordering::SeqCst) {
            return Ok(Some(-1));
        }

        self.inner.daily_count(date)
    }

    fn increment_daily_count(&self, date: NaiveDate) -> controller::Result<i32> {
        self.inner.increment_daily_count(date)
    }
}
