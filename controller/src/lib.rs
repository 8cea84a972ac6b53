// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

pub mod entity;
pub mod error;
pub mod lazy;
pub mod resource;
pub mod review;
pub mod searchby;

use anyhow::Error;
use chrono::NaiveDate;

pub use entity::{Entity, ToTable};
pub use lazy::LazyParentChunks;
pub use resource::{NewCollection, NewFlashcard, NewSet, NewUser, Role};
pub use review::{NewReview, Review, ReviewKind};
pub use searchby::SearchBy;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Settings key holding the maximum number of sets created per day
pub const DAILY_LIMIT_KEY: &str = "daily_set_limit";

pub trait Controller {
    type User: Entity<Id = i32>;
    type Set: Entity<Id = i32>;
    type Collection: Entity<Id = i32>;
    type Flashcard: Entity<Id = i32>;

    /// Run `f` atomically, any `Err` returned by it rolls back every write made inside
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>;

    /// Get users that matched the search criteria by id or username
    fn users_by(&self, by: &SearchBy) -> Result<Vec<Self::User>>;

    /// Role of an existing user, fails with `NotFoundById` otherwise
    fn user_role(&self, user_id: i32) -> Result<Role>;

    fn insert_user(&self, proto: &NewUser) -> Result<Self::User>;

    /// Get flashcard sets that matched the search criteria by id or name
    fn sets_by(&self, by: &SearchBy) -> Result<Vec<Self::Set>>;

    fn insert_set(&self, proto: &NewSet) -> Result<Self::Set>;

    /// Remove a set, its flashcards and reviews go with it
    fn remove_set(&self, id: i32) -> Result<Self::Set>;

    /// Get collections that matched the search criteria by id or name
    fn collections_by(&self, by: &SearchBy) -> Result<Vec<Self::Collection>>;

    fn insert_collection(&self, proto: &NewCollection) -> Result<Self::Collection>;

    /// Remove a collection and its reviews
    fn remove_collection(&self, id: i32) -> Result<Self::Collection>;

    fn insert_flashcard(&self, proto: &NewFlashcard) -> Result<Self::Flashcard>;

    fn flashcards_of(&self, set_id: i32) -> Result<Vec<Self::Flashcard>>;

    /// Get a chunk of parent ids of the given kind, ordered by id
    fn parents_offset_limit(&self, kind: ReviewKind, offset: usize, limit: usize)
        -> Result<Vec<i32>>;

    /// Build an iterator that returns all parent ids of a kind by chunks
    fn parents_by_chunks(&self, kind: ReviewKind, chunk_size: usize) -> LazyParentChunks<Self>
    where
        Self: Sized,
    {
        LazyParentChunks {
            kind,
            curr_offset: 0,
            chunk_size,
            finished: false,
            controller: self,
        }
    }

    fn reviews_of(&self, kind: ReviewKind, parent_id: i32) -> Result<Vec<Review>>;

    fn review_by_id(&self, kind: ReviewKind, id: i32) -> Result<Review>;

    /// Persist a review, a second review by the same author on the same parent
    /// fails with `DuplicateReview`
    fn insert_review(&self, proto: &NewReview) -> Result<Review>;

    fn update_review(&self, kind: ReviewKind, id: i32, rating: i32, review: &str)
        -> Result<Review>;

    /// Delete a review and return the deleted row
    fn remove_review(&self, kind: ReviewKind, id: i32) -> Result<Review>;

    /// Take a row lock on the parent for the rest of the transaction,
    /// `false` if the parent doesn't exist
    fn lock_parent(&self, kind: ReviewKind, parent_id: i32) -> Result<bool>;

    /// Store-side mean of all ratings on the parent, `None` without reviews
    fn average_rating(&self, kind: ReviewKind, parent_id: i32) -> Result<Option<f64>>;

    /// Overwrite only the average column of the parent, `false` if no row matched
    fn set_average_rating(&self, kind: ReviewKind, parent_id: i32, value: f64) -> Result<bool>;

    /// Currently persisted average of the parent
    fn stored_average_rating(&self, kind: ReviewKind, parent_id: i32) -> Result<Option<f64>>;

    fn setting(&self, key: &str) -> Result<Option<String>>;

    /// Update an existing setting, `false` if there is no row for `key`
    fn update_setting(&self, key: &str, value: &str) -> Result<bool>;

    fn daily_count(&self, date: NaiveDate) -> Result<Option<i32>>;

    /// Insert-or-increment the counter for `date` and return the new total.
    /// A lost race on the first insert surfaces as `CounterConflict`.
    fn increment_daily_count(&self, date: NaiveDate) -> Result<i32>;
}
