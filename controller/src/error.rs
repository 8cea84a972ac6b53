// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use chrono::NaiveDate;
use thiserror::Error as DError;

#[derive(Debug, Clone, PartialEq, DError)]
pub enum ErrorKind {
    #[error("Couldn't found entity with id({0})")]
    NotFoundById(String),

    #[error("Couldn't found entity with name({0})")]
    NotFoundByName(String),

    #[error("No database named {0} in config")]
    DbConfigError(String),

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(i32),

    #[error("Review text must have between 3 and 500 characters, got {0}")]
    InvalidReviewText(usize),

    #[error("Daily limit must be a non-negative integer, got {0}")]
    InvalidDailyLimit(i64),

    #[error("User({0}) already reviewed {1}({2})")]
    DuplicateReview(i32, &'static str, i32),

    #[error("User({0}) is not allowed to {1}")]
    Forbidden(i32, &'static str),

    #[error("Daily limit of {1} flashcard sets reached for {0}")]
    DailyLimitReached(NaiveDate, u32),

    #[error("Concurrent first insert on counter for {0}")]
    CounterConflict(NaiveDate),

    #[error("Store lock was poisoned")]
    Poisoned,
}
