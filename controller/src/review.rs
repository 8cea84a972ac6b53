// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::{error::ErrorKind, Entity};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::ops::RangeInclusive;

pub const RATING_RANGE: RangeInclusive<i32> = 1..=5;
pub const REVIEW_TEXT_RANGE: RangeInclusive<usize> = 3..=500;

/// What a review points at. Both kinds carry a persisted average rating.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ReviewKind {
    FlashcardSet,
    Collection,
}

impl ReviewKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::FlashcardSet => "set",
            Self::Collection => "collection",
        }
    }
}

impl Display for ReviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub id: i32,
    pub kind: ReviewKind,
    pub rating: i32,
    pub review: String,
    pub user_id: i32,
    pub parent_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entity for Review {
    type Id = i32;

    fn get_id(&self) -> Self::Id {
        self.id
    }

    fn get_data(&self) -> HashMap<String, String> {
        let mut data = HashMap::new();
        data.insert(self.kind.name().into(), self.parent_id.to_string());
        data.insert("user_id".into(), self.user_id.to_string());
        data.insert("rating".into(), self.rating.to_string());
        data.insert("review".into(), self.review.clone());
        data
    }
}

/// A validated review waiting to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub kind: ReviewKind,
    pub rating: i32,
    pub review: String,
    pub user_id: i32,
    pub parent_id: i32,
}

impl NewReview {
    pub fn new(
        kind: ReviewKind,
        parent_id: i32,
        user_id: i32,
        rating: i32,
        review: &str,
    ) -> Result<Self, ErrorKind> {
        validate(rating, review)?;

        Ok(Self {
            kind,
            rating,
            review: review.to_owned(),
            user_id,
            parent_id,
        })
    }
}

pub fn validate(rating: i32, review: &str) -> Result<(), ErrorKind> {
    if !RATING_RANGE.contains(&rating) {
        return Err(ErrorKind::InvalidRating(rating));
    }

    let chars = review.chars().count();
    if !REVIEW_TEXT_RANGE.contains(&chars) {
        return Err(ErrorKind::InvalidReviewText(chars));
    }

    Ok(())
}
