// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use crate::schema::{collection_reviews, set_reviews};
use chrono::NaiveDateTime;
use controller::{Review, ReviewKind};

/// Row of either review table, both share the same column layout
#[derive(Debug, Clone, Queryable)]
pub struct ReviewRow {
    pub id: i32,
    pub rating: i32,
    pub review: String,
    pub user_id: i32,
    pub parent_id: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ReviewRow {
    pub fn into_review(self, kind: ReviewKind) -> Review {
        Review {
            id: self.id,
            kind,
            rating: self.rating,
            review: self.review,
            user_id: self.user_id,
            parent_id: self.parent_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// Used by the loader, reviews made through the controller go through the engine
#[derive(Debug, Clone, Insertable)]
#[table_name = "set_reviews"]
pub struct NewSetReview<'a> {
    pub rating: i32,
    pub review: &'a str,
    pub user_id: i32,
    pub set_id: i32,
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "collection_reviews"]
pub struct NewCollectionReview<'a> {
    pub rating: i32,
    pub review: &'a str,
    pub user_id: i32,
    pub collection_id: i32,
}
