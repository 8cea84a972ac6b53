// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

#[macro_use]
extern crate diesel;

pub mod models;
pub mod schema;

use crate::models::{
    collections::{Collection, NewCollection as NewCollectionRow},
    counters::{DailySetCreations, NewDailySetCreations, Setting},
    flashcards::{Flashcard, NewFlashcard as NewFlashcardRow},
    reviews::ReviewRow,
    sets::{FlashcardSet, NewFlashcardSet},
    users::{NewUser as NewUserRow, User},
};
use crate::schema::{daily_set_creations, settings};
use anyhow::Error;
use chrono::NaiveDate;
use config::Config;
use controller::{
    error::ErrorKind, Controller, NewCollection, NewFlashcard, NewReview, NewSet, NewUser, Result,
    Review, ReviewKind, Role, SearchBy,
};
use diesel::dsl::{now, sql};
use diesel::pg::PgConnection;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{Float8, Nullable};
use diesel::{delete, insert_into, prelude::*, update};

/// Run `$body` against the review table of `$kind`, with `$reviews` naming the
/// table module and `$parent` its parent foreign key column
macro_rules! with_reviews {
    ($kind:expr, |$reviews:ident| $body:block) => {
        match $kind {
            ReviewKind::FlashcardSet => {
                use crate::schema::set_reviews as $reviews;
                $body
            }
            ReviewKind::Collection => {
                use crate::schema::collection_reviews as $reviews;
                $body
            }
        }
    };
    ($kind:expr, |$reviews:ident, $parent:ident| $body:block) => {
        match $kind {
            ReviewKind::FlashcardSet => {
                use crate::schema::set_reviews as $reviews;
                use crate::schema::set_reviews::set_id as $parent;
                $body
            }
            ReviewKind::Collection => {
                use crate::schema::collection_reviews as $reviews;
                use crate::schema::collection_reviews::collection_id as $parent;
                $body
            }
        }
    };
}

/// Run `$body` against the table holding parents of `$kind`
macro_rules! with_parents {
    ($kind:expr, |$parents:ident| $body:block) => {
        match $kind {
            ReviewKind::FlashcardSet => {
                use crate::schema::flashcard_sets as $parents;
                $body
            }
            ReviewKind::Collection => {
                use crate::schema::collections as $parents;
                $body
            }
        }
    };
}

pub fn establish_connection(url: &str) -> Result<PgConnection> {
    Ok(PgConnection::establish(&url)?)
}

fn not_empty<T>(found: Vec<T>, by: &SearchBy) -> Result<Vec<T>> {
    if found.is_empty() {
        Err(by.not_found().into())
    } else {
        Ok(found)
    }
}

fn is_unique_violation(e: &DieselError) -> bool {
    matches!(e, DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
}

pub struct FlashcardsController {
    pg_conn: PgConnection,
}

impl FlashcardsController {
    pub fn new() -> Result<Self> {
        let cfg = Config::default();

        Self::from_config(&cfg, "flashcards")
    }

    pub fn from_config(config: &Config, name: &str) -> Result<Self> {
        let db = config
            .databases
            .get(name)
            .ok_or_else(|| ErrorKind::DbConfigError(name.into()))?;

        Self::with_url(&db.psql_url)
    }

    pub fn with_url(url: &str) -> Result<Self> {
        let pg_conn = establish_connection(url)?;
        log::debug!("Connected to flashcards database");

        Ok(Self { pg_conn })
    }

    pub fn connection(&self) -> &PgConnection {
        &self.pg_conn
    }
}

impl Controller for FlashcardsController {
    type User = User;
    type Set = FlashcardSet;
    type Collection = Collection;
    type Flashcard = Flashcard;

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        // Nested calls become savepoints
        self.pg_conn.transaction::<T, Error, _>(f)
    }

    fn users_by(&self, by: &SearchBy) -> Result<Vec<Self::User>> {
        use crate::schema::users;

        let found = match by {
            SearchBy::Id(id) => users::table.find(*id).load::<User>(&self.pg_conn)?,
            SearchBy::Name(name) => users::table
                .filter(users::username.eq(name))
                .load::<User>(&self.pg_conn)?,
        };

        not_empty(found, by)
    }

    fn user_role(&self, user_id: i32) -> Result<Role> {
        use crate::schema::users;

        let role = users::table
            .find(user_id)
            .select(users::role)
            .get_result::<String>(&self.pg_conn)
            .optional()?
            .ok_or_else(|| ErrorKind::NotFoundById(user_id.to_string()))?;

        role.parse().map_err(Error::msg)
    }

    fn insert_user(&self, proto: &NewUser) -> Result<Self::User> {
        use crate::schema::users;

        let user = NewUserRow {
            username: &proto.username,
            role: proto.role.as_str(),
        };

        Ok(insert_into(users::table)
            .values(&user)
            .get_result(&self.pg_conn)?)
    }

    fn sets_by(&self, by: &SearchBy) -> Result<Vec<Self::Set>> {
        use crate::schema::flashcard_sets;

        let found = match by {
            SearchBy::Id(id) => flashcard_sets::table
                .find(*id)
                .load::<FlashcardSet>(&self.pg_conn)?,
            SearchBy::Name(name) => flashcard_sets::table
                .filter(flashcard_sets::name.eq(name))
                .load::<FlashcardSet>(&self.pg_conn)?,
        };

        not_empty(found, by)
    }

    fn insert_set(&self, proto: &NewSet) -> Result<Self::Set> {
        use crate::schema::flashcard_sets;

        let set = NewFlashcardSet {
            user_id: proto.user_id,
            name: &proto.name,
            description: proto.description.as_deref(),
            private: proto.private,
        };

        Ok(insert_into(flashcard_sets::table)
            .values(&set)
            .get_result(&self.pg_conn)?)
    }

    fn remove_set(&self, id: i32) -> Result<Self::Set> {
        use crate::schema::flashcard_sets;

        delete(flashcard_sets::table.find(id))
            .get_result::<FlashcardSet>(&self.pg_conn)
            .optional()?
            .ok_or_else(|| ErrorKind::NotFoundById(id.to_string()).into())
    }

    fn collections_by(&self, by: &SearchBy) -> Result<Vec<Self::Collection>> {
        use crate::schema::collections;

        let found = match by {
            SearchBy::Id(id) => collections::table
                .find(*id)
                .load::<Collection>(&self.pg_conn)?,
            SearchBy::Name(name) => collections::table
                .filter(collections::name.eq(name))
                .load::<Collection>(&self.pg_conn)?,
        };

        not_empty(found, by)
    }

    fn insert_collection(&self, proto: &NewCollection) -> Result<Self::Collection> {
        use crate::schema::collections;

        let collection = NewCollectionRow {
            user_id: proto.user_id,
            name: &proto.name,
        };

        Ok(insert_into(collections::table)
            .values(&collection)
            .get_result(&self.pg_conn)?)
    }

    fn remove_collection(&self, id: i32) -> Result<Self::Collection> {
        use crate::schema::collections;

        delete(collections::table.find(id))
            .get_result::<Collection>(&self.pg_conn)
            .optional()?
            .ok_or_else(|| ErrorKind::NotFoundById(id.to_string()).into())
    }

    fn insert_flashcard(&self, proto: &NewFlashcard) -> Result<Self::Flashcard> {
        use crate::schema::flashcards;

        let card = NewFlashcardRow {
            set_id: proto.set_id,
            term: &proto.term,
            definition: &proto.definition,
        };

        Ok(insert_into(flashcards::table)
            .values(&card)
            .get_result(&self.pg_conn)?)
    }

    fn flashcards_of(&self, set_id: i32) -> Result<Vec<Self::Flashcard>> {
        use crate::schema::flashcards;

        Ok(flashcards::table
            .filter(flashcards::set_id.eq(set_id))
            .order(flashcards::id)
            .load(&self.pg_conn)?)
    }

    fn parents_offset_limit(
        &self,
        kind: ReviewKind,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<i32>> {
        with_parents!(kind, |parents| {
            Ok(parents::table
                .select(parents::id)
                .order(parents::id)
                .offset(offset as i64)
                .limit(limit as i64)
                .load::<i32>(&self.pg_conn)?)
        })
    }

    fn reviews_of(&self, kind: ReviewKind, parent_id: i32) -> Result<Vec<Review>> {
        let rows = with_reviews!(kind, |reviews, parent| {
            reviews::table
                .filter(parent.eq(parent_id))
                .order(reviews::id)
                .load::<ReviewRow>(&self.pg_conn)?
        });

        Ok(rows.into_iter().map(|row| row.into_review(kind)).collect())
    }

    fn review_by_id(&self, kind: ReviewKind, id: i32) -> Result<Review> {
        let row = with_reviews!(kind, |reviews| {
            reviews::table
                .find(id)
                .get_result::<ReviewRow>(&self.pg_conn)
                .optional()?
        });

        row.map(|row| row.into_review(kind))
            .ok_or_else(|| ErrorKind::NotFoundById(id.to_string()).into())
    }

    fn insert_review(&self, proto: &NewReview) -> Result<Review> {
        let inserted = with_reviews!(proto.kind, |reviews, parent| {
            insert_into(reviews::table)
                .values((
                    reviews::rating.eq(proto.rating),
                    reviews::review.eq(&proto.review),
                    reviews::user_id.eq(proto.user_id),
                    parent.eq(proto.parent_id),
                ))
                .get_result::<ReviewRow>(&self.pg_conn)
        });

        match inserted {
            Ok(row) => Ok(row.into_review(proto.kind)),
            Err(e) if is_unique_violation(&e) => Err(ErrorKind::DuplicateReview(
                proto.user_id,
                proto.kind.name(),
                proto.parent_id,
            )
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    fn update_review(
        &self,
        kind: ReviewKind,
        id: i32,
        rating: i32,
        review: &str,
    ) -> Result<Review> {
        let row = with_reviews!(kind, |reviews| {
            update(reviews::table.find(id))
                .set((
                    reviews::rating.eq(rating),
                    reviews::review.eq(review),
                    reviews::updated_at.eq(now),
                ))
                .get_result::<ReviewRow>(&self.pg_conn)
                .optional()?
        });

        row.map(|row| row.into_review(kind))
            .ok_or_else(|| ErrorKind::NotFoundById(id.to_string()).into())
    }

    fn remove_review(&self, kind: ReviewKind, id: i32) -> Result<Review> {
        let row = with_reviews!(kind, |reviews| {
            delete(reviews::table.find(id))
                .get_result::<ReviewRow>(&self.pg_conn)
                .optional()?
        });

        row.map(|row| row.into_review(kind))
            .ok_or_else(|| ErrorKind::NotFoundById(id.to_string()).into())
    }

    fn lock_parent(&self, kind: ReviewKind, parent_id: i32) -> Result<bool> {
        let locked = with_parents!(kind, |parents| {
            parents::table
                .find(parent_id)
                .select(parents::id)
                .for_update()
                .get_result::<i32>(&self.pg_conn)
                .optional()?
        });

        Ok(locked.is_some())
    }

    fn average_rating(&self, kind: ReviewKind, parent_id: i32) -> Result<Option<f64>> {
        // AVG over int4 is numeric, cast so it maps to f64
        let average = with_reviews!(kind, |reviews, parent| {
            reviews::table
                .filter(parent.eq(parent_id))
                .select(sql::<Nullable<Float8>>("AVG(rating)::float8"))
                .get_result::<Option<f64>>(&self.pg_conn)?
        });

        Ok(average)
    }

    fn set_average_rating(&self, kind: ReviewKind, parent_id: i32, value: f64) -> Result<bool> {
        let updated = with_parents!(kind, |parents| {
            update(parents::table.find(parent_id))
                .set(parents::average_rating.eq(value))
                .execute(&self.pg_conn)?
        });

        Ok(updated > 0)
    }

    fn stored_average_rating(&self, kind: ReviewKind, parent_id: i32) -> Result<Option<f64>> {
        let average = with_parents!(kind, |parents| {
            parents::table
                .find(parent_id)
                .select(parents::average_rating)
                .get_result::<f64>(&self.pg_conn)
                .optional()?
        });

        Ok(average)
    }

    fn setting(&self, key: &str) -> Result<Option<String>> {
        let setting = settings::table
            .find(key)
            .get_result::<Setting>(&self.pg_conn)
            .optional()?;

        Ok(setting.map(|setting| setting.value))
    }

    fn update_setting(&self, key: &str, value: &str) -> Result<bool> {
        let updated = update(settings::table.find(key))
            .set((settings::value.eq(value), settings::updated_at.eq(now)))
            .execute(&self.pg_conn)?;

        Ok(updated > 0)
    }

    fn daily_count(&self, date: NaiveDate) -> Result<Option<i32>> {
        let row = daily_set_creations::table
            .find(date)
            .get_result::<DailySetCreations>(&self.pg_conn)
            .optional()?;

        Ok(row.map(|row| row.total_created))
    }

    fn increment_daily_count(&self, date: NaiveDate) -> Result<i32> {
        use crate::schema::daily_set_creations::dsl::total_created;

        let first = NewDailySetCreations {
            date,
            total_created: 1,
        };

        // Savepoint, so a lost race doesn't abort the surrounding transaction
        let result = self.pg_conn.transaction(|| {
            insert_into(daily_set_creations::table)
                .values(&first)
                .on_conflict(daily_set_creations::date)
                .do_update()
                .set(total_created.eq(total_created + 1))
                .returning(total_created)
                .get_result::<i32>(&self.pg_conn)
        });

        match result {
            Ok(total) => Ok(total),
            Err(e) if is_unique_violation(&e) => Err(ErrorKind::CounterConflict(date).into()),
            Err(e) => Err(e.into()),
        }
    }
}
