// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use super::sets::FlashcardSet;
use crate::schema::flashcards;
use chrono::NaiveDateTime;
use common_macros::hash_map;
use controller::Entity;
use std::collections::HashMap;

// To query data from the database
#[derive(Debug, Clone, Identifiable, Queryable, Associations)]
#[belongs_to(FlashcardSet, foreign_key = "set_id")]
pub struct Flashcard {
    pub id: i32,
    pub set_id: i32,
    pub term: String,
    pub definition: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entity for Flashcard {
    type Id = i32;

    fn get_id(&self) -> Self::Id {
        self.id
    }

    fn get_data(&self) -> HashMap<String, String> {
        hash_map! {
            "set_id".into() => self.set_id.to_string(),
            "term".into() => self.term.clone(),
            "definition".into() => self.definition.clone(),
        }
    }
}

// To insert a new flashcard into the database
#[derive(Debug, Clone, Insertable)]
#[table_name = "flashcards"]
pub struct NewFlashcard<'a> {
    pub set_id: i32,
    pub term: &'a str,
    pub definition: &'a str,
}
