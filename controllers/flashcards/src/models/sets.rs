// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use super::users::User;
use crate::schema::flashcard_sets;
use chrono::NaiveDateTime;
use common_macros::hash_map;
use controller::Entity;
use std::collections::HashMap;

// To query data from the database
#[derive(Debug, Clone, Identifiable, Queryable, Associations)]
#[belongs_to(User)]
#[table_name = "flashcard_sets"]
pub struct FlashcardSet {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub private: bool,
    pub average_rating: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entity for FlashcardSet {
    type Id = i32;

    fn get_id(&self) -> Self::Id {
        self.id
    }

    fn get_data(&self) -> HashMap<String, String> {
        let mut data = hash_map! {
            "user_id".into() => self.user_id.to_string(),
            "name".into() => self.name.clone(),
            "private".into() => self.private.to_string(),
            "average_rating".into() => format!("{:.2}", self.average_rating),
        };

        if let Some(description) = &self.description {
            data.insert("description".into(), description.clone());
        }

        data
    }
}

// To insert a new set into the database
#[derive(Debug, Clone, Insertable)]
#[table_name = "flashcard_sets"]
pub struct NewFlashcardSet<'a> {
    pub user_id: i32,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub private: bool,
}
