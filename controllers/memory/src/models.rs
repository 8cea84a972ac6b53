// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use chrono::NaiveDateTime;
use common_macros::hash_map;
use controller::{Entity, Role};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entity for User {
    type Id = i32;

    fn get_id(&self) -> Self::Id {
        self.id
    }

    fn get_data(&self) -> HashMap<String, String> {
        hash_map! {
            "username".into() => self.username.clone(),
            "role".into() => self.role.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
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

#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub average_rating: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Entity for Collection {
    type Id = i32;

    fn get_id(&self) -> Self::Id {
        self.id
    }

    fn get_data(&self) -> HashMap<String, String> {
        hash_map! {
            "user_id".into() => self.user_id.to_string(),
            "name".into() => self.name.clone(),
            "average_rating".into() => format!("{:.2}", self.average_rating),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
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
