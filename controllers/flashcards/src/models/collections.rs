// Copyright (c) 2020 White Leaf
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT

use super::users::User;
use crate::schema::collections;
use chrono::NaiveDateTime;
use common_macros::hash_map;
use controller::Entity;
use std::collections::HashMap;

// To query data from the database
#[derive(Debug, Clone, Identifiable, Queryable, Associations)]
#[belongs_to(User)]
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

// To insert a new collection into the database
#[derive(Debug, Clone, Insertable)]
#[table_name = "collections"]
pub struct NewCollection<'a> {
    pub user_id: i32,
    pub name: &'a str,
}
